//! Command implementations behind the CLI.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use trader_watch::{
    discover_traders, ids_from_links, load_ids, write_ids, IterationController, Notifier,
    NullNotifier, RunResult, SymbolFilter, TimeWindow,
};

use crate::browser::ChromiumSession;
use crate::config::WatchConfig;
use crate::telegram::TelegramNotifier;

/// Build the configured notifier, or a no-op one without credentials.
pub fn build_notifier(config: &WatchConfig) -> Box<dyn Notifier> {
    match config.telegram_credentials() {
        Some((token, chat)) => Box::new(TelegramNotifier::new(token, chat)),
        None => {
            tracing::warn!("Telegram bot token or chat id missing, notifications disabled");
            Box::new(NullNotifier)
        }
    }
}

/// Scan every trader in the identifier file and deliver the report.
///
/// The window and identifiers are checked before a browser is started. An
/// empty identifier file yields an empty result.
pub async fn scan(config: &WatchConfig) -> Result<RunResult> {
    let window = TimeWindow::ending_now(config.hours).context("invalid hours threshold")?;
    let symbol = SymbolFilter::new(config.symbol.clone());

    let ids = load_ids(&config.ids_file)
        .with_context(|| format!("failed to read ids from {}", config.ids_file.display()))?;
    if ids.is_empty() {
        tracing::warn!("no trader ids in {}, nothing to scan", config.ids_file.display());
        return Ok(RunResult::new());
    }

    let notifier = build_notifier(config);
    let session = ChromiumSession::launch(config.headless).await?;
    let mut page = session.new_page().await?;

    let result = IterationController::new(&mut page, notifier.as_ref(), config.controller_options())
        .run_with_window(&ids, &symbol, &window)
        .await;
    drop(page);
    session.close().await?;

    let path = write_report(&config.output_dir, &result, Utc::now())?;
    tracing::info!("report written to {}", path.display());

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report.txt".to_string());
    notifier
        .send_document(result.report().into_bytes(), &filename, &result.summary())
        .await;

    Ok(result)
}

/// Walk the trader listing and write the discovered identifiers.
pub async fn discover(config: &WatchConfig, out: &Path) -> Result<Vec<String>> {
    let session = ChromiumSession::launch(config.headless).await?;
    let mut page = session.new_page().await?;

    let found = discover_traders(&mut page, &config.discover_options()).await;
    drop(page);
    session.close().await?;
    let ids = found.context("trader discovery failed")?;

    write_ids(out, &ids).with_context(|| format!("failed to write {}", out.display()))?;
    tracing::info!("{} trader id(s) written to {}", ids.len(), out.display());
    Ok(ids)
}

/// Convert a file of profile links into an identifier file.
pub fn extract_ids(links: &Path, out: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(links)
        .with_context(|| format!("failed to read {}", links.display()))?;
    let ids = ids_from_links(text.lines());
    write_ids(out, &ids).with_context(|| format!("failed to write {}", out.display()))?;
    Ok(ids)
}

/// Write the run report as `report-<timestamp>.txt` under `dir`.
pub fn write_report(dir: &Path, result: &RunResult, at: DateTime<Utc>) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(format!("report-{}.txt", at.format("%Y%m%d-%H%M%S")));
    std::fs::write(&path, result.report())
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
