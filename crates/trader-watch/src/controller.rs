//! Iteration controller: visits every trader page in turn and collects
//! in-window order records.
//!
//! Each trader is processed in isolation. A failure on one trader becomes an
//! `ERROR` line in the [`RunResult`] and the loop moves on.

use std::fmt;
use std::time::Duration;

use crate::filter::filter_records;
use crate::notify::Notifier;
use crate::overlay::{OverlayHandshake, OverlayOptions};
use crate::page::Page;
use crate::parser::{parse_blocks, split_lines};
use crate::types::{Record, RunParams, SymbolFilter, TimeWindow, WatchResult};

/// Placeholder replaced by the trader identifier in URL templates.
pub const ID_PLACEHOLDER: &str = "{id}";

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Trader page URL with an `{id}` placeholder.
    pub url_template: String,
    pub navigation_timeout: Duration,
    /// Wait after navigation before touching the page.
    pub settle: Duration,
    pub overlay: OverlayOptions,
    /// Text of the tab that shows the trader's current orders.
    pub active_view_label: String,
    pub activation_timeout: Duration,
    /// Wait after switching tabs so the order list can render.
    pub activation_settle: Duration,
    /// Send a screenshot of each trader page to the notifier.
    pub snapshots: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            url_template: "https://www.bitget.com/ru/copy-trading/trader/{id}/futures-order"
                .to_string(),
            navigation_timeout: Duration::from_secs(30),
            settle: Duration::from_secs(2),
            overlay: OverlayOptions::default(),
            active_view_label: "Текущие ордера".to_string(),
            activation_timeout: Duration::from_secs(10),
            activation_settle: Duration::from_secs(2),
            snapshots: true,
        }
    }
}

impl ControllerOptions {
    pub fn trader_url(&self, id: &str) -> String {
        self.url_template.replace(ID_PLACEHOLDER, id)
    }
}

/// Why a trader produced no result at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityFailure {
    /// The trader page could not be opened.
    Navigation(String),
    /// The page opened but its text could not be read.
    Extraction(String),
}

impl fmt::Display for EntityFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityFailure::Navigation(reason) => write!(f, "navigation failed: {reason}"),
            EntityFailure::Extraction(reason) => write!(f, "page text unavailable: {reason}"),
        }
    }
}

/// Outcome of processing one trader.
pub type EntityOutcome = Result<Vec<Record>, EntityFailure>;

/// Append-only log of per-trader outcome lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    lines: Vec<String>,
    entities: usize,
    records: usize,
    not_found: usize,
    errors: usize,
}

impl RunResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one trader.
    pub fn push_outcome(&mut self, id: &str, outcome: &EntityOutcome) {
        self.entities += 1;
        match outcome {
            Ok(records) if records.is_empty() => {
                self.not_found += 1;
                self.lines.push(format!("ID: {id} | NOT_FOUND"));
            }
            Ok(records) => {
                self.records += records.len();
                self.lines
                    .extend(records.iter().map(|r| record_line(id, r)));
            }
            Err(failure) => {
                self.errors += 1;
                self.lines.push(format!("ID: {id} | ERROR: {failure}"));
            }
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn entities(&self) -> usize {
        self.entities
    }

    pub fn records(&self) -> usize {
        self.records
    }

    pub fn not_found(&self) -> usize {
        self.not_found
    }

    pub fn errors(&self) -> usize {
        self.errors
    }

    /// Newline-joined outcome lines.
    pub fn report(&self) -> String {
        self.lines.join("\n")
    }

    /// One-line summary used as the report caption.
    pub fn summary(&self) -> String {
        format!(
            "traders: {}, records: {}, not found: {}, errors: {}",
            self.entities, self.records, self.not_found, self.errors
        )
    }
}

/// Outcome line for a single record.
pub fn record_line(id: &str, record: &Record) -> String {
    format!("ID: {id} | {}", record.text)
}

/// Drives one browser page across the whole identifier list.
pub struct IterationController<'a> {
    page: &'a mut dyn Page,
    notifier: &'a dyn Notifier,
    options: ControllerOptions,
    handshake: OverlayHandshake,
}

impl<'a> IterationController<'a> {
    pub fn new(page: &'a mut dyn Page, notifier: &'a dyn Notifier, options: ControllerOptions) -> Self {
        let handshake = OverlayHandshake::new(options.overlay.clone());
        Self {
            page,
            notifier,
            options,
            handshake,
        }
    }

    pub fn handshake(&self) -> &OverlayHandshake {
        &self.handshake
    }

    /// Process every identifier with a time window anchored at the current
    /// instant.
    pub async fn run(&mut self, ids: &[String], params: &RunParams) -> WatchResult<RunResult> {
        let window = TimeWindow::ending_now(params.hours_threshold)?;
        Ok(self.run_with_window(ids, &params.symbol_filter, &window).await)
    }

    /// Process every identifier against a fixed window.
    pub async fn run_with_window(
        &mut self,
        ids: &[String],
        symbol: &SymbolFilter,
        window: &TimeWindow,
    ) -> RunResult {
        tracing::info!(
            "scanning {} trader(s), symbol filter: {}, records since {}",
            ids.len(),
            symbol.symbol().unwrap_or("<none>"),
            window.threshold()
        );

        let mut result = RunResult::new();
        for (index, id) in ids.iter().enumerate() {
            tracing::info!("[{}/{}] trader {id}", index + 1, ids.len());
            let outcome = self.process_entity(id, symbol, window).await;
            match &outcome {
                Ok(records) => {
                    tracing::info!("trader {id}: {} record(s) in window", records.len());
                    for record in records {
                        self.notifier.send_text(&record_line(id, record)).await;
                    }
                }
                Err(failure) => tracing::warn!("trader {id}: {failure}"),
            }
            result.push_outcome(id, &outcome);
        }

        tracing::info!("scan finished: {}", result.summary());
        result
    }

    /// Open one trader page and extract its records.
    pub async fn process_entity(
        &mut self,
        id: &str,
        symbol: &SymbolFilter,
        window: &TimeWindow,
    ) -> EntityOutcome {
        let url = self.options.trader_url(id);
        self.page
            .navigate(&url, self.options.navigation_timeout)
            .await
            .map_err(|e| EntityFailure::Navigation(e.to_string()))?;
        pause(self.options.settle).await;

        self.handshake.run(&mut *self.page).await;

        match self
            .page
            .locate_and_activate(&self.options.active_view_label, self.options.activation_timeout)
            .await
        {
            Ok(()) => pause(self.options.activation_settle).await,
            Err(e) => tracing::warn!(
                "trader {id}: could not open '{}' view, reading current view: {e}",
                self.options.active_view_label
            ),
        }

        if self.options.snapshots {
            match self.page.screenshot(false).await {
                Ok(png) => self.notifier.send_image(png, &format!("ID: {id}")).await,
                Err(e) => tracing::warn!("trader {id}: screenshot failed: {e}"),
            }
        }

        let text = self
            .page
            .visible_text()
            .await
            .map_err(|e| EntityFailure::Extraction(e.to_string()))?;

        let lines = split_lines(&text);
        let blocks = parse_blocks(&lines);
        tracing::debug!("trader {id}: {} line(s), {} block(s)", lines.len(), blocks.len());
        Ok(filter_records(&blocks, symbol, window))
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
