//! Chromium-backed [`Page`] using chromiumoxide.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use trader_watch::{FocusStep, Page, WatchError, WatchResult};

/// Interval between visibility / activation polls.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Find the Chromium binary path.
///
/// Returns `None` to let chromiumoxide run its own detection.
pub fn find_chromium() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("TRADER_WATCH_CHROMIUM") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
        tracing::warn!("TRADER_WATCH_CHROMIUM points to missing file: {p}");
    }

    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// A running browser plus the task draining its CDP event stream.
pub struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromiumSession {
    /// Launch Chromium. Failure here is fatal to the run.
    pub async fn launch(headless: bool) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .window_size(1440, 900);
        if let Some(path) = find_chromium() {
            builder = builder.chrome_executable(path);
        }
        builder = if headless {
            builder.arg("--headless=new")
        } else {
            builder.with_head()
        };
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("browser handler event error: {e}");
                }
            }
        });

        tracing::info!("Chromium launched (headless: {headless})");
        Ok(Self { browser, handler })
    }

    /// Open the tab shared by the whole run.
    pub async fn new_page(&self) -> Result<ChromiumPage> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;
        Ok(ChromiumPage { page })
    }

    pub async fn close(mut self) -> Result<()> {
        if let Err(e) = self.browser.close().await {
            tracing::warn!("browser close failed: {e}");
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
        Ok(())
    }
}

/// A single Chromium tab.
pub struct ChromiumPage {
    page: chromiumoxide::Page,
}

impl ChromiumPage {
    async fn eval<T: DeserializeOwned>(&self, script: &str) -> WatchResult<T> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| WatchError::Page(format!("JS execution failed: {e}")))?;
        result
            .into_value()
            .map_err(|e| WatchError::Page(format!("failed to convert JS result: {e:?}")))
    }

    async fn press_key(&self, key: &str) -> WatchResult<()> {
        let def = key_definition(key)
            .ok_or_else(|| WatchError::InvalidInput(format!("unsupported key: {key:?}")))?;

        let mut down = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyDown)
            .key(def.key)
            .code(def.code)
            .windows_virtual_key_code(def.key_code)
            .native_virtual_key_code(def.key_code);
        if let Some(text) = def.text {
            down = down.text(text);
        }
        let down = down.build().map_err(WatchError::Page)?;

        let up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .key(def.key)
            .code(def.code)
            .windows_virtual_key_code(def.key_code)
            .native_virtual_key_code(def.key_code)
            .build()
            .map_err(WatchError::Page)?;

        for event in [down, up] {
            self.page
                .execute(event)
                .await
                .map_err(|e| WatchError::Page(format!("key {key:?} dispatch failed: {e}")))?;
        }
        Ok(())
    }
}

#[async_trait]
impl Page for ChromiumPage {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> WatchResult<()> {
        let started = Instant::now();
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(WatchError::Navigation(format!("{url}: {e}"))),
            Err(_) => return Err(WatchError::Timeout(timeout.as_millis() as u64)),
        }

        // goto already returned, so a slow or failed settle is not fatal.
        let Some(budget) = remaining_budget(timeout, started.elapsed()) else {
            tracing::debug!("{url}: no time left to wait for navigation to settle");
            return Ok(());
        };
        match tokio::time::timeout(budget, self.page.wait_for_navigation()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::debug!("{url}: navigation did not settle: {e}"),
            Err(_) => tracing::debug!("{url}: navigation still settling after {budget:?}"),
        }
        Ok(())
    }

    async fn visible_text(&mut self) -> WatchResult<String> {
        self.eval("document.body ? document.body.innerText : ''")
            .await
    }

    async fn is_overlay_visible(&mut self, selector: &str, timeout: Duration) -> bool {
        let script = visibility_script(selector);
        let deadline = Instant::now() + timeout;
        loop {
            match self.eval::<bool>(&script).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => tracing::debug!("overlay visibility check failed: {e}"),
            }
            if Instant::now() + POLL_INTERVAL > deadline {
                return false;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn perform_focus_step(&mut self, step: FocusStep) -> WatchResult<()> {
        match step.key() {
            Some(key) => self.press_key(key).await,
            None => self
                .eval::<bool>(
                    "(() => { if (document.activeElement) document.activeElement.blur(); \
                     document.body.focus(); return true; })()",
                )
                .await
                .map(|_| ()),
        }
    }

    async fn locate_and_activate(&mut self, label: &str, timeout: Duration) -> WatchResult<()> {
        let script = activation_script(label);
        let deadline = Instant::now() + timeout;
        loop {
            match self.eval::<bool>(&script).await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(e) => tracing::debug!("activation attempt failed: {e}"),
            }
            if Instant::now() + POLL_INTERVAL > deadline {
                return Err(WatchError::ElementNotFound(label.to_string()));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn screenshot(&mut self, full_page: bool) -> WatchResult<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(full_page)
            .build();
        self.page
            .screenshot(params)
            .await
            .map_err(|e| WatchError::Page(format!("screenshot failed: {e}")))
    }

    async fn anchor_hrefs(&mut self) -> WatchResult<Vec<String>> {
        self.eval(
            "Array.from(document.querySelectorAll('a[href]'))\
             .map(a => a.getAttribute('href'))\
             .filter(h => !!h)",
        )
        .await
    }

    async fn advance_listing_page(&mut self) -> WatchResult<bool> {
        self.eval(
            r#"(() => {
                const btn = document.querySelector('li.bit-pagination-next button');
                if (!btn) return false;
                if (btn.disabled || btn.getAttribute('aria-disabled') === 'true') return false;
                btn.click();
                return true;
            })()"#,
        )
        .await
    }
}

/// CDP fields for a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct KeyDefinition {
    key: &'static str,
    code: &'static str,
    key_code: i64,
    text: Option<&'static str>,
}

/// Time left of `timeout` after `elapsed`, or `None` once it is spent.
fn remaining_budget(timeout: Duration, elapsed: Duration) -> Option<Duration> {
    Some(timeout.saturating_sub(elapsed)).filter(|left| !left.is_zero())
}

fn key_definition(key: &str) -> Option<KeyDefinition> {
    let def = match key {
        "Tab" => KeyDefinition {
            key: "Tab",
            code: "Tab",
            key_code: 9,
            text: None,
        },
        " " => KeyDefinition {
            key: " ",
            code: "Space",
            key_code: 32,
            text: Some(" "),
        },
        "Enter" => KeyDefinition {
            key: "Enter",
            code: "Enter",
            key_code: 13,
            text: Some("\r"),
        },
        _ => return None,
    };
    Some(def)
}

fn visibility_script(selector: &str) -> String {
    format!(
        r#"(() => {{
            const el = document.querySelector('{}');
            if (!el) return false;
            const rect = el.getBoundingClientRect();
            const style = window.getComputedStyle(el);
            return rect.width > 0 && rect.height > 0
                && style.visibility !== 'hidden' && style.display !== 'none';
        }})()"#,
        sanitize_js_string(selector)
    )
}

fn activation_script(label: &str) -> String {
    format!(
        r#"(() => {{
            const label = '{}';
            const nodes = document.querySelectorAll('button, [role="tab"], a, li, div, span');
            for (const el of nodes) {{
                if (el.offsetParent === null) continue;
                if ((el.textContent || '').trim() !== label) continue;
                el.click();
                return true;
            }}
            return false;
        }})()"#,
        sanitize_js_string(label)
    )
}

/// Escape a string for injection into a single-quoted JS string literal.
fn sanitize_js_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '\'' => result.push_str("\\'"),
            '"' => result.push_str("\\\""),
            '`' => result.push_str("\\`"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\0' => {}
            '<' => result.push_str("\\x3c"),
            '>' => result.push_str("\\x3e"),
            _ => result.push(ch),
        }
    }
    result
}
