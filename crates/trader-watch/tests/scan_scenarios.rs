//! End-to-end scan scenarios against a scripted page.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use trader_watch::overlay::DISMISS_SEQUENCE;
use trader_watch::*;

// ─────────────────────── helpers ───────────────────────

const ORDER_ID: &str = "1234567890123456789";

#[derive(Default, Clone)]
struct TraderPage {
    text: String,
    fail_navigation: bool,
    fail_activation: bool,
    fail_text: bool,
}

/// A page that serves canned text per URL and records every interaction.
#[derive(Default)]
struct ScriptedPage {
    pages: HashMap<String, TraderPage>,
    current: Option<String>,
    overlay_visible: bool,
    fail_screenshot: bool,
    listing: Vec<Vec<String>>,
    listing_index: usize,
    fail_listing_navigation: bool,
    fail_links_on_page: Option<usize>,
    fail_advance: bool,
    navigations: Vec<String>,
    focus_steps: Vec<FocusStep>,
    activations: Vec<String>,
}

impl ScriptedPage {
    fn with_trader(mut self, id: &str, page: TraderPage) -> Self {
        self.pages.insert(url(id), page);
        self
    }

    fn current_page(&self) -> Option<&TraderPage> {
        self.current.as_ref().and_then(|u| self.pages.get(u))
    }
}

#[async_trait]
impl Page for ScriptedPage {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> WatchResult<()> {
        self.navigations.push(url.to_string());
        if self.fail_listing_navigation && !self.listing.is_empty() {
            return Err(WatchError::Navigation("listing down".into()));
        }
        if self.pages.get(url).is_some_and(|p| p.fail_navigation) {
            return Err(WatchError::Navigation(format!("{url} unreachable")));
        }
        self.current = Some(url.to_string());
        Ok(())
    }

    async fn visible_text(&mut self) -> WatchResult<String> {
        match self.current_page() {
            Some(p) if p.fail_text => Err(WatchError::Page("detached".into())),
            Some(p) => Ok(p.text.clone()),
            None => Ok(String::new()),
        }
    }

    async fn is_overlay_visible(&mut self, _selector: &str, _timeout: Duration) -> bool {
        self.overlay_visible
    }

    async fn perform_focus_step(&mut self, step: FocusStep) -> WatchResult<()> {
        self.focus_steps.push(step);
        Ok(())
    }

    async fn locate_and_activate(&mut self, label: &str, _timeout: Duration) -> WatchResult<()> {
        self.activations.push(label.to_string());
        if self.current_page().is_some_and(|p| p.fail_activation) {
            return Err(WatchError::ElementNotFound(label.to_string()));
        }
        Ok(())
    }

    async fn screenshot(&mut self, _full_page: bool) -> WatchResult<Vec<u8>> {
        if self.fail_screenshot {
            return Err(WatchError::Timeout(1000));
        }
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn anchor_hrefs(&mut self) -> WatchResult<Vec<String>> {
        if self.fail_links_on_page == Some(self.listing_index) {
            return Err(WatchError::Page("links unreadable".into()));
        }
        Ok(self.listing.get(self.listing_index).cloned().unwrap_or_default())
    }

    async fn advance_listing_page(&mut self) -> WatchResult<bool> {
        if self.fail_advance {
            return Err(WatchError::Timeout(2000));
        }
        if self.listing_index + 1 < self.listing.len() {
            self.listing_index += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[derive(Default)]
struct RecordingNotifier {
    texts: Mutex<Vec<String>>,
    images: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_text(&self, message: &str) {
        self.texts.lock().unwrap().push(message.to_string());
    }

    async fn send_document(&self, _bytes: Vec<u8>, _filename: &str, _caption: &str) {}

    async fn send_image(&self, _bytes: Vec<u8>, caption: &str) {
        self.images.lock().unwrap().push(caption.to_string());
    }
}

fn options() -> ControllerOptions {
    ControllerOptions {
        url_template: "https://example.test/trader/{id}".to_string(),
        settle: Duration::ZERO,
        activation_settle: Duration::ZERO,
        overlay: OverlayOptions {
            step_pause: Duration::ZERO,
            ..OverlayOptions::default()
        },
        ..ControllerOptions::default()
    }
}

fn url(id: &str) -> String {
    options().trader_url(id)
}

fn window() -> TimeWindow {
    // Reaches back to 2023-12-31 00:00:00 UTC.
    let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    TimeWindow::new(now, 48.0).unwrap()
}

fn scenario_a_lines() -> Vec<&'static str> {
    vec![
        "Ордер №",
        "BTCUSDT",
        "x",
        "y",
        "z",
        "w",
        "2024-01-01 00:00:00",
        ORDER_ID,
        "О Bitget",
    ]
}

fn trader(lines: &[&str]) -> TraderPage {
    TraderPage {
        text: lines.join("\n"),
        ..TraderPage::default()
    }
}

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// ─────────────────────── pipeline scenarios ───────────────────────

#[test]
fn scenario_a_single_record() {
    let blocks = parse_blocks(&scenario_a_lines());
    let records = filter_records(&blocks, &SymbolFilter::any(), &window());
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].text,
        "Ордер № BTCUSDT x y z w 2024-01-01 00:00:00 1234567890123456789"
    );
    assert_eq!(records[0].unix_timestamp, 1_704_067_200);
}

#[test]
fn scenario_b_symbol_mismatch() {
    let blocks = parse_blocks(&scenario_a_lines());
    let records = filter_records(&blocks, &SymbolFilter::from(Some("ETH")), &window());
    assert!(records.is_empty());
}

#[test]
fn scenario_d_degenerate_block_rejected() {
    let mut lines = scenario_a_lines();
    lines.insert(8, ORDER_ID);
    let blocks = parse_blocks(&lines);
    assert_eq!(blocks.len(), 2);
    let records = filter_records(&blocks, &SymbolFilter::any(), &window());
    assert_eq!(records.len(), 1);
}

#[test]
fn text_with_padding_and_blank_lines() {
    let text = "\n  Ордер №  \n\n BTCUSDT\nx\n\ny\nz\nw\n 2024-01-01 00:00:00 \n1234567890123456789\n";
    let blocks = parse_blocks(&split_lines(text));
    let records = filter_records(&blocks, &SymbolFilter::any(), &window());
    assert_eq!(records.len(), 1);
}

// ─────────────────────── controller scenarios ───────────────────────

#[tokio::test]
async fn controller_streams_records_and_logs_outcomes() {
    let mut page = ScriptedPage::default()
        .with_trader("alpha", trader(&scenario_a_lines()))
        .with_trader("beta", trader(&["no orders here"]));
    let notifier = RecordingNotifier::default();

    let result = IterationController::new(&mut page, &notifier, options())
        .run_with_window(&ids(&["alpha", "beta"]), &SymbolFilter::any(), &window())
        .await;

    let expected = "ID: alpha | Ордер № BTCUSDT x y z w 2024-01-01 00:00:00 1234567890123456789";
    assert_eq!(
        result.lines(),
        &[expected.to_string(), "ID: beta | NOT_FOUND".to_string()]
    );
    assert_eq!(*notifier.texts.lock().unwrap(), vec![expected.to_string()]);
    assert_eq!(
        *notifier.images.lock().unwrap(),
        vec!["ID: alpha".to_string(), "ID: beta".to_string()]
    );
    assert_eq!(page.navigations, vec![url("alpha"), url("beta")]);
}

#[tokio::test]
async fn scenario_c_bad_date_reports_not_found() {
    let mut lines = scenario_a_lines();
    lines[6] = "yesterday";
    let mut page = ScriptedPage::default().with_trader("gamma", trader(&lines));
    let notifier = RecordingNotifier::default();

    let result = IterationController::new(&mut page, &notifier, options())
        .run_with_window(&ids(&["gamma"]), &SymbolFilter::any(), &window())
        .await;

    assert_eq!(result.lines(), &["ID: gamma | NOT_FOUND".to_string()]);
    assert_eq!(result.not_found(), 1);
    assert!(notifier.texts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn navigation_failure_is_isolated() {
    let mut page = ScriptedPage::default()
        .with_trader(
            "broken",
            TraderPage {
                fail_navigation: true,
                ..TraderPage::default()
            },
        )
        .with_trader("alpha", trader(&scenario_a_lines()));
    let notifier = RecordingNotifier::default();

    let result = IterationController::new(&mut page, &notifier, options())
        .run_with_window(&ids(&["broken", "alpha"]), &SymbolFilter::any(), &window())
        .await;

    assert_eq!(result.entities(), 2);
    assert_eq!(result.errors(), 1);
    assert_eq!(result.records(), 1);
    assert!(result.lines()[0].starts_with("ID: broken | ERROR"));
    assert!(result.lines()[1].starts_with("ID: alpha | Ордер №"));
}

#[tokio::test]
async fn unreadable_page_text_is_an_error_line() {
    let mut page = ScriptedPage::default().with_trader(
        "ghost",
        TraderPage {
            fail_text: true,
            ..TraderPage::default()
        },
    );
    let notifier = RecordingNotifier::default();

    let result = IterationController::new(&mut page, &notifier, options())
        .run_with_window(&ids(&["ghost"]), &SymbolFilter::any(), &window())
        .await;

    assert_eq!(result.errors(), 1);
    assert!(result.lines()[0].contains("page text unavailable"));
}

#[tokio::test]
async fn overlay_dismissed_only_once_per_run() {
    let mut page = ScriptedPage {
        overlay_visible: true,
        ..ScriptedPage::default()
    }
    .with_trader("a", trader(&scenario_a_lines()))
    .with_trader("b", trader(&scenario_a_lines()))
    .with_trader("c", trader(&scenario_a_lines()));
    let notifier = RecordingNotifier::default();

    let mut controller = IterationController::new(&mut page, &notifier, options());
    let result = controller
        .run_with_window(&ids(&["a", "b", "c"]), &SymbolFilter::any(), &window())
        .await;
    assert!(controller.handshake().is_handled());
    drop(controller);

    assert_eq!(result.records(), 3);
    assert_eq!(page.focus_steps, DISMISS_SEQUENCE.to_vec());
}

#[tokio::test]
async fn failed_navigation_leaves_handshake_pending() {
    let mut page = ScriptedPage {
        overlay_visible: true,
        ..ScriptedPage::default()
    }
    .with_trader(
        "down",
        TraderPage {
            fail_navigation: true,
            ..TraderPage::default()
        },
    )
    .with_trader("up", trader(&scenario_a_lines()));
    let notifier = RecordingNotifier::default();

    IterationController::new(&mut page, &notifier, options())
        .run_with_window(&ids(&["down", "up"]), &SymbolFilter::any(), &window())
        .await;

    assert_eq!(page.focus_steps.len(), DISMISS_SEQUENCE.len());
}

#[tokio::test]
async fn activation_and_snapshot_failures_are_not_fatal() {
    let mut page = ScriptedPage {
        fail_screenshot: true,
        ..ScriptedPage::default()
    }
    .with_trader(
        "alpha",
        TraderPage {
            fail_activation: true,
            ..trader(&scenario_a_lines())
        },
    );
    let notifier = RecordingNotifier::default();

    let result = IterationController::new(&mut page, &notifier, options())
        .run_with_window(&ids(&["alpha"]), &SymbolFilter::any(), &window())
        .await;

    assert_eq!(result.records(), 1);
    assert_eq!(page.activations, vec![options().active_view_label]);
    assert!(notifier.images.lock().unwrap().is_empty());
}

#[tokio::test]
async fn snapshots_can_be_disabled() {
    let mut page = ScriptedPage::default().with_trader("alpha", trader(&scenario_a_lines()));
    let notifier = RecordingNotifier::default();
    let opts = ControllerOptions {
        snapshots: false,
        ..options()
    };

    IterationController::new(&mut page, &notifier, opts)
        .run_with_window(&ids(&["alpha"]), &SymbolFilter::any(), &window())
        .await;

    assert!(notifier.images.lock().unwrap().is_empty());
}

#[tokio::test]
async fn run_rejects_invalid_hours() {
    let mut page = ScriptedPage::default();
    let notifier = NullNotifier;
    let params = RunParams {
        symbol_filter: SymbolFilter::any(),
        hours_threshold: 0.0,
    };

    let outcome = IterationController::new(&mut page, &notifier, options())
        .run(&ids(&["a"]), &params)
        .await;

    assert!(matches!(outcome, Err(WatchError::InvalidInput(_))));
    assert!(page.navigations.is_empty());
}

#[tokio::test]
async fn run_uses_current_time_window() {
    let now = Utc::now();
    let recent = (now - chrono::Duration::hours(1))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();
    let stale = (now - chrono::Duration::hours(30))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();
    let text = format!(
        "Ордер №\nETHUSDT\na\nb\nc\nd\n{recent}\n{ORDER_ID}\n\
         BTCUSDT\na\nb\nc\nd\ne\n{stale}\n{ORDER_ID}\nО Bitget"
    );
    let mut page = ScriptedPage::default().with_trader(
        "alpha",
        TraderPage {
            text,
            ..TraderPage::default()
        },
    );
    let notifier = NullNotifier;
    let params = RunParams {
        symbol_filter: SymbolFilter::any(),
        hours_threshold: 24.0,
    };

    let result = IterationController::new(&mut page, &notifier, options())
        .run(&ids(&["alpha"]), &params)
        .await
        .unwrap();

    assert_eq!(result.records(), 1);
    assert!(result.lines()[0].contains("ETHUSDT"));
}

// ─────────────────────── discovery ───────────────────────

#[tokio::test]
async fn discovery_walks_listing_pages() {
    let link = |id: &str| format!("/ru/copy-trading/trader/{id}/futures");
    let mut page = ScriptedPage {
        listing: vec![
            vec![link("t1"), "/ru/help".to_string(), link("t2")],
            vec![link("t2"), link("t3")],
            vec![link("t4")],
        ],
        ..ScriptedPage::default()
    };
    let options = DiscoverOptions {
        listing_url: "https://example.test/all".to_string(),
        settle: Duration::ZERO,
        ..DiscoverOptions::default()
    };

    let found = discover_traders(&mut page, &options).await.unwrap();
    assert_eq!(found, ids(&["t1", "t2", "t3", "t4"]));
    assert_eq!(page.navigations, vec!["https://example.test/all".to_string()]);
}

#[tokio::test]
async fn discovery_respects_page_limit() {
    let link = |id: &str| format!("/ru/copy-trading/trader/{id}/futures");
    let mut page = ScriptedPage {
        listing: vec![vec![link("t1")], vec![link("t2")], vec![link("t3")]],
        ..ScriptedPage::default()
    };
    let options = DiscoverOptions {
        max_pages: 2,
        settle: Duration::ZERO,
        ..DiscoverOptions::default()
    };

    let found = discover_traders(&mut page, &options).await.unwrap();
    assert_eq!(found, ids(&["t1", "t2"]));
    assert_eq!(page.listing_index, 1);
}

fn quick_discovery() -> DiscoverOptions {
    DiscoverOptions {
        settle: Duration::ZERO,
        ..DiscoverOptions::default()
    }
}

fn trader_link(id: &str) -> String {
    format!("/ru/copy-trading/trader/{id}/futures")
}

#[tokio::test]
async fn discovery_fails_when_listing_unreachable() {
    let mut page = ScriptedPage {
        listing: vec![vec![trader_link("t1")]],
        fail_listing_navigation: true,
        ..ScriptedPage::default()
    };

    let outcome = discover_traders(&mut page, &quick_discovery()).await;

    assert!(matches!(outcome, Err(WatchError::Navigation(_))));
    assert_eq!(page.listing_index, 0);
}

#[tokio::test]
async fn discovery_keeps_ids_when_advance_fails() {
    let mut page = ScriptedPage {
        listing: vec![vec![trader_link("t1")], vec![trader_link("t2")]],
        fail_advance: true,
        ..ScriptedPage::default()
    };

    let found = discover_traders(&mut page, &quick_discovery()).await.unwrap();

    assert_eq!(found, ids(&["t1"]));
    assert_eq!(page.listing_index, 0);
}

#[tokio::test]
async fn discovery_skips_unreadable_listing_page() {
    let mut page = ScriptedPage {
        listing: vec![
            vec![trader_link("t1")],
            vec![trader_link("t2")],
            vec![trader_link("t3")],
        ],
        fail_links_on_page: Some(1),
        ..ScriptedPage::default()
    };

    let found = discover_traders(&mut page, &quick_discovery()).await.unwrap();

    assert_eq!(found, ids(&["t1", "t3"]));
    assert_eq!(page.listing_index, 2);
}
