//! Page abstraction for the browser session driven by the controller.
//!
//! Defines the `Page` trait that hides the browser engine. The concrete
//! Chromium implementation lives in the CLI crate; tests use scripted pages.

use async_trait::async_trait;
use std::time::Duration;

use crate::types::WatchResult;

/// One keyboard step of the overlay dismissal sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusStep {
    /// Move keyboard focus into the document body.
    FocusBody,
    /// Advance focus to the next focusable element.
    Tab,
    /// Toggle the focused control (checkbox).
    Space,
    /// Activate the focused control (confirm button).
    Enter,
}

impl FocusStep {
    /// DOM `KeyboardEvent.key` name, if the step is a key press.
    pub fn key(&self) -> Option<&'static str> {
        match self {
            FocusStep::FocusBody => None,
            FocusStep::Tab => Some("Tab"),
            FocusStep::Space => Some(" "),
            FocusStep::Enter => Some("Enter"),
        }
    }
}

/// A single browser tab reused for the whole run.
#[async_trait]
pub trait Page: Send {
    /// Navigate to a URL and wait for the load to finish.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> WatchResult<()>;

    /// The rendered, human-visible text of the page body.
    async fn visible_text(&mut self) -> WatchResult<String>;

    /// Wait up to `timeout` for an element matching `selector` to be visible.
    async fn is_overlay_visible(&mut self, selector: &str, timeout: Duration) -> bool;

    /// Perform one keyboard focus step.
    async fn perform_focus_step(&mut self, step: FocusStep) -> WatchResult<()>;

    /// Find a clickable element whose text equals `label` and click it.
    async fn locate_and_activate(&mut self, label: &str, timeout: Duration) -> WatchResult<()>;

    /// Capture a PNG screenshot.
    async fn screenshot(&mut self, full_page: bool) -> WatchResult<Vec<u8>>;

    /// `href` attributes of every anchor on the page.
    async fn anchor_hrefs(&mut self) -> WatchResult<Vec<String>>;

    /// Go to the next page of a paginated listing.
    ///
    /// Returns `Ok(false)` when there is no next page.
    async fn advance_listing_page(&mut self) -> WatchResult<bool>;
}
