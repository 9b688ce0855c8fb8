//! One-shot handshake that dismisses the interstitial dialog.
//!
//! The dialog shows up on the first trader page of a session and stays
//! dismissed afterwards, so the handshake fires at most once per run.

use std::time::Duration;

use crate::page::{FocusStep, Page};

/// Keyboard sequence that ticks the consent box and confirms the dialog.
pub const DISMISS_SEQUENCE: [FocusStep; 5] = [
    FocusStep::FocusBody,
    FocusStep::Tab,
    FocusStep::Space,
    FocusStep::Tab,
    FocusStep::Enter,
];

/// Handshake state. Only ever moves from `Unhandled` to `Handled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Unhandled,
    Handled,
}

/// What a call to [`OverlayHandshake::run`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// The handshake had already fired earlier in the run.
    Skipped,
    /// The dialog appeared and the dismiss sequence was sent.
    Dismissed,
    /// The dialog never appeared within the timeout.
    NotShown,
}

#[derive(Debug, Clone)]
pub struct OverlayOptions {
    /// CSS selector of the blocking dialog.
    pub selector: String,
    /// How long to wait for the dialog to appear.
    pub timeout: Duration,
    /// Pause after each focus step.
    pub step_pause: Duration,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            selector: "div[role=\"dialog\"]".to_string(),
            timeout: Duration::from_secs(10),
            step_pause: Duration::from_millis(500),
        }
    }
}

#[derive(Debug)]
pub struct OverlayHandshake {
    state: HandshakeState,
    options: OverlayOptions,
}

impl OverlayHandshake {
    /// Create a handshake in the `Unhandled` state.
    pub fn new(options: OverlayOptions) -> Self {
        Self {
            state: HandshakeState::Unhandled,
            options,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn is_handled(&self) -> bool {
        self.state == HandshakeState::Handled
    }

    /// Run the handshake against the current page.
    ///
    /// Marks the state `Handled` whether or not the dialog appeared; focus
    /// step failures are logged and do not stop the sequence.
    pub async fn run(&mut self, page: &mut dyn Page) -> HandshakeOutcome {
        if self.is_handled() {
            return HandshakeOutcome::Skipped;
        }
        self.state = HandshakeState::Handled;

        if !page
            .is_overlay_visible(&self.options.selector, self.options.timeout)
            .await
        {
            tracing::info!(
                "overlay not shown within {}ms, continuing without it",
                self.options.timeout.as_millis()
            );
            return HandshakeOutcome::NotShown;
        }

        tracing::info!("overlay detected, sending dismiss sequence");
        for step in DISMISS_SEQUENCE {
            if let Err(e) = page.perform_focus_step(step).await {
                tracing::warn!("overlay focus step {step:?} failed: {e}");
            }
            if !self.options.step_pause.is_zero() {
                tokio::time::sleep(self.options.step_pause).await;
            }
        }
        HandshakeOutcome::Dismissed
    }
}

impl Default for OverlayHandshake {
    fn default() -> Self {
        Self::new(OverlayOptions::default())
    }
}
