//! Core data types shared by the parser, filter and controller.

use chrono::{DateTime, Duration, Utc};

/// A validated order record that passed every filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// All lines of the source block joined with single spaces.
    pub text: String,
    /// Block date as seconds since the Unix epoch (UTC).
    pub unix_timestamp: i64,
}

/// Inclusive lower bound on record age, fixed once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    now: DateTime<Utc>,
    threshold: DateTime<Utc>,
}

impl TimeWindow {
    /// Build a window reaching `hours` back from `now`.
    ///
    /// Fractional hours are honoured down to the millisecond.
    pub fn new(now: DateTime<Utc>, hours: f64) -> WatchResult<Self> {
        if !hours.is_finite() || hours <= 0.0 {
            return Err(WatchError::InvalidInput(format!(
                "hours threshold must be a positive number, got {hours}"
            )));
        }
        let span = Duration::try_milliseconds((hours * 3_600_000.0).round() as i64)
            .ok_or_else(|| WatchError::InvalidInput(format!("hours threshold too large: {hours}")))?;
        let threshold = now
            .checked_sub_signed(span)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Ok(Self { now, threshold })
    }

    /// Window anchored at the current wall clock.
    pub fn ending_now(hours: f64) -> WatchResult<Self> {
        Self::new(Utc::now(), hours)
    }

    /// The instant the window was computed at.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// `now - hours`; records at exactly this instant are admitted.
    pub fn threshold(&self) -> DateTime<Utc> {
        self.threshold
    }

    pub fn admits(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.threshold
    }
}

/// Optional case-sensitive substring required on a block's first line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolFilter(Option<String>);

impl SymbolFilter {
    pub fn new(symbol: Option<String>) -> Self {
        Self(symbol.filter(|s| !s.is_empty()))
    }

    /// A filter that accepts every block.
    pub fn any() -> Self {
        Self(None)
    }

    pub fn symbol(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn accepts(&self, first_line: &str) -> bool {
        match &self.0 {
            Some(symbol) => first_line.contains(symbol.as_str()),
            None => true,
        }
    }
}

impl From<Option<&str>> for SymbolFilter {
    fn from(symbol: Option<&str>) -> Self {
        Self::new(symbol.map(str::to_string))
    }
}

/// Parameters of a single scan run.
#[derive(Debug, Clone)]
pub struct RunParams {
    pub symbol_filter: SymbolFilter,
    pub hours_threshold: f64,
}

/// Errors raised by the core and its collaborators.
#[derive(thiserror::Error, Debug)]
pub enum WatchError {
    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Timed out after {0}ms")]
    Timeout(u64),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Page error: {0}")]
    Page(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type WatchResult<T> = Result<T, WatchError>;
