//! Record validation and time-window filtering.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::parser::Block;
use crate::types::{Record, SymbolFilter, TimeWindow};

/// Every valid order block mentions the quote currency.
pub const QUOTE_MARKER: &str = "USDT";

/// Zero-based line index that holds the order date.
///
/// The page carries no field labels, so this position is the only way to
/// find the date. A layout change on the page shifts it silently.
pub const DATE_LINE_INDEX: usize = 6;

/// Format of the order date line.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse an order date. Dates are interpreted as UTC.
pub fn parse_order_date(token: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(token.trim(), DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Validate a single block. `None` means the block was rejected.
pub fn validate_block(block: &Block, symbol: &SymbolFilter, window: &TimeWindow) -> Option<Record> {
    let text = block.joined();
    if !text.contains(QUOTE_MARKER) {
        return None;
    }

    if !symbol.accepts(block.first_line().unwrap_or_default()) {
        return None;
    }

    let Some(token) = block.line(DATE_LINE_INDEX) else {
        tracing::debug!("block has no line {DATE_LINE_INDEX}, discarding: {text}");
        return None;
    };
    let Some(date) = parse_order_date(token) else {
        tracing::debug!("unparseable order date {token:?}, discarding block");
        return None;
    };

    if !window.admits(date) {
        return None;
    }

    Some(Record {
        text,
        unix_timestamp: date.timestamp(),
    })
}

/// Validate and filter blocks, preserving their order.
pub fn filter_records(blocks: &[Block], symbol: &SymbolFilter, window: &TimeWindow) -> Vec<Record> {
    blocks
        .iter()
        .filter_map(|block| validate_block(block, symbol, window))
        .collect()
}
