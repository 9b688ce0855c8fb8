//! Block parser: turns rendered page text into candidate order blocks.
//!
//! The order list is bracketed by [`START_MARKER`] and [`END_MARKER`]. Inside
//! that slice every order ends with its 19-digit order number, which closes
//! the block.

/// First line of the order list.
pub const START_MARKER: &str = "Ордер №";

/// Footer line that follows the order list.
pub const END_MARKER: &str = "О Bitget";

/// Length of the numeric order identifier that terminates a block.
const TERMINATOR_DIGITS: usize = 19;

/// A candidate order record: consecutive lines up to and including the
/// terminator line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    lines: Vec<String>,
}

impl Block {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn first_line(&self) -> Option<&str> {
        self.lines.first().map(String::as_str)
    }

    /// Line at a zero-based position, if present.
    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// All lines joined with single spaces.
    pub fn joined(&self) -> String {
        self.lines.join(" ")
    }
}

/// Split rendered page text into trimmed, non-empty lines.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// True for a line of exactly 19 ASCII digits.
pub fn is_terminator(line: &str) -> bool {
    line.len() == TERMINATOR_DIGITS && line.bytes().all(|b| b.is_ascii_digit())
}

/// Parse blocks using the default Bitget markers.
pub fn parse_blocks<S: AsRef<str>>(lines: &[S]) -> Vec<Block> {
    parse_blocks_between(lines, START_MARKER, END_MARKER)
}

/// Parse blocks from the slice starting at the first `start` line and ending
/// before the first `end` line that follows it.
///
/// A missing `start` yields no blocks. A missing `end` extends the slice to
/// the end of input. Lines after the last terminator are dropped.
pub fn parse_blocks_between<S: AsRef<str>>(lines: &[S], start: &str, end: &str) -> Vec<Block> {
    let Some(start_idx) = lines.iter().position(|l| l.as_ref() == start) else {
        return Vec::new();
    };

    let slice_end = lines[start_idx + 1..]
        .iter()
        .position(|l| l.as_ref() == end)
        .map(|offset| start_idx + 1 + offset)
        .unwrap_or(lines.len());

    let mut blocks = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in &lines[start_idx..slice_end] {
        let line = line.as_ref();
        current.push(line.to_string());
        if is_terminator(line) {
            blocks.push(Block::new(std::mem::take(&mut current)));
        }
    }

    if !current.is_empty() {
        tracing::debug!(
            "discarding {} trailing line(s) without an order number",
            current.len()
        );
    }

    blocks
}
