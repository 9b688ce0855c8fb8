//! Trader identifier lists: loading, link extraction and writing.

use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::types::WatchResult;

fn trader_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"copy-trading/trader/([^/]+?)/futures").expect("trader link regex is valid")
    })
}

/// Drop duplicates while keeping the first occurrence of each identifier.
pub fn dedup_ordered<I>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Parse an identifier list: one per line, blanks ignored, duplicates removed.
pub fn parse_ids(text: &str) -> Vec<String> {
    dedup_ordered(
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string),
    )
}

/// Read an identifier list from disk.
pub fn load_ids(path: &Path) -> WatchResult<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_ids(&text))
}

/// Write identifiers one per line.
pub fn write_ids(path: &Path, ids: &[String]) -> WatchResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, ids.join("\n"))?;
    Ok(())
}

/// Extract the trader identifier from a copy-trading profile link.
pub fn extract_trader_id(href: &str) -> Option<&str> {
    trader_link_regex()
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Extract identifiers from a list of links, in order, without duplicates.
pub fn ids_from_links<'a, I>(links: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    dedup_ordered(
        links
            .into_iter()
            .filter_map(extract_trader_id)
            .map(str::to_string),
    )
}
