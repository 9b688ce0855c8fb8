//! Trader discovery: walk the paginated copy-trading listing and collect
//! trader identifiers from profile links.

use std::time::Duration;

use crate::ids::{dedup_ordered, ids_from_links};
use crate::page::Page;
use crate::types::WatchResult;

#[derive(Debug, Clone)]
pub struct DiscoverOptions {
    pub listing_url: String,
    /// Maximum number of listing pages to read.
    pub max_pages: usize,
    pub navigation_timeout: Duration,
    /// Wait after loading or advancing a page before reading it.
    pub settle: Duration,
}

impl Default for DiscoverOptions {
    fn default() -> Self {
        Self {
            listing_url: "https://www.bitget.com/ru/copy-trading/futures/all".to_string(),
            max_pages: 10,
            navigation_timeout: Duration::from_secs(30),
            settle: Duration::from_secs(2),
        }
    }
}

/// Collect trader identifiers from up to `max_pages` listing pages.
///
/// Only the initial navigation is fatal; a failed page advance ends the walk
/// with whatever was collected so far.
pub async fn discover_traders(page: &mut dyn Page, options: &DiscoverOptions) -> WatchResult<Vec<String>> {
    page.navigate(&options.listing_url, options.navigation_timeout)
        .await?;
    settle(options.settle).await;

    let mut collected = Vec::new();
    for page_no in 1..=options.max_pages {
        match page.anchor_hrefs().await {
            Ok(hrefs) => {
                let ids = ids_from_links(hrefs.iter().map(String::as_str));
                tracing::info!("listing page {page_no}: {} trader link(s)", ids.len());
                collected.extend(ids);
            }
            Err(e) => tracing::warn!("listing page {page_no}: failed to read links: {e}"),
        }

        if page_no == options.max_pages {
            break;
        }
        match page.advance_listing_page().await {
            Ok(true) => settle(options.settle).await,
            Ok(false) => {
                tracing::info!("no further listing pages after page {page_no}");
                break;
            }
            Err(e) => {
                tracing::warn!("failed to open listing page {}: {e}", page_no + 1);
                break;
            }
        }
    }

    Ok(dedup_ordered(collected))
}

async fn settle(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
