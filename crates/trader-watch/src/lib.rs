//! Trader Watch — order extraction and time-window filtering for
//! copy-trading trader pages.

pub mod controller;
pub mod discover;
pub mod filter;
pub mod ids;
pub mod notify;
pub mod overlay;
pub mod page;
pub mod parser;
pub mod types;

pub use controller::{ControllerOptions, EntityFailure, EntityOutcome, IterationController, RunResult};
pub use discover::{discover_traders, DiscoverOptions};
pub use filter::{filter_records, parse_order_date, validate_block};
pub use ids::{extract_trader_id, ids_from_links, load_ids, parse_ids, write_ids};
pub use notify::{NullNotifier, Notifier};
pub use overlay::{HandshakeOutcome, HandshakeState, OverlayHandshake, OverlayOptions};
pub use page::{FocusStep, Page};
pub use parser::{parse_blocks, split_lines, Block};
pub use types::*;
