//! Incremental scraper for paginated badge award listings.
//!
//! A crawl walks `/help/badges/{id}?page=N` one page at a time, merges every
//! parsed row into a deduplicated [`store::BadgeStore`], and the store can be
//! persisted and restored between runs. Grouping and bucketing turn a store into
//! per-election participation timelines.

mod macros;

pub mod bucket;
pub mod cli;
pub mod diag;
pub mod election;
mod error;
pub mod group;
pub mod parse;
pub mod process;
pub mod record;
pub mod request;
pub mod snapshot;
pub mod store;

pub use error::{Error, FetchError, ParseError, Result};

/// Minimum pause before every page request.
pub const REQUEST_INTERVAL_MS: u64 = 500;
pub const DEFAULT_SCHEME: &str = "https";
pub const DEFAULT_HOST: &str = "stackoverflow.com";
pub const DEFAULT_DATA_DIR: &str = "data";
/// Pause between rounds in loop-forever mode.
pub const FOREVER_SLEEP_SECS: u64 = 5 * 60;
pub const HOUR_SECS: i64 = 60 * 60;
pub const DAY_SECS: i64 = 24 * HOUR_SECS;
/// Legacy election window length, measured from the first award.
pub const LEGACY_WINDOW_DAYS: i64 = 15;
pub const USER_AGENT: &str = concat!("badge_scrap/", env!("CARGO_PKG_VERSION"));
