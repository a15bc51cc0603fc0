//! Page fetching and the deep-read stage.
//!
//! This crate provides:
//! - [`fetcher`]: the [`PageFetcher`] collaborator trait and its HTTP implementation
//! - [`deep_read`]: batched, rate-limited enrichment of the highest-priority pages

pub mod deep_read;
pub mod fetcher;

pub use deep_read::{
    BATCH_DELAY, DEEP_READ_BATCH_SIZE, DEFAULT_MAX_DEEP_READ, DeepReadOptions, deep_read,
    select_for_deep_read,
};
pub use fetcher::{FetchedContent, HttpPageFetcher, PageFetcher};
