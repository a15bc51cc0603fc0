//! Core pipeline orchestration and domain logic for the site inventory.
//!
//! This crate ties discovery, filtering, classification and deep-reads into
//! one end-to-end run ([`InventoryPipeline::build_inventory`]).

pub mod classifier;
pub mod filter;
pub mod pipeline;
pub mod search;
pub mod semantic;

pub use classifier::{CLASSIFICATION_CAP, ContentClassifier, content_type_for_path};
pub use filter::{DENIED_SECTIONS, DENYLIST, dedupe_paths, filter_urls, is_content_url};
pub use pipeline::{InventoryOptions, InventoryPipeline, ProgressReporter, SilentProgress};
pub use search::FetcherSiteSearch;
pub use semantic::{
    ClassificationRequest, ClassificationService, OpenRouterClassifier, build_prompt,
};
