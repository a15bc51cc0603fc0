//! End-to-end inventory pipeline: domain → discovery → filter → classify → deep-read.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use siteinventory_crawler::{DeepReadOptions, HttpPageFetcher, PageFetcher, deep_read};
use siteinventory_discovery::{ResolverOptions, SiteSearch, SitemapResolver, discover_via_search};
use siteinventory_shared::{
    AppConfig, DiscoverySource, Inventory, Result, RunStatistics, openrouter_api_key, origin_for,
};

use crate::classifier::{CLASSIFICATION_CAP, ContentClassifier};
use crate::filter::{dedupe_paths, filter_urls};
use crate::search::FetcherSiteSearch;
use crate::semantic::OpenRouterClassifier;

/// Default timeout for the site-search call.
const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-run options.
#[derive(Debug, Clone)]
pub struct InventoryOptions {
    /// Upper bound on URLs taken from discovery.
    pub max_urls: usize,
    /// Upper bound on pages deep-read.
    pub max_deep_read: usize,
    pub skip_deep_read: bool,
}

impl Default for InventoryOptions {
    fn default() -> Self {
        Self {
            max_urls: 500,
            max_deep_read: 15,
            skip_deep_read: false,
        }
    }
}

impl From<&AppConfig> for InventoryOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_urls: config.inventory.max_urls,
            max_deep_read: config.inventory.max_deep_read,
            skip_deep_read: config.inventory.skip_deep_read,
        }
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once with the final inventory.
    fn done(&self, inventory: &Inventory);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _inventory: &Inventory) {}
}

// ---------------------------------------------------------------------------
// InventoryPipeline
// ---------------------------------------------------------------------------

/// Wires the pipeline stages to their collaborators.
///
/// Holds no per-run state: concurrent runs for different domains are
/// independent.
pub struct InventoryPipeline {
    resolver: SitemapResolver,
    search: Arc<dyn SiteSearch>,
    classifier: ContentClassifier,
    fetcher: Arc<dyn PageFetcher>,
    search_timeout: Duration,
    deep_read: DeepReadOptions,
}

impl InventoryPipeline {
    pub fn new(
        resolver: SitemapResolver,
        search: Arc<dyn SiteSearch>,
        classifier: ContentClassifier,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Self {
        Self {
            resolver,
            search,
            classifier,
            fetcher,
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
            deep_read: DeepReadOptions::default(),
        }
    }

    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = timeout;
        self
    }

    /// Batch size, pause and fetch timeout for deep-reads. `max_pages` is
    /// taken from [`InventoryOptions`] on each run.
    pub fn with_deep_read_options(mut self, opts: DeepReadOptions) -> Self {
        self.deep_read = opts;
        self
    }

    /// Build the HTTP-backed pipeline described by `config`.
    ///
    /// With `use_ai` set and an API key present, classification goes through
    /// OpenRouter first; otherwise only the pattern strategy runs.
    pub fn from_config(config: &AppConfig, use_ai: bool) -> Result<Self> {
        let timeouts = &config.timeouts;

        let resolver = SitemapResolver::new(&ResolverOptions {
            timeout_secs: timeouts.sitemap_secs,
        })?;
        let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpPageFetcher::new(timeouts.fetch_secs)?);
        let search = Arc::new(FetcherSiteSearch::new(
            Arc::clone(&fetcher),
            config.search.endpoint.clone(),
        )?);

        let classify_timeout = Duration::from_secs(timeouts.classify_secs);
        let classifier = match (use_ai, openrouter_api_key(config)) {
            (true, Some(key)) => {
                let service = OpenRouterClassifier::new(
                    key,
                    config.openrouter.model.clone(),
                    timeouts.classify_secs,
                )?;
                ContentClassifier::new(Arc::new(service), classify_timeout)
            }
            (true, None) => {
                warn!(
                    env = %config.openrouter.api_key_env,
                    "no OpenRouter API key set, using pattern classification only"
                );
                ContentClassifier::pattern_only()
            }
            (false, _) => ContentClassifier::pattern_only(),
        };

        Ok(Self::new(resolver, search, classifier, fetcher)
            .with_search_timeout(Duration::from_secs(timeouts.search_secs))
            .with_deep_read_options(DeepReadOptions {
                fetch_timeout: Duration::from_secs(timeouts.fetch_secs),
                ..DeepReadOptions::default()
            }))
    }

    /// Build a full inventory snapshot for `domain`.
    ///
    /// Every stage recovers from its own failures, so a reachable-or-not
    /// domain always yields an inventory; the worst case is
    /// [`Inventory::empty`]. `Err` is returned only for a malformed domain.
    #[instrument(skip_all, fields(domain = %domain))]
    pub async fn build_inventory(
        &self,
        domain: &str,
        options: &InventoryOptions,
        progress: &dyn ProgressReporter,
    ) -> Result<Inventory> {
        let start = Instant::now();
        origin_for(domain)?;

        info!(
            max_urls = options.max_urls,
            max_deep_read = options.max_deep_read,
            skip_deep_read = options.skip_deep_read,
            "starting inventory"
        );

        // --- Phase 1: Discovery ---
        progress.phase("Resolving sitemap");
        let mut discovered = self.resolver.resolve(domain, options.max_urls).await;
        let mut source = DiscoverySource::Sitemap;

        if discovered.is_empty() {
            progress.phase("Searching for pages");
            discovered = discover_via_search(self.search.as_ref(), domain, self.search_timeout).await;
            discovered.truncate(options.max_urls);
            source = DiscoverySource::FallbackSearch;
        }

        if discovered.is_empty() {
            info!("no pages discovered");
            let inventory = Inventory::empty();
            progress.done(&inventory);
            return Ok(inventory);
        }
        let urls_found = discovered.len();

        // --- Phase 2: Filter ---
        // Dedupe by path first so trailing-slash variants don't spend cap slots.
        let mut candidates = dedupe_paths(filter_urls(discovered));
        if candidates.len() > CLASSIFICATION_CAP {
            debug!(
                candidates = candidates.len(),
                cap = CLASSIFICATION_CAP,
                "capping classification input"
            );
            candidates.truncate(CLASSIFICATION_CAP);
        }

        // --- Phase 3: Classify ---
        progress.phase("Classifying pages");
        let mut pages = self.classifier.classify(domain, &candidates).await;
        let pages_classified = pages.len();

        // --- Phase 4: Deep-read ---
        if !options.skip_deep_read && options.max_deep_read > 0 && !pages.is_empty() {
            progress.phase("Reading top pages");
            let opts = DeepReadOptions {
                max_pages: options.max_deep_read,
                ..self.deep_read.clone()
            };
            pages = deep_read(domain, pages, self.fetcher.as_ref(), &opts).await;
        }
        let pages_deep_read = pages.iter().filter(|p| p.is_deep_read()).count();

        let inventory = Inventory {
            pages,
            stats: RunStatistics {
                urls_found,
                pages_classified,
                pages_deep_read,
                discovery_source: source,
            },
        };

        info!(
            urls_found,
            candidates = candidates.len(),
            pages_classified,
            pages_deep_read,
            source = %source,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "inventory complete"
        );

        progress.done(&inventory);
        Ok(inventory)
    }
}
