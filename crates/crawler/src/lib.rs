use browser::{BrowserError, PageSession};
use catalog::{CrawlerSettings, Product, Violation};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, info_span, warn};

pub mod collector;
mod listing;
mod pacing;
mod price;

pub use listing::{ExtractorError, ItemParseError, ListingExtractor, ScrapedItem, SelectorExtractor};
pub use pacing::{Pacer, Pacing};
pub use price::extract_price;

pub const RESULTS_TIMEOUT: Duration = Duration::from_secs(10);
pub const SCROLL_STEPS: u32 = 3;
pub const SCROLL_DISTANCE_PX: u32 = 1000;
pub const UNKNOWN_SELLER: &str = "unknown";
const DEFAULT_SCROLL_PAUSE: Duration = Duration::from_secs(1);

// Unreserved characters plus '/', left as-is in the query value.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub search_url: String,
    pub results_timeout: Duration,
    pub scroll_steps: u32,
    pub scroll_distance: u32,
    pub scroll_pause: Duration,
}

impl CrawlSettings {
    pub fn from_config(settings: &CrawlerSettings) -> Self {
        Self {
            search_url: settings.search_url.clone(),
            scroll_pause: Duration::try_from_secs_f64(settings.scroll_pause_secs)
                .unwrap_or(DEFAULT_SCROLL_PAUSE),
            ..Self::default()
        }
    }
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            search_url: catalog::DEFAULT_SEARCH_URL.to_string(),
            results_timeout: RESULTS_TIMEOUT,
            scroll_steps: SCROLL_STEPS,
            scroll_distance: SCROLL_DISTANCE_PX,
            scroll_pause: DEFAULT_SCROLL_PAUSE,
        }
    }
}

/// A brand-matched listing with a usable price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawListing {
    pub title: String,
    pub seller: String,
    pub price: u64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    CaptchaDetected,
    ResultsTimeout,
    Browser(String),
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::CaptchaDetected => write!(f, "captcha detected"),
            AbortReason::ResultsTimeout => write!(f, "search results did not appear"),
            AbortReason::Browser(e) => write!(f, "browser error: {}", e),
        }
    }
}

/// Result of crawling one product. Aborts are not errors: the run
/// moves on to the next product either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlOutcome {
    Listings(Vec<RawListing>),
    Aborted(AbortReason),
}

#[derive(Debug, Default)]
pub struct CrawlSummary {
    pub violations: Vec<Violation>,
    pub products_crawled: usize,
    pub products_aborted: usize,
    pub listings_matched: usize,
}

pub struct PageCrawler<'a, S: PageSession, E: ListingExtractor, P: Pacing = Pacer> {
    session: &'a S,
    extractor: E,
    pacer: P,
    settings: CrawlSettings,
}

impl<'a, S: PageSession, E: ListingExtractor, P: Pacing> PageCrawler<'a, S, E, P> {
    pub fn new(session: &'a S, extractor: E, pacer: P, settings: CrawlSettings) -> Self {
        Self {
            session,
            extractor,
            pacer,
            settings,
        }
    }

    pub fn search_url(&self, keyword: &str) -> String {
        format!(
            "{}?query={}",
            self.settings.search_url,
            utf8_percent_encode(keyword, QUERY_VALUE)
        )
    }

    pub fn crawl_product(&self, product: &Product) -> CrawlOutcome {
        let span = info_span!("crawl_product", brand = %product.brand, name = %product.name);
        let _guard = span.enter();

        let url = self.search_url(&product.search_keyword);
        info!("Searching: {} ({})", product.name, product.brand);

        if let Err(e) = self.session.navigate(&url) {
            return CrawlOutcome::Aborted(AbortReason::Browser(e.to_string()));
        }

        self.pacer.pause();

        if self.challenge_present() {
            return CrawlOutcome::Aborted(AbortReason::CaptchaDetected);
        }

        match self
            .session
            .wait_for_selector(self.extractor.results_selector(), self.settings.results_timeout)
        {
            Ok(()) => {}
            Err(BrowserError::Timeout(e)) => {
                debug!("Results wait failed: {}", e);
                return CrawlOutcome::Aborted(AbortReason::ResultsTimeout);
            }
            Err(e) => return CrawlOutcome::Aborted(AbortReason::Browser(e.to_string())),
        }

        for _ in 0..self.settings.scroll_steps {
            if let Err(e) = self.session.scroll_by(self.settings.scroll_distance) {
                return CrawlOutcome::Aborted(AbortReason::Browser(e.to_string()));
            }
            if !self.settings.scroll_pause.is_zero() {
                std::thread::sleep(self.settings.scroll_pause);
            }
        }

        let html = match self.session.page_content() {
            Ok(html) => html,
            Err(e) => return CrawlOutcome::Aborted(AbortReason::Browser(e.to_string())),
        };

        let listings = self
            .extractor
            .extract_items(&html, &url)
            .into_iter()
            .filter_map(|item| match item {
                Ok(item) => to_listing(product, item),
                Err(e) => {
                    debug!("Skipping listing: {}", e);
                    None
                }
            })
            .collect::<Vec<_>>();

        debug!("{} listings matched brand {}", listings.len(), product.brand);
        CrawlOutcome::Listings(listings)
    }

    /// Crawls every product in order with pacing between them. No product
    /// failure escapes; aborted products contribute no violations.
    pub fn crawl_all_products<F>(&self, products: &[Product], mut on_progress: F) -> CrawlSummary
    where
        F: FnMut(usize, &Product),
    {
        let mut summary = CrawlSummary::default();

        for (i, product) in products.iter().enumerate() {
            info!("Progress: {}/{}", i + 1, products.len());
            on_progress(i, product);

            match self.crawl_product(product) {
                CrawlOutcome::Listings(listings) => {
                    summary.products_crawled += 1;
                    summary.listings_matched += listings.len();

                    for listing in &listings {
                        if let Some(violation) = collector::evaluate(product, listing) {
                            warn!(
                                "MAP violation: {} - {} (MAP: {})",
                                violation.seller, violation.price, violation.map_price
                            );
                            summary.violations.push(violation);
                        }
                    }
                }
                CrawlOutcome::Aborted(AbortReason::CaptchaDetected) => {
                    summary.products_aborted += 1;
                    warn!("Captcha detected, skipping {}", product.name);
                }
                CrawlOutcome::Aborted(reason) => {
                    summary.products_aborted += 1;
                    error!("Crawl failed for {}: {}", product.name, reason);
                }
            }

            if i + 1 < products.len() {
                self.pacer.pause();
            }
        }

        summary
    }

    fn challenge_present(&self) -> bool {
        match self.session.page_content() {
            Ok(html) => self.extractor.is_challenge_page(&html),
            Err(e) => {
                debug!("Challenge check failed: {}", e);
                false
            }
        }
    }
}

fn to_listing(product: &Product, item: ScrapedItem) -> Option<RawListing> {
    if !item.title.contains(&product.brand) {
        return None;
    }

    let price = match item.price_text.as_deref().and_then(extract_price) {
        Some(price) if price > 0 => price,
        _ => {
            debug!("No usable price for \"{}\"", item.title);
            return None;
        }
    };

    Some(RawListing {
        title: item.title,
        seller: item.seller.unwrap_or_else(|| UNKNOWN_SELLER.to_string()),
        price,
        url: item.url.unwrap_or_default(),
    })
}
