use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

mod violation;

pub use violation::{Violation, TIMESTAMP_FORMAT};

pub const DEFAULT_SEARCH_URL: &str = "https://search.shopping.naver.com/search/all";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// A catalog entry the monitor searches for. Built once at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub brand: String,
    pub name: String,
    pub map_price: u64,
    pub search_keyword: String,
}

/// Upper bound for any configured pause, in seconds.
pub const MAX_DELAY_SECS: f64 = 3600.0;

/// Pacing delay bounds in seconds. Only constructible through
/// [`DelayRange::new`], which validates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DelayRange {
    min: f64,
    max: f64,
}

impl DelayRange {
    pub fn new(min: f64, max: f64) -> Result<Self, ConfigError> {
        validate_secs("crawler.delay_range.min", min)?;
        validate_secs("crawler.delay_range.max", max)?;
        if min > max {
            return Err(ConfigError::Invalid(format!(
                "crawler.delay_range min ({}) exceeds max ({})",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self { min: 2.0, max: 5.0 }
    }
}

fn validate_secs(field: &str, secs: f64) -> Result<(), ConfigError> {
    if !secs.is_finite() || !(0.0..=MAX_DELAY_SECS).contains(&secs) {
        return Err(ConfigError::Invalid(format!(
            "{} must be between 0 and {} seconds, got {}",
            field, MAX_DELAY_SECS, secs
        )));
    }
    Ok(())
}

/// CSS selectors for the search result page. Markup changes on the
/// target site only ever touch this set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorSet {
    pub challenge: String,
    pub challenge_frame: String,
    pub item: String,
    pub title: String,
    pub seller: String,
    pub price: String,
    pub link: String,
}

impl Default for SelectorSet {
    fn default() -> Self {
        Self {
            challenge: ".captcha".to_string(),
            challenge_frame: "iframe[title='reCAPTCHA']".to_string(),
            item: ".basicList_item__0T9JD".to_string(),
            title: ".basicList_title__VfX3c".to_string(),
            seller: ".basicList_mall__BC5Xu".to_string(),
            price: ".price_num__S2p_v".to_string(),
            link: ".basicList_link__JLQJf".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlerSettings {
    pub delay_range: DelayRange,
    pub user_agent: String,
    pub headless: bool,
    pub search_url: String,
    pub scroll_pause_secs: f64,
    pub selectors: SelectorSet,
}

impl Default for CrawlerSettings {
    fn default() -> Self {
        Self {
            delay_range: DelayRange::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headless: false,
            search_url: DEFAULT_SEARCH_URL.to_string(),
            scroll_pause_secs: 1.0,
            selectors: SelectorSet::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigDocument {
    products: Vec<BrandGroup>,
    #[serde(default)]
    n8n: WebhookSection,
    #[serde(default)]
    crawler: CrawlerSection,
}

/// The `crawler` section as written, before its pauses are checked.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct CrawlerSection {
    delay_range: DelayBounds,
    user_agent: String,
    headless: bool,
    search_url: String,
    scroll_pause_secs: f64,
    selectors: SelectorSet,
}

#[derive(Debug, Deserialize)]
struct DelayBounds {
    min: f64,
    max: f64,
}

impl Default for CrawlerSection {
    fn default() -> Self {
        let defaults = CrawlerSettings::default();
        Self {
            delay_range: DelayBounds {
                min: defaults.delay_range.min,
                max: defaults.delay_range.max,
            },
            user_agent: defaults.user_agent,
            headless: defaults.headless,
            search_url: defaults.search_url,
            scroll_pause_secs: defaults.scroll_pause_secs,
            selectors: defaults.selectors,
        }
    }
}

impl CrawlerSection {
    fn into_settings(self) -> Result<CrawlerSettings, ConfigError> {
        let delay_range = DelayRange::new(self.delay_range.min, self.delay_range.max)?;
        validate_secs("crawler.scroll_pause_secs", self.scroll_pause_secs)?;
        Ok(CrawlerSettings {
            delay_range,
            user_agent: self.user_agent,
            headless: self.headless,
            search_url: self.search_url,
            scroll_pause_secs: self.scroll_pause_secs,
            selectors: self.selectors,
        })
    }
}

#[derive(Debug, Deserialize)]
struct BrandGroup {
    brand: String,
    items: Vec<ItemEntry>,
}

#[derive(Debug, Deserialize)]
struct ItemEntry {
    name: String,
    map_price: u64,
    #[serde(default)]
    search_keyword: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookSection {
    #[serde(default)]
    webhook_url: Option<String>,
}

/// Read-only view of the monitor configuration document.
#[derive(Debug, Clone)]
pub struct Config {
    products: Vec<Product>,
    webhook_url: String,
    crawler: CrawlerSettings,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
            _ => ConfigError::Io(e),
        })?;

        let config = Self::from_json(&json)?;
        info!(
            "Configuration loaded from {} ({} products)",
            path.display(),
            config.products.len()
        );
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let document: ConfigDocument = serde_json::from_str(json)?;
        let crawler = document.crawler.into_settings()?;

        let products = flatten_products(document.products)?;
        debug!("Flattened {} products from configuration", products.len());

        Ok(Self {
            products,
            webhook_url: document.n8n.webhook_url.unwrap_or_default(),
            crawler,
        })
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Webhook endpoint, or `None` when delivery is disabled.
    pub fn webhook_url(&self) -> Option<&str> {
        let url = self.webhook_url.trim();
        if url.is_empty() {
            None
        } else {
            Some(url)
        }
    }

    pub fn delay_range(&self) -> DelayRange {
        self.crawler.delay_range
    }

    pub fn user_agent(&self) -> &str {
        &self.crawler.user_agent
    }

    pub fn crawler(&self) -> &CrawlerSettings {
        &self.crawler
    }
}

fn flatten_products(groups: Vec<BrandGroup>) -> Result<Vec<Product>, ConfigError> {
    let mut products = Vec::new();

    for group in groups {
        if group.brand.trim().is_empty() {
            return Err(ConfigError::Invalid("brand must not be empty".to_string()));
        }

        for item in group.items {
            if item.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "product name must not be empty (brand {})",
                    group.brand
                )));
            }
            if item.map_price == 0 {
                return Err(ConfigError::Invalid(format!(
                    "map_price for {} must be positive",
                    item.name
                )));
            }

            let search_keyword = item
                .search_keyword
                .filter(|k| !k.trim().is_empty())
                .unwrap_or_else(|| item.name.clone());

            products.push(Product {
                brand: group.brand.clone(),
                name: item.name,
                map_price: item.map_price,
                search_keyword,
            });
        }
    }

    Ok(products)
}
