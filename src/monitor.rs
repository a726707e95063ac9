use anyhow::{Context, Result};
use browser::{BrowserSession, LaunchSettings};
use catalog::{Config, ConfigError, Violation};
use crawler::{CrawlSettings, CrawlSummary, Pacer, PageCrawler, SelectorExtractor};
use exporter::Exporter;
use notifier::{WebhookConfig, WebhookNotifier};
use std::path::Path;
use tracing::{error, info, warn};

use crate::cli::RunArgs;
use crate::progress::CrawlProgress;

/// Loads the config, or `None` when the file is absent. A missing config
/// ends the run quietly; any other config problem is an error.
fn load_config(path: &Path) -> Result<Option<Config>> {
    match Config::load(path) {
        Ok(config) => Ok(Some(config)),
        Err(ConfigError::NotFound(path)) => {
            error!("Configuration file not found: {}", path.display());
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn run(args: RunArgs) -> Result<()> {
    let Some(config) = load_config(&args.config)? else {
        return Ok(());
    };
    info!("MAP price monitoring started");

    let crawl_config = config.clone();
    let crawl_args = args.clone();
    let summary = tokio::task::spawn_blocking(move || crawl(&crawl_config, &crawl_args))
        .await
        .context("crawl task panicked")??;

    info!(
        "Crawl finished: {} products crawled, {} aborted, {} matching listings",
        summary.products_crawled, summary.products_aborted, summary.listings_matched
    );

    report(
        config.webhook_url(),
        &args.output,
        args.csv.as_deref(),
        &summary.violations,
    )
    .await
}

fn crawl(config: &Config, args: &RunArgs) -> Result<CrawlSummary> {
    let extractor = SelectorExtractor::new(config.crawler().selectors.clone())?;
    let launch = LaunchSettings::new(
        config.user_agent(),
        args.headless || config.crawler().headless,
    );

    let session = BrowserSession::launch(&launch)?;
    let crawler = PageCrawler::new(
        &session,
        extractor,
        Pacer::new(config.delay_range()),
        CrawlSettings::from_config(config.crawler()),
    );

    let progress = CrawlProgress::new(config.products().len() as u64, !args.no_progress);
    let summary = crawler.crawl_all_products(config.products(), |index, product| {
        progress.start_product(index, &product.name)
    });
    progress.finish(summary.violations.len());

    drop(crawler);
    session.close();
    Ok(summary)
}

/// Prints, delivers and saves the violation list. A failed delivery is
/// logged and never prevents the local copy from being written.
pub async fn report(
    webhook_url: Option<&str>,
    output: &Path,
    csv: Option<&Path>,
    violations: &[Violation],
) -> Result<()> {
    let exporter = Exporter::new();

    if violations.is_empty() {
        info!("No MAP violations found");
    } else {
        warn!("{} MAP violations found", violations.len());
    }

    exporter.print(violations)?;

    match webhook_url {
        Some(url) => match WebhookNotifier::new(WebhookConfig::new(url)) {
            Ok(notifier) => {
                if let Err(e) = notifier.deliver(violations).await {
                    error!("Webhook delivery failed: {}", e);
                }
            }
            Err(e) => error!("Failed to set up webhook client: {}", e),
        },
        None => info!("Webhook URL not configured, skipping delivery"),
    }

    if violations.is_empty() {
        return Ok(());
    }

    exporter
        .export_to_json(violations, output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    if let Some(csv) = csv {
        exporter
            .export_to_csv(violations, csv)
            .with_context(|| format!("failed to write {}", csv.display()))?;
    }

    Ok(())
}

pub fn list_products(path: &Path) -> Result<()> {
    let Some(config) = load_config(path)? else {
        return Ok(());
    };

    println!("{:<12} {:<24} {:>10}  keyword", "brand", "product", "MAP");
    for product in config.products() {
        println!(
            "{:<12} {:<24} {:>10}  {}",
            product.brand, product.name, product.map_price, product.search_keyword
        );
    }

    match config.webhook_url() {
        Some(url) => println!("\nwebhook: {}", url),
        None => println!("\nwebhook: disabled"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::Product;
    use chrono::NaiveDate;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn violations() -> Vec<Violation> {
        let product = Product {
            brand: "고래미".to_string(),
            name: "김".to_string(),
            map_price: 10000,
            search_keyword: "김".to_string(),
        };
        let at = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        vec![Violation::new(&product, "ABC몰".to_string(), 8500, String::new(), at)]
    }

    #[tokio::test]
    async fn test_failed_delivery_still_writes_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let output = std::env::temp_dir().join("map_monitor_report_failed_delivery.json");
        std::fs::remove_file(&output).ok();

        let url = format!("{}/webhook", server.uri());
        report(Some(&url), &output, None, &violations()).await.unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        assert!(written.contains("ABC몰"));
        std::fs::remove_file(output).ok();
    }

    #[tokio::test]
    async fn test_empty_report_sends_and_writes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let output = std::env::temp_dir().join("map_monitor_report_empty.json");
        std::fs::remove_file(&output).ok();

        report(Some(&server.uri()), &output, None, &[]).await.unwrap();
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_config_is_not_an_error() {
        let path = std::env::temp_dir().join("map_monitor_absent_config.json");
        std::fs::remove_file(&path).ok();
        assert!(load_config(&path).unwrap().is_none());
        assert!(list_products(&path).is_ok());
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let path = std::env::temp_dir().join("map_monitor_invalid_config.json");
        std::fs::write(&path, "{\"products\": 3}").unwrap();
        assert!(load_config(&path).is_err());
        std::fs::remove_file(path).ok();
    }
}
