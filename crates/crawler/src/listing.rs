use catalog::SelectorSet;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("Invalid selector for {field} ({selector}): {reason}")]
    InvalidSelector {
        field: &'static str,
        selector: String,
        reason: String,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ItemParseError {
    #[error("listing has no title element")]
    MissingTitle,
    #[error("listing title is empty")]
    EmptyTitle,
}

/// One result card as it appears on the page, before any filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedItem {
    pub title: String,
    pub seller: Option<String>,
    pub price_text: Option<String>,
    pub url: Option<String>,
}

/// Everything that knows about the search site's markup.
pub trait ListingExtractor {
    /// Selector whose presence means the result list has rendered.
    fn results_selector(&self) -> &str;

    fn is_challenge_page(&self, html: &str) -> bool;

    /// Relative links are resolved against `page_url`.
    fn extract_items(
        &self,
        html: &str,
        page_url: &str,
    ) -> Vec<Result<ScrapedItem, ItemParseError>>;
}

struct CompiledSelectors {
    challenge: Selector,
    challenge_frame: Selector,
    item: Selector,
    title: Selector,
    seller: Selector,
    price: Selector,
    link: Selector,
}

/// Extracts result cards with CSS selectors, by default the Naver
/// Shopping class names.
pub struct SelectorExtractor {
    raw: SelectorSet,
    compiled: CompiledSelectors,
}

impl SelectorExtractor {
    pub fn new(selectors: SelectorSet) -> Result<Self, ExtractorError> {
        let compiled = CompiledSelectors {
            challenge: compile("challenge", &selectors.challenge)?,
            challenge_frame: compile("challenge_frame", &selectors.challenge_frame)?,
            item: compile("item", &selectors.item)?,
            title: compile("title", &selectors.title)?,
            seller: compile("seller", &selectors.seller)?,
            price: compile("price", &selectors.price)?,
            link: compile("link", &selectors.link)?,
        };
        Ok(Self {
            raw: selectors,
            compiled,
        })
    }

    pub fn naver_shopping() -> Result<Self, ExtractorError> {
        Self::new(SelectorSet::default())
    }

    fn parse_item(
        &self,
        item: ElementRef<'_>,
        base: Option<&Url>,
    ) -> Result<ScrapedItem, ItemParseError> {
        let title = item
            .select(&self.compiled.title)
            .next()
            .map(element_text)
            .ok_or(ItemParseError::MissingTitle)?;
        if title.is_empty() {
            return Err(ItemParseError::EmptyTitle);
        }

        let seller = item
            .select(&self.compiled.seller)
            .next()
            .map(element_text)
            .filter(|s| !s.is_empty());

        let price_text = item
            .select(&self.compiled.price)
            .next()
            .map(element_text);

        let url = item
            .select(&self.compiled.link)
            .next()
            .and_then(|link| link.value().attr("href"))
            .map(|href| resolve_href(base, href.trim()));

        Ok(ScrapedItem {
            title,
            seller,
            price_text,
            url,
        })
    }
}

impl ListingExtractor for SelectorExtractor {
    fn results_selector(&self) -> &str {
        &self.raw.item
    }

    fn is_challenge_page(&self, html: &str) -> bool {
        let document = Html::parse_document(html);
        document.select(&self.compiled.challenge).next().is_some()
            || document.select(&self.compiled.challenge_frame).next().is_some()
    }

    fn extract_items(
        &self,
        html: &str,
        page_url: &str,
    ) -> Vec<Result<ScrapedItem, ItemParseError>> {
        let base = Url::parse(page_url).ok();
        let document = Html::parse_document(html);
        document
            .select(&self.compiled.item)
            .map(|item| self.parse_item(item, base.as_ref()))
            .collect()
    }
}

fn compile(field: &'static str, selector: &str) -> Result<Selector, ExtractorError> {
    Selector::parse(selector).map_err(|e| ExtractorError::InvalidSelector {
        field,
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn resolve_href(base: Option<&Url>, href: &str) -> String {
    base.and_then(|current| current.join(href).ok())
        .map(|absolute| absolute.to_string())
        .unwrap_or_else(|| href.to_string())
}

fn element_text(element: ElementRef<'_>) -> String {
    let text: String = element.text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_URL: &str = "https://search.shopping.naver.com/search/all?query=%EA%B9%80";

    const PAGE: &str = r#"
        <html><body>
            <div class="basicList_item__0T9JD">
                <a class="basicList_link__JLQJf" href="https://shop.example/1">
                    <span class="basicList_title__VfX3c">고래미 <b>김</b> 20봉</span>
                </a>
                <span class="basicList_mall__BC5Xu">ABC몰</span>
                <span class="price_num__S2p_v">8,500원</span>
            </div>
            <div class="basicList_item__0T9JD">
                <span class="basicList_title__VfX3c">다른브랜드 김</span>
                <span class="price_num__S2p_v">가격문의</span>
            </div>
            <div class="basicList_item__0T9JD">
                <span class="price_num__S2p_v">1,000원</span>
            </div>
        </body></html>
    "#;

    #[test]
    fn test_extract_items() {
        let extractor = SelectorExtractor::naver_shopping().unwrap();
        let items = extractor.extract_items(PAGE, SEARCH_URL);
        assert_eq!(items.len(), 3);

        let first = items[0].as_ref().unwrap();
        assert_eq!(first.title, "고래미 김 20봉");
        assert_eq!(first.seller.as_deref(), Some("ABC몰"));
        assert_eq!(first.price_text.as_deref(), Some("8,500원"));
        assert_eq!(first.url.as_deref(), Some("https://shop.example/1"));

        let second = items[1].as_ref().unwrap();
        assert_eq!(second.seller, None);
        assert_eq!(second.url, None);

        assert_eq!(items[2], Err(ItemParseError::MissingTitle));
    }

    #[test]
    fn test_relative_links_resolved() {
        let extractor = SelectorExtractor::naver_shopping().unwrap();
        let page = r#"
            <div class="basicList_item__0T9JD">
                <a class="basicList_link__JLQJf" href="/catalog/123?from=search">
                    <span class="basicList_title__VfX3c">고래미 김</span>
                </a>
            </div>
            <div class="basicList_item__0T9JD">
                <a class="basicList_link__JLQJf" href="//shop.example/2">
                    <span class="basicList_title__VfX3c">고래미 김</span>
                </a>
            </div>
        "#;
        let items = extractor.extract_items(page, SEARCH_URL);
        assert_eq!(
            items[0].as_ref().unwrap().url.as_deref(),
            Some("https://search.shopping.naver.com/catalog/123?from=search")
        );
        assert_eq!(
            items[1].as_ref().unwrap().url.as_deref(),
            Some("https://shop.example/2")
        );
    }

    #[test]
    fn test_href_kept_when_page_url_unparseable() {
        let extractor = SelectorExtractor::naver_shopping().unwrap();
        let page = r#"
            <div class="basicList_item__0T9JD">
                <a class="basicList_link__JLQJf" href="/catalog/123">
                    <span class="basicList_title__VfX3c">고래미 김</span>
                </a>
            </div>
        "#;
        let items = extractor.extract_items(page, "not a url");
        assert_eq!(items[0].as_ref().unwrap().url.as_deref(), Some("/catalog/123"));
    }

    #[test]
    fn test_challenge_detection() {
        let extractor = SelectorExtractor::naver_shopping().unwrap();
        assert!(!extractor.is_challenge_page(PAGE));
        assert!(extractor.is_challenge_page(r#"<div class="captcha">보안 확인</div>"#));
        assert!(extractor.is_challenge_page(
            r#"<iframe title="reCAPTCHA" src="https://www.google.com/recaptcha"></iframe>"#
        ));
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let selectors = SelectorSet {
            price: "[[[".to_string(),
            ..SelectorSet::default()
        };
        assert!(matches!(
            SelectorExtractor::new(selectors),
            Err(ExtractorError::InvalidSelector { field: "price", .. })
        ));
    }

    #[test]
    fn test_results_selector_follows_item_selector() {
        let extractor = SelectorExtractor::naver_shopping().unwrap();
        assert_eq!(extractor.results_selector(), ".basicList_item__0T9JD");
    }
}
