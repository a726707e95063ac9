use catalog::Violation;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("Webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Webhook returned status {status}")]
    UnexpectedStatus { status: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Nothing to report; no request was made.
    NothingToSend,
    Sent { count: usize },
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: String,
    pub timeout: Duration,
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Posts violation batches to an n8n (or any JSON) webhook.
pub struct WebhookNotifier {
    config: WebhookConfig,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig) -> Result<Self, NotifierError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    pub async fn deliver(&self, violations: &[Violation]) -> Result<Delivery, NotifierError> {
        if violations.is_empty() {
            info!("No MAP violations to deliver");
            return Ok(Delivery::NothingToSend);
        }

        debug!("Posting {} violations to {}", violations.len(), self.config.url);

        let response = self
            .client
            .post(&self.config.url)
            .header(CONTENT_TYPE, "application/json")
            .json(violations)
            .send()
            .await
            .map_err(|e| {
                error!("Webhook delivery error: {}", e);
                NotifierError::Http(e)
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            error!("Webhook delivery failed: {}", status);
            return Err(NotifierError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        info!("Delivered {} violations to webhook", violations.len());
        Ok(Delivery::Sent {
            count: violations.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::Product;
    use chrono::NaiveDate;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn violation() -> Violation {
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
        Violation::new(&product, "ABC몰".to_string(), 8500, String::new(), at)
    }

    fn notifier(server: &MockServer) -> WebhookNotifier {
        WebhookNotifier::new(WebhookConfig::new(format!("{}/webhook/map", server.uri()))).unwrap()
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let result = notifier(&server).deliver(&[]).await.unwrap();
        assert_eq!(result, Delivery::NothingToSend);
    }

    #[tokio::test]
    async fn test_posts_json_array() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook/map"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!([{
                "브랜드": "고래미",
                "제품명": "김",
                "쿠팡_MAP": 10000,
                "위반_업체명": "ABC몰",
                "위반_가격": 8500,
                "위반_URL": "",
                "발견_시간": "2024-05-01 09:00:00"
            }])))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let result = notifier(&server).deliver(&[violation()]).await.unwrap();
        assert_eq!(result, Delivery::Sent { count: 1 });
    }

    #[tokio::test]
    async fn test_non_200_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let result = notifier(&server).deliver(&[violation()]).await;
        assert!(matches!(
            result,
            Err(NotifierError::UnexpectedStatus { status: 201 })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_http_error() {
        let notifier =
            WebhookNotifier::new(WebhookConfig::new("http://127.0.0.1:9/webhook")).unwrap();
        let result = notifier.deliver(&[violation()]).await;
        assert!(matches!(result, Err(NotifierError::Http(_))));
    }
}
