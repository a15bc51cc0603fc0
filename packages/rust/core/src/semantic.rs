//! Semantic-classification collaborator.
//!
//! [`ClassificationService`] takes a domain and its URL list and returns free
//! text that should embed a JSON array of classified pages. Parsing that text
//! is the classifier's job; implementations only transport it.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use siteinventory_shared::{ContentType, InventoryError, Result};

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1";

/// One batch classification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRequest {
    pub domain: String,
    /// Newline-joined paths, each optionally annotated with its last-modified date.
    pub url_list: String,
}

impl ClassificationRequest {
    /// Build a request from `(path, last_modified)` pairs.
    pub fn new<'a>(
        domain: impl Into<String>,
        paths: impl IntoIterator<Item = (&'a str, Option<DateTime<Utc>>)>,
    ) -> Self {
        let url_list = paths
            .into_iter()
            .map(|(path, last_modified)| match last_modified {
                Some(ts) => format!("{path} (updated {})", ts.format("%Y-%m-%d")),
                None => path.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            domain: domain.into(),
            url_list,
        }
    }
}

/// Classifies a batch of site URLs into free text.
#[async_trait]
pub trait ClassificationService: Send + Sync {
    async fn classify(&self, request: &ClassificationRequest) -> Result<String>;
}

/// The instruction prompt for one request.
pub fn build_prompt(request: &ClassificationRequest) -> String {
    let vocabulary = ContentType::ALL
        .iter()
        .map(ContentType::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are cataloguing the public content of the website {domain}.\n\
         Classify each URL path below. Skip pages that are not content \
         (utility, legal or account pages).\n\n\
         Respond with a JSON array only. Each element must be an object with:\n\
         - \"url\": the path exactly as given\n\
         - \"title\": a short human-readable page title\n\
         - \"content_type\": one of {vocabulary}\n\
         - \"topics\": up to 3 short keyword phrases\n\n\
         URLs:\n{urls}",
        domain = request.domain,
        urls = request.url_list,
    )
}

// ---------------------------------------------------------------------------
// OpenRouter implementation
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// [`ClassificationService`] backed by an OpenRouter chat-completion model.
pub struct OpenRouterClassifier {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenRouterClassifier {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| InventoryError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            base_url: OPENROUTER_API_URL.to_string(),
        })
    }

    /// Point the client at a different API root (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| InventoryError::config(format!("invalid OpenRouter API key: {e}")))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("X-Title", HeaderValue::from_static("SiteInventory"));
        Ok(headers)
    }
}

#[async_trait]
impl ClassificationService for OpenRouterClassifier {
    #[instrument(skip_all, fields(domain = %request.domain, model = %self.model))]
    async fn classify(&self, request: &ClassificationRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".into(),
                content: Some(build_prompt(request)),
            }],
            temperature: 0.0,
        };

        debug!(urls = request.url_list.lines().count(), "sending classification request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| InventoryError::Network(format!("OpenRouter request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(InventoryError::Service(format!(
                "OpenRouter API error ({status}): {detail}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| InventoryError::parse(format!("invalid OpenRouter response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| InventoryError::Service("empty response from OpenRouter".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ClassificationRequest {
        let ts = Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap();
        ClassificationRequest::new("acme.io", [("/blog/launch", Some(ts)), ("/pricing", None)])
    }

    #[test]
    fn url_list_carries_dates() {
        assert_eq!(
            request().url_list,
            "/blog/launch (updated 2024-05-02)\n/pricing"
        );
    }

    #[test]
    fn prompt_names_vocabulary_and_urls() {
        let prompt = build_prompt(&request());
        assert!(prompt.contains("acme.io"));
        assert!(prompt.contains("case_study"));
        assert!(prompt.contains("/pricing"));
    }

    #[tokio::test]
    async fn returns_assistant_text() {
        let server = MockServer::start().await;
        let reply = serde_json::json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "Here you go: [{\"url\":\"/pricing\",\"title\":\"Pricing\",\"content_type\":\"product\",\"topics\":[]}]"
                }
            }]
        });

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply))
            .expect(1)
            .mount(&server)
            .await;

        let classifier = OpenRouterClassifier::new("sk-test", "openai/gpt-4o-mini", 5)
            .unwrap()
            .with_base_url(server.uri());
        let text = classifier.classify(&request()).await.unwrap();

        assert!(text.starts_with("Here you go"));
    }

    #[tokio::test]
    async fn api_error_is_service_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let classifier = OpenRouterClassifier::new("sk-test", "m", 5)
            .unwrap()
            .with_base_url(server.uri());
        let err = classifier.classify(&request()).await.unwrap_err();

        assert!(matches!(err, InventoryError::Service(_)));
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn empty_choices_is_service_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let classifier = OpenRouterClassifier::new("sk-test", "m", 5)
            .unwrap()
            .with_base_url(server.uri());

        assert!(classifier.classify(&request()).await.is_err());
    }
}
