use std::time::Duration;

use rand::Rng;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::LlmConfig;

const MAX_JITTER_MS: u64 = 250;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("URL parsing failed: {0}")]
    UrlError(#[from] url::ParseError),
    #[error("Provider returned {status}: {body}")]
    StatusError { status: u16, body: String },
    #[error("Provider returned an empty completion")]
    EmptyCompletion,
}

impl LlmError {
    /// Transient failures worth another attempt.
    fn is_retryable(&self) -> bool {
        match self {
            LlmError::HttpError(e) => e.is_timeout() || e.is_connect(),
            LlmError::StatusError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Client for OpenAI-compatible chat completion endpoints (Groq, OpenAI).
#[derive(Clone)]
pub struct LlmClient {
    http_client: HttpClient,
    endpoint: Url,
    api_key: String,
    model: String,
    temperature: f32,
    max_retries: u32,
    retry_backoff: Duration,
}

impl LlmClient {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self, LlmError> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            endpoint: chat_completions_url(config.base_url())?,
            api_key,
            model: config.model().to_string(),
            temperature: config.temperature,
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends one system + user exchange and returns the trimmed answer.
    /// Transient failures are retried up to `max_retries` times with
    /// exponential backoff.
    pub async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: self.temperature,
        };

        let mut attempt = 0;
        loop {
            match self.send(&request).await {
                Ok(answer) => return Ok(answer),
                Err(e) if attempt < self.max_retries && e.is_retryable() => {
                    let delay = self.backoff(attempt);
                    log::warn!(
                        "Completion attempt {} failed ({}), retrying in {:?}",
                        attempt + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send(&self, request: &ChatRequest<'_>) -> Result<String, LlmError> {
        let response = self
            .http_client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::StatusError {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(LlmError::EmptyCompletion)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let jitter = rand::rng().random_range(0..=MAX_JITTER_MS);
        self.retry_backoff * 2u32.saturating_pow(attempt) + Duration::from_millis(jitter)
    }
}

fn chat_completions_url(base_url: &str) -> Result<Url, LlmError> {
    let base = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;
    Ok(base.join("chat/completions")?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, HttpServer, web};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Provider {
        calls: AtomicUsize,
        failures_before_success: usize,
    }

    async fn chat_completions(
        provider: web::Data<Arc<Provider>>,
        req: actix_web::HttpRequest,
        body: web::Json<Value>,
    ) -> HttpResponse {
        let call = provider.calls.fetch_add(1, Ordering::SeqCst);
        if call < provider.failures_before_success {
            return HttpResponse::ServiceUnavailable().body("overloaded");
        }

        let auth = req
            .headers()
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if auth != "Bearer test-key" {
            return HttpResponse::Unauthorized().finish();
        }

        let messages = body["messages"].as_array().cloned().unwrap_or_default();
        HttpResponse::Ok().json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": format!(
                        "  model={} temp={} roles={}/{} user={}  ",
                        body["model"].as_str().unwrap_or_default(),
                        body["temperature"],
                        messages[0]["role"].as_str().unwrap_or_default(),
                        messages[1]["role"].as_str().unwrap_or_default(),
                        messages[1]["content"].as_str().unwrap_or_default(),
                    )
                }
            }]
        }))
    }

    /// Starts a fake provider on an ephemeral port and returns its base URL.
    fn spawn_provider(provider: Arc<Provider>) -> String {
        let server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(provider.clone()))
                .route("/v1/chat/completions", web::post().to(chat_completions))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let address = server.addrs()[0];
        actix_web::rt::spawn(server.run());
        format!("http://{}/v1", address)
    }

    fn client_for(base_url: String, max_retries: u32) -> LlmClient {
        let config = LlmConfig {
            base_url: Some(base_url),
            max_retries,
            retry_backoff_ms: 1,
            timeout_secs: 5,
            ..LlmConfig::default()
        };
        LlmClient::new(&config, "test-key".to_string()).unwrap()
    }

    #[test]
    fn endpoint_keeps_the_version_segment() {
        assert_eq!(
            chat_completions_url("https://api.groq.com/openai/v1").unwrap().as_str(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
        assert_eq!(
            chat_completions_url("https://api.openai.com/v1/").unwrap().as_str(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn only_transient_failures_retry() {
        let overloaded = LlmError::StatusError {
            status: 503,
            body: String::new(),
        };
        let throttled = LlmError::StatusError {
            status: 429,
            body: String::new(),
        };
        let unauthorized = LlmError::StatusError {
            status: 401,
            body: String::new(),
        };
        assert!(overloaded.is_retryable());
        assert!(throttled.is_retryable());
        assert!(!unauthorized.is_retryable());
        assert!(!LlmError::EmptyCompletion.is_retryable());
    }

    #[actix_web::test]
    async fn sends_openai_compatible_request() {
        let provider = Arc::new(Provider {
            calls: AtomicUsize::new(0),
            failures_before_success: 0,
        });
        let client = client_for(spawn_provider(provider.clone()), 0);

        let answer = client.complete("be helpful", "hello").await.unwrap();
        assert_eq!(
            answer,
            "model=llama-3.1-8b-instant temp=0.3 roles=system/user user=hello"
        );
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[actix_web::test]
    async fn retries_transient_failure_once() {
        let provider = Arc::new(Provider {
            calls: AtomicUsize::new(0),
            failures_before_success: 1,
        });
        let client = client_for(spawn_provider(provider.clone()), 1);

        assert!(client.complete("system", "again").await.is_ok());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[actix_web::test]
    async fn single_attempt_when_retries_disabled() {
        let provider = Arc::new(Provider {
            calls: AtomicUsize::new(0),
            failures_before_success: 1,
        });
        let client = client_for(spawn_provider(provider.clone()), 0);

        let err = client.complete("system", "once").await.unwrap_err();
        assert!(matches!(err, LlmError::StatusError { status: 503, .. }));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }
}
