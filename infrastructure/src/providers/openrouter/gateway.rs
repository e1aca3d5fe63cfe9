//! OpenRouter implementation of the [`LlmGateway`] port.

use super::types::{
    ChatRequest, classify_status, classify_transport, convert_messages, parse_chat_response,
    parse_models_response,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::{debug, warn};
use webpilot_application::ports::llm_gateway::{GatewayError, LlmGateway};
use webpilot_domain::{Message, ModelId, ModelResponse};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Connection settings for [`OpenRouterGateway`]
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    pub base_url: String,
    /// Resolved API key. `None` fails every call with `Auth` before any
    /// network traffic.
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Sent as `HTTP-Referer` for OpenRouter attribution
    pub referer: Option<String>,
    /// Sent as `X-Title` for OpenRouter attribution
    pub title: Option<String>,
    /// Bound on one chat completion request
    pub request_timeout: Duration,
    /// Bound on the model list request
    pub models_timeout: Duration,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            temperature: 0.7,
            max_tokens: 4000,
            referer: None,
            title: Some("webpilot".to_string()),
            request_timeout: Duration::from_secs(30),
            models_timeout: Duration::from_secs(10),
        }
    }
}

/// Chat completions over the OpenRouter HTTP API
///
/// Stateless between calls; one instance serves any number of concurrent
/// sessions.
pub struct OpenRouterGateway {
    client: Client,
    config: OpenRouterConfig,
}

impl OpenRouterGateway {
    pub fn new(config: OpenRouterConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &OpenRouterConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn with_attribution(&self, mut builder: RequestBuilder) -> RequestBuilder {
        if let Some(referer) = &self.config.referer {
            builder = builder.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.config.title {
            builder = builder.header("X-Title", title);
        }
        builder
    }

    fn api_key(&self) -> Result<&str, GatewayError> {
        match self.config.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(GatewayError::Auth("no API key configured".to_string())),
        }
    }
}

#[async_trait]
impl LlmGateway for OpenRouterGateway {
    async fn call(
        &self,
        model: &ModelId,
        messages: &[Message],
    ) -> Result<ModelResponse, GatewayError> {
        let api_key = self.api_key()?;

        let request = ChatRequest {
            model: model.as_str(),
            messages: convert_messages(messages),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!(
            "OpenRouter chat with model: {} ({} messages)",
            model,
            messages.len()
        );

        let builder = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(api_key)
            .timeout(self.config.request_timeout)
            .json(&request);

        let response = self
            .with_attribution(builder)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| classify_transport(&e))?;

        if !status.is_success() {
            let err = classify_status(status.as_u16(), &body);
            debug!("OpenRouter {} failed: {}", model, err);
            return Err(err);
        }

        let (content, usage) = parse_chat_response(&body)?;
        let mut response = ModelResponse::new(model.clone(), content);
        if let Some(usage) = usage {
            response = response.with_usage(usage);
        }
        Ok(response)
    }

    async fn available_models(&self) -> Result<Vec<ModelId>, GatewayError> {
        let mut builder = self
            .client
            .get(self.endpoint("models"))
            .timeout(self.config.models_timeout);
        if let Ok(key) = self.api_key() {
            builder = builder.bearer_auth(key);
        }

        let response = self
            .with_attribution(builder)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| classify_transport(&e))?;
        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &body));
        }

        let ids = parse_models_response(&body)?;
        Ok(ids
            .into_iter()
            .filter_map(|id| match ModelId::new(&id) {
                Ok(model) => Some(model),
                Err(e) => {
                    warn!("Skipping model id {:?} from provider: {}", id, e);
                    None
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;
    use webpilot_domain::ProviderErrorKind;

    /// Serve one canned HTTP response and hand back the raw request.
    async fn serve_once(status_line: &str, body: &str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            let _ = tx.send(String::from_utf8_lossy(&request).to_string());
        });

        (format!("http://{}", addr), rx)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }

    fn gateway(base_url: String) -> OpenRouterGateway {
        OpenRouterGateway::new(OpenRouterConfig {
            base_url,
            api_key: Some("test-key".to_string()),
            referer: Some("https://example.test".to_string()),
            ..OpenRouterConfig::default()
        })
    }

    fn model() -> ModelId {
        ModelId::new("deepseek/deepseek-r1:free").unwrap()
    }

    #[tokio::test]
    async fn test_missing_key_fails_with_auth() {
        let gateway = OpenRouterGateway::new(OpenRouterConfig {
            // Nothing listens here; the call must not get that far.
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: None,
            ..OpenRouterConfig::default()
        });

        let err = gateway
            .call(&model(), &[Message::user("hi")])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::Auth);

        let blank = OpenRouterGateway::new(OpenRouterConfig {
            api_key: Some("  ".to_string()),
            ..OpenRouterConfig::default()
        });
        let err = blank.call(&model(), &[Message::user("hi")]).await.unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::Auth);
    }

    #[tokio::test]
    async fn test_call_success_sends_headers_and_payload() {
        let body = r#"{"choices":[{"message":{"content":"```action\n{\"action\":\"finish\",\"result\":\"ok\"}\n```"}}],"usage":{"prompt_tokens":5,"completion_tokens":7,"total_tokens":12}}"#;
        let (base_url, request) = serve_once("200 OK", body).await;

        let response = gateway(base_url)
            .call(
                &model(),
                &[Message::system("be brief"), Message::user("go")],
            )
            .await
            .unwrap();

        assert_eq!(response.model, model());
        assert!(response.content.contains("finish"));
        assert_eq!(response.usage.unwrap().total_tokens, 12);

        let request = request.await.unwrap();
        let lower = request.to_lowercase();
        assert!(request.starts_with("POST /chat/completions"));
        assert!(lower.contains("authorization: bearer test-key"));
        assert!(lower.contains("http-referer: https://example.test"));
        assert!(lower.contains("x-title: webpilot"));
        assert!(request.contains(r#""model":"deepseek/deepseek-r1:free""#));
        assert!(request.contains(r#""max_tokens":4000"#));
        assert!(request.contains(r#""role":"system""#));
    }

    #[tokio::test]
    async fn test_call_classifies_http_errors() {
        let cases = [
            ("401 Unauthorized", ProviderErrorKind::Auth),
            ("429 Too Many Requests", ProviderErrorKind::RateLimited),
            ("504 Gateway Timeout", ProviderErrorKind::Timeout),
            ("404 Not Found", ProviderErrorKind::ModelUnavailable),
        ];

        for (status_line, expected) in cases {
            let (base_url, _request) =
                serve_once(status_line, r#"{"error":{"message":"nope"}}"#).await;
            let err = gateway(base_url)
                .call(&model(), &[Message::user("hi")])
                .await
                .unwrap_err();
            assert_eq!(err.kind(), expected, "status {}", status_line);
        }
    }

    #[tokio::test]
    async fn test_call_malformed_body() {
        let (base_url, _request) = serve_once("200 OK", r#"{"choices":[]}"#).await;
        let err = gateway(base_url)
            .call(&model(), &[Message::user("hi")])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_model_unavailable() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = gateway(format!("http://{}", addr))
            .call(&model(), &[Message::user("hi")])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::ModelUnavailable);
    }

    #[tokio::test]
    async fn test_available_models() {
        let body = r#"{"data":[{"id":"mistralai/mistral-7b-instruct:free"},{"id":""},{"id":"google/gemma-2-9b-it:free"}]}"#;
        let (base_url, request) = serve_once("200 OK", body).await;

        let models = gateway(base_url).available_models().await.unwrap();
        let ids: Vec<&str> = models.iter().map(|m| m.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "mistralai/mistral-7b-instruct:free",
                "google/gemma-2-9b-it:free"
            ]
        );

        let request = request.await.unwrap();
        assert!(request.starts_with("GET /models"));
    }
}
