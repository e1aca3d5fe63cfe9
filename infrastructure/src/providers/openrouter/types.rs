//! Wire types for the OpenRouter chat completions API and their conversion
//! to domain types.
//!
//! The API is OpenAI compatible: `POST {base}/chat/completions` answers with
//! `choices[0].message.content`, and `GET {base}/models` lists `data[].id`.
//! Failures are classified here into [`GatewayError`] kinds so that nothing
//! transport-specific leaks past the adapter.

use serde::{Deserialize, Serialize};
use webpilot_application::ports::llm_gateway::GatewayError;
use webpilot_domain::core::string::truncate;
use webpilot_domain::{Message, Usage};

/// Longest slice of a raw body quoted in an error message
const MAX_ERROR_BODY_CHARS: usize = 300;

// ─── Domain → OpenRouter ─────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

pub(crate) fn convert_messages(messages: &[Message]) -> Vec<ChatMessage<'_>> {
    messages
        .iter()
        .map(|m| ChatMessage {
            role: m.role.as_str(),
            content: &m.content,
        })
        .collect()
}

// ─── OpenRouter → Domain ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<ApiUsage>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

/// Error object, either top-level or nested in a 200 body
///
/// `code` is a number for HTTP-like errors and a string for some upstream
/// providers.
#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<serde_json::Value>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

/// Classify a non-2xx HTTP answer.
///
/// 401/403 are credential problems that no other model can fix; 429 is rate
/// limiting; 408/504 are timeouts; everything else means the model cannot
/// serve this request right now.
pub fn classify_status(status: u16, body: &str) -> GatewayError {
    let detail = error_detail(body).unwrap_or_else(|| truncate(body.trim(), MAX_ERROR_BODY_CHARS));
    let message = if detail.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, detail)
    };

    match status {
        401 | 403 => GatewayError::Auth(message),
        429 => GatewayError::RateLimited(message),
        408 | 504 => GatewayError::Timeout(message),
        _ => GatewayError::ModelUnavailable(message),
    }
}

/// Extract the reply text and token usage from a successful (2xx) body.
///
/// A 2xx body can still carry an `error` object (upstream provider failures
/// are reported that way); it is classified by its code.
pub fn parse_chat_response(body: &str) -> Result<(String, Option<Usage>), GatewayError> {
    let response: ChatResponse = serde_json::from_str(body).map_err(|e| {
        GatewayError::MalformedResponse(format!(
            "invalid JSON ({}): {}",
            e,
            truncate(body.trim(), MAX_ERROR_BODY_CHARS)
        ))
    })?;

    if let Some(error) = response.error {
        return Err(classify_api_error(&error));
    }

    let Some(choice) = response.choices.into_iter().next() else {
        return Err(GatewayError::MalformedResponse(
            "response has no choices".to_string(),
        ));
    };

    let content = choice
        .message
        .and_then(|m| m.content)
        .unwrap_or_default();
    if content.trim().is_empty() {
        return Err(GatewayError::MalformedResponse(
            "response content is empty".to_string(),
        ));
    }

    let usage = response.usage.map(|u| Usage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    Ok((content, usage))
}

/// Model ids listed by `GET /models`
pub fn parse_models_response(body: &str) -> Result<Vec<String>, GatewayError> {
    let response: ModelsResponse = serde_json::from_str(body)
        .map_err(|e| GatewayError::MalformedResponse(format!("invalid model list: {}", e)))?;
    Ok(response.data.into_iter().map(|m| m.id).collect())
}

/// Classify a transport-level failure (no HTTP answer was read).
pub fn classify_transport(err: &reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout(format!("request timed out: {}", err))
    } else if err.is_decode() || err.is_body() {
        GatewayError::MalformedResponse(format!("could not read response body: {}", err))
    } else {
        GatewayError::ModelUnavailable(format!("request failed: {}", err))
    }
}

fn classify_api_error(error: &ApiError) -> GatewayError {
    let message = error
        .message
        .clone()
        .unwrap_or_else(|| "provider returned an error".to_string());

    let status = match &error.code {
        Some(serde_json::Value::Number(n)) => n.as_u64(),
        Some(serde_json::Value::String(s)) => s.parse::<u64>().ok(),
        _ => None,
    };

    match status.and_then(|s| u16::try_from(s).ok()) {
        Some(status) => match status {
            401 | 403 => GatewayError::Auth(message),
            429 => GatewayError::RateLimited(message),
            408 | 504 => GatewayError::Timeout(message),
            _ => GatewayError::ModelUnavailable(message),
        },
        None => GatewayError::ModelUnavailable(message),
    }
}

fn error_detail(body: &str) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
    envelope.error.message
}

#[cfg(test)]
mod tests {
    use super::*;
    use webpilot_domain::ProviderErrorKind;

    #[test]
    fn test_classify_status_codes() {
        assert_eq!(classify_status(401, "").kind(), ProviderErrorKind::Auth);
        assert_eq!(classify_status(403, "").kind(), ProviderErrorKind::Auth);
        assert_eq!(
            classify_status(429, "").kind(),
            ProviderErrorKind::RateLimited
        );
        assert_eq!(classify_status(408, "").kind(), ProviderErrorKind::Timeout);
        assert_eq!(classify_status(504, "").kind(), ProviderErrorKind::Timeout);
        assert_eq!(
            classify_status(404, "").kind(),
            ProviderErrorKind::ModelUnavailable
        );
        assert_eq!(
            classify_status(502, "").kind(),
            ProviderErrorKind::ModelUnavailable
        );
    }

    #[test]
    fn test_classify_status_uses_error_message() {
        let body = r#"{"error":{"code":401,"message":"No auth credentials found"}}"#;
        let err = classify_status(401, body);
        assert_eq!(
            err,
            GatewayError::Auth("HTTP 401: No auth credentials found".to_string())
        );
    }

    #[test]
    fn test_classify_status_quotes_plain_body() {
        let err = classify_status(503, "upstream overloaded\n");
        assert_eq!(err.message(), "HTTP 503: upstream overloaded");

        let err = classify_status(500, "");
        assert_eq!(err.message(), "HTTP 500");
    }

    #[test]
    fn test_parse_chat_response_success() {
        let body = r#"{
            "id": "gen-1",
            "model": "deepseek/deepseek-r1:free",
            "choices": [{"message": {"role": "assistant", "content": "Hello"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }"#;

        let (content, usage) = parse_chat_response(body).unwrap();
        assert_eq!(content, "Hello");
        let usage = usage.unwrap();
        assert_eq!(usage.prompt_tokens, 12);
        assert_eq!(usage.completion_tokens, 3);
        assert_eq!(usage.total_tokens, 15);
    }

    #[test]
    fn test_parse_chat_response_without_usage() {
        let body = r#"{"choices": [{"message": {"content": "ok"}}]}"#;
        let (content, usage) = parse_chat_response(body).unwrap();
        assert_eq!(content, "ok");
        assert!(usage.is_none());
    }

    #[test]
    fn test_parse_chat_response_malformed() {
        let cases = [
            "not json",
            r#"{"choices": []}"#,
            r#"{"id": "gen-1"}"#,
            r#"{"choices": [{"message": {"content": "   "}}]}"#,
            r#"{"choices": [{"message": {"content": null}}]}"#,
            r#"{"choices": [{}]}"#,
        ];
        for body in cases {
            let err = parse_chat_response(body).unwrap_err();
            assert_eq!(
                err.kind(),
                ProviderErrorKind::MalformedResponse,
                "body: {}",
                body
            );
        }
    }

    #[test]
    fn test_parse_chat_response_error_in_ok_body() {
        let body = r#"{"error": {"code": 429, "message": "free tier exhausted"}}"#;
        assert_eq!(
            parse_chat_response(body).unwrap_err(),
            GatewayError::RateLimited("free tier exhausted".to_string())
        );

        let body = r#"{"error": {"code": "403", "message": "key disabled"}}"#;
        assert_eq!(
            parse_chat_response(body).unwrap_err().kind(),
            ProviderErrorKind::Auth
        );

        let body = r#"{"error": {"code": "upstream_error"}}"#;
        assert_eq!(
            parse_chat_response(body).unwrap_err(),
            GatewayError::ModelUnavailable("provider returned an error".to_string())
        );
    }

    #[test]
    fn test_parse_models_response() {
        let body = r#"{"data": [{"id": "a/b:free", "name": "B"}, {"id": "c/d"}]}"#;
        assert_eq!(
            parse_models_response(body).unwrap(),
            vec!["a/b:free".to_string(), "c/d".to_string()]
        );
        assert!(parse_models_response(r#"{"data": 5}"#).is_err());
    }

    #[test]
    fn test_convert_messages_roles() {
        let messages = vec![
            Message::system("sys"),
            Message::user("hi"),
            Message::assistant("hello"),
        ];
        let converted = convert_messages(&messages);
        let roles: Vec<_> = converted.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "user", "assistant"]);
        assert_eq!(converted[1].content, "hi");
    }
}
