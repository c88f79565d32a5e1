use super::client::{GenerationBackend, GenerationRequest};
use super::logging::{debug_payload_enabled, emit_debug_payload, emit_response_debug};
use crate::config::Config;
use crate::error::ServiceError;
use crate::types::{
    AnthropicRequest, AnthropicResponse, ApiErrorEnvelope, ApiMessage, ChatCompletionRequest,
    ChatCompletionResponse, GeminiContent, GeminiGenerationConfig, GeminiPart, GeminiRequest,
    GeminiResponse,
};
use crate::util::{env_non_empty, is_local_endpoint_url};
use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde_json::Value;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiProtocol {
    GeminiGenerateContent,
    AnthropicMessages,
    OpenAiChatCompletions,
}

/// Whole-response HTTP transport. No streaming, no timeout.
#[derive(Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    api_key: String,
    api_url: String,
    protocol: ApiProtocol,
    max_tokens: u32,
}

impl HttpBackend {
    pub fn new(config: &Config) -> Result<Self, ServiceError> {
        let protocol = env_non_empty("PENWRIGHT_API_PROTOCOL")
            .and_then(parse_protocol)
            .unwrap_or_else(|| infer_api_protocol(&config.api_url));
        let max_tokens = env_non_empty("PENWRIGHT_MAX_TOKENS")
            .and_then(|v| v.parse::<u32>().ok())
            .map(|v| v.clamp(128, 8192))
            .unwrap_or(DEFAULT_MAX_TOKENS);
        let http = reqwest::Client::builder()
            .build()
            .map_err(|error| ServiceError::new(format!("HTTP client init failed: {error}")))?;

        Ok(Self {
            http,
            api_key: config.api_key.trim().to_string(),
            api_url: config.api_url.trim().to_string(),
            protocol,
            max_tokens,
        })
    }

    pub fn protocol(&self) -> ApiProtocol {
        self.protocol
    }

    fn request_url(&self, model: &str) -> String {
        match self.protocol {
            ApiProtocol::GeminiGenerateContent => gemini_generate_url(&self.api_url, model),
            ApiProtocol::AnthropicMessages => self.api_url.clone(),
            ApiProtocol::OpenAiChatCompletions => {
                adapt_to_openai_chat_completions_url(&self.api_url)
            }
        }
    }

    fn payload(&self, request: &GenerationRequest) -> Result<Value, ServiceError> {
        let payload = match self.protocol {
            ApiProtocol::GeminiGenerateContent => serde_json::to_value(GeminiRequest {
                contents: vec![GeminiContent {
                    role: Some("user".to_string()),
                    parts: vec![GeminiPart {
                        text: Some(request.instruction.clone()),
                    }],
                }],
                generation_config: GeminiGenerationConfig {
                    temperature: request.temperature,
                },
            }),
            ApiProtocol::AnthropicMessages => serde_json::to_value(AnthropicRequest {
                model: request.model.clone(),
                max_tokens: self.max_tokens,
                temperature: request.temperature,
                messages: vec![ApiMessage::user(request.instruction.clone())],
            }),
            ApiProtocol::OpenAiChatCompletions => serde_json::to_value(ChatCompletionRequest {
                model: request.model.clone(),
                temperature: request.temperature,
                messages: vec![ApiMessage::user(request.instruction.clone())],
            }),
        };
        payload.map_err(|error| ServiceError::new(format!("cannot encode request: {error}")))
    }

    async fn send(&self, request: GenerationRequest) -> Result<String, ServiceError> {
        let request_url = self.request_url(&request.model);
        let payload = self.payload(&request)?;

        if debug_payload_enabled() {
            emit_debug_payload(&request_url, &payload);
        }

        let mut builder = self
            .http
            .post(&request_url)
            .header("content-type", "application/json")
            .json(&payload);

        builder = match self.protocol {
            ApiProtocol::GeminiGenerateContent => builder.header("x-goog-api-key", &self.api_key),
            ApiProtocol::AnthropicMessages => builder
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION),
            ApiProtocol::OpenAiChatCompletions => {
                builder.header("authorization", format!("Bearer {}", self.api_key))
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|error| map_api_request_error(error, &request_url))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| map_api_request_error(error, &request_url))?;

        if debug_payload_enabled() {
            emit_response_debug(&request_url, status.as_u16(), &body);
        }

        if !status.is_success() {
            let detail = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .ok()
                .and_then(|envelope| envelope.error.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
            return Err(ServiceError::new(format!(
                "API endpoint '{request_url}' returned HTTP {status}: {detail}"
            )));
        }

        match self.protocol {
            ApiProtocol::GeminiGenerateContent => {
                let parsed: GeminiResponse = parse_body(&body)?;
                if let Some(text) = parsed.text() {
                    return Ok(text);
                }
                let reason = parsed
                    .prompt_feedback
                    .and_then(|feedback| feedback.block_reason)
                    .or_else(|| {
                        parsed
                            .candidates
                            .first()
                            .and_then(|candidate| candidate.finish_reason.clone())
                    });
                Err(match reason {
                    Some(reason) => ServiceError::new(format!("response blocked: {reason}")),
                    None => ServiceError::new("empty response"),
                })
            }
            ApiProtocol::AnthropicMessages => {
                let parsed: AnthropicResponse = parse_body(&body)?;
                parsed.text().ok_or_else(|| ServiceError::new("empty response"))
            }
            ApiProtocol::OpenAiChatCompletions => {
                let parsed: ChatCompletionResponse = parse_body(&body)?;
                parsed.text().ok_or_else(|| ServiceError::new("empty response"))
            }
        }
    }
}

impl GenerationBackend for HttpBackend {
    fn generate(&self, request: GenerationRequest) -> BoxFuture<'_, Result<String, ServiceError>> {
        self.send(request).boxed()
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, ServiceError> {
    serde_json::from_str(body)
        .map_err(|error| ServiceError::new(format!("malformed response: {error}")))
}

fn map_api_request_error(error: reqwest::Error, request_url: &str) -> ServiceError {
    if error.is_connect() && is_local_endpoint_url(request_url) {
        return ServiceError::new(format!(
            "cannot reach local API endpoint '{request_url}': {error}. Start your local server or update PENWRIGHT_API_URL."
        ));
    }
    if error.is_connect() {
        return ServiceError::new(format!("cannot reach API endpoint '{request_url}': {error}"));
    }
    if error.is_timeout() {
        return ServiceError::new(format!("API request to '{request_url}' timed out: {error}"));
    }
    if let Some(status) = error.status() {
        return ServiceError::new(format!(
            "API endpoint '{request_url}' returned HTTP {status}: {error}"
        ));
    }
    ServiceError::new(format!("API request to '{request_url}' failed: {error}"))
}

fn parse_protocol(value: String) -> Option<ApiProtocol> {
    match value.trim().to_ascii_lowercase().as_str() {
        "gemini" | "google" | "generate_content" => Some(ApiProtocol::GeminiGenerateContent),
        "anthropic" | "anthropic_messages" | "messages" | "v1/messages" => {
            Some(ApiProtocol::AnthropicMessages)
        }
        "openai" | "chat" | "chat_completions" | "openai_chat_completions" => {
            Some(ApiProtocol::OpenAiChatCompletions)
        }
        _ => None,
    }
}

fn infer_api_protocol(api_url: &str) -> ApiProtocol {
    let normalized = api_url.trim().to_ascii_lowercase();
    if normalized.contains("generativelanguage") || normalized.contains(":generatecontent") {
        ApiProtocol::GeminiGenerateContent
    } else if normalized.contains("/chat/completions") || normalized.trim_end_matches('/').ends_with("/v1") {
        ApiProtocol::OpenAiChatCompletions
    } else if normalized.contains("/messages") {
        ApiProtocol::AnthropicMessages
    } else {
        ApiProtocol::GeminiGenerateContent
    }
}

fn gemini_generate_url(api_url: &str, model: &str) -> String {
    let normalized = api_url.trim_end_matches('/');
    if normalized.contains(":generateContent") {
        return normalized.to_string();
    }
    let model = model.trim_start_matches("models/");
    format!("{normalized}/models/{model}:generateContent")
}

fn adapt_to_openai_chat_completions_url(api_url: &str) -> String {
    let normalized = api_url.trim_end_matches('/');
    if normalized.ends_with("/chat/completions") {
        return normalized.to_string();
    }
    if let Some(prefix) = normalized.strip_suffix("/messages") {
        return format!("{prefix}/chat/completions");
    }
    if normalized.ends_with("/v1") {
        return format!("{normalized}/chat/completions");
    }
    normalized.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_inference_defaults_to_gemini() {
        assert_eq!(
            infer_api_protocol("https://generativelanguage.googleapis.com/v1beta"),
            ApiProtocol::GeminiGenerateContent
        );
        assert_eq!(
            infer_api_protocol("https://proxy.internal/generate"),
            ApiProtocol::GeminiGenerateContent
        );
    }

    #[test]
    fn test_protocol_inference_detects_openai_and_anthropic() {
        assert_eq!(
            infer_api_protocol("http://localhost:8000/v1/chat/completions"),
            ApiProtocol::OpenAiChatCompletions
        );
        assert_eq!(
            infer_api_protocol("http://localhost:8000/v1/"),
            ApiProtocol::OpenAiChatCompletions
        );
        assert_eq!(
            infer_api_protocol("https://api.anthropic.com/v1/messages"),
            ApiProtocol::AnthropicMessages
        );
    }

    #[test]
    fn test_parse_protocol_aliases() {
        assert_eq!(
            parse_protocol(" Google ".to_string()),
            Some(ApiProtocol::GeminiGenerateContent)
        );
        assert_eq!(
            parse_protocol("chat".to_string()),
            Some(ApiProtocol::OpenAiChatCompletions)
        );
        assert_eq!(parse_protocol("smoke-signals".to_string()), None);
    }

    #[test]
    fn test_gemini_url_includes_model() {
        assert_eq!(
            gemini_generate_url("https://generativelanguage.googleapis.com/v1beta/", "gemini-pro"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent"
        );
        assert_eq!(
            gemini_generate_url("https://host/v1beta", "models/gemini-1.5-flash"),
            "https://host/v1beta/models/gemini-1.5-flash:generateContent"
        );
        let explicit = "https://host/v1beta/models/custom:generateContent";
        assert_eq!(gemini_generate_url(explicit, "ignored"), explicit);
    }

    #[test]
    fn test_openai_url_adapter() {
        assert_eq!(
            adapt_to_openai_chat_completions_url("http://localhost:8000/v1/messages"),
            "http://localhost:8000/v1/chat/completions"
        );
        assert_eq!(
            adapt_to_openai_chat_completions_url("http://localhost:8000/v1"),
            "http://localhost:8000/v1/chat/completions"
        );
    }

    #[test]
    fn test_payload_carries_temperature_for_each_protocol() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        std::env::remove_var("PENWRIGHT_API_PROTOCOL");
        let request = GenerationRequest {
            instruction: "Summarize this".to_string(),
            model: "m".to_string(),
            temperature: 0.3,
        };

        let mut backend = HttpBackend::new(&Config::with_api_key("k")).expect("backend");
        assert_eq!(backend.protocol(), ApiProtocol::GeminiGenerateContent);
        let payload = backend.payload(&request).expect("payload");
        assert_eq!(payload["contents"][0]["parts"][0]["text"], "Summarize this");
        assert!((payload["generationConfig"]["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);

        backend.protocol = ApiProtocol::AnthropicMessages;
        let payload = backend.payload(&request).expect("payload");
        assert_eq!(payload["messages"][0]["content"], "Summarize this");
        assert_eq!(payload["max_tokens"], DEFAULT_MAX_TOKENS);

        backend.protocol = ApiProtocol::OpenAiChatCompletions;
        let payload = backend.payload(&request).expect("payload");
        assert_eq!(payload["messages"][0]["role"], "user");
        assert!(payload.get("max_tokens").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_local_endpoint_maps_to_service_error() {
        let _env_lock = crate::test_support::ENV_LOCK.lock().await;
        std::env::remove_var("PENWRIGHT_API_PROTOCOL");
        let config = Config {
            api_url: "http://127.0.0.1:9/v1/chat/completions".to_string(),
            ..Config::with_api_key("k")
        };
        let backend = HttpBackend::new(&config).expect("backend");
        let error = backend
            .generate(GenerationRequest {
                instruction: "hi".to_string(),
                model: "m".to_string(),
                temperature: 0.5,
            })
            .await
            .expect_err("nothing listens on port 9");
        assert!(error.message.contains("127.0.0.1:9"), "{}", error.message);
    }
}
