use super::images::InlineImage;
use super::parse::{sanitize_api_response, truncate_str};
use crate::config::Config;
use crate::error::{LqaError, LqaResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One schema-constrained generation attempt
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub model: &'a str,
    pub system: &'a str,
    pub user: &'a str,
    pub images: &'a [InlineImage],
    pub schema_name: &'a str,
    pub schema: &'a serde_json::Value,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A vision-capable generation backend.
///
/// One call is one attempt: implementations must not retry internally, the
/// pipeline owns retry and model fallback.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Raw message content of the model's reply.
    async fn generate(&self, request: &GenerationRequest<'_>) -> LqaResult<String>;

    /// Client used to fetch remote screenshots.
    fn http_client(&self) -> &reqwest::Client;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
    response_format: ResponseFormat<'a>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

/// Content can be either a simple string or a multipart array
#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

/// Structured output with a strict JSON schema
#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaWrapper<'a>,
}

#[derive(Serialize)]
struct JsonSchemaWrapper<'a> {
    name: &'a str,
    strict: bool,
    schema: &'a serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    /// Content can be null when the request was refused
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// Error body OpenRouter sometimes returns with a 200 status
#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

fn build_request<'a>(request: &'a GenerationRequest<'a>, image_urls: &[String]) -> ChatRequest<'a> {
    let mut parts = vec![ContentPart::Text { text: request.user }];
    parts.extend(image_urls.iter().map(|url| ContentPart::ImageUrl {
        image_url: ImageUrl { url: url.clone() },
    }));

    ChatRequest {
        model: request.model,
        messages: vec![
            Message {
                role: "system",
                content: MessageContent::Text(request.system),
            },
            Message {
                role: "user",
                content: MessageContent::Parts(parts),
            },
        ],
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        stream: false,
        response_format: ResponseFormat {
            format_type: "json_schema",
            json_schema: JsonSchemaWrapper {
                name: request.schema_name,
                strict: true,
                schema: request.schema,
            },
        },
    }
}

/// Extract the message content from a chat completion body.
fn extract_content(text: &str) -> LqaResult<String> {
    if let Ok(err) = serde_json::from_str::<ApiErrorBody>(text) {
        return Err(LqaError::transport(format!(
            "backend error: {}",
            truncate_str(&err.error.message, 200)
        )));
    }

    let parsed: ChatResponse = serde_json::from_str(text).map_err(|e| {
        LqaError::protocol(format!(
            "failed to parse chat completion: {} ({})",
            e,
            sanitize_api_response(text)
        ))
    })?;

    let message = parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| LqaError::protocol("response contained no choices"))?;

    if let Some(refusal) = message.refusal.filter(|r| !r.trim().is_empty()) {
        return Err(LqaError::protocol(format!(
            "request was refused: {}",
            truncate_str(&refusal, 200)
        )));
    }

    match message.content {
        Some(content) if !content.trim().is_empty() => Ok(content),
        _ => Err(LqaError::protocol("model returned an empty response")),
    }
}

/// OpenRouter chat-completions backend
pub struct OpenRouterBackend {
    client: reqwest::Client,
    api_key: String,
    url: String,
}

impl OpenRouterBackend {
    /// Build from config. Fails with a configuration error, before any
    /// network call, when no credential is available.
    pub fn from_config(config: &Config) -> LqaResult<Self> {
        let api_key = config.api_key()?;
        Self::new(
            api_key,
            &config.api_base_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn new(api_key: String, url: &str, timeout: Duration) -> LqaResult<Self> {
        if api_key.trim().is_empty() {
            return Err(LqaError::config("API key is empty"));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LqaError::config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl GenerationBackend for OpenRouterBackend {
    async fn generate(&self, request: &GenerationRequest<'_>) -> LqaResult<String> {
        let image_urls: Vec<String> = request.images.iter().map(|i| i.data_url()).collect();
        let body = build_request(request, &image_urls);

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("X-Title", "lqa-lens")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            return extract_content(&text);
        }

        Err(match status.as_u16() {
            401 | 403 => LqaError::config("backend rejected the API key"),
            429 => LqaError::transport("rate limited by backend"),
            500..=599 => LqaError::transport(format!(
                "backend server error ({}). The service may be temporarily unavailable.",
                status
            )),
            _ => LqaError::transport(format!(
                "API error {}: {}",
                status,
                sanitize_api_response(&text)
            )),
        })
    }

    fn http_client(&self) -> &reqwest::Client {
        &self.client
    }
}
