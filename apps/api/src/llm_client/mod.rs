/// LLM Client — the single point of entry for all generative-model calls in Rectify.
///
/// ARCHITECTURAL RULE: No other module may call the Gemini API directly.
/// Services talk to the [`GenerativeModel`] trait; [`LlmClient`] is the
/// production implementation.
///
/// No retry, no backoff, no client-side timeout: a failed call is surfaced as-is.
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::resume::DocumentPayload;

pub mod prompts;
pub mod schema;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no API key configured for the generative model")]
    MissingCredential,

    #[error("model returned no text content")]
    EmptyResponse,

    #[error("model output does not match the declared schema: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// Everything one structured-output call needs.
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub system: &'a str,
    pub prompt: String,
    /// Sent as an inline part ahead of the prompt when present.
    pub document: Option<&'a DocumentPayload>,
    pub response_schema: Value,
}

/// A schema-constrained text generator. Returns the raw text the model produced.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, LlmError>;
}

/// Calls the model and deserializes its output strictly into `T`.
///
/// Missing required fields and type mismatches fail with `MalformedResponse`;
/// nothing is defaulted or salvaged.
pub async fn call_json<T: DeserializeOwned>(
    model: &dyn GenerativeModel,
    request: &GenerationRequest<'_>,
) -> Result<T, LlmError> {
    let text = model.generate(request).await?;
    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }

    // Strip markdown code fences if the model wraps JSON in them
    let text = strip_json_fences(&text);

    serde_json::from_str(text).map_err(LlmError::MalformedResponse)
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Part<'a> {
    Text(&'a str),
    InlineData(InlineData<'a>),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
    response_schema: &'a Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

impl LlmResponse {
    /// Concatenates the text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// The single LLM client used by all services in Rectify.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: Option<String>,
    api_base: String,
    model: String,
}

impl LlmClient {
    pub fn new(api_key: Option<String>, api_base: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn credential(&self) -> Result<&str, LlmError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(LlmError::MissingCredential)
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    /// Makes a raw call to the Gemini API, returning the full response object.
    pub async fn call(&self, request: &GenerationRequest<'_>) -> Result<LlmResponse, LlmError> {
        let api_key = self.credential()?;
        let body = build_request_body(request);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("LLM API returned {}: {}", status, body);
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let llm_response: LlmResponse = response.json().await?;

        if let Some(usage) = &llm_response.usage_metadata {
            debug!(
                "LLM call succeeded: model={}, prompt_tokens={}, output_tokens={}",
                self.model, usage.prompt_token_count, usage.candidates_token_count
            );
        }

        Ok(llm_response)
    }
}

#[async_trait]
impl GenerativeModel for LlmClient {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, LlmError> {
        let response = self.call(request).await?;
        match response.text() {
            Some(text) => Ok(text),
            None => {
                let block_reason = response
                    .prompt_feedback
                    .as_ref()
                    .and_then(|f| f.block_reason.as_deref());
                let finish_reason = response
                    .candidates
                    .first()
                    .and_then(|c| c.finish_reason.as_deref());
                warn!(
                    "LLM returned no text: block_reason={:?}, finish_reason={:?}",
                    block_reason, finish_reason
                );
                Err(LlmError::EmptyResponse)
            }
        }
    }
}

fn build_request_body<'a>(request: &'a GenerationRequest<'_>) -> GenerateContentRequest<'a> {
    let mut parts = Vec::with_capacity(2);
    if let Some(doc) = request.document {
        parts.push(Part::InlineData(InlineData {
            mime_type: &doc.mime_type,
            data: &doc.data,
        }));
    }
    parts.push(Part::Text(&request.prompt));

    GenerateContentRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part::Text(request.system)],
        },
        contents: vec![Content {
            role: Some("user"),
            parts,
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            response_schema: &request.response_schema,
        },
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// Test double that replays scripted model outputs in order.
#[cfg(test)]
pub mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// What the model saw on one call.
    #[derive(Debug, Clone)]
    pub struct RecordedCall {
        pub system: String,
        pub prompt: String,
        pub document_mime_type: Option<String>,
        pub response_schema: Value,
    }

    #[derive(Default)]
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        calls: Mutex<Vec<RecordedCall>>,
    }

    impl ScriptedModel {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, text: impl Into<String>) -> Self {
            self.replies.lock().unwrap().push_back(Ok(text.into()));
            self
        }

        pub fn reply_json(self, value: &impl Serialize) -> Self {
            self.reply(serde_json::to_string(value).unwrap())
        }

        pub fn fail(self, error: LlmError) -> Self {
            self.replies.lock().unwrap().push_back(Err(error));
            self
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, LlmError> {
            self.calls.lock().unwrap().push(RecordedCall {
                system: request.system.to_string(),
                prompt: request.prompt.clone(),
                document_mime_type: request.document.map(|d| d.mime_type.clone()),
                response_schema: request.response_schema.clone(),
            });
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyResponse))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::testing::ScriptedModel;
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Probe {
        key: String,
    }

    fn probe_request() -> GenerationRequest<'static> {
        GenerationRequest {
            system: "system",
            prompt: "prompt".to_string(),
            document: None,
            response_schema: json!({"type": "OBJECT"}),
        }
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_request_body_puts_document_before_prompt() {
        let doc = DocumentPayload {
            data: "JVBERi0xLjc=".to_string(),
            mime_type: "application/pdf".to_string(),
            name: "cv.pdf".to_string(),
        };
        let request = GenerationRequest {
            document: Some(&doc),
            ..probe_request()
        };
        let body = serde_json::to_value(build_request_body(&request)).unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "system");
        assert!(body["systemInstruction"].get("role").is_none());
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "application/pdf");
        assert_eq!(parts[0]["inlineData"]["data"], "JVBERi0xLjc=");
        assert_eq!(parts[1]["text"], "prompt");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn test_response_text_joins_parts_of_first_candidate() {
        let response: LlmResponse = serde_json::from_value(json!({
            "candidates": [
                {"content": {"parts": [{"text": "{\"key\":"}, {"text": " \"v\"}"}]}, "finishReason": "STOP"},
                {"content": {"parts": [{"text": "ignored"}]}}
            ],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 4}
        }))
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("{\"key\": \"v\"}"));
    }

    #[test]
    fn test_response_without_candidates_has_no_text() {
        let response: LlmResponse =
            serde_json::from_value(json!({"promptFeedback": {"blockReason": "SAFETY"}})).unwrap();
        assert!(response.text().is_none());
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_any_request() {
        for key in [None, Some("  ".to_string())] {
            let client = LlmClient::new(key, "http://127.0.0.1:9".to_string(), DEFAULT_MODEL.to_string());
            let err = client.generate(&probe_request()).await.unwrap_err();
            assert!(matches!(err, LlmError::MissingCredential));
        }
    }

    #[test]
    fn test_endpoint_includes_model() {
        let client = LlmClient::new(None, format!("{DEFAULT_API_BASE}/"), "gemini-test".to_string());
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-test:generateContent"
        );
    }

    #[tokio::test]
    async fn test_call_json_parses_fenced_output() {
        let model = ScriptedModel::new().reply("```json\n{\"key\": \"value\"}\n```");
        let probe: Probe = call_json(&model, &probe_request()).await.unwrap();
        assert_eq!(probe.key, "value");
    }

    #[tokio::test]
    async fn test_call_json_blank_output_is_empty_response() {
        let model = ScriptedModel::new().reply("  ");
        let err = call_json::<Probe>(&model, &probe_request()).await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_call_json_missing_field_is_malformed() {
        let model = ScriptedModel::new().reply("{\"other\": 1}");
        let err = call_json::<Probe>(&model, &probe_request()).await.unwrap_err();
        assert!(matches!(err, LlmError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_call_json_propagates_model_errors() {
        let model = ScriptedModel::new().fail(LlmError::Api {
            status: 429,
            message: "quota".to_string(),
        });
        let err = call_json::<Probe>(&model, &probe_request()).await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 429, .. }));
        assert_eq!(model.calls().len(), 1);
    }
}
