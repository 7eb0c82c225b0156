//! Google Generative Language API client.
//!
//! `complete` uses `:generateContent`; `stream_chat` uses
//! `:streamGenerateContent?alt=sse` and yields one [`ModelChunk`] per text
//! part or function call as the events arrive.

use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, trace};

use crate::llm::{ChatMessage, ChatRequest, ChunkStream, LlmClient, LlmError, ModelChunk, ToolCall};

const CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(
        api_key: SecretString,
        base_url: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|error| LlmError::Transport(error.to_string()))?;

        Ok(Self {
            http,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/models/{}:{method}", self.base_url, self.model)
    }

    async fn post(&self, url: String, body: &Value) -> Result<reqwest::Response, LlmError> {
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|error| LlmError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status: status.as_u16(), body });
        }

        Ok(response)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": self.temperature },
        });

        let response = tokio::time::timeout(self.timeout, async {
            let response = self.post(self.endpoint("generateContent"), &body).await?;
            response
                .json::<GenerateContentResponse>()
                .await
                .map_err(|error| LlmError::Decode(error.to_string()))
        })
        .await
        .map_err(|_| {
            LlmError::Transport(format!("request timed out after {}s", self.timeout.as_secs()))
        })??;

        let text: String = response
            .into_result()?
            .into_iter()
            .filter_map(|chunk| match chunk {
                ModelChunk::Text(text) => Some(text),
                _ => None,
            })
            .collect();

        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }

    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChunkStream, LlmError> {
        let body = stream_request_body(request, self.temperature);
        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        debug!(
            event_name = "llm.stream.start",
            model = %self.model,
            messages = request.messages.len(),
            "opening model stream"
        );

        let response = tokio::time::timeout(self.timeout, self.post(url, &body)).await.map_err(
            |_| LlmError::Transport(format!("request timed out after {}s", self.timeout.as_secs())),
        )??;

        let mut events = Box::pin(response.bytes_stream().eventsource());
        let stream = async_stream::try_stream! {
            while let Some(event) = events.next().await {
                let event = event.map_err(|error| LlmError::Transport(error.to_string()))?;
                trace!("gemini sse: {:?}", event.data);
                if event.data.trim().is_empty() {
                    continue;
                }

                let chunks = serde_json::from_str::<GenerateContentResponse>(&event.data)
                    .map_err(|error| LlmError::Decode(format!("{error}, data: {}", event.data)))?
                    .into_result()?;

                for chunk in chunks {
                    yield chunk;
                }
            }
        };

        Ok(Box::pin(stream))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn stream_request_body(request: &ChatRequest, temperature: f32) -> Value {
    let mut body = json!({
        "systemInstruction": { "parts": [{ "text": request.system_prompt }] },
        "contents": contents(&request.messages),
        "generationConfig": { "temperature": temperature },
    });

    if !request.tools.is_empty() {
        let declarations: Vec<Value> = request
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                })
            })
            .collect();
        body["tools"] = json!([{ "functionDeclarations": declarations }]);
    }

    body
}

/// Gemini wants every function response of one round in a single `user` content.
fn contents(messages: &[ChatMessage]) -> Vec<Value> {
    let mut contents: Vec<Value> = Vec::with_capacity(messages.len());
    let mut pending_results: Vec<Value> = Vec::new();

    for message in messages {
        if let ChatMessage::ToolResult { name, output } = message {
            pending_results.push(json!({
                "functionResponse": { "name": name, "response": { "result": output } }
            }));
            continue;
        }

        if !pending_results.is_empty() {
            contents.push(json!({ "role": "user", "parts": std::mem::take(&mut pending_results) }));
        }

        match message {
            ChatMessage::User(text) => {
                contents.push(json!({ "role": "user", "parts": [{ "text": text }] }));
            }
            ChatMessage::Model { text, tool_calls } => {
                let mut parts = Vec::new();
                if !text.is_empty() {
                    parts.push(json!({ "text": text }));
                }
                for call in tool_calls {
                    parts.push(json!({
                        "functionCall": { "name": call.name, "args": call.arguments }
                    }));
                }
                contents.push(json!({ "role": "model", "parts": parts }));
            }
            ChatMessage::ToolResult { .. } => {}
        }
    }

    if !pending_results.is_empty() {
        contents.push(json!({ "role": "user", "parts": pending_results }));
    }

    contents
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    function_call: Option<FunctionCall>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl GenerateContentResponse {
    /// Provider errors reported inside a 200 body take precedence over content.
    fn into_result(self) -> Result<Vec<ModelChunk>, LlmError> {
        match self.error {
            Some(error) => Err(LlmError::Provider(error.message)),
            None => Ok(self.into_chunks()),
        }
    }

    fn into_chunks(self) -> Vec<ModelChunk> {
        self.candidates
            .into_iter()
            .take(1)
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts)
            .filter(|part| !part.thought)
            .filter_map(|part| {
                if let Some(call) = part.function_call {
                    return Some(ModelChunk::ToolCall(ToolCall {
                        name: call.name,
                        arguments: call.args,
                    }));
                }
                part.text.filter(|text| !text.is_empty()).map(ModelChunk::Text)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{contents, stream_request_body, GenerateContentResponse};
    use crate::llm::{ChatMessage, ChatRequest, LlmError, ModelChunk, ToolCall, ToolSpec};

    #[test]
    fn parses_text_and_function_call_parts() {
        let payload: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "Sure, " },
                        { "text": "internal", "thought": true },
                        { "functionCall": { "name": "send_email_to_owner", "args": { "message": "hi" } } }
                    ]
                }
            }]
        }))
        .expect("payload should deserialize");

        let chunks = payload.into_chunks();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], ModelChunk::Text("Sure, ".to_string()));
        assert_eq!(
            chunks[1],
            ModelChunk::ToolCall(ToolCall {
                name: "send_email_to_owner".to_string(),
                arguments: json!({ "message": "hi" }),
            })
        );
    }

    #[test]
    fn usage_only_events_produce_no_chunks() {
        let payload: GenerateContentResponse =
            serde_json::from_value(json!({ "usageMetadata": { "totalTokenCount": 12 } }))
                .expect("payload should deserialize");
        assert!(payload.into_chunks().is_empty());
    }

    #[test]
    fn error_events_surface_as_provider_errors() {
        let payload: GenerateContentResponse = serde_json::from_value(json!({
            "error": { "code": 429, "message": "quota exceeded" },
            "candidates": [{ "content": { "parts": [{ "text": "ignored" }] } }]
        }))
        .expect("payload should deserialize");

        assert_eq!(payload.into_result(), Err(LlmError::Provider("quota exceeded".to_string())));
    }

    #[test]
    fn content_events_decode_to_chunks() {
        let payload: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Hello" }] } }]
        }))
        .expect("payload should deserialize");

        assert_eq!(payload.into_result(), Ok(vec![ModelChunk::Text("Hello".to_string())]));
    }

    #[test]
    fn tool_results_are_grouped_after_the_model_call() {
        let messages = vec![
            ChatMessage::User("contact them".to_string()),
            ChatMessage::Model {
                text: String::new(),
                tool_calls: vec![ToolCall { name: "t".to_string(), arguments: json!({}) }],
            },
            ChatMessage::ToolResult { name: "t".to_string(), output: "sent".to_string() },
        ];

        let contents = contents(&messages);

        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"][0]["functionCall"]["name"], "t");
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(contents[2]["parts"][0]["functionResponse"]["response"]["result"], "sent");
    }

    #[test]
    fn request_body_declares_tools_only_when_present() {
        let mut request = ChatRequest {
            system_prompt: "be nice".to_string(),
            messages: vec![ChatMessage::User("hi".to_string())],
            tools: Vec::new(),
        };
        let body = stream_request_body(&request, 0.7);
        assert!(body.get("tools").is_none());
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be nice");

        request.tools.push(ToolSpec {
            name: "send_email_to_owner",
            description: "contact".to_string(),
            parameters: json!({ "type": "object" }),
        });
        let body = stream_request_body(&request, 0.7);
        assert_eq!(body["tools"][0]["functionDeclarations"][0]["name"], "send_email_to_owner");
    }
}
