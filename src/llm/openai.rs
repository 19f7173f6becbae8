use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::{ChatMessage, ChatRequest, Role, ToolCallRequest};
use crate::config::LlmConfig;
use crate::errors::ApiError;

/// Client for any OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct OpenAiCompatProvider {
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    client: Client,
}

impl OpenAiCompatProvider {
    pub fn new(config: &LlmConfig, api_key: Option<String>) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client: Client::new(),
        }
    }

    fn request_body(&self, request: &ChatRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": Self::wire_messages(&request.messages),
            "stream": false,
        });

        if let Some(obj) = body.as_object_mut() {
            if !request.tools.is_empty() {
                let tools: Vec<Value> = request
                    .tools
                    .iter()
                    .map(|tool| {
                        json!({
                            "type": "function",
                            "function": {
                                "name": tool.name,
                                "description": tool.description,
                                "parameters": tool.parameters,
                            }
                        })
                    })
                    .collect();
                obj.insert("tools".to_string(), json!(tools));
            }
            if let Some(t) = self.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(t) = self.max_tokens {
                obj.insert("max_tokens".to_string(), json!(t));
            }
        }

        body
    }

    fn wire_messages(messages: &[ChatMessage]) -> Vec<Value> {
        messages
            .iter()
            .map(|msg| match msg.role {
                Role::Assistant if msg.has_tool_calls() => {
                    let tool_calls: Vec<Value> = msg
                        .tool_calls
                        .iter()
                        .map(|call| {
                            json!({
                                "id": call.id,
                                "type": "function",
                                "function": {
                                    "name": call.name,
                                    "arguments": call.arguments.to_string(),
                                }
                            })
                        })
                        .collect();
                    json!({
                        "role": "assistant",
                        "content": msg.content,
                        "tool_calls": tool_calls,
                    })
                }
                Role::Tool => json!({
                    "role": "tool",
                    "tool_call_id": msg.tool_call_id,
                    "content": msg.content,
                }),
                _ => json!({
                    "role": msg.role.as_str(),
                    "content": msg.content,
                }),
            })
            .collect()
    }

    fn parse_tool_calls(message: &Value) -> Vec<ToolCallRequest> {
        let Some(raw_calls) = message.get("tool_calls").and_then(|v| v.as_array()) else {
            return Vec::new();
        };

        raw_calls
            .iter()
            .filter_map(|call| {
                let id = call.get("id").and_then(|v| v.as_str())?.to_string();
                let function = call.get("function")?;
                let name = function.get("name").and_then(|v| v.as_str())?.to_string();
                let arguments = function
                    .get("arguments")
                    .and_then(|v| v.as_str())
                    .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
                    .unwrap_or_else(|| json!({}));
                Some(ToolCallRequest {
                    id,
                    name,
                    arguments,
                })
            })
            .collect()
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai_compat"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        let url = format!("{}/v1/models", self.base_url);
        let mut req = self.client.get(&url);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        match req.send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatMessage, ApiError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.request_body(&request);

        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let res = req.send().await.map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!("Chat completion error: {}", text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        let message = &payload["choices"][0]["message"];

        let content = message["content"].as_str().unwrap_or_default().to_string();
        let tool_calls = Self::parse_tool_calls(message);

        Ok(ChatMessage::assistant_with_tool_calls(content, tool_calls))
    }
}
