use crate::error::FinteamError;
use crate::llm::traits::*;
use crate::tools::ToolDefinition;
use futures::channel::mpsc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Client for any OpenAI-compatible `/v1/chat/completions` endpoint.
/// Groq, Together, OpenRouter and Ollama all speak this dialect.
pub struct OpenAIClient {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl OpenAIClient {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.into(),
            base_url: crate::constants::endpoints::OPENAI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn request_body(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        stream: bool,
    ) -> OpenAIRequest {
        OpenAIRequest {
            model: self.model.clone(),
            messages: messages.iter().map(to_wire_message).collect(),
            tools: if tools.is_empty() {
                None
            } else {
                Some(tools.iter().map(to_wire_tool).collect())
            },
            stream: stream.then_some(true),
            stream_options: stream.then(|| serde_json::json!({ "include_usage": true })),
        }
    }

    async fn post(&self, body: &OpenAIRequest) -> Result<reqwest::Response, FinteamError> {
        let mut request = self.client.post(self.endpoint()).json(body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(FinteamError::Llm(format!(
                "chat completions error ({}): {}",
                status, text
            )));
        }
        Ok(response)
    }
}

fn to_wire_message(m: &Message) -> Value {
    if let Some(ref tool_call_id) = m.tool_call_id {
        serde_json::json!({
            "role": "tool",
            "tool_call_id": tool_call_id,
            "content": m.content,
        })
    } else if let Some(ref tool_calls) = m.tool_calls {
        let tcs: Vec<Value> = tool_calls
            .iter()
            .map(|tc| {
                serde_json::json!({
                    "id": tc.id,
                    "type": "function",
                    "function": {
                        "name": tc.function.name,
                        "arguments": tc.function.arguments,
                    }
                })
            })
            .collect();
        serde_json::json!({
            "role": "assistant",
            "content": m.content,
            "tool_calls": tcs,
        })
    } else {
        serde_json::json!({
            "role": m.role,
            "content": m.content,
        })
    }
}

fn to_wire_tool(t: &ToolDefinition) -> Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": t.name,
            "description": t.description,
            "parameters": t.parameters,
        }
    })
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<OpenAIToolCall>,
}

#[derive(Debug, Deserialize)]
struct OpenAIToolCall {
    id: String,
    function: OpenAIFunction,
}

#[derive(Debug, Deserialize)]
struct OpenAIFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<Value>,
}

pub(crate) fn parse_completion(body: &str) -> Result<LlmResponse, FinteamError> {
    let api_response: OpenAIResponse = serde_json::from_str(body)
        .map_err(|e| FinteamError::Llm(format!("Failed to parse response: {e}")))?;

    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| FinteamError::Llm("No choices in response".into()))?;

    let content = choice.message.content.unwrap_or_default();
    let tool_calls: Vec<ToolCall> = choice
        .message
        .tool_calls
        .into_iter()
        .map(|tc| ToolCall::function(tc.id, tc.function.name, tc.function.arguments))
        .collect();

    let message = if tool_calls.is_empty() {
        Message::assistant(content)
    } else {
        Message::assistant_with_tools(content, tool_calls)
    };

    Ok(LlmResponse {
        message,
        usage: api_response.usage.map(|u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        }),
    })
}

/// Incremental decoder for the `data: {...}` server-sent-event lines of a
/// streamed completion.
#[derive(Default)]
pub(crate) struct SseDecoder {
    // Raw bytes; a chunk may end inside a multi-byte character
    buffer: Vec<u8>,
    // OpenAI only sends the id on the first delta of each tool call, keyed by index
    tool_call_ids: HashMap<u64, String>,
    open_order: Vec<u64>,
    finished: bool,
}

impl SseDecoder {
    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim();

            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();

            if data == "[DONE]" {
                events.extend(self.close_tool_calls());
                events.push(StreamEvent::Done);
                self.finished = true;
                return events;
            }

            if let Ok(event) = serde_json::from_str::<Value>(data) {
                self.decode_event(&event, &mut events);
            }
        }

        events
    }

    fn close_tool_calls(&mut self) -> Vec<StreamEvent> {
        let mut closed = Vec::new();
        for index in self.open_order.drain(..) {
            if let Some(id) = self.tool_call_ids.remove(&index) {
                closed.push(StreamEvent::ToolCallEnd { id });
            }
        }
        closed
    }

    fn decode_event(&mut self, event: &Value, events: &mut Vec<StreamEvent>) {
        if let Some(usage) = event.get("usage").filter(|u| !u.is_null()) {
            let input = usage
                .get("prompt_tokens")
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as u32;
            let output = usage
                .get("completion_tokens")
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as u32;
            if input > 0 || output > 0 {
                events.push(StreamEvent::Usage(Usage {
                    input_tokens: input,
                    output_tokens: output,
                }));
            }
        }

        let Some(delta) = event
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|c| c.get("delta"))
        else {
            return;
        };

        if let Some(content) = delta.get("content").and_then(|c| c.as_str()) {
            if !content.is_empty() {
                events.push(StreamEvent::TextDelta(content.to_string()));
            }
        }

        let Some(tool_calls) = delta.get("tool_calls").and_then(|t| t.as_array()) else {
            return;
        };

        for tc in tool_calls {
            let index = tc.get("index").and_then(|i| i.as_u64()).unwrap_or(0);
            if let Some(id) = tc.get("id").and_then(|i| i.as_str()).filter(|id| !id.is_empty()) {
                if !self.tool_call_ids.contains_key(&index) {
                    self.open_order.push(index);
                }
                self.tool_call_ids.insert(index, id.to_string());
            }
            let id = self.tool_call_ids.get(&index).cloned().unwrap_or_default();

            let Some(func) = tc.get("function") else {
                continue;
            };
            if let Some(name) = func.get("name").and_then(|n| n.as_str()).filter(|n| !n.is_empty()) {
                events.push(StreamEvent::ToolCallStart {
                    id: id.clone(),
                    name: name.to_string(),
                });
            }
            if let Some(args) = func.get("arguments").and_then(|a| a.as_str()).filter(|a| !a.is_empty()) {
                events.push(StreamEvent::ToolCallDelta {
                    id,
                    arguments_delta: args.to_string(),
                });
            }
        }
    }

    /// Called when the byte stream ends without a `[DONE]` marker.
    pub(crate) fn finish(&mut self) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }
        let mut events = self.feed(b"\n");
        if !self.finished {
            events.extend(self.close_tool_calls());
            events.push(StreamEvent::Done);
            self.finished = true;
        }
        events
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAIClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse, FinteamError> {
        let body = self.request_body(messages, tools, false);
        let response = self.post(&body).await?;
        let text = response.text().await?;
        parse_completion(&text)
    }

    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<mpsc::UnboundedReceiver<StreamEvent>, FinteamError> {
        let body = self.request_body(messages, tools, true);
        let response = self.post(&body).await?;

        let (tx, rx) = mpsc::unbounded();
        let mut stream = response.bytes_stream();

        tokio::spawn(async move {
            use futures::StreamExt;
            let mut decoder = SseDecoder::default();

            while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        let _ = tx.unbounded_send(StreamEvent::Error(e.to_string()));
                        return;
                    }
                };

                for event in decoder.feed(&chunk) {
                    if tx.unbounded_send(event).is_err() {
                        return;
                    }
                }
                if decoder.is_finished() {
                    return;
                }
            }

            for event in decoder.finish() {
                let _ = tx.unbounded_send(event);
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completion_with_tool_calls() {
        let body = r#"{
            "choices": [{"message": {"content": null, "tool_calls": [
                {"id": "call_1", "type": "function",
                 "function": {"name": "get_current_stock_price", "arguments": "{\"symbol\":\"NVDA\"}"}}
            ]}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3}
        }"#;

        let response = parse_completion(body).unwrap();
        let calls = response.message.tool_calls.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.name, "get_current_stock_price");
        assert_eq!(calls[0].parse_arguments().unwrap()["symbol"], "NVDA");
        assert_eq!(
            response.usage,
            Some(Usage {
                input_tokens: 12,
                output_tokens: 3
            })
        );
    }

    #[test]
    fn test_parse_completion_without_choices_is_error() {
        let err = parse_completion(r#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, FinteamError::Llm(_)));
    }

    #[test]
    fn test_sse_decoder_text_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        let mut events = decoder.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel");
        assert!(events.is_empty());
        events.extend(decoder.feed(b"lo\"}}]}\n\ndata: [DONE]\n"));

        assert!(matches!(&events[0], StreamEvent::TextDelta(t) if t == "Hello"));
        assert!(matches!(events.last(), Some(StreamEvent::Done)));
        assert!(decoder.is_finished());
    }

    #[test]
    fn test_sse_decoder_tool_call_ids_by_index() {
        let mut decoder = SseDecoder::default();
        let events = decoder.feed(concat!(
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_a\",\"function\":{\"name\":\"duckduckgo_search\",\"arguments\":\"\"}}]}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"{\\\"query\\\":\\\"nvda\\\"}\"}}]}}]}\n",
            "data: [DONE]\n",
        ).as_bytes());

        assert!(matches!(&events[0], StreamEvent::ToolCallStart { id, name } if id == "call_a" && name == "duckduckgo_search"));
        assert!(matches!(&events[1], StreamEvent::ToolCallDelta { id, arguments_delta } if id == "call_a" && arguments_delta.contains("nvda")));
        assert!(matches!(&events[2], StreamEvent::ToolCallEnd { id } if id == "call_a"));
        assert!(matches!(events[3], StreamEvent::Done));
    }

    #[test]
    fn test_sse_decoder_finish_without_done_marker() {
        let mut decoder = SseDecoder::default();
        let events = decoder.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}");
        assert!(events.is_empty());
        let tail = decoder.finish();
        assert!(matches!(&tail[0], StreamEvent::TextDelta(t) if t == "x"));
        assert!(matches!(tail.last(), Some(StreamEvent::Done)));
    }

    #[test]
    fn test_sse_decoder_character_split_across_chunks() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"price €120\"}}]}\n".as_bytes();
        let euro = line
            .windows(3)
            .position(|w| w == "€".as_bytes())
            .unwrap();

        let mut decoder = SseDecoder::default();
        let mut events = decoder.feed(&line[..euro + 1]);
        assert!(events.is_empty());
        events.extend(decoder.feed(&line[euro + 1..]));

        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], StreamEvent::TextDelta(t) if t == "price €120"));
    }
}
