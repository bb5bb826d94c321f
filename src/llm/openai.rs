//! OpenAI 兼容 Chat Completions 协议（托管 API 风格）
//!
//! 请求：采样参数平铺在顶层（temperature / max_tokens / top_p）。
//! assistant 轮的工具调用按严格格式发送：带 `id`、`type: "function"`，arguments 序列化为 JSON 字符串。
//! 响应：取 `choices[0].message`；content 为 null 时归一化为空字符串；
//! tool_calls 的 arguments 通常是 JSON 字符串，单条解析失败只丢弃该条。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::protocol::{collect_tool_calls, wire_tools, RawMessage, WireTool};
use crate::llm::types::{ChatMessage, ModelConfig, ModelResult, Role, ToolDeclaration};
use crate::llm::LlmError;

#[derive(Serialize)]
struct Message<'a> {
    role: Role,
    content: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ToolCall<'a>>,
}

#[derive(Serialize)]
struct ToolCall<'a> {
    id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    function: FunctionCall<'a>,
}

#[derive(Serialize)]
struct FunctionCall<'a> {
    name: &'a str,
    arguments: String,
}

/// 调用 id 在单个请求内唯一：`call_<消息序号>_<调用序号>`
fn messages(messages: &[ChatMessage]) -> Result<Vec<Message<'_>>, LlmError> {
    messages
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let tool_calls = m
                .tool_calls
                .iter()
                .enumerate()
                .map(|(j, tc)| {
                    Ok(ToolCall {
                        id: format!("call_{}_{}", i, j),
                        kind: "function",
                        function: FunctionCall {
                            name: &tc.name,
                            arguments: serde_json::to_string(&tc.arguments)?,
                        },
                    })
                })
                .collect::<Result<Vec<_>, LlmError>>()?;
            Ok(Message {
                role: m.role,
                content: &m.content,
                tool_calls,
            })
        })
        .collect()
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f64,
    max_tokens: u32,
    top_p: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool<'a>>>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: RawMessage,
}

pub(crate) fn build_request(
    config: &ModelConfig,
    messages: &[ChatMessage],
    tools: &[ToolDeclaration],
) -> Result<Value, LlmError> {
    let request = ChatCompletionRequest {
        model: &config.name,
        messages: self::messages(messages)?,
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        top_p: config.top_p,
        tools: wire_tools(tools),
    };
    Ok(serde_json::to_value(request)?)
}

pub(crate) fn parse_response(body: Value) -> Result<ModelResult, LlmError> {
    let response: ChatCompletionResponse = serde_json::from_value(body)
        .map_err(|e| LlmError::malformed(format!("OpenAI response: {}", e)))?;
    let message = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| LlmError::malformed("OpenAI response: missing 'choices'"))?;

    Ok(ModelResult {
        content: message.content.unwrap_or_default(),
        tool_calls: collect_tool_calls(message.tool_calls),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::{BackendKind, ToolInvocation};
    use serde_json::json;

    fn config() -> ModelConfig {
        ModelConfig {
            name: "gpt-4o-mini".to_string(),
            endpoint: "https://api.example.com/v1/chat/completions".to_string(),
            backend: BackendKind::OpenAi,
            temperature: 0.1,
            max_tokens: 512,
            top_p: 0.95,
        }
    }

    #[test]
    fn test_build_request_envelope() {
        let body = build_request(&config(), &[ChatMessage::user("hello")], &[]).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "hello"}],
                "temperature": 0.1,
                "max_tokens": 512,
                "top_p": 0.95
            })
        );
        assert!(body.get("stream").is_none());
        assert!(body.get("options").is_none());
    }

    #[test]
    fn test_assistant_tool_calls_use_strict_shape() {
        let mut args = serde_json::Map::new();
        args.insert("issues".to_string(), json!([]));
        let history = vec![
            ChatMessage::user("sample"),
            ChatMessage::assistant_tool_calls(vec![ToolInvocation::new("report_clarity_issues", args)]),
        ];

        let body = build_request(&config(), &history, &[]).unwrap();
        let call = &body["messages"][1]["tool_calls"][0];
        assert_eq!(call["id"], "call_1_0");
        assert_eq!(call["type"], "function");
        assert_eq!(call["function"]["name"], "report_clarity_issues");
        assert_eq!(call["function"]["arguments"], json!("{\"issues\":[]}"));
        assert!(body["messages"][0].get("tool_calls").is_none());

        let ollama = BackendKind::Ollama.build_request(&config(), &history, &[]).unwrap();
        assert_eq!(ollama["messages"][1]["tool_calls"][0]["function"]["arguments"], json!({"issues": []}));
    }

    #[test]
    fn test_parse_null_content_and_string_arguments() {
        let body = json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "report_clarity_issues",
                            "arguments": "{\"issues\": [{\"quoted_text\": \"at some point in time\", \"suggestion\": \"eventually\"}]}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });
        let result = parse_response(body).unwrap();
        assert_eq!(result.content, "");
        let expected = json!({"issues": [{"quoted_text": "at some point in time", "suggestion": "eventually"}]});
        assert_eq!(
            result.tool_calls,
            vec![ToolInvocation::new(
                "report_clarity_issues",
                expected.as_object().cloned().unwrap()
            )]
        );
    }

    #[test]
    fn test_unparseable_arguments_drop_only_that_call() {
        let body = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "Found issues.",
                    "tool_calls": [
                        {"function": {"name": "broken", "arguments": "{\"issues\": ["}},
                        {"function": {"name": "report_clarity_issues", "arguments": {"issues": []}}}
                    ]
                }
            }]
        });
        let result = parse_response(body).unwrap();
        assert_eq!(result.content, "Found issues.");
        assert_eq!(result.tool_calls.len(), 1);
        assert_eq!(result.tool_calls[0].name, "report_clarity_issues");
    }

    #[test]
    fn test_missing_choices_is_malformed() {
        assert!(matches!(
            parse_response(json!({"choices": []})).unwrap_err(),
            LlmError::MalformedResponse(_)
        ));
        assert!(matches!(
            parse_response(json!({"error": "overloaded"})).unwrap_err(),
            LlmError::MalformedResponse(_)
        ));
    }
}
