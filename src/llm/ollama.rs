//! Ollama `/api/chat` 协议（本地推理风格）
//!
//! 请求：采样参数放在 `options` 中，`num_predict` 即最大输出 token；固定 `stream: false`。
//! 响应：顶层 `message{content, tool_calls?}`，content 去首尾空白；缺少 `message` 视为格式错误。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::protocol::{collect_tool_calls, wire_messages, wire_tools, RawMessage, WireMessage, WireTool};
use crate::llm::types::{ChatMessage, ModelConfig, ModelResult, ToolDeclaration};
use crate::llm::LlmError;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
    options: Options,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool<'a>>>,
}

#[derive(Serialize)]
struct Options {
    temperature: f64,
    num_predict: u32,
    top_p: f64,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<RawMessage>,
}

pub(crate) fn build_request(
    config: &ModelConfig,
    messages: &[ChatMessage],
    tools: &[ToolDeclaration],
) -> Result<Value, LlmError> {
    let request = ChatRequest {
        model: &config.name,
        messages: wire_messages(messages),
        stream: false,
        options: Options {
            temperature: config.temperature,
            num_predict: config.max_tokens,
            top_p: config.top_p,
        },
        tools: wire_tools(tools),
    };
    Ok(serde_json::to_value(request)?)
}

pub(crate) fn parse_response(body: Value) -> Result<ModelResult, LlmError> {
    let response: ChatResponse = serde_json::from_value(body)
        .map_err(|e| LlmError::malformed(format!("Ollama response: {}", e)))?;
    let message = response
        .message
        .ok_or_else(|| LlmError::malformed("Ollama response: missing 'message'"))?;

    Ok(ModelResult {
        content: message.content.unwrap_or_default().trim().to_string(),
        tool_calls: collect_tool_calls(message.tool_calls),
    })
}
