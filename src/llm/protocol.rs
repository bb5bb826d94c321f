//! 后端协议适配：按 BackendKind 分派到唯一的请求构建 / 响应解析策略
//!
//! 两种后端共用同一套消息与工具声明的线上形状，只有外层信封不同
//!（OpenAI 的 assistant 工具调用另有严格格式，见 `openai` 模块）：
//! - `Ollama`：`{model, messages, stream, options{temperature, num_predict, top_p}, tools?}`
//! - `OpenAi`：`{model, messages, temperature, max_tokens, top_p, tools?}`
//!
//! 工具调用参数在解析边界归一化：先按对象取，再尝试按 JSON 字符串解码，都不行则丢弃该调用。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::llm::types::{BackendKind, ChatMessage, ModelConfig, ModelResult, Role, ToolDeclaration, ToolInvocation};
use crate::llm::{ollama, openai, LlmError};

impl BackendKind {
    /// 构建该后端的请求体；tools 为空时不附带 `tools` 字段
    pub fn build_request(
        &self,
        config: &ModelConfig,
        messages: &[ChatMessage],
        tools: &[ToolDeclaration],
    ) -> Result<Value, LlmError> {
        match self {
            BackendKind::Ollama => ollama::build_request(config, messages, tools),
            BackendKind::OpenAi => openai::build_request(config, messages, tools),
        }
    }

    /// 将该后端的原始响应体解析为统一的 ModelResult
    pub fn parse_response(&self, body: Value) -> Result<ModelResult, LlmError> {
        match self {
            BackendKind::Ollama => ollama::parse_response(body),
            BackendKind::OpenAi => openai::parse_response(body),
        }
    }
}

// ---- 请求侧：共享的消息 / 工具线上形状 ----

#[derive(Serialize)]
pub(crate) struct WireMessage<'a> {
    role: Role,
    content: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall<'a>>,
}

#[derive(Serialize)]
struct WireToolCall<'a> {
    function: WireFunctionCall<'a>,
}

#[derive(Serialize)]
struct WireFunctionCall<'a> {
    name: &'a str,
    arguments: &'a Map<String, Value>,
}

#[derive(Serialize)]
pub(crate) struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolDeclaration,
}

pub(crate) fn wire_messages(messages: &[ChatMessage]) -> Vec<WireMessage<'_>> {
    messages
        .iter()
        .map(|m| WireMessage {
            role: m.role,
            content: &m.content,
            tool_calls: m
                .tool_calls
                .iter()
                .map(|tc| WireToolCall {
                    function: WireFunctionCall {
                        name: &tc.name,
                        arguments: &tc.arguments,
                    },
                })
                .collect(),
        })
        .collect()
}

pub(crate) fn wire_tools(tools: &[ToolDeclaration]) -> Option<Vec<WireTool<'_>>> {
    if tools.is_empty() {
        return None;
    }
    Some(
        tools
            .iter()
            .map(|t| WireTool {
                kind: "function",
                function: t,
            })
            .collect(),
    )
}

// ---- 响应侧：宽松的消息形状 ----

#[derive(Debug, Deserialize)]
pub(crate) struct RawMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<RawToolCall>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawToolCall {
    #[serde(default)]
    function: Option<RawFunction>,
}

#[derive(Debug, Deserialize)]
struct RawFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<Value>,
}

/// 参数归一化：对象原样返回；字符串按 JSON 解码为对象；缺省视为空参数；其它返回 None
pub(crate) fn normalize_arguments(raw: Option<Value>) -> Option<Map<String, Value>> {
    match raw {
        None | Some(Value::Null) => Some(Map::new()),
        Some(Value::Object(map)) => Some(map),
        Some(Value::String(s)) if s.trim().is_empty() => Some(Map::new()),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(&s) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        },
        Some(_) => None,
    }
}

/// 将原始 tool_calls 转为 ToolInvocation；无 function 的条目跳过，参数无法解析的条目丢弃
pub(crate) fn collect_tool_calls(raw: Option<Vec<RawToolCall>>) -> Vec<ToolInvocation> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    raw.into_iter()
        .filter_map(|tc| tc.function)
        .filter_map(|f| {
            let name = f.name.unwrap_or_default();
            match normalize_arguments(f.arguments) {
                Some(arguments) => Some(ToolInvocation { name, arguments }),
                None => {
                    tracing::warn!("Dropping tool call '{}': arguments are not a JSON object", name);
                    None
                }
            }
        })
        .collect()
}
