//! LLM 层的统一数据模型：会话消息、工具声明/调用、模型配置与调用结果
//!
//! 与具体后端无关；线上格式的转换见 `protocol`、`ollama`、`openai`。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 消息角色（与 Chat API 一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// 单条会话消息；assistant 示例轮可附带工具调用（few-shot）
#[derive(Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub tool_calls: Vec<ToolInvocation>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// 仅含工具调用、无文本的 assistant 轮
    pub fn assistant_tool_calls(tool_calls: Vec<ToolInvocation>) -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            tool_calls,
        }
    }
}

/// 可调用工具的声明：参数为 JSON Schema，原样透传给后端
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// 从响应中解析出的一次工具调用
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// 归一化后的模型结果：文本（可能为空）+ 零或多个工具调用
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ModelResult {
    pub content: String,
    pub tool_calls: Vec<ToolInvocation>,
}

impl ModelResult {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// 后端线上协议种类
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// 本地推理风格（Ollama `/api/chat`）
    Ollama,
    /// 托管 API 风格（OpenAI Chat Completions 兼容）
    OpenAi,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Ollama => "ollama",
            BackendKind::OpenAi => "openai",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单个模型目标的完整配置；每次解析时重新生成，不做原地修改
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelConfig {
    pub name: String,
    pub endpoint: String,
    pub backend: BackendKind,
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
}

/// 逻辑任务：精确（语法/分析，低温）与通用（改写，较高温）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Precision,
    General,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Precision => "precision",
            TaskKind::General => "general",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "precision" | "grammar" | "analysis" => Ok(TaskKind::Precision),
            "general" => Ok(TaskKind::General),
            other => Err(format!("Unknown task: {}", other)),
        }
    }
}
