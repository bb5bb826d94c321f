//! LLM 传输抽象
//!
//! 所有下游 HTTP 调用（chat、模型列表）经 JsonTransport 完成：生产环境用 reqwest 实现，
//! 测试用 MockTransport 替换并计数。传输层错误统一包装为 LlmError，不向上泄漏 reqwest 类型。

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 模型客户端错误：传输失败（连接、超时、非 2xx）或响应缺少协议要求的字段
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Model request failed: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Model request returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

impl LlmError {
    pub fn transport(message: impl Into<String>) -> Self {
        LlmError::Transport {
            message: message.into(),
            source: None,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        LlmError::MalformedResponse(message.into())
    }

    /// 连接失败、超时、非 2xx 都属于传输类错误
    pub fn is_transport(&self) -> bool {
        matches!(self, LlmError::Transport { .. } | LlmError::Status { .. })
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        let message = if e.is_timeout() {
            format!("timed out: {}", e)
        } else {
            e.to_string()
        };
        LlmError::Transport {
            message,
            source: Some(Box::new(e)),
        }
    }
}

/// JSON over HTTP 传输：一次调用恰好一次网络往返，不重试
#[async_trait]
pub trait JsonTransport: Send + Sync {
    /// POST JSON 请求体，返回解析后的 JSON 响应体
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, LlmError>;

    /// GET 并返回解析后的 JSON 响应体
    async fn get_json(&self, url: &str) -> Result<Value, LlmError>;
}
