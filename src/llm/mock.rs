//! Mock 传输（用于测试，无需真实后端）
//!
//! 按顺序返回预置响应，记录每次请求（方法、URL、请求体），便于断言「恰好一次请求」或「零次请求」。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::llm::{JsonTransport, LlmError};

/// 一次被记录的请求
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub body: Option<Value>,
}

/// 预置响应：成功的 JSON 或错误
#[derive(Debug)]
pub enum MockReply {
    Json(Value),
    TransportError(String),
    Status(u16, String),
}

/// Mock 传输：队列为空时返回一个空内容的 Ollama 风格响应
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以给定 JSON 响应序列构造
    pub fn with_replies(replies: impl IntoIterator<Item = Value>) -> Self {
        let mock = Self::new();
        for reply in replies {
            mock.push(MockReply::Json(reply));
        }
        mock
    }

    pub fn push(&self, reply: MockReply) {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
    }

    /// 已发出的请求数
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// 已记录请求的快照
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn record(&self, method: &'static str, url: &str, body: Option<&Value>) -> Result<Value, LlmError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedRequest {
                method,
                url: url.to_string(),
                body: body.cloned(),
            });

        let reply = self
            .replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        match reply {
            Some(MockReply::Json(v)) => Ok(v),
            Some(MockReply::TransportError(msg)) => Err(LlmError::transport(msg)),
            Some(MockReply::Status(status, body)) => Err(LlmError::Status { status, body }),
            None => Ok(json!({ "message": { "role": "assistant", "content": "" } })),
        }
    }
}

#[async_trait]
impl JsonTransport for MockTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, LlmError> {
        self.record("POST", url, Some(body))
    }

    async fn get_json(&self, url: &str) -> Result<Value, LlmError> {
        self.record("GET", url, None)
    }
}
