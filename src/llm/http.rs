//! reqwest 实现的 JsonTransport
//!
//! 客户端级超时（来自 [llm].request_timeout_secs）；非 2xx 状态带响应体截断后包装为 LlmError::Status。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;

use crate::llm::{JsonTransport, LlmError};

/// 错误响应体最多保留的字符数
const MAX_ERROR_BODY_CHARS: usize = 500;

/// HTTP 传输：持有带超时的 reqwest::Client，可廉价克隆
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("quill/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    async fn into_json(resp: Response) -> Result<Value, LlmError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| LlmError::malformed(format!("response body is not JSON: {}", e)))
    }
}

#[async_trait]
impl JsonTransport for HttpTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, LlmError> {
        tracing::debug!("POST {}", url);
        let resp = self.client.post(url).json(body).send().await?;
        Self::into_json(resp).await
    }

    async fn get_json(&self, url: &str) -> Result<Value, LlmError> {
        tracing::debug!("GET {}", url);
        let resp = self.client.get(url).send().await?;
        Self::into_json(resp).await
    }
}
