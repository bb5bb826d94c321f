//! 模型调用器：逻辑任务 → 配置解析 → 构建请求 → 一次网络往返 → 解析响应
//!
//! 每次调用都重新从 RuntimeConfigStore 解析配置（取副本后立即释放锁），配置更新在下一次请求生效。
//! 不重试、不合并请求；失败直接以 LlmError 返回。

use std::sync::Arc;
use std::time::Instant;

use crate::core::RuntimeConfigStore;
use crate::llm::types::{ChatMessage, ModelConfig, ModelResult, TaskKind, ToolDeclaration};
use crate::llm::{JsonTransport, LlmError};

/// 一次调用的结果：所用配置、归一化结果与墙钟耗时
#[derive(Debug, Clone)]
pub struct Invocation {
    pub model: ModelConfig,
    pub result: ModelResult,
    pub latency_ms: f64,
}

#[derive(Clone)]
pub struct ModelInvoker {
    store: Arc<RuntimeConfigStore>,
    transport: Arc<dyn JsonTransport>,
}

impl ModelInvoker {
    pub fn new(store: Arc<RuntimeConfigStore>, transport: Arc<dyn JsonTransport>) -> Self {
        Self { store, transport }
    }

    pub fn store(&self) -> &Arc<RuntimeConfigStore> {
        &self.store
    }

    /// 按逻辑任务解析配置并调用
    pub async fn invoke(
        &self,
        task: TaskKind,
        messages: &[ChatMessage],
        tools: &[ToolDeclaration],
    ) -> Result<Invocation, LlmError> {
        let model = self.store.resolve_for_task(task);
        self.invoke_with(model, messages, tools).await
    }

    /// 使用已解析好的配置调用
    pub async fn invoke_with(
        &self,
        model: ModelConfig,
        messages: &[ChatMessage],
        tools: &[ToolDeclaration],
    ) -> Result<Invocation, LlmError> {
        let body = model.backend.build_request(&model, messages, tools)?;

        let start = Instant::now();
        let raw = self.transport.post_json(&model.endpoint, &body).await?;
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        let result = model.backend.parse_response(raw)?;

        tracing::debug!(
            "Model call completed | model={} backend={} latency_ms={:.2} tool_calls={}",
            model.name,
            model.backend,
            latency_ms,
            result.tool_calls.len()
        );

        Ok(Invocation {
            model,
            result,
            latency_ms,
        })
    }
}
