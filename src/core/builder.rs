//! 服务构建器：统一的服务初始化逻辑
//!
//! CLI 与 Web 共用同一套装配：运行时配置存储 → HTTP 传输 → 调用器 → 编辑 / 分析 / 语法服务。

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::core::{AppError, RuntimeConfig, RuntimeConfigStore, RuntimeConfigUpdate};
use crate::llm::{HttpTransport, JsonTransport, ModelInvoker};
use crate::services::{AnalysisService, EditingService, GrammarService};

/// 装配完成的服务集合，可廉价克隆后在各请求间共享
#[derive(Clone)]
pub struct Services {
    pub store: Arc<RuntimeConfigStore>,
    pub transport: Arc<dyn JsonTransport>,
    pub invoker: ModelInvoker,
    pub editing: EditingService,
    pub analysis: AnalysisService,
    pub grammar: GrammarService,
}

impl Services {
    /// 查询后端可用模型
    pub async fn list_available_models(&self) -> Result<Vec<String>, AppError> {
        Ok(self.store.list_available_models(self.transport.as_ref()).await?)
    }

    /// 更新运行时配置：落盘在阻塞线程池执行，store 仍由单把锁串行化
    pub async fn update_runtime_config(&self, update: RuntimeConfigUpdate) -> Result<RuntimeConfig, AppError> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.update(update))
            .await
            .map_err(|e| AppError::Internal(format!("Runtime config update task failed: {}", e)))?
    }
}

/// 服务构建器
pub struct ServicesBuilder {
    config: AppConfig,
    transport: Option<Arc<dyn JsonTransport>>,
    grammar: Option<GrammarService>,
}

impl ServicesBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            transport: None,
            grammar: None,
        }
    }

    /// 替换下游传输（测试中注入 MockTransport）
    pub fn with_transport(mut self, transport: Arc<dyn JsonTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// 替换语法检查服务
    pub fn with_grammar(mut self, grammar: GrammarService) -> Self {
        self.grammar = Some(grammar);
        self
    }

    /// 构建；运行时配置文件不可写时失败
    pub fn build(self) -> Result<Services, AppError> {
        let store = Arc::new(RuntimeConfigStore::load(
            self.config.llm.runtime_config_path.clone(),
        )?);

        let transport: Arc<dyn JsonTransport> = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new(Duration::from_secs(
                self.config.llm.request_timeout_secs,
            ))?),
        };

        let invoker = ModelInvoker::new(store.clone(), transport.clone());
        let grammar = self
            .grammar
            .unwrap_or_else(|| GrammarService::from_config(&self.config.grammar));

        Ok(Services {
            editing: EditingService::new(invoker.clone()),
            analysis: AnalysisService::new(invoker.clone()),
            grammar,
            invoker,
            transport,
            store,
        })
    }
}
