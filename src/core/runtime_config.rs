//! 运行时模型路由配置：逻辑任务 → 后端地址与模型名
//!
//! 持久化为扁平 JSON（`ollama_base_url` / `grammar_model` / `general_model`），启动时加载，
//! 不存在则写入内置默认值。读取与「读-改-写-持久化」全部在同一把 Mutex 下串行；
//! 网络调用（模型列表）前先取副本并释放锁。

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::AppError;
use crate::llm::{BackendKind, JsonTransport, LlmError, ModelConfig, TaskKind};

pub const DEFAULT_BASE_URL: &str = "http://10.8.14.169:11434";
pub const DEFAULT_GRAMMAR_MODEL: &str = "llama3:instruct";
pub const DEFAULT_GENERAL_MODEL: &str = "qwen2:7b-instruct";

/// 持久化的运行时配置；base_url 无尾部斜杠，模型名已去空白且非空
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    #[serde(rename = "ollama_base_url")]
    pub base_url: String,
    pub grammar_model: String,
    pub general_model: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            grammar_model: DEFAULT_GRAMMAR_MODEL.to_string(),
            general_model: DEFAULT_GENERAL_MODEL.to_string(),
        }
    }
}

impl RuntimeConfig {
    /// 在 self 之上合并 update 中非空的字段
    fn merged(&self, update: &RuntimeConfigUpdate) -> Self {
        Self {
            base_url: pick(update.base_url.as_deref().map(normalize_base_url), &self.base_url),
            grammar_model: pick(update.grammar_model.as_deref().map(str::trim), &self.grammar_model),
            general_model: pick(update.general_model.as_deref().map(str::trim), &self.general_model),
        }
    }

    /// 读入磁盘记录后的规范化；空字段回落到默认值
    fn normalized(self) -> Self {
        let defaults = Self::default();
        Self {
            base_url: pick(Some(normalize_base_url(&self.base_url)), &defaults.base_url),
            grammar_model: pick(Some(self.grammar_model.trim()), &defaults.grammar_model),
            general_model: pick(Some(self.general_model.trim()), &defaults.general_model),
        }
    }

    /// `{base_url}/api/chat`
    pub fn chat_endpoint(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    /// `{base_url}/api/tags`
    pub fn tags_endpoint(&self) -> String {
        format!("{}/api/tags", self.base_url)
    }
}

fn normalize_base_url(url: &str) -> &str {
    url.trim().trim_end_matches('/')
}

fn pick(candidate: Option<&str>, fallback: &str) -> String {
    candidate
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// 部分更新：None 或空白字段保留旧值
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RuntimeConfigUpdate {
    #[serde(default, rename = "ollama_base_url")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub grammar_model: Option<String>,
    #[serde(default)]
    pub general_model: Option<String>,
}

/// 采样参数预设：(temperature, max_tokens, top_p)
const PRECISION_SAMPLING: (f64, u32, f64) = (0.1, 512, 0.95);
const GENERAL_SAMPLING: (f64, u32, f64) = (0.5, 768, 0.9);

/// 运行时配置存储：内存状态 + 磁盘记录，由单把互斥锁保护
#[derive(Debug)]
pub struct RuntimeConfigStore {
    path: PathBuf,
    state: Mutex<RuntimeConfig>,
}

impl RuntimeConfigStore {
    /// 从 path 加载；文件不存在时写入默认配置。目录或文件不可写时返回 ConfigStorage
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let config = if path.exists() {
            read_record(&path)?
        } else {
            let config = RuntimeConfig::default();
            write_record(&path, &config)?;
            tracing::info!("Created default runtime config at {:?}", path);
            config
        };
        tracing::info!(
            "Runtime config loaded | base_url={} grammar_model={} general_model={}",
            config.base_url,
            config.grammar_model,
            config.general_model
        );
        Ok(Self {
            path,
            state: Mutex::new(config),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, RuntimeConfig> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 当前配置副本
    pub fn get(&self) -> RuntimeConfig {
        self.lock().clone()
    }

    /// 合并、持久化并替换内存状态；写盘失败时内存状态不变
    pub fn update(&self, update: RuntimeConfigUpdate) -> Result<RuntimeConfig, AppError> {
        let mut state = self.lock();
        let updated = state.merged(&update);
        write_record(&self.path, &updated)?;
        *state = updated.clone();
        tracing::info!(
            "Runtime config updated | base_url={} grammar_model={} general_model={}",
            updated.base_url,
            updated.grammar_model,
            updated.general_model
        );
        Ok(updated)
    }

    /// 为逻辑任务生成完整的模型配置
    pub fn resolve_for_task(&self, task: TaskKind) -> ModelConfig {
        let config = self.get();
        let (name, (temperature, max_tokens, top_p)) = match task {
            TaskKind::Precision => (config.grammar_model.clone(), PRECISION_SAMPLING),
            TaskKind::General => (config.general_model.clone(), GENERAL_SAMPLING),
        };
        ModelConfig {
            name,
            endpoint: config.chat_endpoint(),
            backend: BackendKind::Ollama,
            temperature,
            max_tokens,
            top_p,
        }
    }

    /// 查询后端可用模型（GET `{base_url}/api/tags`）；响应中无模型时返回空列表
    pub async fn list_available_models(
        &self,
        transport: &dyn JsonTransport,
    ) -> Result<Vec<String>, LlmError> {
        let url = self.get().tags_endpoint();
        let body = transport.get_json(&url).await?;
        Ok(model_names(&body))
    }
}

/// 从 `{"models": [{"name"|"model": ...}]}` 中提取模型名
fn model_names(body: &Value) -> Vec<String> {
    let Some(models) = body.get("models").and_then(Value::as_array) else {
        return Vec::new();
    };
    models
        .iter()
        .filter_map(|m| {
            ["name", "model"]
                .iter()
                .filter_map(|key| m.get(*key).and_then(Value::as_str))
                .find(|s| !s.is_empty())
                .map(String::from)
        })
        .collect()
}

fn read_record(path: &Path) -> Result<RuntimeConfig, AppError> {
    let data = std::fs::read_to_string(path).map_err(|e| AppError::storage(path, e))?;
    let config: RuntimeConfig =
        serde_json::from_str(&data).map_err(|e| AppError::format(path, e))?;
    Ok(config.normalized())
}

/// 整文件替换：先写同目录临时文件再 rename
fn write_record(path: &Path, config: &RuntimeConfig) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| AppError::storage(parent, e))?;
    }
    let data = serde_json::to_string_pretty(config).map_err(|e| AppError::format(path, e))?;

    let mut tmp: OsString = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, data).map_err(|e| AppError::storage(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| AppError::storage(path, e))?;
    Ok(())
}
