//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `QUILL__*` 覆盖（双下划线表示嵌套，如 `QUILL__LLM__REQUEST_TIMEOUT_SECS=30`）。
//! 这里只放进程级设置；模型路由（后端地址、模型名）在运行时配置文件中，见 `core::runtime_config`。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub grammar: GrammarSection,
    #[serde(default)]
    pub web: WebSection,
}

/// [app] 段：运行环境名、是否在日志中输出请求文本片段
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub log_content_enabled: bool,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            log_content_enabled: false,
        }
    }
}

fn default_environment() -> String {
    "development".to_string()
}

/// [llm] 段：单次请求超时与运行时配置文件位置
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_runtime_config_path")]
    pub runtime_config_path: PathBuf,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            runtime_config_path: default_runtime_config_path(),
        }
    }
}

fn default_request_timeout() -> u64 {
    120
}

fn default_runtime_config_path() -> PathBuf {
    PathBuf::from("config/runtime_config.json")
}

/// [grammar] 段：LanguageTool 服务地址、语言与结果裁剪
#[derive(Debug, Clone, Deserialize)]
pub struct GrammarSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_languagetool_url")]
    pub languagetool_url: String,
    #[serde(default = "default_language")]
    pub language: String,
    /// 每条问题最多保留的替换建议数
    #[serde(default = "default_max_replacements")]
    pub max_replacements: usize,
    /// 上下文窗口：问题前后各取多少字符
    #[serde(default = "default_context_chars")]
    pub context_chars: usize,
    #[serde(default = "default_grammar_timeout")]
    pub timeout_secs: u64,
}

impl Default for GrammarSection {
    fn default() -> Self {
        Self {
            enabled: true,
            languagetool_url: default_languagetool_url(),
            language: default_language(),
            max_replacements: default_max_replacements(),
            context_chars: default_context_chars(),
            timeout_secs: default_grammar_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_languagetool_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_max_replacements() -> usize {
    5
}

fn default_context_chars() -> usize {
    40
}

fn default_grammar_timeout() -> u64 {
    30
}

/// [web] 段：quill-web 监听地址
#[derive(Debug, Clone, Deserialize)]
pub struct WebSection {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for WebSection {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

/// 环境变量前缀：`QUILL__<SECTION>__<KEY>`
const ENV_PREFIX: &str = "QUILL";

/// 默认配置文件候选，取第一个存在的
const DEFAULT_FILES: [&str; 3] = ["config/default.toml", "../config/default.toml", "default.toml"];

fn default_file() -> Option<PathBuf> {
    DEFAULT_FILES.iter().map(PathBuf::from).find(|p| p.is_file())
}

/// 加载应用配置：默认文件（可缺省）→ 显式文件（必须存在）→ 环境变量
pub fn load_config(explicit: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = default_file() {
        tracing::debug!("Loading default config from {:?}", path);
        builder = builder.add_source(config::File::from(path));
    }
    if let Some(path) = explicit {
        tracing::debug!("Loading config overrides from {:?}", path);
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}
