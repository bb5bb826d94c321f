//! 语法检查：对接外部 LanguageTool 服务
//!
//! LanguageTool 本身是不透明的外部协作方（`GrammarChecker`）；这里只负责透传配置：
//! 按禁用类别过滤（不区分大小写）、截取前 N 条替换建议、补充上下文窗口。
//! 检查器未启用或调用失败时返回空结果并记录日志，不让单次语法检查拖垮请求。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GrammarSection;

#[derive(Error, Debug)]
pub enum GrammarError {
    #[error("Grammar check request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Grammar service returned HTTP {0}")]
    Status(u16),
}

/// 外部检查器返回的原始发现（offset / length 以字符计）
#[derive(Debug, Clone, PartialEq)]
pub struct RawGrammarMatch {
    pub message: String,
    pub offset: usize,
    pub length: usize,
    pub replacements: Vec<String>,
    pub rule_id: String,
    pub category: String,
    pub sentence: Option<String>,
}

/// 语法检查器：输入原文，返回发现列表
#[async_trait]
pub trait GrammarChecker: Send + Sync {
    async fn check(&self, text: &str) -> Result<Vec<RawGrammarMatch>, GrammarError>;
}

/// LanguageTool HTTP 客户端（`POST {base_url}/v2/check`，表单编码）
pub struct LanguageToolClient {
    client: Client,
    base_url: String,
    language: String,
}

impl LanguageToolClient {
    pub fn new(base_url: &str, language: &str, timeout_secs: u64) -> Result<Self, GrammarError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            language: language.to_string(),
        })
    }
}

#[derive(Deserialize)]
struct LtResponse {
    #[serde(default)]
    matches: Vec<LtMatch>,
}

#[derive(Deserialize)]
struct LtMatch {
    #[serde(default)]
    message: String,
    offset: usize,
    length: usize,
    #[serde(default)]
    replacements: Vec<LtReplacement>,
    #[serde(default)]
    sentence: Option<String>,
    rule: LtRule,
}

#[derive(Deserialize)]
struct LtReplacement {
    value: String,
}

#[derive(Deserialize)]
struct LtRule {
    id: String,
    category: LtCategory,
}

#[derive(Deserialize)]
struct LtCategory {
    id: String,
}

#[async_trait]
impl GrammarChecker for LanguageToolClient {
    async fn check(&self, text: &str) -> Result<Vec<RawGrammarMatch>, GrammarError> {
        let url = format!("{}/v2/check", self.base_url);
        let resp = self
            .client
            .post(&url)
            .form(&[("text", text), ("language", self.language.as_str())])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(GrammarError::Status(resp.status().as_u16()));
        }
        let body: LtResponse = resp.json().await?;
        Ok(body
            .matches
            .into_iter()
            .map(|m| RawGrammarMatch {
                message: m.message,
                offset: m.offset,
                length: m.length,
                replacements: m.replacements.into_iter().map(|r| r.value).collect(),
                rule_id: m.rule.id,
                category: m.rule.category.id,
                sentence: m.sentence,
            })
            .collect())
    }
}

/// 单次检查的规则配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GrammarCheckConfig {
    /// 禁用的类别 id（如 STYLE、TYPOGRAPHY）
    #[serde(default)]
    pub disabled_categories: Vec<String>,
}

/// 对外返回的一条语法问题
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrammarMatch {
    pub message: String,
    pub offset: usize,
    pub length: usize,
    pub replacements: Vec<String>,
    pub rule_id: String,
    pub category: String,
    pub context: String,
    pub sentence: String,
    pub offset_in_context: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheckResponse {
    pub matches: Vec<GrammarMatch>,
}

/// `POST /v1/text/check` 的请求体；规则配置也接受旧客户端使用的 `language_tool_config`
#[derive(Debug, Clone, Deserialize)]
pub struct CheckRequest {
    pub text: String,
    #[serde(default, alias = "language_tool_config")]
    pub config: Option<GrammarCheckConfig>,
}

/// 语法检查服务
#[derive(Clone)]
pub struct GrammarService {
    checker: Option<Arc<dyn GrammarChecker>>,
    max_replacements: usize,
    context_chars: usize,
}

impl GrammarService {
    pub fn new(checker: Option<Arc<dyn GrammarChecker>>, max_replacements: usize, context_chars: usize) -> Self {
        Self {
            checker,
            max_replacements,
            context_chars,
        }
    }

    /// 按 [grammar] 配置创建；禁用或客户端构建失败时退化为空检查器
    pub fn from_config(config: &GrammarSection) -> Self {
        let checker: Option<Arc<dyn GrammarChecker>> = if !config.enabled {
            tracing::info!("Grammar checking disabled by configuration");
            None
        } else {
            match LanguageToolClient::new(&config.languagetool_url, &config.language, config.timeout_secs) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    tracing::warn!("Failed to initialize LanguageTool client: {}", e);
                    None
                }
            }
        };
        Self::new(checker, config.max_replacements, config.context_chars)
    }

    pub fn is_enabled(&self) -> bool {
        self.checker.is_some()
    }

    pub async fn check(&self, text: &str, config: Option<&GrammarCheckConfig>) -> CheckResponse {
        let Some(checker) = &self.checker else {
            return CheckResponse::default();
        };

        let raw = match checker.check(text).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Error during grammar check: {}", e);
                return CheckResponse::default();
            }
        };

        let disabled: HashSet<String> = config
            .map(|c| c.disabled_categories.iter().map(|c| c.to_uppercase()).collect())
            .unwrap_or_default();

        let chars: Vec<char> = text.chars().collect();
        let matches = raw
            .into_iter()
            .filter(|m| !disabled.contains(&m.category.to_uppercase()))
            .map(|m| self.with_context(&chars, m))
            .collect();

        CheckResponse { matches }
    }

    fn with_context(&self, chars: &[char], m: RawGrammarMatch) -> GrammarMatch {
        let start = m.offset.saturating_sub(self.context_chars).min(chars.len());
        let end = (m.offset + m.length + self.context_chars).min(chars.len());
        let context: String = chars[start..end.max(start)].iter().collect();

        let mut replacements = m.replacements;
        replacements.truncate(self.max_replacements);

        GrammarMatch {
            message: m.message,
            offset: m.offset,
            length: m.length,
            replacements,
            rule_id: m.rule_id,
            category: m.category,
            sentence: m.sentence.unwrap_or_else(|| context.clone()),
            context,
            offset_in_context: m.offset.saturating_sub(start),
        }
    }
}
