//! 编辑服务：模式 → 逻辑任务 → 组装会话 → 调用模型 → EditResult
//!
//! 模式表固定：proofread 走 Precision，其余（rewrite / tone / technical）走 General。
//! 校验失败（空文本、tone 模式缺语气）在任何网络调用之前返回。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::AppError;
use crate::llm::{ModelConfig, ModelInvoker, TaskKind};
use crate::prompts::build_edit_messages;

/// 编辑模式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Proofread,
    Rewrite,
    Tone,
    Technical,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Proofread, Mode::Rewrite, Mode::Tone, Mode::Technical];

    /// 模式到逻辑任务的固定映射
    pub fn task(&self) -> TaskKind {
        match self {
            Mode::Proofread => TaskKind::Precision,
            Mode::Rewrite | Mode::Tone | Mode::Technical => TaskKind::General,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Proofread => "proofread",
            Mode::Rewrite => "rewrite",
            Mode::Tone => "tone",
            Mode::Technical => "technical",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown mode: {} (expected proofread, rewrite, tone or technical)", s))
    }
}

/// tone 模式的语气预设
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Professional,
    Concise,
    Friendly,
}

impl Tone {
    pub const ALL: [Tone; 3] = [Tone::Professional, Tone::Concise, Tone::Friendly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Concise => "concise",
            Tone::Friendly => "friendly",
        }
    }
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tone::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown tone: {} (expected professional, concise or friendly)", s))
    }
}

/// 编辑请求
#[derive(Debug, Clone, Deserialize)]
pub struct EditRequest {
    pub text: String,
    pub mode: Mode,
    #[serde(default)]
    pub tone: Option<Tone>,
    #[serde(default)]
    pub extra_instructions: Option<String>,
}

impl EditRequest {
    pub fn new(text: impl Into<String>, mode: Mode) -> Self {
        Self {
            text: text.into(),
            mode,
            tone: None,
            extra_instructions: None,
        }
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = Some(tone);
        self
    }

    pub fn with_extra_instructions(mut self, extra: impl Into<String>) -> Self {
        self.extra_instructions = Some(extra.into());
        self
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.text.trim().is_empty() {
            return Err(AppError::validation("Text must contain non-whitespace characters."));
        }
        if self.mode == Mode::Tone && self.tone.is_none() {
            return Err(AppError::validation("Tone must be supplied when mode is 'tone'."));
        }
        Ok(())
    }
}

/// 编辑结果：模式、所用模型配置、输出文本与耗时
#[derive(Debug, Clone, Serialize)]
pub struct EditResult {
    pub mode: Mode,
    pub model: ModelConfig,
    pub output_text: String,
    pub latency_ms: f64,
}

/// 编辑服务
#[derive(Clone)]
pub struct EditingService {
    invoker: ModelInvoker,
}

impl EditingService {
    pub fn new(invoker: ModelInvoker) -> Self {
        Self { invoker }
    }

    pub async fn edit(&self, request: &EditRequest) -> Result<EditResult, AppError> {
        request.validate()?;

        let messages = build_edit_messages(
            &request.text,
            request.mode,
            request.tone,
            request.extra_instructions.as_deref(),
        );

        let invocation = self.invoker.invoke(request.mode.task(), &messages, &[]).await?;

        tracing::debug!(
            "Editing completed | mode={} model={} latency_ms={:.2} text_len={}",
            request.mode,
            invocation.model.name,
            invocation.latency_ms,
            request.text.len()
        );

        Ok(EditResult {
            mode: request.mode,
            model: invocation.model,
            output_text: invocation.result.content,
            latency_ms: invocation.latency_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RuntimeConfigStore;
    use crate::llm::MockTransport;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn service(mock: Arc<MockTransport>) -> (TempDir, EditingService) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RuntimeConfigStore::load(dir.path().join("runtime.json")).unwrap());
        (dir, EditingService::new(ModelInvoker::new(store, mock)))
    }

    #[test]
    fn test_mode_task_table() {
        assert_eq!(Mode::Proofread.task(), TaskKind::Precision);
        assert_eq!(Mode::Rewrite.task(), TaskKind::General);
        assert_eq!(Mode::Tone.task(), TaskKind::General);
        assert_eq!(Mode::Technical.task(), TaskKind::General);
        assert_eq!("Technical".parse::<Mode>().unwrap(), Mode::Technical);
        assert!("summarize".parse::<Mode>().is_err());
    }

    #[tokio::test]
    async fn test_tone_mode_without_tone_makes_no_request() {
        let mock = Arc::new(MockTransport::new());
        let (_dir, svc) = service(mock.clone());

        let err = svc
            .edit(&EditRequest::new("Please send the report.", Mode::Tone))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_text_makes_no_request() {
        let mock = Arc::new(MockTransport::new());
        let (_dir, svc) = service(mock.clone());

        let err = svc.edit(&EditRequest::new(" \n\t", Mode::Rewrite)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_proofread_routes_to_precision_model() {
        let mock = Arc::new(MockTransport::with_replies([json!({
            "message": {"role": "assistant", "content": "This is bad.\n"}
        })]));
        let (_dir, svc) = service(mock.clone());

        let result = svc
            .edit(&EditRequest::new("this are bad", Mode::Proofread))
            .await
            .unwrap();

        assert_eq!(result.mode, Mode::Proofread);
        assert_eq!(result.output_text, "This is bad.");
        assert_eq!(result.model.name, "llama3:instruct");
        assert_eq!(result.model.temperature, 0.1);

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, result.model.endpoint);
        let body = requests[0].body.as_ref().unwrap();
        assert_eq!(body["model"], "llama3:instruct");
        assert!(body.get("tools").is_none());
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_tone_mode_uses_general_model_and_tone_clause() {
        let mock = Arc::new(MockTransport::with_replies([json!({
            "message": {"role": "assistant", "content": "Hey! Could you send the report?"}
        })]));
        let (_dir, svc) = service(mock.clone());

        let result = svc
            .edit(
                &EditRequest::new("Send the report.", Mode::Tone)
                    .with_tone(Tone::Friendly)
                    .with_extra_instructions("Keep it short."),
            )
            .await
            .unwrap();

        assert_eq!(result.model.name, "qwen2:7b-instruct");
        let body = mock.requests()[0].body.clone().unwrap();
        let system = body["messages"][0]["content"].as_str().unwrap().to_string();
        assert!(system.contains("approachable, warm"));
        assert!(system.ends_with("Additional guidance: Keep it short."));
    }
}
