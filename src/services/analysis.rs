//! 清晰度分析：让模型通过 `report_clarity_issues` 工具上报问题，再逐条对照原文核验
//!
//! 模型是不可信的生成方：每条引用都必须是原文的字面子串（区分大小写、取首次出现）才会被采纳，
//! 偏移与长度均为字节单位，满足 `source[offset..offset + length] == quoted_text`。
//! 找不到的引用按幻觉丢弃，缺字段的条目跳过，均只记录告警；不做模糊匹配。

use std::fmt;
use std::str::FromStr;

use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::AppError;
use crate::llm::{ModelInvoker, ModelResult, TaskKind, ToolDeclaration};
use crate::prompts::build_analysis_messages;

/// 上报工具名
pub const REPORT_TOOL_NAME: &str = "report_clarity_issues";

const REPORT_TOOL_DESCRIPTION: &str = "Report specific parts of the text that are unclear, wordy, passive, or difficult to read. \
ALWAYS call this tool if you find ANY of these issues, even minor ones.";

/// 问题类型
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
#[schemars(description = "Category of the clarity issue.")]
pub enum IssueType {
    #[default]
    Complexity,
    PassiveVoice,
    Wordiness,
    Jargon,
    Tone,
}

impl IssueType {
    pub const ALL: [IssueType; 5] = [
        IssueType::Complexity,
        IssueType::PassiveVoice,
        IssueType::Wordiness,
        IssueType::Jargon,
        IssueType::Tone,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Complexity => "complexity",
            IssueType::PassiveVoice => "passive_voice",
            IssueType::Wordiness => "wordiness",
            IssueType::Jargon => "jargon",
            IssueType::Tone => "tone",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IssueType::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| format!("Unknown issue type: {}", s))
    }
}

// 工具参数的 JSON Schema 来源；解析时不用它反序列化，而是逐条宽松读取
#[derive(JsonSchema)]
#[allow(dead_code)]
struct ClarityReport {
    issues: Vec<ReportedIssue>,
}

#[derive(JsonSchema)]
#[allow(dead_code)]
struct ReportedIssue {
    #[schemars(
        description = "The EXACT substring from the original text that has the issue. It MUST be an exact match to a segment of the user's input text."
    )]
    quoted_text: String,
    issue_type: IssueType,
    #[schemars(
        description = "A concise improvement or rewrite for the quoted_text. Do NOT rewrite the entire sentence, only the problematic segment."
    )]
    suggestion: String,
    #[schemars(description = "Confidence score between 0.0 and 1.0 (e.g., 0.9 for high confidence).")]
    confidence: Option<f64>,
}

/// `report_clarity_issues` 的工具声明（参数 Schema 由 schemars 生成，子 Schema 内联）
pub fn clarity_tool() -> ToolDeclaration {
    let settings = SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = true;
        s.meta_schema = None;
    });
    let schema = settings.into_generator().into_root_schema_for::<ClarityReport>();
    let parameters = match serde_json::to_value(&schema) {
        Ok(parameters) => parameters,
        Err(e) => {
            tracing::error!("Failed to serialize {} schema, declaring it without parameters: {}", REPORT_TOOL_NAME, e);
            Value::Object(Map::new())
        }
    };

    ToolDeclaration {
        name: REPORT_TOOL_NAME.to_string(),
        description: REPORT_TOOL_DESCRIPTION.to_string(),
        parameters,
    }
}

/// 已核验的清晰度问题；只能通过 `locate` 构造，保证引用与原文位置一致
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClarityIssue {
    offset: usize,
    length: usize,
    quoted_text: String,
    issue_type: IssueType,
    suggestion: String,
    confidence: f64,
}

impl ClarityIssue {
    /// 在 source 中精确查找 quoted（首次出现）；找不到或引用为空时返回 None
    pub fn locate(
        source: &str,
        quoted: &str,
        issue_type: IssueType,
        suggestion: &str,
        confidence: f64,
    ) -> Option<Self> {
        if quoted.is_empty() {
            return None;
        }
        let offset = source.find(quoted)?;
        Some(Self {
            offset,
            length: quoted.len(),
            quoted_text: quoted.to_string(),
            issue_type,
            suggestion: suggestion.to_string(),
            confidence: if confidence.is_nan() { 1.0 } else { confidence.clamp(0.0, 1.0) },
        })
    }

    /// 字节偏移
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// 字节长度，恒大于 0
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn quoted_text(&self) -> &str {
        &self.quoted_text
    }

    pub fn issue_type(&self) -> IssueType {
        self.issue_type
    }

    pub fn suggestion(&self) -> &str {
        &self.suggestion
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn span(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.length
    }
}

/// 对照原文核验模型上报的问题，保持模型上报顺序（不按 offset 排序）
pub fn reconcile(source: &str, result: &ModelResult) -> Vec<ClarityIssue> {
    if !result.has_tool_calls() {
        tracing::info!("Model did not return any tool calls for analysis");
        return Vec::new();
    }

    let mut issues = Vec::new();
    for call in &result.tool_calls {
        if call.name != REPORT_TOOL_NAME {
            tracing::warn!("Model called unknown tool: {}", call.name);
            continue;
        }
        for entry in reported_entries(call.arguments.get("issues")) {
            if let Some(issue) = reconcile_entry(source, &entry) {
                issues.push(issue);
            }
        }
    }
    issues
}

/// `issues` 通常是数组；部分模型会把数组序列化成字符串
fn reported_entries(raw: Option<&Value>) -> Vec<Value> {
    match raw {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(items)) => items,
            _ => {
                tracing::warn!("Tool argument 'issues' is not a JSON array: {}", s);
                Vec::new()
            }
        },
        None | Some(Value::Null) => Vec::new(),
        Some(other) => {
            tracing::warn!("Tool argument 'issues' has unexpected shape: {}", other);
            Vec::new()
        }
    }
}

fn reconcile_entry(source: &str, entry: &Value) -> Option<ClarityIssue> {
    let field = |key: &str| entry.get(key).and_then(Value::as_str).unwrap_or("");
    let quoted = field("quoted_text");
    let suggestion = field("suggestion");

    if quoted.is_empty() || suggestion.is_empty() {
        tracing::warn!(
            "Malformed issue from model: quoted_text='{}', suggestion='{}'",
            quoted,
            suggestion
        );
        return None;
    }

    let issue_type = match entry.get("issue_type").and_then(Value::as_str) {
        None => IssueType::default(),
        Some(raw) => raw.parse::<IssueType>().unwrap_or_else(|_| {
            tracing::debug!("Unknown issue type '{}', using complexity", raw);
            IssueType::default()
        }),
    };
    let confidence = entry
        .get("confidence")
        .and_then(|v| v.as_f64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())))
        .unwrap_or(1.0);

    let issue = ClarityIssue::locate(source, quoted, issue_type, suggestion, confidence);
    if issue.is_none() {
        tracing::warn!(
            "Model hallucinated quote not found in text: '{}' (issue_type={}, suggestion='{}')",
            quoted,
            issue_type,
            suggestion
        );
    }
    issue
}

/// 分析结果
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub issues: Vec<ClarityIssue>,
    pub latency_ms: f64,
    pub model: String,
}

/// 分析服务：Precision 任务 + 清晰度工具 + few-shot 示例
#[derive(Clone)]
pub struct AnalysisService {
    invoker: ModelInvoker,
    tool: ToolDeclaration,
}

impl AnalysisService {
    pub fn new(invoker: ModelInvoker) -> Self {
        Self {
            invoker,
            tool: clarity_tool(),
        }
    }

    pub async fn analyze(&self, text: &str) -> Result<AnalysisReport, AppError> {
        if text.trim().is_empty() {
            return Err(AppError::validation("Text must contain non-whitespace characters."));
        }

        let messages = build_analysis_messages(text, REPORT_TOOL_NAME);
        let invocation = self
            .invoker
            .invoke(TaskKind::Precision, &messages, std::slice::from_ref(&self.tool))
            .await?;

        tracing::info!(
            "Model returned {} tool calls for analysis",
            invocation.result.tool_calls.len()
        );
        let issues = reconcile(text, &invocation.result);

        tracing::info!(
            "Analysis completed | model={} latency_ms={:.2} issues={}",
            invocation.model.name,
            invocation.latency_ms,
            issues.len()
        );

        Ok(AnalysisReport {
            issues,
            latency_ms: invocation.latency_ms,
            model: invocation.model.name,
        })
    }
}
