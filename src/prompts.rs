//! Prompt 目录：各编辑模式的 system 指令、语气子句、用户消息模板，以及清晰度分析的 system 指令与 few-shot 示例

use serde_json::json;

use crate::llm::{ChatMessage, ToolInvocation};
use crate::services::editing::{Mode, Tone};

const PROOFREAD_SYSTEM: &str = "You are a meticulous copy editor. Fix grammar, spelling, and punctuation errors. \
Make the smallest changes possible while preserving voice and meaning. \
Return only the corrected text.";

const REWRITE_SYSTEM: &str = "You rewrite text to improve clarity and flow. \
Reduce redundancy, keep the tone neutral, and preserve original intent.";

const TECHNICAL_SYSTEM: &str = "You are a cybersecurity-focused technical editor. \
Improve precision and clarity while keeping all technical facts intact. \
Assume the reader is a security practitioner or researcher.";

const TONE_SYSTEM: &str = "You adjust tone according to the requested style while maintaining the underlying facts. \
Do not introduce new information. Return only the updated text.";

/// 模式对应的基础 system 指令
pub fn mode_instruction(mode: Mode) -> &'static str {
    match mode {
        Mode::Proofread => PROOFREAD_SYSTEM,
        Mode::Rewrite => REWRITE_SYSTEM,
        Mode::Technical => TECHNICAL_SYSTEM,
        Mode::Tone => TONE_SYSTEM,
    }
}

/// 语气子句（仅 tone 模式追加）
pub fn tone_instruction(tone: Tone) -> &'static str {
    match tone {
        Tone::Professional => {
            "Rewrite the text with a confident, respectful professional voice suitable for business communication."
        }
        Tone::Concise => "Rewrite the text so it is brief, direct, and free of filler while staying polite.",
        Tone::Friendly => "Rewrite the text so it sounds approachable, warm, and encouraging.",
    }
}

/// 组装 system 指令：基础指令 [+ 语气子句] [+ 用户补充说明]
pub fn edit_system_prompt(mode: Mode, tone: Option<Tone>, extra_instructions: Option<&str>) -> String {
    let mut prompt = mode_instruction(mode).to_string();

    if mode == Mode::Tone {
        if let Some(tone) = tone {
            prompt.push(' ');
            prompt.push_str(tone_instruction(tone));
        }
    }

    if let Some(extra) = extra_instructions.map(str::trim).filter(|s| !s.is_empty()) {
        prompt.push_str(" Additional guidance: ");
        prompt.push_str(extra);
    }

    prompt
}

/// 用户消息：固定引导语 + 去首尾空白的原文
pub fn edit_user_prompt(text: &str) -> String {
    format!(
        "Apply the instructions to the text below and respond with edited text only.\n\nText:\n{}",
        text.trim()
    )
}

/// 编辑请求的两条消息：system 在前，user 在后
pub fn build_edit_messages(
    text: &str,
    mode: Mode,
    tone: Option<Tone>,
    extra_instructions: Option<&str>,
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(edit_system_prompt(mode, tone, extra_instructions)),
        ChatMessage::user(edit_user_prompt(text)),
    ]
}

pub const ANALYSIS_SYSTEM: &str = "You are a highly critical and precise semantic editor. \
Your task is to analyze the provided text ONLY for clarity and readability issues. \
Specifically identify and report: \
1. **Passive Voice**: Highlight sentences where the subject is acted upon. \
2. **Wordiness/Redundancy**: Identify phrases that can be shortened without losing meaning. \
3. **Complexity**: Pinpoint overly long, convoluted sentences or phrases that hinder understanding. \
4. **Jargon**: Flag technical terms that might be unclear to a general audience. \
5. **Tone Inconsistency**: Note parts where the tone deviates from a clear, direct style (e.g., overly formal, hedging). \
Use the 'report_clarity_issues' tool to report your findings. \
For each issue, provide the EXACT problematic substring from the user's input and a concise, actionable suggestion for improvement. \
If you find ANY issues, you MUST call the 'report_clarity_issues' tool. If no issues are found, do not call the tool.";

const EXEMPLAR_TEXT: &str =
    "It is anticipated that a decision will be made by us at some point in time. The situation was being evaluated.";

/// 清晰度分析的完整会话：system、few-shot（user + assistant 工具调用）、待分析文本
pub fn build_analysis_messages(text: &str, tool_name: &str) -> Vec<ChatMessage> {
    let exemplar_args = json!({
        "issues": [
            {
                "quoted_text": "It is anticipated that a decision will be made by us",
                "issue_type": "passive_voice",
                "suggestion": "We anticipate a decision",
                "confidence": 0.9
            },
            {
                "quoted_text": "at some point in time",
                "issue_type": "wordiness",
                "suggestion": "eventually",
                "confidence": 0.95
            },
            {
                "quoted_text": "The situation was being evaluated",
                "issue_type": "passive_voice",
                "suggestion": "We were evaluating the situation",
                "confidence": 0.85
            }
        ]
    });
    let arguments = match exemplar_args {
        serde_json::Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };

    vec![
        ChatMessage::system(ANALYSIS_SYSTEM),
        ChatMessage::user(EXEMPLAR_TEXT),
        ChatMessage::assistant_tool_calls(vec![ToolInvocation::new(tool_name, arguments)]),
        ChatMessage::user(text),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    #[test]
    fn test_tone_clause_only_in_tone_mode() {
        let tone = edit_system_prompt(Mode::Tone, Some(Tone::Friendly), None);
        assert!(tone.starts_with(TONE_SYSTEM));
        assert!(tone.ends_with(tone_instruction(Tone::Friendly)));

        let rewrite = edit_system_prompt(Mode::Rewrite, Some(Tone::Friendly), None);
        assert_eq!(rewrite, REWRITE_SYSTEM);
    }

    #[test]
    fn test_extra_instructions_appended_trimmed() {
        let prompt = edit_system_prompt(Mode::Proofread, None, Some("  Use British spelling. "));
        assert!(prompt.ends_with(" Additional guidance: Use British spelling."));

        let blank = edit_system_prompt(Mode::Proofread, None, Some("   "));
        assert_eq!(blank, PROOFREAD_SYSTEM);
    }

    #[test]
    fn test_edit_messages_order_and_user_template() {
        let messages = build_edit_messages("  this are bad \n", Mode::Proofread, None, None);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert!(messages[1].content.ends_with("Text:\nthis are bad"));
    }

    #[test]
    fn test_exemplar_quotes_exist_in_exemplar_text() {
        let messages = build_analysis_messages("Some text.", "report_clarity_issues");
        assert_eq!(messages.len(), 4);
        let call = &messages[2].tool_calls[0];
        assert_eq!(call.name, "report_clarity_issues");
        for issue in call.arguments["issues"].as_array().unwrap() {
            let quote = issue["quoted_text"].as_str().unwrap();
            assert!(EXEMPLAR_TEXT.contains(quote), "{}", quote);
        }
        assert_eq!(messages[3].content, "Some text.");
    }
}
