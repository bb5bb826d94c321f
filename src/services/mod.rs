//! 业务服务：编辑、清晰度分析、语法检查

pub mod analysis;
pub mod editing;
pub mod grammar;

pub use analysis::{clarity_tool, reconcile, AnalysisReport, AnalysisService, ClarityIssue, IssueType};
pub use editing::{EditRequest, EditResult, EditingService, Mode, Tone};
pub use grammar::{
    CheckRequest, CheckResponse, GrammarCheckConfig, GrammarChecker, GrammarError, GrammarMatch, GrammarService,
    LanguageToolClient, RawGrammarMatch,
};
