//! LLM 层：统一数据模型、后端协议适配（Ollama / OpenAI 兼容）、传输与调用器

pub mod http;
pub mod invoker;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod protocol;
pub mod traits;
pub mod types;

pub use http::HttpTransport;
pub use invoker::{Invocation, ModelInvoker};
pub use mock::{MockReply, MockTransport, RecordedRequest};
pub use traits::{JsonTransport, LlmError};
pub use types::{
    BackendKind, ChatMessage, ModelConfig, ModelResult, Role, TaskKind, ToolDeclaration,
    ToolInvocation,
};
