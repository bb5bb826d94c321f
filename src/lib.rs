//! Quill - 文本编辑/分析请求的多模型路由与响应归一化后端
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、运行时模型路由配置（可持久化、线程安全）、服务装配
//! - **llm**: 统一会话/工具模型、Ollama 与 OpenAI 兼容协议适配、传输与调用器
//! - **observability**: 日志初始化
//! - **prompts**: 编辑与分析的 prompt 目录
//! - **services**: 编辑、清晰度分析（引用核验）、语法检查

pub mod config;
pub mod core;
pub mod llm;
pub mod observability;
pub mod prompts;
pub mod services;

pub use core::{AppError, Services, ServicesBuilder};
