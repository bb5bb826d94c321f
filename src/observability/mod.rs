//! 可观测性：tracing 订阅器初始化（默认 info，可通过 RUST_LOG 覆盖）

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// 请求文本预览：仅在 [app].log_content_enabled 时返回前 200 个字符
pub fn content_preview(enabled: bool, text: &str) -> String {
    if !enabled {
        return String::new();
    }
    let preview: String = text.chars().take(200).collect();
    format!(" preview={:?}", preview)
}
