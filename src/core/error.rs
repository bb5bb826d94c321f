//! 服务错误类型
//!
//! 存储错误（配置文件不可读写）、校验错误（请求缺字段，不发起网络调用）与模型调用错误（原样透传 LlmError）。
//! 幻觉引用、无法解析的工具参数不是错误：由分析服务记录告警后跳过。

use std::path::PathBuf;

use thiserror::Error;

use crate::llm::LlmError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Config storage error at {path}: {source}")]
    ConfigStorage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config format error at {path}: {source}")]
    ConfigFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::ConfigStorage {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        AppError::ConfigFormat {
            path: path.into(),
            source,
        }
    }
}

impl AppError {
    /// 对外 HTTP 状态码：校验 422，模型调用 502，配置存储 500
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::Validation(_) => 422,
            AppError::Llm(_) => 502,
            AppError::ConfigStorage { .. } | AppError::ConfigFormat { .. } | AppError::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(AppError::validation("empty").http_status(), 422);
        assert_eq!(AppError::from(LlmError::transport("refused")).http_status(), 502);
        assert_eq!(AppError::from(LlmError::malformed("no message")).http_status(), 502);
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        assert_eq!(AppError::storage("config/runtime_config.json", io).http_status(), 500);
        assert_eq!(AppError::Internal("task panicked".into()).http_status(), 500);
    }

    #[test]
    fn test_llm_error_is_transparent() {
        let err = AppError::from(LlmError::Status {
            status: 503,
            body: "busy".to_string(),
        });
        assert_eq!(err.to_string(), "Model request returned HTTP 503: busy");
    }
}
