//! 核心层：错误类型、运行时模型路由配置、服务装配

pub mod builder;
pub mod error;
pub mod runtime_config;

pub use builder::{Services, ServicesBuilder};
pub use error::AppError;
pub use runtime_config::{RuntimeConfig, RuntimeConfigStore, RuntimeConfigUpdate};
