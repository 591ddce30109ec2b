//! vCenter 平台错误定义

use thiserror::Error;

/// vCenter 平台错误类型
#[derive(Error, Debug)]
pub enum VcError {
    #[error("HTTP 错误: {0}")]
    Http(String),

    #[error("认证错误: {0}")]
    Auth(String),

    #[error("API 错误 [{0}]: {1}")]
    Api(u16, String),

    #[error("解析错误: {0}")]
    Parse(String),

    #[error("对象不存在: {0}")]
    NotFound(String),
}

/// vCenter 平台结果类型
pub type Result<T> = std::result::Result<T, VcError>;
