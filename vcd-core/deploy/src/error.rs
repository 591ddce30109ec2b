//! 部署错误定义

use thiserror::Error;
use vcd_vcenter::VcError;

/// 部署错误类型
///
/// 所有失败都在阶段边界上汇聚为本类型，流水线在首个失败处中止，
/// 不重试也不回滚已创建的虚拟机。
#[derive(Error, Debug)]
pub enum DeployError {
    /// vCenter 平台错误（连接失败/对象不存在等）
    #[error(transparent)]
    Vc(#[from] VcError),

    /// 轮询循环超过墙钟时间预算
    #[error("任务超时: {0}")]
    TaskTimeout(String),

    /// 远程任务报告失败
    #[error("任务失败: {0}")]
    TaskFailed(String),

    /// 配置自相矛盾，在任何远程修改之前中止
    #[error("配置不匹配: {0}")]
    ConfigMismatch(String),

    /// IP 地址或范围格式错误
    #[error("无效的 IP 地址或范围: {0}")]
    InvalidRange(String),

    /// 基础虚拟机名不以数字结尾
    #[error("无效的基础虚拟机名: {0}")]
    InvalidBaseName(String),

    /// 日志文件写入失败
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 部署结果类型
pub type Result<T> = std::result::Result<T, DeployError>;
