//! 虚拟机批量部署核心
//!
//! 在 vCenter 客户端之上实现批量部署的业务层：
//!
//! - **任务跟踪器** (`tracker`): 顺序轮询/订阅远端并发任务的完成状态
//! - **部署流水线** (`pipeline`): 克隆到快照的固定阶段序列
//! - **名称生成** (`naming`): 数字后缀递增的虚拟机名称序列
//! - **IP 范围展开** (`iprange`): 连字符范围展开为逐个地址
//! - **落盘日志** (`logfile`): 部署清单与通用日志写入

pub mod config;
pub mod error;
pub mod iprange;
pub mod logfile;
pub mod naming;
pub mod pipeline;
pub mod tracker;

pub use config::DeployConfig;
pub use error::{DeployError, Result};
pub use pipeline::{delete_vms, vm_guest_ips, DeployPipeline, GuestKind};
pub use tracker::{TaskHandle, TaskOutcome, TaskTracker, TrackReport, VcTaskHandle};
