//! vCenter 平台客户端
//!
//! 提供与 VMware vCenter Automation REST API 交互的客户端实现，
//! 供虚拟机批量部署流水线使用。
//!
//! # 功能
//!
//! - **清单查询** (`InventoryApi`): 按名称定位数据中心/集群/主机/文件夹/数据存储/网络
//! - **虚拟机管理** (`VmApi`): 克隆、迁移、网卡更新、电源操作、删除
//! - **客户机操作** (`GuestApi`): 系统信息、Tools 状态、定制化、客户机内执行程序
//! - **快照管理** (`SnapshotApi`): 创建快照
//! - **任务管理** (`TaskApi`): 任务状态查询、任务更新过滤器
//!
//! # 示例
//!
//! ```ignore
//! use vcd_vcenter::{VcClient, VcConfig, CloneSpec};
//!
//! let mut client = VcClient::new("https://vcenter.local", VcConfig::default())?;
//! client.login("administrator@vsphere.local", "password").await?;
//!
//! let template = client.vm().find("centos-template").await?;
//! let task = client.vm().clone(&spec).await?;
//! let info = client.task().get(&task).await?;
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod models;

pub use client::{VcClient, VcConfig};
pub use error::{Result, VcError};

// 导出 API 模块
pub use api::{GuestApi, InventoryApi, SnapshotApi, TaskApi, VmApi};

// 导出数据模型
pub use models::{
    // 任务
    TaskInfo, TaskState, TaskUpdate,

    // 虚拟机
    PowerState, ToolsStatus, VmSummary,

    // 客户机
    CustomizationSpec, GuestCredentials, GuestIdentity, IpAssignment,

    // 部署规格
    CloneSpec, NicBacking, PlacementSpec, RelocateSpec,
};
