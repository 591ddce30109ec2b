//! vCenter 平台数据模型
//!
//! 所有类型都是 vCenter Automation REST 接口的直接映射，
//! 部署流水线只通过这些类型与平台交互。

use serde::{Deserialize, Serialize};

/// 远程任务状态
///
/// 任务只会从 Queued/Running 单向进入 Succeeded 或 Failed，
/// 进入终态后不再变化。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    /// 排队中
    #[serde(rename = "PENDING")]
    Queued,

    /// 运行中
    #[serde(rename = "RUNNING")]
    Running,

    /// 成功完成
    #[serde(rename = "SUCCEEDED")]
    Succeeded,

    /// 出错退出
    #[serde(rename = "FAILED")]
    Failed,
}

impl TaskState {
    /// 是否已进入终态
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }
}

/// 任务详情
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInfo {
    /// 任务状态
    pub status: TaskState,

    /// 完成百分比
    #[serde(default)]
    pub progress: Option<u32>,

    /// 失败时的错误信息
    #[serde(default)]
    pub error: Option<String>,
}

/// 任务增量更新（来自任务更新过滤器）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskUpdate {
    /// 任务 ID
    pub task: String,

    /// 最新状态
    pub status: TaskState,
}

/// 虚拟机电源状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerState {
    #[serde(rename = "POWERED_ON")]
    PoweredOn,

    #[serde(rename = "POWERED_OFF")]
    PoweredOff,

    #[serde(rename = "SUSPENDED")]
    Suspended,
}

/// VMware Tools 运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolsStatus {
    #[serde(rename = "RUNNING")]
    Running,

    #[serde(rename = "NOT_RUNNING")]
    NotRunning,

    #[serde(rename = "NOT_INSTALLED")]
    NotInstalled,
}

/// 虚拟机摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmSummary {
    /// 虚拟机 ID
    pub vm: String,

    /// 虚拟机名称
    pub name: String,

    /// 电源状态
    pub power_state: PowerState,
}

/// 客户机系统信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestIdentity {
    /// 客户机操作系统全名
    #[serde(default)]
    pub full_name: Option<String>,

    /// 客户机上报的主 IP 地址
    #[serde(default)]
    pub ip_address: Option<String>,
}

/// 放置规格（资源池/文件夹/数据存储解析结果）
///
/// 在流水线开始时解析一次，之后各阶段只读使用。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementSpec {
    /// 资源池 ID
    pub resource_pool: String,

    /// 虚拟机文件夹 ID
    pub folder: String,

    /// 数据存储 ID
    pub datastore: String,
}

/// 克隆请求
#[derive(Debug, Clone, Serialize)]
pub struct CloneSpec {
    /// 源虚拟机（模板）ID
    pub source: String,

    /// 新虚拟机名称
    pub name: String,

    /// 放置规格
    pub placement: PlacementSpec,

    /// 克隆完成后是否立即上电
    pub power_on: bool,
}

impl CloneSpec {
    /// 创建克隆请求（克隆阶段统一不上电，由流水线统一开机）
    pub fn new(source: &str, name: &str, placement: PlacementSpec) -> Self {
        Self {
            source: source.to_string(),
            name: name.to_string(),
            placement,
            power_on: false,
        }
    }
}

/// 迁移请求
#[derive(Debug, Clone, Serialize)]
pub struct RelocateSpec {
    /// 目标主机 ID
    pub host: String,

    /// 目标资源池 ID
    pub resource_pool: String,
}

/// 网卡 backing 更新
#[derive(Debug, Clone, Serialize)]
pub struct NicBacking {
    /// backing 类型 (STANDARD_PORTGROUP / DISTRIBUTED_PORTGROUP)
    #[serde(rename = "type")]
    pub backing_type: String,

    /// 目标网络 ID
    pub network: String,
}

impl NicBacking {
    /// 标准交换机端口组
    pub fn standard(network: &str) -> Self {
        Self {
            backing_type: "STANDARD_PORTGROUP".to_string(),
            network: network.to_string(),
        }
    }

    /// 分布式交换机端口组
    pub fn distributed(network: &str) -> Self {
        Self {
            backing_type: "DISTRIBUTED_PORTGROUP".to_string(),
            network: network.to_string(),
        }
    }
}

/// 客户机凭据
#[derive(Debug, Clone, Serialize)]
pub struct GuestCredentials {
    /// 客户机用户名
    pub username: String,

    /// 客户机密码
    pub password: String,
}

/// 客户机网卡定制方式
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum IpAssignment {
    /// 静态地址
    #[serde(rename = "STATIC")]
    Static {
        ip: String,
        netmask: String,
        gateway: String,
    },

    /// DHCP 动态分配
    #[serde(rename = "DHCP")]
    Dhcp,
}

/// 客户机定制化规格（静态 IP / DHCP / 主机名）
#[derive(Debug, Clone, Serialize)]
pub struct CustomizationSpec {
    /// 客户机主机名
    pub hostname: String,

    /// 网卡地址分配
    pub adapter: IpAssignment,

    /// DNS 服务器列表
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns_servers: Vec<String>,
}

impl CustomizationSpec {
    /// Linux 静态地址定制
    pub fn linux_static(
        hostname: &str,
        ip: &str,
        netmask: &str,
        gateway: &str,
        dns: Option<&str>,
    ) -> Self {
        Self {
            hostname: hostname.to_string(),
            adapter: IpAssignment::Static {
                ip: ip.to_string(),
                netmask: netmask.to_string(),
                gateway: gateway.to_string(),
            },
            dns_servers: dns.map(|d| vec![d.to_string()]).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_state_terminal() {
        assert!(TaskState::Succeeded.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(!TaskState::Queued.is_terminal());
        assert!(!TaskState::Running.is_terminal());
    }

    #[test]
    fn test_task_state_wire_format() {
        let info: TaskInfo =
            serde_json::from_str(r#"{"status":"RUNNING","progress":42}"#).unwrap();
        assert_eq!(info.status, TaskState::Running);
        assert_eq!(info.progress, Some(42));
        assert_eq!(info.error, None);
    }

    #[test]
    fn test_customization_spec_static() {
        let spec = CustomizationSpec::linux_static(
            "vm-01", "192.168.0.41", "255.255.255.0", "192.168.0.1", Some("192.168.0.2"),
        );
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["adapter"]["type"], "STATIC");
        assert_eq!(json["adapter"]["ip"], "192.168.0.41");
        assert_eq!(json["dns_servers"][0], "192.168.0.2");
    }

    #[test]
    fn test_ip_assignment_wire_format() {
        let json = serde_json::to_value(IpAssignment::Dhcp).unwrap();
        assert_eq!(json["type"], "DHCP");
    }
}
