//! 部署配置

use std::path::PathBuf;

/// 单个部署组的配置
///
/// 在流水线开始前解析完成，整个部署过程中只读。
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// 基础虚拟机名（必须数字结尾，决定整组名称序列）
    pub base_vmname: String,

    /// 部署数量
    pub count: usize,

    /// 模板虚拟机名称
    pub template: String,

    /// 客户机登录用户名
    pub vm_user: String,

    /// 客户机登录密码
    pub vm_password: String,

    /// 是否把客户机主机名改为虚拟机名（仅 Windows 生效）
    pub hostname_update: bool,

    /// 数据中心名称
    pub datacenter: Option<String>,

    /// 目标文件夹名称，缺省回退到数据中心默认文件夹或模板所在文件夹
    pub folder: Option<String>,

    /// 目标集群名称
    pub cluster: Option<String>,

    /// 目标 ESXi 主机名称（与集群互斥时以集群为准）
    pub esx: Option<String>,

    /// 目标数据存储名称，缺省回退到模板所在数据存储
    pub datastore: Option<String>,

    /// 目标网络（端口组）名称，缺省保持模板网络不变
    pub network: Option<String>,

    /// 目标网络是否为分布式端口组
    pub network_distributed: bool,

    /// 静态 IP 列表，为空表示 DHCP 部署
    pub static_ips: Vec<String>,

    /// 子网掩码（静态 IP 模式必填）
    pub netmask: Option<String>,

    /// 默认网关（静态 IP 模式必填）
    pub gateway: Option<String>,

    /// DNS 服务器
    pub dns: Option<String>,

    /// 部署完成后是否保持开机
    pub power_on: bool,

    /// 部署完成后创建的快照名称，None 表示不创建
    pub snapshot_name: Option<String>,

    /// 部署清单日志路径
    pub deploy_log: PathBuf,
}

impl DeployConfig {
    /// 是否为静态 IP 部署
    pub fn static_ip(&self) -> bool {
        !self.static_ips.is_empty()
    }
}
