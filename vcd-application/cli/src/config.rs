//! 部署 YAML 配置解析
//!
//! 配置文件分两层：顶层 `VCenter` 小节描述平台连接与整体
//! 部署参数，其余命名小节各是一组部署列表，每个列表项
//! 对应一个部署组。

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use vcd_deploy::iprange;

/// 顶层 VCenter 小节
#[derive(Debug, Clone, Deserialize)]
pub struct VcenterSection {
    /// vCenter 地址
    pub vcenter_name: String,

    /// vCenter 用户名
    pub vcenter_user: String,

    /// vCenter 密码
    pub vcenter_pw: String,

    /// 是否校验 vCenter 证书
    #[serde(rename = "ssl-check", default)]
    pub ssl_check: bool,

    /// 基础虚拟机名，决定整个文件的名称序列
    pub base_vmname: String,

    /// 数据中心名称
    #[serde(default)]
    pub datacenter: Option<String>,

    /// 目标文件夹名称
    #[serde(default)]
    pub folder: Option<String>,

    /// 部署完成后是否保持开机
    #[serde(default = "default_true")]
    pub power_on: bool,

    /// 快照名称，字面量 "None" 等价于未配置
    #[serde(default)]
    pub snapshot_name: Option<String>,

    /// 是否把客户机主机名改成虚拟机名
    #[serde(default)]
    pub hostname_update: bool,
}

fn default_true() -> bool {
    true
}

impl VcenterSection {
    /// 快照名称，"None" 字面量按未配置处理
    pub fn snapshot(&self) -> Option<String> {
        match self.snapshot_name.as_deref() {
            None | Some("None") => None,
            Some(name) => Some(name.to_string()),
        }
    }
}

/// 一个部署组（命名小节中的一个列表项）
#[derive(Debug, Clone)]
pub struct DeployGroup {
    /// 部署数量
    pub vm_count: usize,

    /// 模板虚拟机名称
    pub template: String,

    /// 客户机登录用户名
    pub vm_user: String,

    /// 客户机登录密码
    pub vm_password: String,

    /// 目标集群名称
    pub cluster: Option<String>,

    /// 目标 ESXi 主机名称
    pub esx: Option<String>,

    /// 目标数据存储名称
    pub datastore: Option<String>,

    /// 目标网络名称
    pub network: Option<String>,

    /// 子网掩码
    pub netmask: Option<String>,

    /// 默认网关
    pub gateway: Option<String>,

    /// DNS 服务器
    pub dns: Option<String>,

    /// 展开后的静态 IP 列表，DHCP 部署时为空
    pub static_ips: Vec<String>,
}

/// 解析完成的部署文件
#[derive(Debug, Clone)]
pub struct DeployFile {
    pub vcenter: VcenterSection,
    pub groups: Vec<DeployGroup>,
}

/// 加载部署文件并解析指定小节
pub fn load(path: &Path, section: &str) -> Result<DeployFile> {
    let doc = load_yaml(path)?;

    let vcenter = parse_vcenter(&doc, path)?;
    let items = doc
        .get(section)
        .and_then(|value| value.as_sequence())
        .with_context(|| format!("配置文件 {:?} 缺少部署小节 {}", path, section))?;

    let mut groups = Vec::with_capacity(items.len());
    for item in items {
        groups.push(parse_group(item)?);
    }

    Ok(DeployFile { vcenter, groups })
}

/// 只加载 VCenter 小节（删除与查询 IP 命令用）
pub fn load_vcenter(path: &Path) -> Result<VcenterSection> {
    let doc = load_yaml(path)?;
    parse_vcenter(&doc, path)
}

fn load_yaml(path: &Path) -> Result<serde_yaml::Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("读取配置文件失败: {:?}", path))?;
    serde_yaml::from_str(&content).with_context(|| format!("解析配置文件失败: {:?}", path))
}

fn parse_vcenter(doc: &serde_yaml::Value, path: &Path) -> Result<VcenterSection> {
    let value = doc
        .get("VCenter")
        .cloned()
        .with_context(|| format!("配置文件 {:?} 缺少 VCenter 小节", path))?;
    serde_yaml::from_value(value).context("解析 VCenter 小节失败")
}

/// 解析一个部署组
///
/// 键名包含 ip（大小写不敏感）的条目按 IP 范围展开；出现
/// dhcp/DHCP 标记时整组按 DHCP 部署，静态 IP 列表为空。
fn parse_group(item: &serde_yaml::Value) -> Result<DeployGroup> {
    let map = item.as_mapping().context("部署小节的条目必须是映射")?;

    let mut ips: Vec<String> = Vec::new();
    let mut fields: HashMap<String, serde_yaml::Value> = HashMap::new();
    for (key, value) in map {
        let key = key.as_str().context("部署小节的键必须是字符串")?;
        if key.to_lowercase().contains("ip") {
            ips.extend(iprange::expand(&yaml_scalar(value)?)?);
        } else {
            fields.insert(key.to_string(), value.clone());
        }
    }

    let dhcp = ips.iter().any(|ip| ip.eq_ignore_ascii_case("dhcp"));
    let static_ips = if dhcp { Vec::new() } else { ips };

    Ok(DeployGroup {
        vm_count: field_u64(&fields, "vm_count")? as usize,
        template: field_str(&fields, "template")?,
        vm_user: field_str(&fields, "vm_user")?,
        vm_password: field_str(&fields, "vm_password")?,
        cluster: field_opt(&fields, "cluster"),
        esx: field_opt(&fields, "esx"),
        datastore: field_opt(&fields, "datastore"),
        network: field_opt(&fields, "network"),
        netmask: field_opt(&fields, "netmask"),
        gateway: field_opt(&fields, "gateway"),
        dns: field_opt(&fields, "dns"),
        static_ips,
    })
}

fn yaml_scalar(value: &serde_yaml::Value) -> Result<String> {
    match value {
        serde_yaml::Value::String(text) => Ok(text.clone()),
        serde_yaml::Value::Number(number) => Ok(number.to_string()),
        other => bail!("IP 配置必须是标量: {:?}", other),
    }
}

fn field_str(fields: &HashMap<String, serde_yaml::Value>, key: &str) -> Result<String> {
    fields
        .get(key)
        .and_then(|value| value.as_str())
        .map(|text| text.to_string())
        .with_context(|| format!("部署小节缺少 {} 配置", key))
}

fn field_u64(fields: &HashMap<String, serde_yaml::Value>, key: &str) -> Result<u64> {
    fields
        .get(key)
        .and_then(|value| value.as_u64())
        .with_context(|| format!("部署小节缺少 {} 配置", key))
}

fn field_opt(fields: &HashMap<String, serde_yaml::Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(|value| value.as_str())
        .filter(|text| !text.is_empty() && *text != "None")
        .map(|text| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
VCenter:
  vcenter_name: vcenter.lab.local
  vcenter_user: administrator@vsphere.local
  vcenter_pw: secret
  ssl-check: false
  base_vmname: vm-00212
  datacenter: DC1
  folder: deploy
  power_on: true
  snapshot_name: "None"

Cluster1:
  - vm_count: 3
    template: centos-template
    vm_user: root
    vm_password: passw0rd
    cluster: compute-01
    datastore: ds-ssd
    network: vlan-100
    vm_ip: 192.168.0.41-43
    netmask: 255.255.255.0
    gateway: 192.168.0.1
    dns: 192.168.0.2
  - vm_count: 2
    template: win10-template
    vm_user: administrator
    vm_password: passw0rd
    esx: esx-03.lab.local
    datastore: ds-sata
    network: vlan-200
    vm_ip: dhcp
"#;

    fn write_sample(name: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        fs::write(&path, SAMPLE).unwrap();
        path
    }

    #[test]
    fn test_load_full_file() {
        let path = write_sample("vcd_config_test_full.yaml");
        let file = load(&path, "Cluster1").unwrap();

        assert_eq!(file.vcenter.vcenter_name, "vcenter.lab.local");
        assert!(!file.vcenter.ssl_check);
        // "None" 字面量等价于不打快照
        assert_eq!(file.vcenter.snapshot(), None);
        assert!(!file.vcenter.hostname_update);

        assert_eq!(file.groups.len(), 2);

        let first = &file.groups[0];
        assert_eq!(first.vm_count, 3);
        assert_eq!(first.cluster.as_deref(), Some("compute-01"));
        assert_eq!(first.esx, None);
        assert_eq!(
            first.static_ips,
            vec!["192.168.0.41", "192.168.0.42", "192.168.0.43"]
        );

        // dhcp 标记的组静态 IP 列表为空
        let second = &file.groups[1];
        assert_eq!(second.cluster, None);
        assert_eq!(second.esx.as_deref(), Some("esx-03.lab.local"));
        assert!(second.static_ips.is_empty());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_missing_section_rejected() {
        let path = write_sample("vcd_config_test_missing.yaml");
        assert!(load(&path, "Cluster2").is_err());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_vcenter_only() {
        let path = write_sample("vcd_config_test_vcenter.yaml");
        let vcenter = load_vcenter(&path).unwrap();
        assert_eq!(vcenter.base_vmname, "vm-00212");
        assert!(vcenter.power_on);
        let _ = fs::remove_file(&path);
    }
}
