//! 命令公共工具

use anyhow::{bail, Context, Result};

use vcd_vcenter::{VcClient, VcConfig};

use crate::config::VcenterSection;

/// 按配置创建 vCenter 客户端并登录
pub async fn connect(vcenter: &VcenterSection) -> Result<VcClient> {
    let config = VcConfig {
        verify_ssl: vcenter.ssl_check,
        ..VcConfig::default()
    };

    let mut client = VcClient::new(&format!("https://{}", vcenter.vcenter_name), config)
        .with_context(|| format!("创建 vCenter 客户端失败: {}", vcenter.vcenter_name))?;
    client
        .login(&vcenter.vcenter_user, &vcenter.vcenter_pw)
        .await
        .with_context(|| format!("登录 vCenter 失败: {}", vcenter.vcenter_name))?;
    Ok(client)
}

/// 解析逗号分隔的虚拟机名称列表
pub fn parse_vm_list(vms: &str) -> Result<Vec<String>> {
    let names: Vec<String> = vms
        .split(',')
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    if names.is_empty() {
        bail!("未指定任何虚拟机名称");
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vm_list() {
        let names = parse_vm_list("vm-01, vm-02 ,vm-03").unwrap();
        assert_eq!(names, vec!["vm-01", "vm-02", "vm-03"]);
    }

    #[test]
    fn test_parse_vm_list_empty() {
        assert!(parse_vm_list(" , ").is_err());
    }
}
