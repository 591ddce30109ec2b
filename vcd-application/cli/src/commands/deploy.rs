//! 批量部署命令
//!
//! 按顺序部署 YAML 小节里的每个部署组。基础虚拟机名在组间
//! 延续：上一组结束后名称序列多推进一位，作为下一组的起点；
//! 带 `-[date]` 占位符的基础名每组替换为当前 Unix 时间戳。

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use vcd_deploy::{logfile, naming, DeployConfig, DeployPipeline};
use vcd_vcenter::VcClient;

use crate::commands::common::connect;
use crate::config::{self, DeployFile, DeployGroup};

/// 基础名中的时间戳占位符
const DATE_PLACEHOLDER: &str = "-[date]";

pub async fn handle(yamlfile: &str, section: &str, outlogfile: &str) -> Result<()> {
    let file = config::load(Path::new(yamlfile), section)?;

    let general_log = PathBuf::from(outlogfile);
    let deploy_log = PathBuf::from(format!("{}_dep", outlogfile));

    logfile::append_timestamped(
        &general_log,
        &format!("开始部署 YAML 文件 {} 小节 {}", yamlfile, section),
    )?;

    let mut client = connect(&file.vcenter).await?;
    let result = deploy_groups(&client, &file, section, &general_log, &deploy_log).await;
    client.logout().await?;

    if result.is_err() {
        logfile::append_timestamped(&general_log, &format!("部署小节 {} 失败", section))?;
    }
    result
}

async fn deploy_groups(
    client: &VcClient,
    file: &DeployFile,
    section: &str,
    general_log: &Path,
    deploy_log: &Path,
) -> Result<()> {
    let mut base_vm = file.vcenter.base_vmname.clone();
    let dated = base_vm.contains(DATE_PLACEHOLDER);
    let mut deployed: Vec<String> = Vec::new();

    for (index, group) in file.groups.iter().enumerate() {
        // 静态 IP 数量与部署数量不一致时，在任何远程修改之前中止
        if !group.static_ips.is_empty() && group.static_ips.len() != group.vm_count {
            bail!(
                "小节 {} 第 {} 组定义了 {} 个 IP 地址，与 vm_count {} 不一致，无法创建虚拟机",
                section,
                index + 1,
                group.static_ips.len(),
                group.vm_count
            );
        }

        let base_vmname = group_base_name(&base_vm, dated, chrono::Utc::now().timestamp());

        info!(
            "开始部署小节 {} 第 {} 组: 基础名 {}, 数量 {}",
            section,
            index + 1,
            base_vmname,
            group.vm_count
        );

        let deploy_config = build_deploy_config(file, group, &base_vmname, deploy_log);
        let mut pipeline = DeployPipeline::new(client, deploy_config)
            .with_context(|| format!("小节 {} 第 {} 组配置无效", section, index + 1))?;
        if let Err(e) = pipeline.deploy().await {
            warn!("部署小节 {} 第 {} 组失败: {}", section, index + 1, e);
            return Err(e.into());
        }
        deployed.extend(pipeline.deployed().iter().cloned());

        if !dated {
            base_vm = advance_base_name(&base_vm, group.vm_count)?;
        }
    }

    logfile::append_timestamped(
        general_log,
        &format!("成功部署虚拟机: {}", deployed.join(", ")),
    )?;
    info!("小节 {} 部署完成，共 {} 台虚拟机", section, deployed.len());
    Ok(())
}

fn build_deploy_config(
    file: &DeployFile,
    group: &DeployGroup,
    base_vmname: &str,
    deploy_log: &Path,
) -> DeployConfig {
    DeployConfig {
        base_vmname: base_vmname.to_string(),
        count: group.vm_count,
        template: group.template.clone(),
        vm_user: group.vm_user.clone(),
        vm_password: group.vm_password.clone(),
        hostname_update: file.vcenter.hostname_update,
        datacenter: file.vcenter.datacenter.clone(),
        folder: file.vcenter.folder.clone(),
        cluster: group.cluster.clone(),
        esx: group.esx.clone(),
        datastore: group.datastore.clone(),
        network: group.network.clone(),
        network_distributed: true,
        static_ips: group.static_ips.clone(),
        netmask: group.netmask.clone(),
        gateway: group.gateway.clone(),
        dns: group.dns.clone(),
        power_on: file.vcenter.power_on,
        snapshot_name: file.vcenter.snapshot(),
        deploy_log: deploy_log.to_path_buf(),
    }
}

/// 计算本组实际使用的基础名。
///
/// 带 `-[date]` 占位符的基础名去掉占位符后拼接给定的 Unix 时间戳，
/// 普通基础名原样返回。
fn group_base_name(base_vm: &str, dated: bool, epoch: i64) -> String {
    if dated {
        format!("{}-{}", base_vm.replace(DATE_PLACEHOLDER, ""), epoch)
    } else {
        base_vm.to_string()
    }
}

/// 部署 count 台之后的下一组基础名：名称序列多推进一位作为起点
fn advance_base_name(base_vm: &str, count: usize) -> Result<String> {
    let series = naming::build_vm_names(base_vm, count + 1)?;
    match series.last() {
        Some(next) => Ok(next.clone()),
        None => Ok(base_vm.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dated_base_name_uses_epoch() {
        assert_eq!(
            group_base_name("vm-[date]", true, 1625573421),
            "vm-1625573421"
        );
        // 不同时间戳产生不同基础名，每组各自独立
        assert_eq!(
            group_base_name("vm-[date]", true, 1625573500),
            "vm-1625573500"
        );
    }

    #[test]
    fn test_plain_base_name_unchanged() {
        assert_eq!(group_base_name("vm-00212", false, 1625573421), "vm-00212");
    }

    #[test]
    fn test_base_name_continues_across_groups() {
        // 第一组 3 台占用 vm-00212..vm-00214，下一组从 vm-00215 开始
        let next = advance_base_name("vm-00212", 3).unwrap();
        assert_eq!(next, "vm-00215");
        // 第二组 2 台占用 vm-00215..vm-00216，下一组从 vm-00217 开始
        let after = advance_base_name(&next, 2).unwrap();
        assert_eq!(after, "vm-00217");
    }
}
