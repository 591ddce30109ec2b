//! 虚拟机 IP 查询命令

use std::path::Path;

use anyhow::Result;
use tracing::warn;

use crate::commands::common::{connect, parse_vm_list};
use crate::config;

pub async fn handle(yamlfile: &str, vms: &str) -> Result<()> {
    let vcenter = config::load_vcenter(Path::new(yamlfile))?;
    let vm_names = parse_vm_list(vms)?;

    let mut client = connect(&vcenter).await?;
    let result = vcd_deploy::vm_guest_ips(&client, &vm_names).await;
    client.logout().await?;
    let ips = result?;

    for (name, ip) in &ips {
        println!("{}: {}", name, ip);
    }
    if ips.len() < vm_names.len() {
        warn!("有 {} 台虚拟机未上报 IP 地址", vm_names.len() - ips.len());
    }
    Ok(())
}
