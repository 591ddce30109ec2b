//! 虚拟机删除命令

use std::path::Path;

use anyhow::Result;
use tracing::info;

use vcd_deploy::TaskTracker;

use crate::commands::common::{connect, parse_vm_list};
use crate::config;

pub async fn handle(yamlfile: &str, vms: &str) -> Result<()> {
    let vcenter = config::load_vcenter(Path::new(yamlfile))?;
    let vm_names = parse_vm_list(vms)?;

    let mut client = connect(&vcenter).await?;
    let tracker = TaskTracker::default();
    let result = vcd_deploy::delete_vms(&client, &tracker, &vm_names).await;
    client.logout().await?;
    result?;

    info!("虚拟机删除完成: {}", vm_names.join(", "));
    Ok(())
}
