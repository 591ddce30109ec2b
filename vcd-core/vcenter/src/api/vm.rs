//! 虚拟机管理 API
//!
//! 提供部署流水线需要的虚拟机操作，包括：
//! - 查询：按名称/按客户机 IP 查找
//! - 克隆：基于模板克隆新虚拟机
//! - 配置：网卡 backing 更新、主机迁移、DRS 覆盖
//! - 电源：开机、关机
//! - 删除
//!
//! 长耗时操作统一带 `vmw-task=true` 参数，返回任务 ID，
//! 由部署侧的任务跟踪器轮询完成状态。

use reqwest::Method;
use tracing::info;

use crate::client::VcClient;
use crate::error::Result;
use crate::models::{CloneSpec, NicBacking, PowerState, RelocateSpec, VmSummary};

/// 虚拟机管理 API
pub struct VmApi<'a> {
    client: &'a VcClient,
}

impl<'a> VmApi<'a> {
    /// 创建新的虚拟机 API 实例
    pub(crate) fn new(client: &'a VcClient) -> Self {
        Self { client }
    }

    // ============================================
    // 查询
    // ============================================

    /// 按名称查找虚拟机，不存在时返回 None
    pub async fn find(&self, name: &str) -> Result<Option<VmSummary>> {
        let items: Vec<VmSummary> = self
            .client
            .request(
                Method::GET,
                &format!("/api/vcenter/vm?names={}", name),
                None::<()>,
            )
            .await?;

        Ok(items.into_iter().next())
    }

    /// 按客户机 IP 地址查找虚拟机
    ///
    /// 同一个 IP 可能对应多台虚拟机（配置错误），全部返回由调用方判断。
    pub async fn find_by_ip(&self, ip: &str) -> Result<Vec<VmSummary>> {
        info!("按客户机 IP 查找虚拟机: {}", ip);
        self.client
            .request(
                Method::GET,
                &format!("/api/vcenter/vm?guest_ips={}", ip),
                None::<()>,
            )
            .await
    }

    /// 查询虚拟机电源状态
    pub async fn power_state(&self, vm: &str) -> Result<PowerState> {
        let state: serde_json::Value = self
            .client
            .request(
                Method::GET,
                &format!("/api/vcenter/vm/{}/power", vm),
                None::<()>,
            )
            .await?;

        serde_json::from_value(state["state"].clone())
            .map_err(|e| crate::error::VcError::Parse(e.to_string()))
    }

    /// 查询虚拟机配置的客户机操作系统标识 (如 CENTOS_7_64 / WINDOWS_10_64)
    ///
    /// 读取的是虚拟机配置项而非运行时信息，关机状态下也可用。
    pub async fn guest_os(&self, vm: &str) -> Result<String> {
        let detail: serde_json::Value = self
            .client
            .request(Method::GET, &format!("/api/vcenter/vm/{}", vm), None::<()>)
            .await?;

        detail["guest_OS"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                crate::error::VcError::Parse(format!("虚拟机 {} 缺少 guest_OS 字段", vm))
            })
    }

    // ============================================
    // 克隆 / 迁移
    // ============================================

    /// 基于模板克隆虚拟机，返回任务 ID
    pub async fn clone(&self, spec: &CloneSpec) -> Result<String> {
        info!("克隆虚拟机: {} -> {}", spec.source, spec.name);
        self.client
            .request(
                Method::POST,
                "/api/vcenter/vm?action=clone&vmw-task=true",
                Some(spec),
            )
            .await
    }

    /// 迁移虚拟机到指定主机，返回任务 ID
    pub async fn relocate(&self, vm: &str, spec: &RelocateSpec) -> Result<String> {
        info!("迁移虚拟机: {} -> 主机 {}", vm, spec.host);
        self.client
            .request(
                Method::POST,
                &format!("/api/vcenter/vm/{}?action=relocate&vmw-task=true", vm),
                Some(serde_json::json!({ "placement": spec })),
            )
            .await
    }

    /// 关闭虚拟机的 DRS 自动迁移（设为手动）
    ///
    /// 迁移到集群内指定主机后调用，避免 DRS 再次自动 vMotion。
    pub async fn set_drs_override(&self, cluster: &str, vm: &str) -> Result<()> {
        info!("设置虚拟机 DRS 覆盖为手动: {}", vm);
        self.client
            .execute(
                Method::POST,
                &format!("/api/vcenter/cluster/{}/drs-vm-overrides", cluster),
                Some(serde_json::json!({
                    "vm": vm,
                    "behavior": "MANUAL",
                })),
            )
            .await
    }

    // ============================================
    // 网卡
    // ============================================

    /// 获取虚拟机网卡 ID 列表
    pub async fn list_nics(&self, vm: &str) -> Result<Vec<String>> {
        let items: Vec<serde_json::Value> = self
            .client
            .request(
                Method::GET,
                &format!("/api/vcenter/vm/{}/hardware/ethernet", vm),
                None::<()>,
            )
            .await?;

        Ok(items
            .iter()
            .filter_map(|item| item["nic"].as_str().map(|s| s.to_string()))
            .collect())
    }

    /// 更新网卡 backing，返回任务 ID
    pub async fn update_nic(&self, vm: &str, nic: &str, backing: &NicBacking) -> Result<String> {
        info!("更新虚拟机网卡: {} -> 网络 {}", vm, backing.network);
        self.client
            .request(
                Method::PATCH,
                &format!(
                    "/api/vcenter/vm/{}/hardware/ethernet/{}?vmw-task=true",
                    vm, nic
                ),
                Some(serde_json::json!({
                    "backing": backing,
                    "start_connected": true,
                    "wake_on_lan_enabled": true,
                    "allow_guest_control": true,
                })),
            )
            .await
    }

    // ============================================
    // 电源 / 删除
    // ============================================

    /// 虚拟机上电，返回任务 ID
    pub async fn start(&self, vm: &str) -> Result<String> {
        info!("虚拟机上电: {}", vm);
        self.client
            .request(
                Method::POST,
                &format!("/api/vcenter/vm/{}/power?action=start&vmw-task=true", vm),
                None::<()>,
            )
            .await
    }

    /// 虚拟机下电，返回任务 ID
    pub async fn stop(&self, vm: &str) -> Result<String> {
        info!("虚拟机下电: {}", vm);
        self.client
            .request(
                Method::POST,
                &format!("/api/vcenter/vm/{}/power?action=stop&vmw-task=true", vm),
                None::<()>,
            )
            .await
    }

    /// 删除虚拟机，返回任务 ID
    pub async fn delete(&self, vm: &str) -> Result<String> {
        info!("删除虚拟机: {}", vm);
        self.client
            .request(
                Method::DELETE,
                &format!("/api/vcenter/vm/{}?vmw-task=true", vm),
                None::<()>,
            )
            .await
    }
}
