//! 客户机操作 API
//!
//! 提供客户机系统相关的操作，包括：
//! - 客户机系统信息与 VMware Tools 状态查询
//! - 客户机定制化（静态 IP / DHCP / 主机名）
//! - 在客户机内启动进程（Windows netsh / 重命名 / 重启）

use reqwest::Method;
use tracing::info;

use crate::client::VcClient;
use crate::error::Result;
use crate::models::{CustomizationSpec, GuestCredentials, GuestIdentity, ToolsStatus};

/// 客户机操作 API
pub struct GuestApi<'a> {
    client: &'a VcClient,
}

impl<'a> GuestApi<'a> {
    /// 创建新的客户机 API 实例
    pub(crate) fn new(client: &'a VcClient) -> Self {
        Self { client }
    }

    /// 查询客户机系统信息
    pub async fn identity(&self, vm: &str) -> Result<GuestIdentity> {
        self.client
            .request(
                Method::GET,
                &format!("/api/vcenter/vm/{}/guest/identity", vm),
                None::<()>,
            )
            .await
    }

    /// 查询 VMware Tools 运行状态
    pub async fn tools_status(&self, vm: &str) -> Result<ToolsStatus> {
        let info: serde_json::Value = self
            .client
            .request(
                Method::GET,
                &format!("/api/vcenter/vm/{}/tools", vm),
                None::<()>,
            )
            .await?;

        serde_json::from_value(info["run_state"].clone())
            .map_err(|e| crate::error::VcError::Parse(e.to_string()))
    }

    /// 应用客户机定制化规格，返回任务 ID
    pub async fn customize(&self, vm: &str, spec: &CustomizationSpec) -> Result<String> {
        info!("应用客户机定制化: {} -> 主机名 {}", vm, spec.hostname);
        self.client
            .request(
                Method::POST,
                &format!("/api/vcenter/vm/{}/guest/customization?vmw-task=true", vm),
                Some(spec),
            )
            .await
    }

    /// 在客户机内启动进程，返回进程 PID
    ///
    /// 需要客户机已安装并运行 VMware Tools。
    pub async fn run_program(
        &self,
        vm: &str,
        creds: &GuestCredentials,
        path: &str,
        arguments: &str,
    ) -> Result<i64> {
        info!("客户机内执行程序: {} -> {} {}", vm, path, arguments);
        let pid: i64 = self
            .client
            .request(
                Method::POST,
                &format!("/api/vcenter/vm/{}/guest/processes?action=create", vm),
                Some(serde_json::json!({
                    "credentials": {
                        "type": "USERNAME_PASSWORD",
                        "username": creds.username,
                        "password": creds.password,
                        "interactive_session": false,
                    },
                    "spec": {
                        "path": path,
                        "arguments": arguments,
                    },
                })),
            )
            .await?;
        Ok(pid)
    }
}
