//! 快照管理 API

use reqwest::Method;
use tracing::info;

use crate::client::VcClient;
use crate::error::Result;

/// 快照管理 API
pub struct SnapshotApi<'a> {
    client: &'a VcClient,
}

impl<'a> SnapshotApi<'a> {
    /// 创建新的快照 API 实例
    pub(crate) fn new(client: &'a VcClient) -> Self {
        Self { client }
    }

    /// 创建虚拟机快照，返回任务 ID
    ///
    /// # Arguments
    /// * `vm` - 虚拟机 ID
    /// * `name` - 快照名称
    /// * `description` - 快照描述
    /// * `memory` - 是否包含内存状态
    pub async fn create(
        &self,
        vm: &str,
        name: &str,
        description: &str,
        memory: bool,
    ) -> Result<String> {
        info!("创建虚拟机快照: {} -> {}", vm, name);
        self.client
            .request(
                Method::POST,
                &format!("/api/vcenter/vm/{}/snapshot?vmw-task=true", vm),
                Some(serde_json::json!({
                    "name": name,
                    "description": description,
                    "memory": memory,
                    "quiesce": false,
                })),
            )
            .await
    }
}
