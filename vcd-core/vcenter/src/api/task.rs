//! 任务管理 API
//!
//! 提供长耗时任务的状态跟踪，包括：
//! - 单任务状态查询（轮询方式）
//! - 任务更新过滤器（订阅方式）：注册一次过滤器，
//!   之后增量拉取状态变化，退出前必须销毁过滤器

use reqwest::Method;
use tracing::{debug, info};

use crate::client::VcClient;
use crate::error::Result;
use crate::models::{TaskInfo, TaskUpdate};

/// 任务管理 API
pub struct TaskApi<'a> {
    client: &'a VcClient,
}

impl<'a> TaskApi<'a> {
    /// 创建新的任务 API 实例
    pub(crate) fn new(client: &'a VcClient) -> Self {
        Self { client }
    }

    /// 查询任务状态
    pub async fn get(&self, task: &str) -> Result<TaskInfo> {
        debug!("查询任务状态: {}", task);
        self.client
            .request(
                Method::GET,
                &format!("/api/cis/tasks/{}", task),
                None::<()>,
            )
            .await
    }

    // ============================================
    // 任务更新过滤器
    // ============================================

    /// 创建任务更新过滤器，返回过滤器 ID
    ///
    /// 调用方必须保证在任何退出路径上都调用 `destroy_filter`。
    pub async fn create_filter(&self, tasks: &[String]) -> Result<String> {
        info!("创建任务更新过滤器: {} 个任务", tasks.len());
        self.client
            .request(
                Method::POST,
                "/api/cis/tasks/filter",
                Some(serde_json::json!({ "tasks": tasks })),
            )
            .await
    }

    /// 拉取过滤器的增量更新
    ///
    /// # Arguments
    /// * `filter` - 过滤器 ID
    /// * `version` - 上一次返回的版本号，首次拉取传 None
    ///
    /// 返回 (新版本号, 状态变化列表)。
    pub async fn get_updates(
        &self,
        filter: &str,
        version: Option<&str>,
    ) -> Result<(String, Vec<TaskUpdate>)> {
        let path = match version {
            Some(v) => format!("/api/cis/tasks/filter/{}/updates?version={}", filter, v),
            None => format!("/api/cis/tasks/filter/{}/updates", filter),
        };

        let response: serde_json::Value =
            self.client.request(Method::GET, &path, None::<()>).await?;

        let new_version = response["version"].as_str().unwrap_or_default().to_string();
        let updates: Vec<TaskUpdate> =
            serde_json::from_value(response["updates"].clone())
                .map_err(|e| crate::error::VcError::Parse(e.to_string()))?;

        Ok((new_version, updates))
    }

    /// 销毁任务更新过滤器
    pub async fn destroy_filter(&self, filter: &str) -> Result<()> {
        info!("销毁任务更新过滤器: {}", filter);
        self.client
            .execute(
                Method::DELETE,
                &format!("/api/cis/tasks/filter/{}", filter),
                None::<()>,
            )
            .await
    }
}
