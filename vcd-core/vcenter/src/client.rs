//! vCenter 平台客户端核心实现

use std::sync::Arc;

use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::api::{GuestApi, InventoryApi, SnapshotApi, TaskApi, VmApi};
use crate::error::{Result, VcError};

/// vCenter 客户端配置
#[derive(Debug, Clone)]
pub struct VcConfig {
    /// 连接超时（秒）
    pub connect_timeout: u64,

    /// 请求超时（秒）
    pub request_timeout: u64,

    /// 是否验证 SSL 证书
    pub verify_ssl: bool,
}

impl Default for VcConfig {
    fn default() -> Self {
        Self {
            connect_timeout: 10,
            request_timeout: 60,
            verify_ssl: false,
        }
    }
}

/// vCenter 平台客户端
///
/// 会话在整个部署流程中创建一次，所有阶段显式借用同一个客户端。
pub struct VcClient {
    /// API 基础 URL
    base_url: String,

    /// HTTP 客户端
    http_client: Client,

    /// 会话令牌
    session_id: Arc<RwLock<Option<String>>>,
}

impl VcClient {
    /// 创建新的 vCenter 客户端
    pub fn new(base_url: &str, config: VcConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout))
            .connect_timeout(std::time::Duration::from_secs(config.connect_timeout))
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| VcError::Http(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            session_id: Arc::new(RwLock::new(None)),
        })
    }

    /// 登录 vCenter 创建会话
    ///
    /// # Arguments
    /// * `username` - vCenter 用户名
    /// * `password` - vCenter 密码
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        info!("vCenter 客户端登录: {}", username);

        let login_url = format!("{}/api/session", self.base_url);
        let response = self
            .http_client
            .post(&login_url)
            .basic_auth(username, Some(password))
            .send()
            .await
            .map_err(|e| VcError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!("vCenter 登录失败: {} - {}", status, text);
            return Err(VcError::Auth(format!("vCenter 登录失败: {}", status)));
        }

        // 响应体是一个 JSON 字符串形式的会话令牌
        let token: String = response
            .json()
            .await
            .map_err(|e| VcError::Parse(e.to_string()))?;

        *self.session_id.write().await = Some(token);

        info!("vCenter 客户端登录成功");
        Ok(())
    }

    /// 注销会话
    pub async fn logout(&mut self) -> Result<()> {
        info!("vCenter 客户端登出");

        let token = self.session_id.read().await.clone();
        if let Some(token) = token {
            let url = format!("{}/api/session", self.base_url);
            // 注销失败不影响调用方，只记录日志
            if let Err(e) = self
                .http_client
                .delete(&url)
                .header("vmware-api-session-id", &token)
                .send()
                .await
            {
                warn!("vCenter 注销请求失败: {}", e);
            }
        }

        *self.session_id.write().await = None;
        Ok(())
    }

    /// 获取清单查询 API
    pub fn inventory(&self) -> InventoryApi<'_> {
        InventoryApi::new(self)
    }

    /// 获取虚拟机管理 API
    pub fn vm(&self) -> VmApi<'_> {
        VmApi::new(self)
    }

    /// 获取客户机操作 API
    pub fn guest(&self) -> GuestApi<'_> {
        GuestApi::new(self)
    }

    /// 获取快照管理 API
    pub fn snapshot(&self) -> SnapshotApi<'_> {
        SnapshotApi::new(self)
    }

    /// 获取任务管理 API
    pub fn task(&self) -> TaskApi<'_> {
        TaskApi::new(self)
    }

    /// 发送 HTTP 请求并解析 JSON 响应
    pub(crate) async fn request<T: Serialize, R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<T>,
    ) -> Result<R> {
        let response = self.send(method, path, body).await?;

        response
            .json::<R>()
            .await
            .map_err(|e| VcError::Parse(e.to_string()))
    }

    /// 发送 HTTP 请求，忽略响应体（用于返回 204 的接口）
    pub(crate) async fn execute<T: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<T>,
    ) -> Result<()> {
        self.send(method, path, body).await?;
        Ok(())
    }

    async fn send<T: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<T>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!("vCenter API 请求: {} {}", method, url);

        let token = self.session_id.read().await;
        let token_str = token
            .as_ref()
            .ok_or_else(|| VcError::Auth("未认证，请先登录".to_string()))?;

        let mut request = self
            .http_client
            .request(method, &url)
            .header("vmware-api-session-id", token_str)
            .header("Content-Type", "application/json");

        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| VcError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "无法读取错误响应".to_string());
            warn!("API 请求失败: {} - {}", status, error_text);
            return Err(VcError::Api(status.as_u16(), error_text));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vc_client_creation() {
        let client = VcClient::new("https://192.168.1.10", VcConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_request_without_login() {
        let client = VcClient::new("https://192.168.1.10", VcConfig::default()).unwrap();
        let result = client.vm().power_state("vm-1001").await;
        assert!(matches!(result, Err(VcError::Auth(_))));
    }
}
