//! 清单查询 API
//!
//! 按名称精确定位数据中心、集群、主机、文件夹、数据存储、网络
//! 等清单对象，找不到时返回 `VcError::NotFound`。

use reqwest::Method;
use tracing::debug;

use crate::client::VcClient;
use crate::error::{Result, VcError};

/// 清单查询 API
pub struct InventoryApi<'a> {
    client: &'a VcClient,
}

impl<'a> InventoryApi<'a> {
    /// 创建新的清单 API 实例
    pub(crate) fn new(client: &'a VcClient) -> Self {
        Self { client }
    }

    /// 按名称查询清单对象，取首个匹配项的指定 ID 字段
    async fn locate(&self, path: &str, id_field: &str, what: &str, name: &str) -> Result<String> {
        let items: Vec<serde_json::Value> = self
            .client
            .request(Method::GET, path, None::<()>)
            .await?;

        match items.first().and_then(|item| item[id_field].as_str()) {
            Some(id) => {
                debug!("找到{} {}: {}", what, name, id);
                Ok(id.to_string())
            }
            None => Err(VcError::NotFound(format!("{} {}", what, name))),
        }
    }

    /// 查询数据中心
    pub async fn datacenter(&self, name: &str) -> Result<String> {
        self.locate(
            &format!("/api/vcenter/datacenter?names={}", name),
            "datacenter",
            "数据中心",
            name,
        )
        .await
    }

    /// 查询集群
    pub async fn cluster(&self, name: &str) -> Result<String> {
        self.locate(
            &format!("/api/vcenter/cluster?names={}", name),
            "cluster",
            "集群",
            name,
        )
        .await
    }

    /// 查询 ESXi 主机
    pub async fn host(&self, name: &str) -> Result<String> {
        self.locate(
            &format!("/api/vcenter/host?names={}", name),
            "host",
            "ESXi 主机",
            name,
        )
        .await
    }

    /// 查询虚拟机文件夹
    pub async fn folder(&self, name: &str) -> Result<String> {
        self.locate(
            &format!("/api/vcenter/folder?type=VIRTUAL_MACHINE&names={}", name),
            "folder",
            "文件夹",
            name,
        )
        .await
    }

    /// 查询数据中心的默认虚拟机文件夹
    pub async fn datacenter_vm_folder(&self, datacenter: &str) -> Result<String> {
        self.locate(
            &format!("/api/vcenter/folder?type=VIRTUAL_MACHINE&datacenters={}", datacenter),
            "folder",
            "数据中心虚拟机文件夹",
            datacenter,
        )
        .await
    }

    /// 查询数据存储
    pub async fn datastore(&self, name: &str) -> Result<String> {
        self.locate(
            &format!("/api/vcenter/datastore?names={}", name),
            "datastore",
            "数据存储",
            name,
        )
        .await
    }

    /// 查询网络（标准端口组或分布式端口组）
    pub async fn network(&self, name: &str, distributed: bool) -> Result<String> {
        let net_type = if distributed {
            "DISTRIBUTED_PORTGROUP"
        } else {
            "STANDARD_PORTGROUP"
        };
        self.locate(
            &format!("/api/vcenter/network?types={}&names={}", net_type, name),
            "network",
            "网络",
            name,
        )
        .await
    }

    /// 查询集群的资源池
    pub async fn resource_pool_by_cluster(&self, cluster: &str) -> Result<String> {
        self.locate(
            &format!("/api/vcenter/resource-pool?clusters={}", cluster),
            "resource_pool",
            "集群资源池",
            cluster,
        )
        .await
    }

    /// 查询 ESXi 主机所在的资源池
    pub async fn resource_pool_by_host(&self, host: &str) -> Result<String> {
        self.locate(
            &format!("/api/vcenter/resource-pool?hosts={}", host),
            "resource_pool",
            "主机资源池",
            host,
        )
        .await
    }

    /// 查询虚拟机当前所在的资源池（模板放置回退用）
    pub async fn resource_pool_of_vm(&self, vm: &str) -> Result<String> {
        self.locate(
            &format!("/api/vcenter/resource-pool?vms={}", vm),
            "resource_pool",
            "虚拟机资源池",
            vm,
        )
        .await
    }

    /// 查询虚拟机当前所在的文件夹（模板放置回退用）
    pub async fn folder_of_vm(&self, vm: &str) -> Result<String> {
        self.locate(
            &format!("/api/vcenter/folder?type=VIRTUAL_MACHINE&vms={}", vm),
            "folder",
            "虚拟机文件夹",
            vm,
        )
        .await
    }

    /// 查询虚拟机当前所在的数据存储（模板放置回退用）
    pub async fn datastore_of_vm(&self, vm: &str) -> Result<String> {
        self.locate(
            &format!("/api/vcenter/datastore?vms={}", vm),
            "datastore",
            "虚拟机数据存储",
            vm,
        )
        .await
    }

    /// 查询 ESXi 主机所属的集群，不在集群中时返回 None
    pub async fn cluster_of_host(&self, host: &str) -> Result<Option<String>> {
        let items: Vec<serde_json::Value> = self
            .client
            .request(
                Method::GET,
                &format!("/api/vcenter/cluster?hosts={}", host),
                None::<()>,
            )
            .await?;

        Ok(items
            .first()
            .and_then(|item| item["cluster"].as_str())
            .map(|id| id.to_string()))
    }
}
