//! 虚拟机部署流水线
//!
//! 固定顺序的阶段序列：幂等预检 -> 构建放置规格 -> 克隆 ->
//! 网络更新 -> 主机迁移 -> 系统识别 -> IP 定制 -> 上电 ->
//! Windows IP 设置 -> 静态 IP 校验 -> 主机名更新 -> 快照 -> 下电。
//!
//! 每个阶段以前序阶段成功为前提，任一阶段失败立即中止整条
//! 流水线，不重试也不回滚已创建的虚拟机。

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use vcd_vcenter::{
    CloneSpec, CustomizationSpec, GuestCredentials, NicBacking, PlacementSpec, PowerState,
    RelocateSpec, ToolsStatus, VcClient, VcError, VmSummary,
};

use crate::config::DeployConfig;
use crate::error::{DeployError, Result};
use crate::logfile;
use crate::tracker::{TaskTracker, TrackReport, VcTaskHandle};

/// 克隆阶段每批最多同时外发的任务数
const CLONE_BATCH: usize = 10;

/// 批量任务的默认等待预算
const STAGE_TIMEOUT: Duration = Duration::from_secs(3600);

/// 电源与删除任务的等待预算
const POWER_TIMEOUT: Duration = Duration::from_secs(1800);

/// 启动等待与静态 IP 校验的检查间隔
const BOOT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// 客户机操作系统类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuestKind {
    Linux,
    Windows,
}

/// 幂等预检结论
enum Precheck {
    /// 还有虚拟机要创建，继续流水线
    Proceed,

    /// 全部已存在，整次部署视为已完成
    AllExist,
}

/// 虚拟机部署流水线
pub struct DeployPipeline<'a> {
    client: &'a VcClient,
    config: DeployConfig,
    tracker: TaskTracker,

    /// 本次要创建的虚拟机名称序列（预检后可能收缩）
    vm_names: Vec<String>,

    /// 生效的静态 IP 列表，与 vm_names 按下标对应
    static_ips: Vec<String>,

    /// 已部署（含预检时发现已存在）的虚拟机台账
    deployed: Vec<String>,
}

impl<'a> DeployPipeline<'a> {
    /// 创建流水线，生成整组虚拟机名称
    pub fn new(client: &'a VcClient, config: DeployConfig) -> Result<Self> {
        let vm_names = crate::naming::build_vm_names(&config.base_vmname, config.count)?;
        let static_ips = config.static_ips.clone();
        Ok(Self {
            client,
            config,
            tracker: TaskTracker::default(),
            vm_names,
            static_ips,
            deployed: Vec::new(),
        })
    }

    /// 本次部署覆盖的虚拟机名称
    pub fn vm_names(&self) -> &[String] {
        &self.vm_names
    }

    /// 已部署（含已存在）的虚拟机名称
    pub fn deployed(&self) -> &[String] {
        &self.deployed
    }

    /// 执行整条部署流水线
    pub async fn deploy(&mut self) -> Result<()> {
        if let Precheck::AllExist = self.check_vm_exist().await? {
            info!(
                "==============成功部署虚拟机: {}==============",
                self.deployed.join(", ")
            );
            return Ok(());
        }

        let (template, placement) = self.build_spec().await?;
        self.clone_vms(&template, &placement).await?;

        if let Some(network) = self.config.network.clone() {
            self.update_network(&network).await?;
        }

        if self.config.cluster.is_none() {
            if let Some(esx) = self.config.esx.clone() {
                // 克隆刚结束，等虚拟机配置落稳再迁移
                sleep(Duration::from_secs(30)).await;
                self.relocate_vms(&esx).await?;
            }
        }

        let guest_kind = self.detect_guest_kind().await?;

        if guest_kind == GuestKind::Linux && self.config.static_ip() {
            self.setup_linux_ip().await?;
        }

        self.power_up_vms().await?;

        if guest_kind == GuestKind::Windows && self.config.static_ip() {
            sleep(Duration::from_secs(30)).await;
            self.setup_win_ip().await?;
        }

        if self.config.static_ip() {
            self.check_static_ip().await?;
        }

        if guest_kind == GuestKind::Windows && self.config.hostname_update {
            self.update_win_hostname().await?;
        }

        if let Some(snapshot_name) = self.config.snapshot_name.clone() {
            self.create_snapshots(&snapshot_name).await?;
        }

        if !self.config.power_on {
            power_off(self.client, &self.tracker, &self.vm_names).await?;
        }

        info!(
            "==============成功部署虚拟机: {}==============",
            self.deployed.join(", ")
        );
        Ok(())
    }

    /// 查询本组虚拟机的客户机 IP 地址
    pub async fn vm_ips(&self) -> Result<Vec<(String, String)>> {
        vm_guest_ips(self.client, &self.vm_names).await
    }

    // ============================================
    // 阶段 1: 幂等预检
    // ============================================

    /// 静态 IP 幂等预检
    ///
    /// 逐个静态 IP 查找已有虚拟机：恰好一台则该 IP 跳过创建并
    /// 计入部署台账；多台视为配置冲突，在任何远程修改之前中止。
    async fn check_vm_exist(&mut self) -> Result<Precheck> {
        if self.static_ips.is_empty() {
            return Ok(Precheck::Proceed);
        }

        info!("开始检查静态 IP 对应的虚拟机是否已存在");
        let mut existing: Vec<String> = Vec::new();
        for ip in &self.static_ips {
            let found = self.client.vm().find_by_ip(ip).await?;
            match found.as_slice() {
                [] => {}
                [vm] => {
                    info!("静态 IP {} 的虚拟机 {} 已存在，跳过创建", ip, vm.name);
                    existing.push(ip.clone());
                    self.deployed.push(vm.name.clone());
                }
                many => {
                    for vm in many {
                        warn!("静态 IP {} 已配置在虚拟机 {} 上", ip, vm.name);
                    }
                    return Err(DeployError::ConfigMismatch(format!(
                        "静态 IP {} 配置在多台虚拟机上，请先处理冲突",
                        ip
                    )));
                }
            }
        }

        let (remaining_ips, remaining_names) =
            partition_existing(&self.static_ips, &self.vm_names, &existing);

        if remaining_ips.is_empty() {
            warn!("所有静态 IP 对应的虚拟机都已存在，本次不创建新虚拟机");
            return Ok(Precheck::AllExist);
        }
        if remaining_ips.len() != remaining_names.len() {
            return Err(DeployError::ConfigMismatch(format!(
                "静态 IP 数量 {} 与待创建虚拟机数量 {} 不一致",
                remaining_ips.len(),
                remaining_names.len()
            )));
        }

        self.static_ips = remaining_ips;
        self.vm_names = remaining_names;
        Ok(Precheck::Proceed)
    }

    // ============================================
    // 阶段 2: 构建放置规格
    // ============================================

    /// 解析模板与放置规格
    ///
    /// 资源池优先取集群，其次 ESXi 主机，最后回退到模板当前
    /// 所在资源池；文件夹与数据存储同样按配置优先、模板回退。
    async fn build_spec(&self) -> Result<(String, PlacementSpec)> {
        info!("开始构建虚拟机部署规格");
        let inventory = self.client.inventory();

        let template = self
            .client
            .vm()
            .find(&self.config.template)
            .await?
            .ok_or_else(|| VcError::NotFound(format!("模板 {}", self.config.template)))?;

        let resource_pool = if let Some(name) = &self.config.cluster {
            let cluster = inventory.cluster(name).await?;
            inventory.resource_pool_by_cluster(&cluster).await?
        } else if let Some(name) = &self.config.esx {
            let host = inventory.host(name).await?;
            inventory.resource_pool_by_host(&host).await?
        } else {
            inventory.resource_pool_of_vm(&template.vm).await?
        };

        let folder = if let Some(name) = &self.config.folder {
            inventory.folder(name).await?
        } else if let Some(name) = &self.config.datacenter {
            let datacenter = inventory.datacenter(name).await?;
            inventory.datacenter_vm_folder(&datacenter).await?
        } else {
            inventory.folder_of_vm(&template.vm).await?
        };

        let datastore = if let Some(name) = &self.config.datastore {
            inventory.datastore(name).await?
        } else {
            inventory.datastore_of_vm(&template.vm).await?
        };

        info!("虚拟机部署规格构建完成");
        Ok((
            template.vm,
            PlacementSpec {
                resource_pool,
                folder,
                datastore,
            },
        ))
    }

    // ============================================
    // 阶段 3: 克隆
    // ============================================

    /// 批量克隆虚拟机
    ///
    /// 同名虚拟机已存在时跳过克隆；每外发 [`CLONE_BATCH`] 个任务
    /// 等待一批完成再继续，控制平台上的并发克隆数量。
    async fn clone_vms(&mut self, template: &str, placement: &PlacementSpec) -> Result<()> {
        info!("开始克隆虚拟机");
        let mut outstanding: HashMap<String, VcTaskHandle<'a>> = HashMap::new();
        let mut issued = 0usize;

        for vm_name in self.vm_names.clone() {
            if self.client.vm().find(&vm_name).await?.is_some() {
                warn!("虚拟机 {} 已存在，跳过克隆", vm_name);
                continue;
            }

            let spec = CloneSpec::new(template, &vm_name, placement.clone());
            let task = self.client.vm().clone(&spec).await?;
            info!("开始克隆虚拟机 {}", vm_name);
            outstanding.insert(vm_name.clone(), VcTaskHandle::new(self.client, task));
            self.deployed.push(vm_name);

            issued += 1;
            if issued % CLONE_BATCH == 0 {
                self.finish_clone_batch(std::mem::take(&mut outstanding))
                    .await?;
            }
        }

        if !outstanding.is_empty() {
            self.finish_clone_batch(outstanding).await?;
        }

        info!("虚拟机克隆完成");
        Ok(())
    }

    /// 等待一批克隆任务完成并写部署清单
    async fn finish_clone_batch(&self, handles: HashMap<String, VcTaskHandle<'a>>) -> Result<()> {
        let report = self.tracker.track("虚拟机克隆", handles, STAGE_TIMEOUT).await;
        for name in report.succeeded_names() {
            logfile::append_line(&self.config.deploy_log, &format!("DEPLOYVM:{}", name))?;
        }
        require_success("虚拟机克隆", &report)
    }

    // ============================================
    // 阶段 4: 网络更新
    // ============================================

    /// 把每台虚拟机的第一块网卡切到目标网络
    ///
    /// 这一批任务用任务更新过滤器订阅完成状态，而不是逐个轮询。
    async fn update_network(&self, network_name: &str) -> Result<()> {
        info!("开始更新虚拟机网络到 {}", network_name);
        let network = self
            .client
            .inventory()
            .network(network_name, self.config.network_distributed)
            .await?;
        let backing = if self.config.network_distributed {
            NicBacking::distributed(&network)
        } else {
            NicBacking::standard(&network)
        };

        let mut tasks: HashMap<String, String> = HashMap::new();
        for vm_name in &self.vm_names {
            let vm = self.find_required(vm_name).await?;
            // 模板只带一块网卡，只更新第一块
            let nics = self.client.vm().list_nics(&vm.vm).await?;
            let Some(nic) = nics.first() else {
                return Err(VcError::NotFound(format!("虚拟机 {} 的网卡", vm_name)).into());
            };
            let task = self.client.vm().update_nic(&vm.vm, nic, &backing).await?;
            tasks.insert(vm_name.clone(), task);
        }

        let report = self
            .tracker
            .track_filtered(self.client, "虚拟机网络更新", tasks, POWER_TIMEOUT)
            .await?;
        require_success("虚拟机网络更新", &report)?;
        info!("虚拟机网络更新完成");
        Ok(())
    }

    // ============================================
    // 阶段 5: 主机迁移
    // ============================================

    /// 迁移虚拟机到指定 ESXi 主机
    ///
    /// 主机在集群内时，迁移完成后把 DRS 自动化级别改为手动，
    /// 避免虚拟机再次被自动 vMotion 走。
    async fn relocate_vms(&self, esx_name: &str) -> Result<()> {
        info!("开始迁移虚拟机到 ESXi 主机 {}", esx_name);
        let inventory = self.client.inventory();
        let host = inventory.host(esx_name).await?;
        let resource_pool = inventory.resource_pool_by_host(&host).await?;
        let spec = RelocateSpec {
            host: host.clone(),
            resource_pool,
        };

        let mut handles = HashMap::new();
        for vm_name in &self.vm_names {
            let vm = self.find_required(vm_name).await?;
            let task = self.client.vm().relocate(&vm.vm, &spec).await?;
            handles.insert(vm_name.clone(), VcTaskHandle::new(self.client, task));
        }

        let report = self
            .tracker
            .track("虚拟机主机迁移", handles, STAGE_TIMEOUT)
            .await;
        require_success("虚拟机主机迁移", &report)?;

        if let Some(cluster) = inventory.cluster_of_host(&host).await? {
            info!("开始更新虚拟机 DRS 迁移设置");
            sleep(Duration::from_secs(15)).await;
            for vm_name in &self.vm_names {
                let vm = self.find_required(vm_name).await?;
                self.client.vm().set_drs_override(&cluster, &vm.vm).await?;
            }
        }

        info!("虚拟机主机迁移完成");
        Ok(())
    }

    // ============================================
    // 阶段 6: 系统识别
    // ============================================

    /// 识别客户机操作系统类别
    ///
    /// 读取虚拟机配置的 guest_OS 标识，整组按首个可识别的结果
    /// 归类，识别不出时中止。
    async fn detect_guest_kind(&self) -> Result<GuestKind> {
        for vm_name in &self.vm_names {
            let vm = self.find_required(vm_name).await?;
            let os = self.client.vm().guest_os(&vm.vm).await?.to_lowercase();
            if os.contains("windows") {
                info!("识别到 Windows 客户机: {}", os);
                return Ok(GuestKind::Windows);
            }
            if os.contains("linux") || os.contains("centos") {
                info!("识别到 Linux 客户机: {}", os);
                return Ok(GuestKind::Linux);
            }
        }
        Err(DeployError::ConfigMismatch(
            "无法识别客户机操作系统类型".to_string(),
        ))
    }

    // ============================================
    // 阶段 7: Linux 静态 IP 定制
    // ============================================

    /// 通过客户机定制化下发 Linux 静态 IP
    async fn setup_linux_ip(&self) -> Result<()> {
        info!("开始设置 Linux 虚拟机静态 IP 地址");
        let netmask = self.require_net_option(self.config.netmask.as_deref(), "netmask")?;
        let gateway = self.require_net_option(self.config.gateway.as_deref(), "gateway")?;

        let mut handles = HashMap::new();
        for (i, vm_name) in self.vm_names.iter().enumerate() {
            let vm = self.find_required(vm_name).await?;
            info!("为虚拟机 {} 设置静态 IP {}", vm_name, self.static_ips[i]);
            let spec = CustomizationSpec::linux_static(
                vm_name,
                &self.static_ips[i],
                netmask,
                gateway,
                self.config.dns.as_deref(),
            );
            let task = self.client.guest().customize(&vm.vm, &spec).await?;
            handles.insert(vm_name.clone(), VcTaskHandle::new(self.client, task));
        }

        let report = self
            .tracker
            .track("虚拟机静态 IP 定制", handles, STAGE_TIMEOUT)
            .await;
        require_success("虚拟机静态 IP 定制", &report)?;
        info!("Linux 虚拟机静态 IP 设置完成");
        Ok(())
    }

    // ============================================
    // 阶段 8: 上电与启动等待
    // ============================================

    /// 整组上电并等待系统与 VMware Tools 就绪
    async fn power_up_vms(&self) -> Result<()> {
        info!("开始虚拟机上电");
        for vm_name in &self.vm_names {
            let vm = self.find_required(vm_name).await?;
            if self.client.vm().power_state(&vm.vm).await? != PowerState::PoweredOn {
                // 上电任务不单独跟踪，统一按 Tools 就绪判断启动完成
                let _task = self.client.vm().start(&vm.vm).await?;
                info!("虚拟机 {} 开始上电", vm_name);
            }
        }
        self.wait_vms_up(STAGE_TIMEOUT).await
    }

    /// 等待整组虚拟机上电且 VMware Tools 进入运行状态
    async fn wait_vms_up(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            info!("---------------等待虚拟机与 VMware Tools 完全就绪---------------");
            let mut booted = 0usize;
            for vm_name in &self.vm_names {
                let vm = self.find_required(vm_name).await?;
                let powered_on =
                    self.client.vm().power_state(&vm.vm).await? == PowerState::PoweredOn;
                let tools_running = powered_on
                    && matches!(
                        self.client.guest().tools_status(&vm.vm).await,
                        Ok(ToolsStatus::Running)
                    );
                if tools_running {
                    info!("虚拟机 {} 与其 VMware Tools 已完全就绪", vm_name);
                    booted += 1;
                } else {
                    info!("虚拟机 {} 仍在启动中", vm_name);
                }
            }

            if booted == self.vm_names.len() {
                info!("所有虚拟机启动完成");
                return Ok(());
            }

            if Instant::now() >= deadline {
                warn!("虚拟机未能在 {:?} 内完全启动", timeout);
                return Err(DeployError::TaskTimeout("虚拟机启动等待超时".to_string()));
            }

            sleep(BOOT_POLL_INTERVAL).await;
        }
    }

    // ============================================
    // 阶段 9: Windows 静态 IP 设置
    // ============================================

    /// 在 Windows 客户机内通过 netsh 设置静态 IP
    ///
    /// 客户机定制化对已部署完的 Windows 不再生效，改为登录
    /// 客户机执行 netsh，配置完成后重启使其生效。
    async fn setup_win_ip(&self) -> Result<()> {
        info!("开始设置 Windows 虚拟机静态 IP 地址");
        let netmask = self.require_net_option(self.config.netmask.as_deref(), "netmask")?;
        let gateway = self.require_net_option(self.config.gateway.as_deref(), "gateway")?;
        let credentials = self.guest_credentials();

        for (i, vm_name) in self.vm_names.iter().enumerate() {
            let vm = self.find_required(vm_name).await?;
            info!("为虚拟机 {} 设置静态 IP {}", vm_name, self.static_ips[i]);
            let arguments = format!(
                "interface ipv4 set address Ethernet0 static {} {} {}",
                self.static_ips[i], netmask, gateway
            );
            self.client
                .guest()
                .run_program(
                    &vm.vm,
                    &credentials,
                    "c:\\windows\\system32\\netsh.exe",
                    &arguments,
                )
                .await?;
            sleep(Duration::from_secs(10)).await;

            if let Some(dns) = &self.config.dns {
                let arguments =
                    format!("interface ipv4 set dnsserver Ethernet0 static {} primary", dns);
                self.client
                    .guest()
                    .run_program(
                        &vm.vm,
                        &credentials,
                        "c:\\windows\\system32\\netsh.exe",
                        &arguments,
                    )
                    .await?;
            }
        }

        sleep(Duration::from_secs(30)).await;
        for vm_name in &self.vm_names {
            let vm = self.find_required(vm_name).await?;
            // 重启使网络配置生效
            self.client
                .guest()
                .run_program(
                    &vm.vm,
                    &credentials,
                    "c:\\windows\\system32\\shutdown.exe",
                    "/r /t 5",
                )
                .await?;
            info!("虚拟机 {} 静态 IP 设置完成", vm_name);
        }

        // 给整组虚拟机留出重启时间
        sleep(Duration::from_secs(60)).await;
        info!("所有 Windows 虚拟机静态 IP 设置完成");
        Ok(())
    }

    // ============================================
    // 阶段 10: 静态 IP 校验
    // ============================================

    /// 等待每个静态 IP 都出现在客户机上报的地址中
    async fn check_static_ip(&self) -> Result<()> {
        info!("开始检查虚拟机静态 IP 设置");
        let deadline = Instant::now() + STAGE_TIMEOUT;
        loop {
            info!("---------------等待虚拟机静态 IP 设置完成---------------");
            let reported: Vec<String> = self
                .vm_ips()
                .await?
                .into_iter()
                .map(|(_, ip)| ip)
                .collect();
            let assigned = self
                .static_ips
                .iter()
                .filter(|ip| reported.contains(ip))
                .count();

            if assigned == self.static_ips.len() {
                info!("所有虚拟机静态 IP 设置完成");
                return Ok(());
            }
            info!(
                "已生效 {}/{} 个静态 IP，继续等待",
                assigned,
                self.static_ips.len()
            );

            if Instant::now() >= deadline {
                warn!("虚拟机静态 IP 未能在 {:?} 内全部生效", STAGE_TIMEOUT);
                return Err(DeployError::TaskTimeout(
                    "虚拟机静态 IP 校验超时".to_string(),
                ));
            }

            sleep(BOOT_POLL_INTERVAL).await;
        }
    }

    // ============================================
    // 阶段 11: Windows 主机名更新
    // ============================================

    /// 把 Windows 客户机主机名改为虚拟机名
    async fn update_win_hostname(&self) -> Result<()> {
        info!("开始更新虚拟机主机名");
        self.wait_vms_up(POWER_TIMEOUT).await?;

        let credentials = self.guest_credentials();
        for vm_name in &self.vm_names {
            let vm = self.find_required(vm_name).await?;
            info!("更新虚拟机 {} 主机名", vm_name);
            let arguments = format!(
                "/C powershell -NonInteractive -Command Rename-Computer -NewName \"{}\" -Restart",
                vm_name
            );
            self.client
                .guest()
                .run_program(&vm.vm, &credentials, "cmd.exe", &arguments)
                .await?;
        }

        sleep(Duration::from_secs(30)).await;
        self.wait_vms_up(POWER_TIMEOUT).await?;
        info!("虚拟机主机名更新完成");
        Ok(())
    }

    // ============================================
    // 阶段 12: 快照
    // ============================================

    /// 为整组虚拟机创建同名快照
    async fn create_snapshots(&self, snapshot_name: &str) -> Result<()> {
        info!("开始创建虚拟机快照 {}", snapshot_name);
        let mut handles = HashMap::new();
        for vm_name in &self.vm_names {
            let vm = self.find_required(vm_name).await?;
            info!("为虚拟机 {} 创建快照 {}", vm_name, snapshot_name);
            let task = self
                .client
                .snapshot()
                .create(&vm.vm, snapshot_name, snapshot_name, true)
                .await?;
            handles.insert(vm_name.clone(), VcTaskHandle::new(self.client, task));
        }

        let report = self
            .tracker
            .track("虚拟机快照创建", handles, STAGE_TIMEOUT)
            .await;
        require_success("虚拟机快照创建", &report)?;
        info!("虚拟机快照创建完成");
        Ok(())
    }

    // ============================================
    // 辅助
    // ============================================

    /// 按名称查找虚拟机，不存在视为错误
    async fn find_required(&self, name: &str) -> Result<VmSummary> {
        self.client
            .vm()
            .find(name)
            .await?
            .ok_or_else(|| DeployError::from(VcError::NotFound(format!("虚拟机 {}", name))))
    }

    fn guest_credentials(&self) -> GuestCredentials {
        GuestCredentials {
            username: self.config.vm_user.clone(),
            password: self.config.vm_password.clone(),
        }
    }

    fn require_net_option<'s>(&self, value: Option<&'s str>, what: &str) -> Result<&'s str> {
        value.ok_or_else(|| {
            DeployError::ConfigMismatch(format!("静态 IP 部署缺少 {} 配置", what))
        })
    }
}

/// 幂等预检：根据已占用的静态 IP 收缩创建集合
///
/// 已占用的 IP 从待分配列表剔除，名称序列从尾部收缩相同数量，
/// 保证剩余 IP 与剩余名称仍按下标一一对应。
fn partition_existing(
    static_ips: &[String],
    vm_names: &[String],
    existing: &[String],
) -> (Vec<String>, Vec<String>) {
    let remaining_ips: Vec<String> = static_ips
        .iter()
        .filter(|ip| !existing.contains(ip))
        .cloned()
        .collect();
    let keep = vm_names.len().saturating_sub(existing.len());
    (remaining_ips, vm_names[..keep].to_vec())
}

/// 任一任务未成功时把台账折算为阶段错误
fn require_success(task_msg: &str, report: &TrackReport) -> Result<()> {
    if report.all_succeeded() {
        return Ok(());
    }
    if report.any_incomplete() {
        Err(DeployError::TaskTimeout(format!(
            "{} 未能在限定时间内完成",
            task_msg
        )))
    } else {
        Err(DeployError::TaskFailed(format!("{} 存在失败任务", task_msg)))
    }
}

/// 关闭一组虚拟机电源（跳过不存在与已关机的）
pub async fn power_off(
    client: &VcClient,
    tracker: &TaskTracker,
    vm_names: &[String],
) -> Result<()> {
    info!("开始虚拟机下电");
    let mut handles = HashMap::new();
    for vm_name in vm_names {
        let Some(vm) = client.vm().find(vm_name).await? else {
            warn!("虚拟机 {} 不存在，跳过下电", vm_name);
            continue;
        };
        if client.vm().power_state(&vm.vm).await? == PowerState::PoweredOn {
            let task = client.vm().stop(&vm.vm).await?;
            info!("虚拟机 {} 开始下电", vm_name);
            handles.insert(vm_name.clone(), VcTaskHandle::new(client, task));
        }
    }

    let report = tracker.track("虚拟机下电", handles, POWER_TIMEOUT).await;
    require_success("虚拟机下电", &report)?;
    info!("虚拟机下电完成");
    Ok(())
}

/// 关机并删除一组虚拟机
pub async fn delete_vms(
    client: &VcClient,
    tracker: &TaskTracker,
    vm_names: &[String],
) -> Result<()> {
    power_off(client, tracker, vm_names).await?;

    info!("开始删除虚拟机");
    let mut handles = HashMap::new();
    for vm_name in vm_names {
        let Some(vm) = client.vm().find(vm_name).await? else {
            warn!("虚拟机 {} 不存在，跳过删除", vm_name);
            continue;
        };
        info!("开始删除虚拟机 {}", vm_name);
        let task = client.vm().delete(&vm.vm).await?;
        handles.insert(vm_name.clone(), VcTaskHandle::new(client, task));
    }

    let report = tracker.track("虚拟机删除", handles, POWER_TIMEOUT).await;
    require_success("虚拟机删除", &report)?;
    info!("虚拟机删除完成");
    Ok(())
}

/// 查询一组虚拟机的客户机 IP 地址
///
/// 不存在或尚未上报地址的虚拟机跳过，不视为错误。
pub async fn vm_guest_ips(client: &VcClient, vm_names: &[String]) -> Result<Vec<(String, String)>> {
    let mut result = Vec::new();
    for vm_name in vm_names {
        let Some(vm) = client.vm().find(vm_name).await? else {
            warn!("虚拟机 {} 不存在，无法获取 IP 地址", vm_name);
            continue;
        };
        match client.guest().identity(&vm.vm).await {
            Ok(identity) => match identity.ip_address {
                Some(ip) if !ip.is_empty() => result.push((vm_name.clone(), ip)),
                _ => warn!("未能获取虚拟机 {} 的 IP 地址", vm_name),
            },
            Err(e) => warn!("查询虚拟机 {} 客户机信息失败: {}", vm_name, e),
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::TaskOutcome;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_partition_existing_shrinks_from_tail() {
        let ips = names(&["192.168.0.41", "192.168.0.42", "192.168.0.43"]);
        let vms = names(&["vm-01", "vm-02", "vm-03"]);
        let existing = names(&["192.168.0.42"]);

        let (remaining_ips, remaining_names) = partition_existing(&ips, &vms, &existing);
        assert_eq!(remaining_ips, names(&["192.168.0.41", "192.168.0.43"]));
        // 名称从尾部收缩，保持序列前缀稳定
        assert_eq!(remaining_names, names(&["vm-01", "vm-02"]));
    }

    #[test]
    fn test_partition_existing_all_taken() {
        let ips = names(&["192.168.0.41"]);
        let vms = names(&["vm-01"]);
        let existing = names(&["192.168.0.41"]);

        let (remaining_ips, remaining_names) = partition_existing(&ips, &vms, &existing);
        assert!(remaining_ips.is_empty());
        assert!(remaining_names.is_empty());
    }

    #[test]
    fn test_require_success_maps_outcomes() {
        let mut report = TrackReport::default();
        report.record("vm-01", TaskOutcome::Succeeded);
        assert!(require_success("虚拟机克隆", &report).is_ok());

        report.record("vm-02", TaskOutcome::Failed);
        assert!(matches!(
            require_success("虚拟机克隆", &report),
            Err(DeployError::TaskFailed(_))
        ));

        report.record("vm-03", TaskOutcome::Incomplete);
        assert!(matches!(
            require_success("虚拟机克隆", &report),
            Err(DeployError::TaskTimeout(_))
        ));
    }
}
