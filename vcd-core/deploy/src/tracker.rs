//! 远程任务跟踪器
//!
//! 本地不做并行：远端并发执行的一批任务由一个顺序循环观察完成
//! 状态。提供两种等待方式：
//!
//! - [`TaskTracker::track`]: 固定间隔逐个轮询任务状态
//! - [`TaskTracker::track_filtered`]: 注册任务更新过滤器，
//!   增量消费状态变化，退出前保证销毁过滤器
//!
//! 两种方式都把结果汇聚到 [`TrackReport`] 台账：每个实体恰好
//! 记录一个终局，进入终局后不再被覆盖，也不再被轮询。

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use vcd_vcenter::{TaskState, VcClient, VcError};

use crate::error::Result;

/// 远程任务的不透明句柄
///
/// 只暴露状态查询与错误描述，平台相关字段留在客户端一侧。
#[async_trait]
pub trait TaskHandle: Send + Sync {
    /// 查询任务当前状态
    async fn query_state(&self) -> std::result::Result<TaskState, VcError>;

    /// 任务失败时的错误描述
    async fn describe_error(&self) -> Option<String>;
}

/// vCenter 任务句柄
pub struct VcTaskHandle<'a> {
    client: &'a VcClient,
    task: String,
}

impl<'a> VcTaskHandle<'a> {
    /// 包装一个 vCenter 任务 ID
    pub fn new(client: &'a VcClient, task: String) -> Self {
        Self { client, task }
    }
}

#[async_trait]
impl<'a> TaskHandle for VcTaskHandle<'a> {
    async fn query_state(&self) -> std::result::Result<TaskState, VcError> {
        Ok(self.client.task().get(&self.task).await?.status)
    }

    async fn describe_error(&self) -> Option<String> {
        match self.client.task().get(&self.task).await {
            Ok(info) => info.error,
            Err(_) => None,
        }
    }
}

/// 任务终局
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// 成功完成
    Succeeded,

    /// 远程报告失败，或状态查询本身出错
    Failed,

    /// 超时前未进入终态
    Incomplete,
}

/// 完成台账：实体名 -> 终局
///
/// 每个实体只记录一次终局，先到的不被覆盖。
#[derive(Debug, Default)]
pub struct TrackReport {
    outcomes: HashMap<String, TaskOutcome>,
}

impl TrackReport {
    /// 记录实体终局（已有终局时忽略）
    pub fn record(&mut self, name: &str, outcome: TaskOutcome) {
        self.outcomes.entry(name.to_string()).or_insert(outcome);
    }

    /// 查询实体终局
    pub fn outcome(&self, name: &str) -> Option<TaskOutcome> {
        self.outcomes.get(name).copied()
    }

    /// 是否全部成功（空台账视为成功）
    pub fn all_succeeded(&self) -> bool {
        self.outcomes
            .values()
            .all(|o| *o == TaskOutcome::Succeeded)
    }

    /// 是否存在超时未完成的实体
    pub fn any_incomplete(&self) -> bool {
        self.outcomes
            .values()
            .any(|o| *o == TaskOutcome::Incomplete)
    }

    /// 成功实体名列表（升序）
    pub fn succeeded_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .outcomes
            .iter()
            .filter(|(_, o)| **o == TaskOutcome::Succeeded)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// 台账条目数
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// 台账是否为空
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// 单次轮询中一个任务的处置
enum Step {
    /// 进入终局，附带失败描述
    Done(TaskOutcome, Option<String>),

    /// 尚未终结，继续轮询
    Pending,
}

/// 远程任务跟踪器
pub struct TaskTracker {
    poll_interval: Duration,
}

impl Default for TaskTracker {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(20),
        }
    }
}

impl TaskTracker {
    /// 指定轮询间隔创建跟踪器
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// 轮询一组任务直到全部进入终态或超时
    ///
    /// 终态任务立即从轮询集合移除，不再查询；超时时剩余任务记为
    /// [`TaskOutcome::Incomplete`]。空集合直接返回空台账（视为成功）。
    pub async fn track<H: TaskHandle>(
        &self,
        task_msg: &str,
        handles: HashMap<String, H>,
        timeout: Duration,
    ) -> TrackReport {
        let mut report = TrackReport::default();
        if handles.is_empty() {
            return report;
        }

        let mut pending = handles;
        let deadline = Instant::now() + timeout;

        loop {
            info!("---------------等待{}---------------", task_msg);

            let names: Vec<String> = pending.keys().cloned().collect();
            for name in names {
                let step = {
                    let Some(handle) = pending.get(&name) else {
                        continue;
                    };
                    match handle.query_state().await {
                        Ok(state) if !state.is_terminal() => Step::Pending,
                        Ok(TaskState::Failed) => {
                            let detail = handle.describe_error().await;
                            Step::Done(TaskOutcome::Failed, detail)
                        }
                        Ok(_) => Step::Done(TaskOutcome::Succeeded, None),
                        Err(e) => Step::Done(TaskOutcome::Failed, Some(e.to_string())),
                    }
                };

                match step {
                    Step::Done(TaskOutcome::Succeeded, _) => {
                        info!("{} {} 成功完成", task_msg, name);
                        report.record(&name, TaskOutcome::Succeeded);
                        pending.remove(&name);
                    }
                    Step::Done(outcome, detail) => {
                        warn!(
                            "{} {} 任务出错退出: {}",
                            task_msg,
                            name,
                            detail.unwrap_or_else(|| "任务被取消".to_string())
                        );
                        report.record(&name, outcome);
                        pending.remove(&name);
                    }
                    Step::Pending => {
                        info!("{} {} 仍在进行中", task_msg, name);
                    }
                }
            }

            if pending.is_empty() {
                return report;
            }

            if Instant::now() >= deadline {
                warn!("{} 未能在 {:?} 内完成", task_msg, timeout);
                for name in pending.keys() {
                    report.record(name, TaskOutcome::Incomplete);
                }
                return report;
            }

            sleep(self.poll_interval).await;
        }
    }

    /// 订阅方式等待一组任务完成
    ///
    /// 注册一次任务更新过滤器，增量消费状态变化。无论等待循环
    /// 如何退出（全部完成/超时/订阅链路出错），过滤器都会被销毁。
    ///
    /// # Arguments
    /// * `tasks` - 实体名 -> 任务 ID
    pub async fn track_filtered(
        &self,
        client: &VcClient,
        task_msg: &str,
        tasks: HashMap<String, String>,
        timeout: Duration,
    ) -> Result<TrackReport> {
        if tasks.is_empty() {
            return Ok(TrackReport::default());
        }

        let ids: Vec<String> = tasks.values().cloned().collect();
        let filter = client.task().create_filter(&ids).await?;

        // 等待循环不向外抛错，保证过滤器在所有退出路径上都被销毁
        let report = self
            .wait_filter_updates(client, &filter, task_msg, &tasks, timeout)
            .await;

        if let Err(e) = client.task().destroy_filter(&filter).await {
            warn!("销毁任务更新过滤器 {} 失败: {}", filter, e);
        }

        Ok(report)
    }

    async fn wait_filter_updates(
        &self,
        client: &VcClient,
        filter: &str,
        task_msg: &str,
        tasks: &HashMap<String, String>,
        timeout: Duration,
    ) -> TrackReport {
        let mut report = TrackReport::default();

        // 任务 ID -> 实体名 反查表
        let by_task: HashMap<&str, &str> = tasks
            .iter()
            .map(|(name, task)| (task.as_str(), name.as_str()))
            .collect();

        let deadline = Instant::now() + timeout;
        let mut version: Option<String> = None;

        loop {
            info!("---------------等待{}---------------", task_msg);

            match client.task().get_updates(filter, version.as_deref()).await {
                Ok((new_version, updates)) => {
                    for update in updates {
                        let Some(name) = by_task.get(update.task.as_str()) else {
                            continue;
                        };
                        match update.status {
                            TaskState::Succeeded => {
                                info!("{} {} 成功完成", task_msg, name);
                                report.record(name, TaskOutcome::Succeeded);
                            }
                            TaskState::Failed => {
                                warn!("{} {} 任务出错退出", task_msg, name);
                                report.record(name, TaskOutcome::Failed);
                            }
                            _ => {
                                info!("{} {} 仍在进行中", task_msg, name);
                            }
                        }
                    }
                    version = Some(new_version);
                }
                Err(e) => {
                    // 订阅链路出错不再继续等待，剩余任务记为未完成
                    warn!("等待{}时订阅出错: {}", task_msg, e);
                    break;
                }
            }

            if report.len() == tasks.len() {
                return report;
            }

            if Instant::now() >= deadline {
                warn!("{} 未能在 {:?} 内完成", task_msg, timeout);
                break;
            }

            sleep(self.poll_interval).await;
        }

        for name in tasks.keys() {
            report.record(name, TaskOutcome::Incomplete);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 按脚本逐次返回状态的测试句柄，None 表示查询出错
    struct FakeHandle {
        script: Vec<Option<TaskState>>,
        calls: std::sync::Arc<AtomicUsize>,
    }

    impl FakeHandle {
        fn new(script: Vec<Option<TaskState>>) -> Self {
            Self {
                script,
                calls: std::sync::Arc::new(AtomicUsize::new(0)),
            }
        }

        fn always(state: TaskState) -> Self {
            Self::new(vec![Some(state)])
        }

        fn call_counter(&self) -> std::sync::Arc<AtomicUsize> {
            self.calls.clone()
        }
    }

    #[async_trait]
    impl TaskHandle for FakeHandle {
        async fn query_state(&self) -> std::result::Result<TaskState, VcError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let idx = n.min(self.script.len() - 1);
            match self.script[idx] {
                Some(state) => Ok(state),
                None => Err(VcError::Http("连接中断".to_string())),
            }
        }

        async fn describe_error(&self) -> Option<String> {
            Some("远端任务失败".to_string())
        }
    }

    #[tokio::test]
    async fn test_track_empty_set() {
        let tracker = TaskTracker::default();
        let handles: HashMap<String, FakeHandle> = HashMap::new();
        let report = tracker
            .track("空任务组", handles, Duration::from_secs(60))
            .await;
        assert!(report.is_empty());
        assert!(report.all_succeeded());
    }

    #[tokio::test]
    async fn test_track_all_succeed_first_poll() {
        let tracker = TaskTracker::default();
        let mut handles = HashMap::new();
        handles.insert("vm-01".to_string(), FakeHandle::always(TaskState::Succeeded));
        handles.insert("vm-02".to_string(), FakeHandle::always(TaskState::Succeeded));

        let report = tracker
            .track("虚拟机克隆", handles, Duration::from_secs(60))
            .await;
        assert!(report.all_succeeded());
        assert_eq!(report.succeeded_names(), vec!["vm-01", "vm-02"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_track_timeout_marks_incomplete() {
        let tracker = TaskTracker::new(Duration::from_secs(20));
        let mut handles = HashMap::new();
        handles.insert("vm-01".to_string(), FakeHandle::always(TaskState::Succeeded));
        handles.insert("vm-02".to_string(), FakeHandle::always(TaskState::Succeeded));
        handles.insert("vm-03".to_string(), FakeHandle::always(TaskState::Running));

        // 超时等于一个轮询间隔：恰好完成一轮查询后到期
        let report = tracker
            .track("虚拟机克隆", handles, Duration::from_secs(20))
            .await;
        assert_eq!(report.outcome("vm-01"), Some(TaskOutcome::Succeeded));
        assert_eq!(report.outcome("vm-02"), Some(TaskOutcome::Succeeded));
        assert_eq!(report.outcome("vm-03"), Some(TaskOutcome::Incomplete));
        assert!(!report.all_succeeded());
        assert!(report.any_incomplete());
    }

    #[tokio::test(start_paused = true)]
    async fn test_track_terminal_not_polled_again() {
        let tracker = TaskTracker::new(Duration::from_secs(20));
        let done = FakeHandle::always(TaskState::Succeeded);
        let done_calls = done.call_counter();
        let slow = FakeHandle::new(vec![
            Some(TaskState::Queued),
            Some(TaskState::Running),
            Some(TaskState::Succeeded),
        ]);

        let mut handles = HashMap::new();
        handles.insert("vm-01".to_string(), done);
        handles.insert("vm-02".to_string(), slow);

        let report = tracker
            .track("虚拟机克隆", handles, Duration::from_secs(3600))
            .await;
        assert!(report.all_succeeded());
        assert_eq!(report.len(), 2);
        // 终态任务不再被轮询：整个等待过程只查询了一次
        assert_eq!(done_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_track_query_error_counts_as_failed() {
        let tracker = TaskTracker::new(Duration::from_secs(20));
        let mut handles = HashMap::new();
        handles.insert("vm-01".to_string(), FakeHandle::new(vec![None]));
        handles.insert(
            "vm-02".to_string(),
            FakeHandle::new(vec![Some(TaskState::Running), Some(TaskState::Succeeded)]),
        );

        let report = tracker
            .track("虚拟机克隆", handles, Duration::from_secs(3600))
            .await;
        // 查询出错按失败处理，不影响其余任务继续完成
        assert_eq!(report.outcome("vm-01"), Some(TaskOutcome::Failed));
        assert_eq!(report.outcome("vm-02"), Some(TaskOutcome::Succeeded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_track_remote_failure_recorded() {
        let tracker = TaskTracker::new(Duration::from_secs(20));
        let mut handles = HashMap::new();
        handles.insert("vm-01".to_string(), FakeHandle::always(TaskState::Failed));

        let report = tracker
            .track("虚拟机克隆", handles, Duration::from_secs(3600))
            .await;
        assert_eq!(report.outcome("vm-01"), Some(TaskOutcome::Failed));
        assert!(!report.all_succeeded());
        assert!(!report.any_incomplete());
    }
}
