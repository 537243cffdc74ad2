//! 批量运行器 - 编排层
//!
//! ## 职责
//!
//! 1. **固定大小的 worker 池**：启动 `concurrency` 个 worker，每个 worker 循环
//!    "领取下一个岗位 → 跑完整个流程 → 上报结果"
//! 2. **按顺序派发**：岗位按列表顺序被领取，完成顺序不保证
//! 3. **中断**：收到取消信号后停止派发，等进行中的岗位最多 `grace`，
//!    超时后强制中止剩余任务（页面在后台关闭），总是返回统计
//! 4. **崩溃隔离**：单个流程 panic 只记为该岗位失败
//! 5. 被强制中止或崩溃的岗位同样写入运行记录

use chrono::Local;
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::ErrorKind;
use crate::models::{ApplicationResult, JobTarget};
use crate::orchestrator::job_queue::JobQueue;
use crate::orchestrator::stats::{BatchStats, StatsRecorder};
use crate::services::RunRecorder;
use crate::workflow::{ApplicationFlow, JobCtx};

/// 强制中止后等待任务退出的时间
const ABORT_SETTLE: Duration = Duration::from_secs(2);

/// 批量运行器
pub struct BatchRunner {
    flow: Arc<ApplicationFlow>,
    cancel: CancellationToken,
    grace: Duration,
    run_recorder: Option<RunRecorder>,
}

impl BatchRunner {
    pub fn new(flow: Arc<ApplicationFlow>, cancel: CancellationToken, grace: Duration) -> Self {
        Self {
            flow,
            cancel,
            grace,
            run_recorder: None,
        }
    }

    /// 流程没能自己落盘的结果（强制中止、崩溃）由运行器补写
    pub fn with_recorder(mut self, recorder: RunRecorder) -> Self {
        self.run_recorder = Some(recorder);
        self
    }

    /// 取消信号（交给 Ctrl+C 处理等外部触发方）
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 处理一组岗位
    pub async fn run(&self, jobs: Vec<JobTarget>, concurrency: usize) -> BatchStats {
        let total = jobs.len();
        let workers = concurrency.max(1).min(total.max(1));
        let queue = Arc::new(JobQueue::new(jobs));
        let recorder = Arc::new(StatsRecorder::new(total));

        info!("{}", "=".repeat(60));
        info!("📦 开始批量申请: {} 个岗位, {} 个 worker", total, workers);
        info!("{}", "=".repeat(60));

        let handles: Vec<JoinHandle<()>> = (1..=workers)
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    self.flow.clone(),
                    queue.clone(),
                    recorder.clone(),
                    self.run_recorder.clone(),
                    self.cancel.clone(),
                ))
            })
            .collect();
        let abort_handles: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();

        let all = join_all(handles);
        tokio::pin!(all);

        let finished = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            results = &mut all => {
                log_join_errors(results);
                true
            }
        };

        if !finished {
            let unclaimed = queue.close();
            warn!(
                "⏹️ 收到中断信号，停止派发（{} 个岗位未领取），等待进行中的岗位最多 {}s",
                unclaimed,
                self.grace.as_secs()
            );
            match tokio::time::timeout(self.grace, &mut all).await {
                Ok(results) => {
                    log_join_errors(results);
                    info!("✓ 进行中的岗位都已结束");
                }
                Err(_) => {
                    warn!("⚠️ 宽限期已过，强制中止 {} 个进行中的岗位", recorder.in_flight());
                    for handle in &abort_handles {
                        handle.abort();
                    }
                    if tokio::time::timeout(ABORT_SETTLE, &mut all).await.is_err() {
                        error!("部分 worker 在强制中止后仍未退出");
                    }
                }
            }
        }

        let aborted = recorder.abort_in_flight();
        if !aborted.is_empty() {
            warn!("⏹️ {} 个岗位被强制中止", aborted.len());
            for result in &aborted {
                persist(self.run_recorder.as_ref(), result).await;
            }
        }

        let mut stats = recorder.snapshot();
        stats.claim_order = queue.claim_order();
        stats.interrupted = !finished;
        stats
    }
}

/// 单个 worker：循环领取岗位直到队列取完或收到取消
async fn worker_loop(
    worker_id: usize,
    flow: Arc<ApplicationFlow>,
    queue: Arc<JobQueue>,
    recorder: Arc<StatsRecorder>,
    run_recorder: Option<RunRecorder>,
    cancel: CancellationToken,
) {
    while let Some(job) = queue.claim(&cancel) {
        recorder.begin(&job, worker_id);
        let ctx = JobCtx::new(&job, worker_id, cancel.clone());
        info!("{} 👷 worker {} 领取岗位 {}", ctx, worker_id, job.company_label);

        match AssertUnwindSafe(flow.run(&job, &ctx)).catch_unwind().await {
            Ok(result) => recorder.record(&result, worker_id),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "未知 panic".to_string());
                error!("{} ❌ 流程崩溃: {}", ctx, message);
                let started_at = recorder.started_at(job.index).unwrap_or_else(Local::now);
                let result = ApplicationResult::aborted(&job, ErrorKind::Internal, message, started_at);
                persist(run_recorder.as_ref(), &result).await;
                recorder.record(&result, worker_id);
            }
        }
    }
    info!("worker {} 退出", worker_id);
}

async fn persist(run_recorder: Option<&RunRecorder>, result: &ApplicationResult) {
    let Some(run_recorder) = run_recorder else {
        return;
    };
    if let Err(e) = run_recorder.persist(result).await {
        warn!("[岗位 {}] ⚠️ 写入运行记录失败: {:#}", result.job.index, e);
    }
}

fn log_join_errors(results: Vec<Result<(), tokio::task::JoinError>>) {
    for (i, res) in results.into_iter().enumerate() {
        if let Err(e) = res {
            if !e.is_cancelled() {
                error!("worker {} 执行失败: {}", i + 1, e);
            }
        }
    }
}
