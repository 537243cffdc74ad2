//! 批量统计
//!
//! 多个 worker 并发上报，统一在锁内追加，不会丢更新。

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::ErrorKind;
use crate::models::{ApplicationResult, ApplicationStatus, JobTarget};

/// 单个岗位的结果摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub index: usize,
    pub company_label: String,
    pub url: String,
    pub worker_id: usize,
    pub status: ApplicationStatus,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
    pub submitted: bool,
    pub fields_extracted: usize,
    pub fields_filled: usize,
    pub total_ms: u64,
}

impl JobSummary {
    pub fn from_result(result: &ApplicationResult, worker_id: usize) -> Self {
        Self {
            index: result.job.index,
            company_label: result.job.company_label.clone(),
            url: result.job.url.clone(),
            worker_id,
            status: result.status,
            error_kind: result.error_kind(),
            error_message: result.error.as_ref().map(|e| e.message.clone()),
            submitted: result.submitted,
            fields_extracted: result.extracted.len(),
            fields_filled: result.filled.iter().filter(|d| !d.is_skipped()).count(),
            total_ms: result.timing.total_ms,
        }
    }
}

/// 批量统计
///
/// `attempted = succeeded + partial + failed + skipped + cancelled`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_jobs: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub partial: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: usize,
    /// 实际点击提交并得到确认的数量（含 partial）
    pub submitted: usize,
    /// 领取顺序（岗位序号）
    pub claim_order: Vec<usize>,
    /// 按完成顺序排列
    pub results: Vec<JobSummary>,
    pub interrupted: bool,
}

impl BatchStats {
    /// 成功提交率（success + partial 中已提交的）
    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.submitted as f64 / self.attempted as f64
        }
    }

    fn push(&mut self, summary: JobSummary) {
        self.attempted += 1;
        match (summary.status, summary.error_kind) {
            (_, Some(ErrorKind::Cancelled)) => self.cancelled += 1,
            (ApplicationStatus::Success, _) => self.succeeded += 1,
            (ApplicationStatus::Partial, _) => self.partial += 1,
            (ApplicationStatus::Failed, _) => self.failed += 1,
            (ApplicationStatus::SkippedAuth, _) => self.skipped += 1,
        }
        if summary.submitted {
            self.submitted += 1;
        }
        self.results.push(summary);
    }

    pub fn summary_for(&self, index: usize) -> Option<&JobSummary> {
        self.results.iter().find(|s| s.index == index)
    }
}

#[derive(Debug)]
struct InFlight {
    job: JobTarget,
    worker_id: usize,
    started: DateTime<Local>,
}

#[derive(Debug, Default)]
struct RecorderInner {
    stats: BatchStats,
    in_flight: BTreeMap<usize, InFlight>,
}

/// 统计记录器（worker 共享）
#[derive(Debug, Default)]
pub struct StatsRecorder {
    inner: Mutex<RecorderInner>,
}

impl StatsRecorder {
    pub fn new(total_jobs: usize) -> Self {
        Self {
            inner: Mutex::new(RecorderInner {
                stats: BatchStats {
                    total_jobs,
                    ..BatchStats::default()
                },
                in_flight: BTreeMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RecorderInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 岗位开始处理
    pub fn begin(&self, job: &JobTarget, worker_id: usize) {
        self.lock().in_flight.insert(
            job.index,
            InFlight {
                job: job.clone(),
                worker_id,
                started: Local::now(),
            },
        );
    }

    /// 上报一个完成的岗位
    pub fn record(&self, result: &ApplicationResult, worker_id: usize) {
        let mut inner = self.lock();
        inner.in_flight.remove(&result.job.index);
        inner.stats.push(JobSummary::from_result(result, worker_id));
    }

    /// 岗位开始处理的时间
    pub fn started_at(&self, index: usize) -> Option<DateTime<Local>> {
        self.lock().in_flight.get(&index).map(|f| f.started)
    }

    pub fn in_flight(&self) -> usize {
        self.lock().in_flight.len()
    }

    /// 把仍在进行中的岗位记为中止，返回补出来的结果（调用方负责落盘）
    pub fn abort_in_flight(&self) -> Vec<ApplicationResult> {
        let mut inner = self.lock();
        let pending = std::mem::take(&mut inner.in_flight);
        let mut aborted = Vec::with_capacity(pending.len());
        for (_, flight) in pending {
            let elapsed = (Local::now() - flight.started).num_seconds();
            let result = ApplicationResult::aborted(
                &flight.job,
                ErrorKind::Cancelled,
                format!("宽限期结束仍未完成，已强制中止（运行 {}s）", elapsed),
                flight.started,
            );
            inner.stats.push(JobSummary::from_result(&result, flight.worker_id));
            aborted.push(result);
        }
        aborted
    }

    pub fn snapshot(&self) -> BatchStats {
        self.lock().stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ErrorRecord, PipelineState, TimingReport};

    fn result(index: usize, status: ApplicationStatus, kind: Option<ErrorKind>, submitted: bool) -> ApplicationResult {
        let now = Local::now();
        ApplicationResult {
            job: JobTarget::new(index, "https://x", format!("c{}", index)),
            status,
            extracted: vec![],
            filled: vec![],
            outcomes: vec![],
            error: kind.map(|k| ErrorRecord::new(k, "x")),
            timing: TimingReport::default(),
            states: vec![],
            submitted,
            wizard_steps: 0,
            started_at: now,
            ended_at: now,
        }
    }

    #[test]
    fn test_counts_by_status() {
        let recorder = StatsRecorder::new(5);
        recorder.record(&result(1, ApplicationStatus::Success, None, true), 1);
        recorder.record(&result(2, ApplicationStatus::Partial, Some(ErrorKind::ModelCallFailed), true), 2);
        recorder.record(&result(3, ApplicationStatus::Failed, Some(ErrorKind::SubmitUnconfirmed), false), 1);
        recorder.record(&result(4, ApplicationStatus::SkippedAuth, Some(ErrorKind::AuthRedirect), false), 2);
        recorder.record(&result(5, ApplicationStatus::Failed, Some(ErrorKind::Cancelled), false), 1);

        let stats = recorder.snapshot();
        assert_eq!(stats.attempted, 5);
        assert_eq!(
            (stats.succeeded, stats.partial, stats.failed, stats.skipped, stats.cancelled),
            (1, 1, 1, 1, 1)
        );
        assert_eq!(stats.submitted, 2);
        assert!((stats.success_rate() - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn test_abort_in_flight() {
        let recorder = StatsRecorder::new(3);
        let job1 = JobTarget::new(1, "https://x/1", "a");
        let job2 = JobTarget::new(2, "https://x/2", "b");
        recorder.begin(&job1, 1);
        recorder.begin(&job2, 2);
        recorder.record(&result(1, ApplicationStatus::Success, None, true), 1);
        assert_eq!(recorder.in_flight(), 1);

        let aborted = recorder.abort_in_flight();
        assert_eq!(aborted.len(), 1);
        assert_eq!(aborted[0].job.index, 2);
        assert_eq!(aborted[0].status, ApplicationStatus::Failed);
        assert_eq!(aborted[0].states, vec![PipelineState::Failed]);
        assert!(!aborted[0].submitted);

        let stats = recorder.snapshot();
        assert_eq!(stats.attempted, 2);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.summary_for(2).map(|s| s.worker_id), Some(2));
        assert_eq!(stats.summary_for(2).and_then(|s| s.error_kind), Some(ErrorKind::Cancelled));
        assert!(recorder.abort_in_flight().is_empty());
    }

    #[test]
    fn test_empty_success_rate() {
        assert_eq!(BatchStats::default().success_rate(), 0.0);
    }
}
