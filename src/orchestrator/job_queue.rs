//! 岗位队列
//!
//! 按列表顺序原子地"领取下一个"，同一岗位不会被两个 worker 领到。

use std::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

use crate::models::JobTarget;

#[derive(Debug, Default)]
struct QueueInner {
    jobs: Vec<JobTarget>,
    next: usize,
    closed: bool,
    /// 已领取的岗位序号，按领取顺序
    claimed: Vec<usize>,
}

#[derive(Debug)]
pub struct JobQueue {
    inner: Mutex<QueueInner>,
}

impl JobQueue {
    pub fn new(jobs: Vec<JobTarget>) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                jobs,
                ..QueueInner::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 领取下一个岗位
    ///
    /// 队列已关闭、已取消或已取完时返回 `None`。
    pub fn claim(&self, cancel: &CancellationToken) -> Option<JobTarget> {
        let mut inner = self.lock();
        if inner.closed || cancel.is_cancelled() {
            return None;
        }
        let job = inner.jobs.get(inner.next).cloned()?;
        inner.next += 1;
        inner.claimed.push(job.index);
        Some(job)
    }

    /// 停止派发，返回未被领取的岗位数
    pub fn close(&self) -> usize {
        let mut inner = self.lock();
        inner.closed = true;
        inner.jobs.len() - inner.next
    }

    /// 领取顺序（岗位序号）
    pub fn claim_order(&self) -> Vec<usize> {
        self.lock().claimed.clone()
    }
}
