//! 岗位处理上下文
//!
//! 封装"我正在处理第几个岗位、在哪个 worker 上"这一信息

use std::fmt::Display;
use tokio_util::sync::CancellationToken;

use crate::models::JobTarget;

/// 岗位处理上下文
#[derive(Debug, Clone)]
pub struct JobCtx {
    /// 岗位序号（从 1 开始，仅用于日志显示）
    pub job_index: usize,

    /// 处理这个岗位的 worker
    pub worker_id: usize,

    pub company_label: String,

    /// 批量级取消信号
    pub cancel: CancellationToken,
}

impl JobCtx {
    /// 创建新的岗位上下文
    pub fn new(job: &JobTarget, worker_id: usize, cancel: CancellationToken) -> Self {
        Self {
            job_index: job.index,
            worker_id,
            company_label: job.company_label.clone(),
            cancel,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Display for JobCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[岗位 {}]", self.job_index)
    }
}
