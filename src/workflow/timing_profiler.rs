//! 计时器
//!
//! 按阶段和字段累计耗时，流程结束时封存成 `TimingReport`。
//! 封存之后的记录一律忽略，重复封存返回同一份报告。

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;
use tracing::debug;

use crate::models::TimingReport;

#[derive(Debug, Default)]
struct Inner {
    phases: BTreeMap<String, u64>,
    fields: BTreeMap<String, u64>,
    sealed: Option<TimingReport>,
}

/// 单次申请的计时器
#[derive(Debug, Default)]
pub struct TimingProfiler {
    inner: Mutex<Inner>,
}

impl TimingProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // 计时数据没有跨字段的约束，锁中毒时继续用里面的数据
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 开始计时一个阶段，返回的计时器在离开作用域时记录耗时
    pub fn mark(&self, phase: impl Into<String>) -> PhaseTimer<'_> {
        PhaseTimer {
            profiler: self,
            phase: phase.into(),
            started: Instant::now(),
        }
    }

    /// 累加阶段耗时（同名阶段会累加，例如多个向导步骤）
    pub fn record_phase(&self, phase: &str, duration_ms: u64) {
        let mut inner = self.lock();
        if inner.sealed.is_some() {
            debug!("计时已封存，忽略阶段 {}", phase);
            return;
        }
        *inner.phases.entry(phase.to_string()).or_insert(0) += duration_ms;
    }

    /// 累加字段耗时，同一 id 重复出现时求和
    pub fn record_field(&self, field_id: &str, duration_ms: u64) {
        let mut inner = self.lock();
        if inner.sealed.is_some() {
            debug!("计时已封存，忽略字段 {}", field_id);
            return;
        }
        *inner.fields.entry(field_id.to_string()).or_insert(0) += duration_ms;
    }

    /// 封存并返回报告
    pub fn seal(&self) -> TimingReport {
        let mut inner = self.lock();
        if let Some(report) = &inner.sealed {
            return report.clone();
        }
        let report = TimingReport::from_parts(
            std::mem::take(&mut inner.phases),
            std::mem::take(&mut inner.fields),
        );
        inner.sealed = Some(report.clone());
        report
    }

    pub fn is_sealed(&self) -> bool {
        self.lock().sealed.is_some()
    }
}

/// 阶段计时器
///
/// `Drop` 时把耗时记入所属的 `TimingProfiler`。
#[must_use = "计时器离开作用域时才会记录耗时"]
pub struct PhaseTimer<'a> {
    profiler: &'a TimingProfiler,
    phase: String,
    started: Instant,
}

impl PhaseTimer<'_> {
    pub fn phase(&self) -> &str {
        &self.phase
    }

    /// 提前结束计时
    pub fn finish(self) {}
}

impl Drop for PhaseTimer<'_> {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed().as_millis() as u64;
        self.profiler.record_phase(&self.phase, elapsed);
    }
}
