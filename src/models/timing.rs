use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 一次申请的计时报告
///
/// 封存后不可变；`total_ms` 恒等于各阶段耗时之和。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingReport {
    pub phase_durations: BTreeMap<String, u64>,
    pub field_durations: BTreeMap<String, u64>,
    pub total_ms: u64,
}

/// 字段耗时汇总
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldTimingSummary {
    pub total_fields: usize,
    pub total_ms: u64,
    pub average_ms: f64,
    pub fastest_ms: u64,
    pub slowest_ms: u64,
    pub slowest_field: Option<String>,
}

impl TimingReport {
    pub(crate) fn from_parts(
        phase_durations: BTreeMap<String, u64>,
        field_durations: BTreeMap<String, u64>,
    ) -> Self {
        let total_ms = phase_durations.values().sum();
        Self {
            phase_durations,
            field_durations,
            total_ms,
        }
    }

    pub fn phase(&self, name: &str) -> u64 {
        self.phase_durations.get(name).copied().unwrap_or(0)
    }

    /// 字段耗时的汇总（用来找瓶颈字段）
    pub fn field_summary(&self) -> FieldTimingSummary {
        if self.field_durations.is_empty() {
            return FieldTimingSummary::default();
        }
        let total_ms: u64 = self.field_durations.values().sum();
        let total_fields = self.field_durations.len();
        let (slowest_field, slowest_ms) = self
            .field_durations
            .iter()
            .max_by_key(|(_, ms)| **ms)
            .map(|(id, ms)| (Some(id.clone()), *ms))
            .unwrap_or((None, 0));
        FieldTimingSummary {
            total_fields,
            total_ms,
            average_ms: total_ms as f64 / total_fields as f64,
            fastest_ms: self.field_durations.values().copied().min().unwrap_or(0),
            slowest_ms,
            slowest_field,
        }
    }
}
