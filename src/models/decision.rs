use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::result::ErrorRecord;

/// 要写入字段的值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FillValue {
    Text(String),
    Flag(bool),
    File(PathBuf),
}

impl FillValue {
    /// 用于日志的简短展示
    pub fn display(&self) -> String {
        match self {
            FillValue::Text(text) => format!("{:?}", text),
            FillValue::Flag(flag) => flag.to_string(),
            FillValue::File(path) => format!("<文件 {}>", path.display()),
        }
    }
}

/// 值的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// 从用户资料直接映射
    Profile,
    /// 模型给出
    Model,
    /// 沿用页面上已有的值
    Default,
    /// 不填
    Skipped,
}

/// 单个字段的填写决策
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillDecision {
    pub field_id: String,
    pub value: Option<FillValue>,
    pub source: DecisionSource,
    pub duration_ms: u64,
    /// 字段级错误（模型调用失败等），不会中断整个流程
    pub error: Option<ErrorRecord>,
}

impl FillDecision {
    pub fn filled(
        field_id: impl Into<String>,
        value: FillValue,
        source: DecisionSource,
        duration_ms: u64,
    ) -> Self {
        Self {
            field_id: field_id.into(),
            value: Some(value),
            source,
            duration_ms,
            error: None,
        }
    }

    pub fn skipped(field_id: impl Into<String>, duration_ms: u64, error: Option<ErrorRecord>) -> Self {
        Self {
            field_id: field_id.into(),
            value: None,
            source: DecisionSource::Skipped,
            duration_ms,
            error,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.source == DecisionSource::Skipped || self.value.is_none()
    }
}
