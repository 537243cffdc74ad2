use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::models::{FieldDescriptor, FillDecision, JobTarget, TimingReport};

/// 申请结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Success,
    Partial,
    Failed,
    SkippedAuth,
}

/// 流程状态机的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Init,
    LoadPage,
    ExtractFields,
    PlanFills,
    ApplyFills,
    Submit,
    Done,
    Failed,
    SkippedAuth,
}

impl PipelineState {
    /// 计时报告里的阶段名
    pub fn phase_name(self) -> &'static str {
        match self {
            PipelineState::Init => "init",
            PipelineState::LoadPage => "load_page",
            PipelineState::ExtractFields => "extract_fields",
            PipelineState::PlanFills => "plan_fills",
            PipelineState::ApplyFills => "apply_fills",
            PipelineState::Submit => "submit",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
            PipelineState::SkippedAuth => "skipped_auth",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineState::Done | PipelineState::Failed | PipelineState::SkippedAuth
        )
    }
}

/// 错误记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub message: String,
    /// 字段级错误对应的字段
    pub field_id: Option<String>,
}

impl ErrorRecord {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            field_id: None,
        }
    }

    pub fn for_field(kind: ErrorKind, field_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            field_id: Some(field_id.into()),
        }
    }
}

/// 单个字段的写入结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillOutcome {
    pub field_id: String,
    pub applied: bool,
    pub verification_error: Option<String>,
}

impl FillOutcome {
    pub fn verified(&self) -> bool {
        self.applied && self.verification_error.is_none()
    }
}

/// 一次申请的完整结果
///
/// 由流程独占，在终止时写盘一次，之后不再修改。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationResult {
    pub job: JobTarget,
    pub status: ApplicationStatus,
    pub extracted: Vec<FieldDescriptor>,
    pub filled: Vec<FillDecision>,
    pub outcomes: Vec<FillOutcome>,
    pub error: Option<ErrorRecord>,
    pub timing: TimingReport,
    /// 经过的状态（含终止状态）
    pub states: Vec<PipelineState>,
    /// 是否点击了最终提交并得到确认
    pub submitted: bool,
    pub wizard_steps: usize,
    pub started_at: DateTime<Local>,
    pub ended_at: DateTime<Local>,
}

impl ApplicationResult {
    /// 流程没有正常返回（被强制中止或崩溃）时补一个失败结果
    pub fn aborted(job: &JobTarget, kind: ErrorKind, message: impl Into<String>, started_at: DateTime<Local>) -> Self {
        Self {
            job: job.clone(),
            status: ApplicationStatus::Failed,
            extracted: Vec::new(),
            filled: Vec::new(),
            outcomes: Vec::new(),
            error: Some(ErrorRecord::new(kind, message)),
            timing: TimingReport::default(),
            states: vec![PipelineState::Failed],
            submitted: false,
            wizard_steps: 0,
            started_at,
            ended_at: Local::now(),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    pub fn decision_for(&self, field_id: &str) -> Option<&FillDecision> {
        self.filled.iter().find(|d| d.field_id == field_id)
    }

    pub fn outcome_for(&self, field_id: &str) -> Option<&FillOutcome> {
        self.outcomes.iter().find(|o| o.field_id == field_id)
    }
}
