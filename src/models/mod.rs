//! 数据模型
//!
//! 岗位、用户资料、字段描述、填写决策、单次申请结果、计时报告

pub mod decision;
pub mod field;
pub mod job;
pub mod loaders;
pub mod profile;
pub mod result;
pub mod timing;

pub use decision::{DecisionSource, FillDecision, FillValue};
pub use field::{FieldDescriptor, FieldKind};
pub use job::JobTarget;
pub use loaders::{load_jobs, load_profile, select_range};
pub use profile::{EntryRef, ProfileContext, ProfileKey, ProfileSection, UserProfile};
pub use result::{ApplicationResult, ApplicationStatus, ErrorRecord, FillOutcome, PipelineState};
pub use timing::{FieldTimingSummary, TimingReport};
