pub mod field_extractor;
pub mod fill_planner;
pub mod form_filler;
pub mod llm_service;
pub mod run_recorder;

pub use field_extractor::FieldExtractor;
pub use fill_planner::FillPlanner;
pub use form_filler::{FormFiller, StepAdvance};
pub use llm_service::{FieldAdvisor, LlmService};
pub use run_recorder::RunRecorder;
