pub mod application_flow;
pub mod job_ctx;
pub mod retry;
pub mod timing_profiler;

pub use application_flow::{ApplicationFlow, FlowSettings};
pub use job_ctx::JobCtx;
pub use retry::RetryPolicy;
pub use timing_profiler::{PhaseTimer, TimingProfiler};
