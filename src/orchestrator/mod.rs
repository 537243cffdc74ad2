//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 管理应用生命周期（初始化、运行、清理）
//! - 唯一持有浏览器的模块
//! - 处理 Ctrl+C
//!
//! ### `batch_runner` - 批量运行器
//! - 固定大小的 worker 池，按顺序领取岗位
//! - 中断后的宽限期和强制中止
//!
//! ### `job_queue` / `stats`
//! - 两个被多个 worker 共享的资源，各自用锁保护
//!
//! ## 层次关系
//!
//! ```text
//! app (加载输入、持有浏览器)
//!     ↓
//! batch_runner (处理 Vec<JobTarget>)
//!     ↓
//! workflow::ApplicationFlow (处理单个 JobTarget)
//!     ↓
//! services (能力层：extract / plan / fill / llm / record)
//!     ↓
//! infrastructure (基础设施：BrowserDriver / JsExecutor)
//! ```

pub mod app;
pub mod batch_runner;
pub mod job_queue;
pub mod stats;

// 重新导出主要类型
pub use app::App;
pub use batch_runner::BatchRunner;
pub use job_queue::JobQueue;
pub use stats::{BatchStats, JobSummary, StatsRecorder};
