//! # Workday Apply
//!
//! 批量投递 Workday 岗位申请的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Browser、Page），只暴露能力
//! - `BrowserDriver` / `PageSession` - 浏览器能力接口
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个页面 / 单个字段
//! - `FieldExtractor` - 提取表单字段
//! - `FillPlanner` - 决定每个字段填什么
//! - `FormFiller` - 写值、校验、翻页
//! - `LlmService` - 模型给值能力
//! - `RunRecorder` - 写运行记录
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个岗位"的完整申请流程
//! - `JobCtx` - 上下文封装（岗位序号 + worker + 取消信号）
//! - `ApplicationFlow` - 状态机（加载 → 提取 → 规划 → 填写 → 提交）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 应用入口，管理浏览器和中断
//! - `orchestrator/batch_runner` - 有界并发的 worker 池
//!
//! ## 模块结构

pub mod browser;
pub mod cli;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{ErrorKind, Result};
pub use infrastructure::{BrowserDriver, JsExecutor, PageSession};
pub use models::{ApplicationResult, ApplicationStatus, JobTarget, UserProfile};
pub use orchestrator::{App, BatchRunner, BatchStats};
pub use workflow::{ApplicationFlow, JobCtx};
