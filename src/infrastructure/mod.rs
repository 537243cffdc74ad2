//! 基础设施层（Infrastructure Layer）
//!
//! 持有稀缺资源（Browser、Page），只向上暴露能力：
//! - `BrowserDriver` / `PageSession`：流程层使用的浏览器能力接口
//! - `ChromiumDriver`：基于 chromiumoxide 的实现
//! - `JsExecutor`：唯一的 page owner，提供 eval() 能力

pub mod browser;
pub mod chromium;
pub mod dom_scripts;
pub mod js_executor;

pub use browser::{BrowserDriver, PageAction, PageSession, PageSnapshot, RawField};
pub use chromium::{ChromiumDriver, ChromiumSession};
pub use js_executor::JsExecutor;
