//! 错误类型
//!
//! 分三层：
//! - `BrowserError` / `LlmError`：能力层（浏览器、模型）返回的原始错误
//! - `FlowError`：流程层的页面级终止原因，每个都对应一个 `ErrorKind`
//! - `ErrorKind`：落盘到 ApplicationResult 里的错误分类
//!
//! 单个字段的错误（`ModelCallFailed` / `VerificationMismatch`）不会以 `FlowError`
//! 的形式出现，它们被记录在字段的决策或写入结果里。

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::models::ErrorRecord;

/// 错误分类（写入结果文件）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// 页面加载超时（重试次数用尽）
    NavigationTimeout,
    /// 跳转到了登录 / 注册页
    AuthRedirect,
    /// 找不到预期的表单，或向导步数超限
    StructuralMismatch,
    /// 单个字段的模型调用失败（非致命）
    ModelCallFailed,
    /// 单个字段写入后回读不一致（非致命）
    VerificationMismatch,
    /// 提交后在限定时间内没有看到确认
    SubmitUnconfirmed,
    /// 操作员中断
    Cancelled,
    /// 必填字段没有可用的值
    RequiredFieldUnfilled,
    /// 页面出现错误提示，或浏览器会话本身出错
    PageError,
    /// 单个岗位的总耗时超限
    JobTimeout,
    /// 流程内部崩溃
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NavigationTimeout => "NavigationTimeout",
            ErrorKind::AuthRedirect => "AuthRedirect",
            ErrorKind::StructuralMismatch => "StructuralMismatch",
            ErrorKind::ModelCallFailed => "ModelCallFailed",
            ErrorKind::VerificationMismatch => "VerificationMismatch",
            ErrorKind::SubmitUnconfirmed => "SubmitUnconfirmed",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::RequiredFieldUnfilled => "RequiredFieldUnfilled",
            ErrorKind::PageError => "PageError",
            ErrorKind::JobTimeout => "JobTimeout",
            ErrorKind::Internal => "Internal",
        };
        f.write_str(name)
    }
}

/// 浏览器能力错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 启动或连接浏览器失败
    #[error("浏览器启动失败: {0}")]
    Launch(String),
    /// 页面加载超时
    #[error("加载 {url} 超时 ({secs}s)")]
    NavigationTimeout { url: String, secs: u64 },
    /// 导航失败
    #[error("导航到 {url} 失败: {message}")]
    Navigation { url: String, message: String },
    /// 执行脚本失败
    #[error("执行脚本失败: {0}")]
    Script(String),
    /// 找不到元素
    #[error("找不到元素: {0}")]
    ElementNotFound(String),
    /// 页面已关闭
    #[error("页面已关闭")]
    Closed,
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        BrowserError::Script(err.to_string())
    }
}

impl From<serde_json::Error> for BrowserError {
    fn from(err: serde_json::Error) -> Self {
        BrowserError::Script(format!("脚本返回值解析失败: {}", err))
    }
}

/// 语言模型能力错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// 调用超时
    #[error("LLM 调用超时 ({secs}s)")]
    Timeout { secs: u64 },
    /// API 调用失败
    #[error("LLM API 调用失败 (模型: {model}): {message}")]
    Api { model: String, message: String },
    /// 返回内容为空
    #[error("LLM 返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 返回内容无法解析
    #[error("LLM 返回内容无法解析: {0}")]
    Malformed(String),
}

/// 流程层的页面级错误，会终止当前岗位
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("页面加载超时: {0}")]
    NavigationTimeout(String),
    #[error("跳转到登录页: {0}")]
    AuthRedirect(String),
    #[error("页面结构不符: {0}")]
    StructuralMismatch(String),
    #[error("页面错误: {0}")]
    Page(String),
    #[error("提交未确认: {0}")]
    SubmitUnconfirmed(String),
    #[error("必填字段不完整: {}", .0.message)]
    RequiredIncomplete(ErrorRecord),
    #[error("已取消")]
    Cancelled,
    #[error("超过单个岗位时限 ({0}s)")]
    JobTimeout(u64),
}

impl FlowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FlowError::NavigationTimeout(_) => ErrorKind::NavigationTimeout,
            FlowError::AuthRedirect(_) => ErrorKind::AuthRedirect,
            FlowError::StructuralMismatch(_) => ErrorKind::StructuralMismatch,
            FlowError::Page(_) => ErrorKind::PageError,
            FlowError::SubmitUnconfirmed(_) => ErrorKind::SubmitUnconfirmed,
            FlowError::RequiredIncomplete(record) => record.kind,
            FlowError::Cancelled => ErrorKind::Cancelled,
            FlowError::JobTimeout(_) => ErrorKind::JobTimeout,
        }
    }

    /// 转为可落盘的错误记录
    pub fn to_record(&self) -> ErrorRecord {
        match self {
            FlowError::RequiredIncomplete(record) => record.clone(),
            other => ErrorRecord::new(other.kind(), other.to_string()),
        }
    }
}

impl From<BrowserError> for FlowError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::NavigationTimeout { .. } => FlowError::NavigationTimeout(err.to_string()),
            other => FlowError::Page(other.to_string()),
        }
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置文件解析失败
    #[error("配置文件 {path} 解析失败: {message}")]
    FileParseFailed { path: String, message: String },
    /// 配置值非法
    #[error("配置项 {field} 非法: {message}")]
    Invalid { field: String, message: String },
}

/// 应用程序结果类型
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_timeout_maps_to_navigation_timeout() {
        let err: FlowError = BrowserError::NavigationTimeout {
            url: "https://example.com".to_string(),
            secs: 30,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::NavigationTimeout);

        let err: FlowError = BrowserError::Closed.into();
        assert_eq!(err.kind(), ErrorKind::PageError);
    }

    #[test]
    fn test_required_incomplete_keeps_field_kind() {
        let record = ErrorRecord::for_field(ErrorKind::ModelCallFailed, "email", "timeout");
        let err = FlowError::RequiredIncomplete(record);
        assert_eq!(err.kind(), ErrorKind::ModelCallFailed);
        assert_eq!(err.to_record().field_id.as_deref(), Some("email"));
    }
}
