//! 浏览器能力接口
//!
//! 流程层只认识这两个 trait：
//! - `BrowserDriver`：为一个岗位打开一个新页面
//! - `PageSession`：对这个页面查询字段、写值、点击、关闭
//!
//! 每个会话只属于一个 worker，不跨 worker 共享。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BrowserError;
use crate::models::{EntryRef, FillValue, ProfileSection};

/// 打开新页面的能力
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// 打开页面并导航到 `url`
    ///
    /// 失败时不会留下打开的页面。
    async fn open(&self, url: &str) -> Result<Box<dyn PageSession>, BrowserError>;
}

/// 单个页面会话
#[async_trait]
pub trait PageSession: Send + Sync {
    /// 当前页面地址（跳转之后的最终地址）
    async fn current_url(&self) -> Result<String, BrowserError>;

    /// 查询当前向导步骤的原始字段
    ///
    /// 找不到表单容器时返回 `None`。
    async fn query_fields(&self, step: usize) -> Result<Option<Vec<RawField>>, BrowserError>;

    /// 向字段写值
    async fn write(&self, field_id: &str, value: &FillValue) -> Result<(), BrowserError>;

    /// 回读字段当前渲染出的值（文件字段返回附件名）
    async fn read_value(&self, field_id: &str) -> Result<Option<String>, BrowserError>;

    /// 点击页面上的操作按钮，按钮不存在时返回 `false`
    async fn click(&self, action: PageAction) -> Result<bool, BrowserError>;

    /// 检查页面状态（登录墙、错误提示、下一步 / 提交按钮、提交确认）
    async fn inspect(&self) -> Result<PageSnapshot, BrowserError>;

    /// 关闭页面
    async fn close(&self) -> Result<(), BrowserError>;
}

/// 页面上的操作按钮
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageAction {
    /// 岗位详情页的 "Apply"
    StartApplication,
    /// "Apply Manually"
    ApplyManually,
    /// 向导的 "Next" / "Save and Continue"
    NextStep,
    /// 最终提交
    Submit,
    /// 经历 / 教育段落的 "Add" / "Add Another"
    AddEntry(ProfileSection),
}

/// 页面状态快照
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageSnapshot {
    pub url: String,
    /// 是否出现登录 / 注册表单
    pub auth_wall: bool,
    /// 页面错误提示的文字
    pub error_banner: Option<String>,
    /// 是否有 "下一步" 按钮
    pub next_step: bool,
    /// 是否有最终提交按钮
    pub final_submit: bool,
    /// 是否出现提交成功的确认
    pub confirmation: bool,
    /// 带有 "Add" 按钮的资料段
    pub add_sections: Vec<ProfileSection>,
}

/// 页面脚本返回的原始字段
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawField {
    /// 页面上的稳定标识（DOM id、单选组名或唯一的 name），没有时为空
    pub key: Option<String>,
    /// 在表单容器内的位置
    pub position: usize,
    /// 表单容器内第几个带同样标签的元素（从 0 开始）
    pub label_index: usize,
    /// 所在的经历 / 教育面板
    pub entry: Option<EntryRef>,
    pub tag: String,
    pub input_type: Option<String>,
    pub role: Option<String>,
    pub label: Option<String>,
    pub required: bool,
    /// `aria-haspopup="listbox"` 的按钮（Workday 的下拉框）
    pub listbox: bool,
    pub options: Vec<String>,
    pub accept: Option<String>,
    pub value: Option<String>,
    pub hidden: bool,
}
