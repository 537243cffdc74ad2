//! 字段提取 - 业务能力层
//!
//! 把页面脚本返回的原始字段整理成 `FieldDescriptor`：
//! 归类字段类型、清理标签、分配稳定 id、去掉 Workday 下拉框重复出现的标签。
//! 只读页面，不修改页面。

use std::collections::HashSet;
use tracing::debug;

use crate::error::BrowserError;
use crate::infrastructure::{PageSession, RawField};
use crate::models::field::normalize;
use crate::models::{FieldDescriptor, FieldKind};

const POSITIONAL_PREFIX: &str = "step";

/// 连标签都没有的字段按 "步骤 + 位置" 编号，跨步骤不会重复
pub fn positional_id(step: usize, position: usize) -> String {
    format!("{}{}-pos{}", POSITIONAL_PREFIX, step, position)
}

/// 没有 DOM id 的字段用 "标签 + 同名标签序号" 锚定
///
/// 页面在前面插入别的字段时不会变，页面脚本按同样规则反查元素。
pub fn anchored_id(step: usize, label_index: usize, raw_label: &str) -> String {
    format!("{}{}-label{}:{}", POSITIONAL_PREFIX, step, label_index, raw_label)
}

/// 字段提取器
#[derive(Debug, Default, Clone)]
pub struct FieldExtractor;

impl FieldExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 提取当前向导步骤的字段
    ///
    /// 找不到表单容器时返回空列表，是否终止由流程决定。
    pub async fn extract(
        &self,
        session: &dyn PageSession,
        step: usize,
    ) -> Result<Vec<FieldDescriptor>, BrowserError> {
        match session.query_fields(step).await? {
            Some(raw) => Ok(self.describe(raw, step)),
            None => {
                debug!("第 {} 步没有找到表单容器", step);
                Ok(Vec::new())
            }
        }
    }

    /// 原始字段 -> 字段描述，保持页面顺序
    pub fn describe(&self, raw: Vec<RawField>, step: usize) -> Vec<FieldDescriptor> {
        let mut fields = Vec::with_capacity(raw.len());
        let mut seen_ids = HashSet::new();
        let mut previous: Option<(String, bool)> = None;

        for el in raw {
            if el.hidden {
                continue;
            }
            let Some(kind) = classify(&el) else {
                continue;
            };

            let raw_label = el.label.clone().unwrap_or_default();
            let label = clean_label(&raw_label);
            let is_listbox = el.listbox;

            // Workday 下拉框的按钮和它后面的隐藏输入框共用一个标签
            let normalized = normalize(&label);
            if let Some((prev_label, prev_listbox)) = &previous {
                if *prev_listbox && *prev_label == normalized {
                    debug!("跳过重复标签 '{}'（前一个字段是下拉框）", label);
                    continue;
                }
            }
            previous = Some((normalized, is_listbox));

            let id = match el.key.as_deref().filter(|k| !k.trim().is_empty()) {
                Some(key) => key.to_string(),
                None if !raw_label.trim().is_empty() => anchored_id(step, el.label_index, &raw_label),
                None => positional_id(step, el.position),
            };
            if !seen_ids.insert(id.clone()) {
                debug!("字段 id 重复，跳过: {}", id);
                continue;
            }

            fields.push(FieldDescriptor {
                id,
                label,
                kind,
                required: el.required || raw_label.contains('*'),
                current_value: el.value.filter(|v| !v.trim().is_empty()),
                entry: el.entry,
            });
        }

        fields
    }
}

/// 判断字段类型，不可填写的元素（普通按钮、隐藏输入、密码框）返回 `None`
fn classify(el: &RawField) -> Option<FieldKind> {
    let tag = el.tag.to_ascii_lowercase();
    let input_type = el
        .input_type
        .as_deref()
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match tag.as_str() {
        "textarea" => Some(FieldKind::Textarea),
        "select" => Some(FieldKind::Select {
            options: el.options.clone(),
        }),
        "button" if el.listbox => Some(FieldKind::Select {
            options: el.options.clone(),
        }),
        "button" => None,
        "input" => match input_type.as_str() {
            "radio" => Some(FieldKind::Radio {
                options: el.options.clone(),
            }),
            "checkbox" => Some(FieldKind::Checkbox),
            "file" => Some(FieldKind::File {
                accept: el
                    .accept
                    .as_deref()
                    .unwrap_or_default()
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            }),
            "hidden" | "submit" | "button" | "reset" | "image" | "password" => None,
            _ => Some(FieldKind::Text),
        },
        _ => None,
    }
}

/// 去掉必填星号、压缩空白，空标签记为 "Unknown"
pub fn clean_label(raw: &str) -> String {
    let cleaned = raw
        .replace('*', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if cleaned.is_empty() {
        "Unknown".to_string()
    } else {
        cleaned
    }
}
