//! 表单字段描述
//!
//! 字段类型是封闭的枚举，每种类型带自己的附加数据（下拉 / 单选带选项，
//! 文件上传带可接受的扩展名），规划和填写两侧都按类型穷举处理。

use serde::{Deserialize, Serialize};

use crate::models::decision::FillValue;
use crate::models::profile::EntryRef;

/// 字段类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Textarea,
    Select { options: Vec<String> },
    Radio { options: Vec<String> },
    Checkbox,
    File { accept: Vec<String> },
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Textarea => "textarea",
            FieldKind::Select { .. } => "select",
            FieldKind::Radio { .. } => "radio",
            FieldKind::Checkbox => "checkbox",
            FieldKind::File { .. } => "file",
        }
    }
}

/// 从页面上提取出的一个可填写字段
///
/// `id` 在同一次页面渲染内稳定，用来和 `FillDecision` 对应。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub id: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    pub required: bool,
    pub current_value: Option<String>,
    /// 位于经历 / 教育面板里时，指向对应的资料条目
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<EntryRef>,
}

impl FieldDescriptor {
    /// 下拉 / 单选的选项，其它类型为空
    pub fn options(&self) -> &[String] {
        match &self.kind {
            FieldKind::Select { options } | FieldKind::Radio { options } => options,
            _ => &[],
        }
    }

    /// 检查一个候选值是否满足本字段的类型和选项约束
    ///
    /// 满足时返回规范化后的值（例如选项按页面上的原始拼写返回），否则返回 `None`。
    pub fn conform(&self, value: FillValue) -> Option<FillValue> {
        match &self.kind {
            FieldKind::Text | FieldKind::Textarea => match value {
                FillValue::Text(text) => {
                    let text = text.trim();
                    (!text.is_empty()).then(|| FillValue::Text(text.to_string()))
                }
                FillValue::Flag(flag) => Some(FillValue::Text(yes_no(flag).to_string())),
                FillValue::File(_) => None,
            },
            FieldKind::Select { options } | FieldKind::Radio { options } => {
                let wanted = match value {
                    FillValue::Text(text) => text,
                    FillValue::Flag(flag) => yes_no(flag).to_string(),
                    FillValue::File(_) => return None,
                };
                if options.is_empty() {
                    // 选项读不到时只能原样信任
                    let wanted = wanted.trim();
                    return (!wanted.is_empty()).then(|| FillValue::Text(wanted.to_string()));
                }
                match_option(options, &wanted).map(|opt| FillValue::Text(opt.to_string()))
            }
            FieldKind::Checkbox => match value {
                FillValue::Flag(flag) => Some(FillValue::Flag(flag)),
                FillValue::Text(text) => parse_flag(&text).map(FillValue::Flag),
                FillValue::File(_) => None,
            },
            FieldKind::File { accept } => match value {
                FillValue::File(path) => {
                    let ext = path
                        .extension()
                        .and_then(|e| e.to_str())
                        .map(|e| e.to_ascii_lowercase());
                    let accepted = accept.is_empty()
                        || ext.is_some_and(|ext| {
                            accept
                                .iter()
                                .any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(&ext))
                        });
                    accepted.then_some(FillValue::File(path))
                }
                _ => None,
            },
        }
    }

    /// 写入后回读校验
    pub fn verify(&self, value: &FillValue, rendered: Option<&str>) -> Result<(), String> {
        let rendered_text = rendered.map(str::trim).unwrap_or_default();
        let ok = match (&self.kind, value) {
            (FieldKind::File { .. }, _) => !rendered_text.is_empty(),
            (FieldKind::Checkbox, FillValue::Flag(flag)) => parse_flag(rendered_text) == Some(*flag),
            (_, FillValue::Text(text)) => normalize(rendered_text) == normalize(text),
            (_, FillValue::Flag(flag)) => normalize(rendered_text) == normalize(yes_no(*flag)),
            (_, FillValue::File(_)) => false,
        };
        if ok {
            Ok(())
        } else {
            Err(format!(
                "期望 {}, 页面上为 {:?}",
                value.display(),
                rendered.unwrap_or("<空>")
            ))
        }
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// 解析布尔类的文本
pub fn parse_flag(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "checked" | "on" | "1" | "y" => Some(true),
        "no" | "false" | "unchecked" | "off" | "0" | "n" => Some(false),
        _ => None,
    }
}

/// 小写并压缩空白，用于宽松比较
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// "Select One" 之类的占位选项
pub fn is_placeholder_option(option: &str) -> bool {
    matches!(
        normalize(option).as_str(),
        "select one" | "select" | "please select" | "choose one" | "--" | ""
    )
}

/// 在选项中找到与候选值对应的一项
///
/// 先做忽略大小写的精确匹配，再做唯一的包含匹配（例如 "BS" 对 "BS - Bachelor of Science"）。
pub fn match_option<'a>(options: &'a [String], wanted: &str) -> Option<&'a str> {
    let wanted = normalize(wanted);
    if wanted.is_empty() {
        return None;
    }
    let real: Vec<&String> = options.iter().filter(|o| !is_placeholder_option(o)).collect();

    if let Some(exact) = real.iter().find(|o| normalize(o) == wanted) {
        return Some(exact.as_str());
    }

    let partial: Vec<&&String> = real
        .iter()
        .filter(|o| {
            let o = normalize(o);
            o.contains(&wanted) || wanted.contains(&o)
        })
        .collect();
    match partial.as_slice() {
        [only] => Some(only.as_str()),
        _ => None,
    }
}
