//! LLM 服务 - 业务能力层
//!
//! 只负责"给一个字段出一个值"的能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::LlmError;
use crate::models::{FieldDescriptor, ProfileContext};
use crate::utils::logging::truncate_text;

/// 语言模型能力
///
/// 返回 `Ok(None)` 表示模型认为不应该填（SKIP）。
#[async_trait]
pub trait FieldAdvisor: Send + Sync {
    async fn propose(
        &self,
        field: &FieldDescriptor,
        context: &ProfileContext,
    ) -> Result<Option<String>, LlmError>;
}

const SYSTEM_PROMPT: &str = "You output ONLY valid JSON objects. No markdown.";

const PROMPT_RULES: &str = r#"You receive USER_PROFILE (candidate JSON) and one FORM_ELEMENT (a single field of a job application form).
Return the SAME FORM_ELEMENT plus a key "response". Output ONLY one JSON object.

RULES:
- Preserve all original keys; just add "response".
- Use "SKIP" only if answering would be uninformed or risky.
- Single-select options: choose exactly one option, spelled exactly as listed. Never choose a placeholder like "Select One".
- Yes/No compliance questions: eligible to work = Yes, requires sponsorship = No, previously employed here = No, unless the profile says otherwise.
- Demographic / voluntary disclosure: choose the neutral "decline to answer" option when available; never guess sensitive data.
- Dates: full date "MM/DD/YYYY", month field "MM", year field "YYYY". Do not invent chronology.
- Descriptions: reuse profile text, at most 3 sentences, no invention.
- Checkboxes: "Yes" to check, "No" to leave unchecked.
- Never fabricate employers, dates, degrees, certifications or statuses.
- The response is a plain JSON string."#;

/// LLM 服务
///
/// 职责：
/// - 调用 LLM API 为单个字段给出取值
/// - 清理模型输出（代码块、注释行、尾逗号）
/// - 只处理单个字段，不出现岗位 / 步骤信息
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let client = Client::with_config(openai_config);

        Self {
            client,
            model_name: config.llm_model_name.clone(),
        }
    }

    /// 通用的 LLM 调用函数
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    ///
    /// # 返回
    /// 返回 LLM 的响应内容（字符串）
    pub async fn send_to_llm(
        &self,
        user_message: &str,
        system_message: Option<&str>,
    ) -> Result<String, LlmError> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let build_err = |e: async_openai::error::OpenAIError| LlmError::Api {
            model: self.model_name.clone(),
            message: e.to_string(),
        };

        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()
                .map_err(build_err)?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(build_err)?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.1)
            .max_tokens(1024u32)
            .build()
            .map_err(build_err)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            build_err(e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        Ok(content.trim().to_string())
    }

    /// 构建单个字段的提示词
    fn build_field_prompt(field: &FieldDescriptor, context: &ProfileContext) -> String {
        let element = serde_json::json!({
            "question": field.label,
            "input_id": field.id,
            "input_type": field.kind.name(),
            "options": field.options(),
            "required": field.required,
            "current_value": field.current_value,
        });
        format!(
            "{}\n\nUSER_PROFILE:\n{}\n\nFORM_ELEMENT:\n{}\n",
            PROMPT_RULES,
            context.to_prompt_json(),
            element
        )
    }
}

#[async_trait]
impl FieldAdvisor for LlmService {
    async fn propose(
        &self,
        field: &FieldDescriptor,
        context: &ProfileContext,
    ) -> Result<Option<String>, LlmError> {
        let prompt = Self::build_field_prompt(field, context);
        let raw = self.send_to_llm(&prompt, Some(SYSTEM_PROMPT)).await?;
        debug!("字段 '{}' 的模型原始输出: {}", field.label, truncate_text(&raw, 200));
        parse_field_response(&raw)
    }
}

fn trailing_comma_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",(\s*[}\]])").ok()).as_ref()
}

/// 尽量把模型输出清理成一个 JSON 对象
///
/// 去掉代码块、开头的 `json` 标记、注释和说明行，只保留最外层的 `{...}`，
/// 并删除 `}` / `]` 前的尾逗号。
pub fn sanitize_model_output(content: &str) -> String {
    if content.trim().is_empty() {
        return "{}".to_string();
    }

    let mut content = content.to_string();
    if content.contains("```") {
        // 取花括号最多的那一段
        content = content
            .split("```")
            .max_by_key(|part| part.chars().filter(|c| *c == '{' || *c == '}').count())
            .unwrap_or_default()
            .to_string();
    }
    let mut content = content.trim();
    if content.get(..4).is_some_and(|head| head.eq_ignore_ascii_case("json")) {
        content = content[4..].trim_start();
    }

    let cleaned: Vec<&str> = content
        .lines()
        .filter(|line| {
            let ls = line.trim_start();
            let lower = ls.to_lowercase();
            !ls.is_empty()
                && !ls.starts_with('#')
                && !ls.starts_with("//")
                && !["output:", "note:", "answer:"].iter().any(|p| lower.starts_with(p))
        })
        .collect();
    let mut content = cleaned.join("\n");

    if let (Some(first), Some(last)) = (content.find('{'), content.rfind('}')) {
        if first < last {
            content = content[first..=last].to_string();
        }
    }

    match trailing_comma_re() {
        Some(re) => re.replace_all(&content, "$1").trim().to_string(),
        None => content.trim().to_string(),
    }
}

/// 从模型输出中取出 `response`
///
/// `"SKIP"`、空值、缺少 `response` 都视为不填；数组按逗号拼接。
pub fn parse_field_response(raw: &str) -> Result<Option<String>, LlmError> {
    let cleaned = sanitize_model_output(raw);
    let parsed: JsonValue = serde_json::from_str(&cleaned)
        .map_err(|e| LlmError::Malformed(format!("{} (输出: {})", e, cleaned)))?;

    // 模型偶尔会包一层数组
    let object = match parsed {
        JsonValue::Array(items) => items.into_iter().next().unwrap_or(JsonValue::Null),
        other => other,
    };
    let JsonValue::Object(map) = object else {
        return Err(LlmError::Malformed(format!("不是 JSON 对象: {}", cleaned)));
    };

    let value = match map.get("response") {
        None | Some(JsonValue::Null) => return Ok(None),
        Some(JsonValue::String(s)) => s.trim().to_string(),
        Some(JsonValue::Bool(b)) => if *b { "Yes" } else { "No" }.to_string(),
        Some(JsonValue::Number(n)) => n.to_string(),
        Some(JsonValue::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                JsonValue::String(s) => Some(s.trim().to_string()),
                JsonValue::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(", "),
        Some(JsonValue::Object(_)) => {
            return Err(LlmError::Malformed("response 是对象".to_string()));
        }
    };

    if value.is_empty() || value.eq_ignore_ascii_case("skip") {
        Ok(None)
    } else {
        Ok(Some(value))
    }
}
