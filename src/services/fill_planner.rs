//! 填写规划 - 业务能力层
//!
//! 每个字段一个决策，顺序和输入一致：
//! 1. 按标签直接从用户资料取值
//! 2. 取不到再问模型，模型的值要满足字段类型和选项约束
//! 3. 模型不给值时沿用页面上已有的值，否则跳过
//!
//! 单个字段的模型失败（超时、输出无法解析）只会让这个字段跳过，不影响其它字段。

use phf::phf_map;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::{ErrorKind, LlmError};
use crate::models::field::normalize;
use crate::models::{
    DecisionSource, ErrorRecord, FieldDescriptor, FieldKind, FillDecision, FillValue, ProfileContext,
    ProfileKey, UserProfile,
};
use crate::services::llm_service::FieldAdvisor;
use crate::workflow::JobCtx;

/// 标签（小写、去标点）-> 资料键
static LABEL_KEYS: phf::Map<&'static str, ProfileKey> = phf_map! {
    "first name" => ProfileKey::FirstName,
    "given name" => ProfileKey::FirstName,
    "legal first name" => ProfileKey::FirstName,
    "last name" => ProfileKey::LastName,
    "family name" => ProfileKey::LastName,
    "surname" => ProfileKey::LastName,
    "legal last name" => ProfileKey::LastName,
    "preferred name" => ProfileKey::PreferredName,
    "full name" => ProfileKey::FullName,
    "name" => ProfileKey::FullName,
    "email" => ProfileKey::Email,
    "email address" => ProfileKey::Email,
    "phone" => ProfileKey::Phone,
    "phone number" => ProfileKey::Phone,
    "mobile phone" => ProfileKey::Phone,
    "address" => ProfileKey::AddressLine1,
    "address line 1" => ProfileKey::AddressLine1,
    "street address" => ProfileKey::AddressLine1,
    "city" => ProfileKey::City,
    "state" => ProfileKey::State,
    "province" => ProfileKey::State,
    "state province" => ProfileKey::State,
    "postal code" => ProfileKey::PostalCode,
    "zip code" => ProfileKey::PostalCode,
    "zip" => ProfileKey::PostalCode,
    "country" => ProfileKey::Country,
    "country region" => ProfileKey::Country,
    "linkedin" => ProfileKey::LinkedIn,
    "linkedin profile" => ProfileKey::LinkedIn,
    "linkedin profile url" => ProfileKey::LinkedIn,
    "website" => ProfileKey::Website,
    "portfolio" => ProfileKey::Website,
    "company" => ProfileKey::CurrentCompany,
    "current company" => ProfileKey::CurrentCompany,
    "current employer" => ProfileKey::CurrentCompany,
    "job title" => ProfileKey::CurrentTitle,
    "current job title" => ProfileKey::CurrentTitle,
    "from" => ProfileKey::JobStartDate,
    "start date" => ProfileKey::JobStartDate,
    "to" => ProfileKey::JobEndDate,
    "end date" => ProfileKey::JobEndDate,
    "role description" => ProfileKey::JobDescription,
    "graduation date" => ProfileKey::GraduationDate,
    "school" => ProfileKey::School,
    "school or university" => ProfileKey::School,
    "college university" => ProfileKey::School,
    "university" => ProfileKey::School,
    "degree" => ProfileKey::Degree,
    "field of study" => ProfileKey::FieldOfStudy,
    "major" => ProfileKey::FieldOfStudy,
    "skills" => ProfileKey::Skills,
    "resume" => ProfileKey::Resume,
    "resume cv" => ProfileKey::Resume,
    "upload resume" => ProfileKey::Resume,
};

/// 标签 -> 查表用的键：小写，非字母数字替换为空格
pub fn label_key(label: &str) -> String {
    let replaced: String = label
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    normalize(&replaced)
}

/// 按标签找资料键，文件字段一律对应简历
pub fn profile_key_for(field: &FieldDescriptor) -> Option<ProfileKey> {
    if matches!(field.kind, FieldKind::File { .. }) {
        return Some(ProfileKey::Resume);
    }
    LABEL_KEYS.get(label_key(&field.label).as_str()).copied()
}

/// 填写规划器
pub struct FillPlanner {
    advisor: Arc<dyn FieldAdvisor>,
    model_timeout: Duration,
}

impl FillPlanner {
    pub fn new(advisor: Arc<dyn FieldAdvisor>, model_timeout: Duration) -> Self {
        Self {
            advisor,
            model_timeout,
        }
    }

    /// 为一组字段生成决策，一一对应且保持顺序
    pub async fn plan(
        &self,
        fields: &[FieldDescriptor],
        profile: &UserProfile,
        ctx: &JobCtx,
    ) -> Vec<FillDecision> {
        let mut decisions = Vec::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            debug!("{} 规划字段 {}/{}: {}", ctx, i + 1, fields.len(), field.label);
            decisions.push(self.decide(field, profile, ctx).await);
        }

        let skipped = decisions.iter().filter(|d| d.is_skipped()).count();
        info!(
            "{} ✓ 规划完成: {} 个字段, {} 个跳过",
            ctx,
            decisions.len(),
            skipped
        );
        decisions
    }

    /// 单个字段的决策
    pub async fn decide(&self, field: &FieldDescriptor, profile: &UserProfile, ctx: &JobCtx) -> FillDecision {
        let started = Instant::now();
        let elapsed = |started: Instant| started.elapsed().as_millis() as u64;

        // 1. 资料直取
        if let Some(value) = profile_key_for(field)
            .and_then(|key| profile.lookup(key, field.entry))
            .and_then(|value| field.conform(value))
        {
            return FillDecision::filled(&field.id, value, DecisionSource::Profile, elapsed(started));
        }

        // 文件没法让模型编出来
        if matches!(field.kind, FieldKind::File { .. }) {
            return FillDecision::skipped(&field.id, elapsed(started), None);
        }

        // 2. 问模型
        let context = ProfileContext::for_field(profile, field);
        let proposal = match tokio::time::timeout(self.model_timeout, self.advisor.propose(field, &context)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout {
                secs: self.model_timeout.as_secs(),
            }),
        };

        match proposal {
            Ok(Some(text)) => match field.conform(FillValue::Text(text.clone())) {
                Some(value) => FillDecision::filled(&field.id, value, DecisionSource::Model, elapsed(started)),
                None => {
                    warn!(
                        "{} 模型给出的值不满足约束，跳过字段 '{}': {:?}",
                        ctx, field.label, text
                    );
                    FillDecision::skipped(&field.id, elapsed(started), None)
                }
            },
            Ok(None) => {
                // 3. 沿用页面已有值
                match field
                    .current_value
                    .clone()
                    .and_then(|v| field.conform(FillValue::Text(v)))
                {
                    Some(value) => {
                        FillDecision::filled(&field.id, value, DecisionSource::Default, elapsed(started))
                    }
                    None => FillDecision::skipped(&field.id, elapsed(started), None),
                }
            }
            Err(e) => {
                warn!("{} ⚠️ 字段 '{}' 模型调用失败: {}", ctx, field.label, e);
                let record = ErrorRecord::for_field(ErrorKind::ModelCallFailed, &field.id, e.to_string());
                FillDecision::skipped(&field.id, elapsed(started), Some(record))
            }
        }
    }
}
