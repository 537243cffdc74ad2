//! 表单填写 - 业务能力层
//!
//! 按决策顺序写值、回读校验、翻到下一步。
//! 单个字段写不进去或校验不一致只记录下来，不中断；
//! 登录墙和页面错误提示才算致命。

use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::error::{BrowserError, FlowError};
use crate::infrastructure::{PageAction, PageSession};
use crate::models::{FieldDescriptor, FillDecision, FillOutcome};
use crate::workflow::JobCtx;

/// 当前步骤填完之后的去向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAdvance {
    /// 出现最终提交按钮
    ReadyToSubmit,
    /// 已点击下一步
    Advanced,
    /// 既没有下一步也没有提交
    NoAffordance,
}

/// 表单填写器
#[derive(Debug, Default, Clone)]
pub struct FormFiller;

impl FormFiller {
    pub fn new() -> Self {
        Self
    }

    /// 应用一组决策
    ///
    /// 每个决策对应一个结果，跳过的决策记为未应用。
    pub async fn apply(
        &self,
        session: &dyn PageSession,
        fields: &[FieldDescriptor],
        decisions: &[FillDecision],
        ctx: &JobCtx,
    ) -> Result<Vec<FillOutcome>, FlowError> {
        let by_id: HashMap<&str, &FieldDescriptor> =
            fields.iter().map(|f| (f.id.as_str(), f)).collect();
        let mut outcomes = Vec::with_capacity(decisions.len());

        for decision in decisions {
            let Some(value) = decision.value.as_ref().filter(|_| !decision.is_skipped()) else {
                outcomes.push(FillOutcome {
                    field_id: decision.field_id.clone(),
                    applied: false,
                    verification_error: None,
                });
                continue;
            };

            let outcome = match session.write(&decision.field_id, value).await {
                Ok(()) => {
                    let rendered = match session.read_value(&decision.field_id).await {
                        Ok(rendered) => rendered,
                        Err(BrowserError::Closed) => return Err(BrowserError::Closed.into()),
                        Err(e) => {
                            debug!("{} 回读字段 {} 失败: {}", ctx, decision.field_id, e);
                            None
                        }
                    };
                    let verification_error = match by_id.get(decision.field_id.as_str()) {
                        Some(field) => field.verify(value, rendered.as_deref()).err(),
                        None => Some("字段不在本步骤的提取结果中".to_string()),
                    };
                    if let Some(err) = &verification_error {
                        warn!("{} ⚠️ 字段 {} 校验不一致: {}", ctx, decision.field_id, err);
                    } else {
                        debug!("{} ✓ 已填写 {} = {}", ctx, decision.field_id, value.display());
                    }
                    FillOutcome {
                        field_id: decision.field_id.clone(),
                        applied: true,
                        verification_error,
                    }
                }
                Err(BrowserError::Closed) => return Err(BrowserError::Closed.into()),
                Err(e) => {
                    warn!("{} ⚠️ 字段 {} 写入失败: {}", ctx, decision.field_id, e);
                    FillOutcome {
                        field_id: decision.field_id.clone(),
                        applied: false,
                        verification_error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }

        self.check_fatal(session).await?;

        let verified = outcomes.iter().filter(|o| o.verified()).count();
        info!("{} ✓ 填写完成: {}/{} 个字段通过校验", ctx, verified, outcomes.len());
        Ok(outcomes)
    }

    /// 检查致命页面状态
    pub async fn check_fatal(&self, session: &dyn PageSession) -> Result<(), FlowError> {
        let snapshot = session.inspect().await?;
        if snapshot.auth_wall {
            return Err(FlowError::AuthRedirect(snapshot.url));
        }
        if let Some(banner) = snapshot.error_banner {
            return Err(FlowError::Page(banner));
        }
        Ok(())
    }

    /// 填完一步之后：有提交按钮就准备提交，否则尝试下一步
    pub async fn advance(&self, session: &dyn PageSession, ctx: &JobCtx) -> Result<StepAdvance, FlowError> {
        let snapshot = session.inspect().await?;
        if snapshot.final_submit {
            debug!("{} 检测到最终提交按钮", ctx);
            return Ok(StepAdvance::ReadyToSubmit);
        }
        if snapshot.next_step && session.click(PageAction::NextStep).await? {
            debug!("{} ➡️ 进入下一步", ctx);
            return Ok(StepAdvance::Advanced);
        }
        Ok(StepAdvance::NoAffordance)
    }
}
