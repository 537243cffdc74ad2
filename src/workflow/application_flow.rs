//! 岗位申请流程 - 流程层
//!
//! 核心职责：定义"一个岗位"的完整申请流程
//!
//! 状态顺序：
//! ```text
//! Init → LoadPage → [ExtractFields → PlanFills → ApplyFills]* → Submit → Done
//!            │                                                      │
//!            └→ SkippedAuth                      任意位置出错 → Failed
//! ```
//!
//! - 不持有浏览器，只通过 `BrowserDriver` 为每个岗位打开一个独立页面
//! - 页面在任何退出路径上都会被关闭
//! - 取消信号和单岗位时限作用于整个流程

use chrono::Local;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{BrowserError, ErrorKind, FlowError, Result};
use crate::infrastructure::{BrowserDriver, PageAction, PageSession};
use crate::models::{
    ApplicationResult, ApplicationStatus, ErrorRecord, FieldDescriptor, FillDecision, FillOutcome, JobTarget,
    PipelineState, UserProfile,
};
use crate::services::{FieldAdvisor, FieldExtractor, FillPlanner, FormFiller, RunRecorder, StepAdvance};
use crate::workflow::job_ctx::JobCtx;
use crate::workflow::retry::RetryPolicy;
use crate::workflow::timing_profiler::TimingProfiler;

const CONFIRM_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// 流程参数
#[derive(Debug, Clone)]
pub struct FlowSettings {
    pub max_wizard_steps: usize,
    pub submit_confirm_timeout: Duration,
    pub confirm_poll_interval: Duration,
    pub job_timeout: Duration,
    pub allow_partial_submit: bool,
}

impl FlowSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_wizard_steps: config.max_wizard_steps,
            submit_confirm_timeout: config.submit_confirm_timeout(),
            confirm_poll_interval: CONFIRM_POLL_INTERVAL,
            job_timeout: config.job_timeout(),
            allow_partial_submit: config.allow_partial_submit,
        }
    }
}

/// 单次运行中逐步积累的数据
///
/// 放在流程 future 之外，取消或超时之后仍然能拿到已完成的部分。
#[derive(Debug, Default)]
struct RunState {
    states: Vec<PipelineState>,
    extracted: Vec<FieldDescriptor>,
    filled: Vec<FillDecision>,
    outcomes: Vec<FillOutcome>,
    wizard_steps: usize,
    submitted: bool,
    /// 出现过字段级错误或必填缺口
    degraded: bool,
    first_field_error: Option<ErrorRecord>,
}

impl RunState {
    fn enter(&mut self, state: PipelineState, ctx: &JobCtx) {
        if self.states.last().is_some_and(|s| s.is_terminal()) {
            warn!("{} 已在终止状态，忽略 {:?}", ctx, state);
            return;
        }
        debug!("{} 状态 → {:?}", ctx, state);
        self.states.push(state);
    }

    fn note_field_error(&mut self, record: ErrorRecord) {
        self.degraded = true;
        if self.first_field_error.is_none() {
            self.first_field_error = Some(record);
        }
    }

    fn reached_form(&self) -> bool {
        self.states.contains(&PipelineState::ExtractFields)
    }
}

/// 页面会话守卫
///
/// 正常路径下显式 `release`；如果流程 future 被直接丢弃（强制中止），
/// `Drop` 会把关闭操作交给运行时在后台完成。
struct SessionGuard {
    job_index: usize,
    session: Option<Box<dyn PageSession>>,
}

impl SessionGuard {
    fn new(job_index: usize) -> Self {
        Self {
            job_index,
            session: None,
        }
    }

    fn hold(&mut self, session: Box<dyn PageSession>) -> &dyn PageSession {
        &**self.session.insert(session)
    }

    /// 关闭完成之前会话一直留在守卫里，关闭过程中被中止也会由 `Drop` 接手
    async fn release(&mut self) {
        let Some(session) = self.session.as_deref() else {
            return;
        };
        let closed = session.close().await;
        self.session = None;
        match closed {
            Ok(()) => debug!("[岗位 {}] 页面已关闭", self.job_index),
            Err(e) => warn!("[岗位 {}] 关闭页面失败: {}", self.job_index, e),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let job_index = self.job_index;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!("[岗位 {}] 流程被中止，后台关闭页面", job_index);
                handle.spawn(async move {
                    if let Err(e) = session.close().await {
                        warn!("[岗位 {}] 后台关闭页面失败: {}", job_index, e);
                    }
                });
            }
            Err(_) => error!("[岗位 {}] 没有可用的运行时，页面未能关闭", job_index),
        }
    }
}

/// 岗位申请流程
///
/// - 编排 提取 → 规划 → 填写 → 提交
/// - 决定何时重试、何时放弃、何时算部分完成
/// - 只依赖业务能力（services）和浏览器能力接口
pub struct ApplicationFlow {
    driver: Arc<dyn BrowserDriver>,
    extractor: FieldExtractor,
    planner: FillPlanner,
    filler: FormFiller,
    profile: Arc<UserProfile>,
    recorder: Option<RunRecorder>,
    settings: FlowSettings,
    url_pattern: Regex,
    retry: RetryPolicy,
}

impl ApplicationFlow {
    /// 创建新的申请流程
    pub fn new(
        config: &Config,
        driver: Arc<dyn BrowserDriver>,
        advisor: Arc<dyn FieldAdvisor>,
        profile: Arc<UserProfile>,
        recorder: Option<RunRecorder>,
    ) -> Result<Self> {
        Ok(Self {
            driver,
            extractor: FieldExtractor::new(),
            planner: FillPlanner::new(advisor, config.model_timeout()),
            filler: FormFiller::new(),
            profile,
            recorder,
            settings: FlowSettings::from_config(config),
            url_pattern: Regex::new(&config.application_url_pattern)?,
            retry: RetryPolicy::from_millis(config.navigation_retries as usize, &config.retry_backoff_ms),
        })
    }

    /// 处理一个岗位，总是返回结果，不向上抛错
    pub async fn run(&self, job: &JobTarget, ctx: &JobCtx) -> ApplicationResult {
        let started_at = Local::now();
        let profiler = TimingProfiler::new();
        let mut run = RunState::default();
        let mut guard = SessionGuard::new(job.index);

        info!("{} 🚀 开始申请: {} ({})", ctx, job.company_label, job.url);
        {
            let _init = profiler.mark(PipelineState::Init.phase_name());
            run.enter(PipelineState::Init, ctx);
        }

        let outcome = {
            let drive = self.drive(job, ctx, &profiler, &mut run, &mut guard);
            tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => Err(FlowError::Cancelled),
                res = tokio::time::timeout(self.settings.job_timeout, drive) => match res {
                    Ok(res) => res,
                    Err(_) => Err(FlowError::JobTimeout(self.settings.job_timeout.as_secs())),
                },
            }
        };

        let (status, terminal, error) = self.conclude(outcome, &run);
        run.enter(terminal, ctx);
        {
            let _release = profiler.mark(terminal.phase_name());
            guard.release().await;
        }
        let timing = profiler.seal();

        let result = ApplicationResult {
            job: job.clone(),
            status,
            extracted: run.extracted,
            filled: run.filled,
            outcomes: run.outcomes,
            error,
            timing,
            states: run.states,
            submitted: run.submitted,
            wizard_steps: run.wizard_steps,
            started_at,
            ended_at: Local::now(),
        };

        match status {
            ApplicationStatus::Success => info!("{} ✅ 申请已提交 ({}ms)", ctx, result.timing.total_ms),
            ApplicationStatus::Partial => warn!(
                "{} 🟡 部分完成: {}",
                ctx,
                result.error.as_ref().map(|e| e.message.as_str()).unwrap_or("-")
            ),
            ApplicationStatus::SkippedAuth => warn!("{} 🔒 需要登录，跳过", ctx),
            ApplicationStatus::Failed => error!(
                "{} ❌ 申请失败: {}",
                ctx,
                result.error.as_ref().map(|e| e.message.as_str()).unwrap_or("-")
            ),
        }

        if let Some(recorder) = &self.recorder {
            if let Err(e) = recorder.persist(&result).await {
                warn!("{} ⚠️ 写入运行记录失败: {:#}", ctx, e);
            }
        }

        result
    }

    /// 流程结果 -> (状态, 终止状态, 错误)
    fn conclude(
        &self,
        outcome: std::result::Result<(), FlowError>,
        run: &RunState,
    ) -> (ApplicationStatus, PipelineState, Option<ErrorRecord>) {
        match outcome {
            Ok(()) if run.degraded => (
                ApplicationStatus::Partial,
                PipelineState::Done,
                run.first_field_error.clone(),
            ),
            Ok(()) => (ApplicationStatus::Success, PipelineState::Done, None),
            Err(e @ FlowError::AuthRedirect(_)) if !run.reached_form() => (
                ApplicationStatus::SkippedAuth,
                PipelineState::SkippedAuth,
                Some(e.to_record()),
            ),
            Err(e) => (ApplicationStatus::Failed, PipelineState::Failed, Some(e.to_record())),
        }
    }

    async fn drive(
        &self,
        job: &JobTarget,
        ctx: &JobCtx,
        profiler: &TimingProfiler,
        run: &mut RunState,
        guard: &mut SessionGuard,
    ) -> std::result::Result<(), FlowError> {
        // ========== LoadPage ==========
        run.enter(PipelineState::LoadPage, ctx);
        let load_timer = profiler.mark(PipelineState::LoadPage.phase_name());

        let label = format!("{} 打开页面", ctx);
        let opened = self
            .retry
            .run(
                &label,
                |e: &BrowserError| matches!(e, BrowserError::NavigationTimeout { .. }),
                |attempt| {
                    if attempt > 0 {
                        info!("{} 🔄 第 {} 次尝试加载页面", ctx, attempt + 1);
                    }
                    self.driver.open(&job.url)
                },
            )
            .await?;
        let session = guard.hold(opened);

        for action in [PageAction::StartApplication, PageAction::ApplyManually] {
            match session.click(action).await {
                Ok(true) => debug!("{} 已点击 {:?}", ctx, action),
                Ok(false) => {}
                Err(e) => debug!("{} 点击 {:?} 失败（忽略）: {}", ctx, action, e),
            }
        }

        let url = session.current_url().await?;
        let snapshot = session.inspect().await?;
        if snapshot.auth_wall || !self.url_pattern.is_match(&url) {
            return Err(FlowError::AuthRedirect(url));
        }
        info!("{} ✓ 页面已加载: {}", ctx, url);
        load_timer.finish();

        // ========== 向导步骤 ==========
        for step in 0..self.settings.max_wizard_steps {
            if ctx.is_cancelled() {
                return Err(FlowError::Cancelled);
            }
            info!("{} 📄 第 {} 步", ctx, step + 1);

            run.enter(PipelineState::ExtractFields, ctx);
            let fields = {
                let _t = profiler.mark(PipelineState::ExtractFields.phase_name());
                let fields = self.extractor.extract(session, step).await?;
                if self.add_entries(session, &fields, ctx).await? {
                    self.extractor.extract(session, step).await?
                } else {
                    fields
                }
            };
            info!("{} ✓ 提取到 {} 个字段", ctx, fields.len());

            if fields.is_empty() {
                // 复核页没有字段，但有提交按钮
                let snapshot = session.inspect().await?;
                if step > 0 && snapshot.final_submit {
                    run.wizard_steps = step + 1;
                    return self.submit(session, ctx, profiler, run).await;
                }
                return Err(FlowError::StructuralMismatch(format!(
                    "第 {} 步没有找到可填写的字段",
                    step + 1
                )));
            }
            run.extracted.extend(fields.iter().cloned());

            run.enter(PipelineState::PlanFills, ctx);
            let decisions = {
                let _t = profiler.mark(PipelineState::PlanFills.phase_name());
                self.planner.plan(&fields, &self.profile, ctx).await
            };
            for decision in &decisions {
                profiler.record_field(&decision.field_id, decision.duration_ms);
            }

            run.enter(PipelineState::ApplyFills, ctx);
            let outcomes = {
                let _t = profiler.mark(PipelineState::ApplyFills.phase_name());
                self.filler.apply(session, &fields, &decisions, ctx).await?
            };

            let gap = self.review_step(&fields, &decisions, &outcomes, run);
            run.filled.extend(decisions);
            run.outcomes.extend(outcomes);
            run.wizard_steps = step + 1;

            if let Some(record) = gap {
                if !self.settings.allow_partial_submit {
                    return Err(FlowError::RequiredIncomplete(record));
                }
                warn!("{} ⚠️ 必填字段不完整，按配置继续提交: {}", ctx, record.message);
                run.note_field_error(record);
            }

            match self.filler.advance(session, ctx).await? {
                StepAdvance::ReadyToSubmit => return self.submit(session, ctx, profiler, run).await,
                StepAdvance::Advanced => continue,
                StepAdvance::NoAffordance => {
                    return Err(FlowError::StructuralMismatch(format!(
                        "第 {} 步之后既没有下一步也没有提交按钮",
                        step + 1
                    )));
                }
            }
        }

        Err(FlowError::StructuralMismatch(format!(
            "超过最大步骤数 {}",
            self.settings.max_wizard_steps
        )))
    }

    /// 按资料里的工作经历 / 教育经历条数补齐页面上的条目面板
    ///
    /// 返回是否点过添加按钮，点过就需要重新提取字段。
    async fn add_entries(
        &self,
        session: &dyn PageSession,
        fields: &[FieldDescriptor],
        ctx: &JobCtx,
    ) -> std::result::Result<bool, FlowError> {
        let snapshot = session.inspect().await?;
        let mut added = false;

        for section in snapshot.add_sections {
            let present = fields
                .iter()
                .filter_map(|f| f.entry)
                .filter(|e| e.section == section)
                .map(|e| e.index)
                .collect::<HashSet<_>>()
                .len();
            let wanted = self.profile.entry_count(section);

            for n in present..wanted {
                if !session.click(PageAction::AddEntry(section)).await? {
                    warn!("{} ⚠️ 找不到 {} 的添加按钮", ctx, section.name());
                    break;
                }
                info!("{} ➕ 已添加第 {} 条 {}", ctx, n + 1, section.name());
                added = true;
            }
        }

        Ok(added)
    }

    /// 汇总一个步骤的字段级错误，返回第一个未完成的必填字段
    fn review_step(
        &self,
        fields: &[FieldDescriptor],
        decisions: &[FillDecision],
        outcomes: &[FillOutcome],
        run: &mut RunState,
    ) -> Option<ErrorRecord> {
        for decision in decisions {
            if let Some(record) = &decision.error {
                run.note_field_error(record.clone());
            }
        }
        for outcome in outcomes {
            if let Some(message) = &outcome.verification_error {
                run.note_field_error(ErrorRecord::for_field(
                    ErrorKind::VerificationMismatch,
                    &outcome.field_id,
                    message.clone(),
                ));
            }
        }

        fields.iter().filter(|f| f.required).find_map(|field| {
            let decision = decisions.iter().find(|d| d.field_id == field.id);
            let outcome = outcomes.iter().find(|o| o.field_id == field.id);
            match (decision, outcome) {
                (Some(d), _) if d.is_skipped() => Some(d.error.clone().unwrap_or_else(|| {
                    ErrorRecord::for_field(
                        ErrorKind::RequiredFieldUnfilled,
                        &field.id,
                        format!("必填字段 '{}' 没有可用的值", field.label),
                    )
                })),
                (Some(_), Some(o)) if o.verified() => None,
                (Some(_), Some(o)) => Some(ErrorRecord::for_field(
                    ErrorKind::VerificationMismatch,
                    &field.id,
                    o.verification_error
                        .clone()
                        .unwrap_or_else(|| format!("必填字段 '{}' 未写入", field.label)),
                )),
                _ => Some(ErrorRecord::for_field(
                    ErrorKind::RequiredFieldUnfilled,
                    &field.id,
                    format!("必填字段 '{}' 没有决策", field.label),
                )),
            }
        })
    }

    /// 点击提交并等待确认
    async fn submit(
        &self,
        session: &dyn PageSession,
        ctx: &JobCtx,
        profiler: &TimingProfiler,
        run: &mut RunState,
    ) -> std::result::Result<(), FlowError> {
        if ctx.is_cancelled() {
            return Err(FlowError::Cancelled);
        }
        run.enter(PipelineState::Submit, ctx);
        let _t = profiler.mark(PipelineState::Submit.phase_name());
        info!("{} 📤 提交申请...", ctx);

        if !session.click(PageAction::Submit).await? {
            return Err(FlowError::SubmitUnconfirmed("找不到提交按钮".to_string()));
        }

        let deadline = tokio::time::Instant::now() + self.settings.submit_confirm_timeout;
        loop {
            let snapshot = session.inspect().await?;
            if snapshot.confirmation {
                run.submitted = true;
                return Ok(());
            }
            if let Some(banner) = snapshot.error_banner {
                return Err(FlowError::Page(banner));
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(FlowError::SubmitUnconfirmed(format!(
                    "{}s 内没有看到提交确认",
                    self.settings.submit_confirm_timeout.as_secs()
                )));
            }
            tokio::time::sleep(self.settings.confirm_poll_interval).await;
        }
    }
}
