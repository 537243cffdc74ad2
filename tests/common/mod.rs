//! 集成测试用的脚本化浏览器和模型
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use workday_apply::error::{BrowserError, LlmError};
use workday_apply::infrastructure::{BrowserDriver, PageAction, PageSession, PageSnapshot, RawField};
use workday_apply::models::{EntryRef, FieldDescriptor, FillValue, ProfileContext, ProfileSection, UserProfile};
use workday_apply::services::FieldAdvisor;
use workday_apply::{Config, JobTarget};

pub const APPLY_URL: &str = "https://acme.wd5.myworkdayjobs.com/en-US/careers/job/Engineer_R1/apply";
pub const LOGIN_URL: &str = "https://acme.wd5.myworkdayjobs.com/en-US/careers/login";

// ========== 页面 ==========

/// 一个岗位页面的脚本
#[derive(Debug, Clone)]
pub struct PageScript {
    /// 加载后的地址
    pub url: String,
    pub auth_wall: bool,
    /// 每个向导步骤的字段；为空表示找不到表单容器
    pub steps: Vec<Vec<RawField>>,
    /// 点击提交后是否出现确认
    pub confirms: bool,
    /// 写入后回读得到别的值的字段
    pub garbled: HashSet<String>,
    /// 最后一步之后仍然显示"下一步"（模拟误判）
    pub endless_next: bool,
    /// 带"添加"按钮的资料段
    pub sections: Vec<SectionScript>,
}

/// 某一步里可以重复添加面板的资料段
#[derive(Debug, Clone)]
pub struct SectionScript {
    pub step: usize,
    pub section: ProfileSection,
    /// 每个新面板的字段，key 会加上 `-{面板序号}`
    pub panel: Vec<RawField>,
}

impl PageScript {
    pub fn new(steps: Vec<Vec<RawField>>) -> Self {
        Self {
            url: APPLY_URL.to_string(),
            auth_wall: false,
            steps,
            confirms: true,
            garbled: HashSet::new(),
            endless_next: false,
            sections: Vec::new(),
        }
    }

    pub fn with_section(mut self, step: usize, section: ProfileSection, panel: Vec<RawField>) -> Self {
        self.sections.push(SectionScript { step, section, panel });
        self
    }

    pub fn login_redirect() -> Self {
        Self {
            url: LOGIN_URL.to_string(),
            auth_wall: true,
            ..Self::new(vec![vec![text_field("email", 0, "Email Address", true)]])
        }
    }
}

pub fn text_field(key: &str, position: usize, label: &str, required: bool) -> RawField {
    RawField {
        key: Some(key.to_string()),
        position,
        tag: "input".to_string(),
        input_type: Some("text".to_string()),
        label: Some(label.to_string()),
        required,
        ..RawField::default()
    }
}

pub fn select_field(key: &str, position: usize, label: &str, options: &[&str], required: bool) -> RawField {
    RawField {
        key: Some(key.to_string()),
        position,
        tag: "select".to_string(),
        label: Some(label.to_string()),
        required,
        options: options.iter().map(|o| o.to_string()).collect(),
        ..RawField::default()
    }
}

pub fn checkbox_field(key: &str, position: usize, label: &str) -> RawField {
    RawField {
        key: Some(key.to_string()),
        position,
        tag: "input".to_string(),
        input_type: Some("checkbox".to_string()),
        label: Some(label.to_string()),
        ..RawField::default()
    }
}

/// 所有会话共享的计数
#[derive(Debug, Default)]
pub struct PageCounters {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub live: AtomicUsize,
    pub max_live: AtomicUsize,
    pub submits: AtomicUsize,
    /// close 被调用的次数（包括没能完成的）
    pub close_calls: AtomicUsize,
    pub add_clicks: AtomicUsize,
}

impl PageCounters {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
    pub fn add_clicks(&self) -> usize {
        self.add_clicks.load(Ordering::SeqCst)
    }
}

/// 脚本化的浏览器驱动
pub struct ScriptedDriver {
    scripts: HashMap<String, PageScript>,
    fallback: PageScript,
    /// 前 N 次 open 超时
    timeouts_before_success: AtomicUsize,
    pub open_attempts: AtomicUsize,
    /// open 之后、返回之前的等待（模拟慢页面）
    pub open_delay: Duration,
    /// 每次点击后的等待
    pub click_delay: Duration,
    /// close 完成前的等待（模拟卡住的标签页）
    pub close_delay: Duration,
    pub counters: Arc<PageCounters>,
}

impl ScriptedDriver {
    pub fn new(fallback: PageScript) -> Self {
        Self {
            scripts: HashMap::new(),
            fallback,
            timeouts_before_success: AtomicUsize::new(0),
            open_attempts: AtomicUsize::new(0),
            open_delay: Duration::ZERO,
            click_delay: Duration::ZERO,
            close_delay: Duration::ZERO,
            counters: Arc::new(PageCounters::default()),
        }
    }

    pub fn with_script(mut self, url: &str, script: PageScript) -> Self {
        self.scripts.insert(url.to_string(), script);
        self
    }

    pub fn with_timeouts(self, n: usize) -> Self {
        self.timeouts_before_success.store(n, Ordering::SeqCst);
        self
    }

    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    pub fn with_click_delay(mut self, delay: Duration) -> Self {
        self.click_delay = delay;
        self
    }

    pub fn with_close_delay(mut self, delay: Duration) -> Self {
        self.close_delay = delay;
        self
    }
}

#[async_trait]
impl BrowserDriver for ScriptedDriver {
    async fn open(&self, url: &str) -> Result<Box<dyn PageSession>, BrowserError> {
        self.open_attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.timeouts_before_success.load(Ordering::SeqCst);
        if remaining > 0 {
            self.timeouts_before_success.store(remaining - 1, Ordering::SeqCst);
            return Err(BrowserError::NavigationTimeout {
                url: url.to_string(),
                secs: 30,
            });
        }
        if !self.open_delay.is_zero() {
            tokio::time::sleep(self.open_delay).await;
        }

        let script = self.scripts.get(url).cloned().unwrap_or_else(|| self.fallback.clone());
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_live.fetch_max(live, Ordering::SeqCst);

        Ok(Box::new(ScriptedSession {
            script,
            step: AtomicUsize::new(0),
            values: Mutex::new(HashMap::new()),
            submitted: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            panels: Mutex::new(HashMap::new()),
            click_delay: self.click_delay,
            close_delay: self.close_delay,
            counters: self.counters.clone(),
        }))
    }
}

pub struct ScriptedSession {
    script: PageScript,
    step: AtomicUsize,
    values: Mutex<HashMap<String, String>>,
    submitted: AtomicBool,
    closed: AtomicBool,
    /// 每个资料段已添加的面板数
    panels: Mutex<HashMap<ProfileSection, usize>>,
    click_delay: Duration,
    close_delay: Duration,
    counters: Arc<PageCounters>,
}

impl ScriptedSession {
    fn on_last_step(&self) -> bool {
        self.step.load(Ordering::SeqCst) + 1 >= self.script.steps.len()
    }

    fn sections_here(&self) -> impl Iterator<Item = &SectionScript> {
        let step = self.step.load(Ordering::SeqCst);
        self.script.sections.iter().filter(move |s| s.step == step)
    }

    /// 已添加的面板字段，排在步骤字段后面
    fn panel_fields(&self, offset: usize) -> Vec<RawField> {
        let panels = self.panels.lock().unwrap();
        let mut out = Vec::new();
        for script in self.sections_here() {
            let count = panels.get(&script.section).copied().unwrap_or(0);
            for index in 0..count {
                for template in &script.panel {
                    let mut field = template.clone();
                    field.key = template.key.as_ref().map(|k| format!("{}-{}", k, index));
                    field.position = offset + out.len();
                    field.entry = Some(EntryRef {
                        section: script.section,
                        index,
                    });
                    out.push(field);
                }
            }
        }
        out
    }
}

#[async_trait]
impl PageSession for ScriptedSession {
    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.script.url.clone())
    }

    async fn query_fields(&self, _step: usize) -> Result<Option<Vec<RawField>>, BrowserError> {
        let step = self.step.load(Ordering::SeqCst);
        let Some(mut fields) = self.script.steps.get(step).cloned() else {
            return Ok(None);
        };
        fields.extend(self.panel_fields(fields.len()));
        Ok(Some(fields).filter(|fields| !fields.is_empty()))
    }

    async fn write(&self, field_id: &str, value: &FillValue) -> Result<(), BrowserError> {
        let rendered = if self.script.garbled.contains(field_id) {
            "???".to_string()
        } else {
            match value {
                FillValue::Text(text) => text.clone(),
                FillValue::Flag(flag) => if *flag { "Yes" } else { "No" }.to_string(),
                FillValue::File(path) => path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
            }
        };
        self.values
            .lock()
            .unwrap()
            .insert(field_id.to_string(), rendered);
        Ok(())
    }

    async fn read_value(&self, field_id: &str) -> Result<Option<String>, BrowserError> {
        Ok(self.values.lock().unwrap().get(field_id).cloned())
    }

    async fn click(&self, action: PageAction) -> Result<bool, BrowserError> {
        if !self.click_delay.is_zero() {
            tokio::time::sleep(self.click_delay).await;
        }
        match action {
            PageAction::StartApplication | PageAction::ApplyManually => Ok(false),
            PageAction::AddEntry(section) => {
                if !self.sections_here().any(|s| s.section == section) {
                    return Ok(false);
                }
                *self.panels.lock().unwrap().entry(section).or_insert(0) += 1;
                self.counters.add_clicks.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }
            PageAction::NextStep => {
                if self.on_last_step() {
                    Ok(self.script.endless_next)
                } else {
                    self.step.fetch_add(1, Ordering::SeqCst);
                    Ok(true)
                }
            }
            PageAction::Submit => {
                if self.on_last_step() && !self.script.endless_next {
                    self.submitted.store(true, Ordering::SeqCst);
                    self.counters.submits.fetch_add(1, Ordering::SeqCst);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }

    async fn inspect(&self) -> Result<PageSnapshot, BrowserError> {
        let last = self.on_last_step();
        Ok(PageSnapshot {
            url: self.script.url.clone(),
            auth_wall: self.script.auth_wall,
            error_banner: None,
            next_step: !last || self.script.endless_next,
            final_submit: last && !self.script.endless_next,
            confirmation: self.submitted.load(Ordering::SeqCst) && self.script.confirms,
            add_sections: self.sections_here().map(|s| s.section).collect(),
        })
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.counters.close_calls.fetch_add(1, Ordering::SeqCst);
        if !self.close_delay.is_zero() {
            tokio::time::sleep(self.close_delay).await;
        }
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
            self.counters.live.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

// ========== 模型 ==========

#[derive(Debug, Clone)]
pub enum Answer {
    Value(String),
    Skip,
    /// 一直不返回
    Hang,
    Malformed,
    /// 直接 panic（模拟流程内部崩溃）
    Panic,
}

/// 按字段标签回答的模型
#[derive(Default)]
pub struct ScriptedAdvisor {
    answers: HashMap<String, Answer>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedAdvisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, label: &str, answer: Answer) -> Self {
        self.answers.insert(label.to_string(), answer);
        self
    }

    pub fn called_labels(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FieldAdvisor for ScriptedAdvisor {
    async fn propose(
        &self,
        field: &FieldDescriptor,
        _context: &ProfileContext,
    ) -> Result<Option<String>, LlmError> {
        self.calls.lock().unwrap().push(field.label.clone());
        match self.answers.get(&field.label).cloned().unwrap_or(Answer::Skip) {
            Answer::Value(v) => Ok(Some(v)),
            Answer::Skip => Ok(None),
            Answer::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(None)
            }
            Answer::Malformed => Err(LlmError::Malformed("not json".to_string())),
            Answer::Panic => panic!("advisor blew up on '{}'", field.label),
        }
    }
}

// ========== 其它 ==========

pub fn profile() -> UserProfile {
    serde_json::from_value(serde_json::json!({
        "personal_information": {
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "ada@example.com",
            "phone": "555-0100",
            "country": "United Kingdom"
        },
        "work_experience": [
            {"company": "Analytical Engines", "position": "Engineer", "start_date": "01/2020"},
            {"company": "Difference Works", "position": "Apprentice", "start_date": "06/2017", "end_date": "12/2019"}
        ],
        "education": [
            {"institution": "University of London", "degree": "BS", "field_of_study": "Mathematics"}
        ],
        "skills": ["Rust", "SQL"]
    }))
    .unwrap()
}

/// 测试用配置：短时限，无重试等待
pub fn test_config() -> Config {
    Config {
        navigation_retries: 2,
        retry_backoff_ms: vec![10, 20],
        submit_confirm_timeout_secs: 2,
        model_timeout_secs: 1,
        job_timeout_secs: 60,
        shutdown_grace_secs: 1,
        max_wizard_steps: 5,
        ..Config::default()
    }
}

pub fn jobs(n: usize) -> Vec<JobTarget> {
    (1..=n)
        .map(|i| JobTarget::new(i, format!("https://acme.wd5.myworkdayjobs.com/job/{}/apply", i), format!("company_{}", i)))
        .collect()
}

/// 典型的两步表单：个人信息 + 问答
pub fn two_step_form() -> Vec<Vec<RawField>> {
    vec![
        vec![
            text_field("firstName", 0, "First Name*", true),
            text_field("lastName", 1, "Last Name*", true),
            text_field("email", 2, "Email Address", true),
            select_field("country", 3, "Country", &["Select One", "United States", "United Kingdom"], true),
        ],
        vec![
            select_field("authorized", 0, "Are you legally authorized to work?", &["Yes", "No"], true),
            checkbox_field("terms", 1, "I agree to the terms"),
        ],
    ]
}
