//! 程序配置
//!
//! 优先级：命令行 > 环境变量 > 配置文件 (TOML) > 默认值

use crate::error::ConfigError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// 同时处理的岗位数上限
pub const MAX_CONCURRENCY: usize = 6;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 同时处理的岗位数量
    pub max_concurrent_jobs: usize,
    /// 从第几个岗位开始（从 0 开始）
    pub start_index: usize,
    /// 处理多少个岗位，不设置则处理剩余全部
    pub job_count: Option<usize>,
    /// 岗位列表文件
    pub jobs_file: PathBuf,
    /// 用户资料文件
    pub profile_file: PathBuf,
    /// 日志和结果输出目录
    pub logs_dir: PathBuf,
    /// 是否显示详细日志
    pub verbose_logging: bool,

    // --- 浏览器 ---
    pub headless: bool,
    /// 设置后连接已打开的浏览器，而不是新启动一个
    pub browser_debug_port: Option<u16>,
    pub chrome_executable: Option<PathBuf>,

    // --- 时限与重试 ---
    pub navigation_timeout_secs: u64,
    pub navigation_retries: u32,
    pub retry_backoff_ms: Vec<u64>,
    pub max_wizard_steps: usize,
    pub submit_confirm_timeout_secs: u64,
    pub model_timeout_secs: u64,
    pub job_timeout_secs: u64,
    pub shutdown_grace_secs: u64,

    // --- 策略 ---
    /// 必填项不完整时是否仍然提交（记为 partial）
    pub allow_partial_submit: bool,
    /// 申请页地址必须匹配的正则，不匹配视为跳转到了登录页
    pub application_url_pattern: String,

    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 3,
            start_index: 0,
            job_count: None,
            jobs_file: PathBuf::from("jobagent.jobs.json"),
            profile_file: PathBuf::from("data/user_profile.json"),
            logs_dir: PathBuf::from("logs"),
            verbose_logging: false,
            headless: true,
            browser_debug_port: None,
            chrome_executable: None,
            navigation_timeout_secs: 30,
            navigation_retries: 2,
            retry_backoff_ms: vec![1000, 2000],
            max_wizard_steps: 12,
            submit_confirm_timeout_secs: 20,
            model_timeout_secs: 30,
            job_timeout_secs: 900,
            shutdown_grace_secs: 10,
            allow_partial_submit: false,
            application_url_pattern: r"(?i)myworkdayjobs\.com/.*/apply".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o".to_string(),
        }
    }
}

impl Config {
    /// 从默认值 + 环境变量构建
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件 + 环境变量构建
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        let mut config = Self::from_toml_str(&content).map_err(|e| ConfigError::FileParseFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        env_parse("MAX_CONCURRENT_JOBS", &mut self.max_concurrent_jobs)?;
        env_parse("START_INDEX", &mut self.start_index)?;
        if let Some(count) = env_value::<usize>("JOB_COUNT")? {
            self.job_count = Some(count);
        }
        env_path("JOBS_FILE", &mut self.jobs_file);
        env_path("PROFILE_FILE", &mut self.profile_file);
        env_path("LOGS_DIR", &mut self.logs_dir);
        env_parse("VERBOSE_LOGGING", &mut self.verbose_logging)?;
        env_parse("HEADLESS", &mut self.headless)?;
        if let Some(port) = env_value::<u16>("BROWSER_DEBUG_PORT")? {
            self.browser_debug_port = Some(port);
        }
        if let Ok(path) = std::env::var("CHROME_EXECUTABLE") {
            self.chrome_executable = Some(PathBuf::from(path));
        }
        env_parse("NAVIGATION_TIMEOUT_SECS", &mut self.navigation_timeout_secs)?;
        env_parse("NAVIGATION_RETRIES", &mut self.navigation_retries)?;
        if let Ok(raw) = std::env::var("RETRY_BACKOFF_MS") {
            self.retry_backoff_ms = parse_backoff(&raw)?;
        }
        env_parse("MAX_WIZARD_STEPS", &mut self.max_wizard_steps)?;
        env_parse("SUBMIT_CONFIRM_TIMEOUT_SECS", &mut self.submit_confirm_timeout_secs)?;
        env_parse("MODEL_TIMEOUT_SECS", &mut self.model_timeout_secs)?;
        env_parse("JOB_TIMEOUT_SECS", &mut self.job_timeout_secs)?;
        env_parse("SHUTDOWN_GRACE_SECS", &mut self.shutdown_grace_secs)?;
        env_parse("ALLOW_PARTIAL_SUBMIT", &mut self.allow_partial_submit)?;
        env_string("APPLICATION_URL_PATTERN", &mut self.application_url_pattern);
        env_string("LLM_API_KEY", &mut self.llm_api_key);
        if self.llm_api_key.is_empty() {
            env_string("OPENAI_API_KEY", &mut self.llm_api_key);
        }
        env_string("LLM_API_BASE_URL", &mut self.llm_api_base_url);
        env_string("LLM_MODEL_NAME", &mut self.llm_model_name);
        Ok(())
    }

    /// 校验并夹紧取值
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.max_concurrent_jobs = self.max_concurrent_jobs.clamp(1, MAX_CONCURRENCY);
        if self.max_wizard_steps == 0 {
            return Err(ConfigError::Invalid {
                field: "max_wizard_steps".to_string(),
                message: "至少为 1".to_string(),
            });
        }
        if let Err(e) = regex::Regex::new(&self.application_url_pattern) {
            return Err(ConfigError::Invalid {
                field: "application_url_pattern".to_string(),
                message: e.to_string(),
            });
        }
        Ok(())
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn submit_confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_confirm_timeout_secs)
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

fn env_value<T: FromStr>(var_name: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            }),
        Err(_) => Ok(None),
    }
}

fn env_parse<T: FromStr>(var_name: &str, slot: &mut T) -> Result<(), ConfigError> {
    if let Some(value) = env_value(var_name)? {
        *slot = value;
    }
    Ok(())
}

fn env_string(var_name: &str, slot: &mut String) {
    if let Ok(value) = std::env::var(var_name) {
        *slot = value;
    }
}

fn env_path(var_name: &str, slot: &mut PathBuf) {
    if let Ok(value) = std::env::var(var_name) {
        *slot = PathBuf::from(value);
    }
}

/// "1000,2000" -> [1000, 2000]
fn parse_backoff(raw: &str) -> Result<Vec<u64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse().map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: "RETRY_BACKOFF_MS".to_string(),
                value: raw.to_string(),
                expected_type: "逗号分隔的毫秒数".to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_overrides_defaults() {
        let config = Config::from_toml_str(
            r#"
max_concurrent_jobs = 4
allow_partial_submit = true
retry_backoff_ms = [500]
browser_debug_port = 9222
"#,
        )
        .unwrap();
        assert_eq!(config.max_concurrent_jobs, 4);
        assert!(config.allow_partial_submit);
        assert_eq!(config.retry_backoff_ms, vec![500]);
        assert_eq!(config.browser_debug_port, Some(9222));
        assert_eq!(config.navigation_retries, 2);
    }

    #[test]
    fn test_validate_clamps_concurrency() {
        let mut config = Config {
            max_concurrent_jobs: 0,
            ..Config::default()
        };
        config.validate().unwrap();
        assert_eq!(config.max_concurrent_jobs, 1);

        config.max_concurrent_jobs = 50;
        config.validate().unwrap();
        assert_eq!(config.max_concurrent_jobs, MAX_CONCURRENCY);
    }

    #[test]
    fn test_validate_rejects_bad_pattern() {
        let mut config = Config {
            application_url_pattern: "(".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_backoff() {
        assert_eq!(parse_backoff("1000, 2000").unwrap(), vec![1000, 2000]);
        assert!(parse_backoff("fast").is_err());
    }
}
