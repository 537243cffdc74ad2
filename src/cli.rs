//! 命令行参数

use crate::config::Config;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "workday-apply", about = "批量投递 Workday 岗位申请")]
pub struct Args {
    /// TOML 配置文件
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// 同时处理的岗位数量 (1-6)
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// 从第几个岗位开始（从 1 开始）
    #[arg(short = 's', long)]
    pub start: Option<usize>,

    /// 处理多少个岗位
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// 岗位列表 JSON
    #[arg(long)]
    pub jobs: Option<PathBuf>,

    /// 用户资料 JSON / TOML
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// 有界面运行浏览器
    #[arg(long)]
    pub headed: bool,

    /// 必填项不完整时仍然提交
    #[arg(long)]
    pub allow_partial: bool,

    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// 合并配置文件 / 环境变量 / 命令行
    pub fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::from_env()?,
        };
        self.apply_to(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_to(&self, config: &mut Config) {
        if let Some(concurrency) = self.concurrency {
            config.max_concurrent_jobs = concurrency;
        }
        if let Some(start) = self.start {
            config.start_index = start.saturating_sub(1);
        }
        if let Some(count) = self.count {
            config.job_count = Some(count);
        }
        if let Some(jobs) = &self.jobs {
            config.jobs_file = jobs.clone();
        }
        if let Some(profile) = &self.profile {
            config.profile_file = profile.clone();
        }
        if self.headed {
            config.headless = false;
        }
        if self.allow_partial {
            config.allow_partial_submit = true;
        }
        if self.verbose {
            config.verbose_logging = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_start_is_one_based() {
        let args = Args::parse_from(["workday-apply", "--start", "3", "-c", "2", "-n", "5"]);
        let mut config = Config::default();
        args.apply_to(&mut config);
        assert_eq!(config.start_index, 2);
        assert_eq!(config.max_concurrent_jobs, 2);
        assert_eq!(config.job_count, Some(5));
    }
}
