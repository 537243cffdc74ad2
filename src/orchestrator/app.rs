//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：创建运行目录、写日志文件头、启动或连接浏览器
//! 2. **加载输入**：岗位列表（按起始位置和数量截取）、用户资料
//! 3. **组装流程**：浏览器驱动 + LLM 服务 + 运行记录 → `ApplicationFlow`
//! 4. **中断处理**：Ctrl+C 触发取消信号
//! 5. **收尾**：写统计汇总、打印统计、关闭浏览器

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::browser;
use crate::config::Config;
use crate::infrastructure::ChromiumDriver;
use crate::models::{load_jobs, load_profile, select_range};
use crate::orchestrator::batch_runner::BatchRunner;
use crate::orchestrator::stats::BatchStats;
use crate::services::{LlmService, RunRecorder};
use crate::utils::logging::{init_log_file, log_jobs_loaded, log_startup, print_final_stats};
use crate::workflow::ApplicationFlow;

/// 应用主结构
pub struct App {
    config: Config,
    driver: Arc<ChromiumDriver>,
    recorder: RunRecorder,
    cancel: CancellationToken,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        let recorder = RunRecorder::create(&config.logs_dir)?;

        // 初始化日志文件
        init_log_file(&recorder.batch_log_path())?;

        log_startup(config.max_concurrent_jobs);
        info!("📁 运行目录: {}", recorder.run_dir().display());

        // 启动或连接浏览器
        let driver = browser::open_driver(&config)
            .await
            .context("浏览器不可用")?;

        Ok(Self {
            config,
            driver: Arc::new(driver),
            recorder,
            cancel: CancellationToken::new(),
        })
    }

    /// 取消信号，触发后停止派发新岗位
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<BatchStats> {
        let all_jobs = load_jobs(&self.config.jobs_file).await?;
        let jobs = select_range(&all_jobs, self.config.start_index, self.config.job_count);

        if jobs.is_empty() {
            warn!("⚠️ 没有可处理的岗位，程序结束");
            return Ok(BatchStats::default());
        }
        let first = jobs.first().map(|j| j.index).unwrap_or(1);
        log_jobs_loaded(jobs.len(), all_jobs.len(), first);

        let profile = Arc::new(load_profile(&self.config.profile_file).await?);
        let advisor = Arc::new(LlmService::new(&self.config));
        let flow = ApplicationFlow::new(
            &self.config,
            self.driver.clone(),
            advisor,
            profile,
            Some(self.recorder.clone()),
        )?;

        // Ctrl+C → 取消
        let cancel = self.cancel.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("\n⏹️ 收到 Ctrl+C，正在停止...");
                cancel.cancel();
            }
        });

        let runner = BatchRunner::new(Arc::new(flow), self.cancel.clone(), self.config.shutdown_grace())
            .with_recorder(self.recorder.clone());
        let stats = runner.run(jobs, self.config.max_concurrent_jobs).await;
        watcher.abort();

        let summary_path = match self.recorder.write_batch_summary(&stats).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("⚠️ 写入统计汇总失败: {:#}", e);
                None
            }
        };
        print_final_stats(&stats, summary_path.as_deref());

        Ok(stats)
    }

    /// 关闭浏览器
    pub async fn shutdown(self) {
        if let Err(e) = self.driver.shutdown().await {
            warn!("关闭浏览器失败: {}", e);
        }
    }
}
