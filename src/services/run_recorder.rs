//! 运行记录 - 业务能力层
//!
//! 只负责"把一次申请写成文件"的能力，不关心流程
//!
//! 目录结构：
//! ```text
//! logs/run_20250101_120000/
//!   batch.log
//!   batch_summary.json
//!   001_acme/
//!     extracted_elements.json
//!     filled_elements.json
//!     timing_profile.json
//!     result.json
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::models::ApplicationResult;
use crate::orchestrator::BatchStats;

/// 单个记录文件的外层结构：按公司和运行时间标识
#[derive(Debug, Serialize)]
struct Envelope<'a, T: Serialize> {
    company: &'a str,
    job_index: usize,
    run_timestamp: String,
    data: &'a T,
}

/// 运行记录器
///
/// 职责：
/// - 为一次批量运行创建独立目录
/// - 每个岗位写一组记录（提取、填写、计时、结果）
/// - 批量结束时写统计汇总
#[derive(Debug, Clone)]
pub struct RunRecorder {
    run_dir: PathBuf,
    run_timestamp: String,
}

impl RunRecorder {
    /// 在 `logs_dir` 下按时间创建本次运行的目录
    pub fn create(logs_dir: &Path) -> Result<Self> {
        Self::create_at(logs_dir, Local::now())
    }

    pub fn create_at(logs_dir: &Path, started: DateTime<Local>) -> Result<Self> {
        let run_timestamp = started.format("%Y%m%d_%H%M%S").to_string();
        let run_dir = logs_dir.join(format!("run_{}", run_timestamp));
        std::fs::create_dir_all(&run_dir)
            .with_context(|| format!("无法创建运行目录: {}", run_dir.display()))?;
        Ok(Self {
            run_dir,
            run_timestamp,
        })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn batch_log_path(&self) -> PathBuf {
        self.run_dir.join("batch.log")
    }

    /// 某个岗位的记录目录
    pub fn job_dir(&self, result: &ApplicationResult) -> PathBuf {
        self.run_dir.join(result.job.file_stem())
    }

    /// 写入一个岗位的全部记录
    ///
    /// # 返回
    /// 返回岗位记录目录
    pub async fn persist(&self, result: &ApplicationResult) -> Result<PathBuf> {
        let dir = self.job_dir(result);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("无法创建岗位目录: {}", dir.display()))?;

        self.write_record(&dir, "extracted_elements.json", result, &result.extracted)
            .await?;
        self.write_record(&dir, "filled_elements.json", result, &result.filled)
            .await?;
        self.write_record(&dir, "timing_profile.json", result, &result.timing)
            .await?;
        self.write_record(&dir, "result.json", result, result).await?;

        debug!("[岗位 {}] 记录已写入 {}", result.job.index, dir.display());
        Ok(dir)
    }

    /// 写入批量统计汇总
    pub async fn write_batch_summary(&self, stats: &BatchStats) -> Result<PathBuf> {
        let path = self.run_dir.join("batch_summary.json");
        #[derive(Serialize)]
        struct Summary<'a> {
            run_timestamp: &'a str,
            success_rate: f64,
            #[serde(flatten)]
            stats: &'a BatchStats,
        }
        let body = serde_json::to_string_pretty(&Summary {
            run_timestamp: &self.run_timestamp,
            success_rate: stats.success_rate(),
            stats,
        })?;
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("无法写入统计汇总: {}", path.display()))?;
        Ok(path)
    }

    async fn write_record<T: Serialize>(
        &self,
        dir: &Path,
        file_name: &str,
        result: &ApplicationResult,
        data: &T,
    ) -> Result<()> {
        let envelope = Envelope {
            company: &result.job.company_label,
            job_index: result.job.index,
            run_timestamp: self.run_timestamp.clone(),
            data,
        };
        let path = dir.join(file_name);
        let body = serde_json::to_string_pretty(&envelope)?;
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("无法写入 {}", path.display()))?;
        Ok(())
    }
}
