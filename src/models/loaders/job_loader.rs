use crate::models::JobTarget;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

/// 岗位列表文件中的一项
///
/// 文件是 JSON 数组，没有 `url` 的项会被忽略。
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JobEntry {
    url: Option<String>,
    company: Option<String>,
    company_label: Option<String>,
}

/// 从 JSON 文件加载岗位列表
pub async fn load_jobs(path: &Path) -> Result<Vec<JobTarget>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取岗位列表: {}", path.display()))?;

    let jobs = parse_jobs(&content).with_context(|| format!("无法解析岗位列表: {}", path.display()))?;

    tracing::info!("从 {} 加载了 {} 个岗位", path.display(), jobs.len());
    Ok(jobs)
}

/// 解析岗位列表，序号从 1 开始连续编号
pub fn parse_jobs(content: &str) -> Result<Vec<JobTarget>> {
    let entries: Vec<JobEntry> = serde_json::from_str(content)?;

    let jobs = entries
        .into_iter()
        .filter_map(|entry| {
            let url = entry.url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())?;
            Some((url, entry.company_label.or(entry.company)))
        })
        .enumerate()
        .map(|(i, (url, label))| {
            let index = i + 1;
            let label = label
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| format!("batch_job_{}", index));
            JobTarget::new(index, url, label)
        })
        .collect();

    Ok(jobs)
}

/// 取出 `[start, start + count)` 区间
///
/// `start` 超出范围时夹到最后一个；`count` 为 `None` 或 0 时取剩余全部，
/// 超出剩余长度时截断。
pub fn select_range(jobs: &[JobTarget], start: usize, count: Option<usize>) -> Vec<JobTarget> {
    if jobs.is_empty() {
        return Vec::new();
    }
    let start = start.min(jobs.len() - 1);
    let remaining = jobs.len() - start;
    let count = match count {
        Some(n) if n > 0 => n.min(remaining),
        _ => remaining,
    };
    jobs[start..start + count].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOBS: &str = r#"[
        {"url": "https://a.wd5.myworkdayjobs.com/job/1/apply", "company": "alpha"},
        {"title": "no url here"},
        {"url": "https://b.wd1.myworkdayjobs.com/job/2/apply"},
        {"url": "  "},
        {"url": "https://c.wd3.myworkdayjobs.com/job/3/apply", "company_label": "gamma"}
    ]"#;

    #[test]
    fn test_parse_jobs_skips_entries_without_url() {
        let jobs = parse_jobs(JOBS).unwrap();
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[0].index, 1);
        assert_eq!(jobs[0].company_label, "alpha");
        assert_eq!(jobs[1].index, 2);
        assert_eq!(jobs[1].company_label, "batch_job_2");
        assert_eq!(jobs[2].company_label, "gamma");
    }

    #[test]
    fn test_select_range_clamps() {
        let jobs = parse_jobs(JOBS).unwrap();
        assert_eq!(select_range(&jobs, 1, Some(1))[0].index, 2);
        assert_eq!(select_range(&jobs, 1, None).len(), 2);
        assert_eq!(select_range(&jobs, 1, Some(10)).len(), 2);
        assert_eq!(select_range(&jobs, 99, Some(0)).len(), 1);
        assert!(select_range(&[], 0, None).is_empty());
    }

    #[tokio::test]
    async fn test_load_jobs_missing_file() {
        let result = load_jobs(Path::new("does/not/exist.json")).await;
        assert!(result.is_err());
    }
}
