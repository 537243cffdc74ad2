/// 日志工具模块
///
/// 批量运行的横幅日志和日志文件头
use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::orchestrator::BatchStats;

/// 初始化批量日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &Path) -> Result<()> {
    let log_header = format!(
        "{}\n批量申请日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    std::fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(max_concurrent: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 并发申请模式");
    info!("📊 最大并发数: {}", max_concurrent);
    info!("{}", "=".repeat(60));
}

/// 记录岗位加载信息
///
/// # 参数
/// - `selected`: 本次要处理的岗位数
/// - `total`: 岗位列表总数
/// - `start`: 起始岗位序号（从 1 开始）
pub fn log_jobs_loaded(selected: usize, total: usize, start: usize) {
    info!("✓ 岗位列表共 {} 个，本次处理 {} 个", total, selected);
    info!("📋 从第 {} 个岗位开始", start);
    info!("💡 按 Ctrl+C 可随时中断并查看统计\n");
}

/// 打印最终统计信息
pub fn print_final_stats(stats: &BatchStats, summary_path: Option<&Path>) {
    info!("\n{}", "=".repeat(60));
    info!("📊 批量申请统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("📨 已处理: {}", stats.attempted);
    info!("✅ 成功提交: {}", stats.succeeded);
    info!("🟡 部分完成: {}", stats.partial);
    info!("❌ 失败: {}", stats.failed);
    info!("🔒 需要登录（跳过）: {}", stats.skipped);
    if stats.cancelled > 0 {
        info!("⏹️ 中断: {}", stats.cancelled);
    }
    info!("📈 提交率: {:.1}%", stats.success_rate() * 100.0);
    info!("{}", "=".repeat(60));
    if let Some(path) = summary_path {
        info!("\n统计已保存至: {}", path.display());
    }
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("abcdef", 3), "abc...");
        assert_eq!(truncate_text("abc", 3), "abc");
        assert_eq!(truncate_text("名字名字", 2), "名字...");
    }
}
