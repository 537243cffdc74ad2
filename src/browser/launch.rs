use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chromiumoxide::{Browser, BrowserConfig};
use tracing::{debug, info};

use super::spawn_event_loop;

const LAUNCH_ARGS: [&str; 4] = [
    "--disable-gpu",
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-blink-features=AutomationControlled",
];

/// 启动一个新的浏览器
///
/// # 参数
/// - `headless`: 是否无头
/// - `chrome_executable`: 浏览器路径，不设置时由 chromiumoxide 自动查找
pub async fn launch_browser(headless: bool, chrome_executable: Option<&Path>) -> Result<Browser> {
    info!("🚀 启动{}浏览器...", if headless { "无头" } else { "有界面" });

    let mut builder = if headless {
        BrowserConfig::builder().new_headless_mode()
    } else {
        BrowserConfig::builder().with_head()
    };
    if let Some(path) = chrome_executable {
        debug!("浏览器路径: {}", path.display());
        builder = builder.chrome_executable(path);
    }

    let config = builder
        .args(LAUNCH_ARGS.to_vec())
        .build()
        .map_err(|e| anyhow!("浏览器配置无效: {}", e))?;

    let (browser, handler) = Browser::launch(config).await.context("启动浏览器失败")?;
    spawn_event_loop(handler).await;

    Ok(browser)
}
