use anyhow::{Context, Result};
use chromiumoxide::Browser;
use tracing::{debug, info};

use super::spawn_event_loop;

/// 连接到已经打开的浏览器（远程调试端口）
///
/// 用户手动登录过 Workday 的浏览器可以直接复用会话。
pub async fn connect_to_browser(port: u16) -> Result<Browser> {
    let browser_url = format!("http://localhost:{}", port);
    info!("🔌 连接到浏览器: {}", browser_url);

    let (browser, handler) = Browser::connect(&browser_url)
        .await
        .with_context(|| format!("无法连接到 {}，确认浏览器带 --remote-debugging-port={} 启动", browser_url, port))?;
    spawn_event_loop(handler).await;

    let existing = browser.pages().await.context("读取已有页面失败")?;
    debug!("浏览器中已有 {} 个页面（不会被改动）", existing.len());

    Ok(browser)
}
