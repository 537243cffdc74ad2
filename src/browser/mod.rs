//! 浏览器启动 / 连接
//!
//! 配置了调试端口时连接已有浏览器，否则新启动一个。

pub mod connection;
pub mod launch;

pub use connection::connect_to_browser;
pub use launch::launch_browser;

use anyhow::Result;
use chromiumoxide::Handler;
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::infrastructure::ChromiumDriver;

/// 按配置得到浏览器驱动
pub async fn open_driver(config: &Config) -> Result<ChromiumDriver> {
    let browser = match config.browser_debug_port {
        Some(port) => connect_to_browser(port).await?,
        None => launch_browser(config.headless, config.chrome_executable.as_deref()).await?,
    };
    Ok(ChromiumDriver::new(browser, config.navigation_timeout()))
}

/// 在后台驱动 CDP 事件循环，稍等浏览器状态同步后返回
async fn spawn_event_loop(mut handler: Handler) {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                warn!("浏览器事件循环结束: {}", e);
                break;
            }
        }
        debug!("浏览器连接已断开");
    });
    tokio::time::sleep(Duration::from_millis(300)).await;
}
