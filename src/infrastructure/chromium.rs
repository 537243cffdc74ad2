//! 基于 chromiumoxide 的浏览器能力实现
//!
//! `ChromiumDriver` 持有唯一的 `Browser`，每个岗位 `open` 一个新标签页；
//! `ChromiumSession` 通过 `JsExecutor` 操作这个标签页。

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::Browser;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::BrowserError;
use crate::infrastructure::browser::{BrowserDriver, PageAction, PageSession, PageSnapshot, RawField};
use crate::infrastructure::dom_scripts::{self, with_prelude};
use crate::infrastructure::js_executor::JsExecutor;
use crate::models::FillValue;

/// 点击操作后等待页面稳定的时间
const SETTLE_AFTER_CLICK: Duration = Duration::from_millis(1500);

/// chromiumoxide 浏览器驱动
pub struct ChromiumDriver {
    browser: Mutex<Browser>,
    navigation_timeout: Duration,
}

impl ChromiumDriver {
    pub fn new(browser: Browser, navigation_timeout: Duration) -> Self {
        Self {
            browser: Mutex::new(browser),
            navigation_timeout,
        }
    }

    /// 关闭浏览器（连接模式下只断开连接）
    pub async fn shutdown(&self) -> Result<(), BrowserError> {
        let mut browser = self.browser.lock().await;
        browser.close().await?;
        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn open(&self, url: &str) -> Result<Box<dyn PageSession>, BrowserError> {
        let page = {
            let browser = self.browser.lock().await;
            browser.new_page("about:blank").await?
        };

        let navigation = tokio::time::timeout(self.navigation_timeout, page.goto(url)).await;
        let failure = match navigation {
            Ok(Ok(_)) => None,
            Ok(Err(e)) => Some(BrowserError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Some(BrowserError::NavigationTimeout {
                url: url.to_string(),
                secs: self.navigation_timeout.as_secs(),
            }),
        };

        if let Some(err) = failure {
            // 失败时不留下打开的页面
            if let Err(close_err) = page.close().await {
                debug!("关闭失败页面出错: {}", close_err);
            }
            return Err(err);
        }

        debug!("已导航到: {}", url);
        Ok(Box::new(ChromiumSession::new(JsExecutor::new(page))))
    }
}

/// 单个标签页会话
pub struct ChromiumSession {
    executor: JsExecutor,
    closed: AtomicBool,
}

impl ChromiumSession {
    pub fn new(executor: JsExecutor) -> Self {
        Self {
            executor,
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<(), BrowserError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(BrowserError::Closed)
        } else {
            Ok(())
        }
    }

    async fn upload(&self, field_id: &str, path: &std::path::Path) -> Result<(), BrowserError> {
        let index: Option<usize> = self
            .executor
            .call(&with_prelude(dom_scripts::FILE_INPUT_INDEX), &json!({ "key": field_id }))
            .await?;
        let index = index.ok_or_else(|| BrowserError::ElementNotFound(field_id.to_string()))?;

        let inputs = self.executor.page().find_elements("input[type=\"file\"]").await?;
        let input = inputs
            .get(index)
            .ok_or_else(|| BrowserError::ElementNotFound(field_id.to_string()))?;

        let params = SetFileInputFilesParams::builder()
            .files(vec![path.to_string_lossy().to_string()])
            .backend_node_id(input.backend_node_id)
            .build()
            .map_err(BrowserError::Script)?;
        self.executor.page().execute(params).await?;
        sleep(SETTLE_AFTER_CLICK).await;
        Ok(())
    }
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn current_url(&self) -> Result<String, BrowserError> {
        self.ensure_open()?;
        Ok(self.executor.page().url().await?.unwrap_or_default())
    }

    async fn query_fields(&self, _step: usize) -> Result<Option<Vec<RawField>>, BrowserError> {
        self.ensure_open()?;
        self.executor
            .call(&with_prelude(dom_scripts::QUERY_FIELDS), &json!({}))
            .await
    }

    async fn write(&self, field_id: &str, value: &FillValue) -> Result<(), BrowserError> {
        self.ensure_open()?;
        let args = match value {
            FillValue::File(path) => return self.upload(field_id, path).await,
            FillValue::Text(text) => json!({ "key": field_id, "text": text, "flag": null }),
            FillValue::Flag(flag) => json!({
                "key": field_id,
                "text": if *flag { "Yes" } else { "No" },
                "flag": flag,
            }),
        };
        let found: bool = self
            .executor
            .call(&with_prelude(dom_scripts::WRITE_VALUE), &args)
            .await?;
        if found {
            Ok(())
        } else {
            Err(BrowserError::ElementNotFound(field_id.to_string()))
        }
    }

    async fn read_value(&self, field_id: &str) -> Result<Option<String>, BrowserError> {
        self.ensure_open()?;
        self.executor
            .call(&with_prelude(dom_scripts::READ_VALUE), &json!({ "key": field_id }))
            .await
    }

    async fn click(&self, action: PageAction) -> Result<bool, BrowserError> {
        self.ensure_open()?;
        let clicked: bool = self
            .executor
            .call(&with_prelude(dom_scripts::CLICK_ACTION), &json!({ "action": action }))
            .await?;
        if clicked {
            sleep(SETTLE_AFTER_CLICK).await;
        }
        Ok(clicked)
    }

    async fn inspect(&self) -> Result<PageSnapshot, BrowserError> {
        self.ensure_open()?;
        self.executor
            .call(&with_prelude(dom_scripts::INSPECT), &json!({}))
            .await
    }

    async fn close(&self) -> Result<(), BrowserError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Err(e) = self.executor.page().clone().close().await {
            warn!("关闭标签页失败: {}", e);
            return Err(e.into());
        }
        Ok(())
    }
}
