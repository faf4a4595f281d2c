//! Chrome 会话 - 基础设施层
//!
//! 持有唯一的 Browser / Page 资源，通过 DevTools 协议实现 [`BrowsingSession`]

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::{
    DownloadProgressState, EventDownloadProgress, EventDownloadWillBegin,
};
use chromiumoxide::{Browser, Element, Page};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::infrastructure::session::{BrowsingSession, DownloadEvent, Key, Locator, Query};

/// Chrome 会话
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 浏览器把下载先写入暂存目录（文件名为传输 ID）
/// - 不认识设备号 / 门户流程
pub struct ChromeSession {
    browser: Mutex<Browser>,
    page: Page,
    staging_folder: PathBuf,
    /// 自己启动的浏览器在结束时关闭；连接上的浏览器只关闭页面
    owns_browser: bool,
}

impl ChromeSession {
    pub fn new(browser: Browser, page: Page, staging_folder: PathBuf, owns_browser: bool) -> Self {
        Self {
            browser: Mutex::new(browser),
            page,
            staging_folder,
            owns_browser,
        }
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 以元素为 `this` 调用一段函数
    async fn call_on(&self, element: &Element, function_declaration: String) -> Result<()> {
        element.call_js_fn(function_declaration, false).await?;
        Ok(())
    }
}

#[async_trait]
impl BrowsingSession for ChromeSession {
    type Handle = Element;

    async fn navigate(&self, url: &str) -> Result<()> {
        debug!("导航到: {}", url);
        self.page
            .goto(url)
            .await
            .with_context(|| format!("导航到 {} 失败", url))?;
        Ok(())
    }

    async fn is_ready(&self) -> Result<bool> {
        let state: String = self.eval_as("document.readyState").await?;
        Ok(state == "complete")
    }

    async fn find(&self, locator: &Locator) -> Result<Option<Element>> {
        let found = match locator.query() {
            Query::Css(selector) => self.page.find_element(selector).await,
            Query::XPath(expr) => self.page.find_xpath(expr).await,
        };

        match found {
            Ok(element) => Ok(Some(element)),
            Err(e) => {
                // 找不到节点和选择器本身无效都走这里，交给上层换下一个候选
                debug!("查找 {} 未命中: {}", locator, e);
                Ok(None)
            }
        }
    }

    async fn click(&self, handle: &Element) -> Result<()> {
        handle.click().await?;
        Ok(())
    }

    async fn focus(&self, handle: &Element) -> Result<()> {
        handle.click().await?;
        Ok(())
    }

    async fn type_text(&self, handle: &Element, text: &str) -> Result<()> {
        handle.type_str(text).await?;
        Ok(())
    }

    async fn press_key(&self, handle: &Element, key: Key) -> Result<()> {
        match key {
            Key::SelectAll => {
                self.call_on(
                    handle,
                    "function() { if (typeof this.select === 'function') { this.select(); } }"
                        .to_string(),
                )
                .await
            }
            other => {
                handle.press_key(other.name()).await?;
                Ok(())
            }
        }
    }

    async fn read_value(&self, handle: &Element) -> Result<String> {
        let value = handle.property("value").await?;
        Ok(value
            .as_ref()
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string())
    }

    async fn inject_value(&self, handle: &Element, value: &str) -> Result<()> {
        let function = format!(
            r#"function() {{
                this.value = {};
                this.dispatchEvent(new Event('input', {{ bubbles: true }}));
                this.dispatchEvent(new Event('change', {{ bubbles: true }}));
            }}"#,
            serde_json::to_string(value)?
        );
        self.call_on(handle, function).await
    }

    async fn subscribe_downloads(&self) -> Result<UnboundedReceiver<DownloadEvent>> {
        let browser = self.browser.lock().await;
        let mut begins = browser.event_listener::<EventDownloadWillBegin>().await?;
        let mut progress = browser.event_listener::<EventDownloadProgress>().await?;
        drop(browser);

        let (tx, rx) = mpsc::unbounded_channel();

        // 在后台把 CDP 事件转换为下载事件
        tokio::spawn(async move {
            loop {
                // 已缓冲的开始事件优先，保证先登记再结束
                let event = tokio::select! {
                    biased;
                    Some(begin) = begins.next() => Some(DownloadEvent::Started {
                        id: begin.guid.clone(),
                        suggested_filename: begin.suggested_filename.clone(),
                        url: begin.url.clone(),
                    }),
                    Some(update) = progress.next() => match update.state {
                        DownloadProgressState::Completed => Some(DownloadEvent::Finished {
                            id: update.guid.clone(),
                            completed: true,
                        }),
                        DownloadProgressState::Canceled => Some(DownloadEvent::Finished {
                            id: update.guid.clone(),
                            completed: false,
                        }),
                        _ => None,
                    },
                    else => break,
                };

                if let Some(event) = event {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
            }
            debug!("下载事件转发结束");
        });

        Ok(rx)
    }

    async fn persist_download(&self, id: &str, dest: &Path) -> Result<()> {
        move_staged(&self.staging_folder.join(id), dest).await
    }

    async fn close(&self) -> Result<()> {
        if self.owns_browser {
            let mut browser = self.browser.lock().await;
            browser.close().await?;
            browser.wait().await?;
        } else if let Err(e) = self.page.clone().close().await {
            warn!("关闭页面失败: {}", e);
        }
        Ok(())
    }
}

/// 把暂存文件移动到目标路径，同名文件被覆盖
///
/// 暂存文件不存在时直接报错，不动已有的目标文件。
async fn move_staged(staged: &Path, dest: &Path) -> Result<()> {
    tokio::fs::metadata(staged)
        .await
        .with_context(|| format!("暂存文件不存在: {}", staged.display()))?;

    // rename 会直接替换同名文件
    if tokio::fs::rename(staged, dest).await.is_err() {
        // 暂存目录与目标目录不在同一文件系统时改为复制
        tokio::fs::copy(staged, dest)
            .await
            .with_context(|| format!("无法保存 {} → {}", staged.display(), dest.display()))?;
        tokio::fs::remove_file(staged).await.ok();
    }
    Ok(())
}
