//! 测试用的脚本化会话
//!
//! 页面由"定位器 → 元素"表描述；元素句柄就是定位器本身。

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::infrastructure::session::{BrowsingSession, DownloadEvent, Key, Locator};

/// 假元素
#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    pub value: String,
    /// 逐字输入是否生效（输入掩码吞字时为 false）
    pub accepts_typing: bool,
    /// 直接注入是否生效
    pub accepts_injection: bool,
    pub click_fails: bool,
    /// 点击后触发一次下载
    pub download_on_click: Option<String>,
    /// 这些值一旦完整写入就会被清掉（模拟被门户拒绝的输入）
    pub rejects: HashSet<String>,
    selected: bool,
}

impl FakeElement {
    pub fn input() -> Self {
        Self {
            accepts_typing: true,
            accepts_injection: true,
            ..Self::default()
        }
    }

    /// 输入掩码吞掉逐字输入，只能注入
    pub fn masked_input() -> Self {
        Self {
            accepts_typing: false,
            accepts_injection: true,
            ..Self::default()
        }
    }

    pub fn button() -> Self {
        Self::default()
    }

    pub fn download_button(filename: &str) -> Self {
        Self {
            download_on_click: Some(filename.to_string()),
            ..Self::default()
        }
    }

    pub fn rejecting(mut self, value: &str) -> Self {
        self.rejects.insert(value.to_string());
        self
    }

    fn settle(&mut self) {
        if self.rejects.contains(&self.value) {
            self.value.clear();
        }
    }
}

#[derive(Default)]
struct FakeState {
    elements: HashMap<Locator, FakeElement>,
    navigations: Vec<String>,
    clicks: Vec<Locator>,
    find_errors: HashSet<Locator>,
    find_panics: HashSet<Locator>,
    download_tx: Option<UnboundedSender<DownloadEvent>>,
    next_download: usize,
    persisted: Vec<(String, PathBuf)>,
    persist_failures: HashSet<String>,
    /// 点击导出时只发"开始"，不发"完成"
    hold_downloads: bool,
    navigate_fails: bool,
    closed: bool,
}

#[derive(Default)]
pub struct FakeSession {
    state: Mutex<FakeState>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, locator: Locator, element: FakeElement) -> Self {
        self.state.lock().unwrap().elements.insert(locator, element);
        self
    }

    pub fn insert(&self, locator: Locator, element: FakeElement) {
        self.state.lock().unwrap().elements.insert(locator, element);
    }

    pub fn remove(&self, locator: &Locator) {
        self.state.lock().unwrap().elements.remove(locator);
    }

    /// 该定位器的查找返回驱动错误
    pub fn with_find_error(self, locator: Locator) -> Self {
        self.state.lock().unwrap().find_errors.insert(locator);
        self
    }

    /// 查找该定位器时 panic（模拟驱动内部的意外错误）
    pub fn with_find_panic(self, locator: Locator) -> Self {
        self.state.lock().unwrap().find_panics.insert(locator);
        self
    }

    pub fn with_persist_failure(self, id: &str) -> Self {
        self.state.lock().unwrap().persist_failures.insert(id.to_string());
        self
    }

    pub fn hold_downloads(self) -> Self {
        self.state.lock().unwrap().hold_downloads = true;
        self
    }

    pub fn failing_navigation(self) -> Self {
        self.state.lock().unwrap().navigate_fails = true;
        self
    }

    /// 手动发出下载事件
    pub fn emit(&self, event: DownloadEvent) {
        if let Some(tx) = &self.state.lock().unwrap().download_tx {
            let _ = tx.send(event);
        }
    }

    pub fn value_of(&self, locator: &Locator) -> String {
        self.state.lock().unwrap().elements[locator].value.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub fn clicks(&self) -> Vec<Locator> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn click_count(&self, locator: &Locator) -> usize {
        self.state.lock().unwrap().clicks.iter().filter(|l| *l == locator).count()
    }

    pub fn persisted(&self) -> Vec<(String, PathBuf)> {
        self.state.lock().unwrap().persisted.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    fn with_element<T>(
        &self,
        locator: &Locator,
        f: impl FnOnce(&mut FakeElement) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.state.lock().unwrap();
        let element = state
            .elements
            .get_mut(locator)
            .ok_or_else(|| anyhow!("元素已从页面移除: {}", locator))?;
        f(element)
    }
}

#[async_trait]
impl BrowsingSession for FakeSession {
    type Handle = Locator;

    async fn navigate(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.navigate_fails {
            bail!("net::ERR_CONNECTION_REFUSED");
        }
        state.navigations.push(url.to_string());
        Ok(())
    }

    async fn is_ready(&self) -> Result<bool> {
        Ok(true)
    }

    async fn find(&self, locator: &Locator) -> Result<Option<Locator>> {
        let state = self.state.lock().unwrap();
        if state.find_panics.contains(locator) {
            drop(state);
            panic!("driver crashed while looking up {}", locator);
        }
        if state.find_errors.contains(locator) {
            bail!("invalid selector: {}", locator);
        }
        Ok(state.elements.contains_key(locator).then(|| locator.clone()))
    }

    async fn click(&self, handle: &Locator) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let element = state
            .elements
            .get(handle)
            .cloned()
            .ok_or_else(|| anyhow!("元素已从页面移除: {}", handle))?;
        if element.click_fails {
            bail!("element is not clickable: {}", handle);
        }
        state.clicks.push(handle.clone());

        if let Some(filename) = element.download_on_click {
            state.next_download += 1;
            let id = format!("dl-{}", state.next_download);
            let hold = state.hold_downloads;
            if let Some(tx) = &state.download_tx {
                let _ = tx.send(DownloadEvent::Started {
                    id: id.clone(),
                    suggested_filename: filename,
                    url: "https://portal.test/export".to_string(),
                });
                if !hold {
                    let _ = tx.send(DownloadEvent::Finished { id, completed: true });
                }
            }
        }
        Ok(())
    }

    async fn focus(&self, handle: &Locator) -> Result<()> {
        self.with_element(handle, |_| Ok(()))
    }

    async fn type_text(&self, handle: &Locator, text: &str) -> Result<()> {
        self.with_element(handle, |element| {
            if element.accepts_typing {
                element.value.push_str(text);
                element.settle();
            }
            Ok(())
        })
    }

    async fn press_key(&self, handle: &Locator, key: Key) -> Result<()> {
        self.with_element(handle, |element| {
            match key {
                Key::SelectAll => element.selected = true,
                Key::Delete if element.selected => {
                    element.value.clear();
                    element.selected = false;
                }
                _ => {}
            }
            Ok(())
        })
    }

    async fn read_value(&self, handle: &Locator) -> Result<String> {
        self.with_element(handle, |element| Ok(element.value.clone()))
    }

    async fn inject_value(&self, handle: &Locator, value: &str) -> Result<()> {
        self.with_element(handle, |element| {
            if element.accepts_injection {
                element.value = value.to_string();
                element.settle();
            }
            Ok(())
        })
    }

    async fn subscribe_downloads(&self) -> Result<UnboundedReceiver<DownloadEvent>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().unwrap().download_tx = Some(tx);
        Ok(rx)
    }

    async fn persist_download(&self, id: &str, dest: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.persist_failures.contains(id) {
            bail!("disk full");
        }
        state.persisted.push((id.to_string(), dest.to_path_buf()));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}
