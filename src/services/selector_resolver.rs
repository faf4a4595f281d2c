//! 选择器解析 - 业务能力层
//!
//! 门户在不同小版本之间属性、语言（繁/简）都不一致，只能按优先级
//! 逐个尝试候选定位器，第一个命中者胜出。

use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::infrastructure::{BrowsingSession, Locator};

/// 某个逻辑元素的候选定位器（按优先级排列）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorCandidates {
    /// 逻辑角色，例如 "开始时间输入框"
    pub role: &'static str,
    pub locators: Vec<Locator>,
}

impl SelectorCandidates {
    pub fn new(role: &'static str, locators: Vec<Locator>) -> Self {
        Self { role, locators }
    }
}

/// 命中结果
#[derive(Debug)]
pub struct Found<H> {
    pub handle: H,
    /// 命中的候选序号（从 0 开始）
    pub index: usize,
}

/// 解析结果；从不抛错，调用方必须显式处理 `NotFound`
#[derive(Debug)]
pub enum Resolution<H> {
    Found(Found<H>),
    NotFound,
}

impl<H> Resolution<H> {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }
}

/// 选择器解析器
#[derive(Debug, Clone, Copy)]
pub struct SelectorResolver {
    poll_interval: Duration,
}

impl SelectorResolver {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// 依次尝试所有候选
    pub async fn resolve<S: BrowsingSession>(
        &self,
        session: &S,
        candidates: &SelectorCandidates,
        timeout_per_candidate: Duration,
    ) -> Resolution<S::Handle> {
        self.resolve_from(session, candidates, 0, timeout_per_candidate)
            .await
    }

    /// 从第 `start` 个候选开始尝试（前面的候选已被调用方排除）
    pub async fn resolve_from<S: BrowsingSession>(
        &self,
        session: &S,
        candidates: &SelectorCandidates,
        start: usize,
        timeout_per_candidate: Duration,
    ) -> Resolution<S::Handle> {
        for (index, locator) in candidates.locators.iter().enumerate().skip(start) {
            if let Some(handle) = self
                .wait_for(session, locator, timeout_per_candidate)
                .await
            {
                debug!(
                    "{} 命中第 {}/{} 个候选: {}",
                    candidates.role,
                    index + 1,
                    candidates.locators.len(),
                    locator
                );
                return Resolution::Found(Found { handle, index });
            }
        }

        debug!("{} 的 {} 个候选全部未命中", candidates.role, candidates.locators.len());
        Resolution::NotFound
    }

    /// 在限定时间内轮询单个候选
    async fn wait_for<S: BrowsingSession>(
        &self,
        session: &S,
        locator: &Locator,
        timeout: Duration,
    ) -> Option<S::Handle> {
        let deadline = Instant::now() + timeout;
        loop {
            match session.find(locator).await {
                Ok(Some(handle)) => return Some(handle),
                Ok(None) => {}
                Err(e) => {
                    debug!("候选 {} 查找出错，跳过: {}", locator, e);
                    return None;
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}
