//! 输入框填写 - 业务能力层
//!
//! 填写顺序：聚焦 → 全选删除 → 逐字输入 → 确认键 → 回读校验。
//! 回读不符时改为直接注入值并派发事件，再校验一次。
//! 逐字输入是为了绕过会吞掉快速粘贴的 JS 输入掩码。

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::Timings;
use crate::infrastructure::{BrowsingSession, Key};
use crate::services::selector_resolver::{Resolution, SelectorCandidates, SelectorResolver};

/// 填写方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillPath {
    /// 逐字输入后校验通过
    Typed,
    /// 逐字输入校验失败，注入后校验通过
    Injected,
    /// 未做校验（登录框）
    Unverified,
}

/// 填写结果；不抛错，由调用方决定是否致命
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    Filled { via: FillPath, index: usize },
    NotFilled,
}

impl FillOutcome {
    pub fn is_filled(&self) -> bool {
        matches!(self, FillOutcome::Filled { .. })
    }
}

/// 单个候选上的尝试结果
enum Attempt {
    Filled(FillPath),
    /// 两条路径都没让值生效
    Rejected(String),
}

/// 输入框填写服务
pub struct FieldFiller {
    resolver: SelectorResolver,
    candidate_timeout: Duration,
    focus: Duration,
    clear: Duration,
    keystroke: Duration,
    before_confirm: Duration,
    after_confirm: Duration,
    inject_settle: Duration,
}

impl FieldFiller {
    pub fn new(timings: &Timings) -> Self {
        Self {
            resolver: SelectorResolver::new(Timings::ms(timings.poll_interval_ms)),
            candidate_timeout: Timings::ms(timings.field_candidate_timeout_ms),
            focus: Timings::ms(timings.focus_ms),
            clear: Timings::ms(timings.clear_ms),
            keystroke: Timings::ms(timings.keystroke_ms),
            before_confirm: Timings::ms(timings.before_confirm_ms),
            after_confirm: Timings::ms(timings.after_confirm_ms),
            inject_settle: Timings::ms(timings.inject_settle_ms),
        }
    }

    /// 填写并校验
    ///
    /// 一个候选上驱动出错或两条路径都校验失败时，继续尝试后面的候选。
    pub async fn fill<S: BrowsingSession>(
        &self,
        session: &S,
        candidates: &SelectorCandidates,
        value: &str,
        confirm: Key,
    ) -> FillOutcome {
        let mut start = 0;
        while let Resolution::Found(found) = self
            .resolver
            .resolve_from(session, candidates, start, self.candidate_timeout)
            .await
        {
            match self.attempt(session, &found.handle, value, confirm).await {
                Ok(Attempt::Filled(via)) => {
                    return FillOutcome::Filled {
                        via,
                        index: found.index,
                    }
                }
                Ok(Attempt::Rejected(current)) => {
                    warn!(
                        "{} 第 {} 个候选校验失败: 期望包含 '{}', 实际 '{}'",
                        candidates.role,
                        found.index + 1,
                        value,
                        current
                    );
                }
                Err(e) => {
                    debug!(
                        "{} 第 {} 个候选无法操作: {}",
                        candidates.role,
                        found.index + 1,
                        e
                    );
                }
            }
            start = found.index + 1;
        }

        FillOutcome::NotFilled
    }

    /// 只输入，不校验（登录框）
    ///
    /// 输入和确认键都成功即视为已填写。
    pub async fn fill_unverified<S: BrowsingSession>(
        &self,
        session: &S,
        candidates: &SelectorCandidates,
        value: &str,
        confirm: Key,
    ) -> FillOutcome {
        let mut start = 0;
        while let Resolution::Found(found) = self
            .resolver
            .resolve_from(session, candidates, start, self.candidate_timeout)
            .await
        {
            match self.enter(session, &found.handle, value, confirm).await {
                Ok(()) => {
                    return FillOutcome::Filled {
                        via: FillPath::Unverified,
                        index: found.index,
                    }
                }
                Err(e) => debug!(
                    "{} 第 {} 个候选无法输入: {}",
                    candidates.role,
                    found.index + 1,
                    e
                ),
            }
            start = found.index + 1;
        }

        FillOutcome::NotFilled
    }

    async fn attempt<S: BrowsingSession>(
        &self,
        session: &S,
        handle: &S::Handle,
        value: &str,
        confirm: Key,
    ) -> anyhow::Result<Attempt> {
        self.enter(session, handle, value, confirm).await?;
        sleep(self.after_confirm).await;

        let current = session.read_value(handle).await?;
        if current.contains(value) {
            return Ok(Attempt::Filled(FillPath::Typed));
        }
        debug!("逐字输入未生效 (当前值 '{}')，改为直接注入", current);

        session.inject_value(handle, value).await?;
        sleep(self.inject_settle).await;

        let current = session.read_value(handle).await?;
        if current.contains(value) {
            Ok(Attempt::Filled(FillPath::Injected))
        } else {
            Ok(Attempt::Rejected(current))
        }
    }

    /// 聚焦、清空、逐字输入、确认
    async fn enter<S: BrowsingSession>(
        &self,
        session: &S,
        handle: &S::Handle,
        value: &str,
        confirm: Key,
    ) -> anyhow::Result<()> {
        session.focus(handle).await?;
        sleep(self.focus).await;

        session.press_key(handle, Key::SelectAll).await?;
        session.press_key(handle, Key::Delete).await?;
        sleep(self.clear).await;

        let mut buf = [0u8; 4];
        for ch in value.chars() {
            session.type_text(handle, ch.encode_utf8(&mut buf)).await?;
            sleep(self.keystroke).await;
        }

        sleep(self.before_confirm).await;
        session.press_key(handle, confirm).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::fake_session::{FakeElement, FakeSession};
    use crate::infrastructure::Locator;

    fn date_candidates() -> SelectorCandidates {
        SelectorCandidates::new(
            "开始时间输入框",
            vec![
                Locator::css(r#"input[placeholder*="開始時間"]"#),
                Locator::css(r#"input[placeholder*="开始时间"]"#),
                Locator::css(r#"input[type="text"]"#),
            ],
        )
    }

    fn filler() -> FieldFiller {
        FieldFiller::new(&Timings::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_typed_entry_replaces_previous_value() {
        let target = Locator::css(r#"input[placeholder*="開始時間"]"#);
        let mut element = FakeElement::input();
        element.value = "2020-01-01".to_string();
        let session = FakeSession::new().with(target.clone(), element);

        let outcome = filler()
            .fill(&session, &date_candidates(), "2024-05-01", Key::Enter)
            .await;

        assert_eq!(
            outcome,
            FillOutcome::Filled {
                via: FillPath::Typed,
                index: 0
            }
        );
        assert_eq!(session.value_of(&target), "2024-05-01");
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_last_candidate_matches() {
        let last = Locator::css(r#"input[type="text"]"#);
        let session = FakeSession::new().with(last.clone(), FakeElement::input());

        let outcome = filler()
            .fill(&session, &date_candidates(), "2024-05-01", Key::Enter)
            .await;

        assert_eq!(
            outcome,
            FillOutcome::Filled {
                via: FillPath::Typed,
                index: 2
            }
        );
        assert_eq!(session.value_of(&last), "2024-05-01");
    }

    #[tokio::test(start_paused = true)]
    async fn test_injection_fallback_reports_filled() {
        let target = Locator::css(r#"input[placeholder*="开始时间"]"#);
        let session = FakeSession::new().with(target.clone(), FakeElement::masked_input());

        let outcome = filler()
            .fill(&session, &date_candidates(), "2024-05-01", Key::Enter)
            .await;

        assert_eq!(
            outcome,
            FillOutcome::Filled {
                via: FillPath::Injected,
                index: 1
            }
        );
        assert_eq!(session.value_of(&target), "2024-05-01");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_on_every_path_is_not_filled() {
        let session = FakeSession::new().with(
            Locator::css(r#"input[placeholder*="開始時間"]"#),
            FakeElement::input().rejecting("2024-05-01"),
        );

        let outcome = filler()
            .fill(&session, &date_candidates(), "2024-05-01", Key::Enter)
            .await;

        assert_eq!(outcome, FillOutcome::NotFilled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejecting_candidate_falls_through_to_next() {
        let fallback = Locator::css(r#"input[type="text"]"#);
        let session = FakeSession::new()
            .with(
                Locator::css(r#"input[placeholder*="開始時間"]"#),
                FakeElement::input().rejecting("2024-05-01"),
            )
            .with(fallback.clone(), FakeElement::input());

        let outcome = filler()
            .fill(&session, &date_candidates(), "2024-05-01", Key::Enter)
            .await;

        assert_eq!(
            outcome,
            FillOutcome::Filled {
                via: FillPath::Typed,
                index: 2
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unverified_fill_skips_readback() {
        let target = Locator::css(r#"input[type="text"]"#);
        let session = FakeSession::new().with(target.clone(), FakeElement::masked_input());

        let outcome = filler()
            .fill_unverified(&session, &date_candidates(), "operator", Key::Tab)
            .await;

        assert_eq!(
            outcome,
            FillOutcome::Filled {
                via: FillPath::Unverified,
                index: 2
            }
        );
        // 输入被掩码吞掉，但不校验
        assert_eq!(session.value_of(&target), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_field_is_not_filled() {
        let session = FakeSession::new();
        let outcome = filler()
            .fill(&session, &date_candidates(), "2024-05-01", Key::Enter)
            .await;
        assert!(!outcome.is_filled());
    }
}
