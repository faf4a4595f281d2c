//! 单个设备的查询与导出 - 流程层
//!
//! 状态机：
//! `Start → ModeSelected → DatesFilled → SerialFilled → QuerySubmitted → Done`
//!
//! - 模式选择、日期填写失败只记录，继续往下走
//! - 设备号、查询按钮失败则该设备结束
//! - 找不到导出按钮视为"无数据"
//! - 每次状态转换和每个宽限期之前都检查取消；导出点击之后的等待除外

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Timings;
use crate::infrastructure::{BrowsingSession, Key};
use crate::models::{ItemOutcome, JobConfig, Stage};
use crate::services::{
    FieldFiller, FillOutcome, ProgressSink, Resolution, SelectorCandidates, SelectorResolver,
};
use crate::workflow::item_ctx::ItemCtx;
use crate::workflow::pacing::{pause, settle, Cancelled};
use crate::workflow::selectors;

#[derive(Debug)]
enum ItemState {
    Start,
    ModeSelected,
    DatesFilled,
    SerialFilled,
    QuerySubmitted,
    Done(ItemOutcome),
}

pub struct ItemQueryStep {
    filler: FieldFiller,
    resolver: SelectorResolver,
    timings: Timings,
}

impl ItemQueryStep {
    pub fn new(timings: &Timings) -> Self {
        Self {
            filler: FieldFiller::new(timings),
            resolver: SelectorResolver::new(Timings::ms(timings.poll_interval_ms)),
            timings: timings.clone(),
        }
    }

    /// 处理一个设备号，从不返回错误
    pub async fn run<S: BrowsingSession>(
        &self,
        session: &S,
        ctx: &ItemCtx,
        config: &JobConfig,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> ItemOutcome {
        let mut state = ItemState::Start;
        loop {
            if let ItemState::Done(outcome) = state {
                return outcome;
            }
            if cancel.is_cancelled() {
                return cancelled_outcome();
            }

            debug!("{} 状态: {:?}", ctx, state);
            state = match self.advance(state, session, ctx, config, sink, cancel).await {
                Ok(next) => next,
                Err(Cancelled) => return cancelled_outcome(),
            };
        }
    }

    async fn advance<S: BrowsingSession>(
        &self,
        state: ItemState,
        session: &S,
        ctx: &ItemCtx,
        config: &JobConfig,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<ItemState, Cancelled> {
        let t = &self.timings;
        let next = match state {
            ItemState::Start => {
                sink.log_message(&format!("正在处理设备号: {}", ctx.serial));
                sink.log_message(&format!(
                    "  日期范围: {} 至 {}",
                    config.start_date_str(),
                    config.end_date_str()
                ));

                settle(
                    session,
                    cancel,
                    Timings::ms(t.settle_timeout_ms),
                    Timings::ms(t.poll_interval_ms),
                )
                .await?;
                pause(cancel, Timings::ms(t.item_settle_grace_ms)).await?;

                let mode = selectors::realtime_mode();
                match self.click_first(session, &mode, Timings::ms(t.candidate_timeout_ms)).await {
                    Some(_) => sink.log_message("  ✓ 已选择 實時值"),
                    None => {
                        warn!("{} 无法选择 實時值，继续", ctx);
                        sink.log_message("  ⚠️ 无法选择 實時值，继续执行...");
                    }
                }
                pause(cancel, Timings::ms(t.after_field_ms)).await?;
                ItemState::ModeSelected
            }

            ItemState::ModeSelected => {
                let start = config.start_date_str();
                self.fill_date(session, &selectors::start_date_field(), &start, "开始日期", sink)
                    .await;
                pause(cancel, Timings::ms(t.after_field_ms)).await?;

                if cancel.is_cancelled() {
                    return Err(Cancelled);
                }

                let end = config.end_date_str();
                self.fill_date(session, &selectors::end_date_field(), &end, "结束日期", sink)
                    .await;
                pause(cancel, Timings::ms(t.after_field_ms)).await?;
                ItemState::DatesFilled
            }

            ItemState::DatesFilled => {
                let filled = self
                    .filler
                    .fill(session, &selectors::serial_field(), &ctx.serial, Key::Enter)
                    .await;
                if let FillOutcome::NotFilled = filled {
                    sink.log_message(&format!("  ❌ 无法填写设备号: {}", ctx.serial));
                    return Ok(ItemState::Done(ItemOutcome::failure(
                        Stage::Serial,
                        format!("无法填写设备号 {}", ctx.serial),
                    )));
                }
                sink.log_message(&format!("  ✓ 已填写设备号: {}", ctx.serial));
                pause(cancel, Timings::ms(t.after_serial_ms)).await?;
                ItemState::SerialFilled
            }

            ItemState::SerialFilled => {
                let query = selectors::query_button();
                if self
                    .click_first(session, &query, Timings::ms(t.candidate_timeout_ms))
                    .await
                    .is_none()
                {
                    sink.log_message("  ❌ 无法点击查询按钮");
                    return Ok(ItemState::Done(ItemOutcome::failure(
                        Stage::Query,
                        "无法点击查询按钮",
                    )));
                }
                sink.log_message("  ✓ 已点击查询");
                sink.log_message("  ⏳ 等待查询结果...");
                pause(cancel, Timings::ms(t.results_grace_ms)).await?;
                ItemState::QuerySubmitted
            }

            ItemState::QuerySubmitted => {
                let export = selectors::export_button();
                match self
                    .click_first(session, &export, Timings::ms(t.export_candidate_timeout_ms))
                    .await
                {
                    Some(_) => {
                        sink.log_message(&format!("  📥 已开始导出: {}", ctx.serial));
                        // 导出已点击，取消只缩短等待，结果仍算成功
                        if pause(cancel, Timings::ms(t.download_start_grace_ms)).await.is_err() {
                            debug!("{} 等待下载开始时运行被取消", ctx);
                        }
                        info!("{} ✓ 导出完成", ctx);
                        ItemState::Done(ItemOutcome::Success)
                    }
                    None => {
                        sink.log_message(&format!(
                            "  ⚠️ 设备 {} 没有数据或找不到导出按钮",
                            ctx.serial
                        ));
                        ItemState::Done(ItemOutcome::NoData)
                    }
                }
            }

            ItemState::Done(outcome) => ItemState::Done(outcome),
        };
        Ok(next)
    }

    async fn fill_date<S: BrowsingSession>(
        &self,
        session: &S,
        candidates: &SelectorCandidates,
        value: &str,
        label: &str,
        sink: &dyn ProgressSink,
    ) {
        match self.filler.fill(session, candidates, value, Key::Enter).await {
            FillOutcome::Filled { .. } => sink.log_message(&format!("  ✓ 已填写{}: {}", label, value)),
            FillOutcome::NotFilled => sink.log_message(&format!("  ❌ 无法填写{}: {}", label, value)),
        }
    }

    /// 点击第一个可点击的候选，返回其序号
    ///
    /// 找到但点击失败时继续尝试后面的候选。
    async fn click_first<S: BrowsingSession>(
        &self,
        session: &S,
        candidates: &SelectorCandidates,
        timeout: Duration,
    ) -> Option<usize> {
        let mut start = 0;
        while let Resolution::Found(found) = self
            .resolver
            .resolve_from(session, candidates, start, timeout)
            .await
        {
            match session.click(&found.handle).await {
                Ok(()) => return Some(found.index),
                Err(e) => debug!(
                    "{} 第 {} 个候选点击失败: {}",
                    candidates.role,
                    found.index + 1,
                    e
                ),
            }
            start = found.index + 1;
        }
        None
    }
}

fn cancelled_outcome() -> ItemOutcome {
    ItemOutcome::failure(Stage::Cancelled, "运行已取消")
}
