//! 整次运行的编排 - 编排层
//!
//! 登录 → 导出页 → 逐个设备号 → 收尾保存下载 → 汇总。
//!
//! - 只有配置无效和登录失败会中止运行
//! - 单个设备的任何错误（包括 panic）都只记入该设备的结果
//! - 取消后未开始的设备仍会得到一条结果，结果数量始终等于设备数

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Timings;
use crate::error::{RunError, RunResult};
use crate::infrastructure::BrowsingSession;
use crate::models::{ItemOutcome, ItemResult, JobConfig, RunSummary, Stage};
use crate::services::{DownloadCollector, ProgressSink};
use crate::workflow::pacing::pause;
use crate::workflow::{
    export_url, ExportNavigator, ItemCtx, ItemQueryStep, LoginOutcome, LoginStep,
};

/// 工作流编排器
///
/// 不持有会话：会话由调用方创建，并在运行期间独占借给编排器。
pub struct WorkflowOrchestrator {
    login: LoginStep,
    navigator: ExportNavigator,
    item_step: ItemQueryStep,
    timings: Timings,
    download_folder: PathBuf,
}

impl WorkflowOrchestrator {
    pub fn new(timings: &Timings, download_folder: impl Into<PathBuf>) -> Self {
        Self {
            login: LoginStep::new(timings),
            navigator: ExportNavigator::new(timings),
            item_step: ItemQueryStep::new(timings),
            timings: timings.clone(),
            download_folder: download_folder.into(),
        }
    }

    pub async fn run<S: BrowsingSession>(
        &self,
        session: &S,
        config: &JobConfig,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> RunResult<RunSummary> {
        config.validate()?;
        let export_page = export_url(&config.portal_url)?;

        let mut collector = DownloadCollector::subscribe(session)
            .await
            .map_err(|e| RunError::Session(format!("无法订阅下载事件: {}", e)))?;

        sink.set_status("正在登录...");
        sink.set_progress(0);

        let mut cancelled = match self.login.login(session, config, sink, cancel).await {
            Ok(LoginOutcome::LoggedIn) => false,
            Ok(LoginOutcome::Cancelled) => true,
            Err(e) => {
                error!("❌ {}", e);
                sink.log_message(&format!("❌ {}", e));
                sink.set_status("登录失败");
                self.close(session).await;
                return Err(e);
            }
        };

        if !cancelled {
            cancelled = self
                .navigator
                .navigate(session, &export_page, sink, cancel)
                .await
                .is_err();
        }

        let per_item = self
            .process_items(session, config, &mut collector, sink, cancel, cancelled)
            .await;

        sink.set_status("正在保存下载文件...");
        sink.log_message("⏳ 等待下载完成...");
        let downloads = collector
            .drain(
                session,
                &self.download_folder,
                Timings::ms(self.timings.download_drain_ms),
                sink,
            )
            .await;

        let summary = RunSummary::from_results(per_item, downloads, self.download_folder.clone());

        sink.set_progress(100);
        sink.log_message("🎉 处理完成!");
        sink.log_message(&format!("📊 成功率: {} 个设备导出成功", summary.success_ratio()));
        sink.log_message(&format!("📁 文件保存至: {}", summary.download_folder.display()));
        sink.set_status(if cancel.is_cancelled() { "已取消" } else { "完成" });

        self.close(session).await;
        Ok(summary)
    }

    async fn process_items<S: BrowsingSession>(
        &self,
        session: &S,
        config: &JobConfig,
        collector: &mut DownloadCollector,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
        mut cancelled: bool,
    ) -> Vec<ItemResult> {
        let total = config.equipment_serials.len();
        let mut results = Vec::with_capacity(total);

        sink.log_message(&format!("🚀 开始处理 {} 个设备...", total));

        for (i, serial) in config.equipment_serials.iter().enumerate() {
            let ctx = ItemCtx::new(serial.as_str(), i + 1, total);

            if cancelled || cancel.is_cancelled() {
                cancelled = true;
                results.push(ItemResult {
                    serial: serial.clone(),
                    outcome: ItemOutcome::failure(Stage::Cancelled, "运行已取消，未处理"),
                });
                continue;
            }

            sink.set_progress(ctx.progress_percent());
            sink.set_status(&format!("正在处理 {}/{}", ctx.index, total));
            sink.log_message(&format!("📍 正在处理 {}/{}", ctx.index, total));

            let outcome = AssertUnwindSafe(self.item_step.run(session, &ctx, config, sink, cancel))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    let message = panic_message(payload.as_ref());
                    error!("{} ❌ 意外错误: {}", ctx, message);
                    sink.log_message(&format!("  ❌ 意外错误: {}", message));
                    ItemOutcome::failure(Stage::Unexpected, message)
                });

            collector.poll(sink);
            log_outcome(&ctx, &outcome);
            results.push(ItemResult {
                serial: serial.clone(),
                outcome,
            });

            if pause(cancel, Timings::ms(self.timings.inter_item_ms))
                .await
                .is_err()
            {
                cancelled = true;
            }
        }

        if cancelled {
            warn!("⏹ 运行已取消");
            sink.log_message("⏹ 运行已取消，剩余设备未处理");
        }

        results
    }

    /// 留出最后的下载时间后关闭会话
    async fn close<S: BrowsingSession>(&self, session: &S) {
        sleep(Timings::ms(self.timings.final_grace_ms)).await;
        if let Err(e) = session.close().await {
            warn!("关闭浏览器会话失败: {}", e);
        }
    }
}

fn log_outcome(ctx: &ItemCtx, outcome: &ItemOutcome) {
    match outcome {
        ItemOutcome::Success => info!("{} ✅ 成功", ctx),
        ItemOutcome::NoData => info!("{} ⚠️ 无数据", ctx),
        ItemOutcome::StepFailure { stage, message } => {
            warn!("{} ❌ 失败于 {}: {}", ctx, stage, message)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "未知错误".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::fake_session::{FakeElement, FakeSession};
    use crate::infrastructure::Locator;
    use crate::models::DownloadState;
    use crate::services::progress_sink::RecordingSink;
    use crate::workflow::selectors;
    use chrono::NaiveDate;

    fn job(serials: &[&str]) -> JobConfig {
        JobConfig {
            portal_url: "https://portal.test/login".to_string(),
            username: "operator".to_string(),
            password: "s3cret".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            equipment_serials: serials.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn serial_field() -> Locator {
        selectors::serial_field().locators[0].clone()
    }

    fn portal(serial_input: FakeElement) -> FakeSession {
        FakeSession::new()
            .with(selectors::username_field().locators[0].clone(), FakeElement::input())
            .with(selectors::password_field().locators[0].clone(), FakeElement::input())
            .with(selectors::realtime_mode().locators[0].clone(), FakeElement::button())
            .with(selectors::start_date_field().locators[0].clone(), FakeElement::input())
            .with(selectors::end_date_field().locators[0].clone(), FakeElement::input())
            .with(serial_field(), serial_input)
            .with(selectors::query_button().locators[0].clone(), FakeElement::button())
            .with(
                selectors::export_button().locators[0].clone(),
                FakeElement::download_button("export.xlsx"),
            )
    }

    /// 看到指定日志时触发取消
    struct CancelOn<'a> {
        inner: RecordingSink,
        needle: &'a str,
        cancel: CancellationToken,
    }

    impl ProgressSink for CancelOn<'_> {
        fn log_message(&self, text: &str) {
            if text.contains(self.needle) {
                self.cancel.cancel();
            }
            self.inner.log_message(text);
        }

        fn set_progress(&self, percent: u8) {
            self.inner.set_progress(percent);
        }

        fn set_status(&self, text: &str) {
            self.inner.set_status(text);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_items_succeed() {
        let session = portal(FakeElement::input());
        let sink = RecordingSink::default();
        let dir = tempfile::tempdir().unwrap();

        let summary = WorkflowOrchestrator::new(&Timings::default(), dir.path())
            .run(&session, &job(&["N1", "N2", "N3"]), &sink, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 3);
        let serials: Vec<&str> = summary.per_item.iter().map(|r| r.serial.as_str()).collect();
        assert_eq!(serials, vec!["N1", "N2", "N3"]);
        assert_eq!(summary.downloads.len(), 3);
        assert!(summary.downloads.iter().all(|d| d.state == DownloadState::Saved));
        assert_eq!(sink.progress(), vec![0, 0, 33, 66, 100]);
        assert!(sink.logged("成功率: 3/3"));
        assert!(session.is_closed());
        assert_eq!(
            session.navigations(),
            vec![
                "https://portal.test/login".to_string(),
                "https://portal.test/syntheticSystem/dataAnalysis/export".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_item_does_not_stop_batch() {
        let session = portal(FakeElement::input().rejecting("N2"));
        let sink = RecordingSink::default();
        let dir = tempfile::tempdir().unwrap();

        let summary = WorkflowOrchestrator::new(&Timings::default(), dir.path())
            .run(&session, &job(&["N1", "N2", "N3"]), &sink, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.per_item.len(), 3);
        assert_eq!(summary.succeeded, 2);
        assert!(matches!(
            summary.per_item[1].outcome,
            ItemOutcome::StepFailure { stage: Stage::Serial, .. }
        ));
        assert_eq!(summary.per_item[2].outcome, ItemOutcome::Success);
        assert!(sink.logged("成功率: 2/3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_failure_aborts_run() {
        let session = portal(FakeElement::input());
        session.remove(&selectors::username_field().locators[0]);
        let dir = tempfile::tempdir().unwrap();

        let result = WorkflowOrchestrator::new(&Timings::default(), dir.path())
            .run(&session, &job(&["N1"]), &RecordingSink::default(), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(RunError::LoginFailed(_))));
        assert!(session.is_closed());
        assert_eq!(session.navigations().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_config_never_touches_browser() {
        let session = portal(FakeElement::input());
        let dir = tempfile::tempdir().unwrap();

        let result = WorkflowOrchestrator::new(&Timings::default(), dir.path())
            .run(&session, &job(&[]), &RecordingSink::default(), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(RunError::ConfigInvalid(_))));
        assert!(session.navigations().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_records_remaining_items() {
        let session = portal(FakeElement::input());
        let cancel = CancellationToken::new();
        let sink = CancelOn {
            inner: RecordingSink::default(),
            needle: "正在处理 2/3",
            cancel: cancel.clone(),
        };
        let dir = tempfile::tempdir().unwrap();

        let summary = WorkflowOrchestrator::new(&Timings::default(), dir.path())
            .run(&session, &job(&["N1", "N2", "N3"]), &sink, &cancel)
            .await
            .unwrap();

        assert_eq!(summary.per_item.len(), 3);
        assert_eq!(summary.per_item[0].outcome, ItemOutcome::Success);
        for result in &summary.per_item[1..] {
            assert!(matches!(
                result.outcome,
                ItemOutcome::StepFailure { stage: Stage::Cancelled, .. }
            ));
        }
        // 已经开始的下载仍会保存
        assert_eq!(summary.downloads.len(), 1);
        assert_eq!(sink.inner.progress().last(), Some(&100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_export_click_counts_as_success() {
        let session = portal(FakeElement::input());
        let cancel = CancellationToken::new();
        let sink = CancelOn {
            inner: RecordingSink::default(),
            needle: "已开始导出",
            cancel: cancel.clone(),
        };
        let dir = tempfile::tempdir().unwrap();

        let summary = WorkflowOrchestrator::new(&Timings::default(), dir.path())
            .run(&session, &job(&["N1", "N2"]), &sink, &cancel)
            .await
            .unwrap();

        assert_eq!(summary.per_item[0].outcome, ItemOutcome::Success);
        assert!(matches!(
            summary.per_item[1].outcome,
            ItemOutcome::StepFailure { stage: Stage::Cancelled, .. }
        ));
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.saved_downloads(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panic_inside_item_becomes_unexpected_failure() {
        let session = portal(FakeElement::input()).with_find_panic(serial_field());
        let dir = tempfile::tempdir().unwrap();

        let summary = WorkflowOrchestrator::new(&Timings::default(), dir.path())
            .run(&session, &job(&["N1", "N2"]), &RecordingSink::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.per_item.len(), 2);
        for result in &summary.per_item {
            match &result.outcome {
                ItemOutcome::StepFailure { stage, message } => {
                    assert_eq!(*stage, Stage::Unexpected);
                    assert!(message.contains("driver crashed"));
                }
                other => panic!("意外的结果: {:?}", other),
            }
        }
        assert!(session.is_closed());
    }
}
