//! 应用生命周期 - 编排层
//!
//! 读取任务表格 → 预览 → 打开浏览器 → 交给 [`WorkflowOrchestrator`] → 输出统计。

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::browser;
use crate::config::Settings;
use crate::infrastructure::ChromeSession;
use crate::models::{load_job_config, JobConfig, RunSummary};
use crate::orchestrator::workflow_orchestrator::WorkflowOrchestrator;
use crate::services::{RunLogSink, TracingSink};
use crate::utils::logging::{init_log_file, log_startup, print_final_stats};

/// 应用主结构
pub struct App {
    settings: Settings,
    job: JobConfig,
    session: ChromeSession,
}

impl App {
    /// 初始化应用
    ///
    /// 任务表格不完整时直接返回错误，不会启动浏览器。
    pub async fn initialize(settings: Settings) -> Result<Self> {
        init_log_file(&settings.output_log_file)?;
        log_startup(&settings.job_sheet, &settings.download_folder);

        let job = load_and_preview(&settings).await?;
        job.validate()?;

        let session = browser::open_session(&settings).await?;

        Ok(Self {
            settings,
            job,
            session,
        })
    }

    /// 运行下载流程
    pub async fn run(&self) -> Result<RunSummary> {
        let sink = RunLogSink::new(TracingSink, &self.settings.output_log_file);
        let cancel = CancellationToken::new();

        // Ctrl-C：当前步骤结束后停止，已开始的下载仍会保存
        let ctrl_c = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("⏹ 收到 Ctrl-C，正在停止...");
                    cancel.cancel();
                }
            })
        };

        let orchestrator =
            WorkflowOrchestrator::new(&self.settings.timings, &self.settings.download_folder);
        let result = orchestrator
            .run(&self.session, &self.job, &sink, &cancel)
            .await;
        ctrl_c.abort();

        let summary = result?;
        print_final_stats(&summary, &self.settings.output_log_file);
        Ok(summary)
    }
}

/// 读取任务表格并把预览写入日志
pub async fn load_and_preview(settings: &Settings) -> Result<JobConfig> {
    let today = chrono::Local::now().date_naive();
    let job = load_job_config(&settings.job_sheet, today).await?;

    for line in job.preview(&settings.download_folder) {
        info!("{}", line);
    }
    Ok(job)
}
