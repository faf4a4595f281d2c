//! 单个设备及整次运行的结果

use std::fmt;
use std::path::PathBuf;

use crate::models::download::{DownloadRecord, DownloadState};

/// 设备失败时所处的阶段
///
/// 只列出会让设备失败的阶段：模式和日期填写失败不致命，找不到导出按钮算"无数据"。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Serial,
    Query,
    /// 编排层兜底捕获的意外错误
    Unexpected,
    /// 运行被取消
    Cancelled,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Serial => "serial",
            Stage::Query => "query",
            Stage::Unexpected => "unexpected",
            Stage::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 单个设备的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// 已点击导出并等待下载开始
    Success,
    /// 查询后没有导出按钮，视为"无数据"，不算错误
    NoData,
    /// 某个致命步骤失败，跳过该设备
    StepFailure { stage: Stage, message: String },
}

impl ItemOutcome {
    pub fn failure(stage: Stage, message: impl Into<String>) -> Self {
        ItemOutcome::StepFailure {
            stage,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Success)
    }
}

/// 单个设备号及其结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemResult {
    pub serial: String,
    pub outcome: ItemOutcome,
}

/// 整次运行的汇总
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    /// 与输入顺序一致，每个设备号一条
    pub per_item: Vec<ItemResult>,
    pub downloads: Vec<DownloadRecord>,
    pub download_folder: PathBuf,
}

impl RunSummary {
    pub fn from_results(
        per_item: Vec<ItemResult>,
        downloads: Vec<DownloadRecord>,
        download_folder: PathBuf,
    ) -> Self {
        let succeeded = per_item.iter().filter(|r| r.outcome.is_success()).count();
        Self {
            total: per_item.len(),
            succeeded,
            per_item,
            downloads,
            download_folder,
        }
    }

    pub fn failed(&self) -> usize {
        self.total - self.succeeded
    }

    pub fn saved_downloads(&self) -> usize {
        self.downloads
            .iter()
            .filter(|d| matches!(d.state, DownloadState::Saved))
            .count()
    }

    /// 形如 "2/3"
    pub fn success_ratio(&self) -> String {
        format!("{}/{}", self.succeeded, self.total)
    }
}
