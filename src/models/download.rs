use std::path::PathBuf;

use crate::error::PersistError;

/// 浏览器侧的传输状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    InFlight,
    Completed,
    Cancelled,
}

/// 保存状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadState {
    Pending,
    Saved,
    Failed(PersistError),
}

/// 一次下载
///
/// 收到"下载开始"事件时创建；收尾时由下载收集器保存并更新状态。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRecord {
    pub suggested_filename: String,
    /// 浏览器分配的传输 ID
    pub source: String,
    pub transfer: Transfer,
    pub state: DownloadState,
    pub saved_path: Option<PathBuf>,
}

impl DownloadRecord {
    pub fn pending(source: impl Into<String>, suggested_filename: impl Into<String>) -> Self {
        Self {
            suggested_filename: suggested_filename.into(),
            source: source.into(),
            transfer: Transfer::InFlight,
            state: DownloadState::Pending,
            saved_path: None,
        }
    }
}
