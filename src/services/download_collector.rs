//! 下载收集 - 业务能力层
//!
//! 整次运行只订阅一次会话的下载事件。运行过程中只登记，
//! 收尾时统一等待进行中的传输并按建议文件名保存。

use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::error::PersistError;
use crate::infrastructure::{BrowsingSession, DownloadEvent};
use crate::models::{DownloadRecord, DownloadState, Transfer};
use crate::services::progress_sink::ProgressSink;

/// 下载收集器
///
/// 下载记录只有这一个写入者。
pub struct DownloadCollector {
    events: UnboundedReceiver<DownloadEvent>,
    records: Vec<DownloadRecord>,
    /// 先于开始事件到达的结束事件（传输 ID → 是否完成）
    early_finishes: HashMap<String, bool>,
}

impl DownloadCollector {
    /// 订阅会话的下载事件
    pub async fn subscribe<S: BrowsingSession>(session: &S) -> Result<Self> {
        let events = session.subscribe_downloads().await?;
        Ok(Self::from_events(events))
    }

    pub fn from_events(events: UnboundedReceiver<DownloadEvent>) -> Self {
        Self {
            events,
            records: Vec::new(),
            early_finishes: HashMap::new(),
        }
    }

    /// 处理已经到达的事件，不等待
    pub fn poll(&mut self, sink: &dyn ProgressSink) {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.apply(event, sink),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    pub fn records(&self) -> &[DownloadRecord] {
        &self.records
    }

    /// 尚未完成的传输数量
    pub fn in_flight(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.transfer == Transfer::InFlight)
            .count()
    }

    fn apply(&mut self, event: DownloadEvent, sink: &dyn ProgressSink) {
        match event {
            DownloadEvent::Started {
                id,
                suggested_filename,
                url,
            } => {
                debug!("下载开始: {} ({}) 来自 {}", suggested_filename, id, url);
                sink.log_message(&format!("📥 开始下载: {}", suggested_filename));
                let mut record = DownloadRecord::pending(id, suggested_filename);
                if let Some(completed) = self.early_finishes.remove(&record.source) {
                    finish(&mut record, completed);
                }
                self.records.push(record);
            }
            DownloadEvent::Finished { id, completed } => {
                match self.records.iter_mut().find(|r| r.source == id) {
                    Some(record) => finish(record, completed),
                    None => {
                        // 小文件的结束事件可能先到，等开始事件到达后再补上
                        debug!("下载 {} 的结束事件先于开始事件到达", id);
                        self.early_finishes.insert(id, completed);
                    }
                }
            }
        }
    }

    /// 等待进行中的传输（有上限），然后逐个保存到 `folder`
    ///
    /// 同名文件会被覆盖。单个文件保存失败只记录，不影响其余文件。
    /// 返回本次运行的全部记录，收集器随后清空。
    pub async fn drain<S: BrowsingSession>(
        &mut self,
        session: &S,
        folder: &Path,
        wait: Duration,
        sink: &dyn ProgressSink,
    ) -> Vec<DownloadRecord> {
        self.poll(sink);

        let deadline = Instant::now() + wait;
        while self.in_flight() > 0 {
            match timeout_at(deadline, self.events.recv()).await {
                Ok(Some(event)) => self.apply(event, sink),
                Ok(None) => break,
                Err(_) => {
                    warn!("⏰ 仍有 {} 个下载未完成，停止等待", self.in_flight());
                    break;
                }
            }
        }

        if self.records.is_empty() {
            info!("本次运行没有产生下载");
            return Vec::new();
        }

        if let Err(e) = tokio::fs::create_dir_all(folder).await {
            warn!("无法创建下载目录 {}: {}", folder.display(), e);
        }

        let mut records = std::mem::take(&mut self.records);
        for record in records.iter_mut() {
            persist_record(session, record, folder).await;
            match &record.state {
                DownloadState::Saved => {
                    sink.log_message(&format!("💾 已保存: {}", record.suggested_filename))
                }
                DownloadState::Failed(e) => sink.log_message(&format!("❌ {}", e)),
                DownloadState::Pending => {}
            }
        }

        records
    }
}

fn finish(record: &mut DownloadRecord, completed: bool) {
    record.transfer = if completed {
        Transfer::Completed
    } else {
        Transfer::Cancelled
    };
    debug!("下载结束: {} (完成: {})", record.suggested_filename, completed);
}

async fn persist_record<S: BrowsingSession>(session: &S, record: &mut DownloadRecord, folder: &Path) {
    let filename = record.suggested_filename.clone();
    match record.transfer {
        Transfer::Cancelled => {
            record.state = DownloadState::Failed(PersistError::Cancelled { filename });
        }
        Transfer::InFlight => {
            record.state = DownloadState::Failed(PersistError::Failed {
                filename,
                reason: "传输未在限定时间内完成".to_string(),
            });
        }
        Transfer::Completed => {
            let dest = folder.join(&filename);
            match session.persist_download(&record.source, &dest).await {
                Ok(()) => {
                    info!("💾 {} → {}", filename, dest.display());
                    record.state = DownloadState::Saved;
                    record.saved_path = Some(dest);
                }
                Err(e) => {
                    warn!("保存 {} 失败: {:#}", filename, e);
                    record.state = DownloadState::Failed(PersistError::Failed {
                        filename,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }
}
