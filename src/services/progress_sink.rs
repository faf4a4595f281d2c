//! 进度输出 - 业务能力层
//!
//! 工作流只认识 [`ProgressSink`]，界面、终端、日志文件都是它的实现。

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

/// 进度输出接口
///
/// 实现必须线程安全且不阻塞调用方。
pub trait ProgressSink: Send + Sync {
    fn log_message(&self, text: &str);
    /// 0–100
    fn set_progress(&self, percent: u8);
    fn set_status(&self, text: &str);
}

/// 输出到 tracing（命令行模式）
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn log_message(&self, text: &str) {
        info!("{}", text);
    }

    fn set_progress(&self, percent: u8) {
        debug!("进度: {}%", percent);
    }

    fn set_status(&self, text: &str) {
        info!("状态: {}", text);
    }
}

/// 发往界面线程的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Log(String),
    Progress(u8),
    Status(String),
}

/// 通过无界通道把事件转交给界面线程，不阻塞工作流
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn channel() -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: ProgressEvent) {
        // 界面已关闭时直接丢弃
        let _ = self.tx.send(event);
    }
}

impl ProgressSink for ChannelSink {
    fn log_message(&self, text: &str) {
        self.send(ProgressEvent::Log(text.to_string()));
    }

    fn set_progress(&self, percent: u8) {
        self.send(ProgressEvent::Progress(percent.min(100)));
    }

    fn set_status(&self, text: &str) {
        self.send(ProgressEvent::Status(text.to_string()));
    }
}

/// 在转发给内层输出的同时，把日志行追加到运行日志文件
pub struct RunLogSink<S> {
    inner: S,
    log_file_path: PathBuf,
}

impl<S: ProgressSink> RunLogSink<S> {
    pub fn new(inner: S, log_file_path: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            log_file_path: log_file_path.into(),
        }
    }

    fn append(&self, text: &str) {
        let line = format!("{} - {}\n", chrono::Local::now().format("%H:%M:%S"), text);
        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file_path)
            .and_then(|mut file| file.write_all(line.as_bytes()));
        if let Err(e) = written {
            debug!("写入运行日志失败 ({}): {}", self.log_file_path.display(), e);
        }
    }
}

impl<S: ProgressSink> ProgressSink for RunLogSink<S> {
    fn log_message(&self, text: &str) {
        self.append(text);
        self.inner.log_message(text);
    }

    fn set_progress(&self, percent: u8) {
        self.inner.set_progress(percent);
    }

    fn set_status(&self, text: &str) {
        self.append(&format!("[状态] {}", text));
        self.inner.set_status(text);
    }
}

/// 测试用：记录所有事件
#[cfg(test)]
#[derive(Default)]
pub struct RecordingSink {
    events: std::sync::Mutex<Vec<ProgressEvent>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn logs(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Log(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn progress(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Progress(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn logged(&self, needle: &str) -> bool {
        self.logs().iter().any(|line| line.contains(needle))
    }
}

#[cfg(test)]
impl ProgressSink for RecordingSink {
    fn log_message(&self, text: &str) {
        self.events.lock().unwrap().push(ProgressEvent::Log(text.to_string()));
    }

    fn set_progress(&self, percent: u8) {
        self.events.lock().unwrap().push(ProgressEvent::Progress(percent));
    }

    fn set_status(&self, text: &str) {
        self.events.lock().unwrap().push(ProgressEvent::Status(text.to_string()));
    }
}
