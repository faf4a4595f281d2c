//! 设备处理上下文
//!
//! 封装"我正在处理第几个设备号"这一信息

use std::fmt::Display;

/// 设备处理上下文
#[derive(Debug, Clone)]
pub struct ItemCtx {
    /// 设备号
    pub serial: String,

    /// 在任务中的序号（从1开始）
    pub index: usize,

    /// 设备总数
    pub total: usize,
}

impl ItemCtx {
    pub fn new(serial: impl Into<String>, index: usize, total: usize) -> Self {
        Self {
            serial: serial.into(),
            index,
            total,
        }
    }

    /// 开始处理该设备前应显示的进度（0–100）
    pub fn progress_percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.index.saturating_sub(1) * 100) / self.total).min(100) as u8
    }
}

impl Display for ItemCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[设备 {}/{} #{}]", self.index, self.total, self.serial)
    }
}
