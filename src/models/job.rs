//! 任务配置
//!
//! 一次运行的全部输入：门户地址、账号、日期范围和设备号列表。

use chrono::NaiveDate;
use std::fmt;
use std::path::Path;

use crate::error::{RunError, RunResult};
use crate::utils::logging::mask_secret;

/// 门户查询使用的日期格式
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 任务配置（运行期间只读）
#[derive(Clone, PartialEq, Eq)]
pub struct JobConfig {
    pub portal_url: String,
    pub username: String,
    pub password: String,
    pub start_date: NaiveDate,
    /// 结束日期；不检查是否晚于开始日期，原样传给门户
    pub end_date: NaiveDate,
    /// 按处理顺序排列，允许重复
    pub equipment_serials: Vec<String>,
}

impl JobConfig {
    /// 运行前的必填项检查
    pub fn validate(&self) -> RunResult<()> {
        let mut missing = Vec::new();
        if self.portal_url.trim().is_empty() {
            missing.push("门户地址 (B1)");
        }
        if self.username.trim().is_empty() {
            missing.push("用户名 (B2)");
        }
        if self.password.is_empty() {
            missing.push("密码 (B3)");
        }
        if !missing.is_empty() {
            return Err(RunError::config_invalid(format!(
                "缺少必填项: {}",
                missing.join(", ")
            )));
        }
        if self.equipment_serials.is_empty() {
            return Err(RunError::config_invalid("表格中没有找到设备号 (A6 起)"));
        }
        Ok(())
    }

    pub fn start_date_str(&self) -> String {
        self.start_date.format(DATE_FORMAT).to_string()
    }

    pub fn end_date_str(&self) -> String {
        self.end_date.format(DATE_FORMAT).to_string()
    }

    /// 生成预览文本（逐行），密码以掩码显示
    pub fn preview(&self, download_folder: &Path) -> Vec<String> {
        let mut lines = vec![
            "=".repeat(50),
            "任务数据预览".to_string(),
            "=".repeat(50),
            format!("门户地址: {}", self.portal_url),
            format!("用户名: {}", self.username),
            format!("密码: {}", mask_secret(&self.password)),
            format!("开始日期: {}", self.start_date_str()),
            format!("结束日期: {}", self.end_date_str()),
            format!("设备号 ({}):", self.equipment_serials.len()),
        ];

        for (i, serial) in self.equipment_serials.iter().enumerate() {
            lines.push(format!("  {:2}. {}", i + 1, serial));
        }
        lines.push("=".repeat(50));

        if self.portal_url.is_empty() || self.username.is_empty() || self.password.is_empty() {
            lines.push("⚠️  警告: 门户地址、用户名或密码缺失!".to_string());
        }
        if self.equipment_serials.is_empty() {
            lines.push("⚠️  警告: 没有找到设备号!".to_string());
        } else {
            lines.push(format!(
                "✓ 准备处理 {} 台设备",
                self.equipment_serials.len()
            ));
        }
        lines.push(format!("✓ 下载将保存到: {}", download_folder.display()));

        lines
    }
}

impl fmt::Debug for JobConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobConfig")
            .field("portal_url", &self.portal_url)
            .field("username", &self.username)
            .field("password", &mask_secret(&self.password))
            .field("start_date", &self.start_date)
            .field("end_date", &self.end_date)
            .field("equipment_serials", &self.equipment_serials)
            .finish()
    }
}
