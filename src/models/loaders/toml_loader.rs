use crate::models::job::JobConfig;
use crate::models::loaders::cell::{parse_date_cell, CellValue};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;

/// 设备号从第 6 行开始
pub const FIRST_SERIAL_ROW: u32 = 6;

/// 按 A1 地址读取单元格
pub trait CellSource {
    fn cell(&self, address: &str) -> CellValue;
}

/// TOML 形式的单元格导出
///
/// ```toml
/// [cells]
/// B1 = "https://env.nem.com.hk:10027/login"
/// B2 = "operator"
/// B3 = "secret"
/// F1 = "=today()-1"
/// A6 = "SN-001"
/// ```
#[derive(Debug, Clone, Default)]
pub struct TomlSheet {
    cells: HashMap<String, CellValue>,
}

#[derive(Debug, Deserialize)]
struct SheetFile {
    #[serde(default)]
    cells: HashMap<String, toml::Value>,
}

impl TomlSheet {
    pub fn parse(content: &str) -> Result<Self> {
        let file: SheetFile = toml::from_str(content).context("无法解析单元格表格")?;
        let cells = file
            .cells
            .into_iter()
            .map(|(address, value)| (address.trim().to_uppercase(), cell_from_toml(value)))
            .collect();
        Ok(Self { cells })
    }

    /// 从文件加载
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("无法读取任务表格: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("无法解析任务表格: {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl CellSource for TomlSheet {
    fn cell(&self, address: &str) -> CellValue {
        self.cells
            .get(&address.to_uppercase())
            .cloned()
            .unwrap_or(CellValue::Empty)
    }
}

fn cell_from_toml(value: toml::Value) -> CellValue {
    match value {
        toml::Value::String(s) => CellValue::Text(s),
        toml::Value::Integer(n) => CellValue::Int(n),
        toml::Value::Float(f) => CellValue::Float(f),
        toml::Value::Boolean(b) => CellValue::Text(b.to_string()),
        toml::Value::Datetime(dt) => dt
            .date
            .and_then(|d| NaiveDate::from_ymd_opt(d.year as i32, d.month as u32, d.day as u32))
            .map(CellValue::Date)
            .unwrap_or(CellValue::Empty),
        toml::Value::Array(_) | toml::Value::Table(_) => CellValue::Empty,
    }
}

/// 按固定布局把表格解释为任务配置
///
/// | 单元格 | 含义 |
/// |---|---|
/// | B1 | 门户地址 |
/// | B2 | 用户名 |
/// | B3 | 密码 |
/// | F1 | 开始日期 |
/// | F2 | 结束日期（为空时等于开始日期） |
/// | A6 起 | 设备号，遇到第一个空单元格即停止 |
pub fn read_job_config(sheet: &impl CellSource, today: NaiveDate) -> JobConfig {
    let start_date = parse_date_cell(&sheet.cell("F1"), today);
    let end_cell = sheet.cell("F2");
    let end_date = if end_cell.is_blank() {
        start_date
    } else {
        parse_date_cell(&end_cell, today)
    };

    JobConfig {
        portal_url: sheet.cell("B1").to_text(),
        username: sheet.cell("B2").to_text(),
        password: sheet.cell("B3").to_text(),
        start_date,
        end_date,
        equipment_serials: read_serials(sheet),
    }
}

/// 从 A6 开始向下读取设备号，不向后跳过空行
pub fn read_serials(sheet: &impl CellSource) -> Vec<String> {
    let mut serials = Vec::new();
    let mut row = FIRST_SERIAL_ROW;
    loop {
        let serial = sheet.cell(&format!("A{}", row)).to_text();
        if serial.is_empty() {
            break;
        }
        serials.push(serial);
        row += 1;
    }
    serials
}

/// 从任务表格文件加载任务配置
pub async fn load_job_config(path: &Path, today: NaiveDate) -> Result<JobConfig> {
    let sheet = TomlSheet::load(path).await?;
    tracing::info!("正在读取任务表格: {} ({} 个单元格)", path.display(), sheet.len());
    Ok(read_job_config(&sheet, today))
}
