//! 单元格取值与日期解析
//!
//! 日期单元格支持以下写法：
//! - 原生日期
//! - `YYYY-MM-DD` / `YYYYMMDD` 文本
//! - 表格日期序列号（纪元 1899-12-30）
//! - `=today()`、`=today()-1`、`=today()+3` 这类公式文本
//!
//! 无法识别的内容一律回退为当天。

use chrono::{Days, NaiveDate};
use regex::Regex;
use tracing::warn;

/// 单元格的值
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
}

impl CellValue {
    /// 转为去除首尾空白的字符串，空单元格得到空串
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Int(n) => n.to_string(),
            CellValue::Float(f) => {
                if f.fract() == 0.0 && f.is_finite() {
                    format!("{:.0}", f)
                } else {
                    f.to_string()
                }
            }
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.to_text().is_empty()
    }
}

/// 表格日期序列号的纪元（已包含 1900 年闰年问题的修正）
pub fn serial_epoch() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30)
}

/// 日期序列号转日期，小数部分（时刻）舍去
pub fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    serial_epoch()?.checked_add_days(Days::new(serial.floor() as u64))
}

/// 解析 `=today()±N` 公式；不含 `today()` 的公式返回 `None`
pub fn parse_today_formula(formula: &str, today: NaiveDate) -> Option<NaiveDate> {
    let formula = formula.trim().to_lowercase();
    if !formula.contains("today()") {
        return None;
    }

    let re = Regex::new(r"today\(\)\s*([+-])\s*(\d+)").ok()?;
    let Some(caps) = re.captures(&formula) else {
        return Some(today);
    };

    let days: u64 = caps[2].parse().ok()?;
    match &caps[1] {
        "+" => today.checked_add_days(Days::new(days)),
        _ => today.checked_sub_days(Days::new(days)),
    }
}

/// 解析日期单元格
///
/// `today` 由调用方传入，便于测试。
pub fn parse_date_cell(cell: &CellValue, today: NaiveDate) -> NaiveDate {
    match cell {
        CellValue::Empty => today,
        CellValue::Date(date) => *date,
        CellValue::Text(text) if text.trim().starts_with('=') => {
            parse_today_formula(text, today).unwrap_or_else(|| {
                warn!("⚠️ 无法识别的日期公式 '{}'，使用今天", text.trim());
                today
            })
        }
        other => {
            let text = other.to_text();
            if text.is_empty() {
                return today;
            }
            parse_date_text(&text).unwrap_or_else(|| {
                warn!("⚠️ 无法解析日期 '{}'，使用今天", text);
                today
            })
        }
    }
}

/// 文本日期：`YYYY-MM-DD`、`YYYYMMDD` 或数字序列号
fn parse_date_text(text: &str) -> Option<NaiveDate> {
    if text.len() == 10 && text.contains('-') {
        return NaiveDate::parse_from_str(text, "%Y-%m-%d").ok();
    }
    if text.len() == 8 && text.chars().all(|c| c.is_ascii_digit()) {
        return NaiveDate::parse_from_str(text, "%Y%m%d").ok();
    }
    let numeric = !text.is_empty()
        && text.chars().all(|c| c.is_ascii_digit() || c == '.')
        && text.chars().filter(|c| *c == '.').count() <= 1;
    if numeric {
        return text.parse::<f64>().ok().and_then(date_from_serial);
    }
    None
}
