//! 门户页面元素的候选定位器
//!
//! 门户有繁体、简体两套界面，部分版本的输入框只有自动生成的 id，
//! 所以每个元素都按"最具体 → 最宽泛"排列多个候选。

use crate::infrastructure::{Locator, TextScope};
use crate::services::SelectorCandidates;

pub fn username_field() -> SelectorCandidates {
    SelectorCandidates::new(
        "用户名输入框",
        vec![
            Locator::css(r#"input[placeholder*="賬號"]"#),
            Locator::css(r#"input[placeholder*="账号"]"#),
            Locator::css(r#"input[placeholder*="用户名"]"#),
            Locator::css(r#"input[aria-label*="賬號"]"#),
            Locator::css(r#"input[aria-label*="账号"]"#),
            Locator::css(r#"input[type="text"]"#),
            Locator::css("#el-id-215-31"),
        ],
    )
}

pub fn password_field() -> SelectorCandidates {
    SelectorCandidates::new(
        "密码输入框",
        vec![
            Locator::css(r#"input[placeholder*="密碼"]"#),
            Locator::css(r#"input[placeholder*="密码"]"#),
            Locator::css(r#"input[type="password"]"#),
            Locator::css(r#"input[aria-label*="密碼"]"#),
            Locator::css(r#"input[aria-label*="密码"]"#),
            Locator::css("#el-id-215-32"),
        ],
    )
}

/// "實時值"（实时值）单选项
pub fn realtime_mode() -> SelectorCandidates {
    SelectorCandidates::new(
        "實時值选项",
        vec![
            Locator::text(TextScope::Label, "實時值"),
            Locator::css(r#"input[value="實時值"]"#),
            Locator::xpath(
                "//label[contains(concat(' ', normalize-space(@class), ' '), ' is-active ')]\
                 /span[contains(text(), '實時值')]",
            ),
            Locator::text(TextScope::Any, "實時值"),
        ],
    )
}

pub fn start_date_field() -> SelectorCandidates {
    SelectorCandidates::new(
        "开始时间输入框",
        vec![
            Locator::css(r#"input[placeholder*="開始時間"]"#),
            Locator::css(r#"input[placeholder*="开始时间"]"#),
            Locator::css(r#"input[aria-label*="開始時間"]"#),
            Locator::css(r#"input[aria-label*="开始时间"]"#),
            Locator::css("div.flex-wrap > div:nth-of-type(2) input:nth-of-type(1)"),
            Locator::css(r#"input[type="text"]"#),
        ],
    )
}

pub fn end_date_field() -> SelectorCandidates {
    SelectorCandidates::new(
        "结束时间输入框",
        vec![
            Locator::css(r#"input[placeholder*="結束時間"]"#),
            Locator::css(r#"input[placeholder*="结束时间"]"#),
            Locator::css(r#"input[aria-label*="結束時間"]"#),
            Locator::css(r#"input[aria-label*="结束时间"]"#),
            Locator::css("div.flex-wrap > div:nth-of-type(2) input:nth-of-type(2)"),
            Locator::css(r#"input[type="text"]:nth-of-type(2)"#),
        ],
    )
}

pub fn serial_field() -> SelectorCandidates {
    SelectorCandidates::new(
        "设备号输入框",
        vec![
            Locator::css(r#"input[placeholder*="設備號"]"#),
            Locator::css(r#"input[placeholder*="设备号"]"#),
            Locator::css(r#"input[placeholder*="請輸入設備號"]"#),
            Locator::css(r#"input[placeholder*="请输入设备号"]"#),
            Locator::css(r#"input[aria-label*="設備號"]"#),
            Locator::css(r#"input[aria-label*="设备号"]"#),
            Locator::css("#el-id-215-53"),
        ],
    )
}

pub fn query_button() -> SelectorCandidates {
    SelectorCandidates::new(
        "查询按钮",
        vec![
            Locator::text(TextScope::Button, "查詢"),
            Locator::text(TextScope::Button, "查询"),
            Locator::text(TextScope::Any, "查詢"),
            Locator::text(TextScope::Any, "查询"),
            Locator::css("button.el-button--warning"),
            Locator::text(TextScope::RoleButton, "查詢"),
            Locator::text(TextScope::RoleButton, "查询"),
        ],
    )
}

pub fn export_button() -> SelectorCandidates {
    SelectorCandidates::new(
        "导出文件按钮",
        vec![
            Locator::text(TextScope::Button, "導出文件"),
            Locator::text(TextScope::Button, "导出文件"),
            Locator::text(TextScope::Any, "導出文件"),
            Locator::text(TextScope::Any, "导出文件"),
            Locator::text(TextScope::RoleButton, "導出文件"),
            Locator::text(TextScope::RoleButton, "导出文件"),
        ],
    )
}
