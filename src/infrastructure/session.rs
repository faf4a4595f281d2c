//! 浏览会话抽象 - 基础设施层
//!
//! 工作流只通过 [`BrowsingSession`] 操作页面，底层驱动（CDP、WebDriver…）
//! 是可替换的适配器。

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use tokio::sync::mpsc::UnboundedReceiver;

/// 文本定位器的作用范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextScope {
    /// 任意元素（取最内层文本节点）
    Any,
    Button,
    Label,
    Div,
    /// `role="button"` 的元素
    RoleButton,
}

/// 元素定位器
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    XPath(String),
    /// 按可见文本定位，会被编译成 XPath
    Text { scope: TextScope, text: String },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Locator::XPath(expr.into())
    }

    pub fn text(scope: TextScope, text: impl Into<String>) -> Self {
        Locator::Text {
            scope,
            text: text.into(),
        }
    }

    /// 转成驱动可以直接执行的查询
    pub fn query(&self) -> Query {
        match self {
            Locator::Css(selector) => Query::Css(selector.clone()),
            Locator::XPath(expr) => Query::XPath(expr.clone()),
            Locator::Text { scope, text } => {
                let literal = xpath_literal(text);
                let expr = match scope {
                    TextScope::Any => format!("//*[contains(text(), {})]", literal),
                    TextScope::Button => format!("//button[contains(normalize-space(.), {})]", literal),
                    TextScope::Label => format!("//label[contains(normalize-space(.), {})]", literal),
                    TextScope::Div => format!("//div[contains(text(), {})]", literal),
                    TextScope::RoleButton => {
                        format!("//*[@role='button'][contains(normalize-space(.), {})]", literal)
                    }
                };
                Query::XPath(expr)
            }
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "css={}", selector),
            Locator::XPath(expr) => write!(f, "xpath={}", expr),
            Locator::Text { scope, text } => write!(f, "text[{:?}]={}", scope, text),
        }
    }
}

/// 驱动层查询
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Css(String),
    XPath(String),
}

/// 生成 XPath 字符串字面量，处理引号
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        format!("'{}'", text)
    } else if !text.contains('"') {
        format!("\"{}\"", text)
    } else {
        let parts: Vec<String> = text.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// 按键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Tab,
    Delete,
    /// Ctrl+A
    SelectAll,
}

impl Key {
    /// DevTools 的按键名
    pub fn name(&self) -> &'static str {
        match self {
            Key::Enter => "Enter",
            Key::Tab => "Tab",
            Key::Delete => "Delete",
            Key::SelectAll => "a",
        }
    }
}

/// 会话发出的下载事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadEvent {
    Started {
        id: String,
        suggested_filename: String,
        url: String,
    },
    Finished {
        id: String,
        completed: bool,
    },
}

/// 浏览会话
///
/// 职责：
/// - 独占一个页面
/// - 暴露导航、查找、点击、输入、回读、注入、下载等能力
/// - 不认识设备号 / 日期 / 门户流程
#[async_trait]
pub trait BrowsingSession: Send + Sync {
    /// 元素句柄
    type Handle: Send + Sync;

    /// 导航到指定地址
    async fn navigate(&self, url: &str) -> Result<()>;

    /// 页面是否已加载完成（`document.readyState == "complete"`）
    async fn is_ready(&self) -> Result<bool>;

    /// 单次查找，不等待；找不到返回 `Ok(None)`
    async fn find(&self, locator: &Locator) -> Result<Option<Self::Handle>>;

    async fn click(&self, handle: &Self::Handle) -> Result<()>;

    /// 聚焦（点击）元素
    async fn focus(&self, handle: &Self::Handle) -> Result<()>;

    /// 向元素输入文本
    async fn type_text(&self, handle: &Self::Handle, text: &str) -> Result<()>;

    async fn press_key(&self, handle: &Self::Handle, key: Key) -> Result<()>;

    /// 读取输入框当前的值
    async fn read_value(&self, handle: &Self::Handle) -> Result<String>;

    /// 直接设置值并派发 input / change 事件
    async fn inject_value(&self, handle: &Self::Handle, value: &str) -> Result<()>;

    /// 订阅下载事件
    async fn subscribe_downloads(&self) -> Result<UnboundedReceiver<DownloadEvent>>;

    /// 把一次下载保存到目标路径（已存在则覆盖）
    async fn persist_download(&self, id: &str, dest: &Path) -> Result<()>;

    /// 结束会话
    async fn close(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_locator_compiles_to_xpath() {
        let button = Locator::text(TextScope::Button, "查詢");
        assert_eq!(
            button.query(),
            Query::XPath("//button[contains(normalize-space(.), '查詢')]".to_string())
        );

        let any = Locator::text(TextScope::Any, "實時值");
        assert_eq!(
            any.query(),
            Query::XPath("//*[contains(text(), '實時值')]".to_string())
        );

        let css = Locator::css("button.el-button--warning");
        assert_eq!(css.query(), Query::Css("button.el-button--warning".to_string()));
    }

    #[test]
    fn test_xpath_literal_quotes() {
        assert_eq!(xpath_literal("abc"), "'abc'");
        assert_eq!(xpath_literal("it's"), "\"it's\"");
        assert_eq!(
            xpath_literal(r#"a'b"c"#),
            r#"concat('a', "'", 'b"c')"#
        );
    }
}
