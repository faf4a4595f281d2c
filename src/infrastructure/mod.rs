pub mod chrome_session;
pub mod session;

#[cfg(test)]
pub mod fake_session;

pub use chrome_session::ChromeSession;
pub use session::{BrowsingSession, DownloadEvent, Key, Locator, Query, TextScope};
