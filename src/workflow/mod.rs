pub mod export_navigator;
pub mod item_ctx;
pub mod item_query;
pub mod login_step;
pub mod pacing;
pub mod selectors;

pub use export_navigator::{export_url, ExportNavigator};
pub use item_ctx::ItemCtx;
pub use item_query::ItemQueryStep;
pub use login_step::{LoginOutcome, LoginStep};
pub use pacing::Cancelled;
