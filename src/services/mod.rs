pub mod download_collector;
pub mod field_filler;
pub mod progress_sink;
pub mod selector_resolver;

pub use download_collector::DownloadCollector;
pub use field_filler::{FieldFiller, FillOutcome, FillPath};
pub use progress_sink::{ChannelSink, ProgressEvent, ProgressSink, RunLogSink, TracingSink};
pub use selector_resolver::{Found, Resolution, SelectorCandidates, SelectorResolver};
