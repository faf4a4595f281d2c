pub mod download;
pub mod job;
pub mod loaders;
pub mod outcome;

pub use download::{DownloadRecord, DownloadState, Transfer};
pub use job::JobConfig;
pub use loaders::{load_job_config, read_job_config, CellSource, CellValue, TomlSheet};
pub use outcome::{ItemOutcome, ItemResult, RunSummary, Stage};
