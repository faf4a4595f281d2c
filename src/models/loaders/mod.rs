pub mod cell;
pub mod toml_loader;

pub use cell::{parse_date_cell, CellValue};
pub use toml_loader::{load_job_config, read_job_config, read_serials, CellSource, TomlSheet};
