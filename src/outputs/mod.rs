//! Output generation for the scraped dataset.
//!
//! # Submodules
//!
//! - [`csv`]: Writes the flat per-post table consumed by the dashboards
//! - [`json`]: Writes a full snapshot of the dataset, removed sources included
//!
//! # Output Structure
//!
//! ```text
//! dataset_dir/
//! └── raw_dataset.csv
//!
//! json_output_dir/
//! └── 2025-05-06/
//!     ├── morning.json
//!     └── evening.json
//! ```

pub mod csv;
pub mod json;
