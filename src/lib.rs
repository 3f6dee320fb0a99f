//! nvlcheck - BOM reconciliation between a configurator export and an expert BOM
//!
//! 構成ツールが出力したBOM（ソース）と、ExpertBOMのエクスポート（ターゲット）という
//! 2つのxlsxファイルから、品目・数量・SKU（任意でソリューションID）のレコードを抽出し、
//! 集合として比較します。ソースにのみ存在するレコードが「ターゲットに反映されていない品目」です。
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use nvlcheck::{compare_files, load_parse_config, StderrProgress};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source_config = load_parse_config("config/configurator-bom.toml")?;
//!     let target_config = load_parse_config("config/expert-bom.toml")?;
//!
//!     let result = compare_files(
//!         Path::new("configurator.xlsx"),
//!         Path::new("expert.xlsx"),
//!         &source_config,
//!         &target_config,
//!         &StderrProgress,
//!     )?;
//!
//!     for record in &result.source_only {
//!         println!("{}", record);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Layout Configuration
//!
//! レイアウトはTOMLファイル、または[`ParseConfigBuilder`]で指定します。
//! 行・列のインデックスはすべて0始まりです。
//!
//! ```rust,no_run
//! use nvlcheck::{extract_file, ParseConfigBuilder, QuantityCheck};
//!
//! # fn main() -> Result<(), nvlcheck::NvlCheckError> {
//! let config = ParseConfigBuilder::new("ExpertBOM")
//!     .with_first_data_row(6)
//!     .with_columns(0, 1, 2)
//!     .with_solution_id_column(5)
//!     .with_quantity_check(QuantityCheck::SkipText)
//!     .build()?;
//!
//! let records = extract_file("expert.xlsx", &config)?;
//! println!("{} records", records.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Background Comparison
//!
//! 呼び出し元のスレッドを塞がずに比較する場合は[`Comparator`]を使用します。
//! 進捗はフェーズごとに通知され、結果は1回だけ返されます。

mod api;
mod builder;
mod config;
mod error;
mod eval;
mod extract;
mod format;
mod formatter;
mod output;
mod parser;
mod progress;
mod reconcile;
mod security;
mod task;
mod types;

// 公開API
pub use api::{ColumnMap, ParseConfig, QuantityCheck, ReportFormat};
pub use builder::ParseConfigBuilder;
pub use config::{load_parse_config, parse_config_str};
pub use error::{ErrorKind, NvlCheckError};
pub use extract::{extract_file, extract_records};
pub use output::{status_line, OutputFormatter};
pub use progress::{NoProgress, Phase, ProgressReporter, StderrProgress};
pub use reconcile::{compare, compare_files, ComparisonResult};
pub use task::{Comparator, ComparisonHandle, ComparisonRequest};
pub use types::Record;
