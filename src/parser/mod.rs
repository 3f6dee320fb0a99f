//! Parser Module
//!
//! calamineとXMLメタデータを組み合わせたxlsxファイル解析の実装。

mod metadata;
mod workbook;

pub(crate) use metadata::XlsxMetadata;
pub(crate) use workbook::{SheetCells, WorkbookParser};
