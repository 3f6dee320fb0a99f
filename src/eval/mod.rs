//! Formula Evaluation Module
//!
//! 数式セルを同じシートのセル値から評価します。
//!
//! セル参照・範囲参照、四則演算・べき乗・文字列結合・比較、
//! よく使われる集計・丸め・論理・文字列関数に対応します。
//! 対応外の構文（他シート参照、名前付き範囲、未対応の関数など）は
//! [`Unsupported`]を返し、呼び出し側はキャッシュされた値を使用します。

mod evaluator;
mod parser;

use thiserror::Error;

use crate::parser::SheetCells;
use crate::types::{CellCoord, CellValue};

pub(crate) use evaluator::FormulaEvaluator;

/// 数式を評価できなかった理由
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{reason}")]
pub(crate) struct Unsupported {
    reason: String,
}

impl Unsupported {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// 評価時に参照するセルの取得元
pub(crate) trait CellSource {
    /// 数式内の`Sheet!A1`を同一シート参照とみなすシート名
    fn sheet_name(&self) -> &str;

    /// 保存されている値（数式セルの場合はキャッシュ値）
    fn stored_value(&self, coord: CellCoord) -> CellValue;

    /// 数式（先頭の`=`なし）
    fn formula(&self, coord: CellCoord) -> Option<&str>;

    /// 値または数式を持つセルの外接矩形
    fn used_bounds(&self) -> Option<(CellCoord, CellCoord)>;
}

impl CellSource for SheetCells {
    fn sheet_name(&self) -> &str {
        self.name()
    }

    fn stored_value(&self, coord: CellCoord) -> CellValue {
        self.value(coord)
    }

    fn formula(&self, coord: CellCoord) -> Option<&str> {
        SheetCells::formula(self, coord)
    }

    fn used_bounds(&self) -> Option<(CellCoord, CellCoord)> {
        SheetCells::used_bounds(self)
    }
}
