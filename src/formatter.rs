//! Formatter Module
//!
//! セル値を表示文字列に変換するモジュール。
//! Excelの画面上の表示と同じ文字列を得るため、数値はセルの数値書式を通して描画します。

use std::collections::HashMap;

use crate::format::{format_general, FormatParser};
use crate::types::{CellValue, RawCellData};

/// セルフォーマッター
///
/// セル値のフォーマット処理のファサードとして機能します。
/// 同じ書式文字列のパース結果はシート内で再利用します。
#[derive(Debug)]
pub(crate) struct CellFormatter {
    /// 1904年エポックを使用するかどうか
    is_1904: bool,

    /// 書式文字列 -> パース済みの書式
    parsers: HashMap<String, FormatParser>,
}

impl CellFormatter {
    /// 新しいCellFormatterインスタンスを生成
    pub fn new(is_1904: bool) -> Self {
        Self {
            is_1904,
            parsers: HashMap::new(),
        }
    }

    /// セル値をフォーマット
    ///
    /// - テキスト: 保存されている文字列をそのまま返す
    /// - 数値: 数値書式で描画（書式がない場合は"General"）
    /// - 論理値: `TRUE` / `FALSE`
    /// - エラー: エラーコード（例: `#DIV/0!`）
    /// - 空セル: 空文字列
    pub fn format_cell(&mut self, raw_cell: &RawCellData) -> String {
        match &raw_cell.value {
            CellValue::Number(n) => self.format_number(*n, raw_cell.format_string.as_deref()),
            CellValue::Text(s) => s.clone(),
            CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::Error(e) => e.clone(),
            CellValue::Empty => String::new(),
        }
    }

    fn format_number(&mut self, value: f64, format_string: Option<&str>) -> String {
        match format_string {
            None => format_general(value),
            Some(format) if format.eq_ignore_ascii_case("general") => format_general(value),
            Some(format) => self
                .parsers
                .entry(format.to_string())
                .or_insert_with(|| FormatParser::parse(format))
                .format_number(value, self.is_1904),
        }
    }
}
