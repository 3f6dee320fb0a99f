//! Markdown Table Module
//!
//! レコードを列幅の揃ったMarkdownテーブルとして描画するモジュール。
//! 全角文字（日本語など）は表示幅2として計算します。

use std::io::Write;
use unicode_width::UnicodeWidthStr;

use crate::error::NvlCheckError;
use crate::types::Record;

/// レコード描画用のテーブル
///
/// 1行目をヘッダーとして扱います。
#[derive(Debug)]
pub(crate) struct RecordTable {
    rows: Vec<Vec<String>>,
}

impl RecordTable {
    /// レコード集合からテーブルを構築
    ///
    /// ソリューションIDを持つレコードが1つでもある場合のみ、ソリューションID列を追加します。
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a Record>) -> Self {
        let records: Vec<&Record> = records.into_iter().collect();
        let with_solution = records.iter().any(|r| r.solution_id.is_some());

        let mut header = vec![
            "Item".to_string(),
            "Quantity".to_string(),
            "SKU".to_string(),
        ];
        if with_solution {
            header.push("Solution ID".to_string());
        }

        let mut rows = vec![header];
        for record in records {
            let mut row = vec![
                escape_cell(&record.item),
                escape_cell(&record.quantity),
                escape_cell(&record.sku),
            ];
            if with_solution {
                row.push(escape_cell(record.solution_id.as_deref().unwrap_or_default()));
            }
            rows.push(row);
        }

        Self { rows }
    }

    /// Markdownテーブルとして出力
    pub fn render<W: Write>(&self, writer: &mut W) -> Result<(), NvlCheckError> {
        // 1. 列幅の計算
        let col_widths = self.calculate_column_widths();

        // 2. ヘッダー区切り行
        let separator = self.generate_separator(&col_widths);

        // 3. 各行の出力
        for (row_idx, row) in self.rows.iter().enumerate() {
            write!(writer, "|")?;
            for (col_idx, content) in row.iter().enumerate() {
                // 左揃え、残りを表示幅に基づいて空白で埋める
                let padding = col_widths[col_idx].saturating_sub(content.width());
                write!(writer, " {}{} |", content, " ".repeat(padding))?;
            }
            writeln!(writer)?;

            if row_idx == 0 {
                writeln!(writer, "{}", separator)?;
            }
        }

        Ok(())
    }

    /// 列幅を計算（最小幅は区切り行の3文字）
    fn calculate_column_widths(&self) -> Vec<usize> {
        let cols = self.rows.first().map_or(0, |header| header.len());
        let mut widths = vec![3; cols];

        for row in &self.rows {
            for (col_idx, content) in row.iter().enumerate() {
                widths[col_idx] = widths[col_idx].max(content.width());
            }
        }

        widths
    }

    /// ヘッダー区切り行を生成（セルの前後の空白1文字ずつを含む）
    fn generate_separator(&self, col_widths: &[usize]) -> String {
        let mut separator = String::from("|");
        for &width in col_widths {
            separator.push_str(&"-".repeat(width + 2));
            separator.push('|');
        }
        separator
    }
}

/// Markdown特殊文字をエスケープ
fn escape_cell(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('|', "\\|")
        .replace('\n', "<br>")
}
