//! Extraction Module
//!
//! 設定されたシート・列からBOMレコードを抽出するモジュール。

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::api::{ParseConfig, QuantityCheck};
use crate::error::NvlCheckError;
use crate::eval::FormulaEvaluator;
use crate::formatter::CellFormatter;
use crate::parser::{SheetCells, WorkbookParser};
use crate::security::SecurityConfig;
use crate::types::{CellCoord, CellValue, RawCellData, Record};

/// 合計行を示す品目名（大文字小文字を区別しない）
const TOTAL_SENTINEL: &str = "total";

/// ファイルパスからレコードを抽出する
///
/// ファイルは全体をメモリに読み込んだ後、抽出を始める前に閉じられます。
///
/// # 使用例
///
/// ```rust,no_run
/// use nvlcheck::{extract_file, ParseConfigBuilder};
///
/// # fn main() -> Result<(), nvlcheck::NvlCheckError> {
/// let config = ParseConfigBuilder::new("ExpertBOM")
///     .with_first_data_row(6)
///     .with_columns(0, 1, 2)
///     .build()?;
///
/// for record in extract_file("expert.xlsx", &config)? {
///     println!("{}", record);
/// }
/// # Ok(())
/// # }
/// ```
pub fn extract_file(
    path: impl AsRef<Path>,
    config: &ParseConfig,
) -> Result<Vec<Record>, NvlCheckError> {
    let path = path.as_ref();
    tracing::debug!(file = %path.display(), sheet = %config.sheet_name, "Reading workbook");

    let mut parser = {
        let file = File::open(path)?;
        WorkbookParser::open(file, &SecurityConfig::default())?
    };
    extract(&mut parser, config)
}

/// リーダーからレコードを抽出する
///
/// `std::io::Cursor`を渡すことで、メモリ上のxlsxデータからも抽出できます。
pub fn extract_records<R: Read>(
    reader: R,
    config: &ParseConfig,
) -> Result<Vec<Record>, NvlCheckError> {
    let mut parser = WorkbookParser::open(reader, &SecurityConfig::default())?;
    extract(&mut parser, config)
}

/// 開いたワークブックからレコードを抽出する
///
/// # アルゴリズム
///
/// 1. シート名（完全一致）でシートを取得。存在しない場合は`SheetNotFound`
/// 2. `first_data_row`から、`last_data_row`（未指定の場合は値のある最終行）まで走査。
///    値または数式のある最終行より後は走査しない
/// 3. 各行について:
///    - 値のない行はスキップ
///    - 数式セルは評価した値を使用（評価できない数式はキャッシュされた値）
///    - 品目が空、または"Total"（大文字小文字を区別しない）の行はスキップ
///    - 数量セルに`QuantityCheck`ポリシーを適用
///    - 数量・SKU・ソリューションIDを表示文字列として読み取り、レコードを生成
/// 4. 行順のレコード列を返す
pub(crate) fn extract(
    parser: &mut WorkbookParser,
    config: &ParseConfig,
) -> Result<Vec<Record>, NvlCheckError> {
    let sheet = parser.load_sheet(&config.sheet_name)?;
    let mut reader = RowReader {
        sheet: &sheet,
        formatter: CellFormatter::new(sheet.is_1904()),
        evaluator: FormulaEvaluator::new(&sheet),
    };

    // 最終行より後は空行のみ
    let populated = sheet.last_populated_row();
    let last_row = match config.last_data_row {
        Some(row) => populated.map(|populated| row.min(populated)),
        None => populated,
    };

    let mut records = Vec::new();
    if let Some(last_row) = last_row {
        for row in config.first_data_row..=last_row {
            if let Some(record) = reader.read_row(row, config)? {
                records.push(record);
            }
        }
    }

    tracing::info!(
        sheet = %config.sheet_name,
        records = records.len(),
        "Extracted records"
    );
    Ok(records)
}

/// 1シート分の行読み取り
struct RowReader<'a> {
    sheet: &'a SheetCells,
    formatter: CellFormatter,
    evaluator: FormulaEvaluator<'a, SheetCells>,
}

impl RowReader<'_> {
    /// 1行を読み取り、スキップ対象の場合は`None`を返す
    fn read_row(
        &mut self,
        row: u32,
        config: &ParseConfig,
    ) -> Result<Option<Record>, NvlCheckError> {
        let columns = &config.columns;

        if self.sheet.is_row_blank(row) {
            return Ok(None);
        }

        let item = self.read_text(row, columns.item);
        if item.is_empty() || item.eq_ignore_ascii_case(TOTAL_SENTINEL) {
            tracing::debug!(row, item = %item, "Skipping row without item");
            return Ok(None);
        }

        let quantity_cell = self.cell(row, columns.quantity);
        if Self::is_text_quantity(&quantity_cell) {
            match config.quantity_check {
                QuantityCheck::Lenient => {}
                QuantityCheck::SkipText => {
                    tracing::debug!(row, item = %item, "Skipping row with text quantity");
                    return Ok(None);
                }
                QuantityCheck::Strict => {
                    return Err(NvlCheckError::CellCoercion {
                        sheet: self.sheet.name().to_string(),
                        cell: quantity_cell.coord.to_a1_notation(),
                        expected: "numeric quantity".to_string(),
                        found: quantity_cell.value.describe(),
                    });
                }
            }
        }
        let quantity = self.display(&quantity_cell);

        let sku = self.read_text(row, columns.sku);
        let solution_id = columns.solution_id.map(|col| self.read_text(row, col));

        Ok(Some(Record {
            item,
            quantity,
            sku,
            solution_id,
        }))
    }

    /// 空白のみのテキストは空セルと同じく扱い、ポリシーの対象外とする
    fn is_text_quantity(cell: &RawCellData) -> bool {
        matches!(&cell.value, CellValue::Text(s) if !s.trim().is_empty())
    }

    fn read_text(&mut self, row: u32, col: u32) -> String {
        let cell = self.cell(row, col);
        self.display(&cell)
    }

    /// セルを読み取る。数式セルの値は評価結果に置き換える
    fn cell(&mut self, row: u32, col: u32) -> RawCellData {
        let mut cell = self.sheet.cell(CellCoord::new(row, col));
        if let Some(ref formula) = cell.formula {
            match self.evaluator.evaluate_cell(cell.coord) {
                Ok(value) => cell.value = value,
                Err(reason) => tracing::warn!(
                    sheet = %self.sheet.name(),
                    cell = %cell.coord.to_a1_notation(),
                    formula = %formula,
                    reason = %reason,
                    cached = %cell.value.describe(),
                    "Formula evaluation unsupported; using cached value"
                ),
            }
        }
        cell
    }

    /// 表示文字列（前後の空白を除去）
    fn display(&mut self, cell: &RawCellData) -> String {
        self.formatter.format_cell(cell).trim().to_string()
    }
}
