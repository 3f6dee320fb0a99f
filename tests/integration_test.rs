//! Integration Tests for nvlcheck
//!
//! rust_xlsxwriterでBOMワークブックをメモリ上に生成し、
//! 抽出から比較までの一連の動作を検証します。

use rust_xlsxwriter::*;
use std::io::Cursor;
use std::path::Path;
use std::sync::Mutex;

use nvlcheck::{
    compare, compare_files, extract_records, ErrorKind, NoProgress, NvlCheckError, ParseConfig,
    ParseConfigBuilder, Phase, ProgressReporter, QuantityCheck, Record,
};

// Helper module for generating test fixtures
mod fixtures {
    use super::*;

    /// 数量セルの内容
    pub enum Qty<'a> {
        Number(f64),
        Text(&'a str),
        Blank,
    }

    /// 構成ツール形式のBOM（シート"BoM"、3行目から、F/G/H列）
    ///
    /// 先頭にヘッダー行を持ち、最終行に合計行を含みます。
    pub fn configurator_bom(rows: &[(&str, Qty, &str)]) -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("BoM")?;

        worksheet.write_string(0, 0, "Configurator export")?;
        worksheet.write_string(2, 5, "Item")?;
        worksheet.write_string(2, 6, "Qty")?;
        worksheet.write_string(2, 7, "SKU")?;

        let mut row = 3;
        for (item, qty, sku) in rows {
            write_row(worksheet, row, (5, 6, 7), item, qty, sku)?;
            row += 1;
        }
        worksheet.write_string(row, 5, "Total")?;

        Ok(workbook.save_to_buffer()?)
    }

    /// ExpertBOM形式のBOM（シート"ExpertBOM"、6行目から、A/B/C列）
    pub fn expert_bom(rows: &[(&str, Qty, &str)]) -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("ExpertBOM")?;

        worksheet.write_string(0, 0, "Expert BOM")?;
        worksheet.write_string(5, 0, "Item")?;
        worksheet.write_string(5, 1, "Qty")?;
        worksheet.write_string(5, 2, "SKU")?;

        let mut row = 6;
        for (item, qty, sku) in rows {
            write_row(worksheet, row, (0, 1, 2), item, qty, sku)?;
            row += 1;
        }

        Ok(workbook.save_to_buffer()?)
    }

    fn write_row(
        worksheet: &mut Worksheet,
        row: u32,
        cols: (u16, u16, u16),
        item: &str,
        qty: &Qty,
        sku: &str,
    ) -> Result<(), XlsxError> {
        worksheet.write_string(row, cols.0, item)?;
        match qty {
            Qty::Number(n) => {
                worksheet.write_number(row, cols.1, *n)?;
            }
            Qty::Text(s) => {
                worksheet.write_string(row, cols.1, *s)?;
            }
            Qty::Blank => {}
        }
        worksheet.write_string(row, cols.2, sku)?;
        Ok(())
    }
}

use fixtures::Qty;

fn configurator_config() -> ParseConfig {
    ParseConfigBuilder::new("BoM")
        .with_first_data_row(3)
        .with_columns(5, 6, 7)
        .build()
        .unwrap()
}

fn expert_config() -> ParseConfig {
    ParseConfigBuilder::new("ExpertBOM")
        .with_first_data_row(6)
        .with_columns(0, 1, 2)
        .build()
        .unwrap()
}

fn extract(data: Vec<u8>, config: &ParseConfig) -> Result<Vec<Record>, NvlCheckError> {
    extract_records(Cursor::new(data), config)
}

// ============================================================================
// Reconciliation scenarios
// ============================================================================

/// 合計行はレコードにならず、一致と判定される
#[test]
fn test_matching_boms_ignore_total_row() {
    let source = fixtures::configurator_bom(&[("Widget", Qty::Number(3.0), "SKU1")]).unwrap();
    let target = fixtures::expert_bom(&[("Widget", Qty::Number(3.0), "SKU1")]).unwrap();

    let source = extract(source, &configurator_config()).unwrap();
    let target = extract(target, &expert_config()).unwrap();
    assert_eq!(source, vec![Record::new("Widget", "3", "SKU1")]);

    let result = compare(source, target);
    assert!(result.matched);
    assert!(result.source_only.is_empty());
    assert!(result.target_only.is_empty());
}

/// ターゲットに存在しない品目はソースのみとして報告される
#[test]
fn test_missing_item_is_reported() {
    let source = fixtures::configurator_bom(&[
        ("Widget", Qty::Number(3.0), "SKU1"),
        ("Gadget", Qty::Number(2.0), "SKU9"),
    ])
    .unwrap();
    let target = fixtures::expert_bom(&[("Widget", Qty::Number(3.0), "SKU1")]).unwrap();

    let result = compare(
        extract(source, &configurator_config()).unwrap(),
        extract(target, &expert_config()).unwrap(),
    );

    assert!(!result.matched);
    assert_eq!(result.source_only.len(), 1);
    assert!(result
        .source_only
        .contains(&Record::new("Gadget", "2", "SKU9")));
    assert!(result.target_only.is_empty());
}

/// 表示書式の違い（"3" と "3.0"）は不一致になる
#[test]
fn test_display_format_difference_is_mismatch() {
    let source = {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("BoM").unwrap();
        let one_decimal = Format::new().set_num_format("0.0");
        worksheet.write_string(3, 5, "Widget").unwrap();
        worksheet
            .write_number_with_format(3, 6, 3.0, &one_decimal)
            .unwrap();
        worksheet.write_string(3, 7, "SKU1").unwrap();
        workbook.save_to_buffer().unwrap()
    };
    let target = fixtures::expert_bom(&[("Widget", Qty::Number(3.0), "SKU1")]).unwrap();

    let source = extract(source, &configurator_config()).unwrap();
    assert_eq!(source, vec![Record::new("Widget", "3.0", "SKU1")]);

    let result = compare(source, extract(target, &expert_config()).unwrap());
    assert!(!result.matched);
    assert!(result
        .source_only
        .contains(&Record::new("Widget", "3.0", "SKU1")));
    assert!(result
        .target_only
        .contains(&Record::new("Widget", "3", "SKU1")));
}

/// 行の順序と重複は結果に影響しない
#[test]
fn test_row_order_and_duplicates_do_not_matter() {
    let source = fixtures::configurator_bom(&[
        ("Widget", Qty::Number(3.0), "SKU1"),
        ("Bolt", Qty::Number(10.0), "B1"),
        ("Widget", Qty::Number(3.0), "SKU1"),
    ])
    .unwrap();
    let target = fixtures::expert_bom(&[
        ("Bolt", Qty::Number(10.0), "B1"),
        ("Widget", Qty::Number(3.0), "SKU1"),
    ])
    .unwrap();

    let result = compare(
        extract(source, &configurator_config()).unwrap(),
        extract(target, &expert_config()).unwrap(),
    );
    assert!(result.matched);
    assert_eq!(result.source_count, 2);
    assert_eq!(result.target_count, 2);
}

/// ターゲットのみのレコードがあれば、ソースのみの差分がなくても不一致
#[test]
fn test_target_only_records_break_match() {
    let source = fixtures::configurator_bom(&[("Widget", Qty::Number(3.0), "SKU1")]).unwrap();
    let target = fixtures::expert_bom(&[
        ("Widget", Qty::Number(3.0), "SKU1"),
        ("Spare", Qty::Number(1.0), "SP1"),
    ])
    .unwrap();

    let result = compare(
        extract(source, &configurator_config()).unwrap(),
        extract(target, &expert_config()).unwrap(),
    );
    assert!(!result.matched);
    assert!(result.source_only.is_empty());
    assert_eq!(
        result.target_only.iter().collect::<Vec<_>>(),
        vec![&Record::new("Spare", "1", "SP1")]
    );
}

// ============================================================================
// Extraction rules
// ============================================================================

/// 空行・品目が空の行・合計行（大文字小文字や前後の空白を問わない）はスキップされる
#[test]
fn test_sentinel_and_blank_rows_are_skipped() {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("ExpertBOM").unwrap();
    worksheet.write_string(6, 0, "Widget").unwrap();
    worksheet.write_number(6, 1, 3.0).unwrap();
    worksheet.write_string(6, 2, "SKU1").unwrap();
    // 7行目は空行
    worksheet.write_number(8, 1, 5.0).unwrap(); // 品目が空
    worksheet.write_string(8, 2, "ORPHAN").unwrap();
    worksheet.write_string(9, 0, "  TOTAL  ").unwrap();
    worksheet.write_number(9, 1, 3.0).unwrap();
    worksheet.write_string(10, 0, "Bolt").unwrap();
    worksheet.write_number(10, 1, 10.0).unwrap();
    worksheet.write_string(10, 2, "B1").unwrap();
    let data = workbook.save_to_buffer().unwrap();

    let records = extract(data, &expert_config()).unwrap();
    assert_eq!(
        records,
        vec![
            Record::new("Widget", "3", "SKU1"),
            Record::new("Bolt", "10", "B1"),
        ]
    );
}

/// データ開始行より前のヘッダー行は読み込まれない
#[test]
fn test_header_rows_are_not_records() {
    let data = fixtures::expert_bom(&[("Widget", Qty::Number(3.0), "SKU1")]).unwrap();
    let records = extract(data, &expert_config()).unwrap();

    assert_eq!(records.len(), 1);
    assert!(records.iter().all(|r| r.item != "Item"));
}

/// データ終了行を指定すると、それより下の行は読み込まれない
#[test]
fn test_last_data_row_limits_scan() {
    let data = fixtures::expert_bom(&[
        ("Widget", Qty::Number(3.0), "SKU1"),
        ("Bolt", Qty::Number(10.0), "B1"),
        ("Notes", Qty::Blank, "see appendix"),
    ])
    .unwrap();
    let config = ParseConfigBuilder::new("ExpertBOM")
        .with_first_data_row(6)
        .with_last_data_row(7)
        .with_columns(0, 1, 2)
        .build()
        .unwrap();

    let records = extract(data, &config).unwrap();
    assert_eq!(
        records,
        vec![
            Record::new("Widget", "3", "SKU1"),
            Record::new("Bolt", "10", "B1"),
        ]
    );
}

/// 設定されたシートが存在しない場合はSheetNotFound
#[test]
fn test_missing_sheet_fails() {
    let data = fixtures::configurator_bom(&[("Widget", Qty::Number(3.0), "SKU1")]).unwrap();

    match extract(data, &expert_config()) {
        Err(e @ NvlCheckError::SheetNotFound { .. }) => {
            assert_eq!(e.kind(), ErrorKind::SheetNotFound);
            if let NvlCheckError::SheetNotFound { sheet, available } = e {
                assert_eq!(sheet, "ExpertBOM");
                assert_eq!(available, vec!["BoM".to_string()]);
            }
        }
        other => panic!("Expected SheetNotFound, got {:?}", other),
    }
}

/// シート名は完全一致で照合される
#[test]
fn test_sheet_name_is_exact() {
    let data = fixtures::expert_bom(&[("Widget", Qty::Number(3.0), "SKU1")]).unwrap();
    let config = ParseConfigBuilder::new("expertbom")
        .with_first_data_row(6)
        .build()
        .unwrap();

    assert!(matches!(
        extract(data, &config),
        Err(NvlCheckError::SheetNotFound { .. })
    ));
}

/// ソリューションID列を指定すると、レコードの4番目のフィールドになる
#[test]
fn test_solution_id_column() {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("ExpertBOM").unwrap();
    worksheet.write_string(6, 0, "Widget").unwrap();
    worksheet.write_number(6, 1, 3.0).unwrap();
    worksheet.write_string(6, 2, "SKU1").unwrap();
    worksheet.write_string(6, 5, "SOL-1").unwrap();
    worksheet.write_string(7, 0, "Bolt").unwrap();
    worksheet.write_number(7, 1, 10.0).unwrap();
    worksheet.write_string(7, 2, "B1").unwrap();
    let data = workbook.save_to_buffer().unwrap();

    let config = ParseConfigBuilder::new("ExpertBOM")
        .with_first_data_row(6)
        .with_columns(0, 1, 2)
        .with_solution_id_column(5)
        .build()
        .unwrap();

    let records = extract(data, &config).unwrap();
    assert_eq!(
        records,
        vec![
            Record::new("Widget", "3", "SKU1").with_solution_id("SOL-1"),
            // 空のソリューションIDも空文字列として保持する
            Record::new("Bolt", "10", "B1").with_solution_id(""),
        ]
    );
}

/// 数値のSKUや前後に空白を含むセルは表示文字列に正規化される
#[test]
fn test_display_strings_are_trimmed() {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("ExpertBOM").unwrap();
    worksheet.write_string(6, 0, "  Widget ").unwrap();
    worksheet.write_number(6, 1, 3.0).unwrap();
    worksheet.write_number(6, 2, 12345.0).unwrap();
    let data = workbook.save_to_buffer().unwrap();

    let records = extract(data, &expert_config()).unwrap();
    assert_eq!(records, vec![Record::new("Widget", "3", "12345")]);
}

// ============================================================================
// Quantity policy
// ============================================================================

fn text_quantity_bom() -> Vec<u8> {
    fixtures::expert_bom(&[
        ("Widget", Qty::Number(3.0), "SKU1"),
        ("Cable", Qty::Text("two"), "C2"),
        ("Manual", Qty::Blank, "M1"),
    ])
    .unwrap()
}

fn with_policy(check: QuantityCheck) -> ParseConfig {
    ParseConfigBuilder::new("ExpertBOM")
        .with_first_data_row(6)
        .with_columns(0, 1, 2)
        .with_quantity_check(check)
        .build()
        .unwrap()
}

/// Lenient: テキストの数量もそのまま使う
#[test]
fn test_quantity_lenient_keeps_text() {
    let records = extract(text_quantity_bom(), &with_policy(QuantityCheck::Lenient)).unwrap();
    assert_eq!(
        records,
        vec![
            Record::new("Widget", "3", "SKU1"),
            Record::new("Cable", "two", "C2"),
            Record::new("Manual", "", "M1"),
        ]
    );
}

/// SkipText: テキストの数量の行をスキップし、空の数量は影響を受けない
#[test]
fn test_quantity_skip_text() {
    let records = extract(text_quantity_bom(), &with_policy(QuantityCheck::SkipText)).unwrap();
    assert_eq!(
        records,
        vec![
            Record::new("Widget", "3", "SKU1"),
            Record::new("Manual", "", "M1"),
        ]
    );
}

/// Strict: テキストの数量でCellCoercionエラー
#[test]
fn test_quantity_strict_fails_on_text() {
    match extract(text_quantity_bom(), &with_policy(QuantityCheck::Strict)) {
        Err(NvlCheckError::CellCoercion {
            sheet,
            cell,
            expected,
            found,
        }) => {
            assert_eq!(sheet, "ExpertBOM");
            assert_eq!(cell, "B8");
            assert_eq!(expected, "numeric quantity");
            assert!(found.contains("two"));
        }
        other => panic!("Expected CellCoercion, got {:?}", other),
    }
}

/// Strict: 数値と空の数量だけなら成功する
#[test]
fn test_quantity_strict_accepts_numbers_and_blanks() {
    let data = fixtures::expert_bom(&[
        ("Widget", Qty::Number(3.0), "SKU1"),
        ("Manual", Qty::Blank, "M1"),
    ])
    .unwrap();

    let records = extract(data, &with_policy(QuantityCheck::Strict)).unwrap();
    assert_eq!(records.len(), 2);
}

// ============================================================================
// Cell rendering
// ============================================================================

/// 数式セルは計算結果と同じ値になる（キャッシュ値があっても評価する）
#[test]
fn test_formula_matches_cached_result() {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("ExpertBOM").unwrap();
    worksheet.write_number(0, 5, 1.0).unwrap();
    worksheet.write_number(0, 6, 2.0).unwrap();
    worksheet.write_string(6, 0, "Widget").unwrap();
    worksheet
        .write_formula(6, 1, Formula::new("=F1+G1").set_result("3"))
        .unwrap();
    worksheet.write_string(6, 2, "SKU1").unwrap();
    let data = workbook.save_to_buffer().unwrap();

    let records = extract(data, &expert_config()).unwrap();
    assert_eq!(records, vec![Record::new("Widget", "3", "SKU1")]);
}

/// 計算結果が保存されていない数式も評価される
#[test]
fn test_formula_without_cached_result_is_evaluated() {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("ExpertBOM").unwrap();
    worksheet.write_number(0, 5, 1.0).unwrap();
    worksheet.write_number(0, 6, 2.0).unwrap();
    worksheet.write_string(0, 7, "Widget").unwrap();
    worksheet.write_formula(6, 0, "=H1").unwrap();
    worksheet.write_formula(6, 1, "=F1+G1").unwrap();
    worksheet.write_string(6, 2, "SKU1").unwrap();
    let data = workbook.save_to_buffer().unwrap();

    let records = extract(data, &expert_config()).unwrap();
    assert_eq!(records, vec![Record::new("Widget", "3", "SKU1")]);
}

/// 数式の結果にはセル自身の数値書式が適用される
#[test]
fn test_formula_result_uses_cell_format() {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("ExpertBOM").unwrap();
    let one_decimal = Format::new().set_num_format("0.0");

    worksheet.write_number(0, 5, 4.0).unwrap();
    worksheet.write_string(6, 0, "Cable").unwrap();
    worksheet
        .write_formula_with_format(6, 1, "=ROUND(F1/3,0)*2", &one_decimal)
        .unwrap();
    worksheet.write_formula(6, 2, "=\"C-\"&F1").unwrap();
    let data = workbook.save_to_buffer().unwrap();

    let records = extract(data, &expert_config()).unwrap();
    assert_eq!(records, vec![Record::new("Cable", "2.0", "C-4")]);
}

/// 評価できない数式はキャッシュされた値を使う
#[test]
fn test_unsupported_formula_uses_cached_result() {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("ExpertBOM").unwrap();
    let prices = workbook.add_worksheet();
    prices.set_name("Prices").unwrap();
    prices.write_number(0, 0, 5.0).unwrap();

    let worksheet = workbook.worksheet_from_name("ExpertBOM").unwrap();
    worksheet.write_string(6, 0, "Widget").unwrap();
    worksheet
        .write_formula(6, 1, Formula::new("=Prices!A1").set_result("5"))
        .unwrap();
    worksheet.write_string(6, 2, "SKU1").unwrap();
    let data = workbook.save_to_buffer().unwrap();

    let records = extract(data, &expert_config()).unwrap();
    assert_eq!(records, vec![Record::new("Widget", "5", "SKU1")]);
}

/// 数量ポリシーは数式の評価結果に適用される
#[test]
fn test_quantity_policy_applies_to_formula_result() {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("ExpertBOM").unwrap();
    worksheet.write_string(6, 0, "Widget").unwrap();
    worksheet.write_formula(6, 1, "=\"3\"&\" pcs\"").unwrap();
    worksheet.write_string(6, 2, "SKU1").unwrap();
    worksheet.write_string(7, 0, "Gadget").unwrap();
    worksheet.write_formula(7, 1, "=1+1").unwrap();
    worksheet.write_string(7, 2, "SKU9").unwrap();
    let data = workbook.save_to_buffer().unwrap();

    let config = ParseConfigBuilder::new("ExpertBOM")
        .with_first_data_row(6)
        .with_quantity_check(QuantityCheck::SkipText)
        .build()
        .unwrap();
    let records = extract(data, &config).unwrap();
    assert_eq!(records, vec![Record::new("Gadget", "2", "SKU9")]);
}

/// 数値書式（桁区切り・パーセント・日付）が表示文字列に反映される
#[test]
fn test_number_formats_are_applied() {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("ExpertBOM").unwrap();

    let thousands = Format::new().set_num_format("#,##0");
    let percent = Format::new().set_num_format("0%");
    let date = Format::new().set_num_format("yyyy-mm-dd");

    worksheet.write_string(6, 0, "Screws").unwrap();
    worksheet
        .write_number_with_format(6, 1, 1234.0, &thousands)
        .unwrap();
    worksheet.write_string(6, 2, "S1").unwrap();

    worksheet.write_string(7, 0, "Margin").unwrap();
    worksheet
        .write_number_with_format(7, 1, 0.25, &percent)
        .unwrap();
    worksheet.write_string(7, 2, "M1").unwrap();

    worksheet.write_string(8, 0, "Delivery").unwrap();
    worksheet.write_number(8, 1, 1.0).unwrap();
    worksheet
        .write_number_with_format(8, 2, 45658.0, &date)
        .unwrap();
    let data = workbook.save_to_buffer().unwrap();

    let records = extract(data, &expert_config()).unwrap();
    assert_eq!(
        records,
        vec![
            Record::new("Screws", "1,234", "S1"),
            Record::new("Margin", "25%", "M1"),
            Record::new("Delivery", "1", "2025-01-01"),
        ]
    );
}

/// 書式なしの小数はGeneral形式で表示される
#[test]
fn test_general_format_decimals() {
    let data = fixtures::expert_bom(&[
        ("Half", Qty::Number(0.5), "H1"),
        ("Third", Qty::Number(1.0 / 3.0), "T1"),
    ])
    .unwrap();

    let records = extract(data, &expert_config()).unwrap();
    assert_eq!(records[0].quantity, "0.5");
    assert_eq!(records[1].quantity, "0.3333333333");
}

/// 真偽値セルはTRUE/FALSEとして表示される
#[test]
fn test_boolean_cells() {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("ExpertBOM").unwrap();
    worksheet.write_string(6, 0, "Option").unwrap();
    worksheet.write_number(6, 1, 1.0).unwrap();
    worksheet.write_boolean(6, 2, true).unwrap();
    let data = workbook.save_to_buffer().unwrap();

    let records = extract(data, &expert_config()).unwrap();
    assert_eq!(records, vec![Record::new("Option", "1", "TRUE")]);
}

// ============================================================================
// File based comparison
// ============================================================================

/// 受け取ったフェーズを記録するレポーター
#[derive(Default)]
struct RecordingProgress(Mutex<Vec<Phase>>);

impl ProgressReporter for RecordingProgress {
    fn report(&self, phase: Phase) {
        self.0.lock().unwrap().push(phase);
    }
}

fn write_temp(dir: &Path, name: &str, data: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}

/// ファイルからの比較ではフェーズが順番に1回ずつ通知される
#[test]
fn test_compare_files_reports_phases_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_temp(
        dir.path(),
        "configurator.xlsx",
        &fixtures::configurator_bom(&[("Widget", Qty::Number(3.0), "SKU1")]).unwrap(),
    );
    let target = write_temp(
        dir.path(),
        "expert.xlsx",
        &fixtures::expert_bom(&[("Widget", Qty::Number(3.0), "SKU1")]).unwrap(),
    );

    let progress = RecordingProgress::default();
    let result = compare_files(
        &source,
        &target,
        &configurator_config(),
        &expert_config(),
        &progress,
    )
    .unwrap();
    assert!(result.matched);

    let phases = progress.0.into_inner().unwrap();
    assert_eq!(
        phases,
        vec![
            Phase::ReadingSource {
                file: source.clone()
            },
            Phase::ReadingTarget {
                file: target.clone()
            },
            Phase::Comparing,
        ]
    );
    assert_eq!(
        phases[0].to_string(),
        "Reading source file: configurator.xlsx..."
    );
}

/// 同じ入力に対する比較は常に同じ結果になる
#[test]
fn test_compare_files_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_temp(
        dir.path(),
        "source.xlsx",
        &fixtures::configurator_bom(&[
            ("Widget", Qty::Number(3.0), "SKU1"),
            ("Gadget", Qty::Number(2.0), "SKU9"),
        ])
        .unwrap(),
    );
    let target = write_temp(
        dir.path(),
        "target.xlsx",
        &fixtures::expert_bom(&[("Widget", Qty::Number(3.0), "SKU1")]).unwrap(),
    );

    let run = || {
        compare_files(
            &source,
            &target,
            &configurator_config(),
            &expert_config(),
            &NoProgress,
        )
        .unwrap()
    };
    assert_eq!(run(), run());
}

/// ターゲットが読み込めない場合は部分的な結果を返さずエラーになる
#[test]
fn test_compare_files_propagates_target_errors() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_temp(
        dir.path(),
        "source.xlsx",
        &fixtures::configurator_bom(&[("Widget", Qty::Number(3.0), "SKU1")]).unwrap(),
    );
    let target = write_temp(dir.path(), "target.xlsx", b"not a workbook");

    let progress = RecordingProgress::default();
    let result = compare_files(
        &source,
        &target,
        &configurator_config(),
        &expert_config(),
        &progress,
    );

    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileUnreadable);
    // 比較フェーズには到達しない
    assert_eq!(progress.0.into_inner().unwrap().len(), 2);
}
