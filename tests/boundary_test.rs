//! Boundary Tests for nvlcheck
//!
//! 空のシート、走査範囲の端、日付シリアル値の境界、破損ファイルなどの
//! 境界条件での抽出動作を検証します。

use rust_xlsxwriter::*;
use std::io::Cursor;

use nvlcheck::{extract_records, ErrorKind, NvlCheckError, ParseConfigBuilder, Record};

// Helper module for generating boundary test fixtures
mod fixtures {
    use super::*;

    /// 値が1つもないシート
    pub fn generate_empty_sheet() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("BoM")?;
        Ok(workbook.save_to_buffer()?)
    }

    /// ヘッダー行のみのシート
    pub fn generate_header_only() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("BoM")?;
        worksheet.write_string(0, 0, "Item")?;
        worksheet.write_string(0, 1, "Qty")?;
        worksheet.write_string(0, 2, "SKU")?;
        Ok(workbook.save_to_buffer()?)
    }

    /// 日付シリアル値の境界（1900年系）
    pub fn generate_epoch_boundary_dates() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("BoM")?;

        let date_format = Format::new().set_num_format("yyyy-mm-dd");

        // シリアル値1 = 1900-01-01
        worksheet.write_string(0, 0, "Epoch")?;
        worksheet.write_number(0, 1, 1.0)?;
        worksheet.write_number_with_format(0, 2, 1.0, &date_format)?;

        // シリアル値73050 = 2099-12-31
        worksheet.write_string(1, 0, "Future")?;
        worksheet.write_number(1, 1, 1.0)?;
        worksheet.write_number_with_format(1, 2, 73050.0, &date_format)?;

        // 書式なしのシリアル値は数値のまま表示される
        worksheet.write_string(2, 0, "Serial")?;
        worksheet.write_number(2, 1, 1.0)?;
        worksheet.write_number(2, 2, 73050.0)?;

        Ok(workbook.save_to_buffer()?)
    }

    /// 長いセル内容と全角文字
    pub fn generate_long_and_wide_content() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("BoM")?;

        let long_item = "A".repeat(32_767);
        worksheet.write_string(0, 0, &long_item)?;
        worksheet.write_number(0, 1, 1.0)?;
        worksheet.write_string(0, 2, "LONG")?;

        worksheet.write_string(1, 0, "六角ボルト M8")?;
        worksheet.write_number(1, 1, 12.0)?;
        worksheet.write_string(1, 2, "ボルト-08")?;

        Ok(workbook.save_to_buffer()?)
    }

    /// xlsxとして解析できないデータ
    pub fn generate_corrupted_file() -> Vec<u8> {
        b"This is not a valid Excel file content".to_vec()
    }

    /// ZIPヘッダーのみを持つ壊れたデータ
    pub fn generate_invalid_structure() -> Vec<u8> {
        let mut data = vec![0x50, 0x4B, 0x03, 0x04];
        data.extend_from_slice(b"INVALID_CONTENT");
        data
    }
}

fn bom_config() -> nvlcheck::ParseConfig {
    ParseConfigBuilder::new("BoM").build().unwrap()
}

#[test]
fn test_empty_sheet_yields_no_records() {
    let data = fixtures::generate_empty_sheet().unwrap();
    let records = extract_records(Cursor::new(data), &bom_config()).unwrap();
    assert!(records.is_empty());
}

#[test]
fn test_empty_sheet_with_fixed_last_row() {
    let data = fixtures::generate_empty_sheet().unwrap();
    let config = ParseConfigBuilder::new("BoM")
        .with_first_data_row(3)
        .with_last_data_row(20)
        .build()
        .unwrap();

    let records = extract_records(Cursor::new(data), &config).unwrap();
    assert!(records.is_empty());
}

#[test]
fn test_first_data_row_beyond_last_populated_row() {
    let data = fixtures::generate_header_only().unwrap();
    let config = ParseConfigBuilder::new("BoM")
        .with_first_data_row(5)
        .build()
        .unwrap();

    let records = extract_records(Cursor::new(data), &config).unwrap();
    assert!(records.is_empty());
}

#[test]
fn test_last_data_row_at_sheet_limit_stops_at_populated_rows() {
    // シート末尾の行を指定しても、走査は値のある最終行で止まる
    let data = fixtures::generate_header_only().unwrap();
    let config = ParseConfigBuilder::new("BoM")
        .with_last_data_row(1_048_575)
        .build()
        .unwrap();

    let records = extract_records(Cursor::new(data), &config).unwrap();
    assert_eq!(records, vec![Record::new("Item", "Qty", "SKU")]);
}

#[test]
fn test_last_data_row_beyond_sheet_limit_is_rejected() {
    for row in [1_048_576, u32::MAX] {
        match ParseConfigBuilder::new("BoM").with_last_data_row(row).build() {
            Err(e) => assert_eq!(e.kind(), ErrorKind::Config),
            Ok(config) => panic!("Expected Config error, got {:?}", config),
        }
    }
}

#[test]
fn test_header_row_is_a_record_when_first_data_row_is_zero() {
    // データ開始行の設定がずれていれば、ヘッダーもレコードとして読まれる
    let data = fixtures::generate_header_only().unwrap();
    let records = extract_records(Cursor::new(data), &bom_config()).unwrap();
    assert_eq!(records, vec![Record::new("Item", "Qty", "SKU")]);
}

#[test]
fn test_columns_outside_used_range_are_blank() {
    let data = fixtures::generate_header_only().unwrap();
    let config = ParseConfigBuilder::new("BoM")
        .with_columns(0, 200, 16_383)
        .build()
        .unwrap();

    let records = extract_records(Cursor::new(data), &config).unwrap();
    assert_eq!(records, vec![Record::new("Item", "", "")]);
}

#[test]
fn test_date_epoch_boundary() {
    let data = fixtures::generate_epoch_boundary_dates().unwrap();
    let records = extract_records(Cursor::new(data), &bom_config()).unwrap();

    assert_eq!(
        records,
        vec![
            Record::new("Epoch", "1", "1900-01-01"),
            Record::new("Future", "1", "2099-12-31"),
            Record::new("Serial", "1", "73050"),
        ]
    );
}

#[test]
fn test_long_and_wide_content() {
    let data = fixtures::generate_long_and_wide_content().unwrap();
    let records = extract_records(Cursor::new(data), &bom_config()).unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].item.len(), 32_767);
    assert_eq!(records[1], Record::new("六角ボルト M8", "12", "ボルト-08"));
}

#[test]
fn test_corrupted_file() {
    let data = fixtures::generate_corrupted_file();
    let result = extract_records(Cursor::new(data), &bom_config());

    match result {
        Err(e @ (NvlCheckError::Parse(_) | NvlCheckError::Io(_))) => {
            assert_eq!(e.kind(), ErrorKind::FileUnreadable);
        }
        other => panic!("Expected Parse or Io error for corrupted file, got {:?}", other),
    }
}

#[test]
fn test_invalid_structure() {
    let data = fixtures::generate_invalid_structure();
    let result = extract_records(Cursor::new(data), &bom_config());

    match result {
        Err(NvlCheckError::Parse(_)) | Err(NvlCheckError::Io(_)) | Err(NvlCheckError::Zip(_)) => {}
        other => panic!(
            "Expected Parse, Io or Zip error for invalid structure, got {:?}",
            other
        ),
    }
}

#[test]
fn test_empty_input() {
    let result = extract_records(Cursor::new(Vec::new()), &bom_config());
    assert!(result.is_err());
}
