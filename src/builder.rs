//! Builder Module
//!
//! Fluent Builder APIを提供し、`ParseConfig`インスタンスを段階的に構築する。

use crate::api::{ColumnMap, ParseConfig, QuantityCheck, MAX_COLUMNS, MAX_ROWS};
use crate::error::NvlCheckError;

/// `ParseConfig`を段階的に構築するためのビルダー
///
/// シート名と3つの必須列（品目・数量・SKU）以外にはデフォルト値が設定されており、
/// 必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use nvlcheck::{ParseConfigBuilder, QuantityCheck};
///
/// # fn main() -> Result<(), nvlcheck::NvlCheckError> {
/// let configurator = ParseConfigBuilder::new("BoM")
///     .with_first_data_row(3)
///     .with_columns(5, 6, 7)
///     .with_solution_id_column(9)
///     .build()?;
///
/// let expert = ParseConfigBuilder::new("ExpertBOM")
///     .with_first_data_row(6)
///     .with_columns(0, 1, 2)
///     .with_quantity_check(QuantityCheck::SkipText)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ParseConfigBuilder {
    /// 内部設定（構築中）
    config: ParseConfig,
}

impl ParseConfigBuilder {
    /// シート名を指定してビルダーを生成する
    ///
    /// # デフォルト設定
    ///
    /// - データ開始行: 0
    /// - データ終了行: 最終行まで走査
    /// - 列: 品目=0, 数量=1, SKU=2, ソリューションIDなし
    /// - 数量チェック: `QuantityCheck::Lenient`
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self {
            config: ParseConfig {
                sheet_name: sheet_name.into(),
                first_data_row: 0,
                last_data_row: None,
                columns: ColumnMap {
                    item: 0,
                    quantity: 1,
                    sku: 2,
                    solution_id: None,
                },
                quantity_check: QuantityCheck::Lenient,
            },
        }
    }

    /// データ開始行（0始まり）を指定する
    pub fn with_first_data_row(mut self, row: u32) -> Self {
        self.config.first_data_row = row;
        self
    }

    /// データ終了行（0始まり、両端を含む）を指定する
    ///
    /// 指定しない場合は、シートの最終データ行まで走査します。
    pub fn with_last_data_row(mut self, row: u32) -> Self {
        self.config.last_data_row = Some(row);
        self
    }

    /// 品目・数量・SKUの列インデックス（0始まり）を指定する
    pub fn with_columns(mut self, item: u32, quantity: u32, sku: u32) -> Self {
        self.config.columns.item = item;
        self.config.columns.quantity = quantity;
        self.config.columns.sku = sku;
        self
    }

    /// ソリューションIDの列インデックス（0始まり）を指定する
    pub fn with_solution_id_column(mut self, col: u32) -> Self {
        self.config.columns.solution_id = Some(col);
        self
    }

    /// 数量セルの型チェックポリシーを指定する
    pub fn with_quantity_check(mut self, check: QuantityCheck) -> Self {
        self.config.quantity_check = check;
        self
    }

    /// 設定を検証し、`ParseConfig`を生成する
    ///
    /// # 発生し得るエラー
    ///
    /// * `NvlCheckError::Config(String)`:
    ///   * シート名が空
    ///   * データ終了行が開始行より前
    ///   * データ行がxlsxの行上限（1048576）超過
    ///   * 列インデックスの重複、またはxlsxの列上限（16384）超過
    pub fn build(self) -> Result<ParseConfig, NvlCheckError> {
        validate(&self.config)?;
        Ok(self.config)
    }
}

/// `ParseConfig`の整合性を検証する
///
/// ビルダーとTOML読み込みの両方から呼び出されます。
pub(crate) fn validate(config: &ParseConfig) -> Result<(), NvlCheckError> {
    // 1. シート名の検証
    if config.sheet_name.trim().is_empty() {
        return Err(NvlCheckError::Config(
            "sheet_name must not be empty".to_string(),
        ));
    }

    // 2. 行範囲の検証
    for (name, row) in [
        ("first_data_row", Some(config.first_data_row)),
        ("last_data_row", config.last_data_row),
    ] {
        if let Some(row) = row.filter(|row| *row >= MAX_ROWS) {
            return Err(NvlCheckError::Config(format!(
                "{} ({}) exceeds the xlsx row limit ({})",
                name, row, MAX_ROWS
            )));
        }
    }
    if let Some(last) = config.last_data_row {
        if last < config.first_data_row {
            return Err(NvlCheckError::Config(format!(
                "Invalid row range: last_data_row ({}) < first_data_row ({})",
                last, config.first_data_row
            )));
        }
    }

    // 3. 列インデックスの検証
    let entries = config.columns.entries();
    for (i, (name, col)) in entries.iter().enumerate() {
        if *col >= MAX_COLUMNS {
            return Err(NvlCheckError::Config(format!(
                "Column '{}' index {} exceeds the xlsx column limit ({})",
                name, col, MAX_COLUMNS
            )));
        }
        if let Some((other, _)) = entries[..i].iter().find(|(_, c)| c == col) {
            return Err(NvlCheckError::Config(format!(
                "Columns '{}' and '{}' both map to index {}",
                other, name, col
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = ParseConfigBuilder::new("Sheet1").build().unwrap();
        assert_eq!(config.sheet_name, "Sheet1");
        assert_eq!(config.first_data_row, 0);
        assert_eq!(config.last_data_row, None);
        assert_eq!(config.columns.item, 0);
        assert_eq!(config.columns.quantity, 1);
        assert_eq!(config.columns.sku, 2);
        assert_eq!(config.columns.solution_id, None);
        assert_eq!(config.quantity_check, QuantityCheck::Lenient);
    }

    #[test]
    fn test_builder_configurator_layout() {
        let config = ParseConfigBuilder::new("BoM")
            .with_first_data_row(3)
            .with_columns(5, 6, 7)
            .with_solution_id_column(9)
            .build()
            .unwrap();

        assert_eq!(config.first_data_row, 3);
        assert_eq!(config.columns.item, 5);
        assert_eq!(config.columns.quantity, 6);
        assert_eq!(config.columns.sku, 7);
        assert_eq!(config.columns.solution_id, Some(9));
    }

    #[test]
    fn test_builder_rejects_empty_sheet_name() {
        let result = ParseConfigBuilder::new("  ").build();
        assert!(matches!(result, Err(NvlCheckError::Config(_))));
    }

    #[test]
    fn test_builder_rejects_inverted_rows() {
        let result = ParseConfigBuilder::new("BoM")
            .with_first_data_row(10)
            .with_last_data_row(5)
            .build();

        match result {
            Err(NvlCheckError::Config(msg)) => {
                assert!(msg.contains("last_data_row (5)"));
                assert!(msg.contains("first_data_row (10)"));
            }
            _ => panic!("Expected Config error"),
        }
    }

    #[test]
    fn test_builder_accepts_single_row_range() {
        let config = ParseConfigBuilder::new("BoM")
            .with_first_data_row(4)
            .with_last_data_row(4)
            .build()
            .unwrap();
        assert_eq!(config.last_data_row, Some(4));
    }

    #[test]
    fn test_builder_rejects_rows_beyond_sheet_limit() {
        let result = ParseConfigBuilder::new("BoM")
            .with_last_data_row(u32::MAX)
            .build();
        match result {
            Err(NvlCheckError::Config(msg)) => assert!(msg.contains("last_data_row")),
            _ => panic!("Expected Config error"),
        }

        let result = ParseConfigBuilder::new("BoM")
            .with_first_data_row(MAX_ROWS)
            .build();
        assert!(matches!(result, Err(NvlCheckError::Config(_))));

        let config = ParseConfigBuilder::new("BoM")
            .with_last_data_row(MAX_ROWS - 1)
            .build()
            .unwrap();
        assert_eq!(config.last_data_row, Some(MAX_ROWS - 1));
    }

    #[test]
    fn test_builder_rejects_duplicate_columns() {
        let result = ParseConfigBuilder::new("BoM")
            .with_columns(5, 6, 7)
            .with_solution_id_column(6)
            .build();

        match result {
            Err(NvlCheckError::Config(msg)) => {
                assert!(msg.contains("quantity"));
                assert!(msg.contains("solution_id"));
            }
            _ => panic!("Expected Config error"),
        }
    }

    #[test]
    fn test_builder_rejects_out_of_range_column() {
        let result = ParseConfigBuilder::new("BoM")
            .with_columns(0, 1, MAX_COLUMNS)
            .build();
        assert!(matches!(result, Err(NvlCheckError::Config(_))));
    }
}
