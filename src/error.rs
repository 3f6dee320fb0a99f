//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use serde::Serialize;
use thiserror::Error;

/// nvlcheckクレート全体で使用するエラー型
///
/// ワークブックの読み込み、レコード抽出、比較処理中に発生する
/// すべてのエラーを統一的に扱うために使用されます。
/// 抽出中のエラーは比較処理の呼び出し元へそのまま伝播し、
/// 部分的な比較結果は返しません。
///
/// # 使用例
///
/// ```rust,no_run
/// use nvlcheck::NvlCheckError;
/// use std::fs::File;
///
/// fn open_bom(path: &str) -> Result<(), NvlCheckError> {
///     let _file = File::open(path)?;  // Ioエラーが自動的に変換される
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum NvlCheckError {
    /// I/O操作中に発生したエラー（ファイルが存在しない、ロックされているなど）
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// calamineがワークブックを解析できなかったエラー
    ///
    /// 破損したファイルや、xlsx以外のコンテナ形式が原因となります。
    #[error("Failed to parse Excel file: {0}")]
    Parse(#[from] calamine::Error),

    /// ZIPアーカイブの解析エラー
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// ワークブック内部XMLの解析エラー
    #[error("XML error: {0}")]
    Xml(String),

    /// UTF-8文字列の変換エラー
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// 数値の解析エラー
    #[error("Number parse error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    /// 設定されたシートがワークブックに存在しない
    ///
    /// 空のシートとして扱うと「全件不一致」に見える結果を返してしまうため、
    /// 常に致命的なエラーとして扱います。
    ///
    /// ```rust,no_run
    /// use nvlcheck::NvlCheckError;
    ///
    /// let error = NvlCheckError::SheetNotFound {
    ///     sheet: "ExpertBOM".to_string(),
    ///     available: vec!["Sheet1".to_string()],
    /// };
    /// // 出力: "Sheet 'ExpertBOM' not found (available: Sheet1)"
    /// println!("{}", error);
    /// ```
    #[error("Sheet '{sheet}' not found (available: {})", .available.join(", "))]
    SheetNotFound {
        /// 設定されたシート名
        sheet: String,
        /// ワークブックに実在するシート名
        available: Vec<String>,
    },

    /// セルのネイティブ型が期待した意味と一致しない
    ///
    /// `QuantityCheck::Strict`の場合のみ発生します。
    #[error("Unexpected cell type at sheet '{sheet}', cell {cell}: expected {expected}, found {found}")]
    CellCoercion {
        /// シート名
        sheet: String,
        /// セル座標（A1記法）
        cell: String,
        /// 期待した値の種類
        expected: String,
        /// 実際の値
        found: String,
    },

    /// 設定の検証に失敗したエラー
    ///
    /// `ParseConfigBuilder::build()`やTOML設定ファイルの読み込み時に発生します。
    #[error("Configuration error: {0}")]
    Config(String),

    /// セキュリティ制限に違反したエラー（ファイルサイズ上限など）
    #[error("Security violation: {0}")]
    SecurityViolation(String),

    /// 比較処理が既に実行中
    #[error("A comparison is already running")]
    Busy,

    /// バックグラウンドタスクの起動失敗、またはパニック
    #[error("Comparison task failed: {0}")]
    Task(String),
}

impl From<toml::de::Error> for NvlCheckError {
    fn from(err: toml::de::Error) -> Self {
        NvlCheckError::Config(err.to_string())
    }
}

impl From<zip::result::ZipError> for NvlCheckError {
    fn from(err: zip::result::ZipError) -> Self {
        NvlCheckError::Zip(err.to_string())
    }
}

impl From<quick_xml::Error> for NvlCheckError {
    fn from(err: quick_xml::Error) -> Self {
        NvlCheckError::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for NvlCheckError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        NvlCheckError::Xml(format!("attribute error: {}", err))
    }
}

/// 結果サーフェス（JSON出力など）で使用する安定したエラー分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// 設定されたシートが存在しない
    SheetNotFound,
    /// ファイルの読み込み・解析に失敗
    FileUnreadable,
    /// セル型の不一致（Strictポリシー）
    CellCoercion,
    /// 設定エラー
    Config,
    /// 入力制限違反
    SecurityViolation,
    /// 実行中の比較がある
    Busy,
    /// タスク実行エラー
    Task,
}

impl NvlCheckError {
    /// エラー分類を取得
    pub fn kind(&self) -> ErrorKind {
        match self {
            NvlCheckError::SheetNotFound { .. } => ErrorKind::SheetNotFound,
            NvlCheckError::Io(_)
            | NvlCheckError::Parse(_)
            | NvlCheckError::Zip(_)
            | NvlCheckError::Xml(_)
            | NvlCheckError::Utf8(_)
            | NvlCheckError::ParseInt(_) => ErrorKind::FileUnreadable,
            NvlCheckError::CellCoercion { .. } => ErrorKind::CellCoercion,
            NvlCheckError::Config(_) => ErrorKind::Config,
            NvlCheckError::SecurityViolation(_) => ErrorKind::SecurityViolation,
            NvlCheckError::Busy => ErrorKind::Busy,
            NvlCheckError::Task(_) => ErrorKind::Task,
        }
    }
}
