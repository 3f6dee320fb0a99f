//! Output Formatters Implementation
//!
//! 各出力フォーマットの実装を提供するモジュール。

use serde::Serialize;
use std::io::Write;

use super::table::RecordTable;
use crate::error::{ErrorKind, NvlCheckError};
use crate::reconcile::ComparisonResult;
use crate::types::Record;

/// タブ区切りテキスト形式のフォーマッター
///
/// ソースのみのレコードを1行ずつ出力します。
/// ターゲットのみのレコードは`+`を先頭に付けて出力します。
pub struct TextFormatter;

impl TextFormatter {
    pub fn render_result<W: Write>(
        &self,
        result: &ComparisonResult,
        include_target_only: bool,
        writer: &mut W,
    ) -> Result<(), NvlCheckError> {
        for record in &result.source_only {
            writeln!(writer, "{}", record)?;
        }
        if include_target_only {
            for record in &result.target_only {
                writeln!(writer, "+{}", record)?;
            }
        }
        Ok(())
    }

    pub fn render_records<W: Write>(
        &self,
        records: &[Record],
        writer: &mut W,
    ) -> Result<(), NvlCheckError> {
        for record in records {
            writeln!(writer, "{}", record)?;
        }
        Ok(())
    }
}

/// Markdown形式のフォーマッター
pub struct MarkdownFormatter;

impl MarkdownFormatter {
    pub fn render_result<W: Write>(
        &self,
        result: &ComparisonResult,
        include_target_only: bool,
        writer: &mut W,
    ) -> Result<(), NvlCheckError> {
        writeln!(writer, "## Source only ({})", result.source_only.len())?;
        writeln!(writer)?;
        RecordTable::from_records(&result.source_only).render(writer)?;

        if include_target_only {
            writeln!(writer)?;
            writeln!(writer, "## Target only ({})", result.target_only.len())?;
            writeln!(writer)?;
            RecordTable::from_records(&result.target_only).render(writer)?;
        }
        Ok(())
    }

    pub fn render_records<W: Write>(
        &self,
        records: &[Record],
        writer: &mut W,
    ) -> Result<(), NvlCheckError> {
        RecordTable::from_records(records).render(writer)
    }
}

/// JSON形式のフォーマッター
///
/// 比較結果は`{success, matched, source_only, target_only}`、
/// 失敗は`{success: false, error_kind, message}`として出力します。
pub struct JsonFormatter;

/// 成功時の結果サーフェス
#[derive(Serialize)]
struct JsonResult<'a> {
    success: bool,
    matched: bool,
    source_only: Vec<&'a Record>,
    target_only: Vec<&'a Record>,
}

/// 失敗時の結果サーフェス
#[derive(Serialize)]
struct JsonFailure {
    success: bool,
    error_kind: ErrorKind,
    message: String,
}

impl JsonFormatter {
    pub fn render_result<W: Write>(
        &self,
        result: &ComparisonResult,
        writer: &mut W,
    ) -> Result<(), NvlCheckError> {
        let surface = JsonResult {
            success: true,
            matched: result.matched,
            source_only: result.source_only.iter().collect(),
            target_only: result.target_only.iter().collect(),
        };
        write_json(writer, &surface)
    }

    pub fn render_error<W: Write>(
        &self,
        error: &NvlCheckError,
        writer: &mut W,
    ) -> Result<(), NvlCheckError> {
        let surface = JsonFailure {
            success: false,
            error_kind: error.kind(),
            message: error.to_string(),
        };
        write_json(writer, &surface)
    }

    pub fn render_records<W: Write>(
        &self,
        records: &[Record],
        writer: &mut W,
    ) -> Result<(), NvlCheckError> {
        write_json(writer, &records)
    }
}

fn write_json<W: Write, T: Serialize + ?Sized>(
    writer: &mut W,
    value: &T,
) -> Result<(), NvlCheckError> {
    serde_json::to_writer_pretty(&mut *writer, value)
        .map_err(|e| NvlCheckError::Io(e.into()))?;
    writeln!(writer)?;
    Ok(())
}
