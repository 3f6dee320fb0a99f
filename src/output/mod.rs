//! Output Format Module
//!
//! Strategy Patternによる比較レポート出力の抽象化を提供するモジュール。

mod formatters;
mod table;

use crate::api::ReportFormat;
use crate::error::NvlCheckError;
use crate::reconcile::ComparisonResult;
use crate::types::Record;
use std::io::Write;

pub use formatters::*;

/// 出力フォーマッター（Strategy Pattern）
///
/// 各出力フォーマット（テキスト, Markdown, JSON）をenumとして表現します。
#[derive(Debug, Clone, Copy)]
pub enum OutputFormatter {
    Text,
    Markdown,
    Json,
}

impl OutputFormatter {
    /// 出力フォーマットからフォーマッターを生成
    pub fn from_format(format: ReportFormat) -> Self {
        match format {
            ReportFormat::Text => OutputFormatter::Text,
            ReportFormat::Markdown => OutputFormatter::Markdown,
            ReportFormat::Json => OutputFormatter::Json,
        }
    }

    /// 比較結果を出力する
    ///
    /// # 引数
    ///
    /// * `result` - 比較結果
    /// * `include_target_only` - ターゲットのみのレコードも出力するかどうか（JSONでは常に出力）
    /// * `writer` - 出力先のライター
    pub fn render_result<W: Write>(
        &self,
        result: &ComparisonResult,
        include_target_only: bool,
        writer: &mut W,
    ) -> Result<(), NvlCheckError> {
        match self {
            OutputFormatter::Text => {
                TextFormatter.render_result(result, include_target_only, writer)
            }
            OutputFormatter::Markdown => {
                MarkdownFormatter.render_result(result, include_target_only, writer)
            }
            OutputFormatter::Json => JsonFormatter.render_result(result, writer),
        }
    }

    /// 比較の失敗を出力する
    ///
    /// テキストとMarkdownではstdoutに何も出力せず、ステータス行のみで失敗を伝えます。
    pub fn render_error<W: Write>(
        &self,
        error: &NvlCheckError,
        writer: &mut W,
    ) -> Result<(), NvlCheckError> {
        match self {
            OutputFormatter::Text | OutputFormatter::Markdown => Ok(()),
            OutputFormatter::Json => JsonFormatter.render_error(error, writer),
        }
    }

    /// 抽出したレコードを出力する
    pub fn render_records<W: Write>(
        &self,
        records: &[Record],
        writer: &mut W,
    ) -> Result<(), NvlCheckError> {
        match self {
            OutputFormatter::Text => TextFormatter.render_records(records, writer),
            OutputFormatter::Markdown => MarkdownFormatter.render_records(records, writer),
            OutputFormatter::Json => JsonFormatter.render_records(records, writer),
        }
    }
}

/// 人間向けのステータス行
///
/// * 一致: "Success: all items match."
/// * 不一致: "Mismatch found: N source record(s) missing from target; M target record(s) missing from source."
/// * 失敗: "Comparison could not be completed: <原因>"
pub fn status_line(outcome: &Result<ComparisonResult, NvlCheckError>) -> String {
    match outcome {
        Ok(result) if result.matched => "Success: all items match.".to_string(),
        Ok(result) => format!(
            "Mismatch found: {} source record(s) missing from target; \
             {} target record(s) missing from source.",
            result.source_only.len(),
            result.target_only.len()
        ),
        Err(error) => format!("Comparison could not be completed: {}", error),
    }
}
