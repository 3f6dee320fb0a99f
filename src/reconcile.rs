//! Reconciliation Module
//!
//! 2つのレコード集合を比較し、一致判定と片側のみに存在するレコードを求めるモジュール。

use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

use crate::api::ParseConfig;
use crate::error::NvlCheckError;
use crate::extract::extract_file;
use crate::progress::{Phase, ProgressReporter};
use crate::types::Record;

/// 比較結果
///
/// 集合として比較するため、行の順序や重複は結果に影響しません。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonResult {
    /// ソースとターゲットの集合が等しいかどうか
    pub matched: bool,

    /// ソースにのみ存在するレコード（ソース − ターゲット）
    pub source_only: BTreeSet<Record>,

    /// ターゲットにのみ存在するレコード（ターゲット − ソース）
    pub target_only: BTreeSet<Record>,

    /// ソースの重複を除いたレコード数
    pub source_count: usize,

    /// ターゲットの重複を除いたレコード数
    pub target_count: usize,
}

/// 2つのレコード列を集合として比較する
///
/// # 使用例
///
/// ```rust
/// use nvlcheck::{compare, Record};
///
/// let source = vec![Record::new("Widget", "3", "SKU1"), Record::new("Gadget", "2", "SKU9")];
/// let target = vec![Record::new("Widget", "3", "SKU1")];
///
/// let result = compare(source, target);
/// assert!(!result.matched);
/// assert_eq!(result.source_only.len(), 1);
/// assert!(result.target_only.is_empty());
/// ```
pub fn compare(
    source: impl IntoIterator<Item = Record>,
    target: impl IntoIterator<Item = Record>,
) -> ComparisonResult {
    let source: BTreeSet<Record> = source.into_iter().collect();
    let target: BTreeSet<Record> = target.into_iter().collect();

    let source_only: BTreeSet<Record> = source.difference(&target).cloned().collect();
    let target_only: BTreeSet<Record> = target.difference(&source).cloned().collect();

    ComparisonResult {
        matched: source_only.is_empty() && target_only.is_empty(),
        source_only,
        target_only,
        source_count: source.len(),
        target_count: target.len(),
    }
}

/// 2つのファイルを読み込み、比較する
///
/// 進捗は「ソース読み込み → ターゲット読み込み → 比較」の順に`reporter`へ通知されます。
/// 抽出中のエラーはそのまま返し、部分的な結果は返しません。
pub fn compare_files(
    source_path: &Path,
    target_path: &Path,
    source_config: &ParseConfig,
    target_config: &ParseConfig,
    reporter: &dyn ProgressReporter,
) -> Result<ComparisonResult, NvlCheckError> {
    reporter.report(Phase::ReadingSource {
        file: source_path.to_path_buf(),
    });
    let source = extract_file(source_path, source_config)?;

    reporter.report(Phase::ReadingTarget {
        file: target_path.to_path_buf(),
    });
    let target = extract_file(target_path, target_config)?;

    reporter.report(Phase::Comparing);
    let result = compare(source, target);

    tracing::info!(
        matched = result.matched,
        source_only = result.source_only.len(),
        target_only = result.target_only.len(),
        "Comparison finished"
    );
    Ok(result)
}
