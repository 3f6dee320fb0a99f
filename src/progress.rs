//! Progress Module
//!
//! 比較処理の進捗通知を提供するモジュール。
//! 比較は「ソース読み込み」「ターゲット読み込み」「比較」の3フェーズで進み、
//! 各フェーズはこの順序で1回ずつ通知されます。
//! 人間向けの進捗は**stderr**に出力し、stdoutはスクリプトから解析できる状態に保ちます。

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

/// 比較処理のフェーズ
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Phase {
    /// ソースファイルを読み込み中
    ReadingSource { file: PathBuf },
    /// ターゲットファイルを読み込み中
    ReadingTarget { file: PathBuf },
    /// レコード集合を比較中
    Comparing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::ReadingSource { file } => {
                write!(f, "Reading source file: {}...", display_name(file))
            }
            Phase::ReadingTarget { file } => {
                write!(f, "Reading target file: {}...", display_name(file))
            }
            Phase::Comparing => write!(f, "Comparing values..."),
        }
    }
}

/// ディレクトリ部分を除いたファイル名（取得できない場合はパス全体）
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// 実行中の比較処理からフェーズ通知を受け取るトレイト
pub trait ProgressReporter: Send + Sync {
    /// 比較処理が`phase`に入ったときに1回呼び出される
    fn report(&self, phase: Phase);
}

/// stderrへの進捗出力（例: "Reading source file: bom.xlsx..."）
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, phase: Phase) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{}", phase);
        let _ = stderr.flush();
    }
}

/// 進捗を通知しないレポーター
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _phase: Phase) {}
}

/// フェーズをチャネルへ転送するレポーター（バックグラウンドタスク用）
pub(crate) struct ChannelProgress(pub(crate) tokio::sync::mpsc::UnboundedSender<Phase>);

impl ProgressReporter for ChannelProgress {
    fn report(&self, phase: Phase) {
        // 結果だけを待つ呼び出し元は受信側を破棄している場合がある
        let _ = self.0.send(phase);
    }
}
