//! Comparison Task Module
//!
//! 比較処理を呼び出し元のスレッドから切り離して実行するモジュール。
//! Tokioのブロッキングタスクで比較を実行し、進捗をチャネルで通知し、
//! 結果を1回だけ返します。実行中の比較がある間は新しい依頼を受け付けません。

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

use crate::api::ParseConfig;
use crate::error::NvlCheckError;
use crate::progress::{ChannelProgress, Phase};
use crate::reconcile::{compare_files, ComparisonResult};

/// 比較依頼
///
/// ファイルパスと設定はすべて値として渡します。
#[derive(Debug, Clone)]
pub struct ComparisonRequest {
    /// ソースファイル（構成ツールのBOM）
    pub source: PathBuf,
    /// ターゲットファイル（ExpertBOMのエクスポート）
    pub target: PathBuf,
    /// ソースのレイアウト設定
    pub source_config: Arc<ParseConfig>,
    /// ターゲットのレイアウト設定
    pub target_config: Arc<ParseConfig>,
}

/// 比較処理の実行者
///
/// 同時に実行できる比較は1つだけです。
///
/// # 使用例
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use nvlcheck::{load_parse_config, Comparator, ComparisonRequest};
///
/// # async fn run() -> Result<(), nvlcheck::NvlCheckError> {
/// let comparator = Comparator::new();
/// let mut handle = comparator.submit(ComparisonRequest {
///     source: "configurator.xlsx".into(),
///     target: "expert.xlsx".into(),
///     source_config: Arc::new(load_parse_config("config/configurator-bom.toml")?),
///     target_config: Arc::new(load_parse_config("config/expert-bom.toml")?),
/// })?;
///
/// while let Some(phase) = handle.next_phase().await {
///     println!("{}", phase);
/// }
/// let result = handle.outcome().await?;
/// println!("matched: {}", result.matched);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct Comparator {
    in_flight: Arc<AtomicBool>,
}

impl Comparator {
    /// 新しいComparatorインスタンスを生成
    pub fn new() -> Self {
        Self::default()
    }

    /// 比較を実行中かどうか
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// 比較を依頼する
    ///
    /// 現在のTokioランタイム上でブロッキングタスクを1つ起動します。
    ///
    /// # 発生し得るエラー
    ///
    /// * `NvlCheckError::Busy` - 別の比較が実行中
    /// * `NvlCheckError::Task` - Tokioランタイムの外から呼び出された
    pub fn submit(&self, request: ComparisonRequest) -> Result<ComparisonHandle, NvlCheckError> {
        let runtime = Handle::try_current().map_err(|e| NvlCheckError::Task(e.to_string()))?;

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(NvlCheckError::Busy);
        }
        let guard = InFlightGuard(Arc::clone(&self.in_flight));

        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let worker = runtime.spawn_blocking(move || {
            let reporter = ChannelProgress(progress_tx);
            compare_files(
                &request.source,
                &request.target,
                &request.source_config,
                &request.target_config,
                &reporter,
            )
        });

        runtime.spawn(async move {
            let outcome = match worker.await {
                Ok(outcome) => outcome,
                Err(e) if e.is_panic() => {
                    Err(NvlCheckError::Task("comparison worker panicked".to_string()))
                }
                Err(e) => Err(NvlCheckError::Task(e.to_string())),
            };
            if let Err(ref e) = outcome {
                tracing::error!(error = %e, "Comparison failed");
            }

            // 結果を受け取った直後に再依頼できるよう、送信前に解放する
            drop(guard);
            let _ = outcome_tx.send(outcome);
        });

        Ok(ComparisonHandle {
            progress: progress_rx,
            outcome: outcome_rx,
        })
    }
}

/// 実行中フラグを解放するガード
///
/// ワーカーの完了時だけでなく、ランタイム終了でタスクが破棄された場合にも解放されます。
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// 依頼した比較の進捗と結果を受け取るハンドル
#[derive(Debug)]
pub struct ComparisonHandle {
    progress: mpsc::UnboundedReceiver<Phase>,
    outcome: oneshot::Receiver<Result<ComparisonResult, NvlCheckError>>,
}

impl ComparisonHandle {
    /// 次のフェーズを待つ
    ///
    /// ワーカーが終了し、すべてのフェーズを受け取った後は`None`を返します。
    pub async fn next_phase(&mut self) -> Option<Phase> {
        self.progress.recv().await
    }

    /// 比較結果を待つ
    pub async fn outcome(self) -> Result<ComparisonResult, NvlCheckError> {
        self.outcome.await.map_err(|_| {
            NvlCheckError::Task("comparison task ended without a result".to_string())
        })?
    }
}
