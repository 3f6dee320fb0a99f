//! # nvlcheck CLI
//!
//! 構成ツールのBOMとExpertBOMのエクスポートを比較するコマンドラインツール。
//!
//! ## Usage
//!
//! ```bash
//! nvlcheck compare \
//!     --source configurator.xlsx --source-config config/configurator-bom.toml \
//!     --target expert.xlsx --target-config config/expert-bom.toml
//!
//! # レイアウト調整用に1ファイル分のレコードを出力
//! nvlcheck extract --file expert.xlsx --config config/expert-bom.toml
//! ```
//!
//! ## Exit codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | すべての品目が一致 |
//! | 1 | 不一致あり |
//! | 2 | 読み込み・解析・設定の失敗、または引数エラー |
//!
//! 結果はstdout、進捗・ステータス行・ログはstderrに出力します。

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nvlcheck::{
    extract_file, load_parse_config, status_line, Comparator, ComparisonRequest,
    ComparisonResult, NvlCheckError, OutputFormatter, ProgressReporter, ReportFormat,
    StderrProgress,
};

const EXIT_OK: u8 = 0;
const EXIT_MISMATCHED: u8 = 1;
const EXIT_FAILED: u8 = 2;

/// Reconcile a configurator BOM against an exported expert BOM.
#[derive(Parser)]
#[command(name = "nvlcheck", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two workbooks and report records missing from the target.
    Compare(CompareArgs),

    /// Print the records extracted from a single workbook.
    ///
    /// Useful to tune a layout file before running a comparison.
    Extract(ExtractArgs),
}

#[derive(Args)]
struct CompareArgs {
    /// Source workbook (configurator BOM).
    #[arg(long, env = "NVLCHECK_SOURCE")]
    source: PathBuf,

    /// Target workbook (expert BOM export).
    #[arg(long, env = "NVLCHECK_TARGET")]
    target: PathBuf,

    /// Layout file (TOML) for the source workbook.
    #[arg(long, env = "NVLCHECK_SOURCE_CONFIG")]
    source_config: PathBuf,

    /// Layout file (TOML) for the target workbook.
    #[arg(long, env = "NVLCHECK_TARGET_CONFIG")]
    target_config: PathBuf,

    /// Report format written to stdout.
    #[arg(long, value_enum, default_value = "text")]
    format: FormatArg,

    /// Also list records that exist only in the target.
    #[arg(long)]
    target_only: bool,
}

#[derive(Args)]
struct ExtractArgs {
    /// Workbook to read.
    #[arg(long)]
    file: PathBuf,

    /// Layout file (TOML) for the workbook.
    #[arg(long)]
    config: PathBuf,

    /// Output format written to stdout.
    #[arg(long, value_enum, default_value = "text")]
    format: FormatArg,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Markdown,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => ReportFormat::Text,
            FormatArg::Markdown => ReportFormat::Markdown,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Compare(args) => run_compare(args).await,
        Commands::Extract(args) => run_extract(args),
    };
    ExitCode::from(code)
}

/// stderrへのログ出力を初期化する（`RUST_LOG`で上書き可能）
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("nvlcheck=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run_compare(args: CompareArgs) -> u8 {
    let formatter = OutputFormatter::from_format(args.format.into());
    let outcome = compare(&args).await;

    let mut stdout = std::io::stdout().lock();
    let rendered = match &outcome {
        Ok(result) => formatter.render_result(result, args.target_only, &mut stdout),
        Err(error) => formatter.render_error(error, &mut stdout),
    };
    let _ = stdout.flush();

    eprintln!("{}", status_line(&outcome));

    if let Err(e) = rendered {
        eprintln!("Failed to write report: {}", e);
        return EXIT_FAILED;
    }
    match outcome {
        Ok(result) if result.matched => EXIT_OK,
        Ok(_) => EXIT_MISMATCHED,
        Err(_) => EXIT_FAILED,
    }
}

async fn compare(args: &CompareArgs) -> Result<ComparisonResult, NvlCheckError> {
    let source_config = Arc::new(load_parse_config(&args.source_config)?);
    let target_config = Arc::new(load_parse_config(&args.target_config)?);

    let comparator = Comparator::new();
    let mut handle = comparator.submit(ComparisonRequest {
        source: args.source.clone(),
        target: args.target.clone(),
        source_config,
        target_config,
    })?;

    while let Some(phase) = handle.next_phase().await {
        StderrProgress.report(phase);
    }
    handle.outcome().await
}

fn run_extract(args: ExtractArgs) -> u8 {
    let formatter = OutputFormatter::from_format(args.format.into());
    let outcome =
        load_parse_config(&args.config).and_then(|config| extract_file(&args.file, &config));

    let mut stdout = std::io::stdout().lock();
    let rendered = match &outcome {
        Ok(records) => formatter.render_records(records, &mut stdout),
        Err(error) => formatter.render_error(error, &mut stdout),
    };
    let _ = stdout.flush();

    match (outcome, rendered) {
        (Ok(records), Ok(())) => {
            eprintln!("Extracted {} record(s).", records.len());
            EXIT_OK
        }
        (Err(e), _) => {
            eprintln!("Extraction could not be completed: {}", e);
            EXIT_FAILED
        }
        (Ok(_), Err(e)) => {
            eprintln!("Failed to write records: {}", e);
            EXIT_FAILED
        }
    }
}
