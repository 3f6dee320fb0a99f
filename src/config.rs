//! Config Module
//!
//! TOML形式のレイアウト設定ファイルを読み込むモジュール。

use std::path::Path;

use crate::api::ParseConfig;
use crate::builder::validate;
use crate::error::NvlCheckError;

/// TOMLファイルから`ParseConfig`を読み込み、検証する
///
/// # 発生し得るエラー
///
/// * `NvlCheckError::Config(String)`:
///   * ファイルが読み込めない
///   * TOMLとして不正、または未知のフィールドを含む
///   * 検証に失敗（[`ParseConfigBuilder::build`](crate::ParseConfigBuilder::build)と同じ規則）
pub fn load_parse_config(path: impl AsRef<Path>) -> Result<ParseConfig, NvlCheckError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        NvlCheckError::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let config = parse_config_str(&content).map_err(|e| match e {
        NvlCheckError::Config(msg) => {
            NvlCheckError::Config(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })?;

    tracing::debug!(
        config = %path.display(),
        sheet = %config.sheet_name,
        first_data_row = config.first_data_row,
        "Loaded parse config"
    );
    Ok(config)
}

/// TOML文字列から`ParseConfig`を読み込み、検証する
pub fn parse_config_str(content: &str) -> Result<ParseConfig, NvlCheckError> {
    let config: ParseConfig = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}
