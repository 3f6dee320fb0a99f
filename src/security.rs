//! Security Module
//!
//! 入力ファイルに対する制限を実装するモジュール。
//! 比較対象は小さなBOMファイルを想定しているため、
//! 想定外に大きい入力やZIP内の不正なパスは読み込み前に拒否します。

use crate::error::NvlCheckError;

/// セキュリティ設定
#[derive(Debug, Clone)]
pub(crate) struct SecurityConfig {
    /// 入力ファイルの最大サイズ（バイト）
    /// デフォルト: 256MB
    pub max_input_file_size: u64,
    /// ZIPアーカイブ内の最大ファイル数
    /// デフォルト: 10000
    pub max_file_count: usize,
    /// 単一エントリの展開後の最大サイズ（バイト）
    /// デフォルト: 100MB
    pub max_entry_size: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_input_file_size: 268_435_456, // 256MB
            max_file_count: 10_000,
            max_entry_size: 104_857_600, // 100MB
        }
    }
}

impl SecurityConfig {
    /// 入力サイズを検証
    pub fn check_input_size(&self, size: u64) -> Result<(), NvlCheckError> {
        if size > self.max_input_file_size {
            return Err(NvlCheckError::SecurityViolation(format!(
                "Input file size exceeds maximum: {} bytes (max: {} bytes)",
                size, self.max_input_file_size
            )));
        }
        Ok(())
    }

    /// ZIPエントリ数を検証
    pub fn check_entry_count(&self, count: usize) -> Result<(), NvlCheckError> {
        if count > self.max_file_count {
            return Err(NvlCheckError::SecurityViolation(format!(
                "ZIP archive contains too many files: {} (max: {})",
                count, self.max_file_count
            )));
        }
        Ok(())
    }

    /// 単一エントリのサイズを検証
    pub fn check_entry_size(&self, name: &str, size: u64) -> Result<(), NvlCheckError> {
        if size > self.max_entry_size {
            return Err(NvlCheckError::SecurityViolation(format!(
                "File '{}' exceeds maximum size: {} bytes (max: {} bytes)",
                name, size, self.max_entry_size
            )));
        }
        Ok(())
    }
}

/// ZIPエントリのパスを検証
///
/// パストラバーサルを防ぐため、`..`・絶対パス・バックスラッシュを含むパスを拒否します。
pub(crate) fn validate_zip_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("Empty path is not allowed".to_string());
    }

    // 絶対パスを拒否（Unix形式の`/`やドライブレター付きのパス）
    let bytes = path.as_bytes();
    if path.starts_with('/') || (bytes.len() >= 2 && bytes[1] == b':') {
        return Err(format!("Absolute path is not allowed: {}", path));
    }

    if path.split('/').any(|segment| segment == "..") {
        return Err(format!("Path traversal detected: {}", path));
    }

    if path.contains('\\') {
        return Err(format!("Backslash in path is not allowed: {}", path));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_zip_path_valid() {
        assert!(validate_zip_path("xl/workbook.xml").is_ok());
        assert!(validate_zip_path("xl/worksheets/sheet1.xml").is_ok());
        assert!(validate_zip_path("xl/_rels/workbook.xml.rels").is_ok());
    }

    #[test]
    fn test_validate_zip_path_empty() {
        assert!(validate_zip_path("").is_err());
    }

    #[test]
    fn test_validate_zip_path_absolute() {
        assert!(validate_zip_path("/etc/passwd").is_err());
        assert!(validate_zip_path("C:\\Windows\\system32").is_err());
        assert!(validate_zip_path("c:/xl/workbook.xml").is_err());
    }

    #[test]
    fn test_validate_zip_path_traversal() {
        assert!(validate_zip_path("../etc/passwd").is_err());
        assert!(validate_zip_path("xl/../../etc/passwd").is_err());
        assert!(validate_zip_path("..").is_err());
        // ".."を含むだけのファイル名は許可
        assert!(validate_zip_path("xl/media/image..png").is_ok());
    }

    #[test]
    fn test_validate_zip_path_backslash() {
        assert!(validate_zip_path("xl\\workbook.xml").is_err());
    }

    #[test]
    fn test_size_limits() {
        let config = SecurityConfig::default();
        assert!(config.check_input_size(1024).is_ok());
        assert!(config.check_input_size(config.max_input_file_size + 1).is_err());
        assert!(config.check_entry_count(10_000).is_ok());
        assert!(config.check_entry_count(10_001).is_err());

        match config.check_entry_size("xl/worksheets/sheet1.xml", u64::MAX) {
            Err(NvlCheckError::SecurityViolation(msg)) => {
                assert!(msg.contains("xl/worksheets/sheet1.xml"));
            }
            _ => panic!("Expected SecurityViolation"),
        }
    }
}
