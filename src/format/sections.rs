//! FormatSection Module
//!
//! Excel Number Format Stringのセクション定義を提供します。

use super::tokens::FormatToken;

/// セクションの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SectionKind {
    /// 正数（セクションが1つの場合はすべての数値）
    Positive,
    /// 負数
    Negative,
    /// ゼロ
    Zero,
    /// テキスト
    Text,
}

/// フォーマットのセクション（正数、負数、ゼロ、テキスト）
///
/// Excel Number Format Stringは最大4つのセクションに分割されます。
/// `[Red]`などの色指定や`[>100]`などの条件は解析時に読み捨てます。
#[derive(Debug, Clone)]
pub(crate) struct FormatSection {
    /// セクションの種類
    pub kind: SectionKind,

    /// フォーマットトークン
    pub tokens: Vec<FormatToken>,
}

impl FormatSection {
    /// 新しいセクションを生成
    pub fn new(kind: SectionKind) -> Self {
        Self {
            kind,
            tokens: Vec::new(),
        }
    }

    /// セクションが日付・時刻書式かどうかを判定
    pub fn is_datetime(&self) -> bool {
        self.tokens.iter().any(|t| t.is_datetime())
    }

    /// セクションが数値書式かどうかを判定
    pub fn is_numeric(&self) -> bool {
        self.tokens.iter().any(|t| t.is_numeric())
    }

    /// 12時間表記かどうか
    pub fn uses_am_pm(&self) -> bool {
        self.tokens.iter().any(|t| matches!(t, FormatToken::AmPm))
    }
}
