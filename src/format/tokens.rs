//! FormatToken Module
//!
//! Excel Number Format Stringのトークン定義を提供します。

/// フォーマットトークン
///
/// Excel Number Format Stringを解析した際に生成されるトークンです。
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FormatToken {
    /// "General"キーワード
    General,

    /// 年（例: "yyyy" -> 4桁, "yy" -> 2桁）
    Year(usize),

    /// 月（"m", "mm", "mmm"=略称, "mmmm"=正式名, "mmmmm"=頭文字）
    Month(usize),

    /// 日（"d", "dd", "ddd"=曜日略称, "dddd"=曜日正式名）
    Day(usize),

    /// 時（例: "hh" -> 2桁, "h" -> 1桁）
    Hour(usize),

    /// 分（例: "mm" -> 2桁, "m" -> 1桁）
    /// 注意: 直前が時、または直後が秒の場合のみ分として扱う
    Minute(usize),

    /// 秒（例: "ss" -> 2桁, "s" -> 1桁）
    Second(usize),

    /// 経過時間（例: "[h]"）
    ElapsedHours(usize),

    /// 午前/午後（"AM/PM"）
    AmPm,

    /// 整数部のゼロパディング（例: "0" -> 1桁, "00" -> 2桁）
    IntegerZero(usize),

    /// 整数部の任意桁（"#"）
    IntegerHash,

    /// 小数点
    DecimalPoint,

    /// 小数部のゼロパディング（例: "0" -> 1桁, "00" -> 2桁）
    DecimalZero(usize),

    /// 小数部の任意桁（例: "##" -> 2桁）
    DecimalHash(usize),

    /// 千の位区切り
    ThousandSeparator,

    /// パーセント記号
    Percent,

    /// 指数表記（"E+00"など）。符号を常に表示するかどうかと指数の最小桁数
    Exponent { plus: bool, digits: usize },

    /// リテラル文字列（例: "$", "-", " "、引用符やバックスラッシュでエスケープされた文字列）
    Literal(String),

    /// テキストプレースホルダー（例: "@"）
    TextPlaceholder,
}

impl FormatToken {
    /// トークンが日付・時刻関連かどうかを判定
    pub fn is_datetime(&self) -> bool {
        matches!(
            self,
            FormatToken::Year(_)
                | FormatToken::Month(_)
                | FormatToken::Day(_)
                | FormatToken::Hour(_)
                | FormatToken::Minute(_)
                | FormatToken::Second(_)
                | FormatToken::ElapsedHours(_)
                | FormatToken::AmPm
        )
    }

    /// トークンが数値の桁を表すかどうかを判定
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FormatToken::IntegerZero(_)
                | FormatToken::IntegerHash
                | FormatToken::DecimalPoint
                | FormatToken::DecimalZero(_)
                | FormatToken::DecimalHash(_)
                | FormatToken::Exponent { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_datetime() {
        assert!(FormatToken::Year(4).is_datetime());
        assert!(FormatToken::Month(2).is_datetime());
        assert!(FormatToken::Day(2).is_datetime());
        assert!(FormatToken::Hour(2).is_datetime());
        assert!(FormatToken::Minute(2).is_datetime());
        assert!(FormatToken::Second(2).is_datetime());
        assert!(FormatToken::ElapsedHours(1).is_datetime());
        assert!(FormatToken::AmPm.is_datetime());
        assert!(!FormatToken::IntegerZero(1).is_datetime());
        assert!(!FormatToken::Literal("$".to_string()).is_datetime());
    }

    #[test]
    fn test_is_numeric() {
        assert!(FormatToken::IntegerZero(1).is_numeric());
        assert!(FormatToken::IntegerHash.is_numeric());
        assert!(FormatToken::DecimalPoint.is_numeric());
        assert!(FormatToken::DecimalZero(2).is_numeric());
        assert!(FormatToken::DecimalHash(1).is_numeric());
        assert!(FormatToken::Exponent { plus: true, digits: 2 }.is_numeric());
        // パーセントや区切りだけでは数値書式とみなさない
        assert!(!FormatToken::Percent.is_numeric());
        assert!(!FormatToken::ThousandSeparator.is_numeric());
        assert!(!FormatToken::General.is_numeric());
        assert!(!FormatToken::Year(4).is_numeric());
    }
}
