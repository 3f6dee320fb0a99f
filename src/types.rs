//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use calamine::Data;
use serde::Serialize;
use std::fmt;

/// セルの値を表す列挙型
///
/// calamineの`Data`を、表示フォーマットに必要な区別だけに正規化したものです。
/// 日付セルはシリアル値（`Number`）として保持し、書式で日付に戻します。
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CellValue {
    /// 数値（f64）。日付・時刻のシリアル値も含む
    Number(f64),

    /// 文字列
    Text(String),

    /// 論理値
    Bool(bool),

    /// エラー値（例: #DIV/0!）
    Error(String),

    /// 空セル
    Empty,
}

impl CellValue {
    /// 値が空かどうかを判定
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// エラーメッセージ用の型説明
    pub fn describe(&self) -> String {
        match self {
            CellValue::Number(n) => format!("number {}", n),
            CellValue::Text(s) => format!("text '{}'", s),
            CellValue::Bool(b) => format!("boolean {}", b),
            CellValue::Error(e) => format!("error {}", e),
            CellValue::Empty => "empty cell".to_string(),
        }
    }
}

impl From<&Data> for CellValue {
    fn from(data: &Data) -> Self {
        match data {
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::Error(e) => CellValue::Error(e.to_string()),
            Data::Empty => CellValue::Empty,
        }
    }
}

/// セル座標（0始まり）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct CellCoord {
    pub row: u32,
    pub col: u32,
}

impl CellCoord {
    /// 新しい座標を生成
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// A1形式の文字列に変換（例: (0, 0) -> "A1"）
    #[allow(clippy::wrong_self_convention)]
    pub fn to_a1_notation(&self) -> String {
        let col_str = Self::col_index_to_letter(self.col);
        format!("{}{}", col_str, self.row + 1)
    }

    /// A1形式の文字列から座標を生成（例: "B3" -> (2, 1)）
    ///
    /// `$`による絶対参照記号は無視します。
    pub fn from_a1_notation(reference: &str) -> Option<Self> {
        let reference = reference.trim().replace('$', "");
        let split = reference.find(|c: char| c.is_ascii_digit())?;
        let (letters, digits) = reference.split_at(split);

        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }

        // 列を数値に変換（A=0, B=1, ..., Z=25, AA=26, ...）
        let mut col: u32 = 0;
        for ch in letters.chars() {
            let val = (ch.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
            col = col.checked_mul(26)?.checked_add(val)?;
        }

        // 行を数値に変換（1始まりなので0始まりに変換）
        let row = digits.parse::<u32>().ok()?.checked_sub(1)?;

        Some(Self::new(row, col - 1))
    }

    /// 列インデックスを文字列に変換（0 -> "A", 25 -> "Z", 26 -> "AA"）
    fn col_index_to_letter(mut col: u32) -> String {
        let mut result = String::new();
        loop {
            let remainder = col % 26;
            result.insert(0, (b'A' + remainder as u8) as char);
            if col < 26 {
                break;
            }
            col = col / 26 - 1;
        }
        result
    }
}

/// パーサーから取り出した1セル分の生データ
#[derive(Debug, Clone)]
pub(crate) struct RawCellData {
    /// セル座標
    pub coord: CellCoord,

    /// セルの値（数式セルは抽出時に評価結果へ置き換える）
    pub value: CellValue,

    /// 適用されている数値書式（解決済みのフォーマット文字列）
    pub format_string: Option<String>,

    /// 数式文字列（数式セルの場合）
    pub formula: Option<String>,
}

/// 抽出された1行分のレコード
///
/// すべてのフィールドは表示文字列として保持され、構造的に比較されます。
/// 数量も数値ではなく表示文字列で比較するため、`"3"`と`"3.0"`は別の値です。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Record {
    /// 品目名
    pub item: String,

    /// 数量（表示文字列）
    pub quantity: String,

    /// SKU
    pub sku: String,

    /// ソリューションID（列が設定されている場合のみ）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution_id: Option<String>,
}

impl Record {
    /// ソリューションIDなしのレコードを生成
    pub fn new(
        item: impl Into<String>,
        quantity: impl Into<String>,
        sku: impl Into<String>,
    ) -> Self {
        Self {
            item: item.into(),
            quantity: quantity.into(),
            sku: sku.into(),
            solution_id: None,
        }
    }

    /// ソリューションIDを設定する
    pub fn with_solution_id(mut self, solution_id: impl Into<String>) -> Self {
        self.solution_id = Some(solution_id.into());
        self
    }

    /// 出力用にフィールドを順番に返す
    pub fn fields(&self) -> Vec<&str> {
        let mut fields = vec![self.item.as_str(), self.quantity.as_str(), self.sku.as_str()];
        if let Some(ref id) = self.solution_id {
            fields.push(id.as_str());
        }
        fields
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fields().join("\t"))
    }
}
