//! Public API Types
//!
//! 公開APIで使用する設定型と列挙型を定義するモジュール。
//! `ParseConfig`はファイルの種類（ソース/ターゲット）ごとに1つ構築され、
//! 構築後は変更されません。

use serde::{Deserialize, Serialize};

/// xlsxの最大列数（XFD列）
pub(crate) const MAX_COLUMNS: u32 = 16_384;

/// xlsxの最大行数
pub(crate) const MAX_ROWS: u32 = 1_048_576;

/// 1つのスプレッドシートレイアウトの読み取り方を記述する設定
///
/// TOMLファイルから読み込むか、[`ParseConfigBuilder`](crate::ParseConfigBuilder)で構築します。
///
/// # TOML形式
///
/// ```toml
/// sheet_name = "BoM"
/// first_data_row = 3
/// quantity_check = "lenient"
///
/// [columns]
/// item = 5
/// quantity = 6
/// sku = 7
/// solution_id = 9
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParseConfig {
    /// 対象シート名（完全一致）
    pub sheet_name: String,

    /// データ開始行（0始まり）。これより前の行はヘッダーとして扱う
    pub first_data_row: u32,

    /// データ終了行（0始まり、両端を含む）
    ///
    /// `None`の場合は、シート内で最後に値が入っている行まで走査します。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_data_row: Option<u32>,

    /// 各フィールドの列インデックス
    pub columns: ColumnMap,

    /// 数量セルがテキスト型だった場合の扱い
    #[serde(default)]
    pub quantity_check: QuantityCheck,
}

/// フィールド名から列インデックス（0始まり）へのマッピング
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnMap {
    /// 品目名の列
    pub item: u32,

    /// 数量の列
    pub quantity: u32,

    /// SKUの列
    pub sku: u32,

    /// ソリューションIDの列（任意）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution_id: Option<u32>,
}

impl ColumnMap {
    /// 設定されているすべての列インデックスを返す（フィールド名付き）
    pub(crate) fn entries(&self) -> Vec<(&'static str, u32)> {
        let mut entries = vec![
            ("item", self.item),
            ("quantity", self.quantity),
            ("sku", self.sku),
        ];
        if let Some(col) = self.solution_id {
            entries.push(("solution_id", col));
        }
        entries
    }
}

/// 数量セルのネイティブ型がテキストだった場合のポリシー
///
/// 空の数量セルはどのポリシーでも空文字列として扱われ、影響を受けません。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum QuantityCheck {
    /// 型チェックを行わない（デフォルト）
    ///
    /// テキストの数量もそのまま表示文字列としてレコードに含めます。
    #[default]
    Lenient,

    /// 数量セルがテキスト型の行をスキップする
    SkipText,

    /// 数量セルがテキスト型の場合、`NvlCheckError::CellCoercion`で失敗する
    Strict,
}

/// 比較結果の出力フォーマット
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum ReportFormat {
    /// 1レコード1行のタブ区切りテキスト（デフォルト）
    ///
    /// # 出力例
    ///
    /// ```text
    /// Gadget	2	SKU9
    /// ```
    #[default]
    Text,

    /// 列幅を揃えたMarkdownテーブル
    ///
    /// # 出力例
    ///
    /// ```markdown
    /// | Item   | Quantity | SKU  |
    /// |--------|----------|------|
    /// | Gadget | 2        | SKU9 |
    /// ```
    Markdown,

    /// 結果サーフェス全体をJSONで出力
    ///
    /// # 出力例
    ///
    /// ```json
    /// {
    ///   "success": true,
    ///   "matched": false,
    ///   "source_only": [{"item": "Gadget", "quantity": "2", "sku": "SKU9"}],
    ///   "target_only": []
    /// }
    /// ```
    Json,
}
