//! Workbook Parser Module
//!
//! calamineを使用したワークブック読み込みの実装。
//! セル値はcalamineから、数値書式はXMLメタデータから取得し、
//! 1つのシート分のセル情報として組み立てます。

use calamine::{open_workbook_auto_from_rs, CellType, Data, Range, Reader, Sheets, Xlsx};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use zip::ZipArchive;

use crate::error::NvlCheckError;
use crate::parser::XlsxMetadata;
use crate::security::SecurityConfig;
use crate::types::{CellCoord, CellValue, RawCellData};

/// ワークブックパーサー
///
/// calamineのラッパーとして、ワークブックレベルの操作を提供します。
/// ファイル全体をメモリに読み込み、同じバッファをcalamineとZIPアーカイブの両方で使用します。
pub(crate) struct WorkbookParser {
    /// calamineのワークブック（XLSX形式のみサポート）
    workbook: Xlsx<Cursor<Vec<u8>>>,
    /// スタイル情報取得用のZIPアーカイブ
    archive: ZipArchive<Cursor<Vec<u8>>>,
    /// XMLメタデータ
    metadata: XlsxMetadata,
}

impl WorkbookParser {
    /// ワークブックを開き、XMLメタデータも解析する
    ///
    /// # 引数
    ///
    /// * `reader` - Excelファイルを読み込むためのリーダー
    /// * `security` - 入力サイズなどの制限
    ///
    /// # 戻り値
    ///
    /// * `Ok(WorkbookParser)` - ワークブックとメタデータの読み込みに成功した場合
    /// * `Err(NvlCheckError::SecurityViolation)` - 入力制限を超えた場合
    /// * `Err(NvlCheckError::Parse)` - XLSX形式として読み込めない場合
    pub fn open<R: Read>(reader: R, security: &SecurityConfig) -> Result<Self, NvlCheckError> {
        // 上限+1バイトまで読み込み、超過を検出する
        let mut buffer = Vec::new();
        let bytes_read = reader
            .take(security.max_input_file_size.saturating_add(1))
            .read_to_end(&mut buffer)?;
        security.check_input_size(bytes_read as u64)?;

        // calamineでワークブックを開く
        let sheets = open_workbook_auto_from_rs(Cursor::new(buffer.clone()))
            .map_err(NvlCheckError::Parse)?;
        let workbook = match sheets {
            Sheets::Xlsx(workbook) => workbook,
            _ => {
                return Err(NvlCheckError::Parse(calamine::Error::Msg(
                    "Only XLSX format is supported",
                )))
            }
        };

        // XMLメタデータを解析
        let mut archive = ZipArchive::new(Cursor::new(buffer))?;
        let metadata = XlsxMetadata::parse(&mut archive, security)?;

        tracing::debug!(
            bytes = bytes_read,
            sheets = workbook.sheet_names().len(),
            "Opened workbook"
        );

        Ok(Self {
            workbook,
            archive,
            metadata,
        })
    }

    /// すべてのシート名を取得
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    /// シート名（完全一致）でシートを読み込む
    ///
    /// # 戻り値
    ///
    /// * `Ok(SheetCells)` - セル値・数式・数値書式を含むシート
    /// * `Err(NvlCheckError::SheetNotFound)` - シートが存在しない場合
    pub fn load_sheet(&mut self, sheet_name: &str) -> Result<SheetCells, NvlCheckError> {
        let available = self.sheet_names();
        if !available.iter().any(|name| name == sheet_name) {
            return Err(NvlCheckError::SheetNotFound {
                sheet: sheet_name.to_string(),
                available,
            });
        }

        // 1. セル値（数式セルはキャッシュされた計算結果）
        let values = self
            .workbook
            .worksheet_range(sheet_name)
            .map_err(|e| NvlCheckError::Parse(e.into()))?;

        // 2. 数式（全セルで再利用するため1回だけ取得する）
        let formulas = self.workbook.worksheet_formula(sheet_name).ok();

        // 3. 数値書式（スタイルIDをフォーマット文字列に解決しておく）
        let formats = match self.metadata.sheet_part(sheet_name) {
            Some(part) => {
                let part = part.to_string();
                XlsxMetadata::parse_cell_styles(&mut self.archive, &part)?
                    .into_iter()
                    .filter_map(|(coord, style_id)| {
                        self.metadata
                            .format_string(style_id)
                            .map(|format| (coord, format.to_string()))
                    })
                    .collect()
            }
            None => {
                tracing::warn!(
                    sheet = sheet_name,
                    "Worksheet part not found in workbook relationships; using General format"
                );
                HashMap::new()
            }
        };

        Ok(SheetCells {
            name: sheet_name.to_string(),
            values,
            formulas,
            formats,
            is_1904: self.metadata.is_1904(),
        })
    }
}

/// 1つのシートから読み込んだセル情報
///
/// 座標はすべてシート上の絶対座標（0始まり）です。
#[derive(Debug)]
pub(crate) struct SheetCells {
    name: String,
    values: Range<Data>,
    formulas: Option<Range<String>>,
    formats: HashMap<CellCoord, String>,
    is_1904: bool,
}

impl SheetCells {
    /// シート名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 1904年エポックを使用するかどうか
    pub fn is_1904(&self) -> bool {
        self.is_1904
    }

    /// 指定座標のセルデータを取得
    ///
    /// 範囲外や存在しないセルは空セルとして返します。
    pub fn cell(&self, coord: CellCoord) -> RawCellData {
        RawCellData {
            coord,
            value: self.value(coord),
            format_string: self.formats.get(&coord).cloned(),
            formula: self.formula(coord).map(str::to_string),
        }
    }

    /// 指定座標に保存されている値（数式セルの場合はキャッシュされた計算結果）
    pub fn value(&self, coord: CellCoord) -> CellValue {
        self.values
            .get_value((coord.row, coord.col))
            .map(CellValue::from)
            .unwrap_or(CellValue::Empty)
    }

    /// 指定座標の数式（先頭の`=`なし）
    pub fn formula(&self, coord: CellCoord) -> Option<&str> {
        self.formulas
            .as_ref()
            .and_then(|range| range.get_value((coord.row, coord.col)))
            .map(String::as_str)
            .filter(|f| !f.is_empty())
    }

    /// 値または数式を持つセルの外接矩形（左上, 右下）
    pub fn used_bounds(&self) -> Option<(CellCoord, CellCoord)> {
        let corners = [
            self.values.start().zip(self.values.end()),
            self.formulas
                .as_ref()
                .and_then(|range| range.start().zip(range.end())),
        ];
        corners
            .into_iter()
            .flatten()
            .map(|((r0, c0), (r1, c1))| (CellCoord::new(r0, c0), CellCoord::new(r1, c1)))
            .reduce(|(a0, a1), (b0, b1)| {
                (
                    CellCoord::new(a0.row.min(b0.row), a0.col.min(b0.col)),
                    CellCoord::new(a1.row.max(b1.row), a1.col.max(b1.col)),
                )
            })
    }

    /// 値または数式を持つセルが1つ以上ある行かどうか
    pub fn is_row_populated(&self, row: u32) -> bool {
        let has_value = row_has(&self.values, row, |data| !matches!(data, Data::Empty));
        has_value
            || self
                .formulas
                .as_ref()
                .is_some_and(|range| row_has(range, row, |f| !f.is_empty()))
    }

    /// 値または数式を持つセルが1つもない行かどうか
    pub fn is_row_blank(&self, row: u32) -> bool {
        !self.is_row_populated(row)
    }

    /// 値または数式が入っている最後の行（0始まり）
    ///
    /// 末尾の空行は含みません。シートが空の場合は`None`を返します。
    pub fn last_populated_row(&self) -> Option<u32> {
        let (first, last) = self.used_bounds()?;
        (first.row..=last.row)
            .rev()
            .find(|&row| self.is_row_populated(row))
    }
}

/// 範囲内の指定行に条件を満たすセルがあるかどうか
fn row_has<T: CellType>(range: &Range<T>, row: u32, populated: impl Fn(&T) -> bool) -> bool {
    let (Some((_, start_col)), Some((_, end_col))) = (range.start(), range.end()) else {
        return false;
    };
    (start_col..=end_col).any(|col| range.get_value((row, col)).is_some_and(&populated))
}
