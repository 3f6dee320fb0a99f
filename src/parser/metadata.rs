//! XML Metadata Parser Module
//!
//! XLSX内部のXMLファイルから、calamineで取得できない情報を抽出するモジュール。
//! セルごとの数値書式（styles.xmlのcellXfs/numFmtsとシートXMLの`s`属性）、
//! シート名とシートXMLパスの対応、1904年エポック判定を提供します。

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Read, Seek};
use zip::ZipArchive;

use crate::error::NvlCheckError;
use crate::security::{validate_zip_path, SecurityConfig};
use crate::types::CellCoord;

/// XLSXメタデータ
///
/// ワークブック全体で共有される書式情報を保持します。
/// セルごとのスタイルIDはシート単位で[`XlsxMetadata::parse_cell_styles`]から取得します。
#[derive(Debug, Clone, Default)]
pub(crate) struct XlsxMetadata {
    /// numFmtId -> formatCode のマッピング（カスタム書式のみ）
    num_formats: HashMap<u32, String>,
    /// styleId（cellXfsのインデックス）-> numFmtId
    cell_xfs: Vec<u32>,
    /// シート名 -> シートXMLのZIP内パス
    sheet_parts: HashMap<String, String>,
    /// 1904年エポックを使用するかどうか
    is_1904: bool,
}

impl XlsxMetadata {
    /// XLSXアーカイブからメタデータを解析
    ///
    /// アーカイブ内の全エントリに対してパスとサイズの検証を行った後、
    /// `xl/styles.xml`・`xl/workbook.xml`・`xl/_rels/workbook.xml.rels`を読み込みます。
    /// styles.xmlが存在しない場合は、すべてのセルを"General"として扱います。
    pub fn parse<R: Read + Seek>(
        archive: &mut ZipArchive<R>,
        security: &SecurityConfig,
    ) -> Result<Self, NvlCheckError> {
        security.check_entry_count(archive.len())?;
        for i in 0..archive.len() {
            let entry = archive.by_index(i)?;
            validate_zip_path(entry.name()).map_err(|e| {
                NvlCheckError::SecurityViolation(format!("Invalid ZIP path: {}", e))
            })?;
            security.check_entry_size(entry.name(), entry.size())?;
        }

        // 1. xl/styles.xml
        let (num_formats, cell_xfs) = match read_entry(archive, "xl/styles.xml")? {
            Some(xml) => Self::parse_styles(&xml)?,
            None => (HashMap::new(), Vec::new()),
        };

        // 2. xl/workbook.xml（シート名とrIdの対応、1904年エポック）
        let (sheet_rids, is_1904) = match read_entry(archive, "xl/workbook.xml")? {
            Some(xml) => Self::parse_workbook(&xml)?,
            None => (Vec::new(), false),
        };

        // 3. xl/_rels/workbook.xml.rels（rId -> シートXMLパス）
        let targets = match read_entry(archive, "xl/_rels/workbook.xml.rels")? {
            Some(xml) => Self::parse_relationships(&xml)?,
            None => HashMap::new(),
        };

        let sheet_parts = sheet_rids
            .into_iter()
            .filter_map(|(name, rid)| targets.get(&rid).map(|target| (name, target.clone())))
            .collect();

        Ok(Self {
            num_formats,
            cell_xfs,
            sheet_parts,
            is_1904,
        })
    }

    /// styleIdからNumber Format Stringを取得
    ///
    /// # 戻り値
    ///
    /// * `Some(&str)` - フォーマット文字列が見つかった場合
    /// * `None` - スタイルIDが範囲外、または未知の書式IDの場合
    pub fn format_string(&self, style_id: u32) -> Option<&str> {
        let num_fmt_id = *self.cell_xfs.get(style_id as usize)?;
        // カスタム書式はビルトインIDを上書きできる
        self.num_formats
            .get(&num_fmt_id)
            .map(|s| s.as_str())
            .or_else(|| builtin_format(num_fmt_id))
    }

    /// 1904年エポックを使用するかどうか
    pub fn is_1904(&self) -> bool {
        self.is_1904
    }

    /// シート名に対応するシートXMLのパスを取得
    pub fn sheet_part(&self, sheet_name: &str) -> Option<&str> {
        self.sheet_parts.get(sheet_name).map(|s| s.as_str())
    }

    /// シートXMLを解析し、既定以外のスタイルIDを持つセルの一覧を返す
    ///
    /// スタイルID 0（既定の"General"）のセルは結果に含めません。
    pub fn parse_cell_styles<R: Read + Seek>(
        archive: &mut ZipArchive<R>,
        part: &str,
    ) -> Result<HashMap<CellCoord, u32>, NvlCheckError> {
        let xml = read_entry(archive, part)?.ok_or_else(|| {
            NvlCheckError::Zip(format!("Worksheet part '{}' is missing", part))
        })?;

        let mut reader = Reader::from_reader(xml.as_slice());
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut styles = HashMap::new();
        // r属性が省略された行・セルに備えて位置を追跡する
        let mut row: u32 = 0;
        let mut next_row: u32 = 0;
        let mut next_col: u32 = 0;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                    b"row" => {
                        row = match attr_value(&e, b"r")? {
                            Some(r) => r.parse::<u32>()?.saturating_sub(1),
                            None => next_row,
                        };
                        next_row = row + 1;
                        next_col = 0;
                    }
                    b"c" => {
                        let coord = match attr_value(&e, b"r")? {
                            Some(r) => CellCoord::from_a1_notation(&r).ok_or_else(|| {
                                NvlCheckError::Xml(format!("Invalid cell reference '{}'", r))
                            })?,
                            None => CellCoord::new(row, next_col),
                        };
                        next_col = coord.col + 1;

                        if let Some(s) = attr_value(&e, b"s")? {
                            let style_id = s.parse::<u32>()?;
                            if style_id != 0 {
                                styles.insert(coord, style_id);
                            }
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(styles)
    }

    /// xl/styles.xml の解析
    ///
    /// `<numFmts>` と `<cellXfs>` を解析します。
    /// `<cellStyleXfs>`内の`<xf>`はセルから直接参照されないため無視します。
    fn parse_styles(xml: &[u8]) -> Result<(HashMap<u32, String>, Vec<u32>), NvlCheckError> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut num_formats = HashMap::new();
        let mut cell_xfs = Vec::new();
        let mut in_cell_xfs = false;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"cellXfs" => in_cell_xfs = true,
                    b"numFmt" => Self::push_num_fmt(&e, &mut num_formats)?,
                    b"xf" if in_cell_xfs => cell_xfs.push(Self::xf_num_fmt_id(&e)?),
                    _ => {}
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"numFmt" => Self::push_num_fmt(&e, &mut num_formats)?,
                    b"xf" if in_cell_xfs => cell_xfs.push(Self::xf_num_fmt_id(&e)?),
                    _ => {}
                },
                Event::End(e) => {
                    if e.local_name().as_ref() == b"cellXfs" {
                        in_cell_xfs = false;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok((num_formats, cell_xfs))
    }

    /// `<numFmt numFmtId="165" formatCode="0.000"/>`
    fn push_num_fmt(
        e: &BytesStart<'_>,
        num_formats: &mut HashMap<u32, String>,
    ) -> Result<(), NvlCheckError> {
        let id = attr_value(e, b"numFmtId")?;
        let code = attr_value(e, b"formatCode")?;
        if let (Some(id), Some(code)) = (id, code) {
            num_formats.insert(id.parse()?, code);
        }
        Ok(())
    }

    /// `<xf numFmtId="165" fontId="0" applyNumberFormat="1"/>`
    fn xf_num_fmt_id(e: &BytesStart<'_>) -> Result<u32, NvlCheckError> {
        match attr_value(e, b"numFmtId")? {
            Some(id) => Ok(id.parse()?),
            None => Ok(0),
        }
    }

    /// xl/workbook.xml の解析
    ///
    /// `<sheet name="BoM" sheetId="1" r:id="rId1"/>`からシート名とrIdを、
    /// `<workbookPr date1904="1"/>`からエポック設定を取得します。
    fn parse_workbook(xml: &[u8]) -> Result<(Vec<(String, String)>, bool), NvlCheckError> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut sheets = Vec::new();
        let mut is_1904 = false;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                    b"sheet" => {
                        let name = attr_value(&e, b"name")?;
                        // r:id属性はプレフィックス付きのためローカル名で照合する
                        let rid = attr_value(&e, b"id")?;
                        if let (Some(name), Some(rid)) = (name, rid) {
                            sheets.push((name, rid));
                        }
                    }
                    b"workbookPr" => {
                        if let Some(value) = attr_value(&e, b"date1904")? {
                            is_1904 = value == "1" || value == "true";
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok((sheets, is_1904))
    }

    /// xl/_rels/workbook.xml.rels の解析
    ///
    /// Targetは`xl/`からの相対パス、または`/`で始まるパッケージ絶対パスです。
    fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, NvlCheckError> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut targets = HashMap::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) | Event::Empty(e) => {
                    if e.local_name().as_ref() == b"Relationship" {
                        let id = attr_value(&e, b"Id")?;
                        let target = attr_value(&e, b"Target")?;
                        if let (Some(id), Some(target)) = (id, target) {
                            targets.insert(id, resolve_target(&target));
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(targets)
    }
}

/// ZIPエントリを読み込む（存在しない場合は`None`）
fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, NvlCheckError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut content = Vec::new();
    file.read_to_end(&mut content)?;
    Ok(Some(content))
}

/// 属性値をローカル名で取得し、XMLエスケープを解除して返す
fn attr_value(e: &BytesStart<'_>, local_name: &[u8]) -> Result<Option<String>, NvlCheckError> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == local_name {
            let raw = std::str::from_utf8(&attr.value)?;
            let value = quick_xml::escape::unescape(raw).map_err(quick_xml::Error::from)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// リレーションシップのTargetをZIP内パスに変換
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

/// ビルトイン書式ID（0-49）のマッピング
///
/// Excelの標準書式IDとフォーマット文字列の対応表です。
fn builtin_format(id: u32) -> Option<&'static str> {
    match id {
        0 => Some("General"),
        1 => Some("0"),
        2 => Some("0.00"),
        3 => Some("#,##0"),
        4 => Some("#,##0.00"),
        5 => Some("\"$\"#,##0_);(\"$\"#,##0)"),
        6 => Some("\"$\"#,##0_);[Red](\"$\"#,##0)"),
        7 => Some("\"$\"#,##0.00_);(\"$\"#,##0.00)"),
        8 => Some("\"$\"#,##0.00_);[Red](\"$\"#,##0.00)"),
        9 => Some("0%"),
        10 => Some("0.00%"),
        11 => Some("0.00E+00"),
        12 => Some("# ?/?"),
        13 => Some("# ??/??"),
        14 => Some("m/d/yy"),
        15 => Some("d-mmm-yy"),
        16 => Some("d-mmm"),
        17 => Some("mmm-yy"),
        18 => Some("h:mm AM/PM"),
        19 => Some("h:mm:ss AM/PM"),
        20 => Some("h:mm"),
        21 => Some("h:mm:ss"),
        22 => Some("m/d/yy h:mm"),
        37 => Some("#,##0_);(#,##0)"),
        38 => Some("#,##0_);[Red](#,##0)"),
        39 => Some("#,##0.00_);(#,##0.00)"),
        40 => Some("#,##0.00_);[Red](#,##0.00)"),
        45 => Some("mm:ss"),
        46 => Some("[h]:mm:ss"),
        47 => Some("mm:ss.0"),
        48 => Some("##0.0E+0"),
        49 => Some("@"),
        _ => None,
    }
}
