//! Formula Evaluator Module
//!
//! 構文木をセル値に評価します。Excelのエラー値（`#DIV/0!`など）は
//! 評価結果の[`CellValue::Error`]として返し、評価自体の失敗とは区別します。

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use super::parser::{parse, BinaryOp, Expr};
use super::{CellSource, Unsupported};
use crate::format::format_general;
use crate::types::{CellCoord, CellValue};

/// 数式セルから数式セルへの参照をたどる深さの上限
const MAX_DEPTH: usize = 64;

const VALUE_ERROR: &str = "#VALUE!";
const DIV_ZERO_ERROR: &str = "#DIV/0!";
const NUM_ERROR: &str = "#NUM!";

/// 1シート分の数式評価器
///
/// 評価に成功した数式セルの結果はシート単位でメモ化します。
pub(crate) struct FormulaEvaluator<'a, S: CellSource> {
    source: &'a S,
    evaluated: HashMap<CellCoord, CellValue>,
    in_progress: HashSet<CellCoord>,
}

/// 関数の引数（範囲から展開された値かどうかを保持する）
struct Arg {
    value: CellValue,
    in_range: bool,
}

impl<'a, S: CellSource> FormulaEvaluator<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            evaluated: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    /// セルの値を評価する
    ///
    /// 数式のないセルは保存されている値をそのまま返します。
    /// 空セルだけを参照する数式（`=H1`でH1が空など）は0になります。
    pub fn evaluate_cell(&mut self, coord: CellCoord) -> Result<CellValue, Unsupported> {
        let source = self.source;
        let Some(formula) = source.formula(coord) else {
            return Ok(source.stored_value(coord));
        };
        if let Some(value) = self.evaluated.get(&coord) {
            return Ok(value.clone());
        }
        if self.in_progress.contains(&coord) {
            return Err(Unsupported::new(format!(
                "circular reference through {}",
                coord.to_a1_notation()
            )));
        }
        if self.in_progress.len() >= MAX_DEPTH {
            return Err(Unsupported::new("reference chain too deep"));
        }

        let expr = parse(formula, source.sheet_name())?;

        self.in_progress.insert(coord);
        let result = self.eval(&expr);
        self.in_progress.remove(&coord);

        let value = match result? {
            CellValue::Empty => CellValue::Number(0.0),
            value => value,
        };
        self.evaluated.insert(coord, value.clone());
        Ok(value)
    }

    fn eval(&mut self, expr: &Expr) -> Result<CellValue, Unsupported> {
        Ok(match expr {
            Expr::Number(n) => CellValue::Number(*n),
            Expr::Text(s) => CellValue::Text(s.clone()),
            Expr::Bool(b) => CellValue::Bool(*b),
            Expr::Error(e) => CellValue::Error(e.clone()),
            Expr::Ref(coord) => self.resolve(*coord)?,
            Expr::Range(..) => {
                return Err(Unsupported::new("range used outside a function argument"));
            }
            Expr::Neg(inner) => {
                let value = self.eval(inner)?;
                numeric(&value, |n| CellValue::Number(-n))
            }
            Expr::Percent(inner) => {
                let value = self.eval(inner)?;
                numeric(&value, |n| CellValue::Number(n / 100.0))
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, &left, &right)
            }
            Expr::Call { name, args } => self.call(name, args)?,
        })
    }

    /// 参照先セルの値（空セルは`Empty`のまま返す）
    fn resolve(&mut self, coord: CellCoord) -> Result<CellValue, Unsupported> {
        if self.source.formula(coord).is_some() {
            self.evaluate_cell(coord)
        } else {
            Ok(self.source.stored_value(coord))
        }
    }

    /// 範囲のうち、値または数式のあるセルの外接矩形と重なる部分
    fn range_cells(&self, start: CellCoord, end: CellCoord) -> Vec<CellCoord> {
        let Some((first, last)) = self.source.used_bounds() else {
            return Vec::new();
        };
        let rows = start.row.max(first.row)..=end.row.min(last.row);
        let cols = start.col.max(first.col)..=end.col.min(last.col);
        rows.flat_map(|row| cols.clone().map(move |col| CellCoord::new(row, col)))
            .collect()
    }

    fn arguments(&mut self, args: &[Expr]) -> Result<Vec<Arg>, Unsupported> {
        let mut values = Vec::new();
        for arg in args {
            match arg {
                Expr::Range(start, end) => {
                    for coord in self.range_cells(*start, *end) {
                        values.push(Arg {
                            value: self.resolve(coord)?,
                            in_range: true,
                        });
                    }
                }
                Expr::Ref(coord) => values.push(Arg {
                    value: self.resolve(*coord)?,
                    in_range: true,
                }),
                expr => values.push(Arg {
                    value: self.eval(expr)?,
                    in_range: false,
                }),
            }
        }
        Ok(values)
    }

    fn scalar_args(&mut self, name: &str, args: &[Expr]) -> Result<Vec<CellValue>, Unsupported> {
        args.iter()
            .map(|arg| match arg {
                Expr::Range(..) => Err(Unsupported::new(format!(
                    "range argument to {} is not supported",
                    name
                ))),
                expr => self.eval(expr),
            })
            .collect()
    }

    fn call(&mut self, name: &str, args: &[Expr]) -> Result<CellValue, Unsupported> {
        let arity = |min: usize, max: usize| -> Result<(), Unsupported> {
            if (min..=max).contains(&args.len()) {
                Ok(())
            } else {
                Err(Unsupported::new(format!(
                    "{} expects {}..={} arguments, got {}",
                    name,
                    min,
                    max,
                    args.len()
                )))
            }
        };

        // 遅延評価する関数
        match name {
            "IF" => {
                arity(2, 3)?;
                let condition = self.eval(&args[0])?;
                return Ok(match truthy(&condition) {
                    Ok(true) => self.eval(&args[1])?,
                    Ok(false) => match args.get(2) {
                        Some(expr) => self.eval(expr)?,
                        None => CellValue::Bool(false),
                    },
                    Err(e) => CellValue::Error(e),
                });
            }
            "IFERROR" => {
                arity(2, 2)?;
                return Ok(match self.eval(&args[0])? {
                    CellValue::Error(_) => self.eval(&args[1])?,
                    value => value,
                });
            }
            _ => {}
        }

        Ok(match name {
            "SUM" | "PRODUCT" | "MIN" | "MAX" | "AVERAGE" => {
                arity(1, usize::MAX)?;
                let args = self.arguments(args)?;
                match numbers(&args) {
                    Ok(values) => aggregate(name, &values),
                    Err(e) => CellValue::Error(e),
                }
            }
            "COUNT" => {
                let args = self.arguments(args)?;
                let count = args
                    .iter()
                    .filter(|arg| match &arg.value {
                        CellValue::Number(_) => true,
                        value if !arg.in_range => to_number(value).is_ok(),
                        _ => false,
                    })
                    .count();
                CellValue::Number(count as f64)
            }
            "COUNTA" => {
                let args = self.arguments(args)?;
                let count = args.iter().filter(|arg| !arg.value.is_empty()).count();
                CellValue::Number(count as f64)
            }
            "AND" | "OR" => {
                arity(1, usize::MAX)?;
                let args = self.arguments(args)?;
                let mut flags = Vec::new();
                for arg in &args {
                    match (&arg.value, arg.in_range) {
                        (CellValue::Error(e), _) => return Ok(CellValue::Error(e.clone())),
                        (CellValue::Bool(b), _) => flags.push(*b),
                        (CellValue::Number(n), _) => flags.push(*n != 0.0),
                        (_, true) => {}
                        (value, false) => match truthy(value) {
                            Ok(b) => flags.push(b),
                            Err(e) => return Ok(CellValue::Error(e)),
                        },
                    }
                }
                if flags.is_empty() {
                    CellValue::Error(VALUE_ERROR.to_string())
                } else if name == "AND" {
                    CellValue::Bool(flags.iter().all(|b| *b))
                } else {
                    CellValue::Bool(flags.iter().any(|b| *b))
                }
            }
            "CONCAT" => {
                let args = self.arguments(args)?;
                let mut text = String::new();
                for arg in &args {
                    match to_text(&arg.value) {
                        Ok(s) => text.push_str(&s),
                        Err(e) => return Ok(CellValue::Error(e)),
                    }
                }
                CellValue::Text(text)
            }
            _ => {
                let values = self.scalar_args(name, args)?;
                self.scalar_function(name, &values)?
            }
        })
    }

    /// 引数がすべてスカラーの関数
    fn scalar_function(&self, name: &str, args: &[CellValue]) -> Result<CellValue, Unsupported> {
        let arity = |min: usize, max: usize| -> Result<(), Unsupported> {
            if (min..=max).contains(&args.len()) {
                Ok(())
            } else {
                Err(Unsupported::new(format!(
                    "{} expects {}..={} arguments, got {}",
                    name,
                    min,
                    max,
                    args.len()
                )))
            }
        };

        // 引数のエラー値はそのまま結果になる
        if let Some(CellValue::Error(e)) = args.iter().find(|v| matches!(v, CellValue::Error(_))) {
            if is_known_function(name) {
                return Ok(CellValue::Error(e.clone()));
            }
        }

        let result = match name {
            "ROUND" | "ROUNDUP" | "ROUNDDOWN" => {
                arity(2, 2)?;
                number_pair(&args[0], &args[1], |value, digits| {
                    CellValue::Number(round(name, value, digits.trunc() as i32))
                })
            }
            "INT" => {
                arity(1, 1)?;
                numeric(&args[0], |n| CellValue::Number(n.floor()))
            }
            "ABS" => {
                arity(1, 1)?;
                numeric(&args[0], |n| CellValue::Number(n.abs()))
            }
            "MOD" => {
                arity(2, 2)?;
                number_pair(&args[0], &args[1], |n, d| {
                    if d == 0.0 {
                        CellValue::Error(DIV_ZERO_ERROR.to_string())
                    } else {
                        // 結果の符号は除数に合わせる
                        CellValue::Number(n - d * (n / d).floor())
                    }
                })
            }
            "NOT" => {
                arity(1, 1)?;
                match truthy(&args[0]) {
                    Ok(b) => CellValue::Bool(!b),
                    Err(e) => CellValue::Error(e),
                }
            }
            "CONCATENATE" => {
                arity(1, usize::MAX)?;
                let mut text = String::new();
                for value in args {
                    match to_text(value) {
                        Ok(s) => text.push_str(&s),
                        Err(e) => return Ok(CellValue::Error(e)),
                    }
                }
                CellValue::Text(text)
            }
            "TRIM" | "UPPER" | "LOWER" | "LEN" | "VALUE" => {
                arity(1, 1)?;
                match to_text(&args[0]) {
                    Ok(s) => match name {
                        "TRIM" => CellValue::Text(
                            s.split(' ').filter(|p| !p.is_empty()).collect::<Vec<_>>().join(" "),
                        ),
                        "UPPER" => CellValue::Text(s.to_uppercase()),
                        "LOWER" => CellValue::Text(s.to_lowercase()),
                        "LEN" => CellValue::Number(s.chars().count() as f64),
                        _ => match to_number(&CellValue::Text(s)) {
                            Ok(n) => CellValue::Number(n),
                            Err(e) => CellValue::Error(e),
                        },
                    },
                    Err(e) => CellValue::Error(e),
                }
            }
            "LEFT" | "RIGHT" => {
                arity(1, 2)?;
                let count = match args.get(1).map(to_number).unwrap_or(Ok(1.0)) {
                    Ok(n) if n >= 0.0 => n.trunc() as usize,
                    Ok(_) => return Ok(CellValue::Error(VALUE_ERROR.to_string())),
                    Err(e) => return Ok(CellValue::Error(e)),
                };
                match to_text(&args[0]) {
                    Ok(s) => {
                        let chars: Vec<char> = s.chars().collect();
                        let count = count.min(chars.len());
                        let taken = if name == "LEFT" {
                            &chars[..count]
                        } else {
                            &chars[chars.len() - count..]
                        };
                        CellValue::Text(taken.iter().collect())
                    }
                    Err(e) => CellValue::Error(e),
                }
            }
            _ => {
                return Err(Unsupported::new(format!("unsupported function {}", name)));
            }
        };
        Ok(result)
    }
}

fn is_known_function(name: &str) -> bool {
    matches!(
        name,
        "ROUND"
            | "ROUNDUP"
            | "ROUNDDOWN"
            | "INT"
            | "ABS"
            | "MOD"
            | "NOT"
            | "CONCATENATE"
            | "TRIM"
            | "UPPER"
            | "LOWER"
            | "LEN"
            | "VALUE"
            | "LEFT"
            | "RIGHT"
    )
}

/// 数値への変換。失敗時はExcelのエラー値を返す
fn to_number(value: &CellValue) -> Result<f64, String> {
    match value {
        CellValue::Number(n) => Ok(*n),
        CellValue::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        CellValue::Empty => Ok(0.0),
        CellValue::Text(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| VALUE_ERROR.to_string()),
        CellValue::Error(e) => Err(e.clone()),
    }
}

/// 文字列への変換（数値はGeneral書式）
fn to_text(value: &CellValue) -> Result<String, String> {
    match value {
        CellValue::Number(n) => Ok(format_general(*n)),
        CellValue::Text(s) => Ok(s.clone()),
        CellValue::Bool(b) => Ok(if *b { "TRUE" } else { "FALSE" }.to_string()),
        CellValue::Empty => Ok(String::new()),
        CellValue::Error(e) => Err(e.clone()),
    }
}

fn truthy(value: &CellValue) -> Result<bool, String> {
    match value {
        CellValue::Bool(b) => Ok(*b),
        CellValue::Number(n) => Ok(*n != 0.0),
        CellValue::Empty => Ok(false),
        CellValue::Text(s) if s.eq_ignore_ascii_case("TRUE") => Ok(true),
        CellValue::Text(s) if s.eq_ignore_ascii_case("FALSE") => Ok(false),
        CellValue::Text(_) => Err(VALUE_ERROR.to_string()),
        CellValue::Error(e) => Err(e.clone()),
    }
}

/// 数値に変換して`f`を適用する。非有限の結果は`#NUM!`
fn numeric(value: &CellValue, f: impl FnOnce(f64) -> CellValue) -> CellValue {
    match to_number(value) {
        Ok(n) => finite(f(n)),
        Err(e) => CellValue::Error(e),
    }
}

fn number_pair(a: &CellValue, b: &CellValue, f: impl FnOnce(f64, f64) -> CellValue) -> CellValue {
    match (to_number(a), to_number(b)) {
        (Ok(a), Ok(b)) => finite(f(a, b)),
        (Err(e), _) | (_, Err(e)) => CellValue::Error(e),
    }
}

fn finite(value: CellValue) -> CellValue {
    match value {
        CellValue::Number(n) if !n.is_finite() => CellValue::Error(NUM_ERROR.to_string()),
        value => value,
    }
}

fn binary(op: BinaryOp, left: &CellValue, right: &CellValue) -> CellValue {
    match op {
        BinaryOp::Add => number_pair(left, right, |a, b| CellValue::Number(a + b)),
        BinaryOp::Sub => number_pair(left, right, |a, b| CellValue::Number(a - b)),
        BinaryOp::Mul => number_pair(left, right, |a, b| CellValue::Number(a * b)),
        BinaryOp::Div => number_pair(left, right, |a, b| {
            if b == 0.0 {
                CellValue::Error(DIV_ZERO_ERROR.to_string())
            } else {
                CellValue::Number(a / b)
            }
        }),
        BinaryOp::Pow => number_pair(left, right, |a, b| CellValue::Number(a.powf(b))),
        BinaryOp::Concat => match (to_text(left), to_text(right)) {
            (Ok(a), Ok(b)) => CellValue::Text(a + &b),
            (Err(e), _) | (_, Err(e)) => CellValue::Error(e),
        },
        BinaryOp::Eq
        | BinaryOp::NotEq
        | BinaryOp::Lt
        | BinaryOp::Gt
        | BinaryOp::LtEq
        | BinaryOp::GtEq => match compare(left, right) {
            Ok(ordering) => CellValue::Bool(match op {
                BinaryOp::Eq => ordering == Ordering::Equal,
                BinaryOp::NotEq => ordering != Ordering::Equal,
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Gt => ordering == Ordering::Greater,
                BinaryOp::LtEq => ordering != Ordering::Greater,
                _ => ordering != Ordering::Less,
            }),
            Err(e) => CellValue::Error(e),
        },
    }
}

/// Excelの比較順序: 数値 < 文字列 < 論理値。文字列は大文字小文字を区別しない
fn compare(left: &CellValue, right: &CellValue) -> Result<Ordering, String> {
    fn blank_like(value: &CellValue, other: &CellValue) -> CellValue {
        match (value, other) {
            (CellValue::Empty, CellValue::Text(_)) => CellValue::Text(String::new()),
            (CellValue::Empty, CellValue::Bool(_)) => CellValue::Bool(false),
            (CellValue::Empty, _) => CellValue::Number(0.0),
            (value, _) => value.clone(),
        }
    }
    fn rank(value: &CellValue) -> u8 {
        match value {
            CellValue::Text(_) => 1,
            CellValue::Bool(_) => 2,
            _ => 0,
        }
    }

    let left = blank_like(left, right);
    let right = blank_like(right, &left);
    match (&left, &right) {
        (CellValue::Error(e), _) | (_, CellValue::Error(e)) => Err(e.clone()),
        (CellValue::Number(a), CellValue::Number(b)) => {
            Ok(a.partial_cmp(b).unwrap_or(Ordering::Equal))
        }
        (CellValue::Text(a), CellValue::Text(b)) => Ok(a.to_lowercase().cmp(&b.to_lowercase())),
        (CellValue::Bool(a), CellValue::Bool(b)) => Ok(a.cmp(b)),
        (a, b) => Ok(rank(a).cmp(&rank(b))),
    }
}

/// 範囲から展開した値のうち数値以外は無視し、直接指定された値は数値に変換する
fn numbers(args: &[Arg]) -> Result<Vec<f64>, String> {
    let mut values = Vec::new();
    for arg in args {
        match (&arg.value, arg.in_range) {
            (CellValue::Error(e), _) => return Err(e.clone()),
            (CellValue::Number(n), _) => values.push(*n),
            (_, true) => {}
            (value, false) => values.push(to_number(value)?),
        }
    }
    Ok(values)
}

fn aggregate(name: &str, values: &[f64]) -> CellValue {
    let result = match name {
        "SUM" => values.iter().sum(),
        "PRODUCT" => values.iter().product(),
        "MIN" => values.iter().copied().reduce(f64::min).unwrap_or(0.0),
        "MAX" => values.iter().copied().reduce(f64::max).unwrap_or(0.0),
        _ => {
            if values.is_empty() {
                return CellValue::Error(DIV_ZERO_ERROR.to_string());
            }
            values.iter().sum::<f64>() / values.len() as f64
        }
    };
    finite(CellValue::Number(result))
}

/// ROUND系関数。`digits`が負の場合は整数部を丸める
fn round(name: &str, value: f64, digits: i32) -> f64 {
    let apply = |scaled: f64| match name {
        "ROUNDUP" => scaled.abs().ceil().copysign(scaled),
        "ROUNDDOWN" => scaled.trunc(),
        _ => scaled.round(),
    };
    if digits >= 0 {
        let factor = 10f64.powi(digits);
        apply(value * factor) / factor
    } else {
        let factor = 10f64.powi(-digits);
        apply(value / factor) * factor
    }
}
