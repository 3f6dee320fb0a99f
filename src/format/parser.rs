//! FormatParser Module
//!
//! Excel Number Format Stringの構文解析と適用を提供します。

use chrono::{Datelike, Duration, NaiveDate};

use super::sections::{FormatSection, SectionKind};
use super::tokens::FormatToken;

/// Number Format Stringパーサー
///
/// Excel Number Format Stringを解析し、数値をフォーマットします。
/// 解析できない部分はリテラルとして扱うため、パース自体は失敗しません。
#[derive(Debug, Clone)]
pub(crate) struct FormatParser {
    /// パースされたセクション
    sections: Vec<FormatSection>,
}

impl FormatParser {
    /// フォーマット文字列をパース
    pub fn parse(format_string: &str) -> Self {
        if format_string.trim().is_empty() {
            let mut section = FormatSection::new(SectionKind::Positive);
            section.tokens.push(FormatToken::General);
            return Self {
                sections: vec![section],
            };
        }

        let sections = Self::split_sections(format_string)
            .iter()
            .take(4)
            .enumerate()
            .map(|(idx, section_str)| {
                let kind = match idx {
                    0 => SectionKind::Positive,
                    1 => SectionKind::Negative,
                    2 => SectionKind::Zero,
                    _ => SectionKind::Text,
                };
                Self::parse_section(section_str, kind)
            })
            .collect();

        Self { sections }
    }

    /// セクションに分割
    ///
    /// ';'でセクションに分割します。引用符・ブラケット内の';'とエスケープされた';'は区切りとしません。
    /// 空のセクション（例: "0;;"）も保持します。
    fn split_sections(format_string: &str) -> Vec<String> {
        let mut sections = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut in_brackets = false;
        let mut escaped = false;

        for ch in format_string.chars() {
            if escaped {
                escaped = false;
                current.push(ch);
                continue;
            }
            match ch {
                '\\' if !in_quotes => {
                    escaped = true;
                    current.push(ch);
                }
                '"' => {
                    in_quotes = !in_quotes;
                    current.push(ch);
                }
                '[' if !in_quotes => {
                    in_brackets = true;
                    current.push(ch);
                }
                ']' if !in_quotes => {
                    in_brackets = false;
                    current.push(ch);
                }
                ';' if !in_quotes && !in_brackets => {
                    sections.push(std::mem::take(&mut current));
                }
                _ => current.push(ch),
            }
        }

        sections.push(current);
        sections
    }

    /// セクションをパース
    fn parse_section(section_str: &str, kind: SectionKind) -> FormatSection {
        let mut section = FormatSection::new(kind);
        let chars: Vec<char> = section_str.chars().collect();
        let tokens = &mut section.tokens;
        let mut after_decimal = false;
        let mut i = 0;

        while i < chars.len() {
            let ch = chars[i];
            match ch {
                '"' => {
                    let end = chars[i + 1..]
                        .iter()
                        .position(|&c| c == '"')
                        .map_or(chars.len(), |p| i + 1 + p);
                    push_literal(tokens, &chars[i + 1..end].iter().collect::<String>());
                    i = end + 1;
                }
                '\\' => {
                    if let Some(&next) = chars.get(i + 1) {
                        push_literal(tokens, &next.to_string());
                    }
                    i += 2;
                }
                // "_x"はxの幅の空白、"*x"はセル幅までの繰り返し
                '_' => {
                    push_literal(tokens, " ");
                    i += 2;
                }
                '*' => i += 2,
                '[' => {
                    let end = chars[i + 1..]
                        .iter()
                        .position(|&c| c == ']')
                        .map_or(chars.len(), |p| i + 1 + p);
                    let content: String = chars[i + 1..end].iter().collect();
                    Self::parse_bracket(&content, tokens);
                    i = end + 1;
                }
                'G' | 'g' if starts_with_ignore_case(&chars[i..], "general") => {
                    tokens.push(FormatToken::General);
                    i += "general".len();
                }
                'A' | 'a' if starts_with_ignore_case(&chars[i..], "am/pm") => {
                    tokens.push(FormatToken::AmPm);
                    i += "am/pm".len();
                }
                '@' => {
                    tokens.push(FormatToken::TextPlaceholder);
                    i += 1;
                }
                '0' => {
                    let count = count_run(&chars, i, '0');
                    if after_decimal {
                        tokens.push(FormatToken::DecimalZero(count));
                    } else {
                        tokens.push(FormatToken::IntegerZero(count));
                    }
                    i += count;
                }
                '#' | '?' => {
                    let count = count_run(&chars, i, ch);
                    if after_decimal {
                        tokens.push(FormatToken::DecimalHash(count));
                    } else {
                        tokens.push(FormatToken::IntegerHash);
                    }
                    i += count;
                }
                '.' if !after_decimal => {
                    tokens.push(FormatToken::DecimalPoint);
                    after_decimal = true;
                    i += 1;
                }
                ',' => {
                    tokens.push(FormatToken::ThousandSeparator);
                    i += 1;
                }
                '%' => {
                    tokens.push(FormatToken::Percent);
                    i += 1;
                }
                'E' | 'e' if matches!(chars.get(i + 1), Some('+') | Some('-')) => {
                    let plus = chars[i + 1] == '+';
                    let digits = count_run(&chars, i + 2, '0').max(1);
                    tokens.push(FormatToken::Exponent { plus, digits });
                    i += 2 + count_run(&chars, i + 2, '0');
                }
                'y' | 'Y' => {
                    let count = count_run_ignore_case(&chars, i, 'y');
                    tokens.push(FormatToken::Year(count));
                    i += count;
                }
                'm' | 'M' => {
                    let count = count_run_ignore_case(&chars, i, 'm');
                    if count <= 2 && Self::is_minute(tokens, &chars, i + count) {
                        tokens.push(FormatToken::Minute(count));
                    } else {
                        tokens.push(FormatToken::Month(count));
                    }
                    i += count;
                }
                'd' | 'D' => {
                    let count = count_run_ignore_case(&chars, i, 'd');
                    tokens.push(FormatToken::Day(count));
                    i += count;
                }
                'h' | 'H' => {
                    let count = count_run_ignore_case(&chars, i, 'h');
                    tokens.push(FormatToken::Hour(count));
                    i += count;
                }
                's' | 'S' => {
                    let count = count_run_ignore_case(&chars, i, 's');
                    tokens.push(FormatToken::Second(count));
                    i += count;
                }
                _ => {
                    push_literal(tokens, &ch.to_string());
                    i += 1;
                }
            }
        }

        section
    }

    /// ブラケット内の解析
    ///
    /// `[h]`は経過時間、`[$€-407]`は通貨記号として扱い、
    /// 色指定・条件・ロケール指定は読み捨てます。
    fn parse_bracket(content: &str, tokens: &mut Vec<FormatToken>) {
        let lower = content.to_ascii_lowercase();
        if !lower.is_empty() && lower.chars().all(|c| c == 'h') {
            tokens.push(FormatToken::ElapsedHours(lower.len()));
        } else if let Some(currency) = content.strip_prefix('$') {
            let symbol = currency.split('-').next().unwrap_or_default();
            if !symbol.is_empty() {
                push_literal(tokens, symbol);
            }
        }
    }

    /// "m"が分を表すかどうか
    ///
    /// 直前の日時トークンが時、または直後の日時文字が秒の場合に分とみなします。
    fn is_minute(tokens: &[FormatToken], chars: &[char], next: usize) -> bool {
        let after_hour = tokens
            .iter()
            .rev()
            .find(|t| t.is_datetime())
            .is_some_and(|t| matches!(t, FormatToken::Hour(_) | FormatToken::ElapsedHours(_)));
        let before_second = chars[next.min(chars.len())..]
            .iter()
            .find(|c| c.is_alphabetic())
            .is_some_and(|c| c.eq_ignore_ascii_case(&'s'));
        after_hour || before_second
    }

    /// 数値をフォーマット
    ///
    /// # 引数
    ///
    /// * `value` - フォーマットする数値（日付の場合はシリアル値）
    /// * `is_1904` - 1904年エポックを使用するかどうか
    pub fn format_number(&self, value: f64, is_1904: bool) -> String {
        // 1. セクションの選択
        let Some((section, value)) = self.select_section(value) else {
            return format_general(value);
        };

        // 2. トークンに基づいてフォーマット
        if section.tokens.is_empty() {
            String::new()
        } else if section.is_datetime() {
            Self::format_datetime(value, section, is_1904).unwrap_or_else(|| format_general(value))
        } else if section.is_numeric() && !Self::is_fraction(section) {
            Self::format_numeric(value, section)
        } else if section.is_numeric() {
            // 分数書式は未対応
            format_general(value)
        } else {
            Self::format_literal(value, section)
        }
    }

    /// 適切なセクションを選択
    ///
    /// 負数用セクションが存在する場合、符号は書式側で表現されるため絶対値を返します。
    fn select_section(&self, value: f64) -> Option<(&FormatSection, f64)> {
        let numeric: Vec<&FormatSection> = self
            .sections
            .iter()
            .filter(|s| s.kind != SectionKind::Text)
            .collect();

        match numeric.len() {
            0 => None,
            1 => Some((numeric[0], value)),
            2 if value < 0.0 => Some((numeric[1], value.abs())),
            2 => Some((numeric[0], value)),
            _ if value > 0.0 => Some((numeric[0], value)),
            _ if value < 0.0 => Some((numeric[1], value.abs())),
            _ => Some((numeric[2], value)),
        }
    }

    fn is_fraction(section: &FormatSection) -> bool {
        section
            .tokens
            .iter()
            .any(|t| matches!(t, FormatToken::Literal(s) if s.contains('/')))
    }

    /// リテラルと"General"のみのセクションをフォーマット
    fn format_literal(value: f64, section: &FormatSection) -> String {
        let mut result = String::new();
        for token in &section.tokens {
            match token {
                FormatToken::General | FormatToken::TextPlaceholder => {
                    result.push_str(&format_general(value))
                }
                FormatToken::Literal(s) => result.push_str(s),
                FormatToken::Percent => result.push('%'),
                _ => {}
            }
        }
        result
    }

    /// 日付・時刻をフォーマット
    ///
    /// # エポックシステム
    ///
    /// - 1900年システム: シリアル値1 = 1900年1月1日。
    ///   Excelが存在しない1900年2月29日をシリアル値60として数えるため、61以降は1日ずれる
    /// - 1904年システム: シリアル値0 = 1904年1月1日
    ///
    /// 負の値や範囲外の値は`None`を返します。
    fn format_datetime(value: f64, section: &FormatSection, is_1904: bool) -> Option<String> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }

        // 秒未満の桁数（例: "mm:ss.0"）
        let sub_digits = section
            .tokens
            .iter()
            .filter_map(|t| match t {
                FormatToken::DecimalZero(n) => Some(*n),
                _ => None,
            })
            .sum::<usize>()
            .min(3) as u32;
        let scale = 10u64.pow(sub_digits);
        let units_per_day = 86_400 * scale;
        let total_units = (value * units_per_day as f64).round() as u64;

        let days = (total_units / units_per_day) as i64;
        let units_of_day = total_units % units_per_day;
        let seconds_of_day = units_of_day / scale;
        let sub_second = units_of_day % scale;

        let date = if is_1904 {
            NaiveDate::from_ymd_opt(1904, 1, 1)?.checked_add_signed(Duration::days(days))?
        } else if days < 61 {
            NaiveDate::from_ymd_opt(1899, 12, 31)?.checked_add_signed(Duration::days(days))?
        } else {
            NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(Duration::days(days))?
        };

        let hour = (seconds_of_day / 3600) as u32;
        let minute = ((seconds_of_day % 3600) / 60) as u32;
        let second = (seconds_of_day % 60) as u32;
        let am_pm = section.uses_am_pm();

        let mut result = String::new();
        for token in &section.tokens {
            match token {
                FormatToken::Year(count) => {
                    if *count <= 2 {
                        result.push_str(&format!("{:02}", date.year() % 100));
                    } else {
                        result.push_str(&format!("{:04}", date.year()));
                    }
                }
                FormatToken::Month(count) => match count {
                    1 => result.push_str(&date.month().to_string()),
                    2 => result.push_str(&format!("{:02}", date.month())),
                    3 => result.push_str(&date.format("%b").to_string()),
                    4 => result.push_str(&date.format("%B").to_string()),
                    _ => result.push_str(&date.format("%B").to_string()[..1]),
                },
                FormatToken::Day(count) => match count {
                    1 => result.push_str(&date.day().to_string()),
                    2 => result.push_str(&format!("{:02}", date.day())),
                    3 => result.push_str(&date.format("%a").to_string()),
                    _ => result.push_str(&date.format("%A").to_string()),
                },
                FormatToken::Hour(count) => {
                    let display = if am_pm {
                        match hour % 12 {
                            0 => 12,
                            h => h,
                        }
                    } else {
                        hour
                    };
                    push_padded(&mut result, display as u64, *count);
                }
                FormatToken::ElapsedHours(count) => {
                    let elapsed = total_units / (3600 * scale);
                    push_padded(&mut result, elapsed, *count);
                }
                FormatToken::Minute(count) => push_padded(&mut result, minute as u64, *count),
                FormatToken::Second(count) => push_padded(&mut result, second as u64, *count),
                FormatToken::AmPm => result.push_str(if hour < 12 { "AM" } else { "PM" }),
                FormatToken::DecimalPoint => result.push('.'),
                FormatToken::ThousandSeparator => result.push(','),
                FormatToken::DecimalZero(_) if sub_digits > 0 => {
                    result.push_str(&format!("{:0width$}", sub_second, width = sub_digits as usize));
                }
                FormatToken::Literal(s) => result.push_str(s),
                _ => {}
            }
        }

        Some(result)
    }

    /// 数値書式でフォーマット
    fn format_numeric(value: f64, section: &FormatSection) -> String {
        // 1. トークンから構造を解析
        let mut int_min = 0;
        let mut dec_min = 0;
        let mut dec_max = 0;
        let mut grouping = false;
        let mut percent = 0;
        let mut exponent = None;
        let mut seen_decimal = false;

        for token in &section.tokens {
            match token {
                FormatToken::IntegerZero(count) => int_min += *count,
                FormatToken::DecimalPoint => seen_decimal = true,
                FormatToken::DecimalZero(count) => {
                    dec_min += *count;
                    dec_max += *count;
                }
                FormatToken::DecimalHash(count) => dec_max += *count,
                FormatToken::ThousandSeparator if !seen_decimal => grouping = true,
                FormatToken::Percent => percent += 1,
                FormatToken::Exponent { plus, digits } => exponent = Some((*plus, *digits)),
                _ => {}
            }
        }

        // パーセントの場合は値を100倍
        let abs_value = value.abs() * 100f64.powi(percent);

        // 2. 整数部・小数部・指数部の文字列を生成
        let (int_digits, frac_digits, exp_str) = match exponent {
            Some((plus, digits)) => {
                let (mantissa, exp) = split_scientific(abs_value, dec_max);
                let (int_digits, frac_digits) = fixed_digits(mantissa, dec_min, dec_max);
                let sign = if exp < 0 {
                    "-"
                } else if plus {
                    "+"
                } else {
                    ""
                };
                let exp_str = format!("E{}{:0width$}", sign, exp.abs(), width = digits);
                (int_digits, frac_digits, exp_str)
            }
            None => {
                let (int_digits, frac_digits) = fixed_digits(abs_value, dec_min, dec_max);
                (int_digits, frac_digits, String::new())
            }
        };

        let int_str = {
            let trimmed = if int_digits == "0" && int_min == 0 {
                ""
            } else {
                int_digits.as_str()
            };
            let padded = format!("{:0>width$}", trimmed, width = int_min);
            if grouping {
                add_thousand_separators(&padded)
            } else {
                padded
            }
        };

        // 3. トークンを順に処理して結果を構築
        let is_zero = int_digits.chars().chain(frac_digits.chars()).all(|c| c == '0');
        let mut result = String::new();
        if value < 0.0 && !is_zero {
            result.push('-');
        }

        let mut int_emitted = false;
        for token in &section.tokens {
            match token {
                FormatToken::IntegerZero(_) | FormatToken::IntegerHash if !int_emitted => {
                    result.push_str(&int_str);
                    int_emitted = true;
                }
                FormatToken::DecimalPoint => {
                    if !int_emitted {
                        result.push_str(&int_str);
                        int_emitted = true;
                    }
                    result.push('.');
                    result.push_str(&frac_digits);
                }
                FormatToken::Exponent { .. } => {
                    if !int_emitted {
                        result.push_str(&int_str);
                        int_emitted = true;
                    }
                    result.push_str(&exp_str);
                }
                FormatToken::Percent => result.push('%'),
                FormatToken::Literal(s) => result.push_str(s),
                _ => {}
            }
        }

        result
    }
}

/// "General"書式で数値をフォーマット
///
/// - 整数値は小数部なしで表示
/// - それ以外は小数点以下10桁まで表示し、末尾のゼロを除去
/// - 絶対値が1e11以上、または1e-9未満の場合は指数表記（例: "1.23457E+11"）
pub(crate) fn format_general(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let abs_value = value.abs();
    if !(1e-9..1e11).contains(&abs_value) {
        let (mantissa, exp) = split_scientific(abs_value, 5);
        let mantissa = trim_fraction(&format!("{:.5}", mantissa));
        let sign = if value < 0.0 { "-" } else { "" };
        let exp_sign = if exp < 0 { '-' } else { '+' };
        return format!("{}{}E{}{:02}", sign, mantissa, exp_sign, exp.abs());
    }

    if value.fract() == 0.0 {
        return format!("{}", value as i64);
    }

    let formatted = trim_fraction(&format!("{:.10}", value));
    if formatted == "-0" {
        "0".to_string()
    } else {
        formatted
    }
}

/// 仮数部（1以上10未満）と指数に分解する
///
/// 仮数部を`decimals`桁に丸めた結果が10になる場合は指数を繰り上げます。
fn split_scientific(abs_value: f64, decimals: usize) -> (f64, i32) {
    if abs_value == 0.0 {
        return (0.0, 0);
    }
    let mut exp = abs_value.log10().floor() as i32;
    let mut mantissa = round_half_up(abs_value / 10f64.powi(exp), decimals);
    if mantissa >= 10.0 {
        exp += 1;
        mantissa = round_half_up(abs_value / 10f64.powi(exp), decimals);
    }
    (mantissa, exp)
}

/// 固定小数点の整数部・小数部の数字列を生成
///
/// 小数部は`dec_max`桁に丸め、末尾のゼロを`dec_min`桁まで除去します。
fn fixed_digits(abs_value: f64, dec_min: usize, dec_max: usize) -> (String, String) {
    let rounded = round_half_up(abs_value, dec_max);
    let formatted = format!("{:.*}", dec_max, rounded);
    let (int_part, frac_part) = formatted
        .split_once('.')
        .map(|(i, f)| (i.to_string(), f.to_string()))
        .unwrap_or((formatted.clone(), String::new()));

    let mut frac_part = frac_part;
    while frac_part.len() > dec_min && frac_part.ends_with('0') {
        frac_part.pop();
    }
    (int_part, frac_part)
}

/// 四捨五入（0から遠い方へ丸める）
fn round_half_up(value: f64, decimals: usize) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let scaled = (value * factor).round() / factor;
    if scaled.is_finite() {
        scaled
    } else {
        value
    }
}

/// 小数部の末尾のゼロと小数点を除去
fn trim_fraction(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

/// 千の位区切りを追加
fn add_thousand_separators(s: &str) -> String {
    let len = s.chars().count();
    let mut result = String::with_capacity(len + len / 3);
    for (i, ch) in s.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result
}

fn push_literal(tokens: &mut Vec<FormatToken>, text: &str) {
    if let Some(FormatToken::Literal(existing)) = tokens.last_mut() {
        existing.push_str(text);
    } else {
        tokens.push(FormatToken::Literal(text.to_string()));
    }
}

fn push_padded(result: &mut String, value: u64, width: usize) {
    if width >= 2 {
        result.push_str(&format!("{:02}", value));
    } else {
        result.push_str(&value.to_string());
    }
}

fn starts_with_ignore_case(chars: &[char], keyword: &str) -> bool {
    let keyword: Vec<char> = keyword.chars().collect();
    chars.len() >= keyword.len()
        && chars
            .iter()
            .zip(keyword.iter())
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
}

fn count_run(chars: &[char], start: usize, target: char) -> usize {
    chars
        .get(start..)
        .map_or(0, |rest| rest.iter().take_while(|&&c| c == target).count())
}

fn count_run_ignore_case(chars: &[char], start: usize, target: char) -> usize {
    chars.get(start..).map_or(0, |rest| {
        rest.iter()
            .take_while(|c| c.eq_ignore_ascii_case(&target))
            .count()
    })
}
