//! Formula Parser Module
//!
//! 数式文字列を字句解析し、構文木（[`Expr`]）に変換します。
//!
//! 優先順位（低い順）: 比較 < `&` < `+ -` < `* /` < `^` < 単項 `- +` < `%`

use super::Unsupported;
use crate::api::{MAX_COLUMNS, MAX_ROWS};
use crate::types::CellCoord;

/// 二項演算子
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Concat,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

/// 数式の構文木
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Number(f64),
    Text(String),
    Bool(bool),
    /// エラーリテラル（例: `#REF!`）
    Error(String),
    /// 同一シートのセル参照
    Ref(CellCoord),
    /// 同一シートの範囲参照（左上, 右下に正規化済み）
    Range(CellCoord, CellCoord),
    Neg(Box<Expr>),
    Percent(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// 関数呼び出し（関数名は大文字に正規化済み）
    Call { name: String, args: Vec<Expr> },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Text(String),
    Error(String),
    /// 識別子（セル参照・関数名・論理値・名前）
    Ident(String),
    /// シート名の接頭辞（`Sheet1!` や `'My Sheet'!`）
    Sheet(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Ampersand,
    Percent,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    LParen,
    RParen,
    Colon,
    Comma,
}

/// 数式を構文木に変換する
///
/// 先頭の`=`はあってもなくても構いません。`sheet_name`と異なるシートへの参照、
/// 名前付き範囲、配列定数などは[`Unsupported`]として返します。
pub(crate) fn parse(formula: &str, sheet_name: &str) -> Result<Expr, Unsupported> {
    let input = formula.trim();
    let input = input.strip_prefix('=').unwrap_or(input);
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(Unsupported::new("empty formula"));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        sheet_name,
    };
    let expr = parser.comparison()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(Unsupported::new(format!("unexpected token {:?}", token))),
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, Unsupported> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // 指数部（1E3, 1.5E-3）
                if i < chars.len() && matches!(chars[i], 'e' | 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && matches!(chars[j], '+' | '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let number = text
                    .parse::<f64>()
                    .map_err(|_| Unsupported::new(format!("invalid number '{}'", text)))?;
                tokens.push(Token::Number(number));
            }
            '"' => {
                // ""は引用符1つ
                let mut text = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(Unsupported::new("unterminated string literal")),
                        Some('"') if chars.get(i + 1) == Some(&'"') => {
                            text.push('"');
                            i += 2;
                        }
                        Some('"') => {
                            i += 1;
                            break;
                        }
                        Some(c) => {
                            text.push(*c);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Text(text));
            }
            '\'' => {
                let mut name = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(Unsupported::new("unterminated sheet name")),
                        Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                            name.push('\'');
                            i += 2;
                        }
                        Some('\'') => {
                            i += 1;
                            break;
                        }
                        Some(c) => {
                            name.push(*c);
                            i += 1;
                        }
                    }
                }
                if chars.get(i) != Some(&'!') {
                    return Err(Unsupported::new("quoted name without sheet reference"));
                }
                i += 1;
                tokens.push(Token::Sheet(name));
            }
            '#' => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '/') {
                    i += 1;
                }
                if i < chars.len() && matches!(chars[i], '!' | '?') {
                    i += 1;
                }
                tokens.push(Token::Error(chars[start..i].iter().collect()));
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '.' | '$'))
                {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                if chars.get(i) == Some(&'!') {
                    i += 1;
                    tokens.push(Token::Sheet(ident));
                } else {
                    tokens.push(Token::Ident(ident));
                }
            }
            _ => {
                let next = chars.get(i + 1).copied();
                let (token, width) = match (ch, next) {
                    ('<', Some('>')) => (Token::NotEq, 2),
                    ('<', Some('=')) => (Token::LtEq, 2),
                    ('>', Some('=')) => (Token::GtEq, 2),
                    ('<', _) => (Token::Lt, 1),
                    ('>', _) => (Token::Gt, 1),
                    ('=', _) => (Token::Eq, 1),
                    ('+', _) => (Token::Plus, 1),
                    ('-', _) => (Token::Minus, 1),
                    ('*', _) => (Token::Star, 1),
                    ('/', _) => (Token::Slash, 1),
                    ('^', _) => (Token::Caret, 1),
                    ('&', _) => (Token::Ampersand, 1),
                    ('%', _) => (Token::Percent, 1),
                    ('(', _) => (Token::LParen, 1),
                    (')', _) => (Token::RParen, 1),
                    (':', _) => (Token::Colon, 1),
                    (',', _) => (Token::Comma, 1),
                    _ => {
                        return Err(Unsupported::new(format!("unsupported character '{}'", ch)));
                    }
                };
                tokens.push(token);
                i += width;
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    sheet_name: &'a str,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), Unsupported> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            other => Err(Unsupported::new(format!(
                "expected {:?}, found {:?}",
                expected, other
            ))),
        }
    }

    fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn comparison(&mut self) -> Result<Expr, Unsupported> {
        let mut left = self.concat()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::NotEq,
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::LtEq) => BinaryOp::LtEq,
                Some(Token::GtEq) => BinaryOp::GtEq,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.concat()?;
            left = Self::binary(op, left, right);
        }
    }

    fn concat(&mut self) -> Result<Expr, Unsupported> {
        let mut left = self.additive()?;
        while self.peek() == Some(&Token::Ampersand) {
            self.pos += 1;
            let right = self.additive()?;
            left = Self::binary(BinaryOp::Concat, left, right);
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, Unsupported> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.multiplicative()?;
            left = Self::binary(op, left, right);
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, Unsupported> {
        let mut left = self.power()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.power()?;
            left = Self::binary(op, left, right);
        }
    }

    /// `^`は左結合（2^3^2 = 64）
    fn power(&mut self) -> Result<Expr, Unsupported> {
        let mut left = self.unary()?;
        while self.peek() == Some(&Token::Caret) {
            self.pos += 1;
            let right = self.unary()?;
            left = Self::binary(BinaryOp::Pow, left, right);
        }
        Ok(left)
    }

    /// 単項マイナスは`^`より強く結合する（-2^2 = 4）
    fn unary(&mut self) -> Result<Expr, Unsupported> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.percent(),
        }
    }

    fn percent(&mut self) -> Result<Expr, Unsupported> {
        let mut expr = self.primary()?;
        while self.peek() == Some(&Token::Percent) {
            self.pos += 1;
            expr = Expr::Percent(Box::new(expr));
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, Unsupported> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Text(s)) => Ok(Expr::Text(s)),
            Some(Token::Error(e)) => Ok(Expr::Error(e)),
            Some(Token::LParen) => {
                let expr = self.comparison()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Some(Token::Sheet(name)) => {
                if name != self.sheet_name {
                    return Err(Unsupported::new(format!(
                        "reference to another sheet '{}'",
                        name
                    )));
                }
                match self.next() {
                    Some(Token::Ident(ident)) => self.reference(&ident),
                    other => Err(Unsupported::new(format!(
                        "expected cell reference after sheet name, found {:?}",
                        other
                    ))),
                }
            }
            Some(Token::Ident(ident)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    return self.call(&ident);
                }
                if ident.eq_ignore_ascii_case("TRUE") {
                    return Ok(Expr::Bool(true));
                }
                if ident.eq_ignore_ascii_case("FALSE") {
                    return Ok(Expr::Bool(false));
                }
                self.reference(&ident)
            }
            other => Err(Unsupported::new(format!("unexpected token {:?}", other))),
        }
    }

    /// セル参照、またはコロンで続く範囲参照
    fn reference(&mut self, ident: &str) -> Result<Expr, Unsupported> {
        let start = Self::cell_ref(ident)
            .ok_or_else(|| Unsupported::new(format!("unsupported name '{}'", ident)))?;

        if self.peek() != Some(&Token::Colon) {
            return Ok(Expr::Ref(start));
        }
        self.pos += 1;
        let end = match self.next() {
            Some(Token::Ident(ident)) => Self::cell_ref(&ident),
            _ => None,
        }
        .ok_or_else(|| Unsupported::new("unsupported range reference"))?;

        Ok(Expr::Range(
            CellCoord::new(start.row.min(end.row), start.col.min(end.col)),
            CellCoord::new(start.row.max(end.row), start.col.max(end.col)),
        ))
    }

    /// シートの範囲内に収まるA1形式の参照
    fn cell_ref(ident: &str) -> Option<CellCoord> {
        CellCoord::from_a1_notation(ident)
            .filter(|coord| coord.row < MAX_ROWS && coord.col < MAX_COLUMNS)
    }

    fn call(&mut self, name: &str) -> Result<Expr, Unsupported> {
        // 新しい関数は`_xlfn.`接頭辞付きで保存される
        let name = name.strip_prefix("_xlfn.").unwrap_or(name).to_ascii_uppercase();

        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(Expr::Call { name, args });
        }
        loop {
            args.push(self.comparison()?);
            match self.next() {
                Some(Token::Comma) => {}
                Some(Token::RParen) => return Ok(Expr::Call { name, args }),
                other => {
                    return Err(Unsupported::new(format!(
                        "expected ',' or ')', found {:?}",
                        other
                    )))
                }
            }
        }
    }
}
