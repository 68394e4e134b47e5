// Formula parser - converts formula source (text after '=') into an AST
// Supports: numbers, cell refs (A1), basic math (+, -, *, /), unary sign,
// parentheses. Strict left-to-right for same-precedence operators.

use crate::error::ParseError;
use crate::position::{self, Position};

/// Expression AST for the arithmetic formula dialect.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// Cell reference. May be out of range; evaluation raises `#REF!` then.
    CellRef(Position),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: Op,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

impl Op {
    fn symbol(self) -> char {
        match self {
            Op::Add => '+',
            Op::Sub => '-',
            Op::Mul => '*',
            Op::Div => '/',
        }
    }

    /// Binding strength: add/sub bind looser than mul/div.
    fn precedence(self) -> u8 {
        match self {
            Op::Add | Op::Sub => 1,
            Op::Mul | Op::Div => 2,
        }
    }

    /// True for operators whose right operand may not reassociate freely
    /// (a - (b - c) != a - b - c).
    fn right_sensitive(self) -> bool {
        matches!(self, Op::Sub | Op::Div)
    }
}

impl Expr {
    /// Referenced positions in source order, duplicates and out-of-range
    /// references included.
    pub fn positions(&self) -> Vec<Position> {
        let mut out = Vec::new();
        self.collect_positions(&mut out);
        out
    }

    fn collect_positions(&self, out: &mut Vec<Position>) {
        match self {
            Expr::Number(_) => {}
            Expr::CellRef(pos) => out.push(*pos),
            Expr::Unary { operand, .. } => operand.collect_positions(out),
            Expr::Binary { left, right, .. } => {
                left.collect_positions(out);
                right.collect_positions(out);
            }
        }
    }

    /// Precedence of this node for parenthesization decisions.
    fn precedence(&self) -> u8 {
        match self {
            Expr::Number(_) | Expr::CellRef(_) => 4,
            Expr::Unary { .. } => 3,
            Expr::Binary { op, .. } => op.precedence(),
        }
    }

    fn fmt_with_context(&self, f: &mut std::fmt::Formatter<'_>, min_prec: u8) -> std::fmt::Result {
        let needs_parens = self.precedence() < min_prec;
        if needs_parens {
            f.write_str("(")?;
        }
        match self {
            Expr::Number(n) => write!(f, "{}", n)?,
            Expr::CellRef(pos) => write!(f, "{}", pos)?,
            Expr::Unary { op, operand } => {
                let sign = match op {
                    UnaryOp::Plus => '+',
                    UnaryOp::Minus => '-',
                };
                write!(f, "{}", sign)?;
                operand.fmt_with_context(f, 3)?;
            }
            Expr::Binary { op, left, right } => {
                left.fmt_with_context(f, op.precedence())?;
                write!(f, "{}", op.symbol())?;
                let right_min = if op.right_sensitive() {
                    op.precedence() + 1
                } else {
                    op.precedence()
                };
                right.fmt_with_context(f, right_min)?;
            }
        }
        if needs_parens {
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Canonical form: minimal, unambiguous parenthesization. Two sources that
/// parse to the same tree print identically.
impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_with_context(f, 0)
    }
}

/// Parse the text after the leading `=` into an expression tree.
pub fn parse(source: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(ParseError::new("empty formula"));
    }
    let (expr, pos) = parse_add_sub(&tokens, 0)?;
    if pos != tokens.len() {
        return Err(ParseError::new("unexpected trailing input"));
    }
    Ok(expr)
}

#[derive(Debug, Clone)]
enum Token {
    Number(f64),
    CellRef(Position),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '+' => {
                tokens.push(Token::Plus);
                chars.next();
            }
            '-' => {
                tokens.push(Token::Minus);
                chars.next();
            }
            '*' => {
                tokens.push(Token::Star);
                chars.next();
            }
            '/' => {
                tokens.push(Token::Slash);
                chars.next();
            }
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            'A'..='Z' | 'a'..='z' => {
                let mut ident = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_alphanumeric() {
                        ident.push(ch.to_ascii_uppercase());
                        chars.next();
                    } else {
                        break;
                    }
                }
                match try_parse_cell_ref(&ident) {
                    Some(pos) => tokens.push(Token::CellRef(pos)),
                    None => {
                        return Err(ParseError::new(format!("invalid cell reference: {}", ident)))
                    }
                }
            }
            '0'..='9' | '.' => {
                let mut num_str = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        num_str.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let num: f64 = num_str
                    .parse()
                    .map_err(|_| ParseError::new(format!("invalid number: {}", num_str)))?;
                tokens.push(Token::Number(num));
            }
            _ => return Err(ParseError::new(format!("unexpected character: {}", c))),
        }
    }

    Ok(tokens)
}

/// Parse an uppercased letters+digits ident as a cell reference.
///
/// Oversized rows/columns saturate into out-of-range positions; they parse
/// fine and fail later with `#REF!` at evaluation, matching reference
/// semantics rather than syntax errors.
fn try_parse_cell_ref(s: &str) -> Option<Position> {
    let letters_len = s.chars().take_while(|c| c.is_ascii_uppercase()).count();
    if letters_len == 0 || letters_len == s.len() {
        return None;
    }
    let (letters, digits) = s.split_at(letters_len);
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let row = digits.bytes().fold(0usize, |acc, b| {
        acc.saturating_mul(10).saturating_add((b - b'0') as usize)
    });
    if row == 0 {
        return None;
    }
    Some(Position::new(row - 1, position::col_from_letters(letters)))
}

// One function per precedence level, threading (tokens, pos) like the
// grammar reads: add_sub -> mul_div -> unary -> primary.

fn parse_add_sub(tokens: &[Token], pos: usize) -> Result<(Expr, usize), ParseError> {
    let (mut left, mut pos) = parse_mul_div(tokens, pos)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Plus => Op::Add,
            Token::Minus => Op::Sub,
            _ => break,
        };
        let (right, new_pos) = parse_mul_div(tokens, pos + 1)?;
        left = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_mul_div(tokens: &[Token], pos: usize) -> Result<(Expr, usize), ParseError> {
    let (mut left, mut pos) = parse_unary(tokens, pos)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Star => Op::Mul,
            Token::Slash => Op::Div,
            _ => break,
        };
        let (right, new_pos) = parse_unary(tokens, pos + 1)?;
        left = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_unary(tokens: &[Token], pos: usize) -> Result<(Expr, usize), ParseError> {
    match tokens.get(pos) {
        Some(Token::Plus) => {
            let (operand, new_pos) = parse_unary(tokens, pos + 1)?;
            Ok((
                Expr::Unary {
                    op: UnaryOp::Plus,
                    operand: Box::new(operand),
                },
                new_pos,
            ))
        }
        Some(Token::Minus) => {
            let (operand, new_pos) = parse_unary(tokens, pos + 1)?;
            Ok((
                Expr::Unary {
                    op: UnaryOp::Minus,
                    operand: Box::new(operand),
                },
                new_pos,
            ))
        }
        _ => parse_primary(tokens, pos),
    }
}

fn parse_primary(tokens: &[Token], pos: usize) -> Result<(Expr, usize), ParseError> {
    match tokens.get(pos) {
        Some(Token::Number(n)) => Ok((Expr::Number(*n), pos + 1)),
        Some(Token::CellRef(p)) => Ok((Expr::CellRef(*p), pos + 1)),
        Some(Token::LParen) => {
            let (expr, new_pos) = parse_add_sub(tokens, pos + 1)?;
            match tokens.get(new_pos) {
                Some(Token::RParen) => Ok((expr, new_pos + 1)),
                _ => Err(ParseError::new("expected closing parenthesis")),
            }
        }
        Some(_) => Err(ParseError::new("expected number, cell reference, or (")),
        None => Err(ParseError::new("unexpected end of formula")),
    }
}
