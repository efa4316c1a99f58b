use std::ops::Range;

use crate::expression::format_string::{FormatPart, FormatString};
use crate::expression::{BinaryOperator, Expr, Expression, UnaryOperator};
use crate::parser::error::ParseDiagnostic;

/// Nesting deeper than this is not parsed; the expression is kept as text.
pub const MAX_DEPTH: usize = 256;

// ---------------------------------------------------------------------------
// Token types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    StringLit(String),
    Ident(String, Range<usize>),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
}

fn describe(token: &Token) -> String {
    match token {
        Token::Number(n) => format!("number `{}`", n),
        Token::StringLit(_) => "string literal".to_string(),
        Token::Ident(name, _) => format!("identifier `{}`", name),
        Token::Plus => "`+`".to_string(),
        Token::Minus => "`-`".to_string(),
        Token::Star => "`*`".to_string(),
        Token::Slash => "`/`".to_string(),
        Token::Percent => "`%`".to_string(),
        Token::LParen => "`(`".to_string(),
        Token::RParen => "`)`".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse one expression. `offset` is the byte position of `text` in the source.
///
/// Never fails: text that does not parse becomes a string literal (when it
/// starts with a quote) or a verbatim expression, and a warning is recorded.
pub fn parse_expression(
    text: &str,
    offset: usize,
    file_id: usize,
    warnings: &mut Vec<ParseDiagnostic>,
) -> Expression {
    let (trimmed, span) = trim_span(text, offset);

    if trimmed.is_empty() {
        warnings.push(ParseDiagnostic::warning("empty expression", span.clone(), file_id));
        return Expression {
            tree: Expr::StringLiteral(String::new()),
            text: String::new(),
            span,
        };
    }

    let parsed = parse_tree(trimmed, span.start);

    // Text that starts with a quote is always a literal, even when more
    // follows the closing quote.
    let tree = if starts_with_quote(trimmed) {
        let literal = quoted_literal(trimmed);
        if !matches!(parsed, Ok(Expr::StringLiteral(_))) {
            let note = match parsed {
                Err(reason) => reason,
                Ok(_) => "text continues after the closing quote".to_string(),
            };
            tracing::debug!(expression = trimmed, %note, "quoted text taken literally");
            warnings.push(
                ParseDiagnostic::warning(
                    "quoted text taken literally; first and last characters stripped",
                    span.clone(),
                    file_id,
                )
                .with_note(note),
            );
        }
        literal
    } else {
        match parsed {
            Ok(tree) => tree,
            Err(reason) => {
                tracing::debug!(expression = trimmed, %reason, "expression fell back to text");
                warnings.push(
                    ParseDiagnostic::warning(
                        "expression not understood; evaluated as text",
                        span.clone(),
                        file_id,
                    )
                    .with_note(reason),
                );
                Expr::Verbatim(trimmed.to_string())
            }
        }
    };

    Expression {
        tree,
        text: trimmed.to_string(),
        span,
    }
}

/// Parse the body of an f-string (the text between the quotes).
/// `offset` is the byte position of `body` in the source.
pub fn parse_format_string(
    body: &str,
    offset: usize,
    file_id: usize,
    warnings: &mut Vec<ParseDiagnostic>,
) -> FormatString {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut chars = body.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '{' if chars.peek().is_some_and(|&(_, next)| next == '{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek().is_some_and(|&(_, next)| next == '}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let start = i + 1;
                let Some(end) = find_closing_brace(body, start) else {
                    // Unclosed placeholder: the rest is plain text.
                    literal.push_str(&body[i..]);
                    break;
                };
                if !literal.is_empty() {
                    parts.push(FormatPart::Literal(std::mem::take(&mut literal)));
                }
                let expr = parse_expression(&body[start..end], offset + start, file_id, warnings);
                parts.push(FormatPart::Placeholder(expr));
                while chars.peek().is_some_and(|&(j, _)| j <= end) {
                    chars.next();
                }
            }
            _ => literal.push(c),
        }
    }

    if !literal.is_empty() || parts.is_empty() {
        parts.push(FormatPart::Literal(literal));
    }

    FormatString { parts }
}

/// Trim `text` and return it with its absolute byte span.
pub(crate) fn trim_span(text: &str, offset: usize) -> (&str, Range<usize>) {
    let leading = text.len() - text.trim_start().len();
    let trimmed = text.trim();
    let start = offset + leading;
    (trimmed, start..start + trimmed.len())
}

fn parse_tree(text: &str, base_offset: usize) -> Result<Expr, String> {
    let tokens = tokenize(text, base_offset)?;
    let mut parser = ExprParser::new(tokens);
    let expr = parser.parse_expr(0, 0)?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(format!("unexpected {} after expression", describe(token))),
    }
}

fn starts_with_quote(text: &str) -> bool {
    text.starts_with(['"', '\''])
}

/// A quoted literal loses its first and last character, with no escape
/// processing.
fn quoted_literal(text: &str) -> Expr {
    let mut chars = text.chars();
    chars.next();
    chars.next_back();
    Expr::StringLiteral(chars.as_str().to_string())
}

/// Whether `text` is exactly one number literal as the tokenizer reads it:
/// digits with an optional fraction and exponent, no sign.
pub fn is_number_literal(text: &str) -> bool {
    text.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && scan_number(text, 0) == text.len()
        && text.parse::<f64>().is_ok()
}

/// Byte index of the `}` closing a placeholder whose body starts at `start`.
/// Braces inside quoted text do not count.
fn find_closing_brace(body: &str, start: usize) -> Option<usize> {
    let mut quote = None;
    for (i, c) in body[start..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '}') => return Some(start + i),
            _ => {}
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn tokenize(text: &str, base_offset: usize) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }

            // String literal, no escape processing
            '"' | '\'' => {
                chars.next();
                let mut literal = String::new();
                let mut closed = false;
                for (_, ch) in chars.by_ref() {
                    if ch == c {
                        closed = true;
                        break;
                    }
                    literal.push(ch);
                }
                if !closed {
                    return Err(format!(
                        "unterminated string starting at byte {}",
                        base_offset + start
                    ));
                }
                tokens.push(Token::StringLit(literal));
            }

            '0'..='9' | '.' => {
                let end = scan_number(text, start);
                let literal = &text[start..end];
                let n = literal
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number `{}`", literal))?;
                while chars.peek().is_some_and(|&(i, _)| i < end) {
                    chars.next();
                }
                if chars.peek().is_some_and(|&(_, ch)| is_ident_continue(ch)) {
                    return Err(format!("identifier cannot start with a digit: `{}`", literal));
                }
                tokens.push(Token::Number(n));
            }

            c if is_ident_start(c) => {
                let mut end = start;
                while let Some(&(i, ch)) = chars.peek() {
                    if !is_ident_continue(ch) {
                        break;
                    }
                    end = i + ch.len_utf8();
                    chars.next();
                }
                let span = base_offset + start..base_offset + end;
                tokens.push(Token::Ident(text[start..end].to_string(), span));
            }

            _ => {
                let token = match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '%' => Token::Percent,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    other => return Err(format!("unexpected character `{}`", other)),
                };
                chars.next();
                tokens.push(token);
            }
        }
    }

    Ok(tokens)
}

/// End (exclusive) of the number literal starting at `start`:
/// digits, an optional fraction and an optional exponent.
fn scan_number(text: &str, start: usize) -> usize {
    let bytes = text.as_bytes();
    let digits = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = digits(start);
    if end < bytes.len() && bytes[end] == b'.' {
        end = digits(end + 1);
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp = end + 1;
        if exp < bytes.len() && matches!(bytes[exp], b'+' | b'-') {
            exp += 1;
        }
        if exp < bytes.len() && bytes[exp].is_ascii_digit() {
            end = digits(exp);
        }
    }
    end
}

// ---------------------------------------------------------------------------
// Pratt parser
// ---------------------------------------------------------------------------

// Binding powers. Higher = tighter binding. All binary operators are left-assoc.
const BP_ADDITIVE: u8 = 2; // + -
const BP_MULTIPLICATIVE: u8 = 4; // * / %
const BP_UNARY: u8 = 6; // - +

struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl ExprParser {
    fn new(tokens: Vec<Token>) -> Self {
        ExprParser { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_expr(&mut self, min_bp: u8, depth: usize) -> Result<Expr, String> {
        if depth > MAX_DEPTH {
            return Err(format!("expression nested deeper than {} levels", MAX_DEPTH));
        }

        let mut left = self.parse_prefix(depth)?;
        let mut depth = depth;

        while let Some((operator, l_bp, r_bp)) = self.peek().and_then(infix_operator) {
            if l_bp < min_bp {
                break;
            }
            // Each operator wraps `left` one level deeper.
            depth += 1;
            if depth > MAX_DEPTH {
                return Err(format!("expression nested deeper than {} levels", MAX_DEPTH));
            }
            self.pos += 1;
            let right = self.parse_expr(r_bp, depth)?;
            left = Expr::BinaryOperation {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_prefix(&mut self, depth: usize) -> Result<Expr, String> {
        let token = self
            .advance()
            .ok_or_else(|| "unexpected end of expression".to_string())?;

        match token {
            Token::Number(n) => Ok(Expr::NumberLiteral(n)),
            Token::StringLit(s) => Ok(Expr::StringLiteral(s)),
            Token::Ident(name, span) => Ok(Expr::VariableReference(name, span)),

            Token::Minus | Token::Plus => {
                let operator = if token == Token::Minus {
                    UnaryOperator::Negation
                } else {
                    UnaryOperator::Identity
                };
                let operand = self.parse_expr(BP_UNARY, depth + 1)?;
                Ok(Expr::UnaryOperation {
                    operator,
                    operand: Box::new(operand),
                })
            }

            Token::LParen => {
                let expr = self.parse_expr(0, depth + 1)?;
                match self.advance() {
                    Some(Token::RParen) => Ok(expr),
                    Some(other) => Err(format!("expected `)`, found {}", describe(&other))),
                    None => Err("unclosed `(`".to_string()),
                }
            }

            other => Err(format!("unexpected {}", describe(&other))),
        }
    }
}

/// Infix operator with its (left_bp, right_bp), or None if not infix.
fn infix_operator(token: &Token) -> Option<(BinaryOperator, u8, u8)> {
    let (operator, bp) = match token {
        Token::Plus => (BinaryOperator::Addition, BP_ADDITIVE),
        Token::Minus => (BinaryOperator::Subtraction, BP_ADDITIVE),
        Token::Star => (BinaryOperator::Multiplication, BP_MULTIPLICATIVE),
        Token::Slash => (BinaryOperator::Division, BP_MULTIPLICATIVE),
        Token::Percent => (BinaryOperator::Modulo, BP_MULTIPLICATIVE),
        _ => return None,
    };
    Some((operator, bp, bp + 1))
}
