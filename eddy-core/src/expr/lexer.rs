//! Tokenizer for the expression language.

use crate::error::{EddyError, Result};

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    Let,
    Dot,
    Comma,
    Semicolon,
    Colon,
    Question,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Assign,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Not,
    And,
    Or,
}

/// A token with the byte offset it started at.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub pos: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Split source text into tokens.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Spanned>> {
    let syntax = |pos: usize, cause: String| EddyError::ExpressionSyntax {
        expression: source.to_string(),
        position: pos,
        cause,
    };

    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        let peek = chars.get(i + 1).map(|(_, c)| *c);

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // Line comments
        if c == '/' && peek == Some('/') {
            while i < chars.len() && chars[i].1 != '\n' {
                i += 1;
            }
            continue;
        }

        let (token, width) = match c {
            '.' if peek.is_some_and(|p| p.is_ascii_digit()) => {
                let (n, w) = read_number(&chars, i).map_err(|e| syntax(pos, e))?;
                (Token::Number(n), w)
            }
            '0'..='9' => {
                let (n, w) = read_number(&chars, i).map_err(|e| syntax(pos, e))?;
                (Token::Number(n), w)
            }
            '"' | '\'' => {
                let (s, w) = read_string(&chars, i).map_err(|e| syntax(pos, e))?;
                (Token::Str(s), w)
            }
            c if is_ident_start(c) => {
                let mut end = i;
                while end < chars.len() && is_ident_continue(chars[end].1) {
                    end += 1;
                }
                let word: String = chars[i..end].iter().map(|(_, c)| c).collect();
                let token = match word.as_str() {
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" | "undefined" => Token::Null,
                    "let" => Token::Let,
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    _ => Token::Ident(word),
                };
                (token, end - i)
            }
            '.' => (Token::Dot, 1),
            ',' => (Token::Comma, 1),
            ';' => (Token::Semicolon, 1),
            ':' => (Token::Colon, 1),
            '?' => (Token::Question, 1),
            '(' => (Token::LParen, 1),
            ')' => (Token::RParen, 1),
            '[' => (Token::LBracket, 1),
            ']' => (Token::RBracket, 1),
            '+' => (Token::Plus, 1),
            '-' => (Token::Minus, 1),
            '*' => (Token::Star, 1),
            '/' => (Token::Slash, 1),
            '%' => (Token::Percent, 1),
            '=' if peek == Some('=') => {
                // Accept JS strict equality as plain equality
                let strict = chars.get(i + 2).is_some_and(|(_, c)| *c == '=');
                (Token::Eq, if strict { 3 } else { 2 })
            }
            '=' => (Token::Assign, 1),
            '!' if peek == Some('=') => {
                let strict = chars.get(i + 2).is_some_and(|(_, c)| *c == '=');
                (Token::Ne, if strict { 3 } else { 2 })
            }
            '!' => (Token::Not, 1),
            '<' if peek == Some('=') => (Token::Le, 2),
            '<' => (Token::Lt, 1),
            '>' if peek == Some('=') => (Token::Ge, 2),
            '>' => (Token::Gt, 1),
            '&' if peek == Some('&') => (Token::And, 2),
            '|' if peek == Some('|') => (Token::Or, 2),
            other => return Err(syntax(pos, format!("unexpected character '{}'", other))),
        };

        tokens.push(Spanned { token, pos });
        i += width;
    }

    Ok(tokens)
}

fn read_number(chars: &[(usize, char)], start: usize) -> std::result::Result<(f64, usize), String> {
    let mut end = start;
    let mut seen_dot = false;
    let mut seen_exp = false;

    while end < chars.len() {
        let c = chars[end].1;
        if c.is_ascii_digit() {
            end += 1;
        } else if c == '.' && !seen_dot && !seen_exp {
            // `1.foo` is a member access, not a decimal point
            if !chars.get(end + 1).is_some_and(|(_, n)| n.is_ascii_digit()) {
                break;
            }
            seen_dot = true;
            end += 1;
        } else if (c == 'e' || c == 'E') && !seen_exp {
            seen_exp = true;
            end += 1;
            if chars.get(end).is_some_and(|(_, s)| *s == '+' || *s == '-') {
                end += 1;
            }
        } else {
            break;
        }
    }

    let text: String = chars[start..end].iter().map(|(_, c)| c).collect();
    text.parse::<f64>()
        .map(|n| (n, end - start))
        .map_err(|_| format!("invalid number '{}'", text))
}

fn read_string(chars: &[(usize, char)], start: usize) -> std::result::Result<(String, usize), String> {
    let quote = chars[start].1;
    let mut out = String::new();
    let mut i = start + 1;

    while i < chars.len() {
        let c = chars[i].1;
        if c == quote {
            return Ok((out, i + 1 - start));
        }
        if c == '\\' {
            let escaped = chars
                .get(i + 1)
                .map(|(_, c)| *c)
                .ok_or_else(|| "unterminated escape".to_string())?;
            out.push(match escaped {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                '0' => '\0',
                other => other,
            });
            i += 2;
        } else {
            out.push(c);
            i += 1;
        }
    }

    Err("unterminated string literal".to_string())
}
