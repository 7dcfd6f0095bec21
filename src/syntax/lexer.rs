//! Tokenizer for the reference curly-brace frontend.

use super::span::TextSpan;
use crate::error::{Error, Result};

/// Token categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword.
    Ident,
    /// Integer or real number.
    Number,
    /// String literal (regular, verbatim or interpolated).
    Str,
    /// Character literal.
    Char,
    /// Operator or punctuation.
    Punct,
    /// End of input.
    Eof,
}

/// A token with its source span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: TextSpan,
}

const PUNCTUATION: &[&str] = &[
    "=>", "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=", "%=", "??=",
    "??", "?.", "::", "{", "}", "(", ")", "[", "]", ";", ",", ".", "<", ">", "=", "!", "+", "-",
    "*", "/", "%", "&", "|", "^", "?", ":", "~",
];

/// Split `text` into tokens, ending with a single [`TokenKind::Eof`].
pub fn tokenize(text: &str) -> Result<Vec<Token>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut line_start = true;

    while pos < bytes.len() {
        let b = bytes[pos];

        if b == b'\n' {
            line_start = true;
            pos += 1;
            continue;
        }
        if b.is_ascii_whitespace() {
            pos += 1;
            continue;
        }
        if b == b'#' && line_start {
            // preprocessor directive
            while pos < bytes.len() && bytes[pos] != b'\n' {
                pos += 1;
            }
            continue;
        }
        line_start = false;

        if text[pos..].starts_with("//") {
            while pos < bytes.len() && bytes[pos] != b'\n' {
                pos += 1;
            }
            continue;
        }
        if text[pos..].starts_with("/*") {
            let end = text[pos + 2..]
                .find("*/")
                .ok_or_else(|| Error::syntax(pos, "unterminated block comment"))?;
            pos += end + 4;
            continue;
        }

        let start = pos;
        let kind = if b.is_ascii_alphabetic() || b == b'_' || b >= 0x80 {
            pos = scan_identifier(text, pos);
            if pos == start {
                let ch = text[pos..].chars().next().unwrap_or('?');
                return Err(Error::syntax(pos, format!("unexpected character '{}'", ch)));
            }
            TokenKind::Ident
        } else if b == b'@' && bytes.get(pos + 1) == Some(&b'"') {
            pos = scan_verbatim_string(text, pos + 1)?;
            TokenKind::Str
        } else if b == b'@' && bytes.get(pos + 1).is_some_and(|c| c.is_ascii_alphabetic()) {
            pos = scan_identifier(text, pos + 1);
            TokenKind::Ident
        } else if b == b'$' && bytes.get(pos + 1) == Some(&b'"') {
            pos = scan_string(text, pos + 1, b'"')?;
            TokenKind::Str
        } else if b.is_ascii_digit()
            || (b == b'.' && bytes.get(pos + 1).is_some_and(|c| c.is_ascii_digit()))
        {
            pos = scan_number(bytes, pos);
            TokenKind::Number
        } else if b == b'"' {
            pos = scan_string(text, pos, b'"')?;
            TokenKind::Str
        } else if b == b'\'' {
            pos = scan_string(text, pos, b'\'')?;
            TokenKind::Char
        } else if let Some(punct) = PUNCTUATION.iter().find(|p| text[pos..].starts_with(*p)) {
            pos += punct.len();
            TokenKind::Punct
        } else {
            let ch = text[pos..].chars().next().unwrap_or('?');
            return Err(Error::syntax(pos, format!("unexpected character '{}'", ch)));
        };

        tokens.push(Token {
            kind,
            span: TextSpan::new(start, pos),
        });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: TextSpan::empty(text.len()),
    });
    Ok(tokens)
}

fn scan_identifier(text: &str, start: usize) -> usize {
    text[start..]
        .char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
        .map(|(i, _)| start + i)
        .unwrap_or(text.len())
}

fn scan_number(bytes: &[u8], mut pos: usize) -> usize {
    let hex = bytes[pos] == b'0' && matches!(bytes.get(pos + 1), Some(b'x' | b'X'));
    if hex {
        pos += 2;
        while pos < bytes.len() && (bytes[pos].is_ascii_hexdigit() || bytes[pos] == b'_') {
            pos += 1;
        }
    } else {
        while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'_') {
            pos += 1;
        }
        if pos + 1 < bytes.len() && bytes[pos] == b'.' && bytes[pos + 1].is_ascii_digit() {
            pos += 1;
            while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'_') {
                pos += 1;
            }
        }
        if pos < bytes.len() && matches!(bytes[pos], b'e' | b'E') {
            let mut exp = pos + 1;
            if exp < bytes.len() && matches!(bytes[exp], b'+' | b'-') {
                exp += 1;
            }
            if exp < bytes.len() && bytes[exp].is_ascii_digit() {
                pos = exp;
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    pos += 1;
                }
            }
        }
    }
    while pos < bytes.len() && matches!(bytes[pos].to_ascii_lowercase(), b'u' | b'l' | b'f' | b'd' | b'm') {
        pos += 1;
    }
    pos
}

fn scan_string(text: &str, start: usize, quote: u8) -> Result<usize> {
    let bytes = text.as_bytes();
    let mut pos = start + 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 2,
            b'\n' => break,
            b if b == quote => return Ok(pos + 1),
            _ => pos += 1,
        }
    }
    Err(Error::syntax(start, "unterminated literal"))
}

fn scan_verbatim_string(text: &str, start: usize) -> Result<usize> {
    let bytes = text.as_bytes();
    let mut pos = start + 1;
    while pos < bytes.len() {
        if bytes[pos] == b'"' {
            if bytes.get(pos + 1) == Some(&b'"') {
                pos += 2;
                continue;
            }
            return Ok(pos + 1);
        }
        pos += 1;
    }
    Err(Error::syntax(start, "unterminated verbatim string"))
}
