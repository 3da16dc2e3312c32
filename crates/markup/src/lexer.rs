use std::fmt;

use serde::{Deserialize, Serialize};

/// Token types produced by the wiki-markup lexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Token {
    /// A run of plain text.
    Text(String),
    /// A run of `=` characters (heading delimiter when it opens or closes a line).
    Equals(usize),
    /// The link opener.
    LinkOpen, // [[
    /// The link closer.
    LinkClose, // ]]
    /// The link label separator.
    Pipe, // |
    /// A line break.
    Newline,
    /// The end of the input.
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Text(s) => write!(f, "{s}"),
            Token::Equals(n) => write!(f, "{}", "=".repeat(*n)),
            Token::LinkOpen => write!(f, "[["),
            Token::LinkClose => write!(f, "]]"),
            Token::Pipe => write!(f, "|"),
            Token::Newline => writeln!(f),
            Token::Eof => write!(f, "EOF"),
        }
    }
}

/// Byte position in the source markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A token with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Lexer error.
#[derive(Debug, thiserror::Error)]
pub enum LexError {
    #[error("unterminated link starting at position {0}")]
    UnterminatedLink(usize),
    #[error("nested link at position {0}")]
    NestedLink(usize),
}

/// Tokenize wiki markup into a sequence of tokens.
///
/// Everything that is not link or heading syntax becomes `Text`; `\r\n` is
/// folded into a single `Newline`.
pub fn tokenize(input: &str) -> Result<Vec<SpannedToken>, LexError> {
    let mut tokens = Vec::new();
    let bytes = input.as_bytes();
    let mut pos = 0;
    let mut text_start: Option<usize> = None;
    let mut open_link: Option<usize> = None;

    let flush = |tokens: &mut Vec<SpannedToken>, text_start: &mut Option<usize>, end: usize| {
        if let Some(start) = text_start.take() {
            tokens.push(SpannedToken {
                token: Token::Text(input[start..end].to_string()),
                span: Span { start, end },
            });
        }
    };

    while pos < bytes.len() {
        let start = pos;
        let token = match bytes[pos] {
            b'[' if bytes.get(pos + 1) == Some(&b'[') => {
                if open_link.is_some() {
                    return Err(LexError::NestedLink(pos));
                }
                open_link = Some(pos);
                pos += 2;
                Token::LinkOpen
            }
            b']' if bytes.get(pos + 1) == Some(&b']') && open_link.is_some() => {
                open_link = None;
                pos += 2;
                Token::LinkClose
            }
            b'|' if open_link.is_some() => {
                pos += 1;
                Token::Pipe
            }
            b'=' => {
                while pos < bytes.len() && bytes[pos] == b'=' {
                    pos += 1;
                }
                Token::Equals(pos - start)
            }
            b'\r' if bytes.get(pos + 1) == Some(&b'\n') => {
                pos += 2;
                Token::Newline
            }
            b'\n' => {
                pos += 1;
                Token::Newline
            }
            _ => {
                if text_start.is_none() {
                    text_start = Some(pos);
                }
                // Advance a whole UTF-8 character so slices stay on boundaries.
                pos += input[pos..].chars().next().map_or(1, char::len_utf8);
                continue;
            }
        };

        if matches!(token, Token::Newline) {
            if let Some(link_start) = open_link {
                return Err(LexError::UnterminatedLink(link_start));
            }
        }

        flush(&mut tokens, &mut text_start, start);
        tokens.push(SpannedToken {
            token,
            span: Span { start, end: pos },
        });
    }

    if let Some(link_start) = open_link {
        return Err(LexError::UnterminatedLink(link_start));
    }
    flush(&mut tokens, &mut text_start, pos);

    tokens.push(SpannedToken {
        token: Token::Eof,
        span: Span {
            start: pos,
            end: pos,
        },
    });

    Ok(tokens)
}
