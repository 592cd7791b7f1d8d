//! Resumable byte-level JSON lexer.
//!
//! The lexer recognises token boundaries only: it never builds values. It
//! works on a byte window supplied by the caller and returns positions
//! relative to that window. When the window ends inside a token it reports
//! [`Lexed::Incomplete`] and remembers how far into the token it already
//! scanned, so long strings and comments are not rescanned from the start
//! after every refill.
//!
//! Invariant: after an `Incomplete { resume_at }`, the next call must be
//! given a window whose first byte is the byte that was at `resume_at`.

use std::fmt;

use crate::error::SyntaxError;

/// Kind of a lexical token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// `{`
    BeginObject,
    /// `}`
    EndObject,
    /// `[`
    BeginArray,
    /// `]`
    EndArray,
    /// `:`
    Colon,
    /// `,`
    Comma,
    /// A quoted string.
    String,
    /// A number.
    Number,
    /// `true`
    True,
    /// `false`
    False,
    /// `null`
    Null,
    /// A `//` or `/* */` comment.
    Comment,
}

impl TokenKind {
    /// Returns true for strings, numbers, booleans and `null`.
    #[must_use]
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            Self::String | Self::Number | Self::True | Self::False | Self::Null
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::BeginObject => "'{'",
            Self::EndObject => "'}'",
            Self::BeginArray => "'['",
            Self::EndArray => "']'",
            Self::Colon => "':'",
            Self::Comma => "','",
            Self::String => "string",
            Self::Number => "number",
            Self::True => "'true'",
            Self::False => "'false'",
            Self::Null => "'null'",
            Self::Comment => "comment",
        };
        f.write_str(text)
    }
}

/// A complete token; `start..end` indexes the window it was read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) start: usize,
    pub(crate) end: usize,
}

/// Outcome of one [`Lexer::next`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Lexed {
    Token(Token),
    /// The window ended inside a token (or after trailing whitespace). Bytes
    /// from `resume_at` onwards must be presented again with more input.
    Incomplete { resume_at: usize },
    /// End of input reached between tokens.
    Exhausted,
    /// End of input reached inside a token.
    Truncated,
}

/// Syntax error at a window-relative position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct LexError {
    pub(crate) at: usize,
    pub(crate) reason: SyntaxError,
}

impl LexError {
    fn new(at: usize, reason: SyntaxError) -> Self { Self { at, reason } }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Escape {
    #[default]
    None,
    Backslash,
    Unicode(u8),
}

/// Token the previous window ended inside.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Partial {
    #[default]
    None,
    String {
        scanned: usize,
        escape: Escape,
    },
    LineComment {
        scanned: usize,
    },
    BlockComment {
        scanned: usize,
    },
}

/// Resumable lexer state.
#[derive(Clone, Debug, Default)]
pub(crate) struct Lexer {
    partial: Partial,
    allow_comments: bool,
}

impl Lexer {
    pub(crate) fn new(allow_comments: bool) -> Self {
        Self {
            partial: Partial::None,
            allow_comments,
        }
    }

    /// Returns the next token at or after `pos`.
    ///
    /// `eof` states that no bytes follow the window.
    pub(crate) fn next(&mut self, window: &[u8], pos: usize, eof: bool) -> Result<Lexed, LexError> {
        match self.partial {
            Partial::String { scanned, escape } => {
                return self.string(window, pos, scanned, escape, eof);
            }
            Partial::LineComment { scanned } => return self.line_comment(window, pos, scanned, eof),
            Partial::BlockComment { scanned } => {
                return self.block_comment(window, pos, scanned, eof);
            }
            Partial::None => {}
        }

        let start = skip_whitespace(window, pos);
        let Some(&byte) = window.get(start) else {
            return Ok(if eof {
                Lexed::Exhausted
            } else {
                Lexed::Incomplete { resume_at: start }
            });
        };

        let single = |kind: TokenKind| -> Result<Lexed, LexError> {
            Ok(Lexed::Token(Token {
                kind,
                start,
                end: start + 1,
            }))
        };
        match byte {
            b'{' => single(TokenKind::BeginObject),
            b'}' => single(TokenKind::EndObject),
            b'[' => single(TokenKind::BeginArray),
            b']' => single(TokenKind::EndArray),
            b':' => single(TokenKind::Colon),
            b',' => single(TokenKind::Comma),
            b'"' => self.string(window, start, 1, Escape::None, eof),
            b'-' | b'0'..=b'9' => number(window, start, eof),
            b't' => literal(window, start, b"true", TokenKind::True, eof),
            b'f' => literal(window, start, b"false", TokenKind::False, eof),
            b'n' => literal(window, start, b"null", TokenKind::Null, eof),
            b'/' if self.allow_comments => self.comment(window, start, eof),
            other => Err(LexError::new(start, SyntaxError::UnexpectedByte(other))),
        }
    }

    fn string(
        &mut self,
        window: &[u8],
        start: usize,
        scanned: usize,
        mut escape: Escape,
        eof: bool,
    ) -> Result<Lexed, LexError> {
        let mut i = start + scanned;
        while let Some(&byte) = window.get(i) {
            escape = match escape {
                Escape::Backslash => match byte {
                    b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't' => Escape::None,
                    b'u' => Escape::Unicode(4),
                    _ => return Err(LexError::new(i, SyntaxError::InvalidEscape)),
                },
                Escape::Unicode(remaining) => {
                    if !byte.is_ascii_hexdigit() {
                        return Err(LexError::new(i, SyntaxError::InvalidEscape));
                    }
                    if remaining == 1 {
                        Escape::None
                    } else {
                        Escape::Unicode(remaining - 1)
                    }
                }
                Escape::None => match byte {
                    b'"' => {
                        self.partial = Partial::None;
                        return Ok(Lexed::Token(Token {
                            kind: TokenKind::String,
                            start,
                            end: i + 1,
                        }));
                    }
                    b'\\' => Escape::Backslash,
                    0x00..=0x1f => return Err(LexError::new(i, SyntaxError::ControlCharacter(byte))),
                    _ => Escape::None,
                },
            };
            i += 1;
        }

        if eof {
            return Ok(Lexed::Truncated);
        }
        self.partial = Partial::String {
            scanned: i - start,
            escape,
        };
        Ok(Lexed::Incomplete { resume_at: start })
    }

    fn comment(&mut self, window: &[u8], start: usize, eof: bool) -> Result<Lexed, LexError> {
        match window.get(start + 1) {
            Some(b'/') => self.line_comment(window, start, 2, eof),
            Some(b'*') => self.block_comment(window, start, 2, eof),
            Some(_) => Err(LexError::new(start, SyntaxError::UnexpectedByte(b'/'))),
            None if eof => Err(LexError::new(start, SyntaxError::UnexpectedByte(b'/'))),
            None => Ok(Lexed::Incomplete { resume_at: start }),
        }
    }

    fn line_comment(
        &mut self,
        window: &[u8],
        start: usize,
        scanned: usize,
        eof: bool,
    ) -> Result<Lexed, LexError> {
        let from = start + scanned;
        let tail = window.get(from..).unwrap_or_default();
        let end = match tail.iter().position(|&byte| byte == b'\n') {
            Some(offset) => from + offset + 1,
            None if eof => window.len(),
            None => {
                self.partial = Partial::LineComment {
                    scanned: window.len() - start,
                };
                return Ok(Lexed::Incomplete { resume_at: start });
            }
        };
        self.partial = Partial::None;
        Ok(Lexed::Token(Token {
            kind: TokenKind::Comment,
            start,
            end,
        }))
    }

    fn block_comment(
        &mut self,
        window: &[u8],
        start: usize,
        scanned: usize,
        eof: bool,
    ) -> Result<Lexed, LexError> {
        let from = start + scanned;
        let tail = window.get(from..).unwrap_or_default();
        if let Some(offset) = tail.windows(2).position(|pair| pair == b"*/") {
            self.partial = Partial::None;
            return Ok(Lexed::Token(Token {
                kind: TokenKind::Comment,
                start,
                end: from + offset + 2,
            }));
        }
        if eof {
            return Ok(Lexed::Truncated);
        }
        // Rescan the last byte next time; it may be the `*` of `*/`.
        let resume = window.len().saturating_sub(1).max(from);
        self.partial = Partial::BlockComment {
            scanned: resume - start,
        };
        Ok(Lexed::Incomplete { resume_at: start })
    }
}

pub(crate) fn skip_whitespace(window: &[u8], mut pos: usize) -> usize {
    while let Some(b' ' | b'\t' | b'\n' | b'\r') = window.get(pos) {
        pos += 1;
    }
    pos
}

fn number(window: &[u8], start: usize, eof: bool) -> Result<Lexed, LexError> {
    let tail = window.get(start..).unwrap_or_default();
    let len = tail
        .iter()
        .position(|byte| !matches!(byte, b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E'))
        .unwrap_or(tail.len());
    if start + len == window.len() && !eof {
        return Ok(Lexed::Incomplete { resume_at: start });
    }
    let end = start + len;
    if !is_valid_number(window.get(start..end).unwrap_or_default()) {
        return Err(LexError::new(start, SyntaxError::InvalidNumber));
    }
    Ok(Lexed::Token(Token {
        kind: TokenKind::Number,
        start,
        end,
    }))
}

/// Checks `text` against the JSON number grammar.
fn is_valid_number(text: &[u8]) -> bool {
    fn digits(text: &[u8], mut i: usize) -> usize {
        while text.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        i
    }

    let mut i = usize::from(text.first() == Some(&b'-'));
    match text.get(i) {
        Some(b'0') => i += 1,
        Some(b'1'..=b'9') => i = digits(text, i + 1),
        _ => return false,
    }
    if text.get(i) == Some(&b'.') {
        let after = digits(text, i + 1);
        if after == i + 1 {
            return false;
        }
        i = after;
    }
    if let Some(b'e' | b'E') = text.get(i) {
        i += 1;
        if let Some(b'+' | b'-') = text.get(i) {
            i += 1;
        }
        let after = digits(text, i);
        if after == i {
            return false;
        }
        i = after;
    }
    i == text.len()
}

fn literal(
    window: &[u8],
    start: usize,
    expected: &'static [u8],
    kind: TokenKind,
    eof: bool,
) -> Result<Lexed, LexError> {
    let available = window.get(start..).unwrap_or_default();
    let seen = available.len().min(expected.len());
    if available.get(..seen) != expected.get(..seen) {
        return Err(LexError::new(start, SyntaxError::InvalidLiteral));
    }
    if seen < expected.len() {
        return Ok(if eof {
            Lexed::Truncated
        } else {
            Lexed::Incomplete { resume_at: start }
        });
    }
    Ok(Lexed::Token(Token {
        kind,
        start,
        end: start + expected.len(),
    }))
}
