//! Incremental splitter for top-level object properties.
//!
//! The splitter consumes a JSON object body window by window and records the
//! raw bytes of each top-level property value. Nested objects and arrays are
//! skipped opaquely by bracket matching; their contents are never
//! interpreted beyond token boundaries, so memory stays bounded by the
//! largest single token rather than by nesting or body size.
//!
//! The splitter performs no I/O. The caller owns the buffer and must present,
//! on every call after the first, the unconsumed remainder of the previous
//! window followed by any newly read bytes.
//!
//! After [`Splitter::feed`] returns an error the splitter must be discarded.

use std::mem;

use bytes::BytesMut;

use crate::{
    error::{StructuralError, SyntaxError},
    lexer::{Lexed, Lexer, Token, TokenKind, skip_whitespace},
    store::{CompletedFields, RawFieldValue},
};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Outcome of one [`Splitter::feed`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrainResult {
    /// The root object closed and the input ended without trailing content.
    pub completed: bool,
    /// Bytes of the window the splitter is finished with. The remainder must
    /// be presented again.
    pub consumed: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Bracket {
    Object,
    Array,
}

impl Bracket {
    fn of(kind: TokenKind) -> Self {
        match kind {
            TokenKind::BeginObject | TokenKind::EndObject => Self::Object,
            _ => Self::Array,
        }
    }
}

/// Value span being captured for one property.
#[derive(Debug)]
struct OpenSpan {
    name: String,
    fragments: BytesMut,
    /// Window-relative start of the not yet copied part of the value.
    start: Option<usize>,
    brackets: Vec<Bracket>,
}

impl OpenSpan {
    fn new(name: String) -> Self {
        Self {
            name,
            fragments: BytesMut::new(),
            start: None,
            brackets: Vec::new(),
        }
    }

    fn flush(&mut self, window: &[u8], end: usize) {
        if let Some(start) = self.start {
            self.fragments
                .extend_from_slice(window.get(start..end).unwrap_or_default());
        }
    }

    /// Copy the captured part of the window before it is discarded; capture
    /// resumes at the start of the next window.
    fn carry(&mut self, window: &[u8], resume_at: usize) {
        if self.start.is_some() {
            self.flush(window, resume_at);
            self.start = Some(0);
        }
    }

    /// Replace a comment inside the value with a single space so the tokens
    /// on either side stay separate.
    fn excise(&mut self, window: &[u8], comment: Token) {
        if self.start.is_some() {
            self.flush(window, comment.start);
            self.fragments.extend_from_slice(b" ");
            self.start = Some(comment.end);
        }
    }
}

#[derive(Debug, Default)]
enum Phase {
    #[default]
    Start,
    ObjectOpen,
    ExpectName,
    ExpectColon(OpenSpan),
    Property(OpenSpan),
    Skip(OpenSpan),
    AfterValue,
    End,
}

impl Phase {
    fn expectation(&self) -> &'static str {
        match self {
            Self::Start => "'{'",
            Self::ObjectOpen => "property name or '}'",
            Self::ExpectName => "property name",
            Self::ExpectColon(_) => "':'",
            Self::Property(_) | Self::Skip(_) => "value",
            Self::AfterValue => "',' or '}'",
            Self::End => "end of body",
        }
    }
}

/// Resumable state machine splitting a body object into raw property values.
///
/// # Examples
///
/// ```
/// use bodyfield::Splitter;
///
/// let mut splitter = Splitter::new(false);
/// let first = splitter.feed(br#"{"a": [1, 2"#, false).expect("valid prefix");
/// assert!(!first.completed);
///
/// // Present the unconsumed tail again, followed by the rest of the body.
/// let mut window = br#"{"a": [1, 2"#[first.consumed..].to_vec();
/// window.extend_from_slice(b"], \"b\": true}");
/// let second = splitter.feed(&window, true).expect("valid body");
/// assert!(second.completed);
///
/// let fields = splitter.into_fields();
/// assert_eq!(fields.get("a").map(|raw| raw.as_bytes()), Some(b"[1, 2]".as_slice()));
/// assert_eq!(fields.get("b").map(|raw| raw.as_bytes()), Some(b"true".as_slice()));
/// ```
#[derive(Debug)]
pub struct Splitter {
    lexer: Lexer,
    phase: Phase,
    /// Absolute body offset of the current window's first byte.
    offset: usize,
    fields: CompletedFields,
}

impl Splitter {
    /// Create a splitter positioned before the first body byte.
    #[must_use]
    pub fn new(allow_comments: bool) -> Self {
        Self {
            lexer: Lexer::new(allow_comments),
            phase: Phase::Start,
            offset: 0,
            fields: CompletedFields::default(),
        }
    }

    /// Consume as much of `window` as possible.
    ///
    /// `eof` states that no bytes follow `window`; with `eof` set the call
    /// either completes or fails.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] for any malformed or unsupported body.
    pub fn feed(&mut self, window: &[u8], eof: bool) -> Result<DrainResult, StructuralError> {
        let mut pos = 0;
        if self.offset == 0 && matches!(self.phase, Phase::Start) {
            if window.starts_with(UTF8_BOM) {
                pos = UTF8_BOM.len();
            } else if !eof && !window.is_empty() && UTF8_BOM.starts_with(window) {
                return Ok(DrainResult {
                    completed: false,
                    consumed: 0,
                });
            }
        }

        loop {
            let lexed = match self.lexer.next(window, pos, eof) {
                Ok(lexed) => lexed,
                Err(_) if self.is_complete() => return Err(self.trailing(window, pos)),
                Err(error) => return Err(self.syntax(error.at, error.reason)),
            };
            match lexed {
                Lexed::Token(token) => {
                    self.accept(window, token)?;
                    pos = token.end;
                }
                Lexed::Incomplete { resume_at } => {
                    if let Some(span) = self.open_span_mut() {
                        span.carry(window, resume_at);
                    }
                    self.offset += resume_at;
                    return Ok(DrainResult {
                        completed: false,
                        consumed: resume_at,
                    });
                }
                Lexed::Exhausted => return self.finish(window.len()),
                Lexed::Truncated if self.is_complete() => return Err(self.trailing(window, pos)),
                Lexed::Truncated => {
                    return Err(StructuralError::TruncatedBody {
                        received: self.offset + window.len(),
                    });
                }
            }
        }
    }

    /// Returns true once the root object has closed.
    #[must_use]
    pub fn is_complete(&self) -> bool { matches!(self.phase, Phase::End) }

    /// Total bytes consumed so far.
    #[must_use]
    pub fn position(&self) -> usize { self.offset }

    /// Take the captured properties.
    #[must_use]
    pub fn into_fields(self) -> CompletedFields { self.fields }

    fn finish(&mut self, len: usize) -> Result<DrainResult, StructuralError> {
        match self.phase {
            Phase::End => {
                self.offset += len;
                Ok(DrainResult {
                    completed: true,
                    consumed: len,
                })
            }
            Phase::Start => Err(StructuralError::EmptyBody),
            _ => Err(StructuralError::TruncatedBody {
                received: self.offset + len,
            }),
        }
    }

    fn open_span_mut(&mut self) -> Option<&mut OpenSpan> {
        match &mut self.phase {
            Phase::ExpectColon(span) | Phase::Property(span) | Phase::Skip(span) => Some(span),
            _ => None,
        }
    }

    fn accept(&mut self, window: &[u8], token: Token) -> Result<(), StructuralError> {
        if token.kind == TokenKind::Comment {
            if let Some(span) = self.open_span_mut() {
                span.excise(window, token);
            }
            return Ok(());
        }

        self.phase = match (mem::take(&mut self.phase), token.kind) {
            (Phase::Start, TokenKind::BeginObject) => Phase::ObjectOpen,
            (Phase::Start, found) => {
                return Err(StructuralError::UnexpectedRootShape {
                    found,
                    offset: self.offset + token.start,
                });
            }
            (Phase::ObjectOpen | Phase::AfterValue, TokenKind::EndObject) => Phase::End,
            (Phase::ObjectOpen | Phase::ExpectName, TokenKind::String) => {
                let name = self.property_name(window, token)?;
                if self.fields.contains(&name) {
                    return Err(StructuralError::DuplicateField { name });
                }
                Phase::ExpectColon(OpenSpan::new(name))
            }
            (Phase::ExpectColon(span), TokenKind::Colon) => Phase::Property(span),
            (Phase::Property(mut span), kind @ (TokenKind::BeginObject | TokenKind::BeginArray)) => {
                span.start = Some(token.start);
                span.brackets.push(Bracket::of(kind));
                Phase::Skip(span)
            }
            (Phase::Property(mut span), kind) if kind.is_scalar() => {
                span.start = Some(token.start);
                self.close(span, window, token.end)?;
                Phase::AfterValue
            }
            (Phase::Skip(mut span), kind @ (TokenKind::BeginObject | TokenKind::BeginArray)) => {
                span.brackets.push(Bracket::of(kind));
                Phase::Skip(span)
            }
            (Phase::Skip(mut span), found @ (TokenKind::EndObject | TokenKind::EndArray)) => {
                if span.brackets.pop() != Some(Bracket::of(found)) {
                    return Err(self.syntax(token.start, SyntaxError::MismatchedBracket { found }));
                }
                if span.brackets.is_empty() {
                    self.close(span, window, token.end)?;
                    Phase::AfterValue
                } else {
                    Phase::Skip(span)
                }
            }
            (skip @ Phase::Skip(_), _) => skip,
            (Phase::AfterValue, TokenKind::Comma) => Phase::ExpectName,
            (Phase::End, _) => {
                return Err(StructuralError::TrailingContent {
                    offset: self.offset + token.start,
                });
            }
            (phase, found) => {
                return Err(self.syntax(token.start, SyntaxError::UnexpectedToken {
                    found,
                    expected: phase.expectation(),
                }));
            }
        };
        Ok(())
    }

    fn close(&mut self, mut span: OpenSpan, window: &[u8], end: usize) -> Result<(), StructuralError> {
        span.flush(window, end);
        let value = RawFieldValue::new(span.fragments.freeze());
        tracing::trace!(field = %span.name, bytes = value.len(), "field span captured");
        self.fields.insert(span.name, value)
    }

    fn property_name(&self, window: &[u8], token: Token) -> Result<String, StructuralError> {
        let raw = window.get(token.start..token.end).unwrap_or_default();
        serde_json::from_slice(raw)
            .map_err(|_| self.syntax(token.start, SyntaxError::InvalidPropertyName))
    }

    /// Anything after the root object other than whitespace or a complete
    /// comment, located at its first byte.
    fn trailing(&self, window: &[u8], pos: usize) -> StructuralError {
        StructuralError::TrailingContent {
            offset: self.offset + skip_whitespace(window, pos),
        }
    }

    fn syntax(&self, at: usize, reason: SyntaxError) -> StructuralError {
        StructuralError::Syntax {
            offset: self.offset + at,
            reason,
        }
    }
}

/// Split a fully buffered body in one call.
///
/// # Errors
///
/// Returns a [`StructuralError`] for any malformed or unsupported body.
///
/// # Examples
///
/// ```
/// use bodyfield::split;
///
/// let fields = split(br#"{"x": 1, "y": {"z": [true]}}"#, false).expect("valid body");
/// assert_eq!(fields.len(), 2);
/// assert_eq!(
///     fields.get("y").map(|raw| raw.as_bytes()),
///     Some(br#"{"z": [true]}"#.as_slice())
/// );
/// ```
pub fn split(body: &[u8], allow_comments: bool) -> Result<CompletedFields, StructuralError> {
    let mut splitter = Splitter::new(allow_comments);
    let result = splitter.feed(body, true)?;
    if !result.completed {
        return Err(StructuralError::TruncatedBody {
            received: body.len(),
        });
    }
    Ok(splitter.into_fields())
}
