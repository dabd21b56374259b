use serde::Serialize;

use crate::diagnostics::{Position, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokKind {
    Name,
    Keyword,
    Number,
    Str,
    Symbol,
    Newline,
    LeadingWs,
    Comment,
    Indent,
    Dedent,
    EndMarker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Channel {
    Normal,
    Hidden,
}

/// One lexical token. `line` is 1-based, `column` 0-based; `start`/`stop`
/// are inclusive character offsets into the source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
    pub start: usize,
    pub stop: usize,
    pub channel: Channel,
}

impl Token {
    pub fn new(
        kind: TokKind,
        text: impl Into<String>,
        line: usize,
        column: usize,
        start: usize,
        stop: usize,
    ) -> Token {
        Token {
            kind,
            text: text.into(),
            line,
            column,
            start,
            stop,
            channel: Channel::Normal,
        }
    }

    /// Synthesized token (INDENT/DEDENT/ENDMARKER): empty text, zero-width,
    /// anchored at the position of the token that triggered it.
    pub fn synthesized(kind: TokKind, line: usize, column: usize, offset: usize) -> Token {
        Token {
            kind,
            text: String::new(),
            line,
            column,
            start: offset,
            stop: offset,
            channel: Channel::Normal,
        }
    }

    pub fn hidden(mut self) -> Token {
        self.channel = Channel::Hidden;
        self
    }

    pub fn is_symbol(&self, text: &str) -> bool {
        self.kind == TokKind::Symbol && self.text == text
    }

    pub fn is_keyword(&self, text: &str) -> bool {
        self.kind == TokKind::Keyword && self.text == text
    }

    /// Diagnostic span for this token, with 1-based columns.
    pub fn span(&self) -> Span {
        let width = self.text.chars().count().max(1);
        Span {
            start: Position {
                line: self.line,
                column: self.column + 1,
            },
            end: Position {
                line: self.line,
                column: self.column + width,
            },
        }
    }
}
