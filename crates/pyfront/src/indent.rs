use std::collections::VecDeque;

use crate::errors::ParseError;
use crate::token::{Channel, TokKind, Token};

/// Indentation levels a module may open, counting the bottom sentinel.
pub const MAX_INDENT_DEPTH: usize = 100;

/// Pull-based filter implementing the off-side rule.
///
/// Sits between the lexer and the parser: forwards every token it reads
/// and, after each normal-channel newline, inspects the indentation of the
/// next line, synthesizing `Indent`/`Dedent` tokens against a stack of open
/// columns. `LeadingWs` tokens are consumed here and never forwarded. The
/// stream always ends with one `Dedent` per still-open level followed by a
/// single `EndMarker`.
pub struct IndentFilter {
    tokens: Vec<Token>,
    pos: usize,
    stack: Vec<i32>,
    queue: VecDeque<Token>,
    path: String,
    at_line_start: bool,
    finished: bool,
    eof_line: usize,
    eof_offset: usize,
}

impl IndentFilter {
    pub fn new(tokens: Vec<Token>, path: &str) -> IndentFilter {
        IndentFilter {
            tokens,
            pos: 0,
            stack: vec![0],
            queue: VecDeque::new(),
            path: path.to_string(),
            at_line_start: true,
            finished: false,
            eof_line: 1,
            eof_offset: 0,
        }
    }

    /// Next token of the filtered stream. After the `EndMarker` has been
    /// produced, keeps returning fresh `EndMarker`s.
    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        loop {
            if let Some(tok) = self.queue.pop_front() {
                return Ok(tok);
            }
            if self.finished {
                return Ok(self.end_marker());
            }
            self.pump()?;
        }
    }

    fn pump(&mut self) -> Result<(), ParseError> {
        if self.at_line_start {
            self.at_line_start = false;
            self.handle_line_start()?;
            return Ok(());
        }
        match self.tokens.get(self.pos).cloned() {
            None => self.close_document(),
            Some(tok) => {
                self.pos += 1;
                if tok.channel == Channel::Normal && tok.kind == TokKind::Newline {
                    self.at_line_start = true;
                }
                self.note_position(&tok);
                self.queue.push_back(tok);
            }
        }
        Ok(())
    }

    /// Runs once per logical line start (and once at the very start of the
    /// stream): forwards the hidden run, reads the new line's column, and
    /// synthesizes indentation tokens.
    fn handle_line_start(&mut self) -> Result<(), ParseError> {
        while let Some(tok) = self.tokens.get(self.pos) {
            if tok.channel != Channel::Hidden {
                break;
            }
            let tok = tok.clone();
            self.pos += 1;
            self.note_position(&tok);
            self.queue.push_back(tok);
        }

        let column: i32 = match self.tokens.get(self.pos) {
            None => -1,
            Some(tok) if tok.kind == TokKind::LeadingWs => tok.text.chars().count() as i32,
            Some(tok) => tok.column as i32,
        };

        if column < 0 {
            self.close_document();
            return Ok(());
        }

        let anchor = if self.tokens.get(self.pos).map(|t| t.kind) == Some(TokKind::LeadingWs) {
            let ws = self.pos;
            self.pos += 1;
            self.tokens.get(self.pos).or_else(|| self.tokens.get(ws)).cloned()
        } else {
            self.tokens.get(self.pos).cloned()
        };
        let (line, col, offset) = match &anchor {
            Some(tok) => (tok.line, tok.column, tok.start),
            None => (self.eof_line, 0, self.eof_offset),
        };

        let top = self.stack.last().copied().unwrap_or(0);
        if column > top {
            if self.stack.len() >= MAX_INDENT_DEPTH {
                return Err(ParseError::IndentOverflow {
                    path: self.path.clone(),
                    line,
                });
            }
            self.stack.push(column);
            self.queue
                .push_back(Token::synthesized(TokKind::Indent, line, col, offset));
        } else if column < top {
            // Pop until a level matches the new column. When none does we
            // settle on the bottom sentinel instead of raising the way
            // CPython's "unindent does not match" error would.
            while self.stack.len() > 1 && self.stack.last().copied().unwrap_or(0) != column {
                self.stack.pop();
                self.queue
                    .push_back(Token::synthesized(TokKind::Dedent, line, col, offset));
            }
        }
        Ok(())
    }

    fn close_document(&mut self) {
        while self.stack.len() > 1 {
            self.stack.pop();
            self.queue.push_back(Token::synthesized(
                TokKind::Dedent,
                self.eof_line,
                0,
                self.eof_offset,
            ));
        }
        self.queue.push_back(self.end_marker());
        self.finished = true;
    }

    fn end_marker(&self) -> Token {
        Token::synthesized(TokKind::EndMarker, self.eof_line, 0, self.eof_offset)
    }

    fn note_position(&mut self, tok: &Token) {
        self.eof_line = tok.line + usize::from(tok.kind == TokKind::Newline);
        self.eof_offset = tok.stop + 1;
    }
}

/// Runs the filter to completion, returning the buffered stream ending in
/// `EndMarker`. Hidden-channel tokens are retained for tooling; the parser
/// drops them before consuming the stream.
pub fn filter_tokens(tokens: Vec<Token>, path: &str) -> Result<Vec<Token>, ParseError> {
    let mut filter = IndentFilter::new(tokens, path);
    let mut out = Vec::new();
    loop {
        let tok = filter.next_token()?;
        let done = tok.kind == TokKind::EndMarker;
        out.push(tok);
        if done {
            return Ok(out);
        }
    }
}
