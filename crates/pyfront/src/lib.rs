//! Parser front end for the Python 2 surface syntax: a lexer, an
//! off-side-rule indentation filter, a position-tracking node arena and
//! a recursive-descent parser with pluggable error handling.

pub mod actions;
pub mod ast;
pub mod diagnostics;
pub mod errors;
pub mod indent;
pub mod lexer;
pub mod literals;
pub mod parser;
mod syntax;
pub mod token;
pub mod tree;

pub use ast::{BoolOpKind, CmpOp, NodeKind, Num, Operator, Str, UnaryOpKind};
pub use diagnostics::{
    diagnostics_to_json, render_diagnostics, Diagnostic, DiagnosticSeverity, Position, Span,
};
pub use errors::{ErrorPolicy, ParseError};
pub use indent::filter_tokens;
pub use lexer::lex;
pub use literals::SourceEncoding;
pub use parser::Parser;
pub use token::{Channel, TokKind, Token};
pub use tree::{Arena, Node, NodeId};

/// Per-parse knobs. The defaults mirror the strict interactive behavior:
/// abort on the first error, treat plain string literals as UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    pub policy: ErrorPolicy,
    pub encoding: SourceEncoding,
}

/// A parsed module: the arena, its root, the token stream the node
/// boundaries index into, and whatever diagnostics recording mode kept.
#[derive(Debug)]
pub struct Parsed {
    pub root: NodeId,
    pub arena: Arena,
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Parsed {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Runs the whole pipeline over one module source: lex, indentation
/// filtering, parse. Lexer diagnostics come first in the recorded order;
/// under `ErrorPolicy::FailFast` the first of them aborts the parse the
/// same way a parser diagnostic would.
pub fn parse_module(path: &str, source: &str, options: ParseOptions) -> Result<Parsed, ParseError> {
    let (raw, mut diagnostics) = lexer::lex(source);
    if options.policy == ErrorPolicy::FailFast && !diagnostics.is_empty() {
        return Err(ParseError::syntax(path, diagnostics.remove(0)));
    }
    let tokens = indent::filter_tokens(raw, path)?;
    let mut parser = Parser::new(path, tokens, options.policy, options.encoding);
    let root = parser.parse_module()?;
    let (arena, tokens, mut parse_diags) = parser.into_parts();
    diagnostics.append(&mut parse_diags);
    Ok(Parsed {
        root,
        arena,
        tokens,
        diagnostics,
    })
}
