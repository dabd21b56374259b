use crate::diagnostics::{render_diagnostic, Diagnostic};

/// How the front end reacts to syntax and semantic-legality errors.
///
/// `FailFast` aborts on the first error and yields no tree. `Record`
/// appends a diagnostic, patches a typed error node into the tree and
/// keeps parsing. Fatal conditions (indentation overflow, malformed tree
/// edits) do not route through the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    #[default]
    FailFast,
    Record,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("{}", render_diagnostic(.path, .diagnostic))]
    Syntax {
        path: String,
        diagnostic: Diagnostic,
    },
    #[error("{path}:{line}: too many levels of indentation")]
    IndentOverflow { path: String, line: usize },
}

impl ParseError {
    pub fn syntax(path: &str, diagnostic: Diagnostic) -> ParseError {
        ParseError::Syntax {
            path: path.to_string(),
            diagnostic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Span;

    #[test]
    fn syntax_errors_render_like_diagnostics() {
        let err = ParseError::syntax(
            "bad.py",
            Diagnostic::error("E1500", "unexpected token ')'", Span::point(2, 5)),
        );
        assert_eq!(err.to_string(), "error[E1500] bad.py:2:5 unexpected token ')'");
    }

    #[test]
    fn indent_overflow_names_the_line() {
        let err = ParseError::IndentOverflow {
            path: "deep.py".to_string(),
            line: 101,
        };
        assert_eq!(err.to_string(), "deep.py:101: too many levels of indentation");
    }
}
