use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn point(line: usize, column: usize) -> Span {
        let pos = Position { line, column };
        Span { start: pos, end: pos }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticLabel {
    pub message: String,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub code: String,
    pub message: String,
    pub span: Span,
    pub labels: Vec<DiagnosticLabel>,
}

impl Diagnostic {
    pub fn error(code: &str, message: impl Into<String>, span: Span) -> Diagnostic {
        Diagnostic {
            severity: DiagnosticSeverity::Error,
            code: code.to_string(),
            message: message.into(),
            span,
            labels: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileDiagnostic {
    pub path: String,
    pub diagnostic: Diagnostic,
}

pub fn render_diagnostics(path: &str, diagnostics: &[Diagnostic]) -> String {
    let mut output = String::new();
    for (index, diagnostic) in diagnostics.iter().enumerate() {
        if index > 0 {
            output.push('\n');
        }
        output.push_str(&render_diagnostic(path, diagnostic));
    }
    output
}

pub fn render_diagnostic(path: &str, diagnostic: &Diagnostic) -> String {
    let mut output = String::new();
    let start = &diagnostic.span.start;
    let kind = match diagnostic.severity {
        DiagnosticSeverity::Error => "error",
        DiagnosticSeverity::Warning => "warning",
    };
    output.push_str(&format!(
        "{}[{}] {}:{}:{} {}\n",
        kind, diagnostic.code, path, start.line, start.column, diagnostic.message
    ));
    for label in &diagnostic.labels {
        let pos = &label.span.start;
        output.push_str(&format!(
            "  note: {} at {}:{}:{}\n",
            label.message, path, pos.line, pos.column
        ));
    }
    output.trim_end().to_string()
}

pub fn diagnostics_to_json(path: &str, diagnostics: &[Diagnostic]) -> String {
    let file_diags: Vec<FileDiagnostic> = diagnostics
        .iter()
        .map(|diagnostic| FileDiagnostic {
            path: path.to_string(),
            diagnostic: diagnostic.clone(),
        })
        .collect();
    serde_json::to_string_pretty(&file_diags).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_code_path_and_position() {
        let diag = Diagnostic::error("E1500", "unexpected token", Span::point(3, 7));
        let rendered = render_diagnostic("script.py", &diag);
        assert_eq!(rendered, "error[E1500] script.py:3:7 unexpected token");
    }

    #[test]
    fn renders_labels_as_notes() {
        let mut diag = Diagnostic::error("E1100", "inconsistent dedent", Span::point(5, 2));
        diag.labels.push(DiagnosticLabel {
            message: "block opened here".to_string(),
            span: Span::point(2, 4),
        });
        let rendered = render_diagnostic("script.py", &diag);
        assert!(rendered.contains("error[E1100] script.py:5:2 inconsistent dedent"));
        assert!(rendered.contains("note: block opened here at script.py:2:4"));
    }

    #[test]
    fn json_export_includes_path_and_code() {
        let diag = Diagnostic::error("E1600", "cannot assign to literal", Span::point(1, 0));
        let json = diagnostics_to_json("a.py", &[diag]);
        assert!(json.contains("\"E1600\""));
        assert!(json.contains("\"a.py\""));
    }
}
