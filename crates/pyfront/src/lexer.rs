use crate::diagnostics::{Diagnostic, DiagnosticLabel, DiagnosticSeverity, Position, Span};
use crate::syntax;
use crate::token::{TokKind, Token};

/// Lexes Python 2 source into a flat token stream plus diagnostics.
///
/// Indentation is not interpreted here: leading whitespace on content lines
/// becomes a `LeadingWs` token and every physical line boundary outside
/// brackets becomes a `Newline` token (hidden when the line was blank or
/// comment-only). The indentation filter turns those into INDENT/DEDENT.
pub fn lex(content: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let chars: Vec<char> = content.chars().collect();
    let mut tokens: Vec<Token> = Vec::new();
    let mut diagnostics = Vec::new();

    let mut index = 0usize;
    let mut line = 1usize;
    let mut col = 0usize;
    // Open `([{` depth; newlines inside brackets join lines implicitly.
    let mut depth = 0usize;
    let mut at_line_start = true;
    let mut line_had_content = false;

    while index < chars.len() {
        if at_line_start && depth == 0 {
            let start = index;
            while index < chars.len() && (chars[index] == ' ' || chars[index] == '\t') {
                index += 1;
                col += 1;
            }
            at_line_start = false;
            match chars.get(index) {
                // Whitespace-only tail of the file.
                None => break,
                // Blank or comment-only line: its indentation must not
                // open or close blocks, so the run is dropped.
                Some('\n') | Some('\r') | Some('#') => {}
                Some(_) => {
                    if index > start {
                        let text: String = chars[start..index].iter().collect();
                        tokens.push(Token::new(
                            TokKind::LeadingWs,
                            text,
                            line,
                            0,
                            start,
                            index - 1,
                        ));
                    }
                }
            }
            continue;
        }

        let ch = chars[index];

        if ch == '\n' || ch == '\r' {
            let start = index;
            index += 1;
            if ch == '\r' && index < chars.len() && chars[index] == '\n' {
                index += 1;
            }
            let text: String = chars[start..index].iter().collect();
            let mut tok = Token::new(TokKind::Newline, text, line, col, start, index - 1);
            if depth > 0 || !line_had_content {
                tok = tok.hidden();
            }
            tokens.push(tok);
            line += 1;
            col = 0;
            at_line_start = depth == 0;
            line_had_content = false;
            continue;
        }

        if ch == ' ' || ch == '\t' {
            index += 1;
            col += 1;
            continue;
        }

        if ch == '\\' {
            if matches!(chars.get(index + 1), Some('\n') | Some('\r')) {
                index += 2;
                if chars.get(index - 1) == Some(&'\r') && chars.get(index) == Some(&'\n') {
                    index += 1;
                }
                line += 1;
                col = 0;
                continue;
            }
            diagnostics.push(Diagnostic::error(
                "E1002",
                "unexpected character after line continuation",
                point_span(line, col),
            ));
            index += 1;
            col += 1;
            continue;
        }

        if ch == '#' {
            let start = index;
            let start_col = col;
            while index < chars.len() && chars[index] != '\n' && chars[index] != '\r' {
                index += 1;
                col += 1;
            }
            let text: String = chars[start..index].iter().collect();
            tokens.push(
                Token::new(TokKind::Comment, text, line, start_col, start, index - 1).hidden(),
            );
            continue;
        }

        if let Some(prefix_len) = string_prefix_len(&chars, index) {
            let start = index;
            let start_col = col;
            let scan = lex_string_tail(&chars, index + prefix_len, line, col + prefix_len);
            let text: String = chars[start..scan.end_index].iter().collect();
            tokens.push(Token::new(
                TokKind::Str,
                text,
                line,
                start_col,
                start,
                scan.end_index - 1,
            ));
            if !scan.closed {
                diagnostics.push(Diagnostic {
                    severity: DiagnosticSeverity::Error,
                    code: "E1001".to_string(),
                    message: "unterminated string literal".to_string(),
                    span: Span {
                        start: Position {
                            line,
                            column: start_col + 1,
                        },
                        end: Position {
                            line: scan.end_line,
                            column: scan.end_col + 1,
                        },
                    },
                    labels: vec![DiagnosticLabel {
                        message: "string literal started here".to_string(),
                        span: point_span(line, start_col + prefix_len),
                    }],
                });
            }
            index = scan.end_index;
            line = scan.end_line;
            col = scan.end_col;
            line_had_content = true;
            continue;
        }

        if is_ident_start(ch) {
            let start = index;
            let start_col = col;
            index += 1;
            col += 1;
            while index < chars.len() && is_ident_continue(chars[index]) {
                index += 1;
                col += 1;
            }
            let text: String = chars[start..index].iter().collect();
            let kind = if syntax::is_keyword(&text) {
                TokKind::Keyword
            } else {
                TokKind::Name
            };
            tokens.push(Token::new(kind, text, line, start_col, start, index - 1));
            line_had_content = true;
            continue;
        }

        if ch.is_ascii_digit()
            || (ch == '.' && chars.get(index + 1).is_some_and(|c| c.is_ascii_digit()))
        {
            let start = index;
            let start_col = col;
            let end = lex_number(&chars, index);
            let text: String = chars[start..end].iter().collect();
            if number_body_is_empty(&text) {
                diagnostics.push(Diagnostic::error(
                    "E1003",
                    format!("invalid number literal '{text}'"),
                    point_span(line, start_col),
                ));
            }
            col += end - index;
            index = end;
            tokens.push(Token::new(TokKind::Number, text, line, start_col, start, end - 1));
            line_had_content = true;
            continue;
        }

        if let Some((symbol, len)) = match_symbol(&chars, index) {
            match symbol.as_str() {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth = depth.saturating_sub(1),
                _ => {}
            }
            tokens.push(Token::new(
                TokKind::Symbol,
                symbol,
                line,
                col,
                index,
                index + len - 1,
            ));
            index += len;
            col += len;
            line_had_content = true;
            continue;
        }

        diagnostics.push(Diagnostic::error(
            "E1000",
            format!("unexpected character '{ch}'"),
            point_span(line, col),
        ));
        index += 1;
        col += 1;
    }

    // The grammar wants every logical line NEWLINE-terminated, including
    // the last one.
    if line_had_content {
        let offset = chars.len().saturating_sub(1);
        tokens.push(Token::new(TokKind::Newline, "\n", line, col, offset, offset));
    }

    (tokens, diagnostics)
}

struct StringScan {
    end_index: usize,
    end_line: usize,
    end_col: usize,
    closed: bool,
}

/// Scans a string literal body starting at the opening quote. Handles both
/// single- and triple-quoted forms; escapes are left undecoded in the text.
fn lex_string_tail(chars: &[char], start: usize, line: usize, col: usize) -> StringScan {
    let quote = chars[start];
    let triple = chars.get(start + 1) == Some(&quote) && chars.get(start + 2) == Some(&quote);
    let mut index = start + if triple { 3 } else { 1 };
    let mut line = line;
    let mut col = col + if triple { 3 } else { 1 };

    while index < chars.len() {
        let ch = chars[index];
        if ch == '\\' && index + 1 < chars.len() {
            // A backslash escapes the next character even in raw strings;
            // the pair stays in the text.
            index += 2;
            if chars[index - 1] == '\n' || chars[index - 1] == '\r' {
                if chars[index - 1] == '\r' && chars.get(index) == Some(&'\n') {
                    index += 1;
                }
                line += 1;
                col = 0;
            } else {
                col += 2;
            }
            continue;
        }
        if ch == quote {
            if !triple {
                return StringScan {
                    end_index: index + 1,
                    end_line: line,
                    end_col: col + 1,
                    closed: true,
                };
            }
            if chars.get(index + 1) == Some(&quote) && chars.get(index + 2) == Some(&quote) {
                return StringScan {
                    end_index: index + 3,
                    end_line: line,
                    end_col: col + 3,
                    closed: true,
                };
            }
            index += 1;
            col += 1;
            continue;
        }
        if ch == '\n' || ch == '\r' {
            if !triple {
                return StringScan {
                    end_index: index,
                    end_line: line,
                    end_col: col,
                    closed: false,
                };
            }
            if ch == '\n' {
                line += 1;
                col = 0;
            }
            index += 1;
            continue;
        }
        index += 1;
        col += 1;
    }

    StringScan {
        end_index: chars.len(),
        end_line: line,
        end_col: col,
        closed: false,
    }
}

/// Length of the string prefix at `index` when a string literal starts
/// there: 0 for a bare quote, 1..2 for `r`/`u`/`b`/`ur`/`br` spellings
/// followed by a quote. `None` when this is not a string at all.
fn string_prefix_len(chars: &[char], index: usize) -> Option<usize> {
    if matches!(chars.get(index), Some('\'') | Some('"')) {
        return Some(0);
    }
    if !is_ident_start(chars[index]) {
        return None;
    }
    let mut end = index;
    while end < chars.len() && is_ident_continue(chars[end]) {
        end += 1;
    }
    let word: String = chars[index..end].iter().collect();
    if is_string_prefix(&word) && matches!(chars.get(end), Some('\'') | Some('"')) {
        Some(end - index)
    } else {
        None
    }
}

/// Scans a numeric literal and returns the end index. Radix prefixes,
/// exponents and the `L`/`j` suffixes are captured as raw text; decoding
/// happens in the grammar actions.
fn lex_number(chars: &[char], start: usize) -> usize {
    let mut index = start;
    let len = chars.len();

    if chars[index] == '0'
        && index + 1 < len
        && matches!(chars[index + 1], 'x' | 'X' | 'o' | 'O' | 'b' | 'B')
    {
        let radix_char = chars[index + 1];
        index += 2;
        let is_radix_digit = |c: char| match radix_char {
            'x' | 'X' => c.is_ascii_hexdigit(),
            'o' | 'O' => ('0'..='7').contains(&c),
            _ => c == '0' || c == '1',
        };
        while index < len && is_radix_digit(chars[index]) {
            index += 1;
        }
        if index < len && matches!(chars[index], 'l' | 'L') {
            index += 1;
        }
        return index;
    }

    while index < len && chars[index].is_ascii_digit() {
        index += 1;
    }
    if index < len && chars[index] == '.' {
        index += 1;
        while index < len && chars[index].is_ascii_digit() {
            index += 1;
        }
    }
    if index < len && matches!(chars[index], 'e' | 'E') {
        let mut exp = index + 1;
        if exp < len && matches!(chars[exp], '+' | '-') {
            exp += 1;
        }
        if exp < len && chars[exp].is_ascii_digit() {
            index = exp;
            while index < len && chars[index].is_ascii_digit() {
                index += 1;
            }
        }
    }
    if index < len && matches!(chars[index], 'j' | 'J' | 'l' | 'L') {
        index += 1;
    }
    index
}

fn number_body_is_empty(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    matches!(lower.as_str(), "0x" | "0o" | "0b" | "0xl" | "0ol" | "0bl")
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}

fn is_string_prefix(text: &str) -> bool {
    matches!(
        text.to_ascii_lowercase().as_str(),
        "r" | "u" | "b" | "ur" | "br"
    )
}

fn match_symbol(chars: &[char], index: usize) -> Option<(String, usize)> {
    if index + 2 < chars.len() {
        for (needle, symbol) in syntax::SYMBOLS_3 {
            if chars[index] == needle[0]
                && chars[index + 1] == needle[1]
                && chars[index + 2] == needle[2]
            {
                return Some(((*symbol).to_string(), 3));
            }
        }
    }

    if index + 1 < chars.len() {
        for (needle, symbol) in syntax::SYMBOLS_2 {
            if chars[index] == needle[0] && chars[index + 1] == needle[1] {
                return Some(((*symbol).to_string(), 2));
            }
        }
    }

    let ch = chars[index];
    if syntax::SYMBOLS_1.contains(&ch) {
        return Some((ch.to_string(), 1));
    }

    None
}

fn point_span(line: usize, col: usize) -> Span {
    Span::point(line, col + 1)
}
