use pyfront::{
    parse_module, render_diagnostics, ErrorPolicy, NodeKind, ParseError, ParseOptions,
    SourceEncoding, Str, TokKind,
};

fn record() -> ParseOptions {
    ParseOptions {
        policy: ErrorPolicy::Record,
        ..ParseOptions::default()
    }
}

#[test]
fn whole_program_parses_without_diagnostics() {
    let src = r#"def fib(n):
    a, b = 0, 1
    while b < n:
        print b,
        a, b = b, a + b

class Counter(object):
    def __init__(self, start=0):
        self.value = start

    def bump(self, by=1):
        self.value += by
        return self.value

squares = [x ** 2 for x in range(10) if x % 2 == 0]
table = {'a': 1, 'b': 2}
total = sum(v for v in table.values())
"#;
    let parsed = parse_module("program.py", src, ParseOptions::default()).expect("parse");
    assert!(
        parsed.diagnostics.is_empty(),
        "unexpected diagnostics: {:#?}",
        parsed.diagnostics
    );
    let children = parsed.arena.children(parsed.root);
    assert_eq!(children.len(), 5);
    assert_eq!(parsed.arena.def_name(children[0]), Some("fib"));
    assert_eq!(parsed.arena.def_name(children[1]), Some("Counter"));
}

#[test]
fn raw_strings_keep_their_backslashes() {
    let src = "x = r\"\"\"a\\nb\"\"\"\n";
    let parsed = parse_module("raw.py", src, ParseOptions::default()).expect("parse");
    let assign = parsed.arena.children(parsed.root)[0];
    let value = parsed.arena.children(assign)[1];
    match parsed.arena.kind(value) {
        NodeKind::StrLit {
            value: Str::Bytes(bytes),
        } => assert_eq!(bytes, b"a\\nb"),
        other => panic!("expected a bytes literal, got {other:?}"),
    }
}

#[test]
fn string_encoding_option_controls_byte_literals() {
    let src = "x = '\u{e9}'\n";
    let utf8 = parse_module("enc.py", src, ParseOptions::default()).expect("parse");
    let latin = parse_module(
        "enc.py",
        src,
        ParseOptions {
            encoding: SourceEncoding::Latin1,
            ..ParseOptions::default()
        },
    )
    .expect("parse");
    let bytes_of = |parsed: &pyfront::Parsed| {
        let assign = parsed.arena.children(parsed.root)[0];
        let value = parsed.arena.children(assign)[1];
        match parsed.arena.kind(value) {
            NodeKind::StrLit {
                value: Str::Bytes(bytes),
            } => bytes.clone(),
            other => panic!("expected a bytes literal, got {other:?}"),
        }
    };
    assert_eq!(bytes_of(&utf8), vec![0xc3, 0xa9]);
    assert_eq!(bytes_of(&latin), vec![0xe9]);
}

#[test]
fn recording_mode_collects_errors_and_keeps_parsing() {
    let src = "1 = x\ny = )\nz = 3\n";
    let parsed = parse_module("bad.py", src, record()).expect("parse");
    assert_eq!(
        parsed.diagnostics.len(),
        2,
        "diagnostics: {:#?}",
        parsed.diagnostics
    );
    assert_eq!(parsed.diagnostics[0].code, "E1600");
    assert_eq!(parsed.diagnostics[1].code, "E1500");
    // All three lines keep a statement in the tree.
    assert_eq!(parsed.arena.children(parsed.root).len(), 3);
}

#[test]
fn fail_fast_surfaces_the_first_error() {
    let src = "1 = x\ny = )\n";
    let err = parse_module("bad.py", src, ParseOptions::default());
    match err {
        Err(ParseError::Syntax { path, diagnostic }) => {
            assert_eq!(path, "bad.py");
            assert_eq!(diagnostic.code, "E1600");
            assert_eq!(diagnostic.span.start.line, 1);
        }
        other => panic!("expected a syntax error, got {other:?}"),
    }
}

#[test]
fn lexer_errors_follow_the_policy_too() {
    // '$' is not a token.
    let src = "x = $\n";
    let err = parse_module("lex.py", src, ParseOptions::default());
    assert!(matches!(err, Err(ParseError::Syntax { .. })));

    let parsed = parse_module("lex.py", src, record()).expect("parse");
    assert!(
        !parsed.diagnostics.is_empty(),
        "expected recorded lexer diagnostics"
    );
}

#[test]
fn indentation_overflow_is_fatal_even_when_recording() {
    let mut src = String::new();
    for depth in 0..100 {
        src.push_str(&" ".repeat(depth));
        src.push_str("if a:\n");
    }
    src.push_str(&" ".repeat(100));
    src.push_str("pass\n");
    let err = parse_module("deep.py", &src, record());
    assert!(matches!(err, Err(ParseError::IndentOverflow { .. })));
}

#[test]
fn dedent_to_unmatched_level_closes_the_block() {
    // The filter settles on the enclosing level rather than raising.
    let src = "if a:\n        x = 1\n    y = 2\n";
    let parsed = parse_module("dedent.py", src, record()).expect("parse");
    assert!(
        parsed.diagnostics.is_empty(),
        "diagnostics: {:#?}",
        parsed.diagnostics
    );
    let children = parsed.arena.children(parsed.root);
    assert_eq!(children.len(), 2);
    assert!(matches!(parsed.arena.kind(children[0]), NodeKind::If));
    assert!(matches!(parsed.arena.kind(children[1]), NodeKind::Assign));
}

#[test]
fn blank_and_comment_lines_do_not_close_blocks() {
    let src = "if x:\n\n    # setup\n    a = 1\n\n    b = 2\nc = 3\n";
    let parsed = parse_module("blank.py", src, ParseOptions::default()).expect("parse");
    assert!(parsed.diagnostics.is_empty());
    let children = parsed.arena.children(parsed.root);
    assert_eq!(children.len(), 2);
    let suite = parsed.arena.children(children[0])[1];
    assert_eq!(parsed.arena.children(suite).len(), 2);
}

#[test]
fn explicit_and_bracket_continuations_join_lines() {
    let src = "x = 1 + \\\n    2\nys = [1,\n      2,\n      3]\n";
    let parsed = parse_module("cont.py", src, ParseOptions::default()).expect("parse");
    assert!(
        parsed.diagnostics.is_empty(),
        "diagnostics: {:#?}",
        parsed.diagnostics
    );
    let children = parsed.arena.children(parsed.root);
    assert_eq!(children.len(), 2);
    let list = parsed.arena.children(children[1])[1];
    assert!(matches!(parsed.arena.kind(list), NodeKind::List));
    assert_eq!(parsed.arena.children(list).len(), 3);
}

#[test]
fn diagnostics_render_with_position_and_code() {
    let parsed = parse_module("t.py", "1 = x\n", record()).expect("parse");
    let rendered = render_diagnostics("t.py", &parsed.diagnostics);
    assert_eq!(rendered, "error[E1600] t.py:1:1 can't assign to literal");
}

#[test]
fn parsed_token_stream_backs_node_boundaries() {
    let parsed = parse_module("spans.py", "total = a + b\n", ParseOptions::default()).expect("parse");
    assert_eq!(
        parsed.tokens.last().map(|token| token.kind),
        Some(TokKind::EndMarker)
    );
    let assign = parsed.arena.children(parsed.root)[0];
    assert_eq!(
        parsed.arena.name_text(parsed.arena.children(assign)[0]),
        Some("total")
    );
    let node = parsed.arena.node(assign);
    assert!(node.token_stop <= parsed.tokens.len());
    assert_eq!(parsed.tokens[node.token_start].text, "total");
    assert_eq!(parsed.tokens[node.token_stop - 1].text, "b");
    assert_eq!(&"total = a + b\n"[node.char_start..node.char_stop], "total = a + b");
}

#[test]
fn keyword_statements_outside_the_subset_degrade_to_error_nodes() {
    let src = "import os\nx = 1\n";
    let parsed = parse_module("subset.py", src, record()).expect("parse");
    assert_eq!(parsed.diagnostics.len(), 1, "{:#?}", parsed.diagnostics);
    let children = parsed.arena.children(parsed.root);
    assert_eq!(children.len(), 2);
    assert!(matches!(parsed.arena.kind(children[0]), NodeKind::ErrorStmt));
    assert!(matches!(parsed.arena.kind(children[1]), NodeKind::Assign));
}

#[test]
fn empty_and_whitespace_modules_parse_to_empty_trees() {
    for src in ["", "\n", "   \n\n# only a comment\n"] {
        let parsed = parse_module("empty.py", src, ParseOptions::default()).expect("parse");
        assert!(parsed.diagnostics.is_empty(), "source {src:?}");
        assert!(parsed.arena.children(parsed.root).is_empty(), "source {src:?}");
        assert_eq!(
            parsed.tokens.last().map(|token| token.kind),
            Some(TokKind::EndMarker),
            "source {src:?}"
        );
    }
}
