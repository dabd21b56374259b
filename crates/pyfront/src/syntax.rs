pub const KEYWORDS: &[&str] = &[
    "and",
    "as",
    "assert",
    "break",
    "class",
    "continue",
    "def",
    "del",
    "elif",
    "else",
    "except",
    "exec",
    "finally",
    "for",
    "from",
    "global",
    "if",
    "import",
    "in",
    "is",
    "lambda",
    "not",
    "or",
    "pass",
    "print",
    "raise",
    "return",
    "try",
    "while",
    "with",
    "yield",
];

pub const SYMBOLS_3: &[([char; 3], &str)] = &[
    (['*', '*', '='], "**="),
    (['/', '/', '='], "//="),
    (['<', '<', '='], "<<="),
    (['>', '>', '='], ">>="),
    (['.', '.', '.'], "..."),
];

pub const SYMBOLS_2: &[([char; 2], &str)] = &[
    (['*', '*'], "**"),
    (['/', '/'], "//"),
    (['<', '<'], "<<"),
    (['>', '>'], ">>"),
    (['<', '='], "<="),
    (['>', '='], ">="),
    (['=', '='], "=="),
    (['!', '='], "!="),
    (['<', '>'], "<>"),
    (['+', '='], "+="),
    (['-', '='], "-="),
    (['*', '='], "*="),
    (['/', '='], "/="),
    (['%', '='], "%="),
    (['&', '='], "&="),
    (['|', '='], "|="),
    (['^', '='], "^="),
];

pub const SYMBOLS_1: &[char] = &[
    '(', ')', '[', ']', '{', '}', ',', ':', '.', ';', '@', '=', '+', '-', '*', '/', '%', '&',
    '|', '^', '~', '<', '>', '`',
];

pub fn is_keyword(text: &str) -> bool {
    KEYWORDS.contains(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_cover_statement_heads() {
        for kw in ["def", "class", "print", "lambda", "yield", "del"] {
            assert!(is_keyword(kw), "{kw} missing from keyword table");
        }
        assert!(!is_keyword("None"));
        assert!(!is_keyword("self"));
    }

    #[test]
    fn symbol_tables_prefer_longest_match() {
        for (needle, text) in SYMBOLS_3 {
            assert_eq!(needle.iter().collect::<String>(), *text);
        }
        for (needle, text) in SYMBOLS_2 {
            assert_eq!(needle.iter().collect::<String>(), *text);
        }
    }
}
