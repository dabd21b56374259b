use num_bigint::BigInt;
use num_complex::Complex64;
use num_traits::ToPrimitive;

use crate::ast::{Num, Str};

/// Declared source encoding for non-unicode string literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceEncoding {
    #[default]
    Utf8,
    Latin1,
}

/// Decodes a numeric literal as captured by the lexer: radix prefixes,
/// the `L` long suffix, floats with exponents, and `j` imaginaries.
pub fn decode_number(text: &str) -> Result<Num, String> {
    if let Some(body) = strip_suffix_ci(text, 'j') {
        let value: f64 = parse_float(body)?;
        return Ok(Num::Complex(Complex64::new(0.0, value)));
    }
    if let Some(body) = strip_suffix_ci(text, 'l') {
        let (digits, radix) = split_radix(body);
        let value = BigInt::parse_bytes(digits.as_bytes(), radix)
            .ok_or_else(|| format!("invalid number literal '{text}'"))?;
        return Ok(Num::Long(value));
    }
    if is_float_text(text) {
        return Ok(Num::Float(parse_float(text)?));
    }

    let (digits, radix) = split_radix(text);
    let value = BigInt::parse_bytes(digits.as_bytes(), radix)
        .ok_or_else(|| format!("invalid number literal '{text}'"))?;
    // Wide literals become longs without looking at the value; the digit
    // count is checked after stripping leading zeros.
    let significant = digits.trim_start_matches('0').len();
    if significant > 11 {
        return Ok(Num::Long(value));
    }
    match value.to_i32() {
        Some(v) => Ok(Num::Int(v)),
        None => Ok(Num::Long(value)),
    }
}

/// Decodes a string literal as captured by the lexer, prefix and quotes
/// included. `u`/`U` selects the unicode constructor, `r`/`R` suppresses
/// escape processing (except `\uXXXX` forms in `ur` strings), and `b`/`B`
/// is accepted as an alias for the plain byte form.
pub fn decode_string(text: &str, encoding: SourceEncoding) -> Result<Str, String> {
    let (unicode, raw, rest) = split_prefix(text);
    let body = strip_quotes(rest);
    if unicode {
        if raw {
            decode_raw_unicode_escape(body).map(Str::Unicode)
        } else {
            decode_unicode_escapes(body).map(Str::Unicode)
        }
    } else {
        let bytes = encode_bytes(body, encoding)?;
        if raw {
            Ok(Str::Bytes(bytes))
        } else {
            decode_byte_escapes(&bytes).map(Str::Bytes)
        }
    }
}

/// True when the text carries a `u`/`U` prefix, looking at the literal
/// before any decoding.
pub fn is_unicode_literal(text: &str) -> bool {
    let (unicode, _, _) = split_prefix(text);
    unicode
}

fn strip_suffix_ci(text: &str, suffix: char) -> Option<&str> {
    let last = text.chars().last()?;
    if last.eq_ignore_ascii_case(&suffix) {
        Some(&text[..text.len() - 1])
    } else {
        None
    }
}

fn split_radix(text: &str) -> (&str, u32) {
    let bytes = text.as_bytes();
    if bytes.len() > 2 && bytes[0] == b'0' {
        match bytes[1] {
            b'x' | b'X' => return (&text[2..], 16),
            b'o' | b'O' => return (&text[2..], 8),
            b'b' | b'B' => return (&text[2..], 2),
            _ => {}
        }
    }
    if bytes.len() > 1 && bytes[0] == b'0' {
        return (text, 8);
    }
    (text, 10)
}

fn is_float_text(text: &str) -> bool {
    if text.starts_with("0x") || text.starts_with("0X") {
        return false;
    }
    text.contains('.') || text.contains('e') || text.contains('E')
}

fn parse_float(text: &str) -> Result<f64, String> {
    text.parse::<f64>()
        .map_err(|_| format!("invalid number literal '{text}'"))
}

fn split_prefix(text: &str) -> (bool, bool, &str) {
    let mut unicode = false;
    let mut raw = false;
    let mut index = 0;
    for ch in text.chars() {
        match ch {
            'u' | 'U' if !unicode && !raw => unicode = true,
            'b' | 'B' if !unicode && !raw => {}
            'r' | 'R' if !raw => raw = true,
            _ => break,
        }
        index += 1;
    }
    (unicode, raw, &text[index..])
}

fn strip_quotes(text: &str) -> &str {
    let chars: Vec<char> = text.chars().collect();
    let quote = match chars.first() {
        Some('\'') => '\'',
        Some('"') => '"',
        _ => return text,
    };
    let triple = chars.len() >= 3 && chars[1] == quote && chars[2] == quote;
    let open = if triple { 3 } else { 1 };
    let mut close = 0;
    // Unterminated literals reach us through recovery; strip only the
    // delimiters that are really there.
    if triple {
        if chars.len() >= 6 && chars[chars.len() - 3..] == [quote, quote, quote] {
            close = 3;
        }
    } else if chars.len() >= 2 && chars[chars.len() - 1] == quote {
        close = 1;
    }
    &text[open..text.len() - close]
}

fn encode_bytes(body: &str, encoding: SourceEncoding) -> Result<Vec<u8>, String> {
    match encoding {
        SourceEncoding::Utf8 => Ok(body.as_bytes().to_vec()),
        SourceEncoding::Latin1 => {
            let mut out = Vec::with_capacity(body.len());
            for ch in body.chars() {
                let code = ch as u32;
                if code > 0xFF {
                    return Err(format!(
                        "cannot encode character u+{code:04x} in declared latin-1 source"
                    ));
                }
                out.push(code as u8);
            }
            Ok(out)
        }
    }
}

fn decode_byte_escapes(bytes: &[u8]) -> Result<Vec<u8>, String> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        let byte = bytes[index];
        if byte != b'\\' {
            out.push(byte);
            index += 1;
            continue;
        }
        let Some(&next) = bytes.get(index + 1) else {
            out.push(b'\\');
            break;
        };
        index += 2;
        match next {
            b'\n' => {}
            b'\r' => {
                if bytes.get(index) == Some(&b'\n') {
                    index += 1;
                }
            }
            b'\\' => out.push(b'\\'),
            b'\'' => out.push(b'\''),
            b'"' => out.push(b'"'),
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'v' => out.push(0x0B),
            b'0'..=b'7' => {
                let mut value = u32::from(next - b'0');
                for _ in 0..2 {
                    match bytes.get(index) {
                        Some(&digit @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(digit - b'0');
                            index += 1;
                        }
                        _ => break,
                    }
                }
                out.push((value & 0xFF) as u8);
            }
            b'x' => {
                let hi = bytes.get(index).copied().and_then(hex_value);
                let lo = bytes.get(index + 1).copied().and_then(hex_value);
                match (hi, lo) {
                    (Some(hi), Some(lo)) => {
                        out.push((hi * 16 + lo) as u8);
                        index += 2;
                    }
                    _ => return Err("invalid \\x escape".to_string()),
                }
            }
            other => {
                out.push(b'\\');
                out.push(other);
            }
        }
    }
    Ok(out)
}

fn decode_unicode_escapes(body: &str) -> Result<String, String> {
    let chars: Vec<char> = body.chars().collect();
    let mut out = String::with_capacity(body.len());
    let mut index = 0;
    while index < chars.len() {
        let ch = chars[index];
        if ch != '\\' {
            out.push(ch);
            index += 1;
            continue;
        }
        let Some(&next) = chars.get(index + 1) else {
            out.push('\\');
            break;
        };
        index += 2;
        match next {
            '\n' => {}
            '\r' => {
                if chars.get(index) == Some(&'\n') {
                    index += 1;
                }
            }
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'a' => out.push('\u{7}'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\u{b}'),
            '0'..='7' => {
                let mut value = next.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.get(index).and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            index += 1;
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(value).unwrap_or('\u{fffd}'));
            }
            'x' => {
                let value = read_hex(&chars, &mut index, 2)
                    .ok_or_else(|| "invalid \\x escape".to_string())?;
                out.push(char::from_u32(value).unwrap_or('\u{fffd}'));
            }
            'u' => {
                let value = read_hex(&chars, &mut index, 4)
                    .ok_or_else(|| "malformed \\uXXXX escape".to_string())?;
                out.push(char::from_u32(value).ok_or("illegal unicode character escape")?);
            }
            'U' => {
                let value = read_hex(&chars, &mut index, 8)
                    .ok_or_else(|| "malformed \\UXXXXXXXX escape".to_string())?;
                out.push(char::from_u32(value).ok_or("illegal unicode character escape")?);
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    Ok(out)
}

/// `ur''` decoding: only `\uXXXX`/`\UXXXXXXXX` are escapes, and only when
/// preceded by an odd number of backslashes; everything else is verbatim.
fn decode_raw_unicode_escape(body: &str) -> Result<String, String> {
    let chars: Vec<char> = body.chars().collect();
    let mut out = String::with_capacity(body.len());
    let mut index = 0;
    while index < chars.len() {
        if chars[index] != '\\' {
            out.push(chars[index]);
            index += 1;
            continue;
        }
        let run_start = index;
        while index < chars.len() && chars[index] == '\\' {
            out.push('\\');
            index += 1;
        }
        let run = index - run_start;
        let escape = match chars.get(index) {
            Some('u') => Some(4),
            Some('U') => Some(8),
            _ => None,
        };
        if run % 2 == 1 {
            if let Some(width) = escape {
                out.pop();
                index += 1;
                let value = read_hex(&chars, &mut index, width)
                    .ok_or_else(|| "malformed \\uXXXX escape".to_string())?;
                out.push(char::from_u32(value).ok_or("illegal unicode character escape")?);
            }
        }
    }
    Ok(out)
}

fn read_hex(chars: &[char], index: &mut usize, width: usize) -> Option<u32> {
    let mut value = 0u32;
    for offset in 0..width {
        let digit = chars.get(*index + offset)?.to_digit(16)?;
        value = value * 16 + digit;
    }
    *index += width;
    Some(value)
}

fn hex_value(byte: u8) -> Option<u32> {
    (byte as char).to_digit(16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn num(text: &str) -> Num {
        decode_number(text).expect("valid literal")
    }

    fn uni(text: &str) -> String {
        match decode_string(text, SourceEncoding::Utf8).expect("valid literal") {
            Str::Unicode(s) => s,
            Str::Bytes(b) => panic!("expected unicode, got bytes {b:?}"),
        }
    }

    fn bytes(text: &str) -> Vec<u8> {
        match decode_string(text, SourceEncoding::Utf8).expect("valid literal") {
            Str::Bytes(b) => b,
            Str::Unicode(s) => panic!("expected bytes, got unicode {s:?}"),
        }
    }

    #[test]
    fn decimal_literals_fit_int() {
        assert_eq!(num("0"), Num::Int(0));
        assert_eq!(num("42"), Num::Int(42));
        assert_eq!(num("2147483647"), Num::Int(i32::MAX));
    }

    #[test]
    fn out_of_range_decimals_promote_to_long() {
        assert_eq!(num("2147483648"), Num::Long(BigInt::from(2147483648u64)));
        assert_eq!(
            num("99999999999"),
            Num::Long(BigInt::from(99999999999u64))
        );
    }

    #[test]
    fn wide_literals_promote_by_digit_count() {
        // 12 digits, value within i64 but past the digit heuristic.
        assert_eq!(
            num("000000000000"),
            Num::Int(0),
            "leading zeros must not count"
        );
        assert_eq!(
            num("100000000000"),
            Num::Long(BigInt::from(100000000000u64))
        );
    }

    #[test]
    fn radix_prefixes_select_the_base() {
        assert_eq!(num("0x1f"), Num::Int(31));
        assert_eq!(num("0X1F"), Num::Int(31));
        assert_eq!(num("0o17"), Num::Int(15));
        assert_eq!(num("0b101"), Num::Int(5));
        assert_eq!(num("0777"), Num::Int(511));
    }

    #[test]
    fn explicit_long_suffix_always_wins() {
        assert_eq!(num("7L"), Num::Long(BigInt::from(7)));
        assert_eq!(num("0xffL"), Num::Long(BigInt::from(255)));
        assert_eq!(num("010l"), Num::Long(BigInt::from(8)));
    }

    #[test]
    fn hex_out_of_i32_range_promotes() {
        assert_eq!(num("0x7fffffff"), Num::Int(i32::MAX));
        assert_eq!(num("0x80000000"), Num::Long(BigInt::from(0x80000000u64)));
    }

    #[test]
    fn floats_and_imaginaries() {
        assert_eq!(num("3.5"), Num::Float(3.5));
        assert_eq!(num(".5"), Num::Float(0.5));
        assert_eq!(num("1e3"), Num::Float(1000.0));
        assert_eq!(num("3.5e-2"), Num::Float(0.035));
        match num("2j") {
            Num::Complex(c) => {
                assert_eq!(c.re, 0.0);
                assert_eq!(c.im, 2.0);
            }
            other => panic!("expected complex, got {other:?}"),
        }
        match num("1.5J") {
            Num::Complex(c) => assert_eq!(c.im, 1.5),
            other => panic!("expected complex, got {other:?}"),
        }
    }

    #[test]
    fn invalid_octal_digits_are_rejected() {
        assert!(decode_number("08").is_err());
        assert!(decode_number("0x").is_err());
    }

    #[test]
    fn numeric_round_trip_through_decimal_rendering() {
        for text in ["0", "42", "2147483647", "2147483648", "123456789012345678901"] {
            let first = decode_number(text).expect("valid literal");
            let rendered = match &first {
                Num::Int(v) => v.to_string(),
                Num::Long(v) => format!("{v}L"),
                _ => unreachable!(),
            };
            let second = decode_number(&rendered).expect("re-decode");
            match (&first, &second) {
                (Num::Int(a), Num::Int(b)) => assert_eq!(a, b),
                (Num::Long(a), Num::Long(b)) => assert_eq!(a, b),
                other => panic!("constructor changed across round trip: {other:?}"),
            }
        }
    }

    #[test]
    fn plain_strings_decode_escapes_to_bytes() {
        assert_eq!(bytes("'a\\nb'"), b"a\nb".to_vec());
        assert_eq!(bytes("\"a\\tb\""), b"a\tb".to_vec());
        assert_eq!(bytes("'\\x41'"), b"A".to_vec());
        assert_eq!(bytes("'\\101'"), b"A".to_vec());
        assert_eq!(bytes("'\\777'"), vec![0xFF]);
    }

    #[test]
    fn raw_strings_keep_backslashes() {
        let decoded = bytes("r\"\"\"a\\nb\"\"\"");
        assert_eq!(decoded, b"a\\nb".to_vec());
        assert_eq!(decoded.len(), 4);
    }

    #[test]
    fn cooked_strings_shrink_escapes() {
        let decoded = bytes("\"a\\nb\"");
        assert_eq!(decoded.len(), 3);
    }

    #[test]
    fn unknown_escapes_keep_the_backslash() {
        assert_eq!(bytes("'\\q'"), b"\\q".to_vec());
        assert_eq!(uni("u'\\q'"), "\\q");
    }

    #[test]
    fn unicode_strings_decode_unicode_escapes() {
        assert_eq!(uni("u'\\u0041'"), "A");
        assert_eq!(uni("u'\\U00000042'"), "B");
        assert_eq!(uni("u'\\x41'"), "A");
        assert_eq!(uni("u'a\\nb'"), "a\nb");
    }

    #[test]
    fn raw_unicode_strings_only_decode_u_escapes() {
        assert_eq!(uni("ur'\\u0041'"), "A");
        assert_eq!(uni("ur'a\\nb'"), "a\\nb");
        assert_eq!(uni("ur'\\\\u0041'"), "\\\\u0041");
        assert_eq!(uni("ur'\\\\\\u0041'"), "\\\\A");
    }

    #[test]
    fn byte_strings_do_not_interpret_u_escapes() {
        assert_eq!(bytes("'\\u0041'"), b"\\u0041".to_vec());
    }

    #[test]
    fn line_continuations_vanish_in_cooked_strings() {
        assert_eq!(bytes("'a\\\nb'"), b"ab".to_vec());
        assert_eq!(uni("u'a\\\nb'"), "ab");
    }

    #[test]
    fn bytes_prefix_is_an_alias_for_plain() {
        assert_eq!(bytes("b'a\\nb'"), b"a\nb".to_vec());
        assert_eq!(bytes("br'a\\nb'"), b"a\\nb".to_vec());
    }

    #[test]
    fn triple_quotes_strip_cleanly() {
        assert_eq!(bytes("'''abc'''"), b"abc".to_vec());
        assert_eq!(bytes("\"\"\"a'b\"\"\""), b"a'b".to_vec());
        assert_eq!(uni("u'''multi\nline'''"), "multi\nline");
    }

    #[test]
    fn latin1_sources_reencode_string_bodies() {
        let decoded = decode_string("'caf\u{e9}'", SourceEncoding::Latin1).expect("valid");
        assert_eq!(decoded, Str::Bytes(vec![b'c', b'a', b'f', 0xE9]));
        let utf8 = decode_string("'caf\u{e9}'", SourceEncoding::Utf8).expect("valid");
        assert_eq!(utf8, Str::Bytes("caf\u{e9}".as_bytes().to_vec()));
    }

    #[test]
    fn latin1_cannot_carry_wide_characters() {
        assert!(decode_string("'\u{4e16}'", SourceEncoding::Latin1).is_err());
    }

    #[test]
    fn malformed_hex_escapes_error() {
        assert!(decode_string("'\\x4'", SourceEncoding::Utf8).is_err());
        assert!(decode_string("u'\\u12'", SourceEncoding::Utf8).is_err());
    }

    #[test]
    fn unicode_flag_detection_sees_prefixes() {
        assert!(is_unicode_literal("u'a'"));
        assert!(is_unicode_literal("UR'a'"));
        assert!(!is_unicode_literal("r'a'"));
        assert!(!is_unicode_literal("'a'"));
    }
}
