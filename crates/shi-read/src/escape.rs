//! String escape processing.
//!
//! The reader collects string literals verbatim (backslash pairs kept
//! intact) and hands the raw text here. Supported sequences are the usual
//! `\n \r \t \" \\` plus `\xHH` and `\uXXXX` code-point escapes; an
//! unknown escape passes its character through unchanged.

use shi_core::{raise, Result};

/// Replace escape sequences in a raw string-literal body
pub fn unescape(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let e = match chars.next() {
            Some(e) => e,
            None => raise!("Trailing backslash in string"),
        };
        match e {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            'x' => out.push(hex_escape(&mut chars, 2)?),
            'u' => out.push(hex_escape(&mut chars, 4)?),
            other => out.push(other),
        }
    }
    Ok(out)
}

fn hex_escape(chars: &mut std::str::Chars<'_>, digits: u32) -> Result<char> {
    let mut code: u32 = 0;
    for _ in 0..digits {
        let d = match chars.next().and_then(|c| c.to_digit(16)) {
            Some(d) => d,
            None => raise!("Invalid hex escape in string"),
        };
        code = code * 16 + d;
    }
    match char::from_u32(code) {
        Some(c) => Ok(c),
        None => raise!("Invalid code point in string escape"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_escapes() {
        assert_eq!(unescape(r#"a\nb\tc\r"#).unwrap(), "a\nb\tc\r");
        assert_eq!(unescape(r#"say \"hi\""#).unwrap(), "say \"hi\"");
        assert_eq!(unescape(r#"back\\slash"#).unwrap(), "back\\slash");
    }

    #[test]
    fn test_hex_and_unicode_escapes() {
        assert_eq!(unescape(r#"\x41\x42"#).unwrap(), "AB");
        assert_eq!(unescape("\\u00e9").unwrap(), "é");
        assert_eq!(unescape("\\u2603").unwrap(), "☃");
    }

    #[test]
    fn test_unknown_escape_passes_through() {
        assert_eq!(unescape(r#"\q"#).unwrap(), "q");
    }

    #[test]
    fn test_invalid_escapes() {
        assert!(unescape(r#"\x4"#).is_err());
        assert!(unescape(r#"\xzz"#).is_err());
        assert!(unescape(r#"\ud800"#).is_err());
        assert!(unescape("oops\\").is_err());
    }

    #[test]
    fn test_utf8_passthrough() {
        assert_eq!(unescape("héllo ☃").unwrap(), "héllo ☃");
    }
}
