//! Relaxed parser for legacy stored-code payloads.
//!
//! Older records stored generated code as a dictionary literal rather than
//! JSON: single-quoted strings, `True`/`False`/`None`, tuples, trailing
//! commas. This parser accepts that syntax (and plain JSON) and produces a
//! `serde_json::Value`.

use serde_json::{Map, Number, Value};

/// Error from [`parse_literal`], with the character offset it occurred at.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("literal syntax error at {pos}: {msg}")]
pub struct LiteralError {
    pub pos: usize,
    pub msg: String,
}

/// Deepest container nesting accepted.
pub const MAX_DEPTH: usize = 128;

fn err<T>(pos: usize, msg: impl Into<String>) -> Result<T, LiteralError> {
    Err(LiteralError {
        pos,
        msg: msg.into(),
    })
}

/// Parses a complete literal. Trailing non-whitespace is an error.
pub fn parse_literal(input: &str) -> Result<Value, LiteralError> {
    let chars: Vec<char> = input.chars().collect();
    let pos = skip_ws(&chars, 0);
    let (value, pos) = parse_value(&chars, pos, 0)?;
    let pos = skip_ws(&chars, pos);
    if pos != chars.len() {
        return err(pos, "trailing characters");
    }
    Ok(value)
}

fn skip_ws(data: &[char], mut pos: usize) -> usize {
    while pos < data.len() && data[pos].is_whitespace() {
        pos += 1;
    }
    pos
}

fn parse_value(data: &[char], pos: usize, depth: usize) -> Result<(Value, usize), LiteralError> {
    let Some(&c) = data.get(pos) else {
        return err(pos, "unexpected end of input");
    };
    if matches!(c, '{' | '[' | '(') && depth >= MAX_DEPTH {
        return err(pos, format!("nesting deeper than {MAX_DEPTH}"));
    }

    match c {
        '{' => parse_dict(data, pos + 1, depth + 1),
        '[' => parse_seq(data, pos + 1, ']', depth + 1),
        '(' => parse_seq(data, pos + 1, ')', depth + 1),
        '\'' | '"' => {
            let (s, pos) = parse_string(data, pos)?;
            Ok((Value::String(s), pos))
        }
        // Unicode string prefix.
        'u' | 'U' if matches!(data.get(pos + 1), Some('\'' | '"')) => {
            let (s, pos) = parse_string(data, pos + 1)?;
            Ok((Value::String(s), pos))
        }
        '-' | '+' | '0'..='9' => parse_number(data, pos),
        _ => parse_keyword(data, pos),
    }
}

fn parse_dict(
    data: &[char],
    mut pos: usize,
    depth: usize,
) -> Result<(Value, usize), LiteralError> {
    let mut map = Map::new();

    loop {
        pos = skip_ws(data, pos);
        match data.get(pos) {
            None => return err(pos, "unterminated dict"),
            Some('}') => return Ok((Value::Object(map), pos + 1)),
            Some(_) => {}
        }

        let key_pos = pos;
        let (key, new_pos) = parse_value(data, pos, depth)?;
        let key = match key {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => (if b { "True" } else { "False" }).to_string(),
            _ => return err(key_pos, "unsupported dict key"),
        };

        pos = skip_ws(data, new_pos);
        if data.get(pos) != Some(&':') {
            return err(pos, "expected ':'");
        }
        pos = skip_ws(data, pos + 1);

        let (value, new_pos) = parse_value(data, pos, depth)?;
        map.insert(key, value);

        pos = skip_ws(data, new_pos);
        match data.get(pos) {
            Some(',') => pos += 1,
            Some('}') => return Ok((Value::Object(map), pos + 1)),
            _ => return err(pos, "expected ',' or '}'"),
        }
    }
}

fn parse_seq(
    data: &[char],
    mut pos: usize,
    close: char,
    depth: usize,
) -> Result<(Value, usize), LiteralError> {
    let mut items = Vec::new();

    loop {
        pos = skip_ws(data, pos);
        match data.get(pos) {
            None => return err(pos, "unterminated sequence"),
            Some(&c) if c == close => return Ok((Value::Array(items), pos + 1)),
            Some(_) => {}
        }

        let (value, new_pos) = parse_value(data, pos, depth)?;
        items.push(value);

        pos = skip_ws(data, new_pos);
        match data.get(pos) {
            Some(',') => pos += 1,
            Some(&c) if c == close => return Ok((Value::Array(items), pos + 1)),
            _ => return err(pos, format!("expected ',' or '{close}'")),
        }
    }
}

fn parse_string(data: &[char], start: usize) -> Result<(String, usize), LiteralError> {
    let quote = data[start];
    let mut out = String::new();
    let mut pos = start + 1;

    while let Some(&c) = data.get(pos) {
        pos += 1;
        if c == quote {
            return Ok((out, pos));
        }
        if c != '\\' {
            out.push(c);
            continue;
        }

        let Some(&esc) = data.get(pos) else {
            break;
        };
        pos += 1;
        match esc {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0'..='7' => {
                let (ch, new_pos) = parse_octal_escape(data, pos - 1);
                out.push(ch);
                pos = new_pos;
            }
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            '\\' | '\'' | '"' | '/' => out.push(esc),
            // Escaped newline is a line continuation.
            '\n' => {}
            'x' => {
                let (ch, new_pos) = parse_hex_escape(data, pos, 2)?;
                out.push(ch);
                pos = new_pos;
            }
            'u' => {
                let (ch, new_pos) = parse_unicode_escape(data, pos)?;
                out.push(ch);
                pos = new_pos;
            }
            'U' => {
                let (ch, new_pos) = parse_hex_escape(data, pos, 8)?;
                out.push(ch);
                pos = new_pos;
            }
            other => {
                // Unknown escapes are kept verbatim.
                out.push('\\');
                out.push(other);
            }
        }
    }

    err(start, "unterminated string")
}

/// Up to three octal digits starting at `pos`.
fn parse_octal_escape(data: &[char], pos: usize) -> (char, usize) {
    let mut code = 0u32;
    let mut end = pos;
    while end < pos + 3 && data.get(end).is_some_and(|c| matches!(c, '0'..='7')) {
        code = code * 8 + (data[end] as u32 - '0' as u32);
        end += 1;
    }
    // At most 0o777, always a valid scalar value.
    (char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER), end)
}

fn read_hex(data: &[char], pos: usize, digits: usize) -> Result<u32, LiteralError> {
    if pos + digits > data.len() {
        return err(pos, "truncated escape");
    }
    let hex: String = data[pos..pos + digits].iter().collect();
    u32::from_str_radix(&hex, 16).or_else(|_| err(pos, format!("bad hex escape {hex:?}")))
}

fn parse_hex_escape(
    data: &[char],
    pos: usize,
    digits: usize,
) -> Result<(char, usize), LiteralError> {
    let code = read_hex(data, pos, digits)?;
    let ch = char::from_u32(code).ok_or(LiteralError {
        pos,
        msg: format!("invalid code point {code:#x}"),
    })?;
    Ok((ch, pos + digits))
}

/// `\uXXXX`, combining a following low surrogate when JSON-style pairs occur.
fn parse_unicode_escape(data: &[char], pos: usize) -> Result<(char, usize), LiteralError> {
    let hi = read_hex(data, pos, 4)?;
    if (0xD800..0xDC00).contains(&hi)
        && data.get(pos + 4) == Some(&'\\')
        && data.get(pos + 5) == Some(&'u')
    {
        let lo = read_hex(data, pos + 6, 4)?;
        if (0xDC00..0xE000).contains(&lo) {
            let code = 0x10000 + ((hi - 0xD800) << 10) + (lo - 0xDC00);
            if let Some(ch) = char::from_u32(code) {
                return Ok((ch, pos + 10));
            }
        }
    }
    let ch = char::from_u32(hi).unwrap_or(char::REPLACEMENT_CHARACTER);
    Ok((ch, pos + 4))
}

fn parse_number(data: &[char], start: usize) -> Result<(Value, usize), LiteralError> {
    let mut pos = start;
    if matches!(data.get(pos), Some('-' | '+')) {
        pos += 1;
    }
    while let Some(&c) = data.get(pos) {
        if c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '_') {
            pos += 1;
        } else if matches!(c, '+' | '-') && matches!(data.get(pos - 1), Some('e' | 'E')) {
            pos += 1;
        } else {
            break;
        }
    }

    let text: String = data[start..pos].iter().filter(|c| **c != '_').collect();
    let text = text.strip_prefix('+').unwrap_or(&text);

    if let Ok(i) = text.parse::<i64>() {
        return Ok((Value::Number(i.into()), pos));
    }
    match text.parse::<f64>().ok().and_then(Number::from_f64) {
        Some(n) => Ok((Value::Number(n), pos)),
        None => err(start, format!("invalid number {text:?}")),
    }
}

fn parse_keyword(data: &[char], start: usize) -> Result<(Value, usize), LiteralError> {
    let mut pos = start;
    while data
        .get(pos)
        .is_some_and(|c| c.is_ascii_alphanumeric() || *c == '_')
    {
        pos += 1;
    }
    let word: String = data[start..pos].iter().collect();

    let value = match word.as_str() {
        "True" | "true" => Value::Bool(true),
        "False" | "false" => Value::Bool(false),
        "None" | "null" => Value::Null,
        "" => return err(start, format!("unexpected character {:?}", data[start])),
        other => return err(start, format!("unknown identifier {other:?}")),
    };
    Ok((value, pos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_single_quoted_dict() {
        let v = parse_literal("{'App.tsx': 'export default App;', 'components': {}}").unwrap();
        assert_eq!(
            v,
            json!({"App.tsx": "export default App;", "components": {}})
        );
    }

    #[test]
    fn parses_escapes_and_mixed_quotes() {
        let v = parse_literal(r#"{'a': 'it\'s\n', "b": "say \"hi\"", 'c': 'tab\there'}"#).unwrap();
        assert_eq!(v["a"], "it's\n");
        assert_eq!(v["b"], "say \"hi\"");
        assert_eq!(v["c"], "tab\there");
    }

    #[test]
    fn parses_capitalized_keywords_and_tuples() {
        let v = parse_literal("{'x': True, 'y': None, 'z': (1, 2.5, -3,), 'w': False}").unwrap();
        assert_eq!(v, json!({"x": true, "y": null, "z": [1, 2.5, -3], "w": false}));
    }

    #[test]
    fn parses_trailing_commas_and_whitespace() {
        let v = parse_literal("  {\n 'a': [1, 2,],\n 'b': {'c': 'd',},\n}  ").unwrap();
        assert_eq!(v, json!({"a": [1, 2], "b": {"c": "d"}}));
    }

    #[test]
    fn parses_unicode_escapes() {
        let v = parse_literal(r"{'rocket': '\U0001f680', 'e': '\xe9', 'pair': '🚀'}")
            .unwrap();
        assert_eq!(v["rocket"], "🚀");
        assert_eq!(v["e"], "é");
        assert_eq!(v["pair"], "🚀");
    }

    #[test]
    fn parses_u_prefixed_strings() {
        let v = parse_literal("{u'App.tsx': u'x'}").unwrap();
        assert_eq!(v, json!({"App.tsx": "x"}));
    }

    #[test]
    fn accepts_plain_json() {
        let v = parse_literal(r#"{"a": [true, null, 1e3]}"#).unwrap();
        assert_eq!(v["a"][0], true);
        assert!(v["a"][1].is_null());
        assert_eq!(v["a"][2].as_f64(), Some(1000.0));
    }

    #[test]
    fn parses_octal_escapes() {
        let v = parse_literal(r"{'nl': 'a\012b', 'nul': '\0', 'e': '\351', 'short': '\7x'}")
            .unwrap();
        assert_eq!(v["nl"], "a\nb");
        assert_eq!(v["nul"], "\0");
        assert_eq!(v["e"], "é");
        assert_eq!(v["short"], "\u{7}x");
    }

    #[test]
    fn nesting_is_bounded() {
        let ok = format!("{}{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        assert!(parse_literal(&ok).is_ok());

        let deep = format!("{}{}", "[".repeat(MAX_DEPTH + 1), "]".repeat(MAX_DEPTH + 1));
        let e = parse_literal(&deep).unwrap_err();
        assert_eq!(e.pos, MAX_DEPTH);
        assert!(e.msg.contains("nesting"));

        assert!(parse_literal(&"[".repeat(100_000)).is_err());
        assert!(parse_literal(&"{'a': ".repeat(100_000)).is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_literal("").is_err());
        assert!(parse_literal("not a literal").is_err());
        assert!(parse_literal("{'a': 'unterminated}").is_err());
        assert!(parse_literal("{'a' 'b'}").is_err());
        assert!(parse_literal("{'a': 1} extra").is_err());
        assert!(parse_literal("{[1]: 2}").is_err());
    }

    #[test]
    fn error_reports_position() {
        let e = parse_literal("{'a': @}").unwrap_err();
        assert_eq!(e.pos, 6);
    }
}
