/// 1-based (line, column) of a byte offset, counting columns in characters.
/// Lines are split on `\n` only, the same way the classifier splits script text.
pub fn line_col(script: &str, offset: usize) -> (usize, usize) {
    let head = &script[..offset.min(script.len())];
    let line_start = head.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line = head.matches('\n').count() + 1;
    let column = head[line_start..].chars().count() + 1;
    (line, column)
}

/// Resolve the escape sequences of a string literal body.
pub fn unescape_string(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') => out.push('\0'),
            Some('x') => out.push(read_hex_escape(&mut chars, 2)?),
            Some('u') => out.push(read_hex_escape(&mut chars, 4)?),
            Some(other) => out.push(other),
            None => return Err("dangling escape at end of string".to_string()),
        }
    }
    Ok(out)
}

fn read_hex_escape(chars: &mut std::str::Chars<'_>, digits: usize) -> Result<char, String> {
    let hex: String = chars.by_ref().take(digits).collect();
    if hex.len() != digits {
        return Err(format!("incomplete hex escape '{}'", hex));
    }
    let code = u32::from_str_radix(&hex, 16).map_err(|e| format!("bad hex escape '{}': {}", hex, e))?;
    // Lone surrogates cannot live in a Rust string.
    Ok(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
}
