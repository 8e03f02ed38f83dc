//! Decoding of quoted names and specifiers.

use thiserror::Error;

/// A malformed escape; `offset` is relative to the start of the raw literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub(crate) struct UnescapeError {
    pub offset: usize,
    pub reason: &'static str,
}

/// Decodes a raw literal. Unquoted input (identifiers) is returned as-is.
pub(crate) fn decode(raw: &[char]) -> Result<String, UnescapeError> {
    match raw {
        [q, body @ .., last] if (*q == '"' || *q == '\'') && q == last => unescape(body, 1),
        _ => Ok(raw.iter().collect()),
    }
}

fn unescape(body: &[char], base: usize) -> Result<String, UnescapeError> {
    let mut out = String::with_capacity(body.len());
    let mut i = 0;
    while i < body.len() {
        let ch = body[i];
        i += 1;
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let at = base + i - 1;
        let fail = |reason| UnescapeError { offset: at, reason };
        let Some(&esc) = body.get(i) else {
            return Err(fail("dangling backslash"));
        };
        i += 1;
        match esc {
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\u{b}'),
            '0'..='7' => {
                // \0 alone is NUL; anything longer is a legacy octal escape
                let max_len = if esc <= '3' { 3 } else { 2 };
                let mut value = esc.to_digit(8).unwrap_or(0);
                let mut len = 1;
                while len < max_len {
                    match body.get(i).and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            i += 1;
                            len += 1;
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(value).ok_or_else(|| fail("invalid octal escape"))?);
            }
            'x' => {
                let value = hex_digits(body, i, 2).ok_or_else(|| fail("invalid hexadecimal escape"))?;
                i += 2;
                out.push(char::from_u32(value).ok_or_else(|| fail("invalid hexadecimal escape"))?);
            }
            'u' => {
                let (unit, next) = unicode_escape(body, i).ok_or_else(|| fail("invalid unicode escape"))?;
                i = next;
                let code = match unit {
                    0xD800..=0xDBFF => {
                        let low = (body.get(i) == Some(&'\\') && body.get(i + 1) == Some(&'u'))
                            .then(|| unicode_escape(body, i + 2))
                            .flatten()
                            .filter(|(low, _)| (0xDC00..=0xDFFF).contains(low));
                        let Some((low, after)) = low else {
                            return Err(fail("unpaired surrogate"));
                        };
                        i = after;
                        0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00)
                    }
                    0xDC00..=0xDFFF => return Err(fail("unpaired surrogate")),
                    other => other,
                };
                out.push(char::from_u32(code).ok_or_else(|| fail("invalid unicode escape"))?);
            }
            '\r' => {
                if body.get(i) == Some(&'\n') {
                    i += 1;
                }
            }
            '\n' | '\u{2028}' | '\u{2029}' => {}
            other => out.push(other),
        }
    }
    Ok(out)
}

fn hex_digits(body: &[char], at: usize, count: usize) -> Option<u32> {
    let digits = body.get(at..at + count)?;
    digits.iter().try_fold(0u32, |acc, c| Some(acc * 16 + c.to_digit(16)?))
}

/// Parses the part after `\u`: `XXXX` or `{X...}`. Returns the value and the next index.
fn unicode_escape(body: &[char], at: usize) -> Option<(u32, usize)> {
    if body.get(at) != Some(&'{') {
        return hex_digits(body, at, 4).map(|v| (v, at + 4));
    }
    let close = at + 1 + body[at + 1..].iter().position(|&c| c == '}')?;
    if close == at + 1 {
        return None;
    }
    let mut value: u32 = 0;
    for c in &body[at + 1..close] {
        value = value.checked_mul(16)?.checked_add(c.to_digit(16)?)?;
        if value > 0x10FFFF {
            return None;
        }
    }
    Some((value, close + 1))
}
