//! Content-Disposition header parsing (filename and filename*).

/// Extracts the filename parameter from a raw Content-Disposition header value.
///
/// Supports `filename="value"` (quoted, backslash escapes undone),
/// `filename=value` (token), and `filename*=UTF-8''percent-encoded` (RFC 5987).
/// `filename*` wins when both are present. The value is returned as sent;
/// path components are dealt with by `resolve_filename`.
pub fn parse_content_disposition_filename(header_value: &str) -> Option<String> {
    let mut plain: Option<String> = None;

    for param in split_params(header_value) {
        let Some((name, value)) = param.split_once('=') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim();

        match name.as_str() {
            "filename*" => {
                if let Some(decoded) = decode_ext_value(value) {
                    return Some(decoded);
                }
            }
            "filename" => {
                let v = unquote(value);
                if !v.is_empty() {
                    plain = Some(v);
                }
            }
            _ => {}
        }
    }

    plain
}

/// Splits on `;` outside of quoted strings.
fn split_params(value: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut begin = 0;
    for (i, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                out.push(value[begin..i].trim());
                begin = i + 1;
            }
            _ => {}
        }
    }
    out.push(value[begin..].trim());
    out
}

/// Decodes `charset'lang'pct-encoded`. Only UTF-8 and ISO-8859-1 charsets are accepted.
fn decode_ext_value(value: &str) -> Option<String> {
    let mut parts = value.splitn(3, '\'');
    let charset = parts.next()?;
    let _lang = parts.next()?;
    let encoded = parts.next()?;
    if !charset.eq_ignore_ascii_case("utf-8") && !charset.eq_ignore_ascii_case("iso-8859-1") {
        return None;
    }
    let decoded = percent_decode(encoded);
    if decoded.is_empty() {
        None
    } else {
        Some(decoded)
    }
}

fn unquote(v: &str) -> String {
    if v.len() >= 2 && v.starts_with('"') && v.ends_with('"') {
        decode_quoted(&v[1..v.len() - 1])
    } else {
        v.to_string()
    }
}

/// Undo backslash escapes inside a quoted-string.
fn decode_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Lossy percent-decoding; malformed escapes are kept verbatim.
pub(super) fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(h), Some(l)) = (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                out.push(h << 4 | l);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
