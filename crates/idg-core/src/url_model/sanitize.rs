//! Filename resolution against a virtual root.

/// Linux NAME_MAX.
const NAME_MAX: usize = 255;

/// Resolves a filename candidate to a single safe path component.
///
/// Rejects a candidate that is empty, ends in `/`, or contains NUL. Otherwise
/// the candidate is cleaned as if rooted at `/` (`.` and `..` resolved, `..`
/// never escaping the root) and its last component is kept. Rejects a result
/// that is empty, `.`, or the root itself. Control characters and `\` are
/// replaced with `_` and the name is cut to `NAME_MAX` bytes.
pub fn resolve_filename(candidate: &str) -> Option<String> {
    if candidate.is_empty() || candidate.ends_with('/') || candidate.contains('\0') {
        return None;
    }

    let mut stack: Vec<&str> = Vec::new();
    for part in candidate.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }

    let base = stack.pop()?;
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_control() || c == '\\' { '_' } else { c })
        .collect();
    let cleaned = truncate_to_boundary(&cleaned, NAME_MAX);

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        None
    } else {
        Some(cleaned.to_string())
    }
}

fn truncate_to_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut take = max;
    while take > 0 && !s.is_char_boundary(take) {
        take -= 1;
    }
    &s[..take]
}
