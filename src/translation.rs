use std::borrow::Cow;

/// Legacy placeholder token emitted by older grammar code: a question mark wrapped in quotes.
pub const QUOTED_QMARK: &str = "'?'";

/// Positional-parameter marker convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// Generic `?` markers, bound in order of appearance.
    Qmark,
    /// SQL Server / TDS markers `@P1`, `@P2`, ...
    Mssql,
}

/// Rewrite the generic placeholder convention into `target`.
///
/// The quoted `'?'` token is first reduced to a bare `?`, then (for
/// [`PlaceholderStyle::Mssql`]) every `?` outside string literals, quoted
/// identifiers and comments is numbered in order of appearance. Explicitly
/// numbered `?N` markers keep their number.
///
/// Returns a borrowed `Cow` when no changes are needed.
#[must_use]
pub fn normalize_placeholders(sql: &str, target: PlaceholderStyle) -> Cow<'_, str> {
    let unquoted = if sql.contains(QUOTED_QMARK) {
        Cow::Owned(sql.replace(QUOTED_QMARK, "?"))
    } else {
        Cow::Borrowed(sql)
    };

    match target {
        PlaceholderStyle::Qmark => unquoted,
        PlaceholderStyle::Mssql => match number_qmarks(&unquoted) {
            Some(rewritten) => Cow::Owned(rewritten),
            None => unquoted,
        },
    }
}

/// Count the positional markers `sql` would bind after normalization.
#[must_use]
pub fn count_placeholders(sql: &str) -> usize {
    let unquoted = sql.replace(QUOTED_QMARK, "?");
    let mut count = 0;
    scan(&unquoted, |_, _| {
        count += 1;
        None
    });
    count
}

fn number_qmarks(sql: &str) -> Option<String> {
    let mut next = 0usize;
    scan(sql, |_, explicit| {
        next += 1;
        Some(format!("@P{}", explicit.unwrap_or(next)))
    })
}

/// Walk `sql`, calling `on_marker(offset, explicit_number)` for every `?` in
/// code position. Returns the rewritten text if any callback produced a replacement.
fn scan<F>(sql: &str, mut on_marker: F) -> Option<String>
where
    F: FnMut(usize, Option<usize>) -> Option<String>,
{
    let bytes = sql.as_bytes();
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'[' => state = State::Bracketed,
                b'-' if bytes.get(idx + 1) == Some(&b'-') => {
                    state = State::LineComment;
                    idx += 1;
                }
                b'/' if bytes.get(idx + 1) == Some(&b'*') => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'?' => {
                    let (digits_end, explicit) = match scan_digits(bytes, idx + 1) {
                        Some((end, digits)) => (end, digits.parse::<usize>().ok()),
                        None => (idx + 1, None),
                    };
                    if let Some(replacement) = on_marker(idx, explicit) {
                        let buf = out.get_or_insert_with(|| String::with_capacity(sql.len() + 8));
                        buf.push_str(&sql[copied..idx]);
                        buf.push_str(&replacement);
                        copied = digits_end;
                    }
                    idx = digits_end - 1;
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::Bracketed => {
                if b == b']' {
                    if bytes.get(idx + 1) == Some(&b']') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if b == b'/' && bytes.get(idx + 1) == Some(&b'*') {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if b == b'*' && bytes.get(idx + 1) == Some(&b'/') {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
        }
        idx += 1;
    }

    out.map(|mut buf| {
        buf.push_str(&sql[copied..]);
        buf
    })
}

#[derive(Clone, Copy)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    Bracketed,
    LineComment,
    BlockComment(u32),
}

fn scan_digits(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    let mut idx = start;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    if idx == start {
        None
    } else {
        std::str::from_utf8(&bytes[start..idx])
            .ok()
            .map(|digits| (idx, digits))
    }
}
