//! Identifier quoting and validation.
//!
//! Postgres does not allow parameterizing identifiers, so dynamic schema,
//! table, and column names go through one of two gates before reaching SQL
//! text: [`quote`] wraps each dot-separated segment in double quotes with
//! embedded quotes doubled, and [`check`] validates a bare identifier path
//! against `[A-Za-z_][A-Za-z0-9_]*` without quoting it.

use crate::error::{SqlError, SqlResult};

/// Quote an identifier path for safe splicing into SQL text.
///
/// Each `.`-separated segment is trimmed, stripped of one pre-existing pair
/// of surrounding double quotes, has remaining double quotes doubled, and is
/// wrapped in double quotes. Empty input or an empty segment is an error.
pub fn quote(name: &str) -> SqlResult<String> {
    if name.trim().is_empty() {
        return Err(SqlError::validation("empty identifier"));
    }

    let mut out = String::new();
    for (i, segment) in name.split('.').enumerate() {
        let mut segment = segment.trim();
        if segment.len() >= 2 && segment.starts_with('"') && segment.ends_with('"') {
            segment = &segment[1..segment.len() - 1];
        }
        if segment.is_empty() {
            return Err(SqlError::validation(format!(
                "invalid identifier '{}': empty segment",
                name
            )));
        }

        if i > 0 {
            out.push('.');
        }
        out.push('"');
        for ch in segment.chars() {
            if ch == '"' {
                out.push('"');
            }
            out.push(ch);
        }
        out.push('"');
    }
    Ok(out)
}

/// Validate a bare identifier path without quoting it.
///
/// Used for column references that are rendered as-is inside predicates,
/// ORDER BY items, and SET assignments. Each `.`-separated segment must
/// match `[A-Za-z_][A-Za-z0-9_]*`.
pub fn check(name: &str) -> SqlResult<()> {
    if name.is_empty() {
        return Err(SqlError::validation("empty identifier"));
    }

    for segment in name.split('.') {
        let mut chars = segment.chars();
        let first_ok = chars
            .next()
            .is_some_and(|c| c == '_' || c.is_ascii_alphabetic());
        if !first_ok || !chars.all(|c| c == '_' || c.is_ascii_alphanumeric()) {
            return Err(SqlError::validation(format!(
                "invalid identifier '{}'",
                name
            )));
        }
    }
    Ok(())
}
