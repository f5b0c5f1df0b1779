//! Defense-in-depth scan of rendered SQL for destructive keywords.
//!
//! This is a last-resort blacklist, not the primary protection: values are
//! parameterized and identifiers are quoted or validated before any text
//! reaches this scan. The scan rejects statements carrying administrative
//! or transaction-control keywords that the statement builders never emit.

use crate::error::{SqlError, SqlResult};
use crate::fragment::Fragment;
use regex::Regex;
use std::sync::LazyLock;

/// Tokens that may not appear in rendered SQL, matched case-insensitively
/// on word boundaries.
pub const FORBIDDEN_TOKENS: [&str; 12] = [
    "drop",
    "truncate",
    "alter",
    "grant",
    "revoke",
    "commit",
    "rollback",
    "savepoint",
    "replace",
    "rename",
    "--",
    ";",
];

static FORBIDDEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = FORBIDDEN_TOKENS
        .iter()
        .map(|token| regex::escape(token))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)).expect("forbidden-token pattern")
});

/// Scan rendered SQL text, rejecting it if any forbidden token appears.
pub fn validate_text(sql: &str) -> SqlResult<()> {
    match FORBIDDEN_PATTERN.find(sql) {
        Some(found) => Err(SqlError::security(found.as_str().to_lowercase())),
        None => Ok(()),
    }
}

/// Scan a fragment's rendered SQL. Parameters are not scanned; bound
/// values never become SQL text.
pub fn validate(fragment: &Fragment) -> SqlResult<()> {
    validate_text(&fragment.to_sql())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::Param;

    #[test]
    fn accepts_ordinary_statements() {
        validate_text("SELECT * FROM users WHERE id = $1").unwrap();
        validate_text("UPDATE users SET name = $1 WHERE id = $2").unwrap();
        validate_text("INSERT INTO logs (message) VALUES ($1)").unwrap();
    }

    #[test]
    fn rejects_destructive_keywords_case_insensitively() {
        assert!(validate_text("DROP TABLE users").unwrap_err().is_security());
        assert!(validate_text("drop table users").unwrap_err().is_security());
        assert!(validate_text("TrUnCaTe users").unwrap_err().is_security());
        assert!(validate_text("GRANT ALL ON users TO bob").unwrap_err().is_security());
    }

    #[test]
    fn reports_the_matched_token() {
        let err = validate_text("SELECT 1; ALTER TABLE users").unwrap_err();
        match err {
            SqlError::Security(token) => assert_eq!(token, "alter"),
            other => panic!("expected security error, got {other:?}"),
        }
    }

    #[test]
    fn matches_whole_words_only() {
        // "dropped" and "alteration" contain forbidden substrings but are
        // distinct words.
        validate_text("SELECT * FROM dropped_items").unwrap();
        validate_text("SELECT alteration FROM audits").unwrap();
    }

    #[test]
    fn bound_values_are_not_scanned() {
        let mut f = Fragment::raw("SELECT * FROM notes WHERE body = ");
        f.push_param(Param::new("please DROP TABLE users"));
        validate(&f).unwrap();
    }

    #[test]
    fn rejects_rollback_and_commit_control() {
        assert!(validate_text("ROLLBACK").unwrap_err().is_security());
        assert!(validate_text("COMMIT WORK").unwrap_err().is_security());
        assert!(validate_text("SAVEPOINT sp1").unwrap_err().is_security());
    }
}
