//! Statement fragments: SQL text plus its ordered bound parameters.
//!
//! A [`Fragment`] stores SQL pieces and parameters separately and generates
//! `$1, $2, ...` placeholders automatically in the final SQL string, so
//! fragments can be composed without manually tracking placeholder indices.
//!
//! # Example
//!
//! ```ignore
//! use sqlmason::Fragment;
//!
//! let head = Fragment::raw("SELECT id, username FROM users");
//! let cond = Fragment::of("WHERE status = ?", vec![Param::new("active")])?;
//! let stmt = head.concat(cond);
//! assert_eq!(stmt.to_sql(), "SELECT id, username FROM users WHERE status = $1");
//! ```

use crate::client::SqlExecutor;
use crate::error::{SqlError, SqlResult};
use std::sync::Arc;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// A clone-friendly parameter wrapper using Arc.
///
/// This allows fragments to be cloned and recombined without copying
/// parameter values.
#[derive(Clone)]
pub struct Param(pub(crate) Arc<dyn ToSql + Send + Sync>);

impl Param {
    /// Create a new parameter from any ToSql value.
    pub fn new<T: ToSql + Send + Sync + 'static>(value: T) -> Self {
        Param(Arc::new(value))
    }

    /// Get a reference to the inner value as a ToSql trait object.
    pub fn as_sql_ref(&self) -> &(dyn ToSql + Sync) {
        // Arc<dyn ToSql + Send + Sync> -> &(dyn ToSql + Sync)
        &*self.0 as &(dyn ToSql + Sync)
    }
}

impl std::fmt::Debug for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Param").field(&"<dyn ToSql>").finish()
    }
}

/// Marks a string as trusted literal SQL rather than a bindable value.
///
/// Wrapping text in `SqlExpr` is an explicit opt-out of parameterization:
/// the text is spliced into the statement verbatim. Intended for database
/// functions like `NOW()` or `COUNT(*)`, never for user input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SqlExpr(String);

impl SqlExpr {
    /// Wrap raw SQL text as a literal expression.
    pub fn new(raw: impl Into<String>) -> Self {
        SqlExpr(raw.into())
    }

    /// The wrapped SQL text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SqlExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug)]
enum FragmentPart {
    Raw(String),
    Param,
}

/// A composable SQL statement fragment with positional parameters.
///
/// Raw text parts are never empty, so `is_empty()` means "renders to
/// nothing". Parameters bound without a placeholder (via [`Fragment::of`]
/// with pre-numbered SQL) ride along and surface in [`Fragment::params_ref`].
#[derive(Clone, Debug, Default)]
pub struct Fragment {
    parts: Vec<FragmentPart>,
    params: Vec<Param>,
}

impl Fragment {
    /// Create an empty fragment. Empty fragments are identity elements
    /// for [`Fragment::concat`] and are skipped by [`Fragment::join_all`].
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a fragment from raw SQL text with no parameters.
    /// Leading and trailing whitespace is trimmed.
    pub fn raw(text: impl Into<String>) -> Self {
        let text: String = text.into();
        let mut f = Self::empty();
        f.push(text.trim());
        f
    }

    /// Create a fragment from a `?`-placeholder template and its parameters.
    ///
    /// Each `?` in the template becomes the next positional placeholder.
    /// Parameters beyond the `?` count are carried without a placeholder,
    /// for templates that already contain `$1, $2, ...`; since parameters
    /// bind positionally, a fragment carrying such extras must not precede
    /// placeholder-bearing fragments in a [`Fragment::concat`] chain. A
    /// template with more `?` markers than parameters is rejected, as is
    /// an empty template with parameters.
    pub fn of(template: &str, params: Vec<Param>) -> SqlResult<Self> {
        let template = template.trim();
        if template.is_empty() && !params.is_empty() {
            return Err(SqlError::validation(
                "parameters supplied for an empty template",
            ));
        }
        let marker_count = template.matches('?').count();
        if marker_count > params.len() {
            return Err(SqlError::validation(format!(
                "template has {} placeholders but {} parameters",
                marker_count,
                params.len()
            )));
        }

        let mut f = Self::empty();
        let mut params = params.into_iter();
        for (i, segment) in template.split('?').enumerate() {
            if i > 0 {
                // iterator cannot be exhausted here, marker_count <= params.len()
                if let Some(param) = params.next() {
                    f.push_param(param);
                }
            }
            f.push(segment);
        }
        f.params.extend(params);
        Ok(f)
    }

    /// Join two fragments with a single space, concatenating their
    /// parameter lists in order. An empty side yields the other unchanged.
    ///
    /// Parameters are positional: extras carried for pre-numbered SQL on
    /// the left side count toward the placeholder positions of the right.
    pub fn concat(mut self, other: Fragment) -> Fragment {
        if other.is_empty() {
            self.params.extend(other.params);
            return self;
        }
        if self.is_empty() {
            let mut merged = other;
            merged.params.splice(0..0, self.params);
            return merged;
        }
        self.push(" ");
        self.append(other);
        self
    }

    /// Join fragments with a separator, skipping empty ones.
    pub fn join_all(fragments: impl IntoIterator<Item = Fragment>, separator: &str) -> Fragment {
        let mut out = Fragment::empty();
        for fragment in fragments {
            if fragment.is_empty() {
                out.params.extend(fragment.params);
                continue;
            }
            if !out.is_empty() {
                out.push(separator);
            }
            out.append(fragment);
        }
        out
    }

    /// Append raw SQL (no parameters).
    pub fn push(&mut self, text: &str) -> &mut Self {
        if text.is_empty() {
            return self;
        }
        match self.parts.last_mut() {
            Some(FragmentPart::Raw(last)) => last.push_str(text),
            _ => self.parts.push(FragmentPart::Raw(text.to_string())),
        }
        self
    }

    /// Append a parameter placeholder and bind its value.
    pub fn push_bind<T>(&mut self, value: T) -> &mut Self
    where
        T: ToSql + Send + Sync + 'static,
    {
        self.push_param(Param::new(value))
    }

    /// Append a parameter placeholder for a pre-wrapped [`Param`].
    pub fn push_param(&mut self, param: Param) -> &mut Self {
        self.parts.push(FragmentPart::Param);
        self.params.push(param);
        self
    }

    /// Append another fragment directly, with no separator.
    pub fn append(&mut self, mut other: Fragment) -> &mut Self {
        // Merge adjacent Raw parts so push() keeps its single-Raw-run invariant.
        let mut incoming = other.parts.drain(..);
        match incoming.next() {
            Some(FragmentPart::Raw(first)) => {
                self.push(&first);
            }
            Some(FragmentPart::Param) => self.parts.push(FragmentPart::Param),
            None => {}
        }
        self.parts.extend(incoming);
        self.params.append(&mut other.params);
        self
    }

    /// True when the fragment renders to no SQL text.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Render SQL with `$1, $2, ...` placeholders.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        let mut idx: usize = 0;

        for part in &self.parts {
            match part {
                FragmentPart::Raw(s) => out.push_str(s),
                FragmentPart::Param => {
                    idx += 1;
                    use std::fmt::Write;
                    let _ = write!(&mut out, "${}", idx);
                }
            }
        }
        out
    }

    /// The bound parameters, in placeholder order.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Parameter refs compatible with `tokio-postgres`.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(|p| p.as_sql_ref()).collect()
    }

    pub(crate) fn validate(&self) -> SqlResult<()> {
        let placeholder_count = self
            .parts
            .iter()
            .filter(|p| matches!(p, FragmentPart::Param))
            .count();

        // Pre-numbered SQL may carry params without placeholder parts,
        // so only placeholders exceeding params are an error.
        if placeholder_count > self.params.len() {
            return Err(SqlError::validation(format!(
                "fragment has more placeholders ({}) than params ({})",
                placeholder_count,
                self.params.len()
            )));
        }
        Ok(())
    }

    /// Execute the fragment and return the affected row count.
    pub async fn execute(&self, conn: &impl SqlExecutor) -> SqlResult<u64> {
        self.validate()?;
        let sql = self.to_sql();
        let params = self.params_ref();
        conn.execute(&sql, &params).await
    }

    /// Execute the fragment and return all rows.
    pub async fn fetch_all(&self, conn: &impl SqlExecutor) -> SqlResult<Vec<Row>> {
        self.validate()?;
        let sql = self.to_sql();
        let params = self.params_ref();
        conn.query(&sql, &params).await
    }

    /// Execute the fragment and return exactly one row.
    pub async fn fetch_one(&self, conn: &impl SqlExecutor) -> SqlResult<Row> {
        self.validate()?;
        let sql = self.to_sql();
        let params = self.params_ref();
        conn.query_one(&sql, &params).await
    }

    /// Execute the fragment and return the first row, if any.
    ///
    /// Unlike [`Fragment::fetch_opt`], extra rows are ignored rather than
    /// treated as an error.
    pub async fn fetch_first(&self, conn: &impl SqlExecutor) -> SqlResult<Option<Row>> {
        let rows = self.fetch_all(conn).await?;
        Ok(rows.into_iter().next())
    }

    /// Execute the fragment and return at most one row. The driver rejects
    /// results with more than one row.
    pub async fn fetch_opt(&self, conn: &impl SqlExecutor) -> SqlResult<Option<Row>> {
        self.validate()?;
        let sql = self.to_sql();
        let params = self.params_ref();
        conn.query_opt(&sql, &params).await
    }
}

impl std::fmt::Display for Fragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_sql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_placeholders_in_order() {
        let mut f = Fragment::raw("SELECT * FROM users WHERE a = ");
        f.push_bind(1).push(" AND b = ").push_bind("x");

        assert_eq!(f.to_sql(), "SELECT * FROM users WHERE a = $1 AND b = $2");
        assert_eq!(f.params_ref().len(), 2);
    }

    #[test]
    fn of_splits_template_on_markers() {
        let f = Fragment::of("id = ? AND name = ?", vec![Param::new(5), Param::new("ana")])
            .unwrap();
        assert_eq!(f.to_sql(), "id = $1 AND name = $2");
        assert_eq!(f.params_ref().len(), 2);
    }

    #[test]
    fn of_carries_extra_params_for_prenumbered_sql() {
        let f = Fragment::of("id = $1", vec![Param::new(5)]).unwrap();
        assert_eq!(f.to_sql(), "id = $1");
        assert_eq!(f.params_ref().len(), 1);
        f.validate().unwrap();
    }

    #[test]
    fn of_rejects_too_few_params() {
        let err = Fragment::of("a = ? AND b = ?", vec![Param::new(1)]).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn of_rejects_params_without_a_template() {
        let err = Fragment::of("", vec![Param::new(1)]).unwrap_err();
        assert!(err.is_validation());
        let err = Fragment::of("   ", vec![Param::new(1)]).unwrap_err();
        assert!(err.is_validation());
        Fragment::of("", Vec::new()).unwrap();
    }

    #[test]
    fn concat_joins_with_single_space() {
        let a = Fragment::of("A ?", vec![Param::new(1)]).unwrap();
        let b = Fragment::of("B ?", vec![Param::new(2)]).unwrap();
        let joined = a.concat(b);
        assert_eq!(joined.to_sql(), "A $1 B $2");
        assert_eq!(joined.params_ref().len(), 2);
    }

    #[test]
    fn concat_carries_bare_params_from_both_sides() {
        let a = Fragment::of("A", vec![Param::new(1)]).unwrap();
        let b = Fragment::of("B", vec![Param::new(2)]).unwrap();
        let joined = a.concat(b);
        assert_eq!(joined.to_sql(), "A B");
        assert_eq!(joined.params_ref().len(), 2);
    }

    #[test]
    fn concat_with_empty_is_identity() {
        let a = Fragment::raw("SELECT 1");
        let joined = a.clone().concat(Fragment::empty());
        assert_eq!(joined.to_sql(), "SELECT 1");

        let joined = Fragment::empty().concat(a);
        assert_eq!(joined.to_sql(), "SELECT 1");
    }

    #[test]
    fn concat_is_associative() {
        let make = || {
            (
                Fragment::of("a = ?", vec![Param::new(1)]).unwrap(),
                Fragment::of("b = ?", vec![Param::new(2)]).unwrap(),
                Fragment::of("c = ?", vec![Param::new(3)]).unwrap(),
            )
        };
        let (a, b, c) = make();
        let left = a.concat(b).concat(c);
        let (a, b, c) = make();
        let right = a.concat(b.concat(c));

        assert_eq!(left.to_sql(), right.to_sql());
        assert_eq!(left.params_ref().len(), right.params_ref().len());
        assert_eq!(left.to_sql(), "a = $1 b = $2 c = $3");
    }

    #[test]
    fn join_all_skips_empty_fragments() {
        let parts = vec![
            Fragment::raw("a"),
            Fragment::empty(),
            Fragment::raw("b"),
            Fragment::raw(""),
            Fragment::raw("c"),
        ];
        let joined = Fragment::join_all(parts, ", ");
        assert_eq!(joined.to_sql(), "a, b, c");
    }

    #[test]
    fn join_all_renumbers_params_across_fragments() {
        let parts = vec![
            Fragment::of("x = ?", vec![Param::new(10)]).unwrap(),
            Fragment::of("y = ?", vec![Param::new(20)]).unwrap(),
        ];
        let joined = Fragment::join_all(parts, " AND ");
        assert_eq!(joined.to_sql(), "x = $1 AND y = $2");
        assert_eq!(joined.params_ref().len(), 2);
    }

    #[test]
    fn raw_trims_surrounding_whitespace() {
        let f = Fragment::raw("  SELECT 1  ");
        assert_eq!(f.to_sql(), "SELECT 1");
    }

    #[test]
    fn empty_fragment_is_empty() {
        assert!(Fragment::empty().is_empty());
        assert!(Fragment::raw("   ").is_empty());
        assert!(!Fragment::raw("x").is_empty());
    }

    #[test]
    fn validate_rejects_missing_params() {
        let mut f = Fragment::raw("a = ");
        f.parts.push(FragmentPart::Param);
        assert!(f.validate().is_err());
    }

    #[test]
    fn sql_expr_displays_verbatim() {
        let e = SqlExpr::new("NOW()");
        assert_eq!(e.to_string(), "NOW()");
        assert_eq!(e.as_str(), "NOW()");
    }

    /// Executor stub: `query` succeeds with no rows, the single-row entry
    /// points fail the way the driver does when a result has extra rows.
    struct SingleRowRejector;

    impl SqlExecutor for SingleRowRejector {
        async fn query(&self, _sql: &str, _params: &[&(dyn ToSql + Sync)]) -> SqlResult<Vec<Row>> {
            Ok(Vec::new())
        }

        async fn query_opt(
            &self,
            _sql: &str,
            _params: &[&(dyn ToSql + Sync)],
        ) -> SqlResult<Option<Row>> {
            Err(SqlError::Other("query returned an unexpected number of rows".into()))
        }

        async fn query_one(&self, _sql: &str, _params: &[&(dyn ToSql + Sync)]) -> SqlResult<Row> {
            Err(SqlError::Other("query returned an unexpected number of rows".into()))
        }

        async fn execute(&self, _sql: &str, _params: &[&(dyn ToSql + Sync)]) -> SqlResult<u64> {
            Ok(0)
        }

        async fn batch_execute(&self, _sql: &str) -> SqlResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn fetch_first_tolerates_multi_row_results() {
        // fetch_first must go through the multi-row query path, never the
        // driver's at-most-one entry point.
        let f = Fragment::raw("SELECT id FROM users");
        let first = f.fetch_first(&SingleRowRejector).await.unwrap();
        assert!(first.is_none());
        assert!(f.fetch_opt(&SingleRowRejector).await.is_err());
    }
}
