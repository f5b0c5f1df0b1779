//! SQL vocabulary: column types, constraints, operators, and rendering.

use crate::error::{SqlError, SqlResult};
use crate::fragment::SqlExpr;

/// Column data types. Parameterized types carry their arguments, so a
/// `VARCHAR` without a size is unrepresentable; degenerate arguments are
/// rejected by the checked constructors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    BigInt,
    Decimal { precision: u32, scale: u32 },
    Varchar { size: u32 },
    Text,
    Date,
    Timestamp,
    Boolean,
}

impl ColumnType {
    /// A `VARCHAR(size)` type. The size must be positive.
    pub fn varchar(size: u32) -> SqlResult<Self> {
        if size == 0 {
            return Err(SqlError::validation("VARCHAR size must be positive"));
        }
        Ok(Self::Varchar { size })
    }

    /// A `DECIMAL(precision, scale)` type. Precision must be positive and
    /// the scale must not exceed it.
    pub fn decimal(precision: u32, scale: u32) -> SqlResult<Self> {
        if precision == 0 {
            return Err(SqlError::validation("DECIMAL precision must be positive"));
        }
        if scale > precision {
            return Err(SqlError::validation(format!(
                "DECIMAL scale ({}) must not exceed precision ({})",
                scale, precision
            )));
        }
        Ok(Self::Decimal { precision, scale })
    }

    /// Render the type as DDL text.
    pub fn as_sql(&self) -> String {
        match self {
            Self::Int => "INT".to_string(),
            Self::BigInt => "BIGINT".to_string(),
            Self::Decimal { precision, scale } => format!("DECIMAL({}, {})", precision, scale),
            Self::Varchar { size } => format!("VARCHAR({})", size),
            Self::Text => "TEXT".to_string(),
            Self::Date => "DATE".to_string(),
            Self::Timestamp => "TIMESTAMP".to_string(),
            Self::Boolean => "BOOLEAN".to_string(),
        }
    }
}

/// A typed DEFAULT payload. Text defaults are single-quoted with embedded
/// quotes doubled; expression defaults render verbatim.
#[derive(Clone, Debug, PartialEq)]
pub enum DefaultValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Expr(SqlExpr),
}

impl DefaultValue {
    fn as_sql(&self) -> String {
        match self {
            Self::Text(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Int(n) => n.to_string(),
            Self::Float(x) => x.to_string(),
            Self::Bool(true) => "TRUE".to_string(),
            Self::Bool(false) => "FALSE".to_string(),
            Self::Expr(e) => e.as_str().to_string(),
        }
    }
}

/// Column constraints.
#[derive(Clone, Debug, PartialEq)]
pub enum Constraint {
    PrimaryKey,
    NotNull,
    Unique,
    AutoIncrement,
    Default(DefaultValue),
}

impl Constraint {
    /// Render the constraint as DDL text.
    pub fn as_sql(&self) -> String {
        match self {
            Self::PrimaryKey => "PRIMARY KEY".to_string(),
            Self::NotNull => "NOT NULL".to_string(),
            Self::Unique => "UNIQUE".to_string(),
            Self::AutoIncrement => "GENERATED ALWAYS AS IDENTITY".to_string(),
            Self::Default(value) => format!("DEFAULT {}", value.as_sql()),
        }
    }
}

/// Comparison operators usable in predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    Like,
    In,
}

impl CmpOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Gte => ">=",
            Self::Lte => "<=",
            Self::Like => "LIKE",
            Self::In => "IN",
        }
    }
}

/// Logical connectives between predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

impl LogicOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// Join flavors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    FullOuter,
}

impl JoinKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::FullOuter => "FULL OUTER JOIN",
        }
    }
}

/// Sort direction for ORDER BY items.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Referential actions for foreign keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefAction {
    Cascade,
    Restrict,
    NoAction,
    SetNull,
    SetDefault,
}

impl RefAction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
            Self::NoAction => "NO ACTION",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameterized_types_render_arguments() {
        assert_eq!(ColumnType::varchar(80).unwrap().as_sql(), "VARCHAR(80)");
        assert_eq!(
            ColumnType::decimal(10, 2).unwrap().as_sql(),
            "DECIMAL(10, 2)"
        );
    }

    #[test]
    fn varchar_rejects_zero_size() {
        assert!(ColumnType::varchar(0).is_err());
    }

    #[test]
    fn decimal_rejects_degenerate_arguments() {
        assert!(ColumnType::decimal(0, 0).is_err());
        assert!(ColumnType::decimal(5, 6).is_err());
        assert!(ColumnType::decimal(5, 5).is_ok());
    }

    #[test]
    fn defaults_render_typed_literals() {
        assert_eq!(
            Constraint::Default(DefaultValue::Text("n/a".into())).as_sql(),
            "DEFAULT 'n/a'"
        );
        assert_eq!(
            Constraint::Default(DefaultValue::Int(0)).as_sql(),
            "DEFAULT 0"
        );
        assert_eq!(
            Constraint::Default(DefaultValue::Bool(true)).as_sql(),
            "DEFAULT TRUE"
        );
        assert_eq!(
            Constraint::Default(DefaultValue::Expr(SqlExpr::new("NOW()"))).as_sql(),
            "DEFAULT NOW()"
        );
    }

    #[test]
    fn text_defaults_escape_embedded_quotes() {
        assert_eq!(
            Constraint::Default(DefaultValue::Text("it's".into())).as_sql(),
            "DEFAULT 'it''s'"
        );
    }

    #[test]
    fn auto_increment_renders_identity() {
        assert_eq!(Constraint::AutoIncrement.as_sql(), "GENERATED ALWAYS AS IDENTITY");
    }

    #[test]
    fn operators_render_sql_tokens() {
        assert_eq!(CmpOp::Ne.as_sql(), "!=");
        assert_eq!(CmpOp::Like.as_sql(), "LIKE");
        assert_eq!(LogicOp::Or.as_sql(), "OR");
        assert_eq!(JoinKind::FullOuter.as_sql(), "FULL OUTER JOIN");
        assert_eq!(SortDir::Desc.as_sql(), "DESC");
        assert_eq!(RefAction::SetNull.as_sql(), "SET NULL");
    }
}
