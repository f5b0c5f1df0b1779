//! # sqlmason
//!
//! Schema-driven SQL statement construction and safe execution for
//! PostgreSQL, on top of `tokio-postgres`.
//!
//! - **Fragments**: SQL text and bound parameters travel together;
//!   placeholders are numbered automatically on render.
//! - **Schema model**: tables, columns, keys, and constraints declared in
//!   code generate dependency-ordered CREATE TABLE scripts.
//! - **Statement builders**: fluent SELECT, UPDATE, and DELETE over a
//!   table definition; UPDATE and DELETE always require a WHERE clause.
//! - **Layered safety**: values are parameterized, identifiers are quoted
//!   or validated, and rendered SQL passes a destructive-keyword scan
//!   before execution.
//!
//! # Example
//!
//! ```ignore
//! use sqlmason::{stmt, Column, ColumnType, Constraint, PrimaryKey, Session, Table};
//!
//! # async fn demo() -> sqlmason::SqlResult<()> {
//! let users = Table::new("users", vec![
//!     Column::new("id", ColumnType::Int).constraint(Constraint::AutoIncrement),
//!     Column::new("name", ColumnType::varchar(80)?).constraint(Constraint::NotNull),
//! ])?
//! .primary_key(PrimaryKey::single("id")?)?;
//!
//! let mut session = Session::connect_str("host=localhost user=app").await?;
//! session.run_script(&users.create_fragment()?.to_sql()).await?;
//!
//! let adults = stmt::select(&users).gte("age", 18)?.order_by("name")?.render()?;
//! let rows = session.query(&adults).await?;
//! # Ok(()) }
//! ```

pub mod clause;
pub mod client;
pub mod error;
pub mod fragment;
pub mod guard;
pub mod ident;
pub mod predicate;
pub mod schema;
pub mod session;
pub mod stmt;
pub mod transaction;
pub mod types;

pub use client::SqlExecutor;
pub use error::{SqlError, SqlResult};
pub use fragment::{Fragment, Param, SqlExpr};
pub use predicate::{Predicate, Rhs};
pub use schema::{Column, Database, ForeignKey, InsertSet, PrimaryKey, Table, Value};
pub use session::Session;
pub use stmt::{DeleteBuilder, SelectBuilder, UpdateBuilder};
pub use types::{
    CmpOp, ColumnType, Constraint, DefaultValue, JoinKind, LogicOp, RefAction, SortDir,
};
