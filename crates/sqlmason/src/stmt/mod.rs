//! Statement builders for SELECT, UPDATE, and DELETE.
//!
//! Builders are consuming and fluent: every method takes `self` and
//! returns `SqlResult<Self>`, so `?` composes naturally. `render()`
//! produces the final [`crate::Fragment`].

mod delete;
mod select;
mod update;

pub use delete::DeleteBuilder;
pub use select::SelectBuilder;
pub use update::UpdateBuilder;

use crate::schema::Table;

/// Start building a SELECT against `table`.
pub fn select(table: &Table) -> SelectBuilder<'_> {
    SelectBuilder::new(table)
}

/// Start building an UPDATE against `table`.
pub fn update(table: &Table) -> UpdateBuilder<'_> {
    UpdateBuilder::new(table)
}

/// Start building a DELETE against `table`.
pub fn delete(table: &Table) -> DeleteBuilder<'_> {
    DeleteBuilder::new(table)
}
