//! Statement builders over registered entities.
//!
//! Each builder holds a registry of entities (with aliases and join kinds),
//! optional row data per entity, and a where tree. `build()` renders the
//! statement and returns its SQL together with a freshly numbered parameter
//! list, so the same builder can be built any number of times.
//!
//! # Usage
//!
//! ```ignore
//! use pgcrud::qb::{self, Cond, SortDirection};
//!
//! let posts = TableRef::named(
//!     NamedTable::new("posts", ["id", "user_id", "title"])
//!         .relation(Relation::to_kind("user_id", "users", "id")),
//! );
//! let users = TableRef::named(NamedTable::new("users", ["id", "name"]));
//!
//! let q = qb::select(&posts, "p")
//!     .table(&users, "u")
//!     .filter(Cond::on(&users, "name", "alice"))
//!     .order_by(&posts, "id", SortDirection::Desc)
//!     .limit(20)
//!     .build();
//! // SELECT P.id AS P__id, ..., U.name AS U__name
//! //   FROM posts P JOIN users U ON P.user_id=U.id
//! //   WHERE U.name=$1 ORDER BY P.id DESC LIMIT 20
//! ```

mod common;
mod delete;
mod insert;
mod join;
mod param;
mod projection;
mod registry;
mod select;
mod traits;
mod update;
mod where_tree;

pub use delete::DeleteQb;
pub use insert::{InsertQb, RawAssignment};
pub use join::{ChainLink, JoinPlan, render_from, resolve_relation};
pub use param::{PLACEHOLDER_MARKER, ParamList};
pub use projection::{Projection, render_projection, result_field};
pub use registry::{JoinKind, Registration, Registry};
pub use select::{SelectQb, SortDirection};
pub use traits::{BuiltQuery, SqlQb};
pub use update::UpdateQb;
pub use where_tree::{Cond, Conjunction, WhereGroup, WhereItem, WhereNode, WhereTree};

use crate::entity::TableRef;

/// Create a SELECT builder with `table` registered under `alias`.
pub fn select(table: &TableRef, alias: &str) -> SelectQb {
    SelectQb::new().table(table, alias)
}

/// Create an INSERT builder targeting `table`.
pub fn insert(table: &TableRef, alias: &str) -> InsertQb {
    InsertQb::new().table(table, alias)
}

/// Create an UPDATE builder targeting `table`.
pub fn update(table: &TableRef, alias: &str) -> UpdateQb {
    UpdateQb::new().table(table, alias)
}

/// Create a DELETE builder targeting `table`.
pub fn delete(table: &TableRef, alias: &str) -> DeleteQb {
    DeleteQb::new().table(table, alias)
}
