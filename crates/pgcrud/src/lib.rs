//! # pgcrud
//!
//! A relation-aware PostgreSQL statement builder with a thin CRUD layer.
//!
//! ## Features
//!
//! - **Join inference**: entities declare relations, and a multi-table select
//!   derives its `JOIN ... ON` conditions from them
//! - **Positional parameters**: every value is bound as `$n`, numbered in the
//!   order it appears in the SQL
//! - **Structured where trees**: nested AND/OR groups, built in code or from
//!   JSON descriptors
//! - **Soft delete aware**: timestamp-enabled tables get `deleted_at IS NULL`
//!   on selects automatically
//! - **Transaction-friendly**: pass a transaction anywhere a `GenericClient`
//!   is expected
//!
//! ## Query Builder (qb)
//!
//! ```ignore
//! use pgcrud::{NamedTable, Relation, TableRef, qb};
//!
//! let users = TableRef::named(NamedTable::new("users", ["id", "name"]));
//! let posts = TableRef::named(
//!     NamedTable::new("posts", ["id", "user_id", "title"])
//!         .relation(Relation::to_table("user_id", &users, "id")),
//! );
//!
//! // SELECT P.id AS P__id, ... FROM posts P JOIN users U ON P.user_id=U.id WHERE U.name=$1
//! let q = qb::select(&posts, "p")
//!     .table(&users, "u")
//!     .where_eq(&users, "name", "alice")
//!     .build();
//! let rows = pgcrud::execute(&client, &q).await.into_rows()?;
//! ```
//!
//! ## CRUD
//!
//! ```ignore
//! let ctx = ExecutorContext::init(ExecutorConfig::from_env()?)?;
//! let client = ctx.client().await?;
//! let posts_crud = ctx.crud(&posts);
//! let created = posts_crud
//!     .create(&client, RowData::new().with("user_id", 1).with("title", "hi"))
//!     .await?;
//! ctx.shutdown();
//! ```

pub mod client;
pub mod config;
pub mod crud;
pub mod entity;
pub mod error;
pub mod executor;
pub mod metadata;
pub mod monitor;
pub mod qb;
pub mod row;
pub mod row_data;
pub mod transaction;
pub mod value;

#[cfg(feature = "pool")]
pub mod pool;

pub use client::GenericClient;
pub use config::ExecutorConfig;
pub use crud::{Crud, RetrieveParams};
pub use entity::{
    DerivedTable, Entity, EntityOptions, NamedTable, Relation, RelationTarget, TableLike, TableRef,
};
pub use error::{OrmError, OrmResult};
pub use executor::{QueryOutcome, execute, select, select_one};
pub use metadata::{FieldKind, FieldMeta};
pub use monitor::{QueryContext, QueryType};
pub use row::{FromRow, RowExt, from_rows};
pub use row_data::RowData;
pub use value::Value;

// Re-export qb module for easy access
pub use qb::{
    BuiltQuery, Cond, Conjunction, DeleteQb, InsertQb, JoinKind, RawAssignment, SelectQb,
    SortDirection, SqlQb, UpdateQb, WhereGroup, WhereItem,
};

#[cfg(feature = "pool")]
pub use executor::ExecutorContext;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_tls};

#[cfg(feature = "tracing")]
pub use monitor::TracingSqlLogger;
