//! # pgstanza
//!
//! A declarative statement layer for PostgreSQL.
//!
//! Callers describe a database operation as a [`Definition`] — table, verb,
//! fields, data, filter, joins, limits — and the layer resolves it into SQL
//! text with named `:name` placeholders and an unresolved `{prefix}` table
//! token. A [`Connection`] facade substitutes the deployment prefix, rewrites
//! placeholders to positional form, and executes against one lazily opened
//! handle.
//!
//! ## Features
//!
//! - **Declarative definitions**: one map-like builder per operation,
//!   normalized and rendered by a pure pipeline with no shared mutable state
//! - **Verb inference**: definitions without a verb infer INSERT vs UPDATE
//!   from the scheme primary key's presence in `data`
//! - **Prefix-portable SQL**: one schema deployable under any table prefix
//! - **Plain transactions**: begin/commit/rollback delegated to the driver
//!
//! ## Example
//!
//! ```ignore
//! use pgstanza::{params, stmt, Connection, ConnectionConfig};
//!
//! let mut db = Connection::new(ConnectionConfig::from_env()?);
//!
//! let user = db
//!     .fetch_single(
//!         &stmt::select("users")
//!             .filter_with("id=:id", params! { ":id" => 7 })
//!             .render()?,
//!     )
//!     .await?;
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod placeholder;
pub mod row;
pub mod scheme;
pub mod stmt;
pub mod value;

pub use config::ConnectionConfig;
pub use connection::Connection;
pub use error::{StanzaError, StanzaResult};
pub use placeholder::{PREFIX_TOKEN, substitute_prefix};
pub use row::{FromRow, RowExt};
pub use scheme::{FieldDef, FieldKind, TableScheme};
pub use stmt::{
    Counter, Definition, FieldSpec, Filter, Join, JoinKind, NormalizedStatement, Statement, Verb,
    delete, insert, replace, select, update,
};
pub use value::{ParamMap, Value};
