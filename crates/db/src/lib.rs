//! `db` crate — pure persistence layer.
//!
//! Provides a connection pool, the static data row struct, repository
//! functions for the `node_static_data` table, and a Postgres-backed
//! [`nodes::StaticDataStore`].

pub mod error;
pub mod models;
pub mod pool;
pub mod repository;
pub mod store;

pub use error::DbError;
pub use pool::{create_pool, run_migrations, DbPool};
pub use store::PgStaticDataStore;
