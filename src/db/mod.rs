//! Database layer
//!
//! SQLite through `sqlx`: pool construction, embedded migrations and the
//! repositories used by the services.
//!
//! ```ignore
//! let pool = newsroom::db::create_pool(&config.database).await?;
//! newsroom::db::migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, ping};
