//! `PostgreSQL` persistence for the assistant.
//!
//! # Schema: `assistant`
//!
//! - `user_profiles` - stored health profiles keyed by user id
//!
//! # Migrations
//!
//! Migrations are stored in `crates/assistant/migrations/` and run via:
//! ```bash
//! cargo run -p vitaguide-cli -- migrate
//! ```
//!
//! The database is optional. Without `DATABASE_URL` the service keeps
//! profiles in memory.

mod profiles;

pub use profiles::PgProfileStore;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Create a `PostgreSQL` connection pool.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
