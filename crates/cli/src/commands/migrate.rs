//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! vitaguide migrate
//! ```
//!
//! # Environment Variables
//!
//! - `ASSISTANT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! Migrations live in `crates/assistant/migrations/`.

use secrecy::ExposeSecret;
use sqlx::PgPool;

use super::{CommandError, database_url};

/// Run the assistant's profile migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails, or a
/// migration fails.
pub async fn run() -> Result<(), CommandError> {
    let url = database_url()?;

    tracing::info!("Connecting to profile database...");
    let pool = PgPool::connect(url.expose_secret()).await?;

    tracing::info!("Running assistant migrations...");
    sqlx::migrate!("../assistant/migrations").run(&pool).await?;

    tracing::info!("Assistant migrations complete!");
    Ok(())
}
