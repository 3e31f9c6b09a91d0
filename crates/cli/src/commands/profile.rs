//! Profile management commands.
//!
//! # Usage
//!
//! ```bash
//! vitaguide profile upsert -f profile.yaml
//! vitaguide profile show -u user-123
//! ```
//!
//! Profile files use the same camelCase field names as the API
//! (`userId`, `dietaryRestrictions`, ...).

use std::path::Path;

use vitaguide_assistant::db::{PgProfileStore, create_pool};
use vitaguide_assistant::profiles::ProfileStore;
use vitaguide_core::UserId;

use super::{CommandError, database_url, read_profile};

async fn store() -> Result<PgProfileStore, CommandError> {
    let url = database_url()?;
    tracing::info!("Connecting to profile database...");
    Ok(PgProfileStore::new(create_pool(&url).await?))
}

/// Insert or replace the profile in `file`.
///
/// # Errors
///
/// Returns an error if the file is invalid or the database write fails.
pub async fn upsert(file: &Path) -> Result<(), CommandError> {
    let profile = read_profile(file)?;
    store().await?.upsert_profile(&profile).await?;

    tracing::info!(user_id = %profile.user_id, "Profile saved");
    Ok(())
}

/// Print the stored profile for `user_id` as JSON.
///
/// # Errors
///
/// Returns an error if the database read fails.
pub async fn show(user_id: &str) -> Result<(), CommandError> {
    let user_id = UserId::new(user_id);
    let Some(profile) = store().await?.get_profile(&user_id).await? else {
        tracing::warn!(user_id = %user_id, "No profile stored");
        return Ok(());
    };

    let json = serde_json::to_string_pretty(&profile)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{json}");
    }
    Ok(())
}
