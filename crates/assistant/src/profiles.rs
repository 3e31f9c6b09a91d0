//! Stored user profiles.
//!
//! The pipeline only reads profiles; the CLI writes them. A failed read is
//! treated by the caller as "no profile".

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use vitaguide_core::{Profile, UserId};

pub use crate::db::PgProfileStore;

/// Errors from a profile store.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Key-value access to profiles by user id.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: &UserId) -> Result<Option<Profile>, ProfileError>;

    /// Insert or replace a profile.
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), ProfileError>;
}

/// In-process profiles, used when no database is configured.
#[derive(Debug, Clone, Default)]
pub struct MemoryProfileStore {
    profiles: Arc<DashMap<UserId, Profile>>,
}

impl MemoryProfileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with `profiles`.
    #[must_use]
    pub fn with_profiles(profiles: impl IntoIterator<Item = Profile>) -> Self {
        let store = Self::new();
        for profile in profiles {
            store.profiles.insert(profile.user_id.clone(), profile);
        }
        store
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get_profile(&self, user_id: &UserId) -> Result<Option<Profile>, ProfileError> {
        Ok(self.profiles.get(user_id).map(|entry| entry.value().clone()))
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), ProfileError> {
        self.profiles.insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }
}
