//! Profile repository backed by `assistant.user_profiles`.
//!
//! Queries are checked at runtime so the crate builds without a live
//! database.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use vitaguide_core::{BudgetRange, CurrencyCode, Gender, Language, Profile, UserId};

use crate::profiles::{ProfileError, ProfileStore};

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    user_id: String,
    age: Option<i16>,
    gender: Option<String>,
    goals: Vec<String>,
    allergies: Vec<String>,
    dietary_restrictions: Vec<String>,
    budget_min: Option<Decimal>,
    budget_max: Option<Decimal>,
    budget_currency: Option<String>,
    language: Option<String>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = ProfileError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let age = row
            .age
            .map(u8::try_from)
            .transpose()
            .map_err(|e| ProfileError::DataCorruption(format!("invalid age in database: {e}")))?;

        let budget = match (row.budget_min, row.budget_max, row.budget_currency) {
            (Some(min), Some(max), Some(currency)) => {
                let currency = CurrencyCode::parse(&currency).map_err(|e| {
                    ProfileError::DataCorruption(format!("invalid currency in database: {e}"))
                })?;
                Some(BudgetRange { min, max, currency })
            }
            (None, None, None) => None,
            _ => {
                return Err(ProfileError::DataCorruption(
                    "partial budget in database".to_string(),
                ));
            }
        };

        Ok(Self {
            user_id: UserId::new(row.user_id),
            age,
            gender: row.gender.as_deref().and_then(Gender::parse_loose),
            goals: row.goals,
            allergies: row.allergies,
            dietary_restrictions: row.dietary_restrictions,
            budget,
            language: row.language.and_then(|code| code.parse::<Language>().ok()),
        })
    }
}

/// `PostgreSQL` profile store.
#[derive(Debug, Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    /// # Errors
    ///
    /// Returns `ProfileError::Database` if the query fails.
    /// Returns `ProfileError::DataCorruption` if a stored column is out of range.
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn get_profile(&self, user_id: &UserId) -> Result<Option<Profile>, ProfileError> {
        let row: Option<ProfileRow> = sqlx::query_as(
            r"
            SELECT user_id, age, gender, goals, allergies, dietary_restrictions,
                   budget_min, budget_max, budget_currency, language
            FROM assistant.user_profiles
            WHERE user_id = $1
            ",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Profile::try_from).transpose()
    }

    #[instrument(skip(self, profile), fields(user_id = %profile.user_id))]
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), ProfileError> {
        let budget = profile.budget.as_ref();

        sqlx::query(
            r"
            INSERT INTO assistant.user_profiles
                (user_id, age, gender, goals, allergies, dietary_restrictions,
                 budget_min, budget_max, budget_currency, language)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (user_id) DO UPDATE SET
                age = EXCLUDED.age,
                gender = EXCLUDED.gender,
                goals = EXCLUDED.goals,
                allergies = EXCLUDED.allergies,
                dietary_restrictions = EXCLUDED.dietary_restrictions,
                budget_min = EXCLUDED.budget_min,
                budget_max = EXCLUDED.budget_max,
                budget_currency = EXCLUDED.budget_currency,
                language = EXCLUDED.language,
                updated_at = NOW()
            ",
        )
        .bind(profile.user_id.as_str())
        .bind(profile.age.map(i16::from))
        .bind(profile.gender.map(Gender::as_str))
        .bind(&profile.goals)
        .bind(&profile.allergies)
        .bind(&profile.dietary_restrictions)
        .bind(budget.map(|b| b.min))
        .bind(budget.map(|b| b.max))
        .bind(budget.map(|b| b.currency.as_str()))
        .bind(profile.language.map(Language::code))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> ProfileRow {
        ProfileRow {
            user_id: "u1".to_string(),
            age: Some(34),
            gender: Some("female".to_string()),
            goals: vec!["sleep".to_string()],
            allergies: vec![],
            dietary_restrictions: vec!["vegan".to_string()],
            budget_min: Some(Decimal::new(10, 0)),
            budget_max: Some(Decimal::new(40, 0)),
            budget_currency: Some("EUR".to_string()),
            language: Some("en".to_string()),
        }
    }

    #[test]
    fn test_row_converts_to_profile() {
        let profile = Profile::try_from(row()).expect("valid row");
        assert_eq!(profile.age, Some(34));
        assert!(profile.is_female());
        assert_eq!(profile.language, Some(Language::En));
        let budget = profile.budget.expect("budget");
        assert_eq!(budget.currency.as_str(), "EUR");
    }

    #[test]
    fn test_partial_budget_is_corruption() {
        let mut bad = row();
        bad.budget_currency = None;
        assert!(matches!(
            Profile::try_from(bad),
            Err(ProfileError::DataCorruption(_))
        ));
    }

    #[test]
    fn test_out_of_range_age_is_corruption() {
        let mut bad = row();
        bad.age = Some(-3);
        assert!(matches!(
            Profile::try_from(bad),
            Err(ProfileError::DataCorruption(_))
        ));
    }

    #[test]
    fn test_unknown_language_is_dropped() {
        let mut odd = row();
        odd.language = Some("de".to_string());
        let profile = Profile::try_from(odd).expect("valid row");
        assert_eq!(profile.language, None);
    }
}
