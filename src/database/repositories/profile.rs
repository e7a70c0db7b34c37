//! Profile repository implementation

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use crate::models::{CreateProfileRequest, Profile};
use crate::services::invitation::MemberDirectory;
use crate::utils::errors::Result;

#[derive(Debug, Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new profile
    pub async fn create(&self, request: CreateProfileRequest) -> Result<Profile> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (email, display_name, created_at)
            VALUES ($1, $2, $3)
            RETURNING id, email, display_name, created_at
            "#,
        )
        .bind(request.email.to_lowercase())
        .bind(request.display_name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(profile)
    }

    /// Find profile by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT id, email, display_name, created_at FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    /// Find profile by contact email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT id, email, display_name, created_at FROM profiles WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }
}

#[async_trait]
impl MemberDirectory for ProfileRepository {
    async fn resolve_contacts(&self, contacts: &[String]) -> Result<Vec<Profile>> {
        if contacts.is_empty() {
            return Ok(Vec::new());
        }

        let profiles = sqlx::query_as::<_, Profile>(
            "SELECT id, email, display_name, created_at FROM profiles WHERE lower(email) = ANY($1)",
        )
        .bind(contacts)
        .fetch_all(&self.pool)
        .await?;

        Ok(profiles)
    }

    async fn contact_for(&self, user_id: i64) -> Result<Option<String>> {
        Ok(self.find_by_id(user_id).await?.map(|p| p.email))
    }
}
