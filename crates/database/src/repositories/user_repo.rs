use sqlx::{PgPool, Result};

use crate::models::User;

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_external_id(&self, external_id: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE external_id = $1")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_by_id(&self, user_id: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Created/updated on each successful login; membership reflects the
    /// identity-provider claims at that moment.
    pub async fn upsert(&self, user_id: &str, external_id: &str, name: &str, projects: &[String]) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (user_id, external_id, name, projects)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (external_id) DO UPDATE SET
                name = EXCLUDED.name,
                projects = EXCLUDED.projects,
                modified_at = now()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(external_id)
        .bind(name)
        .bind(projects)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn is_project_member(&self, user_id: &str, project_id: &str) -> Result<bool> {
        let found: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM users WHERE user_id = $1 AND $2 = ANY(projects)")
                .bind(user_id)
                .bind(project_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }
}
