use sqlx::{PgPool, Result};

use crate::models::ApiKey;

#[derive(Clone)]
pub struct ApiKeyRepository {
    pool: PgPool,
}

impl ApiKeyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn add(&self, key_id: &str, user_id: &str, user_key_id: &str, hash: &str, salt: &str) -> Result<ApiKey> {
        sqlx::query_as::<_, ApiKey>(
            r#"
            INSERT INTO api_keys (key_id, user_id, user_key_id, api_key_hash, salt)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(key_id)
        .bind(user_id)
        .bind(user_key_id)
        .bind(hash)
        .bind(salt)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn list_by_user(&self, user_id: &str) -> Result<Vec<ApiKey>> {
        sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn get_by_key_id(&self, key_id: &str) -> Result<Option<ApiKey>> {
        sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE key_id = $1")
            .bind(key_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn delete_by_id(&self, key_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM api_keys WHERE key_id = $1")
            .bind(key_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
