use sqlx::{PgPool, Result};

use crate::models::File;

#[derive(Clone)]
pub struct FileRepository {
    pool: PgPool,
}

impl FileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn add(&self, file: &File) -> Result<File> {
        sqlx::query_as::<_, File>(
            r#"
            INSERT INTO files
                (file_id, submission_id, object_id, path, bytes, unencrypted_checksum,
                 encrypted_checksum, checksum_method, ingest_status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&file.file_id)
        .bind(&file.submission_id)
        .bind(&file.object_id)
        .bind(&file.path)
        .bind(file.bytes)
        .bind(&file.unencrypted_checksum)
        .bind(&file.encrypted_checksum)
        .bind(&file.checksum_method)
        .bind(&file.ingest_status)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get_by_id(&self, file_id: &str) -> Result<Option<File>> {
        sqlx::query_as::<_, File>("SELECT * FROM files WHERE file_id = $1")
            .bind(file_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn list_by_project(&self, project_id: &str) -> Result<Vec<File>> {
        sqlx::query_as::<_, File>(
            r#"
            SELECT f.* FROM files f
            JOIN submissions s ON s.submission_id = f.submission_id
            WHERE s.project_id = $1
            ORDER BY f.created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn list_by_submission(&self, submission_id: &str) -> Result<Vec<File>> {
        sqlx::query_as::<_, File>("SELECT * FROM files WHERE submission_id = $1 ORDER BY created_at ASC")
            .bind(submission_id)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn list_non_terminal(&self) -> Result<Vec<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files WHERE ingest_status NOT IN ('ready', 'failed') ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn update_ingest_status(
        &self,
        file_id: &str,
        status: &str,
        error: Option<&str>,
        error_type: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE files SET
                ingest_status = $1,
                ingest_error = $2,
                ingest_error_type = $3,
                ingest_error_count = CASE WHEN $1 = 'failed' THEN ingest_error_count + 1 ELSE ingest_error_count END,
                modified_at = now()
            WHERE file_id = $4
            "#,
        )
        .bind(status)
        .bind(error)
        .bind(error_type)
        .bind(file_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_by_id(&self, file_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE file_id = $1")
            .bind(file_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
