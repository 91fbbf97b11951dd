use sqlx::{PgPool, Result};

use crate::models::Registration;

#[derive(Clone)]
pub struct RegistrationRepository {
    pool: PgPool,
}

impl RegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn add(&self, registration: &Registration) -> Result<Registration> {
        sqlx::query_as::<_, Registration>(
            r#"
            INSERT INTO registrations
                (submission_id, object_id, object_type, title, description, doi,
                 metax_id, datacite_url, rems_url, rems_resource_id, rems_catalogue_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(&registration.submission_id)
        .bind(&registration.object_id)
        .bind(&registration.object_type)
        .bind(&registration.title)
        .bind(&registration.description)
        .bind(&registration.doi)
        .bind(&registration.metax_id)
        .bind(&registration.datacite_url)
        .bind(&registration.rems_url)
        .bind(&registration.rems_resource_id)
        .bind(&registration.rems_catalogue_id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn list_by_submission(&self, submission_id: &str) -> Result<Vec<Registration>> {
        sqlx::query_as::<_, Registration>("SELECT * FROM registrations WHERE submission_id = $1")
            .bind(submission_id)
            .fetch_all(&self.pool)
            .await
    }

    /// `update-if-null` semantics: only fills columns that are currently
    /// NULL, so re-running a partially completed publish resumes from
    /// the first missing external id instead of clobbering work already
    /// recorded.
    pub async fn update_if_null(
        &self,
        submission_id: &str,
        object_id: Option<&str>,
        doi: Option<&str>,
        metax_id: Option<&str>,
        rems_resource_id: Option<&str>,
        rems_catalogue_id: Option<&str>,
        rems_url: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE registrations SET
                doi = COALESCE(doi, $3),
                metax_id = COALESCE(metax_id, $4),
                rems_resource_id = COALESCE(rems_resource_id, $5),
                rems_catalogue_id = COALESCE(rems_catalogue_id, $6),
                rems_url = COALESCE(rems_url, $7),
                modified_at = now()
            WHERE submission_id = $1 AND object_id IS NOT DISTINCT FROM $2
            "#,
        )
        .bind(submission_id)
        .bind(object_id)
        .bind(doi)
        .bind(metax_id)
        .bind(rems_resource_id)
        .bind(rems_catalogue_id)
        .bind(rems_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
