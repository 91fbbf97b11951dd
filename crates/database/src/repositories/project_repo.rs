use sqlx::{PgPool, Result};

use crate::models::Project;

#[derive(Clone)]
pub struct ProjectRepository {
    pool: PgPool,
}

impl ProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, project_id: &str) -> Result<Option<Project>> {
        sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE project_id = $1")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Created lazily on first observation of a project claim from the
    /// identity provider.
    pub async fn get_or_create(&self, project_id: &str, external_id: &str) -> Result<Project> {
        sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (project_id, external_id)
            VALUES ($1, $2)
            ON CONFLICT (external_id) DO UPDATE SET modified_at = projects.modified_at
            RETURNING *
            "#,
        )
        .bind(project_id)
        .bind(external_id)
        .fetch_one(&self.pool)
        .await
    }
}
