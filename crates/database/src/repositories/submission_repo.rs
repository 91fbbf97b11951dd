use chrono::{DateTime, Utc};
use sqlx::{PgPool, QueryBuilder, Result};

use crate::models::Submission;

#[derive(Debug, Default, Clone)]
pub struct SubmissionFilter {
    pub project_id: Option<String>,
    pub name_substring: Option<String>,
    pub is_published: Option<bool>,
    pub is_ingested: Option<bool>,
    pub created_start: Option<DateTime<Utc>>,
    pub created_end: Option<DateTime<Utc>>,
    pub modified_start: Option<DateTime<Utc>>,
    pub modified_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy)]
pub enum SubmissionSort {
    CreatedDesc,
    ModifiedDesc,
}

#[derive(Clone)]
pub struct SubmissionRepository {
    pool: PgPool,
}

impl SubmissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn add(&self, submission: &Submission) -> Result<Submission> {
        sqlx::query_as::<_, Submission>(
            r#"
            INSERT INTO submissions
                (submission_id, name, project_id, workflow_name, folder, title, description, document)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&submission.submission_id)
        .bind(&submission.name)
        .bind(&submission.project_id)
        .bind(&submission.workflow_name)
        .bind(&submission.folder)
        .bind(&submission.title)
        .bind(&submission.description)
        .bind(&submission.document)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get_by_id(&self, submission_id: &str) -> Result<Option<Submission>> {
        sqlx::query_as::<_, Submission>("SELECT * FROM submissions WHERE submission_id = $1")
            .bind(submission_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_by_name(&self, project_id: &str, name: &str) -> Result<Option<Submission>> {
        sqlx::query_as::<_, Submission>(
            "SELECT * FROM submissions WHERE project_id = $1 AND name = $2",
        )
        .bind(project_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list(
        &self,
        filter: &SubmissionFilter,
        sort: SubmissionSort,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<Submission>, i64)> {
        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM submissions WHERE 1=1");
        push_filter(&mut count_query, filter);
        let total: i64 = count_query.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::new("SELECT * FROM submissions WHERE 1=1");
        push_filter(&mut query, filter);
        match sort {
            SubmissionSort::CreatedDesc => query.push(" ORDER BY created_at DESC"),
            SubmissionSort::ModifiedDesc => query.push(" ORDER BY modified_at DESC"),
        };
        query.push(" LIMIT ").push_bind(page_size).push(" OFFSET ").push_bind(page);

        let items = query.build_query_as::<Submission>().fetch_all(&self.pool).await?;
        Ok((items, total))
    }

    /// Applies `mutator` to the live row inside a transaction and
    /// flushes on exit, per the repository contract.
    pub async fn update<F>(&self, submission_id: &str, mutator: F) -> Result<()>
    where
        F: FnOnce(&mut Submission),
    {
        let mut tx = self.pool.begin().await?;
        let mut submission = sqlx::query_as::<_, Submission>(
            "SELECT * FROM submissions WHERE submission_id = $1 FOR UPDATE",
        )
        .bind(submission_id)
        .fetch_one(&mut *tx)
        .await?;

        mutator(&mut submission);
        submission.modified_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE submissions SET
                name = $1, folder = $2, title = $3, description = $4, document = $5,
                is_published = $6, is_ingested = $7, published_at = $8, ingested_at = $9,
                modified_at = $10
            WHERE submission_id = $11
            "#,
        )
        .bind(&submission.name)
        .bind(&submission.folder)
        .bind(&submission.title)
        .bind(&submission.description)
        .bind(&submission.document)
        .bind(submission.is_published)
        .bind(submission.is_ingested)
        .bind(submission.published_at)
        .bind(submission.ingested_at)
        .bind(submission.modified_at)
        .bind(submission_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await
    }

    pub async fn delete_by_id(&self, submission_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM submissions WHERE submission_id = $1")
            .bind(submission_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Submissions with at least one `Registration` row but `is_published = false`:
    /// the recovery set the worker's startup pass resumes or compensates.
    pub async fn list_partially_published(&self) -> Result<Vec<Submission>> {
        sqlx::query_as::<_, Submission>(
            r#"
            SELECT DISTINCT s.* FROM submissions s
            JOIN registrations r ON r.submission_id = s.submission_id
            WHERE s.is_published = false
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }
}

fn push_filter<'a>(query: &mut QueryBuilder<'a, sqlx::Postgres>, filter: &'a SubmissionFilter) {
    if let Some(project_id) = &filter.project_id {
        query.push(" AND project_id = ").push_bind(project_id);
    }
    if let Some(name) = &filter.name_substring {
        query.push(" AND name ILIKE ").push_bind(format!("%{name}%"));
    }
    if let Some(is_published) = filter.is_published {
        query.push(" AND is_published = ").push_bind(is_published);
    }
    if let Some(is_ingested) = filter.is_ingested {
        query.push(" AND is_ingested = ").push_bind(is_ingested);
    }
    if let Some(start) = filter.created_start {
        query.push(" AND created_at >= ").push_bind(start);
    }
    if let Some(end) = filter.created_end {
        query.push(" AND created_at <= ").push_bind(end);
    }
    if let Some(start) = filter.modified_start {
        query.push(" AND modified_at >= ").push_bind(start);
    }
    if let Some(end) = filter.modified_end {
        query.push(" AND modified_at <= ").push_bind(end);
    }
}
