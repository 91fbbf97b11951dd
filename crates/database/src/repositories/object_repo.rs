use sqlx::{PgPool, QueryBuilder, Result};

use crate::models::MetadataObject;

#[derive(Debug, Default, Clone)]
pub struct ObjectFilter {
    pub submission_id: String,
    /// Ordered list of types to filter on; order is also the sort order
    /// (objects of `object_types[0]` before `object_types[1]`, etc).
    pub object_types: Vec<String>,
    pub object_id: Option<String>,
    pub name: Option<String>,
}

#[derive(Clone)]
pub struct ObjectRepository {
    pool: PgPool,
}

impl ObjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn add(&self, object: &MetadataObject) -> Result<MetadataObject> {
        sqlx::query_as::<_, MetadataObject>(
            r#"
            INSERT INTO objects
                (object_id, submission_id, project_id, object_type, name, title, description, document, xml_document)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&object.object_id)
        .bind(&object.submission_id)
        .bind(&object.project_id)
        .bind(&object.object_type)
        .bind(&object.name)
        .bind(&object.title)
        .bind(&object.description)
        .bind(&object.document)
        .bind(&object.xml_document)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get_by_id(&self, object_id: &str) -> Result<Option<MetadataObject>> {
        sqlx::query_as::<_, MetadataObject>("SELECT * FROM objects WHERE object_id = $1")
            .bind(object_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_by_name(&self, project_id: &str, object_type: &str, name: &str) -> Result<Option<MetadataObject>> {
        sqlx::query_as::<_, MetadataObject>(
            "SELECT * FROM objects WHERE project_id = $1 AND object_type = $2 AND name = $3",
        )
        .bind(project_id)
        .bind(object_type)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn count_by_type(&self, submission_id: &str) -> Result<Vec<(String, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT object_type, COUNT(*) FROM objects WHERE submission_id = $1 GROUP BY object_type",
        )
        .bind(submission_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list(&self, filter: &ObjectFilter) -> Result<Vec<MetadataObject>> {
        let mut query = QueryBuilder::new("SELECT * FROM objects WHERE submission_id = ");
        query.push_bind(filter.submission_id.clone());

        if !filter.object_types.is_empty() {
            query.push(" AND object_type = ANY(");
            query.push_bind(filter.object_types.clone());
            query.push(")");
        }
        if let Some(object_id) = &filter.object_id {
            query.push(" AND object_id = ").push_bind(object_id.clone());
        }
        if let Some(name) = &filter.name {
            query.push(" AND name = ").push_bind(name.clone());
        }

        if filter.object_types.len() > 1 {
            query.push(" ORDER BY CASE object_type");
            for (i, t) in filter.object_types.iter().enumerate() {
                query.push(" WHEN ").push_bind(t.clone()).push(" THEN ").push_bind(i as i32);
            }
            query.push(" END, created_at ASC");
        } else {
            query.push(" ORDER BY created_at ASC");
        }

        query.build_query_as::<MetadataObject>().fetch_all(&self.pool).await
    }

    pub async fn update<F>(&self, object_id: &str, mutator: F) -> Result<()>
    where
        F: FnOnce(&mut MetadataObject),
    {
        let mut tx = self.pool.begin().await?;
        let mut object =
            sqlx::query_as::<_, MetadataObject>("SELECT * FROM objects WHERE object_id = $1 FOR UPDATE")
                .bind(object_id)
                .fetch_one(&mut *tx)
                .await?;

        mutator(&mut object);
        object.modified_at = chrono::Utc::now();

        sqlx::query(
            r#"
            UPDATE objects SET
                name = $1, title = $2, description = $3, document = $4, xml_document = $5, modified_at = $6
            WHERE object_id = $7
            "#,
        )
        .bind(&object.name)
        .bind(&object.title)
        .bind(&object.description)
        .bind(&object.document)
        .bind(&object.xml_document)
        .bind(object.modified_at)
        .bind(object_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await
    }

    pub async fn delete_by_id(&self, object_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM objects WHERE object_id = $1")
            .bind(object_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
