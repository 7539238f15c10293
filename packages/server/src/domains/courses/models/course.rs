use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Course {
    pub async fn create(name: &str, pool: &SqlitePool) -> Result<Self> {
        let course = sqlx::query_as::<_, Course>("INSERT INTO courses (name) VALUES (?) RETURNING *")
            .bind(name)
            .fetch_one(pool)
            .await?;
        Ok(course)
    }

    pub async fn find_by_id(id: i64, pool: &SqlitePool) -> Result<Option<Self>> {
        let course = sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(course)
    }
}
