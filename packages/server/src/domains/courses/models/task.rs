use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{SqliteConnection, SqlitePool};

use super::question::NewQuestion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TaskType {
    LearningMaterial,
    Quiz,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::LearningMaterial => "learning_material",
            TaskType::Quiz => "quiz",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "learning_material" => Some(TaskType::LearningMaterial),
            "quiz" => Some(TaskType::Quiz),
            _ => None,
        }
    }
}

/// Tasks are created as drafts and published once content lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TaskStatus {
    Draft,
    Published,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: i64,
    pub course_id: i64,
    pub module_id: i64,
    pub name: String,
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub ordering: i64,
    /// Learning-material blocks, once generated
    pub blocks: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// SQL Queries
// =============================================================================

impl Task {
    /// Append a draft task after the last one of `module_id`.
    ///
    /// The ordering is computed inside the `INSERT`, like
    /// [`Module::create_next`](super::Module::create_next).
    pub async fn create_draft(
        course_id: i64,
        module_id: i64,
        name: &str,
        task_type: TaskType,
        conn: &mut SqliteConnection,
    ) -> Result<Self> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (course_id, module_id, name, task_type, status, ordering)
            VALUES (?, ?, ?, ?, 'draft',
                (SELECT COALESCE(MAX(ordering), -1) + 1 FROM tasks WHERE module_id = ?))
            RETURNING *
            "#,
        )
        .bind(course_id)
        .bind(module_id)
        .bind(name)
        .bind(task_type)
        .bind(module_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(task)
    }

    pub async fn find_by_id(id: i64, pool: &SqlitePool) -> Result<Option<Self>> {
        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(task)
    }

    pub async fn list_for_course(course_id: i64, pool: &SqlitePool) -> Result<Vec<Self>> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT t.* FROM tasks t
            JOIN modules m ON m.id = t.module_id
            WHERE t.course_id = ?
            ORDER BY m.ordering, t.ordering
            "#,
        )
        .bind(course_id)
        .fetch_all(pool)
        .await?;
        Ok(tasks)
    }

    /// Store learning-material blocks and publish. Overwrites earlier content.
    pub async fn publish_learning_material(id: i64, blocks: &JsonValue, pool: &SqlitePool) -> Result<()> {
        let rows = sqlx::query(
            "UPDATE tasks SET blocks = ?, status = 'published', updated_at = ? WHERE id = ?",
        )
        .bind(blocks)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

        if rows == 0 {
            bail!("task {} not found", id);
        }
        Ok(())
    }

    /// Replace the questions of a quiz and publish it, atomically.
    pub async fn publish_quiz(id: i64, questions: &[NewQuestion], pool: &SqlitePool) -> Result<()> {
        let mut tx = pool.begin().await?;

        let rows = sqlx::query(
            "UPDATE tasks SET status = 'published', updated_at = ? WHERE id = ?",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if rows == 0 {
            bail!("task {} not found", id);
        }

        sqlx::query("DELETE FROM questions WHERE task_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for (position, question) in questions.iter().enumerate() {
            question.insert(id, position as i64, &mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
