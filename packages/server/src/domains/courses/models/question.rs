use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{SqliteConnection, SqlitePool};

/// Stored quiz question. Block-shaped columns hold JSON.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Question {
    pub id: i64,
    pub task_id: i64,
    pub position: i64,
    pub question_type: String,
    pub answer_type: String,
    pub coding_languages: Option<JsonValue>,
    pub blocks: JsonValue,
    pub correct_answer: Option<JsonValue>,
    pub scorecard: Option<JsonValue>,
    pub context: Option<JsonValue>,
}

/// Question content to insert; position and task come from the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestion {
    pub question_type: String,
    pub answer_type: String,
    pub coding_languages: Option<JsonValue>,
    pub blocks: JsonValue,
    pub correct_answer: Option<JsonValue>,
    pub scorecard: Option<JsonValue>,
    pub context: Option<JsonValue>,
}

impl NewQuestion {
    pub(super) async fn insert(
        &self,
        task_id: i64,
        position: i64,
        conn: &mut SqliteConnection,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO questions
                (task_id, position, question_type, answer_type, coding_languages,
                 blocks, correct_answer, scorecard, context)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(task_id)
        .bind(position)
        .bind(&self.question_type)
        .bind(&self.answer_type)
        .bind(&self.coding_languages)
        .bind(&self.blocks)
        .bind(&self.correct_answer)
        .bind(&self.scorecard)
        .bind(&self.context)
        .execute(conn)
        .await?;
        Ok(())
    }
}

impl Question {
    pub async fn list_for_task(task_id: i64, pool: &SqlitePool) -> Result<Vec<Self>> {
        let questions = sqlx::query_as::<_, Question>(
            "SELECT * FROM questions WHERE task_id = ? ORDER BY position",
        )
        .bind(task_id)
        .fetch_all(pool)
        .await?;
        Ok(questions)
    }
}
