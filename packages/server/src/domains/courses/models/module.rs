use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};

/// Dark background colours assigned to new modules, cycling by ordering.
pub const MODULE_PALETTE: &[&str] = &[
    "#2d3748", "#433c4c", "#4a5568", "#312e51", "#364135", "#4c393a", "#334155", "#553c2d",
    "#37303f", "#3c4b64", "#463c46", "#3c322d",
];

pub fn palette_color(ordering: i64) -> &'static str {
    MODULE_PALETTE[ordering.rem_euclid(MODULE_PALETTE.len() as i64) as usize]
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Module {
    pub id: i64,
    pub course_id: i64,
    pub name: String,
    pub color: String,
    pub ordering: i64,
    pub created_at: DateTime<Utc>,
}

impl Module {
    /// Append a module after the last one of `course_id`.
    ///
    /// Takes a connection so the caller can commit it together with its
    /// own bookkeeping. The ordering is computed inside the `INSERT` so a
    /// transaction opened by the caller takes the write lock on its first
    /// statement.
    pub async fn create_next(course_id: i64, name: &str, conn: &mut SqliteConnection) -> Result<Self> {
        let module = sqlx::query_as::<_, Module>(
            r#"
            INSERT INTO modules (course_id, name, color, ordering)
            VALUES (?, ?, '', (SELECT COALESCE(MAX(ordering), -1) + 1 FROM modules WHERE course_id = ?))
            RETURNING *
            "#,
        )
        .bind(course_id)
        .bind(name)
        .bind(course_id)
        .fetch_one(&mut *conn)
        .await?;

        let module = sqlx::query_as::<_, Module>("UPDATE modules SET color = ? WHERE id = ? RETURNING *")
            .bind(palette_color(module.ordering))
            .bind(module.id)
            .fetch_one(&mut *conn)
            .await?;
        Ok(module)
    }

    pub async fn list_for_course(course_id: i64, pool: &SqlitePool) -> Result<Vec<Self>> {
        let modules = sqlx::query_as::<_, Module>(
            "SELECT * FROM modules WHERE course_id = ? ORDER BY ordering",
        )
        .bind(course_id)
        .fetch_all(pool)
        .await?;
        Ok(modules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_cycles() {
        assert_eq!(palette_color(0), "#2d3748");
        assert_eq!(palette_color(12), "#2d3748");
        assert_eq!(palette_color(13), "#433c4c");
    }
}
