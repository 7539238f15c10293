//! Persistent ledger of generation jobs.
//!
//! Every write is a single statement or one short transaction. Ownership of
//! a job is taken with [`JobLedger::claim`], a compare-and-swap on
//! `(status, owner)`, so at most one live driver exists per token.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use sqlx::sqlite::SqliteArguments;
use sqlx::{FromRow, Sqlite, SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use super::job::{GenerationJob, JobKind, JobStatus};

const JOB_COLUMNS: &str = "id, token, kind, subject_id, course_id, parent_token, status, \
                           details, owner, created_at, updated_at";

#[derive(Debug, Error)]
pub enum JobError {
    #[error("generation job {0} not found")]
    NotFound(String),
}

/// Task-job counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, FromRow)]
pub struct JobStatusCounts {
    pub started: i64,
    pub pending: i64,
    pub completed: i64,
    pub failed: i64,
}

impl JobStatusCounts {
    pub fn total(&self) -> i64 {
        self.started + self.pending + self.completed + self.failed
    }

    /// At least one job exists and none is still running.
    pub fn all_settled(&self) -> bool {
        self.total() > 0 && self.started == 0 && self.pending == 0
    }
}

#[derive(Clone)]
pub struct JobLedger {
    pool: SqlitePool,
    owner_id: String,
}

impl JobLedger {
    /// Ledger for a fresh process instance.
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_owner(pool, format!("instance-{}", Uuid::new_v4()))
    }

    pub fn with_owner(pool: SqlitePool, owner_id: impl Into<String>) -> Self {
        Self {
            pool,
            owner_id: owner_id.into(),
        }
    }

    /// Id recorded as `owner` by [`claim`](Self::claim).
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    // ========================================================================
    // Writes
    // ========================================================================

    pub async fn create(&self, job: GenerationJob) -> Result<GenerationJob> {
        let mut conn = self.pool.acquire().await?;
        let created = insert(&mut *conn, &job).await?;
        debug!(token = %created.token, kind = ?created.kind, subject_id = created.subject_id, "Recorded generation job");
        Ok(created)
    }

    /// Record all child jobs of one dispatch atomically.
    ///
    /// Children that already exist for the same parent and task are left
    /// alone and not returned, so concurrent dispatches never duplicate work.
    pub async fn create_task_jobs(&self, jobs: Vec<GenerationJob>) -> Result<Vec<GenerationJob>> {
        let query = format!(
            r#"
            INSERT INTO generation_jobs
                (token, kind, subject_id, course_id, parent_token, status, details, owner, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (parent_token, subject_id) WHERE parent_token IS NOT NULL DO NOTHING
            RETURNING {}
            "#,
            JOB_COLUMNS
        );

        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(jobs.len());
        for job in &jobs {
            let row = bind_job(sqlx::query_as::<_, GenerationJob>(&query), job)
                .fetch_optional(&mut *tx)
                .await?;
            created.extend(row);
        }
        tx.commit().await?;

        debug!(requested = jobs.len(), created = created.len(), "Recorded task jobs");
        Ok(created)
    }

    pub async fn set_status(&self, token: &str, status: JobStatus) -> Result<()> {
        let rows = sqlx::query("UPDATE generation_jobs SET status = ?, updated_at = ? WHERE token = ?")
            .bind(status)
            .bind(Utc::now())
            .bind(token)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(JobError::NotFound(token.to_string()).into());
        }
        Ok(())
    }

    pub async fn set_status_and_details(
        &self,
        token: &str,
        status: JobStatus,
        details: &serde_json::Value,
    ) -> Result<()> {
        let rows = sqlx::query(
            "UPDATE generation_jobs SET status = ?, details = ?, updated_at = ? WHERE token = ?",
        )
        .bind(status)
        .bind(details)
        .bind(Utc::now())
        .bind(token)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(JobError::NotFound(token.to_string()).into());
        }
        Ok(())
    }

    /// Write `details` inside the caller's transaction.
    pub async fn save_checkpoint(
        conn: &mut SqliteConnection,
        token: &str,
        details: &serde_json::Value,
    ) -> Result<()> {
        sqlx::query("UPDATE generation_jobs SET details = ?, updated_at = ? WHERE token = ?")
            .bind(details)
            .bind(Utc::now())
            .bind(token)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Take ownership of `token` if it is in `expected` and not already
    /// owned by this instance.
    ///
    /// A job owned by another instance id is taken over as stale. This
    /// assumes one server process runs against the database at a time, so
    /// any other owner is a previous, crashed run.
    pub async fn claim(&self, token: &str, expected: JobStatus, new: JobStatus) -> Result<bool> {
        let rows = sqlx::query(
            r#"
            UPDATE generation_jobs
            SET status = ?, owner = ?, updated_at = ?
            WHERE token = ?
              AND status = ?
              AND (owner IS NULL OR owner <> ?)
            "#,
        )
        .bind(new)
        .bind(&self.owner_id)
        .bind(Utc::now())
        .bind(token)
        .bind(expected)
        .bind(&self.owner_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        debug!(token, ?expected, ?new, claimed = rows == 1, "Claim generation job");
        Ok(rows == 1)
    }

    /// Move `token` from `expected` to `new`; false if it was not in `expected`.
    pub async fn transition(&self, token: &str, expected: JobStatus, new: JobStatus) -> Result<bool> {
        let rows = sqlx::query(
            "UPDATE generation_jobs SET status = ?, updated_at = ? WHERE token = ? AND status = ?",
        )
        .bind(new)
        .bind(Utc::now())
        .bind(token)
        .bind(expected)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows == 1)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Details document of `token`.
    pub async fn get(&self, token: &str) -> Result<serde_json::Value> {
        Ok(self.find(token).await?.details)
    }

    pub async fn find(&self, token: &str) -> Result<GenerationJob> {
        let query = format!("SELECT {} FROM generation_jobs WHERE token = ?", JOB_COLUMNS);
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| JobError::NotFound(token.to_string()).into())
    }

    pub async fn list_incomplete_course_jobs(&self) -> Result<Vec<GenerationJob>> {
        self.list_incomplete(JobKind::CourseStructure).await
    }

    pub async fn list_incomplete_task_jobs(&self) -> Result<Vec<GenerationJob>> {
        self.list_incomplete(JobKind::Task).await
    }

    async fn list_incomplete(&self, kind: JobKind) -> Result<Vec<GenerationJob>> {
        let query = format!(
            "SELECT {} FROM generation_jobs \
             WHERE kind = ? AND status NOT IN ('completed', 'failed') \
             ORDER BY id",
            JOB_COLUMNS
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(kind)
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }

    /// Task jobs spawned by the course job `parent_token`.
    pub async fn children_of(&self, parent_token: &str) -> Result<Vec<GenerationJob>> {
        let query = format!(
            "SELECT {} FROM generation_jobs WHERE parent_token = ? ORDER BY id",
            JOB_COLUMNS
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(parent_token)
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }

    /// Status counts of every task job of `course_id`.
    pub async fn aggregate_status(&self, course_id: i64) -> Result<JobStatusCounts> {
        let query = format!(
            "{} WHERE kind = 'task' AND course_id = ?",
            COUNTS_SELECT
        );
        sqlx::query_as::<_, JobStatusCounts>(&query)
            .bind(course_id)
            .fetch_one(&self.pool)
            .await
            .map_err(Into::into)
    }

    /// Status counts of the task jobs spawned by `parent_token`.
    pub async fn aggregate_status_for_parent(&self, parent_token: &str) -> Result<JobStatusCounts> {
        let query = format!("{} WHERE parent_token = ?", COUNTS_SELECT);
        sqlx::query_as::<_, JobStatusCounts>(&query)
            .bind(parent_token)
            .fetch_one(&self.pool)
            .await
            .map_err(Into::into)
    }
}

const COUNTS_SELECT: &str = r#"
    SELECT
        COALESCE(SUM(CASE WHEN status = 'started' THEN 1 ELSE 0 END), 0) AS started,
        COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0) AS pending,
        COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0) AS completed,
        COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0) AS failed
    FROM generation_jobs
"#;

async fn insert(conn: &mut SqliteConnection, job: &GenerationJob) -> Result<GenerationJob> {
    let query = format!(
        r#"
        INSERT INTO generation_jobs
            (token, kind, subject_id, course_id, parent_token, status, details, owner, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        JOB_COLUMNS
    );
    bind_job(sqlx::query_as::<_, GenerationJob>(&query), job)
        .fetch_one(conn)
        .await
        .map_err(Into::into)
}

type JobQuery<'q> = sqlx::query::QueryAs<'q, Sqlite, GenerationJob, SqliteArguments<'q>>;

fn bind_job<'q>(query: JobQuery<'q>, job: &'q GenerationJob) -> JobQuery<'q> {
    query
        .bind(&job.token)
        .bind(job.kind)
        .bind(job.subject_id)
        .bind(job.course_id)
        .bind(&job.parent_token)
        .bind(job.status)
        .bind(&job.details)
        .bind(&job.owner)
        .bind(job.created_at)
        .bind(job.updated_at)
}
