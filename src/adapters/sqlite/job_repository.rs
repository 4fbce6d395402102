//! SQLite implementation of the JobPersistenceService.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use tracing::{debug, instrument};

use crate::domain::errors::{GenieError, GenieResult};
use crate::domain::models::{Job, JobExecution, JobMetadata, JobRequest, JobStatus};
use crate::domain::ports::JobPersistenceService;

/// Statuses that accept no further transitions.
const FINISHED: &str = "('SUCCEEDED', 'KILLED', 'FAILED', 'INVALID')";

pub struct SqliteJobPersistence {
    pool: SqlitePool,
}

impl SqliteJobPersistence {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Explain why an update matched no row: unknown id or finished job.
    async fn unchanged(&self, job_id: &str) -> GenieError {
        let status: Result<Option<(String,)>, sqlx::Error> =
            sqlx::query_as("SELECT status FROM jobs WHERE id = ?")
                .bind(job_id)
                .fetch_optional(&self.pool)
                .await;

        match status {
            Ok(Some((status,))) => GenieError::Precondition(format!(
                "Job {job_id} is already finished with status {status}"
            )),
            Ok(None) => not_found(job_id),
            Err(err) => err.into(),
        }
    }
}

fn not_found(job_id: &str) -> GenieError {
    GenieError::NotFound(format!("No job with id {job_id} exists"))
}

fn finished_message(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Succeeded => "Job finished successfully.",
        JobStatus::Killed => "Job was killed.",
        _ => "Job failed.",
    }
}

#[async_trait]
impl JobPersistenceService for SqliteJobPersistence {
    #[instrument(skip_all, fields(job_id = %job.id))]
    async fn create_job(
        &self,
        request: &JobRequest,
        metadata: &JobMetadata,
        job: &Job,
        execution: &JobExecution,
    ) -> GenieResult<()> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO jobs (id, name, user_name, version, status, status_msg, cluster_id, command_id,
                                 application_ids, memory, tags, archive_location, request, metadata,
                                 created_at, updated_at, started_at, finished_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&job.id)
        .bind(&job.name)
        .bind(&job.user)
        .bind(&job.version)
        .bind(job.status.as_str())
        .bind(&job.status_msg)
        .bind(&job.cluster_id)
        .bind(&job.command_id)
        .bind(serde_json::to_string(&job.application_ids)?)
        .bind(job.memory.map(i64::from))
        .bind(serde_json::to_string(&job.tags)?)
        .bind(&job.archive_location)
        .bind(serde_json::to_string(request)?)
        .bind(serde_json::to_string(metadata)?)
        .bind(job.created_at.to_rfc3339())
        .bind(&now)
        .bind(job.started_at.map(|dt| dt.to_rfc3339()))
        .bind(job.finished_at.map(|dt| dt.to_rfc3339()))
        .execute(&mut *tx)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                GenieError::Conflict(format!("A job with id {} already exists", job.id))
            }
            other => other.into(),
        })?;

        sqlx::query(
            "INSERT INTO job_executions (id, host_name, process_id, exit_code, memory) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&execution.id)
        .bind(&execution.host_name)
        .bind(execution.process_id.map(i64::from))
        .bind(execution.exit_code)
        .bind(execution.memory.map(i64::from))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!("Job record created");
        Ok(())
    }

    #[instrument(skip(self, application_ids))]
    async fn update_job_with_runtime_environment(
        &self,
        job_id: &str,
        cluster_id: &str,
        command_id: &str,
        application_ids: &[String],
        memory: u32,
    ) -> GenieResult<()> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(&format!(
            "UPDATE jobs SET cluster_id = ?, command_id = ?, application_ids = ?, memory = ?, updated_at = ?
             WHERE id = ? AND status NOT IN {FINISHED}"
        ))
        .bind(cluster_id)
        .bind(command_id)
        .bind(serde_json::to_string(application_ids)?)
        .bind(i64::from(memory))
        .bind(&now)
        .bind(job_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(self.unchanged(job_id).await);
        }

        sqlx::query("UPDATE job_executions SET memory = ? WHERE id = ?")
            .bind(i64::from(memory))
            .bind(job_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_job_status(
        &self,
        job_id: &str,
        status: JobStatus,
        status_msg: &str,
    ) -> GenieResult<()> {
        let now = Utc::now().to_rfc3339();
        let finished_at = status.is_finished().then(|| now.clone());
        let started_at = (status == JobStatus::Running).then(|| now.clone());

        let result = sqlx::query(&format!(
            "UPDATE jobs SET status = ?, status_msg = ?, updated_at = ?,
                    started_at = COALESCE(started_at, ?), finished_at = COALESCE(?, finished_at)
             WHERE id = ? AND status NOT IN {FINISHED}"
        ))
        .bind(status.as_str())
        .bind(status_msg)
        .bind(&now)
        .bind(started_at)
        .bind(finished_at)
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.unchanged(job_id).await);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_job_running(&self, job_id: &str, process_id: u32) -> GenieResult<()> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(&format!(
            "UPDATE jobs SET status = 'RUNNING', status_msg = 'Job is Running.', updated_at = ?,
                    started_at = COALESCE(started_at, ?)
             WHERE id = ? AND status NOT IN {FINISHED}"
        ))
        .bind(&now)
        .bind(&now)
        .bind(job_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(self.unchanged(job_id).await);
        }

        sqlx::query("UPDATE job_executions SET process_id = ? WHERE id = ?")
            .bind(i64::from(process_id))
            .bind(job_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_exit_code(&self, job_id: &str, exit_code: i32) -> GenieResult<()> {
        let status = JobStatus::from_exit_code(exit_code);
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(&format!(
            "UPDATE jobs SET status = ?, status_msg = ?, updated_at = ?, finished_at = ?
             WHERE id = ? AND status NOT IN {FINISHED}"
        ))
        .bind(status.as_str())
        .bind(finished_message(status))
        .bind(&now)
        .bind(&now)
        .bind(job_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(self.unchanged(job_id).await);
        }

        sqlx::query("UPDATE job_executions SET exit_code = ? WHERE id = ?")
            .bind(exit_code)
            .bind(job_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(%status, "Recorded job exit code");
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> GenieResult<Option<Job>> {
        let row: Option<JobRow> = sqlx::query_as(
            r#"SELECT id, name, user_name, version, status, status_msg, cluster_id, command_id,
                      application_ids, memory, tags, archive_location, created_at, started_at, finished_at
               FROM jobs WHERE id = ?"#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn get_job_execution(&self, job_id: &str) -> GenieResult<Option<JobExecution>> {
        let row: Option<JobExecutionRow> = sqlx::query_as(
            "SELECT id, host_name, process_id, exit_code, memory FROM job_executions WHERE id = ?",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_into()).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: String,
    name: String,
    user_name: String,
    version: String,
    status: String,
    status_msg: Option<String>,
    cluster_id: Option<String>,
    command_id: Option<String>,
    application_ids: String,
    memory: Option<i64>,
    tags: String,
    archive_location: Option<String>,
    created_at: String,
    started_at: Option<String>,
    finished_at: Option<String>,
}

fn parse_datetime(s: &str) -> GenieResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| GenieError::Server(format!("Invalid timestamp {s}: {e}")))
}

fn parse_optional_datetime(s: Option<String>) -> GenieResult<Option<DateTime<Utc>>> {
    s.as_deref().map(parse_datetime).transpose()
}

fn to_u32(value: Option<i64>, column: &str) -> GenieResult<Option<u32>> {
    value
        .map(u32::try_from)
        .transpose()
        .map_err(|_| GenieError::Server(format!("Column {column} out of range")))
}

impl TryFrom<JobRow> for Job {
    type Error = GenieError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status = JobStatus::from_str(&row.status)
            .ok_or_else(|| GenieError::Server(format!("Invalid job status: {}", row.status)))?;
        let application_ids: Vec<String> = serde_json::from_str(&row.application_ids)?;
        let tags: BTreeSet<String> = serde_json::from_str(&row.tags)?;

        Ok(Job {
            id: row.id,
            name: row.name,
            user: row.user_name,
            version: row.version,
            status,
            status_msg: row.status_msg,
            cluster_id: row.cluster_id,
            command_id: row.command_id,
            application_ids,
            memory: to_u32(row.memory, "memory")?,
            tags,
            archive_location: row.archive_location,
            created_at: parse_datetime(&row.created_at)?,
            started_at: parse_optional_datetime(row.started_at)?,
            finished_at: parse_optional_datetime(row.finished_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct JobExecutionRow {
    id: String,
    host_name: String,
    process_id: Option<i64>,
    exit_code: Option<i32>,
    memory: Option<i64>,
}

impl TryFrom<JobExecutionRow> for JobExecution {
    type Error = GenieError;

    fn try_from(row: JobExecutionRow) -> Result<Self, Self::Error> {
        Ok(JobExecution {
            id: row.id,
            host_name: row.host_name,
            process_id: to_u32(row.process_id, "process_id")?,
            exit_code: row.exit_code,
            memory: to_u32(row.memory, "memory")?,
        })
    }
}
