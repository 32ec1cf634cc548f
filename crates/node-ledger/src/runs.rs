// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use node_types::{Deployment, Run, RunKind, RunStatus};
use sqlx::postgres::PgPool;
use sqlx::types::Json;
use sqlx::Row;

use crate::error::{from_sqlx, Error};

/// Read-after-write on a freshly created run may race a replica or a slow
/// commit; retry a few times with a short pause rather than surface a
/// spurious not-found.
const READ_RETRIES: usize = 3;
const READ_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Transient write failures (pool checkout timeout, dropped connection,
/// statement timeout) are retried with exponential backoff before being
/// treated as fatal, per the Ledger's error-handling contract.
const WRITE_RETRIES: usize = 3;
const WRITE_RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

fn table_name(kind: RunKind) -> &'static str {
    match kind {
        RunKind::Agent => "agent_runs",
        RunKind::Tool => "tool_runs",
        RunKind::Orchestrator => "orchestrator_runs",
        RunKind::Environment => "environment_runs",
        RunKind::Kb => "kb_runs",
    }
}

/// Persistence for [`Run`]s across the five run-kind tables.
#[derive(Debug, Clone)]
pub struct RunRepository {
    pool: PgPool,
}

impl RunRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, kind: RunKind, run: &Run) -> Result<Run, Error> {
        let mut attempt = 0;
        loop {
            match self.create_once(kind, run).await {
                Ok(created) => return Ok(created),
                Err(err) if err.is_transient() && attempt + 1 < WRITE_RETRIES => {
                    attempt += 1;
                    let delay = WRITE_RETRY_BASE_DELAY * 2u32.pow(attempt as u32 - 1);
                    log::warn!("transient error creating run, retry {attempt}/{WRITE_RETRIES} in {delay:?}: {err}");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn create_once(&self, kind: RunKind, run: &Run) -> Result<Run, Error> {
        let table = table_name(kind);
        let id = if run.id.is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            run.id.clone()
        };

        let query = format!(
            "INSERT INTO {table} \
             (id, consumer_id, deployment, inputs, status, error, error_message, results, \
              created_time, start_processing_time, completed_time, duration, parent_runs, child_runs) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING id"
        );

        sqlx::query(&query)
            .bind(&id)
            .bind(&run.consumer_id)
            .bind(Json(&run.deployment))
            .bind(&run.inputs)
            .bind(run.status.to_string())
            .bind(run.error)
            .bind(&run.error_message)
            .bind(Json(&run.results))
            .bind(run.created_time)
            .bind(run.start_processing_time)
            .bind(run.completed_time)
            .bind(run.duration)
            .bind(&run.parent_runs)
            .bind(&run.child_runs)
            .fetch_one(&self.pool)
            .await
            .map_err(from_sqlx)?;

        let mut persisted = run.clone();
        persisted.id = id;
        Ok(persisted)
    }

    pub async fn update(&self, kind: RunKind, id: &str, run: &Run) -> Result<bool, Error> {
        let mut attempt = 0;
        loop {
            match self.update_once(kind, id, run).await {
                Ok(updated) => return Ok(updated),
                Err(err) if err.is_transient() && attempt + 1 < WRITE_RETRIES => {
                    attempt += 1;
                    let delay = WRITE_RETRY_BASE_DELAY * 2u32.pow(attempt as u32 - 1);
                    log::warn!("transient error updating run {id}, retry {attempt}/{WRITE_RETRIES} in {delay:?}: {err}");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn update_once(&self, kind: RunKind, id: &str, run: &Run) -> Result<bool, Error> {
        let table = table_name(kind);
        let query = format!(
            "UPDATE {table} SET \
             status = $1, error = $2, error_message = $3, results = $4, \
             start_processing_time = $5, completed_time = $6, duration = $7, \
             parent_runs = $8, child_runs = $9 \
             WHERE id = $10"
        );

        let result = sqlx::query(&query)
            .bind(run.status.to_string())
            .bind(run.error)
            .bind(&run.error_message)
            .bind(Json(&run.results))
            .bind(run.start_processing_time)
            .bind(run.completed_time)
            .bind(run.duration)
            .bind(&run.parent_runs)
            .bind(&run.child_runs)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(from_sqlx)?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get(&self, kind: RunKind, id: &str) -> Result<Run, Error> {
        let mut attempt = 0;
        loop {
            match self.get_once(kind, id).await {
                Ok(run) => return Ok(run),
                Err(Error::NotFound) if attempt + 1 < READ_RETRIES => {
                    attempt += 1;
                    log::debug!("run {id} not yet visible, retry {attempt}/{READ_RETRIES}");
                    tokio::time::sleep(READ_RETRY_DELAY).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn get_once(&self, kind: RunKind, id: &str) -> Result<Run, Error> {
        let table = table_name(kind);
        let query = format!("SELECT * FROM {table} WHERE id = $1");

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(from_sqlx)?;

        row_to_run(kind, row)
    }

    pub async fn list(&self, kind: RunKind, consumer_id: Option<&str>) -> Result<Vec<Run>, Error> {
        let table = table_name(kind);
        let rows = if let Some(consumer_id) = consumer_id {
            let query = format!("SELECT * FROM {table} WHERE consumer_id = $1 ORDER BY created_time");
            sqlx::query(&query).bind(consumer_id).fetch_all(&self.pool).await
        } else {
            let query = format!("SELECT * FROM {table} ORDER BY created_time");
            sqlx::query(&query).fetch_all(&self.pool).await
        }
        .map_err(from_sqlx)?;

        rows.into_iter().map(|row| row_to_run(kind, row)).collect()
    }

    pub async fn delete(&self, kind: RunKind, id: &str) -> Result<bool, Error> {
        let table = table_name(kind);
        let query = format!("DELETE FROM {table} WHERE id = $1");
        let result = sqlx::query(&query).bind(id).execute(&self.pool).await.map_err(from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_to_run(kind: RunKind, row: sqlx::postgres::PgRow) -> Result<Run, Error> {
    let status: String = row.try_get("status").map_err(from_sqlx)?;
    let status = RunStatus::from_str(&status).map_err(|_| Error::Internal(format!("bad status {status:?}")))?;

    let deployment: Json<Deployment> = row.try_get("deployment").map_err(from_sqlx)?;
    let results: Json<Vec<String>> = row.try_get("results").map_err(from_sqlx)?;

    Ok(Run {
        id: row.try_get("id").map_err(from_sqlx)?,
        consumer_id: row.try_get("consumer_id").map_err(from_sqlx)?,
        kind,
        deployment: deployment.0,
        inputs: row.try_get("inputs").map_err(from_sqlx)?,
        status,
        error: row.try_get("error").map_err(from_sqlx)?,
        error_message: row.try_get("error_message").map_err(from_sqlx)?,
        results: results.0,
        created_time: row.try_get::<DateTime<Utc>, _>("created_time").map_err(from_sqlx)?,
        start_processing_time: row.try_get("start_processing_time").map_err(from_sqlx)?,
        completed_time: row.try_get("completed_time").map_err(from_sqlx)?,
        duration: row.try_get("duration").map_err(from_sqlx)?,
        parent_runs: row.try_get("parent_runs").map_err(from_sqlx)?,
        child_runs: row.try_get("child_runs").map_err(from_sqlx)?,
    })
}
