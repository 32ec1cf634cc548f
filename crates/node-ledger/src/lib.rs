// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Pooled, authoritative persistence for runs and consumers.
//!
//! A single-user CLI package manager can get away with a `Mutex` around one
//! synchronous connection; this ledger must sustain genuine concurrent
//! access from many worker tasks at once, so it is built on [`sqlx::PgPool`]
//! instead. See `DESIGN.md` for the full rationale.

pub use crate::error::Error;
pub use crate::pool::PoolStats;
pub use crate::runs::RunRepository;
pub use crate::users::ConsumerRepository;

mod error;
mod pool;
mod runs;
mod users;

use sqlx::postgres::PgPool;

/// Handle to the node's persistence layer: one pool, shared by the run and
/// consumer repositories.
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: PgPool,
    pub runs: RunRepository,
    pub consumers: ConsumerRepository,
}

impl Ledger {
    /// Connects the pool and runs any pending migrations. Call once at
    /// node startup.
    pub async fn connect(database_url: &str) -> Result<Self, Error> {
        let pool = pool::connect(database_url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self {
            runs: RunRepository::new(pool.clone()),
            consumers: ConsumerRepository::new(pool.clone()),
            pool,
        })
    }

    /// `SELECT 1` against a pooled connection; used by the node's health
    /// endpoint and logged at `debug!` when it fails.
    pub async fn health_check(&self) -> bool {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => true,
            Err(err) => {
                log::warn!("ledger health check failed: {err}");
                false
            }
        }
    }

    pub fn pool_stats(&self) -> PoolStats {
        pool::stats(&self.pool)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Drops every table this ledger owns and re-runs migrations from
    /// scratch. Destructive; intended for the CLI's `reset` subcommand and
    /// disposable test environments only.
    pub async fn reset(&self) -> Result<(), Error> {
        for table in ["agent_runs", "tool_runs", "orchestrator_runs", "environment_runs", "kb_runs", "users"] {
            sqlx::query(&format!("DROP TABLE IF EXISTS {table} CASCADE"))
                .execute(&self.pool)
                .await?;
        }
        sqlx::query("DELETE FROM _sqlx_migrations").execute(&self.pool).await.ok();
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}
