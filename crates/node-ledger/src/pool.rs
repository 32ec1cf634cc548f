// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::error::Error;

/// Pool sizing mirrors the ledger contract this node inherits: a warm pool
/// of 120 connections with headroom for 240 more under burst, connections
/// recycled every 5 minutes, and a 30 second acquire timeout so a saturated
/// pool surfaces as a retryable error rather than an indefinite hang.
const POOL_SIZE: u32 = 120;
const MAX_OVERFLOW: u32 = 240;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);
const RECYCLE_AFTER: Duration = Duration::from_secs(300);
const STATEMENT_TIMEOUT_MS: i64 = 30_000;

/// Connects the ledger's pool, applying a per-connection statement timeout
/// and a pre-checkout liveness probe (`test_before_acquire`) the way the
/// ledger this node was modeled on enables `pool_pre_ping`.
pub async fn connect(database_url: &str) -> Result<PgPool, Error> {
    let timeout_stmt = format!("SET statement_timeout = {STATEMENT_TIMEOUT_MS}");

    let pool = PgPoolOptions::new()
        .min_connections(POOL_SIZE)
        .max_connections(POOL_SIZE + MAX_OVERFLOW)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .max_lifetime(RECYCLE_AFTER)
        .test_before_acquire(true)
        .after_connect(move |conn, _meta| {
            let timeout_stmt = timeout_stmt.clone();
            Box::pin(async move {
                sqlx::query(&timeout_stmt).execute(conn).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await?;

    Ok(pool)
}

#[derive(Debug, Clone, Copy)]
pub struct PoolStats {
    pub size: u32,
    pub idle: usize,
    pub in_use: u32,
}

pub fn stats(pool: &PgPool) -> PoolStats {
    let size = pool.size();
    let idle = pool.num_idle();
    PoolStats {
        size,
        idle,
        in_use: size.saturating_sub(idle as u32),
    }
}
