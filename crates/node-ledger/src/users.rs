// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

use node_types::Consumer;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::error::{from_sqlx, Error};

#[derive(Debug, Clone)]
pub struct ConsumerRepository {
    pool: PgPool,
}

impl ConsumerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts the consumer if absent, otherwise returns the existing row
    /// (consumer identity is derived entirely from the public key, so
    /// registration is naturally idempotent).
    pub async fn create(&self, consumer: &Consumer) -> Result<Consumer, Error> {
        sqlx::query("INSERT INTO users (id, public_key) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING")
            .bind(&consumer.id)
            .bind(&consumer.public_key)
            .execute(&self.pool)
            .await
            .map_err(from_sqlx)?;

        self.get_by_public_key(&consumer.public_key).await
    }

    pub async fn get_by_public_key(&self, public_key: &str) -> Result<Consumer, Error> {
        let row = sqlx::query("SELECT id, public_key FROM users WHERE public_key = $1")
            .bind(public_key)
            .fetch_one(&self.pool)
            .await
            .map_err(from_sqlx)?;

        Ok(Consumer {
            id: row.try_get("id").map_err(from_sqlx)?,
            public_key: row.try_get("public_key").map_err(from_sqlx)?,
        })
    }
}
