// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no such run or user")]
    NotFound,
    #[error("unique constraint violated")]
    Conflict,
    #[error("database error")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("value could not be decoded: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the underlying condition is worth retrying (a checkout
    /// timeout, a dropped connection, a statement timeout) rather than a
    /// structural failure (bad query, constraint violation).
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Sqlx(sqlx::Error::PoolTimedOut | sqlx::Error::Io(_)) => true,
            Error::Sqlx(sqlx::Error::Database(db)) => db.message().contains("statement timeout"),
            _ => false,
        }
    }
}

pub(crate) fn from_sqlx(err: sqlx::Error) -> Error {
    match &err {
        sqlx::Error::RowNotFound => Error::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => Error::Conflict,
        _ => Error::Sqlx(err),
    }
}
