// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("hub rejected credentials")]
    Auth,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("hub transport error")]
    Transport(#[from] reqwest::Error),
    #[error("malformed hub response")]
    Decode(#[from] serde_json::Error),
    #[error("malformed session token")]
    Token,
}
