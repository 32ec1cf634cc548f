// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io")]
    Io(#[from] io::Error),
    #[error("entrypoint did not return valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("module subprocess exited with code {code:?}: {stderr}")]
    Subprocess { code: Option<i32>, stderr: String },
    #[error("module entrypoint raised: {0}")]
    EntrypointError(String),
    #[error("module subprocess exceeded its deadline")]
    Timeout,
}
