// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

use thiserror::Error;

/// Composed at the run engine boundary; the engine itself never returns
/// `Err` to its caller (see `Engine::run`) but uses this type to format
/// `error_message` on the persisted run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("installing module: {0}")]
    Install(#[from] node_installer::Error),
    #[error("running entrypoint: {0}")]
    Load(#[from] node_loader::Error),
    #[error("persisting run: {0}")]
    Ledger(#[from] node_ledger::Error),
    #[error("fetching run inputs: {0}")]
    FetchInputs(#[from] reqwest::Error),
    #[error("writing fetched run input to disk: {0}")]
    Io(#[from] std::io::Error),
    #[error("inputs failed schema validation: {0}")]
    Schema(String),
}
