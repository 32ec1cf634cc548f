// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("timed out waiting for install lock")]
    LockTimeout,
    #[error("io")]
    Io(#[from] io::Error),
    #[error("obtaining exclusive file lock")]
    Flock(#[from] nix::Error),
    #[error("fetching module source: {0}")]
    Source(String),
    #[error("module failed post-install verification: {0}")]
    Verify(String),
    #[error("reading module config: {0}")]
    Config(String),
}
