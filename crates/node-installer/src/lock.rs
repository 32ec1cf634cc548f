// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Per-module advisory file locking, adapted from this workspace's package
//! manager side (`moss/src/installation/lockfile.rs`). That lock blocks
//! indefinitely once contended; ours is bounded, since a stuck install
//! must surface to the run engine as a retryable failure rather than hang
//! a worker forever.

use std::os::fd::AsRawFd;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fs_err::{self as fs, File};
use nix::fcntl::{flock, FlockArg};

use crate::error::Error;

/// An acquired file lock guaranteeing exclusive access to the underlying
/// module or persona directory. Released once all clones are dropped.
#[derive(Debug, Clone)]
pub struct Lock(#[allow(dead_code)] Arc<File>);

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Acquires an exclusive lock at `path`, polling until `timeout` elapses.
/// Runs the blocking poll loop on a dedicated thread so callers on an
/// async executor aren't stalled.
pub async fn acquire(path: PathBuf, timeout: Duration) -> Result<Lock, Error> {
    tokio::task::spawn_blocking(move || acquire_blocking(&path, timeout))
        .await
        .expect("lock acquisition task panicked")
}

fn acquire_blocking(path: &PathBuf, timeout: Duration) -> Result<Lock, Error> {
    let file = fs::OpenOptions::new().create(true).write(true).truncate(false).open(path)?;

    let deadline = Instant::now() + timeout;
    loop {
        match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
            Ok(()) => return Ok(Lock(Arc::new(file))),
            Err(nix::errno::Errno::EWOULDBLOCK) => {
                if Instant::now() >= deadline {
                    return Err(Error::LockTimeout);
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => return Err(Error::Flock(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquires_uncontended_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("module.lock");
        let lock = acquire(path, Duration::from_secs(1)).await;
        assert!(lock.is_ok());
    }

    #[tokio::test]
    async fn second_holder_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("module.lock");
        let _held = acquire(path.clone(), Duration::from_secs(1)).await.unwrap();

        let result = acquire(path, Duration::from_millis(300)).await;
        assert!(matches!(result, Err(Error::LockTimeout)));
    }
}
