// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Submits a single run from a JSON request on stdin and blocks until it
//! reaches a terminal status, printing the finished run as JSON. Unlike
//! `run`, which brings up the long-lived worker pool, this is a one-shot
//! entry point — the only caller of `Dispatcher::dispatch` in this binary.
//!
//! Installation is checked before dispatch, outside the Engine's own
//! contract of folding every failure into the persisted run: that is the
//! only way a lock timeout or a failed module verification can surface as
//! this process's own exit code rather than as a run row nobody is polling
//! for a pre-flight failure.

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgMatches, Command};
use node_config::{ConfigError, NodeConfig};
use node_dispatcher::Dispatcher;
use node_engine::Engine;
use node_installer::Installer;
use node_ledger::Ledger;
use node_loader::Loader;
use node_types::{Deployment, Run, RunKind};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

pub fn command() -> Command {
    Command::new("submit").about("Submit a run request (JSON on stdin) and wait for its result")
}

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    consumer_id: String,
    kind: RunKind,
    deployment: Deployment,
    inputs: Value,
    #[serde(default)]
    default_config: Value,
    #[serde(default)]
    blanked_env_vars: Vec<String>,
    #[serde(default)]
    user_env_data: HashMap<String, String>,
}

pub async fn handle(_args: &ArgMatches) -> Result<(), Error> {
    let config = NodeConfig::from_env()?;
    let request = read_request()?;

    let ledger = Arc::new(Ledger::connect(&config.local_db_url).await.map_err(Error::Ledger)?);
    let installer = Arc::new(Installer::new(
        config.modules_source_dir.clone(),
        config.ipfs_gateway_url.clone(),
        config.lock_timeout,
    ));

    installer.ensure_installed(&request.deployment.module).await?;

    let loader = Arc::new(Loader::default());
    let engine = Arc::new(Engine::new(Arc::clone(&ledger), installer, loader, config.base_output_dir.clone()));
    let dispatcher = Dispatcher::start(engine, Arc::clone(&ledger), 1, 1);

    let created = dispatcher
        .dispatch(
            request.consumer_id,
            request.kind,
            request.deployment,
            request.inputs,
            request.default_config,
            request.blanked_env_vars,
            request.user_env_data,
        )
        .await?;

    let finished = poll_until_terminal(&ledger, request.kind, &created.id).await?;
    println!("{}", serde_json::to_string_pretty(&finished)?);

    if finished.error {
        return Err(Error::RunFailed(finished.error_message));
    }
    Ok(())
}

fn read_request() -> Result<SubmitRequest, Error> {
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    Ok(serde_json::from_str(&buf)?)
}

async fn poll_until_terminal(ledger: &Ledger, kind: RunKind, id: &str) -> Result<Run, Error> {
    loop {
        let run = ledger.runs.get(kind, id).await.map_err(Error::Ledger)?;
        if run.status.is_terminal() {
            return Ok(run);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("reading run request: {0}")]
    Io(#[from] std::io::Error),
    #[error("decoding run request or result: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ledger: {0}")]
    Ledger(node_ledger::Error),
    #[error("installer: {0}")]
    Installer(#[from] node_installer::Error),
    #[error("dispatching run: {0}")]
    Dispatch(#[from] node_dispatcher::Error),
    #[error("run finished with error: {0}")]
    RunFailed(String),
}

impl Error {
    pub(crate) fn exit_code(&self) -> i32 {
        match self {
            Error::Installer(node_installer::Error::LockTimeout) => 3,
            Error::Installer(node_installer::Error::Verify(_)) => 4,
            Error::Config(_) | Error::Io(_) | Error::Json(_) | Error::Ledger(_) | Error::Installer(_) | Error::Dispatch(_) | Error::RunFailed(_) => 1,
        }
    }
}
