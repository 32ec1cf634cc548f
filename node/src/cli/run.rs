// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Starts the node: connects the ledger, resolves this node's identity,
//! registers with the hub, and brings up the run-dispatch worker pool.
//! Serving consumer-facing transports is out of scope here (§1); this
//! subcommand ends the startup sequence by blocking on a shutdown signal
//! so the worker pool keeps draining dispatched runs.

use std::sync::Arc;

use clap::{ArgMatches, Command};
use node_config::{ConfigError, NodeConfig};
use node_dispatcher::Dispatcher;
use node_engine::Engine;
use node_hub_client::Client as HubClient;
use node_installer::Installer;
use node_ledger::Ledger;
use node_loader::Loader;
use node_types::NodeRecord;
use thiserror::Error;

use super::identity;

const DEFAULT_WORKER_COUNT: usize = 4;
const DEFAULT_QUEUE_CAPACITY: usize = 64;

pub fn command() -> Command {
    Command::new("run").about("Start the node's ledger, installer, loader, and run-dispatch worker pool")
}

pub async fn handle(_args: &ArgMatches) -> Result<(), Error> {
    let config = NodeConfig::from_env()?;

    let ledger = Arc::new(Ledger::connect(&config.local_db_url).await.map_err(Error::Ledger)?);
    log::info!("ledger connected, pool stats: {:?}", ledger.pool_stats());

    let hub = HubClient::new(config.hub_url.clone(), config.hub_ns.clone(), config.hub_db.clone());
    hub.authenticate(&config.hub_username, &config.hub_password)
        .await
        .map_err(Error::Hub)?;

    let public_key = identity::public_key_fingerprint(&config.private_key_path)?;
    register_self(&hub, &config, &public_key).await?;

    let installer = Arc::new(Installer::new(
        config.modules_source_dir.clone(),
        config.ipfs_gateway_url.clone(),
        config.lock_timeout,
    ));
    let loader = Arc::new(Loader::default());
    let engine = Arc::new(Engine::new(Arc::clone(&ledger), installer, loader, config.base_output_dir.clone()));

    let _dispatcher = Dispatcher::start(engine, Arc::clone(&ledger), DEFAULT_WORKER_COUNT, DEFAULT_QUEUE_CAPACITY);
    log::info!("dispatcher started with {DEFAULT_WORKER_COUNT} workers");

    tokio::signal::ctrl_c().await.map_err(Error::Signal)?;
    log::info!("shutdown signal received, draining in-flight runs");
    ledger.close().await;

    Ok(())
}

async fn register_self(hub: &HubClient, config: &NodeConfig, public_key: &str) -> Result<(), Error> {
    let record = NodeRecord {
        id: format!("node:{public_key}"),
        owner: config.hub_username.clone(),
        public_key: public_key.to_owned(),
        ip: config.node_ip.clone(),
        ports: vec![config.node_communication_port],
        server_types: vec!["direct".to_owned()],
        provider_types: Vec::new(),
        models: Vec::new(),
        ram: 0,
        vram: 0,
        num_gpus: config.num_gpus,
        os: std::env::consts::OS.to_owned(),
        arch: std::env::consts::ARCH.to_owned(),
    };

    match hub.get_node(&record.id).await {
        Ok(_) => {
            hub.update_node(&record.id, &record).await.map_err(Error::Hub)?;
        }
        Err(node_hub_client::Error::NotFound(_)) => {
            hub.create_node(&record).await.map_err(Error::Hub)?;
        }
        Err(err) => return Err(Error::Hub(err)),
    }

    log::info!("registered with hub as {}", record.id);
    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("ledger: {0}")]
    Ledger(node_ledger::Error),
    #[error("hub: {0}")]
    Hub(#[from] node_hub_client::Error),
    #[error("reading private key: {0}")]
    Io(#[from] std::io::Error),
    #[error("waiting for shutdown signal: {0}")]
    Signal(#[source] std::io::Error),
}

impl Error {
    pub(crate) fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) => 1,
            Error::Hub(_) => 2,
            Error::Ledger(_) | Error::Io(_) | Error::Signal(_) => 1,
        }
    }
}
