// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Registers (or re-registers) this node with the hub without starting the
//! dispatcher. Useful for bootstrapping a node's hub record ahead of time,
//! the Rust equivalent of the distillation's standalone hub-registration
//! glue.

use clap::{ArgMatches, Command};
use node_config::{ConfigError, NodeConfig};
use node_hub_client::Client as HubClient;
use node_types::NodeRecord;
use thiserror::Error;

use super::identity;

pub fn command() -> Command {
    Command::new("register").about("Register this node with the hub and exit")
}

pub async fn handle(_args: &ArgMatches) -> Result<(), Error> {
    let config = NodeConfig::from_env()?;

    let hub = HubClient::new(config.hub_url.clone(), config.hub_ns.clone(), config.hub_db.clone());
    hub.authenticate(&config.hub_username, &config.hub_password).await?;

    let public_key = identity::public_key_fingerprint(&config.private_key_path)?;
    let record = NodeRecord {
        id: format!("node:{public_key}"),
        owner: config.hub_username.clone(),
        public_key,
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

    let created = match hub.create_node(&record).await {
        Ok(created) => created,
        Err(node_hub_client::Error::Transport(_)) => hub.update_node(&record.id, &record).await?,
        Err(err) => return Err(err.into()),
    };

    println!("registered {}", created.id);
    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("hub: {0}")]
    Hub(#[from] node_hub_client::Error),
    #[error("reading private key: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) => 1,
            Error::Hub(_) => 2,
            Error::Io(_) => 1,
        }
    }
}
