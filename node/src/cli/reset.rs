// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Drops and recreates the ledger schema. The Rust equivalent of the
//! distillation's standalone `reset_db.py` glue; destructive, meant for
//! local development and disposable test databases.

use clap::{Arg, ArgAction, ArgMatches, Command};
use node_config::{ConfigError, NodeConfig};
use node_ledger::Ledger;
use thiserror::Error;

pub fn command() -> Command {
    Command::new("reset").about("Drop and recreate the ledger schema").arg(
        Arg::new("yes")
            .short('y')
            .long("yes")
            .help("Skip the confirmation prompt")
            .action(ArgAction::SetTrue),
    )
}

pub async fn handle(args: &ArgMatches) -> Result<(), Error> {
    if !args.get_flag("yes") {
        return Err(Error::NotConfirmed);
    }

    let config = NodeConfig::from_env()?;
    let ledger = Ledger::connect(&config.local_db_url).await?;
    ledger.reset().await?;
    log::info!("ledger schema reset");
    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("ledger: {0}")]
    Ledger(#[from] node_ledger::Error),
    #[error("refusing to reset the ledger without --yes")]
    NotConfirmed,
}

impl Error {
    pub(crate) fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) | Error::NotConfirmed => 1,
            Error::Ledger(_) => 1,
        }
    }
}
