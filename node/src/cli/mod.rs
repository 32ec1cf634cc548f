// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

use clap::Command;
use thiserror::Error;

mod register;
mod reset;
mod run;
mod submit;

pub(crate) mod identity;

/// Generate the CLI command structure
fn command() -> Command {
    Command::new("naptha-node")
        .about("Worker node for a federated compute network")
        .arg_required_else_help(true)
        .subcommand(run::command())
        .subcommand(register::command())
        .subcommand(reset::command())
        .subcommand(submit::command())
}

/// Process all CLI arguments, returning the process exit code described in
/// the node's external interface contract (0 success, 1 config/credentials,
/// 2 hub unreachable, 3 lock timeout, 4 module verification failure).
pub async fn process() -> i32 {
    let matches = command().get_matches();

    let result = match matches.subcommand() {
        Some(("run", args)) => run::handle(args).await.map_err(Error::Run),
        Some(("register", args)) => register::handle(args).await.map_err(Error::Register),
        Some(("reset", args)) => reset::handle(args).await.map_err(Error::Reset),
        Some(("submit", args)) => submit::handle(args).await.map_err(Error::Submit),
        _ => unreachable!("clap enforces a subcommand via arg_required_else_help"),
    };

    match result {
        Ok(()) => 0,
        Err(err) => {
            log::error!("{}", chain(&err));
            err.exit_code()
        }
    }
}

/// Renders an error together with its full cause chain, since Rust carries
/// no runtime traceback to fall back on.
fn chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[derive(Debug, Error)]
enum Error {
    #[error("run: {0}")]
    Run(#[from] run::Error),
    #[error("register: {0}")]
    Register(#[from] register::Error),
    #[error("reset: {0}")]
    Reset(#[from] reset::Error),
    #[error("submit: {0}")]
    Submit(#[from] submit::Error),
}

impl Error {
    fn exit_code(&self) -> i32 {
        match self {
            Error::Run(e) => e.exit_code(),
            Error::Register(e) => e.exit_code(),
            Error::Reset(e) => e.exit_code(),
            Error::Submit(e) => e.exit_code(),
        }
    }
}
