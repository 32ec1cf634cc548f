// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

mod cli;

fn main() {
    env_logger::init();

    let runtime = tokio::runtime::Runtime::new().expect("failed to start tokio runtime");
    let code = runtime.block_on(cli::process());
    std::process::exit(code);
}
