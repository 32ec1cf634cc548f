// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

/// A node's self-description as registered with the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    pub owner: String,
    pub public_key: String,
    pub ip: String,
    pub ports: Vec<u16>,
    pub server_types: Vec<String>,
    pub provider_types: Vec<String>,
    pub models: Vec<String>,
    pub ram: u64,
    pub vram: u64,
    pub num_gpus: u32,
    pub os: String,
    pub arch: String,
}
