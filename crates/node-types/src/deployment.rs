// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::module::Module;

/// How a module should be executed: its resolved descriptor, merged
/// configuration, and any composed sub-deployments (an orchestrator's
/// child agents/tools/environments/knowledge-bases).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub module: Module,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub sub_deployments: Vec<Deployment>,
}

impl Deployment {
    pub fn new(module: Module, config: Value) -> Self {
        Self {
            module,
            config,
            sub_deployments: Vec::new(),
        }
    }
}
