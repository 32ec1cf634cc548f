// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

/// An identity authorized to dispatch runs, identified by its public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumer {
    pub id: String,
    pub public_key: String,
}

impl Consumer {
    pub fn new(public_key: String) -> Self {
        Self {
            id: format!("node:{public_key}"),
            public_key,
        }
    }
}
