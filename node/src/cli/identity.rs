// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Derives this node's public identity from its configured signing key.
//!
//! The distillation's `get_public_key_from_pem` derives an actual
//! cryptographic public key from the PEM file at `PRIVATE_KEY`. Key
//! derivation itself is outside this node's specified core, so here the
//! node's public identity is a stable fingerprint of that same file rather
//! than a reimplementation of a signature scheme this workspace has no
//! existing dependency on.

use std::path::Path;

use sha2::{Digest, Sha256};

pub fn public_key_fingerprint(private_key_path: &Path) -> std::io::Result<String> {
    let bytes = fs_err::read(private_key_path)?;
    let digest = Sha256::digest(&bytes);
    Ok(hex::encode(digest))
}
