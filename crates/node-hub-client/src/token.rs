// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Decodes the claims of a hub session token without verifying its
//! signature — the hub is the signer and the only party we trust here is
//! the hub itself, so this is purely for reading the subject out of a
//! token we just received from it.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;

use crate::error::Error;

#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    #[serde(rename = "sub")]
    pub subject: String,
}

pub fn decode(token: &str) -> Result<Claims, Error> {
    let payload = token.split('.').nth(1).ok_or(Error::Token)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).map_err(|_| Error::Token)?;
    serde_json::from_slice(&bytes).map_err(Error::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_subject_claim() {
        let payload = URL_SAFE_NO_PAD.encode(r#"{"sub":"node:abc123"}"#);
        let token = format!("header.{payload}.signature");
        let claims = decode(&token).unwrap();
        assert_eq!(claims.subject, "node:abc123");
    }

    #[test]
    fn rejects_malformed_token() {
        assert!(decode("not-a-jwt").is_err());
    }
}
