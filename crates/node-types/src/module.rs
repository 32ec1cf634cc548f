// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use url::Url;

/// Unique, human-chosen name of a [`Module`], also its directory name under
/// the modules root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Name(String);

impl From<String> for Name {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<Name> for String {
    fn from(value: Name) -> Self {
        value.0
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What kind of unit a [`Module`] provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    Agent,
    Tool,
    Orchestrator,
    Environment,
    Kb,
    Memory,
    Persona,
}

/// Where a module's code is fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum ModuleSource {
    /// A cloneable git remote; installation checks out the tag matching the
    /// module's `version`.
    Git { url: Url },
    /// A content-addressed archive served through the configured IPFS
    /// gateway.
    Ipfs { cid: String },
}

impl ModuleSource {
    /// Parses `git://…` and `ipfs://…` source URLs as used in module
    /// descriptors and deployment configs.
    pub fn parse(raw: &str) -> Result<Self, ParseSourceError> {
        if let Some(rest) = raw.strip_prefix("ipfs://") {
            if rest.is_empty() {
                return Err(ParseSourceError::EmptyCid);
            }
            return Ok(Self::Ipfs { cid: rest.to_owned() });
        }

        if raw.starts_with("git://") || raw.starts_with("http://") || raw.starts_with("https://") || raw.ends_with(".git") {
            let url = Url::parse(raw).map_err(|e| ParseSourceError::InvalidUrl(raw.to_owned(), e))?;
            return Ok(Self::Git { url });
        }

        Err(ParseSourceError::UnknownScheme(raw.to_owned()))
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseSourceError {
    #[error("empty ipfs cid")]
    EmptyCid,
    #[error("invalid source url {0:?}: {1}")]
    InvalidUrl(String, url::ParseError),
    #[error("unrecognized module source scheme: {0:?}")]
    UnknownScheme(String),
}

/// Where a persona's data bundle is fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum PersonaSource {
    Git { url: Url },
    /// `ipfs://<cid>::<folder>` — the folder name the archive is unpacked
    /// into under `personas/`.
    Ipfs { cid: String, folder: String },
}

impl PersonaSource {
    pub fn parse(raw: &str) -> Result<Self, ParseSourceError> {
        if let Some(rest) = raw.strip_prefix("ipfs://") {
            let (cid, folder) = rest
                .split_once("::")
                .ok_or_else(|| ParseSourceError::UnknownScheme(raw.to_owned()))?;
            if cid.is_empty() || folder.is_empty() {
                return Err(ParseSourceError::EmptyCid);
            }
            return Ok(Self::Ipfs {
                cid: cid.to_owned(),
                folder: folder.to_owned(),
            });
        }

        if raw.starts_with("git://") || raw.ends_with(".git") {
            let url = Url::parse(raw).map_err(|e| ParseSourceError::InvalidUrl(raw.to_owned(), e))?;
            return Ok(Self::Git { url });
        }

        Err(ParseSourceError::UnknownScheme(raw.to_owned()))
    }

    /// Directory name this persona is materialized under.
    pub fn folder_name(&self) -> String {
        match self {
            Self::Ipfs { folder, .. } => folder.clone(),
            Self::Git { url } => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .unwrap_or("persona")
                .trim_end_matches(".git")
                .to_owned(),
        }
    }
}

/// Descriptor for an installable module, as resolved from the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    pub name: Name,
    pub description: String,
    pub author: String,
    pub source: ModuleSource,
    pub version: String,
    pub entrypoint: String,
    pub kind: ModuleKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_git_source() {
        let src = ModuleSource::parse("git://github.com/naptha/hello.git").unwrap();
        assert!(matches!(src, ModuleSource::Git { .. }));
    }

    #[test]
    fn parses_ipfs_source() {
        let src = ModuleSource::parse("ipfs://Qmabc123").unwrap();
        assert_eq!(src, ModuleSource::Ipfs { cid: "Qmabc123".to_owned() });
    }

    #[test]
    fn rejects_empty_ipfs_cid() {
        assert!(matches!(ModuleSource::parse("ipfs://"), Err(ParseSourceError::EmptyCid)));
    }

    #[test]
    fn parses_persona_ipfs_source() {
        let src = PersonaSource::parse("ipfs://Qmabc123::my-persona").unwrap();
        assert_eq!(src.folder_name(), "my-persona");
    }

    #[test]
    fn persona_git_folder_name_from_url() {
        let src = PersonaSource::parse("git://github.com/naptha/coder-persona.git").unwrap();
        assert_eq!(src.folder_name(), "coder-persona");
    }
}
