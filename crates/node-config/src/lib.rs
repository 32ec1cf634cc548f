// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Environment-driven node configuration.
//!
//! Unlike the layered YAML config the package-manager side of this
//! workspace uses, a worker node's configuration is entirely environment
//! driven: every option below is read once, at startup, by
//! [`NodeConfig::from_env`].

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingType {
    Direct,
    Indirect,
}

/// Fully resolved node configuration, read once at process startup.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub modules_source_dir: PathBuf,
    pub base_output_dir: PathBuf,
    pub local_db_url: String,
    pub hub_url: String,
    pub hub_username: String,
    pub hub_password: String,
    pub hub_ns: String,
    pub hub_db: String,
    pub private_key_path: PathBuf,
    pub node_ip: String,
    pub node_communication_port: u16,
    pub num_node_communication_servers: u16,
    pub routing: RoutingType,
    pub routing_url: Option<String>,
    pub ipfs_gateway_url: String,
    pub docker_jobs: bool,
    pub num_gpus: u32,
    pub lock_timeout: Duration,
}

impl NodeConfig {
    /// Reads and validates the full configuration from the process
    /// environment. Fails fast (rather than lazily, per-field) so a
    /// misconfigured node never starts accepting runs.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            modules_source_dir: required_path("MODULES_SOURCE_DIR")?,
            base_output_dir: path_or("BASE_OUTPUT_DIR", "./storage/fs"),
            local_db_url: required("LOCAL_DB_URL")?,
            hub_url: or_default("HUB_URL", "ws://localhost:3001/rpc"),
            hub_username: required("HUB_USERNAME")?,
            hub_password: required("HUB_PASSWORD")?,
            hub_ns: or_default("HUB_NS", "naptha"),
            hub_db: or_default("HUB_DB", "naptha"),
            private_key_path: required_path("PRIVATE_KEY")?,
            node_ip: or_default("NODE_IP", "http://localhost"),
            node_communication_port: parsed_or("NODE_COMMUNICATION_PORT", 7001)?,
            num_node_communication_servers: parsed_or("NUM_NODE_COMMUNICATION_SERVERS", 1)?,
            routing: routing_type()?,
            routing_url: env::var("ROUTING_URL").ok(),
            ipfs_gateway_url: or_default("IPFS_GATEWAY_URL", "https://ipfs.io"),
            docker_jobs: bool_or("DOCKER_JOBS", false),
            num_gpus: parsed_or("NUM_GPUS", 0)?,
            lock_timeout: Duration::from_secs(parsed_or("LOCK_TIMEOUT_SECS", 30)?),
        })
    }
}

fn routing_type() -> Result<RoutingType, ConfigError> {
    match env::var("ROUTING_TYPE").unwrap_or_else(|_| "direct".to_owned()).as_str() {
        "direct" => Ok(RoutingType::Direct),
        "indirect" => Ok(RoutingType::Indirect),
        other => Err(ConfigError::InvalidValue {
            key: "ROUTING_TYPE",
            value: other.to_owned(),
        }),
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn required_path(key: &'static str) -> Result<PathBuf, ConfigError> {
    required(key).map(PathBuf::from)
}

fn path_or(key: &'static str, default: &str) -> PathBuf {
    PathBuf::from(env::var(key).unwrap_or_else(|_| default.to_owned()))
}

fn or_default(key: &'static str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn bool_or(key: &'static str, default: bool) -> bool {
    env::var(key).map(|v| v.eq_ignore_ascii_case("true")).unwrap_or(default)
}

fn parsed_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue { key, value }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn set_required_vars() {
        env::set_var("MODULES_SOURCE_DIR", "/tmp/modules");
        env::set_var("LOCAL_DB_URL", "postgres://localhost/naptha");
        env::set_var("HUB_USERNAME", "alice");
        env::set_var("HUB_PASSWORD", "secret");
        env::set_var("PRIVATE_KEY", "/tmp/key.pem");
    }

    fn clear_all() {
        for key in [
            "MODULES_SOURCE_DIR",
            "LOCAL_DB_URL",
            "HUB_USERNAME",
            "HUB_PASSWORD",
            "PRIVATE_KEY",
            "ROUTING_TYPE",
            "NODE_COMMUNICATION_PORT",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn missing_required_var_fails() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        let err = NodeConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("MODULES_SOURCE_DIR")));
    }

    #[test]
    fn defaults_fill_in_when_present() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        set_required_vars();
        let config = NodeConfig::from_env().unwrap();
        assert_eq!(config.node_communication_port, 7001);
        assert_eq!(config.routing, RoutingType::Direct);
        clear_all();
    }

    #[test]
    fn invalid_routing_type_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        set_required_vars();
        env::set_var("ROUTING_TYPE", "sideways");
        let err = NodeConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "ROUTING_TYPE", .. }));
        clear_all();
    }
}
