// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Concurrent-safe materialization of modules and personas on disk.
//!
//! Grounded in `moss/src/installation/lockfile.rs` (the lock discipline)
//! and `moss/src/installation.rs` (the root/path layout), generalized from
//! a read-only package-manager root to a read-write module cache per
//! `original_source/node/module_manager.py`.

mod error;
mod git;
mod ipfs;
mod lock;

pub use crate::error::Error;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use node_types::{Module, ModuleKind, ModuleSource, PersonaSource};
use serde_json::Value;

/// Materializes modules and personas under a single root directory,
/// serializing installs per name via an advisory file lock and caching the
/// last-known-good version for each.
pub struct Installer {
    modules_root: PathBuf,
    ipfs_gateway_url: String,
    lock_timeout: Duration,
    installed_versions: Mutex<HashMap<String, String>>,
}

impl Installer {
    pub fn new(modules_root: PathBuf, ipfs_gateway_url: String, lock_timeout: Duration) -> Self {
        Self {
            modules_root,
            ipfs_gateway_url,
            lock_timeout,
            installed_versions: Mutex::new(HashMap::new()),
        }
    }

    fn module_dir(&self, name: &str) -> PathBuf {
        self.modules_root.join(name)
    }

    /// On-disk root of an installed module, for callers (the run engine)
    /// that need to locate its entrypoint or config files directly.
    pub fn module_path(&self, name: &str) -> PathBuf {
        self.module_dir(name)
    }

    fn lock_path(&self, name: &str) -> PathBuf {
        self.modules_root.join(format!("{name}.lock"))
    }

    /// Ensures the named module is present on disk at the requested
    /// version; a no-op if the in-process cache already reflects it.
    pub async fn ensure_installed(&self, module: &Module) -> Result<(), Error> {
        let name = module.name.as_ref();

        if self.cached_version(name).as_deref() == Some(module.version.as_str()) {
            return Ok(());
        }

        let lock = match lock::acquire(self.lock_path(name), self.lock_timeout).await {
            Ok(lock) => lock,
            Err(err) => {
                log::error!("install lock for module {name:?} not acquired: {err}");
                return Err(err);
            }
        };

        let dir = self.module_dir(name);
        if let Err(err) = self.materialize(module, &dir).await {
            log::error!("materializing module {name:?}: {err}");
            return Err(err);
        }
        if let Err(err) = self.verify(module, &dir) {
            log::error!("module {name:?} failed post-install verification: {err}");
            return Err(err);
        }

        self.installed_versions
            .lock()
            .unwrap()
            .insert(name.to_owned(), module.version.clone());

        drop(lock);
        Ok(())
    }

    async fn materialize(&self, module: &Module, dir: &Path) -> Result<(), Error> {
        match &module.source {
            ModuleSource::Git { url } => {
                let current = git::head_tag(dir).await?;
                if current.as_deref() == Some(module.version.trim_start_matches('v')) {
                    return Ok(());
                }
                if dir.join(".git").exists() {
                    git::fetch(dir).await?;
                } else {
                    git::clone(url, dir).await?;
                }
                git::checkout(dir, &module.version).await?;
            }
            ModuleSource::Ipfs { cid } => {
                if !dir.exists() {
                    ipfs::install(&self.ipfs_gateway_url, cid, dir).await?;
                }
            }
        }
        Ok(())
    }

    fn verify(&self, module: &Module, dir: &Path) -> Result<(), Error> {
        let entrypoint = dir.join(format!("{}", module.entrypoint));
        let candidates = [entrypoint.clone(), dir.join("run.py"), dir.join("run.rs")];
        if candidates.iter().any(|path| path.is_file()) || dir.join("run").is_dir() {
            return Ok(());
        }
        Err(Error::Verify(format!(
            "no entrypoint found for module {:?} under {}",
            module.name,
            dir.display()
        )))
    }

    fn cached_version(&self, name: &str) -> Option<String> {
        self.installed_versions.lock().unwrap().get(name).cloned()
    }

    /// Materializes a persona bundle; the folder is always wiped and
    /// re-populated, there is no version negotiation for personas.
    pub async fn ensure_persona(&self, source: &PersonaSource) -> Result<PathBuf, Error> {
        let folder = source.folder_name();
        let dest = self.modules_root.join("personas").join(&folder);
        let _lock = lock::acquire(self.modules_root.join("personas").join(format!("{folder}.lock")), self.lock_timeout).await?;

        match source {
            PersonaSource::Git { url } => {
                if dest.exists() {
                    fs_err::remove_dir_all(&dest)?;
                }
                git::clone(url, &dest).await?;
            }
            PersonaSource::Ipfs { cid, .. } => {
                ipfs::install(&self.ipfs_gateway_url, cid, &dest).await?;
            }
        }

        Ok(dest)
    }

    /// Reads `<module>/configs/{kind}_deployments.json` and returns the
    /// first deployment entry's `config` object, or `Value::Null` if the
    /// module ships no such file — not every module needs a default
    /// config layer. Mirrors `module_manager.py::load_deployments`'s
    /// `default_deployments[0]` base, minus the persona/LLM-config
    /// resolution the Run Engine performs separately.
    pub async fn load_default_config(&self, module: &Module) -> Result<Value, Error> {
        let path = self
            .module_path(module.name.as_ref())
            .join("configs")
            .join(format!("{}_deployments.json", deployments_file_stem(module.kind)));

        if !path.is_file() {
            return Ok(Value::Null);
        }

        let bytes = tokio::fs::read(&path).await?;
        let deployments: Vec<Value> =
            serde_json::from_slice(&bytes).map_err(|e| Error::Config(format!("parsing {}: {e}", path.display())))?;

        Ok(deployments.first().and_then(|d| d.get("config")).cloned().unwrap_or(Value::Null))
    }

    /// Resolves a named entry from `<module>/configs/llm_configs.json`,
    /// the Rust equivalent of `module_manager.py::load_llm_configs` plus
    /// the `config_name` lookup in `load_and_validate_config_schema`.
    pub async fn resolve_llm_config(&self, module: &Module, config_name: &str) -> Result<Value, Error> {
        let path = self.module_path(module.name.as_ref()).join("configs").join("llm_configs.json");

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| Error::Config(format!("reading {}: {e}", path.display())))?;
        let configs: Vec<Value> =
            serde_json::from_slice(&bytes).map_err(|e| Error::Config(format!("parsing {}: {e}", path.display())))?;

        configs
            .into_iter()
            .find(|config| config.get("config_name").and_then(Value::as_str) == Some(config_name))
            .ok_or_else(|| Error::Config(format!("no llm config named {config_name:?} in {}", path.display())))
    }

    /// Reads `<module>/schemas.json`, a JSON Schema document describing
    /// the module's expected input shape, if the module ships one. A
    /// module with no schema file declares no input contract and every
    /// input is accepted.
    pub async fn load_input_schema(&self, module: &Module) -> Result<Option<Value>, Error> {
        let path = self.module_path(module.name.as_ref()).join("schemas.json");
        if !path.is_file() {
            return Ok(None);
        }

        let bytes = tokio::fs::read(&path).await?;
        let schema: Value =
            serde_json::from_slice(&bytes).map_err(|e| Error::Config(format!("parsing {}: {e}", path.display())))?;
        Ok(Some(schema))
    }

    /// Uploads `bytes` to the configured IPFS gateway and pins it, the
    /// publication-side counterpart to [`Self::ensure_installed`]'s
    /// archive fetch.
    pub async fn publish_to_ipfs(&self, bytes: Vec<u8>, file_name: &str) -> Result<String, Error> {
        ipfs::publish(&self.ipfs_gateway_url, bytes, file_name).await
    }
}

fn deployments_file_stem(kind: ModuleKind) -> &'static str {
    match kind {
        ModuleKind::Agent => "agent",
        ModuleKind::Tool => "tool",
        ModuleKind::Orchestrator => "orchestrator",
        ModuleKind::Environment => "environment",
        ModuleKind::Kb => "kb",
        ModuleKind::Memory => "memory",
        ModuleKind::Persona => "persona",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_types::{ModuleKind, ModuleSource};
    use std::process::Command;

    fn init_repo_with_tag(dir: &Path, tag: &str) {
        let run = |args: &[&str]| {
            assert!(Command::new("git").args(args).current_dir(dir).status().unwrap().success());
        };
        std::fs::create_dir_all(dir).unwrap();
        run(&["init", "-q"]);
        run(&["config", "user.email", "test@example.com"]);
        run(&["config", "user.name", "test"]);
        std::fs::write(dir.join("run.py"), "def run(inputs):\n    return inputs\n").unwrap();
        run(&["add", "."]);
        run(&["commit", "-q", "-m", "init"]);
        run(&["tag", tag]);
    }

    #[tokio::test]
    async fn installs_and_caches_git_module() {
        let root = tempfile::tempdir().unwrap();
        let source_repo = root.path().join("source");
        init_repo_with_tag(&source_repo, "v0.1");

        let installer = Installer::new(root.path().join("modules"), "https://ipfs.io".to_owned(), Duration::from_secs(5));

        let module = Module {
            id: "hello".into(),
            name: "hello".to_owned().into(),
            description: String::new(),
            author: String::new(),
            source: ModuleSource::Git {
                url: url::Url::from_file_path(&source_repo).unwrap(),
            },
            version: "v0.1".into(),
            entrypoint: "run.py".into(),
            kind: ModuleKind::Agent,
        };

        installer.ensure_installed(&module).await.expect("install succeeds");
        assert!(root.path().join("modules/hello/run.py").exists());

        let cached = installer.cached_version("hello");
        assert_eq!(cached.as_deref(), Some("v0.1"));

        // Second call is a cache hit; no re-clone needed (would error if it tried
        // to clone into a non-empty, already-populated directory via `git clone`).
        installer.ensure_installed(&module).await.expect("idempotent install");
    }

    #[tokio::test]
    async fn missing_entrypoint_fails_verification() {
        let root = tempfile::tempdir().unwrap();
        let source_repo = root.path().join("source");
        std::fs::create_dir_all(&source_repo).unwrap();
        let run = |args: &[&str]| {
            assert!(Command::new("git").args(args).current_dir(&source_repo).status().unwrap().success());
        };
        run(&["init", "-q"]);
        run(&["config", "user.email", "test@example.com"]);
        run(&["config", "user.name", "test"]);
        std::fs::write(source_repo.join("README.md"), "no entrypoint here").unwrap();
        run(&["add", "."]);
        run(&["commit", "-q", "-m", "init"]);
        run(&["tag", "v0.1"]);

        let installer = Installer::new(root.path().join("modules"), "https://ipfs.io".to_owned(), Duration::from_secs(5));
        let module = Module {
            id: "broken".into(),
            name: "broken".to_owned().into(),
            description: String::new(),
            author: String::new(),
            source: ModuleSource::Git {
                url: url::Url::from_file_path(&source_repo).unwrap(),
            },
            version: "v0.1".into(),
            entrypoint: "run.py".into(),
            kind: ModuleKind::Agent,
        };

        let err = installer.ensure_installed(&module).await.unwrap_err();
        assert!(matches!(err, Error::Verify(_)));
    }

    fn stub_module(name: &str, kind: ModuleKind) -> Module {
        Module {
            id: name.to_owned(),
            name: name.to_owned().into(),
            description: String::new(),
            author: String::new(),
            source: ModuleSource::Ipfs { cid: "Qmstub".to_owned() },
            version: "v0.1".into(),
            entrypoint: "run.py".into(),
            kind,
        }
    }

    #[tokio::test]
    async fn missing_default_config_file_returns_null() {
        let root = tempfile::tempdir().unwrap();
        let installer = Installer::new(root.path().to_owned(), "https://ipfs.io".to_owned(), Duration::from_secs(5));
        let module = stub_module("hello", ModuleKind::Agent);

        let config = installer.load_default_config(&module).await.unwrap();
        assert!(config.is_null());
    }

    #[tokio::test]
    async fn loads_first_deployments_config() {
        let root = tempfile::tempdir().unwrap();
        let module = stub_module("hello", ModuleKind::Tool);
        let configs_dir = root.path().join("hello/configs");
        std::fs::create_dir_all(&configs_dir).unwrap();
        std::fs::write(
            configs_dir.join("tool_deployments.json"),
            r#"[{"config": {"temperature": 0.2}}, {"config": {"temperature": 0.9}}]"#,
        )
        .unwrap();

        let installer = Installer::new(root.path().to_owned(), "https://ipfs.io".to_owned(), Duration::from_secs(5));
        let config = installer.load_default_config(&module).await.unwrap();
        assert_eq!(config["temperature"], 0.2);
    }

    #[tokio::test]
    async fn resolves_named_llm_config() {
        let root = tempfile::tempdir().unwrap();
        let module = stub_module("hello", ModuleKind::Agent);
        let configs_dir = root.path().join("hello/configs");
        std::fs::create_dir_all(&configs_dir).unwrap();
        std::fs::write(
            configs_dir.join("llm_configs.json"),
            r#"[{"config_name": "fast", "model": "small"}, {"config_name": "accurate", "model": "large"}]"#,
        )
        .unwrap();

        let installer = Installer::new(root.path().to_owned(), "https://ipfs.io".to_owned(), Duration::from_secs(5));
        let resolved = installer.resolve_llm_config(&module, "accurate").await.unwrap();
        assert_eq!(resolved["model"], "large");
    }

    #[tokio::test]
    async fn unknown_llm_config_name_errors() {
        let root = tempfile::tempdir().unwrap();
        let module = stub_module("hello", ModuleKind::Agent);
        let configs_dir = root.path().join("hello/configs");
        std::fs::create_dir_all(&configs_dir).unwrap();
        std::fs::write(configs_dir.join("llm_configs.json"), r#"[{"config_name": "fast"}]"#).unwrap();

        let installer = Installer::new(root.path().to_owned(), "https://ipfs.io".to_owned(), Duration::from_secs(5));
        let err = installer.resolve_llm_config(&module, "missing").await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn missing_input_schema_returns_none() {
        let root = tempfile::tempdir().unwrap();
        let module = stub_module("hello", ModuleKind::Agent);
        let installer = Installer::new(root.path().to_owned(), "https://ipfs.io".to_owned(), Duration::from_secs(5));

        assert!(installer.load_input_schema(&module).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn loads_input_schema_when_present() {
        let root = tempfile::tempdir().unwrap();
        let module = stub_module("hello", ModuleKind::Agent);
        std::fs::create_dir_all(root.path().join("hello")).unwrap();
        std::fs::write(root.path().join("hello/schemas.json"), r#"{"type": "object"}"#).unwrap();

        let installer = Installer::new(root.path().to_owned(), "https://ipfs.io".to_owned(), Duration::from_secs(5));
        let schema = installer.load_input_schema(&module).await.unwrap().unwrap();
        assert_eq!(schema["type"], "object");
    }
}
