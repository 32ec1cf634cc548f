// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Drives one [`Run`] through `pending → processing → running →
//! {completed | error}`, persisting every transition before the next
//! begins. Grounded in `original_source/node/worker/package_worker.py`'s
//! `ModuleRunEngine` (`init_run`/`start_run`/`complete`/`fail`), with the
//! original's separate "package" and "flow" engines consolidated into this
//! one state machine (see `DESIGN.md`).

pub mod config_merge;
mod error;

pub use crate::error::Error;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use node_installer::Installer;
use node_ledger::Ledger;
use node_loader::Loader;
use node_types::{ModuleKind, Run, RunStatus};
use serde_json::Value;

/// Node-wide collaborators a run needs, shared across every worker.
pub struct Engine {
    ledger: Arc<Ledger>,
    installer: Arc<Installer>,
    loader: Arc<Loader>,
    base_output_dir: PathBuf,
}

impl Engine {
    pub fn new(ledger: Arc<Ledger>, installer: Arc<Installer>, loader: Arc<Loader>, base_output_dir: PathBuf) -> Self {
        Self {
            ledger,
            installer,
            loader,
            base_output_dir,
        }
    }

    /// Drives `run` to completion. Never returns `Err`: every failure is
    /// folded into the persisted run's `status = error` instead, matching
    /// the contract that callers only ever observe lifecycle through the
    /// ledger.
    pub async fn run(&self, mut run: Run, default_config: Value, blanked_env_vars: &[String], user_env_data: HashMap<String, String>) -> Run {
        match self.drive(&mut run, default_config, blanked_env_vars, &user_env_data).await {
            Ok(()) => run,
            Err(err) => {
                self.fail(&mut run, &err).await;
                run
            }
        }
    }

    async fn drive(
        &self,
        run: &mut Run,
        default_config: Value,
        blanked_env_vars: &[String],
        user_env_data: &HashMap<String, String>,
    ) -> Result<(), Error> {
        self.init_run(run, default_config).await?;
        self.start_run(run, blanked_env_vars, user_env_data).await?;
        self.complete(run);
        self.persist(run).await?;
        Ok(())
    }

    async fn init_run(&self, run: &mut Run, default_config: Value) -> Result<(), Error> {
        run.status = RunStatus::Processing;
        run.start_processing_time = Some(Utc::now());
        self.persist(run).await?;

        if let Some(hash) = run.inputs.get("ipfs_hash").and_then(Value::as_str).map(str::to_owned) {
            let local_path = self.fetch_ipfs_input(&hash).await?;
            if let Value::Object(inputs) = &mut run.inputs {
                inputs.insert("local_path".to_owned(), Value::String(local_path));
            }
        }

        // Module on-disk default < caller-supplied default < run-specific
        // config, each layer winning over the one before it.
        let module_default = self.installer.load_default_config(&run.deployment.module).await?;
        let merged_default = config_merge::merge(&module_default, &default_config);
        run.deployment.config = config_merge::merge(&merged_default, &run.deployment.config);

        self.resolve_llm_config(run).await?;
        self.validate_inputs(run).await?;

        Ok(())
    }

    /// For agent/tool deployments whose merged config names an LLM config
    /// (`llm_config.config_name`), resolves it against the module's
    /// on-disk LLM config file and substitutes the full entry back in.
    async fn resolve_llm_config(&self, run: &mut Run) -> Result<(), Error> {
        if !matches!(run.deployment.module.kind, ModuleKind::Agent | ModuleKind::Tool) {
            return Ok(());
        }

        let Some(config_name) = run
            .deployment
            .config
            .get("llm_config")
            .and_then(|c| c.get("config_name"))
            .and_then(Value::as_str)
            .map(str::to_owned)
        else {
            return Ok(());
        };

        let resolved = self.installer.resolve_llm_config(&run.deployment.module, &config_name).await?;
        if let Value::Object(config) = &mut run.deployment.config {
            config.insert("llm_config".to_owned(), resolved);
        }
        Ok(())
    }

    /// Validates `run.inputs` against the module's declared input schema,
    /// when it ships one. Modules with no schema file fall back to the
    /// bare not-null check this engine has always enforced.
    async fn validate_inputs(&self, run: &Run) -> Result<(), Error> {
        let Some(schema) = self.installer.load_input_schema(&run.deployment.module).await? else {
            if run.inputs.is_null() {
                return Err(Error::Schema("inputs must not be null".to_owned()));
            }
            return Ok(());
        };

        let validator = jsonschema::validator_for(&schema).map_err(|e| Error::Schema(e.to_string()))?;
        validator.validate(&run.inputs).map_err(|e| Error::Schema(e.to_string()))?;
        Ok(())
    }

    async fn fetch_ipfs_input(&self, hash: &str) -> Result<String, Error> {
        // Minimal fetch-to-scratch-file: the installer's archive unpacking
        // is for module/persona trees specifically, so a run's ad hoc
        // input blob is just downloaded as-is here.
        let url = format!("https://ipfs.io/ipfs/{hash}");
        let bytes = reqwest::get(&url).await?.bytes().await?;
        let path = std::env::temp_dir().join(format!("naptha-input-{hash}"));
        tokio::fs::write(&path, &bytes).await?;
        Ok(path.to_string_lossy().into_owned())
    }

    async fn start_run(&self, run: &mut Run, blanked_env_vars: &[String], user_env_data: &HashMap<String, String>) -> Result<(), Error> {
        run.status = RunStatus::Running;
        self.persist(run).await?;

        let module = &run.deployment.module;
        self.installer.ensure_installed(module).await?;

        if let Some(persona_url) = run.deployment.config.get("persona_url").and_then(Value::as_str) {
            let source = node_types::module::PersonaSource::parse(persona_url)
                .map_err(|e| Error::Schema(format!("invalid persona_url: {e}")))?;
            self.installer.ensure_persona(&source).await?;
        }

        let module_dir = self.installer.module_path(module.name.as_ref());
        let run_json = serde_json::to_value(&*run).map_err(|e| Error::Schema(e.to_string()))?;

        let result = self
            .loader
            .run_entrypoint(
                &module_dir,
                module.name.as_ref(),
                &module.entrypoint,
                &run_json,
                blanked_env_vars,
                user_env_data,
                None,
            )
            .await?;

        run.results = vec![self.publish_result(run, &result).await?];
        Ok(())
    }

    /// Honors the deployment's data-generation config: when
    /// `save_outputs` is unset, keeps the stringified response as-is;
    /// otherwise writes it under the node's output directory or publishes
    /// it to ipfs and returns that publication descriptor instead.
    async fn publish_result(&self, run: &Run, result: &Value) -> Result<String, Error> {
        let data_gen = run.deployment.config.get("data_generation_config");
        let save_outputs = data_gen.and_then(|c| c.get("save_outputs")).and_then(Value::as_bool).unwrap_or(false);
        if !save_outputs {
            return Ok(result.to_string());
        }

        let save_location = data_gen
            .and_then(|c| c.get("save_outputs_location"))
            .and_then(Value::as_str)
            .unwrap_or("node");
        let bytes = serde_json::to_vec(result).map_err(|e| Error::Schema(e.to_string()))?;

        if save_location == "ipfs" {
            let hash = self.installer.publish_to_ipfs(bytes, "result.json").await?;
            return Ok(format!("ipfs://{hash}"));
        }

        let run_suffix = run.id.split_once(':').map_or(run.id.as_str(), |(_, suffix)| suffix);
        let dir = self.base_output_dir.join(run_suffix);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join("result.json");
        tokio::fs::write(&path, &bytes).await?;
        Ok(path.to_string_lossy().into_owned())
    }

    fn complete(&self, run: &mut Run) {
        run.status = RunStatus::Completed;
        run.error = false;
        run.error_message.clear();
        run.completed_time = Some(Utc::now());
        run.duration = duration_secs(run.start_processing_time, run.completed_time);
    }

    async fn fail(&self, run: &mut Run, err: &Error) {
        run.status = RunStatus::Error;
        run.error = true;
        run.error_message = chain_to_string(err);
        run.completed_time = Some(Utc::now());
        run.duration = duration_secs(run.start_processing_time, run.completed_time);

        if let Err(persist_err) = self.persist(run).await {
            log::error!("failed to persist failed run {}: {persist_err:#}", run.id);
        }
    }

    async fn persist(&self, run: &mut Run) -> Result<(), Error> {
        if run.id.is_empty() {
            let created = self.ledger.runs.create(run.kind, run).await?;
            run.id = created.id;
        } else {
            self.ledger.runs.update(run.kind, &run.id, run).await?;
        }
        Ok(())
    }
}

fn duration_secs(start: Option<chrono::DateTime<Utc>>, end: Option<chrono::DateTime<Utc>>) -> Option<f64> {
    match (start, end) {
        (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
        _ => Some(0.0),
    }
}

fn chain_to_string(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn duration_secs_computes_elapsed() {
        let start = Utc::now();
        let end = start + ChronoDuration::milliseconds(1500);
        assert_eq!(duration_secs(Some(start), Some(end)), Some(1.5));
    }

    #[test]
    fn duration_secs_defaults_to_zero_when_never_started() {
        assert_eq!(duration_secs(None, Some(Utc::now())), Some(0.0));
    }
}
