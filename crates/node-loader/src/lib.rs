// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Runs a module's entrypoint in an isolated subprocess.
//!
//! The environment-scrubbing contract is adapted from
//! `boulder/src/build.rs`, which spawns build-phase commands with
//! `Command::env_clear()` plus an explicit, minimal re-population rather
//! than inheriting the parent's full environment. The JSON-in/JSON-out
//! subprocess contract and the bootstrap script that detects sync vs.
//! async entrypoints are adapted from
//! `original_source/node/worker/package_worker.py`'s `ModuleLoader`.

mod error;

pub use crate::error::Error;

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use tokio::process::Command;

/// A short, embedded Python bootstrap that imports `<module>.run`, loads
/// the run as JSON from argv[1], calls the named entrypoint (awaiting it
/// if it's a coroutine function), and writes exactly one JSON document to
/// stdout — the result, or `{"error": "..."}` on an in-process exception.
const BOOTSTRAP: &str = r#"
import sys, json, importlib, inspect

run_path, module_name, entrypoint_name = sys.argv[1], sys.argv[2], sys.argv[3]

with open(run_path) as f:
    run = json.load(f)

try:
    module = importlib.import_module(f"{module_name}.run")
    entry = getattr(module, entrypoint_name)
    if inspect.iscoroutinefunction(entry):
        import asyncio
        result = asyncio.run(entry(run))
    else:
        result = entry(run)
    print(json.dumps(result))
except Exception as e:
    print(json.dumps({"error": str(e)}))
"#;

pub struct Loader {
    python_bin: String,
}

impl Default for Loader {
    fn default() -> Self {
        Self {
            python_bin: "python3".to_owned(),
        }
    }
}

impl Loader {
    pub fn with_interpreter(python_bin: impl Into<String>) -> Self {
        Self {
            python_bin: python_bin.into(),
        }
    }

    /// Executes `module_name`'s `entrypoint` against `run_json`, in
    /// `module_dir`, with an environment built from `blanked_vars`
    /// (removed from the node's own environment) overlaid with
    /// `user_env_data`. Returns the entrypoint's parsed JSON result.
    pub async fn run_entrypoint(
        &self,
        module_dir: &Path,
        module_name: &str,
        entrypoint: &str,
        run_json: &Value,
        blanked_vars: &[String],
        user_env_data: &HashMap<String, String>,
        timeout: Option<Duration>,
    ) -> Result<Value, Error> {
        let run_file = tempfile::NamedTempFile::new()?;
        tokio::fs::write(run_file.path(), serde_json::to_vec(run_json)?).await?;

        let mut command = Command::new(&self.python_bin);
        command
            .arg("-c")
            .arg(BOOTSTRAP)
            .arg(run_file.path())
            .arg(module_name)
            .arg(entrypoint)
            .current_dir(module_dir)
            .env("PYTHONPATH", module_dir)
            .kill_on_drop(true);

        for var in blanked_vars {
            command.env_remove(var);
        }
        for (key, value) in user_env_data {
            command.env(key, value);
        }

        let run = command.output();
        let output = match timeout {
            Some(duration) => tokio::time::timeout(duration, run).await.map_err(|_| {
                log::error!("{module_name}.{entrypoint} exceeded its {duration:?} deadline");
                Error::Timeout
            })??,
            None => run.await?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            log::error!("{module_name}.{entrypoint} exited with {:?}: {stderr}", output.status.code());
            return Err(Error::Subprocess {
                code: output.status.code(),
                stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let last_line = stdout.lines().next_back().unwrap_or_default();
        let value: Value = serde_json::from_str(last_line)?;

        if let Some(message) = value.get("error").and_then(Value::as_str) {
            log::error!("{module_name}.{entrypoint} raised: {message}");
            return Err(Error::EntrypointError(message.to_owned()));
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn write_module(dir: &Path, body: &str) {
        fs::create_dir_all(dir.join("hello")).unwrap();
        fs::write(dir.join("hello/__init__.py"), "").unwrap();
        fs::write(dir.join("hello/run.py"), body).unwrap();
    }

    fn python_available() -> bool {
        std::process::Command::new("python3").arg("--version").output().is_ok()
    }

    #[tokio::test]
    async fn runs_sync_entrypoint_and_parses_result() {
        if !python_available() {
            eprintln!("skipping: python3 not available");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        write_module(
            dir.path(),
            "def greet(run):\n    return {\"message\": f\"Hello, {run['inputs']['name']}!\"}\n",
        );

        let loader = Loader::default();
        let result = loader
            .run_entrypoint(
                dir.path(),
                "hello",
                "greet",
                &json!({"inputs": {"name": "Ada"}}),
                &[],
                &HashMap::new(),
                Some(Duration::from_secs(10)),
            )
            .await
            .unwrap();

        assert_eq!(result["message"], "Hello, Ada!");
    }

    #[tokio::test]
    async fn entrypoint_exception_surfaces_as_entrypoint_error() {
        if !python_available() {
            eprintln!("skipping: python3 not available");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        write_module(dir.path(), "def greet(run):\n    raise ValueError('boom')\n");

        let loader = Loader::default();
        let err = loader
            .run_entrypoint(dir.path(), "hello", "greet", &json!({}), &[], &HashMap::new(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::EntrypointError(msg) if msg.contains("boom")));
    }

    #[tokio::test]
    async fn blanked_vars_are_not_visible_to_subprocess() {
        if !python_available() {
            eprintln!("skipping: python3 not available");
            return;
        }
        std::env::set_var("NODE_SECRET", "super-secret");
        let dir = tempfile::tempdir().unwrap();
        write_module(
            dir.path(),
            "import os\ndef greet(run):\n    return {\"leaked\": os.environ.get('NODE_SECRET')}\n",
        );

        let loader = Loader::default();
        let result = loader
            .run_entrypoint(
                dir.path(),
                "hello",
                "greet",
                &json!({}),
                &["NODE_SECRET".to_owned()],
                &HashMap::new(),
                None,
            )
            .await
            .unwrap();

        assert!(result["leaked"].is_null());
        std::env::remove_var("NODE_SECRET");
    }
}
