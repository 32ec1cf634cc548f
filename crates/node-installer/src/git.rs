// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Thin wrapper around the `git` binary. This workspace's build tooling
//! (`boulder/src/build.rs`) already shells out to external commands with a
//! scrubbed environment rather than linking a library for process control;
//! git access here follows the same shape rather than adding a `git2`
//! dependency this workspace's stack doesn't otherwise carry.

use std::path::Path;

use tokio::process::Command;
use url::Url;

use crate::error::Error;

async fn run(args: &[&str], current_dir: &Path) -> Result<String, Error> {
    let output = Command::new("git")
        .args(args)
        .current_dir(current_dir)
        .env_clear()
        .env("PATH", "/usr/bin:/usr/sbin")
        .env("HOME", current_dir)
        .output()
        .await?;

    if !output.status.success() {
        return Err(Error::Source(format!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
}

pub async fn clone(url: &Url, dest: &Path) -> Result<(), Error> {
    let parent = dest.parent().unwrap_or(Path::new("."));
    run(&["clone", url.as_str(), dest.to_str().unwrap_or_default()], parent).await?;
    Ok(())
}

pub async fn fetch(dest: &Path) -> Result<(), Error> {
    run(&["fetch", "--tags", "--force"], dest).await?;
    Ok(())
}

pub async fn checkout(dest: &Path, tag: &str) -> Result<(), Error> {
    run(&["checkout", tag], dest).await?;
    Ok(())
}

/// The tag pointing at `HEAD`, if any, with a leading `v` stripped —
/// mirrors the distillation's tag-vs-HEAD comparison in
/// `module_manager.py::is_module_installed`.
pub async fn head_tag(dest: &Path) -> Result<Option<String>, Error> {
    if !dest.join(".git").exists() {
        return Ok(None);
    }
    let output = Command::new("git")
        .args(["tag", "--points-at", "HEAD"])
        .current_dir(dest)
        .env_clear()
        .env("PATH", "/usr/bin:/usr/sbin")
        .env("HOME", dest)
        .output()
        .await?;

    if !output.status.success() {
        return Ok(None);
    }

    let tag = String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.trim_start_matches('v').to_owned());
    Ok(tag)
}
