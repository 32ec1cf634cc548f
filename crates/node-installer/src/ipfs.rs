// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::Path;

use crate::error::Error;

/// Downloads `cid` from the configured gateway and unpacks it as a zip
/// archive into `dest`, replacing any prior contents atomically (unpack
/// into a sibling temp directory, then rename over `dest`).
pub async fn install(gateway_url: &str, cid: &str, dest: &Path) -> Result<(), Error> {
    let bytes = download(gateway_url, cid).await?;

    let parent = dest.parent().unwrap_or(Path::new("."));
    fs_err::create_dir_all(parent)?;
    let staging = parent.join(format!(".{}-staging-{}", dest_name(dest), std::process::id()));
    if staging.exists() {
        fs_err::remove_dir_all(&staging)?;
    }
    fs_err::create_dir_all(&staging)?;

    unpack_zip(&bytes, &staging)?;

    if dest.exists() {
        fs_err::remove_dir_all(dest)?;
    }
    fs_err::rename(&staging, dest)?;
    Ok(())
}

/// Uploads `bytes` to the gateway's `/api/v0/add` endpoint and returns the
/// resulting content hash, mirroring the distillation's `upload_to_ipfs`
/// (an `ipfshttpclient.add` call against the same gateway's HTTP API, whose
/// base URL `storage/utils.py::get_api_url` derives as `<scheme>://<host>:<port>/api/v0`).
pub async fn publish(gateway_url: &str, bytes: Vec<u8>, file_name: &str) -> Result<String, Error> {
    let api_url = format!("{}/api/v0/add", gateway_url.trim_end_matches('/'));
    let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_owned());
    let form = reqwest::multipart::Form::new().part("file", part);

    let response = reqwest::Client::new()
        .post(&api_url)
        .multipart(form)
        .send()
        .await
        .map_err(|e| Error::Source(format!("publishing to {api_url}: {e}")))?;

    if !response.status().is_success() {
        return Err(Error::Source(format!("gateway returned {} for {api_url}", response.status())));
    }

    let body: AddResponse = response.json().await.map_err(|e| Error::Source(e.to_string()))?;
    Ok(body.hash)
}

#[derive(serde::Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

fn dest_name(dest: &Path) -> String {
    dest.file_name().and_then(|n| n.to_str()).unwrap_or("module").to_owned()
}

async fn download(gateway_url: &str, cid: &str) -> Result<Vec<u8>, Error> {
    let url = format!("{}/ipfs/{cid}", gateway_url.trim_end_matches('/'));
    let response = reqwest::get(&url)
        .await
        .map_err(|e| Error::Source(format!("fetching {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(Error::Source(format!("gateway returned {} for {url}", response.status())));
    }

    response.bytes().await.map(|b| b.to_vec()).map_err(|e| Error::Source(e.to_string()))
}

fn unpack_zip(bytes: &[u8], dest: &std::path::Path) -> Result<(), Error> {
    let reader = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(reader).map_err(|e| Error::Source(format!("reading archive: {e}")))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| Error::Source(e.to_string()))?;
        let Some(out_path) = entry.enclosed_name() else {
            continue;
        };
        let out_path = dest.join(out_path);

        if entry.is_dir() {
            fs_err::create_dir_all(&out_path)?;
        } else {
            if let Some(parent) = out_path.parent() {
                fs_err::create_dir_all(parent)?;
            }
            let mut out_file = fs_err::File::create(&out_path)?;
            std::io::copy(&mut entry, &mut out_file)?;
        }
    }

    Ok(())
}
