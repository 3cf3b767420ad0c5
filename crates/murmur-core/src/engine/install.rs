//! Streaming pack installation.
//!
//! Downloads go to a `.part` file next to the final path and are
//! renamed into place only once the stream completes, so an interrupted
//! install never leaves a file that passes verification.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};

use futures_util::StreamExt;
use once_cell::sync::Lazy;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

use super::pack::{self, PackInfo};
use crate::error::{DictationError, Result};

/// Bytes fetched so far, and the expected total when the server sent a
/// content length.
#[derive(Debug, Clone, Copy)]
pub struct InstallProgress {
    pub downloaded: u64,
    pub total: Option<u64>,
}

impl InstallProgress {
    pub fn percent(&self) -> Option<u8> {
        match self.total {
            Some(total) if total > 0 => Some((self.downloaded * 100 / total).min(100) as u8),
            _ => None,
        }
    }
}

// One lock per pack name. Concurrent installs of the same pack queue
// up; the waiters find the file already in place and return early.
static INSTALL_LOCKS: Lazy<StdMutex<HashMap<&'static str, Arc<AsyncMutex<()>>>>> =
    Lazy::new(|| StdMutex::new(HashMap::new()));

fn lock_for(name: &'static str) -> Arc<AsyncMutex<()>> {
    let mut locks = INSTALL_LOCKS.lock().unwrap();
    locks
        .entry(name)
        .or_insert_with(|| Arc::new(AsyncMutex::new(())))
        .clone()
}

/// Install `pack` into the default packs directory, reporting progress
/// through `on_progress`.
pub async fn install_pack(
    pack: &'static PackInfo,
    on_progress: impl FnMut(InstallProgress),
) -> Result<PathBuf> {
    install_pack_to(pack, &pack::packs_dir(), on_progress).await
}

/// Install `pack` into `dir`.
pub async fn install_pack_to(
    pack: &'static PackInfo,
    dir: &Path,
    on_progress: impl FnMut(InstallProgress),
) -> Result<PathBuf> {
    let lock = lock_for(pack.name);
    let _guard = lock.lock().await;

    let dest = pack.path_in(dir);
    if pack.installed_in(dir) {
        debug!(pack = pack.name, "pack already installed");
        return Ok(dest);
    }

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| DictationError::Install(format!("create {}: {e}", dir.display())))?;

    info!(pack = pack.name, url = pack.url, "installing model pack");
    fetch_pack(pack.url, &dest, on_progress).await?;
    info!(pack = pack.name, path = %dest.display(), "pack installed");

    Ok(dest)
}

/// Stream `url` into `dest` via a `.part` sibling. The partial file is
/// removed on any failure.
pub(crate) async fn fetch_pack(
    url: &str,
    dest: &Path,
    on_progress: impl FnMut(InstallProgress),
) -> Result<()> {
    let part = part_path(dest);
    match stream_to(url, &part, on_progress).await {
        Ok(()) => {
            tokio::fs::rename(&part, dest)
                .await
                .map_err(|e| DictationError::Install(format!("rename into place: {e}")))?;
            Ok(())
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&part).await;
            Err(e)
        }
    }
}

async fn stream_to(
    url: &str,
    part: &Path,
    mut on_progress: impl FnMut(InstallProgress),
) -> Result<()> {
    let client = reqwest::Client::builder()
        .build()
        .map_err(|e| DictationError::Install(format!("http client: {e}")))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| DictationError::Install(format!("request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(DictationError::Install(format!(
            "server answered {status} for {url}"
        )));
    }

    let total = response.content_length();
    let mut file = tokio::fs::File::create(part)
        .await
        .map_err(|e| DictationError::Install(format!("create {}: {e}", part.display())))?;

    let mut downloaded = 0u64;
    on_progress(InstallProgress { downloaded, total });

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| DictationError::Install(format!("stream failed: {e}")))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| DictationError::Install(format!("write failed: {e}")))?;
        downloaded += chunk.len() as u64;
        on_progress(InstallProgress { downloaded, total });
    }

    file.flush()
        .await
        .map_err(|e| DictationError::Install(format!("flush failed: {e}")))?;

    if let Some(total) = total
        && downloaded != total
    {
        return Err(DictationError::Install(format!(
            "truncated download: got {downloaded} of {total} bytes"
        )));
    }

    Ok(())
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}
