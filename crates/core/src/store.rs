//! File-backed model store
//!
//! A fitted pipeline is persisted as one canonical JSON blob
//! `{"kind": ..., "pipeline": ...}` plus a sibling `.hash` file holding the
//! blake3 hex digest of the blob bytes. Saving replaces both files; loading
//! verifies the digest when the sidecar exists and refuses blobs of another
//! pipeline kind.

use crate::errors::{AgroError, Result};
use crate::pipeline::{Pipeline, PipelineKind};
use crate::serialization::{canonical_json_string, content_hash_hex};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Serialize)]
struct EnvelopeRef<'a, P> {
    kind: PipelineKind,
    pipeline: &'a P,
}

#[derive(Deserialize)]
struct Envelope {
    kind: PipelineKind,
    pipeline: serde_json::Value,
}

/// Where a pipeline was written and the digest of its bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredArtifact {
    pub path: PathBuf,
    pub hash_path: PathBuf,
    pub hash: String,
}

/// Sidecar path holding the digest of `path`
pub fn hash_path(path: &Path) -> PathBuf {
    path.with_extension("hash")
}

/// Persist `pipeline` at `path`, creating parent directories as needed
pub fn save<P: Pipeline>(pipeline: &P, path: impl AsRef<Path>) -> Result<StoredArtifact> {
    let path = path.as_ref();
    let json = canonical_json_string(&EnvelopeRef {
        kind: P::KIND,
        pipeline,
    })?;
    let hash = content_hash_hex(json.as_bytes());

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| AgroError::persistence(parent, e))?;
    }

    // both files are fully staged before either is replaced
    let sidecar = hash_path(path);
    let staged_blob = stage(path, json.as_bytes())?;
    let staged_hash = stage(&sidecar, hash.as_bytes()).inspect_err(|_| {
        let _ = fs::remove_file(&staged_blob);
    })?;
    commit(&staged_blob, path)?;
    commit(&staged_hash, &sidecar)?;

    info!(kind = %P::KIND, path = %path.display(), %hash, "saved pipeline");
    Ok(StoredArtifact {
        path: path.to_path_buf(),
        hash_path: sidecar,
        hash,
    })
}

/// Write `bytes` next to `target` under a `.partial` name
fn stage(target: &Path, bytes: &[u8]) -> Result<PathBuf> {
    let mut name = target.as_os_str().to_owned();
    name.push(".partial");
    let staging = PathBuf::from(name);
    fs::write(&staging, bytes).map_err(|e| AgroError::persistence(&staging, e))?;
    Ok(staging)
}

fn commit(staging: &Path, target: &Path) -> Result<()> {
    fs::rename(staging, target).map_err(|e| AgroError::persistence(target, e))?;
    debug!(path = %target.display(), "replaced");
    Ok(())
}

fn read_envelope(path: &Path) -> Result<Envelope> {
    let bytes = fs::read(path).map_err(|e| AgroError::persistence(path, e))?;

    let sidecar = hash_path(path);
    if sidecar.exists() {
        let expected = fs::read_to_string(&sidecar).map_err(|e| AgroError::persistence(&sidecar, e))?;
        let actual = content_hash_hex(&bytes);
        if expected.trim() != actual {
            return Err(AgroError::persistence(
                path,
                format!("digest mismatch (expected {}, found {actual})", expected.trim()),
            ));
        }
        debug!(path = %path.display(), "digest verified");
    }

    serde_json::from_slice(&bytes).map_err(|e| AgroError::persistence(path, format!("corrupt blob: {e}")))
}

/// Kind tag of the blob at `path`, without decoding the pipeline
pub fn peek_kind(path: impl AsRef<Path>) -> Result<PipelineKind> {
    Ok(read_envelope(path.as_ref())?.kind)
}

/// Restore a pipeline previously written by [`save`]
pub fn load<P: Pipeline>(path: impl AsRef<Path>) -> Result<P> {
    let path = path.as_ref();
    let envelope = read_envelope(path)?;
    if envelope.kind != P::KIND {
        return Err(AgroError::persistence(
            path,
            format!("holds a {} pipeline, expected {}", envelope.kind, P::KIND),
        ));
    }

    let pipeline: P = serde_json::from_value(envelope.pipeline)
        .map_err(|e| AgroError::persistence(path, format!("corrupt pipeline: {e}")))?;
    pipeline
        .validate()
        .map_err(|e| AgroError::persistence(path, e))?;

    info!(kind = %P::KIND, path = %path.display(), "loaded pipeline");
    Ok(pipeline)
}
