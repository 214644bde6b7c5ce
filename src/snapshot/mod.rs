//! Snapshot file format and atomic write/read helpers shared by C9.
//!
//! The on-disk layout is a single versioned JSON document. Writes go
//! through write-temp, fsync, rename so a reader never observes a
//! partially written file.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::Identity;
use crate::memory::{Hyperedge, MemoryNode};
use crate::opponent::OpponentPair;
use crate::wake::WakeState;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub identity: Identity,
    pub memory_nodes: Vec<MemoryNode>,
    pub hyperedges: Vec<Hyperedge>,
    pub wake_state: WakeState,
    pub fatigue: f32,
    pub opponent_pairs: Vec<OpponentPair>,
    pub cycle_counter: u64,

    /// Fields from a future format version that this binary doesn't
    /// understand yet; preserved verbatim on re-save.
    #[serde(default, flatten)]
    pub unknown_fields: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot corrupted: {0}")]
    Corrupted(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Atomically writes `snapshot` to `path`: write to a sibling temp file,
/// fsync, then rename over the destination.
pub async fn write_atomic(path: impl AsRef<std::path::Path>, snapshot: &Snapshot) -> Result<(), SnapshotError> {
    use tokio::io::AsyncWriteExt;

    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp_path = path.with_extension("tmp");

    let bytes = serde_json::to_vec_pretty(snapshot).map_err(|e| SnapshotError::Corrupted(e.to_string()))?;

    let mut file = tokio::fs::File::create(&tmp_path).await?;
    file.write_all(&bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

/// Loads and validates a snapshot. Returns `Ok(None)` if no file exists
/// at `path` (a fresh start), `Err` if the file exists but fails to
/// parse or fails its integrity check.
pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Option<Snapshot>, SnapshotError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }
    let bytes = tokio::fs::read(path).await?;
    let snapshot: Snapshot = serde_json::from_slice(&bytes).map_err(|e| SnapshotError::Corrupted(e.to_string()))?;
    if snapshot.version > SNAPSHOT_VERSION {
        return Err(SnapshotError::Corrupted(format!(
            "snapshot version {} is newer than this binary supports ({})",
            snapshot.version, SNAPSHOT_VERSION
        )));
    }
    Ok(Some(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;

    fn sample_snapshot() -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            created_at: chrono::Utc::now(),
            identity: Identity::new("echobeats", 8),
            memory_nodes: Vec::new(),
            hyperedges: Vec::new(),
            wake_state: WakeState::Awake,
            fatigue: 0.0,
            opponent_pairs: Vec::new(),
            cycle_counter: 0,
            unknown_fields: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn write_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let snapshot = sample_snapshot();

        write_atomic(&path, &snapshot).await.unwrap();
        let loaded = load(&path).await.unwrap().unwrap();
        assert_eq!(loaded.cycle_counter, snapshot.cycle_counter);
        assert_eq!(loaded.identity.name, "echobeats");
    }

    #[tokio::test]
    async fn load_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let loaded = load(&path).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn load_rejects_newer_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let mut snapshot = sample_snapshot();
        snapshot.version = SNAPSHOT_VERSION + 1;
        write_atomic(&path, &snapshot).await.unwrap();

        let err = load(&path).await.unwrap_err();
        assert!(matches!(err, SnapshotError::Corrupted(_)));
    }

    #[tokio::test]
    async fn unknown_fields_are_preserved_on_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");

        let mut raw = serde_json::to_value(sample_snapshot()).unwrap();
        raw.as_object_mut().unwrap().insert("future_field".to_string(), serde_json::json!("value"));
        tokio::fs::write(&path, serde_json::to_vec(&raw).unwrap()).await.unwrap();

        let loaded = load(&path).await.unwrap().unwrap();
        assert_eq!(loaded.unknown_fields.get("future_field").and_then(|v| v.as_str()), Some("value"));

        write_atomic(&path, &loaded).await.unwrap();
        let reloaded = load(&path).await.unwrap().unwrap();
        assert_eq!(reloaded.unknown_fields.get("future_field").and_then(|v| v.as_str()), Some("value"));
    }
}
