use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, File};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{BridgeError, PersistenceError, TransportError};
use crate::transport::{decode_data_uri, normalize, ChunkPayload};

/// Reassembler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReassemblerConfig {
    /// Directory artifacts are written to
    pub upload_dir: PathBuf,

    /// URL prefix the upload directory is served under
    pub public_url_prefix: String,

    /// Artifact file name, prefixed per key: `<key>_<video_file_name>`
    pub video_file_name: String,

    /// Consecutive undecodable chunks tolerated before giving up (default: 3)
    pub max_consecutive_decode_failures: usize,
}

impl ReassemblerConfig {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            public_url_prefix: "/_upload".to_string(),
            video_file_name: "video.webm".to_string(),
            max_consecutive_decode_failures: 3,
        }
    }
}

/// Retrieval view of an artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactStatus {
    pub key: String,
    pub file_name: String,
    /// Retrieval URL, cache-busted with the generation
    pub url: String,
    pub generation: u64,
    /// False while a recording is in progress, even if a partial file exists
    pub exists: bool,
    pub recording: bool,
    pub bytes_written: u64,
    pub chunks_appended: usize,
}

/// What happened to a chunk handed to `on_chunk`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    Appended { sequence: u64, bytes: usize },
    /// Undecodable payload, skipped
    Dropped { sequence: u64 },
}

#[derive(Debug)]
struct ArtifactSlot {
    path: PathBuf,
    file: Option<File>,
    recording: bool,
    generation: u64,
    next_sequence: u64,
    bytes_written: u64,
    chunks_appended: usize,
    consecutive_failures: usize,
}

impl ArtifactSlot {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            file: None,
            recording: false,
            generation: 0,
            next_sequence: 0,
            bytes_written: 0,
            chunks_appended: 0,
            consecutive_failures: 0,
        }
    }
}

/// Rebuilds video artifacts from transport-encoded chunks
///
/// Each artifact key has its own lock, so appends to one artifact are
/// serialized while different artifacts are written concurrently.
pub struct Reassembler {
    config: ReassemblerConfig,
    slots: RwLock<HashMap<String, Arc<Mutex<ArtifactSlot>>>>,
}

impl Reassembler {
    pub fn new(config: ReassemblerConfig) -> Self {
        info!(
            "Reassembler initialized: {} (served at {})",
            config.upload_dir.display(),
            config.public_url_prefix
        );

        Self {
            config,
            slots: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ReassemblerConfig {
        &self.config
    }

    /// Truncate (or create) the artifact and begin a new generation
    pub async fn on_start(&self, key: &str) -> Result<ArtifactStatus, PersistenceError> {
        let slot = self.slot_or_insert(key).await?;
        let mut slot = slot.lock().await;

        if slot.recording {
            warn!("{}: restarted before stop, discarding partial artifact", key);
            slot.file = None;
        }

        fs::create_dir_all(&self.config.upload_dir)
            .await
            .map_err(|e| PersistenceError::io(&self.config.upload_dir, e))?;

        let file = File::create(&slot.path)
            .await
            .map_err(|e| PersistenceError::io(&slot.path, e))?;

        slot.file = Some(file);
        slot.recording = true;
        slot.generation += 1;
        slot.next_sequence = 0;
        slot.bytes_written = 0;
        slot.chunks_appended = 0;
        slot.consecutive_failures = 0;

        info!(
            "{}: started artifact {} (generation {})",
            key,
            slot.path.display(),
            slot.generation
        );

        Ok(self.describe(key, Some(&*slot), false))
    }

    /// Decode a chunk and append it to the artifact.
    ///
    /// Chunks must arrive in sequence order. An undecodable chunk is dropped;
    /// too many in a row fail with `TransportError::RepeatedFailures`. A write
    /// failure rolls the file back to its previous length.
    pub async fn on_chunk(&self, key: &str, payload: &ChunkPayload) -> Result<ChunkOutcome, BridgeError> {
        let slot = self
            .existing_slot(key)
            .await?
            .ok_or_else(|| PersistenceError::NotRecording(key.to_string()))?;
        let mut guard = slot.lock().await;
        let slot = &mut *guard;

        if !slot.recording {
            return Err(PersistenceError::NotRecording(key.to_string()).into());
        }

        if payload.sequence != slot.next_sequence {
            warn!(
                "{}: rejecting chunk {} (expected {})",
                key, payload.sequence, slot.next_sequence
            );
            return Err(TransportError::OutOfOrder {
                expected: slot.next_sequence,
                got: payload.sequence,
            }
            .into());
        }

        let decoded = match decode_data_uri(&normalize(&payload.data_uri)) {
            Ok(decoded) => decoded,
            Err(e) => {
                slot.next_sequence += 1;
                slot.consecutive_failures += 1;
                warn!(
                    "{}: dropping undecodable chunk {}: {} ({} in a row)",
                    key, payload.sequence, e, slot.consecutive_failures
                );

                if slot.consecutive_failures >= self.config.max_consecutive_decode_failures {
                    return Err(TransportError::RepeatedFailures {
                        count: slot.consecutive_failures,
                    }
                    .into());
                }
                return Ok(ChunkOutcome::Dropped {
                    sequence: payload.sequence,
                });
            }
        };

        let file = slot
            .file
            .as_mut()
            .ok_or_else(|| PersistenceError::NotRecording(key.to_string()))?;

        if let Err(e) = append(file, &decoded.data).await {
            rollback(file, slot.bytes_written).await;
            return Err(PersistenceError::io(&slot.path, e).into());
        }

        slot.next_sequence += 1;
        slot.consecutive_failures = 0;
        slot.bytes_written += decoded.data.len() as u64;
        slot.chunks_appended += 1;

        debug!(
            "{}: appended chunk {} ({} bytes, {} total)",
            key,
            payload.sequence,
            decoded.data.len(),
            slot.bytes_written
        );

        Ok(ChunkOutcome::Appended {
            sequence: payload.sequence,
            bytes: decoded.data.len(),
        })
    }

    /// Finalize the artifact and make it available for retrieval
    pub async fn on_stop(&self, key: &str) -> Result<ArtifactStatus, PersistenceError> {
        let slot = self
            .existing_slot(key)
            .await?
            .ok_or_else(|| PersistenceError::NotRecording(key.to_string()))?;
        let mut guard = slot.lock().await;
        let slot = &mut *guard;

        if !slot.recording {
            return Err(PersistenceError::NotRecording(key.to_string()));
        }

        // The file stays open until it is durable, so a failed stop can be retried
        if let Some(file) = slot.file.as_mut() {
            file.flush()
                .await
                .map_err(|e| PersistenceError::io(&slot.path, e))?;
            file.sync_all()
                .await
                .map_err(|e| PersistenceError::io(&slot.path, e))?;
        }

        slot.file = None;
        slot.recording = false;

        info!(
            "{}: artifact complete: {} ({} chunks, {} bytes, generation {})",
            key,
            slot.path.display(),
            slot.chunks_appended,
            slot.bytes_written,
            slot.generation
        );

        let exists = fs::try_exists(&slot.path).await.unwrap_or(false);
        Ok(self.describe(key, Some(&*slot), exists))
    }

    /// Whether a complete artifact is available; false while recording
    pub async fn exists(&self, key: &str) -> Result<bool, PersistenceError> {
        Ok(self.status(key).await?.exists)
    }

    /// Current status; keys never started here report generation 0 and
    /// whatever is already on disk
    pub async fn status(&self, key: &str) -> Result<ArtifactStatus, PersistenceError> {
        match self.existing_slot(key).await? {
            Some(slot) => {
                let slot = slot.lock().await;
                let exists = !slot.recording && fs::try_exists(&slot.path).await.unwrap_or(false);
                Ok(self.describe(key, Some(&*slot), exists))
            }
            None => {
                let path = self.artifact_path(key)?;
                let exists = fs::try_exists(&path).await.unwrap_or(false);
                Ok(self.describe(key, None, exists))
            }
        }
    }

    /// Path of the artifact file for `key`
    pub fn artifact_path(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        validate_key(key)?;
        Ok(self.config.upload_dir.join(self.file_name(key)))
    }

    fn file_name(&self, key: &str) -> String {
        format!("{}_{}", key, self.config.video_file_name)
    }

    async fn existing_slot(&self, key: &str) -> Result<Option<Arc<Mutex<ArtifactSlot>>>, PersistenceError> {
        validate_key(key)?;
        let slots = self.slots.read().await;
        Ok(slots.get(key).cloned())
    }

    async fn slot_or_insert(&self, key: &str) -> Result<Arc<Mutex<ArtifactSlot>>, PersistenceError> {
        if let Some(slot) = self.existing_slot(key).await? {
            return Ok(slot);
        }

        let path = self.artifact_path(key)?;
        let mut slots = self.slots.write().await;
        let slot = slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ArtifactSlot::new(path))));

        Ok(Arc::clone(slot))
    }

    fn describe(&self, key: &str, slot: Option<&ArtifactSlot>, exists: bool) -> ArtifactStatus {
        let file_name = self.file_name(key);
        let generation = slot.map_or(0, |slot| slot.generation);
        let url = format!(
            "{}/{}?r={}",
            self.config.public_url_prefix.trim_end_matches('/'),
            urlencoding::encode(&file_name),
            generation
        );

        ArtifactStatus {
            key: key.to_string(),
            file_name,
            url,
            generation,
            exists,
            recording: slot.is_some_and(|slot| slot.recording),
            bytes_written: slot.map_or(0, |slot| slot.bytes_written),
            chunks_appended: slot.map_or(0, |slot| slot.chunks_appended),
        }
    }
}

fn validate_key(key: &str) -> Result<(), PersistenceError> {
    let invalid = key.is_empty()
        || key.contains(['/', '\\', '\0'])
        || key.contains("..")
        || Path::new(key).is_absolute();

    if invalid {
        return Err(PersistenceError::InvalidKey(key.to_string()));
    }
    Ok(())
}

async fn append(file: &mut File, data: &[u8]) -> std::io::Result<()> {
    file.write_all(data).await?;
    file.flush().await
}

async fn rollback(file: &mut File, len: u64) {
    if let Err(e) = file.set_len(len).await {
        warn!("Failed to truncate artifact after write error: {}", e);
    }
    if let Err(e) = file.seek(SeekFrom::Start(len)).await {
        warn!("Failed to rewind artifact after write error: {}", e);
    }
}
