use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recorder session state machine: Idle → Starting → Recording → Stopping → Idle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderState {
    #[default]
    Idle,
    Starting,
    Recording,
    Stopping,
}

impl RecorderState {
    pub fn is_active(self) -> bool {
        matches!(self, RecorderState::Recording | RecorderState::Stopping)
    }
}

/// Statistics about the current (or last) recording of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderStats {
    pub state: RecorderState,

    /// ID of the current or last recording, for log correlation
    pub recording_id: Option<Uuid>,

    /// When the current or last recording started
    pub started_at: Option<DateTime<Utc>>,

    /// Non-empty chunks handed to `on_data_available`
    pub chunks_delivered: usize,

    /// Raw bytes in the delivered chunks
    pub bytes_delivered: usize,

    /// Zero-length chunks dropped before delivery
    pub empty_chunks_discarded: usize,
}
