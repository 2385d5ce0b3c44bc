use serde::{Deserialize, Serialize};

use super::codec::encode_data_uri;
use crate::capture::MediaChunk;

/// A media chunk encoded for the trip across the UI/application boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPayload {
    /// Position of the chunk within its recording, starting at 0
    pub sequence: u64,

    /// `data:<mime>;base64,<body>`
    pub data_uri: String,
}

/// Encodes chunks of one recording, numbering them in emission order
#[derive(Debug, Default)]
pub struct ChunkEncoder {
    next_sequence: u64,
}

impl ChunkEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encode(&mut self, chunk: &MediaChunk) -> ChunkPayload {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        ChunkPayload {
            sequence,
            data_uri: encode_data_uri(&chunk.mime_type, &chunk.data),
        }
    }

    /// Number of chunks encoded so far
    pub fn encoded(&self) -> u64 {
        self.next_sequence
    }
}
