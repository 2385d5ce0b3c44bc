use crate::error::DeviceError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Capture configuration consumed from the hosting UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Enable the microphone track alongside video
    pub audio: bool,

    /// Show the preview and take screenshots mirrored
    pub mirrored: bool,

    /// MIME type of screenshots (default: image/jpeg)
    pub screenshot_format: String,

    /// Device constraints passed through to the camera, e.g. `facingMode`
    pub video_constraints: serde_json::Map<String, serde_json::Value>,

    /// Chunk emission interval in milliseconds.
    /// `None` or zero: a single chunk is emitted at stop.
    pub timeslice_ms: Option<u64>,

    /// Container MIME type requested from the recorder
    pub mime_type: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            audio: false,
            mirrored: false,
            screenshot_format: "image/jpeg".to_string(),
            video_constraints: serde_json::Map::new(),
            timeslice_ms: None,
            mime_type: "video/webm".to_string(),
        }
    }
}

impl CaptureConfig {
    pub fn timeslice(&self) -> Option<Duration> {
        self.timeslice_ms
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
    }
}

/// One unit of captured media, immutable once emitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaChunk {
    /// Encoded media bytes
    pub data: Vec<u8>,
    /// MIME type as reported by the recorder (may carry a `codecs=` parameter)
    pub mime_type: String,
}

impl MediaChunk {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A single still frame grabbed from the live stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub data: Vec<u8>,
    pub mime_type: String,
    pub mirrored: bool,
}

/// Events a recorder emits, in emission order
#[derive(Debug)]
pub enum RecorderEvent {
    Start,
    DataAvailable(MediaChunk),
    Error(DeviceError),
    /// Always the last event of a recording; no events follow it
    Stop,
}

/// A recorder bound to a live stream
///
/// Implementations deliver events through the receiver returned by `start`.
/// After `stop` is requested they flush any buffered data as a final
/// `DataAvailable` and then emit `Stop`.
#[async_trait::async_trait]
pub trait MediaRecorder: Send + Sync {
    /// Begin recording, emitting a chunk every `timeslice` (or once at stop)
    async fn start(
        &mut self,
        timeslice: Option<Duration>,
    ) -> Result<mpsc::Receiver<RecorderEvent>, DeviceError>;

    /// Ask the recorder to finalize
    async fn stop(&mut self) -> Result<(), DeviceError>;

    /// Check if the recorder is still producing events
    fn is_recording(&self) -> bool;
}

/// Camera/microphone backend behind a capture handle
#[async_trait::async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Construct a recorder over the live stream.
    ///
    /// Fails if the stream is unavailable or the MIME type is unsupported.
    fn open_recorder(&self, config: &CaptureConfig) -> Result<Box<dyn MediaRecorder>, DeviceError>;

    /// Snapshot the current frame in `config.screenshot_format`
    async fn grab_frame(&self, config: &CaptureConfig) -> Result<Frame, DeviceError>;

    /// Get device name for logging
    fn name(&self) -> &str;
}

/// Live binding between a UI capture element and its device
#[derive(Clone)]
pub struct CaptureHandle {
    key: String,
    config: CaptureConfig,
    device: Arc<dyn CaptureDevice>,
}

impl CaptureHandle {
    pub fn new(key: impl Into<String>, config: CaptureConfig, device: Arc<dyn CaptureDevice>) -> Self {
        Self {
            key: key.into(),
            config,
            device,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn device(&self) -> &Arc<dyn CaptureDevice> {
        &self.device
    }
}

impl std::fmt::Debug for CaptureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureHandle")
            .field("key", &self.key)
            .field("config", &self.config)
            .field("device", &self.device.name())
            .finish()
    }
}
