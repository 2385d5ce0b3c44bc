// Deterministic capture device
//
// Plays back a fixed list of chunks, one per timeslice tick. Whatever has
// not been emitted when the recorder is stopped is flushed as the final
// chunk, the way a browser recorder hands over its buffer on stop. Used by
// the integration tests and the demo in place of a real camera.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::device::{CaptureConfig, CaptureDevice, Frame, MediaChunk, MediaRecorder, RecorderEvent};
use crate::error::DeviceError;

#[derive(Debug, Clone)]
pub struct ScriptedCamera {
    name: String,
    chunk_mime_type: String,
    supported_mime_types: Vec<String>,
    chunks: Vec<Vec<u8>>,
    frame: Option<Vec<u8>>,
    stream_available: bool,
    permission_denied: bool,
    fail_after: Option<(usize, String)>,
}

impl ScriptedCamera {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chunk_mime_type: "video/webm;codecs=vp8,opus".to_string(),
            supported_mime_types: vec!["video/webm".to_string()],
            chunks: Vec::new(),
            frame: None,
            stream_available: true,
            permission_denied: false,
            fail_after: None,
        }
    }

    /// Chunks emitted one per timeslice tick
    pub fn with_chunks(mut self, chunks: Vec<Vec<u8>>) -> Self {
        self.chunks = chunks;
        self
    }

    /// MIME type reported on emitted chunks
    pub fn with_chunk_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.chunk_mime_type = mime_type.into();
        self
    }

    pub fn with_supported_mime_types(mut self, mime_types: Vec<String>) -> Self {
        self.supported_mime_types = mime_types;
        self
    }

    /// Bytes returned for every screenshot
    pub fn with_frame(mut self, frame: Vec<u8>) -> Self {
        self.frame = Some(frame);
        self
    }

    /// Simulate a camera with no live stream
    pub fn without_stream(mut self) -> Self {
        self.stream_available = false;
        self
    }

    /// Simulate the user refusing camera/microphone access
    pub fn permission_denied(mut self) -> Self {
        self.permission_denied = true;
        self
    }

    /// Emit a recorder error after `chunks` chunks, then stop
    pub fn fail_after(mut self, chunks: usize, message: impl Into<String>) -> Self {
        self.fail_after = Some((chunks, message.into()));
        self
    }

    fn check_stream(&self) -> Result<(), DeviceError> {
        if self.permission_denied {
            return Err(DeviceError::PermissionDenied(format!(
                "{}: camera access was denied",
                self.name
            )));
        }
        if !self.stream_available {
            return Err(DeviceError::StreamUnavailable);
        }
        Ok(())
    }

    fn supports(&self, mime_type: &str) -> bool {
        let essence = mime_essence(mime_type);
        self.supported_mime_types
            .iter()
            .any(|supported| mime_essence(supported).eq_ignore_ascii_case(essence))
    }
}

fn mime_essence(mime_type: &str) -> &str {
    mime_type.split(';').next().unwrap_or_default().trim()
}

#[async_trait::async_trait]
impl CaptureDevice for ScriptedCamera {
    fn open_recorder(&self, config: &CaptureConfig) -> Result<Box<dyn MediaRecorder>, DeviceError> {
        self.check_stream()?;

        if !self.supports(&config.mime_type) {
            return Err(DeviceError::UnsupportedMimeType(config.mime_type.clone()));
        }

        debug!("{}: opening recorder for {}", self.name, config.mime_type);

        Ok(Box::new(ScriptedRecorder {
            chunks: self.chunks.iter().cloned().collect(),
            mime_type: self.chunk_mime_type.clone(),
            fail_after: self.fail_after.clone(),
            stop_tx: None,
            task: None,
        }))
    }

    async fn grab_frame(&self, config: &CaptureConfig) -> Result<Frame, DeviceError> {
        self.check_stream()?;

        let data = self
            .frame
            .clone()
            .ok_or_else(|| DeviceError::Frame(format!("{}: no frame rendered yet", self.name)))?;

        Ok(Frame {
            data,
            mime_type: config.screenshot_format.clone(),
            mirrored: config.mirrored,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

struct ScriptedRecorder {
    chunks: VecDeque<Vec<u8>>,
    mime_type: String,
    fail_after: Option<(usize, String)>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

#[async_trait::async_trait]
impl MediaRecorder for ScriptedRecorder {
    async fn start(
        &mut self,
        timeslice: Option<Duration>,
    ) -> Result<mpsc::Receiver<RecorderEvent>, DeviceError> {
        if self.task.is_some() {
            return Err(DeviceError::Recorder("recorder already started".to_string()));
        }

        let (tx, rx) = mpsc::channel(64);
        let (stop_tx, stop_rx) = oneshot::channel();
        self.stop_tx = Some(stop_tx);

        let chunks = std::mem::take(&mut self.chunks);
        let mime_type = self.mime_type.clone();
        let fail_after = self.fail_after.take();

        self.task = Some(tokio::spawn(play(tx, stop_rx, chunks, mime_type, timeslice, fail_after)));

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), DeviceError> {
        if let Some(stop_tx) = self.stop_tx.take() {
            // The playback task may already have finished on its own
            let _ = stop_tx.send(());
        }
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

async fn play(
    tx: mpsc::Sender<RecorderEvent>,
    mut stop_rx: oneshot::Receiver<()>,
    mut pending: VecDeque<Vec<u8>>,
    mime_type: String,
    timeslice: Option<Duration>,
    fail_after: Option<(usize, String)>,
) {
    if tx.send(RecorderEvent::Start).await.is_err() {
        return;
    }

    if let Some(period) = timeslice {
        let mut ticker = tokio::time::interval(period);
        // First tick completes immediately
        ticker.tick().await;
        let mut emitted = 0usize;

        loop {
            tokio::select! {
                _ = &mut stop_rx => break,
                _ = ticker.tick() => {
                    if let Some((after, message)) = &fail_after {
                        if emitted == *after {
                            info!("Scripted recorder failing after {} chunks", emitted);
                            let _ = tx.send(RecorderEvent::Error(DeviceError::Recorder(message.clone()))).await;
                            let _ = tx.send(RecorderEvent::Stop).await;
                            return;
                        }
                    }
                    if let Some(data) = pending.pop_front() {
                        emitted += 1;
                        let chunk = MediaChunk::new(data, mime_type.clone());
                        if tx.send(RecorderEvent::DataAvailable(chunk)).await.is_err() {
                            return;
                        }
                    }
                }
            }
        }
    } else {
        let _ = stop_rx.await;
    }

    // Hand over whatever is still buffered, even if it is empty
    let remainder: Vec<u8> = pending.into_iter().flatten().collect();
    let _ = tx
        .send(RecorderEvent::DataAvailable(MediaChunk::new(remainder, mime_type)))
        .await;
    let _ = tx.send(RecorderEvent::Stop).await;
}
