use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::callbacks::RecorderCallbacks;
use super::chain::{ChunkDelivery, ListenerChain};
use super::lifecycle::PageLifecycle;
use super::stats::{RecorderState, RecorderStats};
use crate::capture::{CaptureHandle, MediaChunk, MediaRecorder, RecorderEvent};
use crate::error::{DeviceError, UsageError};
use crate::transport::ChunkEncoder;

/// Owns at most one active recorder for a capture handle
pub struct RecorderSession {
    /// Capture handle the session records from
    handle: CaptureHandle,

    /// Listener chain, resolved once from the supplied callbacks
    chain: Result<Arc<ListenerChain>, UsageError>,

    /// Page lifecycle (unload forces a stop)
    lifecycle: PageLifecycle,

    /// Current state, observable by the UI
    state: Arc<watch::Sender<RecorderState>>,

    /// Delivery counters for the current recording
    counters: Arc<Counters>,

    /// The active recording, if any. Held across start/stop so they never interleave.
    active: Mutex<Option<ActiveRecording>>,

    /// ID and start time of the current or last recording
    last_recording: Mutex<Option<(Uuid, DateTime<Utc>)>>,
}

#[derive(Debug, Default)]
struct Counters {
    chunks_delivered: AtomicUsize,
    bytes_delivered: AtomicUsize,
    empty_chunks_discarded: AtomicUsize,
}

impl Counters {
    fn reset(&self) {
        self.chunks_delivered.store(0, Ordering::SeqCst);
        self.bytes_delivered.store(0, Ordering::SeqCst);
        self.empty_chunks_discarded.store(0, Ordering::SeqCst);
    }
}

enum Control {
    Stop,
}

struct ActiveRecording {
    id: Uuid,
    control_tx: mpsc::Sender<Control>,
    pump: JoinHandle<()>,
}

impl RecorderSession {
    pub fn new(handle: CaptureHandle, callbacks: RecorderCallbacks, lifecycle: PageLifecycle) -> Self {
        let chain = ListenerChain::build(&callbacks).map(Arc::new);

        match &chain {
            Ok(chain) => debug!("{}: listener chain {:?}", handle.key(), chain),
            Err(_) => debug!("{}: no data handler, recording disabled", handle.key()),
        }

        let (state, _) = watch::channel(RecorderState::Idle);

        Self {
            handle,
            chain,
            lifecycle,
            state: Arc::new(state),
            counters: Arc::new(Counters::default()),
            active: Mutex::new(None),
            last_recording: Mutex::new(None),
        }
    }

    pub fn key(&self) -> &str {
        self.handle.key()
    }

    pub fn handle(&self) -> &CaptureHandle {
        &self.handle
    }

    pub fn state(&self) -> RecorderState {
        *self.state.borrow()
    }

    pub fn is_recording(&self) -> bool {
        self.state().is_active()
    }

    /// Watch state transitions, e.g. to toggle start/stop buttons
    pub fn subscribe_state(&self) -> watch::Receiver<RecorderState> {
        self.state.subscribe()
    }

    /// Start a new recording, replacing any active one.
    ///
    /// Fails only when no data-available handler was supplied. Device
    /// failures go to the error handler and leave the session `Idle`; the
    /// returned state tells the caller whether recording began.
    pub async fn start(&self) -> Result<RecorderState, UsageError> {
        let chain = self.chain.clone()?;
        let key = self.handle.key();

        let mut active = self.active.lock().await;

        if let Some(previous) = active.take() {
            info!("{}: stopping recording {} before restart", key, previous.id);
            self.finish(previous).await;
        }

        self.state.send_replace(RecorderState::Starting);

        if self.lifecycle.is_unloaded() {
            let error = DeviceError::Recorder("page is unloading".to_string());
            return Ok(self.fail_start(&chain, error).await);
        }

        let config = self.handle.config();

        let mut recorder = match self.handle.device().open_recorder(config) {
            Ok(recorder) => recorder,
            Err(e) => return Ok(self.fail_start(&chain, e).await),
        };

        let events = match recorder.start(config.timeslice()).await {
            Ok(events) => events,
            Err(e) => return Ok(self.fail_start(&chain, e).await),
        };

        let id = Uuid::new_v4();
        self.counters.reset();
        *self.last_recording.lock().await = Some((id, Utc::now()));

        let (control_tx, control_rx) = mpsc::channel(1);
        let mut unload = self.lifecycle.subscribe();
        unload.borrow_and_update();

        self.state.send_replace(RecorderState::Recording);

        let pump = Pump {
            key: key.to_string(),
            recording_id: id,
            recorder,
            events,
            control: control_rx,
            unload,
            chain,
            state: Arc::clone(&self.state),
            counters: Arc::clone(&self.counters),
        };

        *active = Some(ActiveRecording {
            id,
            control_tx,
            pump: tokio::spawn(pump.run()),
        });

        info!(
            "{}: recording {} started on {} (timeslice: {:?})",
            key,
            id,
            self.handle.device().name(),
            config.timeslice_ms
        );

        Ok(RecorderState::Recording)
    }

    /// Stop the active recording.
    ///
    /// Returns once the final chunk and the stop handler have been delivered.
    /// A no-op when idle.
    pub async fn stop(&self) {
        let mut active = self.active.lock().await;

        match active.take() {
            Some(recording) => self.finish(recording).await,
            None => debug!("{}: stop ignored, not recording", self.handle.key()),
        }
    }

    /// Get current session statistics
    pub async fn stats(&self) -> RecorderStats {
        let last = *self.last_recording.lock().await;

        RecorderStats {
            state: self.state(),
            recording_id: last.map(|(id, _)| id),
            started_at: last.map(|(_, at)| at),
            chunks_delivered: self.counters.chunks_delivered.load(Ordering::SeqCst),
            bytes_delivered: self.counters.bytes_delivered.load(Ordering::SeqCst),
            empty_chunks_discarded: self.counters.empty_chunks_discarded.load(Ordering::SeqCst),
        }
    }

    async fn finish(&self, recording: ActiveRecording) {
        self.state.send_if_modified(|state| {
            if *state == RecorderState::Recording {
                *state = RecorderState::Stopping;
                true
            } else {
                false
            }
        });

        // The pump may already be gone if the recorder stopped on its own
        let _ = recording.control_tx.send(Control::Stop).await;

        if let Err(e) = recording.pump.await {
            error!("{}: recorder task panicked: {}", self.handle.key(), e);
            self.state.send_replace(RecorderState::Idle);
        }

        info!("{}: recording {} stopped", self.handle.key(), recording.id);
    }

    async fn fail_start(&self, chain: &ListenerChain, error: DeviceError) -> RecorderState {
        warn!("{}: failed to start recording: {}", self.handle.key(), error);
        self.state.send_replace(RecorderState::Idle);
        chain.dispatch_error((&error).into()).await;
        RecorderState::Idle
    }
}

impl Drop for RecorderSession {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.try_lock() {
            if let Some(recording) = active.take() {
                warn!("{}: session dropped while recording", self.handle.key());
                recording.pump.abort();
            }
        }
    }
}

/// Drives one recording: forwards recorder events through the listener chain
/// in emission order until the recorder stops or the page unloads.
struct Pump {
    key: String,
    recording_id: Uuid,
    recorder: Box<dyn MediaRecorder>,
    events: mpsc::Receiver<RecorderEvent>,
    control: mpsc::Receiver<Control>,
    unload: watch::Receiver<bool>,
    chain: Arc<ListenerChain>,
    state: Arc<watch::Sender<RecorderState>>,
    counters: Arc<Counters>,
}

impl Pump {
    async fn run(mut self) {
        let mut encoder = ChunkEncoder::new();
        let mut stop_requested = false;

        loop {
            tokio::select! {
                biased;

                changed = self.unload.changed() => {
                    if changed.is_ok() && !*self.unload.borrow() {
                        continue;
                    }
                    warn!("{}: page unloading, forcing recording {} to stop", self.key, self.recording_id);
                    self.drain_queued(&mut encoder).await;
                    if let Err(e) = self.recorder.stop().await {
                        warn!("{}: recorder did not stop cleanly: {}", self.key, e);
                    }
                    self.chain.dispatch_unload().await;
                    break;
                }

                Some(Control::Stop) = self.control.recv(), if !stop_requested => {
                    stop_requested = true;
                    debug!("{}: requesting recorder stop", self.key);
                    if let Err(e) = self.recorder.stop().await {
                        error!("{}: failed to stop recorder: {}", self.key, e);
                        self.chain.dispatch_error((&e).into()).await;
                        self.chain.dispatch_stop().await;
                        break;
                    }
                }

                event = self.events.recv() => match event {
                    Some(RecorderEvent::Start) => self.chain.dispatch_start().await,
                    Some(RecorderEvent::DataAvailable(chunk)) => self.deliver(&chunk, &mut encoder).await,
                    Some(RecorderEvent::Error(e)) => {
                        warn!("{}: recorder reported error: {}", self.key, e);
                        self.chain.dispatch_error((&e).into()).await;
                    }
                    Some(RecorderEvent::Stop) => {
                        self.chain.dispatch_stop().await;
                        break;
                    }
                    None => {
                        warn!("{}: recorder closed without a stop event", self.key);
                        self.chain.dispatch_stop().await;
                        break;
                    }
                },
            }
        }

        info!(
            "{}: recording {} finished ({} chunks delivered)",
            self.key,
            self.recording_id,
            encoder.encoded()
        );

        self.state.send_replace(RecorderState::Idle);
    }

    async fn deliver(&self, chunk: &MediaChunk, encoder: &mut ChunkEncoder) {
        match self.chain.dispatch_chunk(chunk, encoder).await {
            ChunkDelivery::Delivered { sequence, bytes } => {
                debug!("{}: delivered chunk {} ({} bytes)", self.key, sequence, bytes);
                self.counters.chunks_delivered.fetch_add(1, Ordering::SeqCst);
                self.counters.bytes_delivered.fetch_add(bytes, Ordering::SeqCst);
            }
            ChunkDelivery::Discarded => {
                self.counters.empty_chunks_discarded.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    /// Deliver events the recorder queued before the unload; nothing later
    async fn drain_queued(&mut self, encoder: &mut ChunkEncoder) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                RecorderEvent::Start => self.chain.dispatch_start().await,
                RecorderEvent::DataAvailable(chunk) => self.deliver(&chunk, encoder).await,
                RecorderEvent::Error(e) => self.chain.dispatch_error((&e).into()).await,
                // Unload dispatches the stop handler itself
                RecorderEvent::Stop => break,
            }
        }
    }
}
