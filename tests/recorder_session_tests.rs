// Integration tests for the recorder session state machine
//
// These tests drive a RecorderSession against the scripted camera and check
// listener ordering, chunk delivery, restart and unload behavior.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use webcam_bridge::{
    decode_data_uri, normalize, CaptureConfig, CaptureDevice, CaptureHandle, CaptureRegistry,
    ChunkPayload, DeviceError, Frame, MediaChunk, MediaRecorder, PageLifecycle, RecorderCallbacks,
    RecorderEvent, RecorderSession, RecorderState, ScriptedCamera, UsageError,
};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Start,
    Data(u64, Vec<u8>),
    Stop,
    Error(String),
}

fn recording_callbacks(tx: mpsc::UnboundedSender<Event>) -> RecorderCallbacks {
    let data_tx = tx.clone();
    let start_tx = tx.clone();
    let stop_tx = tx.clone();
    let error_tx = tx;

    RecorderCallbacks::new()
        .on_data_available(move |payload: ChunkPayload| {
            let tx = data_tx.clone();
            async move {
                let decoded = decode_data_uri(&normalize(&payload.data_uri)).unwrap();
                let _ = tx.send(Event::Data(payload.sequence, decoded.data));
            }
        })
        .on_start(move || {
            let tx = start_tx.clone();
            async move {
                let _ = tx.send(Event::Start);
            }
        })
        .on_stop(move || {
            let tx = stop_tx.clone();
            async move {
                let _ = tx.send(Event::Stop);
            }
        })
        .on_error(move |error| {
            let tx = error_tx.clone();
            async move {
                let _ = tx.send(Event::Error(error.kind));
            }
        })
}

fn timesliced(ms: u64) -> CaptureConfig {
    CaptureConfig {
        timeslice_ms: Some(ms),
        ..CaptureConfig::default()
    }
}

fn session(camera: ScriptedCamera, config: CaptureConfig, callbacks: RecorderCallbacks) -> RecorderSession {
    let handle = CaptureHandle::new("webcam", config, Arc::new(camera));
    RecorderSession::new(handle, callbacks, PageLifecycle::new())
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for recorder event")
        .expect("event channel closed")
}

fn drain(rx: &mut mpsc::UnboundedReceiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

async fn wait_for_idle(session: &RecorderSession) -> Result<()> {
    let mut state = session.subscribe_state();
    timeout(Duration::from_secs(2), state.wait_for(|s| *s == RecorderState::Idle)).await??;
    Ok(())
}

#[tokio::test]
async fn test_start_without_data_handler_is_usage_error() -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let error_tx = tx.clone();
    let callbacks = RecorderCallbacks::new()
        .on_start(move || {
            let tx = tx.clone();
            async move {
                let _ = tx.send(Event::Start);
            }
        })
        .on_error(move |error| {
            let tx = error_tx.clone();
            async move {
                let _ = tx.send(Event::Error(error.kind));
            }
        });

    // A denied camera would report through on_error if it were ever touched
    let session = session(
        ScriptedCamera::new("cam").permission_denied(),
        CaptureConfig::default(),
        callbacks,
    );

    let result = session.start().await;

    assert_eq!(result, Err(UsageError::MissingDataHandler));
    assert_eq!(session.state(), RecorderState::Idle);
    assert!(drain(&mut rx).is_empty(), "No device interaction expected");

    Ok(())
}

#[tokio::test]
async fn test_chunks_delivered_in_order_and_empty_chunks_discarded() -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let camera = ScriptedCamera::new("cam").with_chunks(vec![vec![1, 1], vec![], vec![2, 2], vec![3, 3]]);
    let session = session(camera, timesliced(10), recording_callbacks(tx));

    assert_eq!(session.start().await?, RecorderState::Recording);
    assert!(session.is_recording());

    assert_eq!(next_event(&mut rx).await, Event::Start);
    assert_eq!(next_event(&mut rx).await, Event::Data(0, vec![1, 1]));
    assert_eq!(next_event(&mut rx).await, Event::Data(1, vec![2, 2]));
    assert_eq!(next_event(&mut rx).await, Event::Data(2, vec![3, 3]));

    session.stop().await;

    // Final buffer is empty, so only the stop callback remains
    assert_eq!(drain(&mut rx), vec![Event::Stop]);
    assert_eq!(session.state(), RecorderState::Idle);

    let stats = session.stats().await;
    assert_eq!(stats.chunks_delivered, 3);
    assert_eq!(stats.bytes_delivered, 6);
    assert_eq!(stats.empty_chunks_discarded, 2);
    assert!(stats.recording_id.is_some());

    Ok(())
}

#[tokio::test]
async fn test_without_timeslice_single_chunk_at_stop() -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let camera = ScriptedCamera::new("cam").with_chunks(vec![vec![1], vec![2], vec![3]]);
    let session = session(camera, CaptureConfig::default(), recording_callbacks(tx));

    session.start().await?;
    assert_eq!(next_event(&mut rx).await, Event::Start);

    session.stop().await;

    assert_eq!(drain(&mut rx), vec![Event::Data(0, vec![1, 2, 3]), Event::Stop]);

    Ok(())
}

#[tokio::test]
async fn test_start_twice_keeps_single_active_recorder() -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let camera = ScriptedCamera::new("cam").with_chunks(vec![vec![1], vec![2], vec![3]]);
    let session = session(camera, timesliced(10), recording_callbacks(tx));

    session.start().await?;
    session.start().await?;
    assert_eq!(session.state(), RecorderState::Recording);

    session.stop().await;

    let events = drain(&mut rx);
    let recordings: Vec<&[Event]> = events
        .split(|event| *event == Event::Start)
        .filter(|segment| !segment.is_empty())
        .collect();

    assert_eq!(events.first(), Some(&Event::Start));
    assert_eq!(recordings.len(), 2, "Expected two recordings, got {:?}", events);

    for recording in recordings {
        assert_eq!(recording.last(), Some(&Event::Stop));
        assert_eq!(
            recording.iter().filter(|event| **event == Event::Stop).count(),
            1,
            "Each recording stops exactly once"
        );

        let mut bytes = Vec::new();
        for (expected, event) in recording.iter().filter(|e| matches!(e, Event::Data(..))).enumerate() {
            if let Event::Data(sequence, data) = event {
                assert_eq!(*sequence, expected as u64, "Sequence restarts per recording");
                bytes.extend_from_slice(data);
            }
        }
        assert_eq!(bytes, vec![1, 2, 3], "No chunk dropped or duplicated");
    }

    Ok(())
}

#[tokio::test]
async fn test_stop_when_idle_is_noop() -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = session(ScriptedCamera::new("cam"), CaptureConfig::default(), recording_callbacks(tx));

    session.stop().await;
    session.stop().await;

    assert_eq!(session.state(), RecorderState::Idle);
    assert!(drain(&mut rx).is_empty());

    Ok(())
}

#[tokio::test]
async fn test_unsupported_mime_type_reports_error_and_stays_idle() -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let config = CaptureConfig {
        mime_type: "video/mp4".to_string(),
        ..CaptureConfig::default()
    };
    let session = session(ScriptedCamera::new("cam"), config, recording_callbacks(tx));

    let state = session.start().await?;

    assert_eq!(state, RecorderState::Idle);
    assert_eq!(session.state(), RecorderState::Idle);
    assert_eq!(drain(&mut rx), vec![Event::Error("UNSUPPORTED_MIME_TYPE".to_string())]);

    Ok(())
}

#[tokio::test]
async fn test_permission_denied_surfaces_through_error_handler() -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = session(
        ScriptedCamera::new("cam").permission_denied(),
        CaptureConfig::default(),
        recording_callbacks(tx),
    );

    assert_eq!(session.start().await?, RecorderState::Idle);
    assert_eq!(drain(&mut rx), vec![Event::Error("PERMISSION_DENIED".to_string())]);

    Ok(())
}

#[tokio::test]
async fn test_recorder_error_reaches_error_handler() -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let camera = ScriptedCamera::new("cam")
        .with_chunks(vec![vec![1], vec![2], vec![3]])
        .fail_after(1, "encoder crashed");
    let session = session(camera, timesliced(10), recording_callbacks(tx));

    session.start().await?;

    assert_eq!(next_event(&mut rx).await, Event::Start);
    assert_eq!(next_event(&mut rx).await, Event::Data(0, vec![1]));
    assert_eq!(next_event(&mut rx).await, Event::Error("RECORDER_ERROR".to_string()));
    assert_eq!(next_event(&mut rx).await, Event::Stop);

    wait_for_idle(&session).await?;

    // Already stopped by the recorder; stop stays a no-op
    session.stop().await;
    assert!(drain(&mut rx).is_empty());

    Ok(())
}

#[tokio::test]
async fn test_default_error_sink_keeps_session_usable() -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<u64>();
    let callbacks = RecorderCallbacks::new().on_data_available(move |payload: ChunkPayload| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(payload.sequence);
        }
    });
    let camera = ScriptedCamera::new("cam")
        .with_chunks(vec![vec![1], vec![2]])
        .fail_after(1, "encoder crashed");
    let session = session(camera, timesliced(10), callbacks);

    session.start().await?;
    wait_for_idle(&session).await?;

    assert_eq!(rx.recv().await, Some(0));
    assert_eq!(session.state(), RecorderState::Idle);

    Ok(())
}

#[tokio::test]
async fn test_page_unload_forces_stop() -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let registry = CaptureRegistry::new();
    let camera = ScriptedCamera::new("cam").with_chunks(vec![vec![1]; 100]);
    let handle = CaptureHandle::new("webcam", timesliced(1000), Arc::new(camera));

    let session = registry.mount(handle, recording_callbacks(tx)).await;
    assert_eq!(registry.start("webcam").await?, RecorderState::Recording);
    assert_eq!(next_event(&mut rx).await, Event::Start);

    registry.unload();
    wait_for_idle(&session).await?;

    // The stop handler is mirrored onto unload; nothing is flushed
    assert_eq!(drain(&mut rx), vec![Event::Stop]);

    // Recording cannot restart once the page is gone
    assert_eq!(session.start().await?, RecorderState::Idle);
    assert_eq!(drain(&mut rx), vec![Event::Error("RECORDER_ERROR".to_string())]);

    Ok(())
}

/// Camera whose recorder has already queued its chunks when `start` returns
struct BurstCamera {
    chunks: Vec<Vec<u8>>,
}

struct BurstRecorder {
    chunks: Vec<Vec<u8>>,
    tx: Option<mpsc::Sender<RecorderEvent>>,
}

#[async_trait::async_trait]
impl CaptureDevice for BurstCamera {
    fn open_recorder(&self, _config: &CaptureConfig) -> Result<Box<dyn MediaRecorder>, DeviceError> {
        Ok(Box::new(BurstRecorder {
            chunks: self.chunks.clone(),
            tx: None,
        }))
    }

    async fn grab_frame(&self, _config: &CaptureConfig) -> Result<Frame, DeviceError> {
        Err(DeviceError::StreamUnavailable)
    }

    fn name(&self) -> &str {
        "burst"
    }
}

#[async_trait::async_trait]
impl MediaRecorder for BurstRecorder {
    async fn start(
        &mut self,
        _timeslice: Option<Duration>,
    ) -> Result<mpsc::Receiver<RecorderEvent>, DeviceError> {
        let (tx, rx) = mpsc::channel(16);
        let _ = tx.try_send(RecorderEvent::Start);
        for data in self.chunks.drain(..) {
            let _ = tx.try_send(RecorderEvent::DataAvailable(MediaChunk::new(data, "video/webm")));
        }
        self.tx = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), DeviceError> {
        // Anything produced from here on is lost to the unload
        self.tx = None;
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.tx.is_some()
    }
}

#[tokio::test]
async fn test_page_unload_delivers_already_queued_chunks() -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let registry = CaptureRegistry::new();
    let camera = BurstCamera {
        chunks: vec![vec![1], Vec::new(), vec![2, 3]],
    };
    let handle = CaptureHandle::new("webcam", timesliced(1000), Arc::new(camera));

    let session = registry.mount(handle, recording_callbacks(tx)).await;
    assert_eq!(session.start().await?, RecorderState::Recording);

    // Unload lands before the recorder task has looked at its queue
    registry.unload();
    wait_for_idle(&session).await?;

    assert_eq!(
        drain(&mut rx),
        vec![
            Event::Start,
            Event::Data(0, vec![1]),
            Event::Data(1, vec![2, 3]),
            Event::Stop,
        ]
    );

    let stats = session.stats().await;
    assert_eq!(stats.chunks_delivered, 2);
    assert_eq!(stats.empty_chunks_discarded, 1);

    Ok(())
}

#[tokio::test]
async fn test_registry_rejects_unknown_handles() {
    let registry = CaptureRegistry::new();

    assert_eq!(
        registry.start("missing").await,
        Err(UsageError::UnknownHandle("missing".to_string()))
    );
    assert!(registry.unmount("missing").await.is_err());
}

#[tokio::test]
async fn test_registry_unmount_stops_recording() -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let registry = CaptureRegistry::new();
    let camera = ScriptedCamera::new("cam").with_chunks(vec![vec![7, 7]]);
    let handle = CaptureHandle::new("webcam", CaptureConfig::default(), Arc::new(camera));

    registry.mount(handle, recording_callbacks(tx)).await;
    registry.start("webcam").await?;
    assert_eq!(next_event(&mut rx).await, Event::Start);

    registry.unmount("webcam").await?;

    assert_eq!(drain(&mut rx), vec![Event::Data(0, vec![7, 7]), Event::Stop]);
    assert!(registry.keys().await.is_empty());

    Ok(())
}
