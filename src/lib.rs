pub mod artifact;
pub mod bridge;
pub mod capture;
pub mod config;
pub mod error;
pub mod http;
pub mod recorder;
pub mod screenshot;
pub mod transport;

pub use artifact::{ArtifactStatus, ChunkOutcome, Reassembler, ReassemblerConfig};
pub use bridge::bind_reassembler;
pub use capture::{
    CaptureConfig, CaptureDevice, CaptureHandle, Frame, MediaChunk, MediaRecorder, RecorderEvent,
    ScriptedCamera,
};
pub use config::Config;
pub use error::{
    BridgeError, BridgeResult, DeviceError, ErrorInfo, PersistenceError, TransportError, UsageError,
};
pub use http::{create_router, AppState};
pub use recorder::{
    CaptureRegistry, ListenerChain, ListenerKind, PageLifecycle, RecorderCallbacks, RecorderSession,
    RecorderState, RecorderStats,
};
pub use screenshot::{capture_screenshot, screenshot, Screenshot, ScreenshotPayload, ScreenshotResult, ScreenshotStore};
pub use transport::{decode_data_uri, encode_data_uri, normalize, ChunkEncoder, ChunkPayload};
