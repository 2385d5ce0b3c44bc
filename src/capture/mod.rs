pub mod device;
pub mod scripted;

pub use device::{
    CaptureConfig, CaptureDevice, CaptureHandle, Frame, MediaChunk, MediaRecorder, RecorderEvent,
};
pub use scripted::ScriptedCamera;
