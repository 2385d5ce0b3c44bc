use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{info, warn};

use crate::capture::CaptureHandle;
use crate::error::ErrorInfo;
use crate::transport::encode_data_uri;

/// A transport-encoded still frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotPayload {
    pub data_uri: String,
    pub captured_at: DateTime<Utc>,
    /// The frame is horizontally flipped, as shown in the preview
    pub mirrored: bool,
}

/// Success and failure share the single delivery channel
pub type ScreenshotResult = Result<ScreenshotPayload, ErrorInfo>;

/// Grab the current frame of `handle` and transport-encode it
pub async fn capture_screenshot(handle: &CaptureHandle) -> ScreenshotResult {
    let config = handle.config();

    match handle.device().grab_frame(config).await {
        Ok(frame) if frame.data.is_empty() => {
            warn!("{}: screenshot produced an empty frame", handle.key());
            Err(ErrorInfo::new("FRAME_ERROR", "captured frame is empty"))
        }
        Ok(frame) => {
            info!(
                "{}: captured screenshot ({} bytes, {})",
                handle.key(),
                frame.data.len(),
                frame.mime_type
            );
            Ok(ScreenshotPayload {
                data_uri: encode_data_uri(&frame.mime_type, &frame.data),
                captured_at: Utc::now(),
                mirrored: frame.mirrored,
            })
        }
        Err(e) => {
            warn!("{}: screenshot failed: {}", handle.key(), e);
            Err((&e).into())
        }
    }
}

/// Capture a screenshot and hand the result to exactly one handler
pub async fn screenshot<F, Fut>(handle: &CaptureHandle, on_capture: F)
where
    F: FnOnce(ScreenshotResult) -> Fut,
    Fut: Future<Output = ()>,
{
    on_capture(capture_screenshot(handle).await).await;
}
