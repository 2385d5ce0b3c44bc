//! One-shot still capture
//!
//! `capture_screenshot` runs on the capture side and yields a
//! transport-encoded frame or an error. `ScreenshotStore` runs on the
//! application side and keeps the latest decoded frame per slot.

mod capture;
mod store;

pub use capture::{capture_screenshot, screenshot, ScreenshotPayload, ScreenshotResult};
pub use store::{Screenshot, ScreenshotStore};
