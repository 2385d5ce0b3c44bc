//! Recorder sessions
//!
//! This module binds a capture handle to a recorder and drives it:
//! - Lifecycle callbacks (data, start, stop, error) supplied by the application
//! - A listener chain built once per session, with a fixed registration order
//! - The Idle → Starting → Recording → Stopping → Idle state machine
//! - At most one active recorder per capture handle
//! - A registry owning one session per mounted handle

mod callbacks;
mod chain;
mod lifecycle;
mod registry;
mod session;
mod stats;

pub use callbacks::{DataHandler, ErrorHandler, EventHandler, RecorderCallbacks};
pub use chain::{ChunkDelivery, ListenerChain, ListenerKind};
pub use lifecycle::PageLifecycle;
pub use registry::CaptureRegistry;
pub use session::RecorderSession;
pub use stats::{RecorderState, RecorderStats};
