use crate::artifact::{Reassembler, ReassemblerConfig};
use crate::screenshot::ScreenshotStore;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Artifact reassembler (artifact key → video file)
    pub reassembler: Arc<Reassembler>,

    /// Latest screenshot per slot
    pub screenshots: ScreenshotStore,
}

impl AppState {
    pub fn new(config: ReassemblerConfig) -> Self {
        Self {
            reassembler: Arc::new(Reassembler::new(config)),
            screenshots: ScreenshotStore::new(),
        }
    }
}
