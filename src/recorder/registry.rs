use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use super::callbacks::RecorderCallbacks;
use super::lifecycle::PageLifecycle;
use super::session::RecorderSession;
use super::stats::RecorderState;
use crate::capture::CaptureHandle;
use crate::error::UsageError;
use crate::screenshot::{capture_screenshot, ScreenshotResult};

/// Capture handles mounted on a page, each owning its recorder session
#[derive(Clone, Default)]
pub struct CaptureRegistry {
    /// Mounted sessions (handle key → session)
    sessions: Arc<RwLock<HashMap<String, Arc<RecorderSession>>>>,

    lifecycle: PageLifecycle,
}

impl CaptureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lifecycle(&self) -> &PageLifecycle {
        &self.lifecycle
    }

    /// Mount a capture handle, replacing (and stopping) any handle with the same key
    pub async fn mount(&self, handle: CaptureHandle, callbacks: RecorderCallbacks) -> Arc<RecorderSession> {
        let key = handle.key().to_string();
        let session = Arc::new(RecorderSession::new(handle, callbacks, self.lifecycle.clone()));

        let previous = {
            let mut sessions = self.sessions.write().await;
            sessions.insert(key.clone(), Arc::clone(&session))
        };

        if let Some(previous) = previous {
            info!("{}: remounted, stopping previous session", key);
            previous.stop().await;
        }

        info!("{}: capture handle mounted", key);
        session
    }

    /// Unmount a capture handle, stopping its recording first
    pub async fn unmount(&self, key: &str) -> Result<(), UsageError> {
        let session = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(key)
        };

        let session = session.ok_or_else(|| UsageError::UnknownHandle(key.to_string()))?;
        session.stop().await;

        info!("{}: capture handle unmounted", key);
        Ok(())
    }

    pub async fn session(&self, key: &str) -> Result<Arc<RecorderSession>, UsageError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(key)
            .cloned()
            .ok_or_else(|| UsageError::UnknownHandle(key.to_string()))
    }

    pub async fn start(&self, key: &str) -> Result<RecorderState, UsageError> {
        self.session(key).await?.start().await
    }

    pub async fn stop(&self, key: &str) -> Result<(), UsageError> {
        self.session(key).await?.stop().await;
        Ok(())
    }

    /// Take a screenshot from a mounted handle
    pub async fn screenshot(&self, key: &str) -> Result<ScreenshotResult, UsageError> {
        let session = self.session(key).await?;
        Ok(capture_screenshot(session.handle()).await)
    }

    /// Signal page unload to every mounted session
    pub fn unload(&self) {
        self.lifecycle.unload();
    }

    pub async fn keys(&self) -> Vec<String> {
        let sessions = self.sessions.read().await;
        sessions.keys().cloned().collect()
    }
}
