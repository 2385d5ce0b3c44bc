use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::TransportError;
use crate::transport::{decode_data_uri, normalize};

/// The latest screenshot received for a UI slot
#[derive(Debug, Clone, Serialize)]
pub struct Screenshot {
    pub mime_type: String,
    #[serde(skip)]
    pub data: Vec<u8>,
    pub captured_at: DateTime<Utc>,
    /// Local wall-clock label, `HH:MM:SS`
    pub timestamp: String,
}

/// Keeps one screenshot per slot; a new one replaces the old, no history
#[derive(Debug, Clone, Default)]
pub struct ScreenshotStore {
    slots: Arc<RwLock<HashMap<String, Screenshot>>>,
}

impl ScreenshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a transport-encoded screenshot for `slot`.
    ///
    /// An empty payload is the failure shape of a capture and is ignored.
    pub async fn accept(&self, slot: &str, data_uri: &str) -> Result<Option<Screenshot>, TransportError> {
        if data_uri.trim().is_empty() {
            debug!("{}: ignoring empty screenshot payload", slot);
            return Ok(None);
        }

        let decoded = decode_data_uri(&normalize(data_uri))?;
        let captured_at = Utc::now();

        let screenshot = Screenshot {
            mime_type: decoded.mime_type,
            data: decoded.data,
            captured_at,
            timestamp: captured_at.with_timezone(&Local).format("%H:%M:%S").to_string(),
        };

        info!(
            "{}: stored screenshot ({} bytes, {})",
            slot,
            screenshot.data.len(),
            screenshot.mime_type
        );

        let mut slots = self.slots.write().await;
        slots.insert(slot.to_string(), screenshot.clone());

        Ok(Some(screenshot))
    }

    pub async fn latest(&self, slot: &str) -> Option<Screenshot> {
        let slots = self.slots.read().await;
        slots.get(slot).cloned()
    }
}
