use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Page-level lifecycle shared by every session on a page
///
/// `unload` is a hard cancellation: active recorders are stopped without
/// waiting for further chunks.
#[derive(Debug, Clone)]
pub struct PageLifecycle {
    unload_tx: Arc<watch::Sender<bool>>,
}

impl PageLifecycle {
    pub fn new() -> Self {
        let (unload_tx, _) = watch::channel(false);
        Self {
            unload_tx: Arc::new(unload_tx),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.unload_tx.subscribe()
    }

    pub fn unload(&self) {
        info!("Page unloading");
        self.unload_tx.send_replace(true);
    }

    pub fn is_unloaded(&self) -> bool {
        *self.unload_tx.borrow()
    }
}

impl Default for PageLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
