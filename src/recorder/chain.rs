// Listener chain for a recorder
//
// Built once from `RecorderCallbacks`. Registration order is fixed:
//   1. data-available (always)
//   2. start (if supplied)
//   3. stop (if supplied) and an unload listener bound to the same handler
//   4. error (always; logs through tracing when no handler was supplied)
//
// Events are dispatched to listeners in that order. Chunks are encoded
// before delivery and zero-length chunks are dropped.

use futures::FutureExt;
use std::sync::Arc;
use tracing::{debug, error};

use super::callbacks::{DataHandler, ErrorHandler, EventHandler, RecorderCallbacks};
use crate::capture::MediaChunk;
use crate::error::{ErrorInfo, UsageError};
use crate::transport::ChunkEncoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    DataAvailable,
    Start,
    Stop,
    Unload,
    Error,
}

#[derive(Clone)]
enum Listener {
    DataAvailable(DataHandler),
    Start(EventHandler),
    Stop(EventHandler),
    Unload(EventHandler),
    Error(ErrorHandler),
}

impl Listener {
    fn kind(&self) -> ListenerKind {
        match self {
            Listener::DataAvailable(_) => ListenerKind::DataAvailable,
            Listener::Start(_) => ListenerKind::Start,
            Listener::Stop(_) => ListenerKind::Stop,
            Listener::Unload(_) => ListenerKind::Unload,
            Listener::Error(_) => ListenerKind::Error,
        }
    }
}

/// What happened to a chunk handed to the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkDelivery {
    Delivered { sequence: u64, bytes: usize },
    Discarded,
}

pub struct ListenerChain {
    listeners: Vec<Listener>,
}

impl ListenerChain {
    /// Build the registration sequence; fails without a data-available handler
    pub fn build(callbacks: &RecorderCallbacks) -> Result<Self, UsageError> {
        let on_data = callbacks
            .on_data_available
            .clone()
            .ok_or(UsageError::MissingDataHandler)?;

        let mut listeners = vec![Listener::DataAvailable(on_data)];

        if let Some(on_start) = &callbacks.on_start {
            listeners.push(Listener::Start(on_start.clone()));
        }

        if let Some(on_stop) = &callbacks.on_stop {
            listeners.push(Listener::Stop(on_stop.clone()));
            listeners.push(Listener::Unload(on_stop.clone()));
        }

        let on_error = callbacks.on_error.clone().unwrap_or_else(log_error_sink);
        listeners.push(Listener::Error(on_error));

        Ok(Self { listeners })
    }

    /// Registration order, for inspection
    pub fn kinds(&self) -> Vec<ListenerKind> {
        self.listeners.iter().map(Listener::kind).collect()
    }

    pub async fn dispatch_start(&self) {
        for listener in &self.listeners {
            if let Listener::Start(handler) = listener {
                handler().await;
            }
        }
    }

    pub async fn dispatch_stop(&self) {
        for listener in &self.listeners {
            if let Listener::Stop(handler) = listener {
                handler().await;
            }
        }
    }

    pub async fn dispatch_unload(&self) {
        for listener in &self.listeners {
            if let Listener::Unload(handler) = listener {
                handler().await;
            }
        }
    }

    pub async fn dispatch_error(&self, info: ErrorInfo) {
        for listener in &self.listeners {
            if let Listener::Error(handler) = listener {
                handler(info.clone()).await;
            }
        }
    }

    /// Encode and deliver a chunk; empty chunks never reach the handler
    pub async fn dispatch_chunk(&self, chunk: &MediaChunk, encoder: &mut ChunkEncoder) -> ChunkDelivery {
        if chunk.is_empty() {
            debug!("Discarding zero-length chunk");
            return ChunkDelivery::Discarded;
        }

        let payload = encoder.encode(chunk);
        let sequence = payload.sequence;

        for listener in &self.listeners {
            if let Listener::DataAvailable(handler) = listener {
                handler(payload.clone()).await;
            }
        }

        ChunkDelivery::Delivered {
            sequence,
            bytes: chunk.len(),
        }
    }
}

impl std::fmt::Debug for ListenerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerChain")
            .field("listeners", &self.kinds())
            .finish()
    }
}

fn log_error_sink() -> ErrorHandler {
    Arc::new(|info: ErrorInfo| {
        async move {
            error!(kind = %info.kind, "Recorder error: {}", info.message);
        }
        .boxed()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn data_only() -> RecorderCallbacks {
        RecorderCallbacks::new().on_data_available(|_| async {})
    }

    #[test]
    fn test_build_requires_data_handler() {
        let result = ListenerChain::build(&RecorderCallbacks::new().on_start(|| async {}));
        assert_eq!(result.unwrap_err(), UsageError::MissingDataHandler);
    }

    #[test]
    fn test_minimal_chain_has_data_and_default_error() {
        let chain = ListenerChain::build(&data_only()).unwrap();
        assert_eq!(chain.kinds(), vec![ListenerKind::DataAvailable, ListenerKind::Error]);
    }

    #[test]
    fn test_full_chain_order() {
        let callbacks = data_only()
            .on_error(|_| async {})
            .on_stop(|| async {})
            .on_start(|| async {});
        let chain = ListenerChain::build(&callbacks).unwrap();

        assert_eq!(
            chain.kinds(),
            vec![
                ListenerKind::DataAvailable,
                ListenerKind::Start,
                ListenerKind::Stop,
                ListenerKind::Unload,
                ListenerKind::Error,
            ]
        );
    }

    #[tokio::test]
    async fn test_dispatch_chunk_skips_empty_chunks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callbacks = RecorderCallbacks::new().on_data_available(move |payload| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(payload.sequence);
            }
        });
        let chain = ListenerChain::build(&callbacks).unwrap();
        let mut encoder = ChunkEncoder::new();

        let empty = chain
            .dispatch_chunk(&MediaChunk::new(Vec::new(), "video/webm"), &mut encoder)
            .await;
        let full = chain
            .dispatch_chunk(&MediaChunk::new(vec![1, 2, 3], "video/webm"), &mut encoder)
            .await;

        assert_eq!(empty, ChunkDelivery::Discarded);
        assert_eq!(full, ChunkDelivery::Delivered { sequence: 0, bytes: 3 });
        assert_eq!(*seen.lock().unwrap(), vec![0]);
    }
}
