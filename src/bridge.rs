// Wires a recorder session straight into a reassembler
//
// The returned callbacks truncate the artifact on start, append every
// delivered chunk, and finalize on stop. Reassembler failures cannot be
// returned through a callback, so they are forwarded on a channel to
// whoever orchestrates the recording; that layer decides whether to retry
// or stop the session.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::artifact::{ChunkOutcome, Reassembler};
use crate::error::BridgeError;
use crate::recorder::RecorderCallbacks;
use crate::transport::ChunkPayload;

pub fn bind_reassembler(
    reassembler: Arc<Reassembler>,
    key: impl Into<String>,
) -> (RecorderCallbacks, mpsc::UnboundedReceiver<BridgeError>) {
    let key: Arc<str> = Arc::from(key.into());
    let (failures_tx, failures_rx) = mpsc::unbounded_channel::<BridgeError>();

    let on_start = {
        let reassembler = Arc::clone(&reassembler);
        let key = Arc::clone(&key);
        let failures = failures_tx.clone();
        move || {
            let reassembler = Arc::clone(&reassembler);
            let key = Arc::clone(&key);
            let failures = failures.clone();
            async move {
                match reassembler.on_start(&key).await {
                    Ok(status) => info!("{}: recording into {}", key, status.file_name),
                    Err(e) => {
                        error!("{}: failed to start artifact: {}", key, e);
                        let _ = failures.send(e.into());
                    }
                }
            }
        }
    };

    let on_data = {
        let reassembler = Arc::clone(&reassembler);
        let key = Arc::clone(&key);
        let failures = failures_tx.clone();
        move |payload: ChunkPayload| {
            let reassembler = Arc::clone(&reassembler);
            let key = Arc::clone(&key);
            let failures = failures.clone();
            async move {
                match reassembler.on_chunk(&key, &payload).await {
                    Ok(ChunkOutcome::Appended { .. }) | Ok(ChunkOutcome::Dropped { .. }) => {}
                    Err(e) => {
                        error!("{}: failed to append chunk {}: {}", key, payload.sequence, e);
                        let _ = failures.send(e);
                    }
                }
            }
        }
    };

    let on_stop = {
        let reassembler = Arc::clone(&reassembler);
        let key = Arc::clone(&key);
        let failures = failures_tx;
        move || {
            let reassembler = Arc::clone(&reassembler);
            let key = Arc::clone(&key);
            let failures = failures.clone();
            async move {
                match reassembler.on_stop(&key).await {
                    Ok(status) => info!("{}: artifact ready at {}", key, status.url),
                    Err(e) => {
                        error!("{}: failed to finalize artifact: {}", key, e);
                        let _ = failures.send(e.into());
                    }
                }
            }
        }
    };

    let callbacks = RecorderCallbacks::new()
        .on_data_available(on_data)
        .on_start(on_start)
        .on_stop(on_stop);

    (callbacks, failures_rx)
}
