use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;

use crate::error::ErrorInfo;
use crate::transport::ChunkPayload;

pub type DataHandler = Arc<dyn Fn(ChunkPayload) -> BoxFuture<'static, ()> + Send + Sync>;
pub type EventHandler = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;
pub type ErrorHandler = Arc<dyn Fn(ErrorInfo) -> BoxFuture<'static, ()> + Send + Sync>;

/// Lifecycle handlers supplied by application logic
///
/// Every handler is optional here; `on_data_available` is required by
/// `RecorderSession::start`. A missing `on_error` falls back to a logging
/// sink when the listener chain is built.
#[derive(Clone, Default)]
pub struct RecorderCallbacks {
    pub on_data_available: Option<DataHandler>,
    pub on_start: Option<EventHandler>,
    pub on_stop: Option<EventHandler>,
    pub on_error: Option<ErrorHandler>,
}

impl RecorderCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_data_available<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(ChunkPayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_data_available = Some(Arc::new(move |payload| handler(payload).boxed()));
        self
    }

    pub fn on_start<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_start = Some(Arc::new(move || handler().boxed()));
        self
    }

    pub fn on_stop<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_stop = Some(Arc::new(move || handler().boxed()));
        self
    }

    pub fn on_error<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(ErrorInfo) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_error = Some(Arc::new(move |error| handler(error).boxed()));
        self
    }
}

impl std::fmt::Debug for RecorderCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecorderCallbacks")
            .field("on_data_available", &self.on_data_available.is_some())
            .field("on_start", &self.on_start.is_some())
            .field("on_stop", &self.on_stop.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
