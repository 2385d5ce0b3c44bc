//! HTTP boundary between the capture UI and application logic
//!
//! - POST /recordings/:key/start - Truncate the artifact, bump its generation
//! - POST /recordings/:key/chunks - Append a transport-encoded chunk
//! - POST /recordings/:key/stop - Finalize the artifact
//! - GET /recordings/:key - Artifact URL, generation, existence
//! - POST /screenshots/:slot - Replace the slot's screenshot
//! - GET /screenshots/:slot - Latest screenshot bytes
//! - GET /health - Health check
//!
//! Finished artifacts are served from the upload directory under the
//! configured public prefix.

mod handlers;
mod routes;
mod state;

pub use handlers::{ChunkResponse, ErrorResponse};
pub use routes::create_router;
pub use state::AppState;
