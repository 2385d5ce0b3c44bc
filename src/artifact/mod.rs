//! Server-side video artifacts
//!
//! Artifacts are truncated when a recording starts, appended to chunk by
//! chunk, and only reported as existing once the recording has stopped.

mod reassembler;

pub use reassembler::{ArtifactStatus, ChunkOutcome, Reassembler, ReassemblerConfig};
