//! Transport encoding for media crossing the UI/application boundary
//!
//! Chunks and frames travel as self-describing base64 `data:` URIs. The
//! receiving side normalizes away the codec parameter before decoding.

pub mod codec;
pub mod encoder;

pub use codec::{decode_data_uri, encode_data_uri, normalize, DecodedPayload};
pub use encoder::{ChunkEncoder, ChunkPayload};
