use base64::Engine;

use crate::error::TransportError;

const PARAMETER_DELIMITER: char = ';';
const CODECS_PARAMETER: &str = "codecs=";

/// Strip the codec parameter from a transport payload.
///
/// Only the first segment containing `codecs=` is removed. A `codecs` list
/// such as `vp8,opus` contains a comma, which data URI decoders take as the
/// start of the data section.
pub fn normalize(payload: &str) -> String {
    let mut parts: Vec<&str> = payload.split(PARAMETER_DELIMITER).collect();

    if let Some(index) = parts.iter().position(|part| part.contains(CODECS_PARAMETER)) {
        parts.remove(index);
    }

    parts.join(";")
}

/// A data URI split into its media type and decoded body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Decode a `data:` URI into bytes.
///
/// Expects a normalized payload; a leftover codec list would split the
/// header at the wrong comma.
pub fn decode_data_uri(payload: &str) -> Result<DecodedPayload, TransportError> {
    let rest = payload
        .trim()
        .strip_prefix("data:")
        .ok_or(TransportError::NotDataUri)?;

    let (header, body) = rest.split_once(',').ok_or(TransportError::MissingData)?;

    let mut params: Vec<&str> = header.split(PARAMETER_DELIMITER).collect();
    let is_base64 = params
        .last()
        .is_some_and(|last| last.trim().eq_ignore_ascii_case("base64"));
    if is_base64 {
        params.pop();
    }

    let mime_type = match params.join(";").trim() {
        "" => "text/plain".to_string(),
        mime => mime.to_string(),
    };

    let data = if is_base64 {
        base64::engine::general_purpose::STANDARD.decode(body.trim())?
    } else {
        body.as_bytes().to_vec()
    };

    Ok(DecodedPayload { mime_type, data })
}

/// Encode bytes as a base64 `data:` URI carrying its MIME type
pub fn encode_data_uri(mime_type: &str, data: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        base64::engine::general_purpose::STANDARD.encode(data)
    )
}
