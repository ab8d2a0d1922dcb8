//! Container codec: base64 over UTF-8 JSON of a flat `{path: content}` map.
//!
//! Decoding is tolerant of the legacy encoding older dashboards produced,
//! where the JSON text was base64-encoded one byte per character (Latin-1)
//! instead of as UTF-8. The canonical decode runs first; only when it fails
//! is the legacy decode attempted, and if that fails too the canonical error
//! is returned.

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::{VolumeError, VolumeResult};
use crate::volume::Volume;

/// Standard alphabet, padding optional on decode.
pub(crate) const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode a volume as a container string.
pub fn encode(volume: &Volume) -> String {
    let map: Map<String, Value> = volume
        .iter()
        .map(|(path, content)| (path.to_string(), Value::String(content.to_string())))
        .collect();
    base64::engine::general_purpose::STANDARD.encode(Value::Object(map).to_string())
}

/// Decode a container string into a volume.
///
/// Empty input and JSON `null` decode to an empty volume. Non-string values
/// are skipped.
pub fn decode(container: &str) -> VolumeResult<Volume> {
    let compact: String = container.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Ok(Volume::new());
    }

    match decode_canonical(&compact) {
        Ok(volume) => Ok(volume),
        Err(err) => {
            debug!("canonical volume decode failed ({err}), retrying legacy encoding");
            decode_legacy(&compact).map_err(|_| err)
        }
    }
}

fn decode_canonical(compact: &str) -> VolumeResult<Volume> {
    let bytes = LENIENT.decode(compact)?;
    let text = String::from_utf8(bytes)?;
    parse_json(&text)
}

fn decode_legacy(compact: &str) -> VolumeResult<Volume> {
    let bytes = LENIENT.decode(compact)?;
    let text: String = bytes.into_iter().map(char::from).collect();
    parse_json(&text)
}

fn parse_json(text: &str) -> VolumeResult<Volume> {
    let value: Value = serde_json::from_str(text)?;
    let object = match value {
        Value::Null => return Ok(Volume::new()),
        Value::Object(object) => object,
        Value::Array(_) => return Err(VolumeError::NotAnObject { found: "array" }),
        Value::String(_) => return Err(VolumeError::NotAnObject { found: "string" }),
        Value::Number(_) => return Err(VolumeError::NotAnObject { found: "number" }),
        Value::Bool(_) => return Err(VolumeError::NotAnObject { found: "boolean" }),
    };

    let mut volume = Volume::new();
    for (path, value) in object {
        match value {
            Value::String(content) => {
                volume.insert(&path, content);
            }
            other => trace!("skipping non-string volume value at {path}: {other}"),
        }
    }
    Ok(volume)
}
