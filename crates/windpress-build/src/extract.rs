//! Scanned content to plain text.
//!
//! Items arrive base64-encoded. JSON dumps (block trees, builder templates)
//! are re-serialized as YAML so that class strings stand alone on their
//! lines instead of being wrapped in JSON quoting and escapes. Finally
//! HTML entities are decoded (`&quot;`, `&amp;`, ...).

use base64::Engine as _;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use tracing::debug;

use crate::error::BuildError;
use crate::models::{ContentKind, ScanContent};

const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &base64::alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode a base64 text payload.
pub fn decode_base64(content: &str) -> Result<String, BuildError> {
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = LENIENT
        .decode(compact)
        .map_err(|e| BuildError::Content(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| BuildError::Content(e.to_string()))
}

/// Encode text as standard base64.
pub fn encode_base64(text: &str) -> String {
    STANDARD.encode(text)
}

/// Plain text of one scanned item.
pub fn content_text(item: &ScanContent) -> Result<String, BuildError> {
    let text = decode_base64(&item.content)?;
    let text = match item.kind {
        ContentKind::Text => text,
        ContentKind::Json => json_to_yaml(&text),
    };
    Ok(html_escape::decode_html_entities(&text).into_owned())
}

/// Reserialize JSON as YAML. Text that is not valid JSON is kept as-is.
fn json_to_yaml(text: &str) -> String {
    let value = match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value) => value,
        Err(e) => {
            debug!("json content is not valid JSON ({e}), scanning raw text");
            return text.to_string();
        }
    };
    match serde_saphyr::to_string(&value) {
        Ok(yaml) => yaml,
        Err(e) => {
            debug!("YAML reserialization failed ({e}), scanning raw text");
            text.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(text: &str, kind: ContentKind) -> ScanContent {
        ScanContent {
            content: encode_base64(text),
            kind,
        }
    }

    #[test]
    fn test_text_content_is_unescaped() {
        let text = content_text(&item("<div class=&quot;p-4&quot;>&amp;</div>", ContentKind::Text)).unwrap();
        assert_eq!(text, "<div class=\"p-4\">&</div>");
    }

    #[test]
    fn test_json_content_becomes_yaml() {
        let json = r#"{"blockName":"core/group","attrs":{"className":"flex gap-4"}}"#;
        let text = content_text(&item(json, ContentKind::Json)).unwrap();
        assert!(!text.contains('{'), "still JSON: {text}");
        assert!(text.contains("flex gap-4"));
        assert!(text.contains("className"));
    }

    #[test]
    fn test_invalid_json_kept_raw() {
        let text = content_text(&item("not json p-4", ContentKind::Json)).unwrap();
        assert_eq!(text, "not json p-4");
    }

    #[test]
    fn test_bad_base64() {
        let bad = ScanContent {
            content: "***".into(),
            kind: ContentKind::Text,
        };
        assert!(matches!(content_text(&bad), Err(BuildError::Content(_))));
    }
}
