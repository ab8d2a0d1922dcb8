//! `.windpress` backup files ("SFS" exports).
//!
//! A backup is the JSON array of volume [`Entry`] records, zlib-compressed
//! and base64-encoded. The same packing ([`pack`] / [`unpack`]) is used for
//! any JSON value that has to be stored as a compact string, such as
//! per-provider scan caches.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::{Read, Write};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::codec::LENIENT;
use crate::entry::Entry;
use crate::error::{VolumeError, VolumeResult};

/// Upper bound on decompressed backup size (64 MB).
const MAX_BACKUP_SIZE: u64 = 64 * 1024 * 1024;

/// File extension used for exported backups.
pub const EXTENSION: &str = "windpress";

/// Serialize entries into a backup string.
pub fn export_sfs(entries: &[Entry]) -> VolumeResult<String> {
    pack(entries)
}

/// Parse a backup string back into entries.
pub fn import_sfs(data: &str) -> VolumeResult<Vec<Entry>> {
    unpack(data)
}

/// JSON, zlib, then base64.
pub fn pack<T: Serialize + ?Sized>(value: &T) -> VolumeResult<String> {
    let json = serde_json::to_vec(value)?;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json).map_err(VolumeError::Compression)?;
    let compressed = encoder.finish().map_err(VolumeError::Compression)?;

    Ok(STANDARD.encode(compressed))
}

/// Inverse of [`pack`]. Whitespace and missing padding are tolerated.
pub fn unpack<T: DeserializeOwned>(data: &str) -> VolumeResult<T> {
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let compressed = LENIENT.decode(compact)?;

    let mut json = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .take(MAX_BACKUP_SIZE + 1)
        .read_to_end(&mut json)
        .map_err(VolumeError::Compression)?;
    if json.len() as u64 > MAX_BACKUP_SIZE {
        return Err(VolumeError::TooLarge {
            max_bytes: MAX_BACKUP_SIZE,
        });
    }

    Ok(serde_json::from_slice(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EntryHandler, Volume};

    #[test]
    fn test_export_import_preserves_entry_metadata() {
        let mut entry = Entry::new("main.css", "@import \"tailwindcss\";");
        entry.handler = EntryHandler::ReadOnly;
        entry.signature = Some("sig".into());
        let entries = vec![entry, Entry::new("js/plugin.js", "export default {}")];

        let backup = export_sfs(&entries).unwrap();
        let restored = import_sfs(&backup).unwrap();
        assert_eq!(restored, entries);

        let volume = Volume::from_entries(&restored);
        assert!(volume.contains("/js/plugin.js"));
    }

    #[test]
    fn test_import_rejects_uncompressed_payload() {
        let plain = STANDARD.encode("[]");
        assert!(matches!(import_sfs(&plain), Err(VolumeError::Compression(_))));
    }
}
