//! Virtual file volume for the WindPress build pipeline.
//!
//! A [`Volume`] is the in-memory stand-in for a filesystem: a flat mapping of
//! absolute POSIX paths (`/main.css`, `/tailwind.config.js`, ...) to text
//! content. The backend hands volumes around as [`Entry`] lists; compilation
//! calls receive them as an encoded *container* string (see [`codec`]).
//!
//! Volumes are passed by value. Anything that needs to enrich a volume (for
//! example by adding built-in stylesheets) works on its own clone, so the
//! caller's snapshot never changes under it.
//!
//! # Example
//!
//! ```
//! use windpress_volume::{Volume, codec};
//!
//! let mut volume = Volume::new();
//! volume.insert("main.css", "@import \"tailwindcss\";");
//!
//! let container = codec::encode(&volume);
//! let decoded = codec::decode(&container).unwrap();
//! assert_eq!(decoded.get("/main.css"), Some("@import \"tailwindcss\";"));
//! ```

pub mod codec;
mod entry;
mod error;
pub mod path;
pub mod sfs;
mod volume;

pub use entry::{Entry, EntryHandler};
pub use error::{VolumeError, VolumeResult};
pub use volume::Volume;
