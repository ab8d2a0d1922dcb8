//! Command implementations.
//!
//! - [`build`] - generate the cache of a WordPress site
//! - [`compile`] - compile a local volume
//! - [`volume`] - convert between directories and volume files
//!
//! Each module exposes an `execute` function taking the parsed arguments.

pub mod build;
pub mod compile;
pub(crate) mod utils;
pub mod volume;

pub use build::execute as build_execute;
pub use compile::execute as compile_execute;
pub use volume::execute as volume_execute;
