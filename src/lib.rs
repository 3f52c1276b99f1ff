//! Workspace placeholder crate.
//!
//! This crate exposes feature flags that map to the individual workspace
//! crates (`core-library`, `core-scrobble`). Host applications can depend on
//! `music-catalog-workspace` and enable the documented features without
//! wiring each crate individually.

#[cfg(feature = "library")]
pub use core_library as library;

#[cfg(feature = "scrobble-import")]
pub use core_scrobble as scrobble;
