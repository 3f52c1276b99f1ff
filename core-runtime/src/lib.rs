//! Process-level plumbing shared by the catalog crates: the `tracing`
//! subscriber setup in [`logging`] and the importer settings in [`config`].

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
