//! # Host Bridge Traits
//!
//! Capabilities the catalog core needs from its host but does not implement.
//! Today that is outbound HTTP for the scrobble importer; `bridge-desktop`
//! supplies it with `reqwest`, and tests supply scripted or mocked clients.
//!
//! Implementations report failures as [`BridgeError`], keeping the
//! underlying message.

pub mod error;
pub mod http;

pub use error::BridgeError;
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
