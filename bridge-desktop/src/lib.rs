//! Desktop implementations of the host bridge traits.
//!
//! ```ignore
//! let http: Arc<dyn HttpClient> = Arc::new(bridge_desktop::ReqwestHttpClient::new()?);
//! ```

mod http;

pub use http::ReqwestHttpClient;
