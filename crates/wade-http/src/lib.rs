#![forbid(unsafe_code)]

//! Record/replay request cache for Wade.
//!
//! On the server, a [`RecordingBackend`] captures every exchange made while
//! rendering a page; the capture is embedded in the page with
//! [`render_snapshot_block`]. In the browser, [`RequestCache::from_page`]
//! reads it back and a [`CachedBackend`] answers the same requests, in the
//! same order, without touching the network, so the page hydrates into the
//! state it was rendered in. Anything not captured falls through to the live
//! transport.
//!
//! Requests match on [`request_identity`]: method, URL and a body
//! fingerprint.

pub mod backend;
pub mod cache;
pub mod error;
pub mod page;
pub mod request;

#[cfg(feature = "live")]
pub use backend::ReqwestBackend;
pub use backend::{CachedBackend, HttpBackend, RecordingBackend};
pub use cache::{CacheConfig, DEFAULT_SNAPSHOT_SCRIPT_TYPE, RequestCache, Snapshot};
pub use error::{SnapshotError, TransportError};
pub use page::{render_snapshot_block, snapshot_from_html};
pub use request::{Headers, Request, RequestRecord, Response, request_identity};
