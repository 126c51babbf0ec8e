//! Upstream DX API client
//!
//! Split in three layers: [`request::DxRequest`] describes one outbound call,
//! [`http::HttpExecutor`] performs it with bearer auth and the single-retry
//! 401 policy, and [`client::DxClient`] exposes one method per endpoint
//! family. [`etag`] holds the shared auto-fetch helper used by write tools.

pub mod client;
pub mod etag;
pub mod http;
pub mod request;

pub use client::DxClient;
pub use etag::{EntityRef, fetch_etag};
pub use http::{DxResponse, HttpExecutor};
pub use request::{DxBody, DxRequest};
