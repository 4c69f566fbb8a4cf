//! Blocking client for the DaData cleansing and suggestion APIs.
//!
//! # Overview
//! Cleansing endpoints normalize one kind of structured field (name, phone,
//! passport, address, ...) for an array of records. Suggestion endpoints
//! return ranked candidates for partial text, look entities up by
//! identifier, or geolocate an IP address.
//!
//! # Design
//! - `RequestFactory` builds `HttpRequest` values and parses `HttpResponse`
//!   values without touching the network.
//! - `Transport` is the only I/O seam; `UreqTransport` is the default and
//!   holds a lazily created `ureq::Agent` until the client is dropped.
//! - `batch` maps single or keyed inputs onto the API's array shape and the
//!   positional response records back onto the caller's keys.
//! - `DaDataClient` strings the three together per endpoint.

pub mod batch;
pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod http;
pub mod requests;
pub mod transport;
pub mod types;

pub use batch::{CleanInput, CleanOutput, Selector};
pub use client::DaDataClient;
pub use config::{ClientConfig, Credentials};
pub use error::{Error, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use requests::RequestFactory;
pub use transport::{Transport, UreqTransport};
pub use types::{CleanKind, FindKind, SuggestKind, SuggestOptions, Suggestion};
