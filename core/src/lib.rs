//! Fluent builder for single-shot HTTP requests.
//!
//! # Overview
//! A [`CloseableConnection`] owns one transport for one request. The caller
//! opens it, adds headers, picks a verb through one of the
//! `create_*_request` methods, optionally attaches a serialized body, and
//! executes the request to get a typed result:
//!
//! ```no_run
//! use fluent_http::{HttpRequest, JsonSerializer, RequestField};
//!
//! #[derive(serde::Serialize)]
//! struct Item {
//!     name: String,
//! }
//!
//! let mut conn = fluent_http::connection("http://localhost:3000/items/1");
//! conn.open()?
//!     .add_header(RequestField::ContentType, "application/json")?;
//! let status = conn
//!     .create_put_request()?
//!     .set_serializer(JsonSerializer)
//!     .set_object(Item { name: "bolt".into() })
//!     .execute()?;
//! conn.close();
//! # let _ = status;
//! # Ok::<(), fluent_http::HttpError>(())
//! ```
//!
//! # Design
//! - One verb per connection; a second `create_*_request` is a
//!   `HttpError::Protocol`.
//! - PATCH is POST plus `X-HTTP-Method-Override: PATCH`.
//! - Headers follow last-write-wins, matched case-insensitively.
//! - `close` is idempotent and runs on drop.
//! - Transports are pluggable through [`Connector`] / [`Transport`]; a
//!   blocking `ureq` transport and an in-memory recording transport ship
//!   with the crate.

pub mod connection;
pub mod error;
pub mod field;
pub mod http;
pub mod request;
pub mod serialize;
pub mod transport;

pub use connection::{connection, CloseableConnection};
pub use error::{BoxError, HttpError};
pub use field::{RequestField, UnknownField};
pub use http::{DeleteOutcome, HeaderSet, HttpMethod, HttpResponse, METHOD_OVERRIDE_HEADER};
pub use request::{DeleteRequest, GetRequest, HttpRequest, InputRequest};
#[cfg(feature = "json")]
pub use serialize::JsonSerializer;
pub use serialize::RequestSerializer;
pub use transport::{Connector, MemoryConnector, Transport, UreqConnector};
