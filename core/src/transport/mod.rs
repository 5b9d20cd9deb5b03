//! Transport collaborators driven by `CloseableConnection`.
//!
//! # Design
//! A [`Connector`] opens one [`Transport`] per connection. The transport
//! receives the verb and headers as they are fixed, performs a single
//! exchange on `send`, and is released with `disconnect`. Byte-level
//! concerns (sockets, TLS, redirects) live entirely behind this trait.

mod blocking;
mod memory;

pub use blocking::{UreqConnector, UreqTransport};
pub use memory::{MemoryConnector, MemoryLog, MemoryTransport, RecordedExchange};

use url::Url;

use crate::error::HttpError;
use crate::http::{HttpMethod, HttpResponse};

/// One opened, single-use request channel.
pub trait Transport {
    /// Fix the verb. Fails with `HttpError::Protocol` if the transport
    /// cannot accept it in its current state.
    fn set_method(&mut self, method: HttpMethod) -> Result<(), HttpError>;

    /// Set a pending header. Replaces an earlier value for the same name.
    fn set_header(&mut self, name: &str, value: &str) -> Result<(), HttpError>;

    /// Perform the exchange with an optional body.
    fn send(&mut self, body: Option<&[u8]>) -> Result<HttpResponse, HttpError>;

    /// Release the underlying resource.
    fn disconnect(&mut self);
}

/// Opens transports for parsed URLs.
pub trait Connector {
    type Transport: Transport;

    fn connect(&self, url: &Url) -> Result<Self::Transport, HttpError>;
}
