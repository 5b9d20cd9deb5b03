//! Verb-specific request builders.
//!
//! # Design
//! Builders are created by `CloseableConnection::create_*_request` once the
//! verb is fixed. Each borrows the connection's transport and header set
//! mutably, so nothing else can touch the connection until the builder is
//! executed or dropped. `execute` consumes the builder: one exchange per
//! builder. The result type is chosen per verb through
//! [`HttpRequest::Output`].

use tracing::debug;

use crate::error::HttpError;
use crate::field::RequestField;
use crate::http::{DeleteOutcome, HeaderSet, HttpMethod, HttpResponse};
use crate::serialize::RequestSerializer;
use crate::transport::Transport;

/// A request ready to be sent.
pub trait HttpRequest {
    type Output;

    fn execute(self) -> Result<Self::Output, HttpError>;
}

/// GET request. Resolves to the full response; the caller decodes the body.
pub struct GetRequest<'c, Tr: Transport> {
    transport: &'c mut Tr,
}

impl<'c, Tr: Transport> GetRequest<'c, Tr> {
    pub(crate) fn new(transport: &'c mut Tr) -> Self {
        Self { transport }
    }
}

impl<Tr: Transport> HttpRequest for GetRequest<'_, Tr> {
    type Output = HttpResponse;

    fn execute(self) -> Result<HttpResponse, HttpError> {
        self.transport.send(None)
    }
}

/// DELETE request. Carries no body.
pub struct DeleteRequest<'c, Tr: Transport> {
    transport: &'c mut Tr,
}

impl<'c, Tr: Transport> DeleteRequest<'c, Tr> {
    pub(crate) fn new(transport: &'c mut Tr) -> Self {
        Self { transport }
    }
}

impl<Tr: Transport> HttpRequest for DeleteRequest<'_, Tr> {
    type Output = DeleteOutcome;

    fn execute(self) -> Result<DeleteOutcome, HttpError> {
        let response = self.transport.send(None)?;
        Ok(DeleteOutcome {
            status: response.status,
        })
    }
}

/// POST, PUT or spoofed PATCH request carrying a serialized `T`.
///
/// Both [`set_serializer`](Self::set_serializer) and
/// [`set_object`](Self::set_object) must be called before `execute`;
/// otherwise `execute` fails with `HttpError::Usage` and nothing is sent.
pub struct InputRequest<'c, T, Tr: Transport> {
    transport: &'c mut Tr,
    headers: &'c mut HeaderSet,
    method: HttpMethod,
    serializer: Option<Box<dyn RequestSerializer<T> + 'c>>,
    object: Option<T>,
}

impl<'c, T, Tr: Transport> InputRequest<'c, T, Tr> {
    pub(crate) fn new(transport: &'c mut Tr, headers: &'c mut HeaderSet, method: HttpMethod) -> Self {
        Self {
            transport,
            headers,
            method,
            serializer: None,
            object: None,
        }
    }

    pub fn set_serializer<S>(mut self, serializer: S) -> Self
    where
        S: RequestSerializer<T> + 'c,
    {
        self.serializer = Some(Box::new(serializer));
        self
    }

    pub fn set_object(mut self, object: T) -> Self {
        self.object = Some(object);
        self
    }
}

impl<T, Tr: Transport> HttpRequest for InputRequest<'_, T, Tr> {
    type Output = u16;

    fn execute(self) -> Result<u16, HttpError> {
        let (object, serializer) = match (self.object, self.serializer) {
            (Some(object), Some(serializer)) => (object, serializer),
            (None, Some(_)) => return Err(HttpError::usage("no object set on input request")),
            (Some(_), None) => return Err(HttpError::usage("no serializer set on input request")),
            (None, None) => {
                return Err(HttpError::usage(
                    "no object and no serializer set on input request",
                ))
            }
        };

        let body = serializer
            .serialize(&object)
            .map_err(HttpError::Serialization)?;

        if let Some(content_type) = serializer.content_type() {
            let name = RequestField::ContentType.as_str();
            if !self.headers.contains(name) {
                self.transport.set_header(name, content_type)?;
                self.headers.insert(name, content_type);
            }
        }

        debug!(method = %self.method, body_len = body.len(), "executing input request");
        let response = self.transport.send(Some(&body))?;
        Ok(response.status)
    }
}
