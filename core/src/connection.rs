//! Scoped connection owning one transport for one request.
//!
//! # Design
//! `CloseableConnection` moves through three states: idle (constructed),
//! open (transport acquired) and closed (transport released). Headers may
//! be added while open; the first `create_*_request` call fixes the verb
//! and any later one fails with `HttpError::Protocol`. A verb the transport
//! rejects leaves the connection unable to build any request. `close` is
//! idempotent and also runs from `Drop`, so the transport is released on
//! every exit path of the code that owns the connection.

use std::fmt;

use tracing::{debug, trace};
use url::Url;

use crate::error::HttpError;
use crate::http::{HeaderSet, HttpMethod, METHOD_OVERRIDE_HEADER};
use crate::request::{DeleteRequest, GetRequest, InputRequest};
use crate::transport::{Connector, Transport, UreqConnector};

enum State<Tr> {
    Idle,
    Open(Tr),
    Closed,
}

impl<Tr> State<Tr> {
    fn transport_mut(&mut self) -> Result<&mut Tr, HttpError> {
        match self {
            State::Open(transport) => Ok(transport),
            State::Idle => Err(HttpError::usage("connection is not open")),
            State::Closed => Err(HttpError::usage("connection is closed")),
        }
    }
}

/// Build an unopened connection to `url` backed by [`UreqConnector`].
pub fn connection(url: impl Into<String>) -> CloseableConnection<UreqConnector> {
    CloseableConnection::with_connector(url, UreqConnector::new())
}

/// Format a URL and build an unopened ureq-backed connection to it.
///
/// ```no_run
/// let id = 7;
/// let mut conn = fluent_http::connection!("http://localhost:3000/items/{}", id);
/// conn.open()?;
/// # Ok::<(), fluent_http::HttpError>(())
/// ```
#[macro_export]
macro_rules! connection {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::connection(::std::format!($fmt $(, $arg)*))
    };
}

pub struct CloseableConnection<C: Connector> {
    url: String,
    connector: C,
    state: State<C::Transport>,
    headers: HeaderSet,
    method: Option<HttpMethod>,
    method_rejected: bool,
}

impl<C: Connector> CloseableConnection<C> {
    pub fn with_connector(url: impl Into<String>, connector: C) -> Self {
        Self {
            url: url.into(),
            connector,
            state: State::Idle,
            headers: HeaderSet::new(),
            method: None,
            method_rejected: false,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    /// Headers added so far, in insertion order.
    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    /// Verb fixed by the request builder, if any.
    pub fn method(&self) -> Option<HttpMethod> {
        self.method
    }

    /// The open transport, for inspection.
    pub fn transport(&self) -> Option<&C::Transport> {
        match &self.state {
            State::Open(transport) => Some(transport),
            _ => None,
        }
    }

    /// Parse the URL and open the transport.
    pub fn open(&mut self) -> Result<&mut Self, HttpError> {
        match self.state {
            State::Idle => {}
            State::Open(_) => return Err(HttpError::usage("connection is already open")),
            State::Closed => return Err(HttpError::usage("connection is closed")),
        }

        let url = Url::parse(&self.url).map_err(|e| HttpError::construction(&self.url, e))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(HttpError::construction(
                &self.url,
                format!("unsupported scheme `{}`", url.scheme()),
            ));
        }

        let transport = self.connector.connect(&url)?;
        debug!(url = %url, "connection opened");
        self.state = State::Open(transport);
        Ok(self)
    }

    /// Release the transport. Safe to call any number of times, including
    /// on a connection that was never opened.
    pub fn close(&mut self) {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Open(mut transport) => {
                transport.disconnect();
                debug!(url = %self.url, "connection closed");
            }
            State::Idle | State::Closed => {}
        }
    }

    /// Open the connection, run `f`, then close it whatever `f` returned.
    pub fn scope<R>(
        mut self,
        f: impl FnOnce(&mut Self) -> Result<R, HttpError>,
    ) -> Result<R, HttpError> {
        self.open()?;
        let result = f(&mut self);
        self.close();
        result
    }

    /// Add a header; `value` is sent as its `Display` form. A name already
    /// present is replaced (last write wins).
    pub fn add_header<N, V>(&mut self, name: N, value: V) -> Result<&mut Self, HttpError>
    where
        N: AsRef<str>,
        V: fmt::Display,
    {
        let name = name.as_ref();
        let value = value.to_string();
        self.state.transport_mut()?.set_header(name, &value)?;
        trace!(header = name, "header added");
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Add every `(name, value)` pair in iteration order, stopping at the
    /// first failure.
    pub fn add_headers<I, N, V>(&mut self, headers: I) -> Result<&mut Self, HttpError>
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: fmt::Display,
    {
        for (name, value) in headers {
            self.add_header(name, value)?;
        }
        Ok(self)
    }

    pub fn create_get_request(&mut self) -> Result<GetRequest<'_, C::Transport>, HttpError> {
        let (transport, _) = self.fix_method(HttpMethod::Get)?;
        Ok(GetRequest::new(transport))
    }

    pub fn create_post_request<T>(
        &mut self,
    ) -> Result<InputRequest<'_, T, C::Transport>, HttpError> {
        let (transport, headers) = self.fix_method(HttpMethod::Post)?;
        Ok(InputRequest::new(transport, headers, HttpMethod::Post))
    }

    pub fn create_put_request<T>(&mut self) -> Result<InputRequest<'_, T, C::Transport>, HttpError> {
        let (transport, headers) = self.fix_method(HttpMethod::Put)?;
        Ok(InputRequest::new(transport, headers, HttpMethod::Put))
    }

    /// PATCH sent as POST with `X-HTTP-Method-Override: PATCH`.
    pub fn create_patch_request<T>(
        &mut self,
    ) -> Result<InputRequest<'_, T, C::Transport>, HttpError> {
        self.ensure_unfixed()?;
        self.add_header(METHOD_OVERRIDE_HEADER, "PATCH")?;
        let (transport, headers) = self.fix_method(HttpMethod::Post)?;
        Ok(InputRequest::new(transport, headers, HttpMethod::Post))
    }

    pub fn create_delete_request(&mut self) -> Result<DeleteRequest<'_, C::Transport>, HttpError> {
        let (transport, _) = self.fix_method(HttpMethod::Delete)?;
        Ok(DeleteRequest::new(transport))
    }

    fn ensure_unfixed(&mut self) -> Result<(), HttpError> {
        self.state.transport_mut()?;
        if self.method_rejected {
            return Err(HttpError::protocol(
                "transport rejected the method; connection unusable",
            ));
        }
        match self.method {
            Some(current) => Err(HttpError::protocol(format!(
                "method already fixed to {current}"
            ))),
            None => Ok(()),
        }
    }

    fn fix_method(
        &mut self,
        method: HttpMethod,
    ) -> Result<(&mut C::Transport, &mut HeaderSet), HttpError> {
        self.ensure_unfixed()?;
        let transport = self.state.transport_mut()?;
        if let Err(e) = transport.set_method(method) {
            // Headers written for this verb stay on the transport.
            self.method_rejected = true;
            return Err(e);
        }
        self.method = Some(method);
        debug!(%method, url = %self.url, "method fixed");
        Ok((transport, &mut self.headers))
    }
}

impl<C: Connector> fmt::Debug for CloseableConnection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            State::Idle => "idle",
            State::Open(_) => "open",
            State::Closed => "closed",
        };
        f.debug_struct("CloseableConnection")
            .field("url", &self.url)
            .field("state", &state)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .finish()
    }
}

impl<C: Connector> Drop for CloseableConnection<C> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::error::BoxError;
    use crate::field::RequestField;
    use crate::http::HttpResponse;
    use crate::request::HttpRequest;
    use crate::transport::MemoryConnector;

    fn open(connector: &MemoryConnector) -> CloseableConnection<MemoryConnector> {
        let mut conn = CloseableConnection::with_connector("http://host/items", connector.clone());
        conn.open().unwrap();
        conn
    }

    fn text_serializer(s: &String) -> Result<Vec<u8>, BoxError> {
        Ok(s.clone().into_bytes())
    }

    #[test]
    fn open_rejects_malformed_url() {
        let mut conn = CloseableConnection::with_connector("not a url", MemoryConnector::with_status(200));
        let err = conn.open().unwrap_err();
        assert!(matches!(err, HttpError::Construction { .. }));
        assert!(!conn.is_open());
    }

    #[test]
    fn open_rejects_non_http_scheme() {
        let mut conn =
            CloseableConnection::with_connector("ftp://host/file", MemoryConnector::with_status(200));
        let err = conn.open().unwrap_err();
        assert!(err.to_string().contains("unsupported scheme `ftp`"));
    }

    #[test]
    fn open_surfaces_connector_failure() {
        let connector = MemoryConnector::refusing("host unreachable");
        let mut conn = CloseableConnection::with_connector("http://host/items", connector);
        let err = conn.open().unwrap_err();
        assert!(err.to_string().contains("host unreachable"));
    }

    #[test]
    fn open_twice_is_usage_error() {
        let connector = MemoryConnector::with_status(200);
        let mut conn = open(&connector);
        assert!(conn.open().unwrap_err().is_usage());
        assert_eq!(connector.log().connects(), 1);
    }

    #[test]
    fn operations_before_open_are_usage_errors() {
        let mut conn = CloseableConnection::with_connector("http://host", MemoryConnector::with_status(200));
        assert!(conn.add_header("Accept", "*/*").unwrap_err().is_usage());
        assert!(conn.create_get_request().err().unwrap().is_usage());
    }

    #[test]
    fn close_is_idempotent() {
        let connector = MemoryConnector::with_status(200);
        let mut conn = open(&connector);
        conn.close();
        conn.close();
        drop(conn);
        assert_eq!(connector.log().disconnects(), 1);
    }

    #[test]
    fn close_without_open_is_noop() {
        let connector = MemoryConnector::with_status(200);
        let mut conn = CloseableConnection::with_connector("http://host", connector.clone());
        conn.close();
        conn.close();
        assert!(conn.is_closed());
        assert_eq!(connector.log().connects(), 0);
        assert_eq!(connector.log().disconnects(), 0);
    }

    #[test]
    fn operations_after_close_are_usage_errors() {
        let connector = MemoryConnector::with_status(200);
        let mut conn = open(&connector);
        conn.close();
        assert!(conn.add_header("Accept", "*/*").unwrap_err().is_usage());
        assert!(conn.create_delete_request().err().unwrap().is_usage());
        assert!(conn.create_patch_request::<String>().err().unwrap().is_usage());
        assert!(conn.open().unwrap_err().is_usage());
        assert!(conn.transport().is_none());
    }

    #[test]
    fn drop_releases_transport() {
        let connector = MemoryConnector::with_status(200);
        {
            let _conn = open(&connector);
        }
        assert_eq!(connector.log().disconnects(), 1);
    }

    #[test]
    fn early_return_releases_transport() {
        fn failing(conn: &mut CloseableConnection<MemoryConnector>) -> Result<(), HttpError> {
            conn.create_get_request()?;
            conn.create_get_request()?;
            Ok(())
        }

        let connector = MemoryConnector::with_status(200);
        let conn = CloseableConnection::with_connector("http://host/items", connector.clone());
        let err = conn.scope(failing).unwrap_err();
        assert!(err.is_protocol());
        assert_eq!(connector.log().disconnects(), 1);
    }

    #[test]
    fn scope_returns_closure_result() {
        let connector = MemoryConnector::with_status(204);
        let conn = CloseableConnection::with_connector("http://host/items/1", connector.clone());
        let outcome = conn
            .scope(|conn| conn.create_delete_request()?.execute())
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(connector.log().connects(), 1);
        assert_eq!(connector.log().disconnects(), 1);
    }

    #[test]
    fn symbolic_field_uses_wire_name() {
        let connector = MemoryConnector::with_status(200);
        let mut conn = open(&connector);
        conn.add_header(RequestField::UserAgent, "fluent-http/0.1")
            .unwrap()
            .add_header(RequestField::ContentType, "application/json")
            .unwrap();

        let entries: Vec<(&str, &str)> = conn.headers().iter().collect();
        assert_eq!(
            entries,
            [
                ("User-Agent", "fluent-http/0.1"),
                ("Content-Type", "application/json")
            ]
        );
        let transport = conn.transport().unwrap();
        assert_eq!(transport.headers().get("User-Agent"), Some("fluent-http/0.1"));
    }

    #[test]
    fn values_are_stringified() {
        let connector = MemoryConnector::with_status(200);
        let mut conn = open(&connector);
        conn.add_header(RequestField::ContentLength, 42)
            .unwrap()
            .add_header(RequestField::MaxForwards, 3u8)
            .unwrap();
        assert_eq!(conn.headers().get("Content-Length"), Some("42"));
        assert_eq!(conn.headers().get("Max-Forwards"), Some("3"));
    }

    #[test]
    fn add_headers_round_trip() {
        let connector = MemoryConnector::with_status(200);
        let mut conn = open(&connector);
        let mut map = BTreeMap::new();
        map.insert("Authorization", "Bearer x");
        map.insert("Accept", "application/json");
        conn.add_headers(&map).unwrap();

        assert_eq!(conn.headers().len(), 2);
        assert_eq!(conn.headers().get("Authorization"), Some("Bearer x"));
        assert_eq!(conn.headers().get("Accept"), Some("application/json"));
        let names: Vec<&str> = conn.headers().iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["Accept", "Authorization"]);
    }

    #[test]
    fn duplicate_header_last_write_wins() {
        let connector = MemoryConnector::with_status(200);
        let mut conn = open(&connector);
        conn.add_header("Accept", "text/plain").unwrap();
        conn.add_header(RequestField::Accept, "application/json").unwrap();
        conn.create_get_request().unwrap().execute().unwrap();

        let exchange = connector.log().last_exchange().unwrap();
        assert_eq!(exchange.headers.len(), 1);
        assert_eq!(exchange.headers.get("accept"), Some("application/json"));
    }

    #[test]
    fn second_verb_is_protocol_error() {
        let connector = MemoryConnector::with_status(200);
        let mut conn = open(&connector);
        conn.create_get_request().unwrap();
        let err = conn.create_put_request::<String>().err().unwrap();
        assert!(err.is_protocol());
        assert_eq!(conn.method(), Some(HttpMethod::Get));
        assert_eq!(conn.transport().unwrap().method(), Some(HttpMethod::Get));
    }

    #[test]
    fn second_patch_does_not_touch_headers() {
        let connector = MemoryConnector::with_status(200);
        let mut conn = open(&connector);
        conn.create_delete_request().unwrap();
        assert!(conn.create_patch_request::<String>().err().unwrap().is_protocol());
        assert!(!conn.headers().contains(METHOD_OVERRIDE_HEADER));
    }

    #[test]
    fn rejected_verb_leaves_method_unset() {
        let connector = MemoryConnector::with_status(200).rejecting_methods();
        let mut conn = open(&connector);
        let err = conn.create_put_request::<String>().err().unwrap();
        assert!(err.is_protocol());
        assert_eq!(conn.method(), None);
        assert_eq!(conn.transport().unwrap().method(), None);
        conn.close();
        assert!(connector.log().exchanges().is_empty());
    }

    #[test]
    fn rejected_patch_blocks_later_verbs() {
        let connector = MemoryConnector::with_status(200).rejecting_methods();
        let mut conn = open(&connector);
        assert!(conn.create_patch_request::<String>().err().unwrap().is_protocol());
        assert_eq!(conn.method(), None);

        // The override header is still on the transport, so nothing else
        // may go out on this connection.
        assert!(conn.create_get_request().err().unwrap().is_protocol());
        assert!(conn.create_post_request::<String>().err().unwrap().is_protocol());
        assert!(conn.create_delete_request().err().unwrap().is_protocol());
        assert_eq!(conn.method(), None);
        conn.close();
        assert!(connector.log().exchanges().is_empty());
        assert_eq!(connector.log().disconnects(), 1);
    }

    #[test]
    fn patch_is_post_with_override_header() {
        let connector = MemoryConnector::with_status(200);
        let mut conn = open(&connector);
        conn.create_patch_request::<String>().unwrap();

        let transport = conn.transport().unwrap();
        assert_eq!(transport.method(), Some(HttpMethod::Post));
        assert_eq!(transport.headers().get(METHOD_OVERRIDE_HEADER), Some("PATCH"));
        assert_eq!(conn.headers().get("x-http-method-override"), Some("PATCH"));
    }

    #[test]
    fn get_returns_response() {
        let mut response = HttpResponse::new(200);
        response.body = b"[]".to_vec();
        let connector = MemoryConnector::new(response);
        let mut conn = open(&connector);
        let got = conn.create_get_request().unwrap().execute().unwrap();
        assert_eq!(got.status, 200);
        assert_eq!(got.text(), "[]");

        let exchange = connector.log().last_exchange().unwrap();
        assert_eq!(exchange.method, HttpMethod::Get);
        assert!(exchange.body.is_none());
    }

    #[test]
    fn delete_reports_outcome() {
        let connector = MemoryConnector::with_status(404);
        let mut conn = open(&connector);
        let outcome = conn.create_delete_request().unwrap().execute().unwrap();
        assert!(outcome.is_not_found());
        assert_eq!(connector.log().last_exchange().unwrap().method, HttpMethod::Delete);
    }

    #[test]
    fn input_without_object_sends_nothing() {
        let connector = MemoryConnector::with_status(200);
        let mut conn = open(&connector);
        let err = conn
            .create_post_request::<String>()
            .unwrap()
            .set_serializer(text_serializer)
            .execute()
            .unwrap_err();
        assert!(err.is_usage());
        assert!(connector.log().exchanges().is_empty());
    }

    #[test]
    fn input_without_serializer_sends_nothing() {
        let connector = MemoryConnector::with_status(200);
        let mut conn = open(&connector);
        let err = conn
            .create_put_request()
            .unwrap()
            .set_object("payload".to_string())
            .execute()
            .unwrap_err();
        assert!(err.to_string().contains("no serializer"));
        assert!(connector.log().exchanges().is_empty());
    }

    #[test]
    fn input_sends_serialized_body() {
        let connector = MemoryConnector::with_status(201);
        let mut conn = open(&connector);
        let status = conn
            .create_post_request()
            .unwrap()
            .set_serializer(text_serializer)
            .set_object("hello".to_string())
            .execute()
            .unwrap();

        assert_eq!(status, 201);
        let exchange = connector.log().last_exchange().unwrap();
        assert_eq!(exchange.method, HttpMethod::Post);
        assert_eq!(exchange.body.as_deref(), Some(&b"hello"[..]));
        assert!(!exchange.headers.contains("Content-Type"));
    }

    #[test]
    fn serializer_failure_sends_nothing() {
        let connector = MemoryConnector::with_status(200);
        let mut conn = open(&connector);
        let err = conn
            .create_put_request()
            .unwrap()
            .set_serializer(|_: &u32| -> Result<Vec<u8>, BoxError> { Err("unencodable".into()) })
            .set_object(5)
            .execute()
            .unwrap_err();
        assert!(matches!(err, HttpError::Serialization(_)));
        assert!(connector.log().exchanges().is_empty());
    }

    #[test]
    fn transport_failure_is_surfaced() {
        let connector = MemoryConnector::failing("broken pipe");
        let mut conn = open(&connector);
        let err = conn.create_get_request().unwrap().execute().unwrap_err();
        assert!(matches!(err, HttpError::Transport(_)));
        conn.close();
        assert_eq!(connector.log().disconnects(), 1);
    }

    #[test]
    fn headers_after_execute_are_rejected() {
        let connector = MemoryConnector::with_status(200);
        let mut conn = open(&connector);
        conn.create_get_request().unwrap().execute().unwrap();
        assert!(conn.add_header("Accept", "*/*").unwrap_err().is_protocol());
    }

    #[cfg(feature = "json")]
    #[test]
    fn put_json_end_to_end() {
        use crate::serialize::JsonSerializer;

        #[derive(serde::Serialize)]
        struct Item {
            name: String,
        }

        let connector = MemoryConnector::with_status(200);
        let mut conn = open(&connector);
        conn.add_header(RequestField::ContentType, "application/json")
            .unwrap();
        let status = conn
            .create_put_request()
            .unwrap()
            .set_serializer(JsonSerializer)
            .set_object(Item {
                name: "bolt".to_string(),
            })
            .execute()
            .unwrap();
        assert_eq!(status, 200);
        conn.close();

        let exchange = connector.log().last_exchange().unwrap();
        assert_eq!(exchange.method, HttpMethod::Put);
        assert_eq!(exchange.headers.len(), 1);
        assert_eq!(exchange.body.as_deref(), Some(&br#"{"name":"bolt"}"#[..]));
        assert_eq!(connector.log().disconnects(), 1);
    }

    #[cfg(feature = "json")]
    #[test]
    fn json_serializer_sets_content_type_when_missing() {
        use crate::serialize::JsonSerializer;

        let connector = MemoryConnector::with_status(201);
        let mut conn = open(&connector);
        conn.create_patch_request()
            .unwrap()
            .set_serializer(JsonSerializer)
            .set_object(serde_json::json!({"quantity": 2}))
            .execute()
            .unwrap();

        let exchange = connector.log().last_exchange().unwrap();
        assert_eq!(exchange.method, HttpMethod::Post);
        assert_eq!(exchange.headers.get("Content-Type"), Some("application/json"));
        assert_eq!(exchange.headers.get(METHOD_OVERRIDE_HEADER), Some("PATCH"));
        assert_eq!(conn.headers().get("Content-Type"), Some("application/json"));
    }
}
