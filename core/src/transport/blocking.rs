//! Blocking transport over `ureq`.

use std::fmt;

use tracing::debug;
use url::Url;

use super::{Connector, Transport};
use crate::error::HttpError;
use crate::http::{HeaderSet, HttpMethod, HttpResponse};

/// Opens [`UreqTransport`]s sharing one `ureq::Agent`.
///
/// The default agent returns 4xx/5xx responses as data rather than errors,
/// so `execute()` can report the status code the server sent. It keeps no
/// idle sockets: every transport dials its own connection and the socket is
/// closed once the response body has been read.
#[derive(Clone)]
pub struct UreqConnector {
    agent: ureq::Agent,
}

impl UreqConnector {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .max_idle_connections(0)
            .max_idle_connections_per_host(0)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Use a caller-configured agent (proxy, TLS, user agent, ...).
    ///
    /// The agent's own pooling applies, so a closed connection may leave its
    /// socket idle in the pool for reuse by the next one.
    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UreqConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqConnector").finish_non_exhaustive()
    }
}

impl Connector for UreqConnector {
    type Transport = UreqTransport;

    fn connect(&self, url: &Url) -> Result<UreqTransport, HttpError> {
        if url.host_str().is_none() {
            return Err(HttpError::construction(url.as_str(), "url has no host"));
        }
        Ok(UreqTransport {
            agent: self.agent.clone(),
            url: url.to_string(),
            method: None,
            headers: HeaderSet::new(),
            sent: false,
            disconnected: false,
        })
    }
}

/// Pending request state for one ureq exchange.
pub struct UreqTransport {
    agent: ureq::Agent,
    url: String,
    method: Option<HttpMethod>,
    headers: HeaderSet,
    sent: bool,
    disconnected: bool,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("sent", &self.sent)
            .field("disconnected", &self.disconnected)
            .finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn method(&self) -> Option<HttpMethod> {
        self.method
    }

    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    fn ensure_usable(&self) -> Result<(), HttpError> {
        if self.disconnected {
            return Err(HttpError::protocol("transport already disconnected"));
        }
        if self.sent {
            return Err(HttpError::protocol("request already sent"));
        }
        Ok(())
    }
}

fn with_headers<B>(
    mut request: ureq::RequestBuilder<B>,
    headers: &HeaderSet,
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers.iter() {
        request = request.header(name, value);
    }
    request
}

impl Transport for UreqTransport {
    fn set_method(&mut self, method: HttpMethod) -> Result<(), HttpError> {
        self.ensure_usable()?;
        if let Some(current) = self.method {
            return Err(HttpError::protocol(format!(
                "method already set to {current}"
            )));
        }
        self.method = Some(method);
        Ok(())
    }

    fn set_header(&mut self, name: &str, value: &str) -> Result<(), HttpError> {
        self.ensure_usable()?;
        self.headers.insert(name, value);
        Ok(())
    }

    fn send(&mut self, body: Option<&[u8]>) -> Result<HttpResponse, HttpError> {
        self.ensure_usable()?;
        let method = self
            .method
            .ok_or_else(|| HttpError::protocol("no method set before send"))?;
        self.sent = true;

        debug!(%method, url = %self.url, body_len = body.map_or(0, <[u8]>::len), "sending request");
        let url = self.url.as_str();
        let result = match (method, body) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(url), &self.headers).call(),
            (HttpMethod::Delete, _) => with_headers(self.agent.delete(url), &self.headers).call(),
            (HttpMethod::Post, Some(body)) => {
                with_headers(self.agent.post(url), &self.headers).send(body)
            }
            (HttpMethod::Post, None) => {
                with_headers(self.agent.post(url), &self.headers).send_empty()
            }
            (HttpMethod::Put, Some(body)) => {
                with_headers(self.agent.put(url), &self.headers).send(body)
            }
            (HttpMethod::Put, None) => with_headers(self.agent.put(url), &self.headers).send_empty(),
        };
        let mut response = result?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.body_mut().read_to_vec()?;
        debug!(status, body_len = body.len(), "response received");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn disconnect(&mut self) {
        self.disconnected = true;
    }
}
