//! In-memory transport that answers with a canned reply and records what
//! it was asked to send.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use url::Url;

use super::{Connector, Transport};
use crate::error::HttpError;
use crate::http::{HeaderSet, HttpMethod, HttpResponse};

/// A request as it reached the in-memory transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedExchange {
    pub url: String,
    pub method: HttpMethod,
    pub headers: HeaderSet,
    pub body: Option<Vec<u8>>,
}

#[derive(Debug, Default)]
struct LogState {
    connects: usize,
    disconnects: usize,
    exchanges: Vec<RecordedExchange>,
}

/// Shared record of every transport opened by one [`MemoryConnector`].
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    state: Arc<Mutex<LogState>>,
}

impl MemoryLog {
    fn lock(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn connects(&self) -> usize {
        self.lock().connects
    }

    /// Number of `disconnect` calls, counting repeats.
    pub fn disconnects(&self) -> usize {
        self.lock().disconnects
    }

    pub fn exchanges(&self) -> Vec<RecordedExchange> {
        self.lock().exchanges.clone()
    }

    pub fn last_exchange(&self) -> Option<RecordedExchange> {
        self.lock().exchanges.last().cloned()
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Respond(HttpResponse),
    Fail(String),
    Refuse(String),
}

/// Opens [`MemoryTransport`]s that all share one [`MemoryLog`].
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    reply: Reply,
    log: MemoryLog,
    reject_method: bool,
}

impl MemoryConnector {
    /// Every exchange is answered with `response`.
    pub fn new(response: HttpResponse) -> Self {
        Self {
            reply: Reply::Respond(response),
            log: MemoryLog::default(),
            reject_method: false,
        }
    }

    pub fn with_status(status: u16) -> Self {
        Self::new(HttpResponse::new(status))
    }

    /// Every `send` fails with a transport error carrying `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            reply: Reply::Fail(reason.into()),
            log: MemoryLog::default(),
            reject_method: false,
        }
    }

    /// Every `connect` fails, as if the host were unreachable.
    pub fn refusing(reason: impl Into<String>) -> Self {
        Self {
            reply: Reply::Refuse(reason.into()),
            log: MemoryLog::default(),
            reject_method: false,
        }
    }

    /// Transports opened from here refuse every `set_method` call.
    pub fn rejecting_methods(mut self) -> Self {
        self.reject_method = true;
        self
    }

    pub fn log(&self) -> MemoryLog {
        self.log.clone()
    }
}

impl Connector for MemoryConnector {
    type Transport = MemoryTransport;

    fn connect(&self, url: &Url) -> Result<MemoryTransport, HttpError> {
        if let Reply::Refuse(reason) = &self.reply {
            return Err(HttpError::construction(url.as_str(), reason));
        }
        self.log.lock().connects += 1;
        Ok(MemoryTransport {
            url: url.to_string(),
            method: None,
            headers: HeaderSet::new(),
            sent: false,
            disconnected: false,
            reply: self.reply.clone(),
            log: self.log.clone(),
            reject_method: self.reject_method,
        })
    }
}

#[derive(Debug)]
pub struct MemoryTransport {
    url: String,
    method: Option<HttpMethod>,
    headers: HeaderSet,
    sent: bool,
    disconnected: bool,
    reply: Reply,
    log: MemoryLog,
    reject_method: bool,
}

impl MemoryTransport {
    pub fn method(&self) -> Option<HttpMethod> {
        self.method
    }

    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
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

impl Transport for MemoryTransport {
    fn set_method(&mut self, method: HttpMethod) -> Result<(), HttpError> {
        self.ensure_usable()?;
        if let Some(current) = self.method {
            return Err(HttpError::protocol(format!(
                "method already set to {current}"
            )));
        }
        if self.reject_method {
            return Err(HttpError::protocol(format!("method {method} not supported")));
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

        self.log.lock().exchanges.push(RecordedExchange {
            url: self.url.clone(),
            method,
            headers: self.headers.clone(),
            body: body.map(<[u8]>::to_vec),
        });

        match &self.reply {
            Reply::Respond(response) => Ok(response.clone()),
            Reply::Fail(reason) | Reply::Refuse(reason) => Err(HttpError::Transport(
                std::io::Error::other(reason.clone()).into(),
            )),
        }
    }

    fn disconnect(&mut self) {
        self.disconnected = true;
        self.log.lock().disconnects += 1;
    }
}
