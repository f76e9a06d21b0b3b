//! Scripted in-memory backend for testing.
//!
//! Responses are queued up front and handed out in order; every request the
//! client sends is recorded. Clones share the same queue and log, so a test
//! can keep one handle while the client owns another.

use super::{HttpBackend, HttpRequest, HttpResponse, TransportError};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

enum Scripted {
    Response(HttpResponse),
    NetworkError(String),
}

/// Backend that replays queued responses.
///
/// # Examples
///
/// ```
/// use jira::transport::{HttpBackend, HttpRequest, HttpResponse, Method, ScriptedBackend};
///
/// let backend = ScriptedBackend::new();
/// backend.push_response(HttpResponse::new(200, "{}"));
///
/// let response = backend.send(&HttpRequest::new(Method::Get, "http://x/", None)).unwrap();
/// assert_eq!(response.status, 200);
/// assert_eq!(backend.requests().len(), 1);
/// ```
#[derive(Clone, Default)]
#[allow(dead_code)] // Public API used only in tests, not in binary
pub struct ScriptedBackend {
    queue: Rc<RefCell<VecDeque<Scripted>>>,
    log: Rc<RefCell<Vec<HttpRequest>>>,
}

#[allow(dead_code)] // Public API used only in tests, not in binary
impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, response: HttpResponse) {
        self.queue.borrow_mut().push_back(Scripted::Response(response));
    }

    pub fn push_json(&self, status: u16, value: serde_json::Value) {
        self.push_response(HttpResponse::new(status, value.to_string()));
    }

    pub fn push_network_error(&self, message: impl Into<String>) {
        self.queue
            .borrow_mut()
            .push_back(Scripted::NetworkError(message.into()));
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.log.borrow().clone()
    }

    /// Number of queued responses not yet consumed.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

impl HttpBackend for ScriptedBackend {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.log.borrow_mut().push(request.clone());

        let network_error = |message: String| TransportError::Network {
            method: request.method,
            uri: request.uri.clone(),
            source: Box::new(io::Error::new(io::ErrorKind::ConnectionRefused, message)),
        };

        match self.queue.borrow_mut().pop_front() {
            Some(Scripted::Response(response)) => Ok(response),
            Some(Scripted::NetworkError(message)) => Err(network_error(message)),
            None => Err(network_error(format!(
                "no scripted response for {} {}",
                request.method, request.uri
            ))),
        }
    }
}
