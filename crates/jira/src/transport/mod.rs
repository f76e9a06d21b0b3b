//! HTTP transport with transparent session re-authentication.
//!
//! `HttpBackend` abstracts the wire so the retry and cookie logic in
//! `AuthenticatedClient` can run against a real agent (`UreqBackend`) or a
//! scripted one (`ScriptedBackend`) interchangeably.

use chrono::Utc;
use serde::de::DeserializeOwned;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

pub mod cookies;
pub mod memory;
pub mod ureq_backend;

pub use cookies::{CookieStore, SessionCookie};
#[allow(unused_imports)] // Public API used only in tests, not in binary
pub use memory::ScriptedBackend;
pub use ureq_backend::UreqBackend;

const SESSION_PATH: &str = "/rest/auth/1/session";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to {method} {uri}: {source}")]
    Network {
        method: Method,
        uri: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("Failed to read response body from {uri}: {source}")]
    Body {
        uri: String,
        source: std::io::Error,
    },
    #[error("Failed to configure TLS: {0}")]
    Tls(String),
    #[error("Failed to obtain credentials: {0}")]
    Credentials(String),
    #[error("Login failed for user '{user}': {status} {body}")]
    LoginFailed {
        user: String,
        status: u16,
        body: String,
    },
    #[error(transparent)]
    Cookies(#[from] cookies::CookieError),
}

/// HTTP methods used by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            other => Err(format!("Invalid HTTP method: {}", other)),
        }
    }
}

/// An outgoing request. Owned so it can be replayed verbatim after login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    /// Keep the body out of debug logs (login payloads carry a password).
    pub redact_body: bool,
}

impl HttpRequest {
    pub fn new(method: Method, uri: impl Into<String>, body: Option<&str>) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: Vec::new(),
            body: body.map(str::to_string),
            redact_body: false,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A fully-read response. The body has already been drained and the
/// connection released by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            status_text: String::new(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// All values of a (case-insensitive) header.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.body)
    }
}

/// A wire-level HTTP implementation.
pub trait HttpBackend {
    /// Send a request and return the complete response.
    ///
    /// Non-2xx statuses are responses, not errors. Only failures to talk to
    /// the server at all are reported as `Err`.
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Username/password pair used for session login.
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Supplies credentials when the server asks the client to log in.
pub trait CredentialSource {
    fn credentials(&mut self) -> anyhow::Result<Credentials>;
}

/// Fixed credentials, for non-interactive use and tests.
pub struct StaticCredentials(pub Credentials);

impl CredentialSource for StaticCredentials {
    fn credentials(&mut self) -> anyhow::Result<Credentials> {
        Ok(self.0.clone())
    }
}

/// HTTP client that keeps a cookie session alive.
///
/// Cookies are loaded once at construction and persisted after every
/// response that sets new ones. A 401 triggers a single login followed by a
/// single replay of the original request.
pub struct AuthenticatedClient<B: HttpBackend> {
    backend: B,
    endpoint: String,
    endpoint_url: Option<Url>,
    store: CookieStore,
    cookies: Vec<SessionCookie>,
    credentials: Box<dyn CredentialSource>,
}

impl<B: HttpBackend> AuthenticatedClient<B> {
    pub fn new(
        backend: B,
        endpoint: &str,
        store: CookieStore,
        credentials: Box<dyn CredentialSource>,
    ) -> Result<Self, TransportError> {
        let cookies = store.load()?;
        let endpoint = endpoint.trim_end_matches('/').to_string();
        let endpoint_url = Url::parse(&endpoint).ok();
        if endpoint_url.is_none() {
            warn!("Endpoint {} is not a valid URL, cookies will not be sent", endpoint);
        }
        Ok(Self {
            backend,
            endpoint,
            endpoint_url,
            store,
            cookies,
            credentials,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Absolute URL for a REST path such as `/rest/api/2/issue/ABC-1`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }

    pub fn cookies(&self) -> &[SessionCookie] {
        &self.cookies
    }

    pub fn get(&mut self, uri: &str) -> Result<HttpResponse, TransportError> {
        self.request(Method::Get, uri, None)
    }

    pub fn post(&mut self, uri: &str, body: &str) -> Result<HttpResponse, TransportError> {
        self.request(Method::Post, uri, Some(body))
    }

    pub fn put(&mut self, uri: &str, body: &str) -> Result<HttpResponse, TransportError> {
        self.request(Method::Put, uri, Some(body))
    }

    pub fn delete(&mut self, uri: &str) -> Result<HttpResponse, TransportError> {
        self.request(Method::Delete, uri, None)
    }

    /// Send a request, logging in and replaying it once on 401.
    ///
    /// The replay's outcome is returned as-is, including a second 401.
    pub fn request(
        &mut self,
        method: Method,
        uri: &str,
        body: Option<&str>,
    ) -> Result<HttpResponse, TransportError> {
        let request = HttpRequest::new(method, uri, body);
        let response = self.send_once(&request)?;
        if response.status != 401 {
            return Ok(response);
        }

        info!("{} {} requires authentication, logging in", method, uri);
        self.login()?;
        self.send_once(&request)
    }

    /// Open a new session with the configured credentials.
    pub fn login(&mut self) -> Result<(), TransportError> {
        let credentials = self
            .credentials
            .credentials()
            .map_err(|e| TransportError::Credentials(e.to_string()))?;

        let body = serde_json::json!({
            "username": credentials.user,
            "password": credentials.password,
        })
        .to_string();
        let mut request = HttpRequest::new(Method::Post, self.url(SESSION_PATH), Some(&body));
        request.redact_body = true;

        let response = self.send_once(&request)?;
        if !response.is_success() {
            return Err(TransportError::LoginFailed {
                user: credentials.user,
                status: response.status,
                body: response.body,
            });
        }

        info!("Logged in as {}", credentials.user);
        Ok(())
    }

    /// Close the server-side session and forget all stored cookies.
    pub fn logout(&mut self) -> Result<HttpResponse, TransportError> {
        let request = HttpRequest::new(Method::Delete, self.url(SESSION_PATH), None);
        let response = self.send_once(&request)?;
        self.store.clear()?;
        self.cookies.clear();
        Ok(response)
    }

    fn send_once(&mut self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let now = Utc::now();
        let mut request = request.clone();
        request
            .headers
            .push(("Content-Type".to_string(), "application/json".to_string()));
        // Session cookies only ever go back to the Jira server itself.
        let target = Url::parse(&request.uri)
            .ok()
            .filter(|url| self.is_endpoint_origin(url));
        if let Some(cookie) = target
            .as_ref()
            .and_then(|url| cookies::cookie_header(&self.cookies, url, now))
        {
            request.headers.push(("Cookie".to_string(), cookie));
        }

        info!("{} {}", request.method, request.uri);
        if let Some(body) = &request.body {
            if request.redact_body {
                debug!("request body: <redacted>");
            } else {
                debug!("request body: {}", body);
            }
        }

        let response = self.backend.send(&request).map_err(|e| {
            error!("{}", e);
            e
        })?;

        if !response.is_success() && response.status != 401 {
            error!("response status: {} {}", response.status, response.status_text);
        }
        debug!("response body: {}", response.body);

        let set_cookies: Vec<SessionCookie> = response
            .header_values("Set-Cookie")
            .into_iter()
            .filter_map(|h| SessionCookie::parse_set_cookie(h, now))
            .collect();
        if !set_cookies.is_empty() {
            if target.is_some() {
                self.persist_cookies(&set_cookies, now);
            } else {
                debug!("Ignoring cookies set by {}", request.uri);
            }
        }

        Ok(response)
    }

    fn is_endpoint_origin(&self, url: &Url) -> bool {
        self.endpoint_url
            .as_ref()
            .is_some_and(|endpoint| endpoint.origin() == url.origin())
    }

    fn persist_cookies(&mut self, incoming: &[SessionCookie], now: chrono::DateTime<Utc>) {
        match self.store.save(incoming, now) {
            Ok(merged) => self.cookies = merged,
            Err(e) => {
                warn!("{}", e);
                let current = std::mem::take(&mut self.cookies);
                self.cookies = cookies::merge_cookies(current, incoming);
            }
        }
    }
}
