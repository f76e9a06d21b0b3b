//! Real HTTP backend built on a blocking `ureq` agent.

use super::{HttpBackend, HttpRequest, HttpResponse, TransportError};
use std::io::Read;
use std::sync::Arc;

const USER_AGENT: &str = concat!("jira-cli/", env!("CARGO_PKG_VERSION"));

/// Blocking HTTP backend.
///
/// Response bodies are read to the end inside `send`, so the connection is
/// returned to the agent before the caller ever sees the response.
pub struct UreqBackend {
    agent: ureq::Agent,
}

impl UreqBackend {
    /// Build a backend. With `insecure` set, TLS certificate and hostname
    /// checks are disabled.
    pub fn new(insecure: bool) -> Result<Self, TransportError> {
        let mut builder = ureq::AgentBuilder::new().user_agent(USER_AGENT);

        if insecure {
            let connector = native_tls::TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
                .build()
                .map_err(|e| TransportError::Tls(e.to_string()))?;
            builder = builder.tls_connector(Arc::new(connector));
        }

        Ok(Self {
            agent: builder.build(),
        })
    }
}

impl HttpBackend for UreqBackend {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut call = self.agent.request(request.method.as_str(), &request.uri);
        for (name, value) in &request.headers {
            call = call.set(name, value);
        }

        let result = match &request.body {
            Some(body) => call.send_string(body),
            None => call.call(),
        };

        let response = match result {
            Ok(response) => response,
            // Error statuses still carry a response the caller wants to see
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(transport)) => {
                return Err(TransportError::Network {
                    method: request.method,
                    uri: request.uri.clone(),
                    source: Box::new(transport),
                })
            }
        };

        let status = response.status();
        let status_text = response.status_text().to_string();
        let mut names = response.headers_names();
        names.sort();
        names.dedup();
        let mut headers = Vec::new();
        for name in names {
            for value in response.all(&name) {
                headers.push((name.clone(), value.to_string()));
            }
        }

        // Read without the 10 MB cap of `into_string`.
        let mut body = String::new();
        response
            .into_reader()
            .read_to_string(&mut body)
            .map_err(|source| TransportError::Body {
                uri: request.uri.clone(),
                source,
            })?;

        Ok(HttpResponse {
            status,
            status_text,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Method;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serve one response with `body` on a local port; returns the base URL.
    fn serve_once(status_line: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
                line.clear();
            }
            let mut stream = reader.into_inner();
            let head = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nSet-Cookie: JSESSIONID=abc\r\nConnection: close\r\n\r\n",
                status_line,
                body.len()
            );
            stream.write_all(head.as_bytes()).unwrap();
            stream.write_all(body.as_bytes()).unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_large_body_is_read_whole() {
        let body = "x".repeat(11 * 1024 * 1024);
        let base = serve_once("200 OK", body.clone());
        let backend = UreqBackend::new(false).unwrap();

        let response = backend
            .send(&HttpRequest::new(Method::Get, format!("{}/rest/api/2/search", base), None))
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body.len(), body.len());
        assert_eq!(response.header_values("Set-Cookie"), vec!["JSESSIONID=abc"]);
    }

    #[test]
    fn test_error_status_is_a_response() {
        let base = serve_once("404 Not Found", "{\"errorMessages\":[]}".to_string());
        let backend = UreqBackend::new(false).unwrap();

        let response = backend
            .send(&HttpRequest::new(Method::Get, format!("{}/rest/api/2/issue/X-1", base), None))
            .unwrap();

        assert_eq!(response.status, 404);
        assert_eq!(response.status_text, "Not Found");
        assert_eq!(response.body, "{\"errorMessages\":[]}");
    }
}
