//! Raw REST requests and opening issues in a browser.

use super::*;
use crate::errors;
use anyhow::bail;
use std::process::{Command, Stdio};
use std::str::FromStr;

/// Browser URL for `issue`.
pub fn browse_url(settings: &Settings, issue: &str) -> Result<String> {
    settings
        .browse_url(issue)
        .ok_or_else(|| errors::missing_endpoint().into())
}

/// Open `url` with the platform's opener, without waiting for it.
pub fn open_in_browser(url: &str) -> Result<()> {
    let Some(opener) = ["xdg-open", "open"]
        .into_iter()
        .find(|cmd| which::which(cmd).is_ok())
    else {
        bail!(
            "No browser opener found (tried xdg-open and open)\n\n\
             Open the issue manually:\n  {}",
            url
        );
    };

    Command::new(opener)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("Failed to run {}", opener))?;
    Ok(())
}

impl<B: HttpBackend> CommandExecutor<B> {
    /// Send an arbitrary request and render the response with `debug`.
    ///
    /// `uri` may be a path below the endpoint or a full URL. A body that is
    /// not JSON is returned verbatim.
    pub fn request(&mut self, method: &str, uri: &str, data: Option<&str>) -> Result<String> {
        let method = Method::from_str(method).map_err(anyhow::Error::msg)?;
        let uri = if uri.starts_with("http://") || uri.starts_with("https://") {
            uri.to_string()
        } else {
            self.client.url(uri)
        };

        let response = self.client.request(method, &uri, data)?;
        ensure_success(method, &uri, &response)?;
        match decode(&uri, &response) {
            Ok(Value::Null) => Ok(String::new()),
            Ok(value) => self.render("debug", &TemplateContext::from_value(value)),
            Err(_) => Ok(response.body),
        }
    }
}
