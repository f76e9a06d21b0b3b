//! Login, logout and where passwords come from.

use super::*;
use crate::errors;
use crate::transport::{CredentialSource, Credentials, TransportError};
use anyhow::anyhow;
use tracing::warn;

/// Credentials from the configured user plus `JIRA_PASSWORD` or a prompt.
pub struct PromptCredentials {
    user: Option<String>,
    password: Option<String>,
    prompter: Box<dyn Prompter>,
}

impl PromptCredentials {
    pub fn new(user: Option<String>, prompter: Box<dyn Prompter>) -> Self {
        Self {
            user,
            password: std::env::var("JIRA_PASSWORD").ok().filter(|p| !p.is_empty()),
            prompter,
        }
    }

    /// Use `password` instead of reading `JIRA_PASSWORD` or prompting.
    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password;
        self
    }
}

impl CredentialSource for PromptCredentials {
    fn credentials(&mut self) -> Result<Credentials> {
        let user = self.user.clone().ok_or_else(errors::missing_user)?;
        let password = match &self.password {
            Some(password) => password.clone(),
            None => self
                .prompter
                .ask_secret(&format!("Jira password [{}]", user))
                .filter(|p| !p.is_empty())
                .ok_or_else(|| anyhow!("No password entered"))?,
        };
        Ok(Credentials { user, password })
    }
}

impl<B: HttpBackend> CommandExecutor<B> {
    /// Force a fresh session login.
    pub fn login(&mut self) -> Result<()> {
        match self.client.login() {
            Ok(()) => Ok(()),
            Err(TransportError::LoginFailed { user, status, .. }) => {
                Err(errors::login_failed(&user, status).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// End the server session and remove the cookie file.
    pub fn logout(&mut self) -> Result<()> {
        let response = self.client.logout()?;
        if !response.is_success() && response.status != 401 {
            warn!("Logout returned {} {}", response.status, response.status_text);
        }
        Ok(())
    }
}
