//! Session acquisition.
//!
//! Two ways to obtain a [`Session`]:
//!
//! - an existing access token plus instance URL, used as-is
//! - the OAuth 2.0 username-password flow against the login host
//!   (`POST {login_url}/services/oauth2/token`)

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

/// Default login host for production orgs.
pub const DEFAULT_LOGIN_URL: &str = "https://login.salesforce.com";

/// Authenticated session used for every API call.
#[derive(Clone)]
pub struct Session {
    pub instance_url: String,
    pub access_token: String,
}

impl Session {
    pub fn new(instance_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            instance_url: instance_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("instance_url", &self.instance_url)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Inputs for the username-password OAuth flow.
#[derive(Clone)]
pub struct PasswordCredentials {
    pub login_url: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub username: String,
    pub password: String,
    /// Appended to the password when present
    pub security_token: Option<String>,
}

impl std::fmt::Debug for PasswordCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordCredentials")
            .field("login_url", &self.login_url)
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// How to authenticate.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Reuse an access token issued elsewhere
    AccessToken(Session),
    /// Log in with the username-password flow
    Password(PasswordCredentials),
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    instance_url: String,
}

#[derive(Deserialize)]
struct TokenError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Obtain a session for `credentials`.
pub async fn login(http: &reqwest::Client, credentials: &Credentials) -> Result<Session> {
    match credentials {
        Credentials::AccessToken(session) => {
            info!("Using existing session for {}", session.instance_url);
            Ok(session.clone())
        }
        Credentials::Password(password) => password_login(http, password).await,
    }
}

async fn password_login(http: &reqwest::Client, creds: &PasswordCredentials) -> Result<Session> {
    let url = format!(
        "{}/services/oauth2/token",
        creds.login_url.trim_end_matches('/')
    );
    let password = format!(
        "{}{}",
        creds.password,
        creds.security_token.as_deref().unwrap_or_default()
    );

    let mut form = vec![
        ("grant_type", "password"),
        ("client_id", creds.client_id.as_str()),
        ("username", creds.username.as_str()),
        ("password", password.as_str()),
    ];
    if let Some(secret) = creds.client_secret.as_deref() {
        form.push(("client_secret", secret));
    }

    let response = http
        .post(&url)
        .form(&form)
        .send()
        .await
        .with_context(|| format!("Failed to reach login endpoint: {url}"))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .with_context(|| format!("Failed to read login response from: {url}"))?;

    if !status.is_success() {
        let reason = serde_json::from_str::<TokenError>(&body)
            .map(|e| match e.error_description {
                Some(description) => format!("{}: {description}", e.error),
                None => e.error,
            })
            .unwrap_or(body);
        anyhow::bail!("Failed to authenticate as {} ({status}): {reason}", creds.username);
    }

    let token: TokenResponse =
        serde_json::from_str(&body).context("Failed to parse login response")?;

    info!(
        "Authenticated as {} against {}",
        creds.username, token.instance_url
    );

    Ok(Session::new(token.instance_url, token.access_token))
}
