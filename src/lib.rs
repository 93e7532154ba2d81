//! crm-sync Library
//!
//! Bulk CSV uploads to Salesforce through the sObject Collections API, and
//! SOQL exports back to CSV.
//!
//! # Workspace Crates
//!
//! - `crm_core` - records, operations and the bulk error type
//! - `crm_bulk` - chunking, payload building, dispatch and reconciliation
//! - `crm_client` - REST client: login, collection dispatch, queries
//! - `crm_sync_csv` - CSV input, exports and upload result files
//!
//! # CLI Usage
//!
//! ```bash
//! # Insert accounts, mapping columns interactively
//! crm-sync upload accounts.csv Account
//!
//! # Upsert by external id with a preset mapping
//! crm-sync upload accounts.csv Account --operation upsert \
//!   --external-id-field External_Id__c --mapping-file mapping.yaml
//!
//! # Export contacts
//! crm-sync query "SELECT Id, LastName, Account.Name FROM Contact" contacts.csv
//! ```

use clap::Parser;
use crm_client::{Credentials, PasswordCredentials, Session};
use crm_core::BulkError;

pub mod config;
pub mod logging;
pub mod mapping;
pub mod query;
pub mod upload;

// Re-export workspace crates for convenience
pub use crm_bulk as bulk;
pub use crm_client as client;
pub use crm_sync_csv as csv;

/// Connection options shared by every command.
#[derive(Parser, Clone, Default)]
pub struct CrmOpts {
    /// Instance URL for an existing session (e.g. https://example.my.salesforce.com)
    #[arg(long, env = "SALESFORCE_INSTANCE_URL")]
    pub instance_url: Option<String>,

    /// Access token for an existing session; takes precedence over password login
    #[arg(long, env = "SALESFORCE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Login host for password authentication (default from config)
    #[arg(long, env = "SALESFORCE_LOGIN_URL")]
    pub login_url: Option<String>,

    /// Username for password authentication
    #[arg(long, env = "SALESFORCE_USERNAME")]
    pub username: Option<String>,

    /// Password for password authentication
    #[arg(long, env = "SALESFORCE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Security token appended to the password
    #[arg(long, env = "SALESFORCE_SECURITY_TOKEN", hide_env_values = true)]
    pub security_token: Option<String>,

    /// Connected app consumer key
    #[arg(long, env = "SALESFORCE_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Connected app consumer secret
    #[arg(long, env = "SALESFORCE_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,
}

impl CrmOpts {
    /// Resolve the options into [`Credentials`].
    ///
    /// An access token wins; otherwise username, password and client id are
    /// required for the password flow.
    pub fn credentials(&self, default_login_url: &str) -> Result<Credentials, BulkError> {
        if let Some(token) = non_empty(&self.access_token) {
            let instance_url = non_empty(&self.instance_url).ok_or_else(|| {
                BulkError::configuration("--instance-url is required with --access-token")
            })?;
            return Ok(Credentials::AccessToken(Session::new(instance_url, token)));
        }

        let missing: Vec<&str> = [
            ("--username", &self.username),
            ("--password", &self.password),
            ("--client-id", &self.client_id),
        ]
        .into_iter()
        .filter(|(_, value)| non_empty(value).is_none())
        .map(|(flag, _)| flag)
        .collect();

        match (
            non_empty(&self.username),
            non_empty(&self.password),
            non_empty(&self.client_id),
        ) {
            (Some(username), Some(password), Some(client_id)) => {
                Ok(Credentials::Password(PasswordCredentials {
                    login_url: non_empty(&self.login_url)
                        .unwrap_or(default_login_url)
                        .to_string(),
                    client_id: client_id.to_string(),
                    client_secret: non_empty(&self.client_secret).map(str::to_string),
                    username: username.to_string(),
                    password: password.to_string(),
                    security_token: non_empty(&self.security_token).map(str::to_string),
                }))
            }
            _ => Err(BulkError::configuration(format!(
                "No credentials: provide --access-token with --instance-url, or {} for password login",
                missing.join(", ")
            ))),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN: &str = "https://login.salesforce.com";

    #[test]
    fn test_access_token_takes_precedence() {
        let opts = CrmOpts {
            instance_url: Some("https://example.my.salesforce.com/".into()),
            access_token: Some("00Dtoken".into()),
            username: Some("user@example.com".into()),
            password: Some("pw".into()),
            client_id: Some("client".into()),
            ..Default::default()
        };

        match opts.credentials(LOGIN).unwrap() {
            Credentials::AccessToken(session) => {
                assert_eq!(session.instance_url, "https://example.my.salesforce.com");
                assert_eq!(session.access_token, "00Dtoken");
            }
            other => panic!("unexpected credentials: {other:?}"),
        }
    }

    #[test]
    fn test_token_without_instance_url() {
        let opts = CrmOpts {
            access_token: Some("00Dtoken".into()),
            ..Default::default()
        };
        assert!(matches!(
            opts.credentials(LOGIN),
            Err(BulkError::Configuration(_))
        ));
    }

    #[test]
    fn test_password_credentials() {
        let opts = CrmOpts {
            username: Some("user@example.com".into()),
            password: Some("pw".into()),
            security_token: Some("tok".into()),
            client_id: Some("client".into()),
            ..Default::default()
        };

        match opts.credentials(LOGIN).unwrap() {
            Credentials::Password(creds) => {
                assert_eq!(creds.login_url, LOGIN);
                assert_eq!(creds.security_token.as_deref(), Some("tok"));
                assert!(creds.client_secret.is_none());
            }
            other => panic!("unexpected credentials: {other:?}"),
        }
    }

    #[test]
    fn test_login_url_override() {
        let opts = CrmOpts {
            login_url: Some("https://test.salesforce.com".into()),
            username: Some("u".into()),
            password: Some("p".into()),
            client_id: Some("c".into()),
            ..Default::default()
        };
        match opts.credentials(LOGIN).unwrap() {
            Credentials::Password(creds) => assert_eq!(creds.login_url, "https://test.salesforce.com"),
            other => panic!("unexpected credentials: {other:?}"),
        }
    }

    #[test]
    fn test_missing_credentials_are_named() {
        let opts = CrmOpts {
            username: Some("user@example.com".into()),
            password: Some("  ".into()),
            ..Default::default()
        };
        let err = opts.credentials(LOGIN).unwrap_err().to_string();
        assert!(err.contains("--password"), "{err}");
        assert!(err.contains("--client-id"), "{err}");
        assert!(!err.contains("--username"), "{err}");
    }
}
