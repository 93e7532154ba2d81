//! REST client and sObject Collections dispatcher.

use crate::auth::{login, Credentials, Session};
use anyhow::{Context, Result};
use crm_bulk::{CollectionDispatcher, Payload, RawResponse};
use crm_core::{is_api_name, BulkError, Operation};
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// API version used when the configuration does not name one.
pub const DEFAULT_API_VERSION: &str = "59.0";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const COLLECTIONS_PATH: &str = "/composite/sobjects";

/// Connection settings passed explicitly to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// REST API version without the leading `v` (e.g. `59.0`)
    pub api_version: String,

    /// Applies to every request; expiry surfaces as a transport error
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Method, path and parameters for one collection call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub method: Method,
    /// Path below `/services/data/v{version}`
    pub path: String,
    pub query: Vec<(&'static str, String)>,
    /// Delete addresses records through the query string and sends no body
    pub send_body: bool,
}

/// Resolve the route for `operation`.
///
/// | operation | method | path |
/// |-----------|--------|------|
/// | insert | POST | `/composite/sobjects` |
/// | update | PATCH | `/composite/sobjects` |
/// | delete | DELETE | `/composite/sobjects?ids=...&allOrNone=false` |
/// | upsert | PATCH | `/composite/sobjects/{type}/{externalIdField}` |
pub fn route_for(operation: Operation, payload: &Payload) -> Result<Route, BulkError> {
    if payload.is_empty() {
        return Err(BulkError::invalid_argument("No records in payload"));
    }
    if !is_api_name(&payload.object_name) {
        return Err(BulkError::invalid_argument(format!(
            "Invalid object name '{}'",
            payload.object_name
        )));
    }

    let route = match operation {
        Operation::Insert => Route {
            method: Method::POST,
            path: COLLECTIONS_PATH.to_string(),
            query: Vec::new(),
            send_body: true,
        },
        Operation::Update => Route {
            method: Method::PATCH,
            path: COLLECTIONS_PATH.to_string(),
            query: Vec::new(),
            send_body: true,
        },
        Operation::Delete => Route {
            method: Method::DELETE,
            path: COLLECTIONS_PATH.to_string(),
            query: vec![
                ("ids", payload.ids().join(",")),
                ("allOrNone", payload.all_or_none.to_string()),
            ],
            send_body: false,
        },
        Operation::Upsert => {
            let field = payload.external_id_field.as_deref().ok_or_else(|| {
                BulkError::configuration("External ID field is required for upsert")
            })?;
            if !is_api_name(field) {
                return Err(BulkError::configuration(format!(
                    "Invalid external ID field '{field}'"
                )));
            }
            Route {
                method: Method::PATCH,
                path: format!("{COLLECTIONS_PATH}/{}/{field}", payload.object_name),
                query: Vec::new(),
                send_body: true,
            }
        }
    };

    Ok(route)
}

/// Extract the per-record result list from a collection response body.
///
/// The endpoint answers with a bare array; an object wrapping the list in
/// `results` is accepted as well.
pub fn parse_collection_response(body: Value) -> Result<Vec<RawResponse>, BulkError> {
    match body {
        Value::Array(results) => Ok(results),
        Value::Object(mut object) => match object.remove("results") {
            Some(Value::Array(results)) => Ok(results),
            _ => Err(BulkError::transport(
                "Unexpected collection response: object without a 'results' list",
            )),
        },
        other => Err(BulkError::transport(format!(
            "Unexpected collection response: {other}"
        ))),
    }
}

/// Summarize an error body such as `[{"errorCode": "...", "message": "..."}]`.
pub(crate) fn describe_error_body(body: &str) -> String {
    let describe = |error: &Value| -> Option<String> {
        let message = error.get("message")?.as_str()?;
        Some(match error.get("errorCode").and_then(Value::as_str) {
            Some(code) => format!("{code}: {message}"),
            None => message.to_string(),
        })
    };

    let described = match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(errors)) => errors.iter().filter_map(describe).collect::<Vec<_>>(),
        Ok(error @ Value::Object(_)) => describe(&error).into_iter().collect(),
        _ => Vec::new(),
    };

    if described.is_empty() {
        body.trim().chars().take(500).collect()
    } else {
        described.join("; ")
    }
}

/// Client for the CRM REST API.
///
/// Implements [`CollectionDispatcher`] so it can drive a
/// [`crm_bulk::BulkOrchestrator`] directly.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    session: Session,
    config: ClientConfig,
}

impl RestClient {
    /// Build a client around an existing session.
    pub fn new(session: Session, config: ClientConfig) -> Result<Self> {
        Ok(Self {
            http: build_http(&config)?,
            session,
            config,
        })
    }

    /// Authenticate with `credentials` and build a client for the session.
    pub async fn connect(credentials: &Credentials, config: ClientConfig) -> Result<Self> {
        let http = build_http(&config)?;
        let session = login(&http, credentials)
            .await
            .context("Failed to connect to the CRM")?;
        Ok(Self {
            http,
            session,
            config,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Absolute URL of a path below the versioned data API.
    pub fn data_url(&self, path: &str) -> String {
        format!(
            "{}/services/data/v{}{}",
            self.session.instance_url, self.config.api_version, path
        )
    }

    /// Absolute URL of a server-relative path such as `nextRecordsUrl`.
    pub(crate) fn instance_url(&self, path: &str) -> String {
        format!("{}{}", self.session.instance_url, path)
    }

    pub(crate) fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.http.get(url).bearer_auth(&self.session.access_token)
    }
}

fn build_http(config: &ClientConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .context("Failed to build HTTP client")
}

#[async_trait::async_trait]
impl CollectionDispatcher for RestClient {
    async fn dispatch(
        &self,
        payload: &Payload,
        operation: Operation,
    ) -> Result<Vec<RawResponse>, BulkError> {
        let route = route_for(operation, payload)?;
        let url = self.data_url(&route.path);
        debug!(
            "{} {} ({} records, operation = {})",
            route.method,
            url,
            payload.len(),
            operation
        );

        let mut request = self
            .http
            .request(route.method.clone(), &url)
            .bearer_auth(&self.session.access_token);
        if !route.query.is_empty() {
            request = request.query(&route.query);
        }
        if route.send_body {
            request = request.json(payload);
        }

        let response = request.send().await.map_err(|e| {
            BulkError::transport(format!("{} {url} failed: {e}", route.method))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            BulkError::transport(format!("Failed to read response from {url}: {e}"))
        })?;

        if !status.is_success() {
            return Err(BulkError::transport(format!(
                "{} {url} returned {status}: {}",
                route.method,
                describe_error_body(&body)
            )));
        }

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            BulkError::transport(format!("Failed to decode response from {url}: {e}"))
        })?;

        parse_collection_response(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_bulk::build_payload;
    use crm_core::Record;
    use serde_json::json;

    fn batch() -> Vec<Record> {
        vec![
            [("Id", "001A"), ("Name", "A"), ("Ext__c", "X1")].into_iter().collect(),
            [("Id", "001B"), ("Name", "B"), ("Ext__c", "X2")].into_iter().collect(),
        ]
    }

    fn payload(operation: Operation) -> Payload {
        build_payload(&batch(), "Account", operation, Some("Ext__c")).unwrap()
    }

    #[test]
    fn test_route_insert() {
        let route = route_for(Operation::Insert, &payload(Operation::Insert)).unwrap();
        assert_eq!(route.method, Method::POST);
        assert_eq!(route.path, "/composite/sobjects");
        assert!(route.query.is_empty());
        assert!(route.send_body);
    }

    #[test]
    fn test_route_update() {
        let route = route_for(Operation::Update, &payload(Operation::Update)).unwrap();
        assert_eq!(route.method, Method::PATCH);
        assert_eq!(route.path, "/composite/sobjects");
        assert!(route.send_body);
    }

    #[test]
    fn test_route_delete_uses_ids_and_no_body() {
        let route = route_for(Operation::Delete, &payload(Operation::Delete)).unwrap();
        assert_eq!(route.method, Method::DELETE);
        assert_eq!(route.path, "/composite/sobjects");
        assert_eq!(
            route.query,
            vec![
                ("ids", "001A,001B".to_string()),
                ("allOrNone", "false".to_string())
            ]
        );
        assert!(!route.send_body);
    }

    #[test]
    fn test_route_upsert_addresses_external_id() {
        let route = route_for(Operation::Upsert, &payload(Operation::Upsert)).unwrap();
        assert_eq!(route.method, Method::PATCH);
        assert_eq!(route.path, "/composite/sobjects/Account/Ext__c");
        assert!(route.send_body);
    }

    #[test]
    fn test_route_upsert_without_field() {
        let mut upsert = payload(Operation::Upsert);
        upsert.external_id_field = None;
        assert!(matches!(
            route_for(Operation::Upsert, &upsert),
            Err(BulkError::Configuration(_))
        ));
    }

    #[test]
    fn test_route_rejects_names_unsafe_in_path() {
        let mut upsert = payload(Operation::Upsert);
        upsert.external_id_field = Some("Ext__c/../x".to_string());
        assert!(matches!(
            route_for(Operation::Upsert, &upsert),
            Err(BulkError::Configuration(_))
        ));

        let mut insert = payload(Operation::Insert);
        insert.object_name = "Account?x=1".to_string();
        assert!(matches!(
            route_for(Operation::Insert, &insert),
            Err(BulkError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_route_empty_payload() {
        let empty = build_payload(&[], "Account", Operation::Insert, None).unwrap();
        assert!(matches!(
            route_for(Operation::Insert, &empty),
            Err(BulkError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_parse_collection_response_shapes() {
        let list = json!([{"id": "a", "success": true, "errors": []}]);
        assert_eq!(parse_collection_response(list.clone()).unwrap().len(), 1);

        let wrapped = json!({"results": list});
        assert_eq!(parse_collection_response(wrapped).unwrap().len(), 1);

        assert!(parse_collection_response(json!({"done": true})).is_err());
        assert!(parse_collection_response(json!("nope")).is_err());
    }

    #[test]
    fn test_describe_error_body() {
        assert_eq!(
            describe_error_body(r#"[{"message":"Session expired or invalid","errorCode":"INVALID_SESSION_ID"}]"#),
            "INVALID_SESSION_ID: Session expired or invalid"
        );
        assert_eq!(describe_error_body(r#"{"message":"boom"}"#), "boom");
        assert_eq!(describe_error_body("  plain text  "), "plain text");
    }

    #[test]
    fn test_data_url() {
        let client = RestClient::new(
            Session::new("https://example.my.salesforce.com/", "t"),
            ClientConfig::default(),
        )
        .unwrap();
        assert_eq!(
            client.data_url("/composite/sobjects"),
            "https://example.my.salesforce.com/services/data/v59.0/composite/sobjects"
        );
    }
}
