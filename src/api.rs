use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{debug, info};

use crate::config::ServerSettings;
use crate::tags::model::TagRecord;

pub const TAG_ENDPOINTS: [&str; 4] = ["tags/list", "tag/list", "tags", "tag"];

pub const WRAPPER_FIELDS: [&str; 5] = ["data", "tags", "items", "list", "results"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn is_unauthorized(&self) -> bool {
        self.status == 401 || self.status == 403
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

#[allow(async_fn_in_trait)]
pub trait HttpTransport {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, TransportError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchErrorKind {
    Network,
    Shape,
    Auth,
    Unknown,
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("Blinko server address is not configured")]
    NotConfigured,
    #[error("Blinko auth token is not configured")]
    MissingToken,
    #[error("all tag endpoints failed: {last}")]
    EndpointsExhausted { last: String, unauthorized: bool },
    #[error("unexpected tag list response: {found}")]
    Shape { found: &'static str },
    #[error("could not decode tag list: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::MissingToken => FetchErrorKind::Auth,
            FetchError::EndpointsExhausted {
                unauthorized: true, ..
            } => FetchErrorKind::Auth,
            FetchError::EndpointsExhausted { .. } => FetchErrorKind::Network,
            FetchError::Shape { .. } | FetchError::Decode(_) => FetchErrorKind::Shape,
            FetchError::NotConfigured => FetchErrorKind::Unknown,
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait TagSource {
    async fn fetch_tags(&self) -> Result<Vec<TagRecord>, FetchError>;
}

pub struct BlinkoClient<T> {
    transport: T,
    settings: ServerSettings,
}

impl<T: HttpTransport> BlinkoClient<T> {
    pub fn new(settings: ServerSettings, transport: T) -> Self {
        Self {
            transport,
            settings,
        }
    }
}

impl<T: HttpTransport> TagSource for BlinkoClient<T> {
    async fn fetch_tags(&self) -> Result<Vec<TagRecord>, FetchError> {
        let target = self.settings.target_url.trim();
        if target.is_empty() {
            return Err(FetchError::NotConfigured);
        }
        let auth = normalize_auth_token(&self.settings.auth_key);
        if auth.is_empty() {
            return Err(FetchError::MissingToken);
        }

        let base = normalize_api_base(target);
        let headers = [
            ("Authorization", auth.as_str()),
            ("Content-Type", "application/json"),
        ];

        let mut last = None;
        let mut unauthorized = false;
        for path in TAG_ENDPOINTS {
            let endpoint = format!("{base}/{path}");
            match self.transport.get(&endpoint, &headers).await {
                Ok(response) if response.is_success() => {
                    let records = parse_tag_response(&response.body)?;
                    info!(%endpoint, count = records.len(), "fetched tags");
                    return Ok(records);
                }
                Ok(response) => {
                    unauthorized |= response.is_unauthorized();
                    let mut failure =
                        format!("{endpoint}: {} {}", response.status, response.status_text);
                    if !response.body.is_empty() {
                        failure.push_str(" - ");
                        failure.push_str(&response.body);
                    }
                    debug!(%failure, "tag endpoint rejected request");
                    last = Some(failure);
                }
                Err(err) => {
                    debug!(%endpoint, error = %err, "tag endpoint unreachable");
                    last = Some(format!("{endpoint}: {err}"));
                }
            }
        }

        Err(FetchError::EndpointsExhausted {
            last: last.unwrap_or_else(|| "unknown".to_string()),
            unauthorized,
        })
    }
}

pub fn parse_tag_response(body: &str) -> Result<Vec<TagRecord>, FetchError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut fields) => WRAPPER_FIELDS
            .iter()
            .find_map(|field| match fields.remove(*field) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or(FetchError::Shape { found: "object" })?,
        other => {
            return Err(FetchError::Shape {
                found: json_type_name(&other),
            })
        }
    };
    items
        .into_iter()
        .map(serde_json::from_value::<TagRecord>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| FetchError::Decode(e.to_string()))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn split_url(url: &str) -> Option<(&str, &str)> {
    static RE_URL: OnceLock<Regex> = OnceLock::new();
    let re_url = RE_URL.get_or_init(|| {
        Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*://[^/?#]+)([^?#]*)").expect("valid url regex")
    });
    let caps = re_url.captures(url)?;
    let origin = caps.get(1)?.as_str();
    let path = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
    Some((origin, path))
}

pub fn clean_domain_url(url: &str) -> String {
    let trimmed = url.trim();
    match split_url(trimmed) {
        Some((origin, _)) => origin.to_string(),
        None => trimmed.trim_end_matches('/').to_string(),
    }
}

/// API root for a configured URL.
///
/// The options page stores whatever the user pasted, often a full endpoint
/// such as `https://host/api/v1/note/upsert`. Everything after `/api/v1` is
/// dropped; a URL without it gets `/api/v1` appended to its origin.
pub fn normalize_api_base(url: &str) -> String {
    let trimmed = url.trim();
    let Some((origin, path)) = split_url(trimmed) else {
        return format!("{}/api/v1", clean_domain_url(trimmed));
    };
    let segments: Vec<&str> = path.split('/').collect();
    match segments
        .windows(2)
        .position(|pair| pair[0] == "api" && pair[1] == "v1")
    {
        Some(pos) => format!("{origin}{}", segments[..pos + 2].join("/")),
        None => format!("{}/api/v1", clean_domain_url(trimmed)),
    }
}

pub fn normalize_auth_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed
        .get(..7)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("bearer "))
    {
        trimmed.to_string()
    } else {
        format!("Bearer {trimmed}")
    }
}
