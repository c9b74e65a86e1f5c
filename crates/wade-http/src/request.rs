#![forbid(unsafe_code)]

//! Requests, responses, captured records and request identity.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::TransportError;

/// Header multimap. Names are kept as given.
pub type Headers = BTreeMap<String, Vec<String>>;

/// An outgoing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub body: String,
}

impl Request {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Headers::new(),
            body: String::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new("POST", url).with_body(body)
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.entry(name.into()).or_default().push(value.into());
        self
    }

    /// Cache key for this request. Headers do not take part.
    #[must_use]
    pub fn identity(&self) -> String {
        request_identity(&self.method, &self.url, &self.body)
    }
}

/// `"{METHOD} {url} {fingerprint}"`, where the fingerprint is the lowercase
/// hex SHA-256 of the body, or `-` for an empty body.
#[must_use]
pub fn request_identity(method: &str, url: &str, body: &str) -> String {
    let mut identity = format!("{} {} ", method.to_ascii_uppercase(), url);
    if body.is_empty() {
        identity.push('-');
    } else {
        for byte in Sha256::digest(body.as_bytes()) {
            let _ = write!(identity, "{byte:02x}");
        }
    }
    identity
}

/// A response, live or replayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub body: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: body.into(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.entry(name.into()).or_default().push(value.into());
        self
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First value of header `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }
}

/// One captured exchange: a response, a transport error, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    #[serde(default)]
    pub response: Option<Response>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RequestRecord {
    #[must_use]
    pub fn from_result(result: &Result<Response, TransportError>) -> Self {
        match result {
            Ok(response) => Self {
                response: Some(response.clone()),
                error: None,
            },
            Err(err) => Self {
                response: None,
                error: Some(err.message().to_string()),
            },
        }
    }

    /// Replay the record. A recorded error wins over a recorded response.
    pub fn into_result(self) -> Result<Response, TransportError> {
        match (self.error, self.response) {
            (Some(message), _) => Err(TransportError::Recorded { message }),
            (None, Some(response)) => Ok(response),
            (None, None) => Err(TransportError::Recorded {
                message: "record holds neither a response nor an error".to_string(),
            }),
        }
    }
}
