//! Uniform backend response envelope
//!
//! Every read endpoint the dashboard consumes wraps its payload in
//! `{ code, message, data, total }`, where `code == 0` signals
//! application-level success regardless of HTTP status.

use serde::Deserialize;

use crate::{Error, Result};

/// Response wrapper returned by every backend endpoint
///
/// `total` is only populated by paginated list endpoints; `message` defaults
/// to "ok" on the backend but is treated as optional here so a terse error
/// body still decodes.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub total: Option<i64>,
}

impl<T> Envelope<T> {
    /// True when the backend marked the response as successful
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }

    /// Unwrap the payload, converting `code != 0` (or a success envelope
    /// with no `data` field) into an error
    pub fn into_result(self) -> Result<T> {
        if self.code != 0 {
            return Err(Error::Backend {
                code: self.code,
                message: self
                    .message
                    .unwrap_or_else(|| "unspecified backend error".to_string()),
            });
        }
        self.data
            .ok_or_else(|| Error::Internal("success envelope missing data field".to_string()))
    }
}
