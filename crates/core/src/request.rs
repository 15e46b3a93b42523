//! Scrape submission payloads and their normalisation.
//!
//! [`SubmitScrape`] is what a client sends; it is deliberately loose
//! (the location may be a number or a numeric string, the headless flag
//! follows a truthy/falsy convention). [`SubmitScrape::normalize`] turns it
//! into a validated [`ScrapeRequest`] or a [`CoreError::Validation`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::ValidateUrl;

use crate::error::CoreError;
use crate::locations::{self, Location, DEFAULT_LOCATION_CODE};

/// Validation message for a missing or blank URL.
pub const MSG_URL_REQUIRED: &str = "URL is required";

/// Validation message for a URL that does not parse.
pub const MSG_INVALID_URL: &str = "invalid URL";

/// Validation message for a location code outside the registry.
pub const MSG_INVALID_LOCATION: &str = "invalid location";

/// Raw scrape submission as received from a client.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitScrape {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_location")]
    pub location: Value,
    #[serde(default = "default_headless")]
    pub headless: Value,
}

fn default_location() -> Value {
    Value::from(DEFAULT_LOCATION_CODE)
}

fn default_headless() -> Value {
    Value::Bool(true)
}

impl SubmitScrape {
    /// Build a submission with the defaults a client gets when it only sends a URL.
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            location: default_location(),
            headless: default_headless(),
        }
    }

    /// Validate the submission and resolve its location.
    pub fn normalize(&self) -> Result<ScrapeRequest, CoreError> {
        let url = self
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .ok_or_else(|| CoreError::Validation(MSG_URL_REQUIRED.into()))?;

        if !url.validate_url() {
            return Err(CoreError::Validation(MSG_INVALID_URL.into()));
        }

        let location = location_code(&self.location)
            .and_then(locations::resolve)
            .ok_or_else(|| CoreError::Validation(MSG_INVALID_LOCATION.into()))?;

        Ok(ScrapeRequest {
            url,
            location,
            headless: is_truthy(&self.headless),
        })
    }
}

/// A validated scrape request. Immutable once attached to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapeRequest {
    pub url: String,
    pub location: Location,
    pub headless: bool,
}

/// Extract an integer location code from a number or numeric string.
fn location_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Interpret a loosely typed flag.
///
/// `null`, `false`, `0` and the empty string are falsy; everything else,
/// including strings such as `"false"` or `"0"`, is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
