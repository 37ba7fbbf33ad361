//! Geocoding service client.
//!
//! The core never performs I/O itself: [`GeocodingClient`] builds the request
//! URL and turns whatever the shell brought back into a [`Place`] or a
//! [`LookupError`]. The HTTP round-trip goes through the `crux_http`
//! capability (see [`crate::capabilities::http`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::capabilities::HttpError;
use crate::config::Config;
use crate::model::{Address, Coordinates, Place};
use crate::ErrorKind;

pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error.";

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum LookupError {
    /// The service answered but rejected or could not interpret the address.
    #[error("{message}")]
    Geocoding {
        status: GeocodeStatus,
        message: String,
    },

    /// The service could not be reached or answered with something unusable.
    #[error("{message}")]
    Transport { message: String },
}

impl LookupError {
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Geocoding { message, .. } | Self::Transport { message } => message,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Geocoding { .. } => ErrorKind::Geocoding,
            Self::Transport { .. } => ErrorKind::Transport,
        }
    }
}

impl From<HttpError> for LookupError {
    fn from(e: HttpError) -> Self {
        Self::Transport {
            message: e.to_string(),
        }
    }
}

// --- Wire schema ---

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GeocodeStatus {
    Ok,
    ZeroResults,
    OverDailyLimit,
    OverQueryLimit,
    RequestDenied,
    InvalidRequest,
    UnknownError,
    Other(String),
}

impl GeocodeStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ok => "OK",
            Self::ZeroResults => "ZERO_RESULTS",
            Self::OverDailyLimit => "OVER_DAILY_LIMIT",
            Self::OverQueryLimit => "OVER_QUERY_LIMIT",
            Self::RequestDenied => "REQUEST_DENIED",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::UnknownError => "UNKNOWN_ERROR",
            Self::Other(s) => s,
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl From<String> for GeocodeStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "OK" => Self::Ok,
            "ZERO_RESULTS" => Self::ZeroResults,
            "OVER_DAILY_LIMIT" => Self::OverDailyLimit,
            "OVER_QUERY_LIMIT" => Self::OverQueryLimit,
            "REQUEST_DENIED" => Self::RequestDenied,
            "INVALID_REQUEST" => Self::InvalidRequest,
            "UNKNOWN_ERROR" => Self::UnknownError,
            _ => Self::Other(s),
        }
    }
}

impl From<GeocodeStatus> for String {
    fn from(status: GeocodeStatus) -> Self {
        status.as_str().to_owned()
    }
}

impl fmt::Display for GeocodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResponse {
    pub status: GeocodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub formatted_address: String,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: Degrees,
    pub lng: Degrees,
}

/// Coordinate as sent on the wire; documented as a string, numbers are
/// accepted too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Degrees {
    Number(f64),
    Text(String),
}

impl Degrees {
    fn value(&self) -> Result<f64, HttpError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s.trim().parse().map_err(|_| HttpError::InvalidResponse {
                reason: format!("coordinate '{s}' is not a number"),
            }),
        }
    }
}

// --- Client ---

#[derive(Clone, Copy, Debug)]
pub struct GeocodingClient<'a> {
    config: &'a Config,
}

impl<'a> GeocodingClient<'a> {
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// `GET <endpoint>?address=<address>&key=<key>`, form-urlencoded.
    #[must_use]
    pub fn request_url(&self, address: &Address) -> Url {
        let mut url = self.config.endpoint().clone();
        url.query_pairs_mut()
            .append_pair("address", address.as_str())
            .append_pair("key", self.config.api_key().expose());
        url
    }

    /// Maps a raw HTTP answer onto the lookup outcome.
    #[instrument(level = "debug", skip(body), fields(len = body.len()))]
    pub fn decode(status: u16, body: &[u8]) -> Result<Place, LookupError> {
        if !(200..300).contains(&status) {
            return Err(HttpError::Status { status }.into());
        }

        let response: GeocodeResponse =
            serde_json::from_slice(body).map_err(|e| HttpError::InvalidResponse {
                reason: e.to_string(),
            })?;

        Self::interpret(response)
    }

    /// Maps a well-formed service answer onto the lookup outcome.
    pub fn interpret(response: GeocodeResponse) -> Result<Place, LookupError> {
        let GeocodeResponse {
            status,
            error_message,
            results,
        } = response;

        if !status.is_ok() {
            return Err(LookupError::Geocoding {
                status,
                message: error_message.unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.into()),
            });
        }

        let Some(first) = results.into_iter().next() else {
            return Err(LookupError::Geocoding {
                status,
                message: error_message.unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.into()),
            });
        };

        let location = &first.geometry.location;
        let coordinates = Coordinates::new(location.lat.value()?, location.lng.value()?)
            .map_err(|e| HttpError::InvalidResponse {
                reason: e.to_string(),
            })?;

        Ok(Place::new(first.formatted_address, coordinates))
    }
}
