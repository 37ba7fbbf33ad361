use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{Config, ConfigError};
use crate::{AppError, CoordinateError, ErrorKind};

/// Free-text address, trimmed and guaranteed non-empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// `None` when nothing but whitespace was entered.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Address {
    type Error = &'static str;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw).ok_or("address must not be empty")
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

// --- Coordinates: validated, NaN-safe ---

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(CoordinateError::NonFinite);
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// A successfully geocoded address. Only ever built whole.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Place {
    formatted_address: String,
    coordinates: Coordinates,
}

impl Place {
    #[must_use]
    pub fn new(formatted_address: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            formatted_address: formatted_address.into(),
            coordinates,
        }
    }

    #[must_use]
    pub fn formatted_address(&self) -> &str {
        &self.formatted_address
    }

    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        self.coordinates
    }
}

/// Sequence number tagging each submission and its geocoding callback.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum LookupState {
    #[default]
    Idle,
    Pending {
        address: Address,
        request: RequestId,
    },
    Resolved {
        place: Place,
    },
    Failed {
        kind: ErrorKind,
        message: String,
    },
}

impl LookupState {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IgnoredReason {
    /// Nothing is in flight.
    NotPending,
    /// A newer submission replaced the request this result belongs to.
    Superseded { current: RequestId },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Ignored(IgnoredReason),
}

/// Address lookup lifecycle: `Idle -> Pending -> Resolved | Failed`, re-entered
/// on every submission.
///
/// Each submission gets a fresh [`RequestId`]. Results are applied only while
/// that exact request is pending, so a late answer for an older address can
/// never overwrite a newer submission.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Lookup {
    state: LookupState,
    issued: u64,
}

impl Lookup {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &LookupState {
        &self.state
    }

    /// Submits raw user input. Whitespace-only input is ignored and leaves the
    /// state untouched.
    pub fn submit(&mut self, raw: &str) -> Option<(RequestId, Address)> {
        let address = Address::parse(raw)?;
        let request = self.begin(address.clone());
        Some((request, address))
    }

    /// Enters `Pending` for `address`, dropping any previous place or error.
    pub fn begin(&mut self, address: Address) -> RequestId {
        self.issued += 1;
        let request = RequestId(self.issued);
        self.state = LookupState::Pending { address, request };
        request
    }

    pub fn resolve(&mut self, request: RequestId, place: Place) -> Transition {
        self.settle(request, LookupState::Resolved { place })
    }

    pub fn fail(&mut self, request: RequestId, error: impl Into<AppError>) -> Transition {
        let error = error.into();
        self.settle(
            request,
            LookupState::Failed {
                kind: error.kind,
                message: error.message,
            },
        )
    }

    fn settle(&mut self, request: RequestId, next: LookupState) -> Transition {
        match &self.state {
            LookupState::Pending { request: current, .. } if *current == request => {
                self.state = next;
                Transition::Applied
            }
            LookupState::Pending { request: current, .. } => {
                Transition::Ignored(IgnoredReason::Superseded { current: *current })
            }
            _ => Transition::Ignored(IgnoredReason::NotPending),
        }
    }
}

#[derive(Debug, Default)]
pub struct Model {
    pub config: Option<Config>,
    pub config_error: Option<ConfigError>,
    /// Text currently typed into the address field.
    pub draft: String,
    pub lookup: Lookup,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place() -> Place {
        Place::new(
            "Brandenburger Tor, Pariser Platz, 10117 Berlin, Germany",
            Coordinates::new(52.516_275, 13.377_704).unwrap(),
        )
    }

    fn geocoding_error(message: &str) -> AppError {
        AppError::new(ErrorKind::Geocoding, message)
    }

    #[test]
    fn address_is_trimmed() {
        let address = Address::parse("  10 Downing St \n").unwrap();
        assert_eq!(address.as_str(), "10 Downing St");
    }

    #[test]
    fn blank_address_is_rejected() {
        assert!(Address::parse("").is_none());
        assert!(Address::parse(" \t\n ").is_none());
    }

    #[test]
    fn address_deserialization_rejects_blank() {
        assert!(serde_json::from_str::<Address>("\"   \"").is_err());
        let address: Address = serde_json::from_str("\" Main St \"").unwrap();
        assert_eq!(address.as_str(), "Main St");
    }

    #[test]
    fn coordinates_reject_out_of_range() {
        assert!(matches!(
            Coordinates::new(91.0, 0.0),
            Err(CoordinateError::LatitudeOutOfRange(_))
        ));
        assert!(matches!(
            Coordinates::new(0.0, -181.0),
            Err(CoordinateError::LongitudeOutOfRange(_))
        ));
        assert!(matches!(
            Coordinates::new(f64::NAN, 0.0),
            Err(CoordinateError::NonFinite)
        ));
        assert!(Coordinates::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn starts_idle() {
        assert_eq!(Lookup::new().state(), &LookupState::Idle);
    }

    #[test]
    fn submit_enters_pending() {
        let mut lookup = Lookup::new();
        let (request, address) = lookup.submit("Pariser Platz").unwrap();

        assert_eq!(address.as_str(), "Pariser Platz");
        assert_eq!(
            lookup.state(),
            &LookupState::Pending { address, request }
        );
    }

    #[test]
    fn blank_submit_is_noop() {
        let mut lookup = Lookup::new();
        let (request, _) = lookup.submit("Pariser Platz").unwrap();
        lookup.resolve(request, place());
        let before = lookup.clone();

        assert!(lookup.submit("   ").is_none());
        assert_eq!(lookup, before);
    }

    #[test]
    fn resolve_applies_to_current_request() {
        let mut lookup = Lookup::new();
        let (request, _) = lookup.submit("Pariser Platz").unwrap();

        assert_eq!(lookup.resolve(request, place()), Transition::Applied);
        assert_eq!(lookup.state(), &LookupState::Resolved { place: place() });
    }

    #[test]
    fn fail_applies_to_current_request() {
        let mut lookup = Lookup::new();
        let (request, _) = lookup.submit("nowhere").unwrap();

        assert_eq!(
            lookup.fail(request, geocoding_error("Unknown error.")),
            Transition::Applied
        );
        assert_eq!(
            lookup.state(),
            &LookupState::Failed {
                kind: ErrorKind::Geocoding,
                message: "Unknown error.".into()
            }
        );
    }

    #[test]
    fn resubmit_clears_previous_result() {
        let mut lookup = Lookup::new();
        let (first, _) = lookup.submit("Pariser Platz").unwrap();
        lookup.resolve(first, place());

        let (second, address) = lookup.submit("Alexanderplatz").unwrap();
        assert_eq!(
            lookup.state(),
            &LookupState::Pending {
                address,
                request: second
            }
        );

        lookup.fail(second, geocoding_error("rate limited"));
        let (third, _) = lookup.submit("Alexanderplatz").unwrap();
        assert!(lookup.state().is_pending());
        assert!(third > second);
    }

    #[test]
    fn superseded_result_is_ignored() {
        let mut lookup = Lookup::new();
        let (first, _) = lookup.submit("Pariser Platz").unwrap();
        let (second, address) = lookup.submit("Alexanderplatz").unwrap();

        assert_eq!(
            lookup.resolve(first, place()),
            Transition::Ignored(IgnoredReason::Superseded { current: second })
        );
        assert_eq!(
            lookup.state(),
            &LookupState::Pending {
                address,
                request: second
            }
        );
    }

    #[test]
    fn result_without_pending_request_is_ignored() {
        let mut lookup = Lookup::new();
        assert_eq!(
            lookup.resolve(RequestId(1), place()),
            Transition::Ignored(IgnoredReason::NotPending)
        );

        let (request, _) = lookup.submit("Pariser Platz").unwrap();
        lookup.resolve(request, place());
        assert_eq!(
            lookup.fail(request, geocoding_error("late")),
            Transition::Ignored(IgnoredReason::NotPending)
        );
        assert_eq!(lookup.state(), &LookupState::Resolved { place: place() });
    }

    #[test]
    fn identical_addresses_get_distinct_requests() {
        let mut lookup = Lookup::new();
        let (first, _) = lookup.submit("Pariser Platz").unwrap();
        let (second, _) = lookup.submit("Pariser Platz").unwrap();

        assert_ne!(first, second);
        assert!(matches!(
            lookup.resolve(first, place()),
            Transition::Ignored(_)
        ));
        assert_eq!(lookup.resolve(second, place()), Transition::Applied);
    }
}
