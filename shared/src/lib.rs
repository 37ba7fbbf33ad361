// lib.rs - address lookup core

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]

pub mod capabilities;
pub mod config;
pub mod event;
pub mod geocoding;
pub mod model;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::{ApiKey, Config, ConfigError, Settings};
pub use crux_core::{render::Render, App as CruxApp};
pub use event::Event;
pub use geocoding::{GeocodeResponse, GeocodeStatus, GeocodingClient, LookupError};
pub use model::{
    Address, Coordinates, IgnoredReason, Lookup, LookupState, Model, Place, RequestId, Transition,
};

pub const API_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";
pub const ENDPOINT_ENV: &str = "GEOCODER_ENDPOINT";
pub const DEFAULT_GEOCODE_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";
pub const DEFAULT_MAP_ZOOM: f64 = 17.0;
pub const IDLE_PROMPT: &str = "Please enter an address below.";
pub const ADDRESS_PLACEHOLDER: &str = "Enter an address...";
pub const ERROR_TITLE: &str = "Error";

// --- Error taxonomy ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Configuration,
    Geocoding,
    Transport,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Configuration => "CONFIGURATION_ERROR",
            Self::Geocoding => "GEOCODING_ERROR",
            Self::Transport => "TRANSPORT_ERROR",
        }
    }

    /// Whether submitting another address can clear the error.
    #[must_use]
    pub const fn is_recoverable(self) -> bool {
        matches!(self, Self::Geocoding | Self::Transport)
    }
}

/// Error as surfaced to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)
    }
}

impl std::error::Error for AppError {}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::new(ErrorKind::Configuration, e.to_string())
    }
}

impl From<LookupError> for AppError {
    fn from(e: LookupError) -> Self {
        AppError::new(e.kind(), e.message())
    }
}

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum CoordinateError {
    #[error("Latitude {0} is out of valid range [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("Longitude {0} is out of valid range [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("Coordinate value is not finite (NaN or Infinity)")]
    NonFinite,
}

// --- View model ---

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl From<Coordinates> for LatLng {
    fn from(c: Coordinates) -> Self {
        Self {
            lat: c.latitude(),
            lng: c.longitude(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Marker {
    pub position: LatLng,
    pub label: String,
}

/// Everything a map renderer needs to draw the resolved place.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MapView {
    pub api_key: String,
    pub center: LatLng,
    pub zoom: f64,
    pub marker: Marker,
}

impl MapView {
    #[must_use]
    pub fn new(config: &Config, place: &Place) -> Self {
        let position = LatLng::from(place.coordinates());
        Self {
            api_key: config.api_key().expose().to_owned(),
            center: position,
            zoom: DEFAULT_MAP_ZOOM,
            marker: Marker {
                position,
                label: place.formatted_address().to_owned(),
            },
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum ViewState {
    Prompt {
        message: String,
    },
    Loading {
        address: String,
    },
    Map(MapView),
    Error {
        title: String,
        message: String,
        code: String,
        is_retryable: bool,
    },
    Misconfigured {
        message: String,
        code: String,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormView {
    pub draft: String,
    pub placeholder: String,
    pub can_submit: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub state: ViewState,
    pub form: FormView,
}

pub mod app {
    use tracing::{debug, error, info, warn};

    use super::{
        AppError, Config, ConfigError, Event, FormView, LookupError, MapView, Model, Place,
        RequestId, Transition, ViewModel, ViewState, ADDRESS_PLACEHOLDER, ERROR_TITLE,
        IDLE_PROMPT,
    };
    use crate::capabilities::{http, Capabilities};
    use crate::geocoding::GeocodingClient;
    use crate::model::{Address, LookupState};

    #[derive(Default)]
    pub struct App;

    impl App {
        /// Returns `true` when the lookup state changed.
        fn submit(raw: &str, model: &mut Model, caps: &Capabilities) -> bool {
            let Some(address) = Address::parse(raw) else {
                debug!("ignoring empty address submission");
                return false;
            };

            let Some(config) = model.config.as_ref() else {
                error!("address submitted before the geocoder was configured");
                if model.config_error.is_none() {
                    model.config_error = Some(ConfigError::NotConfigured);
                }
                return true;
            };

            let url = GeocodingClient::new(config).request_url(&address);
            let request = model.lookup.begin(address.clone());
            model.draft.clear();

            info!(%request, %address, "geocoding address");
            http::send_geocode_request(&caps.http, &url, request);
            true
        }

        fn complete(
            request: RequestId,
            outcome: Result<Place, LookupError>,
            model: &mut Model,
        ) -> bool {
            let transition = match outcome {
                Ok(place) => {
                    let formatted = place.formatted_address().to_owned();
                    let transition = model.lookup.resolve(request, place);
                    if transition == Transition::Applied {
                        info!(%request, address = %formatted, "address resolved");
                    }
                    transition
                }
                Err(e) => {
                    let failure = AppError::from(e);
                    let transition = model.lookup.fail(request, failure.clone());
                    if transition == Transition::Applied {
                        warn!(%request, error = %failure, "address lookup failed");
                    }
                    transition
                }
            };

            match transition {
                Transition::Applied => true,
                Transition::Ignored(reason) => {
                    debug!(%request, ?reason, "ignoring geocoding result");
                    false
                }
            }
        }

        fn view_state(model: &Model) -> ViewState {
            if let Some(e) = &model.config_error {
                return Self::misconfigured(e);
            }

            match model.lookup.state() {
                LookupState::Idle => ViewState::Prompt {
                    message: IDLE_PROMPT.into(),
                },
                LookupState::Pending { address, .. } => ViewState::Loading {
                    address: address.to_string(),
                },
                LookupState::Resolved { place } => match &model.config {
                    Some(config) => ViewState::Map(MapView::new(config, place)),
                    None => Self::misconfigured(&ConfigError::NotConfigured),
                },
                LookupState::Failed { kind, message } => ViewState::Error {
                    title: ERROR_TITLE.into(),
                    message: message.clone(),
                    code: kind.code().into(),
                    is_retryable: kind.is_recoverable(),
                },
            }
        }

        fn misconfigured(e: &ConfigError) -> ViewState {
            let error = AppError::from(e.clone());
            ViewState::Misconfigured {
                code: error.code().into(),
                message: error.message,
            }
        }

        fn configure(config: Config, model: &mut Model) {
            info!(endpoint = %config.endpoint(), "geocoder configured");
            model.config = Some(config);
            model.config_error = None;
        }
    }

    impl crux_core::App for App {
        type Event = Event;
        type Model = Model;
        type ViewModel = ViewModel;
        type Capabilities = Capabilities;

        fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
            if event.is_user_initiated() {
                debug!(event = event.name(), "user action");
            }

            let changed = match event {
                Event::Configure(config) => {
                    Self::configure(config, model);
                    true
                }

                Event::ConfigurationFailed(e) => {
                    error!(error = %e, "geocoder configuration failed");
                    model.config = None;
                    model.config_error = Some(e);
                    true
                }

                Event::AddressEdited { text } => {
                    model.draft = text;
                    true
                }

                Event::AddressSubmitted { address } => Self::submit(&address, model, caps),

                Event::GeocodeCompleted { request, outcome } => {
                    Self::complete(request, outcome, model)
                }
            };

            if changed {
                caps.render.render();
            }
        }

        fn view(&self, model: &Model) -> ViewModel {
            ViewModel {
                state: Self::view_state(model),
                form: FormView {
                    draft: model.draft.clone(),
                    placeholder: ADDRESS_PLACEHOLDER.into(),
                    can_submit: model.config.is_some()
                        && Address::parse(&model.draft).is_some(),
                },
            }
        }
    }
}
