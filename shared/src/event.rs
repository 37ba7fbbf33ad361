use serde::{Deserialize, Serialize};

use crate::config::{Config, ConfigError};
use crate::geocoding::LookupError;
use crate::model::{Place, RequestId};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    // Configuration
    Configure(Config),
    ConfigurationFailed(ConfigError),

    // Address form
    AddressEdited {
        text: String,
    },
    AddressSubmitted {
        address: String,
    },

    // Capability responses
    #[serde(skip)]
    GeocodeCompleted {
        request: RequestId,
        outcome: Result<Place, LookupError>,
    },
}

impl Event {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Configure(_) => "configure",
            Self::ConfigurationFailed(_) => "configuration_failed",
            Self::AddressEdited { .. } => "address_edited",
            Self::AddressSubmitted { .. } => "address_submitted",
            Self::GeocodeCompleted { .. } => "geocode_completed",
        }
    }

    #[must_use]
    pub fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Self::AddressEdited { .. } | Self::AddressSubmitted { .. }
        )
    }
}
