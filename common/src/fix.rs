use crate::serde::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single location reading reported by a platform provider.
///
/// The `LocationFix` struct stores a point on Earth in decimal degrees
/// together with the quality metadata the platform attaches to it. A fix is
/// immutable once received; components that want a different value create a
/// new fix.
///
/// # Fields
///
/// - `latitude` – The latitude in decimal degrees (positive for north, negative for south).
/// - `longitude` – The longitude in decimal degrees (positive for east, negative for west).
/// - `accuracy` – The accuracy radius in meters. Smaller values are more precise.
/// - `time` – The UTC timestamp of the reading, serialized as epoch milliseconds.
/// - `provider` – The identifier of the provider that produced the reading, if known.
///
/// # Example
///
/// ```rust
/// use common::fix::LocationFix;
/// use common::platform::NETWORK_PROVIDER;
///
/// let time = chrono::Utc::now();
/// let fix = LocationFix::new(52.5200, 13.4050, 25.0, &time, Some(NETWORK_PROVIDER));
///
/// println!("{:?}", fix);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    latitude: f64,
    longitude: f64,
    accuracy: f64,
    #[serde(with = "timestamp")]
    time: DateTime<Utc>,
    provider: Option<String>,
}

impl LocationFix {
    /// Creates a new [`LocationFix`] with the specified coordinates, accuracy, time and provider.
    ///
    /// # Arguments
    ///
    /// * `latitude` – Latitude in decimal degrees. Positive for northern hemisphere.
    /// * `longitude` – Longitude in decimal degrees. Positive for eastern hemisphere.
    /// * `accuracy` – Accuracy radius in meters, smaller is more precise.
    /// * `time` – Timestamp of the reading in UTC.
    /// * `provider` – Identifier of the producing provider, if the platform reported one.
    ///
    /// # Returns
    ///
    /// A new `LocationFix` instance.
    pub fn new(
        latitude: f64,
        longitude: f64,
        accuracy: f64,
        time: &DateTime<Utc>,
        provider: Option<&str>,
    ) -> LocationFix {
        LocationFix {
            latitude,
            longitude,
            accuracy,
            time: *time,
            provider: provider.map(str::to_string),
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Returns the latitude in decimal degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Returns the longitude in decimal degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Returns the accuracy radius of this reading in meters.
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    /// Returns the UTC timestamp of this reading.
    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// Returns the identifier of the provider that produced this reading.
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Checks whether two fixes come from the same provider.
    ///
    /// Two fixes without a provider identifier count as coming from the same
    /// provider.
    pub fn is_same_provider(&self, other: &LocationFix) -> bool {
        self.provider == other.provider
    }
}
