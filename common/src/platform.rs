use crate::fix::LocationFix;
use std::time::Duration;

/// Name of the provider that derives fixes from network signals.
pub const NETWORK_PROVIDER: &str = "network";

/// Name of the provider that derives fixes from a satellite receiver.
pub const SATELLITE_PROVIDER: &str = "satellite";

/// Identifier of the runtime permission that gates precise location access.
pub const FINE_LOCATION_PERMISSION: &str = "location.fine";

/// Outbound interface to the platform location service.
///
/// Implementations wrap whatever the host platform offers for provider
/// discovery, update subscriptions and the last-known-fix cache. Live
/// readings are not returned through this trait; the platform delivers them
/// asynchronously as location fix events.
pub trait LocationService {
    /// Returns the names of the providers known to the platform.
    ///
    /// With `enabled_only` set, the list is limited to providers that can
    /// deliver fixes right now.
    fn providers(&self, enabled_only: bool) -> Vec<String>;

    /// Subscribes for readings of `provider`.
    ///
    /// `min_time` and `min_distance` throttle how often the platform reports:
    /// at most one reading per interval and only after the device moved the
    /// given distance in meters.
    fn request_updates(&mut self, provider: &str, min_time: Duration, min_distance: f64);

    /// Cancels the update subscription.
    ///
    /// Must be safe to call repeatedly or when no subscription exists.
    fn remove_updates(&mut self);

    /// Returns the platform-cached last reading of `provider`, if any.
    fn last_known_location(&self, provider: &str) -> Option<LocationFix>;
}

/// Outbound interface to the platform permission service.
pub trait PermissionProbe {
    /// Checks whether `permission` is currently granted to the application.
    fn is_granted(&self, permission: &str) -> bool;
}

/// Capability interface of the host surface that can show permission UI.
///
/// Every host surface variant (activity-like, fragment-like, simulated)
/// provides its own implementation; there is no shared base type.
pub trait HostSurface {
    /// True when the platform wants an explanation shown before `permission`
    /// is requested again.
    fn should_show_rationale(&self, permission: &str) -> bool;

    /// Fires the platform permission prompt for `permissions`.
    ///
    /// The prompt is asynchronous. Its outcome arrives later as a permission
    /// result event carrying the same `request_code`.
    fn request_permissions(&mut self, permissions: &[String], request_code: u32);
}
