use crate::fix::LocationFix;
use chrono::DateTime;

/// Base timestamp in epoch milliseconds that all test fixes are relative to.
pub const BASE_TIME_MS: i64 = 1_700_000_000_000;

/// Builds a [`LocationFix`] `offset_ms` milliseconds after [`BASE_TIME_MS`].
///
/// The coordinates are fixed; tests built on this helper only care about
/// time, accuracy and provider.
pub fn fix_at(offset_ms: i64, accuracy: f64, provider: Option<&str>) -> LocationFix {
    let time = DateTime::from_timestamp_millis(BASE_TIME_MS + offset_ms)
        .unwrap_or_else(|| panic!("Offset {offset_ms} leaves the timestamp range"));
    LocationFix::new(52.5200, 13.4050, accuracy, &time, provider)
}
