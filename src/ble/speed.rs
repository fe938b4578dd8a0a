use crate::ble::revolution_data::RevolutionDelta;

/// 700x25c tire
pub const DEFAULT_WHEEL_CIRCUMFERENCE_MM: u32 = 2105;

const MPS_TO_KMH: f64 = 3.6;

/// Instantaneous speed over the interval covered by `delta`.
///
/// Returns `None` when no new revolution was timestamped (a zero time delta),
/// and the caller is expected to keep reporting whatever speed it had before.
/// A stationary sensor repeats its last event time, so reporting zero (or
/// dividing by it) here would be wrong.
pub fn speed_kmh(delta: &RevolutionDelta, wheel_circumference_mm: u32) -> Option<f64> {
    if delta.is_stale() {
        return None;
    }
    let distance_m = delta.count_delta as f64 * wheel_circumference_mm as f64 / 1000.0;
    Some(distance_m / delta.seconds() * MPS_TO_KMH)
}

/// Crank revolutions per minute, with the same stale-sample policy as
/// [`speed_kmh`].
pub fn cadence_rpm(delta: &RevolutionDelta) -> Option<f64> {
    if delta.is_stale() {
        return None;
    }
    Some(delta.count_delta as f64 * 60.0 / delta.seconds())
}
