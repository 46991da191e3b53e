//! Simulation time representation.
//!
//! All components in this crate are driven by the host simulation's clock:
//! the per-tick callback passes the current simulation time down through
//! `update`/`check`/`score`, and nothing here samples a clock on its own.
//! Simulation time is a `u64` microsecond count since world start; it is
//! monotonic for the lifetime of a competition (a world reset tears the
//! whole sequencer down with it).

/// Simulation timestamp in microseconds since world start.
pub type SimMicros = u64;

/// Microseconds per second.
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// Convert a microsecond duration to floating-point seconds.
pub fn to_seconds(us: SimMicros) -> f64 {
    us as f64 / MICROS_PER_SEC as f64
}

/// Convert floating-point seconds to microseconds, rounding down.
pub fn from_seconds(seconds: f64) -> SimMicros {
    (seconds * MICROS_PER_SEC as f64) as SimMicros
}

/// Period in microseconds for a given frequency in Hz.
///
/// The caller is responsible for rejecting non-positive or non-finite
/// frequencies before calling this.
pub fn interval_from_hz(hz: f64) -> SimMicros {
    (MICROS_PER_SEC as f64 / hz) as SimMicros
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_seconds_conversion() {
        assert_eq!(to_seconds(0), 0.0);
        assert_eq!(to_seconds(1_000_000), 1.0);
        assert_eq!(to_seconds(1_500_000), 1.5);
    }

    #[test]
    fn from_seconds_conversion() {
        assert_eq!(from_seconds(0.0), 0);
        assert_eq!(from_seconds(2.5), 2_500_000);
    }

    #[test]
    fn interval_for_common_frequencies() {
        assert_eq!(interval_from_hz(50.0), 20_000);
        assert_eq!(interval_from_hz(1.0), 1_000_000);
        assert_eq!(interval_from_hz(1000.0), 1_000);
    }
}
