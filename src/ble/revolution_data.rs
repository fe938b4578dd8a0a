use crate::error::InvariantViolation;

// Event times tick at 1/1024 s on a 16 bit clock, so they wrap every 64 seconds.
pub const EVENT_TIME_TICKS_PER_SECOND: f64 = 1024.0;

const EVENT_TIME_MODULUS: i64 = 1 << 16;
const WHEEL_COUNT_MODULUS: i64 = 1 << 32;
const CRANK_COUNT_MODULUS: i64 = 1 << 16;

// Raw wheel data exactly as the sensor reports it. Both counters wrap silently
// and it is up to us to notice.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct WheelSample {
    // Revolutions since the sensor powered on, modulo 2^32
    pub cumulative_revolutions: u32,
    // When the most recent revolution finished, in 1/1024 s, modulo 2^16
    pub event_time: u16,
}

// Same as WheelSample, but the crank counter is only 16 bits wide.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct CrankSample {
    pub cumulative_revolutions: u16,
    pub event_time: u16,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct RevolutionDelta {
    pub count_delta: u32,
    // In 1/1024 s
    pub time_delta: u16,
}

impl RevolutionDelta {
    /// True when the sensor has not seen a new revolution since the previous
    /// sample, in which case there is no rate to compute.
    pub fn is_stale(&self) -> bool {
        self.time_delta == 0
    }

    pub fn seconds(&self) -> f64 {
        self.time_delta as f64 / EVENT_TIME_TICKS_PER_SECOND
    }
}

pub fn wheel_delta(
    previous: &WheelSample,
    current: &WheelSample,
) -> Result<RevolutionDelta, InvariantViolation> {
    Ok(RevolutionDelta {
        count_delta: wrapped_delta(
            previous.cumulative_revolutions.into(),
            current.cumulative_revolutions.into(),
            WHEEL_COUNT_MODULUS,
        )?,
        time_delta: time_delta(previous.event_time, current.event_time)?,
    })
}

pub fn crank_delta(
    previous: &CrankSample,
    current: &CrankSample,
) -> Result<RevolutionDelta, InvariantViolation> {
    Ok(RevolutionDelta {
        count_delta: wrapped_delta(
            previous.cumulative_revolutions.into(),
            current.cumulative_revolutions.into(),
            CRANK_COUNT_MODULUS,
        )?,
        time_delta: time_delta(previous.event_time, current.event_time)?,
    })
}

fn time_delta(previous: u16, current: u16) -> Result<u16, InvariantViolation> {
    let delta = wrapped_delta(previous.into(), current.into(), EVENT_TIME_MODULUS)?;
    u16::try_from(delta).map_err(|_| InvariantViolation::RolloverArithmetic {
        previous: previous.into(),
        current: current.into(),
        modulus: EVENT_TIME_MODULUS,
        delta: delta.into(),
    })
}

// A negative difference means the counter wrapped, never that it went backwards.
// Widened to i64 so that neither the subtraction nor the correction can overflow.
fn wrapped_delta(previous: i64, current: i64, modulus: i64) -> Result<u32, InvariantViolation> {
    let raw = current - previous;
    let delta = if raw < 0 { raw + modulus } else { raw };
    if delta >= modulus {
        return Err(InvariantViolation::RolloverArithmetic {
            previous,
            current,
            modulus,
            delta,
        });
    }
    u32::try_from(delta).map_err(|_| InvariantViolation::RolloverArithmetic {
        previous,
        current,
        modulus,
        delta,
    })
}

#[cfg(test)]
mod tests {
    use super::{crank_delta, wheel_delta, wrapped_delta, CrankSample, RevolutionDelta, WheelSample};
    use crate::error::InvariantViolation;

    fn wheel(cumulative_revolutions: u32, event_time: u16) -> WheelSample {
        WheelSample {
            cumulative_revolutions,
            event_time,
        }
    }

    #[test]
    fn wheel_delta_without_rollover() {
        assert_eq!(
            Ok(RevolutionDelta {
                count_delta: 10,
                time_delta: 100
            }),
            wheel_delta(&wheel(1000, 500), &wheel(1010, 600))
        );
    }

    #[test]
    fn event_time_rollover() {
        let delta = wheel_delta(&wheel(7, 65500), &wheel(8, 100)).unwrap();
        assert_eq!(136, delta.time_delta);
        assert_eq!(1, delta.count_delta);
    }

    #[test]
    fn wheel_count_rollover() {
        let delta = wheel_delta(&wheel(4294967290, 1000), &wheel(4, 2000)).unwrap();
        assert_eq!(10, delta.count_delta);
        assert_eq!(1000, delta.time_delta);
    }

    #[test]
    fn crank_count_wraps_at_16_bits() {
        // Same numbers as a real crank that was 2 revolutions from overflowing
        let delta = crank_delta(
            &CrankSample {
                cumulative_revolutions: 65534,
                event_time: 64448,
            },
            &CrankSample {
                cumulative_revolutions: 0,
                event_time: 203,
            },
        )
        .unwrap();
        assert_eq!(2, delta.count_delta);
        assert_eq!(1291, delta.time_delta);
    }

    #[test]
    fn identical_event_time_is_stale() {
        let delta = wheel_delta(&wheel(50, 4000), &wheel(50, 4000)).unwrap();
        assert!(delta.is_stale());
        assert_eq!(0, delta.count_delta);
    }

    #[test]
    fn seconds_are_in_1024ths() {
        let delta = RevolutionDelta {
            count_delta: 1,
            time_delta: 1536,
        };
        assert_eq!(1.5, delta.seconds());
    }

    #[test]
    fn out_of_range_inputs_are_an_invariant_violation() {
        assert_eq!(
            Err(InvariantViolation::RolloverArithmetic {
                previous: 0,
                current: 70000,
                modulus: 65536,
                delta: 70000
            }),
            wrapped_delta(0, 70000, 1 << 16)
        );
    }
}
