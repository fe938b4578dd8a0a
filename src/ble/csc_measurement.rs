use crate::ble::field_reader::{read_u16_le, read_u32_le};
use crate::ble::revolution_data::{CrankSample, WheelSample};
use crate::error::DecodeError;
use btleplug::api::bleuuid::uuid_from_u16;
use uuid::Uuid;

pub const SERVICE_UUID: Uuid = uuid_from_u16(0x1816);
pub const MEASURE_UUID: Uuid = uuid_from_u16(0x2A5B);
pub const FEATURE_UUID: Uuid = uuid_from_u16(0x2A5C);

const WHEEL_DATA_PRESENT: u8 = 0b01;
const CRANK_DATA_PRESENT: u8 = 0b10;
const WHEEL_DATA_LEN: usize = 6;
const CRANK_DATA_LEN: usize = 4;

// A Struct that does not care about bit compression
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CscMeasurement {
    // Data about wheel rotations
    pub wheel: Option<WheelSample>,
    // Data about crank rotations
    pub crank: Option<CrankSample>,
}

impl CscMeasurement {
    pub fn is_empty(&self) -> bool {
        self.wheel.is_none() && self.crank.is_none()
    }
}

// Only the flags decide which fields exist. A flagged field that doesn't fit
// is an error, and anything after the last flagged field is ignored so that
// newer sensors with extra fields still decode.
pub fn parse_csc_measurement(data: &[u8]) -> Result<CscMeasurement, DecodeError> {
    let flags = *data.first().ok_or(DecodeError::EmptyBuffer)?;
    let mut offset = 1;

    let wheel = if flags & WHEEL_DATA_PRESENT != 0 {
        let required = offset + WHEEL_DATA_LEN;
        if data.len() < required {
            return Err(DecodeError::TruncatedWheelData {
                len: data.len(),
                required,
            });
        }
        let sample = WheelSample {
            cumulative_revolutions: read_u32_le(data, offset)?,
            event_time: read_u16_le(data, offset + 4)?,
        };
        offset = required;
        Some(sample)
    } else {
        None
    };

    let crank = if flags & CRANK_DATA_PRESENT != 0 {
        let required = offset + CRANK_DATA_LEN;
        if data.len() < required {
            return Err(DecodeError::TruncatedCrankData {
                len: data.len(),
                required,
            });
        }
        Some(CrankSample {
            cumulative_revolutions: read_u16_le(data, offset)?,
            event_time: read_u16_le(data, offset + 2)?,
        })
    } else {
        None
    };

    Ok(CscMeasurement { wheel, crank })
}

#[cfg(test)]
mod tests {
    use super::{parse_csc_measurement, CscMeasurement};
    use crate::ble::revolution_data::{CrankSample, WheelSample};
    use crate::error::DecodeError;

    #[test]
    fn parse_csc_with_wheel_and_crank() {
        assert_eq!(
            Ok(CscMeasurement {
                wheel: Some(WheelSample {
                    cumulative_revolutions: 0x04030201,
                    event_time: 0x0201,
                }),
                crank: Some(CrankSample {
                    cumulative_revolutions: 0x0403,
                    event_time: 0x0605,
                }),
            }),
            parse_csc_measurement(&[3, 1, 2, 3, 4, 1, 2, 3, 4, 5, 6])
        );
    }

    #[test]
    fn parse_csc_with_crank() {
        assert_eq!(
            Ok(CscMeasurement {
                wheel: None,
                crank: Some(CrankSample {
                    cumulative_revolutions: 0x0201,
                    event_time: 0x0201,
                }),
            }),
            parse_csc_measurement(&[2, 1, 2, 1, 2])
        );
    }

    #[test]
    fn parse_csc_with_wheel() {
        assert_eq!(
            Ok(CscMeasurement {
                wheel: Some(WheelSample {
                    cumulative_revolutions: 0xffffffff,
                    event_time: 0xfffe,
                }),
                crank: None,
            }),
            parse_csc_measurement(&[1, 0xff, 0xff, 0xff, 0xff, 0xfe, 0xff])
        );
    }

    #[test]
    fn parse_csc_flags_only() {
        let measurement = parse_csc_measurement(&[0]).unwrap();
        assert!(measurement.is_empty());
    }

    #[test]
    fn reserved_flag_bits_are_ignored() {
        assert_eq!(
            parse_csc_measurement(&[1, 1, 2, 3, 4, 1, 2]),
            parse_csc_measurement(&[0b11111101, 1, 2, 3, 4, 1, 2])
        );
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        assert_eq!(
            parse_csc_measurement(&[2, 1, 2, 1, 2]),
            parse_csc_measurement(&[2, 1, 2, 1, 2, 9, 9, 9])
        );
        // Bytes that would be wheel data don't count when the flag is clear
        assert!(parse_csc_measurement(&[0, 1, 2, 3, 4, 5, 6])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn parse_csc_empty_buffer() {
        assert_eq!(Err(DecodeError::EmptyBuffer), parse_csc_measurement(&[]));
    }

    #[test]
    fn every_short_wheel_buffer_is_truncated() {
        let full = [1, 1, 2, 3, 4, 1, 2];
        for len in 1..full.len() {
            assert_eq!(
                Err(DecodeError::TruncatedWheelData { len, required: 7 }),
                parse_csc_measurement(&full[..len])
            );
        }
    }

    #[test]
    fn every_short_crank_buffer_is_truncated() {
        let crank_only = [2, 1, 2, 1, 2];
        for len in 1..crank_only.len() {
            assert_eq!(
                Err(DecodeError::TruncatedCrankData { len, required: 5 }),
                parse_csc_measurement(&crank_only[..len])
            );
        }

        // With wheel data in front, crank data starts at offset 7
        let both = [3, 1, 2, 3, 4, 1, 2, 1, 2, 1, 2];
        for len in 7..both.len() {
            assert_eq!(
                Err(DecodeError::TruncatedCrankData { len, required: 11 }),
                parse_csc_measurement(&both[..len])
            );
        }
    }
}
