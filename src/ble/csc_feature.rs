use crate::ble::field_reader::read_u16_le;
use crate::error::DecodeError;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct CscFeature {
    pub wheel_revolution_data: bool,
    pub crank_revolution_data: bool,
    pub multiple_sensor_locations: bool,
}

pub fn parse_csc_feature(data: &[u8]) -> Result<CscFeature, DecodeError> {
    let bits = read_u16_le(data, 0)?;
    Ok(CscFeature {
        wheel_revolution_data: bits & 0b001 != 0,
        crank_revolution_data: bits & 0b010 != 0,
        multiple_sensor_locations: bits & 0b100 != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::{parse_csc_feature, CscFeature};
    use crate::error::DecodeError;

    #[test]
    fn speed_only_sensor() {
        assert_eq!(
            Ok(CscFeature {
                wheel_revolution_data: true,
                crank_revolution_data: false,
                multiple_sensor_locations: false,
            }),
            parse_csc_feature(&[0x01, 0x00])
        );
    }

    #[test]
    fn combined_sensor() {
        assert_eq!(
            Ok(CscFeature {
                wheel_revolution_data: true,
                crank_revolution_data: true,
                multiple_sensor_locations: true,
            }),
            parse_csc_feature(&[0x07, 0x00])
        );
    }

    #[test]
    fn single_byte_is_truncated() {
        assert_eq!(
            Err(DecodeError::TruncatedBuffer {
                offset: 0,
                width: 2,
                len: 1
            }),
            parse_csc_feature(&[0x03])
        );
    }
}
