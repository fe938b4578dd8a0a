use crate::error::DecodeError;

// Everything in the CSC profile is little-endian and unsigned, so there is no
// need to carry endianness around.
fn field<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N], DecodeError> {
    data.get(offset..)
        .and_then(|rest| rest.get(..N))
        .and_then(|bytes| <[u8; N]>::try_from(bytes).ok())
        .ok_or(DecodeError::TruncatedBuffer {
            offset,
            width: N,
            len: data.len(),
        })
}

pub fn read_u16_le(data: &[u8], offset: usize) -> Result<u16, DecodeError> {
    field::<2>(data, offset).map(u16::from_le_bytes)
}

pub fn read_u32_le(data: &[u8], offset: usize) -> Result<u32, DecodeError> {
    field::<4>(data, offset).map(u32::from_le_bytes)
}

#[cfg(test)]
mod tests {
    use super::{read_u16_le, read_u32_le};
    use crate::error::DecodeError;

    #[test]
    fn reads_little_endian() {
        let data = [0xff, 0x01, 0x02, 0x03, 0x04];
        assert_eq!(Ok(0x0201), read_u16_le(&data, 1));
        assert_eq!(Ok(0x04030201), read_u32_le(&data, 1));
    }

    #[test]
    fn reads_field_ending_exactly_at_buffer_end() {
        assert_eq!(Ok(0xbeef), read_u16_le(&[0x00, 0xef, 0xbe], 1));
    }

    #[test]
    fn short_buffer_is_truncated() {
        assert_eq!(
            Err(DecodeError::TruncatedBuffer {
                offset: 2,
                width: 4,
                len: 5
            }),
            read_u32_le(&[0, 1, 2, 3, 4], 2)
        );
    }

    #[test]
    fn offset_past_end_is_truncated() {
        assert_eq!(
            Err(DecodeError::TruncatedBuffer {
                offset: 9,
                width: 2,
                len: 3
            }),
            read_u16_le(&[0, 1, 2], 9)
        );
    }
}
