//! 6-bit ASCII payload armor
//!
//! AIS packs 6 data bits into each printable payload character. The
//! alphabet covers ASCII 48..=87 (`0`..`W`, values 0..=39) and 96..=119
//! (`` ` ``..`w`, values 40..=63); the gap `X`..`_` is unused.

use crate::bits::BitBuffer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ArmorError {
    #[error("byte 0x{byte:02x} is not in the armor alphabet")]
    BadArmorChar { byte: u8 },
    #[error("armored payload of {length} chars exceeds the cap of {max}")]
    PayloadTooLong { length: usize, max: usize },
}

/// Decodes one armored character to its 6-bit value.
pub fn decode_char(byte: u8) -> Result<u8, ArmorError> {
    if !(48..=87).contains(&byte) && !(96..=119).contains(&byte) {
        return Err(ArmorError::BadArmorChar { byte });
    }
    let mut value = byte - 48;
    if value > 40 {
        value -= 8;
    }
    Ok(value)
}

/// Unpacks an armored payload into a bit buffer, dropping the trailing
/// `fill_bits` padding bits of the final character.
pub fn decode_payload(
    payload: &str,
    fill_bits: u8,
    max_chars: usize,
) -> Result<BitBuffer, ArmorError> {
    if payload.len() > max_chars {
        return Err(ArmorError::PayloadTooLong {
            length: payload.len(),
            max: max_chars,
        });
    }

    let mut buffer = BitBuffer::with_capacity(payload.len() * 6);
    for byte in payload.bytes() {
        buffer.push_uint(u64::from(decode_char(byte)?), 6);
    }
    buffer.truncate(buffer.len().saturating_sub(usize::from(fill_bits)));
    Ok(buffer)
}
