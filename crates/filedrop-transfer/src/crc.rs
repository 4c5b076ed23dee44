//! CRC32 Codec (C1): IEEE polynomial, hex-formatted.

/// Computes the IEEE CRC32 (`0xEDB88320`, reflected, seed/final-xor
/// `0xFFFFFFFF`) of `data`.
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Formats a CRC32 value as 8 lowercase hex digits, zero-padded.
pub fn crc32_to_hex(value: u32) -> String {
    format!("{value:08x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_eight_lowercase_digits() {
        let hex = crc32_to_hex(0xab);
        assert_eq!(hex.len(), 8);
        assert_eq!(hex, "000000ab");
        assert!(hex.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
    }

    #[test]
    fn known_vector_matches_reference_crc32() {
        // "123456789" is the standard CRC32 check vector: 0xCBF43926.
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn round_trips_through_hex_for_all_bit_patterns() {
        for x in [0u32, 1, 0xFFFF_FFFF, 0x1234_5678, 0xDEAD_BEEF] {
            let hex = crc32_to_hex(x);
            let back = u32::from_str_radix(&hex, 16).unwrap();
            assert_eq!(back, x);
        }
    }
}
