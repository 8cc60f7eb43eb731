//! Frame checksum algorithm
//!
//! The checksum is the truncated 16-bit sum of the kind byte, both length
//! bytes, the instruction/confirmation byte and all parameter bytes. The
//! header marker and device address are excluded; the module validates
//! this address-excluded form.

/// Calculate the checksum for one frame
pub fn calculate(kind: u8, length: u16, code: u8, params: &[u8]) -> u16 {
    let mut sum = kind as u16;
    let [len_hi, len_lo] = length.to_be_bytes();
    sum = sum.wrapping_add(len_hi as u16);
    sum = sum.wrapping_add(len_lo as u16);
    sum = sum.wrapping_add(code as u16);
    for byte in params {
        sum = sum.wrapping_add(*byte as u16);
    }
    sum
}

/// Verify a received checksum
pub fn verify(kind: u8, length: u16, code: u8, params: &[u8], expected: u16) -> bool {
    calculate(kind, length, code, params) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_known_frame() {
        // ReadSysPara command: kind 0x01, length 0x0004, code 0x0F
        assert_eq!(calculate(0x01, 0x0004, 0x0F, &[]), 0x01 + 0x04 + 0x0F);
    }

    #[test]
    fn test_checksum_includes_params() {
        let base = calculate(0x01, 0x0005, 0x02, &[]);
        let with_param = calculate(0x01, 0x0005, 0x02, &[0x01]);
        assert_eq!(with_param, base + 1);
    }

    #[test]
    fn test_checksum_truncates() {
        // Enough 0xFF parameter bytes to overflow 16 bits must wrap, not panic
        let params = [0xFFu8; 32];
        let checksum = calculate(0xFF, 0xFFFF, 0xFF, &params);
        assert_eq!(checksum, calculate(0xFF, 0xFFFF, 0xFF, &params));
    }

    #[test]
    fn test_checksum_verify() {
        let checksum = calculate(0x07, 0x0004, 0x00, &[]);
        assert!(verify(0x07, 0x0004, 0x00, &[], checksum));
        assert!(!verify(0x07, 0x0004, 0x00, &[], checksum.wrapping_add(1)));
    }
}
