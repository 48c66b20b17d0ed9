//! CRC32 checksum over cursor payloads
//!
//! A cursor that was truncated or edited fails the checksum and is rejected
//! instead of resuming at an arbitrary position.

use crc32fast::Hasher;

/// Computes a CRC32 (IEEE) checksum over `data`
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

pub fn verify_checksum(data: &[u8], expected: u32) -> bool {
    compute_checksum(data) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_deterministic() {
        let data = br#"{"id":"Jim"}"#;
        assert_eq!(compute_checksum(data), compute_checksum(data));
    }

    #[test]
    fn test_checksum_detects_change() {
        let mut data = b"cursor payload".to_vec();
        let original = compute_checksum(&data);
        data[3] ^= 0x01;
        assert!(!verify_checksum(&data, original));
    }
}
