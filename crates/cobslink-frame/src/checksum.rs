//! Two-sum modulo-255 checksum used as the frame trailer.

/// Width of the checksum trailer in bytes.
pub const CHECKSUM_LEN: usize = 2;

const MODULUS: u16 = 255;

/// Streaming checksum state.
///
/// Feed data with [`update`](Self::update) in as many chunks as needed, then
/// call [`finish`](Self::finish). The result only depends on the byte
/// sequence, not on how it was chunked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Checksum16 {
    sum_a: u16,
    sum_b: u16,
}

impl Checksum16 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.sum_a = (self.sum_a + u16::from(byte)) % MODULUS;
            self.sum_b = (self.sum_b + self.sum_a) % MODULUS;
        }
    }

    /// The two-byte trailer `[a, b]` for everything fed so far.
    pub fn finish(&self) -> [u8; CHECKSUM_LEN] {
        // Both sums are reduced modulo 255, so they fit in a byte.
        [self.sum_a as u8, self.sum_b as u8]
    }
}

/// One-shot checksum of `data`.
pub fn checksum16(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut state = Checksum16::new();
    state.update(data);
    state.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        assert_eq!(checksum16(&[1, 2, 3, 4, 5, 6]), [21, 56]);
    }

    #[test]
    fn empty_input() {
        assert_eq!(checksum16(&[]), [0, 0]);
    }

    #[test]
    fn sums_wrap_at_255() {
        assert_eq!(checksum16(&[0xFF]), [0, 0]);
        assert_eq!(checksum16(&[0xFF, 0xFF, 0x01]), [1, 1]);
    }

    #[test]
    fn chunked_update_matches_one_shot() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let mut state = Checksum16::new();
        for chunk in data.chunks(37) {
            state.update(chunk);
        }
        assert_eq!(state.finish(), checksum16(&data));
    }

    #[test]
    fn order_sensitive() {
        assert_ne!(checksum16(b"ab"), checksum16(b"ba"));
    }
}
