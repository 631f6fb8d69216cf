//! Trailing checksum.
//!
//! The last four bytes of a save hold the little-endian wrapping sum of every
//! byte before them.

/// How long a finalized save must be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLength {
    /// Truncate or zero-pad to exactly this many bytes
    Fixed(usize),
    /// Truncate to at most this many bytes
    AtMost(usize),
    /// Keep the data's own length
    Natural,
}

impl OutputLength {
    fn apply(self, data: &mut Vec<u8>) {
        match self {
            Self::Fixed(len) => data.resize(len, 0),
            Self::AtMost(len) => data.truncate(len),
            Self::Natural => {}
        }
    }
}

/// Wrapping sum of all bytes
pub fn checksum(data: &[u8]) -> u32 {
    data.iter()
        .fold(0u32, |sum, &byte| sum.wrapping_add(u32::from(byte)))
}

/// Size `data` per `length`, then overwrite its last four bytes with the
/// checksum of everything before them
///
/// Data shorter than four bytes is zero-padded first.
pub fn finalize(mut data: Vec<u8>, length: OutputLength) -> Vec<u8> {
    length.apply(&mut data);
    if data.len() < 4 {
        data.resize(4, 0);
    }

    let split = data.len() - 4;
    let sum = checksum(&data[..split]);
    data[split..].copy_from_slice(&sum.to_le_bytes());
    data
}

/// Whether the trailing four bytes match the checksum of the rest
pub fn verify(data: &[u8]) -> bool {
    let Some(split) = data.len().checked_sub(4) else {
        return false;
    };
    let mut stored = [0u8; 4];
    stored.copy_from_slice(&data[split..]);
    checksum(&data[..split]) == u32::from_le_bytes(stored)
}
