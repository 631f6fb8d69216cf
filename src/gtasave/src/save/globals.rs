//! The global variable store.
//!
//! Besides the size field that precedes the words, the store keeps a second
//! copy of its size packed into the first two words: the low byte of the size
//! sits in the top byte of word 0, and the remaining bytes sit in the low
//! three bytes of word 1. The game reads that copy, so both must be kept in
//! sync whenever the store is resized.

use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use std::io::{Read, Write};

use super::binary::{ReadExt, WriteExt};
use super::SaveError;

/// Bits of word 0 that do not carry the packed size
const WORD0_KEEP: u32 = 0x00FF_FFFF;

/// Bits of word 1 that do not carry the packed size
const WORD1_KEEP: u32 = 0xFF00_0000;

/// Pack `size_bytes` into the first two store words, preserving their other bits
pub fn pack_size(words: [u32; 2], size_bytes: u32) -> [u32; 2] {
    [
        (words[0] & WORD0_KEEP) | (size_bytes << 24),
        (words[1] & WORD1_KEEP) | (size_bytes >> 8),
    ]
}

/// Recover the size packed by [`pack_size`]
pub fn unpack_size(words: [u32; 2]) -> u32 {
    (words[0] >> 24) | ((words[1] & !WORD1_KEEP) << 8)
}

/// Script-visible global variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalStore {
    size: u32,
    words: Vec<u32>,
}

impl GlobalStore {
    /// A zeroed store of `word_count` words with its packed size written in
    pub fn zeroed(word_count: usize) -> Self {
        let size = (word_count * 4) as u32;
        let mut words = vec![0; word_count];
        // Stores under two words carry no packed copy.
        if word_count >= 2 {
            let packed = pack_size([0, 0], size);
            words[..2].copy_from_slice(&packed);
        }
        Self { size, words }
    }

    pub(crate) fn read<R: Read + ?Sized>(reader: &mut R) -> Result<Self, SaveError> {
        let size = reader.read_u32::<LE>()?;
        let words = reader.read_words(size as usize / 4)?;
        Ok(Self { size, words })
    }

    pub(crate) fn write<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), SaveError> {
        writer.write_u32::<LE>(self.size)?;
        writer.write_words(&self.words)?;
        Ok(())
    }

    /// Size field in bytes, as stored in the save
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Size held in the packed copy in words 0 and 1
    pub fn packed_size(&self) -> Option<u32> {
        match self.words.as_slice() {
            [w0, w1, ..] => Some(unpack_size([*w0, *w1])),
            _ => None,
        }
    }

    /// Grow the store to `target_word_count` words
    ///
    /// New words are zero. The size field and the packed copy in words 0 and
    /// 1 are both updated to the new byte size.
    pub fn grow(&mut self, target_word_count: usize) -> Result<(), SaveError> {
        if target_word_count < self.words.len() {
            return Err(SaveError::StoreShrink {
                current: self.words.len(),
                requested: target_word_count,
            });
        }
        if target_word_count < 2 {
            return Err(SaveError::StoreTooSmall(target_word_count));
        }

        self.words.resize(target_word_count, 0);
        self.size = (target_word_count * 4) as u32;

        let packed = pack_size([self.words[0], self.words[1]], self.size);
        self.words[..2].copy_from_slice(&packed);

        tracing::debug!(
            words = target_word_count,
            bytes = self.size,
            "grew global store"
        );
        Ok(())
    }

    /// Copy `code` into the store starting at byte `position`
    ///
    /// The last partial word is zero-padded.
    pub fn write_code(&mut self, position: u32, code: &[u8]) -> Result<(), SaveError> {
        if position % 4 != 0 {
            return Err(SaveError::UnalignedPosition(position));
        }

        let first = position as usize / 4;
        let word_count = code.len().div_ceil(4);
        if first + word_count > self.words.len() {
            return Err(SaveError::CodeOutOfBounds {
                position,
                len: code.len(),
                capacity: self.words.len() * 4,
            });
        }

        for (slot, chunk) in self.words[first..].iter_mut().zip(code.chunks(4)) {
            let mut bytes = [0u8; 4];
            bytes[..chunk.len()].copy_from_slice(chunk);
            *slot = u32::from_le_bytes(bytes);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_pack_size_bit_split() {
        let packed = pack_size([0, 0], 0x0001_EA7C);
        assert_eq!(packed[0], 0x7C00_0000);
        assert_eq!(packed[1], 0x0000_01EA);
    }

    #[test]
    fn test_pack_size_preserves_other_bits() {
        let packed = pack_size([0x12_34_56_78, 0x9A_BC_DE_F0], 60028);
        assert_eq!(packed[0] & WORD0_KEEP, 0x00_34_56_78);
        assert_eq!(packed[1] & WORD1_KEEP, 0x9A_00_00_00);
        assert_eq!(packed[0] >> 24, 60028 & 0xFF);
        assert_eq!(packed[1] & 0x00FF_FFFF, (60028 >> 8) & 0x00FF_FFFF);
    }

    #[test]
    fn test_unpack_inverts_pack() {
        for size in [0u32, 4, 255, 256, 40_000, 60_000, 60_028, 0x00FF_FFFF] {
            let packed = pack_size([0xFFFF_FFFF, 0xFFFF_FFFF], size);
            assert_eq!(unpack_size(packed), size, "size {}", size);
        }
    }

    #[test]
    fn test_grow_preserves_words() {
        let mut store = GlobalStore::zeroed(10_000);
        store.words[0] |= 0x00AB_CDEF;
        store.words[1] |= 0x5500_0000;
        store.words[2] = 7;
        store.words[9_999] = 0xCAFE_BABE;
        let before = store.words.clone();

        store.grow(15_007).unwrap();

        assert_eq!(store.size(), 60_028);
        assert_eq!(store.word_count(), 15_007);
        assert_eq!(store.words[2..10_000], before[2..]);
        assert!(store.words[10_000..].iter().all(|&w| w == 0));
        assert_eq!(store.words[0] & WORD0_KEEP, 0x00AB_CDEF);
        assert_eq!(store.words[1] & WORD1_KEEP, 0x5500_0000);
        assert_eq!(store.packed_size(), Some(60_028));
    }

    #[test]
    fn test_grow_to_same_size() {
        let mut store = GlobalStore::zeroed(16);
        store.grow(16).unwrap();
        assert_eq!(store.size(), 64);
        assert_eq!(store.packed_size(), Some(64));
    }

    #[test]
    fn test_zeroed_small_stores() {
        let store = GlobalStore::zeroed(0);
        assert_eq!(store.size(), 0);
        assert_eq!(store.packed_size(), None);

        let store = GlobalStore::zeroed(1);
        assert_eq!(store.size(), 4);
        assert_eq!(store.words(), &[0]);
        assert_eq!(store.packed_size(), None);

        let store = GlobalStore::zeroed(2);
        assert_eq!(store.size(), 8);
        assert_eq!(store.packed_size(), Some(8));
    }

    #[test]
    fn test_shrink_rejected() {
        let mut store = GlobalStore::zeroed(16);
        let err = store.grow(8).unwrap_err();
        assert!(matches!(
            err,
            SaveError::StoreShrink {
                current: 16,
                requested: 8
            }
        ));
    }

    #[test]
    fn test_write_code_pads_final_word() {
        let mut store = GlobalStore::zeroed(8);
        store.words[4] = 0xFFFF_FFFF;
        store.write_code(12, &[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(store.words[3], 0x0403_0201);
        assert_eq!(store.words[4], 0x0000_0605);
    }

    #[test]
    fn test_write_code_bounds() {
        let mut store = GlobalStore::zeroed(4);
        assert!(matches!(
            store.write_code(8, &[0; 9]),
            Err(SaveError::CodeOutOfBounds { .. })
        ));
        assert!(matches!(
            store.write_code(6, &[0; 2]),
            Err(SaveError::UnalignedPosition(6))
        ));
    }

    #[test]
    fn test_read_write_roundtrip() {
        let mut bytes = 12u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[1, 0, 0, 0xC0, 0, 0, 0, 0, 9, 9, 9, 9]);

        let store = GlobalStore::read(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(store.word_count(), 3);
        assert_eq!(store.words()[2], 0x0909_0909);

        let mut out = Vec::new();
        store.write(&mut out).unwrap();
        assert_eq!(out, bytes);
    }
}
