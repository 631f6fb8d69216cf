//! Little-endian primitives shared by the block codecs.
//!
//! Saves are dumps of packed C++ structures: every field is little-endian,
//! booleans are a single byte, and padding is explicit.

use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use std::io::{self, Read, Write};

/// A fixed-size structure that reads and writes itself in declaration order
pub(crate) trait Record: Sized {
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self>;
    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()>;
}

pub(crate) trait ReadExt: Read {
    fn read_bool(&mut self) -> io::Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    fn read_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut bytes = [0u8; N];
        self.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    fn read_bytes(&mut self, count: usize) -> io::Result<Vec<u8>> {
        let mut bytes = vec![0u8; count];
        self.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    fn read_words(&mut self, count: usize) -> io::Result<Vec<u32>> {
        let mut words = vec![0u32; count];
        self.read_u32_into::<LE>(&mut words)?;
        Ok(words)
    }

    fn read_word_array<const N: usize>(&mut self) -> io::Result<[u32; N]> {
        let mut words = [0u32; N];
        self.read_u32_into::<LE>(&mut words)?;
        Ok(words)
    }

    fn read_records<T: Record>(&mut self, count: usize) -> io::Result<Vec<T>> {
        (0..count).map(|_| T::read_from(self)).collect()
    }
}

impl<R: Read + ?Sized> ReadExt for R {}

pub(crate) trait WriteExt: Write {
    fn write_bool(&mut self, value: bool) -> io::Result<()> {
        self.write_u8(u8::from(value))
    }

    fn write_words(&mut self, words: &[u32]) -> io::Result<()> {
        for &word in words {
            self.write_u32::<LE>(word)?;
        }
        Ok(())
    }

    fn write_records<T: Record>(&mut self, records: &[T]) -> io::Result<()> {
        for record in records {
            record.write_to(self)?;
        }
        Ok(())
    }
}

impl<W: Write + ?Sized> WriteExt for W {}

/// Decode a null-terminated single-byte slot
pub(crate) fn decode_narrow(slot: &[u8]) -> String {
    let end = slot.iter().position(|&b| b == 0).unwrap_or(slot.len());
    String::from_utf8_lossy(&slot[..end]).into_owned()
}

/// Encode text into a zero-padded single-byte slot, truncating if needed
pub(crate) fn encode_narrow<const N: usize>(text: &str) -> [u8; N] {
    let mut slot = [0u8; N];
    for (dst, src) in slot.iter_mut().zip(text.bytes()) {
        *dst = src;
    }
    slot
}
