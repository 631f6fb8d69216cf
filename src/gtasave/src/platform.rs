//! Save platform detection.
//!
//! The four variants of the save format share one layout with a handful of
//! platform-conditional fields. The variant is never stored explicitly, so it
//! is inferred from the file size and two probes at fixed offsets.

use serde::Serialize;
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};

use crate::save::SaveError;

/// Absolute offset of the five-byte block tag probed for PS2-Japan saves
pub const PS2_JAPAN_TAG_OFFSET: u64 = 333;

/// Absolute offset of the little-endian marker probed for PS2 saves
pub const PS2_MARKER_OFFSET: u64 = 46516;

/// Tag found at [`PS2_JAPAN_TAG_OFFSET`] in PS2-Japan saves
pub const PS2_JAPAN_TAG: &[u8; 5] = b"BLOCK";

/// Marker value found at [`PS2_MARKER_OFFSET`] in PS2 saves
pub const PS2_MARKER: u32 = 0x2FC86;

/// File sizes that only mobile saves use
pub const MOBILE_FILE_SIZES: [u64; 4] = [195_000, 260_000, 325_000, 390_000];

/// Platform a save was written by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlatformKind {
    Pc,
    Mobile,
    Ps2,
}

/// Format variant flags, derived once per save and passed to every codec call
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Platform {
    pub is_mobile: bool,
    pub is_wide_char: bool,
    pub is_ps2: bool,
    pub is_pc: bool,
}

impl Platform {
    pub const fn pc() -> Self {
        Self::classify(false, false, false)
    }

    pub const fn mobile() -> Self {
        Self::classify(true, false, false)
    }

    pub const fn ps2() -> Self {
        Self::classify(false, false, true)
    }

    pub const fn ps2_japan() -> Self {
        Self::classify(false, true, false)
    }

    const fn classify(is_mobile: bool, is_ps2_japan: bool, has_ps2_marker: bool) -> Self {
        let is_ps2 = is_ps2_japan || has_ps2_marker;
        Self {
            is_mobile,
            is_wide_char: is_ps2_japan || is_mobile,
            is_ps2,
            is_pc: !is_mobile && !is_ps2,
        }
    }

    /// Detect the platform of a save, leaving the source where it was found
    pub fn detect<S: Read + Seek>(source: &mut S) -> Result<Self, SaveError> {
        let platform = with_restored_position(source, |source| {
            let file_size = source.seek(SeekFrom::End(0))?;

            let mut tag = [0u8; 5];
            source.seek(SeekFrom::Start(PS2_JAPAN_TAG_OFFSET))?;
            source.read_exact(&mut tag)?;

            let mut marker = [0u8; 4];
            source.seek(SeekFrom::Start(PS2_MARKER_OFFSET))?;
            source.read_exact(&mut marker)?;

            Ok(Self::classify(
                MOBILE_FILE_SIZES.contains(&file_size),
                &tag == PS2_JAPAN_TAG,
                u32::from_le_bytes(marker) == PS2_MARKER,
            ))
        })?;

        tracing::debug!(platform = %platform, "detected save platform");
        Ok(platform)
    }

    /// Detect the platform of an in-memory save
    pub fn from_bytes(data: &[u8]) -> Result<Self, SaveError> {
        Self::detect(&mut io::Cursor::new(data))
    }

    pub fn kind(&self) -> PlatformKind {
        if self.is_mobile {
            PlatformKind::Mobile
        } else if self.is_ps2 {
            PlatformKind::Ps2
        } else {
            PlatformKind::Pc
        }
    }

    /// Number of local variable slots in each running script
    pub fn max_locals(&self) -> usize {
        if self.is_mobile {
            40
        } else {
            32
        }
    }

    pub fn name(&self) -> &'static str {
        match self.kind() {
            PlatformKind::Mobile => "Mobile",
            PlatformKind::Pc => "PC",
            PlatformKind::Ps2 if self.is_wide_char => "PS2 (Japan)",
            PlatformKind::Ps2 => "PS2",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Run `probe` against `source`, then seek back to the starting position
/// whether or not the probe succeeded
fn with_restored_position<S, T>(
    source: &mut S,
    probe: impl FnOnce(&mut S) -> io::Result<T>,
) -> io::Result<T>
where
    S: Seek,
{
    let start = source.stream_position()?;
    let result = probe(source);
    let restored = source.seek(SeekFrom::Start(start));
    let value = result?;
    restored?;
    Ok(value)
}
