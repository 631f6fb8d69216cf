//! Synthetic saves for tests.

use crate::inject::output_length;
use crate::platform::{Platform, PS2_JAPAN_TAG, PS2_JAPAN_TAG_OFFSET};
use crate::save::{finalize, ScriptBlock, VarBlock};

pub(crate) struct SaveFixture {
    pub platform: Platform,
    pub store_words: usize,
    pub len: usize,
    pub game_time_ms: u32,
}

impl SaveFixture {
    pub fn pc(store_words: usize) -> Self {
        Self {
            platform: Platform::pc(),
            store_words,
            len: 202_752,
            game_time_ms: 1_234_567,
        }
    }

    pub fn mobile(store_words: usize) -> Self {
        Self {
            platform: Platform::mobile(),
            len: 195_000,
            ..Self::pc(store_words)
        }
    }

    pub fn ps2_japan(store_words: usize) -> Self {
        Self {
            platform: Platform::ps2_japan(),
            len: 200_000,
            ..Self::pc(store_words)
        }
    }
}

/// Empty blocks for the fixture's platform, zero filler, and a valid checksum
pub(crate) fn build_save(fixture: &SaveFixture) -> Vec<u8> {
    let platform = &fixture.platform;

    let mut vars = VarBlock::empty(platform);
    vars.metadata.version = 0x35_DA_8A_FE;
    vars.time_mapping.time_in_milliseconds = fixture.game_time_ms;
    let scripts = ScriptBlock::empty(platform, fixture.store_words);

    let mut out = Vec::with_capacity(fixture.len);
    vars.write(platform, &mut out).unwrap();
    scripts.write(platform, &mut out).unwrap();
    assert!(out.len() < fixture.len, "fixture too small for its blocks");
    out.resize(fixture.len, 0);

    if platform.is_ps2 && platform.is_wide_char {
        let at = PS2_JAPAN_TAG_OFFSET as usize;
        out[at..at + 5].copy_from_slice(PS2_JAPAN_TAG);
    }

    let out = finalize(out, output_length(platform, fixture.len));
    assert_eq!(Platform::from_bytes(&out).unwrap(), *platform);
    out
}
