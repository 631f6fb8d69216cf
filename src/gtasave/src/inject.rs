//! End-to-end save rewriting.
//!
//! A save is decoded up to the end of the script block, changed in memory,
//! re-encoded, followed by the untouched remainder of the input, and
//! finalized with a fresh checksum.

use serde::Serialize;
use std::io::Cursor;

use crate::platform::{Platform, PlatformKind};
use crate::save::{finalize, verify, OutputLength, SaveError, ScriptBlock, VarBlock};
use crate::scm::{relocate, InstructionDecoder, RelocationReport};

/// Exact length of a PC save
pub const PC_SAVE_LEN: usize = 202_752;

/// Default size of the global store after expansion, in bytes
pub const DEFAULT_STORE_SIZE: u32 = 60_000;

pub const DEFAULT_SCRIPT_NAME: &str = "embed";

#[derive(Debug, Clone)]
pub struct InjectOptions {
    pub script_name: String,
    /// Target size of the global store in bytes
    pub store_size: u32,
    /// Fail instead of warning when the code cannot be fully decoded
    pub strict_relocation: bool,
}

impl Default for InjectOptions {
    fn default() -> Self {
        Self {
            script_name: DEFAULT_SCRIPT_NAME.to_string(),
            store_size: DEFAULT_STORE_SIZE,
            strict_relocation: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InjectReport {
    pub platform: String,
    pub old_store_size: u32,
    pub new_store_size: u32,
    /// Byte offset in the store where the script was placed
    pub position: Option<u32>,
    pub script_name: Option<String>,
    pub running_scripts: u32,
    pub relocation: Option<RelocationReport>,
    pub output_len: usize,
    pub checksum: u32,
}

#[derive(Debug, Clone)]
pub struct Injection {
    pub bytes: Vec<u8>,
    pub report: InjectReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScriptSummary {
    pub name: String,
    pub index: u16,
    pub is_mission: bool,
    pub is_active: bool,
    pub instruction_pointer: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveSummary {
    pub platform: String,
    pub version: u32,
    pub last_mission_passed: String,
    pub game_time_ms: u32,
    pub file_len: usize,
    pub checksum_valid: bool,
    pub store_size: u32,
    pub packed_store_size: Option<u32>,
    pub brains: usize,
    pub script_brains: usize,
    pub scripts: Vec<ScriptSummary>,
}

/// The decoded head of a save plus where its undecoded tail begins
struct ParsedSave {
    platform: Platform,
    vars: VarBlock,
    scripts: ScriptBlock,
    tail_offset: usize,
}

impl ParsedSave {
    fn parse(save: &[u8]) -> Result<Self, SaveError> {
        let platform = Platform::from_bytes(save)?;
        let mut cursor = Cursor::new(save);
        let vars = VarBlock::read(&platform, &mut cursor)?;
        let scripts = ScriptBlock::read(&platform, &mut cursor)?;

        Ok(Self {
            platform,
            vars,
            scripts,
            tail_offset: cursor.position() as usize,
        })
    }

    fn assemble(&self, save: &[u8]) -> Result<Vec<u8>, SaveError> {
        let mut out = Vec::with_capacity(save.len() + self.scripts.globals.words().len() * 4);
        self.vars.write(&self.platform, &mut out)?;
        self.scripts.write(&self.platform, &mut out)?;
        out.extend_from_slice(&save[self.tail_offset..]);

        let length = output_length(&self.platform, save.len());
        if let OutputLength::Fixed(target) | OutputLength::AtMost(target) = length {
            if out.len() > target {
                tracing::warn!(
                    dropped = out.len() - target,
                    "removing bytes from the end of the save to fit its length"
                );
            }
        }
        Ok(finalize(out, length))
    }
}

/// Length the game expects for a rewritten save
pub fn output_length(platform: &Platform, input_len: usize) -> OutputLength {
    match platform.kind() {
        PlatformKind::Pc => OutputLength::Fixed(PC_SAVE_LEN),
        PlatformKind::Mobile => OutputLength::AtMost(input_len),
        PlatformKind::Ps2 => {
            tracing::warn!("PS2 save length is unconfirmed; keeping the rewritten length");
            OutputLength::Natural
        }
    }
}

/// Expand the global store of `save`, relocate `code` into the new space
/// and start it as a running script
pub fn inject<D: InstructionDecoder + ?Sized>(
    save: &[u8],
    code: &[u8],
    options: &InjectOptions,
    decoder: &D,
) -> Result<Injection, SaveError> {
    let mut parsed = ParsedSave::parse(save)?;
    let platform = parsed.platform;
    tracing::info!(platform = %platform, "detected platform");

    let old_store_size = parsed.scripts.globals.size();
    // Code goes on the first word boundary past the old contents.
    let position = old_store_size.next_multiple_of(4);
    let target_words = options.store_size as usize / 4;
    tracing::info!(
        added = (target_words * 4).saturating_sub(old_store_size as usize),
        "expanding global store"
    );
    parsed.scripts.globals.grow(target_words)?;

    let mut code = code.to_vec();
    let relocation = relocate(&mut code, position, decoder);
    if let Some(offset) = relocation.malformed_offset() {
        if options.strict_relocation {
            return Err(SaveError::MalformedInstruction { offset });
        }
    }

    parsed.scripts.embed(
        &platform,
        &parsed.vars,
        &options.script_name,
        &code,
        position,
    )?;

    let bytes = parsed.assemble(save)?;
    let report = InjectReport {
        platform: platform.to_string(),
        old_store_size,
        new_store_size: parsed.scripts.globals.size(),
        position: Some(position),
        script_name: Some(options.script_name.clone()),
        running_scripts: parsed.scripts.values.running_script_count,
        relocation: Some(relocation),
        output_len: bytes.len(),
        checksum: stored_checksum(&bytes),
    };

    tracing::info!(
        position,
        len = code.len(),
        output_len = report.output_len,
        "embedded script"
    );
    Ok(Injection { bytes, report })
}

/// Decode and re-encode `save` without changing it, then finalize
pub fn rewrite(save: &[u8]) -> Result<Injection, SaveError> {
    let parsed = ParsedSave::parse(save)?;
    let bytes = parsed.assemble(save)?;
    let store_size = parsed.scripts.globals.size();

    let report = InjectReport {
        platform: parsed.platform.to_string(),
        old_store_size: store_size,
        new_store_size: store_size,
        position: None,
        script_name: None,
        running_scripts: parsed.scripts.values.running_script_count,
        relocation: None,
        output_len: bytes.len(),
        checksum: stored_checksum(&bytes),
    };
    Ok(Injection { bytes, report })
}

pub fn inspect(save: &[u8]) -> Result<SaveSummary, SaveError> {
    let parsed = ParsedSave::parse(save)?;
    let blocks = &parsed.scripts;

    Ok(SaveSummary {
        platform: parsed.platform.to_string(),
        version: parsed.vars.metadata.version,
        last_mission_passed: parsed.vars.last_mission_passed(),
        game_time_ms: parsed.vars.time_in_milliseconds(),
        file_len: save.len(),
        checksum_valid: verify(save),
        store_size: blocks.globals.size(),
        packed_store_size: blocks.globals.packed_size(),
        brains: blocks.brains.len(),
        script_brains: blocks
            .brains
            .iter()
            .filter(|brain| brain.attach_type.has_script_name())
            .count(),
        scripts: blocks
            .scripts
            .iter()
            .map(|script| ScriptSummary {
                name: script.name(),
                index: script.index,
                is_mission: script.is_mission(),
                is_active: script.info.is_active,
                instruction_pointer: script.info.relative_instruction_pointer,
            })
            .collect(),
    })
}

fn stored_checksum(bytes: &[u8]) -> u32 {
    let mut stored = [0u8; 4];
    if let Some(tail) = bytes.len().checked_sub(4).map(|split| &bytes[split..]) {
        stored.copy_from_slice(tail);
    }
    u32::from_le_bytes(stored)
}
