//! SCM bytecode decoding.
//!
//! Only instruction lengths are recovered. An instruction is a u16 opcode
//! followed by typed parameters; the opcode table says how many parameters
//! each opcode takes.

pub mod relocate;

pub use relocate::{relocate, RelocationIssue, RelocationReport};

use std::collections::HashMap;
use thiserror::Error;

/// Bit of the opcode word that negates a condition
pub const NOT_FLAG: u16 = 0x8000;

/// Parameter count of opcodes that take a 0x00-terminated list
pub const VARIADIC: i8 = -1;

/// Opcode and total byte length of one instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub opcode: u16,
    pub len: usize,
}

/// Splits bytecode into instructions
///
/// `code` always starts at an instruction boundary. `None` means the bytes
/// there do not form a valid instruction.
pub trait InstructionDecoder {
    fn decode(&self, code: &[u8]) -> Option<Decoded>;
}

#[derive(Error, Debug)]
pub enum OpcodeTableError {
    #[error("Line {line}: invalid opcode '{text}'")]
    InvalidOpcode { line: usize, text: String },

    #[error("Line {line}: invalid parameter count '{text}'")]
    InvalidParamCount { line: usize, text: String },

    #[error("No [OPCODES] section found")]
    MissingSection,
}

/// Parameter counts by opcode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpcodeTable {
    params: HashMap<u16, i8>,
}

impl OpcodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flow-control and variable opcodes needed to walk typical embedded code
    pub fn builtin() -> Self {
        let mut table = Self::new();
        let entries: &[(u16, i8)] = &[
            (0x0000, 0), // nop
            (0x0001, 1), // wait
            (0x0002, 1), // jump
            (0x0003, 1), // shake_cam
            (0x0038, 2), // is_int_var_equal_to_number
            (0x0039, 2), // is_int_lvar_equal_to_number
            (0x004D, 1), // jump_if_false
            (0x004E, 0), // terminate_this_script
            (0x004F, VARIADIC), // start_new_script
            (0x0050, 1), // gosub
            (0x0051, 0), // return
            (0x00D6, 1), // if
            (0x03A4, 1), // script_name
            (0x0417, 1), // load_and_launch_mission_internal
            (0x0871, 18), // switch_start
            (0x0872, 18), // switch_continue
            (0x0A93, 0), // terminate_this_custom_script
        ];
        for &(opcode, count) in entries {
            table.insert(opcode, count);
        }
        // set/add/sub/mult/div between variables and constants
        for opcode in 0x0004..=0x000F {
            table.insert(opcode, 2);
        }
        table
    }

    /// Parse the `[OPCODES]` section of a Sanny Builder style INI
    ///
    /// Entries look like `0001=1,wait %1d% ms`; comments start with `;`.
    pub fn parse_ini(text: &str) -> Result<Self, OpcodeTableError> {
        let mut table = Self::new();
        let mut in_section = false;
        let mut seen_section = false;

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            if line.starts_with('[') {
                in_section = line.eq_ignore_ascii_case("[OPCODES]");
                seen_section |= in_section;
                continue;
            }
            if !in_section {
                continue;
            }

            let line_no = index + 1;
            let Some((opcode_text, rest)) = line.split_once('=') else {
                return Err(OpcodeTableError::InvalidOpcode {
                    line: line_no,
                    text: line.to_string(),
                });
            };
            let opcode_text = opcode_text.trim();
            let opcode = u16::from_str_radix(opcode_text, 16).map_err(|_| {
                OpcodeTableError::InvalidOpcode {
                    line: line_no,
                    text: opcode_text.to_string(),
                }
            })?;

            let count_text = rest.split(',').next().unwrap_or_default().trim();
            let count: i8 = count_text
                .parse()
                .ok()
                .filter(|&count| count >= VARIADIC)
                .ok_or_else(|| OpcodeTableError::InvalidParamCount {
                    line: line_no,
                    text: count_text.to_string(),
                })?;

            table.insert(opcode & !NOT_FLAG, count);
        }

        if !seen_section {
            return Err(OpcodeTableError::MissingSection);
        }
        Ok(table)
    }

    pub fn insert(&mut self, opcode: u16, param_count: i8) {
        self.params.insert(opcode, param_count);
    }

    /// Layer `other` on top, its entries winning
    pub fn merge(&mut self, other: OpcodeTable) {
        self.params.extend(other.params);
    }

    pub fn param_count(&self, opcode: u16) -> Option<i8> {
        self.params.get(&opcode).copied()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Table-driven decoder for SCM bytecode
#[derive(Debug, Clone)]
pub struct ScmDecoder {
    table: OpcodeTable,
}

impl ScmDecoder {
    pub fn new(table: OpcodeTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &OpcodeTable {
        &self.table
    }
}

impl Default for ScmDecoder {
    fn default() -> Self {
        Self::new(OpcodeTable::builtin())
    }
}

impl InstructionDecoder for ScmDecoder {
    fn decode(&self, code: &[u8]) -> Option<Decoded> {
        let word = u16::from_le_bytes([*code.first()?, *code.get(1)?]);
        let opcode = word & !NOT_FLAG;
        let count = self.table.param_count(opcode)?;

        let mut pos = 2;
        if count == VARIADIC {
            loop {
                if *code.get(pos)? == 0 {
                    pos += 1;
                    break;
                }
                pos += param_len(code, pos)?;
            }
        } else {
            for _ in 0..count {
                pos += param_len(code, pos)?;
            }
        }

        Some(Decoded { opcode, len: pos })
    }
}

/// Length of the parameter at `pos`, type byte included
fn param_len(code: &[u8], pos: usize) -> Option<usize> {
    let kind = *code.get(pos)?;
    let len = match kind {
        0x00 => return None,
        0x04 => 2,
        0x02 | 0x03 | 0x05 | 0x0A | 0x0B | 0x10 | 0x11 => 3,
        0x01 | 0x06 => 5,
        0x07 | 0x08 | 0x0C | 0x0D | 0x12 | 0x13 => 7,
        0x09 => 9,
        0x0E => 2 + usize::from(*code.get(pos + 1)?),
        0x0F => 17,
        // untagged 8-byte string; the type byte is its first character
        _ => 8,
    };
    (pos + len <= code.len()).then_some(len)
}
