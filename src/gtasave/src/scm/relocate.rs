//! Rewriting jump targets after code moves.
//!
//! Custom scripts address their labels as negative offsets from their own
//! start. Once the code is copied into the global store at `byte_offset`, those
//! labels become absolute: `-old + byte_offset`.

use serde::Serialize;

use super::InstructionDecoder;

pub const JUMP: u16 = 0x0002;
pub const JUMP_IF_FALSE: u16 = 0x004D;
pub const GOSUB: u16 = 0x0050;
pub const SWITCH_START: u16 = 0x0871;
pub const SWITCH_CONTINUE: u16 = 0x0872;

/// Opcode word plus the operand's type byte
const ADDRESS_OPERAND_OFFSET: usize = 3;

/// Something the relocator could not handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelocationIssue {
    /// The decoder rejected the bytes here; nothing after this was visited
    Malformed { offset: usize },
    /// A jump whose address runs past the end of the code
    TruncatedOperand { offset: usize, opcode: u16 },
    /// Switch tables hold several addresses and are left as-is
    UnsupportedOpcodeFamily { offset: usize, opcode: u16 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelocationReport {
    pub instructions: usize,
    /// Offsets of the instructions whose address was rewritten
    pub patched: Vec<usize>,
    pub issues: Vec<RelocationIssue>,
}

impl RelocationReport {
    /// Where decoding stopped, if it stopped early
    pub fn malformed_offset(&self) -> Option<usize> {
        self.issues.iter().find_map(|issue| match issue {
            RelocationIssue::Malformed { offset } => Some(*offset),
            _ => None,
        })
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Relocate every jump, conditional jump and gosub in `code` to `byte_offset`
pub fn relocate<D: InstructionDecoder + ?Sized>(
    code: &mut [u8],
    byte_offset: u32,
    decoder: &D,
) -> RelocationReport {
    let mut report = RelocationReport::default();
    let mut offset = 0;

    while offset < code.len() {
        let decoded = match decoder.decode(&code[offset..]) {
            Some(decoded) if decoded.len > 0 => decoded,
            _ => {
                tracing::warn!(offset, "bad instruction, stopping relocation");
                report.issues.push(RelocationIssue::Malformed { offset });
                break;
            }
        };
        report.instructions += 1;

        match decoded.opcode {
            JUMP | JUMP_IF_FALSE | GOSUB => {
                // The address must lie inside this instruction as well as the buffer.
                let start = offset + ADDRESS_OPERAND_OFFSET;
                let operand = if ADDRESS_OPERAND_OFFSET + 4 <= decoded.len {
                    code.get_mut(start..start + 4)
                } else {
                    None
                };
                match operand {
                    Some(operand) => {
                        let mut bytes = [0u8; 4];
                        bytes.copy_from_slice(operand);
                        let old = i32::from_le_bytes(bytes);
                        let new = old.wrapping_neg().wrapping_add(byte_offset as i32);
                        operand.copy_from_slice(&new.to_le_bytes());

                        tracing::debug!(
                            offset,
                            opcode = decoded.opcode,
                            old,
                            new,
                            "patched address"
                        );
                        report.patched.push(offset);
                    }
                    None => {
                        tracing::warn!(
                            offset,
                            opcode = decoded.opcode,
                            "address operand is truncated"
                        );
                        report.issues.push(RelocationIssue::TruncatedOperand {
                            offset,
                            opcode: decoded.opcode,
                        });
                    }
                }
            }
            SWITCH_START | SWITCH_CONTINUE => {
                tracing::warn!(
                    offset,
                    opcode = decoded.opcode,
                    "switch targets are not relocated"
                );
                report.issues.push(RelocationIssue::UnsupportedOpcodeFamily {
                    offset,
                    opcode: decoded.opcode,
                });
            }
            _ => {}
        }

        offset += decoded.len;
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scm::{Decoded, ScmDecoder};

    fn jump(opcode: u16, address: i32) -> Vec<u8> {
        let mut bytes = opcode.to_le_bytes().to_vec();
        bytes.push(0x01);
        bytes.extend_from_slice(&address.to_le_bytes());
        bytes
    }

    fn address_at(code: &[u8], offset: usize) -> i32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&code[offset + 3..offset + 7]);
        i32::from_le_bytes(bytes)
    }

    #[test]
    fn test_relocates_jumps_and_calls() {
        // wait 0; jump -19; jf -26; gosub -33; terminate
        let mut code = vec![0x01, 0x00, 0x04, 0x00];
        code.extend(jump(JUMP, -19));
        code.extend(jump(JUMP_IF_FALSE, -26));
        code.extend(jump(GOSUB, -33));
        code.extend([0x4E, 0x00]);
        let original = code.clone();

        let report = relocate(&mut code, 40_000, &ScmDecoder::default());

        assert!(report.is_clean());
        assert_eq!(report.instructions, 5);
        assert_eq!(report.patched, vec![4, 11, 18]);
        assert_eq!(address_at(&code, 4), 40_019);
        assert_eq!(address_at(&code, 11), 40_026);
        assert_eq!(address_at(&code, 18), 40_033);

        assert_eq!(code[..4], original[..4]);
        assert_eq!(code[25..], original[25..]);
    }

    #[test]
    fn test_negated_jump_is_still_relocated() {
        let mut code = jump(JUMP_IF_FALSE | 0x8000, -8);
        relocate(&mut code, 100, &ScmDecoder::default());
        assert_eq!(address_at(&code, 0), 108);
    }

    #[test]
    fn test_wrapping_arithmetic() {
        let mut code = jump(JUMP, i32::MIN);
        let report = relocate(&mut code, 4, &ScmDecoder::default());
        assert!(report.is_clean());
        assert_eq!(address_at(&code, 0), i32::MIN.wrapping_add(4));
    }

    #[test]
    fn test_malformed_stops_walk() {
        let mut code = jump(JUMP, -4);
        code.extend([0xFF, 0x7F, 0x01]);
        code.extend(jump(JUMP, -4));
        let tail = code[10..].to_vec();

        let report = relocate(&mut code, 1000, &ScmDecoder::default());

        assert_eq!(report.malformed_offset(), Some(7));
        assert_eq!(report.patched, vec![0]);
        assert_eq!(code[10..], tail[..]);
    }

    #[test]
    fn test_switch_is_reported() {
        struct FourBytes;
        impl InstructionDecoder for FourBytes {
            fn decode(&self, code: &[u8]) -> Option<Decoded> {
                let opcode = u16::from_le_bytes([*code.first()?, *code.get(1)?]);
                Some(Decoded { opcode, len: 4 })
            }
        }

        let mut code = vec![
            0x71, 0x08, 0x01, 0x00, 0x72, 0x08, 0x01, 0x00, 0x01, 0x00, 0, 0,
        ];
        let original = code.clone();
        let report = relocate(&mut code, 10, &FourBytes);

        assert_eq!(report.instructions, 3);
        assert_eq!(
            report.issues,
            vec![
                RelocationIssue::UnsupportedOpcodeFamily {
                    offset: 0,
                    opcode: SWITCH_START
                },
                RelocationIssue::UnsupportedOpcodeFamily {
                    offset: 4,
                    opcode: SWITCH_CONTINUE
                },
            ]
        );
        assert_eq!(code, original);
    }

    #[test]
    fn test_truncated_operand_continues() {
        struct ShortJumps;
        impl InstructionDecoder for ShortJumps {
            fn decode(&self, code: &[u8]) -> Option<Decoded> {
                let opcode = u16::from_le_bytes([code[0], code[1]]);
                Some(Decoded {
                    opcode,
                    len: if opcode == JUMP { 4 } else { 2 },
                })
            }
        }

        // a jump whose decoded length is too short for its address, then
        // instructions whose bytes sit where the address would be
        let mut code = vec![0x02, 0x00, 0x04, 0x00, 0x4E, 0x00, 0x4E, 0x00];
        let original = code.clone();
        let report = relocate(&mut code, 10, &ShortJumps);

        assert_eq!(report.instructions, 3);
        assert!(report.patched.is_empty());
        assert_eq!(code, original);
        assert_eq!(
            report.issues,
            vec![RelocationIssue::TruncatedOperand {
                offset: 0,
                opcode: JUMP
            }]
        );
    }

    #[test]
    fn test_zero_length_decode_is_malformed() {
        struct Stuck;
        impl InstructionDecoder for Stuck {
            fn decode(&self, _code: &[u8]) -> Option<Decoded> {
                Some(Decoded { opcode: 0, len: 0 })
            }
        }
        let report = relocate(&mut [0u8; 4], 0, &Stuck);
        assert_eq!(report.malformed_offset(), Some(0));
    }
}
