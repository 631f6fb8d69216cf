//! # gtasave
//!
//! San Andreas save file library: decoding, rewriting and script embedding.
//!
//! This library provides functionality to:
//! - Detect which platform wrote a save (PC, mobile, PS2, PS2 Japan)
//! - Decode and re-encode the variables and script blocks byte-for-byte
//! - Grow the global variable store and embed compiled SCM code as a new
//!   running script
//! - Recompute the trailing checksum
//!
//! ## Example
//!
//! ```no_run
//! use std::fs;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let save = fs::read("GTASAsf1.b")?;
//! let code = fs::read("script.cs")?;
//!
//! let decoder = gtasave::ScmDecoder::default();
//! let injection = gtasave::inject(&save, &code, &gtasave::InjectOptions::default(), &decoder)?;
//!
//! println!("Embedded at byte {:?}", injection.report.position);
//! fs::write("GTASAsf2.b", injection.bytes)?;
//! # Ok(())
//! # }
//! ```

pub mod backup;
pub mod inject;
pub mod platform;
pub mod save;
pub mod scm;

#[cfg(test)]
pub(crate) mod test_support;

#[doc(inline)]
pub use backup::{backup_before_write, record_write, BackupError};
#[doc(inline)]
pub use inject::{
    inject, inspect, rewrite, InjectOptions, InjectReport, Injection, SaveSummary, ScriptSummary,
    PC_SAVE_LEN,
};
#[doc(inline)]
pub use platform::{Platform, PlatformKind};
#[doc(inline)]
pub use save::{SaveError, ScriptBlock, VarBlock};
#[doc(inline)]
pub use scm::{
    relocate, Decoded, InstructionDecoder, OpcodeTable, OpcodeTableError, RelocationIssue,
    RelocationReport, ScmDecoder,
};
