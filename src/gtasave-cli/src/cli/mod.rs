//! CLI argument definitions for gtasave
//!
//! This module contains all clap-derived structs and enums for CLI parsing.

mod core;

pub use core::{Cli, Commands, EmbedArgs};
