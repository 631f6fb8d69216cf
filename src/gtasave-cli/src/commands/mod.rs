//! Command handlers for gtasave CLI
//!
//! Each subcommand has its own module with handler functions.

pub mod configure;
pub mod embed;
pub mod inspect;
