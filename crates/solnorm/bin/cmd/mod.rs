//! Subcommands of the solnorm binary.

pub mod detect;
pub mod payload;
pub mod report;
pub mod srcmap;
