//! # solnorm-utils
//!
//! Filesystem, path and configuration helpers shared by the solnorm crates.

#[macro_use]
extern crate tracing;

pub mod config;
pub mod fs;
pub mod path;
