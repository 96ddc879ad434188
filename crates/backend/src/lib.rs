//! # solnorm-backend
//!
//! Normalizes the build output of Truffle, Hardhat, Brownie and plain solc projects into
//! analysis payloads, and maps analysis issue locations back to source lines.

#[macro_use]
extern crate tracing;

pub mod analysis;
pub mod artifact;
mod error;
pub mod payload;
pub mod report;
pub mod utils;

pub use artifact::{
    ide::{detect, load_project, ProjectOptions},
    ContractArtifact, IdeArtifacts, IncludeSet, SourceList, SourceRecord,
};
pub use error::{Error, Result};
pub use payload::{sanitize_paths, AnalysisPayload, PayloadAssembler};
pub use solnorm_utils::config::IdeKind;
