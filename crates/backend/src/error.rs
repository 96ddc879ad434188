use std::{io, path::PathBuf};

/// Errors raised while normalizing build artifacts.
///
/// The variants fall into two classes. Environment errors (`BuildArtifacts`,
/// `MalformedArtifact`, `Io`) mean the build directory cannot be used at all and abort
/// adapter construction. Data errors (`Source`, `Payload`, `InvalidSourceMap`) abort the
/// contract being assembled. Conditions that are merely skipped, such as a source map
/// entry with an out-of-range file index or an interface without bytecode, are never
/// reported through this type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("build artifacts error at {path:?}: {reason}")]
    BuildArtifacts { path: PathBuf, reason: String },

    #[error("malformed build artifact {path:?}")]
    MalformedArtifact {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("source error for {path}: {reason}")]
    Source { path: String, reason: String },

    #[error("failed to assemble payload for contract {contract}: {source}")]
    Payload {
        contract: String,
        #[source]
        source: Box<Error>,
    },

    #[error("invalid source map entry {entry}: {reason}")]
    InvalidSourceMap { entry: usize, reason: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn build_artifacts(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::BuildArtifacts { path: path.into(), reason: reason.into() }
    }

    pub(crate) fn source(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Source { path: path.into(), reason: reason.into() }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Wraps a data error into a payload error for `contract`.
    pub(crate) fn payload(contract: impl Into<String>, source: Self) -> Self {
        Self::Payload { contract: contract.into(), source: Box::new(source) }
    }

    /// Returns true for errors caused by an unusable build environment.
    pub fn is_build_artifacts(&self) -> bool {
        matches!(self, Self::BuildArtifacts { .. } | Self::MalformedArtifact { .. } | Self::Io { .. })
    }
}
