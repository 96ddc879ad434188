//! Normalized build artifacts and the adapters producing them.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use solnorm_utils::{
    config::IdeKind,
    fs::sol_files_by_directory,
    path::{absolutize, to_slash_string},
};

pub mod dependency;
pub mod ide;
pub mod index;

/// File paths in compiler file-index order. A source map's file index points into this list.
pub type SourceList = Vec<String>;

/// One compiled contract, as produced by an adapter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractArtifact {
    pub contract_name: String,
    pub bytecode: String,
    pub deployed_bytecode: String,
    pub source_map: String,
    pub deployed_source_map: String,
    pub source_list: SourceList,
    pub main_source: String,
}

/// One compiled source file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub path: String,
    pub source: String,
    pub ast: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_ast: Option<Value>,
    /// The file index this source had in its compilation, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_index: Option<usize>,
    /// The un-instrumented text, when the artifact was built from an instrumented copy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_source: Option<String>,
}

/// Contracts grouped by the path of the source file declaring them.
pub type ContractsBySource = BTreeMap<String, Vec<ContractArtifact>>;

/// Source records keyed by source path.
pub type Sources = BTreeMap<String, SourceRecord>;

/// The normalized view every build tool adapter provides.
pub trait IdeArtifacts {
    /// The build tool the artifacts were produced by.
    fn kind(&self) -> IdeKind;

    /// Contracts of the included source files, grouped by source path.
    fn contracts(&self) -> &ContractsBySource;

    /// Every source referenced by an included contract.
    fn sources(&self) -> &Sources;

    /// The compiler version the artifacts were built with, if recorded.
    fn solc_version(&self) -> Option<&str> {
        None
    }
}

/// The set of source files whose contracts an adapter returns.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum IncludeSet {
    #[default]
    All,
    Only(BTreeSet<PathBuf>),
}

impl IncludeSet {
    /// Expands `targets` (files or directories) into the set of Solidity files they denote.
    /// Relative targets are resolved against `project_dir`. No targets means everything.
    pub fn from_targets(targets: &[PathBuf], project_dir: &Path) -> Self {
        if targets.is_empty() {
            return Self::All;
        }

        let files = targets
            .iter()
            .flat_map(|target| sol_files_by_directory(absolutize(target, project_dir)))
            .map(|file| absolutize(file, project_dir))
            .collect::<BTreeSet<_>>();
        debug!(n = files.len(), "expanded targets");
        Self::Only(files)
    }

    /// Returns true if `source_path`, as recorded in an artifact, is included. Relative
    /// source paths are resolved against `project_dir`.
    pub fn contains(&self, source_path: &str, project_dir: &Path) -> bool {
        match self {
            Self::All => true,
            Self::Only(files) => files.contains(&absolutize(source_path, project_dir)),
        }
    }

    /// The included files as `/`-separated strings, or `None` if everything is included.
    pub fn files(&self) -> Option<Vec<String>> {
        match self {
            Self::All => None,
            Self::Only(files) => Some(files.iter().map(|f| to_slash_string(f)).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_include_set() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("contracts/lib")).unwrap();
        fs::write(root.join("contracts/A.sol"), "").unwrap();
        fs::write(root.join("contracts/lib/B.sol"), "").unwrap();

        let all = IncludeSet::from_targets(&[], root);
        assert_eq!(all, IncludeSet::All);
        assert!(all.contains("anything.sol", root));
        assert_eq!(all.files(), None);

        let only = IncludeSet::from_targets(&[PathBuf::from("contracts/lib")], root);
        assert!(only.contains("contracts/lib/B.sol", root));
        assert!(only.contains(&root.join("contracts/lib/B.sol").to_string_lossy(), root));
        assert!(!only.contains("contracts/A.sol", root));
        assert_eq!(only.files().unwrap().len(), 1);

        let none = IncludeSet::from_targets(&[PathBuf::from("missing")], root);
        assert!(!none.contains("contracts/A.sol", root));
    }
}
