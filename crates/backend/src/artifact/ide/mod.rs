//! Build tool adapters.
//!
//! Each adapter reads one build tool's artifact layout and exposes it through
//! [`IdeArtifacts`]. The build tool is detected once, from the project directory.

use std::{
    fs,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use serde_json::Value;
use solnorm_utils::{
    config::{IdeKind, ProjectConfig},
    path::absolutize,
};

use super::{index::BuildFile, ContractArtifact, IdeArtifacts, IncludeSet, SourceList};
use crate::error::{Error, Result};

mod brownie;
mod hardhat;
mod solidity;
mod truffle;

pub use brownie::BrownieArtifacts;
pub use hardhat::HardhatArtifacts;
pub use solidity::SolidityArtifacts;
pub use truffle::TruffleArtifacts;

const HARDHAT_CONFIGS: &[&str] = &["hardhat.config.js", "hardhat.config.ts", "hardhat.config.cjs"];
const TRUFFLE_CONFIGS: &[&str] = &["truffle-config.js", "truffle.js"];
const BROWNIE_CONFIGS: &[&str] = &["brownie-config.yaml", "brownie-config.yml"];

/// Suffix of the un-instrumented copy an instrumentation pass leaves next to a source.
pub const ORIGINAL_SUFFIX: &str = ".original";

/// Largest file index accepted in a source index table.
const MAX_SOURCE_INDEX: usize = u16::MAX as usize;

/// Probes `project_dir` for a build tool configuration file.
pub fn detect(project_dir: &Path) -> IdeKind {
    let has_any = |names: &[&str]| names.iter().any(|name| project_dir.join(name).is_file());

    let kind = if has_any(HARDHAT_CONFIGS) {
        IdeKind::Hardhat
    } else if has_any(TRUFFLE_CONFIGS) {
        IdeKind::Truffle
    } else if has_any(BROWNIE_CONFIGS) {
        IdeKind::Brownie
    } else {
        IdeKind::Solidity
    };
    debug!(?project_dir, %kind, "detected build tool");
    kind
}

/// Where and what to load.
#[derive(Clone, Debug, Default)]
pub struct ProjectOptions {
    /// Relative paths in artifacts and options are resolved against this directory.
    pub project_dir: PathBuf,
    /// The build directory, or for plain compiler output the output file or directory.
    /// Falls back to the build tool's default location.
    pub build_dir: Option<PathBuf>,
    pub include: IncludeSet,
    /// Overrides the compiler version recorded in the artifacts.
    pub solc_version: Option<String>,
}

impl ProjectOptions {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self { project_dir: project_dir.into(), ..Default::default() }
    }

    pub fn from_config(project_dir: impl Into<PathBuf>, config: &ProjectConfig) -> Self {
        let project_dir = project_dir.into();
        let include = IncludeSet::from_targets(&config.targets, &project_dir);
        Self {
            build_dir: config.build_directory.clone(),
            include,
            solc_version: config.solc_version.clone(),
            project_dir,
        }
    }

    /// The build directory, resolved against the project directory.
    pub fn build_dir_or(&self, default: &str) -> PathBuf {
        let dir = self.build_dir.as_deref().unwrap_or_else(|| Path::new(default));
        absolutize(dir, &self.project_dir)
    }
}

/// Loads the artifacts of a `kind` project.
pub fn load_project(kind: IdeKind, options: &ProjectOptions) -> Result<Box<dyn IdeArtifacts>> {
    debug!(%kind, project_dir = ?options.project_dir, "loading build artifacts");
    Ok(match kind {
        IdeKind::Solidity => Box::new(SolidityArtifacts::new(options)?),
        IdeKind::Truffle => Box::new(TruffleArtifacts::new(options)?),
        IdeKind::Hardhat => Box::new(HardhatArtifacts::new(options)?),
        IdeKind::Brownie => Box::new(BrownieArtifacts::new(options)?),
    })
}

/// Builds a source list from a table of `index -> path` pairs read from `origin`. Gaps are
/// left as empty strings, which never resolve.
fn source_list_from_indices(
    origin: &Path,
    entries: impl IntoIterator<Item = (usize, String)>,
) -> Result<SourceList> {
    let mut list = SourceList::new();
    for (index, path) in entries {
        if index > MAX_SOURCE_INDEX {
            return Err(Error::build_artifacts(
                origin,
                format!("source index {index} of {path} out of range"),
            ));
        }
        if list.len() <= index {
            list.resize(index + 1, String::new());
        }
        list[index] = path;
    }
    Ok(list)
}

/// Builds the source list of a standard-JSON `output.sources` object from each source's
/// `id`, falling back to enumeration order when any id is missing or repeated.
fn source_list_from_output(origin: &Path, sources: &Value) -> Result<SourceList> {
    let Some(sources) = sources.as_object() else { return Ok(vec![]) };

    let ids: Option<Vec<(usize, String)>> = sources
        .iter()
        .map(|(path, source)| {
            let id = source.get("id")?.as_u64()?;
            Some((usize::try_from(id).ok()?, path.clone()))
        })
        .collect();

    if let Some(ids) = ids.filter(|ids| ids.iter().map(|(id, _)| id).all_unique()) {
        return source_list_from_indices(origin, ids);
    }

    trace!("source ids missing or repeated, using enumeration order");
    Ok(sources.keys().cloned().collect())
}

/// Extracts a contract from its standard-JSON `evm` output.
fn contract_from_evm(
    origin: &Path,
    contract_name: &str,
    main_source: &str,
    data: &Value,
    source_list: &SourceList,
) -> Result<ContractArtifact> {
    let field = |pointer: &str| {
        data.pointer(pointer).and_then(Value::as_str).map(str::to_string).ok_or_else(|| {
            Error::build_artifacts(
                origin,
                format!("contract {contract_name} in {main_source} is missing {pointer}"),
            )
        })
    };

    Ok(ContractArtifact {
        contract_name: contract_name.to_string(),
        bytecode: field("/evm/bytecode/object")?,
        deployed_bytecode: field("/evm/deployedBytecode/object")?,
        source_map: field("/evm/bytecode/sourceMap")?,
        deployed_source_map: field("/evm/deployedBytecode/sourceMap")?,
        source_list: source_list.clone(),
        main_source: main_source.to_string(),
    })
}

/// Reads the un-instrumented copy of `path` left next to it on disk, if there is one.
fn original_source(path: &str, project_dir: &Path) -> Option<String> {
    let mut shadow = absolutize(path, project_dir).into_os_string();
    shadow.push(ORIGINAL_SUFFIX);
    let text = fs::read_to_string(&shadow).ok()?;
    debug!(%path, "attaching original source");
    Some(text)
}

/// The `compiler.version` recorded in Truffle and Brownie artifacts.
fn compiler_version(file: &BuildFile) -> Option<String> {
    file.data.pointer("/compiler/version").and_then(Value::as_str).map(str::to_string)
}

/// The legacy AST of an artifact, if it has a usable one.
fn legacy_ast(file: &BuildFile) -> Option<Value> {
    file.data.get("legacyAST").filter(|v| !v.is_null()).cloned()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;

    #[test]
    fn test_detect() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        assert_eq!(detect(root), IdeKind::Solidity);

        fs::write(root.join("brownie-config.yml"), "").unwrap();
        assert_eq!(detect(root), IdeKind::Brownie);

        fs::write(root.join("truffle-config.js"), "").unwrap();
        assert_eq!(detect(root), IdeKind::Truffle);

        fs::write(root.join("hardhat.config.ts"), "").unwrap();
        assert_eq!(detect(root), IdeKind::Hardhat);
    }

    #[test]
    fn test_source_list_from_output() {
        let origin = Path::new("out.json");
        let sources = json!({
            "contracts/B.sol": {"id": 1},
            "contracts/A.sol": {"id": 0},
            "lib/C.sol": {"id": 3},
        });
        assert_eq!(
            source_list_from_output(origin, &sources).unwrap(),
            vec!["contracts/A.sol", "contracts/B.sol", "", "lib/C.sol"]
        );

        let sources = json!({"contracts/B.sol": {}, "contracts/A.sol": {"id": 0}});
        assert_eq!(
            source_list_from_output(origin, &sources).unwrap(),
            vec!["contracts/B.sol", "contracts/A.sol"]
        );

        let sources = json!({"B.sol": {"id": 0}, "A.sol": {"id": 0}});
        assert_eq!(source_list_from_output(origin, &sources).unwrap(), vec!["B.sol", "A.sol"]);

        let sources = json!({"A.sol": {"id": 0}, "B.sol": {"id": 1u64 << 40}});
        let err = source_list_from_output(origin, &sources).unwrap_err();
        assert!(matches!(err, Error::BuildArtifacts { ref path, .. } if path == origin));
    }

    #[test]
    fn test_source_index_bound() {
        let origin = Path::new("A.json");
        let list =
            source_list_from_indices(origin, [(MAX_SOURCE_INDEX, "A.sol".to_string())]).unwrap();
        assert_eq!(list.len(), MAX_SOURCE_INDEX + 1);

        let err = source_list_from_indices(origin, [(usize::MAX - 1, "A.sol".to_string())])
            .unwrap_err();
        assert!(err.is_build_artifacts());
    }

    #[test]
    fn test_contract_from_evm() {
        let data = json!({"evm": {
            "bytecode": {"object": "6080", "sourceMap": "1:2:0"},
            "deployedBytecode": {"object": "6081", "sourceMap": "3:4:0"},
        }});
        let list = vec!["A.sol".to_string()];
        let contract = contract_from_evm(Path::new("out.json"), "A", "A.sol", &data, &list).unwrap();
        assert_eq!(contract.bytecode, "6080");
        assert_eq!(contract.deployed_source_map, "3:4:0");
        assert_eq!(contract.source_list, list);

        let err = contract_from_evm(Path::new("out.json"), "A", "A.sol", &json!({}), &list)
            .unwrap_err();
        assert!(matches!(err, Error::BuildArtifacts { .. }));
    }

    #[test]
    fn test_options_from_config() {
        let config = ProjectConfig {
            build_directory: Some(PathBuf::from("out")),
            solc_version: Some("0.8.19".into()),
            ..Default::default()
        };
        let options = ProjectOptions::from_config("/p", &config);
        assert_eq!(options.build_dir_or("artifacts"), PathBuf::from("/p/out"));
        assert_eq!(options.include, IncludeSet::All);
        assert_eq!(ProjectOptions::new("/p").build_dir_or("artifacts"), PathBuf::from("/p/artifacts"));
    }
}
