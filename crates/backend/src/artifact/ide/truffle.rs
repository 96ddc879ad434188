use std::{collections::BTreeSet, path::Path};

use solnorm_utils::config::IdeKind;

use super::{compiler_version, legacy_ast, source_list_from_indices, ProjectOptions};
use crate::{
    analysis::source_map::zero_file_index,
    artifact::{
        dependency::DependencyMap,
        index::{BuildFile, BuildIndex},
        ContractArtifact, ContractsBySource, IdeArtifacts, IncludeSet, SourceList, SourceRecord,
        Sources,
    },
    error::{Error, Result},
    utils::ast::source_unit_index,
};

const SOURCE_KEY: &str = "sourcePath";

/// Artifacts of a Truffle project: one JSON file per contract under `build/contracts`.
#[derive(Debug)]
pub struct TruffleArtifacts {
    contracts: ContractsBySource,
    sources: Sources,
    solc_version: Option<String>,
    dependencies: DependencyMap,
}

impl TruffleArtifacts {
    pub const DEFAULT_BUILD_DIR: &'static str = "build/contracts";

    pub fn new(options: &ProjectOptions) -> Result<Self> {
        let build_dir = options.build_dir_or(Self::DEFAULT_BUILD_DIR);
        let index = BuildIndex::load(&build_dir, SOURCE_KEY, |_| false)?;
        let mut artifacts = Self::from_index(&index, &options.include, &options.project_dir)?;
        if options.solc_version.is_some() {
            artifacts.solc_version.clone_from(&options.solc_version);
        }
        Ok(artifacts)
    }

    pub fn from_index(index: &BuildIndex, include: &IncludeSet, project_dir: &Path) -> Result<Self> {
        let dependencies = DependencyMap::build(index, SOURCE_KEY);
        let mut contracts = ContractsBySource::new();
        let mut sources = Sources::new();
        let mut solc_version = None;

        for source in index.source_paths() {
            if !include.contains(source, project_dir) {
                trace!(source, "not included");
                continue;
            }

            for file in index.artifacts_for(source) {
                if let Some(import) = dependencies.unresolved(&file.path).first() {
                    let err = Error::source(
                        import.as_str(),
                        format!("imported by {} but matches no build artifact", file.path.display()),
                    );
                    warn!(%err, "skipping contract");
                    continue;
                }

                let dependency_sources: BTreeSet<&str> = dependencies
                    .dependencies(&file.path)
                    .filter_map(|dep| index.source_of(dep, SOURCE_KEY))
                    .filter(|dep| *dep != source)
                    .collect();
                let (source_list, rehome) = source_list(index, file, source, &dependency_sources)?;

                let contract = contract(file, source, source_list, rehome)?;
                trace!(contract = %contract.contract_name, source_list = ?contract.source_list, "loaded contract");

                for (file_index, path) in contract.source_list.iter().enumerate() {
                    if path.is_empty() || sources.contains_key(path) {
                        continue;
                    }
                    let Some(origin) = index.first(path) else {
                        debug!(%path, "source not found among build artifacts");
                        continue;
                    };
                    sources.insert(path.clone(), source_record(origin, path, file_index)?);
                }

                if solc_version.is_none() {
                    solc_version = compiler_version(file);
                }
                contracts.entry(source.to_string()).or_default().push(contract);
            }
        }

        Ok(Self { contracts, sources, solc_version, dependencies })
    }

    pub fn dependencies(&self) -> &DependencyMap {
        &self.dependencies
    }
}

/// Lays out the source list of a contract declared in `own` that directly imports
/// `imports`.
///
/// When the AST of every involved file records its compiler file index, the list follows
/// those indices and the source maps can be used as they are. Otherwise the own file goes
/// first and the source maps must be rehomed onto index 0; the returned flag says so.
fn source_list(
    index: &BuildIndex,
    file: &BuildFile,
    own: &str,
    imports: &BTreeSet<&str>,
) -> Result<(SourceList, bool)> {
    let files: Vec<&str> = std::iter::once(own).chain(imports.iter().copied()).collect();

    let positions: Option<Vec<(usize, String)>> = files
        .iter()
        .map(|&file| {
            let ast = index.first(file)?.data.get("ast")?;
            Some((source_unit_index(ast)?, file.to_string()))
        })
        .collect();

    if let Some(positions) = positions {
        let distinct: BTreeSet<_> = positions.iter().map(|(i, _)| *i).collect();
        if distinct.len() == positions.len() {
            return Ok((source_list_from_indices(&file.path, positions)?, false));
        }
    }

    Ok((files.into_iter().map(str::to_string).collect(), true))
}

fn contract(file: &BuildFile, source: &str, source_list: SourceList, rehome: bool) -> Result<ContractArtifact> {
    let source_map = file.required_str("sourceMap")?;
    let deployed_source_map = file.required_str("deployedSourceMap")?;
    let (source_map, deployed_source_map) = if rehome {
        (zero_file_index(source_map, 0), zero_file_index(deployed_source_map, 0))
    } else {
        (source_map.to_string(), deployed_source_map.to_string())
    };

    Ok(ContractArtifact {
        contract_name: file.required_str("contractName")?.to_string(),
        bytecode: file.required_str("bytecode")?.to_string(),
        deployed_bytecode: file.required_str("deployedBytecode")?.to_string(),
        source_map,
        deployed_source_map,
        source_list,
        main_source: source.to_string(),
    })
}

fn source_record(origin: &BuildFile, path: &str, file_index: usize) -> Result<SourceRecord> {
    Ok(SourceRecord {
        path: path.to_string(),
        source: origin.required_str("source")?.to_string(),
        ast: origin.required("ast")?.clone(),
        legacy_ast: legacy_ast(origin),
        file_index: Some(file_index),
        original_source: None,
    })
}

impl IdeArtifacts for TruffleArtifacts {
    fn kind(&self) -> IdeKind {
        IdeKind::Truffle
    }

    fn contracts(&self) -> &ContractsBySource {
        &self.contracts
    }

    fn sources(&self) -> &Sources {
        &self.sources
    }

    fn solc_version(&self) -> Option<&str> {
        self.solc_version.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use serde_json::{json, Value};

    use super::*;
    use crate::payload::PayloadAssembler;

    fn truffle_artifact(name: &str, source_path: &str, src: &str, imports: &[&str]) -> Value {
        let mut nodes: Vec<Value> = imports
            .iter()
            .map(|i| json!({"nodeType": "ImportDirective", "absolutePath": i}))
            .collect();
        nodes.push(json!({"nodeType": "ContractDefinition", "name": name}));
        json!({
            "contractName": name,
            "bytecode": "0x6080__Lib___________________________________00",
            "deployedBytecode": "0x6080",
            "sourceMap": "0:10:0:-;10:5:2",
            "deployedSourceMap": "0:10:0",
            "sourcePath": source_path,
            "source": format!("contract {name} {{}}"),
            "ast": {"nodeType": "SourceUnit", "absolutePath": source_path, "src": src, "nodes": nodes},
            "legacyAST": {"name": "SourceUnit"},
            "compiler": {"name": "solc", "version": "0.5.16+commit.9c3226ce.Emscripten.clang"},
        })
    }

    fn write_build(dir: &Path, artifacts: &[Value]) -> PathBuf {
        let build_dir = dir.join(TruffleArtifacts::DEFAULT_BUILD_DIR);
        fs::create_dir_all(&build_dir).unwrap();
        for artifact in artifacts {
            let name = artifact["contractName"].as_str().unwrap();
            fs::write(build_dir.join(format!("{name}.json")), serde_json::to_string(artifact).unwrap())
                .unwrap();
        }
        build_dir
    }

    #[test]
    fn test_dependency_sources_attached() {
        let dir = tempfile::tempdir().unwrap();
        let build_dir = write_build(
            dir.path(),
            &[
                truffle_artifact("A", "/p/contracts/A.sol", "0:100", &["/p/contracts/B.sol"]),
                truffle_artifact("B", "/p/contracts/B.sol", "0:50", &[]),
            ],
        );

        let artifacts = TruffleArtifacts::new(&ProjectOptions::new(dir.path())).unwrap();
        assert_eq!(
            artifacts.dependencies().dependencies(&build_dir.join("A.json")).collect::<Vec<_>>(),
            vec![build_dir.join("B.json").as_path()]
        );

        let a = &artifacts.contracts()["/p/contracts/A.sol"][0];
        assert_eq!(a.contract_name, "A");
        assert_eq!(a.main_source, "/p/contracts/A.sol");
        assert_eq!(a.source_list, vec!["/p/contracts/A.sol", "/p/contracts/B.sol"]);
        // No file indices in the ASTs: the maps are rehomed onto the own file.
        assert_eq!(a.source_map, "0:10:0:-;10:5:0");

        let b = &artifacts.sources()["/p/contracts/B.sol"];
        assert_eq!(b.source, "contract B {}");
        assert_eq!(b.ast["absolutePath"], "/p/contracts/B.sol");
        assert_eq!(b.file_index, Some(1));
        assert!(b.legacy_ast.is_some());
        assert_eq!(artifacts.solc_version(), Some("0.5.16+commit.9c3226ce.Emscripten.clang"));
        assert_eq!(artifacts.kind(), IdeKind::Truffle);
    }

    #[test]
    fn test_source_list_follows_ast_indices() {
        let dir = tempfile::tempdir().unwrap();
        write_build(
            dir.path(),
            &[
                truffle_artifact("A", "/p/A.sol", "0:100:2", &["/p/B.sol"]),
                truffle_artifact("B", "/p/B.sol", "0:50:0", &[]),
            ],
        );

        let artifacts = TruffleArtifacts::new(&ProjectOptions::new(dir.path())).unwrap();
        let a = &artifacts.contracts()["/p/A.sol"][0];
        assert_eq!(a.source_list, vec!["/p/B.sol", "", "/p/A.sol"]);
        assert_eq!(a.source_map, "0:10:0:-;10:5:2");
        assert_eq!(artifacts.sources()["/p/A.sol"].file_index, Some(2));
    }

    #[test]
    fn test_include_set_filters_contracts() {
        let dir = tempfile::tempdir().unwrap();
        let contracts_dir = dir.path().join("contracts");
        fs::create_dir_all(&contracts_dir).unwrap();
        fs::write(contracts_dir.join("A.sol"), "").unwrap();
        let a_path = contracts_dir.join("A.sol").to_string_lossy().into_owned();
        let b_path = contracts_dir.join("B.sol").to_string_lossy().into_owned();
        write_build(
            dir.path(),
            &[
                truffle_artifact("A", &a_path, "0:1", &[]),
                truffle_artifact("B", &b_path, "0:1", &[]),
            ],
        );

        let options = ProjectOptions {
            include: IncludeSet::from_targets(&[PathBuf::from("contracts/A.sol")], dir.path()),
            ..ProjectOptions::new(dir.path())
        };
        let artifacts = TruffleArtifacts::new(&options).unwrap();
        assert_eq!(artifacts.contracts().keys().collect::<Vec<_>>(), vec![&a_path]);
        assert!(!artifacts.sources().contains_key(&b_path));
    }

    #[test]
    fn test_payload_carries_dependency_sources() {
        let dir = tempfile::tempdir().unwrap();
        write_build(
            dir.path(),
            &[
                truffle_artifact("A", "/p/contracts/A.sol", "0:100", &["/p/contracts/B.sol"]),
                truffle_artifact("B", "/p/contracts/B.sol", "0:50", &[]),
            ],
        );

        let artifacts = TruffleArtifacts::new(&ProjectOptions::new(dir.path())).unwrap();
        let payload = PayloadAssembler::new(&artifacts).assemble();
        let requests = payload.requests();
        assert_eq!(requests.len(), 2);

        let a = &requests[0];
        assert_eq!(a.contract_name, "A");
        assert_eq!(a.main_source, "/p/contracts/A.sol");
        assert_eq!(a.source_list, vec!["/p/contracts/A.sol", "/p/contracts/B.sol"]);
        assert_eq!(
            a.sources.keys().collect::<Vec<_>>(),
            vec!["/p/contracts/A.sol", "/p/contracts/B.sol"]
        );
        assert_eq!(a.sources["/p/contracts/B.sol"].source, "contract B {}");
        assert_eq!(a.sources["/p/contracts/B.sol"].ast["absolutePath"], "/p/contracts/B.sol");
        assert_eq!(a.source_map, "0:10:0:-;10:5:0");
        assert!(!a.bytecode.contains("__"));

        let b = &requests[1];
        assert_eq!(b.source_list, vec!["/p/contracts/B.sol"]);
        assert_eq!(b.sources.keys().collect::<Vec<_>>(), vec!["/p/contracts/B.sol"]);
    }

    #[test]
    fn test_unresolved_import_skips_contract() {
        let dir = tempfile::tempdir().unwrap();
        write_build(
            dir.path(),
            &[
                truffle_artifact("A", "/p/A.sol", "0:1", &["/p/Gone.sol"]),
                truffle_artifact("B", "/p/B.sol", "0:1", &[]),
            ],
        );

        let a_json = dir.path().join(TruffleArtifacts::DEFAULT_BUILD_DIR).join("A.json");
        let artifacts = TruffleArtifacts::new(&ProjectOptions::new(dir.path())).unwrap();
        assert_eq!(artifacts.contracts().keys().collect::<Vec<_>>(), vec!["/p/B.sol"]);
        assert_eq!(artifacts.dependencies().unresolved(&a_json), ["/p/Gone.sol"]);
        assert!(!artifacts.sources().contains_key("/p/A.sol"));
    }

    #[test]
    fn test_out_of_range_ast_index() {
        let dir = tempfile::tempdir().unwrap();
        let build_dir = write_build(
            dir.path(),
            &[truffle_artifact("A", "/p/A.sol", "0:100:18446744073709551614", &[])],
        );

        let err = TruffleArtifacts::new(&ProjectOptions::new(dir.path())).unwrap_err();
        assert!(matches!(&err, Error::BuildArtifacts { path, .. } if path == &build_dir.join("A.json")));
    }

    #[test]
    fn test_missing_key_is_build_artifacts_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut artifact = truffle_artifact("A", "/p/A.sol", "0:1", &[]);
        artifact.as_object_mut().unwrap().remove("deployedSourceMap");
        let build_dir = write_build(dir.path(), &[artifact]);

        let err = TruffleArtifacts::new(&ProjectOptions::new(dir.path())).unwrap_err();
        assert!(matches!(&err, Error::BuildArtifacts { path, .. } if path == &build_dir.join("A.json")));

        let err = TruffleArtifacts::new(&ProjectOptions::new(dir.path().join("nowhere"))).unwrap_err();
        assert!(err.is_build_artifacts());
    }
}
