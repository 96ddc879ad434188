use std::path::Path;

use serde_json::Value;
use solnorm_utils::config::IdeKind;

use super::{
    compiler_version, legacy_ast, original_source, source_list_from_indices, ProjectOptions,
};
use crate::{
    artifact::{
        index::{BuildFile, BuildIndex},
        ContractArtifact, ContractsBySource, IdeArtifacts, SourceList, SourceRecord, Sources,
    },
    error::{Error, Result},
};

const SOURCE_KEY: &str = "sourcePath";

/// Artifacts of a Brownie project: one JSON file per contract, each carrying the
/// `allSourcePaths` index table of its compilation.
#[derive(Debug)]
pub struct BrownieArtifacts {
    contracts: ContractsBySource,
    sources: Sources,
    solc_version: Option<String>,
}

impl BrownieArtifacts {
    pub const DEFAULT_BUILD_DIR: &'static str = "build/contracts";

    pub fn new(options: &ProjectOptions) -> Result<Self> {
        let build_dir = options.build_dir_or(Self::DEFAULT_BUILD_DIR);
        let index = BuildIndex::load(&build_dir, SOURCE_KEY, |_| false)?;

        let mut contracts = ContractsBySource::new();
        let mut sources = Sources::new();
        let mut solc_version = options.solc_version.clone();

        for source in index.source_paths() {
            if !options.include.contains(source, &options.project_dir) {
                trace!(source, "not included");
                continue;
            }

            for file in index.artifacts_for(source) {
                debug!(path = ?file.path, "getting artifacts");
                let contract = contract(file, source)?;

                for (file_index, path) in contract.source_list.iter().enumerate() {
                    if path.is_empty() || sources.contains_key(path) {
                        continue;
                    }
                    let Some(origin) = index.first(path) else {
                        debug!(%path, "source not found among build artifacts");
                        continue;
                    };
                    let record = source_record(origin, path, file_index, &options.project_dir)?;
                    sources.insert(path.clone(), record);
                }

                if solc_version.is_none() {
                    solc_version = compiler_version(file);
                }
                contracts.entry(source.to_string()).or_default().push(contract);
            }
        }

        Ok(Self { contracts, sources, solc_version })
    }
}

/// Reads the `allSourcePaths` table, an object from stringified index to path.
fn all_source_paths(file: &BuildFile) -> Result<SourceList> {
    let table = file.required("allSourcePaths")?.as_object().ok_or_else(|| {
        Error::build_artifacts(&file.path, "allSourcePaths is not an object")
    })?;

    let entries = table
        .iter()
        .map(|(key, path)| {
            let index = key.parse::<usize>().ok();
            index.zip(path.as_str()).map(|(i, p)| (i, p.to_string())).ok_or_else(|| {
                Error::build_artifacts(&file.path, format!("invalid allSourcePaths entry {key:?}"))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    source_list_from_indices(&file.path, entries)
}

fn contract(file: &BuildFile, source: &str) -> Result<ContractArtifact> {
    Ok(ContractArtifact {
        contract_name: file.required_str("contractName")?.to_string(),
        bytecode: file.required_str("bytecode")?.to_string(),
        deployed_bytecode: file.required_str("deployedBytecode")?.to_string(),
        source_map: file.required_str("sourceMap")?.to_string(),
        deployed_source_map: file.required_str("deployedSourceMap")?.to_string(),
        source_list: all_source_paths(file)?,
        main_source: source.to_string(),
    })
}

/// Builds the record of `path`. The artifact text is what the source maps point into, so it
/// stays the primary text even when an un-instrumented copy exists on disk.
fn source_record(
    origin: &BuildFile,
    path: &str,
    file_index: usize,
    project_dir: &Path,
) -> Result<SourceRecord> {
    Ok(SourceRecord {
        path: path.to_string(),
        source: origin.required_str("source")?.to_string(),
        ast: origin.data.get("ast").cloned().unwrap_or(Value::Null),
        legacy_ast: legacy_ast(origin),
        file_index: Some(file_index),
        original_source: original_source(path, project_dir),
    })
}

impl IdeArtifacts for BrownieArtifacts {
    fn kind(&self) -> IdeKind {
        IdeKind::Brownie
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
