use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde_json::Value;
use solnorm_utils::config::IdeKind;

use super::{contract_from_evm, original_source, source_list_from_output, ProjectOptions};
use crate::{
    artifact::{
        index::{load_build_files, read_json, BuildFile, BuildIndex},
        ContractsBySource, IdeArtifacts, SourceList, SourceRecord, Sources,
    },
    error::{Error, Result},
};

const SOURCE_KEY: &str = "sourceName";
const BUILD_INFO_DIR: &str = "build-info";
const DEBUG_SUFFIX: &str = ".dbg.json";

/// A parsed build-info file, shared by every contract of one compilation.
struct BuildInfo {
    path: PathBuf,
    source_list: SourceList,
    data: Value,
}

/// Artifacts of a Hardhat project.
///
/// Every contract has an artifact under `artifacts/<source>/<Name>.json` and a debug file
/// `<Name>.dbg.json` next to it. The debug file names the build-info file under
/// `artifacts/build-info/` that holds the full compiler input and output.
#[derive(Debug)]
pub struct HardhatArtifacts {
    contracts: ContractsBySource,
    sources: Sources,
    solc_version: Option<String>,
}

impl HardhatArtifacts {
    pub const DEFAULT_BUILD_DIR: &'static str = "artifacts";

    pub fn new(options: &ProjectOptions) -> Result<Self> {
        let build_dir = options.build_dir_or(Self::DEFAULT_BUILD_DIR);
        let files: Vec<_> = load_build_files(&build_dir, |dir| dir.ends_with(BUILD_INFO_DIR))?
            .into_iter()
            .filter(|file| !is_debug_file(&file.path))
            .collect();
        if files.is_empty() {
            return Err(Error::build_artifacts(&build_dir, "no build artifacts found"));
        }
        let index = BuildIndex::new(files, SOURCE_KEY)?;

        let mut build_infos: BTreeMap<PathBuf, BuildInfo> = BTreeMap::new();
        let mut contracts = ContractsBySource::new();
        let mut sources = Sources::new();
        let mut solc_version = options.solc_version.clone();

        for source in index.source_paths() {
            if !options.include.contains(source, &options.project_dir) {
                trace!(source, "not included");
                continue;
            }

            for file in index.artifacts_for(source) {
                let contract_name = file.required_str("contractName")?;
                let info_path = build_info_path(&build_dir, file)?;
                if !build_infos.contains_key(&info_path) {
                    let info = BuildInfo::load(&info_path)?;
                    build_infos.insert(info_path.clone(), info);
                }
                let info = &build_infos[&info_path];

                let data = info
                    .data
                    .pointer("/output/contracts")
                    .and_then(|c| c.get(source))
                    .and_then(|c| c.get(contract_name))
                    .ok_or_else(|| {
                        Error::build_artifacts(
                            &info.path,
                            format!("build info has no output for {source}:{contract_name}"),
                        )
                    })?;
                let contract = contract_from_evm(&info.path, contract_name, source, data, &info.source_list)?;

                info.add_sources(&mut sources, &options.project_dir);
                if solc_version.is_none() {
                    solc_version =
                        info.data.get("solcVersion").and_then(Value::as_str).map(str::to_string);
                }
                contracts.entry(source.to_string()).or_default().push(contract);
            }
        }

        debug!(contracts = contracts.len(), build_infos = build_infos.len(), "loaded hardhat artifacts");
        Ok(Self { contracts, sources, solc_version })
    }
}

impl BuildInfo {
    fn load(path: &Path) -> Result<Self> {
        trace!(?path, "reading build info");
        let data = read_json(path)?;
        let output_sources = data.pointer("/output/sources").ok_or_else(|| {
            Error::build_artifacts(path, "build info is missing output.sources")
        })?;
        let source_list = source_list_from_output(path, output_sources)?;
        Ok(Self { path: path.to_path_buf(), source_list, data })
    }

    /// Adds a record for every source of this compilation not yet in `sources`.
    fn add_sources(&self, sources: &mut Sources, project_dir: &Path) {
        for (file_index, path) in self.source_list.iter().enumerate() {
            if path.is_empty() || sources.contains_key(path) {
                continue;
            }

            let content = self
                .data
                .pointer("/input/sources")
                .and_then(|s| s.get(path))
                .and_then(|s| s.get("content"))
                .and_then(Value::as_str);
            let Some(content) = content else {
                debug!(%path, build_info = ?self.path, "build info has no content for source");
                continue;
            };
            let ast = self
                .data
                .pointer("/output/sources")
                .and_then(|s| s.get(path))
                .and_then(|s| s.get("ast"))
                .cloned()
                .unwrap_or(Value::Null);

            sources.insert(
                path.clone(),
                SourceRecord {
                    path: path.clone(),
                    source: content.to_string(),
                    ast,
                    legacy_ast: None,
                    file_index: Some(file_index),
                    original_source: original_source(path, project_dir),
                },
            );
        }
    }
}

fn is_debug_file(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.ends_with(DEBUG_SUFFIX))
}

/// Follows the debug file next to `artifact` to the build-info file it names.
fn build_info_path(build_dir: &Path, artifact: &BuildFile) -> Result<PathBuf> {
    let debug_path = artifact.path.with_extension("dbg.json");
    if !debug_path.is_file() {
        return Err(Error::build_artifacts(&debug_path, "debug file of artifact not found"));
    }

    let debug = BuildFile { data: read_json(&debug_path)?, path: debug_path };
    let pointer = Path::new(debug.required_str("buildInfo")?);
    let name = pointer
        .file_name()
        .ok_or_else(|| Error::build_artifacts(&debug.path, "buildInfo does not name a file"))?;
    Ok(build_dir.join(BUILD_INFO_DIR).join(name))
}

impl IdeArtifacts for HardhatArtifacts {
    fn kind(&self) -> IdeKind {
        IdeKind::Hardhat
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
