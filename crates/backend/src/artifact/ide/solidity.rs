use std::{
    fs,
    path::{Path, PathBuf},
};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use solnorm_utils::{config::IdeKind, path::absolutize};

use super::{contract_from_evm, original_source, source_list_from_output, ProjectOptions};
use crate::{
    artifact::{
        index::{load_build_files, read_json, BuildFile},
        ContractsBySource, IdeArtifacts, SourceRecord, Sources,
    },
    error::{Error, Result},
};

static PRAGMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"pragma\s+solidity\s+[\^<>=~]*\s*(\d+\.\d+\.\d+)").unwrap());

/// Returns the first exact version named in a `pragma solidity` directive of `source`.
pub fn pragma_version(source: &str) -> Option<&str> {
    PRAGMA.captures(source)?.get(1).map(|m| m.as_str())
}

/// Plain standard-JSON compiler output.
///
/// The build path is either one output file or a directory walked for them. A document is
/// either the bare output (`{sources, contracts}`) or a combined `{input, output}` document,
/// in which case source text is taken from the input instead of the disk.
#[derive(Debug)]
pub struct SolidityArtifacts {
    contracts: ContractsBySource,
    sources: Sources,
    solc_version: Option<String>,
}

impl SolidityArtifacts {
    pub const DEFAULT_BUILD_DIR: &'static str = "out";

    pub fn new(options: &ProjectOptions) -> Result<Self> {
        let target = options.build_dir_or(Self::DEFAULT_BUILD_DIR);
        let documents = if target.is_file() {
            vec![BuildFile { data: read_json(&target)?, path: target.clone() }]
        } else {
            load_build_files(&target, |_| false)?
                .into_iter()
                .filter(|file| {
                    let is_output = output_of(&file.data).get("contracts").is_some();
                    if !is_output {
                        debug!(path = ?file.path, "not a compiler output, skipping");
                    }
                    is_output
                })
                .collect()
        };
        if documents.is_empty() {
            return Err(Error::build_artifacts(&target, "no compiler output found"));
        }

        let mut artifacts =
            Self { contracts: Default::default(), sources: Default::default(), solc_version: None };
        for document in &documents {
            artifacts.add_document(document, options)?;
        }

        if let Some(version) = &options.solc_version {
            artifacts.solc_version = Some(version.clone());
        }
        if artifacts.solc_version.is_none() {
            artifacts.solc_version = artifacts.detect_version();
        }
        Ok(artifacts)
    }

    fn add_document(&mut self, document: &BuildFile, options: &ProjectOptions) -> Result<()> {
        let output = output_of(&document.data);
        let contracts = output.get("contracts").and_then(Value::as_object).ok_or_else(|| {
            Error::build_artifacts(&document.path, "compiler output has no contracts")
        })?;
        let output_sources = output.get("sources").unwrap_or(&Value::Null);
        let source_list = source_list_from_output(&document.path, output_sources)?;
        let input_sources = document.data.pointer("/input/sources");

        let mut included = false;
        for (source, by_name) in contracts {
            if !options.include.contains(source, &options.project_dir) {
                trace!(source, "not included");
                continue;
            }
            let Some(by_name) = by_name.as_object() else { continue };

            for (name, data) in by_name {
                let contract = contract_from_evm(&document.path, name, source, data, &source_list)?;
                self.contracts.entry(source.clone()).or_default().push(contract);
                included = true;
            }
        }
        if !included {
            return Ok(());
        }

        for (file_index, path) in source_list.iter().enumerate() {
            if path.is_empty() || self.sources.contains_key(path) {
                continue;
            }

            let text = input_sources
                .and_then(|s| s.get(path))
                .and_then(|s| s.get("content"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| read_source(path, &options.project_dir));
            let Some(text) = text else {
                debug!(%path, "source text not available");
                continue;
            };

            let record = output_sources.get(path);
            self.sources.insert(
                path.clone(),
                SourceRecord {
                    path: path.clone(),
                    source: text,
                    ast: record.and_then(|r| r.get("ast")).cloned().unwrap_or(Value::Null),
                    legacy_ast: record.and_then(|r| r.get("legacyAST")).cloned(),
                    file_index: Some(file_index),
                    original_source: original_source(path, &options.project_dir),
                },
            );
        }

        if self.solc_version.is_none() {
            self.solc_version =
                document.data.get("solcVersion").and_then(Value::as_str).map(str::to_string);
        }
        Ok(())
    }

    /// Takes the version from the pragma of the first main source that names one.
    fn detect_version(&self) -> Option<String> {
        let version = self
            .contracts
            .keys()
            .filter_map(|path| self.sources.get(path))
            .find_map(|record| pragma_version(&record.source))
            .map(str::to_string);
        debug!(?version, "detected compiler version from pragma");
        version
    }
}

fn output_of(document: &Value) -> &Value {
    document.get("output").unwrap_or(document)
}

fn read_source(path: &str, project_dir: &Path) -> Option<String> {
    let on_disk: PathBuf = absolutize(path, project_dir);
    fs::read_to_string(on_disk).ok()
}

impl IdeArtifacts for SolidityArtifacts {
    fn kind(&self) -> IdeKind {
        IdeKind::Solidity
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
