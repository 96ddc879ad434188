//! Assembly of analysis payloads from normalized artifacts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    artifact::{ContractArtifact, IdeArtifacts, Sources},
    error::{Error, Result},
    utils::compilation::{has_placeholders, link_contracts_fakely, link_references},
};

mod sanitize;

pub use sanitize::{sanitize_paths, sanitize_paths_with_cwd};

/// Values a bytecode or source map field must not have for a contract to be submitted.
const EMPTY_VALUES: [&str; 2] = ["", "0x"];

/// Returns false for contracts without code, i.e. interfaces and abstract contracts.
///
/// Every one of the bytecode, deployed bytecode, source map and deployed source map fields
/// must be non-empty and not a bare `0x`, and the contract must have a name.
pub fn is_submittable(contract: &ContractArtifact) -> bool {
    let fields = [
        ("bytecode", &contract.bytecode),
        ("source map", &contract.source_map),
        ("deployed source map", &contract.deployed_source_map),
        ("deployed bytecode", &contract.deployed_bytecode),
    ];
    for (field, value) in fields {
        if EMPTY_VALUES.contains(&value.as_str()) {
            debug!(contract = %contract.contract_name, field, %value, "contract is not submittable");
            return false;
        }
    }
    if contract.contract_name.is_empty() {
        debug!("contract without a name is not submittable");
        return false;
    }
    true
}

/// The unit handed to the submission layer: patched contracts plus every source they
/// reference.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AnalysisPayload {
    pub contracts: Vec<ContractArtifact>,
    pub sources: Sources,
    pub solc_version: Option<String>,
    /// Names of the contracts left out because they have no code.
    pub skipped: Vec<String>,
    /// Names of the contracts left out because their payload could not be assembled.
    pub failed: Vec<String>,
}

/// Builds an [`AnalysisPayload`] from any adapter.
#[derive(Clone, Copy)]
pub struct PayloadAssembler<'a> {
    artifacts: &'a dyn IdeArtifacts,
}

impl<'a> PayloadAssembler<'a> {
    pub fn new(artifacts: &'a dyn IdeArtifacts) -> Self {
        Self { artifacts }
    }

    /// Assembles every submittable contract. A contract that fails to assemble is logged and
    /// left out; the contracts assembled before it are kept as they are.
    pub fn assemble(&self) -> AnalysisPayload {
        let mut payload = AnalysisPayload {
            solc_version: self.artifacts.solc_version().map(str::to_string),
            ..Default::default()
        };

        for contract in self.artifacts.contracts().values().flatten() {
            if !is_submittable(contract) {
                info!(
                    "Skipping submission for contract {} because no bytecode was produced.",
                    contract.contract_name
                );
                payload.skipped.push(contract.contract_name.clone());
                continue;
            }

            match self.assemble_contract(contract, &mut payload.sources) {
                Ok(contract) => payload.contracts.push(contract),
                Err(err) => {
                    warn!(%err, "skipping contract");
                    payload.failed.push(contract.contract_name.clone());
                }
            }
        }

        debug!(
            contracts = payload.contracts.len(),
            sources = payload.sources.len(),
            skipped = payload.skipped.len(),
            failed = payload.failed.len(),
            "assembled payload"
        );
        payload
    }

    /// Patches `contract` and adds the sources it references to `sources`. Nothing is added
    /// when the contract's main source is unknown.
    pub fn assemble_contract(
        &self,
        contract: &ContractArtifact,
        sources: &mut Sources,
    ) -> Result<ContractArtifact> {
        let known = self.artifacts.sources();
        if !known.contains_key(&contract.main_source) {
            let err = Error::source(&contract.main_source, "main source not found");
            return Err(Error::payload(&contract.contract_name, err));
        }

        for path in contract.source_list.iter().filter(|p| !p.is_empty()) {
            if sources.contains_key(path) {
                continue;
            }
            match known.get(path) {
                Some(record) => {
                    sources.insert(path.clone(), record.clone());
                }
                None => debug!(%path, contract = %contract.contract_name, "dependency source not found"),
            }
        }

        Ok(ContractArtifact {
            bytecode: link(&contract.contract_name, &contract.bytecode),
            deployed_bytecode: link(&contract.contract_name, &contract.deployed_bytecode),
            ..contract.clone()
        })
    }
}

fn link(contract: &str, code: &str) -> String {
    if !has_placeholders(code) {
        return code.to_string();
    }
    for reference in link_references(code) {
        debug!(
            contract,
            placeholder = %reference.placeholder,
            offset = reference.byte_offset(code),
            "linking library against the zero address"
        );
    }
    link_contracts_fakely(code)
}

/// A source as sent along with an analysis request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestSource {
    pub source: String,
    pub ast: Value,
    #[serde(rename = "legacyAST", default, skip_serializing_if = "Option::is_none")]
    pub legacy_ast: Option<Value>,
}

/// One analysis request, the body the submission layer sends per contract.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub contract_name: String,
    pub bytecode: String,
    pub source_map: String,
    pub deployed_bytecode: String,
    pub deployed_source_map: String,
    pub sources: BTreeMap<String, RequestSource>,
    pub source_list: Vec<String>,
    pub main_source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solc_version: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobContract {
    pub source_paths: BTreeMap<usize, String>,
    pub deployed_source_map: String,
    pub deployed_bytecode: String,
    pub source_map: String,
    pub bytecode: String,
    pub contract_name: String,
    pub main_source_file: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_index: Option<usize>,
    pub source: String,
    pub ast: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_source: Option<String>,
}

/// The fuzzing job shape: all contracts and sources in one document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JobPayload {
    pub contracts: Vec<JobContract>,
    pub sources: BTreeMap<String, JobSource>,
}

impl AnalysisPayload {
    /// Splits the payload into one request per contract, each carrying only the sources of
    /// its own source list.
    pub fn requests(&self) -> Vec<AnalysisRequest> {
        self.contracts
            .iter()
            .map(|contract| {
                let sources = contract
                    .source_list
                    .iter()
                    .filter_map(|path| {
                        let record = self.sources.get(path)?;
                        let source = RequestSource {
                            source: record.source.clone(),
                            ast: record.ast.clone(),
                            legacy_ast: record.legacy_ast.clone(),
                        };
                        Some((path.clone(), source))
                    })
                    .collect();

                AnalysisRequest {
                    contract_name: contract.contract_name.clone(),
                    bytecode: contract.bytecode.clone(),
                    source_map: contract.source_map.clone(),
                    deployed_bytecode: contract.deployed_bytecode.clone(),
                    deployed_source_map: contract.deployed_source_map.clone(),
                    sources,
                    source_list: contract.source_list.clone(),
                    main_source: contract.main_source.clone(),
                    solc_version: self.solc_version.clone(),
                }
            })
            .collect()
    }

    /// Converts the payload into the fuzzing job shape.
    pub fn job(&self) -> JobPayload {
        let contracts = self
            .contracts
            .iter()
            .map(|contract| JobContract {
                source_paths: contract
                    .source_list
                    .iter()
                    .enumerate()
                    .filter(|(_, path)| !path.is_empty())
                    .map(|(i, path)| (i, path.clone()))
                    .collect(),
                deployed_source_map: contract.deployed_source_map.clone(),
                deployed_bytecode: contract.deployed_bytecode.clone(),
                source_map: contract.source_map.clone(),
                bytecode: contract.bytecode.clone(),
                contract_name: contract.contract_name.clone(),
                main_source_file: contract.main_source.clone(),
            })
            .collect();

        let sources = self
            .sources
            .iter()
            .map(|(path, record)| {
                let source = JobSource {
                    file_index: record.file_index,
                    source: record.source.clone(),
                    ast: record.ast.clone(),
                    original_source: record.original_source.clone(),
                };
                (path.clone(), source)
            })
            .collect();

        JobPayload { contracts, sources }
    }
}
