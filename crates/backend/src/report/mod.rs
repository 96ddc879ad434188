//! Issue reports returned by the analysis service, and the input echo used to decode them.
//!
//! Both the service's camelCase field names and snake_case ones are accepted.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

mod filter;
mod index;

pub use filter::ReportFilter;
pub use index::{decode_issues, index_by_file, DecodedIssue, LineRecord};

/// Issue severity, ordered from least to most severe.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Severity {
    #[default]
    Unknown,
    None,
    Low,
    Medium,
    High,
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.and_then(|s| s.trim().parse().ok()).unwrap_or_default())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    #[serde(default, alias = "head")]
    pub short: String,
    #[serde(default, alias = "tail")]
    pub long: String,
}

/// Where an issue is, as a source map over a source list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueLocation {
    #[serde(default, alias = "sourceFormat", skip_serializing_if = "Option::is_none")]
    pub source_format: Option<String>,
    #[serde(default, alias = "sourceType", skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(default, alias = "sourceList", skip_serializing_if = "Option::is_none")]
    pub source_list: Option<Vec<String>>,
    #[serde(default, alias = "sourceMap")]
    pub source_map: String,
}

impl IssueLocation {
    pub const TEXT_FORMAT: &'static str = "text";

    pub fn is_text(&self) -> bool {
        self.source_format.as_deref() == Some(Self::TEXT_FORMAT)
    }

    /// The location's own source list, or `report_list` when it has none or an empty one.
    pub fn source_list_or<'a>(&'a self, report_list: &'a [String]) -> &'a [String] {
        self.source_list.as_deref().filter(|list| !list.is_empty()).unwrap_or(report_list)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(default, alias = "swcID")]
    pub swc_id: Option<String>,
    #[serde(default, alias = "swcTitle")]
    pub swc_title: Option<String>,
    #[serde(default)]
    pub description: Description,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub locations: Vec<IssueLocation>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub extra: Value,
}

impl Issue {
    /// Issues without an SWC id, a title or a location are placeholders and never shown.
    pub fn is_displayable(&self) -> bool {
        let present = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.swc_id) && present(&self.swc_title) && !self.locations.is_empty()
    }

    /// The locations used for display: only text locations when there are several.
    pub fn display_locations(&self) -> impl Iterator<Item = &IssueLocation> {
        let several = self.locations.len() > 1;
        self.locations.iter().filter(move |location| !several || location.is_text())
    }
}

/// The issues found in one analysis, with the source list their locations refer to.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueReport {
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default, alias = "sourceType", skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(default, alias = "sourceFormat", skip_serializing_if = "Option::is_none")]
    pub source_format: Option<String>,
    #[serde(default, alias = "sourceList")]
    pub source_list: Vec<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub meta: Value,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSource {
    #[serde(default)]
    pub source: Option<String>,
}

/// The analysis input as echoed by the service: the sources a report is decoded against.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisInput {
    #[serde(default)]
    pub sources: BTreeMap<String, InputSource>,
    #[serde(default, alias = "sourceList")]
    pub source_list: Vec<String>,
    #[serde(default, alias = "mainSource", skip_serializing_if = "Option::is_none")]
    pub main_source: Option<String>,
}

impl AnalysisInput {
    pub fn source_text(&self, path: &str) -> Option<&str> {
        self.sources.get(path)?.source.as_deref()
    }

    /// Combines several inputs, such as the per-contract requests of one payload. The first
    /// input's source list and main source are kept.
    pub fn merge(inputs: impl IntoIterator<Item = Self>) -> Self {
        let mut inputs = inputs.into_iter();
        let Some(mut merged) = inputs.next() else { return Self::default() };
        for input in inputs {
            for (path, source) in input.sources {
                merged.sources.entry(path).or_insert(source);
            }
        }
        merged
    }

    /// Reads an input document: one input object, or a list of them.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        if value.is_array() {
            serde_json::from_value::<Vec<Self>>(value).map(Self::merge)
        } else {
            serde_json::from_value(value)
        }
    }
}

/// Reports arrive either as a list or as a single report.
pub fn parse_reports(value: Value) -> serde_json::Result<Vec<IssueReport>> {
    if value.is_array() {
        serde_json::from_value(value)
    } else {
        serde_json::from_value(value).map(|report| vec![report])
    }
}
