use std::{collections::BTreeSet, str::FromStr};

use solnorm_utils::config::ReportConfig;

use super::{Issue, IssueReport, Severity};

/// Drops issues by severity and SWC id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReportFilter {
    min_severity: Option<Severity>,
    blacklist: BTreeSet<String>,
    whitelist: BTreeSet<String>,
}

/// Normalizes `SWC-110`, `swc-110` and `110` to `SWC-110`.
pub fn normalize_swc_id(id: &str) -> String {
    let id = id.trim();
    let number = id.get(..4).filter(|p| p.eq_ignore_ascii_case("swc-")).map_or(id, |_| &id[4..]);
    format!("SWC-{}", number.trim())
}

fn parse_swc_list<S: AsRef<str>>(items: &[S]) -> BTreeSet<String> {
    items
        .iter()
        .flat_map(|item| item.as_ref().split(','))
        .filter(|id| !id.trim().is_empty())
        .map(normalize_swc_id)
        .collect()
}

impl ReportFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ReportConfig) -> Result<Self, strum::ParseError> {
        let min_severity = config.min_severity.as_deref().map(Severity::from_str).transpose()?;
        Ok(Self {
            min_severity,
            blacklist: parse_swc_list(&config.swc_blacklist),
            whitelist: parse_swc_list(&config.swc_whitelist),
        })
    }

    pub fn min_severity(mut self, severity: Severity) -> Self {
        self.min_severity = Some(severity);
        self
    }

    /// Adds SWC ids to ignore. Items may be comma-separated lists.
    pub fn blacklist<S: AsRef<str>>(mut self, ids: &[S]) -> Self {
        self.blacklist.extend(parse_swc_list(ids));
        self
    }

    /// Restricts the issues kept to these SWC ids. Items may be comma-separated lists.
    pub fn whitelist<S: AsRef<str>>(mut self, ids: &[S]) -> Self {
        self.whitelist.extend(parse_swc_list(ids));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.min_severity.is_none() && self.blacklist.is_empty() && self.whitelist.is_empty()
    }

    pub fn keeps(&self, issue: &Issue) -> bool {
        if self.min_severity.is_some_and(|min| issue.severity < min) {
            return false;
        }

        let id = issue.swc_id.as_deref().map(normalize_swc_id);
        if let Some(id) = &id {
            if self.blacklist.contains(id) {
                return false;
            }
        }
        self.whitelist.is_empty() || id.is_some_and(|id| self.whitelist.contains(&id))
    }

    /// Removes every issue not kept. Returns the number of issues removed.
    pub fn apply(&self, reports: &mut [IssueReport]) -> usize {
        let mut removed = 0;
        for report in reports {
            let before = report.issues.len();
            report.issues.retain(|issue| self.keeps(issue));
            removed += before - report.issues.len();
        }
        if removed > 0 {
            debug!(removed, "filtered issues");
        }
        removed
    }
}
