use std::collections::BTreeMap;

use serde::Serialize;

use super::{AnalysisInput, Description, Issue, IssueReport, Severity};
use crate::analysis::{
    location::{offset_to_line, resolve_first, ResolvedLocation},
    source_map::decompress,
};

/// One physical line of a source file and the issues anchored to it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LineRecord {
    pub line: usize,
    pub content: String,
    pub issues: Vec<Issue>,
}

/// Groups the issues of `reports` by the file and line they point at.
///
/// Every source of `input` gets one record per line, issues or not. Each displayable issue
/// location is attached to the line of the first source map entry that resolves into a known
/// source; entries that do not resolve are skipped.
pub fn index_by_file(reports: &[IssueReport], input: &AnalysisInput) -> BTreeMap<String, Vec<LineRecord>> {
    let mut files: BTreeMap<String, Vec<LineRecord>> = input
        .sources
        .iter()
        .filter_map(|(path, source)| {
            let text = source.source.as_deref()?;
            let lines = text
                .split('\n')
                .enumerate()
                .map(|(i, content)| LineRecord { line: i + 1, content: content.to_string(), issues: vec![] })
                .collect();
            Some((path.clone(), lines))
        })
        .collect();

    for report in reports {
        for issue in report.issues.iter().filter(|issue| issue.is_displayable()) {
            for location in issue.display_locations() {
                let source_list = location.source_list_or(&report.source_list);
                let entries = match decompress(&location.source_map) {
                    Ok(entries) => entries,
                    Err(err) => {
                        warn!(%err, source_map = %location.source_map, "skipping undecodable location");
                        continue;
                    }
                };

                for entry in &entries {
                    let (Some(offset), Some(file)) = (entry.start(), entry.resolve(source_list)) else {
                        continue;
                    };
                    let (Some(text), Some(lines)) = (input.source_text(file), files.get_mut(file)) else {
                        continue;
                    };
                    let line = offset_to_line(text, offset);
                    if let Some(record) = lines.get_mut(line - 1) {
                        record.issues.push(issue.clone());
                        break;
                    }
                }
            }
        }
    }

    files
}

/// An issue with its locations decoded against the analysis input.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DecodedIssue {
    pub swc_id: String,
    pub swc_title: String,
    pub description: Description,
    pub severity: Severity,
    pub locations: Vec<ResolvedLocation>,
}

/// Decodes every displayable issue of `reports`. Each displayable location contributes at
/// most one resolved location, the first that resolves.
pub fn decode_issues(reports: &[IssueReport], input: &AnalysisInput) -> Vec<DecodedIssue> {
    let mut decoded = Vec::new();

    for report in reports {
        for issue in report.issues.iter().filter(|issue| issue.is_displayable()) {
            let locations = issue
                .display_locations()
                .filter_map(|location| {
                    let source_list = location.source_list_or(&report.source_list);
                    let entries = decompress(&location.source_map).ok()?;
                    resolve_first(&entries, source_list, |path| input.source_text(path))
                })
                .collect();

            decoded.push(DecodedIssue {
                swc_id: issue.swc_id.clone().unwrap_or_default(),
                swc_title: issue.swc_title.clone().unwrap_or_default(),
                description: issue.description.clone(),
                severity: issue.severity,
                locations,
            });
        }
    }

    decoded
}
