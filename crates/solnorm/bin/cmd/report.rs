use std::{collections::BTreeMap, path::PathBuf};

use clap::Parser;
use eyre::{Result, WrapErr};
use serde_json::Value;
use solnorm_backend::report::{
    decode_issues, index_by_file, parse_reports, AnalysisInput, DecodedIssue, LineRecord, Severity,
};
use solnorm_utils::config::{Config, ReportFormat};
use yansi::Paint;

use crate::{opts::FilterOpts, utils};

/// CLI arguments for `solnorm report`.
#[derive(Clone, Debug, Parser)]
pub struct ReportArgs {
    /// The report returned by the analysis service.
    pub report: PathBuf,

    /// The analysis input the report refers to: the output of `solnorm payload`, or the
    /// input echoed by the service.
    #[arg(long, short)]
    pub input: PathBuf,

    /// How to render the issues.
    #[arg(long, short, env = "SOLNORM_REPORT_FORMAT")]
    pub format: Option<ReportFormat>,

    /// The directory `.solnorm.toml` is read from.
    #[arg(long, short = 'C', env = "SOLNORM_PROJECT_DIR", default_value = ".")]
    pub project_dir: PathBuf,

    #[command(flatten)]
    pub filter: FilterOpts,

    /// Write to this file instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

impl ReportArgs {
    pub fn run(self) -> Result<()> {
        let rendered = self.render()?;
        utils::emit(&rendered, self.output.as_deref())
    }

    pub fn render(&self) -> Result<String> {
        let config = Config::load_from_dir(&self.project_dir)?;
        let filter = self.filter.filter(&config.report)?;

        let mut reports = parse_reports(utils::read_json(&self.report)?)
            .wrap_err_with(|| format!("{} is not an issue report", self.report.display()))?;
        let input = AnalysisInput::from_value(utils::read_json::<Value>(&self.input)?)
            .wrap_err_with(|| format!("{} is not an analysis input", self.input.display()))?;

        let removed = filter.apply(&mut reports);
        if removed > 0 {
            info!(removed, "issues filtered out");
        }

        let format = self.format.or(config.report.format).unwrap_or_default();
        Ok(match format {
            ReportFormat::Text => render_text(&decode_issues(&reports, &input)),
            ReportFormat::Lines => render_lines(&index_by_file(&reports, &input)),
            ReportFormat::Json => utils::to_json(&decode_issues(&reports, &input), false)?,
            ReportFormat::JsonPretty => utils::to_json(&decode_issues(&reports, &input), true)?,
        })
    }
}

fn paint_severity(severity: Severity) -> String {
    let label = severity.to_string();
    match severity {
        Severity::High => label.red().bold().to_string(),
        Severity::Medium => label.yellow().to_string(),
        Severity::Low => label.cyan().to_string(),
        Severity::None | Severity::Unknown => label.dim().to_string(),
    }
}

fn render_text(issues: &[DecodedIssue]) -> String {
    if issues.is_empty() {
        return "No issues found.".to_string();
    }

    let mut out = String::new();
    for issue in issues {
        out.push_str(&format!("==== {} ====\n", issue.swc_title.bold()));
        out.push_str(&format!("SWC ID: {}\n", issue.swc_id));
        out.push_str(&format!("Severity: {}\n", paint_severity(issue.severity)));
        out.push_str(&format!("{}\n", issue.description.short));
        if !issue.description.long.is_empty() {
            out.push_str(&format!("{}\n", issue.description.long));
        }
        for location in &issue.locations {
            out.push_str("--------------------\n");
            out.push_str(&format!("{}:{}\n", location.file, location.line));
            out.push_str(&format!("{}\n", location.snippet.trim().dim()));
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}

fn render_lines(files: &BTreeMap<String, Vec<LineRecord>>) -> String {
    let mut out = String::new();
    for (file, lines) in files {
        if lines.iter().all(|record| record.issues.is_empty()) {
            continue;
        }
        out.push_str(&format!("{}\n", file.bold().underline()));
        for record in lines.iter().filter(|record| !record.issues.is_empty()) {
            out.push_str(&format!("{:>5} | {}\n", record.line, record.content));
            for issue in &record.issues {
                out.push_str(&format!(
                    "      > [{}] {} {}\n",
                    paint_severity(issue.severity),
                    issue.swc_id.as_deref().unwrap_or_default(),
                    issue.swc_title.as_deref().unwrap_or_default(),
                ));
            }
        }
        out.push('\n');
    }
    if out.is_empty() {
        return "No issues found.".to_string();
    }
    out.trim_end().to_string()
}
