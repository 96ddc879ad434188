use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use eyre::{bail, Result};
use solnorm_backend::{load_project, sanitize_paths, AnalysisPayload, PayloadAssembler};
use yansi::Paint;

use crate::{opts::ProjectOpts, utils};

/// The document `solnorm payload` writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum PayloadShape {
    /// One analysis request per contract.
    #[default]
    Requests,
    /// A single document with every contract and source.
    Job,
    /// The normalized payload itself.
    Raw,
}

/// CLI arguments for `solnorm payload`.
#[derive(Clone, Debug, Parser)]
pub struct PayloadArgs {
    #[command(flatten)]
    pub project: ProjectOpts,

    /// The shape of the written document.
    #[arg(long, short = 's', value_enum, default_value_t)]
    pub shape: PayloadShape,

    /// Write to this file instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pub pretty: bool,
}

impl PayloadArgs {
    pub fn run(self) -> Result<()> {
        let payload = self.build()?;
        let json = match self.shape {
            PayloadShape::Requests => utils::to_json(&payload.requests(), self.pretty)?,
            PayloadShape::Job => utils::to_json(&payload.job(), self.pretty)?,
            PayloadShape::Raw => utils::to_json(&payload, self.pretty)?,
        };
        utils::emit(&json, self.output.as_deref())
    }

    pub fn build(&self) -> Result<AnalysisPayload> {
        let project = self.project.resolve()?;
        let artifacts = load_project(project.kind, &project.options)?;
        let mut payload = PayloadAssembler::new(artifacts.as_ref()).assemble();

        for name in &payload.skipped {
            eprintln!(
                "{}",
                format!("Skipping submission for contract {name} because no bytecode was produced.")
                    .yellow()
            );
        }
        for name in &payload.failed {
            eprintln!(
                "{}",
                format!("Skipping contract {name} because its sources could not be assembled.")
                    .yellow()
            );
        }
        if payload.contracts.is_empty() {
            bail!("no contracts with bytecode found in {}", project.options.project_dir.display());
        }

        if project.sanitize {
            if let Some(prefix) = sanitize_paths(&mut payload) {
                debug!(?prefix, "stripped local path prefix");
            }
        }
        Ok(payload)
    }
}
