use std::path::PathBuf;

use clap::Parser;
use eyre::{Result, WrapErr};
use solnorm_backend::{detect, IdeKind, ProjectOptions};
use solnorm_utils::config::Config;

#[derive(Clone, Debug, Default, Parser)]
pub struct ProjectOpts {
    /// Files or directories whose contracts are submitted. Defaults to every contract.
    pub targets: Vec<PathBuf>,

    /// The project root. Relative paths are resolved against it.
    #[arg(long, short = 'C', env = "SOLNORM_PROJECT_DIR", default_value = ".")]
    pub project_dir: PathBuf,

    /// The build tool the project was compiled with. Detected when not given.
    #[arg(long, env = "SOLNORM_IDE")]
    pub ide: Option<IdeKind>,

    /// The build directory, or for plain compiler output the output file.
    #[arg(long, short = 'b', env = "SOLNORM_BUILD_DIR")]
    pub build_dir: Option<PathBuf>,

    /// Overrides the compiler version recorded in the artifacts.
    #[arg(long, env = "SOLNORM_SOLC_VERSION")]
    pub solc_version: Option<String>,

    /// Keep local directory prefixes in submitted paths.
    #[arg(long)]
    pub no_sanitize: bool,
}

/// A project ready to be loaded: flags layered over the config file.
#[derive(Clone, Debug)]
pub struct ResolvedProject {
    pub kind: IdeKind,
    pub options: ProjectOptions,
    pub sanitize: bool,
    pub config: Config,
}

impl ProjectOpts {
    pub fn resolve(&self) -> Result<ResolvedProject> {
        let project_dir = self.project_dir.canonicalize().wrap_err_with(|| {
            format!("project directory {} does not exist", self.project_dir.display())
        })?;
        let mut config = Config::load_from_dir(&project_dir)?;

        let project = &mut config.project;
        if !self.targets.is_empty() {
            project.targets.clone_from(&self.targets);
        }
        if self.build_dir.is_some() {
            project.build_directory.clone_from(&self.build_dir);
        }
        if self.solc_version.is_some() {
            project.solc_version.clone_from(&self.solc_version);
        }
        if self.ide.is_some() {
            project.ide = self.ide;
        }
        if self.no_sanitize {
            project.sanitize = false;
        }

        let kind = project.ide.unwrap_or_else(|| detect(&project_dir));
        let options = ProjectOptions::from_config(&project_dir, project);
        let sanitize = project.sanitize;
        debug!(%kind, ?project_dir, sanitize, targets = ?options.include.files(), "resolved project");

        Ok(ResolvedProject { kind, options, sanitize, config })
    }
}
