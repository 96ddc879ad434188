use std::path::PathBuf;

use clap::Parser;
use eyre::Result;
use solnorm_backend::detect;

/// CLI arguments for `solnorm detect`.
#[derive(Clone, Debug, Parser)]
pub struct DetectArgs {
    /// The project root.
    #[arg(default_value = ".")]
    pub project_dir: PathBuf,
}

impl DetectArgs {
    pub fn run(self) -> Result<()> {
        println!("{}", detect(&self.project_dir));
        Ok(())
    }
}
