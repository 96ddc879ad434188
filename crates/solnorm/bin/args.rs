use crate::cmd::{detect::DetectArgs, payload::PayloadArgs, report::ReportArgs, srcmap::SrcmapArgs};
use clap::{Parser, Subcommand};

/// solnorm: normalize smart contract build artifacts and resolve issue locations.
#[derive(Parser, Debug)]
#[command(
    name = "solnorm",
    version,
    after_help = "Project settings are also read from `.solnorm.toml` in the project directory.",
    next_display_order = None,
)]
pub struct SolnormArgs {
    #[command(subcommand)]
    pub cmd: SolnormSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum SolnormSubcommand {
    /// Build the analysis payload of a compiled project.
    #[command(visible_alias = "p")]
    Payload(PayloadArgs),

    /// Map the issues of an analysis report back to source lines.
    #[command(visible_alias = "r")]
    Report(ReportArgs),

    /// Decode, compress or rehome a compressed source map.
    #[command(visible_alias = "s")]
    Srcmap(SrcmapArgs),

    /// Print the build tool a project directory was set up with.
    #[command(visible_alias = "d")]
    Detect(DetectArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        SolnormArgs::command().debug_assert();
    }

    #[test]
    fn parse_payload_args() {
        let args = SolnormArgs::parse_from([
            "solnorm",
            "p",
            "--project-dir",
            "/tmp/proj",
            "--ide",
            "hardhat",
            "contracts/Token.sol",
        ]);
        let SolnormSubcommand::Payload(args) = args.cmd else { panic!("expected payload") };
        assert_eq!(args.project.targets.len(), 1);
        assert_eq!(args.project.ide, Some(solnorm_backend::IdeKind::Hardhat));
    }
}
