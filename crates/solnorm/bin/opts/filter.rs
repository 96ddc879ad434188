use clap::Parser;
use eyre::{Result, WrapErr};
use solnorm_backend::report::ReportFilter;
use solnorm_utils::config::ReportConfig;

#[derive(Clone, Debug, Default, Parser)]
pub struct FilterOpts {
    /// Drop issues below this severity (none, low, medium, high).
    #[arg(long, env = "SOLNORM_MIN_SEVERITY")]
    pub min_severity: Option<String>,

    /// SWC ids to drop, e.g. `SWC-110` or `110`. Accepts comma-separated lists.
    #[arg(long = "swc-blacklist", value_name = "SWC_ID", env = "SOLNORM_SWC_BLACKLIST")]
    pub swc_blacklist: Vec<String>,

    /// Keep only these SWC ids. Accepts comma-separated lists.
    #[arg(long = "swc-whitelist", value_name = "SWC_ID", env = "SOLNORM_SWC_WHITELIST")]
    pub swc_whitelist: Vec<String>,
}

impl FilterOpts {
    /// Builds the filter, with flags taking precedence over `config`.
    pub fn filter(&self, config: &ReportConfig) -> Result<ReportFilter> {
        let mut config = config.clone();
        if self.min_severity.is_some() {
            config.min_severity.clone_from(&self.min_severity);
        }
        if !self.swc_blacklist.is_empty() {
            config.swc_blacklist.clone_from(&self.swc_blacklist);
        }
        if !self.swc_whitelist.is_empty() {
            config.swc_whitelist.clone_from(&self.swc_whitelist);
        }
        ReportFilter::from_config(&config).wrap_err_with(|| {
            format!("invalid minimum severity {:?}", config.min_severity.as_deref().unwrap_or_default())
        })
    }
}
