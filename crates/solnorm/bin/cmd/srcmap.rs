use clap::Parser;
use eyre::{Result, WrapErr};
use solnorm_backend::analysis::source_map::{compress, decompress, zero_file_index};

use crate::utils;

/// CLI arguments for `solnorm srcmap`.
#[derive(Clone, Debug, Parser)]
pub struct SrcmapArgs {
    /// The compressed source map, e.g. `1:2:0:-;3::1:i`.
    pub source_map: String,

    /// Point every entry with a file at this file index instead and print the result.
    #[arg(long, value_name = "INDEX", conflicts_with_all = ["json", "compress"])]
    pub rehome: Option<usize>,

    /// Re-compress the decoded entries instead of listing them.
    #[arg(long, conflicts_with = "json")]
    pub compress: bool,

    /// File names to resolve file indices against, in file-index order.
    #[arg(long, value_delimiter = ',')]
    pub source_list: Vec<String>,

    /// Print the decoded entries as JSON.
    #[arg(long)]
    pub json: bool,
}

impl SrcmapArgs {
    pub fn run(self) -> Result<()> {
        let rendered = self.render()?;
        utils::emit(&rendered, None)
    }

    pub fn render(&self) -> Result<String> {
        if let Some(target) = self.rehome {
            return Ok(zero_file_index(&self.source_map, target));
        }

        let entries = decompress(&self.source_map).wrap_err("failed to decode source map")?;
        if self.compress {
            return Ok(compress(&entries));
        }
        if self.json {
            return utils::to_json(&entries, true);
        }

        let mut out = String::new();
        for (i, entry) in entries.iter().enumerate() {
            out.push_str(&format!("{i:>5}  {entry}"));
            if let Some(file) = entry.resolve(&self.source_list).filter(|f| !f.is_empty()) {
                out.push_str(&format!("  {file}"));
            }
            out.push('\n');
        }
        Ok(out.trim_end().to_string())
    }
}
