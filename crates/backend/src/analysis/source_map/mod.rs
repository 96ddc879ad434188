//! Codec for the compiler's compressed source map format.
//!
//! A source map is a `;`-separated list of entries `s:l:f:j:m` (offset, length, file index,
//! jump type, modifier depth). Any field left empty, or omitted at the end of an entry,
//! takes the value of the same field in the previous entry.

use std::fmt;

use serde::Serialize;
use strum::{Display, EnumString};

use crate::error::{Error, Result};

/// Jump annotation of a source map entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
pub enum Jump {
    /// Jump into a function.
    #[serde(rename = "i")]
    #[strum(serialize = "i")]
    In,
    /// Return from a function.
    #[serde(rename = "o")]
    #[strum(serialize = "o")]
    Out,
    /// Regular jump, or no jump at all.
    #[default]
    #[serde(rename = "-")]
    #[strum(serialize = "-")]
    Regular,
}

/// A fully decoded source map entry. Every field is populated, inherited values included.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct SourceMapEntry {
    pub offset: i64,
    pub length: i64,
    /// Index into the source list; `-1` means the entry belongs to no file.
    pub file_index: i64,
    pub jump: Jump,
    pub modifier_depth: u64,
}

impl SourceMapEntry {
    /// The accumulator value before the first entry is read.
    pub const SEED: Self =
        Self { offset: -1, length: -1, file_index: -2, jump: Jump::Regular, modifier_depth: 0 };

    /// Returns the file index, if the entry points into a file at all.
    pub fn index(&self) -> Option<usize> {
        usize::try_from(self.file_index).ok()
    }

    /// Returns the byte offset, if it is a valid one.
    pub fn start(&self) -> Option<usize> {
        usize::try_from(self.offset).ok()
    }

    /// Resolves the entry's file against `source_list`. Out-of-range indices resolve to
    /// `None`.
    pub fn resolve<'a>(&self, source_list: &'a [String]) -> Option<&'a str> {
        source_list.get(self.index()?).map(String::as_str)
    }

    fn fields(&self) -> [String; 5] {
        [
            self.offset.to_string(),
            self.length.to_string(),
            self.file_index.to_string(),
            self.jump.to_string(),
            self.modifier_depth.to_string(),
        ]
    }
}

impl fmt::Display for SourceMapEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fields().join(":"))
    }
}

pub type SourceMap = Vec<SourceMapEntry>;

fn parse_field<T: std::str::FromStr>(entry: usize, name: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| Error::InvalidSourceMap {
        entry,
        reason: format!("invalid {name} field {value:?}"),
    })
}

/// Decodes a compressed source map into fully populated entries.
pub fn decompress(text: &str) -> Result<SourceMap> {
    if text.is_empty() {
        return Ok(vec![]);
    }

    let mut acc = SourceMapEntry::SEED;
    let mut entries = Vec::new();

    for (i, raw) in text.split(';').enumerate() {
        let fields: Vec<&str> = raw.split(':').collect();
        if fields.len() > 5 {
            return Err(Error::InvalidSourceMap {
                entry: i,
                reason: format!("too many fields in {raw:?}"),
            });
        }

        let field = |n: usize| fields.get(n).copied().filter(|f| !f.is_empty());
        if let Some(offset) = field(0) {
            acc.offset = parse_field(i, "offset", offset)?;
        }
        if let Some(length) = field(1) {
            acc.length = parse_field(i, "length", length)?;
        }
        if let Some(file_index) = field(2) {
            acc.file_index = parse_field(i, "file index", file_index)?;
        }
        if let Some(jump) = field(3) {
            acc.jump = parse_field(i, "jump", jump)?;
        }
        if let Some(depth) = field(4) {
            acc.modifier_depth = parse_field(i, "modifier depth", depth)?;
        }

        entries.push(acc);
    }

    Ok(entries)
}

/// Encodes entries back into the compressed format, omitting every field that repeats the
/// previous entry.
pub fn compress(entries: &[SourceMapEntry]) -> String {
    let mut prev = SourceMapEntry::SEED;
    let mut out = Vec::with_capacity(entries.len());

    for entry in entries {
        let current = entry.fields();
        let previous = prev.fields();
        let mut fields: Vec<&str> = current
            .iter()
            .zip(previous.iter())
            .map(|(c, p)| if c == p { "" } else { c.as_str() })
            .collect();
        while fields.last().is_some_and(|f| f.is_empty()) {
            fields.pop();
        }
        out.push(fields.join(":"));
        prev = *entry;
    }

    // A lone entry identical to the seed would compress to the empty string, which decodes
    // to no entries at all.
    if out.len() == 1 && out[0].is_empty() {
        out[0] = entries[0].offset.to_string();
    }

    out.join(";")
}

/// Rewrites every explicit file index (other than `-1`) to `target`, working directly on
/// the compressed text so the original omission pattern is kept byte for byte.
pub fn zero_file_index(text: &str, target: usize) -> String {
    let target = target.to_string();
    text.split(';')
        .map(|entry| {
            let mut fields: Vec<&str> = entry.split(':').collect();
            match fields.get(2) {
                Some(&index) if !index.is_empty() && index != "-1" => {
                    fields[2] = &target;
                    fields.join(":")
                }
                _ => entry.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(";")
}
