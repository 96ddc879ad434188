use serde::Serialize;

use super::source_map::SourceMapEntry;

/// Returns the 1-based line containing byte `offset` of `text`.
///
/// Offsets are UTF-8 byte offsets, as emitted by the compiler. Offsets past the end of the
/// text are clamped to it.
pub fn offset_to_line(text: &str, offset: usize) -> usize {
    let end = offset.min(text.len());
    text.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

/// Returns the content of the 1-based `line` of `text`, without its line terminator.
pub fn line_content(text: &str, line: usize) -> Option<&str> {
    text.split('\n').nth(line.checked_sub(1)?)
}

/// A source map entry resolved to a place in a known source file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedLocation {
    pub file: String,
    pub line: usize,
    pub snippet: String,
}

/// Resolves a single entry. Returns `None` if the entry has no usable offset, its file index
/// is out of range of `source_list`, or `source_text` does not know the file.
pub fn resolve_entry<'a>(
    entry: &SourceMapEntry,
    source_list: &[String],
    source_text: impl Fn(&str) -> Option<&'a str>,
) -> Option<ResolvedLocation> {
    let offset = entry.start()?;
    let file = entry.resolve(source_list)?;
    let text = source_text(file)?;

    let line = offset_to_line(text, offset);
    let snippet = line_content(text, line).unwrap_or_default().trim_end_matches('\r');
    Some(ResolvedLocation { file: file.to_string(), line, snippet: snippet.to_string() })
}

/// Resolves the first entry of `entries` that can be resolved at all.
pub fn resolve_first<'a>(
    entries: &[SourceMapEntry],
    source_list: &[String],
    source_text: impl Fn(&str) -> Option<&'a str>,
) -> Option<ResolvedLocation> {
    entries.iter().find_map(|entry| resolve_entry(entry, source_list, &source_text))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::analysis::source_map::decompress;

    #[test]
    fn test_offset_to_line() {
        let text = "a\nb\nc";
        assert_eq!(offset_to_line(text, 0), 1);
        assert_eq!(offset_to_line(text, 2), 2);
        assert_eq!(offset_to_line(text, 4), 3);
        assert_eq!(offset_to_line(text, 100), 3);
        assert_eq!(offset_to_line("", 0), 1);
    }

    #[test]
    fn test_offset_to_line_counts_bytes() {
        // `é` is two bytes, so the first newline is byte 2.
        let text = "é\n\nx";
        assert_eq!(offset_to_line(text, 2), 1);
        assert_eq!(offset_to_line(text, 3), 2);
        assert_eq!(offset_to_line(text, 4), 3);
    }

    #[test]
    fn test_offset_to_line_is_monotonic() {
        let text = "pragma solidity ^0.8.0;\n\ncontract A {\n  // ünïcode\n  uint x;\n}\n";
        let mut last = offset_to_line(text, 0);
        assert_eq!(last, 1);
        for offset in 1..=text.len() + 3 {
            let line = offset_to_line(text, offset);
            assert!(line >= last);
            last = line;
        }
    }

    #[test]
    fn test_line_content() {
        assert_eq!(line_content("a\nb\nc", 2), Some("b"));
        assert_eq!(line_content("a\nb\nc", 4), None);
        assert_eq!(line_content("a", 0), None);
    }

    #[test]
    fn test_resolve_first() {
        let sources: BTreeMap<String, String> = [
            ("A.sol".to_string(), "contract A {\n  uint x;\n}".to_string()),
            ("B.sol".to_string(), "library B {}".to_string()),
        ]
        .into();
        let list = vec!["A.sol".to_string(), "missing.sol".to_string(), "B.sol".to_string()];
        let lookup = |path: &str| sources.get(path).map(String::as_str);

        // Out of range, then unknown file, then a negative offset, then a hit.
        let entries = decompress("0:1:7;0:1:1;-1:1:0;15:6:0").unwrap();
        let location = resolve_first(&entries, &list, lookup).unwrap();
        assert_eq!(
            location,
            ResolvedLocation { file: "A.sol".into(), line: 2, snippet: "  uint x;".into() }
        );

        let entries = decompress("0:1:-1;3:1:5").unwrap();
        assert_eq!(resolve_first(&entries, &list, lookup), None);
    }
}
