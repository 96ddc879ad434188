use std::{
    io,
    path::{Path, PathBuf},
};

use walkdir::{DirEntry, WalkDir};

/// Directory names never descended into when looking for Solidity sources.
pub const RGLOB_BLACKLIST: &[&str] = &["node_modules"];

fn is_blacklisted(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() &&
        entry.file_name().to_str().is_some_and(|name| RGLOB_BLACKLIST.contains(&name))
}

/// Expands a target into the Solidity files it denotes.
///
/// A file target is returned as is (whatever its extension), a directory target is walked
/// recursively for `*.sol` files. Missing targets expand to nothing.
pub fn sol_files_by_directory(target: impl AsRef<Path>) -> Vec<PathBuf> {
    let target = target.as_ref();
    if target.is_file() {
        return vec![target.to_path_buf()];
    }
    if !target.is_dir() {
        debug!(?target, "target does not exist");
        return vec![];
    }

    let mut files: Vec<_> = WalkDir::new(target)
        .into_iter()
        .filter_entry(|e| !is_blacklisted(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "sol"))
        .collect();
    files.sort();
    trace!(?target, n = files.len(), "collected solidity files");
    files
}

/// Recursively collects every `*.json` file under `dir`, in a stable (sorted) order.
///
/// `skip_dir` is consulted for every sub-directory; returning true prunes it.
pub fn json_files(dir: impl AsRef<Path>, skip_dir: impl Fn(&Path) -> bool) -> io::Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut files = Vec::new();

    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_type().is_dir() || !skip_dir(e.path()));
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && entry.path().extension().is_some_and(|ext| ext == "json")
        {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_sol_files_by_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("contracts/lib")).unwrap();
        fs::create_dir_all(root.join("node_modules/x")).unwrap();
        fs::write(root.join("contracts/A.sol"), "").unwrap();
        fs::write(root.join("contracts/lib/B.sol"), "").unwrap();
        fs::write(root.join("contracts/readme.md"), "").unwrap();
        fs::write(root.join("node_modules/x/C.sol"), "").unwrap();

        let files = sol_files_by_directory(root);
        assert_eq!(files, vec![root.join("contracts/A.sol"), root.join("contracts/lib/B.sol")]);

        let files = sol_files_by_directory(root.join("contracts/A.sol"));
        assert_eq!(files, vec![root.join("contracts/A.sol")]);

        assert!(sol_files_by_directory(root.join("missing")).is_empty());
    }

    #[test]
    fn test_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("contracts/A.sol")).unwrap();
        fs::create_dir_all(root.join("build-info")).unwrap();
        fs::write(root.join("contracts/A.sol/A.json"), "{}").unwrap();
        fs::write(root.join("contracts/A.sol/A.dbg.json"), "{}").unwrap();
        fs::write(root.join("build-info/abc.json"), "{}").unwrap();
        fs::write(root.join("notes.txt"), "").unwrap();

        let files = json_files(root, |p| p.ends_with("build-info")).unwrap();
        assert_eq!(
            files,
            vec![root.join("contracts/A.sol/A.dbg.json"), root.join("contracts/A.sol/A.json")]
        );

        assert!(json_files(root.join("missing"), |_| false).is_err());
    }
}
