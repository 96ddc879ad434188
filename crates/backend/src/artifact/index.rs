//! Two-pass loading of build artifact directories.
//!
//! Pass one walks the build directory and parses every JSON file into a flat list of
//! [`BuildFile`]s. Pass two groups that list by the source path each artifact declares. The
//! resulting [`BuildIndex`] is immutable.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde_json::Value;
use solnorm_utils::fs::json_files;

use crate::error::{Error, Result};

/// A parsed build artifact file.
#[derive(Clone, Debug)]
pub struct BuildFile {
    pub path: PathBuf,
    pub data: Value,
}

impl BuildFile {
    /// Returns the string under `key`, or a build-artifacts error naming this file.
    pub fn required_str(&self, key: &str) -> Result<&str> {
        self.data.get(key).and_then(Value::as_str).ok_or_else(|| {
            Error::build_artifacts(&self.path, format!("build artifact is missing key {key:?}"))
        })
    }

    /// Returns the value under `key`, or a build-artifacts error naming this file.
    pub fn required(&self, key: &str) -> Result<&Value> {
        self.data.get(key).filter(|v| !v.is_null()).ok_or_else(|| {
            Error::build_artifacts(&self.path, format!("build artifact is missing key {key:?}"))
        })
    }
}

/// Reads and parses a single JSON file.
pub fn read_json(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_str(&content)
        .map_err(|source| Error::MalformedArtifact { path: path.to_path_buf(), source })
}

/// Pass one: parses every JSON file under `dir`, pruning sub-directories for which
/// `skip_dir` returns true.
pub fn load_build_files(dir: &Path, skip_dir: impl Fn(&Path) -> bool) -> Result<Vec<BuildFile>> {
    if !dir.is_dir() {
        return Err(Error::build_artifacts(dir, "build directory does not exist"));
    }

    let paths = json_files(dir, skip_dir).map_err(|e| Error::io(dir, e))?;
    let files = paths
        .into_iter()
        .map(|path| read_json(&path).map(|data| BuildFile { path, data }))
        .collect::<Result<Vec<_>>>()?;

    debug!(?dir, n = files.len(), "loaded build files");
    Ok(files)
}

/// Build files grouped by the source path they declare.
#[derive(Debug, Default)]
pub struct BuildIndex {
    files: Vec<BuildFile>,
    by_source: BTreeMap<String, Vec<usize>>,
    by_path: BTreeMap<PathBuf, usize>,
}

impl BuildIndex {
    /// Runs both passes over `dir`.
    pub fn load(dir: &Path, source_key: &str, skip_dir: impl Fn(&Path) -> bool) -> Result<Self> {
        let files = load_build_files(dir, skip_dir)?;
        if files.is_empty() {
            return Err(Error::build_artifacts(dir, "no build artifacts found"));
        }
        Self::new(files, source_key)
    }

    /// Pass two: groups `files` by the string each declares under `source_key`. Files keep
    /// their relative order within a group.
    pub fn new(files: Vec<BuildFile>, source_key: &str) -> Result<Self> {
        let mut by_source: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut by_path = BTreeMap::new();

        for (i, file) in files.iter().enumerate() {
            let source = file.required_str(source_key)?;
            by_source.entry(source.to_string()).or_default().push(i);
            by_path.insert(file.path.clone(), i);
        }

        Ok(Self { files, by_source, by_path })
    }

    pub fn files(&self) -> &[BuildFile] {
        &self.files
    }

    /// Declared source paths, in sorted order.
    pub fn source_paths(&self) -> impl Iterator<Item = &str> {
        self.by_source.keys().map(String::as_str)
    }

    pub fn contains_source(&self, source: &str) -> bool {
        self.by_source.contains_key(source)
    }

    /// Every build file declaring `source`.
    pub fn artifacts_for<'a>(&'a self, source: &str) -> impl Iterator<Item = &'a BuildFile> + 'a {
        self.by_source
            .get(source)
            .into_iter()
            .flat_map(move |indices| indices.iter().map(move |&i| &self.files[i]))
    }

    /// The first build file declaring `source`. Every artifact of one source file carries
    /// the same source text and AST, so any of them will do.
    pub fn first(&self, source: &str) -> Option<&BuildFile> {
        self.artifacts_for(source).next()
    }

    /// Returns the build file loaded from `path`.
    pub fn by_path(&self, path: &Path) -> Option<&BuildFile> {
        self.by_path.get(path).map(|&i| &self.files[i])
    }

    /// Returns the source path declared by the build file loaded from `path`.
    pub fn source_of(&self, path: &Path, source_key: &str) -> Option<&str> {
        self.by_path(path)?.data.get(source_key)?.as_str()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn write(dir: &Path, name: &str, value: &Value) {
        let path = dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_string(value).unwrap()).unwrap();
    }

    #[test]
    fn test_load_groups_by_source() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "A.json", &json!({"contractName": "A", "sourcePath": "/p/A.sol"}));
        write(root, "A2.json", &json!({"contractName": "A2", "sourcePath": "/p/A.sol"}));
        write(root, "B.json", &json!({"contractName": "B", "sourcePath": "/p/B.sol"}));
        write(root, "skipped/C.json", &json!({"contractName": "C"}));

        let index = BuildIndex::load(root, "sourcePath", |p| p.ends_with("skipped")).unwrap();
        assert_eq!(index.files().len(), 3);
        assert_eq!(index.source_paths().collect::<Vec<_>>(), vec!["/p/A.sol", "/p/B.sol"]);

        let names: Vec<_> = index
            .artifacts_for("/p/A.sol")
            .map(|f| f.required_str("contractName").unwrap())
            .collect();
        assert_eq!(names, vec!["A", "A2"]);
        assert_eq!(index.first("/p/B.sol").unwrap().path, root.join("B.json"));
        assert_eq!(index.source_of(&root.join("B.json"), "sourcePath"), Some("/p/B.sol"));
        assert!(index.first("/p/C.sol").is_none());
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        let err = BuildIndex::load(&root.join("missing"), "sourcePath", |_| false).unwrap_err();
        assert!(matches!(&err, Error::BuildArtifacts { path, .. } if path == &root.join("missing")));

        let err = BuildIndex::load(root, "sourcePath", |_| false).unwrap_err();
        assert!(matches!(err, Error::BuildArtifacts { .. }));

        fs::write(root.join("broken.json"), "{not json").unwrap();
        let err = BuildIndex::load(root, "sourcePath", |_| false).unwrap_err();
        assert!(matches!(&err, Error::MalformedArtifact { path, .. } if path == &root.join("broken.json")));
        assert!(err.is_build_artifacts());

        fs::write(root.join("broken.json"), "{}").unwrap();
        let err = BuildIndex::load(root, "sourcePath", |_| false).unwrap_err();
        assert!(matches!(err, Error::BuildArtifacts { .. }));
    }
}
