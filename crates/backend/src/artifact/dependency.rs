//! Import graph between Truffle build artifacts.
//!
//! Truffle artifacts do not carry the compiler's file index table, so the context sources of
//! a contract are recovered from the import directives in its AST.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};

use rustc_hash::FxHashMap;
use solnorm_utils::path::file_name;

use super::index::BuildIndex;
use crate::utils::ast::import_paths;

/// Artifact file -> the artifact files it directly imports.
///
/// Cycles are kept as they are; the map is only ever queried one level deep.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DependencyMap {
    edges: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
    unresolved: BTreeMap<PathBuf, Vec<String>>,
}

impl DependencyMap {
    /// Resolves the imports of every artifact in `index`.
    pub fn build(index: &BuildIndex, source_key: &str) -> Self {
        let mut resolver = ImportResolver::new(index);
        let mut map = Self::default();

        for file in index.files() {
            let edges = map.edges.entry(file.path.clone()).or_default();
            let Some(ast) = file.data.get("ast") else {
                trace!(path = ?file.path, "artifact has no ast");
                continue;
            };

            for import in import_paths(ast) {
                match resolver.resolve(&import) {
                    Some(source) => {
                        edges.extend(index.artifacts_for(&source).map(|f| f.path.clone()));
                    }
                    None => {
                        debug!(path = ?file.path, %import, "import matches no artifact");
                        map.unresolved.entry(file.path.clone()).or_default().push(import);
                    }
                }
            }

            // A file never depends on itself, even when a sibling contract of the same
            // source imports it.
            edges.remove(&file.path);
            if let Some(own) = file.data.get(source_key).and_then(|s| s.as_str()) {
                let siblings: Vec<_> = index.artifacts_for(own).map(|f| f.path.clone()).collect();
                for sibling in siblings {
                    edges.remove(&sibling);
                }
            }
        }

        map
    }

    /// The artifacts `artifact` directly imports.
    pub fn dependencies(&self, artifact: &Path) -> impl Iterator<Item = &Path> {
        self.edges.get(artifact).into_iter().flatten().map(PathBuf::as_path)
    }

    /// Imports of `artifact` that could not be matched to any artifact.
    pub fn unresolved(&self, artifact: &Path) -> &[String] {
        self.unresolved.get(artifact).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Maps import paths to declared artifact source paths, exact match first, then by file name.
struct ImportResolver<'a> {
    index: &'a BuildIndex,
    by_file_name: FxHashMap<&'a str, Vec<&'a str>>,
    memo: FxHashMap<String, Option<String>>,
}

impl<'a> ImportResolver<'a> {
    fn new(index: &'a BuildIndex) -> Self {
        let mut by_file_name: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
        for source in index.source_paths() {
            by_file_name.entry(file_name(source)).or_default().push(source);
        }
        Self { index, by_file_name, memo: FxHashMap::default() }
    }

    fn resolve(&mut self, import: &str) -> Option<String> {
        if self.index.contains_source(import) {
            return Some(import.to_string());
        }
        if let Some(hit) = self.memo.get(import) {
            return hit.clone();
        }

        let candidates = self.by_file_name.get(file_name(import)).map(Vec::as_slice).unwrap_or_default();
        // Prefer the candidate sharing the longest path suffix with the import.
        let hit = candidates
            .iter()
            .max_by_key(|candidate| shared_suffix(candidate, import))
            .map(|s| s.to_string());

        self.memo.insert(import.to_string(), hit.clone());
        hit
    }
}

fn shared_suffix(a: &str, b: &str) -> usize {
    a.rsplit(['/', '\\']).zip(b.rsplit(['/', '\\'])).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::artifact::index::BuildFile;

    fn artifact(name: &str, source: &str, imports: &[&str]) -> BuildFile {
        let nodes: Vec<Value> = imports
            .iter()
            .map(|i| json!({"nodeType": "ImportDirective", "absolutePath": i}))
            .collect();
        BuildFile {
            path: PathBuf::from(format!("/build/{name}.json")),
            data: json!({
                "contractName": name,
                "sourcePath": source,
                "ast": {"nodeType": "SourceUnit", "absolutePath": source, "nodes": nodes},
            }),
        }
    }

    fn deps(map: &DependencyMap, name: &str) -> Vec<PathBuf> {
        map.dependencies(Path::new(&format!("/build/{name}.json"))).map(Path::to_path_buf).collect()
    }

    #[test]
    fn test_direct_imports() {
        let index = BuildIndex::new(
            vec![
                artifact("A", "/p/contracts/A.sol", &["/p/contracts/B.sol"]),
                artifact("B", "/p/contracts/B.sol", &[]),
            ],
            "sourcePath",
        )
        .unwrap();

        let map = DependencyMap::build(&index, "sourcePath");
        assert_eq!(deps(&map, "A"), vec![PathBuf::from("/build/B.json")]);
        assert!(deps(&map, "B").is_empty());
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_imports_by_file_name_and_cycles() {
        let index = BuildIndex::new(
            vec![
                artifact("A", "project:/contracts/A.sol", &["@oz/token/B.sol", "project:/contracts/C.sol"]),
                artifact("B", "/node_modules/@oz/token/B.sol", &["/elsewhere/A.sol"]),
                artifact("B2", "/node_modules/other/B.sol", &[]),
                artifact("C", "project:/contracts/C.sol", &["project:/contracts/A.sol"]),
            ],
            "sourcePath",
        )
        .unwrap();

        let map = DependencyMap::build(&index, "sourcePath");
        assert_eq!(
            deps(&map, "A"),
            vec![PathBuf::from("/build/B.json"), PathBuf::from("/build/C.json")]
        );
        assert_eq!(deps(&map, "B"), vec![PathBuf::from("/build/A.json")]);
        assert_eq!(deps(&map, "C"), vec![PathBuf::from("/build/A.json")]);
    }

    #[test]
    fn test_unresolved_imports_and_siblings() {
        let index = BuildIndex::new(
            vec![
                artifact("A", "/p/A.sol", &["/p/Missing.sol", "/p/A.sol"]),
                artifact("A2", "/p/A.sol", &["/p/Missing.sol", "/p/A.sol"]),
            ],
            "sourcePath",
        )
        .unwrap();

        let map = DependencyMap::build(&index, "sourcePath");
        assert!(deps(&map, "A").is_empty());
        assert_eq!(map.unresolved(Path::new("/build/A.json")), ["/p/Missing.sol".to_string()]);
        assert!(map.unresolved(Path::new("/build/Other.json")).is_empty());
    }
}
