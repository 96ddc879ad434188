use std::path::{Component, Path, PathBuf};

/// Lexically normalizes a path, resolving `.` and `..` without touching the filesystem.
///
/// Build artifacts routinely reference files that no longer exist on disk, so
/// `fs::canonicalize` is not an option here.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Returns `path` as an absolute, normalized path, resolving relative paths against `base`.
pub fn absolutize(path: impl AsRef<Path>, base: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.as_ref().join(path))
    }
}

/// Returns the longest common component-wise prefix of all `paths`.
///
/// Returns `None` for an empty input or when the paths share nothing at all
/// (e.g. a relative path mixed with an absolute one, or different drives).
pub fn common_prefix<P: AsRef<Path>>(paths: &[P]) -> Option<PathBuf> {
    let (first, rest) = paths.split_first()?;
    let mut prefix: Vec<Component<'_>> = first.as_ref().components().collect();

    for path in rest {
        let shared = prefix
            .iter()
            .zip(path.as_ref().components())
            .take_while(|(a, b)| *a == b)
            .count();
        prefix.truncate(shared);
    }

    if prefix.is_empty() {
        None
    } else {
        Some(prefix.iter().collect())
    }
}

/// Returns true if the path names at least one directory or file, i.e. it is more than a
/// bare root or drive prefix.
pub fn has_named_component(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::Normal(_)))
}

/// Converts a path into a `/`-separated string, the form used for keys in compiler output.
pub fn to_slash_string(path: &Path) -> String {
    let mut out = String::new();
    for component in path.components() {
        match component {
            Component::RootDir => out.push('/'),
            Component::Prefix(prefix) => out.push_str(&prefix.as_os_str().to_string_lossy()),
            other => {
                if !out.is_empty() && !out.ends_with('/') {
                    out.push('/');
                }
                out.push_str(&other.as_os_str().to_string_lossy());
            }
        }
    }
    out
}

/// Returns the final file name of a `/`-separated source path, such as the `B.sol` in
/// `project:/contracts/B.sol`.
pub fn file_name(source_path: &str) -> &str {
    source_path.rsplit(['/', '\\']).next().unwrap_or(source_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(normalize(Path::new("./contracts/A.sol")), PathBuf::from("contracts/A.sol"));
    }

    #[test]
    fn test_absolutize() {
        assert_eq!(absolutize("contracts/A.sol", "/proj"), PathBuf::from("/proj/contracts/A.sol"));
        assert_eq!(absolutize("/other/A.sol", "/proj"), PathBuf::from("/other/A.sol"));
        assert_eq!(absolutize("../lib/B.sol", "/proj/contracts"), PathBuf::from("/proj/lib/B.sol"));
    }

    #[test]
    fn test_common_prefix() {
        let paths = ["/home/u/proj/contracts/A.sol", "/home/u/proj/lib/B.sol"];
        assert_eq!(common_prefix(&paths), Some(PathBuf::from("/home/u/proj")));

        let paths = ["/home/u/proj/contracts/A.sol"];
        assert_eq!(common_prefix(&paths), Some(PathBuf::from("/home/u/proj/contracts/A.sol")));

        let paths = ["/a/x.sol", "/b/y.sol"];
        let prefix = common_prefix(&paths).unwrap();
        assert!(!has_named_component(&prefix));

        let paths = ["relative/x.sol", "/abs/y.sol"];
        assert_eq!(common_prefix(&paths), None);

        let empty: [&str; 0] = [];
        assert_eq!(common_prefix(&empty), None);
    }

    #[test]
    fn test_to_slash_string() {
        assert_eq!(to_slash_string(Path::new("/a/b/c.sol")), "/a/b/c.sol");
        assert_eq!(to_slash_string(Path::new("a/b")), "a/b");
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("project:/contracts/B.sol"), "B.sol");
        assert_eq!(file_name("B.sol"), "B.sol");
        assert_eq!(file_name("C:\\x\\B.sol"), "B.sol");
    }
}
