//! Helpers over compiler ASTs, which are kept as opaque JSON trees.
//!
//! Both the compact AST (`nodeType`, fields inline) and the legacy AST (`name`, fields under
//! `attributes`, children under `children`) are understood.

use serde_json::Value;

const IMPORT_DIRECTIVE: &str = "ImportDirective";

fn node_type(node: &Value) -> Option<&str> {
    node.get("nodeType").or_else(|| node.get("name")).and_then(Value::as_str)
}

fn attribute<'a>(node: &'a Value, key: &str) -> Option<&'a Value> {
    node.get(key).or_else(|| node.get("attributes").and_then(|a| a.get(key)))
}

/// Returns the `absolutePath` of every import directive in `ast`, in source order.
pub fn import_paths(ast: &Value) -> Vec<String> {
    let mut paths = Vec::new();
    collect_imports(ast, &mut paths);
    paths
}

fn collect_imports(node: &Value, paths: &mut Vec<String>) {
    match node {
        Value::Object(map) => {
            if node_type(node) == Some(IMPORT_DIRECTIVE) {
                if let Some(path) = attribute(node, "absolutePath").and_then(Value::as_str) {
                    paths.push(path.to_string());
                }
                return;
            }
            for key in ["nodes", "children"] {
                if let Some(children) = map.get(key) {
                    collect_imports(children, paths);
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_imports(item, paths)),
        _ => {}
    }
}

/// Returns the file index recorded in the `src` attribute (`offset:length:index`) of the
/// AST root.
pub fn source_unit_index(ast: &Value) -> Option<usize> {
    let src = ast.get("src").and_then(Value::as_str)?;
    src.split(':').nth(2)?.parse().ok()
}

/// Returns the `absolutePath` of the AST root.
pub fn absolute_path(ast: &Value) -> Option<&str> {
    attribute(ast, "absolutePath").and_then(Value::as_str)
}

/// Rewrites the `absolutePath` of the AST root with `rewrite`. Returns true if the tree was
/// changed.
pub fn rewrite_absolute_path(ast: &mut Value, rewrite: impl Fn(&str) -> Option<String>) -> bool {
    let slot = if ast.get("absolutePath").is_some() {
        ast.get_mut("absolutePath")
    } else {
        ast.get_mut("attributes").and_then(|a| a.get_mut("absolutePath"))
    };

    let Some(slot) = slot else { return false };
    let Some(new_path) = slot.as_str().and_then(&rewrite) else { return false };
    *slot = Value::String(new_path);
    true
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_import_paths_compact_ast() {
        let ast = json!({
            "absolutePath": "/p/contracts/A.sol",
            "nodeType": "SourceUnit",
            "src": "0:120:3",
            "nodes": [
                {"nodeType": "PragmaDirective", "literals": ["solidity", "^", "0.8"]},
                {"nodeType": "ImportDirective", "absolutePath": "/p/contracts/B.sol", "file": "./B.sol"},
                {"nodeType": "ImportDirective", "absolutePath": "/p/lib/C.sol", "file": "../lib/C.sol"},
                {"nodeType": "ContractDefinition", "nodes": []}
            ]
        });

        assert_eq!(import_paths(&ast), vec!["/p/contracts/B.sol", "/p/lib/C.sol"]);
        assert_eq!(source_unit_index(&ast), Some(3));
        assert_eq!(absolute_path(&ast), Some("/p/contracts/A.sol"));
    }

    #[test]
    fn test_import_paths_legacy_ast() {
        let ast = json!({
            "name": "SourceUnit",
            "attributes": {"absolutePath": "/p/A.sol"},
            "src": "0:50",
            "children": [
                {"name": "ImportDirective", "attributes": {"absolutePath": "/p/B.sol"}}
            ]
        });

        assert_eq!(import_paths(&ast), vec!["/p/B.sol"]);
        assert_eq!(source_unit_index(&ast), None);
        assert_eq!(absolute_path(&ast), Some("/p/A.sol"));
    }

    #[test]
    fn test_rewrite_absolute_path() {
        let mut ast = json!({"absolutePath": "/home/u/p/A.sol", "nodes": []});
        assert!(rewrite_absolute_path(&mut ast, |p| p.strip_prefix("/home/u/").map(String::from)));
        assert_eq!(ast["absolutePath"], "p/A.sol");

        let mut legacy = json!({"attributes": {"absolutePath": "/home/u/p/A.sol"}});
        assert!(rewrite_absolute_path(&mut legacy, |p| p.strip_prefix("/home/u/").map(String::from)));
        assert_eq!(legacy["attributes"]["absolutePath"], "p/A.sol");

        let mut other = json!({"absolutePath": "/x/A.sol"});
        assert!(!rewrite_absolute_path(&mut other, |p| p.strip_prefix("/home/u/").map(String::from)));
        assert!(!rewrite_absolute_path(&mut json!(null), |p| Some(p.to_string())));
    }
}
