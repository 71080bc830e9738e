//! Structural invariants of the workspace tree.

use crate::tree::{WorkspaceNode, WorkspaceTree};
use std::collections::HashSet;

/// Check structural invariants:
/// - No duplicate paths anywhere in the tree
/// - No two siblings share a name
/// - Each node's path is its parent's path plus `/name`
pub fn validate_invariants(tree: &WorkspaceTree) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    validate_level(&tree.nodes, "", &mut seen, &mut errors);
    errors
}

fn validate_level(
    nodes: &[WorkspaceNode],
    parent_path: &str,
    seen: &mut HashSet<String>,
    errors: &mut Vec<String>,
) {
    let mut names = HashSet::new();
    for node in nodes {
        if !seen.insert(node.path().to_string()) {
            errors.push(format!("duplicate path '{}'", node.path()));
        }

        if !names.insert(node.name()) {
            errors.push(format!(
                "{}: duplicate sibling name '{}'",
                display_parent(parent_path),
                node.name()
            ));
        }

        let expected = format!("{}/{}", parent_path, node.name());
        if node.path() != expected {
            errors.push(format!(
                "{}: path does not match parent prefix (expected '{}')",
                node.path(),
                expected
            ));
        }

        if let WorkspaceNode::Folder(folder) = node {
            validate_level(&folder.children, &folder.path, seen, errors);
        }
    }
}

fn display_parent(parent_path: &str) -> &str {
    if parent_path.is_empty() { "/" } else { parent_path }
}
