//! Projection of the workspace tree into the sandbox mount format.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::tree::{WorkspaceNode, WorkspaceTree};

/// Entries keyed by node name, in tree sibling order.
pub type MountDescriptor = IndexMap<String, MountEntry>;

/// One entry of a mount descriptor.
///
/// Serializes as `{"file": {"contents": ..}}` or `{"directory": {..}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountEntry {
    File { contents: String },
    Directory(MountDescriptor),
}

/// Project `tree` into a fresh mount descriptor. An empty tree yields an empty descriptor.
pub fn project(tree: &WorkspaceTree) -> MountDescriptor {
    project_level(&tree.nodes)
}

fn project_level(nodes: &[WorkspaceNode]) -> MountDescriptor {
    nodes
        .iter()
        .map(|node| {
            let entry = match node {
                WorkspaceNode::File(file) => MountEntry::File {
                    contents: file.content.clone(),
                },
                WorkspaceNode::Folder(folder) => {
                    MountEntry::Directory(project_level(&folder.children))
                }
            };
            (node.name().to_string(), entry)
        })
        .collect()
}

/// Depth of the deepest entry (a flat descriptor has depth 1).
pub fn descriptor_depth(descriptor: &MountDescriptor) -> usize {
    descriptor
        .values()
        .map(|entry| match entry {
            MountEntry::File { .. } => 1,
            MountEntry::Directory(children) => 1 + descriptor_depth(children),
        })
        .max()
        .unwrap_or(0)
}
