use serde::{Deserialize, Serialize};

/// A node of the workspace hierarchy. `path` is the node's identity key.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkspaceNode {
    File(FileNode),
    Folder(FolderNode),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileNode {
    pub name: String,
    pub path: String,
    pub content: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FolderNode {
    pub name: String,
    pub path: String,
    /// Siblings in insertion order. No implicit sort.
    pub children: Vec<WorkspaceNode>,
}

impl WorkspaceNode {
    pub fn name(&self) -> &str {
        match self {
            WorkspaceNode::File(file) => &file.name,
            WorkspaceNode::Folder(folder) => &folder.name,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            WorkspaceNode::File(file) => &file.path,
            WorkspaceNode::Folder(folder) => &folder.path,
        }
    }

    pub fn children(&self) -> &[WorkspaceNode] {
        match self {
            WorkspaceNode::File(_) => &[],
            WorkspaceNode::Folder(folder) => &folder.children,
        }
    }
}

/// Ordered top-level nodes of the project.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkspaceTree {
    pub nodes: Vec<WorkspaceNode>,
}

impl WorkspaceTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find a node anywhere in the tree by its full `/`-prefixed path.
    pub fn find(&self, path: &str) -> Option<&WorkspaceNode> {
        find_in(&self.nodes, path)
    }

    /// Number of file nodes in the tree.
    pub fn file_count(&self) -> usize {
        count_files(&self.nodes)
    }
}

fn find_in<'a>(nodes: &'a [WorkspaceNode], path: &str) -> Option<&'a WorkspaceNode> {
    for node in nodes {
        if node.path() == path {
            return Some(node);
        }
        if let WorkspaceNode::Folder(folder) = node {
            if path.starts_with(&format!("{}/", folder.path)) {
                return find_in(&folder.children, path);
            }
        }
    }
    None
}

fn count_files(nodes: &[WorkspaceNode]) -> usize {
    nodes
        .iter()
        .map(|node| match node {
            WorkspaceNode::File(_) => 1,
            WorkspaceNode::Folder(folder) => count_files(&folder.children),
        })
        .sum()
}
