//! Folds pending build-plan steps into the workspace tree.
//!
//! Only pending `CreateFile` steps touch the tree. Every other pending step is
//! marked completed as-is, since a collaborator has already consumed it.

use thiserror::Error;

use crate::core::path::{prefix_path, split_segments};
use crate::core::types::{Step, StepKind};
use crate::tree::{FileNode, FolderNode, WorkspaceNode, WorkspaceTree};

/// Why a single `CreateFile` step could not be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConflictKind {
    #[error("path already holds a folder")]
    FolderAtFilePath,
    #[error("an intermediate segment is a file")]
    FileInFolderPosition,
    #[error("path has no usable segments")]
    InvalidPath,
}

/// Structural conflict reported for one step. The step stays pending.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("step {step_id} cannot create '{path}': {kind}")]
pub struct IntegrationError {
    pub step_id: u32,
    pub path: String,
    pub kind: ConflictKind,
}

/// Result of folding a batch of steps into a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Integration {
    pub tree: WorkspaceTree,
    pub steps: Vec<Step>,
    /// True when at least one `CreateFile` step was applied.
    pub changed: bool,
    pub conflicts: Vec<IntegrationError>,
}

/// Merge every pending step of `steps` into a copy of `tree`.
///
/// The input is never mutated; the caller swaps in the returned tree and step
/// list. A batch without applicable `CreateFile` steps reports `changed = false`
/// and returns a tree equal to the input.
pub fn integrate(tree: &WorkspaceTree, steps: &[Step]) -> Integration {
    let mut next = tree.clone();
    let mut resolved = Vec::with_capacity(steps.len());
    let mut conflicts = Vec::new();
    let mut changed = false;

    for step in steps {
        let mut step = step.clone();
        if !step.is_pending() {
            resolved.push(step);
            continue;
        }

        if step.kind != StepKind::CreateFile {
            step.complete();
            resolved.push(step);
            continue;
        }

        match apply_create_file(&mut next.nodes, &step) {
            Ok(()) => {
                changed = true;
                step.complete();
            }
            Err(err) => conflicts.push(err),
        }
        resolved.push(step);
    }

    Integration {
        tree: if changed { next } else { tree.clone() },
        steps: resolved,
        changed,
        conflicts,
    }
}

fn apply_create_file(nodes: &mut Vec<WorkspaceNode>, step: &Step) -> Result<(), IntegrationError> {
    let raw_path = step.path.as_deref().unwrap_or_default();
    let conflict = |kind: ConflictKind| IntegrationError {
        step_id: step.id,
        path: raw_path.to_string(),
        kind,
    };

    let segments = split_segments(raw_path).ok_or_else(|| conflict(ConflictKind::InvalidPath))?;
    let content = step.payload.as_deref().unwrap_or_default();
    insert_file(nodes, &segments, 1, content).map_err(conflict)
}

/// Walk one level per call, creating folders as needed.
///
/// Conflicts can only be detected while descending through existing nodes,
/// so a failed step never leaves freshly created folders behind.
fn insert_file(
    nodes: &mut Vec<WorkspaceNode>,
    segments: &[&str],
    depth: usize,
    content: &str,
) -> Result<(), ConflictKind> {
    let key = prefix_path(segments, depth);
    let name = segments[depth - 1];
    let position = nodes.iter().position(|node| node.path() == key);

    if depth == segments.len() {
        return match position {
            Some(index) => match &mut nodes[index] {
                WorkspaceNode::File(file) => {
                    file.content = content.to_string();
                    Ok(())
                }
                WorkspaceNode::Folder(_) => Err(ConflictKind::FolderAtFilePath),
            },
            None => {
                nodes.push(WorkspaceNode::File(FileNode {
                    name: name.to_string(),
                    path: key,
                    content: content.to_string(),
                }));
                Ok(())
            }
        };
    }

    let index = match position {
        Some(index) => index,
        None => {
            nodes.push(WorkspaceNode::Folder(FolderNode {
                name: name.to_string(),
                path: key,
                children: Vec::new(),
            }));
            nodes.len() - 1
        }
    };

    match &mut nodes[index] {
        WorkspaceNode::Folder(folder) => {
            insert_file(&mut folder.children, segments, depth + 1, content)
        }
        WorkspaceNode::File(_) => Err(ConflictKind::FileInFolderPosition),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::invariants::validate_invariants;
    use crate::core::types::StepStatus;
    use crate::test_support::{create_file, file, folder, run_command};

    #[test]
    fn integrate_resolves_nested_path_into_folders() {
        let result = integrate(
            &WorkspaceTree::new(),
            &[create_file(1, "src/components/App.tsx", "X")],
        );

        assert!(result.changed);
        assert_eq!(
            result.tree.nodes,
            vec![folder(
                "/src",
                vec![folder("/src/components", vec![file("/src/components/App.tsx", "X")])]
            )]
        );
        assert_eq!(result.steps[0].status, StepStatus::Completed);
    }

    #[test]
    fn integrate_adds_sibling_without_disturbing_subtree() {
        let first = integrate(
            &WorkspaceTree::new(),
            &[create_file(1, "src/components/App.tsx", "X")],
        );
        let second = integrate(&first.tree, &[create_file(2, "src/index.ts", "Y")]);

        assert_eq!(
            second.tree.nodes,
            vec![folder(
                "/src",
                vec![
                    folder("/src/components", vec![file("/src/components/App.tsx", "X")]),
                    file("/src/index.ts", "Y"),
                ]
            )]
        );
        assert!(validate_invariants(&second.tree).is_empty());
    }

    #[test]
    fn integrate_without_pending_create_file_signals_no_change() {
        let start = integrate(&WorkspaceTree::new(), &[create_file(1, "a.txt", "a")]).tree;
        let mut done = create_file(2, "b.txt", "b");
        done.complete();

        let result = integrate(&start, &[run_command(3, "npm install"), done.clone()]);

        assert!(!result.changed);
        assert_eq!(result.tree, start);
        assert_eq!(result.steps[0].status, StepStatus::Completed);
        assert_eq!(result.steps[1], done);
    }

    #[test]
    fn integrate_same_step_twice_is_idempotent() {
        let step = create_file(1, "src/main.ts", "console.log(1)");
        let once = integrate(&WorkspaceTree::new(), &[step.clone()]).tree;
        let twice = integrate(&once, &[step]).tree;
        assert_eq!(once, twice);
    }

    #[test]
    fn integrate_overwrites_existing_file_in_place() {
        let start = integrate(
            &WorkspaceTree::new(),
            &[
                create_file(1, "a.txt", "a"),
                create_file(2, "b.txt", "b"),
                create_file(3, "c.txt", "c"),
            ],
        )
        .tree;

        let result = integrate(&start, &[create_file(4, "b.txt", "updated")]);

        assert_eq!(
            result.tree.nodes,
            vec![
                file("/a.txt", "a"),
                file("/b.txt", "updated"),
                file("/c.txt", "c"),
            ]
        );
    }

    #[test]
    fn integrate_reports_conflict_without_corrupting_batch() {
        let start = integrate(&WorkspaceTree::new(), &[create_file(1, "src/app.ts", "a")]).tree;

        let result = integrate(
            &start,
            &[
                create_file(2, "src", "collides with folder"),
                create_file(3, "src/app.ts/inner.ts", "under a file"),
                create_file(4, "README.md", "readme"),
            ],
        );

        assert!(result.changed);
        assert_eq!(result.conflicts.len(), 2);
        assert_eq!(result.conflicts[0].kind, ConflictKind::FolderAtFilePath);
        assert_eq!(result.conflicts[1].kind, ConflictKind::FileInFolderPosition);
        assert_eq!(result.steps[0].status, StepStatus::Pending);
        assert_eq!(result.steps[1].status, StepStatus::Pending);
        assert_eq!(result.steps[2].status, StepStatus::Completed);
        assert_eq!(
            result.tree.nodes,
            vec![
                folder("/src", vec![file("/src/app.ts", "a")]),
                file("/README.md", "readme"),
            ]
        );
    }

    #[test]
    fn integrate_rejects_parent_segments() {
        let result = integrate(&WorkspaceTree::new(), &[create_file(1, "../escape.sh", "rm")]);

        assert!(!result.changed);
        assert!(result.tree.is_empty());
        assert_eq!(result.conflicts[0].kind, ConflictKind::InvalidPath);
        assert_eq!(
            result.conflicts[0].to_string(),
            "step 1 cannot create '../escape.sh': path has no usable segments"
        );
    }

    #[test]
    fn integrate_passes_through_non_create_steps_with_paths() {
        let start = integrate(&WorkspaceTree::new(), &[create_file(1, "src/a.ts", "a")]).tree;
        let mut folder_step = create_file(2, "src", "");
        folder_step.kind = StepKind::CreateFolder;
        let mut edit_step = create_file(3, "src/a.ts", "edited");
        edit_step.kind = StepKind::EditFile;
        let mut delete_step = create_file(4, "src/a.ts", "");
        delete_step.kind = StepKind::DeleteFile;

        let result = integrate(&start, &[folder_step, edit_step, delete_step]);

        assert!(!result.changed);
        assert!(result.conflicts.is_empty());
        assert_eq!(result.tree, start);
        assert!(
            result
                .steps
                .iter()
                .all(|step| step.status == StepStatus::Completed)
        );
    }

    #[test]
    fn integrate_rejects_missing_and_empty_paths() {
        let mut no_path = create_file(1, "", "x");
        no_path.path = None;
        let empty = create_file(2, "", "x");
        let only_separators = create_file(3, "/./", "x");

        let result = integrate(&WorkspaceTree::new(), &[no_path, empty, only_separators]);

        assert!(!result.changed);
        assert!(result.tree.is_empty());
        let kinds: Vec<ConflictKind> = result.conflicts.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ConflictKind::InvalidPath; 3]);
        let ids: Vec<u32> = result.conflicts.iter().map(|c| c.step_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(result.steps.iter().all(Step::is_pending));
    }
}
