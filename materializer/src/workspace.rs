//! Owner of the workspace tree and the step list.
//!
//! New batches are appended to the step list, integrated, and, when the tree
//! changed and is non-empty, projected and handed to the mount. Readers get
//! immutable snapshots.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::integrator::{IntegrationError, integrate};
use crate::core::projector::project;
use crate::core::types::Step;
use crate::io::mount::Mount;
use crate::tree::WorkspaceTree;

/// What a single [`Workspace::apply`] did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApplyOutcome {
    pub changed: bool,
    /// Whether a descriptor was handed to the mount.
    pub mounted: bool,
    pub conflicts: Vec<IntegrationError>,
}

pub struct Workspace<M> {
    tree: Arc<WorkspaceTree>,
    steps: Vec<Step>,
    mount: M,
}

impl<M: Mount> Workspace<M> {
    pub fn new(mount: M) -> Self {
        Self {
            tree: Arc::new(WorkspaceTree::new()),
            steps: Vec::new(),
            mount,
        }
    }

    /// Read-only snapshot of the current tree.
    pub fn tree(&self) -> Arc<WorkspaceTree> {
        Arc::clone(&self.tree)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn mount(&self) -> &M {
        &self.mount
    }

    /// Drop the tree and step list for a new session.
    pub fn reset(&mut self) {
        self.tree = Arc::new(WorkspaceTree::new());
        self.steps.clear();
    }

    /// Integrate `batch` and append its resolved steps.
    ///
    /// Only the incoming batch is integrated. Steps that conflicted in an
    /// earlier batch stay pending in the list and are not reported again.
    pub fn apply(&mut self, batch: Vec<Step>) -> ApplyOutcome {
        let integration = integrate(&self.tree, &batch);
        self.steps.extend(integration.steps);

        for conflict in &integration.conflicts {
            warn!(step_id = conflict.step_id, path = %conflict.path, kind = %conflict.kind, "structural conflict");
        }

        let mut outcome = ApplyOutcome {
            changed: integration.changed,
            mounted: false,
            conflicts: integration.conflicts,
        };
        if !integration.changed {
            debug!("no tree change; skipping projection");
            return outcome;
        }

        self.tree = Arc::new(integration.tree);
        info!(files = self.tree.file_count(), "workspace tree updated");
        outcome.mounted = self.remount();
        outcome
    }

    /// Project the tree and submit it. Failures are logged; the tree stays authoritative.
    fn remount(&self) -> bool {
        if self.tree.is_empty() {
            debug!("empty tree; skipping mount");
            return false;
        }
        let descriptor = project(&self.tree);
        if let Err(err) = self.mount.mount(&descriptor) {
            warn!(error = %format!("{err:#}"), "mount failed; will retry on next change");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::StepStatus;
    use crate::test_support::{FailingMount, RecordingMount, create_file, run_command};

    #[test]
    fn apply_mounts_after_each_change() {
        let mut workspace = Workspace::new(RecordingMount::default());

        let outcome = workspace.apply(vec![create_file(1, "src/main.ts", "a")]);
        assert!(outcome.changed);
        assert!(outcome.mounted);

        workspace.apply(vec![create_file(2, "src/util.ts", "b")]);
        let descriptors = workspace.mount().descriptors();
        assert_eq!(descriptors.len(), 2);
        assert!(descriptors[1].contains_key("src"));
        assert!(workspace.steps().iter().all(|s| s.status == StepStatus::Completed));
    }

    #[test]
    fn apply_without_file_steps_does_not_remount() {
        let mut workspace = Workspace::new(RecordingMount::default());
        workspace.apply(vec![create_file(1, "a.txt", "a")]);

        let outcome = workspace.apply(vec![run_command(2, "npm run dev")]);

        assert!(!outcome.changed);
        assert!(!outcome.mounted);
        assert_eq!(workspace.mount().descriptors().len(), 1);
        assert_eq!(workspace.steps()[1].status, StepStatus::Completed);
    }

    #[test]
    fn mount_failure_keeps_tree_and_retries_on_next_change() {
        let mut workspace = Workspace::new(FailingMount::default());

        workspace.apply(vec![create_file(1, "a.txt", "a")]);
        workspace.apply(vec![create_file(2, "b.txt", "b")]);

        assert_eq!(workspace.tree().file_count(), 2);
        assert_eq!(workspace.mount().attempts(), 2);
    }

    #[test]
    fn snapshots_are_unaffected_by_later_changes() {
        let mut workspace = Workspace::new(RecordingMount::default());
        workspace.apply(vec![create_file(1, "a.txt", "a")]);
        let snapshot = workspace.tree();

        workspace.apply(vec![create_file(2, "a.txt", "changed")]);

        assert_eq!(
            snapshot.find("/a.txt"),
            Some(&crate::test_support::file("/a.txt", "a"))
        );
        assert_eq!(
            workspace.tree().find("/a.txt"),
            Some(&crate::test_support::file("/a.txt", "changed"))
        );
    }

    #[test]
    fn conflicting_step_stays_pending() {
        let mut workspace = Workspace::new(RecordingMount::default());
        workspace.apply(vec![create_file(1, "src/a.ts", "a")]);

        let outcome = workspace.apply(vec![create_file(2, "src", "oops")]);

        assert!(!outcome.changed);
        assert_eq!(outcome.conflicts.len(), 1);
        assert_eq!(workspace.steps()[1].status, StepStatus::Pending);
    }

    #[test]
    fn earlier_conflicts_are_not_reported_by_later_batches() {
        let mut workspace = Workspace::new(RecordingMount::default());
        workspace.apply(vec![create_file(1, "src/a.ts", "a")]);
        let conflicted = workspace.apply(vec![create_file(2, "src", "oops")]);
        assert_eq!(conflicted.conflicts[0].step_id, 2);

        let later = workspace.apply(vec![create_file(3, "src/b.ts", "b")]);
        let again = workspace.apply(vec![run_command(4, "npm test")]);

        assert!(later.conflicts.is_empty());
        assert!(later.changed);
        assert!(again.conflicts.is_empty());
        let statuses: Vec<StepStatus> = workspace.steps().iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![
                StepStatus::Completed,
                StepStatus::Pending,
                StepStatus::Completed,
                StepStatus::Completed,
            ]
        );
    }
}
