//! Presentation-facing facade: one session feeding one workspace.

use std::sync::Arc;

use crate::core::decoder::{ArtifactDecoder, StepDecoder};
use crate::core::integrator::IntegrationError;
use crate::core::rate_limit::{Clock, RateLimitState, SystemClock};
use crate::core::types::{Message, Step};
use crate::io::backend::Backend;
use crate::io::mount::Mount;
use crate::session::{GenerationSession, SessionError};
use crate::tree::WorkspaceTree;
use crate::workspace::Workspace;

pub struct Builder<B, M, D = ArtifactDecoder, C = SystemClock> {
    backend: B,
    session: GenerationSession<D, C>,
    workspace: Workspace<M>,
}

impl<B: Backend, M: Mount> Builder<B, M> {
    pub fn with_defaults(backend: B, mount: M, default_retry_after_secs: u64) -> Self {
        Self::new(
            backend,
            mount,
            GenerationSession::with_defaults(default_retry_after_secs),
        )
    }
}

impl<B: Backend, M: Mount, D: StepDecoder, C: Clock> Builder<B, M, D, C> {
    pub fn new(backend: B, mount: M, session: GenerationSession<D, C>) -> Self {
        Self {
            backend,
            session,
            workspace: Workspace::new(mount),
        }
    }

    /// Begin a new session for `prompt`, discarding the previous workspace.
    ///
    /// Returns the structural conflicts raised by the emitted batches. The
    /// conflicting steps stay pending in [`Builder::steps`].
    pub fn start(&mut self, prompt: &str) -> Result<Vec<IntegrationError>, SessionError> {
        self.workspace.reset();
        let workspace = &mut self.workspace;
        let mut conflicts = Vec::new();
        self.session.start(&self.backend, prompt, |batch| {
            conflicts.extend(workspace.apply(batch).conflicts);
        })?;
        Ok(conflicts)
    }

    /// Send a follow-up and return the conflicts raised by its batch.
    pub fn submit_follow_up(
        &mut self,
        text: &str,
    ) -> Result<Vec<IntegrationError>, SessionError> {
        let workspace = &mut self.workspace;
        let mut conflicts = Vec::new();
        self.session.send_follow_up(&self.backend, text, |batch| {
            conflicts.extend(workspace.apply(batch).conflicts);
        })?;
        Ok(conflicts)
    }

    pub fn tree(&self) -> Arc<WorkspaceTree> {
        self.workspace.tree()
    }

    pub fn steps(&self) -> &[Step] {
        self.workspace.steps()
    }

    pub fn history(&self) -> &[Message] {
        self.session.history()
    }

    pub fn rate_limit(&mut self) -> RateLimitState {
        self.session.rate_limit()
    }

    pub fn workspace(&self) -> &Workspace<M> {
        &self.workspace
    }
}
