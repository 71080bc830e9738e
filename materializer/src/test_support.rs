//! Test-only helpers for constructing steps, trees and scripted collaborators.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use anyhow::{Result, anyhow};

use crate::core::projector::MountDescriptor;
use crate::core::types::{Message, Step, StepKind, StepStatus};
use crate::io::backend::{Backend, ExchangeError, Template};
use crate::io::mount::Mount;
use crate::tree::{FileNode, FolderNode, WorkspaceNode};

pub use crate::core::rate_limit::ManualClock;

/// Pending `CreateFile` step for `path`.
pub fn create_file(id: u32, path: &str, content: &str) -> Step {
    Step {
        id,
        title: format!("Create {}", path),
        description: String::new(),
        kind: StepKind::CreateFile,
        path: Some(path.to_string()),
        payload: Some(content.to_string()),
        status: StepStatus::Pending,
    }
}

/// Pending `RunCommand` step.
pub fn run_command(id: u32, command: &str) -> Step {
    Step {
        id,
        title: "Run command".to_string(),
        description: String::new(),
        kind: StepKind::RunCommand,
        path: None,
        payload: Some(command.to_string()),
        status: StepStatus::Pending,
    }
}

fn leaf_name(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

/// File node named after the last segment of `path`.
pub fn file(path: &str, content: &str) -> WorkspaceNode {
    WorkspaceNode::File(FileNode {
        name: leaf_name(path),
        path: path.to_string(),
        content: content.to_string(),
    })
}

/// Folder node named after the last segment of `path`.
pub fn folder(path: &str, children: Vec<WorkspaceNode>) -> WorkspaceNode {
    WorkspaceNode::Folder(FolderNode {
        name: leaf_name(path),
        path: path.to_string(),
        children,
    })
}

/// Artifact reply creating each `(path, contents)` file.
pub fn artifact_reply(files: &[(&str, &str)]) -> String {
    let mut reply = String::from("<boltArtifact id=\"project\" title=\"Project\">\n");
    for (path, contents) in files {
        reply.push_str(&format!(
            "<boltAction type=\"file\" filePath=\"{}\">{}</boltAction>\n",
            path, contents
        ));
    }
    reply.push_str("</boltArtifact>");
    reply
}

/// Backend returning a fixed template and a queue of exchange results.
pub struct ScriptedBackend {
    template: Template,
    replies: RefCell<VecDeque<Result<String, ExchangeError>>>,
    requests: RefCell<Vec<Vec<Message>>>,
}

impl ScriptedBackend {
    pub fn new(template: Template, replies: Vec<Result<String, ExchangeError>>) -> Self {
        Self {
            template,
            replies: RefCell::new(replies.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Conversations sent to `exchange`, in call order.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.borrow().clone()
    }
}

impl Backend for ScriptedBackend {
    fn template(&self, _prompt: &str) -> Result<Template, ExchangeError> {
        Ok(self.template.clone())
    }

    fn exchange(&self, history: &[Message]) -> Result<String, ExchangeError> {
        self.requests.borrow_mut().push(history.to_vec());
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ExchangeError::Failed("no scripted reply left".to_string())))
    }
}

/// Mount that records every descriptor it receives.
#[derive(Default)]
pub struct RecordingMount {
    descriptors: RefCell<Vec<MountDescriptor>>,
}

impl RecordingMount {
    pub fn descriptors(&self) -> Vec<MountDescriptor> {
        self.descriptors.borrow().clone()
    }
}

impl Mount for RecordingMount {
    fn mount(&self, descriptor: &MountDescriptor) -> Result<()> {
        self.descriptors.borrow_mut().push(descriptor.clone());
        Ok(())
    }
}

/// Mount that always fails, counting attempts.
#[derive(Default)]
pub struct FailingMount {
    attempts: Cell<u32>,
}

impl FailingMount {
    pub fn attempts(&self) -> u32 {
        self.attempts.get()
    }
}

impl Mount for FailingMount {
    fn mount(&self, _descriptor: &MountDescriptor) -> Result<()> {
        self.attempts.set(self.attempts.get() + 1);
        Err(anyhow!("sandbox not ready"))
    }
}
