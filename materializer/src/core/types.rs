//! Shared deterministic types for the materialization core.
//!
//! These types define stable contracts between the session, the integrator and
//! presentation collaborators. They carry no I/O and serialize to JSON so a
//! progress list can render them directly.

use serde::{Deserialize, Serialize};

/// Kind of build-plan instruction decoded from a model reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    CreateFile,
    CreateFolder,
    EditFile,
    DeleteFile,
    RunCommand,
}

/// Progress of a step. Transitions only `Pending -> Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Completed,
}

/// A single typed build instruction.
///
/// Everything except `status` is fixed once decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: u32,
    pub title: String,
    pub description: String,
    pub kind: StepKind,
    /// `/`-delimited target path; the final segment is the leaf name.
    pub path: Option<String>,
    /// File contents for `CreateFile`, the command line for `RunCommand`.
    pub payload: Option<String>,
    pub status: StepStatus,
}

impl Step {
    pub fn is_pending(&self) -> bool {
        self.status == StepStatus::Pending
    }

    pub fn complete(&mut self) {
        self.status = StepStatus::Completed;
    }
}

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Role-tagged entry of a session's conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_serializes_with_snake_case_kind_and_lowercase_status() {
        let step = Step {
            id: 3,
            title: "Create src/main.ts".to_string(),
            description: String::new(),
            kind: StepKind::CreateFile,
            path: Some("src/main.ts".to_string()),
            payload: Some("export {}".to_string()),
            status: StepStatus::Pending,
        };

        let value = serde_json::to_value(&step).expect("serialize");
        assert_eq!(value["kind"], "create_file");
        assert_eq!(value["status"], "pending");
    }

    #[test]
    fn message_role_serializes_lowercase() {
        let value = serde_json::to_value(Message::assistant("hi")).expect("serialize");
        assert_eq!(value["role"], "assistant");
        assert_eq!(value["content"], "hi");
    }
}
