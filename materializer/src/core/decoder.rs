//! Decoding of model replies into typed build steps.
//!
//! Replies carry a single artifact block:
//!
//! ```text
//! <boltArtifact id="app" title="Todo App">
//!   <boltAction type="file" filePath="src/App.tsx">...</boltAction>
//!   <boltAction type="shell">npm install</boltAction>
//! </boltArtifact>
//! ```

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::core::types::{Step, StepKind, StepStatus};

const DEFAULT_ARTIFACT_TITLE: &str = "Project Files";

static ARTIFACT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<boltArtifact([^>]*)>(.*?)</boltArtifact>").unwrap());
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"title="([^"]*)""#).unwrap());
static ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<boltAction\s+type="([^"]*)"(?:\s+filePath="([^"]*)")?\s*>(.*?)</boltAction>"#)
        .unwrap()
});

/// Turns raw reply text into an ordered sequence of pending steps.
pub trait StepDecoder {
    /// Decode `raw`, numbering steps from `first_id`.
    fn decode(&self, raw: &str, first_id: u32) -> Vec<Step>;
}

/// Decoder for `boltArtifact` markup.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactDecoder;

impl StepDecoder for ArtifactDecoder {
    fn decode(&self, raw: &str, first_id: u32) -> Vec<Step> {
        let Some(artifact) = ARTIFACT_RE.captures(raw) else {
            debug!("reply contains no artifact");
            return Vec::new();
        };
        let attributes = artifact.get(1).map_or("", |m| m.as_str());
        let body = artifact.get(2).map_or("", |m| m.as_str());
        let title = TITLE_RE
            .captures(attributes)
            .and_then(|caps| caps.get(1))
            .map_or(DEFAULT_ARTIFACT_TITLE, |m| m.as_str());

        let mut next_id = first_id;
        let mut steps = vec![pending(
            &mut next_id,
            title.to_string(),
            StepKind::CreateFolder,
            None,
            None,
        )];

        for action in ACTION_RE.captures_iter(body) {
            let action_type = action.get(1).map_or("", |m| m.as_str());
            let file_path = action.get(2).map(|m| m.as_str().to_string());
            let content = action.get(3).map_or("", |m| m.as_str()).trim().to_string();

            match (action_type, file_path) {
                ("file", Some(path)) => steps.push(pending(
                    &mut next_id,
                    format!("Create {path}"),
                    StepKind::CreateFile,
                    Some(path),
                    Some(content),
                )),
                ("shell", _) => steps.push(pending(
                    &mut next_id,
                    "Run command".to_string(),
                    StepKind::RunCommand,
                    None,
                    Some(content),
                )),
                (other, _) => debug!(action_type = other, "skipping unsupported action"),
            }
        }

        debug!(title, steps = steps.len(), "decoded artifact");
        steps
    }
}

fn pending(
    next_id: &mut u32,
    title: String,
    kind: StepKind,
    path: Option<String>,
    payload: Option<String>,
) -> Step {
    let id = *next_id;
    *next_id += 1;
    Step {
        id,
        title,
        description: String::new(),
        kind,
        path,
        payload,
        status: StepStatus::Pending,
    }
}
