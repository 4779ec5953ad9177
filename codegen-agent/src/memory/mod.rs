use crate::tools::RegistryError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Schema,
    Execution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum ToolOutcome {
    Observation(String),
    Failure { kind: FailureKind, message: String },
}

impl From<Result<String, RegistryError>> for ToolOutcome {
    fn from(result: Result<String, RegistryError>) -> Self {
        match result {
            Ok(output) => ToolOutcome::Observation(output),
            Err(error) => ToolOutcome::Failure {
                kind: if error.is_schema_error() {
                    FailureKind::Schema
                } else {
                    FailureKind::Execution
                },
                message: error.to_string(),
            },
        }
    }
}

/// One tool invocation and what came back from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScratchpadEntry {
    pub iteration: usize,
    pub call_id: String,
    pub tool: String,
    pub arguments: Value,
    pub outcome: ToolOutcome,
}

impl ScratchpadEntry {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Failure { .. })
    }

    /// Text the model sees for this call. Failures are rendered as data.
    pub fn observation_text(&self) -> String {
        match &self.outcome {
            ToolOutcome::Observation(text) => text.clone(),
            ToolOutcome::Failure { message, .. } => format!("Error: {}", message),
        }
    }
}

/// Append-only record of a single task's tool calls.
///
/// Entries can be read but never replaced, reordered or removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scratchpad {
    entries: Vec<ScratchpadEntry>,
}

impl Scratchpad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ScratchpadEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ScratchpadEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScratchpadEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consecutive entries grouped by the iteration that produced them.
    pub fn by_iteration(&self) -> Vec<&[ScratchpadEntry]> {
        self.entries
            .chunk_by(|a, b| a.iteration == b.iteration)
            .collect()
    }
}

impl<'a> IntoIterator for &'a Scratchpad {
    type Item = &'a ScratchpadEntry;
    type IntoIter = std::slice::Iter<'a, ScratchpadEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
