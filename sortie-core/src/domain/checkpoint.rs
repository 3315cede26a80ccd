//! Script checkpoints
//!
//! Nodes upload a timestamp object before and after each phase of the startup
//! script. The controller never reads them; they exist for operators.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Which edge of a phase a checkpoint marks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Begin,
    End,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Begin => write!(f, "begin"),
            Phase::End => write!(f, "end"),
        }
    }
}

/// A named, ordered progress marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub sequence_index: usize,
    pub name: String,
    pub phase: Phase,
}

impl Checkpoint {
    /// `<index>-<name>-<phase>`, appended to the instance id in the object key
    pub fn key_suffix(&self) -> String {
        format!("{}-{}-{}", self.sequence_index, self.name, self.phase)
    }
}

/// Assigns checkpoint indices in order of first use
///
/// The first unseen name gets index 0, the next unseen name index 1, and so on.
/// Reusing a name (e.g. for its `End` phase) reuses its index.
#[derive(Debug, Default)]
pub struct CheckpointRegistry {
    indices: HashMap<String, usize>,
}

impl CheckpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn checkpoint(&mut self, name: &str, phase: Phase) -> Checkpoint {
        let next = self.indices.len();
        let sequence_index = *self.indices.entry(name.to_string()).or_insert(next);

        Checkpoint {
            sequence_index,
            name: name.to_string(),
            phase,
        }
    }

    /// Number of distinct checkpoint names seen so far
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
