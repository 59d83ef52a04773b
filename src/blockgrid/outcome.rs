//! Structured results of store operations.
//!
//! The library never prints. Each mutating operation returns an [`Outcome`]
//! describing what changed, which repairs were made and whether the change
//! reached durable storage; the CLI decides how to show it.

use chrono::{DateTime, Utc};

use crate::model::Block;
use crate::normalize::Repair;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

/// Whether the last mutation reached the durable slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SaveStatus {
    Saved(DateTime<Utc>),
    Failed(String),
    /// Nothing changed, so nothing was written.
    #[default]
    Skipped,
}

impl SaveStatus {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveStatus::Saved(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SaveStatus::Failed(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Outcome {
    /// Blocks created or edited, in their state after the operation.
    pub affected: Vec<Block>,
    /// Ids deleted by the operation.
    pub removed: Vec<String>,
    pub repairs: Vec<Repair>,
    pub saved: SaveStatus,
    pub messages: Vec<CmdMessage>,
}

impl Outcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_affected(mut self, blocks: Vec<Block>) -> Self {
        self.affected = blocks;
        self
    }

    pub fn with_removed(mut self, ids: Vec<String>) -> Self {
        self.removed = ids;
        self
    }

    pub fn with_repairs(mut self, repairs: Vec<Repair>) -> Self {
        self.repairs = repairs;
        self
    }

    /// True when the operation changed nothing.
    pub fn is_noop(&self) -> bool {
        self.affected.is_empty() && self.removed.is_empty() && self.saved == SaveStatus::Skipped
    }
}

/// What `load` found in the durable slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadSource {
    /// Nothing stored yet.
    #[default]
    Empty,
    Restored,
    /// The slot existed but could not be used; the store starts empty.
    Discarded(String),
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub source: LoadSource,
    pub blocks: usize,
    pub repairs: Vec<Repair>,
}
