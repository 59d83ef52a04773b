//! Reads and writes the collection through a [`SlotBackend`].
//!
//! Saving is strict: any failure is returned so the store can report it.
//! Restoring never fails: a missing, unreadable or malformed slot is reported as
//! [`Restored::Discarded`] and the caller starts from an empty collection.

use chrono::{DateTime, Utc};

use crate::error::{BlockError, Result};
use crate::model::{Block, BlockDefaults};
use crate::normalize::BlockDraft;
use crate::payload::{parse_document, Payload};
use crate::slot::SlotBackend;

pub const DEFAULT_SLOT_KEY: &str = "block_visual_builder_v1";

#[derive(Debug)]
pub enum Restored {
    Empty,
    Drafts(Vec<BlockDraft>),
    Discarded(String),
}

pub struct Persistence<B: SlotBackend> {
    backend: B,
    key: String,
}

impl<B: SlotBackend> Persistence<B> {
    pub fn new(backend: B, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn location(&self) -> String {
        self.backend.describe(&self.key)
    }

    pub fn save(&self, blocks: &[Block]) -> Result<DateTime<Utc>> {
        let updated_at = Utc::now();
        let text = Payload::saved(blocks, updated_at).to_json(false)?;
        self.backend
            .write(&self.key, &text)
            .map_err(|e| match e {
                BlockError::PersistenceUnavailable(_) => e,
                other => BlockError::PersistenceUnavailable(other.to_string()),
            })?;
        tracing::debug!(key = %self.key, blocks = blocks.len(), "saved collection");
        Ok(updated_at)
    }

    pub fn restore(&self, defaults: &BlockDefaults) -> Restored {
        let text = match self.backend.read(&self.key) {
            Ok(Some(text)) => text,
            Ok(None) => {
                tracing::debug!(key = %self.key, "no saved collection");
                return Restored::Empty;
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "could not read saved collection");
                return Restored::Discarded(e.to_string());
            }
        };

        match parse_document(&text, defaults) {
            Ok(drafts) => Restored::Drafts(drafts),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "ignoring unusable saved collection");
                Restored::Discarded(e.to_string())
            }
        }
    }
}
