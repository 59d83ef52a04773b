//! # Block Store
//!
//! [`BlockStore`] owns the live collection: the ordered blocks, the current
//! selection and a dirty flag, plus the id generator and the persistence adapter.
//! It is an ordinary value; any number of stores can exist side by side, each
//! bound to its own backend and slot key.
//!
//! ## Invariants
//!
//! After every operation, including `load` and `import`:
//!
//! - ids are unique and non-empty
//! - every parent reference names a block of the collection, never the block itself
//! - following parent references always ends at a root
//! - no two blocks share a cell
//!
//! Structural edits keep these by construction (new blocks only get existing
//! parents and free cells; removal takes whole subtrees). Untrusted documents go
//! through [`crate::normalize`].
//!
//! ## Saving
//!
//! Every mutation is followed by a synchronous save of the whole collection. A
//! failed save does not roll anything back: the edit stands in memory, the store
//! stays dirty, and the failure is reported through [`Outcome::saved`]. Call
//! [`BlockStore::flush`] to retry.

use std::collections::HashSet;

use crate::error::{BlockError, Result};
use crate::ids::{IdGenerator, SessionIds};
use crate::layout::{find_free_cell, Cell, OccupiedCells};
use crate::model::{Block, BlockDefaults, BlockPatch, ValuePair};
use crate::normalize::{normalize, Normalized};
use crate::outcome::{CmdMessage, LoadReport, LoadSource, Outcome, SaveStatus};
use crate::payload::{parse_document, Payload};
use crate::persist::{Persistence, Restored};
use crate::slot::SlotBackend;

/// Where a new block should go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateRequest {
    /// Parent for the new block. An id that is not in the collection makes a root.
    pub parent_id: Option<String>,
    /// Preferred cell. Without one, the block goes right of its parent, or to
    /// the origin for roots.
    pub cell: Option<Cell>,
}

impl CreateRequest {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child_of(parent_id: impl Into<String>) -> Self {
        Self {
            parent_id: Some(parent_id.into()),
            cell: None,
        }
    }

    pub fn at(mut self, cell: Cell) -> Self {
        self.cell = Some(cell);
        self
    }
}

pub struct BlockStore<B: SlotBackend> {
    blocks: Vec<Block>,
    selected: Option<String>,
    dirty: bool,
    ids: Box<dyn IdGenerator>,
    defaults: BlockDefaults,
    persistence: Persistence<B>,
}

impl<B: SlotBackend> BlockStore<B> {
    /// An empty store over `backend`. Call [`BlockStore::load`] to restore saved state.
    pub fn new(backend: B, slot_key: impl Into<String>) -> Self {
        Self {
            blocks: Vec::new(),
            selected: None,
            dirty: false,
            ids: Box::new(SessionIds::new()),
            defaults: BlockDefaults::default(),
            persistence: Persistence::new(backend, slot_key),
        }
    }

    pub fn with_ids(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    pub fn with_defaults(mut self, defaults: BlockDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn backend(&self) -> &B {
        self.persistence.backend()
    }

    /// Where the collection is saved, for display.
    pub fn location(&self) -> String {
        self.persistence.location()
    }

    // --- Lifecycle ---

    /// Replaces the in-memory state with whatever the slot holds.
    ///
    /// Never fails: a missing or unusable slot yields an empty store. Repairs made
    /// while loading are reported but not written back until the next mutation.
    pub fn load(&mut self) -> LoadReport {
        self.blocks.clear();
        self.selected = None;
        self.dirty = false;

        let mut report = LoadReport::default();
        match self.persistence.restore(&self.defaults) {
            Restored::Empty => {}
            Restored::Discarded(reason) => report.source = LoadSource::Discarded(reason),
            Restored::Drafts(drafts) => {
                let Normalized { blocks, repairs } = normalize(drafts, self.ids.as_mut());
                self.blocks = blocks;
                self.selected = self.blocks.first().map(|b| b.id.clone());
                report.source = LoadSource::Restored;
                report.repairs = repairs;
            }
        }
        report.blocks = self.blocks.len();

        tracing::debug!(
            blocks = report.blocks,
            repairs = report.repairs.len(),
            "loaded collection"
        );
        report
    }

    /// Saves if the last save failed.
    pub fn flush(&mut self) -> SaveStatus {
        if !self.dirty {
            return SaveStatus::Skipped;
        }
        self.persist()
    }

    // --- Structural operations ---

    pub fn create(&mut self, request: CreateRequest) -> Outcome {
        let parent = request.parent_id.and_then(|id| {
            let cell = self.get(&id)?.cell();
            Some((id, cell))
        });

        let wanted = match (request.cell, &parent) {
            (Some(cell), _) => cell,
            (None, Some((_, parent_cell))) => parent_cell.next_column(),
            (None, None) => Cell::ORIGIN,
        };
        let cell = find_free_cell(
            i64::from(wanted.gx),
            i64::from(wanted.gy),
            &self.occupied(),
        );

        let id = self.fresh_id();
        let block = Block::new(id.clone(), parent.map(|(id, _)| id), cell, &self.defaults);
        tracing::debug!(id = %id, cell = %cell, parent = ?block.parent_id, "creating block");

        self.blocks.push(block.clone());
        self.selected = Some(id);

        let mut outcome = Outcome::new().with_affected(vec![block]);
        outcome.add_message(CmdMessage::success(format!(
            "Created block at grid {}.",
            cell
        )));
        self.finish(outcome)
    }

    /// Removes `id` and everything below it.
    pub fn remove(&mut self, id: &str) -> Outcome {
        if self.get(id).is_none() {
            let mut outcome = Outcome::new();
            outcome.add_message(CmdMessage::warning(format!("No block with id {}.", id)));
            return outcome;
        }

        let mut doomed: HashSet<String> = self
            .descendants(id)
            .into_iter()
            .map(|b| b.id.clone())
            .collect();
        doomed.insert(id.to_string());

        let removed: Vec<String> = self
            .blocks
            .iter()
            .filter(|b| doomed.contains(&b.id))
            .map(|b| b.id.clone())
            .collect();
        self.blocks.retain(|b| !doomed.contains(&b.id));

        if self
            .selected
            .as_ref()
            .is_some_and(|s| doomed.contains(s))
        {
            self.selected = self.blocks.first().map(|b| b.id.clone());
        }

        tracing::debug!(id = %id, removed = removed.len(), "removed subtree");

        let mut outcome = Outcome::new();
        let message = match removed.len() {
            1 => "Removed 1 block.".to_string(),
            n => format!("Removed {} blocks.", n),
        };
        outcome.add_message(CmdMessage::success(message));
        self.finish(outcome.with_removed(removed))
    }

    pub fn clear(&mut self) -> Outcome {
        let removed: Vec<String> = self.blocks.drain(..).map(|b| b.id).collect();
        self.selected = None;
        tracing::debug!(removed = removed.len(), "cleared collection");

        let mut outcome = Outcome::new().with_removed(removed);
        outcome.add_message(CmdMessage::success("Cleared all blocks."));
        self.finish(outcome)
    }

    // --- Selection and editing ---

    /// Selects `id`. Unknown ids leave the selection unchanged.
    pub fn select(&mut self, id: &str) -> bool {
        if self.get(id).is_some() {
            self.selected = Some(id.to_string());
            true
        } else {
            false
        }
    }

    /// Applies `patch` to the selected block.
    pub fn update(&mut self, patch: BlockPatch) -> Outcome {
        let defaults = self.defaults.clone();
        self.edit_selected("Updated", |block| {
            patch.apply(block, &defaults);
            true
        })
    }

    /// Appends an empty value row to the selected block.
    pub fn add_value(&mut self) -> Outcome {
        self.edit_selected("Added value row to", |block| {
            block.values.push(ValuePair::default());
            block.touch();
            true
        })
    }

    /// Edits one value row of the selected block. Out-of-range rows are ignored.
    pub fn set_value(&mut self, index: usize, key: Option<String>, value: Option<String>) -> Outcome {
        self.edit_selected("Updated value row of", |block| {
            let Some(row) = block.values.get_mut(index) else {
                return false;
            };
            if let Some(key) = key {
                row.key = key;
            }
            if let Some(value) = value {
                row.value = value;
            }
            block.touch();
            true
        })
    }

    /// Deletes one value row of the selected block. Out-of-range rows are ignored.
    pub fn remove_value(&mut self, index: usize) -> Outcome {
        self.edit_selected("Removed value row from", |block| {
            if index >= block.values.len() {
                return false;
            }
            block.values.remove(index);
            block.touch();
            true
        })
    }

    // --- Import / export ---

    /// Replaces the whole collection with the blocks of `text`.
    ///
    /// On a [`BlockError::Format`] error the store is left exactly as it was.
    pub fn import(&mut self, text: &str) -> Result<Outcome> {
        let drafts = parse_document(text, &self.defaults)?;
        let Normalized { blocks, repairs } = normalize(drafts, self.ids.as_mut());

        self.blocks = blocks;
        self.selected = self.blocks.first().map(|b| b.id.clone());
        tracing::debug!(
            blocks = self.blocks.len(),
            repairs = repairs.len(),
            "imported collection"
        );

        let mut outcome = Outcome::new()
            .with_affected(self.blocks.clone())
            .with_repairs(repairs);
        outcome.add_message(CmdMessage::success(format!(
            "Imported {} block{}.",
            self.blocks.len(),
            if self.blocks.len() == 1 { "" } else { "s" }
        )));
        if !outcome.repairs.is_empty() {
            outcome.add_message(CmdMessage::info(format!(
                "Repaired {} problem{} in the document.",
                outcome.repairs.len(),
                if outcome.repairs.len() == 1 { "" } else { "s" }
            )));
        }
        Ok(self.finish(outcome))
    }

    pub fn export(&self) -> Payload<'_> {
        Payload::exported(self.blocks.as_slice())
    }

    // --- Queries ---

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn get(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected(&self) -> Option<&Block> {
        self.selected.as_deref().and_then(|id| self.get(id))
    }

    /// Direct children of `id`, in collection order.
    pub fn children(&self, id: &str) -> Vec<&Block> {
        self.blocks
            .iter()
            .filter(|b| b.parent_id.as_deref() == Some(id))
            .collect()
    }

    pub fn roots(&self) -> Vec<&Block> {
        self.blocks.iter().filter(|b| b.is_root()).collect()
    }

    /// Every block below `id`, excluding `id` itself.
    pub fn descendants(&self, id: &str) -> Vec<&Block> {
        let mut found: Vec<&Block> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = vec![id];

        while let Some(current) = stack.pop() {
            for child in self.children(current) {
                if child.id != id && seen.insert(child.id.as_str()) {
                    found.push(child);
                    stack.push(child.id.as_str());
                }
            }
        }
        found
    }

    /// `(parent, child)` pairs for every parent reference.
    pub fn links(&self) -> Vec<(&Block, &Block)> {
        self.blocks
            .iter()
            .filter_map(|child| {
                let parent = self.get(child.parent_id.as_deref()?)?;
                Some((parent, child))
            })
            .collect()
    }

    pub fn occupied(&self) -> OccupiedCells {
        OccupiedCells::from_blocks(&self.blocks)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// True when there are changes that have not reached the slot.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Finds a block by exact id or unique id prefix.
    pub fn resolve(&self, needle: &str) -> Result<&Block> {
        if let Some(block) = self.get(needle) {
            return Ok(block);
        }
        let mut matches = self.blocks.iter().filter(|b| b.id.starts_with(needle));
        match (matches.next(), matches.next()) {
            (Some(block), None) if !needle.is_empty() => Ok(block),
            (Some(_), Some(_)) if !needle.is_empty() => Err(BlockError::Api(format!(
                "Id prefix {} matches more than one block",
                needle
            ))),
            _ => Err(BlockError::BlockNotFound(needle.to_string())),
        }
    }

    // --- Internals ---

    fn fresh_id(&mut self) -> String {
        loop {
            let id = self.ids.next_id();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    fn edit_selected<F>(&mut self, verb: &str, edit: F) -> Outcome
    where
        F: FnOnce(&mut Block) -> bool,
    {
        let Some(selected) = self.selected.clone() else {
            let mut outcome = Outcome::new();
            outcome.add_message(CmdMessage::info("No block selected."));
            return outcome;
        };
        let Some(block) = self.blocks.iter_mut().find(|b| b.id == selected) else {
            return Outcome::new();
        };

        if !edit(block) {
            return Outcome::new();
        }
        let snapshot = block.clone();
        tracing::debug!(id = %snapshot.id, "{} block", verb);

        let mut outcome = Outcome::new().with_affected(vec![snapshot]);
        outcome.add_message(CmdMessage::success(format!("{} {}.", verb, selected)));
        self.finish(outcome)
    }

    fn finish(&mut self, mut outcome: Outcome) -> Outcome {
        outcome.saved = self.persist();
        if let SaveStatus::Failed(reason) = &outcome.saved {
            outcome.add_message(CmdMessage::warning(format!(
                "Changes kept in memory but not saved: {}",
                reason
            )));
        }
        outcome
    }

    fn persist(&mut self) -> SaveStatus {
        self.dirty = true;
        match self.persistence.save(&self.blocks) {
            Ok(at) => {
                self.dirty = false;
                SaveStatus::Saved(at)
            }
            Err(e) => {
                tracing::warn!(location = %self.location(), error = %e, "save failed");
                SaveStatus::Failed(e.to_string())
            }
        }
    }
}
