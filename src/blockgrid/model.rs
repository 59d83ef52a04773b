//! # Domain Model: Blocks
//!
//! A [`Block`] is the single entity of the editor: an identified note with an
//! optional parent, a grid cell and a handful of free-form display fields.
//!
//! ## Wire Shape
//!
//! Blocks serialize with the camelCase names used by the editor's payloads
//! (`parentId`, `createdAt`, `updatedAt`) and `kind` travels as `type`:
//!
//! ```text
//! { "id": "blk_…", "parentId": null, "title": "New Block", "type": "",
//!   "status": "draft", "tags": "", "notes": "", "values": [],
//!   "gx": 0, "gy": 0, "createdAt": "…", "updatedAt": "…" }
//! ```
//!
//! ## Structure
//!
//! Collections of blocks form a forest under `parent_id`. The model types do not
//! enforce that on their own; [`crate::normalize`] restores it for untrusted
//! input and [`crate::store::BlockStore`] keeps it for every edit.
//!
//! ## Values
//!
//! `values` is an ordered list of `{key, value}` pairs. Order matters and duplicate
//! keys are allowed. The list may be empty: adding a blank row for editing is
//! left to whatever presents the block.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::layout::Cell;

pub const DEFAULT_TITLE: &str = "New Block";
pub const DEFAULT_STATUS: &str = "draft";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuePair {
    pub key: String,
    pub value: String,
}

impl ValuePair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,
    pub parent_id: Option<String>,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub tags: String,
    pub notes: String,
    pub values: Vec<ValuePair>,
    pub gx: u32,
    pub gy: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Block {
    pub fn new(id: String, parent_id: Option<String>, cell: Cell, defaults: &BlockDefaults) -> Self {
        let now = Utc::now();
        Self {
            id,
            parent_id,
            title: defaults.title.clone(),
            kind: String::new(),
            status: defaults.status.clone(),
            tags: String::new(),
            notes: String::new(),
            values: Vec::new(),
            gx: cell.gx,
            gy: cell.gy,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn cell(&self) -> Cell {
        Cell::new(self.gx, self.gy)
    }

    pub fn set_cell(&mut self, cell: Cell) {
        self.gx = cell.gx;
        self.gy = cell.gy;
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Splits the comma-separated `tags` field into trimmed, non-empty tags.
    pub fn tag_list(&self) -> Vec<&str> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Field defaults for newly created or coerced blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDefaults {
    pub title: String,
    pub status: String,
}

impl Default for BlockDefaults {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            status: DEFAULT_STATUS.to_string(),
        }
    }
}

/// A partial update of a block's display fields.
///
/// `None` leaves a field untouched. Identity, parentage and placement are not
/// patchable: they only change through the store's structural operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockPatch {
    pub title: Option<String>,
    pub kind: Option<String>,
    pub status: Option<String>,
    pub tags: Option<String>,
    pub notes: Option<String>,
    pub values: Option<Vec<ValuePair>>,
}

impl BlockPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn values(mut self, values: Vec<ValuePair>) -> Self {
        self.values = Some(values);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.kind.is_none()
            && self.status.is_none()
            && self.tags.is_none()
            && self.notes.is_none()
            && self.values.is_none()
    }

    /// Writes the patch into `block`. An empty title falls back to the default
    /// title, the same way the editor form treats a cleared title box.
    pub fn apply(self, block: &mut Block, defaults: &BlockDefaults) {
        if let Some(title) = self.title {
            block.title = if title.is_empty() {
                defaults.title.clone()
            } else {
                title
            };
        }
        if let Some(kind) = self.kind {
            block.kind = kind;
        }
        if let Some(status) = self.status {
            block.status = status;
        }
        if let Some(tags) = self.tags {
            block.tags = tags;
        }
        if let Some(notes) = self.notes {
            block.notes = notes;
        }
        if let Some(values) = self.values {
            block.values = values;
        }
        block.touch();
    }
}
