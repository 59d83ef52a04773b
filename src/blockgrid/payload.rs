//! # Payload Document
//!
//! Saving, loading, exporting and importing all share one JSON document:
//!
//! ```text
//! { "version": 1, "updatedAt" | "exportedAt": "<RFC 3339>", "blocks": [ ... ] }
//! ```
//!
//! Writing is plain serde. Reading is deliberately forgiving: once the outer
//! shape is right (an object with a `blocks` array), each entry is coerced field
//! by field into a [`BlockDraft`] instead of being rejected. Wrong types fall back
//! to defaults, scalars are stringified, unusable coordinates leave the placement
//! unknown, and unknown fields are dropped. Structural problems (duplicate ids,
//! bad parents, shared cells) are left for [`crate::normalize`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

use crate::error::{BlockError, Result};
use crate::layout::Cell;
use crate::model::{Block, BlockDefaults, ValuePair};
use crate::normalize::BlockDraft;

pub const PAYLOAD_VERSION: u32 = 1;

/// The document itself. Blocks are borrowed when writing out a live collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload<'a> {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
    pub blocks: Cow<'a, [Block]>,
}

impl<'a> Payload<'a> {
    /// The shape written to the durable slot, stamped with the save time.
    pub fn saved(blocks: impl Into<Cow<'a, [Block]>>, updated_at: DateTime<Utc>) -> Self {
        Self {
            version: PAYLOAD_VERSION,
            updated_at: Some(updated_at),
            exported_at: None,
            blocks: blocks.into(),
        }
    }

    /// The shape handed out by `export`.
    pub fn exported(blocks: impl Into<Cow<'a, [Block]>>) -> Self {
        Self {
            version: PAYLOAD_VERSION,
            updated_at: None,
            exported_at: Some(Utc::now()),
            blocks: blocks.into(),
        }
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let text = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(text)
    }
}

/// Parses `text` as a payload document and coerces every entry of `blocks`.
///
/// Fails with [`BlockError::Format`] when the text is not JSON, is not an object,
/// or has no `blocks` array. Nothing below that level is an error.
pub fn parse_document(text: &str, defaults: &BlockDefaults) -> Result<Vec<BlockDraft>> {
    let root: Value = serde_json::from_str(text)
        .map_err(|e| BlockError::Format(format!("not valid JSON ({})", e)))?;

    let Value::Object(doc) = root else {
        return Err(BlockError::Format("expected a JSON object".to_string()));
    };

    match doc.get("version") {
        Some(v) if v.as_u64() == Some(u64::from(PAYLOAD_VERSION)) => {}
        Some(v) => tracing::warn!(version = %v, "unexpected payload version, reading anyway"),
        None => tracing::debug!("payload has no version"),
    }

    let Some(Value::Array(entries)) = doc.get("blocks") else {
        return Err(BlockError::Format(
            "`blocks` must be an array".to_string(),
        ));
    };

    Ok(entries
        .iter()
        .map(|entry| coerce_block(entry, defaults))
        .collect())
}

/// Coerces one raw entry. Entries that are not objects become default blocks
/// with no id.
pub fn coerce_block(raw: &Value, defaults: &BlockDefaults) -> BlockDraft {
    let empty = Map::new();
    let fields = raw.as_object().unwrap_or(&empty);
    let text = |name: &str| fields.get(name).and_then(scalar_string);

    let id = text("id").unwrap_or_default();
    let parent_id = text("parentId").filter(|p| !p.is_empty());

    let mut block = Block::new(id, parent_id, Cell::ORIGIN, defaults);
    block.title = text("title")
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| defaults.title.clone());
    block.kind = text("type").unwrap_or_default();
    block.status = text("status").unwrap_or_else(|| defaults.status.clone());
    block.tags = text("tags").unwrap_or_default();
    block.notes = text("notes").unwrap_or_default();
    block.values = fields.get("values").map(coerce_values).unwrap_or_default();

    let now = Utc::now();
    block.created_at = fields.get("createdAt").and_then(timestamp).unwrap_or(now);
    block.updated_at = fields.get("updatedAt").and_then(timestamp).unwrap_or(now);

    let placement = match (
        fields.get("gx").and_then(coordinate),
        fields.get("gy").and_then(coordinate),
    ) {
        (Some(x), Some(y)) => Some(Cell::clamped(x, y)),
        _ => None,
    };
    if let Some(cell) = placement {
        block.set_cell(cell);
    }

    BlockDraft { block, placement }
}

fn coerce_values(raw: &Value) -> Vec<ValuePair> {
    let Value::Array(rows) = raw else {
        return Vec::new();
    };
    rows.iter()
        .map(|row| {
            let field = |name: &str| row.get(name).and_then(scalar_string).unwrap_or_default();
            ValuePair::new(field("key"), field("value"))
        })
        .collect()
}

/// Strings pass through, numbers and booleans are stringified, arrays of
/// scalars are joined with commas. Null and objects have no text.
fn scalar_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::Array(_) => None,
                    other => scalar_string(other),
                })
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Null | Value::Object(_) => None,
    }
}

/// A grid coordinate from a number or numeric string, rounded to the nearest
/// integer. Out-of-range values saturate; clamping happens in [`Cell::clamped`].
fn coordinate(v: &Value) -> Option<i64> {
    let f = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !f.is_finite() {
        return None;
    }
    Some(f.round() as i64)
}

/// RFC 3339, or a zone-less date-time or bare date read as UTC (a bare date is
/// midnight).
fn timestamp(v: &Value) -> Option<DateTime<Utc>> {
    let s = v.as_str()?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: Value) -> Result<Vec<BlockDraft>> {
        parse_document(&v.to_string(), &BlockDefaults::default())
    }

    fn one(entry: Value) -> BlockDraft {
        coerce_block(&entry, &BlockDefaults::default())
    }

    #[test]
    fn rejects_documents_without_block_array() {
        for bad in ["", "not json", "[]", "42", "{}", r#"{"blocks": "nope"}"#] {
            let err = parse_document(bad, &BlockDefaults::default()).unwrap_err();
            assert!(matches!(err, BlockError::Format(_)), "{:?}", bad);
        }
    }

    #[test]
    fn accepts_empty_block_list() {
        assert!(parse(json!({"version": 1, "blocks": []})).unwrap().is_empty());
    }

    #[test]
    fn accepts_other_versions() {
        let drafts = parse(json!({"version": 7, "blocks": [{"id": "a"}]})).unwrap();
        assert_eq!(drafts.len(), 1);
    }

    #[test]
    fn full_entry_is_read_verbatim() {
        let d = one(json!({
            "id": "blk_9",
            "parentId": "blk_1",
            "title": "Hello",
            "type": "idea",
            "status": "done",
            "tags": "a,b",
            "notes": "n",
            "values": [{"key": "k", "value": "v"}],
            "gx": 3,
            "gy": 4,
            "createdAt": "2025-01-02T03:04:05Z",
            "updatedAt": "2025-01-03T03:04:05Z",
            "extra": true
        }));
        let b = &d.block;
        assert_eq!(b.id, "blk_9");
        assert_eq!(b.parent_id.as_deref(), Some("blk_1"));
        assert_eq!(b.title, "Hello");
        assert_eq!(b.kind, "idea");
        assert_eq!(b.status, "done");
        assert_eq!(b.values, vec![ValuePair::new("k", "v")]);
        assert_eq!(d.placement, Some(Cell::new(3, 4)));
        assert_eq!(b.cell(), Cell::new(3, 4));
        assert_eq!(b.created_at.to_rfc3339(), "2025-01-02T03:04:05+00:00");
    }

    #[test]
    fn missing_fields_take_defaults() {
        let d = one(json!({}));
        assert_eq!(d.block.id, "");
        assert_eq!(d.block.parent_id, None);
        assert_eq!(d.block.title, "New Block");
        assert_eq!(d.block.status, "draft");
        assert_eq!(d.block.kind, "");
        assert!(d.block.values.is_empty());
        assert_eq!(d.placement, None);
    }

    #[test]
    fn non_object_entry_becomes_default_block() {
        let d = one(json!("just a string"));
        assert_eq!(d.block.title, "New Block");
        assert_eq!(d.placement, None);
    }

    #[test]
    fn empty_title_defaults_but_empty_status_is_kept() {
        let d = one(json!({"title": "", "status": ""}));
        assert_eq!(d.block.title, "New Block");
        assert_eq!(d.block.status, "");
    }

    #[test]
    fn scalars_are_stringified() {
        let d = one(json!({
            "id": 17,
            "parentId": "",
            "title": 3.5,
            "status": true,
            "tags": ["a", 2, null],
            "notes": {"nested": 1}
        }));
        assert_eq!(d.block.id, "17");
        assert_eq!(d.block.parent_id, None);
        assert_eq!(d.block.title, "3.5");
        assert_eq!(d.block.status, "true");
        assert_eq!(d.block.tags, "a,2");
        assert_eq!(d.block.notes, "");
    }

    #[test]
    fn values_are_coerced() {
        let d = one(json!({"values": [{"key": 1}, "junk", {"value": false}]}));
        assert_eq!(
            d.block.values,
            vec![
                ValuePair::new("1", ""),
                ValuePair::new("", ""),
                ValuePair::new("", "false"),
            ]
        );
        assert!(one(json!({"values": "x"})).block.values.is_empty());
    }

    #[test]
    fn coordinates_are_rounded_and_clamped() {
        assert_eq!(one(json!({"gx": 2.6, "gy": "4"})).placement, Some(Cell::new(3, 4)));
        assert_eq!(one(json!({"gx": -5, "gy": 1})).placement, Some(Cell::new(0, 1)));
        assert_eq!(
            one(json!({"gx": 1e20, "gy": 0})).placement,
            Some(Cell::new(u32::MAX, 0))
        );
    }

    #[test]
    fn unusable_coordinates_leave_placement_unknown() {
        assert_eq!(one(json!({"gx": null, "gy": 1})).placement, None);
        assert_eq!(one(json!({"gx": "left", "gy": 1})).placement, None);
        assert_eq!(one(json!({"gx": 1})).placement, None);
    }

    #[test]
    fn bad_timestamps_become_now() {
        let before = Utc::now();
        let d = one(json!({"createdAt": "yesterday", "updatedAt": 5}));
        assert!(d.block.created_at >= before);
        assert!(d.block.updated_at >= before);
    }

    #[test]
    fn lenient_timestamps_are_kept() {
        let d = one(json!({
            "createdAt": "2024-05-01",
            "updatedAt": "2024-05-02T09:30:00"
        }));
        assert_eq!(d.block.created_at.to_rfc3339(), "2024-05-01T00:00:00+00:00");
        assert_eq!(d.block.updated_at.to_rfc3339(), "2024-05-02T09:30:00+00:00");

        let d = one(json!({"createdAt": "2024-05-01T12:00:00+02:00"}));
        assert_eq!(d.block.created_at.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn saved_and_exported_shapes() {
        let at = Utc::now();
        let saved = serde_json::to_value(Payload::saved(Vec::new(), at)).unwrap();
        assert_eq!(saved["version"], 1);
        assert_eq!(saved["updatedAt"], serde_json::to_value(at).unwrap());
        assert!(saved.get("exportedAt").is_none());

        let exported = serde_json::to_value(Payload::exported(Vec::new())).unwrap();
        assert!(exported.get("exportedAt").is_some());
        assert!(exported.get("updatedAt").is_none());
    }

    #[test]
    fn written_payload_parses_back() {
        let block = Block::new("blk_1".into(), None, Cell::new(2, 2), &BlockDefaults::default());
        let text = Payload::exported(std::slice::from_ref(&block))
            .to_json(true)
            .unwrap();
        let drafts = parse_document(&text, &BlockDefaults::default()).unwrap();
        assert_eq!(drafts, vec![BlockDraft::placed(block)]);
    }
}
