use blockgrid::ids::SequentialIds;
use blockgrid::layout::{find_free_cell, Cell, OccupiedCells};
use blockgrid::model::{Block, BlockDefaults, BlockPatch};
use blockgrid::normalize::{normalize, normalize_blocks};
use blockgrid::payload::coerce_block;
use blockgrid::persist::DEFAULT_SLOT_KEY;
use blockgrid::slot::memory::MemSlot;
use blockgrid::store::{BlockStore, CreateRequest};
use proptest::prelude::*;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};

fn check_invariants(blocks: &[Block]) -> Result<(), TestCaseError> {
    let ids: HashSet<&str> = blocks.iter().map(|b| b.id.as_str()).collect();
    prop_assert_eq!(ids.len(), blocks.len(), "ids must be unique");
    prop_assert!(!ids.contains(""), "ids must be non-empty");

    let cells: HashSet<Cell> = blocks.iter().map(Block::cell).collect();
    prop_assert_eq!(cells.len(), blocks.len(), "cells must be unique");

    let parents: HashMap<&str, Option<&str>> = blocks
        .iter()
        .map(|b| (b.id.as_str(), b.parent_id.as_deref()))
        .collect();
    for block in blocks {
        if let Some(p) = block.parent_id.as_deref() {
            prop_assert!(ids.contains(p), "parent {} of {} is missing", p, block.id);
            prop_assert_ne!(p, block.id.as_str());
        }
        // Every chain reaches a root within len steps.
        let mut current = block.parent_id.as_deref();
        let mut steps = 0;
        while let Some(id) = current {
            steps += 1;
            prop_assert!(steps <= blocks.len(), "cycle through {}", block.id);
            current = parents.get(id).copied().flatten();
        }
    }
    Ok(())
}

fn raw_entry() -> impl Strategy<Value = Value> {
    (
        prop::option::of(0u8..6),
        prop::option::of(0u8..7),
        prop::option::of(-2i64..5),
        prop::option::of(-2i64..5),
    )
        .prop_map(|(id, parent, gx, gy)| {
            let mut fields = Map::new();
            if let Some(id) = id {
                fields.insert("id".into(), json!(format!("b{}", id)));
            }
            if let Some(parent) = parent {
                fields.insert("parentId".into(), json!(format!("b{}", parent)));
            }
            if let Some(gx) = gx {
                fields.insert("gx".into(), json!(gx));
            }
            if let Some(gy) = gy {
                fields.insert("gy".into(), json!(gy));
            }
            Value::Object(fields)
        })
}

#[derive(Debug, Clone)]
enum Op {
    Create {
        parent: Option<usize>,
        cell: Option<(u32, u32)>,
    },
    Remove(usize),
    Retitle(usize, String),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (
            prop::option::of(0usize..32),
            prop::option::of((0u32..4, 0u32..4))
        )
            .prop_map(|(parent, cell)| Op::Create { parent, cell }),
        1 => (0usize..32).prop_map(Op::Remove),
        1 => (0usize..32, "[a-z]{0,6}").prop_map(|(i, t)| Op::Retitle(i, t)),
    ]
}

fn pick(store: &BlockStore<MemSlot>, index: usize) -> Option<String> {
    if store.is_empty() {
        return None;
    }
    Some(store.blocks()[index % store.len()].id.clone())
}

proptest! {
    #[test]
    fn ring_search_finds_nearest_free_cell(
        origin in (0u32..8, 0u32..8),
        taken in prop::collection::vec((0u32..8, 0u32..8), 0..60),
    ) {
        let occupied: OccupiedCells = taken.iter().map(|&(x, y)| Cell::new(x, y)).collect();
        let origin = Cell::new(origin.0, origin.1);
        let found = find_free_cell(i64::from(origin.gx), i64::from(origin.gy), &occupied);

        prop_assert!(!occupied.contains(found));
        let ring = i64::from(origin.ring_distance(found));
        let key = |c: Cell| (i64::from(c.gy) - i64::from(origin.gy), i64::from(c.gx) - i64::from(origin.gx));
        let found_key = key(found);

        for dy in -ring..=ring {
            for dx in -ring..=ring {
                let (x, y) = (i64::from(origin.gx) + dx, i64::from(origin.gy) + dy);
                if x < 0 || y < 0 {
                    continue;
                }
                let cell = Cell::new(x as u32, y as u32);
                let d = i64::from(origin.ring_distance(cell));
                if d < ring || (d == ring && ring > 0 && (dy, dx) < found_key) {
                    prop_assert!(occupied.contains(cell), "{} was free but {} chosen", cell, found);
                }
            }
        }
    }

    #[test]
    fn normalize_restores_invariants_and_is_idempotent(
        entries in prop::collection::vec(raw_entry(), 0..14),
    ) {
        let defaults = BlockDefaults::default();
        let drafts = entries.iter().map(|e| coerce_block(e, &defaults)).collect();
        let first = normalize(drafts, &mut SequentialIds::starting_at(1000));
        check_invariants(&first.blocks)?;
        prop_assert_eq!(first.blocks.len(), entries.len());

        let second = normalize_blocks(first.blocks.clone(), &mut SequentialIds::starting_at(5000));
        prop_assert!(second.repairs.is_empty());
        prop_assert_eq!(second.blocks, first.blocks);
    }

    #[test]
    fn store_operations_keep_invariants(ops in prop::collection::vec(op(), 1..40)) {
        let mut store = BlockStore::new(MemSlot::new(), DEFAULT_SLOT_KEY)
            .with_ids(SequentialIds::new());

        for op in ops {
            match op {
                Op::Create { parent, cell } => {
                    let parent_id = parent.and_then(|i| pick(&store, i));
                    let before = store.len();
                    store.create(CreateRequest {
                        parent_id,
                        cell: cell.map(|(x, y)| Cell::new(x, y)),
                    });
                    prop_assert_eq!(store.len(), before + 1);
                }
                Op::Remove(i) => {
                    let Some(id) = pick(&store, i) else { continue };
                    let mut doomed: HashSet<String> =
                        store.descendants(&id).iter().map(|b| b.id.clone()).collect();
                    doomed.insert(id.clone());
                    let before = store.len();

                    let outcome = store.remove(&id);
                    let removed: HashSet<String> = outcome.removed.into_iter().collect();
                    prop_assert_eq!(&removed, &doomed);
                    prop_assert_eq!(store.len(), before - doomed.len());
                    prop_assert!(store.blocks().iter().all(|b| !doomed.contains(&b.id)));
                }
                Op::Retitle(i, title) => {
                    let Some(id) = pick(&store, i) else { continue };
                    store.select(&id);
                    store.update(BlockPatch::new().title(title));
                }
            }
            check_invariants(store.blocks())?;
            if let Some(selected) = store.selected_id() {
                prop_assert!(store.get(selected).is_some());
            }
        }

        let text = store.export().to_json(false).unwrap();
        let mut copy = BlockStore::new(MemSlot::new(), DEFAULT_SLOT_KEY)
            .with_ids(SequentialIds::starting_at(10_000));
        let outcome = copy.import(&text).unwrap();
        prop_assert!(outcome.repairs.is_empty());
        prop_assert_eq!(copy.blocks(), store.blocks());
    }
}
