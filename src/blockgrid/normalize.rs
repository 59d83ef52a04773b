//! # Tree Integrity Repair
//!
//! Collections that come from disk or from an imported file may be hand edited,
//! produced by other tools, or simply stale. Instead of rejecting them, the store
//! runs them through [`normalize`], which restores the structural invariants and
//! reports what it had to change:
//!
//! 1. **Identity**: empty or repeated ids get fresh ones. References to a repeated
//!    id keep pointing at its first holder.
//! 2. **Parentage**: a parent reference is cleared (the block becomes a root) when
//!    it names no block, names the block itself, or its ancestor chain loops. The
//!    pass edits in place and in collection order, so a loop is broken at its
//!    first member and the rest of the loop keeps its links.
//! 3. **Placement**: blocks are placed in collection order. A block without a
//!    usable position takes the next slot of a six-wide row-major pattern; a block
//!    whose cell is already taken moves to the nearest free cell (see
//!    [`crate::layout::find_free_cell`]).
//!
//! Every change is returned as a [`Repair`]. Running `normalize` on its own output
//! changes nothing and reports nothing.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::ids::IdGenerator;
use crate::layout::{find_free_cell_near, Cell, OccupiedCells};
use crate::model::Block;

/// A coerced block whose position may still be unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDraft {
    pub block: Block,
    pub placement: Option<Cell>,
}

impl BlockDraft {
    pub fn placed(block: Block) -> Self {
        let placement = Some(block.cell());
        Self { block, placement }
    }

    pub fn unplaced(block: Block) -> Self {
        Self {
            block,
            placement: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentFault {
    Missing,
    SelfReference,
    Cycle,
}

impl fmt::Display for ParentFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentFault::Missing => write!(f, "missing parent"),
            ParentFault::SelfReference => write!(f, "parent is itself"),
            ParentFault::Cycle => write!(f, "parent chain loops"),
        }
    }
}

/// One silent correction made by [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repair {
    IdReassigned {
        previous: String,
        id: String,
    },
    ParentCleared {
        id: String,
        parent_id: String,
        reason: ParentFault,
    },
    CellAssigned {
        id: String,
        cell: Cell,
    },
    CellMoved {
        id: String,
        from: Cell,
        to: Cell,
    },
}

impl fmt::Display for Repair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repair::IdReassigned { previous, id } if previous.is_empty() => {
                write!(f, "gave block without id the id {}", id)
            }
            Repair::IdReassigned { previous, id } => {
                write!(f, "renamed duplicate id {} to {}", previous, id)
            }
            Repair::ParentCleared {
                id,
                parent_id,
                reason,
            } => write!(f, "made {} a root ({}: {})", id, reason, parent_id),
            Repair::CellAssigned { id, cell } => write!(f, "placed {} at {}", id, cell),
            Repair::CellMoved { id, from, to } => {
                write!(f, "moved {} from taken cell {} to {}", id, from, to)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    pub blocks: Vec<Block>,
    pub repairs: Vec<Repair>,
}

impl Normalized {
    pub fn is_clean(&self) -> bool {
        self.repairs.is_empty()
    }
}

pub fn normalize(drafts: Vec<BlockDraft>, ids: &mut dyn IdGenerator) -> Normalized {
    let mut repairs = Vec::new();
    let (mut blocks, placements): (Vec<Block>, Vec<Option<Cell>>) = drafts
        .into_iter()
        .map(|d| (d.block, d.placement))
        .unzip();

    repair_ids(&mut blocks, ids, &mut repairs);
    repair_parents(&mut blocks, &mut repairs);
    repair_cells(&mut blocks, &placements, &mut repairs);

    if !repairs.is_empty() {
        tracing::info!(
            blocks = blocks.len(),
            repairs = repairs.len(),
            "repaired block collection"
        );
        for repair in &repairs {
            tracing::debug!(%repair, "repair");
        }
    }

    Normalized { blocks, repairs }
}

/// Normalizes blocks that already carry a position.
pub fn normalize_blocks(blocks: Vec<Block>, ids: &mut dyn IdGenerator) -> Normalized {
    normalize(blocks.into_iter().map(BlockDraft::placed).collect(), ids)
}

fn repair_ids(blocks: &mut [Block], ids: &mut dyn IdGenerator, repairs: &mut Vec<Repair>) {
    let mut taken: HashSet<String> = blocks.iter().map(|b| b.id.clone()).collect();
    let mut seen: HashSet<String> = HashSet::with_capacity(blocks.len());

    for block in blocks.iter_mut() {
        if !block.id.is_empty() && seen.insert(block.id.clone()) {
            continue;
        }

        let mut fresh = ids.next_id();
        while taken.contains(&fresh) {
            fresh = ids.next_id();
        }
        taken.insert(fresh.clone());
        seen.insert(fresh.clone());

        let previous = std::mem::replace(&mut block.id, fresh.clone());
        repairs.push(Repair::IdReassigned {
            previous,
            id: fresh,
        });
    }
}

fn repair_parents(blocks: &mut [Block], repairs: &mut Vec<Repair>) {
    let index: HashMap<String, usize> = blocks
        .iter()
        .enumerate()
        .map(|(i, b)| (b.id.clone(), i))
        .collect();

    for i in 0..blocks.len() {
        let Some(parent_id) = blocks[i].parent_id.clone() else {
            continue;
        };

        let fault = if parent_id == blocks[i].id {
            Some(ParentFault::SelfReference)
        } else if !index.contains_key(&parent_id) {
            Some(ParentFault::Missing)
        } else if chain_loops(blocks, &index, &blocks[i].id, &parent_id) {
            Some(ParentFault::Cycle)
        } else {
            None
        };

        if let Some(reason) = fault {
            blocks[i].parent_id = None;
            repairs.push(Repair::ParentCleared {
                id: blocks[i].id.clone(),
                parent_id,
                reason,
            });
        }
    }
}

/// Walks ancestors from `parent_id`; true if the walk reaches `id` or repeats.
fn chain_loops(
    blocks: &[Block],
    index: &HashMap<String, usize>,
    id: &str,
    parent_id: &str,
) -> bool {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut current = Some(parent_id);

    while let Some(cur) = current {
        if cur == id || !visited.insert(cur) {
            return true;
        }
        current = match index.get(cur) {
            Some(&j) => blocks[j].parent_id.as_deref(),
            None => None,
        };
    }

    false
}

fn repair_cells(blocks: &mut [Block], placements: &[Option<Cell>], repairs: &mut Vec<Repair>) {
    let mut occupied = OccupiedCells::new();
    let mut fallback_seed: u32 = 0;

    for (block, placement) in blocks.iter_mut().zip(placements) {
        let wanted = match placement {
            Some(cell) => *cell,
            None => {
                let cell = Cell::fallback(fallback_seed);
                fallback_seed = fallback_seed.saturating_add(1);
                cell
            }
        };

        let cell = if occupied.contains(wanted) {
            find_free_cell_near(wanted, &occupied)
        } else {
            wanted
        };

        if placement.is_none() {
            repairs.push(Repair::CellAssigned {
                id: block.id.clone(),
                cell,
            });
        } else if cell != wanted {
            repairs.push(Repair::CellMoved {
                id: block.id.clone(),
                from: wanted,
                to: cell,
            });
        }

        block.set_cell(cell);
        occupied.insert(cell);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::model::BlockDefaults;

    fn block(id: &str, parent: Option<&str>, gx: u32, gy: u32) -> Block {
        Block::new(
            id.to_string(),
            parent.map(str::to_string),
            Cell::new(gx, gy),
            &BlockDefaults::default(),
        )
    }

    fn run(blocks: Vec<Block>) -> Normalized {
        normalize_blocks(blocks, &mut SequentialIds::starting_at(100))
    }

    fn parent_of<'a>(n: &'a Normalized, id: &str) -> Option<&'a str> {
        n.blocks
            .iter()
            .find(|b| b.id == id)
            .and_then(|b| b.parent_id.as_deref())
    }

    #[test]
    fn valid_collection_is_untouched() {
        let blocks = vec![
            block("a", None, 0, 0),
            block("b", Some("a"), 1, 0),
            block("c", Some("b"), 2, 0),
        ];
        let n = run(blocks.clone());
        assert!(n.is_clean());
        assert_eq!(n.blocks, blocks);
    }

    #[test]
    fn dangling_parent_becomes_root() {
        let n = run(vec![block("a", Some("ghost"), 0, 0)]);
        assert_eq!(parent_of(&n, "a"), None);
        assert_eq!(
            n.repairs,
            vec![Repair::ParentCleared {
                id: "a".into(),
                parent_id: "ghost".into(),
                reason: ParentFault::Missing,
            }]
        );
    }

    #[test]
    fn self_parent_becomes_root() {
        let n = run(vec![block("a", Some("a"), 0, 0)]);
        assert_eq!(parent_of(&n, "a"), None);
        assert!(matches!(
            n.repairs[0],
            Repair::ParentCleared {
                reason: ParentFault::SelfReference,
                ..
            }
        ));
    }

    #[test]
    fn two_cycle_is_broken_at_first_member() {
        let n = run(vec![block("a", Some("b"), 0, 0), block("b", Some("a"), 1, 0)]);
        assert_eq!(parent_of(&n, "a"), None);
        assert_eq!(parent_of(&n, "b"), Some("a"));
        assert_eq!(n.repairs.len(), 1);
    }

    #[test]
    fn block_hanging_off_a_loop_is_demoted_too() {
        // c -> a -> b -> a: walking from c's parent repeats a node.
        let n = run(vec![
            block("c", Some("a"), 0, 0),
            block("a", Some("b"), 1, 0),
            block("b", Some("a"), 2, 0),
        ]);
        assert_eq!(parent_of(&n, "c"), None);
        assert_eq!(parent_of(&n, "a"), None);
        assert_eq!(parent_of(&n, "b"), Some("a"));
    }

    #[test]
    fn duplicate_ids_are_renamed() {
        let n = run(vec![
            block("a", None, 0, 0),
            block("a", None, 1, 0),
            block("", None, 2, 0),
        ]);
        let ids: Vec<&str> = n.blocks.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "blk_101", "blk_102"]);
        assert_eq!(
            n.repairs[0],
            Repair::IdReassigned {
                previous: "a".into(),
                id: "blk_101".into()
            }
        );
    }

    #[test]
    fn fresh_ids_skip_ids_already_in_use() {
        let n = normalize_blocks(
            vec![
                block("blk_1", None, 0, 0),
                block("blk_1", None, 1, 0),
                block("blk_2", None, 2, 0),
            ],
            &mut SequentialIds::new(),
        );
        let ids: Vec<&str> = n.blocks.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["blk_1", "blk_3", "blk_2"]);
    }

    #[test]
    fn colliding_cells_move_to_nearest_free_cell() {
        let n = run(vec![
            block("a", None, 0, 0),
            block("b", None, 0, 0),
            block("c", None, 0, 0),
        ]);
        let cells: Vec<Cell> = n.blocks.iter().map(Block::cell).collect();
        assert_eq!(
            cells,
            vec![Cell::new(0, 0), Cell::new(1, 0), Cell::new(0, 1)]
        );
        assert_eq!(
            n.repairs[0],
            Repair::CellMoved {
                id: "b".into(),
                from: Cell::new(0, 0),
                to: Cell::new(1, 0)
            }
        );
    }

    #[test]
    fn unplaced_blocks_use_the_row_major_fallback() {
        let defaults = BlockDefaults::default();
        let mut drafts = Vec::new();
        for i in 0..8 {
            let b = Block::new(format!("b{}", i), None, Cell::ORIGIN, &defaults);
            drafts.push(BlockDraft::unplaced(b));
        }
        let n = normalize(drafts, &mut SequentialIds::new());
        assert_eq!(n.blocks[5].cell(), Cell::new(5, 0));
        assert_eq!(n.blocks[6].cell(), Cell::new(0, 1));
        assert_eq!(n.blocks[7].cell(), Cell::new(1, 1));
        assert_eq!(n.repairs.len(), 8);
    }

    #[test]
    fn fallback_slot_already_taken_is_resolved() {
        let defaults = BlockDefaults::default();
        let placed = block("p", None, 0, 0);
        let loose = Block::new("q".into(), None, Cell::ORIGIN, &defaults);
        let n = normalize(
            vec![BlockDraft::placed(placed), BlockDraft::unplaced(loose)],
            &mut SequentialIds::new(),
        );
        assert_eq!(n.blocks[1].cell(), Cell::new(1, 0));
        assert_eq!(
            n.repairs,
            vec![Repair::CellAssigned {
                id: "q".into(),
                cell: Cell::new(1, 0)
            }]
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let first = run(vec![
            block("a", Some("c"), 0, 0),
            block("b", Some("a"), 0, 0),
            block("c", Some("b"), 0, 0),
            block("b", Some("zzz"), 3, 3),
        ]);
        assert!(!first.is_clean());

        let second = run(first.blocks.clone());
        assert!(second.is_clean());
        assert_eq!(second.blocks, first.blocks);
    }

    #[test]
    fn repairs_read_well() {
        let r = Repair::CellMoved {
            id: "a".into(),
            from: Cell::new(0, 0),
            to: Cell::new(1, 0),
        };
        assert_eq!(r.to_string(), "moved a from taken cell (0, 0) to (1, 0)");
    }
}
