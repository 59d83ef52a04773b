//! Block identifiers.
//!
//! Ids are opaque strings. The store only needs them to be unique inside one
//! collection, so the production generator mixes the wall clock with a few random
//! characters rather than using full UUID strings: `blk_1718000000000_k3x9qa`.

use chrono::Utc;
use uuid::Uuid;

const ID_PREFIX: &str = "blk_";
const SUFFIX_LEN: u32 = 6;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Source of fresh block ids.
pub trait IdGenerator {
    fn next_id(&mut self) -> String;
}

/// Timestamp plus random suffix. Unique with overwhelming probability within a
/// session; not a security primitive.
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionIds;

impl SessionIds {
    pub fn new() -> Self {
        Self
    }
}

impl IdGenerator for SessionIds {
    fn next_id(&mut self) -> String {
        let millis = Utc::now().timestamp_millis();
        let suffix = base36_suffix(Uuid::new_v4().as_u128());
        format!("{}{}_{}", ID_PREFIX, millis, suffix)
    }
}

/// Deterministic ids (`blk_1`, `blk_2`, ...) for tests and reproducible tooling.
#[derive(Debug, Default, Clone)]
pub struct SequentialIds {
    next: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> String {
        self.next += 1;
        format!("{}{}", ID_PREFIX, self.next)
    }
}

fn base36_suffix(mut bits: u128) -> String {
    let mut out = Vec::with_capacity(SUFFIX_LEN as usize);
    for _ in 0..SUFFIX_LEN {
        out.push(BASE36[(bits % 36) as usize]);
        bits /= 36;
    }
    // Only ASCII digits and lowercase letters are ever pushed.
    String::from_utf8_lossy(&out).into_owned()
}
