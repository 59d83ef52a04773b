//! # Blockgrid Architecture
//!
//! Blockgrid is the model and layout engine behind a visual knowledge-base editor.
//! Notes are **blocks**: each has an id, an optional parent and a cell on an
//! unbounded integer grid. The library is UI-agnostic; the bundled `blockgrid`
//! binary is one client of it.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, renders output, owns exit codes        │
//! │  - The ONLY place that knows about stdout/stderr            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Store (store.rs)                                           │
//! │  - Owns the collection, selection and dirty flag            │
//! │  - Every mutation keeps the tree and grid invariants        │
//! │  - Returns structured `Outcome` values, never prints        │
//! └─────────────────────────────────────────────────────────────┘
//!               │                               │
//!               ▼                               ▼
//! ┌───────────────────────────┐   ┌─────────────────────────────┐
//! │  Engines                  │   │  Persistence                │
//! │  layout.rs  (ring search) │   │  payload.rs (document)      │
//! │  normalize.rs (repair)    │   │  persist.rs (slot adapter)  │
//! │  ids.rs                   │   │  slot/ (fs, memory)         │
//! └───────────────────────────┘   └─────────────────────────────┘
//! ```
//!
//! ## Invariants
//!
//! The store guarantees, after every operation:
//!
//! - **Forest**: parent references name existing blocks and never loop.
//! - **One block per cell**: no two blocks share `(gx, gy)`.
//! - **Unique ids**.
//!
//! Edits keep them by construction. Untrusted input (the saved slot, imported
//! files) is coerced by [`payload`] and repaired by [`normalize`], which reports
//! every change it makes instead of failing.
//!
//! ## Testing Strategy
//!
//! 1. **Engines and store**: unit tests next to the code, using
//!    [`slot::memory::MemSlot`] and [`ids::SequentialIds`] so nothing touches disk
//!    and ids are predictable.
//! 2. **Properties** (`tests/properties.rs`): proptest checks the invariants over
//!    random operation sequences and random documents.
//! 3. **CLI** (`tests/cli.rs`): the binary against a temporary data directory.
//!
//! ## Module Overview

pub mod config;
pub mod error;
pub mod ids;
pub mod init;
pub mod layout;
pub mod model;
pub mod normalize;
pub mod outcome;
pub mod payload;
pub mod persist;
pub mod slot;
pub mod store;
pub mod transfer;
