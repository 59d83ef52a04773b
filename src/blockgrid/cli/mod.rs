//! # CLI Behavior
//!
//! This is **one possible UI client** for blockgrid. It is the only place that
//! knows about terminal I/O, exit codes and output formatting.
//!
//! ## Conventions
//!
//! - Running `blockgrid` with no command lists the tree.
//! - Every command that names a block accepts a unique id prefix, so
//!   `blockgrid show blk_17` works when only one id starts that way.
//! - Commands that edit a block select it first, like clicking it in the editor.
//!   The selection is not persisted; each invocation starts on the first block.
//! - Value rows are numbered from 1 on the command line.
//!
//! ## Module Structure
//!
//! - `commands`: context setup, dispatch and per-command handlers
//! - `render`: pure string renderers (tree, grid map, detail, config)
//! - `setup`: argument parsing via clap

mod commands;
mod render;
pub mod setup;

pub use commands::run;
