//! # Blockgrid CLI
//!
//! The binary is intentionally thin: the CLI lives in `cli/`, while this file
//! only invokes `cli::run()` and handles process termination.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (src/blockgrid/cli/)                             │
//! │  - clap argument parsing (setup.rs)                         │
//! │  - Context wiring + dispatch (commands.rs)                  │
//! │  - Terminal rendering (render.rs)                           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Library (blockgrid::store and below)                       │
//! │  - Returns structured `Outcome` values                      │
//! │  - No knowledge of stdout/stderr or process exits           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Logging goes to stderr through `tracing-subscriber`. The filter comes from
//! `BLOCKGRID_LOG` (same syntax as `RUST_LOG`), or `debug` with `--verbose`,
//! and defaults to `warn`.

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
