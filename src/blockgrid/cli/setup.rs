use blockgrid::layout::Cell;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Release builds report the package version alone; other builds append the
/// git revision recorded by `build.rs`, e.g. "0.3.2 (abc1234+dirty 2024-01-15)".
fn get_version() -> &'static str {
    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        version_string(
            env!("CARGO_PKG_VERSION"),
            env!("BLOCKGRID_BUILD"),
            !cfg!(debug_assertions),
        )
    })
}

fn version_string(version: &str, build: &str, release: bool) -> String {
    if release || build.is_empty() {
        version.to_string()
    } else {
        format!("{} ({})", version, build)
    }
}

#[derive(Parser, Debug)]
#[command(name = "blockgrid", bin_name = "blockgrid", version = get_version())]
#[command(about = "Arrange notes as a tree of blocks on a grid", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Data directory (overrides $BLOCKGRID_HOME and .blockgrid lookup)
    #[arg(long, global = true, value_name = "DIR")]
    pub data: Option<PathBuf>,

    /// Verbose output (debug logging on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show blocks as a tree
    #[command(alias = "ls")]
    List,

    /// Draw the grid occupancy map
    Grid,

    /// Create a block
    #[command(alias = "new")]
    Add {
        /// Parent block id (or unique prefix)
        #[arg(long)]
        parent: Option<String>,

        /// Preferred cell, e.g. 3,1
        #[arg(long, value_name = "X,Y", value_parser = parse_cell)]
        at: Option<Cell>,

        /// Title for the new block
        #[arg(long)]
        title: Option<String>,
    },

    /// Show one block in detail (default: the first block)
    #[command(alias = "view")]
    Show { id: Option<String> },

    /// Edit a block's fields
    Set {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long = "type", value_name = "TYPE")]
        kind: Option<String>,

        #[arg(long)]
        status: Option<String>,

        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Edit a block's key/value rows
    #[command(subcommand)]
    Value(ValueCommands),

    /// Delete a block and everything below it
    #[command(alias = "delete")]
    Rm { id: String },

    /// Delete every block
    Clear,

    /// Write all blocks to a JSON file (default: block-grid-YYYY-MM-DD.json)
    Export { path: Option<PathBuf> },

    /// Replace all blocks with the contents of a JSON file
    Import { path: PathBuf },

    /// Show or set configuration
    Config {
        key: Option<String>,
        value: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ValueCommands {
    /// Append an empty row
    Add { id: String },

    /// Change row N
    Set {
        id: String,
        row: usize,

        #[arg(long)]
        key: Option<String>,

        #[arg(long)]
        value: Option<String>,
    },

    /// Delete row N
    Rm { id: String, row: usize },
}

fn parse_cell(s: &str) -> Result<Cell, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{}'", s))?;
    let gx = x
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("bad column '{}': {}", x.trim(), e))?;
    let gy = y
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("bad row '{}': {}", y.trim(), e))?;
    Ok(Cell::new(gx, gy))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec!["blockgrid"];
        full.extend_from_slice(args);
        Cli::try_parse_from(full).unwrap()
    }

    #[test]
    fn no_command_is_allowed() {
        assert!(parse(&[]).command.is_none());
    }

    #[test]
    fn add_with_all_options() {
        match parse(&["add", "--parent", "blk_1", "--at", "3, 4", "--title", "Hi"]).command {
            Some(Commands::Add { parent, at, title }) => {
                assert_eq!(parent.as_deref(), Some("blk_1"));
                assert_eq!(at, Some(Cell::new(3, 4)));
                assert_eq!(title.as_deref(), Some("Hi"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn version_carries_build_only_outside_release() {
        assert_eq!(version_string("1.0.0", "abc1234 2024-01-15", true), "1.0.0");
        assert_eq!(version_string("1.0.0", "", false), "1.0.0");
        assert_eq!(
            version_string("1.0.0", "abc1234+dirty 2024-01-15", false),
            "1.0.0 (abc1234+dirty 2024-01-15)"
        );
    }

    #[test]
    fn bad_cell_is_rejected() {
        assert!(Cli::try_parse_from(["blockgrid", "add", "--at", "3"]).is_err());
        assert!(Cli::try_parse_from(["blockgrid", "add", "--at", "-1,2"]).is_err());
    }

    #[test]
    fn set_type_flag_maps_to_kind() {
        match parse(&["set", "blk", "--type", "idea"]).command {
            Some(Commands::Set { id, kind, .. }) => {
                assert_eq!(id, "blk");
                assert_eq!(kind.as_deref(), Some("idea"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn value_subcommands() {
        match parse(&["value", "set", "blk", "2", "--key", "k"]).command {
            Some(Commands::Value(ValueCommands::Set { row, key, value, .. })) => {
                assert_eq!(row, 2);
                assert_eq!(key.as_deref(), Some("k"));
                assert_eq!(value, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn global_flags_after_command() {
        let cli = parse(&["list", "--data", "/tmp/x", "-v"]);
        assert_eq!(cli.data, Some(PathBuf::from("/tmp/x")));
        assert!(cli.verbose);
    }
}
