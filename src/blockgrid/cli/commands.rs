use super::render::{print_messages, render_config, render_detail, render_grid, render_tree};
use super::setup::{Cli, Commands, ValueCommands};
use blockgrid::config::BlockgridConfig;
use blockgrid::error::{BlockError, Result};
use blockgrid::init::{initialize, resolve_data_dir, BlockgridContext, DATA_DIR_ENV};
use blockgrid::layout::Cell;
use blockgrid::model::BlockPatch;
use blockgrid::outcome::{CmdMessage, LoadSource, MessageLevel, Outcome, SaveStatus};
use blockgrid::store::CreateRequest;
use blockgrid::transfer::{export_to_file, import_from_file};
use clap::Parser;
use colored::*;
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_ENV: &str = "BLOCKGRID_LOG";

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_dir = env::var_os(DATA_DIR_ENV).map(PathBuf::from);
    let data_dir = resolve_data_dir(cli.data.as_deref(), env_dir, &cwd)?;

    let mut ctx = initialize(data_dir);
    report_load(&ctx, cli.verbose);

    let result = match cli.command.unwrap_or(Commands::List) {
        Commands::List => handle_list(&ctx),
        Commands::Grid => handle_grid(&ctx),
        Commands::Add { parent, at, title } => handle_add(&mut ctx, parent, at, title),
        Commands::Show { id } => handle_show(&mut ctx, id),
        Commands::Set {
            id,
            title,
            kind,
            status,
            tags,
            notes,
        } => {
            let patch = BlockPatch {
                title,
                kind,
                status,
                tags,
                notes,
                values: None,
            };
            handle_set(&mut ctx, &id, patch)
        }
        Commands::Value(cmd) => handle_value(&mut ctx, cmd),
        Commands::Rm { id } => handle_remove(&mut ctx, &id),
        Commands::Clear => handle_clear(&mut ctx),
        Commands::Export { path } => handle_export(&ctx, path, &cwd),
        Commands::Import { path } => handle_import(&mut ctx, &path, cli.verbose),
        Commands::Config { key, value } => handle_config(&mut ctx, key, value),
    };

    if ctx.store.is_dirty() {
        if let SaveStatus::Failed(reason) = ctx.store.flush() {
            eprintln!(
                "{}",
                format!("Warning: changes were not saved: {}", reason).yellow()
            );
        }
    }
    result
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn report_load(ctx: &BlockgridContext, verbose: bool) {
    if let Some(problem) = &ctx.config_problem {
        eprintln!(
            "{}",
            format!("Warning: using default settings: {}", problem).yellow()
        );
    }
    if let LoadSource::Discarded(reason) = &ctx.load.source {
        eprintln!(
            "{}",
            format!(
                "Warning: saved blocks at {} could not be used ({}); starting empty.",
                ctx.store.location(),
                reason
            )
            .yellow()
        );
    }
    if !ctx.load.repairs.is_empty() {
        eprintln!(
            "{}",
            format!(
                "Repaired {} problem(s) in saved blocks.",
                ctx.load.repairs.len()
            )
            .dimmed()
        );
        if verbose {
            for repair in &ctx.load.repairs {
                eprintln!("  {}", repair.to_string().dimmed());
            }
        }
    }
}

fn handle_list(ctx: &BlockgridContext) -> Result<()> {
    print!("{}", render_tree(ctx.store.blocks(), ctx.store.selected_id()));
    Ok(())
}

fn handle_grid(ctx: &BlockgridContext) -> Result<()> {
    print!("{}", render_grid(ctx.store.blocks(), ctx.store.selected_id()));
    Ok(())
}

fn handle_add(
    ctx: &mut BlockgridContext,
    parent: Option<String>,
    at: Option<Cell>,
    title: Option<String>,
) -> Result<()> {
    let parent_id = match parent {
        Some(p) => Some(resolve_id(ctx, &p)?),
        None => None,
    };
    let outcome = ctx.store.create(CreateRequest {
        parent_id,
        cell: at,
    });
    print_messages(&outcome.messages);

    if let Some(title) = title {
        let renamed = ctx.store.update(BlockPatch::new().title(title));
        print_problems(&renamed);
    }
    if let Some(block) = ctx.store.selected() {
        println!("{}", block.id.dimmed());
    }
    Ok(())
}

fn handle_show(ctx: &mut BlockgridContext, id: Option<String>) -> Result<()> {
    if let Some(id) = id {
        let id = resolve_id(ctx, &id)?;
        ctx.store.select(&id);
    }
    let block = ctx
        .store
        .selected()
        .ok_or_else(|| BlockError::Api("There are no blocks to show".to_string()))?;

    let children = ctx.store.children(&block.id).len();
    let descendants = ctx.store.descendants(&block.id).len();
    print!("{}", render_detail(block, children, descendants));
    Ok(())
}

fn handle_set(ctx: &mut BlockgridContext, id: &str, patch: BlockPatch) -> Result<()> {
    if patch.is_empty() {
        return Err(BlockError::Api(
            "Nothing to change; pass --title, --type, --status, --tags or --notes".to_string(),
        ));
    }
    select(ctx, id)?;
    let outcome = ctx.store.update(patch);
    print_messages(&outcome.messages);
    Ok(())
}

fn handle_value(ctx: &mut BlockgridContext, cmd: ValueCommands) -> Result<()> {
    let outcome = match cmd {
        ValueCommands::Add { id } => {
            select(ctx, &id)?;
            ctx.store.add_value()
        }
        ValueCommands::Set {
            id,
            row,
            key,
            value,
        } => {
            if key.is_none() && value.is_none() {
                return Err(BlockError::Api(
                    "Nothing to change; pass --key and/or --value".to_string(),
                ));
            }
            select(ctx, &id)?;
            let index = row_index(row)?;
            ctx.store.set_value(index, key, value)
        }
        ValueCommands::Rm { id, row } => {
            select(ctx, &id)?;
            let index = row_index(row)?;
            ctx.store.remove_value(index)
        }
    };

    if outcome.is_noop() {
        let rows = ctx.store.selected().map(|b| b.values.len()).unwrap_or(0);
        return Err(BlockError::Api(format!(
            "No such value row (the block has {} row{})",
            rows,
            if rows == 1 { "" } else { "s" }
        )));
    }
    print_messages(&outcome.messages);
    Ok(())
}

fn handle_remove(ctx: &mut BlockgridContext, id: &str) -> Result<()> {
    let id = resolve_id(ctx, id)?;
    let below = ctx.store.descendants(&id).len();
    let outcome = ctx.store.remove(&id);
    print_messages(&outcome.messages);
    if below > 0 {
        println!(
            "{}",
            format!(
                "Included {} descendant{} of {}.",
                below,
                if below == 1 { "" } else { "s" },
                id
            )
            .dimmed()
        );
    }
    Ok(())
}

fn handle_clear(ctx: &mut BlockgridContext) -> Result<()> {
    let outcome = ctx.store.clear();
    print_messages(&outcome.messages);
    Ok(())
}

fn handle_export(ctx: &BlockgridContext, path: Option<PathBuf>, cwd: &Path) -> Result<()> {
    let written = export_to_file(
        &ctx.store,
        path.as_deref(),
        cwd,
        ctx.config.pretty_export,
    )?;
    print_messages(&[CmdMessage::success(format!(
        "Exported {} block{} to {}",
        ctx.store.len(),
        if ctx.store.len() == 1 { "" } else { "s" },
        written.display()
    ))]);
    Ok(())
}

fn handle_import(ctx: &mut BlockgridContext, path: &Path, verbose: bool) -> Result<()> {
    let outcome = import_from_file(&mut ctx.store, path)?;
    print_messages(&outcome.messages);
    if verbose {
        for repair in &outcome.repairs {
            println!("  {}", repair.to_string().dimmed());
        }
    }
    Ok(())
}

fn handle_config(
    ctx: &mut BlockgridContext,
    key: Option<String>,
    value: Option<String>,
) -> Result<()> {
    match (key, value) {
        (None, _) => print!("{}", render_config(&ctx.config)),
        (Some(key), None) => match ctx.config.get(&key) {
            Some(value) => println!("{}", value),
            None => return Err(BlockError::Api(format!("Unknown config key: {}", key))),
        },
        (Some(key), Some(value)) => {
            let mut config: BlockgridConfig = ctx.config.clone();
            config.set(&key, &value).map_err(BlockError::Api)?;
            config.save(&ctx.data_dir)?;
            let shown = config.get(&key).unwrap_or(value);
            print_messages(&[CmdMessage::success(format!("{} set to {}", key, shown))]);
            ctx.config = config;
        }
    }
    Ok(())
}

fn resolve_id(ctx: &BlockgridContext, needle: &str) -> Result<String> {
    Ok(ctx.store.resolve(needle)?.id.clone())
}

fn select(ctx: &mut BlockgridContext, needle: &str) -> Result<()> {
    let id = resolve_id(ctx, needle)?;
    ctx.store.select(&id);
    Ok(())
}

/// Command-line rows count from 1.
fn row_index(row: usize) -> Result<usize> {
    row.checked_sub(1)
        .ok_or_else(|| BlockError::Api("Value rows are numbered from 1".to_string()))
}

/// Prints only the warnings and errors of a follow-up operation.
fn print_problems(outcome: &Outcome) {
    let problems: Vec<CmdMessage> = outcome
        .messages
        .iter()
        .filter(|m| matches!(m.level, MessageLevel::Warning | MessageLevel::Error))
        .cloned()
        .collect();
    print_messages(&problems);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_count_from_one() {
        assert_eq!(row_index(1).unwrap(), 0);
        assert_eq!(row_index(3).unwrap(), 2);
        assert!(row_index(0).is_err());
    }
}
