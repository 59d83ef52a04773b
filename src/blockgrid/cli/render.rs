//! Terminal renderers. Each returns a `String` so output can be tested without
//! a terminal; the handlers in `commands` print them.

use blockgrid::config::{BlockgridConfig, CONFIG_KEYS};
use blockgrid::layout::{extent, Cell, OccupiedCells};
use blockgrid::model::Block;
use blockgrid::outcome::{CmdMessage, MessageLevel};
use chrono::{DateTime, Utc};
use colored::*;
use std::collections::HashMap;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const TITLE_WIDTH: usize = 40;
const CELL_WIDTH: usize = 12;
const STATUS_WIDTH: usize = 10;
const TIME_WIDTH: usize = 16;
const INDENT: &str = "  ";
const SELECTED_MARKER: &str = "*";

const MAX_MAP_COLS: u32 = 60;
const MAX_MAP_ROWS: u32 = 40;

pub fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => println!("{}", message.content.dimmed()),
            MessageLevel::Success => println!("{}", message.content.green()),
            MessageLevel::Warning => println!("{}", message.content.yellow()),
            MessageLevel::Error => println!("{}", message.content.red()),
        }
    }
}

/// The forest in collection order: roots first, each followed by its subtree.
pub fn render_tree(blocks: &[Block], selected: Option<&str>) -> String {
    if blocks.is_empty() {
        return "No blocks yet. Create one with `blockgrid add`.\n".to_string();
    }

    let mut children: HashMap<&str, Vec<&Block>> = HashMap::new();
    for block in blocks {
        if let Some(parent) = block.parent_id.as_deref() {
            children.entry(parent).or_default().push(block);
        }
    }
    let id_width = blocks.iter().map(|b| b.id.width()).max().unwrap_or(0);

    let mut out = String::new();
    let mut stack: Vec<(&Block, usize)> = blocks
        .iter()
        .filter(|b| b.is_root())
        .rev()
        .map(|b| (b, 0))
        .collect();

    while let Some((block, depth)) = stack.pop() {
        out.push_str(&tree_line(block, depth, id_width, selected == Some(block.id.as_str())));
        out.push('\n');
        if let Some(kids) = children.get(block.id.as_str()) {
            stack.extend(kids.iter().rev().map(|k| (*k, depth + 1)));
        }
    }
    out
}

fn tree_line(block: &Block, depth: usize, id_width: usize, is_selected: bool) -> String {
    let marker = if is_selected { SELECTED_MARKER } else { " " };
    let indent = INDENT.repeat(depth);

    let label = if block.kind.is_empty() {
        block.title.clone()
    } else {
        format!("{} [{}]", block.title, block.kind)
    };
    let available = TITLE_WIDTH.saturating_sub(indent.width()).max(8);
    let label = truncate_to_width(&label, available);
    let label_pad = available.saturating_sub(label.width());

    let id_pad = id_width.saturating_sub(block.id.width());
    let cell = format!("{:>width$}", block.cell().to_string(), width = CELL_WIDTH);
    let status = truncate_to_width(&block.status, STATUS_WIDTH);
    let status_pad = STATUS_WIDTH.saturating_sub(status.width());

    let title = if is_selected {
        label.bold()
    } else {
        label.normal()
    };

    format!(
        "{} {}{}  {}{}{}{}  {}{}",
        marker.yellow(),
        block.id.dimmed(),
        " ".repeat(id_pad),
        indent,
        title,
        " ".repeat(label_pad),
        cell.cyan(),
        format!("{}{}", status, " ".repeat(status_pad)).magenta(),
        format_time_ago(block.updated_at).dimmed()
    )
}

/// Occupancy map of the grid: `O` root, `o` child, `@` selection, `.` free.
pub fn render_grid(blocks: &[Block], selected: Option<&str>) -> String {
    let Some(far) = extent(blocks) else {
        return "The grid is empty.\n".to_string();
    };

    let cols = far.gx.min(MAX_MAP_COLS - 1);
    let rows = far.gy.min(MAX_MAP_ROWS - 1);
    let by_cell: HashMap<Cell, &Block> = blocks.iter().map(|b| (b.cell(), b)).collect();
    let occupied = OccupiedCells::from_blocks(blocks);
    let label_width = rows.to_string().len();

    let mut out = String::new();
    out.push_str(&" ".repeat(label_width + 1));
    for gx in 0..=cols {
        out.push_str(&format!("{} ", gx % 10));
    }
    out.push('\n');

    for gy in 0..=rows {
        out.push_str(&format!("{:>width$} ", gy, width = label_width));
        for gx in 0..=cols {
            let cell = Cell::new(gx, gy);
            let symbol = match by_cell.get(&cell) {
                Some(b) if selected == Some(b.id.as_str()) => "@".yellow().bold(),
                Some(b) if b.is_root() => "O".cyan(),
                Some(_) => "o".normal(),
                None => ".".dimmed(),
            };
            out.push_str(&format!("{} ", symbol));
        }
        out.push('\n');
    }

    if far.gx > cols || far.gy > rows {
        out.push_str(&format!(
            "{}\n",
            format!(
                "(showing columns 0-{} and rows 0-{} of a grid reaching {})",
                cols, rows, far
            )
            .dimmed()
        ));
    }
    out.push_str(&format!(
        "{}\n",
        format!("{} blocks. O root, o child, @ selected.", occupied.len()).dimmed()
    ));
    out
}

pub fn render_detail(block: &Block, children: usize, descendants: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", block.title.bold()));

    let parent = block.parent_id.as_deref().unwrap_or("(root)");
    let tags = block.tag_list().join(", ");
    let rows = [
        ("id", block.id.clone()),
        ("parent", parent.to_string()),
        ("cell", block.cell().to_string()),
        ("type", block.kind.clone()),
        ("status", block.status.clone()),
        ("tags", tags),
        ("created", format_timestamp(block.created_at)),
        ("updated", format_timestamp(block.updated_at)),
        (
            "children",
            format!("{} ({} below in total)", children, descendants),
        ),
    ];
    for (label, value) in rows {
        let label = format!("{:<9}", format!("{}:", label));
        out.push_str(&format!("  {} {}\n", label.dimmed(), value));
    }

    out.push_str(&format!("{}\n", "values:".dimmed()));
    if block.values.is_empty() {
        out.push_str(&format!("  {}\n", "(no values)".dimmed()));
    }
    for (i, row) in block.values.iter().enumerate() {
        out.push_str(&format!("  {}. {} = {}\n", i + 1, row.key, row.value));
    }

    if !block.notes.is_empty() {
        out.push_str(&format!("{}\n", "notes:".dimmed()));
        for line in block.notes.lines() {
            out.push_str(&format!("  {}\n", line));
        }
    }
    out
}

pub fn render_config(config: &BlockgridConfig) -> String {
    let mut out = String::new();
    for key in CONFIG_KEYS {
        let value = config.get(key).unwrap_or_default();
        out.push_str(&format!("{} = {}\n", key, value));
    }
    out
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut current_width = 0;
    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            break;
        }
        result.push(c);
        current_width += char_width;
    }
    result.push('…');
    result
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    format!(
        "{} ({})",
        ts.format("%Y-%m-%d %H:%M:%S UTC"),
        format_time_ago(ts).trim()
    )
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    let formatter = timeago::Formatter::new();
    let time_str = formatter.convert(duration.to_std().unwrap_or_default());
    format!("{:>width$}", time_str, width = TIME_WIDTH)
}
