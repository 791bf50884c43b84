use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use mission_core::backlog::{self, ItemType};
use std::path::Path;

#[derive(Subcommand)]
pub enum BacklogSubcommand {
    /// Add an item to the backlog
    Add {
        #[arg(required = true)]
        description: Vec<String>,
        /// feature, bugfix, decomposed, refactor or future
        #[arg(long = "type", short = 't')]
        item_type: ItemType,
        /// Recurring-pattern id (refactor items only)
        #[arg(long)]
        pattern: Option<String>,
    },
    /// Add several items of one type in a single write
    AddMany {
        #[arg(long = "type", short = 't')]
        item_type: ItemType,
        #[arg(required = true)]
        descriptions: Vec<String>,
    },
    /// Move the first open item containing TEXT to COMPLETED
    Complete {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// List checklist items
    List {
        /// Only these types (comma-separated); `completed` must be named to be shown
        #[arg(long, value_delimiter = ',', conflicts_with = "exclude")]
        include: Vec<ItemType>,
        /// Every type except these (comma-separated)
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<ItemType>,
        /// Show type and pattern columns
        #[arg(long)]
        detailed: bool,
    },
    /// Remove completed items
    Cleanup {
        /// Only completed items that look like this type
        #[arg(long = "type", short = 't')]
        item_type: Option<ItemType>,
    },
    /// Show how often a refactor pattern has been seen
    PatternCount { id: String },
}

pub fn run(root: &Path, subcmd: BacklogSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        BacklogSubcommand::Add {
            description,
            item_type,
            pattern,
        } => add(root, &description.join(" "), item_type, pattern.as_deref(), json),
        BacklogSubcommand::AddMany {
            item_type,
            descriptions,
        } => add_many(root, &descriptions, item_type, json),
        BacklogSubcommand::Complete { text } => complete(root, &text.join(" "), json),
        BacklogSubcommand::List {
            include,
            exclude,
            detailed,
        } => list(root, &include, &exclude, detailed, json),
        BacklogSubcommand::Cleanup { item_type } => cleanup(root, item_type, json),
        BacklogSubcommand::PatternCount { id } => pattern_count(root, &id, json),
    }
}

fn add(
    root: &Path,
    description: &str,
    item_type: ItemType,
    pattern: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let count = match pattern {
        Some(id) => backlog::add_with_pattern(root, description, item_type, id)
            .with_context(|| format!("failed to record pattern '{id}'"))?,
        None => {
            backlog::add(root, description, item_type).context("failed to add backlog item")?;
            None
        }
    };

    if json {
        print_json(&serde_json::json!({
            "type": item_type,
            "description": description,
            "pattern": pattern,
            "count": count,
        }))?;
    } else {
        match (pattern, count) {
            (Some(id), Some(n)) => println!("Recorded pattern {id} (seen {n} times)"),
            _ => println!("Added {item_type} item: {description}"),
        }
    }
    Ok(())
}

fn add_many(
    root: &Path,
    descriptions: &[String],
    item_type: ItemType,
    json: bool,
) -> anyhow::Result<()> {
    let added = backlog::add_multiple(root, descriptions, item_type)
        .context("failed to add backlog items")?;

    if json {
        print_json(&serde_json::json!({ "type": item_type, "added": added }))?;
    } else {
        println!("Added {added} {item_type} items");
    }
    Ok(())
}

fn complete(root: &Path, text: &str, json: bool) -> anyhow::Result<()> {
    let line = backlog::complete(root, text)
        .with_context(|| format!("failed to complete '{text}'"))?;

    if json {
        print_json(&serde_json::json!({ "completed": line }))?;
    } else {
        println!("{line}");
    }
    Ok(())
}

fn list(
    root: &Path,
    include: &[ItemType],
    exclude: &[ItemType],
    detailed: bool,
    json: bool,
) -> anyhow::Result<()> {
    if detailed {
        let items: Vec<_> = backlog::items(root)
            .context("failed to read backlog")?
            .into_iter()
            .filter(|i| backlog::list_filter(i.item_type, include, exclude))
            .collect();
        if json {
            return print_json(&items);
        }
        if items.is_empty() {
            println!("No backlog items.");
            return Ok(());
        }
        let rows = items
            .iter()
            .map(|i| {
                vec![
                    i.item_type.to_string(),
                    if i.done { "x" } else { " " }.to_string(),
                    i.pattern
                        .as_ref()
                        .map(|p| format!("{} ({})", p.id, p.count))
                        .unwrap_or_default(),
                    i.text.clone(),
                ]
            })
            .collect();
        print_table(&["TYPE", "DONE", "PATTERN", "ITEM"], rows);
        return Ok(());
    }

    let lines = backlog::list(root, include, exclude).context("failed to read backlog")?;
    if json {
        print_json(&lines)?;
    } else {
        for line in &lines {
            println!("{line}");
        }
    }
    Ok(())
}

fn cleanup(root: &Path, item_type: Option<ItemType>, json: bool) -> anyhow::Result<()> {
    let removed = backlog::cleanup(root, item_type).context("failed to clean up backlog")?;

    if json {
        print_json(&serde_json::json!({ "removed": removed }))?;
    } else {
        println!("Removed {removed} completed items");
    }
    Ok(())
}

fn pattern_count(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let count = backlog::pattern_count(root, id).context("failed to read backlog")?;

    if json {
        print_json(&serde_json::json!({ "pattern": id, "count": count }))?;
    } else {
        println!("{count}");
    }
    Ok(())
}
