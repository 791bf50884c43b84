use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use mission_core::{checkpoint, config::Config, mission, vcs::GitCli};
use std::path::Path;

#[derive(Subcommand)]
pub enum CheckpointSubcommand {
    /// Snapshot the working tree without moving the branch
    Create {
        /// Mission id (default: id of the active mission)
        #[arg(long)]
        mission: Option<String>,
    },
    /// Restore the working tree from a checkpoint and delete it
    Revert { name: String },
    /// Delete every checkpoint of a mission
    Clear {
        #[arg(long)]
        mission: Option<String>,
    },
    /// List checkpoints of a mission
    List {
        #[arg(long)]
        mission: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: CheckpointSubcommand, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load .mission/config.yaml")?;
    let git = GitCli::with_config(root, &config.git);

    match subcmd {
        CheckpointSubcommand::Create { mission } => {
            let id = mission_id(root, mission)?;
            let name = checkpoint::create(&git, &id)
                .with_context(|| format!("failed to create checkpoint for '{id}'"))?;
            if json {
                print_json(&serde_json::json!({ "checkpoint": name }))?;
            } else {
                println!("{name}");
            }
        }
        CheckpointSubcommand::Revert { name } => {
            let reverted = checkpoint::revert(&git, &name)
                .with_context(|| format!("failed to revert checkpoint '{name}'"))?;
            if json {
                print_json(&reverted)?;
            } else {
                println!("Reverted to {name}");
            }
        }
        CheckpointSubcommand::Clear { mission } => {
            let id = mission_id(root, mission)?;
            let deleted = checkpoint::clear(&git, &id)
                .with_context(|| format!("failed to clear checkpoints for '{id}'"))?;
            if json {
                print_json(&serde_json::json!({ "mission": id, "deleted": deleted }))?;
            } else {
                println!("Deleted {deleted} checkpoints");
            }
        }
        CheckpointSubcommand::List { mission } => {
            let id = mission_id(root, mission)?;
            let checkpoints = checkpoint::list(&git, &id)
                .with_context(|| format!("failed to list checkpoints for '{id}'"))?;
            if json {
                print_json(&checkpoints)?;
            } else if checkpoints.is_empty() {
                println!("No checkpoints for {id}.");
            } else {
                let rows = checkpoints
                    .iter()
                    .map(|c| vec![c.name.clone(), c.commit.chars().take(12).collect()])
                    .collect();
                print_table(&["NAME", "COMMIT"], rows);
            }
        }
    }
    Ok(())
}

fn mission_id(root: &Path, explicit: Option<String>) -> anyhow::Result<String> {
    match explicit {
        Some(id) => Ok(id),
        None => mission::current_id(root).context("no --mission given and no usable active mission"),
    }
}
