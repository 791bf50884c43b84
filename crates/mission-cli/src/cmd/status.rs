use crate::output::print_json;
use anyhow::Context;
use mission_core::{backlog, diagnosis, mission, paths};
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let status = mission::status(root).context("failed to read .mission/mission.md")?;
    let info = mission::load(root).ok();
    let open_items = if paths::backlog_path(root).exists() {
        backlog::list(root, &[], &[])
            .context("failed to read backlog")?
            .len()
    } else {
        0
    };
    let has_diagnosis = diagnosis::exists(root);

    if json {
        print_json(&serde_json::json!({
            "mission": &info,
            "status": status,
            "open_backlog_items": open_items,
            "diagnosis": has_diagnosis,
        }))?;
        return Ok(());
    }

    match &info {
        Some(i) => {
            println!("Mission: {}", i.id);
            if let Some(intent) = &i.intent {
                println!("Intent:  {intent}");
            }
        }
        None => println!("Mission: (none)"),
    }
    println!("Status:  {status}");
    println!("Backlog: {open_items} open items");
    println!("Diagnosis: {}", if has_diagnosis { "present" } else { "none" });
    Ok(())
}
