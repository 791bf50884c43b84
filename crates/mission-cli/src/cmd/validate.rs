use crate::output::print_json;
use mission_core::{paths, validation};
use std::path::Path;

pub fn run(root: &Path, intent: &str, json: bool) -> anyhow::Result<()> {
    let result = validation::validate(intent, &paths::mission_dir(root));

    if json {
        return print_json(&result);
    }
    if let Some(message) = &result.message {
        println!("{message}");
    }
    if let Some(d) = &result.diagnosis {
        println!("diagnosis {} detected", d.id);
        println!("root cause: {}", d.root_cause);
        for file in &d.affected_files {
            println!("  - {file}");
        }
    }
    println!("next: {}", result.next_step);
    Ok(())
}
