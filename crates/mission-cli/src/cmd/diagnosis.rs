use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use mission_core::diagnosis::{self, Confidence, DiagnosisStatus};
use std::path::Path;

#[derive(Subcommand)]
pub enum DiagnosisSubcommand {
    /// Start a new investigation (replaces any existing diagnosis)
    Create {
        #[arg(required = true)]
        symptom: Vec<String>,
    },
    /// Replace a text section or append a line to a list section
    UpdateSection {
        /// Section name, e.g. ROOT-CAUSE or "affected files"
        section: String,
        #[arg(required = true)]
        content: Vec<String>,
    },
    /// Write items into a list section
    UpdateList {
        section: String,
        #[arg(required = true)]
        items: Vec<String>,
        /// Keep existing items instead of replacing them
        #[arg(long)]
        append: bool,
    },
    /// Change status and/or confidence
    UpdateFrontmatter {
        /// investigating, confirmed or inconclusive
        #[arg(long)]
        status: Option<DiagnosisStatus>,
        /// low, medium or high
        #[arg(long)]
        confidence: Option<Confidence>,
    },
    /// Check that every required section is present
    Finalize,
    /// Print whether a diagnosis exists
    Exists,
    /// Print the diagnosis document
    Show,
}

pub fn run(root: &Path, subcmd: DiagnosisSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        DiagnosisSubcommand::Create { symptom } => create(root, &symptom.join(" "), json),
        DiagnosisSubcommand::UpdateSection { section, content } => {
            update_section(root, &section, &content.join(" "), json)
        }
        DiagnosisSubcommand::UpdateList {
            section,
            items,
            append,
        } => update_list(root, &section, &items, append, json),
        DiagnosisSubcommand::UpdateFrontmatter { status, confidence } => {
            update_frontmatter(root, status, confidence, json)
        }
        DiagnosisSubcommand::Finalize => finalize(root, json),
        DiagnosisSubcommand::Exists => exists(root, json),
        DiagnosisSubcommand::Show => show(root, json),
    }
}

fn create(root: &Path, symptom: &str, json: bool) -> anyhow::Result<()> {
    let meta = diagnosis::create(root, symptom).context("failed to create diagnosis")?;

    if json {
        print_json(&meta)?;
    } else {
        println!("Created diagnosis {}", meta.id);
    }
    Ok(())
}

fn update_section(root: &Path, section: &str, content: &str, json: bool) -> anyhow::Result<()> {
    diagnosis::update_section(root, section, content)
        .with_context(|| format!("failed to update section '{section}'"))?;

    if json {
        print_json(&serde_json::json!({ "section": section, "updated": true }))?;
    } else {
        println!("Updated {section}");
    }
    Ok(())
}

fn update_list(
    root: &Path,
    section: &str,
    items: &[String],
    append: bool,
    json: bool,
) -> anyhow::Result<()> {
    diagnosis::update_list(root, section, items, append)
        .with_context(|| format!("failed to update list '{section}'"))?;

    if json {
        print_json(&serde_json::json!({
            "section": section,
            "items": items.len(),
            "append": append,
        }))?;
    } else {
        let verb = if append { "Appended" } else { "Wrote" };
        println!("{verb} {} items to {section}", items.len());
    }
    Ok(())
}

fn update_frontmatter(
    root: &Path,
    status: Option<DiagnosisStatus>,
    confidence: Option<Confidence>,
    json: bool,
) -> anyhow::Result<()> {
    let meta = diagnosis::update_frontmatter(root, status, confidence)
        .context("failed to update diagnosis")?;

    if json {
        print_json(&meta)?;
    } else {
        println!(
            "Diagnosis {}: status {}, confidence {}",
            meta.id, meta.status, meta.confidence
        );
    }
    Ok(())
}

fn finalize(root: &Path, json: bool) -> anyhow::Result<()> {
    let report = diagnosis::finalize(root).context("failed to finalize diagnosis")?;

    if json {
        print_json(&report)?;
    } else {
        println!("{}", report.message);
    }
    Ok(())
}

fn exists(root: &Path, json: bool) -> anyhow::Result<()> {
    let exists = diagnosis::exists(root);

    if json {
        print_json(&serde_json::json!({ "exists": exists }))?;
    } else {
        println!("{exists}");
    }
    Ok(())
}

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let diag = diagnosis::load(root).context("failed to load diagnosis")?;

    if json {
        print_json(&serde_json::json!({
            "meta": &diag.meta,
            "root_cause": diag.root_cause(),
            "affected_files": diag.affected_files(),
            "missing_sections": diag.missing_sections(),
        }))?;
    } else {
        println!("id:         {}", diag.meta.id);
        println!("status:     {}", diag.meta.status);
        println!("confidence: {}", diag.meta.confidence);
        println!();
        print!("{}", diag.body());
    }
    Ok(())
}
