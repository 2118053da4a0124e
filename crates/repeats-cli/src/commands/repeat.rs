//! Engine-backed commands: resolve, propose, sweep and repair.

use anyhow::Result;
use colored::Colorize;

use repeats_core::{GraphStore, RepeatEngine};
use repeats_graph::Neo4jGraphStore;

use crate::output;

type Engine = RepeatEngine<Neo4jGraphStore>;

/// Dry run of the direction rules.
pub async fn cmd_resolve(engine: &Engine, a: &str, b: &str) -> Result<()> {
    let resolution = engine.resolve(a, b).await?;
    output::print_resolution(&resolution);

    let cycle = engine.would_create_cycle(&resolution.source, &resolution.target).await?;
    if cycle {
        println!("{} {}", "!".red().bold(), "Creating this edge would close a cycle.".red());
    }
    Ok(())
}

pub async fn cmd_propose(engine: &Engine, a: &str, b: &str, json: bool) -> Result<()> {
    let outcome = engine.propose_repeat(a, b).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        output::print_outcome(&outcome);
    }
    Ok(())
}

pub async fn cmd_sweep(engine: &Engine, id: &str) -> Result<()> {
    match engine.sweep_node_report(id).await? {
        Some(normalization) => {
            println!("{} {}", "Normalized chain through".green().bold(), id.yellow());
            output::print_normalization(&normalization);
        }
        None => println!("{} {}", id.yellow(), "is consistent, nothing to do.".dimmed()),
    }
    Ok(())
}

pub async fn cmd_sweep_all(engine: &Engine) -> Result<()> {
    let report = engine.sweep_all().await?;
    output::print_repair_report(&report);

    let remaining = engine.store().violating_nodes().await?;
    if !remaining.is_empty() {
        println!(
            "\n{} {}",
            remaining.len().to_string().yellow().bold(),
            "Jingles are still both repeat and original. Run 'repeats repair' to reach a fixed point."
                .yellow()
        );
    }
    Ok(())
}

pub async fn cmd_repair(engine: &Engine, json: bool) -> Result<()> {
    let report = engine.repair_graph().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output::print_repair_report(&report);
    }
    Ok(())
}
