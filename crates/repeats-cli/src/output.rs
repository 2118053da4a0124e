//! Terminal output formatting.

use colored::{ColoredString, Colorize};

use repeats_core::engine::{DirectionRule, Normalization, ProposeOutcome, RepairReport, Resolution};
use repeats_core::EdgeRef;
use repeats_graph::{GroupMember, RepeatCounts, RepeatGroup};

pub fn print_resolution(resolution: &Resolution) {
    println!(
        "{} {} {}",
        resolution.source.yellow().bold(),
        "repeats".dimmed(),
        resolution.target.cyan().bold()
    );
    print_rule(resolution.rule, resolution.corrected, &resolution.reason);
}

pub fn print_outcome(outcome: &ProposeOutcome) {
    let verb = if outcome.created { "Created" } else { "Confirmed" };
    println!(
        "{} {} {} {}",
        verb.green().bold(),
        outcome.source.yellow().bold(),
        "repeats".dimmed(),
        outcome.target.cyan().bold()
    );
    print_rule(outcome.rule, outcome.corrected, &outcome.reason);
    print_edges(&outcome.deleted_edges, &outcome.updated_edges);
    println!("  {} {}", "operation:".dimmed(), outcome.operation_id.to_string().dimmed());
}

fn print_rule(rule: DirectionRule, corrected: bool, reason: &str) {
    let rule_colored = match rule {
        DirectionRule::MissingCreatedAt => rule.as_str().red(),
        DirectionRule::BothPublishedTie | DirectionRule::CreatedAtTie => rule.as_str().yellow(),
        _ => rule.as_str().normal(),
    };
    println!("  {} {}", "rule:".dimmed(), rule_colored);
    if corrected {
        println!("  {} {}", "direction:".dimmed(), "corrected".magenta());
    }
    println!("  {} {}", "reason:".dimmed(), reason);
}

pub fn print_normalization(normalization: &Normalization) {
    print_edges(&normalization.deleted_edges, &normalization.updated_edges);
}

fn print_edges(deleted: &[EdgeRef], updated: &[EdgeRef]) {
    for edge in deleted {
        println!("  {} {}", "-".red(), edge.to_string().dimmed());
    }
    for edge in updated {
        println!("  {} {}", "+".green(), edge);
    }
}

pub fn print_repair_report(report: &RepairReport) {
    println!("{}", "Repair".bold());
    println!("{}", "─".repeat(40));
    println!("  Passes:             {}", report.passes.to_string().cyan());
    println!("  Nodes repaired:     {}", count(report.nodes_repaired));
    println!("  Self-loops removed: {}", count(report.self_loops_removed.len()));
    println!("  Edges deleted:      {}", count(report.deleted_edges.len()));
    println!("  Edges re-pointed:   {}", count(report.updated_edges.len()));

    if !report.conflicts.is_empty() {
        println!("\n{} ({}):", "Left on cycles".red().bold(), report.conflicts.len());
        for id in &report.conflicts {
            println!("  {} {}", "•".dimmed(), id.red());
        }
    }
    println!("{}", "─".repeat(40));
}

pub fn print_group(group: &RepeatGroup) {
    println!("{} {}", "Original:".bold(), member_line(&group.root));
    if let Some(up) = &group.root_repeats {
        println!(
            "  {} {}",
            "!".yellow().bold(),
            format!("{} itself repeats {}; run 'repeats sweep {}'", group.root.id, up, group.root.id).yellow()
        );
    }

    if group.repeats.is_empty() {
        println!("{}", "No repeats.".dimmed());
        return;
    }

    println!("\n{} ({}):", "Repeats".bold(), group.repeats.len());
    for member in &group.repeats {
        let status = match member.status.as_deref() {
            Some("approved") => "approved".green(),
            Some("rejected") => "rejected".red(),
            Some(other) => other.dimmed(),
            None => "draft".dimmed(),
        };
        println!("  {} {} [{}]", "→".dimmed(), member_line(member), status);
    }
}

fn member_line(member: &GroupMember) -> String {
    match &member.publication_date {
        Some(date) => format!("{} {}", member.id.cyan(), format!("(published {date})").dimmed()),
        None => format!("{} {}", member.id.cyan(), "(inedito)".dimmed()),
    }
}

pub fn print_counts(counts: &RepeatCounts) {
    println!("{}", "Repeat Graph Status".bold());
    println!("{}", "─".repeat(40));
    println!("  Jingles:        {}", counts.jingles.to_string().cyan());
    println!("  REPEATS edges:  {}", counts.repeat_edges.to_string().cyan());
    println!("  Violating:      {}", flag(counts.violating_nodes));
    println!("  Self-repeats:   {}", flag(counts.self_loops));
    println!("{}", "─".repeat(40));

    if counts.is_consistent() {
        println!("{}", "Graph is consistent.".green());
    } else {
        println!("{}", "Run 'repeats repair' to fix.".yellow());
    }
}

fn count(n: usize) -> ColoredString {
    n.to_string().cyan()
}

fn flag(n: i64) -> ColoredString {
    if n == 0 {
        n.to_string().green()
    } else {
        n.to_string().red().bold()
    }
}
