//! Direct graph commands: schema, groups and status.

use anyhow::Result;
use colored::Colorize;

use repeats_graph::GraphClient;

use crate::output;

pub async fn cmd_init_schema(client: &GraphClient) -> Result<()> {
    repeats_graph::schema::initialize_schema(client).await?;
    println!("{}", "Schema initialized.".green().bold());
    Ok(())
}

/// Show the original and all repeats of the group `id` belongs to.
pub async fn cmd_group(client: &GraphClient, id: &str, json: bool) -> Result<()> {
    let group = repeats_graph::repeat_group(client, id).await?;

    match (group, json) {
        (Some(group), true) => println!("{}", serde_json::to_string_pretty(&group)?),
        (Some(group), false) => output::print_group(&group),
        (None, _) => anyhow::bail!("Jingle not found: {id}"),
    }
    Ok(())
}

pub async fn cmd_status(client: &GraphClient) -> Result<()> {
    let counts = repeats_graph::repeat_counts(client).await?;
    output::print_counts(&counts);
    Ok(())
}
