//! CLI command definitions and handlers.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use repeats_core::RepeatEngine;
use repeats_graph::{GraphClient, Neo4jGraphStore};

use crate::config::RepeatsConfig;

pub mod graph;
pub mod repeat;

/// Repeats - keep the Jingle REPEATS graph consistent
#[derive(Parser)]
#[command(name = "repeats")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the config file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Connection and engine settings that override the config file.
#[derive(Args, Debug, Default)]
pub struct ConnectionArgs {
    /// Neo4j Bolt URI
    #[arg(long, global = true, env = "NEO4J_URI")]
    pub uri: Option<String>,

    /// Neo4j user
    #[arg(long, global = true, env = "NEO4J_USER")]
    pub user: Option<String>,

    /// Neo4j password
    #[arg(long, global = true, env = "NEO4J_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Neo4j database name
    #[arg(long, global = true, env = "NEO4J_DATABASE")]
    pub database: Option<String>,

    /// Refuse proposals whose direction cannot be decided from dates
    #[arg(long, global = true)]
    pub strict: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the Jingle constraints and indexes
    InitSchema,

    /// Show which way a repeat between two Jingles would point, without writing
    Resolve {
        /// Proposed repeat
        a: String,
        /// Proposed original
        b: String,
    },

    /// Record that A repeats B (direction is corrected if needed)
    Propose {
        /// Proposed repeat
        a: String,
        /// Proposed original
        b: String,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Collapse the chain through one Jingle if it is both repeat and original
    Sweep {
        /// Jingle ID
        id: String,
    },

    /// Sweep every Jingle that is currently both repeat and original, once
    SweepAll,

    /// Remove self-repeats and sweep until the graph is consistent
    Repair {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the repeat group a Jingle belongs to
    Group {
        /// Jingle ID
        id: String,
        /// Print the group as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show graph counters and consistency
    Status,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = RepeatsConfig::load(self.config.as_deref())?.with_overrides(&self.connection);
        config.engine.validate()?;

        let client = GraphClient::connect(&config.graph).await?;
        let store = Arc::new(Neo4jGraphStore::new(client.clone()));
        let engine = RepeatEngine::with_config(store, config.engine);

        match self.command {
            Commands::InitSchema => graph::cmd_init_schema(&client).await,
            Commands::Resolve { a, b } => repeat::cmd_resolve(&engine, &a, &b).await,
            Commands::Propose { a, b, json } => repeat::cmd_propose(&engine, &a, &b, json).await,
            Commands::Sweep { id } => repeat::cmd_sweep(&engine, &id).await,
            Commands::SweepAll => repeat::cmd_sweep_all(&engine).await,
            Commands::Repair { json } => repeat::cmd_repair(&engine, json).await,
            Commands::Group { id, json } => graph::cmd_group(&client, &id, json).await,
            Commands::Status => graph::cmd_status(&client).await,
        }
    }
}
