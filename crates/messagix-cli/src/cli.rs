// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Command definitions and their implementations.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::Table;
use messagix_client::proto::{
    Platform, QueueName, TaskBatch, TaskEncoder, TaskIdCounter,
};
use messagix_client::{decode_response, ClientConfig, ConfigService, TableStore};
use messagix_config_fs::FsConfigStore;
use tracing::{debug, info};

/// `messagix` command line.
#[derive(Debug, Parser)]
#[command(name = "messagix")]
#[command(about = "Decode, replay, and encode messagix LightSpeed traffic")]
pub struct Cli {
    /// Directory holding `client.json`; defaults apply when omitted.
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,
    /// Platform override (facebook, messenger, instagram).
    #[arg(long, global = true)]
    pub platform: Option<Platform>,
    /// Subcommand.
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Decode a captured GraphQL response body into a table store
    Decode {
        /// Path to the raw response body
        body: PathBuf,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Decode a body repeatedly and fail on any store-hash divergence
    Replay {
        /// Path to the raw response body
        body: PathBuf,
        /// Number of runs
        #[arg(long, default_value = "20")]
        runs: u32,
    },
    /// Encode a task batch
    Task {
        /// Task label, e.g. SendMessageTask
        label: String,
        /// Task payload (JSON)
        #[arg(long, default_value = "{}")]
        payload: String,
        /// Queue name
        #[arg(long, default_value = "")]
        queue: String,
        /// Treat `--queue` as a JSON structured queue name
        #[arg(long)]
        structured_queue: bool,
        /// Number of tasks to encode
        #[arg(long, default_value = "1")]
        count: u32,
        /// First task id
        #[arg(long, default_value = "0")]
        first_id: u64,
    },
}

/// Decode output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty JSON of the whole store.
    Json,
    /// Per-table summary.
    Table,
}

/// Parse arguments and run against stdout.
pub fn entrypoint() -> Result<()> {
    let cli = Cli::parse();
    let stdout = std::io::stdout();
    run(cli, &mut stdout.lock())
}

/// Run a parsed command, writing its output to `out`.
pub fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    let mut config = load_config(cli.config_dir.as_deref())?;
    if let Some(platform) = cli.platform {
        config.platform = platform;
    }
    debug!(platform = %config.platform, dump_limit = config.dump_limit, "resolved config");

    match cli.command {
        Commands::Decode { body, format } => {
            let store = decode_file(&config, &body)?;
            match format {
                OutputFormat::Json => {
                    serde_json::to_writer_pretty(&mut *out, &store)?;
                    writeln!(out)?;
                }
                OutputFormat::Table => {
                    writeln!(out, "{}", summary_table(&store))?;
                    writeln!(out, "blake3: {}", hex::encode(store.compute_hash()?))?;
                }
            }
        }
        Commands::Replay { body, runs } => {
            if runs == 0 {
                bail!("--runs must be at least 1");
            }
            let baseline = decode_file(&config, &body).context("Run 1 (baseline) failed")?;
            let baseline_hash = hex::encode(baseline.compute_hash()?);
            for i in 2..=runs {
                let store = decode_file(&config, &body).with_context(|| format!("Run {i} failed"))?;
                let hash = hex::encode(store.compute_hash()?);
                if hash != baseline_hash {
                    bail!("divergence in run {i}\nbaseline: {baseline_hash}\ncurrent:  {hash}");
                }
            }
            info!(runs, hash = %baseline_hash, "replay clean");
            writeln!(out, "{runs} runs identical: {baseline_hash}")?;
        }
        Commands::Task {
            label,
            payload,
            queue,
            structured_queue,
            count,
            first_id,
        } => {
            let payload: serde_json::Value =
                serde_json::from_str(&payload).context("--payload is not valid JSON")?;
            let queue = if structured_queue {
                QueueName::Structured(
                    serde_json::from_str(&queue).context("--queue is not valid JSON")?,
                )
            } else {
                QueueName::Plain(queue)
            };
            let encoder = TaskEncoder::new(Arc::new(TaskIdCounter::starting_at(first_id)));
            let tasks = (0..count)
                .map(|_| encoder.create_task(&label, &payload, queue.clone()))
                .collect::<Result<Vec<_>, _>>()?;
            let batch = TaskBatch::new(tasks, config.version_id.clone());
            serde_json::to_writer_pretty(&mut *out, &batch)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn load_config(dir: Option<&Path>) -> Result<ClientConfig> {
    let Some(dir) = dir else {
        return Ok(ClientConfig::default());
    };
    let store = FsConfigStore::with_base(dir)
        .with_context(|| format!("opening config dir {}", dir.display()))?;
    ClientConfig::load(&ConfigService::new(store)).context("loading client config")
}

fn decode_file(config: &ClientConfig, path: &Path) -> Result<TableStore> {
    let body = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let store = decode_response(config.platform.envelope_shape(), &body, config.dump_limit)
        .with_context(|| format!("decoding {}", path.display()))?;
    Ok(store)
}

/// One line per table: row count and the union of column names.
pub fn summary_table(store: &TableStore) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["table", "rows", "columns"]);
    for (name, rows) in store.tables() {
        let columns: BTreeSet<&str> = rows
            .values()
            .flat_map(|row| row.keys().map(String::as_str))
            .collect();
        table.add_row(vec![
            name.to_owned(),
            rows.len().to_string(),
            columns.into_iter().collect::<Vec<_>>().join(", "),
        ]);
    }
    table
}
