// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! dbq - run SQL through a single-origination command queue.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod bench;
mod exec;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dbq_config::DbqConfig;
use dbq_core::{CommandKind, DbqError};

/// dbq - run SQL through a single-origination command queue.
#[derive(Parser, Debug)]
#[command(name = "dbq", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute one SQL statement through the queue and print the result as JSON.
    Exec {
        /// SQL text to execute.
        sql: String,
        /// Operation kind: scalar, non-query or reader.
        #[arg(long, default_value = "scalar")]
        kind: CommandKind,
        /// Positional parameter, bound in order (repeatable).
        #[arg(long = "param", short = 'p', value_name = "VALUE")]
        params: Vec<String>,
    },
    /// Measure insert throughput through the queue or a direct processor.
    Bench {
        /// Total number of commands to issue.
        #[arg(long, default_value_t = 10_000)]
        commands: usize,
        /// Number of concurrent producer tasks.
        #[arg(long, default_value_t = 4)]
        producers: usize,
        /// Originate on the calling tasks instead of the drain worker.
        #[arg(long)]
        direct: bool,
        /// Print Prometheus metrics after the run.
        #[arg(long)]
        metrics: bool,
    },
    /// Print the resolved configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => dbq_config::load_and_validate_path(path),
        None => dbq_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            dbq_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log.level);

    let result = match cli.command {
        Some(Commands::Exec { sql, kind, params }) => {
            exec::run_exec(&config, &sql, kind, &params).await
        }
        Some(Commands::Bench {
            commands,
            producers,
            direct,
            metrics,
        }) => {
            let options = bench::BenchOptions {
                commands,
                producers,
                direct,
                metrics,
            };
            bench::run_bench_command(&config, options).await
        }
        Some(Commands::Config) => print_config(&config),
        None => {
            println!("dbq: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn print_config(config: &DbqConfig) -> Result<(), DbqError> {
    let rendered = toml::to_string_pretty(config)
        .map_err(|e| DbqError::Config(format!("failed to render configuration: {e}")))?;
    print!("{rendered}");
    Ok(())
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. Output goes to stderr so
/// command results on stdout stay machine-readable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dbq={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(true)
        .init();
}
