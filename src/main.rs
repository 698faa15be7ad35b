//! Command-line interface for schema-bridge
//!
//! # Usage Examples
//!
//! ## Schema Translation
//! ```bash
//! # Avro -> Connect (JSON envelope format)
//! schema-bridge to-connect user.avsc --output user.connect.json
//!
//! # Connect -> Avro, without connect.* provenance properties
//! schema-bridge from-connect user.connect.json --no-metadata
//!
//! # Avro -> Connect -> Avro, failing unless the text comes back unchanged
//! schema-bridge round-trip user.avsc --enhanced --strict
//! ```
//!
//! ## Data Conversion
//! ```bash
//! # Avro JSON datum -> Connect value, plus a registry frame for topic "users"
//! schema-bridge convert-data --schema user.avsc --data user.json --topic users
//! ```
//!
//! ## Environment
//! - `SCHEMA_BRIDGE_CONFIG` - YAML file with translation options
//! - `SCHEMA_BRIDGE_CACHE_CAPACITY` - translation cache size
//! - `SCHEMA_BRIDGE_ENHANCED` - enhanced fidelity
//! - `RUST_LOG` - log filter, e.g. `schema_bridge=info,avro_connect_types=debug`

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use schema_bridge::{commands, ConversionOpts};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "schema-bridge")]
#[command(about = "A tool for translating schemas and data between Avro and Kafka Connect")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate an Avro schema file to a Connect schema
    ToConnect {
        /// Avro schema file (.avsc)
        input: PathBuf,

        /// Write the result here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        #[command(flatten)]
        opts: ConversionOpts,
    },

    /// Translate a Connect schema file (JSON envelope format) to Avro
    FromConnect {
        /// Connect schema file
        input: PathBuf,

        /// Write the result here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        #[command(flatten)]
        opts: ConversionOpts,
    },

    /// Translate an Avro schema to Connect and back, and compare
    RoundTrip {
        /// Avro schema file (.avsc)
        input: PathBuf,

        /// Fail unless the schema text comes back unchanged
        #[arg(long)]
        strict: bool,

        #[command(flatten)]
        opts: ConversionOpts,
    },

    /// Convert an Avro JSON datum to a Connect value
    ConvertData {
        /// Avro schema file (.avsc)
        #[arg(long)]
        schema: PathBuf,

        /// Datum in Avro JSON form
        #[arg(long)]
        data: PathBuf,

        /// Also frame the value for this topic (base64 in the output)
        #[arg(long)]
        topic: Option<String>,

        #[command(flatten)]
        opts: ConversionOpts,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::ToConnect {
            input,
            output,
            opts,
        } => {
            let json = commands::to_connect(&read(&input)?, opts.to_config()?)?;
            emit(&serde_json::to_string_pretty(&json)?, output.as_deref())?;
        }
        Commands::FromConnect {
            input,
            output,
            opts,
        } => {
            let json = commands::from_connect(&read(&input)?, opts.to_config()?)?;
            emit(&serde_json::to_string_pretty(&json)?, output.as_deref())?;
        }
        Commands::RoundTrip {
            input,
            strict,
            opts,
        } => {
            let report = commands::round_trip(&read(&input)?, opts.to_config()?)?;
            emit(&serde_json::to_string_pretty(&report)?, None)?;
            if !report.structurally_equal {
                bail!("Schema changed across the round trip");
            }
            if strict && !report.text_identical {
                bail!("Schema text changed across the round trip");
            }
        }
        Commands::ConvertData {
            schema,
            data,
            topic,
            opts,
        } => {
            let json = commands::convert_data(
                &read(&schema)?,
                &read(&data)?,
                topic.as_deref(),
                opts.to_config()?,
            )
            .await?;
            emit(&serde_json::to_string_pretty(&json)?, None)?;
        }
    }

    Ok(())
}

fn read(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn emit(text: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(path, format!("{text}\n"))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}
