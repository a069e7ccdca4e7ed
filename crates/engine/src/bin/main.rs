// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! `sqlscript` command line tool
//!
//! Runs the pipeline over a script and prints the resulting buffer as JSON.
//!
//! ```text
//! sqlscript analyze --schema tpch.sql query.sql
//! sqlscript complete --descriptors pool.json --offset 14 query.sql
//! echo "select 1" | sqlscript scan
//! ```

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use sqlscript_engine::logging::init_logging;
use sqlscript_engine::{CatalogHandle, Engine, EngineConfig, FlatBuffer, ScriptHandle};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// First entry id used for `--schema` scripts
const SCHEMA_ENTRY_BASE: u32 = 1;
/// First entry id used for `--descriptors` pools
const POOL_ENTRY_BASE: u32 = 1000;
/// Entry id of the input script
const INPUT_ENTRY_ID: u32 = 100_000;

const SCHEMA_RANK: u32 = 0;
const POOL_RANK: u32 = 1;

#[derive(Parser, Debug)]
#[command(name = "sqlscript", version, about = "Analyze SQL scripts")]
struct Cli {
    /// Engine configuration, JSON or YAML
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the token stream
    Scan(InputArgs),
    /// Print the syntax tree
    Parse(InputArgs),
    /// Print the analysis
    Analyze {
        #[command(flatten)]
        catalog: CatalogArgs,
        #[command(flatten)]
        input: InputArgs,
    },
    /// Print completion candidates at a byte offset
    Complete {
        #[command(flatten)]
        catalog: CatalogArgs,
        /// Byte offset of the cursor
        #[arg(long)]
        offset: u32,
        /// Maximum number of candidates
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[command(flatten)]
        input: InputArgs,
    },
    /// Print the engine version
    Version,
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Script file, stdin when omitted or `-`
    input: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CatalogArgs {
    /// Schema scripts loaded into the catalog
    #[arg(long = "schema")]
    schemas: Vec<PathBuf>,

    /// Schema descriptor JSON files, one descriptor pool per file
    #[arg(long = "descriptors")]
    descriptors: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_logging(&config)?;
    info!(version = %sqlscript_engine::get_version_text(), "Starting sqlscript");

    let engine = Engine::with_config(config)?;
    let output = match cli.command {
        Command::Scan(input) => {
            let (_catalog, script) = prepare(&engine, None, &input)?;
            render(&script.scan()?, cli.pretty)?
        }
        Command::Parse(input) => {
            let (_catalog, script) = prepare(&engine, None, &input)?;
            render(&script.parse()?, cli.pretty)?
        }
        Command::Analyze { catalog, input } => {
            let (_catalog, script) = prepare(&engine, Some(&catalog), &input)?;
            render(&script.analyze()?, cli.pretty)?
        }
        Command::Complete {
            catalog,
            offset,
            limit,
            input,
        } => {
            let (_catalog, script) = prepare(&engine, Some(&catalog), &input)?;
            script.analyze()?;
            script.move_cursor(offset)?;
            render(&script.complete_at_cursor(limit, None)?, cli.pretty)?
        }
        Command::Version => engine.version_text(),
    };
    println!("{output}");
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => EngineConfig::from_yaml_str(&text)?,
        _ => EngineConfig::from_json_str(&text)?,
    };
    Ok(config)
}

fn read_input(input: &InputArgs) -> Result<String> {
    match input.input.as_deref() {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

/// Build the catalog and the input script
fn prepare(
    engine: &Engine,
    catalog_args: Option<&CatalogArgs>,
    input: &InputArgs,
) -> Result<(CatalogHandle, ScriptHandle)> {
    let catalog = engine.create_catalog();
    if let Some(args) = catalog_args {
        for (entry_id, path) in (SCHEMA_ENTRY_BASE..).zip(&args.schemas) {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read schema {}", path.display()))?;
            let schema = engine.create_script(&catalog, entry_id)?;
            schema.insert_text_at(0, &text)?;
            schema.analyze()?;
            catalog.load_script(&schema, SCHEMA_RANK)?;
            debug!(entry_id, path = %path.display(), "Loaded schema script");
        }
        for (pool_id, path) in (POOL_ENTRY_BASE..).zip(&args.descriptors) {
            let json = std::fs::read(path)
                .with_context(|| format!("failed to read descriptors {}", path.display()))?;
            catalog.add_descriptor_pool(pool_id, POOL_RANK)?;
            catalog.add_schema_descriptor_json(pool_id, &json)?;
            debug!(pool_id, path = %path.display(), "Loaded descriptor pool");
        }
    }

    let text = read_input(input)?;
    if text.len() > u32::MAX as usize {
        bail!("input is larger than 4 GiB");
    }
    let script = engine.create_script(&catalog, INPUT_ENTRY_ID)?;
    script.insert_text_at(0, &text)?;
    Ok((catalog, script))
}

fn render<T>(buffer: &FlatBuffer<T>, pretty: bool) -> Result<String>
where
    T: serde::Serialize + Send + Sync + 'static,
{
    let text = if pretty {
        buffer.encode_pretty()?
    } else {
        buffer.encode()?
    };
    Ok(text)
}
