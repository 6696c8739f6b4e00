//! reqshield CLI test harness.

use clap::{Parser, Subcommand};
use reqshield::{Request, Result, ScanResult, Scanner, SchemaCatalog, StaticSchemaProvider};
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "reqshield")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to a JSON schema catalog file
    /// ({"tables": [...], "columns": [...], "functions": [...], "keywords": [...]})
    #[arg(short, long)]
    schema: Option<PathBuf>,

    /// Retain forensic payloads on reported threats
    #[arg(short, long)]
    debug: bool,

    /// Emit the report as JSON
    #[arg(short, long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a single field value
    Value {
        /// The field value to scan
        value: String,

        /// Dotted field path to report findings under
        #[arg(short, long, default_value = "args.value")]
        field: String,
    },

    /// Scan a JSON request document ({"<area>": {"<field>": <value>}})
    Request {
        /// Path to the document, or '-' for stdin
        path: String,
    },
}

/// Schema catalog file format.
#[derive(Debug, Default, Deserialize)]
struct SchemaFile {
    #[serde(default)]
    tables: HashSet<String>,
    #[serde(default)]
    columns: HashSet<String>,
    #[serde(default)]
    functions: HashSet<String>,
    #[serde(default)]
    keywords: HashSet<String>,
}

fn load_catalog(path: Option<&PathBuf>) -> Result<SchemaCatalog> {
    let Some(path) = path else {
        return Ok(SchemaCatalog::builtin());
    };

    let text = std::fs::read_to_string(path)?;
    let file: SchemaFile = serde_json::from_str(&text)
        .map_err(|e| reqshield::Error::invalid_request(format!("schema file: {e}")))?;

    let provider = if file.functions.is_empty() && file.keywords.is_empty() {
        StaticSchemaProvider::with_mysql_vocabulary(file.tables, file.columns)
    } else {
        StaticSchemaProvider::new(file.tables, file.columns, file.functions, file.keywords)
    };
    Ok(SchemaCatalog::new(Arc::new(provider)))
}

fn report(result: &ScanResult, json: bool) {
    if json {
        let threats: Vec<_> = result
            .threats()
            .iter()
            .map(|t| {
                serde_json::json!({
                    "detector": t.detector(),
                    "rule_id": t.rule_id(),
                    "score": t.score(),
                    "reason": t.reason(),
                    "field": t.field(),
                    "description": t.description(),
                    "evidence": t.evidence().iter()
                        .map(|e| serde_json::json!({
                            "pattern": e.pattern,
                            "contribution": e.contribution,
                        }))
                        .collect::<Vec<_>>(),
                    "debug": t.debug(),
                })
            })
            .collect();
        let report = serde_json::json!({
            "score": result.score(),
            "threats": threats,
        });
        println!("{report}");
        return;
    }

    println!("score: {}", result.score());
    for threat in result.threats() {
        match threat.field() {
            Some(field) => println!("  [{field}] {threat}"),
            None => println!("  {threat}"),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let catalog = load_catalog(cli.schema.as_ref())?;
    let scanner = Scanner::new(Arc::new(catalog)).with_debug(cli.debug);

    let result = match cli.command {
        Commands::Value { value, field } => {
            let mut request = Request::new();
            let (area, name) = field.split_once('.').unwrap_or(("args", field.as_str()));
            request.insert(area, name, value);
            scanner.scan_request(&request)
        }
        Commands::Request { path } => {
            let text = if path == "-" {
                let mut buffer = String::new();
                std::io::stdin().read_to_string(&mut buffer)?;
                buffer
            } else {
                std::fs::read_to_string(&path)?
            };
            let request = Request::from_json(&text)?;
            scanner.scan_request(&request)
        }
    };

    info!(score = result.score(), threats = result.threats().len(), "scan finished");
    report(&result, cli.json);

    Ok(())
}
