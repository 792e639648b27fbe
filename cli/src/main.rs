//! dynaload CLI — provision a table and bulk-load JSON records into it.
//!
//! Usage:
//! ```bash
//! # Provision only (idempotent)
//! dynaload ensure --table jobs --endpoint http://localhost:8000
//!
//! # Provision, then import a JSON list of records
//! dynaload load --table jobs --file records.json
//!
//! # Verify infrastructure without writing
//! dynaload load --table jobs --file records.json --dry-run
//! ```

use std::env;
use std::process;
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing_subscriber::EnvFilter;

use dynaload_core::codec::{normalize_record, RecordFormat};
use dynaload_core::record::{prepare_records, Record, TableKeys};
use dynaload_core::wire::TableSpec;
use dynaload_core::StoreError;
use dynaload_http::{ensure_table, BatchWriter, BatchWriterConfig, HttpStoreConfig, HttpTableStore};

/// A fatal CLI failure with its exit code: 2 for usage/input problems,
/// 1 for store failures.
#[derive(Debug)]
struct Failure {
    code: i32,
    message: String,
}

impl From<StoreError> for Failure {
    fn from(e: StoreError) -> Self {
        Self {
            code: 1,
            message: e.to_string(),
        }
    }
}

fn usage_error(message: impl Into<String>) -> Failure {
    Failure {
        code: 2,
        message: message.into(),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(2);
    }

    let result = match args[1].as_str() {
        "load" => cmd_load(&args[2..]).await,
        "ensure" => cmd_ensure(&args[2..]).await,
        "version" | "--version" | "-V" => {
            println!("dynaload {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(2);
        }
    };

    if let Err(f) = result {
        eprintln!("Error: {}", f.message);
        process::exit(f.code);
    }
}

fn print_usage() {
    println!("dynaload {}", env!("CARGO_PKG_VERSION"));
    println!("Provision a key-value table and bulk-load JSON records\n");
    println!("USAGE:");
    println!("    dynaload <COMMAND>\n");
    println!("COMMANDS:");
    println!("    ensure     Create the table if absent and wait for ACTIVE");
    println!("    load       Ensure the table, then import a JSON record file");
    println!("    version    Print version");
    println!("    help       Print this help\n");
    println!("COMMON FLAGS:");
    println!("    --table <NAME>      Target table  [required]");
    println!("    --endpoint <URL>    Store endpoint  [default: http://localhost:8000]");
    println!("    --region <REGION>   Region  [default: $AWS_REGION or us-west-2]");
    println!("    --key <ATTR>        Partition-key attribute  [default: summarize_job_name]");
    println!("    --index-key <ATTR>  Secondary-index attribute  [default: patient_id]");
    println!("    --no-index          Provision without a secondary index\n");
    println!("LOAD FLAGS:");
    println!("    --file <PATH>       JSON list of records (wire-tagged or plain)  [required]");
    println!("    --format <F>        Input format: auto, wire or plain  [default: auto]");
    println!("    --dry-run           Only verify infrastructure, write nothing");
}

/// Flags shared by `ensure` and `load`.
#[derive(Debug)]
struct StoreOpts {
    table: String,
    endpoint: String,
    region: String,
    partition_key: String,
    index_key: Option<String>,
}

impl StoreOpts {
    fn parse(args: &[String]) -> Result<Self, Failure> {
        let table = parse_flag(args, "--table").ok_or_else(|| usage_error("--table is required"))?;
        let endpoint =
            parse_flag(args, "--endpoint").unwrap_or_else(|| "http://localhost:8000".into());
        let region = parse_flag(args, "--region")
            .or_else(|| env::var("AWS_REGION").ok())
            .unwrap_or_else(|| "us-west-2".into());
        let partition_key =
            parse_flag(args, "--key").unwrap_or_else(|| "summarize_job_name".into());
        let index_key = if has_flag(args, "--no-index") {
            None
        } else {
            Some(parse_flag(args, "--index-key").unwrap_or_else(|| "patient_id".into()))
        };
        Ok(Self {
            table,
            endpoint,
            region,
            partition_key,
            index_key,
        })
    }

    fn spec(&self) -> TableSpec {
        TableSpec {
            table: self.table.clone(),
            partition_key: self.partition_key.clone(),
            index_attr: self.index_key.clone(),
        }
    }

    fn keys(&self) -> TableKeys {
        TableKeys {
            partition_key: self.partition_key.clone(),
            index_key: self.index_key.clone(),
        }
    }

    fn store(&self) -> Result<HttpTableStore, Failure> {
        let config = HttpStoreConfig {
            region: self.region.clone(),
            ..HttpStoreConfig::default()
        };
        Ok(HttpTableStore::new(&self.endpoint, config)?)
    }
}

async fn cmd_ensure(args: &[String]) -> Result<(), Failure> {
    let opts = StoreOpts::parse(args)?;
    let store = opts.store()?;
    ensure_table(&store, &opts.spec()).await?;
    Ok(())
}

async fn cmd_load(args: &[String]) -> Result<(), Failure> {
    let opts = StoreOpts::parse(args)?;
    let file = parse_flag(args, "--file").ok_or_else(|| usage_error("--file is required"))?;
    let format = match parse_flag(args, "--format") {
        None => RecordFormat::Auto,
        Some(s) => RecordFormat::parse(&s)
            .ok_or_else(|| usage_error(format!("unknown format '{s}' (auto, wire or plain)")))?,
    };
    let dry_run = has_flag(args, "--dry-run");

    let store = opts.store()?;
    ensure_table(&store, &opts.spec()).await?;

    if dry_run {
        tracing::info!("dry-run complete, infrastructure verified");
        return Ok(());
    }

    let records = read_records(&file, format)?;
    let keys = opts.keys();
    let prepared = prepare_records(records, &keys);
    if prepared.skipped > 0 {
        tracing::warn!(
            skipped = prepared.skipped,
            key = %keys.partition_key,
            "records missing the partition key were skipped"
        );
    }
    if prepared.records.is_empty() {
        tracing::warn!("no valid records to import");
        return Ok(());
    }

    let writer = BatchWriter::new(Arc::new(store), &opts.table, BatchWriterConfig::default());
    let summary = writer.write(&prepared.records).await?;
    if summary.dropped > 0 {
        tracing::warn!(
            dropped = summary.dropped,
            "records remained unprocessed after all retries"
        );
    }
    tracing::info!(
        written = summary.written,
        chunks = summary.chunks,
        "import complete"
    );

    print_example_query(&opts.table, &keys.partition_key, &prepared.records[0]);
    Ok(())
}

/// Read the import file: must be a JSON list of objects. Each record is
/// normalized to plain values per the requested format.
fn read_records(path: &str, format: RecordFormat) -> Result<Vec<Record>, Failure> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| usage_error(format!("failed to read {path}: {e}")))?;
    let data: Value = serde_json::from_str(&text)
        .map_err(|e| usage_error(format!("failed to parse {path}: {e}")))?;
    let Value::Array(rows) = data else {
        return Err(usage_error("import file must be a JSON list of objects"));
    };
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let Value::Object(obj) = row else {
            return Err(usage_error("import file must be a JSON list of objects"));
        };
        records.push(normalize_record(obj, format));
    }
    Ok(records)
}

/// Print a ready-to-use GetItem request for the first imported record.
fn print_example_query(table: &str, partition_key: &str, record: &Record) {
    let example_key = match record.get(partition_key) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => return,
    };
    let mut key = Map::new();
    key.insert(partition_key.to_owned(), json!({ "S": example_key }));
    let example = json!({
        "GetItem": { "TableName": table, "Key": key }
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&example).unwrap_or_default()
    );
}

fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).cloned()
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}
