//! Record store operator command line.
//!
//! Connects with the same environment variables as the services that use the
//! store, then prints records as one JSON document per line.

use std::io::Write;

use clap::{Parser, Subcommand};
use recordstore_persistence::types::{Gender, Record, Selector};
use recordstore_persistence::{RecordCodec, RecordGateway, StoreConfig};
use serde_json::{Value, json};
use tracing::info;

/// Record store operator tool.
#[derive(Debug, Parser)]
#[command(name = "recordstore", version, about = "Inspect and maintain the record store")]
struct Cli {
    #[command(flatten)]
    config: StoreConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print every record.
    List,

    /// Print one record by id.
    Get {
        /// Record id.
        id: String,
    },

    /// Print records whose fields all equal the given values.
    Find {
        /// Exact name.
        #[arg(long)]
        name: Option<String>,

        /// Exact category.
        #[arg(long)]
        category: Option<String>,

        /// Availability.
        #[arg(long)]
        available: Option<bool>,

        /// Gender (MALE, FEMALE or UNKNOWN).
        #[arg(long)]
        gender: Option<Gender>,
    },

    /// Delete every record in the database.
    Purge,
}

impl Command {
    fn selector(
        name: Option<String>,
        category: Option<String>,
        available: Option<bool>,
        gender: Option<Gender>,
    ) -> Selector {
        let mut selector = Selector::new();
        if let Some(name) = name {
            selector = selector.eq("name", name);
        }
        if let Some(category) = category {
            selector = selector.eq("category", category);
        }
        if let Some(available) = available {
            selector = selector.eq("available", Value::Bool(available));
        }
        if let Some(gender) = gender {
            selector = selector.eq("gender", gender.as_str());
        }
        selector
    }
}

/// Initializes the tracing subscriber. `RUST_LOG` takes precedence over `level`.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "recordstore_persistence={level},recordstore={level}"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn print_records(records: &[Record]) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    for record in records {
        let document = RecordCodec::encode(record);
        writeln!(out, "{}", serde_json::to_string(&document)?)?;
    }
    Ok(())
}

async fn run(gateway: &RecordGateway, command: Command) -> anyhow::Result<()> {
    match command {
        Command::List => {
            let records = gateway.find_all().await?;
            info!(count = records.len(), "Listed records");
            print_records(&records)?;
        }
        Command::Get { id } => match gateway.find_by_id(&id).await? {
            Some(record) => print_records(std::slice::from_ref(&record))?,
            None => anyhow::bail!("Record with id '{id}' was not found"),
        },
        Command::Find {
            name,
            category,
            available,
            gender,
        } => {
            let selector = Command::selector(name, category, available, gender);
            let records = gateway.find_by(&selector).await?;
            info!(count = records.len(), "Found records");
            print_records(&records)?;
        }
        Command::Purge => {
            let removed = gateway.remove_all().await?;
            println!("{}", json!({ "removed": removed }));
        }
    }
    Ok(())
}

#[cfg(feature = "couchdb")]
async fn connect(config: &StoreConfig) -> anyhow::Result<RecordGateway> {
    Ok(recordstore_persistence::bootstrap::connect(config).await?)
}

/// Fallback when the couchdb feature is not enabled.
#[cfg(not(feature = "couchdb"))]
async fn connect(_config: &StoreConfig) -> anyhow::Result<RecordGateway> {
    anyhow::bail!(
        "Connecting requires the 'couchdb' feature. \
         Build with: cargo build -p recordstore-cli --features couchdb"
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.config.log_level);

    if let Err(errors) = cli.config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(
        database = %cli.config.database,
        retry_count = cli.config.retry_count,
        "Starting recordstore"
    );

    let gateway = connect(&cli.config).await?;
    run(&gateway, cli.command).await
}
