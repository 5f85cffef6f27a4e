//! tabql CLI
//!
//! Command-line interface for tabql operations:
//! - Filter or aggregate a dataset
//! - List datasets
//! - Run the API server
//! - Print a default config file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tabql::api::{serve, AppState};
use tabql::config::{generate_default_config, Config};
use tabql::datasets::DatasetRegistry;
use tabql::query;
use tabql::table::Table;

#[derive(Parser)]
#[command(name = "tabql")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Declarative filter and aggregate queries over tabular datasets")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: standard locations, then environment)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (table, json, csv)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Keep the rows matching every filter clause
    Filter {
        /// Dataset name
        #[arg(short, long)]
        data: String,
        /// Filter clauses as JSON, or @path to a JSON file
        #[arg(short, long)]
        instructions: String,
    },

    /// Summarise a dataset per group
    Aggregate {
        /// Dataset name
        #[arg(short, long)]
        data: String,
        /// Aggregate spec as JSON, or @path to a JSON file
        #[arg(short, long)]
        instructions: String,
    },

    /// List registered datasets
    Datasets,

    /// Run the HTTP API server
    Serve,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        let content = generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, content)?;
                println!("Config written to {:?}", path);
            }
            None => print!("{}", content),
        }
        return Ok(());
    }

    let config = Config::resolve(cli.config.as_deref())?;
    config.logging.init();

    match cli.command {
        Commands::Filter { data, instructions } => {
            let registry = DatasetRegistry::from_config(&config.datasets)?;
            let table = registry.resolve(&data)?;
            let payload = read_instructions(&instructions)?;
            let result = query::filter_json(&table, &payload)?;
            print_result(&result, &cli.format)?;
        }

        Commands::Aggregate { data, instructions } => {
            let registry = DatasetRegistry::from_config(&config.datasets)?;
            let table = registry.resolve(&data)?;
            let payload = read_instructions(&instructions)?;
            let result = query::aggregate_json(&table, &payload)?;
            print_result(&result, &cli.format)?;
        }

        Commands::Datasets => {
            let registry = DatasetRegistry::from_config(&config.datasets)?;
            let info = registry.describe();

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else if info.is_empty() {
                println!("No datasets registered.");
            } else {
                println!("{:<20} {:>8}  {}", "Name", "Rows", "Columns");
                println!("{}", "-".repeat(60));
                for dataset in info {
                    let columns: Vec<String> = dataset
                        .columns
                        .iter()
                        .map(|c| format!("{}:{}", c.name, c.kind))
                        .collect();
                    println!("{:<20} {:>8}  {}", dataset.name, dataset.rows, columns.join(", "));
                }
            }
        }

        Commands::Serve => {
            tracing::info!("Starting tabql API server v{}", env!("CARGO_PKG_VERSION"));
            let state = AppState::from_config(&config)?;
            serve(state, &config.api).await?;
        }

        // written before any config is loaded
        Commands::Config { .. } => {}
    }

    Ok(())
}

/// Inline JSON, or the contents of a file when prefixed with `@`
fn read_instructions(arg: &str) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let text = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)?,
        None => arg.to_string(),
    };
    Ok(serde_json::from_str(&text)?)
}

fn print_result(table: &Table, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    match format.to_lowercase().as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&table.to_records())?),
        "csv" => print_csv(table)?,
        _ => print_table(table),
    }
    Ok(())
}

fn print_table(table: &Table) {
    if table.is_empty() {
        println!("No rows");
        return;
    }

    let cells: Vec<Vec<String>> = (0..table.num_rows())
        .map(|row| table.row(row).iter().map(|v| v.to_string()).collect())
        .collect();

    let widths: Vec<usize> = table
        .column_names()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .map(|row| row[i].len())
                .chain(std::iter::once(name.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<String> = table
        .column_names()
        .iter()
        .zip(&widths)
        .map(|(name, w)| format!("{:<w$}", name, w = *w))
        .collect();
    println!("{}", header.join("  "));
    println!("{}", "-".repeat(widths.iter().sum::<usize>() + 2 * (widths.len() - 1)));

    for row in cells {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<w$}", cell, w = *w))
            .collect();
        println!("{}", line.join("  "));
    }

    println!();
    println!("{} row(s)", table.num_rows());
}

fn print_csv(table: &Table) -> Result<(), Box<dyn std::error::Error>> {
    let mut writer = csv::Writer::from_writer(std::io::stdout());
    writer.write_record(table.column_names())?;

    for record in table.to_records() {
        let fields: Vec<String> = record
            .values()
            .map(|v| match v {
                serde_json::Value::Null => String::new(),
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        writer.write_record(&fields)?;
    }

    writer.flush()?;
    Ok(())
}
