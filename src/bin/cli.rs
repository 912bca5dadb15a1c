//! Command line driver for the burrow index.
#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use burrow::data_generator::{employee_schema, student_schema, RecordGenerator};
use burrow::{BPlusTree, Record, TableSchema};

#[derive(Parser, Debug)]
#[command(
    name = "burrow",
    version,
    about = "Disk-resident B+ tree index over fixed-size records"
)]
struct Cli {
    /// Path to the index file.
    #[arg(short, long)]
    file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new index file for one of the bundled tables.
    Create {
        /// Which table schema the index stores.
        #[arg(long, value_enum, default_value_t = Table::Employee)]
        table: Table,
    },
    /// Insert randomly generated records with sequential keys.
    Load {
        /// How many records to insert.
        #[arg(long, default_value_t = 100)]
        count: u32,
        /// Key of the first record.
        #[arg(long, default_value_t = 1)]
        start_key: i64,
    },
    /// Insert one randomly generated record with the given key.
    Insert {
        /// Key of the new record.
        #[arg(long)]
        key: i64,
    },
    /// Look up a record by key.
    Get {
        /// Key to search for.
        #[arg(long)]
        key: i64,
    },
    /// Print tree shape information.
    Stats,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Table {
    /// Employee records: name, surname, city, salary.
    Employee,
    /// Student records: name, surname, grade average.
    Student,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> burrow::Result<()> {
    match cli.command {
        Command::Create { table } => {
            let schema = match table {
                Table::Employee => employee_schema(),
                Table::Student => student_schema(),
            };
            let tree = BPlusTree::create(&cli.file, schema)?;
            tree.close()?;
            println!("created {}", cli.file.display());
        }
        Command::Load { count, start_key } => {
            let mut tree = BPlusTree::open(&cli.file)?;
            let mut generator = RecordGenerator::new();
            for i in 0..count {
                let key = start_key + i64::from(i);
                let record = generator.random_record(tree.schema(), key);
                tree.insert(&record)?;
            }
            tree.close()?;
            println!("inserted {count} records starting at key {start_key}");
        }
        Command::Insert { key } => {
            let mut tree = BPlusTree::open(&cli.file)?;
            let mut generator = RecordGenerator::new();
            let record = generator.random_record(tree.schema(), key);
            let block = tree.insert(&record)?;
            tree.close()?;
            println!("inserted key {key} into block {block}");
        }
        Command::Get { key } => {
            let mut tree = BPlusTree::open(&cli.file)?;
            match tree.search(key)? {
                Some(record) => println!("{}", format_record(tree.schema(), &record)),
                None => println!("key {key} not found"),
            }
            tree.close()?;
        }
        Command::Stats => {
            let tree = BPlusTree::open(&cli.file)?;
            println!("root block:    {}", tree.root());
            println!("height:        {}", tree.height());
            println!("total blocks:  {}", tree.total_blocks());
            println!("record size:   {} bytes", tree.layout().record_len);
            println!("leaf capacity: {} records", tree.layout().capacity);
            tree.close()?;
        }
    }
    Ok(())
}

fn format_record(schema: &TableSchema, record: &Record) -> String {
    schema
        .fields()
        .iter()
        .zip(record.values())
        .map(|(field, value)| format!("{}={}", field.name, value))
        .collect::<Vec<_>>()
        .join(", ")
}
