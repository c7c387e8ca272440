//! `inspect` — list signatures in a database, optionally filtered by a regex.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use peid::SignatureDb;

#[derive(Parser)]
#[command(name = "inspect", about = "Inspect a database of PEiD signatures")]
struct Args {
    /// Path to the custom database of signatures
    #[arg(short, long, default_value = peid::DEFAULT_DB)]
    db: PathBuf,

    /// Pattern for filtering signatures by name
    #[arg(short, long)]
    filter: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let db = match SignatureDb::open(&args.db) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let matched: Vec<_> = match &args.filter {
        Some(pattern) => match db.filter(pattern) {
            Ok(records) => records,
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => db.records().collect(),
    };

    let mut count = 0;
    for record in &matched {
        println!("[{}]", record.name);
        println!("signature = {}", record.signature_text());
        println!("ep_only = {}", record.ep_only);
        if record.sec_start_only {
            println!("section_start_only = {}", record.sec_start_only);
        }
        println!();
        count += 1;
    }
    println!("{count} signatures filtered");
    ExitCode::SUCCESS
}
