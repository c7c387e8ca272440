//! `authoring` — derive a PEiD-format entry-point signature from samples.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use peid::sigdb::record::Token;
use peid::sigdb::{AuthoringOptions, SignatureDb};

#[derive(Parser)]
#[command(name = "authoring", about = "Create a PEiD signature from sample packed binaries")]
struct Args {
    /// Path(s) to packed sample executables
    #[arg(required = true)]
    path: Vec<PathBuf>,

    /// Minimum length of bytes to be considered for the signature
    #[arg(short = 'm', long = "min-length", default_value_t = 16)]
    min_length: usize,

    /// Maximum length of bytes to be considered for the signature
    #[arg(short = 'M', long = "max-length", default_value_t = 64)]
    max_length: usize,

    /// Proportion of common bytes to be considered from the samples
    #[arg(short = 't', long = "bytes-threshold", default_value_t = 0.5)]
    bytes_threshold: f64,

    /// Packer name for the new signature
    #[arg(short = 'p', long)]
    packer: Option<String>,

    /// Packer version to be mentioned in the signature
    #[arg(short = 'v', long)]
    version: Option<String>,

    /// Author of the signature
    #[arg(short = 'a', long)]
    author: Option<String>,

    /// Target signatures database; when present, the signature is appended and the DB is rewritten
    #[arg(short = 'd', long)]
    db: Option<PathBuf>,

    /// Display debug information
    #[arg(long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = if args.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    env_logger::Builder::new().filter_level(level).init();

    let paths: Vec<String> = args.path.iter().map(|p| p.to_string_lossy().to_string()).collect();
    let opts = AuthoringOptions { min_length: args.min_length, max_length: args.max_length, threshold: args.bytes_threshold };
    let signature = match peid::find_ep_only_signature(&paths, &opts) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[ERROR] {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(packer) = &args.packer {
        let mut name = packer.clone();
        if let Some(v) = &args.version {
            name.push(' ');
            name.push_str(v);
        }
        if let Some(a) = &args.author {
            name.push_str(" -> ");
            name.push_str(a);
        }
        if let Some(db_path) = &args.db {
            let tokens: Vec<Token> = signature.split_whitespace().map(|t| Token::parse(t).unwrap()).collect();
            let mut db = SignatureDb::open(db_path).unwrap_or_else(|_| {
                std::fs::write(db_path, "; 0 signatures in list\n").ok();
                SignatureDb::open(db_path).expect("freshly written database must parse")
            });
            if let Err(e) = db.set(packer, tokens, true, false, args.author.as_deref(), args.version.as_deref()) {
                eprintln!("error: {e}");
                return ExitCode::FAILURE;
            }
            if let Err(e) = db.dump(None) {
                eprintln!("error: {e}");
                return ExitCode::FAILURE;
            }
        }
        println!("[{name}]\nsignature = {signature}\nep_only = true");
    } else {
        println!("{signature}");
    }
    ExitCode::SUCCESS
}
