//! `identify` — look up the packer(s)/compiler used by one or more PE files.
//!
//! Thin CLI wrapper around [`peid::identify_packer`]; cosmetic stripping of
//! author/version annotations from matched names lives here, not in the
//! core (spec.md §1 "out of scope... cosmetic post-processing").

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::OnceLock;
use std::time::Instant;

use clap::Parser;
use regex::Regex;

#[derive(Parser)]
#[command(name = "identify", about = "Identify the packer/compiler used in a PE binary")]
struct Args {
    /// Path(s) to the executable(s)
    #[arg(required = true)]
    path: Vec<PathBuf>,

    /// Path to the custom database of signatures
    #[arg(short, long, default_value = peid::DEFAULT_DB)]
    db: PathBuf,

    /// Only consider signatures from the entry point
    #[arg(short = 'e', long = "ep-only", conflicts_with = "section_start_only")]
    ep_only: bool,

    /// Consider only signatures from section starts
    #[arg(short = 's', long = "section-start-only")]
    section_start_only: bool,

    /// Match only the first signature found
    #[arg(short = 'm', long = "match-once")]
    match_once: bool,

    /// Include author annotation in the result
    #[arg(short = 'a', long)]
    author: bool,

    /// Include version annotation in the result
    #[arg(short = 'v', long)]
    version: bool,

    /// Enable benchmarking, output in seconds
    #[arg(short = 'b', long)]
    benchmark: bool,

    /// Display debug information
    #[arg(long)]
    verbose: bool,
}

fn author_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*-(-?>|\s*by)\s*(.*)$").unwrap())
}

fn strip_author(name: &str) -> String {
    author_re().replace(name, "").to_string()
}

fn version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let ver = r"\s*([vV](ersion)?|R)?\s?(20)?\d{1,2}(\.[xX0-9]{1,3}([a-z]?\d)?){0,3}[a-zA-Z+]?(\s*\(?(\s*([Aa]lpha|[Bb]eta|final|lite|LITE|osCE|Demo|DEMO)){1,2}(\s*[a-z]?\d)?\)?)?";
        Regex::new(&format!(r"^(.*?)\s+{ver}(\s*[-_/~]{ver}){{0,3}}(\s+\(unregistered\))?$")).unwrap()
    })
}

fn trailing_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+\d+(\s+SE)?$").unwrap())
}

fn strip_version(name: &str) -> String {
    let stripped = version_re().replace(name, "$1").to_string();
    trailing_number_re().replace(&stripped, "").to_string()
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = if args.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    env_logger::Builder::new().filter_level(level).init();

    let t0 = Instant::now();
    let paths: Vec<String> = args.path.iter().map(|p| p.to_string_lossy().to_string()).collect();
    let results = match peid::identify_packer(
        &paths,
        &args.db,
        args.ep_only,
        args.section_start_only,
        !args.match_once,
    ) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let multi = results.len() > 1;
    for (path, names) in &results {
        let mut names: Vec<String> = names.clone();
        if !args.author {
            names = names.iter().map(|n| strip_author(n)).collect();
        }
        if !args.version {
            names = names.iter().map(|n| strip_version(n)).collect();
        }
        if multi {
            println!("{path} {}", names.join(","));
        } else if !names.is_empty() {
            println!("{}", names.join("\n"));
        }
    }
    if args.benchmark {
        println!("{}", t0.elapsed().as_secs_f64());
    }
    ExitCode::SUCCESS
}
