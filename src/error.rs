//! Crate-wide error type.
//!
//! Grounded on `goblin`'s `error.rs` (a single enum covering every failure
//! mode the parser surface can produce) but expressed with `thiserror`
//! instead of `quick_error`, matching how the rest of the pack wraps
//! `goblin`-adjacent PE parsing failures (see the `.orsig` PE signature
//! extractor, which derives `Error` with `#[error(...)]`/`#[from]` rather
//! than hand-writing `Display`).

use std::io;
use std::result;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Not a recognized MZ/PE format; recoverable, the dispatcher tries the next format.
    #[error("invalid magic number in {path}")]
    InvalidMagic { path: String },

    /// Entry-point RVA falls outside every section.
    #[error("entry point (0x{rva:08x}) offset is outside sections (file size: 0x{file_size:08x})")]
    MalformedPe { rva: u64, file_size: u64 },

    #[error("{path}:{line}: {msg}")]
    DbParse { path: String, line: usize, msg: String },

    #[error("could not find a suitable signature among {count} sample(s)")]
    NoSignatureFound { count: usize },

    #[error("failed to (de)serialize trie cache: {0}")]
    Cache(#[from] serde_json::Error),

    #[error("scroll error: {0}")]
    Scroll(#[from] scroll::Error),

    #[error("invalid filter pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("ep_only and section_start_only are mutually exclusive")]
    ConflictingScopes,
}

pub type Result<T> = result::Result<T, Error>;
