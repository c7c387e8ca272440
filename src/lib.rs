//! Identifies the packer or compiler that produced a Windows PE binary by
//! matching it against a database of PEiD-format byte signatures.
//!
//! The crate is split the way the problem naturally decomposes (spec.md §2,
//! leaves first): a minimal [`exe`] reader locates the offsets worth
//! scanning, [`sigdb`] parses the signature database, compiles it into a
//! wildcard-aware trie, caches the compiled trie, and matches byte windows
//! against it. [`sigdb::identify_packer`] and
//! [`sigdb::find_ep_only_signature`] are the two entry points external
//! tooling is expected to call; the `identify`/`authoring`/`inspect`
//! binaries under `src/bin/` are thin wrappers around them.

pub mod error;
pub mod exe;
pub mod sigdb;

pub use error::{Error, Result};
pub use exe::{open_exe, Exe};
pub use sigdb::{find_ep_only_signature, identify_packer, SignatureDb};

/// Path to the embedded default signature database, shipped next to this crate's sources.
///
/// Treated as configuration injected into each call, never a global
/// singleton, so tests can point at fixture databases in parallel
/// (spec.md §9 "Global state").
pub const DEFAULT_DB: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/db/userdb.txt");
