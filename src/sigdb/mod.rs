//! Signature database: parsing, the wildcard-aware trie, its sidecar cache,
//! authoring, and the mutable DB writer (spec.md §2 components 2-6).

pub mod authoring;
pub mod cache;
pub mod db;
pub mod parser;
pub mod record;
pub mod trie;

use std::path::Path;

use log::error;

pub use authoring::{find_ep_only_signature, AuthoringOptions};
pub use db::SignatureDb;
pub use record::{Scope, SignatureRecord, Token};
pub use trie::Trie;

use crate::error::{Error, Result};
use crate::exe::open_exe;

/// Opens `db_path` through the cache-or-parse path described in spec.md §4.5:
/// reload the sidecar if present, otherwise parse the text DB, build the
/// trie, and write the sidecar back out.
pub fn open_trie(db_path: &Path, keep_trailing_wildcards: bool) -> Result<Trie> {
    let sidecar = cache::sidecar_path(db_path, keep_trailing_wildcards);
    if sidecar.exists() {
        return cache::load(&sidecar, keep_trailing_wildcards);
    }
    if !db_path.exists() {
        std::fs::write(db_path, "; 0 signatures in list\n")?;
    }
    let text = parser::read_latin1(db_path.to_string_lossy().as_ref())?;
    let records = parser::parse_records(db_path.to_string_lossy().as_ref(), &text)?;
    let trie = Trie::build(&records, keep_trailing_wildcards);
    cache::save(&sidecar, &trie)?;
    Ok(trie)
}

/// Identifies the packer(s) used in each of `paths` against `db_path`
/// (spec.md §4.4 "identify_packer dispatch"). A per-file failure is
/// recorded as an empty match list for that path rather than aborting the
/// batch (spec.md §7).
pub fn identify_packer(
    paths: &[String],
    db_path: &Path,
    ep_only: bool,
    sec_start_only: bool,
    match_all: bool,
) -> Result<Vec<(String, Vec<String>)>> {
    if ep_only && sec_start_only {
        return Err(Error::ConflictingScopes);
    }
    let trie = open_trie(db_path, false)?;
    let scope = if ep_only {
        Scope::EpOnly
    } else if sec_start_only {
        Scope::SectionStartOnly
    } else {
        Scope::Anywhere
    };

    let mut results = Vec::with_capacity(paths.len());
    for path in paths {
        let matches = match identify_one(path, &trie, scope, match_all) {
            Ok(m) => m,
            Err(e) => {
                error!("{path}: {e}");
                Vec::new()
            }
        };
        results.push((path.clone(), matches));
    }
    Ok(results)
}

fn identify_one(path: &str, trie: &Trie, scope: Scope, match_all: bool) -> Result<Vec<String>> {
    let mut exe = open_exe(path)?;
    let offsets: Vec<u64> = match scope {
        Scope::EpOnly => vec![exe.entrypoint_offset()?],
        Scope::SectionStartOnly => exe.sections_offsets()?,
        Scope::Anywhere => Vec::new(),
    };
    let mut matches = Vec::new();
    exe.for_each_window(trie.max_depth, &offsets, |_, window| {
        if match_all {
            matches.extend(trie.match_window(scope, window));
            Ok(true)
        } else if let Some(deepest) = trie.match_window_deepest(scope, window) {
            matches.push(deepest);
            Ok(false)
        } else {
            Ok(true)
        }
    })?;
    Ok(matches)
}
