//! Mutable signature database: DB Writer operations (spec.md §3, §4.7).
//!
//! Unlike [`crate::sigdb::trie::Trie`] (read-only, built for fast matching),
//! `SignatureDb` is the heavier, record-oriented view used by authoring and
//! inspection tooling — the split mirrors the original's own
//! `SignaturesTree` (matching) vs `SignaturesDB` (editing) classes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::Result;
use crate::sigdb::parser;
use crate::sigdb::record::{SignatureRecord, Token};

fn full_key(record: &SignatureRecord) -> Vec<Token> {
    record.tree_tokens(true)
}

#[derive(Debug, Clone)]
pub struct SignatureDb {
    pub path: PathBuf,
    pub comments: Vec<String>,
    records: BTreeMap<Vec<Token>, SignatureRecord>,
}

impl SignatureDb {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let text = parser::read_latin1(path.to_string_lossy().as_ref())?;
        let comments = parser::parse_comments(&text);
        let mut records = BTreeMap::new();
        // later records with an identical key supersede earlier ones (spec.md §3).
        for record in parser::parse_records(path.to_string_lossy().as_ref(), &text)? {
            records.insert(full_key(&record), record);
        }
        Ok(SignatureDb { path, comments, records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &SignatureRecord> {
        self.records.values()
    }

    /// Names present in `other` but absent from `self`, keyed by signature bytes.
    pub fn compare<'a>(&self, other: &'a SignatureDb) -> Vec<&'a str> {
        other
            .records
            .iter()
            .filter(|(key, _)| !self.records.contains_key(*key))
            .map(|(_, r)| r.name.as_str())
            .collect()
    }

    /// Records whose name matches `pattern`, for the `inspect` tool's `--filter`.
    pub fn filter(&self, pattern: &str) -> Result<Vec<&SignatureRecord>> {
        let re = Regex::new(pattern)?;
        Ok(self.records.values().filter(|r| re.is_match(&r.name)).collect())
    }

    fn set_tally_comment(&mut self) {
        let tally = format!("{} signatures in list", self.records.len());
        match self.comments.iter_mut().find(|c| c.ends_with("signatures in list")) {
            Some(c) => *c = tally,
            None => self.comments.push(tally),
        }
    }

    /// Add/update a signature, overwriting on key collision (spec.md §4.7).
    pub fn set(
        &mut self,
        packer: &str,
        bytes: Vec<Token>,
        ep_only: bool,
        sec_start_only: bool,
        author: Option<&str>,
        version: Option<&str>,
    ) -> Result<()> {
        if ep_only && sec_start_only {
            return Err(crate::error::Error::DbParse {
                path: self.path.to_string_lossy().to_string(),
                line: 0,
                msg: "ep_only and section_start_only are mutually exclusive".to_string(),
            });
        }
        let mut name = packer.to_string();
        if let Some(v) = version {
            name.push(' ');
            name.push_str(v);
        }
        if let Some(a) = author {
            name.push_str(" -> ");
            name.push_str(a);
        }
        let record = SignatureRecord { name, bytes, trailing_wildcards: 0, ep_only, sec_start_only };
        self.records.insert(full_key(&record), record);
        self.set_tally_comment();
        Ok(())
    }

    /// Merge other databases' signatures into this one, keeping only new keys,
    /// and rewrite `comments` to a merge banner (spec.md §4.7).
    pub fn merge(&mut self, dbs: &[SignatureDb], merged_on: &str) {
        let mut comments = vec![format!("Merged with peid on {merged_on}")];
        if !self.records.is_empty() {
            let name = self.path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
            comments.push(format!(" - {name}"));
        }
        for db in dbs {
            let mut added = false;
            for (key, record) in &db.records {
                if !self.records.contains_key(key) {
                    self.records.insert(key.clone(), record.clone());
                    added = true;
                }
            }
            if added {
                let name = db.path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
                comments.push(format!(" - {name}"));
            }
        }
        self.comments = comments;
        self.set_tally_comment();
    }

    /// Serialise back to PEiD text format, records in ascending name order (spec.md §4.7).
    pub fn dump(&self, path: Option<&Path>) -> Result<()> {
        let mut out = String::new();
        for comment in &self.comments {
            out.push_str("; ");
            out.push_str(comment);
            out.push('\n');
        }
        out.push('\n');
        let mut records: Vec<&SignatureRecord> = self.records.values().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        for record in records {
            out.push('[');
            out.push_str(&record.name);
            out.push_str("]\nsignature = ");
            out.push_str(&record.signature_text());
            out.push_str(&format!("\nep_only = {}\n", record.ep_only));
            if record.sec_start_only {
                out.push_str(&format!("section_start_only = {}\n", record.sec_start_only));
            }
            out.push('\n');
        }
        std::fs::write(path.unwrap_or(&self.path), out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_db(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("userdb.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn dump_then_reopen_round_trips_records() {
        let (_dir, path) = write_db(
            "; 1 signatures in list\n\n[UPX]\nsignature = 60 BE ?? ?? ?? ?? 8D BE\nep_only = true\n\n",
        );
        let db = SignatureDb::open(&path).unwrap();
        assert_eq!(db.len(), 1);
        let dump_path = path.with_file_name("dumped.txt");
        db.dump(Some(&dump_path)).unwrap();
        let reopened = SignatureDb::open(&dump_path).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.records().next().unwrap().name, "UPX");
    }

    #[test]
    fn set_rejects_conflicting_scopes() {
        let (_dir, path) = write_db("; 0 signatures in list\n\n");
        let mut db = SignatureDb::open(&path).unwrap();
        let err = db.set("X", vec![Token::Byte(1)], true, true, None, None).unwrap_err();
        assert!(matches!(err, crate::error::Error::DbParse { .. }));
    }

    #[test]
    fn set_appends_version_and_author_and_updates_tally() {
        let (_dir, path) = write_db("; 0 signatures in list\n\n");
        let mut db = SignatureDb::open(&path).unwrap();
        db.set("Packer", vec![Token::Byte(0xAB)], true, false, Some("someone"), Some("v1.0")).unwrap();
        let record = db.records().next().unwrap();
        assert_eq!(record.name, "Packer v1.0 -> someone");
        assert_eq!(db.comments.last().unwrap(), "1 signatures in list");
    }

    #[test]
    fn compare_yields_names_only_present_in_other() {
        let (_dir, a) = write_db("; 1 signatures in list\n\n[A]\nsignature = AB\nep_only = true\n\n");
        let (_dir2, b) = write_db(
            "; 2 signatures in list\n\n[A]\nsignature = AB\nep_only = true\n\n[B]\nsignature = CD\nep_only = true\n\n",
        );
        let db_a = SignatureDb::open(&a).unwrap();
        let db_b = SignatureDb::open(&b).unwrap();
        assert_eq!(db_a.compare(&db_b), vec!["B"]);
    }

    #[test]
    fn merge_brings_in_only_unseen_signatures_and_banners_the_date() {
        let (_dir, a) = write_db("; 1 signatures in list\n\n[A]\nsignature = AB\nep_only = true\n\n");
        let (_dir2, b) = write_db(
            "; 2 signatures in list\n\n[A]\nsignature = AB\nep_only = true\n\n[B]\nsignature = CD\nep_only = true\n\n",
        );
        let mut db_a = SignatureDb::open(&a).unwrap();
        let db_b = SignatureDb::open(&b).unwrap();
        let today = chrono::Local::now().format("%B %d, %Y").to_string();
        db_a.merge(&[db_b], &today);
        assert_eq!(db_a.len(), 2);
        assert_eq!(db_a.comments[0], format!("Merged with peid on {today}"));
        assert_eq!(db_a.comments.last().unwrap(), "2 signatures in list");
    }
}
