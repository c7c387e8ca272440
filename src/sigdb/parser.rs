//! Parser for the PEiD-format signature database text file (spec.md §4.2, §6).
//!
//! The original's single `SIG` regex (`\[(.*?)\]\s+?signature\s*=\s*(.*?)
//! ((?:\s+\?\?)*)\s*ep_only\s*=\s*(\w+)(?:\s*section_start_only\s*=\s*(\w+)|)`)
//! is kept almost verbatim rather than hand-rolled, since a single anchored
//! pattern is the clearest statement of the grammar and `regex` is already
//! pulled in for the `inspect` tool's `--filter`.

use std::fs;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::sigdb::record::{SignatureRecord, Token};

fn record_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?s)\[(.*?)\]\s+?signature\s*=\s*(.*?)((?:\s+\?\?)*)\s*ep_only\s*=\s*(\w+)(?:\s*section_start_only\s*=\s*(\w+))?",
        )
        .unwrap()
    })
}

/// The database text is documented as latin-1; every byte maps 1:1 onto a
/// Unicode scalar value in that range, so this is a lossless decode.
pub fn read_latin1(path: &str) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(bytes.into_iter().map(|b| b as char).collect())
}

fn line_of(text: &str, byte_pos: usize) -> usize {
    text.as_bytes()[..byte_pos.min(text.len())].iter().filter(|&&b| b == b'\n').count() + 1
}

/// Leading comment lines: a contiguous run of `;`-prefixed lines at the top
/// of the file. Each `;`-separated segment on such a line is one logical
/// comment (spec.md §4.2).
pub fn parse_comments(text: &str) -> Vec<String> {
    let mut comments = Vec::new();
    for line in text.lines() {
        if !line.starts_with(';') {
            break;
        }
        for segment in line.trim_start_matches(';').split(';') {
            comments.push(segment.trim_start_matches(' ').trim_end_matches([' ', '.']).to_string());
        }
    }
    comments
}

/// Parses every `[name] signature = ... ep_only = ... [section_start_only = ...]`
/// record in file order. Does not deduplicate (spec.md §4.2 "Output").
pub fn parse_records(path: &str, text: &str) -> Result<Vec<SignatureRecord>> {
    let mut records = Vec::new();
    for caps in record_re().captures_iter(text) {
        let whole = caps.get(0).unwrap();
        let name = caps[1].to_string();
        let signature = caps[2].replace('\n', " ");
        let trailing = caps.get(3).map(|m| m.as_str()).unwrap_or("");
        let ep_only = &caps[4] == "true";
        let sec_start_only = caps.get(5).map(|m| m.as_str() == "true").unwrap_or(false);

        if ep_only && sec_start_only {
            return Err(Error::DbParse {
                path: path.to_string(),
                line: line_of(text, whole.start()),
                msg: format!("[{name}]: ep_only and section_start_only are mutually exclusive"),
            });
        }

        let bytes: Vec<Token> = signature
            .split_whitespace()
            .map(|tok| {
                Token::parse(tok).ok_or_else(|| Error::DbParse {
                    path: path.to_string(),
                    line: line_of(text, whole.start()),
                    msg: format!("[{name}]: invalid signature token {tok:?}"),
                })
            })
            .collect::<Result<_>>()?;
        if bytes.is_empty() {
            return Err(Error::DbParse {
                path: path.to_string(),
                line: line_of(text, whole.start()),
                msg: format!("[{name}]: signature has no tokens after stripping trailing wildcards"),
            });
        }

        let trailing_wildcards = trailing.split_whitespace().count();

        records.push(SignatureRecord { name, bytes, trailing_wildcards, ep_only, sec_start_only });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_simple_record() {
        let text = "[UPX]\nsignature = 60 BE ?? ?? ?? ?? 8D BE\nep_only = true\n\n";
        let records = parse_records("test.txt", text).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "UPX");
        assert!(records[0].ep_only);
        assert!(!records[0].sec_start_only);
        assert_eq!(records[0].signature_text(), "60 BE ?? ?? ?? ?? 8D BE");
    }

    #[test]
    fn rejects_both_scopes_true() {
        let text = "[Bad]\nsignature = 60 BE\nep_only = true\nsection_start_only = true\n\n";
        let err = parse_records("test.txt", text).unwrap_err();
        assert!(matches!(err, Error::DbParse { .. }));
    }

    #[test]
    fn captures_trailing_wildcards_separately() {
        let text = "[X]\nsignature = 60 BE ?? ??\nep_only = true\n\n";
        let records = parse_records("test.txt", text).unwrap();
        assert_eq!(records[0].bytes.len(), 2);
        assert_eq!(records[0].trailing_wildcards, 2);
    }

    #[test]
    fn wrapped_signature_lines_join_with_a_space_not_nothing() {
        let text = "[UPX]\nsignature = 60 BE\n?? ?? ?? ??\n8D BE\nep_only = true\n\n";
        let records = parse_records("test.txt", text).unwrap();
        assert_eq!(records[0].signature_text(), "60 BE ?? ?? ?? ?? 8D BE");
    }

    #[test]
    fn header_comments_split_on_semicolons() {
        let text = "; first comment ; second comment\n; 2 signatures in list\n\n[A]\nsignature = AB\nep_only = true\n";
        let comments = parse_comments(text);
        assert_eq!(comments, vec!["first comment", "second comment", "2 signatures in list"]);
    }
}
