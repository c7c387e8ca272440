//! Trie cache: serialises the compiled tree to a sidecar JSON file next to
//! the DB text file, and reloads it instead of re-parsing when present
//! (spec.md §4.5). No staleness check is performed.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::Result;
use crate::sigdb::record::Token;
use crate::sigdb::trie::{Node, Trie};

/// `.{dbname_with_dots_as_underscores}[_tw].json`, next to the DB file.
pub fn sidecar_path(db_path: &Path, keep_trailing_wildcards: bool) -> PathBuf {
    let dir = db_path.parent().unwrap_or_else(|| Path::new("."));
    let base = db_path.file_name().and_then(|n| n.to_str()).unwrap_or("userdb.txt").replace('.', "_");
    let suffix = if keep_trailing_wildcards { "_tw" } else { "" };
    dir.join(format!(".{base}{suffix}.json"))
}

fn node_to_value(node: &Node) -> Value {
    let mut map = Map::new();
    for (token, child) in &node.children {
        map.insert(token.to_string(), node_to_value(child));
    }
    if let Some(name) = &node.value {
        map.insert("value".to_string(), Value::String(name.clone()));
    }
    Value::Object(map)
}

fn value_to_node(value: &Value) -> Node {
    let mut node = Node::default();
    if let Value::Object(map) = value {
        for (key, child) in map {
            if key == "value" {
                node.value = child.as_str().map(str::to_string);
            } else if let Some(token) = Token::parse(key) {
                node.children.insert(token, value_to_node(child));
            }
        }
    }
    node
}

pub fn save(path: &Path, trie: &Trie) -> Result<()> {
    let mut root = Map::new();
    root.insert("".to_string(), node_to_value(&trie.anywhere));
    root.insert("ep_only".to_string(), node_to_value(&trie.ep_only));
    root.insert("section_start_only".to_string(), node_to_value(&trie.section_start_only));
    root.insert("max_depth".to_string(), Value::from(trie.max_depth));
    let json = Value::Object(root);
    std::fs::write(path, serde_json::to_vec(&json)?)?;
    Ok(())
}

pub fn load(path: &Path, keep_trailing_wildcards: bool) -> Result<Trie> {
    let bytes = std::fs::read(path)?;
    let json: Value = serde_json::from_slice(&bytes)?;
    let get = |key: &str| json.get(key).cloned().unwrap_or(Value::Object(Map::new()));
    Ok(Trie {
        anywhere: value_to_node(&get("")),
        ep_only: value_to_node(&get("ep_only")),
        section_start_only: value_to_node(&get("section_start_only")),
        max_depth: json.get("max_depth").and_then(Value::as_u64).unwrap_or(0) as usize,
        keep_trailing_wildcards,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sigdb::record::{SignatureRecord, Token as Tok};

    #[test]
    fn round_trips_through_json() {
        let records = vec![SignatureRecord {
            name: "UPX".to_string(),
            bytes: vec![Tok::Byte(0x60), Tok::Byte(0xBE), Tok::Wildcard],
            trailing_wildcards: 0,
            ep_only: true,
            sec_start_only: false,
        }];
        let trie = Trie::build(&records, false);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".cache.json");
        save(&path, &trie).unwrap();
        let loaded = load(&path, false).unwrap();
        assert_eq!(loaded, trie);
    }

    #[test]
    fn sidecar_name_replaces_dots_and_tags_trailing_wildcards() {
        let p = sidecar_path(Path::new("/db/userdb.txt"), false);
        assert_eq!(p, Path::new("/db/.userdb_txt.json"));
        let p = sidecar_path(Path::new("/db/userdb.txt"), true);
        assert_eq!(p, Path::new("/db/.userdb_txt_tw.json"));
    }
}
