//! Wildcard-aware prefix tree over hex-byte tokens (spec.md §4.3, §4.4).
//!
//! Three independent roots, one per [`Scope`], collapse shared signature
//! prefixes to O(L) matching with branching only at `??` positions — the
//! same shape goblin uses a prefix/section walk for locating an RVA, just
//! specialised here to bytes-with-wildcards instead of address ranges.

use std::collections::BTreeMap;

use crate::sigdb::record::{Scope, SignatureRecord, Token};

/// A node in the trie: children keyed by token, plus an optional terminal signature name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    pub children: BTreeMap<Token, Node>,
    pub value: Option<String>,
}

impl Node {
    fn insert(&mut self, tokens: &[Token], name: &str) {
        match tokens.split_first() {
            None => self.value = Some(name.to_string()),
            Some((head, rest)) => self.children.entry(*head).or_default().insert(rest, name),
        }
    }
}

/// The compiled search tree: one root per scope, plus the deepest signature's token count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trie {
    pub ep_only: Node,
    pub section_start_only: Node,
    pub anywhere: Node,
    pub max_depth: usize,
    pub keep_trailing_wildcards: bool,
}

impl Trie {
    pub fn build(records: &[SignatureRecord], keep_trailing_wildcards: bool) -> Trie {
        let mut trie = Trie { keep_trailing_wildcards, ..Default::default() };
        for record in records {
            let tokens = record.tree_tokens(keep_trailing_wildcards);
            trie.max_depth = trie.max_depth.max(tokens.len());
            let root = trie.root_mut(record.scope());
            root.insert(&tokens, &record.name);
        }
        trie
    }

    pub fn root(&self, scope: Scope) -> &Node {
        match scope {
            Scope::EpOnly => &self.ep_only,
            Scope::SectionStartOnly => &self.section_start_only,
            Scope::Anywhere => &self.anywhere,
        }
    }

    fn root_mut(&mut self, scope: Scope) -> &mut Node {
        match scope {
            Scope::EpOnly => &mut self.ep_only,
            Scope::SectionStartOnly => &mut self.section_start_only,
            Scope::Anywhere => &mut self.anywhere,
        }
    }

    /// Matches `window` against `scope`'s root. The `??` branch is explored
    /// before the exact-byte branch (spec.md §4.4 step 2-3), so every
    /// wildcard-expansion of a prefix is considered; a match is reported at
    /// every terminal node reached along any path, not only the deepest.
    pub fn match_window(&self, scope: Scope, window: &[u8]) -> Vec<String> {
        let mut matches = Vec::new();
        visit(self.root(scope), window, 0, &mut matches);
        matches.into_iter().map(|(_, name)| name).collect()
    }

    /// Same as [`Trie::match_window`], but only the deepest match wins —
    /// depth is the number of tokens consumed to reach the terminal, not
    /// the order a depth-first visit happened to report it in (the
    /// wildcard branch is always explored first, so a shallow literal
    /// match can be appended after a deeper wildcard match). Ties at equal
    /// depth keep the last one visited.
    pub fn match_window_deepest(&self, scope: Scope, window: &[u8]) -> Option<String> {
        let mut matches = Vec::new();
        visit(self.root(scope), window, 0, &mut matches);
        let mut best: Option<(usize, String)> = None;
        for (depth, name) in matches {
            if best.as_ref().map_or(true, |(d, _)| depth >= *d) {
                best = Some((depth, name));
            }
        }
        best.map(|(_, name)| name)
    }
}

fn visit(node: &Node, window: &[u8], depth: usize, matches: &mut Vec<(usize, String)>) {
    if let Some(name) = &node.value {
        matches.push((depth, name.clone()));
    }
    if window.is_empty() {
        return;
    }
    if let Some(child) = node.children.get(&Token::Wildcard) {
        visit(child, &window[1..], depth + 1, matches);
    }
    let byte_token = Token::Byte(window[0]);
    if let Some(child) = node.children.get(&byte_token) {
        visit(child, &window[1..], depth + 1, matches);
    }
}
