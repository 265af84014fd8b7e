//! Symbol table
//!
//! The global map from qualified name to entity kind, with three side
//! indices kept in lockstep: a segment trie for prefix enumeration, a
//! suffix index for nearest-name lookups, and a simple-name index for
//! O(1) class-by-short-name queries. Qualified names are segmented on both
//! `.` and `::` so Rust-style paths participate in every index.

use crate::core::error::{Error, Result};
use crate::graph::sink::NodeLabel;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// What a qualified name denotes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Project,
    Package,
    Folder,
    File,
    Module,
    Class,
    Interface,
    Enum,
    Function,
    Method,
    ExternalPackage,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        self.label().as_str()
    }

    /// The sink label this kind publishes as.
    pub fn label(&self) -> NodeLabel {
        match self {
            EntityKind::Project => NodeLabel::Project,
            EntityKind::Package => NodeLabel::Package,
            EntityKind::Folder => NodeLabel::Folder,
            EntityKind::File => NodeLabel::File,
            EntityKind::Module => NodeLabel::Module,
            EntityKind::Class => NodeLabel::Class,
            EntityKind::Interface => NodeLabel::Interface,
            EntityKind::Enum => NodeLabel::Enum,
            EntityKind::Function => NodeLabel::Function,
            EntityKind::Method => NodeLabel::Method,
            EntityKind::ExternalPackage => NodeLabel::ExternalPackage,
        }
    }
}

/// Split a qualified name on `.` and `::`.
pub fn qn_segments(qn: &str) -> Vec<&str> {
    qn.split("::")
        .flat_map(|part| part.split('.'))
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Default)]
struct TrieNode {
    children: BTreeMap<String, TrieNode>,
    /// Qualified names terminating at this segment chain (original spelling)
    keys: BTreeSet<String>,
}

impl TrieNode {
    fn collect_keys(&self, out: &mut Vec<String>) {
        out.extend(self.keys.iter().cloned());
        for child in self.children.values() {
            child.collect_keys(out);
        }
    }
}

/// QN → kind map plus prefix trie, suffix index, and simple-name index
#[derive(Default)]
pub struct SymbolTable {
    entries: HashMap<String, EntityKind>,
    trie: TrieNode,
    suffixes: HashMap<String, BTreeSet<String>>,
    simple_names: HashMap<String, BTreeSet<String>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register a qualified name. Idempotent for a repeated `(qn, kind)`
    /// pair; a second registration with a different kind is an invariant
    /// violation and aborts the run.
    pub fn insert(&mut self, qn: &str, kind: EntityKind) -> Result<()> {
        if let Some(existing) = self.entries.get(qn) {
            if *existing == kind {
                return Ok(());
            }
            return Err(Error::SymbolTableInvariant {
                qualified_name: qn.to_string(),
                existing: existing.as_str().to_string(),
                incoming: kind.as_str().to_string(),
            });
        }

        let segments = qn_segments(qn);
        if segments.is_empty() {
            return Ok(());
        }

        self.entries.insert(qn.to_string(), kind);

        let mut node = &mut self.trie;
        for segment in &segments {
            node = node.children.entry((*segment).to_string()).or_default();
        }
        node.keys.insert(qn.to_string());

        for start in 0..segments.len() {
            let suffix = segments[start..].join(".");
            self.suffixes
                .entry(suffix)
                .or_default()
                .insert(qn.to_string());
        }

        let simple = segments[segments.len() - 1].to_string();
        self.simple_names
            .entry(simple)
            .or_default()
            .insert(qn.to_string());

        Ok(())
    }

    pub fn contains(&self, qn: &str) -> bool {
        self.entries.contains_key(qn)
    }

    pub fn get(&self, qn: &str) -> Option<EntityKind> {
        self.entries.get(qn).copied()
    }

    /// All `(qn, kind)` pairs whose names start with `prefix`. Complete
    /// segments match exactly; the final segment of the prefix may be
    /// partial, so `p.m.Cls.push(` enumerates the `push(...)` overloads.
    pub fn find_with_prefix(&self, prefix: &str) -> Vec<(String, EntityKind)> {
        let segments = qn_segments(prefix);
        if segments.is_empty() {
            return Vec::new();
        }

        let mut node = &self.trie;
        for segment in &segments[..segments.len() - 1] {
            match node.children.get(*segment) {
                Some(child) => node = child,
                None => return Vec::new(),
            }
        }

        let last = segments[segments.len() - 1];
        let mut keys = Vec::new();
        for (segment, child) in &node.children {
            if segment.starts_with(last) {
                child.collect_keys(&mut keys);
            }
        }

        keys.sort();
        keys.into_iter()
            .map(|qn| {
                let kind = self.entries[&qn];
                (qn, kind)
            })
            .collect()
    }

    /// All qualified names whose trailing segments equal `suffix` (itself
    /// segmented on `.`/`::`), sorted.
    pub fn find_ending_with(&self, suffix: &str) -> Vec<String> {
        let normalized = qn_segments(suffix).join(".");
        self.suffixes
            .get(&normalized)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// All qualified names whose final segment is `name`.
    pub fn find_by_simple_name(&self, name: &str) -> Vec<String> {
        self.simple_names
            .get(name)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Verify the cross-index invariants; used by tests.
    #[cfg(test)]
    pub fn check_consistency(&self) -> bool {
        for (qn, _) in &self.entries {
            let segments = qn_segments(qn);
            let simple = match segments.last() {
                Some(s) => *s,
                None => return false,
            };

            if !self.find_with_prefix(qn).iter().any(|(k, _)| k == qn) {
                return false;
            }
            if !self.find_by_simple_name(simple).iter().any(|k| k == qn) {
                return false;
            }
            for start in 0..segments.len() {
                let suffix = segments[start..].join(".");
                match self.suffixes.get(&suffix) {
                    Some(set) if set.contains(qn) => {}
                    _ => return false,
                }
            }
        }

        // reverse direction: no index entry without a map entry
        self.suffixes
            .values()
            .chain(self.simple_names.values())
            .all(|set| set.iter().all(|qn| self.entries.contains_key(qn)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SymbolTable {
        let mut t = SymbolTable::new();
        t.insert("proj.models.user.User", EntityKind::Class).unwrap();
        t.insert("proj.models.user.User.get_name", EntityKind::Method)
            .unwrap();
        t.insert("proj.models.user.User.save", EntityKind::Method)
            .unwrap();
        t.insert("proj.services.svc.handler", EntityKind::Function)
            .unwrap();
        t.insert("crate::store::flush", EntityKind::Function).unwrap();
        t
    }

    #[test]
    fn test_insert_is_idempotent_for_same_kind() {
        let mut t = table();
        let before = t.len();
        t.insert("proj.models.user.User", EntityKind::Class).unwrap();
        assert_eq!(t.len(), before);
    }

    #[test]
    fn test_conflicting_kind_is_invariant_violation() {
        let mut t = table();
        let err = t
            .insert("proj.models.user.User", EntityKind::Function)
            .unwrap_err();
        assert!(matches!(err, Error::SymbolTableInvariant { .. }));
    }

    #[test]
    fn test_prefix_enumeration_lists_module_members() {
        let t = table();
        let hits = t.find_with_prefix("proj.models.user");
        let names: Vec<&str> = hits.iter().map(|(qn, _)| qn.as_str()).collect();
        assert_eq!(
            names,
            [
                "proj.models.user.User",
                "proj.models.user.User.get_name",
                "proj.models.user.User.save",
            ]
        );
    }

    #[test]
    fn test_prefix_allows_partial_final_segment() {
        let mut t = table();
        t.insert("proj.models.user.User.save(int,String)", EntityKind::Method)
            .unwrap();
        let hits = t.find_with_prefix("proj.models.user.User.save(");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "proj.models.user.User.save(int,String)");
    }

    #[test]
    fn test_suffix_lookup_spans_separators() {
        let t = table();
        assert_eq!(t.find_ending_with("flush"), ["crate::store::flush"]);
        assert_eq!(
            t.find_ending_with("user.User.save"),
            ["proj.models.user.User.save"]
        );
        assert!(t.find_ending_with("missing").is_empty());
    }

    #[test]
    fn test_simple_name_lookup() {
        let t = table();
        assert_eq!(t.find_by_simple_name("User"), ["proj.models.user.User"]);
        assert_eq!(
            t.find_by_simple_name("save"),
            ["proj.models.user.User.save"]
        );
    }

    #[test]
    fn test_indices_stay_consistent() {
        let t = table();
        assert!(t.check_consistency());
    }
}
