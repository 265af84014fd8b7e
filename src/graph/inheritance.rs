//! Inheritance map
//!
//! Class QN → ordered parent QNs, with breadth-first member lookup over the
//! hierarchy. Parent order is declaration order, so the first parent wins
//! for diamond hierarchies; the visited set keeps cycles terminating.

use crate::graph::symbols::{EntityKind, SymbolTable};
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Default)]
pub struct InheritanceMap {
    parents: HashMap<String, Vec<String>>,
}

impl InheritanceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, class_qn: &str, parent_qn: &str) {
        let entry = self.parents.entry(class_qn.to_string()).or_default();
        if !entry.iter().any(|p| p == parent_qn) {
            entry.push(parent_qn.to_string());
        }
    }

    pub fn parents(&self, class_qn: &str) -> Option<&[String]> {
        self.parents.get(class_qn).map(Vec::as_slice)
    }

    pub fn contains(&self, class_qn: &str) -> bool {
        self.parents.contains_key(class_qn)
    }

    /// Look up `member` on the ancestors of `class_qn`, breadth-first in
    /// declaration order.
    pub fn resolve_inherited(
        &self,
        class_qn: &str,
        member: &str,
        symbols: &SymbolTable,
    ) -> Option<(EntityKind, String)> {
        let direct = self.parents.get(class_qn)?;
        let mut queue: VecDeque<&str> = direct.iter().map(String::as_str).collect();
        let mut visited: HashSet<&str> = queue.iter().copied().collect();

        while let Some(parent_qn) = queue.pop_front() {
            let member_qn = format!("{parent_qn}.{member}");
            if let Some(kind) = symbols.get(&member_qn) {
                return Some((kind, member_qn));
            }

            if let Some(grandparents) = self.parents.get(parent_qn) {
                for gp in grandparents {
                    if visited.insert(gp.as_str()) {
                        queue.push_back(gp.as_str());
                    }
                }
            }
        }

        None
    }
}
