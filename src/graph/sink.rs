//! Graph sink protocol
//!
//! The pipeline publishes results through two operations: `ensure_node`
//! upserts a node by its primary key, `ensure_relationship` asserts a
//! directed edge between two `(label, key_field, key_value)` specs. The
//! sink batches and deduplicates; the pipeline emits ensure-requests
//! liberally and never reads back.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Node property bag
pub type Properties = Map<String, Value>;

/// Fixed node vocabulary; each label has a fixed primary-key field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum NodeLabel {
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

impl NodeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::Project => "Project",
            NodeLabel::Package => "Package",
            NodeLabel::Folder => "Folder",
            NodeLabel::File => "File",
            NodeLabel::Module => "Module",
            NodeLabel::Class => "Class",
            NodeLabel::Interface => "Interface",
            NodeLabel::Enum => "Enum",
            NodeLabel::Function => "Function",
            NodeLabel::Method => "Method",
            NodeLabel::ExternalPackage => "ExternalPackage",
        }
    }

    /// The property that uniquely keys nodes of this label.
    pub fn key_field(&self) -> &'static str {
        match self {
            NodeLabel::Project | NodeLabel::ExternalPackage => "name",
            NodeLabel::Folder | NodeLabel::File => "path",
            _ => "qualified_name",
        }
    }
}

impl std::fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed relationship vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RelKind {
    ContainsPackage,
    ContainsFolder,
    ContainsFile,
    Defines,
    Inherits,
    Imports,
    Calls,
    DependsOnExternal,
}

impl RelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelKind::ContainsPackage => "CONTAINS_PACKAGE",
            RelKind::ContainsFolder => "CONTAINS_FOLDER",
            RelKind::ContainsFile => "CONTAINS_FILE",
            RelKind::Defines => "DEFINES",
            RelKind::Inherits => "INHERITS",
            RelKind::Imports => "IMPORTS",
            RelKind::Calls => "CALLS",
            RelKind::DependsOnExternal => "DEPENDS_ON_EXTERNAL",
        }
    }
}

impl std::fmt::Display for RelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `(label, key_field, key_value)` endpoint spec
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeRef {
    pub label: NodeLabel,
    pub key: String,
}

impl NodeRef {
    pub fn new(label: NodeLabel, key: impl Into<String>) -> Self {
        Self {
            label,
            key: key.into(),
        }
    }
}

/// Destination for the pipeline's output
pub trait GraphSink {
    fn ensure_node(&mut self, label: NodeLabel, properties: Properties);

    fn ensure_relationship(
        &mut self,
        from: NodeRef,
        rel: RelKind,
        to: NodeRef,
        properties: Option<Properties>,
    );

    /// Called once after pass 2; batching sinks commit here.
    fn flush(&mut self) {}
}

/// Build a property bag from `(key, value)` pairs.
pub fn props<const N: usize>(pairs: [(&str, Value); N]) -> Properties {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

// =============================================================================
// MEMORY SINK
// =============================================================================

/// A recorded relationship
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct RelRecord {
    pub from: NodeRef,
    pub rel: RelKind,
    pub to: NodeRef,
}

/// In-memory sink: deduplicates nodes by `(label, key)` merging properties,
/// keeps relationships in emission order alongside a multiset count.
#[derive(Default)]
pub struct MemorySink {
    nodes: BTreeMap<(NodeLabel, String), Properties>,
    relationships: Vec<RelRecord>,
    rel_counts: BTreeMap<RelRecord, usize>,
    flushed: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    pub fn was_flushed(&self) -> bool {
        self.flushed
    }

    pub fn has_node(&self, label: NodeLabel, key: &str) -> bool {
        self.nodes.contains_key(&(label, key.to_string()))
    }

    pub fn node_property(&self, label: NodeLabel, key: &str, field: &str) -> Option<&Value> {
        self.nodes.get(&(label, key.to_string()))?.get(field)
    }

    pub fn nodes_with_label(&self, label: NodeLabel) -> Vec<&str> {
        self.nodes
            .keys()
            .filter(|(l, _)| *l == label)
            .map(|(_, k)| k.as_str())
            .collect()
    }

    pub fn has_relationship(&self, from_key: &str, rel: RelKind, to_key: &str) -> bool {
        self.relationships
            .iter()
            .any(|r| r.rel == rel && r.from.key == from_key && r.to.key == to_key)
    }

    pub fn relationships_of(&self, rel: RelKind) -> Vec<&RelRecord> {
        self.relationships.iter().filter(|r| r.rel == rel).collect()
    }

    /// Every relationship in emission order.
    pub fn relationship_sequence(&self) -> &[RelRecord] {
        &self.relationships
    }

    /// Deduplicated node keys plus the relationship multiset; the identity
    /// compared by idempotence tests.
    pub fn fingerprint(&self) -> (Vec<(NodeLabel, String)>, BTreeMap<RelRecord, usize>) {
        (
            self.nodes.keys().cloned().collect(),
            self.rel_counts.clone(),
        )
    }

    /// Serialise the whole graph as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        let nodes: Vec<Value> = self
            .nodes
            .iter()
            .map(|((label, key), properties)| {
                serde_json::json!({
                    "label": label.as_str(),
                    "key": key,
                    "properties": properties,
                })
            })
            .collect();
        let relationships: Vec<Value> = self
            .relationships
            .iter()
            .map(|r| {
                serde_json::json!({
                    "from": { "label": r.from.label.as_str(), "key": r.from.key },
                    "type": r.rel.as_str(),
                    "to": { "label": r.to.label.as_str(), "key": r.to.key },
                })
            })
            .collect();
        serde_json::json!({ "nodes": nodes, "relationships": relationships })
    }
}

impl GraphSink for MemorySink {
    fn ensure_node(&mut self, label: NodeLabel, properties: Properties) {
        let Some(key) = properties
            .get(label.key_field())
            .and_then(Value::as_str)
            .map(str::to_string)
        else {
            tracing::warn!(label = %label, "ensure_node missing key field; dropped");
            return;
        };
        self.nodes
            .entry((label, key))
            .or_default()
            .extend(properties);
    }

    fn ensure_relationship(
        &mut self,
        from: NodeRef,
        rel: RelKind,
        to: NodeRef,
        _properties: Option<Properties>,
    ) {
        let record = RelRecord { from, rel, to };
        *self.rel_counts.entry(record.clone()).or_insert(0) += 1;
        self.relationships.push(record);
    }

    fn flush(&mut self) {
        self.flushed = true;
    }
}
