//! cartograph - multi-language code-graph indexing
//!
//! Parses a repository with tree-sitter grammars and materialises a typed
//! property graph of its structure: packages, modules, classes, functions,
//! methods, files, external dependencies, and the relationships between
//! them, with call edges resolved across files through flow-insensitive
//! type inference.

pub mod core;
pub mod graph;
pub mod lang;
pub mod parse;

pub use core::config::IndexConfig;
pub use core::error::{Error, Result};
pub use graph::driver::{BuildStats, GraphBuilder};
pub use graph::sink::{GraphSink, MemorySink, NodeLabel, RelKind};
pub use lang::Lang;
