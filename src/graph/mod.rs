//! Code-graph construction
//!
//! Everything between parsed ASTs and the graph sink: the symbol table and
//! its side indices, the import and inheritance maps, the three passes
//! (structure, definitions, calls), and the type-inference engine the call
//! resolver leans on.

pub mod calls;
pub mod cpp;
pub mod definitions;
pub mod driver;
pub mod imports;
pub mod infer;
pub mod inheritance;
pub mod sink;
pub mod structure;
pub mod symbols;

use crate::lang::Lang;
use crate::parse::AstCache;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Query, QueryCursor};

use imports::ImportMap;
use inheritance::InheritanceMap;
use symbols::SymbolTable;

/// Everything pass 1 produces and pass 2 reads. Owned by the driver;
/// read-only once call processing starts.
#[derive(Default)]
pub struct CodeIndex {
    pub symbols: SymbolTable,
    pub imports: ImportMap,
    pub inheritance: InheritanceMap,
    /// module QN → repo-relative file path, for AST-cache round trips
    pub module_files: BTreeMap<String, PathBuf>,
}

impl CodeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locate the cached AST backing a module.
    pub fn ast_for_module<'c>(
        &self,
        module_qn: &str,
        cache: &'c AstCache,
    ) -> Option<&'c crate::parse::ParsedFile> {
        let path = self.module_files.get(module_qn)?;
        cache.get(path)
    }
}

/// Compute a file's module QN: project name plus the relative path without
/// extension. Root-module files (`__init__.py`, `mod.rs`) collapse to the
/// directory QN.
pub fn module_qn_for(project_name: &str, relative: &Path, lang: Lang) -> String {
    let file_name = relative
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let stripped = if lang.is_root_module_file(&file_name) {
        relative.parent().unwrap_or(Path::new("")).to_path_buf()
    } else {
        relative.with_extension("")
    };

    let mut parts = vec![project_name.to_string()];
    parts.extend(
        stripped
            .components()
            .filter_map(|c| c.as_os_str().to_str().map(str::to_string)),
    );
    parts.join(".")
}

/// Convert a simple class name to a fully qualified one: import alias,
/// same module, enclosing modules, then suffix-index fallback.
pub fn resolve_class_name(
    class_name: &str,
    module_qn: &str,
    imports: &ImportMap,
    symbols: &SymbolTable,
) -> Option<String> {
    if let Some(imported) = imports.lookup(module_qn, class_name) {
        return Some(imported.to_string());
    }

    let same_module = format!("{module_qn}.{class_name}");
    if symbols.contains(&same_module) {
        return Some(same_module);
    }

    let parts: Vec<&str> = module_qn.split('.').collect();
    for end in (1..parts.len()).rev() {
        let candidate = format!("{}.{class_name}", parts[..end].join("."));
        if symbols.contains(&candidate) {
            return Some(candidate);
        }
    }

    symbols.find_ending_with(class_name).into_iter().next()
}

/// Collect the nodes bound to `capture_name` by every match of `query`
/// under `node`.
pub fn query_nodes<'t>(
    query: &Query,
    capture_name: &str,
    node: Node<'t>,
    source: &[u8],
) -> Vec<Node<'t>> {
    let Some(capture_index) = query.capture_index_for_name(capture_name) else {
        return Vec::new();
    };

    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, node, source);
    let mut nodes = Vec::new();
    while let Some(m) = matches.next() {
        for capture in m.captures {
            if capture.index == capture_index {
                nodes.push(capture.node);
            }
        }
    }
    nodes
}

/// Iterative preorder walk; tree depth must not bound the stack.
pub fn walk_tree<'t>(root: Node<'t>, mut visit: impl FnMut(Node<'t>)) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        visit(node);
        for i in (0..node.child_count()).rev() {
            if let Some(child) = node.child(i) {
                stack.push(child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symbols::EntityKind;

    #[test]
    fn test_module_qn_plain_and_collapsed() {
        assert_eq!(
            module_qn_for("proj", Path::new("services/svc.py"), Lang::Python),
            "proj.services.svc"
        );
        assert_eq!(
            module_qn_for("proj", Path::new("models/__init__.py"), Lang::Python),
            "proj.models"
        );
        assert_eq!(
            module_qn_for("proj", Path::new("src/store/mod.rs"), Lang::Rust),
            "proj.src.store"
        );
        assert_eq!(
            module_qn_for("proj", Path::new("src/lib.rs"), Lang::Rust),
            "proj.src.lib"
        );
    }

    #[test]
    fn test_resolve_class_name_prefers_imports() {
        let mut symbols = SymbolTable::new();
        symbols.insert("proj.models.User", EntityKind::Class).unwrap();
        symbols.insert("proj.svc.User", EntityKind::Class).unwrap();

        let mut imports = ImportMap::new();
        imports.register("proj.svc", "User", "proj.models.User");

        assert_eq!(
            resolve_class_name("User", "proj.svc", &imports, &symbols),
            Some("proj.models.User".to_string())
        );
    }

    #[test]
    fn test_resolve_class_name_falls_back_to_parents_then_suffix() {
        let mut symbols = SymbolTable::new();
        symbols.insert("proj.Base", EntityKind::Class).unwrap();
        symbols
            .insert("other.pkg.Remote", EntityKind::Class)
            .unwrap();
        let imports = ImportMap::new();

        assert_eq!(
            resolve_class_name("Base", "proj.app.views", &imports, &symbols),
            Some("proj.Base".to_string())
        );
        assert_eq!(
            resolve_class_name("Remote", "proj.app.views", &imports, &symbols),
            Some("other.pkg.Remote".to_string())
        );
        assert_eq!(
            resolve_class_name("Missing", "proj.app.views", &imports, &symbols),
            None
        );
    }
}
