//! Definition extractor (pass 1)
//!
//! Populates the symbol table, inheritance map, and import map from every
//! cached AST, emitting Module/Class/Interface/Enum/Function/Method nodes
//! with their DEFINES, INHERITS, IMPORTS, and DEPENDS_ON_EXTERNAL edges.
//! No call edges are touched here; pass 2 depends on this pass having seen
//! every file first. Import targets are resolved against the repository
//! layout, never against the partially-built index, so pass-1 file order
//! cannot change the outcome.

use crate::core::error::Result;
use crate::graph::sink::{props, GraphSink, NodeLabel, NodeRef, RelKind};
use crate::graph::structure::StructureWalker;
use crate::graph::symbols::EntityKind;
use crate::graph::{cpp, module_qn_for, query_nodes, resolve_class_name, walk_tree, CodeIndex};
use crate::lang::{Lang, QuerySet};
use crate::parse::{node_text, ParsedFile};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::debug;
use tree_sitter::Node;

pub struct DefinitionExtractor<'a> {
    project_name: &'a str,
    repo_path: &'a Path,
    queries: &'a QuerySet,
}

impl<'a> DefinitionExtractor<'a> {
    pub fn new(project_name: &'a str, repo_path: &'a Path, queries: &'a QuerySet) -> Self {
        Self {
            project_name,
            repo_path,
            queries,
        }
    }

    /// Extract all definitions and imports from one file.
    pub fn process_file(
        &self,
        relative: &Path,
        parsed: &ParsedFile,
        index: &mut CodeIndex,
        structure: &StructureWalker<'_>,
        sink: &mut dyn GraphSink,
    ) -> Result<()> {
        let lang = parsed.lang;
        let module_qn = module_qn_for(self.project_name, relative, lang);
        let root = parsed.root();
        let source = &parsed.source;

        index.symbols.insert(&module_qn, EntityKind::Module)?;
        index
            .module_files
            .insert(module_qn.clone(), relative.to_path_buf());

        let module_name = module_qn.rsplit('.').next().unwrap_or(&module_qn);
        sink.ensure_node(
            NodeLabel::Module,
            props([
                ("qualified_name", json!(module_qn)),
                ("name", json!(module_name)),
                ("path", json!(relative.to_string_lossy())),
            ]),
        );
        let container = structure.container_ref(relative.parent().unwrap_or(Path::new("")));
        sink.ensure_relationship(
            container,
            RelKind::ContainsFile,
            NodeRef::new(NodeLabel::Module, module_qn.clone()),
            None,
        );

        // imports first: base-class and call resolution read the aliases
        self.extract_imports(relative, root, source, &module_qn, lang, index, sink);
        self.extract_functions(root, source, &module_qn, lang, index, sink)?;
        self.extract_classes(root, source, &module_qn, lang, index, sink)?;
        if matches!(lang, Lang::JavaScript | Lang::TypeScript) {
            self.extract_iife_functions(root, &module_qn, index, sink)?;
        }

        Ok(())
    }

    // =========================================================================
    // FUNCTIONS
    // =========================================================================

    fn extract_functions(
        &self,
        root: Node<'_>,
        source: &[u8],
        module_qn: &str,
        lang: Lang,
        index: &mut CodeIndex,
        sink: &mut dyn GraphSink,
    ) -> Result<()> {
        let bundle = self.queries.get(lang);
        for func_node in query_nodes(&bundle.functions, "function", root, source) {
            if is_inside_class(func_node, lang) {
                continue;
            }

            if lang == Lang::Cpp {
                self.extract_cpp_function(func_node, source, module_qn, index, sink)?;
                continue;
            }
            if lang == Lang::Go && func_node.kind() == "method_declaration" {
                self.extract_go_method(func_node, source, module_qn, index, sink)?;
                continue;
            }

            let Some(name) = function_name(func_node, source, lang) else {
                continue;
            };
            let Some(func_qn) = build_nested_qn(func_node, source, module_qn, &name, lang) else {
                continue;
            };

            index.symbols.insert(&func_qn, EntityKind::Function)?;
            let mut properties = props([
                ("qualified_name", json!(func_qn)),
                ("name", json!(name)),
            ]);
            if lang == Lang::Python {
                let decorators = python_decorators(func_node, source);
                if !decorators.is_empty() {
                    properties.insert("decorators".to_string(), json!(decorators));
                }
            }
            sink.ensure_node(NodeLabel::Function, properties);

            let owner = owner_ref(&func_qn, module_qn);
            sink.ensure_relationship(
                owner,
                RelKind::Defines,
                NodeRef::new(NodeLabel::Function, func_qn),
                None,
            );
        }
        Ok(())
    }

    /// C++ free functions, plus out-of-class method definitions
    /// (`Cls::method`) which land under the class QN.
    fn extract_cpp_function(
        &self,
        func_node: Node<'_>,
        source: &[u8],
        module_qn: &str,
        index: &mut CodeIndex,
        sink: &mut dyn GraphSink,
    ) -> Result<()> {
        let Some(extracted) = cpp::extract_function_name(func_node, source) else {
            return Ok(());
        };

        if extracted.scope.is_empty() {
            let func_qn = cpp::build_qualified_name(func_node, source, module_qn, &extracted.name);
            index.symbols.insert(&func_qn, EntityKind::Function)?;
            sink.ensure_node(
                NodeLabel::Function,
                props([
                    ("qualified_name", json!(func_qn)),
                    ("name", json!(extracted.name)),
                ]),
            );
            sink.ensure_relationship(
                NodeRef::new(NodeLabel::Module, module_qn),
                RelKind::Defines,
                NodeRef::new(NodeLabel::Function, func_qn),
                None,
            );
        } else {
            // Cls::method — a method of the scoped class, not of the
            // surrounding namespace
            let class_qn = format!("{module_qn}.{}", extracted.scope.join("."));
            let method_qn = format!("{class_qn}.{}", extracted.name);
            index.symbols.insert(&method_qn, EntityKind::Method)?;
            sink.ensure_node(
                NodeLabel::Method,
                props([
                    ("qualified_name", json!(method_qn)),
                    ("name", json!(extracted.name)),
                ]),
            );
            sink.ensure_relationship(
                NodeRef::new(NodeLabel::Class, class_qn),
                RelKind::Defines,
                NodeRef::new(NodeLabel::Method, method_qn),
                None,
            );
        }
        Ok(())
    }

    /// Go methods hang off their receiver type.
    fn extract_go_method(
        &self,
        func_node: Node<'_>,
        source: &[u8],
        module_qn: &str,
        index: &mut CodeIndex,
        sink: &mut dyn GraphSink,
    ) -> Result<()> {
        let Some(name) = func_node
            .child_by_field_name("name")
            .and_then(|n| node_text(n, source))
        else {
            return Ok(());
        };
        let Some(receiver_type) = go_receiver_type(func_node, source) else {
            return Ok(());
        };

        let method_qn = format!("{module_qn}.{receiver_type}.{name}");
        index.symbols.insert(&method_qn, EntityKind::Method)?;
        sink.ensure_node(
            NodeLabel::Method,
            props([
                ("qualified_name", json!(method_qn)),
                ("name", json!(name)),
            ]),
        );
        sink.ensure_relationship(
            NodeRef::new(NodeLabel::Class, format!("{module_qn}.{receiver_type}")),
            RelKind::Defines,
            NodeRef::new(NodeLabel::Method, method_qn),
            None,
        );
        Ok(())
    }

    /// Anonymous IIFE bodies get synthetic registry entries so the resolver
    /// can land `(function(){...})()` call sites on them.
    fn extract_iife_functions(
        &self,
        root: Node<'_>,
        module_qn: &str,
        index: &mut CodeIndex,
        sink: &mut dyn GraphSink,
    ) -> Result<()> {
        let mut synthetic = Vec::new();
        walk_tree(root, |node| {
            if node.kind() != "call_expression" {
                return;
            }
            let Some(func) = node.child_by_field_name("function") else {
                return;
            };
            if func.kind() != "parenthesized_expression" {
                return;
            }
            for i in 0..func.child_count() {
                let Some(inner) = func.child(i) else { continue };
                let prefix = match inner.kind() {
                    "arrow_function" => "iife_arrow",
                    "function_expression" => "iife_func",
                    _ => continue,
                };
                synthetic.push(format!(
                    "{prefix}_{}_{}",
                    inner.start_position().row,
                    inner.start_position().column
                ));
            }
        });

        for name in synthetic {
            let func_qn = format!("{module_qn}.{name}");
            index.symbols.insert(&func_qn, EntityKind::Function)?;
            sink.ensure_node(
                NodeLabel::Function,
                props([
                    ("qualified_name", json!(func_qn)),
                    ("name", json!(name)),
                ]),
            );
            sink.ensure_relationship(
                NodeRef::new(NodeLabel::Module, module_qn),
                RelKind::Defines,
                NodeRef::new(NodeLabel::Function, func_qn),
                None,
            );
        }
        Ok(())
    }

    // =========================================================================
    // CLASSES
    // =========================================================================

    fn extract_classes(
        &self,
        root: Node<'_>,
        source: &[u8],
        module_qn: &str,
        lang: Lang,
        index: &mut CodeIndex,
        sink: &mut dyn GraphSink,
    ) -> Result<()> {
        let bundle = self.queries.get(lang);
        let Some(class_query) = &bundle.classes else {
            return Ok(());
        };

        for class_node in query_nodes(class_query, "class", root, source) {
            if lang == Lang::Rust && class_node.kind() == "impl_item" {
                self.extract_rust_impl(class_node, source, module_qn, index, sink)?;
                continue;
            }
            if lang == Lang::Cpp && class_node.child_by_field_name("body").is_none() {
                continue; // forward declaration
            }

            let Some(name) = class_node
                .child_by_field_name("name")
                .and_then(|n| node_text(n, source))
                .map(str::to_string)
            else {
                continue;
            };

            let kind = class_entity_kind(class_node, lang);
            let class_qn = match build_scoped_class_qn(class_node, source, module_qn, &name, lang) {
                Some(qn) => qn,
                None => continue,
            };

            index.symbols.insert(&class_qn, kind)?;
            let mut properties = props([
                ("qualified_name", json!(class_qn)),
                ("name", json!(name)),
            ]);
            if lang == Lang::Python {
                let decorators = python_decorators(class_node, source);
                if !decorators.is_empty() {
                    properties.insert("decorators".to_string(), json!(decorators));
                }
            }
            sink.ensure_node(kind.label(), properties);
            sink.ensure_relationship(
                NodeRef::new(NodeLabel::Module, module_qn),
                RelKind::Defines,
                NodeRef::new(kind.label(), class_qn.clone()),
                None,
            );

            self.extract_base_classes(class_node, source, module_qn, &class_qn, lang, index, sink);
            self.extract_methods(class_node, source, &class_qn, kind, lang, index, sink)?;
        }
        Ok(())
    }

    /// `impl Type` and `impl Trait for Type` both contribute methods under
    /// `Type`'s qualified name.
    fn extract_rust_impl(
        &self,
        impl_node: Node<'_>,
        source: &[u8],
        module_qn: &str,
        index: &mut CodeIndex,
        sink: &mut dyn GraphSink,
    ) -> Result<()> {
        let Some(type_name) = rust_impl_type_name(impl_node, source) else {
            return Ok(());
        };
        let class_qn = format!("{module_qn}.{type_name}");

        let Some(body) = impl_node.child_by_field_name("body") else {
            return Ok(());
        };
        for i in 0..body.named_child_count() {
            let Some(item) = body.named_child(i) else {
                continue;
            };
            if item.kind() != "function_item" {
                continue;
            }
            let Some(name) = item
                .child_by_field_name("name")
                .and_then(|n| node_text(n, source))
            else {
                continue;
            };
            let method_qn = format!("{class_qn}.{name}");
            index.symbols.insert(&method_qn, EntityKind::Method)?;
            sink.ensure_node(
                NodeLabel::Method,
                props([
                    ("qualified_name", json!(method_qn)),
                    ("name", json!(name)),
                ]),
            );
            sink.ensure_relationship(
                NodeRef::new(NodeLabel::Class, class_qn.clone()),
                RelKind::Defines,
                NodeRef::new(NodeLabel::Method, method_qn),
                None,
            );
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn extract_methods(
        &self,
        class_node: Node<'_>,
        source: &[u8],
        class_qn: &str,
        class_kind: EntityKind,
        lang: Lang,
        index: &mut CodeIndex,
        sink: &mut dyn GraphSink,
    ) -> Result<()> {
        let Some(body) = class_node.child_by_field_name("body") else {
            return Ok(());
        };

        if lang == Lang::Cpp {
            return self.extract_cpp_methods(body, source, class_qn, index, sink);
        }

        let bundle = self.queries.get(lang);
        for method_node in query_nodes(&bundle.functions, "function", body, source) {
            // only direct methods; nested classes run their own pass
            if !is_direct_method_of(method_node, class_node, lang) {
                continue;
            }
            let Some(name) = function_name(method_node, source, lang) else {
                continue;
            };

            let method_qn = if lang == Lang::Java {
                format!("{class_qn}.{name}{}", java_signature(method_node, source))
            } else {
                format!("{class_qn}.{name}")
            };

            index.symbols.insert(&method_qn, EntityKind::Method)?;
            let mut properties = props([
                ("qualified_name", json!(method_qn)),
                ("name", json!(name)),
            ]);
            if lang == Lang::Python {
                let decorators = python_decorators(method_node, source);
                if !decorators.is_empty() {
                    properties.insert("decorators".to_string(), json!(decorators));
                }
            }
            sink.ensure_node(NodeLabel::Method, properties);
            sink.ensure_relationship(
                NodeRef::new(class_kind.label(), class_qn),
                RelKind::Defines,
                NodeRef::new(NodeLabel::Method, method_qn),
                None,
            );
        }
        Ok(())
    }

    fn extract_cpp_methods(
        &self,
        body: Node<'_>,
        source: &[u8],
        class_qn: &str,
        index: &mut CodeIndex,
        sink: &mut dyn GraphSink,
    ) -> Result<()> {
        for i in 0..body.named_child_count() {
            let Some(member) = body.named_child(i) else {
                continue;
            };
            if !matches!(
                member.kind(),
                "function_definition" | "field_declaration" | "declaration"
            ) {
                continue;
            }
            let Some(extracted) = cpp::extract_function_name(member, source) else {
                continue;
            };
            let method_qn = format!("{class_qn}.{}", extracted.name);
            index.symbols.insert(&method_qn, EntityKind::Method)?;
            sink.ensure_node(
                NodeLabel::Method,
                props([
                    ("qualified_name", json!(method_qn)),
                    ("name", json!(extracted.name)),
                ]),
            );
            sink.ensure_relationship(
                NodeRef::new(NodeLabel::Class, class_qn),
                RelKind::Defines,
                NodeRef::new(NodeLabel::Method, method_qn),
                None,
            );
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn extract_base_classes(
        &self,
        class_node: Node<'_>,
        source: &[u8],
        module_qn: &str,
        class_qn: &str,
        lang: Lang,
        index: &mut CodeIndex,
        sink: &mut dyn GraphSink,
    ) {
        for base_name in base_class_names(class_node, source, lang) {
            let resolved =
                resolve_class_name(&base_name, module_qn, &index.imports, &index.symbols);
            match resolved {
                Some(parent_qn) if index.symbols.contains(&parent_qn) => {
                    index.inheritance.record(class_qn, &parent_qn);
                    let parent_kind = index
                        .symbols
                        .get(&parent_qn)
                        .map(|k| k.label())
                        .unwrap_or(NodeLabel::Class);
                    sink.ensure_relationship(
                        NodeRef::new(NodeLabel::Class, class_qn),
                        RelKind::Inherits,
                        NodeRef::new(parent_kind, parent_qn),
                        None,
                    );
                }
                Some(parent_qn) => {
                    // alias resolved to something outside the repo; keep the
                    // inheritance fact for method lookup, skip the edge
                    index.inheritance.record(class_qn, &parent_qn);
                    debug!(class = class_qn, parent = %parent_qn, "external base class; edge skipped");
                }
                None => {
                    debug!(class = class_qn, parent = %base_name, "unresolvable base class; edge skipped");
                }
            }
        }
    }

    // =========================================================================
    // IMPORTS
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    fn extract_imports(
        &self,
        relative: &Path,
        root: Node<'_>,
        source: &[u8],
        module_qn: &str,
        lang: Lang,
        index: &mut CodeIndex,
        sink: &mut dyn GraphSink,
    ) {
        let bundle = self.queries.get(lang);
        let Some(import_query) = &bundle.imports else {
            return;
        };

        let ctx = ImportContext {
            source,
            project_name: self.project_name,
            repo_path: self.repo_path,
            relative,
            module_qn,
        };

        let mut records = Vec::new();
        for import_node in query_nodes(import_query, "import", root, source) {
            match lang {
                Lang::Python => python_imports(import_node, &ctx, &mut records),
                Lang::Rust => rust_imports(import_node, &ctx, &mut records),
                Lang::Java => java_imports(import_node, &ctx, index, &mut records),
                Lang::JavaScript | Lang::TypeScript => js_imports(import_node, &ctx, &mut records),
                Lang::Go => go_imports(import_node, &ctx, &mut records),
                Lang::Cpp | Lang::C => c_includes(import_node, &ctx, &mut records),
                Lang::Lua => {}
            }
        }

        for record in records {
            match &record.local {
                Some(local) => index.imports.register(module_qn, local, &record.target),
                None => index.imports.register_wildcard(module_qn, &record.target),
            }
            self.emit_import_edge(module_qn, &record, sink);
        }
    }

    /// Imports of internal modules emit `Module IMPORTS Module`; anything
    /// else materialises an ExternalPackage with a dependency edge.
    fn emit_import_edge(&self, module_qn: &str, record: &ImportRecord, sink: &mut dyn GraphSink) {
        if let Some(imported_module) = &record.target_module {
            sink.ensure_relationship(
                NodeRef::new(NodeLabel::Module, module_qn),
                RelKind::Imports,
                NodeRef::new(NodeLabel::Module, imported_module.clone()),
                None,
            );
            return;
        }

        let project_prefix = format!("{}.", self.project_name);
        if record.target == self.project_name || record.target.starts_with(&project_prefix) {
            debug!(module = module_qn, target = %record.target, "import target not a known module");
            return;
        }

        let package = crate::graph::symbols::qn_segments(&record.target)
            .first()
            .map(|s| s.to_string())
            .unwrap_or_else(|| record.target.clone());
        sink.ensure_node(NodeLabel::ExternalPackage, props([("name", json!(package))]));
        sink.ensure_relationship(
            NodeRef::new(NodeLabel::Module, module_qn),
            RelKind::DependsOnExternal,
            NodeRef::new(NodeLabel::ExternalPackage, package),
            None,
        );
    }
}

// =============================================================================
// IMPORT EXTRACTION PER LANGUAGE
// =============================================================================

struct ImportContext<'a> {
    source: &'a [u8],
    project_name: &'a str,
    repo_path: &'a Path,
    relative: &'a Path,
    module_qn: &'a str,
}

struct ImportRecord {
    /// Local alias; None marks a wildcard import
    local: Option<String>,
    /// Qualified name the alias points at
    target: String,
    /// Internal module QN behind the target, when the repository has it
    target_module: Option<String>,
}

/// A dotted module path resolved against the repository layout. Returns
/// the internal module QN when a matching source file or package exists.
fn locate_internal_module(
    dotted: &str,
    extensions: &[&str],
    package_files: &[&str],
    ctx: &ImportContext<'_>,
) -> Option<String> {
    let relative: PathBuf = dotted.split('.').collect();
    for ext in extensions {
        if ctx.repo_path.join(&relative).with_extension(ext).is_file() {
            return Some(format!("{}.{dotted}", ctx.project_name));
        }
    }
    for package_file in package_files {
        if ctx.repo_path.join(&relative).join(package_file).is_file() {
            return Some(format!("{}.{dotted}", ctx.project_name));
        }
    }
    None
}

/// `import a.b`, `import a.b as c`, `from x import y as z`, `from x import *`
fn python_imports(node: Node<'_>, ctx: &ImportContext<'_>, out: &mut Vec<ImportRecord>) {
    let source = ctx.source;

    // dotted module path → (target QN, internal module if any)
    let resolve_module = |dotted: &str| -> (String, Option<String>) {
        match locate_internal_module(dotted, &["py"], &["__init__.py"], ctx) {
            Some(module) => (module.clone(), Some(module)),
            None => (dotted.to_string(), None),
        }
    };

    if node.kind() == "import_statement" {
        for i in 0..node.named_child_count() {
            let Some(child) = node.named_child(i) else {
                continue;
            };
            match child.kind() {
                "dotted_name" => {
                    // `import a.b` binds the top-level name only
                    if let Some(dotted) = node_text(child, source) {
                        let top = dotted.split('.').next().unwrap_or(dotted);
                        let (target, target_module) = resolve_module(top);
                        out.push(ImportRecord {
                            local: Some(top.to_string()),
                            target,
                            target_module,
                        });
                    }
                }
                "aliased_import" => {
                    let name = child
                        .child_by_field_name("name")
                        .and_then(|n| node_text(n, source));
                    let alias = child
                        .child_by_field_name("alias")
                        .and_then(|n| node_text(n, source));
                    if let (Some(name), Some(alias)) = (name, alias) {
                        let (target, target_module) = resolve_module(name);
                        out.push(ImportRecord {
                            local: Some(alias.to_string()),
                            target,
                            target_module,
                        });
                    }
                }
                _ => {}
            }
        }
        return;
    }

    // from X import a, b as c, *
    let Some(base_node) = node.child_by_field_name("module_name") else {
        return;
    };
    let (base, base_module) = match base_node.kind() {
        "relative_import" => {
            let text = node_text(base_node, source).unwrap_or_default();
            let dots = text.chars().take_while(|c| *c == '.').count();
            let rest = text.trim_start_matches('.');
            let mut parts: Vec<&str> = ctx.module_qn.split('.').collect();
            for _ in 0..dots {
                parts.pop();
            }
            let base = if rest.is_empty() {
                parts.join(".")
            } else {
                format!("{}.{rest}", parts.join("."))
            };
            (base.clone(), Some(base))
        }
        _ => match node_text(base_node, source) {
            Some(dotted) => {
                let (target, module) = resolve_module(dotted);
                (target, module)
            }
            None => return,
        },
    };
    if base.is_empty() {
        return;
    }

    let module_name_node = node.child_by_field_name("module_name");
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "wildcard_import" => out.push(ImportRecord {
                local: None,
                target: base.clone(),
                target_module: base_module.clone(),
            }),
            "dotted_name" if Some(child) != module_name_node => {
                if let Some(name) = node_text(child, source) {
                    out.push(ImportRecord {
                        local: Some(name.to_string()),
                        target: format!("{base}.{name}"),
                        target_module: base_module.clone(),
                    });
                }
            }
            "aliased_import" => {
                let name = child
                    .child_by_field_name("name")
                    .and_then(|n| node_text(n, source));
                let alias = child
                    .child_by_field_name("alias")
                    .and_then(|n| node_text(n, source));
                if let (Some(name), Some(alias)) = (name, alias) {
                    out.push(ImportRecord {
                        local: Some(alias.to_string()),
                        target: format!("{base}.{name}"),
                        target_module: base_module.clone(),
                    });
                }
            }
            _ => {}
        }
    }
}

/// `use a::b::c;`, `use a::b as d;`, `use a::{b, c as d};`, `use a::*;`
fn rust_imports(node: Node<'_>, ctx: &ImportContext<'_>, out: &mut Vec<ImportRecord>) {
    let Some(argument) = node.child_by_field_name("argument") else {
        return;
    };
    collect_rust_use(argument, ctx, "", out);
}

/// `crate::a::b` maps onto `src/a/b.rs` (or `a/b.rs`); everything else is
/// an external path spelled with dots.
fn rust_resolve_path(path: &str, ctx: &ImportContext<'_>) -> (String, Option<String>) {
    let dotted = path.replace("::", ".");
    let Some(rest) = dotted.strip_prefix("crate.") else {
        return (dotted, None);
    };

    for root in ["src", ""] {
        let prefixed = if root.is_empty() {
            rest.to_string()
        } else {
            format!("{root}.{rest}")
        };
        if let Some(module) = locate_internal_module(&prefixed, &["rs"], &["mod.rs"], ctx) {
            return (module.clone(), Some(module));
        }
        // path tail may be a symbol inside the module: crate::store::Store
        if let Some((module_part, _)) = prefixed.rsplit_once('.') {
            if let Some(module) = locate_internal_module(module_part, &["rs"], &["mod.rs"], ctx) {
                return (format!("{}.{prefixed}", ctx.project_name), Some(module));
            }
        }
    }
    (format!("{}.{rest}", ctx.project_name), None)
}

fn collect_rust_use(
    node: Node<'_>,
    ctx: &ImportContext<'_>,
    prefix: &str,
    out: &mut Vec<ImportRecord>,
) {
    let source = ctx.source;
    let join = |prefix: &str, tail: &str| -> String {
        if prefix.is_empty() {
            tail.to_string()
        } else {
            format!("{prefix}::{tail}")
        }
    };

    match node.kind() {
        "identifier" | "scoped_identifier" | "crate" | "self" | "super" => {
            let Some(path) = node_text(node, source) else {
                return;
            };
            let full = join(prefix, path);
            let local = full.rsplit("::").next().unwrap_or(&full).to_string();
            let (target, target_module) = rust_resolve_path(&full, ctx);
            out.push(ImportRecord {
                local: Some(local),
                target,
                target_module,
            });
        }
        "use_as_clause" => {
            let path = node
                .child_by_field_name("path")
                .and_then(|n| node_text(n, source));
            let alias = node
                .child_by_field_name("alias")
                .and_then(|n| node_text(n, source));
            if let (Some(path), Some(alias)) = (path, alias) {
                let full = join(prefix, path);
                let (target, target_module) = rust_resolve_path(&full, ctx);
                out.push(ImportRecord {
                    local: Some(alias.to_string()),
                    target,
                    target_module,
                });
            }
        }
        "use_wildcard" => {
            let base = node
                .named_child(0)
                .and_then(|n| node_text(n, source))
                .map(|p| join(prefix, p))
                .unwrap_or_else(|| prefix.to_string());
            if !base.is_empty() {
                let (target, target_module) = rust_resolve_path(&base, ctx);
                out.push(ImportRecord {
                    local: None,
                    target,
                    target_module,
                });
            }
        }
        "scoped_use_list" => {
            let base = node
                .child_by_field_name("path")
                .and_then(|n| node_text(n, source))
                .map(|p| join(prefix, p))
                .unwrap_or_else(|| prefix.to_string());
            if let Some(list) = node.child_by_field_name("list") {
                for i in 0..list.named_child_count() {
                    if let Some(item) = list.named_child(i) {
                        collect_rust_use(item, ctx, &base, out);
                    }
                }
            }
        }
        "use_list" => {
            for i in 0..node.named_child_count() {
                if let Some(item) = node.named_child(i) {
                    collect_rust_use(item, ctx, prefix, out);
                }
            }
        }
        _ => {}
    }
}

/// `import a.b.C;` and `import a.b.*;`
fn java_imports(
    node: Node<'_>,
    ctx: &ImportContext<'_>,
    index: &CodeIndex,
    out: &mut Vec<ImportRecord>,
) {
    let source = ctx.source;
    let mut dotted = None;
    let mut wildcard = false;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "scoped_identifier" | "identifier" => {
                dotted = node_text(child, source).map(str::to_string);
            }
            "asterisk" => wildcard = true,
            _ => {}
        }
    }
    let Some(dotted) = dotted else { return };

    // a repository file mirroring the package path wins over the external
    // spelling; already-indexed classes are accepted as a second chance
    let resolve = |dotted: &str| -> (String, Option<String>) {
        for root in ["", "src", "src/main/java"] {
            let prefixed = if root.is_empty() {
                dotted.to_string()
            } else {
                format!("{}.{dotted}", root.replace('/', "."))
            };
            if let Some(module) = locate_internal_module(&prefixed, &["java"], &[], ctx) {
                return (module.clone(), Some(module));
            }
        }
        if let Some(qn) = index.symbols.find_ending_with(dotted).into_iter().next() {
            return (qn, None);
        }
        (dotted.to_string(), None)
    };

    let (target, target_module) = resolve(&dotted);
    if wildcard {
        out.push(ImportRecord {
            local: None,
            target,
            target_module,
        });
    } else {
        let local = dotted.rsplit('.').next().unwrap_or(&dotted).to_string();
        out.push(ImportRecord {
            local: Some(local),
            target,
            target_module,
        });
    }
}

/// `import { a, b as c } from './x'`, default and namespace imports
fn js_imports(node: Node<'_>, ctx: &ImportContext<'_>, out: &mut Vec<ImportRecord>) {
    let source = ctx.source;
    let Some(source_node) = node.child_by_field_name("source") else {
        return;
    };
    let Some(raw) = node_text(source_node, source) else {
        return;
    };
    let spec = raw.trim_matches(|c| c == '"' || c == '\'' || c == '`');

    let (base, base_module) = if spec.starts_with('.') {
        let dir = ctx.relative.parent().unwrap_or(Path::new(""));
        let mut parts: Vec<String> = dir
            .components()
            .filter_map(|c| c.as_os_str().to_str().map(str::to_string))
            .collect();
        for segment in spec.split('/') {
            match segment {
                "." | "" => {}
                ".." => {
                    parts.pop();
                }
                other => parts.push(
                    Path::new(other)
                        .with_extension("")
                        .to_string_lossy()
                        .to_string(),
                ),
            }
        }
        let dotted = parts.join(".");
        let module = locate_internal_module(&dotted, &["js", "jsx", "ts", "tsx"], &[], ctx)
            .unwrap_or_else(|| format!("{}.{dotted}", ctx.project_name));
        (module.clone(), Some(module))
    } else {
        (spec.replace('/', "."), None)
    };

    let mut named_any = false;
    walk_tree(node, |child| match child.kind() {
        "import_specifier" => {
            named_any = true;
            let name = child
                .child_by_field_name("name")
                .and_then(|n| node_text(n, source));
            let alias = child
                .child_by_field_name("alias")
                .and_then(|n| node_text(n, source));
            if let Some(name) = name {
                out.push(ImportRecord {
                    local: Some(alias.unwrap_or(name).to_string()),
                    target: format!("{base}.{name}"),
                    target_module: base_module.clone(),
                });
            }
        }
        "namespace_import" => {
            named_any = true;
            let mut cursor = child.walk();
            for c in child.children(&mut cursor) {
                if c.kind() == "identifier" {
                    if let Some(alias) = node_text(c, source) {
                        out.push(ImportRecord {
                            local: Some(alias.to_string()),
                            target: base.clone(),
                            target_module: base_module.clone(),
                        });
                    }
                }
            }
        }
        _ => {}
    });

    // default import: `import X from './x'`
    if let Some(clause) = node.named_child(0).filter(|c| c.kind() == "import_clause") {
        for i in 0..clause.named_child_count() {
            if let Some(child) = clause.named_child(i) {
                if child.kind() == "identifier" {
                    named_any = true;
                    if let Some(name) = node_text(child, source) {
                        out.push(ImportRecord {
                            local: Some(name.to_string()),
                            target: format!("{base}.{name}"),
                            target_module: base_module.clone(),
                        });
                    }
                }
            }
        }
    }

    if !named_any {
        // bare side-effect import: `import './x'`
        out.push(ImportRecord {
            local: None,
            target: base,
            target_module: base_module,
        });
    }
}

/// `import "fmt"` / grouped import specs
fn go_imports(node: Node<'_>, ctx: &ImportContext<'_>, out: &mut Vec<ImportRecord>) {
    let source = ctx.source;
    let mut specs = Vec::new();
    walk_tree(node, |child| {
        if child.kind() == "import_spec" {
            specs.push(child);
        }
    });

    for spec in specs {
        let path = spec
            .child_by_field_name("path")
            .and_then(|n| node_text(n, source))
            .map(|s| s.trim_matches('"').to_string());
        let Some(path) = path else { continue };
        let alias = spec
            .child_by_field_name("name")
            .and_then(|n| node_text(n, source))
            .map(str::to_string);
        let local = alias.unwrap_or_else(|| path.rsplit('/').next().unwrap_or(&path).to_string());

        // a package directory inside the repo aliases to the internal QN;
        // the directory itself is not a module file, so no IMPORTS edge
        let dotted = path.replace('/', ".");
        let package_dir: PathBuf = path.split('/').collect();
        let target = if ctx.repo_path.join(&package_dir).is_dir() {
            format!("{}.{dotted}", ctx.project_name)
        } else {
            dotted
        };
        out.push(ImportRecord {
            local: Some(local),
            target,
            target_module: None,
        });
    }
}

/// Quoted includes reference project headers; angle includes are external.
fn c_includes(node: Node<'_>, ctx: &ImportContext<'_>, out: &mut Vec<ImportRecord>) {
    let source = ctx.source;
    let Some(path_node) = node.child_by_field_name("path") else {
        return;
    };
    let Some(raw) = node_text(path_node, source) else {
        return;
    };

    if path_node.kind() == "string_literal" {
        let header = raw.trim_matches('"');
        let dir = ctx.relative.parent().unwrap_or(Path::new(""));
        let mut parts: Vec<String> = dir
            .components()
            .filter_map(|c| c.as_os_str().to_str().map(str::to_string))
            .collect();
        for segment in header.split('/') {
            match segment {
                "." | "" => {}
                ".." => {
                    parts.pop();
                }
                other => parts.push(
                    Path::new(other)
                        .with_extension("")
                        .to_string_lossy()
                        .to_string(),
                ),
            }
        }
        let stem = parts.last().cloned().unwrap_or_default();
        let dotted = parts.join(".");
        let module_qn = format!("{}.{dotted}", ctx.project_name);
        out.push(ImportRecord {
            local: Some(stem),
            target: module_qn.clone(),
            target_module: Some(module_qn),
        });
    } else {
        let header = raw.trim_matches(|c| c == '<' || c == '>');
        let stem = Path::new(header)
            .with_extension("")
            .to_string_lossy()
            .replace('/', ".");
        out.push(ImportRecord {
            local: Some(stem.rsplit('.').next().unwrap_or(&stem).to_string()),
            target: stem,
            target_module: None,
        });
    }
}

// =============================================================================
// NAMING HELPERS
// =============================================================================

/// Declared name of a function-like node.
pub fn function_name(func_node: Node<'_>, source: &[u8], lang: Lang) -> Option<String> {
    match lang {
        Lang::Cpp | Lang::C => cpp::extract_function_name(func_node, source).map(|n| n.name),
        _ => func_node
            .child_by_field_name("name")
            .and_then(|n| node_text(n, source))
            .map(str::to_string),
    }
}

/// Is this function nested anywhere inside a class-like node?
pub fn is_inside_class(func_node: Node<'_>, lang: Lang) -> bool {
    let spec = lang.spec();
    let mut current = func_node.parent();
    while let Some(node) = current {
        if spec.module_node_types.contains(&node.kind()) {
            return false;
        }
        if spec.class_node_types.contains(&node.kind()) {
            return true;
        }
        current = node.parent();
    }
    false
}

/// Is this function a method declared directly in `class_node`'s body (not
/// in some nested class)?
fn is_direct_method_of(method_node: Node<'_>, class_node: Node<'_>, lang: Lang) -> bool {
    let spec = lang.spec();
    let mut current = method_node.parent();
    while let Some(node) = current {
        if node == class_node {
            return true;
        }
        if spec.class_node_types.contains(&node.kind()) {
            return false;
        }
        current = node.parent();
    }
    false
}

/// QN for a free function, dotted through enclosing functions. Returns
/// None when the walk crosses a class boundary (that's a method).
pub fn build_nested_qn(
    func_node: Node<'_>,
    source: &[u8],
    module_qn: &str,
    name: &str,
    lang: Lang,
) -> Option<String> {
    let spec = lang.spec();
    let mut path_parts: Vec<String> = Vec::new();
    let mut current = func_node.parent();

    while let Some(node) = current {
        if spec.module_node_types.contains(&node.kind()) {
            break;
        }
        if spec.class_node_types.contains(&node.kind()) {
            return None;
        }
        if spec.function_node_types.contains(&node.kind()) {
            if let Some(parent_name) = node
                .child_by_field_name("name")
                .and_then(|n| node_text(n, source))
            {
                path_parts.push(parent_name.to_string());
            }
        }
        current = node.parent();
    }

    path_parts.reverse();
    if path_parts.is_empty() {
        Some(format!("{module_qn}.{name}"))
    } else {
        Some(format!("{module_qn}.{}.{name}", path_parts.join(".")))
    }
}

/// QN for a class, dotted through enclosing classes/functions (Python
/// nesting); C++ classes walk namespaces instead.
fn build_scoped_class_qn(
    class_node: Node<'_>,
    source: &[u8],
    module_qn: &str,
    name: &str,
    lang: Lang,
) -> Option<String> {
    if lang == Lang::Cpp {
        return Some(cpp::build_qualified_name(class_node, source, module_qn, name));
    }

    let spec = lang.spec();
    let mut path_parts: Vec<String> = Vec::new();
    let mut current = class_node.parent();

    while let Some(node) = current {
        if spec.module_node_types.contains(&node.kind()) {
            break;
        }
        if spec.class_node_types.contains(&node.kind())
            || spec.function_node_types.contains(&node.kind())
        {
            if let Some(parent_name) = node
                .child_by_field_name("name")
                .and_then(|n| node_text(n, source))
            {
                path_parts.push(parent_name.to_string());
            }
        }
        current = node.parent();
    }

    path_parts.reverse();
    if path_parts.is_empty() {
        Some(format!("{module_qn}.{name}"))
    } else {
        Some(format!("{module_qn}.{}.{name}", path_parts.join(".")))
    }
}

fn class_entity_kind(class_node: Node<'_>, lang: Lang) -> EntityKind {
    match (lang, class_node.kind()) {
        (_, "interface_declaration") | (_, "trait_item") => EntityKind::Interface,
        (_, "enum_declaration") | (_, "enum_item") => EntityKind::Enum,
        (Lang::Go, "type_spec") => {
            let is_interface = class_node
                .child_by_field_name("type")
                .map(|t| t.kind() == "interface_type")
                .unwrap_or(false);
            if is_interface {
                EntityKind::Interface
            } else {
                EntityKind::Class
            }
        }
        _ => EntityKind::Class,
    }
}

fn rust_impl_type_name(impl_node: Node<'_>, source: &[u8]) -> Option<String> {
    let type_node = impl_node.child_by_field_name("type").or_else(|| {
        let mut cursor = impl_node.walk();
        let found = impl_node
            .children(&mut cursor)
            .find(|c| c.kind() == "type_identifier");
        found
    })?;
    let text = node_text(type_node, source)?;
    // strip generics: `Store<T>` files under `Store`
    Some(text.split('<').next().unwrap_or(text).to_string())
}

fn go_receiver_type(method_node: Node<'_>, source: &[u8]) -> Option<String> {
    let receiver = method_node.child_by_field_name("receiver")?;
    let mut found = None;
    walk_tree(receiver, |node| {
        if found.is_none() && node.kind() == "type_identifier" {
            found = node_text(node, source).map(str::to_string);
        }
    });
    found
}

/// Decorator names on a Python function or class.
fn python_decorators(node: Node<'_>, source: &[u8]) -> Vec<String> {
    let Some(parent) = node.parent() else {
        return Vec::new();
    };
    if parent.kind() != "decorated_definition" {
        return Vec::new();
    }
    let mut decorators = Vec::new();
    let mut cursor = parent.walk();
    for child in parent.children(&mut cursor) {
        if child.kind() == "decorator" {
            if let Some(text) = node_text(child, source) {
                decorators.push(text.trim_start_matches('@').to_string());
            }
        }
    }
    decorators
}

/// Parenthesised parameter-type signature, appended to Java method QNs to
/// disambiguate overloads.
pub fn java_signature(method_node: Node<'_>, source: &[u8]) -> String {
    let Some(params) = method_node.child_by_field_name("parameters") else {
        return "()".to_string();
    };
    let mut types = Vec::new();
    for i in 0..params.named_child_count() {
        let Some(param) = params.named_child(i) else {
            continue;
        };
        if !matches!(param.kind(), "formal_parameter" | "spread_parameter") {
            continue;
        }
        if let Some(type_text) = param
            .child_by_field_name("type")
            .and_then(|n| node_text(n, source))
        {
            types.push(type_text.to_string());
        }
    }
    format!("({})", types.join(","))
}

fn base_class_names(class_node: Node<'_>, source: &[u8], lang: Lang) -> Vec<String> {
    let mut bases = Vec::new();
    match lang {
        Lang::Python => {
            if let Some(superclasses) = class_node.child_by_field_name("superclasses") {
                for i in 0..superclasses.named_child_count() {
                    let Some(base) = superclasses.named_child(i) else {
                        continue;
                    };
                    if matches!(base.kind(), "identifier" | "attribute") {
                        if let Some(text) = node_text(base, source) {
                            bases.push(text.to_string());
                        }
                    }
                }
            }
        }
        Lang::JavaScript | Lang::TypeScript => {
            let mut cursor = class_node.walk();
            for child in class_node.children(&mut cursor) {
                if child.kind() == "class_heritage" {
                    let mut first = None;
                    walk_tree(child, |n| {
                        if first.is_none()
                            && matches!(n.kind(), "identifier" | "member_expression")
                        {
                            first = node_text(n, source).map(str::to_string);
                        }
                    });
                    bases.extend(first);
                }
            }
        }
        Lang::Java => {
            if let Some(superclass) = class_node.child_by_field_name("superclass") {
                walk_tree(superclass, |n| {
                    if n.kind() == "type_identifier" {
                        if let Some(text) = node_text(n, source) {
                            bases.push(text.to_string());
                        }
                    }
                });
            }
            if let Some(interfaces) = class_node.child_by_field_name("interfaces") {
                walk_tree(interfaces, |n| {
                    if n.kind() == "type_identifier" {
                        if let Some(text) = node_text(n, source) {
                            bases.push(text.to_string());
                        }
                    }
                });
            }
        }
        Lang::Cpp => {
            let mut cursor = class_node.walk();
            for child in class_node.children(&mut cursor) {
                if child.kind() == "base_class_clause" {
                    walk_tree(child, |n| {
                        if n.kind() == "type_identifier" {
                            if let Some(text) = node_text(n, source) {
                                bases.push(text.to_string());
                            }
                        }
                    });
                }
            }
        }
        _ => {}
    }
    bases
}

fn owner_ref(func_qn: &str, module_qn: &str) -> NodeRef {
    match func_qn
        .strip_prefix(module_qn)
        .and_then(|rest| rest.strip_prefix('.'))
    {
        Some(rest) if rest.contains('.') => {
            // nested function: owner is the enclosing function
            let owner_qn = func_qn.rsplit_once('.').map(|(o, _)| o).unwrap_or(module_qn);
            NodeRef::new(NodeLabel::Function, owner_qn)
        }
        _ => NodeRef::new(NodeLabel::Module, module_qn),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::IndexConfig;
    use crate::graph::sink::MemorySink;
    use crate::parse::parse_source;
    use std::fs;

    struct Fixture {
        index: CodeIndex,
        sink: MemorySink,
        _dir: tempfile::TempDir,
    }

    /// Write the given (path, content) files into a fixture repo and run
    /// pass 1 over them in order.
    fn run_pass1(files: &[(&str, &str)]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        for (path, content) in files {
            let absolute = dir.path().join(path);
            fs::create_dir_all(absolute.parent().unwrap()).unwrap();
            fs::write(&absolute, content).unwrap();
        }

        let config = IndexConfig::new(dir.path(), Some("proj".into())).unwrap();
        let queries = QuerySet::compile().unwrap();
        let mut sink = MemorySink::new();
        let mut walker = StructureWalker::new(&config);
        walker.identify_structure(&mut sink);

        let mut index = CodeIndex::new();
        let extractor = DefinitionExtractor::new("proj", dir.path(), &queries);
        for (path, content) in files {
            let relative = Path::new(path);
            let lang = Lang::from_path(relative).unwrap();
            let parsed = parse_source(relative, content.as_bytes().to_vec(), lang).unwrap();
            extractor
                .process_file(relative, &parsed, &mut index, &walker, &mut sink)
                .unwrap();
        }

        Fixture {
            index,
            sink,
            _dir: dir,
        }
    }

    #[test]
    fn test_python_definitions_and_decorators() {
        let fixture = run_pass1(&[(
            "models/user.py",
            r#"
@dataclass
class User:
    def get_name(self):
        return self.name

    @property
    def label(self):
        return self.name

def helper():
    def inner():
        pass
    return inner
"#,
        )]);

        let symbols = &fixture.index.symbols;
        assert_eq!(symbols.get("proj.models.user.User"), Some(EntityKind::Class));
        assert_eq!(
            symbols.get("proj.models.user.User.get_name"),
            Some(EntityKind::Method)
        );
        assert_eq!(
            symbols.get("proj.models.user.helper.inner"),
            Some(EntityKind::Function)
        );
        assert_eq!(
            fixture
                .sink
                .node_property(NodeLabel::Class, "proj.models.user.User", "decorators"),
            Some(&json!(["dataclass"]))
        );
        assert_eq!(
            fixture.sink.node_property(
                NodeLabel::Method,
                "proj.models.user.User.label",
                "decorators"
            ),
            Some(&json!(["property"]))
        );
        assert!(fixture.sink.has_relationship(
            "proj.models.user",
            RelKind::Defines,
            "proj.models.user.User"
        ));
        assert!(fixture.sink.has_relationship(
            "proj.models.user.User",
            RelKind::Defines,
            "proj.models.user.User.get_name"
        ));
    }

    #[test]
    fn test_python_imports_and_inheritance() {
        let fixture = run_pass1(&[
            (
                "models/base.py",
                "class Base:\n    def save(self):\n        pass\n",
            ),
            (
                "models/user.py",
                "from models.base import Base\n\nclass User(Base):\n    pass\n",
            ),
        ]);

        assert_eq!(
            fixture.index.imports.lookup("proj.models.user", "Base"),
            Some("proj.models.base.Base")
        );
        assert_eq!(
            fixture.index.inheritance.parents("proj.models.user.User"),
            Some(&["proj.models.base.Base".to_string()][..])
        );
        assert!(fixture.sink.has_relationship(
            "proj.models.user.User",
            RelKind::Inherits,
            "proj.models.base.Base"
        ));
        assert!(fixture.sink.has_relationship(
            "proj.models.user",
            RelKind::Imports,
            "proj.models.base"
        ));
    }

    #[test]
    fn test_python_import_order_does_not_matter() {
        // importer processed before the imported file exists in the index
        let fixture = run_pass1(&[
            (
                "app.py",
                "from models.user import User\n\ndef make():\n    return User()\n",
            ),
            ("models/user.py", "class User:\n    pass\n"),
        ]);

        assert_eq!(
            fixture.index.imports.lookup("proj.app", "User"),
            Some("proj.models.user.User")
        );
        assert!(fixture.sink.has_relationship(
            "proj.app",
            RelKind::Imports,
            "proj.models.user"
        ));
    }

    #[test]
    fn test_python_external_import_becomes_external_package() {
        let fixture = run_pass1(&[("svc.py", "import numpy\nfrom requests import get\n")]);

        assert!(fixture.sink.has_node(NodeLabel::ExternalPackage, "numpy"));
        assert!(fixture.sink.has_node(NodeLabel::ExternalPackage, "requests"));
        assert!(fixture
            .sink
            .has_relationship("proj.svc", RelKind::DependsOnExternal, "numpy"));
    }

    #[test]
    fn test_python_relative_import() {
        let fixture = run_pass1(&[
            ("pkg/__init__.py", ""),
            ("pkg/base.py", "class Base:\n    pass\n"),
            (
                "pkg/user.py",
                "from .base import Base\n\nclass User(Base):\n    pass\n",
            ),
        ]);

        assert_eq!(
            fixture.index.imports.lookup("proj.pkg.user", "Base"),
            Some("proj.pkg.base.Base")
        );
    }

    #[test]
    fn test_rust_impl_methods_and_use() {
        let fixture = run_pass1(&[
            (
                "src/store.rs",
                r#"
use crate::util::flush as flush_all;

pub struct Store {
    items: Vec<String>,
}

impl Store {
    pub fn push(&mut self, item: String) {
        self.items.push(item);
    }
}

pub trait Sink {}
"#,
            ),
            ("src/util.rs", "pub fn flush() {}\n"),
        ]);

        let symbols = &fixture.index.symbols;
        assert_eq!(symbols.get("proj.src.store.Store"), Some(EntityKind::Class));
        assert_eq!(
            symbols.get("proj.src.store.Store.push"),
            Some(EntityKind::Method)
        );
        assert_eq!(
            symbols.get("proj.src.store.Sink"),
            Some(EntityKind::Interface)
        );
        assert_eq!(
            fixture.index.imports.lookup("proj.src.store", "flush_all"),
            Some("proj.src.util.flush")
        );
    }

    #[test]
    fn test_java_method_signature_qns() {
        let fixture = run_pass1(&[(
            "src/App.java",
            r#"
public class App {
    public void run(int count, String name) {}
    public void run() {}
}
"#,
        )]);

        let symbols = &fixture.index.symbols;
        assert_eq!(
            symbols.get("proj.src.App.App.run(int,String)"),
            Some(EntityKind::Method)
        );
        assert_eq!(
            symbols.get("proj.src.App.App.run()"),
            Some(EntityKind::Method)
        );
        let overloads = symbols.find_with_prefix("proj.src.App.App.run(");
        assert_eq!(overloads.len(), 2);
    }

    #[test]
    fn test_cpp_out_of_class_method_lands_under_class() {
        let fixture = run_pass1(&[(
            "src/calc.cpp",
            r#"
class Calculator {
public:
    int add(int a, int b);
};

int Calculator::add(int a, int b) { return a + b; }

namespace util {
int helper() { return 1; }
}
"#,
        )]);

        let symbols = &fixture.index.symbols;
        assert_eq!(
            symbols.get("proj.src.calc.Calculator"),
            Some(EntityKind::Class)
        );
        assert_eq!(
            symbols.get("proj.src.calc.Calculator.add"),
            Some(EntityKind::Method)
        );
        assert_eq!(
            symbols.get("proj.src.calc.util.helper"),
            Some(EntityKind::Function)
        );
    }

    #[test]
    fn test_js_class_and_iife_registration() {
        let fixture = run_pass1(&[(
            "app.js",
            r#"
class Widget {
  render() {}
}

(function() {
  setup();
})();
"#,
        )]);

        let symbols = &fixture.index.symbols;
        assert_eq!(symbols.get("proj.app.Widget"), Some(EntityKind::Class));
        assert_eq!(
            symbols.get("proj.app.Widget.render"),
            Some(EntityKind::Method)
        );
        let iife: Vec<String> = symbols
            .find_with_prefix("proj.app.iife_func_")
            .into_iter()
            .map(|(qn, _)| qn)
            .collect();
        assert_eq!(iife.len(), 1, "IIFE body must be registered: {iife:?}");
    }

    #[test]
    fn test_go_struct_and_method() {
        let fixture = run_pass1(&[(
            "store/store.go",
            r#"
package store

type Store struct {
	items []string
}

func (s *Store) Push(item string) {
	s.items = append(s.items, item)
}

func New() *Store {
	return &Store{}
}
"#,
        )]);

        let symbols = &fixture.index.symbols;
        assert_eq!(
            symbols.get("proj.store.store.Store"),
            Some(EntityKind::Class)
        );
        assert_eq!(
            symbols.get("proj.store.store.Store.Push"),
            Some(EntityKind::Method)
        );
        assert_eq!(
            symbols.get("proj.store.store.New"),
            Some(EntityKind::Function)
        );
    }
}
