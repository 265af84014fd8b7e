//! Call processor and resolver (pass 2)
//!
//! Walks every cached AST's function, method, and module bodies, extracts
//! the syntactic target of each call site, and maps it to a qualified name
//! through a fixed priority cascade:
//!
//! 1. synthetic IIFE names
//! 2. `super` calls through the inheritance map
//! 3. chained calls (`a.b().c`) through return-type inference
//! 4. direct import aliases
//! 5. qualified `object.method` / `Type::method` / `obj:method`
//! 6. wildcard-import probes
//! 7. same-module names
//! 8. JavaScript builtin patterns
//! 9. C++ operator builtins (user overloads win earlier via the suffix index)
//! 10. nearest-name suffix fallback ranked by import distance
//!
//! The order is behaviour; reordering strategies is a breaking change. A
//! call no strategy lands is dropped silently at debug level: no edge is
//! better than a wrong edge.

use crate::graph::definitions::{
    build_nested_qn, function_name, is_inside_class, java_signature,
};
use crate::graph::infer::{is_method_chain as is_return_chain, java, LocalTypes, TypeInference};
use crate::graph::sink::{GraphSink, NodeRef, RelKind};
use crate::graph::symbols::EntityKind;
use crate::graph::{cpp, module_qn_for, query_nodes, resolve_class_name, CodeIndex};
use crate::lang::{Lang, QuerySet};
use crate::parse::{node_text, ParsedFile};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;
use tree_sitter::Node;

static JS_BUILTIN_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "Array", "Object", "String", "Number", "Date", "RegExp", "Function", "Map", "Set",
        "Promise", "Error", "Boolean",
    ]
    .into_iter()
    .collect()
});

static JS_BUILTIN_PATTERNS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "Object.create",
        "Object.keys",
        "Object.values",
        "Object.entries",
        "Object.assign",
        "Object.freeze",
        "Object.seal",
        "Object.defineProperty",
        "Object.getPrototypeOf",
        "Object.setPrototypeOf",
        "Array.from",
        "Array.of",
        "Array.isArray",
        "parseInt",
        "parseFloat",
        "isNaN",
        "isFinite",
        "encodeURIComponent",
        "decodeURIComponent",
        "setTimeout",
        "clearTimeout",
        "setInterval",
        "clearInterval",
        "console.log",
        "console.error",
        "console.warn",
        "console.info",
        "console.debug",
        "JSON.parse",
        "JSON.stringify",
        "Math.random",
        "Math.floor",
        "Math.ceil",
        "Math.round",
        "Math.abs",
        "Math.max",
        "Math.min",
        "Date.now",
        "Date.parse",
    ]
    .into_iter()
    .collect()
});

static CHAIN_TAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.([^.()]+)$").unwrap());

/// Per-file call statistics, accumulated into the driver's totals
#[derive(Debug, Default, Clone, Copy)]
pub struct CallStats {
    pub emitted: usize,
    pub unresolved: usize,
}

pub struct CallProcessor<'a> {
    project_name: &'a str,
    queries: &'a QuerySet,
    index: &'a CodeIndex,
    inference: &'a TypeInference<'a>,
}

impl<'a> CallProcessor<'a> {
    pub fn new(
        project_name: &'a str,
        queries: &'a QuerySet,
        index: &'a CodeIndex,
        inference: &'a TypeInference<'a>,
    ) -> Self {
        Self {
            project_name,
            queries,
            index,
            inference,
        }
    }

    /// Emit CALLS edges for every call site in one file.
    pub fn process_calls_in_file(
        &self,
        relative: &Path,
        parsed: &ParsedFile,
        sink: &mut dyn GraphSink,
    ) -> CallStats {
        let lang = parsed.lang;
        let module_qn = module_qn_for(self.project_name, relative, lang);
        let root = parsed.root();
        let source = &parsed.source;
        debug!(file = %relative.display(), "processing calls");

        let mut stats = CallStats::default();
        self.process_calls_in_functions(root, source, &module_qn, lang, sink, &mut stats);
        self.process_calls_in_classes(root, source, &module_qn, lang, sink, &mut stats);
        self.process_module_level_calls(root, source, &module_qn, lang, sink, &mut stats);
        stats
    }

    fn process_calls_in_functions(
        &self,
        root: Node<'_>,
        source: &[u8],
        module_qn: &str,
        lang: Lang,
        sink: &mut dyn GraphSink,
        stats: &mut CallStats,
    ) {
        let bundle = self.queries.get(lang);
        for func_node in query_nodes(&bundle.functions, "function", root, source) {
            if is_inside_class(func_node, lang) {
                continue;
            }
            let name = match lang {
                Lang::Cpp => match cpp::extract_function_name(func_node, source) {
                    Some(extracted) if extracted.scope.is_empty() => extracted.name,
                    // out-of-class definitions are processed as methods
                    _ => continue,
                },
                _ => match function_name(func_node, source, lang) {
                    Some(name) => name,
                    None => continue,
                },
            };
            let func_qn = if lang == Lang::Cpp {
                cpp::build_qualified_name(func_node, source, module_qn, &name)
            } else {
                match build_nested_qn(func_node, source, module_qn, &name, lang) {
                    Some(qn) => qn,
                    None => continue,
                }
            };

            self.ingest_calls(
                func_node,
                &func_qn,
                EntityKind::Function,
                module_qn,
                source,
                lang,
                None,
                sink,
                stats,
            );
        }

        // C++ out-of-class method bodies carry their class as context
        if lang == Lang::Cpp {
            for func_node in query_nodes(&bundle.functions, "function", root, source) {
                if is_inside_class(func_node, lang) {
                    continue;
                }
                let Some(extracted) = cpp::extract_function_name(func_node, source) else {
                    continue;
                };
                if extracted.scope.is_empty() {
                    continue;
                }
                let class_qn = format!("{module_qn}.{}", extracted.scope.join("."));
                let method_qn = format!("{class_qn}.{}", extracted.name);
                self.ingest_calls(
                    func_node,
                    &method_qn,
                    EntityKind::Method,
                    module_qn,
                    source,
                    lang,
                    Some(&class_qn),
                    sink,
                    stats,
                );
            }
        }
    }

    fn process_calls_in_classes(
        &self,
        root: Node<'_>,
        source: &[u8],
        module_qn: &str,
        lang: Lang,
        sink: &mut dyn GraphSink,
        stats: &mut CallStats,
    ) {
        let bundle = self.queries.get(lang);
        let Some(class_query) = &bundle.classes else {
            return;
        };

        for class_node in query_nodes(class_query, "class", root, source) {
            let class_qn = if lang == Lang::Rust && class_node.kind() == "impl_item" {
                let Some(type_name) = rust_impl_type_name(class_node, source) else {
                    continue;
                };
                format!("{module_qn}.{type_name}")
            } else {
                let Some(name) = class_node
                    .child_by_field_name("name")
                    .and_then(|n| node_text(n, source))
                else {
                    continue;
                };
                format!("{module_qn}.{name}")
            };

            let Some(body) = class_node.child_by_field_name("body") else {
                continue;
            };
            for method_node in query_nodes(&bundle.functions, "function", body, source) {
                let Some(method_name) = function_name(method_node, source, lang) else {
                    continue;
                };
                let method_qn = if lang == Lang::Java {
                    format!(
                        "{class_qn}.{method_name}{}",
                        java_signature(method_node, source)
                    )
                } else {
                    format!("{class_qn}.{method_name}")
                };

                self.ingest_calls(
                    method_node,
                    &method_qn,
                    EntityKind::Method,
                    module_qn,
                    source,
                    lang,
                    Some(&class_qn),
                    sink,
                    stats,
                );
            }
        }
    }

    /// Top-level statements call things too (IIFEs especially); the module
    /// itself is the caller. Calls inside function or class bodies are
    /// theirs, not the module's.
    fn process_module_level_calls(
        &self,
        root: Node<'_>,
        source: &[u8],
        module_qn: &str,
        lang: Lang,
        sink: &mut dyn GraphSink,
        stats: &mut CallStats,
    ) {
        let bundle = self.queries.get(lang);
        let locals =
            self.inference
                .build_local_variable_type_map(root, source, module_qn, lang);

        for call_node in query_nodes(&bundle.calls, "call", root, source) {
            if !is_top_level(call_node, lang) {
                continue;
            }
            self.resolve_and_emit(
                call_node,
                module_qn,
                EntityKind::Module,
                module_qn,
                source,
                lang,
                &locals,
                None,
                sink,
                stats,
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn ingest_calls(
        &self,
        caller_node: Node<'_>,
        caller_qn: &str,
        caller_kind: EntityKind,
        module_qn: &str,
        source: &[u8],
        lang: Lang,
        class_context: Option<&str>,
        sink: &mut dyn GraphSink,
        stats: &mut CallStats,
    ) {
        let bundle = self.queries.get(lang);
        let locals =
            self.inference
                .build_local_variable_type_map(caller_node, source, module_qn, lang);

        let call_nodes = query_nodes(&bundle.calls, "call", caller_node, source);
        debug!(caller = caller_qn, count = call_nodes.len(), "call sites");

        for call_node in call_nodes {
            self.resolve_and_emit(
                call_node,
                caller_qn,
                caller_kind,
                module_qn,
                source,
                lang,
                &locals,
                class_context,
                sink,
                stats,
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_and_emit(
        &self,
        call_node: Node<'_>,
        caller_qn: &str,
        caller_kind: EntityKind,
        module_qn: &str,
        source: &[u8],
        lang: Lang,
        locals: &LocalTypes,
        class_context: Option<&str>,
        sink: &mut dyn GraphSink,
        stats: &mut CallStats,
    ) {
        let Some(call_name) = call_target_name(call_node, source) else {
            return;
        };

        let resolved = if lang == Lang::Java && call_node.kind() == "method_invocation" {
            java::resolve_method_call(self.inference, call_node, source, locals, module_qn)
        } else {
            self.resolve(&call_name, module_qn, Some(locals), class_context)
        };

        let resolved = resolved
            .or_else(|| resolve_builtin_call(&call_name))
            .or_else(|| self.resolve_cpp_operator_call(&call_name, module_qn));

        let Some((callee_kind, callee_qn)) = resolved else {
            debug!(caller = caller_qn, call = %call_name, "unresolved call");
            stats.unresolved += 1;
            return;
        };

        debug!(caller = caller_qn, call = %call_name, callee = %callee_qn, "resolved call");
        sink.ensure_relationship(
            NodeRef::new(caller_kind.label(), caller_qn),
            RelKind::Calls,
            NodeRef::new(callee_kind.label(), callee_qn),
            None,
        );
        stats.emitted += 1;
    }

    // =========================================================================
    // RESOLVER CASCADE
    // =========================================================================

    /// Map a call-site target to `(kind, qn)`. Strategies run in fixed
    /// priority order; the first hit wins; none may mutate the index.
    pub fn resolve(
        &self,
        call_name: &str,
        module_qn: &str,
        locals: Option<&LocalTypes>,
        class_context: Option<&str>,
    ) -> Option<(EntityKind, String)> {
        // 1. synthetic IIFE names resolve to their registered bodies
        if call_name.starts_with("iife_func_") || call_name.starts_with("iife_arrow_") {
            let iife_qn = format!("{module_qn}.{call_name}");
            if let Some(kind) = self.index.symbols.get(&iife_qn) {
                return Some((kind, iife_qn));
            }
        }

        // 2. super calls need the class context and the inheritance map
        if call_name == "super"
            || call_name.starts_with("super.")
            || call_name.starts_with("super()")
        {
            return self.resolve_super_call(call_name, class_context);
        }

        // 3. chains resolve the object expression's type first
        if call_name.contains('.') && is_call_chain(call_name) {
            return self.resolve_chained_call(call_name, module_qn, locals);
        }

        // 4. direct import alias
        if let Some(imported_qn) = self.index.imports.lookup(module_qn, call_name) {
            if let Some(kind) = self.callable(imported_qn) {
                debug!(call = call_name, target = imported_qn, "resolved by direct import");
                return Some((kind, imported_qn.to_string()));
            }
        }

        // 5. qualified object.method / Type::method / obj:method
        if call_name.contains('.') || call_name.contains("::") || call_name.contains(':') {
            if let Some(found) = self.resolve_qualified_call(call_name, module_qn, locals) {
                return Some(found);
            }
        }

        // 6. wildcard imports
        if let Some(found) = self.resolve_wildcard_imports(call_name, module_qn) {
            return Some(found);
        }

        // 7. same module
        let same_module_qn = format!("{module_qn}.{call_name}");
        if let Some(kind) = self.callable(&same_module_qn) {
            debug!(call = call_name, "resolved in same module");
            return Some((kind, same_module_qn));
        }

        // 10. nearest-name fallback (8/9 builtins run outside, after this
        // returns None, so user definitions get the first shot here)
        self.resolve_nearest_name(call_name, module_qn)
    }

    /// Registry probe restricted to things a call site can actually land
    /// on; modules and containers never receive CALLS edges.
    fn callable(&self, qn: &str) -> Option<EntityKind> {
        let kind = self.index.symbols.get(qn)?;
        matches!(
            kind,
            EntityKind::Function | EntityKind::Method | EntityKind::Class
        )
        .then_some(kind)
    }

    fn resolve_super_call(
        &self,
        call_name: &str,
        class_context: Option<&str>,
    ) -> Option<(EntityKind, String)> {
        let method_name = if call_name == "super" {
            "constructor"
        } else {
            call_name.split_once('.').map(|(_, m)| m)?
        };

        let Some(class_qn) = class_context else {
            debug!(call = call_name, "super call without class context");
            return None;
        };

        let found = self
            .index
            .inheritance
            .resolve_inherited(class_qn, method_name, &self.index.symbols);
        if found.is_none() {
            debug!(call = call_name, class = class_qn, "super target not found");
        }
        found
    }

    /// `a.b().c` — infer the object expression's type, then land the final
    /// method on that class or its ancestors.
    fn resolve_chained_call(
        &self,
        call_name: &str,
        module_qn: &str,
        locals: Option<&LocalTypes>,
    ) -> Option<(EntityKind, String)> {
        let captures = CHAIN_TAIL.captures(call_name)?;
        let tail = captures.get(1)?;
        let final_method = tail.as_str();
        let object_expr = &call_name[..tail.start() - 1];

        let object_type =
            self.inference
                .infer_expression_return_type(object_expr, module_qn, locals)?;
        let full_object_type = if object_type.contains('.') {
            object_type
        } else {
            resolve_class_name(
                &object_type,
                module_qn,
                &self.index.imports,
                &self.index.symbols,
            )?
        };

        let method_qn = format!("{full_object_type}.{final_method}");
        if let Some(kind) = self.callable(&method_qn) {
            debug!(call = call_name, target = %method_qn, "resolved chained call");
            return Some((kind, method_qn));
        }
        self.index
            .inheritance
            .resolve_inherited(&full_object_type, final_method, &self.index.symbols)
    }

    /// Strategy 5, the workhorse: split on the language's separator and
    /// try local-variable typing, imported classes, self-attribute chains,
    /// and class-qualified paths, inherited members included.
    fn resolve_qualified_call(
        &self,
        call_name: &str,
        module_qn: &str,
        locals: Option<&LocalTypes>,
    ) -> Option<(EntityKind, String)> {
        let separator = if call_name.contains("::") {
            "::"
        } else if call_name.contains(':') && !call_name.contains('.') {
            ":"
        } else {
            "."
        };
        let parts: Vec<&str> = call_name.split(separator).collect();

        if parts.len() == 2 {
            let (object_name, method_name) = (parts[0], parts[1]);

            // 5a. typed local variable
            if let Some(var_type) = locals.and_then(|l| l.get(object_name)) {
                if let Some(class_qn) = self.class_qn_for_type(var_type, module_qn) {
                    let method_qn = format!("{class_qn}.{method_name}");
                    if let Some(kind) = self.callable(&method_qn) {
                        debug!(call = call_name, var = object_name, target = %method_qn, "resolved via local type");
                        return Some((kind, method_qn));
                    }
                    if let Some(found) = self.index.inheritance.resolve_inherited(
                        &class_qn,
                        method_name,
                        &self.index.symbols,
                    ) {
                        return Some(found);
                    }
                }
                if JS_BUILTIN_TYPES.contains(var_type.as_str()) {
                    return Some((
                        EntityKind::Function,
                        format!("builtin.{var_type}.prototype.{method_name}"),
                    ));
                }
            }

            // 5b. imported class or module as the receiver
            if let Some(imported) = self.index.imports.lookup(module_qn, object_name) {
                let mut class_qn = imported.to_string();

                // Rust paths: repair `a::b::Type` to the registered class
                if class_qn.contains("::") {
                    let last = class_qn.rsplit("::").next().unwrap_or(&class_qn).to_string();
                    for candidate in self.index.symbols.find_ending_with(&last) {
                        if self.index.symbols.get(&candidate) == Some(EntityKind::Class) {
                            class_qn = candidate;
                            break;
                        }
                    }
                }

                // the alias may name a module holding the class
                let nested_class_qn = format!("{class_qn}.{object_name}");
                if self
                    .callable(&format!("{nested_class_qn}.{method_name}"))
                    .is_some()
                {
                    class_qn = nested_class_qn;
                }

                let method_qn = format!("{class_qn}.{method_name}");
                if let Some(kind) = self.callable(&method_qn) {
                    debug!(call = call_name, target = %method_qn, "resolved static call via import");
                    return Some((kind, method_qn));
                }
            }

            // 5d. naked method in the caller's module
            let module_method_qn = format!("{module_qn}.{method_name}");
            if let Some(kind) = self.callable(&module_method_qn) {
                debug!(call = call_name, target = %module_method_qn, "resolved as same-module method");
                return Some((kind, module_method_qn));
            }
        }

        if parts.len() >= 3 && parts[0] == "self" {
            // 5c. self.attr[.attr].method()
            let attribute_ref = parts[..parts.len() - 1].join(".");
            let method_name = parts[parts.len() - 1];

            if let Some(var_type) = locals.and_then(|l| l.get(&attribute_ref)) {
                if let Some(class_qn) = self.class_qn_for_type(var_type, module_qn) {
                    let method_qn = format!("{class_qn}.{method_name}");
                    if let Some(kind) = self.callable(&method_qn) {
                        debug!(call = call_name, attr = %attribute_ref, target = %method_qn, "resolved via self attribute");
                        return Some((kind, method_qn));
                    }
                    if let Some(found) = self.index.inheritance.resolve_inherited(
                        &class_qn,
                        method_name,
                        &self.index.symbols,
                    ) {
                        return Some(found);
                    }
                }
            }
        } else if parts.len() >= 3 {
            // class-qualified path: Class.inner.method or pkg.Class.method
            let class_name = parts[0];
            let method_path = parts[1..].join(".");

            if let Some(imported) = self.index.imports.lookup(module_qn, class_name) {
                let method_qn = format!("{imported}.{method_path}");
                if let Some(kind) = self.callable(&method_qn) {
                    debug!(call = call_name, target = %method_qn, "resolved qualified call via import");
                    return Some((kind, method_qn));
                }
            }

            if let Some(var_type) = locals.and_then(|l| l.get(class_name)) {
                if let Some(class_qn) = self.class_qn_for_type(var_type, module_qn) {
                    let method_qn = format!("{class_qn}.{method_path}");
                    if let Some(kind) = self.callable(&method_qn) {
                        return Some((kind, method_qn));
                    }
                    let final_method = parts[parts.len() - 1];
                    if let Some(found) = self.index.inheritance.resolve_inherited(
                        &class_qn,
                        final_method,
                        &self.index.symbols,
                    ) {
                        return Some(found);
                    }
                }
            }
        }

        None
    }

    /// A local variable's recorded type as a class QN: already qualified,
    /// an import alias, or a name resolvable in scope.
    fn class_qn_for_type(&self, var_type: &str, module_qn: &str) -> Option<String> {
        if var_type.contains('.') {
            return Some(var_type.to_string());
        }
        if let Some(imported) = self.index.imports.lookup(module_qn, var_type) {
            return Some(imported.to_string());
        }
        resolve_class_name(
            var_type,
            module_qn,
            &self.index.imports,
            &self.index.symbols,
        )
    }

    fn resolve_wildcard_imports(
        &self,
        call_name: &str,
        module_qn: &str,
    ) -> Option<(EntityKind, String)> {
        for wildcard_base in self.index.imports.wildcards(module_qn) {
            for candidate in [
                format!("{wildcard_base}.{call_name}"),
                format!("{wildcard_base}::{call_name}"),
            ] {
                if let Some(kind) = self.callable(&candidate) {
                    debug!(call = call_name, target = %candidate, "resolved via wildcard import");
                    return Some((kind, candidate));
                }
            }
        }
        None
    }

    /// Strategy 10: take the final segment, rank every suffix match by
    /// import distance, lowest first, lexicographic QN as the tiebreak.
    fn resolve_nearest_name(
        &self,
        call_name: &str,
        module_qn: &str,
    ) -> Option<(EntityKind, String)> {
        let search_name = call_name
            .split(['.', ':'])
            .filter(|s| !s.is_empty())
            .next_back()?;

        let mut candidates: Vec<String> = self
            .index
            .symbols
            .find_ending_with(search_name)
            .into_iter()
            .filter(|qn| self.callable(qn).is_some())
            .collect();
        if candidates.is_empty() {
            return None;
        }

        candidates.sort_by(|a, b| {
            import_distance(a, module_qn)
                .cmp(&import_distance(b, module_qn))
                .then_with(|| a.cmp(b))
        });
        let best = candidates.swap_remove(0);
        debug!(call = call_name, target = %best, "resolved by nearest-name fallback");
        let kind = self.index.symbols.get(&best)?;
        Some((kind, best))
    }

    /// Strategy 9: canonical operator names fall back to `builtin.cpp.*`
    /// pseudo-functions when no user overload resolved earlier.
    fn resolve_cpp_operator_call(
        &self,
        call_name: &str,
        module_qn: &str,
    ) -> Option<(EntityKind, String)> {
        if !call_name.starts_with("operator") {
            return None;
        }

        if cpp::BUILTIN_CPP_OPERATORS.contains(call_name) {
            return Some((EntityKind::Function, format!("builtin.cpp.{call_name}")));
        }

        // non-canonical spellings: prefer a same-module overload, then the
        // shortest qualified name anywhere
        let mut matches: Vec<String> = self
            .index
            .symbols
            .find_ending_with(call_name)
            .into_iter()
            .filter(|qn| self.callable(qn).is_some())
            .collect();
        if matches.is_empty() {
            return None;
        }
        matches.sort_by(|a, b| {
            let a_local = a.starts_with(module_qn);
            let b_local = b.starts_with(module_qn);
            b_local
                .cmp(&a_local)
                .then_with(|| a.len().cmp(&b.len()))
                .then_with(|| a.cmp(b))
        });
        let best = matches.swap_remove(0);
        let kind = self.index.symbols.get(&best)?;
        Some((kind, best))
    }
}

// =============================================================================
// CALL-SITE TARGET EXTRACTION
// =============================================================================

/// The textual target of a call site, per language shape.
pub fn call_target_name(call_node: Node<'_>, source: &[u8]) -> Option<String> {
    if let Some(func) = call_node.child_by_field_name("function") {
        match func.kind() {
            "identifier" | "attribute" | "member_expression" | "scoped_identifier"
            | "qualified_identifier" => {
                return node_text(func, source).map(str::to_string);
            }
            // Rust method call: the field name alone; the receiver is
            // recovered through local typing
            "field_expression" => {
                return func
                    .child_by_field_name("field")
                    .and_then(|f| node_text(f, source))
                    .map(str::to_string);
            }
            "super" => return Some("super".to_string()),
            "parenthesized_expression" => return iife_target_name(func),
            _ => {}
        }
    }

    // C++ operator usage arrives as expression nodes
    if matches!(
        call_node.kind(),
        "binary_expression" | "unary_expression" | "update_expression"
    ) {
        if let Some(op) = call_node.child_by_field_name("operator") {
            let symbol = node_text(op, source)?;
            return Some(cpp::operator_symbol_to_name(symbol));
        }
    }

    // Java method invocation: object.name
    if call_node.kind() == "method_invocation" {
        let name = call_node
            .child_by_field_name("name")
            .and_then(|n| node_text(n, source))?;
        return match call_node
            .child_by_field_name("object")
            .and_then(|o| node_text(o, source))
        {
            Some(object) => Some(format!("{object}.{name}")),
            None => Some(name.to_string()),
        };
    }

    // Java constructor call: `new Foo(...)` targets the class
    if call_node.kind() == "object_creation_expression" {
        return call_node
            .child_by_field_name("type")
            .and_then(|t| node_text(t, source))
            .map(|t| t.split('<').next().unwrap_or(t).to_string());
    }

    // Lua function_call carries a name field
    if let Some(name) = call_node.child_by_field_name("name") {
        return node_text(name, source).map(str::to_string);
    }

    None
}

/// `(function(){...})()` / `(() => {...})()` target synthetic names that
/// pass 1 registered from the same positions.
fn iife_target_name(parenthesized: Node<'_>) -> Option<String> {
    for i in 0..parenthesized.child_count() {
        let Some(child) = parenthesized.child(i) else {
            continue;
        };
        let prefix = match child.kind() {
            "arrow_function" => "iife_arrow",
            "function_expression" => "iife_func",
            _ => continue,
        };
        return Some(format!(
            "{prefix}_{}_{}",
            child.start_position().row,
            child.start_position().column
        ));
    }
    None
}

/// Chain shape for the resolver: at least one parenthesised segment ahead
/// of a dotted tail.
fn is_call_chain(call_name: &str) -> bool {
    if !(call_name.contains('(') && call_name.contains(')')) {
        return false;
    }
    let parts: Vec<&str> = call_name.split('.').collect();
    let with_parens = parts
        .iter()
        .filter(|p| p.contains('(') && p.contains(')'))
        .count();
    with_parens >= 1 && parts.len() >= 2 && is_return_chain(call_name)
}

/// Module-level calls only: nothing under a function or class body.
fn is_top_level(call_node: Node<'_>, lang: Lang) -> bool {
    let spec = lang.spec();
    let mut current = call_node.parent();
    while let Some(node) = current {
        if spec.module_node_types.contains(&node.kind()) {
            return true;
        }
        if spec.function_node_types.contains(&node.kind())
            || spec.class_node_types.contains(&node.kind())
        {
            return false;
        }
        current = node.parent();
    }
    true
}

/// Path-component distance between a candidate and the calling module;
/// sharing a prefix is close, a sibling of the caller's package closer.
fn import_distance(candidate_qn: &str, caller_module_qn: &str) -> i64 {
    let caller_parts: Vec<&str> = caller_module_qn.split('.').collect();
    let candidate_parts: Vec<&str> = candidate_qn.split('.').collect();

    let common_prefix = caller_parts
        .iter()
        .zip(candidate_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut distance =
        caller_parts.len().max(candidate_parts.len()) as i64 - common_prefix as i64;

    if caller_parts.len() > 1 {
        let parent_prefix = format!("{}.", caller_parts[..caller_parts.len() - 1].join("."));
        if candidate_qn.starts_with(&parent_prefix) {
            distance -= 1;
        }
    }
    distance
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
    Some(text.split('<').next().unwrap_or(text).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::imports::ImportMap;
    use crate::graph::inheritance::InheritanceMap;
    use crate::graph::symbols::SymbolTable;
    use crate::lang::QuerySet;
    use crate::parse::AstCache;
    use once_cell::sync::Lazy;

    static QUERIES: Lazy<QuerySet> = Lazy::new(|| QuerySet::compile().unwrap());

    struct Harness {
        index: CodeIndex,
        cache: AstCache,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                index: CodeIndex::new(),
                cache: AstCache::new(),
            }
        }

        fn symbol(&mut self, qn: &str, kind: EntityKind) -> &mut Self {
            self.index.symbols.insert(qn, kind).unwrap();
            self
        }

        fn import(&mut self, module: &str, local: &str, target: &str) -> &mut Self {
            self.index.imports.register(module, local, target);
            self
        }

        fn resolve_with(
            &self,
            call_name: &str,
            module_qn: &str,
            locals: Option<&LocalTypes>,
            class_context: Option<&str>,
        ) -> Option<(EntityKind, String)> {
            let inference = TypeInference::new(&self.index, &self.cache, &QUERIES);
            let processor = CallProcessor::new("proj", &QUERIES, &self.index, &inference);
            processor.resolve(call_name, module_qn, locals, class_context)
        }

        fn resolve(&self, call_name: &str, module_qn: &str) -> Option<String> {
            self.resolve_with(call_name, module_qn, None, None)
                .map(|(_, qn)| qn)
        }
    }

    #[test]
    fn test_iife_resolves_to_registered_body() {
        let mut h = Harness::new();
        h.symbol("proj.module.iife_func_1_5", EntityKind::Function);

        assert_eq!(
            h.resolve("iife_func_1_5", "proj.module"),
            Some("proj.module.iife_func_1_5".to_string())
        );
        assert_eq!(h.resolve("iife_func_9_9", "proj.module"), None);
    }

    #[test]
    fn test_super_requires_class_context() {
        let mut h = Harness::new();
        h.symbol("proj.base.A.constructor", EntityKind::Method);
        h.symbol("proj.base.A.render", EntityKind::Method);
        h.index.inheritance.record("proj.app.B", "proj.base.A");

        let hit = h.resolve_with("super", "proj.app", None, Some("proj.app.B"));
        assert_eq!(hit.unwrap().1, "proj.base.A.constructor");

        let hit = h.resolve_with("super.render", "proj.app", None, Some("proj.app.B"));
        assert_eq!(hit.unwrap().1, "proj.base.A.render");

        assert!(h.resolve_with("super", "proj.app", None, None).is_none());
    }

    #[test]
    fn test_direct_import_beats_same_module() {
        let mut h = Harness::new();
        h.symbol("external.helper", EntityKind::Function)
            .symbol("proj.module.helper", EntityKind::Function)
            .import("proj.module", "helper", "external.helper");

        assert_eq!(
            h.resolve("helper", "proj.module"),
            Some("external.helper".to_string())
        );
    }

    #[test]
    fn test_local_variable_method_resolution() {
        let mut h = Harness::new();
        h.symbol("proj.models.User", EntityKind::Class)
            .symbol("proj.models.User.save", EntityKind::Method)
            .import("proj.views", "User", "proj.models.User");

        let mut locals = LocalTypes::new();
        locals.insert("user".to_string(), "User".to_string());

        let hit = h.resolve_with("user.save", "proj.views", Some(&locals), None);
        assert_eq!(hit.unwrap().1, "proj.models.User.save");
    }

    #[test]
    fn test_inherited_method_via_local_variable() {
        let mut h = Harness::new();
        h.symbol("proj.models.Base", EntityKind::Class)
            .symbol("proj.models.Base.validate", EntityKind::Method)
            .symbol("proj.models.User", EntityKind::Class)
            .import("proj.views", "User", "proj.models.User");
        h.index
            .inheritance
            .record("proj.models.User", "proj.models.Base");

        let mut locals = LocalTypes::new();
        locals.insert("user".to_string(), "User".to_string());

        let hit = h.resolve_with("user.validate", "proj.views", Some(&locals), None);
        assert_eq!(hit.unwrap().1, "proj.models.Base.validate");
    }

    #[test]
    fn test_js_builtin_receiver_type() {
        let mut h = Harness::new();
        h.symbol("proj.app.main", EntityKind::Function);
        let mut locals = LocalTypes::new();
        locals.insert("items".to_string(), "Array".to_string());

        let hit = h.resolve_with("items.push", "proj.app", Some(&locals), None);
        assert_eq!(hit.unwrap().1, "builtin.Array.prototype.push");
    }

    #[test]
    fn test_self_attribute_chain() {
        let mut h = Harness::new();
        h.symbol("proj.db.Database", EntityKind::Class)
            .symbol("proj.db.Database.query", EntityKind::Method)
            .import("proj.svc", "Database", "proj.db.Database");

        let mut locals = LocalTypes::new();
        locals.insert("self.db".to_string(), "Database".to_string());

        let hit = h.resolve_with("self.db.query", "proj.svc", Some(&locals), None);
        assert_eq!(hit.unwrap().1, "proj.db.Database.query");
    }

    #[test]
    fn test_wildcard_import_probe() {
        let mut h = Harness::new();
        h.symbol("proj.utils.helper", EntityKind::Function);
        h.index.imports.register_wildcard("proj.app", "proj.utils");

        assert_eq!(
            h.resolve("helper", "proj.app"),
            Some("proj.utils.helper".to_string())
        );
    }

    #[test]
    fn test_same_module_beats_suffix_fallback() {
        let mut h = Harness::new();
        h.symbol("proj.module.my_func", EntityKind::Function)
            .symbol("proj.other.my_func", EntityKind::Function);

        assert_eq!(
            h.resolve("my_func", "proj.module"),
            Some("proj.module.my_func".to_string())
        );
    }

    #[test]
    fn test_nearest_name_prefers_lower_import_distance() {
        let mut h = Harness::new();
        h.symbol("proj.app.utils.helper", EntityKind::Function)
            .symbol("other.faraway.pkg.helper", EntityKind::Function);

        assert_eq!(
            h.resolve("helper", "proj.app.views"),
            Some("proj.app.utils.helper".to_string())
        );
    }

    #[test]
    fn test_nearest_name_tie_breaks_lexicographically() {
        let mut h = Harness::new();
        h.symbol("proj.a.helper", EntityKind::Function)
            .symbol("proj.b.helper", EntityKind::Function);

        // equal distance from proj.views: lexicographic order decides
        assert_eq!(
            h.resolve("helper", "proj.views"),
            Some("proj.a.helper".to_string())
        );
    }

    #[test]
    fn test_resolver_is_deterministic() {
        let mut h = Harness::new();
        h.symbol("proj.x.run", EntityKind::Function)
            .symbol("proj.y.run", EntityKind::Function)
            .symbol("other.z.run", EntityKind::Function);

        let first = h.resolve("run", "proj.app");
        for _ in 0..10 {
            assert_eq!(h.resolve("run", "proj.app"), first);
        }
    }

    #[test]
    fn test_unresolved_call_yields_nothing() {
        let h = Harness::new();
        assert_eq!(h.resolve("totally_unknown", "proj.module"), None);
    }

    #[test]
    fn test_modules_never_receive_call_edges() {
        let mut h = Harness::new();
        h.symbol("proj.helper", EntityKind::Module);

        assert_eq!(h.resolve("helper", "proj.app"), None);
    }

    #[test]
    fn test_cpp_operator_builtin_and_user_override() {
        let mut h = Harness::new();
        let inference = TypeInference::new(&h.index, &h.cache, &QUERIES);
        let processor = CallProcessor::new("proj", &QUERIES, &h.index, &inference);

        // no user overload: builtin pseudo-function
        assert!(processor
            .resolve("operator_plus", "proj.main", None, None)
            .is_none());
        let builtin = processor
            .resolve_cpp_operator_call("operator_plus", "proj.main")
            .unwrap();
        assert_eq!(builtin.1, "builtin.cpp.operator_plus");
        drop(processor);
        drop(inference);

        // user overload wins through the generic cascade (nearest name)
        h.symbol("proj.vec.operator_plus", EntityKind::Function);
        let hit = h.resolve("operator_plus", "proj.main");
        assert_eq!(hit, Some("proj.vec.operator_plus".to_string()));
    }

    #[test]
    fn test_js_builtin_pattern_table() {
        assert_eq!(
            resolve_builtin_call("JSON.parse").unwrap().1,
            "builtin.JSON.parse"
        );
        assert_eq!(
            resolve_builtin_call("handler.bind").unwrap().1,
            "builtin.Function.prototype.bind"
        );
        assert_eq!(
            resolve_builtin_call("Base.prototype.init.call").unwrap().1,
            "Base.prototype.init"
        );
        assert!(resolve_builtin_call("custom_func").is_none());
    }

    #[test]
    fn test_import_distance_ranking() {
        // candidate sharing the caller's parent package is closest
        assert!(
            import_distance("proj.app.utils.helper", "proj.app.views")
                < import_distance("proj.lib.helper", "proj.app.views")
        );
        assert!(
            import_distance("proj.lib.helper", "proj.app.views")
                < import_distance("other.pkg.deep.helper", "proj.app.views")
        );
    }

    #[test]
    fn test_rust_scoped_import_repair() {
        let mut h = Harness::new();
        h.symbol("proj.src.store.Store", EntityKind::Class)
            .symbol("proj.src.store.Store.open", EntityKind::Method)
            .import("proj.src.main", "Store", "crate::store::Store");

        let hit = h.resolve_with("Store::open", "proj.src.main", None, None);
        assert_eq!(hit.unwrap().1, "proj.src.store.Store.open");
    }
}

/// Strategy 8: the fixed JavaScript builtin table plus `.bind`/`.call`/
/// `.apply` and prototype-invocation forms.
fn resolve_builtin_call(call_name: &str) -> Option<(EntityKind, String)> {
    if JS_BUILTIN_PATTERNS.contains(call_name) {
        return Some((EntityKind::Function, format!("builtin.{call_name}")));
    }

    for (suffix, target) in [
        (".bind", "builtin.Function.prototype.bind"),
        (".call", "builtin.Function.prototype.call"),
        (".apply", "builtin.Function.prototype.apply"),
    ] {
        if call_name.ends_with(suffix) {
            if call_name.contains(".prototype.")
                && (call_name.ends_with(".call") || call_name.ends_with(".apply"))
            {
                // Base.prototype.init.call(this) invokes Base.prototype.init
                let base = call_name.rsplit_once('.').map(|(b, _)| b)?;
                return Some((EntityKind::Function, base.to_string()));
            }
            return Some((EntityKind::Function, target.to_string()));
        }
    }

    None
}
