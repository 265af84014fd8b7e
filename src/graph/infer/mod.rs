//! Type inference
//!
//! Flow-insensitive, intra-procedural typing of locals plus memoised
//! method-return-type inference. The per-language front-ends share nothing
//! beyond `build_local_variable_type_map`; dispatch is over the language
//! tag, with the generic (empty) map as the default arm.
//!
//! The return-type cache and the recursion-in-progress set live in
//! `RefCell`s: pass 2 is single-threaded and the engine is handed around
//! as a shared reference. A method QN already in the in-progress set makes
//! the nested inference return absent, which is what keeps recursive and
//! mutually-recursive code terminating.

pub mod java;
pub mod js;
pub mod lua;
pub mod python;

use crate::graph::{resolve_class_name, CodeIndex};
use crate::lang::{Lang, QuerySet};
use crate::parse::{node_text, AstCache};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use tree_sitter::Node;

/// identifier → inferred type (a simple class name or a qualified name)
pub type LocalTypes = HashMap<String, String>;

/// Splits the final `.segment` off a chained call
static CHAIN_TAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.([^.()]+)$").unwrap());
/// A `)` followed by a final `.segment` marks a method chain
static CHAIN_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\)\.[^)]*$").unwrap());

pub struct TypeInference<'idx> {
    pub(crate) index: &'idx CodeIndex,
    pub(crate) cache: &'idx AstCache,
    pub(crate) queries: &'idx QuerySet,
    return_types: RefCell<HashMap<String, Option<String>>>,
    in_progress: RefCell<HashSet<String>>,
}

impl<'idx> TypeInference<'idx> {
    pub fn new(index: &'idx CodeIndex, cache: &'idx AstCache, queries: &'idx QuerySet) -> Self {
        Self {
            index,
            cache,
            queries,
            return_types: RefCell::new(HashMap::new()),
            in_progress: RefCell::new(HashSet::new()),
        }
    }

    /// True when no inference is in flight; the guard set must drain back
    /// to empty after every top-level call.
    pub fn in_progress_is_empty(&self) -> bool {
        self.in_progress.borrow().is_empty()
    }

    /// Build the local-variable type map for one function/method/module
    /// body. Language front-ends own the shape of their ASTs; anything
    /// without a front-end gets the empty map.
    pub fn build_local_variable_type_map(
        &self,
        caller_node: Node<'_>,
        source: &[u8],
        module_qn: &str,
        lang: Lang,
    ) -> LocalTypes {
        match lang {
            Lang::Python => python::build_local_variable_type_map(self, caller_node, source, module_qn),
            Lang::JavaScript | Lang::TypeScript => {
                js::build_local_variable_type_map(self, caller_node, source, module_qn)
            }
            Lang::Java => java::build_variable_type_map(self, caller_node, source, module_qn),
            Lang::Lua => lua::build_local_variable_type_map(self, caller_node, source, module_qn),
            _ => LocalTypes::new(),
        }
    }

    /// Infer the static type of an expression string such as `user` or
    /// `self.repo.fetch(id)`. Used by the resolver's chained-call strategy.
    pub fn infer_expression_return_type(
        &self,
        expression: &str,
        module_qn: &str,
        locals: Option<&LocalTypes>,
    ) -> Option<String> {
        if !expression.contains('(') {
            if let Some(var_type) = locals.and_then(|l| l.get(expression)) {
                if let Some(imported) = self.index.imports.lookup(module_qn, var_type) {
                    return Some(imported.to_string());
                }
                return resolve_class_name(var_type, module_qn, &self.index.imports, &self.index.symbols);
            }
        }
        self.infer_method_call_return_type(expression, module_qn, locals)
    }

    /// Infer the return type of a textual method call (`obj.method(...)`,
    /// possibly chained). Guarded per `(module, call)` so recursive chains
    /// return absent instead of spinning.
    pub fn infer_method_call_return_type(
        &self,
        method_call: &str,
        module_qn: &str,
        locals: Option<&LocalTypes>,
    ) -> Option<String> {
        let guard_key = format!("{module_qn}:{method_call}");
        if !self.in_progress.borrow_mut().insert(guard_key.clone()) {
            debug!(call = method_call, "recursion guard hit (call)");
            return None;
        }

        let result = if method_call.contains('.') && is_method_chain(method_call) {
            self.infer_chained_call_return_type(method_call, module_qn, locals)
        } else {
            self.infer_simple_call_return_type(method_call, module_qn, locals)
        };

        self.in_progress.borrow_mut().remove(&guard_key);
        result
    }

    /// `a.b().c()` resolves left-to-right: the object expression's type
    /// first, then the final method's return type on that class.
    fn infer_chained_call_return_type(
        &self,
        call_name: &str,
        module_qn: &str,
        locals: Option<&LocalTypes>,
    ) -> Option<String> {
        let captures = CHAIN_TAIL.captures(call_name)?;
        let tail = captures.get(1)?;
        let final_method = tail.as_str();
        let object_expr = &call_name[..tail.start() - 1];

        let object_type = self.infer_object_type(object_expr, module_qn, locals)?;
        let full_object_type = if object_type.contains('.') {
            object_type
        } else {
            resolve_class_name(&object_type, module_qn, &self.index.imports, &self.index.symbols)
                .unwrap_or(object_type)
        };

        let method_qn = format!("{full_object_type}.{final_method}");
        self.method_return_type(&method_qn)
    }

    fn infer_object_type(
        &self,
        object_expr: &str,
        module_qn: &str,
        locals: Option<&LocalTypes>,
    ) -> Option<String> {
        if !object_expr.contains('(') {
            if let Some(var_type) = locals.and_then(|l| l.get(object_expr)) {
                return Some(var_type.clone());
            }
        }
        if object_expr.contains('(') && object_expr.contains(')') {
            return self.infer_method_call_return_type(object_expr, module_qn, locals);
        }
        None
    }

    fn infer_simple_call_return_type(
        &self,
        method_call: &str,
        module_qn: &str,
        locals: Option<&LocalTypes>,
    ) -> Option<String> {
        let method_qn = self.resolve_method_qualified_name(method_call, module_qn, locals)?;
        self.method_return_type(&method_qn)
    }

    /// Memoised return-type lookup for a fully qualified method.
    pub fn method_return_type(&self, method_qn: &str) -> Option<String> {
        if let Some(cached) = self.return_types.borrow().get(method_qn) {
            return cached.clone();
        }
        if !self.in_progress.borrow_mut().insert(method_qn.to_string()) {
            debug!(method = method_qn, "recursion guard hit (method)");
            return None;
        }

        let result = self
            .find_method_ast_node(method_qn)
            .and_then(|(node, source, lang)| {
                self.analyze_return_statements(node, source, method_qn, lang)
            });

        self.return_types
            .borrow_mut()
            .insert(method_qn.to_string(), result.clone());
        self.in_progress.borrow_mut().remove(method_qn);
        result
    }

    /// `self.manager.create_user` → the method QN it names, via locals,
    /// attribute typing, and class lookups.
    fn resolve_method_qualified_name(
        &self,
        method_call: &str,
        module_qn: &str,
        locals: Option<&LocalTypes>,
    ) -> Option<String> {
        let parts: Vec<&str> = method_call.split('.').collect();
        if parts.len() < 2 {
            return None;
        }

        if parts.len() == 2 {
            let class_name = parts[0];
            let method_name = parts[1].split('(').next().unwrap_or(parts[1]);

            if let Some(var_type) = locals.and_then(|l| l.get(class_name)) {
                return self.resolve_class_method(var_type, method_name, module_qn);
            }
            return self.resolve_class_method(class_name, method_name, module_qn);
        }

        if parts[0] == "self" && parts.len() >= 3 {
            let attribute_name = parts[1];
            let method_name = parts[parts.len() - 1].split('(').next()?;
            if let Some(attribute_type) = self.infer_attribute_type(attribute_name, module_qn) {
                return self.resolve_class_method(&attribute_type, method_name, module_qn);
            }
        }

        let potential_class = parts[parts.len() - 2];
        let method_name = parts[parts.len() - 1].split('(').next()?;
        self.resolve_class_method(potential_class, method_name, module_qn)
    }

    /// Resolve `ClassName.method` to a registered Method QN: same module,
    /// imported class, then any class with that simple name.
    pub(crate) fn resolve_class_method(
        &self,
        class_name: &str,
        method_name: &str,
        module_qn: &str,
    ) -> Option<String> {
        use crate::graph::symbols::EntityKind;
        let symbols = &self.index.symbols;

        let probe = |class_qn: &str| -> Option<String> {
            if symbols.get(class_qn) != Some(EntityKind::Class) {
                return None;
            }
            let method_qn = format!("{class_qn}.{method_name}");
            if symbols.get(&method_qn) == Some(EntityKind::Method) {
                Some(method_qn)
            } else {
                None
            }
        };

        if let Some(found) = probe(&format!("{module_qn}.{class_name}")) {
            return Some(found);
        }

        if let Some(imported) = self.index.imports.lookup(module_qn, class_name) {
            if let Some(found) = probe(imported) {
                return Some(found);
            }
        }

        for qn in symbols.find_by_simple_name(class_name) {
            if let Some(found) = probe(&qn) {
                debug!(class = class_name, method = method_name, found = %found, "resolved by simple name");
                return Some(found);
            }
        }

        None
    }

    /// Type of `self.<attribute>`: scan the module's AST for constructor
    /// assignments, falling back to a snake_case → CamelCase guess checked
    /// against classes in scope.
    pub(crate) fn infer_attribute_type(
        &self,
        attribute_name: &str,
        module_qn: &str,
    ) -> Option<String> {
        if let Some(parsed) = self.index.ast_for_module(module_qn, self.cache) {
            if parsed.lang == Lang::Python {
                let mut instance_vars = LocalTypes::new();
                python::analyze_self_assignments(
                    self,
                    parsed.root(),
                    &parsed.source,
                    module_qn,
                    &mut instance_vars,
                );
                if let Some(found) = instance_vars.get(&format!("self.{attribute_name}")) {
                    return Some(found.clone());
                }
            }
        }

        let class_name: String = attribute_name
            .split('_')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect();
        self.find_class_in_scope(&class_name, module_qn)
    }

    /// Is `class_name` visible in `module_qn` (locally, imported, or by
    /// simple name anywhere)? Returns the simple name itself.
    pub(crate) fn find_class_in_scope(
        &self,
        class_name: &str,
        module_qn: &str,
    ) -> Option<String> {
        use crate::graph::symbols::EntityKind;
        let symbols = &self.index.symbols;

        if symbols.get(&format!("{module_qn}.{class_name}")) == Some(EntityKind::Class) {
            return Some(class_name.to_string());
        }
        if let Some(imported) = self.index.imports.lookup(module_qn, class_name) {
            if symbols.get(imported) == Some(EntityKind::Class) {
                return Some(class_name.to_string());
            }
        }
        if symbols
            .find_by_simple_name(class_name)
            .iter()
            .any(|qn| symbols.get(qn) == Some(EntityKind::Class))
        {
            return Some(class_name.to_string());
        }
        None
    }

    // =========================================================================
    // METHOD AST LOOKUP AND RETURN ANALYSIS
    // =========================================================================

    /// Locate a method's AST via the module→file index, then scan the
    /// class body for it.
    fn find_method_ast_node(&self, method_qn: &str) -> Option<(Node<'idx>, &'idx [u8], Lang)> {
        let parts: Vec<&str> = method_qn.split('.').collect();
        if parts.len() < 3 {
            return None;
        }
        let class_name = parts[parts.len() - 2];
        let method_name = parts[parts.len() - 1];
        let module_qn = parts[..parts.len() - 2].join(".");

        let parsed = self.index.ast_for_module(&module_qn, self.cache)?;
        let node = match parsed.lang {
            Lang::Python => python::find_method_in_ast(
                self,
                parsed.root(),
                &parsed.source,
                class_name,
                method_name,
            ),
            Lang::JavaScript | Lang::TypeScript => {
                js::find_method_in_ast(parsed.root(), &parsed.source, class_name, method_name)
            }
            _ => None,
        }?;
        Some((node, parsed.source.as_slice(), parsed.lang))
    }

    /// First classifiable `return` expression wins.
    pub(crate) fn analyze_return_statements(
        &self,
        method_node: Node<'_>,
        source: &[u8],
        method_qn: &str,
        lang: Lang,
    ) -> Option<String> {
        let mut returns = Vec::new();
        let mut stack = vec![method_node];
        while let Some(node) = stack.pop() {
            if node.kind() == "return_statement" {
                returns.push(node);
            }
            for i in (0..node.child_count()).rev() {
                if let Some(child) = node.child(i) {
                    stack.push(child);
                }
            }
        }
        returns.sort_by_key(|n| n.start_byte());

        for return_node in returns {
            let mut value = None;
            for i in 0..return_node.child_count() {
                let Some(child) = return_node.child(i) else {
                    continue;
                };
                if child.is_named() {
                    value = Some(child);
                    break;
                }
            }
            if let Some(expr) = value {
                let inferred = match lang {
                    Lang::Python => {
                        python::analyze_return_expression(self, expr, source, method_qn)
                    }
                    Lang::JavaScript | Lang::TypeScript => {
                        js::analyze_return_expression(self, expr, source, method_qn)
                    }
                    _ => None,
                };
                if inferred.is_some() {
                    return inferred;
                }
            }
        }
        None
    }
}

/// Does the call text look like a chain (`...).tail`) rather than a plain
/// `obj.method`?
pub fn is_method_chain(call_name: &str) -> bool {
    call_name.contains('(') && call_name.contains(')') && CHAIN_SHAPE.is_match(call_name)
}

/// The enclosing class's simple name, read off a method QN.
pub(crate) fn class_of_method_qn(method_qn: &str) -> Option<&str> {
    let parts: Vec<&str> = method_qn.split('.').collect();
    if parts.len() >= 2 {
        Some(parts[parts.len() - 2])
    } else {
        None
    }
}

/// The module part of a method QN (`a.b.Cls.m` → `a.b`).
pub(crate) fn module_of_method_qn(method_qn: &str) -> String {
    let parts: Vec<&str> = method_qn.split('.').collect();
    if parts.len() > 2 {
        parts[..parts.len() - 2].join(".")
    } else {
        method_qn.to_string()
    }
}

/// Shared helper: does this name start with an uppercase letter (the
/// constructor-call convention)?
pub(crate) fn looks_like_constructor(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_uppercase())
}

pub(crate) fn text_of<'a>(node: Node<'_>, source: &'a [u8]) -> Option<&'a str> {
    node_text(node, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::IndexConfig;
    use crate::graph::definitions::DefinitionExtractor;
    use crate::graph::sink::MemorySink;
    use crate::graph::structure::StructureWalker;
    use crate::parse::parse_source;
    use std::fs;
    use std::path::Path;

    struct Fixture {
        index: CodeIndex,
        cache: AstCache,
        queries: QuerySet,
        _dir: tempfile::TempDir,
    }

    /// Run pass 1 over fixture files so inference has a populated index
    /// and AST cache to work against.
    fn prepare(files: &[(&str, &str)]) -> Fixture {
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
        let mut cache = AstCache::new();
        let extractor = DefinitionExtractor::new("proj", dir.path(), &queries);
        for (path, content) in files {
            let relative = Path::new(path);
            let lang = Lang::from_path(relative).unwrap();
            let parsed = parse_source(relative, content.as_bytes().to_vec(), lang).unwrap();
            extractor
                .process_file(relative, &parsed, &mut index, &walker, &mut sink)
                .unwrap();
            cache.insert(relative.to_path_buf(), parsed);
        }

        Fixture {
            index,
            cache,
            queries,
            _dir: dir,
        }
    }

    #[test]
    fn test_constructor_return_type() {
        let fixture = prepare(&[(
            "models.py",
            r#"
class User:
    def clone(self):
        return User(self.name)
"#,
        )]);
        let engine = TypeInference::new(&fixture.index, &fixture.cache, &fixture.queries);

        assert_eq!(
            engine.method_return_type("proj.models.User.clone"),
            Some("User".to_string())
        );
        assert!(engine.in_progress_is_empty());
    }

    #[test]
    fn test_self_return_is_enclosing_class() {
        let fixture = prepare(&[(
            "query.py",
            r#"
class Query:
    def filter(self, cond):
        return self
"#,
        )]);
        let engine = TypeInference::new(&fixture.index, &fixture.cache, &fixture.queries);

        assert_eq!(
            engine.method_return_type("proj.query.Query.filter"),
            Some("Query".to_string())
        );
    }

    #[test]
    fn test_recursive_method_terminates_and_guard_drains() {
        // clone() types `result` through its own return type; the guard
        // must absorb the cycle and leave the in-progress set empty
        let fixture = prepare(&[(
            "looped.py",
            r#"
class A:
    def clone(self):
        other = A()
        result = other.clone()
        return result
"#,
        )]);
        let engine = TypeInference::new(&fixture.index, &fixture.cache, &fixture.queries);

        assert_eq!(engine.method_return_type("proj.looped.A.clone"), None);
        assert!(engine.in_progress_is_empty());
    }

    #[test]
    fn test_mutually_recursive_methods_terminate() {
        let fixture = prepare(&[(
            "pair.py",
            r#"
class A:
    def make_b(self):
        b = B()
        out = b.make_a()
        return out

class B:
    def make_a(self):
        a = A()
        out = a.make_b()
        return out
"#,
        )]);
        let engine = TypeInference::new(&fixture.index, &fixture.cache, &fixture.queries);

        let _ = engine.method_return_type("proj.pair.A.make_b");
        let _ = engine.method_return_type("proj.pair.B.make_a");
        assert!(engine.in_progress_is_empty());
    }

    #[test]
    fn test_return_type_is_memoised() {
        let fixture = prepare(&[(
            "models.py",
            r#"
class User:
    def clone(self):
        return User(self.name)
"#,
        )]);
        let engine = TypeInference::new(&fixture.index, &fixture.cache, &fixture.queries);

        let first = engine.method_return_type("proj.models.User.clone");
        let second = engine.method_return_type("proj.models.User.clone");
        assert_eq!(first, second);
        assert_eq!(first, Some("User".to_string()));
    }

    #[test]
    fn test_expression_type_of_known_local() {
        let fixture = prepare(&[(
            "models.py",
            "class User:\n    def get_name(self):\n        return self.name\n",
        )]);
        let engine = TypeInference::new(&fixture.index, &fixture.cache, &fixture.queries);

        let mut locals = LocalTypes::new();
        locals.insert("user".to_string(), "User".to_string());

        assert_eq!(
            engine.infer_expression_return_type("user", "proj.models", Some(&locals)),
            Some("proj.models.User".to_string())
        );
    }

    #[test]
    fn test_method_chain_detection() {
        assert!(is_method_chain("user.repo().fetch"));
        assert!(is_method_chain("a.b().c().d"));
        assert!(!is_method_chain("user.fetch"));
        assert!(!is_method_chain("fetch(user)"));
    }

    #[test]
    fn test_method_qn_helpers() {
        assert_eq!(class_of_method_qn("p.m.Cls.run"), Some("Cls"));
        assert_eq!(module_of_method_qn("p.m.Cls.run"), "p.m");
        assert_eq!(module_of_method_qn("Cls.run"), "Cls.run");
    }

    #[test]
    fn test_constructor_convention() {
        assert!(looks_like_constructor("User"));
        assert!(!looks_like_constructor("user"));
        assert!(!looks_like_constructor(""));
    }
}
