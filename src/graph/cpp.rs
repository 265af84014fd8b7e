//! C++ helpers
//!
//! Operator-symbol canonicalisation and name extraction from C++ declarator
//! trees. Out-of-class definitions (`Cls::method`) and deeply nested
//! qualifiers are resolved to their rightmost name plus the scope chain so
//! the definition extractor can file methods under the owning class.

use crate::parse::node_text;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use tree_sitter::Node;

/// Convert a C++ operator symbol to its canonical name.
pub fn operator_symbol_to_name(symbol: &str) -> String {
    let canonical = match symbol {
        "+" => "operator_plus",
        "-" => "operator_minus",
        "*" => "operator_multiply",
        "/" => "operator_divide",
        "%" => "operator_modulo",
        "=" => "operator_assign",
        "==" => "operator_equal",
        "!=" => "operator_not_equal",
        "<" => "operator_less",
        ">" => "operator_greater",
        "<=" => "operator_less_equal",
        ">=" => "operator_greater_equal",
        "&&" => "operator_logical_and",
        "||" => "operator_logical_or",
        "&" => "operator_bitwise_and",
        "|" => "operator_bitwise_or",
        "^" => "operator_bitwise_xor",
        "~" => "operator_bitwise_not",
        "!" => "operator_not",
        "<<" => "operator_left_shift",
        ">>" => "operator_right_shift",
        "++" => "operator_increment",
        "--" => "operator_decrement",
        "+=" => "operator_plus_assign",
        "-=" => "operator_minus_assign",
        "*=" => "operator_multiply_assign",
        "/=" => "operator_divide_assign",
        "%=" => "operator_modulo_assign",
        "&=" => "operator_and_assign",
        "|=" => "operator_or_assign",
        "^=" => "operator_xor_assign",
        "<<=" => "operator_left_shift_assign",
        ">>=" => "operator_right_shift_assign",
        "[]" => "operator_subscript",
        "()" => "operator_call",
        _ => return format!("operator_{}", symbol.replace(' ', "_")),
    };
    canonical.to_string()
}

/// Canonical operator names with a `builtin.cpp.*` pseudo-target.
pub static BUILTIN_CPP_OPERATORS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "operator_plus",
        "operator_minus",
        "operator_multiply",
        "operator_divide",
        "operator_modulo",
        "operator_equal",
        "operator_not_equal",
        "operator_less",
        "operator_greater",
        "operator_less_equal",
        "operator_greater_equal",
        "operator_assign",
        "operator_plus_assign",
        "operator_minus_assign",
        "operator_multiply_assign",
        "operator_divide_assign",
        "operator_modulo_assign",
        "operator_increment",
        "operator_decrement",
        "operator_left_shift",
        "operator_right_shift",
        "operator_bitwise_and",
        "operator_bitwise_or",
        "operator_bitwise_xor",
        "operator_bitwise_not",
        "operator_logical_and",
        "operator_logical_or",
        "operator_logical_not",
        "operator_not",
        "operator_subscript",
        "operator_call",
    ]
    .into_iter()
    .collect()
});

/// Name extracted from a C++ function-like node: the rightmost identifier
/// plus any `Cls::` scope qualifiers preceding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CppFunctionName {
    pub name: String,
    /// Scope path from a qualified declarator, e.g. `["Outer", "Calculator"]`
    pub scope: Vec<String>,
}

impl CppFunctionName {
    fn plain(name: String) -> Self {
        Self {
            name,
            scope: Vec::new(),
        }
    }
}

/// Extract the declared name from C++ function definitions and declarations.
pub fn extract_function_name(node: Node<'_>, source: &[u8]) -> Option<CppFunctionName> {
    match node.kind() {
        "function_definition" | "inline_method_definition" | "operator_cast_definition" => {
            find_function_declarator(node, source)
        }
        "declaration" | "field_declaration" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if child.kind() == "function_declarator" {
                    return name_from_declarator(child, source);
                }
            }
            None
        }
        "function_declarator" => name_from_declarator(node, source),
        "template_declaration" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if matches!(child.kind(), "function_definition" | "declaration") {
                    return extract_function_name(child, source);
                }
            }
            None
        }
        _ => None,
    }
}

fn find_function_declarator(node: Node<'_>, source: &[u8]) -> Option<CppFunctionName> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "function_declarator" => return name_from_declarator(child, source),
            "pointer_declarator" | "reference_declarator" => {
                if let Some(found) = find_function_declarator(child, source) {
                    return Some(found);
                }
            }
            _ => {}
        }
    }
    None
}

fn name_from_declarator(declarator: Node<'_>, source: &[u8]) -> Option<CppFunctionName> {
    let mut cursor = declarator.walk();
    for child in declarator.children(&mut cursor) {
        match child.kind() {
            "identifier" | "field_identifier" => {
                return node_text(child, source).map(|s| CppFunctionName::plain(s.to_string()));
            }
            "qualified_identifier" => return name_from_qualified(child, source),
            "operator_name" => {
                return Some(CppFunctionName::plain(operator_name_text(child, source)));
            }
            "destructor_name" => {
                return Some(CppFunctionName::plain(destructor_name_text(child, source)));
            }
            _ => {}
        }
    }
    None
}

/// Walk a qualified_identifier collecting scope parts and the final name.
fn name_from_qualified(node: Node<'_>, source: &[u8]) -> Option<CppFunctionName> {
    let mut scope = Vec::new();
    let mut current = node;

    loop {
        let scope_node = current.child_by_field_name("scope");
        let name_node = current.child_by_field_name("name")?;

        if let Some(scope_node) = scope_node {
            if let Some(text) = node_text(scope_node, source) {
                scope.push(text.to_string());
            }
        }

        match name_node.kind() {
            "qualified_identifier" => current = name_node,
            "operator_name" => {
                return Some(CppFunctionName {
                    name: operator_name_text(name_node, source),
                    scope,
                });
            }
            "destructor_name" => {
                return Some(CppFunctionName {
                    name: destructor_name_text(name_node, source),
                    scope,
                });
            }
            _ => {
                let name = node_text(name_node, source)?.to_string();
                return Some(CppFunctionName { name, scope });
            }
        }
    }
}

fn operator_name_text(node: Node<'_>, source: &[u8]) -> String {
    match node_text(node, source) {
        Some(text) if text.starts_with("operator") => {
            operator_symbol_to_name(text["operator".len()..].trim())
        }
        _ => "operator_unknown".to_string(),
    }
}

fn destructor_name_text(node: Node<'_>, source: &[u8]) -> String {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "identifier" {
            if let Some(text) = node_text(child, source) {
                return format!("~{text}");
            }
        }
    }
    "~destructor".to_string()
}

/// Build a qualified name for a C++ entity by walking enclosing namespaces.
pub fn build_qualified_name(node: Node<'_>, source: &[u8], module_qn: &str, name: &str) -> String {
    let mut namespaces = Vec::new();
    let mut current = node.parent();

    while let Some(parent) = current {
        if parent.kind() == "translation_unit" {
            break;
        }
        if parent.kind() == "namespace_definition" {
            let ns_name = parent
                .child_by_field_name("name")
                .and_then(|n| node_text(n, source))
                .map(str::to_string)
                .or_else(|| {
                    let mut cursor = parent.walk();
                    let found = parent.children(&mut cursor).find_map(|child| {
                        if matches!(child.kind(), "namespace_identifier" | "identifier") {
                            node_text(child, source).map(str::to_string)
                        } else {
                            None
                        }
                    });
                    found
                });
            if let Some(ns) = ns_name {
                namespaces.push(ns);
            }
        }
        current = parent.parent();
    }

    namespaces.reverse();
    if namespaces.is_empty() {
        format!("{module_qn}.{name}")
    } else {
        format!("{module_qn}.{}.{name}", namespaces.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::Lang;
    use crate::parse::parse_source;
    use std::path::Path;

    fn parse_cpp(code: &str) -> crate::parse::ParsedFile {
        parse_source(Path::new("test.cpp"), code.as_bytes().to_vec(), Lang::Cpp).unwrap()
    }

    fn first_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if current.kind() == kind {
                return Some(current);
            }
            for i in (0..current.child_count()).rev() {
                if let Some(child) = current.child(i) {
                    stack.push(child);
                }
            }
        }
        None
    }

    #[test]
    fn test_operator_symbol_mapping() {
        assert_eq!(operator_symbol_to_name("+"), "operator_plus");
        assert_eq!(operator_symbol_to_name("<<="), "operator_left_shift_assign");
        assert_eq!(operator_symbol_to_name("()"), "operator_call");
        assert_eq!(operator_symbol_to_name("<=>"), "operator_<=>");
    }

    #[test]
    fn test_plain_function_name() {
        let parsed = parse_cpp("int add(int a, int b) { return a + b; }");
        let func = first_of_kind(parsed.root(), "function_definition").unwrap();
        let name = extract_function_name(func, &parsed.source).unwrap();
        assert_eq!(name.name, "add");
        assert!(name.scope.is_empty());
    }

    #[test]
    fn test_out_of_class_definition_carries_scope() {
        let parsed = parse_cpp("int Calculator::add(int a, int b) { return a + b; }");
        let func = first_of_kind(parsed.root(), "function_definition").unwrap();
        let name = extract_function_name(func, &parsed.source).unwrap();
        assert_eq!(name.name, "add");
        assert_eq!(name.scope, ["Calculator"]);
    }

    #[test]
    fn test_operator_overload_name() {
        let parsed = parse_cpp(
            "struct V { int x; };\nV operator+(V a, V b) { return V{a.x + b.x}; }",
        );
        let mut found = None;
        let mut stack = vec![parsed.root()];
        while let Some(node) = stack.pop() {
            if node.kind() == "function_definition" {
                if let Some(name) = extract_function_name(node, &parsed.source) {
                    found = Some(name);
                }
            }
            for i in (0..node.child_count()).rev() {
                if let Some(child) = node.child(i) {
                    stack.push(child);
                }
            }
        }
        assert_eq!(found.unwrap().name, "operator_plus");
    }

    #[test]
    fn test_namespace_qualified_name() {
        let parsed = parse_cpp("namespace app { namespace db { void connect() {} } }");
        let func = first_of_kind(parsed.root(), "function_definition").unwrap();
        let qn = build_qualified_name(func, &parsed.source, "proj.src.main", "connect");
        assert_eq!(qn, "proj.src.main.app.db.connect");
    }
}
