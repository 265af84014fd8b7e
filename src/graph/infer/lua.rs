//! Lua type-inference front-end
//!
//! Lua has no declarations to lean on, so this stays deliberately thin:
//! `local x = Thing.new()` and `x = Thing()` bind `x` to `Thing`, which is
//! enough for the resolver's `x:method()` path.

use super::{looks_like_constructor, text_of, LocalTypes, TypeInference};
use tree_sitter::Node;

pub(super) fn build_local_variable_type_map(
    _engine: &TypeInference<'_>,
    caller_node: Node<'_>,
    source: &[u8],
    _module_qn: &str,
) -> LocalTypes {
    let mut locals = LocalTypes::new();

    let mut stack = vec![caller_node];
    while let Some(node) = stack.pop() {
        if matches!(node.kind(), "variable_declaration" | "assignment_statement") {
            bind_assignment(node, source, &mut locals);
        }
        for i in (0..node.child_count()).rev() {
            if let Some(child) = node.child(i) {
                stack.push(child);
            }
        }
    }

    locals
}

/// Pair each assigned name with its expression and keep constructor-shaped
/// right-hand sides (`Thing.new(...)`, `Thing(...)`).
fn bind_assignment(node: Node<'_>, source: &[u8], locals: &mut LocalTypes) {
    let mut names = Vec::new();
    let mut values = Vec::new();

    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        match current.kind() {
            "variable_list" | "variable_declaration" | "assignment_statement" => {
                for i in (0..current.child_count()).rev() {
                    if let Some(child) = current.child(i) {
                        stack.push(child);
                    }
                }
            }
            "identifier" if values.is_empty() => {
                if let Some(text) = text_of(current, source) {
                    names.push(text.to_string());
                }
            }
            "expression_list" => {
                for i in 0..current.named_child_count() {
                    if let Some(child) = current.named_child(i) {
                        values.push(child);
                    }
                }
            }
            _ => {}
        }
    }

    names.reverse();
    for (name, value) in names.iter().zip(values.iter()) {
        if let Some(ctor) = constructor_shape(*value, source) {
            locals.insert(name.clone(), ctor);
        }
    }
}

fn constructor_shape(expr: Node<'_>, source: &[u8]) -> Option<String> {
    if expr.kind() != "function_call" {
        return None;
    }
    let name_node = expr.child_by_field_name("name")?;
    let text = text_of(name_node, source)?;

    // Thing.new(...) / Thing:create(...) / Thing(...)
    let base = text
        .split(['.', ':'])
        .next()
        .unwrap_or(text);
    if looks_like_constructor(base) {
        Some(base.to_string())
    } else {
        None
    }
}
