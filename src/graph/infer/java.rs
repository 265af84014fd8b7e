//! Java type-inference front-end
//!
//! Java is statically typed, so the local map comes straight from
//! declarations: formal parameters, local variable declarations, and the
//! enclosing class's fields. The dedicated method-call resolver walks a
//! call's receiver and matches overloads by signature prefix against the
//! trie, distinguishing static receivers (a capitalised class name) from
//! typed locals and `this`.

use super::{looks_like_constructor, text_of, LocalTypes, TypeInference};
use crate::graph::resolve_class_name;
use crate::graph::symbols::EntityKind;
use tracing::debug;
use tree_sitter::Node;

pub(super) fn build_variable_type_map(
    _engine: &TypeInference<'_>,
    caller_node: Node<'_>,
    source: &[u8],
    _module_qn: &str,
) -> LocalTypes {
    let mut locals = LocalTypes::new();

    // formal parameters
    if let Some(params) = caller_node.child_by_field_name("parameters") {
        for i in 0..params.named_child_count() {
            let Some(param) = params.named_child(i) else {
                continue;
            };
            if !matches!(param.kind(), "formal_parameter" | "spread_parameter") {
                continue;
            }
            let name = param
                .child_by_field_name("name")
                .and_then(|n| text_of(n, source));
            let param_type = param
                .child_by_field_name("type")
                .and_then(|n| text_of(n, source));
            if let (Some(name), Some(param_type)) = (name, param_type) {
                locals.insert(name.to_string(), strip_generics(param_type));
            }
        }
    }

    // local declarations in the body
    let mut stack = vec![caller_node];
    while let Some(node) = stack.pop() {
        if node.kind() == "local_variable_declaration" {
            bind_declaration(node, source, &mut locals);
        }
        for i in (0..node.child_count()).rev() {
            if let Some(child) = node.child(i) {
                stack.push(child);
            }
        }
    }

    // fields of the enclosing class
    if let Some(class_node) = enclosing_class(caller_node) {
        if let Some(body) = class_node.child_by_field_name("body") {
            for i in 0..body.named_child_count() {
                let Some(member) = body.named_child(i) else {
                    continue;
                };
                if member.kind() == "field_declaration" {
                    bind_declaration(member, source, &mut locals);
                }
            }
        }
    }

    locals
}

/// `Type name = ...;` — both local and field declarations share the shape.
fn bind_declaration(declaration: Node<'_>, source: &[u8], locals: &mut LocalTypes) {
    let Some(decl_type) = declaration
        .child_by_field_name("type")
        .and_then(|n| text_of(n, source))
    else {
        return;
    };
    let mut cursor = declaration.walk();
    for child in declaration.children(&mut cursor) {
        if child.kind() != "variable_declarator" {
            continue;
        }
        if let Some(name) = child
            .child_by_field_name("name")
            .and_then(|n| text_of(n, source))
        {
            locals.insert(name.to_string(), strip_generics(decl_type));
        }
    }
}

fn strip_generics(type_text: &str) -> String {
    type_text
        .split('<')
        .next()
        .unwrap_or(type_text)
        .trim()
        .to_string()
}

fn enclosing_class(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node.parent();
    while let Some(parent) = current {
        if matches!(
            parent.kind(),
            "class_declaration" | "interface_declaration" | "enum_declaration"
        ) {
            return Some(parent);
        }
        current = parent.parent();
    }
    None
}

/// Resolve a Java `method_invocation` to a registered method QN. Method
/// QNs carry parenthesised signatures, so overloads are matched by prefix
/// plus argument count.
pub fn resolve_method_call(
    engine: &TypeInference<'_>,
    call_node: Node<'_>,
    source: &[u8],
    locals: &LocalTypes,
    module_qn: &str,
) -> Option<(EntityKind, String)> {
    let name = call_node
        .child_by_field_name("name")
        .and_then(|n| text_of(n, source))?;
    let arg_count = call_node
        .child_by_field_name("arguments")
        .map(|args| args.named_child_count())
        .unwrap_or(0);

    let class_qn = match call_node.child_by_field_name("object") {
        None => enclosing_class_qn(call_node, source, module_qn)?,
        Some(object) => match object.kind() {
            "this" => enclosing_class_qn(call_node, source, module_qn)?,
            "identifier" => {
                let object_name = text_of(object, source)?;
                if let Some(var_type) = locals.get(object_name) {
                    // instance call through a typed local or field
                    resolve_class_name(
                        var_type,
                        module_qn,
                        &engine.index.imports,
                        &engine.index.symbols,
                    )?
                } else if looks_like_constructor(object_name) {
                    // static call on a class name
                    resolve_class_name(
                        object_name,
                        module_qn,
                        &engine.index.imports,
                        &engine.index.symbols,
                    )?
                } else {
                    return None;
                }
            }
            _ => return None,
        },
    };

    let resolved = probe_method(engine, &class_qn, name, arg_count).or_else(|| {
        // breadth-first up the hierarchy with the same signature matching
        let mut queue: std::collections::VecDeque<String> = engine
            .index
            .inheritance
            .parents(&class_qn)
            .map(|p| p.to_vec())
            .unwrap_or_default()
            .into();
        let mut visited: std::collections::HashSet<String> = queue.iter().cloned().collect();
        while let Some(parent) = queue.pop_front() {
            if let Some(found) = probe_method(engine, &parent, name, arg_count) {
                return Some(found);
            }
            if let Some(grandparents) = engine.index.inheritance.parents(&parent) {
                for gp in grandparents {
                    if visited.insert(gp.clone()) {
                        queue.push_back(gp.clone());
                    }
                }
            }
        }
        None
    });

    if let Some((_, ref qn)) = resolved {
        debug!(method = name, resolved = %qn, "java invocation resolved");
    }
    resolved
}

/// Overload selection: prefer a signature with the same argument count,
/// fall back to the first candidate.
fn probe_method(
    engine: &TypeInference<'_>,
    class_qn: &str,
    method_name: &str,
    arg_count: usize,
) -> Option<(EntityKind, String)> {
    let symbols = &engine.index.symbols;
    let candidates = symbols.find_with_prefix(&format!("{class_qn}.{method_name}("));
    if candidates.is_empty() {
        return None;
    }

    for (qn, kind) in &candidates {
        if let Some(signature) = qn.rsplit('(').next() {
            let signature = signature.trim_end_matches(')');
            let param_count = if signature.is_empty() {
                0
            } else {
                signature.split(',').count()
            };
            if param_count == arg_count {
                return Some((*kind, qn.clone()));
            }
        }
    }
    let (qn, kind) = &candidates[0];
    Some((*kind, qn.clone()))
}

fn enclosing_class_qn(node: Node<'_>, source: &[u8], module_qn: &str) -> Option<String> {
    let class_node = enclosing_class(node)?;
    let name = class_node
        .child_by_field_name("name")
        .and_then(|n| text_of(n, source))?;
    Some(format!("{module_qn}.{name}"))
}
