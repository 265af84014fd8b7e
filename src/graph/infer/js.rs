//! JavaScript/TypeScript type-inference front-end
//!
//! `new Ctor()` bindings, TypeScript parameter annotations, `this.attr`
//! assignments (current body plus the class constructor), and return-type
//! classification for JS method ASTs.

use super::{looks_like_constructor, text_of, LocalTypes, TypeInference};
use tracing::debug;
use tree_sitter::Node;

pub(super) fn build_local_variable_type_map(
    engine: &TypeInference<'_>,
    caller_node: Node<'_>,
    source: &[u8],
    module_qn: &str,
) -> LocalTypes {
    let mut locals = LocalTypes::new();

    infer_parameter_annotations(caller_node, source, &mut locals);

    let mut declarators = Vec::new();
    let mut assignments = Vec::new();
    let mut stack = vec![caller_node];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "variable_declarator" => declarators.push(node),
            "assignment_expression" => assignments.push(node),
            _ => {}
        }
        for i in (0..node.child_count()).rev() {
            if let Some(child) = node.child(i) {
                stack.push(child);
            }
        }
    }

    for declarator in &declarators {
        process_declarator(engine, *declarator, source, module_qn, &mut locals);
    }
    for assignment in &assignments {
        process_this_assignment(*assignment, source, &mut locals);
    }

    // methods see what the constructor bound on `this`
    if let Some(class_body) = enclosing_class_body(caller_node) {
        if let Some(constructor) = find_method_node(class_body, source, "constructor") {
            let mut ctor_stack = vec![constructor];
            while let Some(node) = ctor_stack.pop() {
                if node.kind() == "assignment_expression" {
                    process_this_assignment(node, source, &mut locals);
                }
                for i in (0..node.child_count()).rev() {
                    if let Some(child) = node.child(i) {
                        ctor_stack.push(child);
                    }
                }
            }
        }
    }

    locals
}

/// TypeScript `(user: User)` annotations; plain JS parameters stay untyped.
fn infer_parameter_annotations(caller_node: Node<'_>, source: &[u8], locals: &mut LocalTypes) {
    let Some(params) = caller_node.child_by_field_name("parameters") else {
        return;
    };
    for i in 0..params.named_child_count() {
        let Some(param) = params.named_child(i) else {
            continue;
        };
        if !matches!(param.kind(), "required_parameter" | "optional_parameter") {
            continue;
        }
        let name = param
            .child_by_field_name("pattern")
            .filter(|n| n.kind() == "identifier")
            .and_then(|n| text_of(n, source));
        let annotation = param.child_by_field_name("type").and_then(|type_node| {
            // type_annotation wraps the actual type
            for j in 0..type_node.named_child_count() {
                if let Some(inner) = type_node.named_child(j) {
                    return text_of(inner, source);
                }
            }
            None
        });
        if let (Some(name), Some(annotation)) = (name, annotation) {
            locals.insert(name.to_string(), annotation.to_string());
        }
    }
}

/// `const user = new User(...)` and
/// `const label = widget.render()` (through return inference)
fn process_declarator(
    engine: &TypeInference<'_>,
    declarator: Node<'_>,
    source: &[u8],
    module_qn: &str,
    locals: &mut LocalTypes,
) {
    let Some(name_node) = declarator.child_by_field_name("name") else {
        return;
    };
    if name_node.kind() != "identifier" {
        return;
    }
    let Some(name) = text_of(name_node, source) else {
        return;
    };
    let Some(value) = declarator.child_by_field_name("value") else {
        return;
    };

    match value.kind() {
        "new_expression" => {
            if let Some(ctor) = new_expression_type(value, source) {
                debug!(var = name, ctor = %ctor, "typed by constructor");
                locals.insert(name.to_string(), ctor);
            }
        }
        "call_expression" => {
            if locals.contains_key(name) {
                return;
            }
            let Some(func) = value.child_by_field_name("function") else {
                return;
            };
            if func.kind() == "member_expression" {
                if let Some(call_text) = text_of(func, source) {
                    if let Some(inferred) =
                        engine.infer_method_call_return_type(call_text, module_qn, Some(&*locals))
                    {
                        locals.insert(name.to_string(), inferred);
                    }
                }
            }
        }
        _ => {}
    }
}

/// `this.widget = new Widget()` binds a `this.widget` entry.
fn process_this_assignment(assignment: Node<'_>, source: &[u8], locals: &mut LocalTypes) {
    let (Some(left), Some(right)) = (
        assignment.child_by_field_name("left"),
        assignment.child_by_field_name("right"),
    ) else {
        return;
    };
    if left.kind() != "member_expression" {
        return;
    }
    let Some(left_text) = text_of(left, source) else {
        return;
    };
    if !left_text.starts_with("this.") {
        return;
    }
    if right.kind() == "new_expression" {
        if let Some(ctor) = new_expression_type(right, source) {
            locals.insert(left_text.to_string(), ctor);
        }
    }
}

fn new_expression_type(new_expr: Node<'_>, source: &[u8]) -> Option<String> {
    let ctor = new_expr.child_by_field_name("constructor")?;
    if ctor.kind() == "identifier" {
        return text_of(ctor, source).map(str::to_string);
    }
    None
}

fn enclosing_class_body(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node.parent();
    while let Some(parent) = current {
        if parent.kind() == "class_body" {
            return Some(parent);
        }
        current = parent.parent();
    }
    None
}

fn find_method_node<'t>(class_body: Node<'t>, source: &[u8], method_name: &str) -> Option<Node<'t>> {
    for i in 0..class_body.named_child_count() {
        let child = class_body.named_child(i)?;
        if child.kind() != "method_definition" {
            continue;
        }
        let name = child
            .child_by_field_name("name")
            .and_then(|n| text_of(n, source));
        if name == Some(method_name) {
            return Some(child);
        }
    }
    None
}

/// Find `class_name.method_name` inside a JS/TS module AST.
pub(super) fn find_method_in_ast<'t>(
    root: Node<'t>,
    source: &[u8],
    class_name: &str,
    method_name: &str,
) -> Option<Node<'t>> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if matches!(node.kind(), "class_declaration" | "class") {
            let name = node
                .child_by_field_name("name")
                .and_then(|n| text_of(n, source));
            if name == Some(class_name) {
                if let Some(body) = node.child_by_field_name("body") {
                    return find_method_node(body, source, method_name);
                }
            }
        }
        for i in (0..node.child_count()).rev() {
            if let Some(child) = node.child(i) {
                stack.push(child);
            }
        }
    }
    None
}

/// Classify one JS/TS return expression.
pub(super) fn analyze_return_expression(
    engine: &TypeInference<'_>,
    expr: Node<'_>,
    source: &[u8],
    method_qn: &str,
) -> Option<String> {
    match expr.kind() {
        "new_expression" => {
            let ctor = new_expression_type(expr, source)?;
            if looks_like_constructor(&ctor) {
                Some(ctor)
            } else {
                None
            }
        }
        "this" => super::class_of_method_qn(method_qn).map(str::to_string),
        "identifier" => {
            let identifier = text_of(expr, source)?;
            let module_qn = super::module_of_method_qn(method_qn);
            let parsed = engine.index.ast_for_module(&module_qn, engine.cache)?;
            let class_name = super::class_of_method_qn(method_qn)?;
            let method_name = method_qn.rsplit('.').next()?;
            let method_node =
                find_method_in_ast(parsed.root(), &parsed.source, class_name, method_name)?;
            let local_map =
                build_local_variable_type_map(engine, method_node, &parsed.source, &module_qn);
            local_map.get(identifier).cloned()
        }
        "member_expression" => {
            let object = expr.child_by_field_name("object")?;
            if object.kind() == "this" {
                return super::class_of_method_qn(method_qn).map(str::to_string);
            }
            None
        }
        "call_expression" => {
            let func = expr.child_by_field_name("function")?;
            if func.kind() == "member_expression" {
                let call_text = text_of(func, source)?;
                let module_qn = super::module_of_method_qn(method_qn);
                return engine.infer_method_call_return_type(call_text, &module_qn, None);
            }
            None
        }
        _ => None,
    }
}
