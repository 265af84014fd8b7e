//! Python type-inference front-end
//!
//! Builds the per-body local-variable type map: declared parameter types,
//! a name-similarity heuristic for bare parameters, two-phase assignment
//! processing (constructor calls before method-call right-hand sides),
//! loop and comprehension element types, and `self.attr` bindings from
//! both the current body and the class constructor. All tree walks use
//! explicit stacks.

use super::{looks_like_constructor, text_of, LocalTypes, TypeInference};
use crate::graph::query_nodes;
use crate::graph::symbols::EntityKind;
use crate::lang::Lang;
use tracing::debug;
use tree_sitter::Node;

// Name-similarity scoring for untyped parameters
const SCORE_EXACT: i32 = 100;
const SCORE_AFFIX: i32 = 90;
const SCORE_SUBSTRING_BASE: i32 = 80;

pub(super) fn build_local_variable_type_map(
    engine: &TypeInference<'_>,
    caller_node: Node<'_>,
    source: &[u8],
    module_qn: &str,
) -> LocalTypes {
    let mut locals = LocalTypes::new();

    infer_parameter_types(engine, caller_node, source, module_qn, &mut locals);

    // One traversal collects every node category, then phases run in
    // dependency order: constructor bindings feed method-call bindings,
    // which feed loop-variable and attribute inference.
    let mut assignments = Vec::new();
    let mut comprehensions = Vec::new();
    let mut for_statements = Vec::new();

    let mut stack = vec![caller_node];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "assignment" => assignments.push(node),
            "list_comprehension" => comprehensions.push(node),
            "for_statement" => for_statements.push(node),
            _ => {}
        }
        for i in (0..node.child_count()).rev() {
            if let Some(child) = node.child(i) {
                stack.push(child);
            }
        }
    }

    for assignment in &assignments {
        process_assignment_simple(assignment, source, &mut locals);
    }
    for assignment in &assignments {
        process_assignment_complex(engine, assignment, source, module_qn, &mut locals);
    }
    for comp in &comprehensions {
        analyze_comprehension(*comp, source, &mut locals);
    }
    for for_stmt in &for_statements {
        infer_loop_binding(*for_stmt, source, &mut locals);
    }
    for assignment in &assignments {
        process_self_assignment(engine, assignment, source, module_qn, &mut locals);
    }

    // non-constructor methods also see attributes bound in __init__
    analyze_class_init_assignments(engine, caller_node, source, module_qn, &mut locals);

    locals
}

// =============================================================================
// PARAMETERS
// =============================================================================

fn infer_parameter_types(
    engine: &TypeInference<'_>,
    caller_node: Node<'_>,
    source: &[u8],
    module_qn: &str,
    locals: &mut LocalTypes,
) {
    let Some(params) = caller_node.child_by_field_name("parameters") else {
        return;
    };

    for i in 0..params.named_child_count() {
        let Some(param) = params.named_child(i) else {
            continue;
        };
        match param.kind() {
            "identifier" => {
                let Some(name) = text_of(param, source) else {
                    continue;
                };
                if let Some(inferred) = infer_type_from_parameter_name(engine, name, module_qn) {
                    debug!(param = name, inferred = %inferred, "parameter typed by name similarity");
                    locals.insert(name.to_string(), inferred);
                }
            }
            "typed_parameter" | "typed_default_parameter" => {
                let name = param
                    .named_child(0)
                    .filter(|n| n.kind() == "identifier")
                    .or_else(|| param.child_by_field_name("name"))
                    .and_then(|n| text_of(n, source));
                let param_type = param
                    .child_by_field_name("type")
                    .and_then(|n| text_of(n, source));
                if let (Some(name), Some(param_type)) = (name, param_type) {
                    locals.insert(name.to_string(), param_type.to_string());
                }
            }
            _ => {}
        }
    }
}

/// Score a bare parameter name against class names visible in scope.
/// Best-effort sugar: absence is fine, a confident match is a type.
fn infer_type_from_parameter_name(
    engine: &TypeInference<'_>,
    param_name: &str,
    module_qn: &str,
) -> Option<String> {
    let symbols = &engine.index.symbols;
    let mut available: Vec<String> = Vec::new();

    for (qn, kind) in symbols.find_with_prefix(module_qn) {
        if kind == EntityKind::Class {
            if let Some((parent, simple)) = qn.rsplit_once('.') {
                if parent == module_qn {
                    available.push(simple.to_string());
                }
            }
        }
    }
    if let Some(import_map) = engine.index.imports.module(module_qn) {
        for (local_name, imported_qn) in import_map {
            if symbols.get(imported_qn) == Some(EntityKind::Class) {
                available.push(local_name.clone());
            }
        }
    }

    let param_lower = param_name.to_lowercase();
    let mut best: Option<String> = None;
    let mut highest = 0i32;

    for class_name in available {
        let class_lower = class_name.to_lowercase();
        let score = if param_lower == class_lower {
            SCORE_EXACT
        } else if class_lower.ends_with(&param_lower) || param_lower.ends_with(&class_lower) {
            SCORE_AFFIX
        } else if param_lower.contains(&class_lower) {
            (SCORE_SUBSTRING_BASE as f64 * (class_lower.len() as f64 / param_lower.len() as f64))
                as i32
        } else {
            0
        };

        if score > highest {
            highest = score;
            best = Some(class_name);
        }
    }

    best
}

// =============================================================================
// ASSIGNMENTS
// =============================================================================

fn assignment_parts<'t>(assignment: &Node<'t>) -> Option<(Node<'t>, Node<'t>)> {
    let left = assignment.child_by_field_name("left")?;
    let right = assignment.child_by_field_name("right")?;
    Some((left, right))
}

/// `var = Ctor(...)` and `var = [Ctor(...) for ...]`
fn process_assignment_simple(assignment: &Node<'_>, source: &[u8], locals: &mut LocalTypes) {
    let Some((left, right)) = assignment_parts(assignment) else {
        return;
    };
    if left.kind() != "identifier" {
        return;
    }
    let Some(var_name) = text_of(left, source) else {
        return;
    };
    if let Some(inferred) = constructor_type(right, source) {
        debug!(var = var_name, inferred = %inferred, "typed by constructor assignment");
        locals.insert(var_name.to_string(), inferred);
    }
}

fn constructor_type(expr: Node<'_>, source: &[u8]) -> Option<String> {
    match expr.kind() {
        "call" => {
            let func = expr.child_by_field_name("function")?;
            if func.kind() == "identifier" {
                let name = text_of(func, source)?;
                if looks_like_constructor(name) {
                    return Some(name.to_string());
                }
            }
            None
        }
        "list_comprehension" => {
            let body = expr.child_by_field_name("body")?;
            constructor_type(body, source)
        }
        // [User("a"), User("b")] types the variable by its element, which
        // is what loop inference wants from it later
        "list" => {
            for i in 0..expr.named_child_count() {
                if let Some(element) = expr.named_child(i) {
                    if element.kind() == "call" {
                        if let Some(ctor) = constructor_type(element, source) {
                            return Some(ctor);
                        }
                    }
                }
            }
            None
        }
        _ => None,
    }
}

/// `var = obj.method(...)`, typed through return-type inference. Runs
/// after the simple phase so the object's own type is already known.
fn process_assignment_complex(
    engine: &TypeInference<'_>,
    assignment: &Node<'_>,
    source: &[u8],
    module_qn: &str,
    locals: &mut LocalTypes,
) {
    let Some((left, right)) = assignment_parts(assignment) else {
        return;
    };
    if left.kind() != "identifier" {
        return;
    }
    let Some(var_name) = text_of(left, source) else {
        return;
    };
    if locals.contains_key(var_name) {
        return;
    }

    if right.kind() == "call" {
        let Some(func) = right.child_by_field_name("function") else {
            return;
        };
        if func.kind() == "attribute" {
            if let Some(call_text) = text_of(func, source) {
                if let Some(inferred) =
                    engine.infer_method_call_return_type(call_text, module_qn, Some(&*locals))
                {
                    debug!(var = var_name, inferred = %inferred, "typed by method return");
                    locals.insert(var_name.to_string(), inferred);
                }
            }
        }
    }
}

/// `self.attr = expr` inside the current body
fn process_self_assignment(
    engine: &TypeInference<'_>,
    assignment: &Node<'_>,
    source: &[u8],
    module_qn: &str,
    locals: &mut LocalTypes,
) {
    let Some((left, right)) = assignment_parts(assignment) else {
        return;
    };
    if left.kind() != "attribute" {
        return;
    }
    let Some(attr_text) = text_of(left, source) else {
        return;
    };
    if !attr_text.starts_with("self.") {
        return;
    }

    if let Some(inferred) = infer_assigned_type(engine, right, source, module_qn) {
        debug!(attr = attr_text, inferred = %inferred, "typed instance attribute");
        locals.insert(attr_text.to_string(), inferred);
    }
}

/// RHS typing used for attribute bindings: constructor calls directly,
/// method calls through return inference.
fn infer_assigned_type(
    engine: &TypeInference<'_>,
    expr: Node<'_>,
    source: &[u8],
    module_qn: &str,
) -> Option<String> {
    if let Some(ctor) = constructor_type(expr, source) {
        return Some(ctor);
    }
    if expr.kind() == "call" {
        let func = expr.child_by_field_name("function")?;
        if func.kind() == "attribute" {
            let call_text = text_of(func, source)?;
            return engine.infer_method_call_return_type(call_text, module_qn, None);
        }
    }
    None
}

// =============================================================================
// LOOPS AND COMPREHENSIONS
// =============================================================================

fn analyze_comprehension(comp_node: Node<'_>, source: &[u8], locals: &mut LocalTypes) {
    for i in 0..comp_node.named_child_count() {
        let Some(child) = comp_node.named_child(i) else {
            continue;
        };
        if child.kind() == "for_in_clause" {
            infer_loop_binding(child, source, locals);
        }
    }
}

/// `for x in iterable` — both statement and comprehension clause carry
/// left/right fields.
fn infer_loop_binding(node: Node<'_>, source: &[u8], locals: &mut LocalTypes) {
    let (Some(left), Some(right)) = (
        node.child_by_field_name("left"),
        node.child_by_field_name("right"),
    ) else {
        return;
    };
    if left.kind() != "identifier" {
        return;
    }
    let Some(loop_var) = text_of(left, source) else {
        return;
    };

    if let Some(element_type) = infer_iterable_element_type(right, source, locals) {
        debug!(var = loop_var, element = %element_type, "typed loop variable");
        locals.insert(loop_var.to_string(), element_type);
    }
}

fn infer_iterable_element_type(
    iterable: Node<'_>,
    source: &[u8],
    locals: &LocalTypes,
) -> Option<String> {
    match iterable.kind() {
        // [User("a"), User("b")] — first constructor call wins
        "list" => {
            for i in 0..iterable.named_child_count() {
                let Some(element) = iterable.named_child(i) else {
                    continue;
                };
                if let Some(ctor) = constructor_type(element, source) {
                    return Some(ctor);
                }
            }
            None
        }
        "identifier" => {
            let var_name = text_of(iterable, source)?;
            let var_type = locals.get(var_name)?;
            if var_type != "list" {
                Some(var_type.clone())
            } else {
                None
            }
        }
        _ => None,
    }
}

// =============================================================================
// SELF-ATTRIBUTE ANALYSIS
// =============================================================================

/// Collect `self.attr = expr` bindings under `node` (iterative; the
/// constructor analyser and module-level scans reuse this).
pub(super) fn analyze_self_assignments(
    engine: &TypeInference<'_>,
    node: Node<'_>,
    source: &[u8],
    module_qn: &str,
    locals: &mut LocalTypes,
) {
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        if current.kind() == "assignment" {
            process_self_assignment(engine, &current, source, module_qn, locals);
        }
        for i in (0..current.child_count()).rev() {
            if let Some(child) = current.child(i) {
                stack.push(child);
            }
        }
    }
}

/// Pull attribute bindings out of the enclosing class's `__init__` so a
/// method body sees what the constructor established.
fn analyze_class_init_assignments(
    engine: &TypeInference<'_>,
    caller_node: Node<'_>,
    source: &[u8],
    module_qn: &str,
    locals: &mut LocalTypes,
) {
    let Some(class_node) = find_containing_class(caller_node) else {
        return;
    };
    let Some(init) = find_init_method(class_node, source) else {
        return;
    };
    analyze_self_assignments(engine, init, source, module_qn, locals);
}

fn find_containing_class(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node.parent();
    while let Some(parent) = current {
        if parent.kind() == "class_definition" {
            return Some(parent);
        }
        current = parent.parent();
    }
    None
}

fn find_init_method<'t>(class_node: Node<'t>, source: &[u8]) -> Option<Node<'t>> {
    let body = class_node.child_by_field_name("body")?;
    for i in 0..body.named_child_count() {
        let child = body.named_child(i)?;
        let func = match child.kind() {
            "function_definition" => child,
            "decorated_definition" => match child.child_by_field_name("definition") {
                Some(def) if def.kind() == "function_definition" => def,
                _ => continue,
            },
            _ => continue,
        };
        let name = func
            .child_by_field_name("name")
            .and_then(|n| text_of(n, source));
        if name == Some("__init__") {
            return Some(func);
        }
    }
    None
}

// =============================================================================
// METHOD LOOKUP AND RETURN ANALYSIS
// =============================================================================

/// Find `class_name.method_name` inside a module AST.
pub(super) fn find_method_in_ast<'t>(
    engine: &TypeInference<'_>,
    root: Node<'t>,
    source: &[u8],
    class_name: &str,
    method_name: &str,
) -> Option<Node<'t>> {
    let bundle = engine.queries.get(Lang::Python);
    let class_query = bundle.classes.as_ref()?;

    for class_node in query_nodes(class_query, "class", root, source) {
        let found_name = class_node
            .child_by_field_name("name")
            .and_then(|n| text_of(n, source));
        if found_name != Some(class_name) {
            continue;
        }
        let Some(body) = class_node.child_by_field_name("body") else {
            continue;
        };
        for method_node in query_nodes(&bundle.functions, "function", body, source) {
            let found_method = method_node
                .child_by_field_name("name")
                .and_then(|n| text_of(n, source));
            if found_method == Some(method_name) {
                return Some(method_node);
            }
        }
    }
    None
}

/// Classify one Python return expression.
pub(super) fn analyze_return_expression(
    engine: &TypeInference<'_>,
    expr: Node<'_>,
    source: &[u8],
    method_qn: &str,
) -> Option<String> {
    match expr.kind() {
        "call" => {
            let func = expr.child_by_field_name("function")?;
            match func.kind() {
                "identifier" => {
                    let name = text_of(func, source)?;
                    if name == "cls" {
                        return super::class_of_method_qn(method_qn).map(str::to_string);
                    }
                    if looks_like_constructor(name) {
                        let module_qn = super::module_of_method_qn(method_qn);
                        return engine
                            .find_class_in_scope(name, &module_qn)
                            .or_else(|| Some(name.to_string()));
                    }
                    None
                }
                "attribute" => {
                    let call_text = text_of(func, source)?;
                    let module_qn = super::module_of_method_qn(method_qn);
                    engine.infer_method_call_return_type(call_text, &module_qn, None)
                }
                _ => None,
            }
        }
        "identifier" => {
            let identifier = text_of(expr, source)?;
            if identifier == "self" || identifier == "cls" {
                return super::class_of_method_qn(method_qn).map(str::to_string);
            }
            // `return local_var` — rebuild the method's own local map
            let module_qn = super::module_of_method_qn(method_qn);
            let parsed = engine.index.ast_for_module(&module_qn, engine.cache)?;
            let class_name = super::class_of_method_qn(method_qn)?;
            let method_name = method_qn.rsplit('.').next()?;
            let method_node =
                find_method_in_ast(engine, parsed.root(), &parsed.source, class_name, method_name)?;
            let local_map =
                build_local_variable_type_map(engine, method_node, &parsed.source, &module_qn);
            local_map.get(identifier).cloned()
        }
        "attribute" => {
            let object = expr.child_by_field_name("object")?;
            if object.kind() == "identifier" {
                let object_name = text_of(object, source)?;
                if object_name == "self" || object_name == "cls" {
                    return super::class_of_method_qn(method_qn).map(str::to_string);
                }
            }
            None
        }
        _ => None,
    }
}
