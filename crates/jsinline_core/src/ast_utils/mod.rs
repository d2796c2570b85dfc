//! Small tree queries shared by every pass.

mod declarator;
mod ident_position;
mod object_lookup;
mod property_name;

pub use declarator::{evaluated_once_per_declaration, read_after_declaration, remove_declarator};
pub use ident_position::{can_inline_identifier, ident_role, IdentRole};
pub use object_lookup::{property_value, Resolution};
pub use property_name::property_name;

use crate::ast::{Ast, Node, NodeId};

/// Identifier nodes introduced by a binding pattern, in source order.
pub fn binding_identifiers(ast: &Ast, pattern: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    collect_binding_identifiers(ast, pattern, &mut out);
    out
}

fn collect_binding_identifiers(ast: &Ast, pattern: NodeId, out: &mut Vec<NodeId>) {
    match ast.node(pattern) {
        Node::Ident { .. } => out.push(pattern),
        Node::ObjectPattern { properties } => {
            for prop in properties {
                match ast.node(*prop) {
                    Node::Property { value, .. } => collect_binding_identifiers(ast, *value, out),
                    _ => collect_binding_identifiers(ast, *prop, out),
                }
            }
        }
        Node::ArrayPattern { elements } => {
            for element in elements {
                collect_binding_identifiers(ast, *element, out);
            }
        }
        Node::AssignPattern { target, .. } => collect_binding_identifiers(ast, *target, out),
        Node::Rest { arg } => collect_binding_identifiers(ast, *arg, out),
        _ => {}
    }
}

/// The nearest function node enclosing `id`, not counting `id` itself.
pub fn enclosing_function(ast: &Ast, id: NodeId) -> Option<NodeId> {
    ast.ancestors(id).find(|a| ast.node(*a).is_function())
}

/// The statement `id` belongs to: `id` itself when it is a statement, otherwise its nearest
/// statement ancestor.
pub fn enclosing_statement(ast: &Ast, id: NodeId) -> Option<NodeId> {
    std::iter::once(id)
        .chain(ast.ancestors(id))
        .find(|a| ast.node(*a).is_statement())
}

/// Whether `function` reads its own `this` or `arguments`, looking through arrow functions
/// but not into nested non-arrow functions or classes, which rebind both.
pub fn uses_own_this(ast: &Ast, function: NodeId) -> bool {
    let mut stack = ast.children(function);
    while let Some(id) = stack.pop() {
        match ast.node(id) {
            Node::This => return true,
            Node::Ident { name } if name == "arguments" && ident_role(ast, id).is_lexical() => {
                return true
            }
            Node::Function { .. } if !ast.node(id).is_arrow() => {}
            Node::Class { .. } => {}
            node => stack.extend(node.children()),
        }
    }
    false
}
