//! Effect classification.
//!
//! [`is_pure`] answers "may this evaluation be dropped, or an effect moved in front of it": it
//! admits literals, closures, reads of constant bindings and operators over such operands.
//! Calls, `new`, member reads, object/array construction and anything that writes are impure.

use crate::ast::{Ast, Node, NodeId, UnaryOp};
use crate::scope::ScopeTree;

const PURE_GLOBALS: &[&str] = &["undefined", "NaN", "Infinity"];

pub fn is_pure(ast: &Ast, scopes: &ScopeTree, id: NodeId) -> bool {
    is_pure_with(ast, id, &|ident| is_constant_read(ast, scopes, ident))
}

/// [`is_pure`] with a caller-supplied verdict for identifier reads.
pub fn is_pure_with(ast: &Ast, id: NodeId, pure_read: &dyn Fn(NodeId) -> bool) -> bool {
    match ast.node(id) {
        Node::Number { .. }
        | Node::Str { .. }
        | Node::Bool { .. }
        | Node::Null
        | Node::This
        | Node::Function { .. } => true,
        Node::Ident { .. } => pure_read(id),
        Node::Unary { op, arg } => *op != UnaryOp::Delete && is_pure_with(ast, *arg, pure_read),
        Node::Binary { left, right, .. } | Node::Logical { left, right, .. } => {
            is_pure_with(ast, *left, pure_read) && is_pure_with(ast, *right, pure_read)
        }
        Node::Conditional {
            test,
            consequent,
            alternate,
        } => [*test, *consequent, *alternate]
            .into_iter()
            .all(|part| is_pure_with(ast, part, pure_read)),
        Node::Sequence { exprs } => exprs.iter().all(|e| is_pure_with(ast, *e, pure_read)),
        _ => false,
    }
}

/// Reads of constant bindings and of a few immutable globals.
pub fn is_constant_read(ast: &Ast, scopes: &ScopeTree, ident: NodeId) -> bool {
    match scopes.resolve(ident) {
        Some(binding) => scopes.binding(binding).is_constant(),
        None => ast
            .ident_name(ident)
            .is_some_and(|name| PURE_GLOBALS.contains(&name)),
    }
}

/// Whether `target` is evaluated unconditionally and eagerly within `root`, and everything the
/// program evaluates before it inside `root` satisfies `pred`.
pub fn evaluated_before(
    ast: &Ast,
    root: NodeId,
    target: NodeId,
    pred: &dyn Fn(NodeId) -> bool,
) -> bool {
    let mut child = target;
    while child != root {
        let Some(parent) = ast.parent(child) else {
            return false;
        };
        let preceding = match ast.node(parent) {
            Node::Function { .. }
            | Node::Class { .. }
            | Node::While { .. }
            | Node::For { .. }
            | Node::Try { .. }
            | Node::Catch { .. } => return false,
            Node::Logical { left, .. } | Node::Conditional { test: left, .. }
                if *left != child =>
            {
                return false
            }
            Node::If { test, .. } if *test != child => return false,
            Node::Member {
                object,
                property,
                computed,
            } => {
                if *property == child && *computed {
                    vec![*object]
                } else {
                    Vec::new()
                }
            }
            Node::Assign { target, .. } if *target != child => match ast.node(*target) {
                Node::Member {
                    object,
                    property,
                    computed,
                } => {
                    let mut operands = vec![*object];
                    if *computed {
                        operands.push(*property);
                    }
                    operands
                }
                _ => Vec::new(),
            },
            Node::Declarator { .. } => Vec::new(),
            Node::Property { key, computed, .. } => {
                if *computed && *key != child {
                    vec![*key]
                } else {
                    Vec::new()
                }
            }
            other => other
                .children()
                .into_iter()
                .take_while(|sibling| *sibling != child)
                .collect(),
        };
        if !preceding.into_iter().all(|operand| value_operand(ast, operand, pred)) {
            return false;
        }
        child = parent;
    }
    true
}

/// Applies `pred` to an operand, looking through the positions that hold names rather than
/// values.
fn value_operand(ast: &Ast, operand: NodeId, pred: &dyn Fn(NodeId) -> bool) -> bool {
    match ast.node(operand) {
        Node::Declarator { init, .. } => init.is_none_or(|init| pred(init)),
        Node::Property {
            key,
            value,
            computed,
            method,
            ..
        } => (!*computed || pred(*key)) && (*method || pred(*value)),
        Node::Spread { .. } => false,
        _ => pred(operand),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    /// Analyses `source` and returns the initializer of the last declarator.
    fn last_init(source: &str) -> (Ast, ScopeTree, NodeId) {
        let (ast, diagnostics) = parse_program(source);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let scopes = ScopeTree::analyze(&ast);
        let init = ast
            .descendants(ast.root())
            .into_iter()
            .filter_map(|id| match ast.node(id) {
                Node::Declarator { init, .. } => *init,
                _ => None,
            })
            .last()
            .expect("initializer");
        (ast, scopes, init)
    }

    fn pure(source: &str) -> bool {
        let (ast, scopes, init) = last_init(source);
        is_pure(&ast, &scopes, init)
    }

    #[test]
    fn literals_and_operators_are_pure() {
        assert!(pure("const x = 1 + 'a' * -2;"));
        assert!(pure("const x = true ? null : void 0;"));
        assert!(pure("const x = () => f();"));
        assert!(pure("const x = undefined;"));
    }

    #[test]
    fn constant_reads_are_pure() {
        assert!(pure("const a = 1;\nconst x = a + 1;"));
        assert!(!pure("let a = 1;\na++;\nconst x = a;"));
        assert!(!pure("const x = someGlobal;"));
    }

    #[test]
    fn effects_and_allocations_are_impure() {
        assert!(!pure("const x = f();"));
        assert!(!pure("const x = new F();"));
        assert!(!pure("const x = a.b;"));
        assert!(!pure("const x = [];"));
        assert!(!pure("const x = {};"));
        assert!(!pure("const x = delete a.b;"));
    }

    fn call_to_f(ast: &Ast, root: NodeId) -> NodeId {
        ast.descendants(root)
            .into_iter()
            .find(|id| match ast.node(*id) {
                Node::Call { callee, .. } => ast.ident_name(*callee) == Some("f"),
                _ => false,
            })
            .expect("call to f")
    }

    #[test]
    fn member_and_global_reads_are_impure() {
        assert!(!pure("const x = Math.PI;"));
        assert!(!pure("const x = counter;"));
        assert!(!pure("const o = { p: 1 };\nconst x = o.p;"));
    }

    #[test]
    fn evaluated_before_checks_preceding_operands() {
        let (ast, _) = parse_program("x = a + b * f();");
        let stmt = ast.children(ast.root())[0];
        let call = call_to_f(&ast, stmt);
        assert!(evaluated_before(&ast, stmt, call, &|_| true));
        let reads_only_a = |id: NodeId| ast.ident_name(id) == Some("a") || ast.ident_name(id) == Some("b");
        assert!(evaluated_before(&ast, stmt, call, &reads_only_a));
        assert!(!evaluated_before(&ast, stmt, call, &|id| ast.ident_name(id) != Some("a")));
    }

    #[test]
    fn evaluated_before_rejects_conditional_and_deferred_positions() {
        for source in ["a && f();", "a ? f() : 1;", "g(() => f());", "while (a) f();"] {
            let (ast, _) = parse_program(source);
            let stmt = ast.children(ast.root())[0];
            let call = call_to_f(&ast, stmt);
            assert!(!evaluated_before(&ast, stmt, call, &|_| true), "{source}");
        }
        let (ast, _) = parse_program("f() && a;");
        let stmt = ast.children(ast.root())[0];
        let call = call_to_f(&ast, stmt);
        assert!(evaluated_before(&ast, stmt, call, &|_| false));
    }

    #[test]
    fn assignment_targets_contribute_only_their_object() {
        let (ast, _) = parse_program("o.p = f();");
        let stmt = ast.children(ast.root())[0];
        let call = call_to_f(&ast, stmt);
        assert!(evaluated_before(&ast, stmt, call, &|id| ast.ident_name(id) == Some("o")));
        assert!(!evaluated_before(&ast, stmt, call, &|id| ast.ident_name(id) != Some("o")));
    }
}
