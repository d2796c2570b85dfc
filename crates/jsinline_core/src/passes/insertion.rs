//! Where hoisted declarations of an expansion go.

use crate::ast::{Ast, EditError, Node, NodeId};

/// A position that can take a declaration in front of the code containing a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InsertionPoint {
    /// `stmt` sits directly in a program or block body.
    StatementList { stmt: NodeId },
    /// Non-block consequent or alternate of an `if`.
    IfBranch { branch: NodeId },
    /// Non-block body of a loop.
    LoopBody { body: NodeId },
    /// Expression body of an arrow function.
    ArrowBody { arrow: NodeId, body: NodeId },
}

impl InsertionPoint {
    /// The code the declaration ends up in front of.
    pub(crate) fn anchor(self) -> NodeId {
        match self {
            InsertionPoint::StatementList { stmt } => stmt,
            InsertionPoint::IfBranch { branch } => branch,
            InsertionPoint::LoopBody { body } => body,
            InsertionPoint::ArrowBody { body, .. } => body,
        }
    }

    /// Follows the anchor when `from` was swapped for `to`.
    pub(crate) fn retarget(self, from: NodeId, to: NodeId) -> Self {
        let swap = |id: NodeId| if id == from { to } else { id };
        match self {
            InsertionPoint::StatementList { stmt } => {
                InsertionPoint::StatementList { stmt: swap(stmt) }
            }
            InsertionPoint::IfBranch { branch } => InsertionPoint::IfBranch {
                branch: swap(branch),
            },
            InsertionPoint::LoopBody { body } => InsertionPoint::LoopBody { body: swap(body) },
            InsertionPoint::ArrowBody { arrow, body } => InsertionPoint::ArrowBody {
                arrow,
                body: swap(body),
            },
        }
    }
}

/// Walks up from `call` to the nearest insertion point. Positions that are evaluated
/// unconditionally and first (an `if` test, the left operand of a logical, the test of a
/// conditional) are walked through; anything conditional, repeated or deferred gives `None`.
pub(crate) fn find_insertion_point(ast: &Ast, call: NodeId) -> Option<InsertionPoint> {
    let mut child = call;
    for parent in ast.ancestors(call) {
        match ast.node(parent) {
            Node::Program { .. } | Node::Block { .. } => {
                return Some(InsertionPoint::StatementList { stmt: child })
            }
            Node::If { test, .. } => {
                if *test != child {
                    return Some(InsertionPoint::IfBranch { branch: child });
                }
            }
            Node::While { body, .. } | Node::For { body, .. } => {
                return (*body == child).then_some(InsertionPoint::LoopBody { body: child });
            }
            Node::Function { body, .. } => {
                return (*body == child && ast.node(parent).is_arrow())
                    .then_some(InsertionPoint::ArrowBody {
                        arrow: parent,
                        body: child,
                    });
            }
            Node::Logical { left, .. } => {
                if *left != child {
                    return None;
                }
            }
            Node::Conditional { test, .. } => {
                if *test != child {
                    return None;
                }
            }
            Node::Class { .. }
            | Node::ClassMethod { .. }
            | Node::ClassProperty { .. }
            | Node::Catch { .. }
            | Node::AssignPattern { .. } => return None,
            _ => {}
        }
        child = parent;
    }
    None
}

/// Puts `declaration` in front of the insertion point, wrapping non-list positions into a
/// block first. Returns the node the walk should revisit besides the declaration itself.
pub(crate) fn insert_declaration(
    ast: &mut Ast,
    point: InsertionPoint,
    declaration: NodeId,
) -> Result<NodeId, EditError> {
    match point {
        InsertionPoint::StatementList { stmt } => {
            ast.insert_before(stmt, &[declaration])?;
            Ok(stmt)
        }
        InsertionPoint::IfBranch { branch: statement }
        | InsertionPoint::LoopBody { body: statement } => {
            let owner = ast.parent(statement).ok_or(EditError::Detached(statement))?;
            wrap(ast, statement, |_, statement| vec![declaration, statement])?;
            Ok(owner)
        }
        InsertionPoint::ArrowBody { arrow, body } => {
            wrap(ast, body, |ast, body| {
                let ret = ast.alloc(Node::Return { arg: Some(body) }, ast.span(body));
                vec![declaration, ret]
            })?;
            Ok(arrow)
        }
    }
}

/// Swaps `target` for a block built from it. `target` is unlinked through a placeholder first
/// so the block can adopt it.
fn wrap(
    ast: &mut Ast,
    target: NodeId,
    build: impl FnOnce(&mut Ast, NodeId) -> Vec<NodeId>,
) -> Result<NodeId, EditError> {
    let placeholder = ast.alloc(Node::Empty, Default::default());
    ast.replace(target, placeholder)?;
    let body = build(ast, target);
    let block = ast.block(body);
    ast.replace(placeholder, block)?;
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;
    use crate::printer::print_program;

    fn call_named(ast: &Ast, name: &str) -> NodeId {
        ast.descendants(ast.root())
            .into_iter()
            .find(|id| match ast.node(*id) {
                Node::Call { callee, .. } => ast.ident_name(*callee) == Some(name),
                _ => false,
            })
            .expect("call")
    }

    fn hoist(source: &str) -> Option<String> {
        let (mut ast, diagnostics) = parse_program(source);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let call = call_named(&ast, "f");
        let point = find_insertion_point(&ast, call)?;
        let value = ast.alloc(
            Node::Number {
                raw: "1".to_string(),
            },
            Default::default(),
        );
        let target = ast.ident("_x");
        let declaration = ast.const_decl(vec![(target, value)]);
        insert_declaration(&mut ast, point, declaration).expect("insert");
        Some(print_program(&ast))
    }

    #[test]
    fn statement_lists() {
        assert_eq!(
            hoist("g();\nconst a = f();").as_deref(),
            Some("g();\nconst _x = 1;\nconst a = f();")
        );
        assert_eq!(
            hoist("function h() {\n  return f();\n}").as_deref(),
            Some("function h() {\n  const _x = 1;\n  return f();\n}")
        );
    }

    #[test]
    fn branches_and_loop_bodies_are_wrapped() {
        assert_eq!(
            hoist("if (a) f();\nelse g();").as_deref(),
            Some("if (a) {\n  const _x = 1;\n  f();\n} else g();")
        );
        assert_eq!(
            hoist("while (a) f();").as_deref(),
            Some("while (a) {\n  const _x = 1;\n  f();\n}")
        );
    }

    #[test]
    fn arrow_bodies_get_a_return() {
        assert_eq!(
            hoist("const h = () => f() + 1;").as_deref(),
            Some("const h = () => {\n  const _x = 1;\n  return f() + 1;\n};")
        );
    }

    #[test]
    fn unconditional_heads_are_walked_through() {
        assert_eq!(
            hoist("if (f()) g();").as_deref(),
            Some("const _x = 1;\nif (f()) g();")
        );
        assert_eq!(
            hoist("x = f() || g();").as_deref(),
            Some("const _x = 1;\nx = f() || g();")
        );
    }

    #[test]
    fn conditional_positions_have_no_insertion_point() {
        for source in [
            "x = a && f();",
            "x = a ? f() : 1;",
            "while (f()) g();",
            "for (let i = f(); i < 1; i++) g();",
            "class A {\n  x = f();\n}",
            "function h(a = f()) {}",
        ] {
            assert_eq!(hoist(source), None, "{source}");
        }
    }
}
