use crate::ast::{Ast, EditError, FunctionKind, Node, NodeId};

/// Removes `declarator`, taking its declaration along when it is the only declarator left.
pub fn remove_declarator(ast: &mut Ast, declarator: NodeId) -> Result<(), EditError> {
    let declaration = ast.parent(declarator).ok_or(EditError::Detached(declarator))?;
    let last = matches!(ast.node(declaration), Node::VarDecl { declarators, .. } if declarators.len() == 1);
    if last {
        ast.remove(declaration)
    } else {
        ast.remove(declarator)
    }
}

/// The program or block whose statement list holds `declarator`'s declaration.
fn statement_list_owner(ast: &Ast, declarator: NodeId) -> Option<(NodeId, NodeId)> {
    let declaration = ast.parent(declarator)?;
    let owner = ast.parent(declaration)?;
    ast.node(owner)
        .is_statement_list()
        .then_some((declaration, owner))
}

/// Whether `reference` can only run once `declarator` has: it sits in a later statement of the
/// same list and not inside a hoisted function declaration.
pub fn read_after_declaration(ast: &Ast, declarator: NodeId, reference: NodeId) -> bool {
    let Some((declaration, owner)) = statement_list_owner(ast, declarator) else {
        return false;
    };
    let (Node::Program { body } | Node::Block { body }) = ast.node(owner) else {
        return false;
    };
    let position = |id: NodeId| body.iter().position(|stmt| *stmt == id);
    let mut child = reference;
    for ancestor in ast.ancestors(reference) {
        if ancestor == owner {
            return matches!(
                (position(declaration), position(child)),
                (Some(declared), Some(read)) if read > declared
            );
        }
        if matches!(
            ast.node(ancestor),
            Node::Function {
                kind: FunctionKind::Declaration,
                ..
            }
        ) {
            return false;
        }
        child = ancestor;
    }
    false
}

/// Whether `reference` runs at most once per run of the statement list holding `declarator`:
/// no function, class or loop lies in between.
pub fn evaluated_once_per_declaration(ast: &Ast, declarator: NodeId, reference: NodeId) -> bool {
    let Some((_, owner)) = statement_list_owner(ast, declarator) else {
        return false;
    };
    for ancestor in ast.ancestors(reference) {
        if ancestor == owner {
            return true;
        }
        if matches!(
            ast.node(ancestor),
            Node::Function { .. } | Node::Class { .. } | Node::While { .. } | Node::For { .. }
        ) {
            return false;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;
    use crate::printer::print_program;

    fn declarators(ast: &Ast) -> Vec<NodeId> {
        ast.descendants(ast.root())
            .into_iter()
            .filter(|id| matches!(ast.node(*id), Node::Declarator { .. }))
            .collect()
    }

    #[test]
    fn removes_one_of_several() {
        let (mut ast, _) = parse_program("const a = 1, b = 2;\nf(a, b);");
        let first = declarators(&ast)[0];
        remove_declarator(&mut ast, first).expect("remove");
        assert_eq!(print_program(&ast), "const b = 2;\nf(a, b);");
    }

    #[test]
    fn removes_whole_declaration_when_last() {
        let (mut ast, _) = parse_program("const a = 1;\nf(a);");
        let only = declarators(&ast)[0];
        remove_declarator(&mut ast, only).expect("remove");
        assert_eq!(print_program(&ast), "f(a);");
    }

    fn first_read(ast: &Ast, name: &str) -> NodeId {
        ast.descendants(ast.root())
            .into_iter()
            .find(|id| {
                let declared = matches!(
                    ast.parent(*id).map(|parent| ast.node(parent)),
                    Some(Node::Declarator { .. })
                );
                ast.ident_name(*id) == Some(name) && !declared
            })
            .expect("read")
    }

    #[test]
    fn reads_before_the_declaration_are_told_apart() {
        for (source, after) in [
            ("var o = 1;\nf(o);", true),
            ("f(o);\nvar o = 1;", false),
            ("function g() {\n  return o;\n}\nconst o = 1;", false),
            ("const o = 1;\nfunction g() {\n  return o;\n}", false),
            ("const o = 1;\nconst g = () => o;", true),
            ("while (c) {\n  f(o);\n  var o = 1;\n}", false),
        ] {
            let (ast, diagnostics) = parse_program(source);
            assert!(diagnostics.is_empty(), "{diagnostics:?}");
            let declarator = declarators(&ast)[0];
            let reference = first_read(&ast, "o");
            assert_eq!(read_after_declaration(&ast, declarator, reference), after, "{source}");
        }
    }

    #[test]
    fn repeated_positions_are_not_evaluated_once() {
        for (source, once) in [
            ("const o = 1;\nf(o);", true),
            ("const o = 1;\nconst g = () => o;", false),
            ("const o = 1;\nwhile (c) f(o);", false),
            ("const o = 1;\nclass A {\n  x = o;\n}", false),
            ("const o = 1;\nif (c) f(o);", true),
        ] {
            let (ast, diagnostics) = parse_program(source);
            assert!(diagnostics.is_empty(), "{diagnostics:?}");
            let declarator = declarators(&ast)[0];
            let reference = first_read(&ast, "o");
            assert_eq!(
                evaluated_once_per_declaration(&ast, declarator, reference),
                once,
                "{source}"
            );
        }
    }

    #[test]
    fn detached_declarator_is_an_error() {
        let (mut ast, _) = parse_program("const a = 1;");
        let only = declarators(&ast)[0];
        remove_declarator(&mut ast, only).expect("remove");
        let decl_parent = ast.parent(only).expect("still inside its declaration");
        assert_eq!(
            remove_declarator(&mut ast, decl_parent),
            Err(EditError::Detached(decl_parent))
        );
    }
}
