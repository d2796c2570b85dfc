//! Removes bindings that expansion left redundant: aliases, values read once, values never read.
//!
//! Runs on function exit over the declarators that belong to that function directly; nested
//! functions have already been simplified on their own exit.

use crate::ast::{Ast, Node, NodeId};
use crate::ast_utils::{
    can_inline_identifier, enclosing_function, evaluated_once_per_declaration,
    read_after_declaration, remove_declarator,
};
use crate::error::TransformError;
use crate::passes::object_projection::resolves_alike;
use crate::purity::is_pure;
use crate::scope::ScopeTree;
use crate::transform::{Outcome, Transformer};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Simplification {
    /// `const a = b;`: every read of `a` becomes a read of `b`.
    Alias {
        declarator: NodeId,
        references: Vec<NodeId>,
        aliased: String,
    },
    /// The only read of the binding takes the initializer.
    SingleUse {
        declarator: NodeId,
        reference: NodeId,
        init: Option<NodeId>,
    },
    Unused { declarator: NodeId },
}

fn find_simplification(
    ast: &Ast,
    scopes: &ScopeTree,
    function: NodeId,
    pinned: &dyn Fn(NodeId) -> bool,
) -> Option<Simplification> {
    let Node::Function { body, .. } = ast.node(function) else {
        return None;
    };
    for declarator in ast.descendants(*body) {
        let Node::Declarator { target, init } = ast.node(declarator) else {
            continue;
        };
        let (target, init) = (*target, *init);
        let in_list = ast
            .parent(declarator)
            .and_then(|declaration| ast.parent(declaration))
            .is_some_and(|owner| ast.node(owner).is_statement_list());
        if !in_list
            || !matches!(ast.node(target), Node::Ident { .. })
            || enclosing_function(ast, declarator) != Some(function)
        {
            continue;
        }
        let Some(binding) = scopes.resolve(target) else {
            continue;
        };
        let data = scopes.binding(binding);
        let reads_after = data
            .references
            .iter()
            .all(|reference| read_after_declaration(ast, declarator, *reference));
        if !data.is_constant() || pinned(data.declaration) || !reads_after {
            continue;
        }

        if let Some(aliased) = init.and_then(|init| scopes.resolve(init)) {
            let aliased_data = scopes.binding(aliased);
            let visible_everywhere = data.references.iter().all(|reference| {
                let scope = scopes.enclosing_scope(ast, *reference);
                scopes.lookup(scope, &aliased_data.name) == Some(aliased)
            });
            if aliased != binding && aliased_data.is_constant() && visible_everywhere {
                return Some(Simplification::Alias {
                    declarator,
                    references: data.references.clone(),
                    aliased: aliased_data.name.clone(),
                });
            }
        }

        let init_pure = init.is_none_or(|init| is_pure(ast, scopes, init));
        if !init_pure {
            continue;
        }
        match data.references.as_slice() {
            [] => return Some(Simplification::Unused { declarator }),
            [reference] => {
                let keeps_identity = init.is_none_or(|init| {
                    !ast.node(init).is_function()
                        || evaluated_once_per_declaration(ast, declarator, *reference)
                });
                let movable = can_inline_identifier(ast, *reference)
                    && keeps_identity
                    && init.is_none_or(|init| resolves_alike(ast, scopes, init, *reference));
                if movable {
                    return Some(Simplification::SingleUse {
                        declarator,
                        reference: *reference,
                        init,
                    });
                }
            }
            _ => {}
        }
    }
    None
}

impl Transformer<'_> {
    pub(crate) fn simplify_function(&mut self, function: NodeId) -> Result<Outcome, TransformError> {
        let Node::Function { body, .. } = self.ast.node(function) else {
            return Ok(Outcome::Unchanged);
        };
        if !matches!(self.ast.node(*body), Node::Block { .. }) {
            return Ok(Outcome::Unchanged);
        }

        let mut changed = false;
        if self.options.simplify_bindings {
            loop {
                let scopes = self.scopes();
                let table = &self.table;
                let step = find_simplification(self.ast, &scopes, function, &|declaration| {
                    table.pins(declaration)
                });
                let Some(step) = step else {
                    break;
                };
                self.count_rewrite()?;
                self.apply_simplification(step)?;
                self.invalidate();
                self.stats.simplified_bindings += 1;
                changed = true;
            }
        }
        changed |= self.collapse_prepared_body(function)?;

        if changed {
            self.requeue(function);
        }
        Ok(Outcome::Unchanged)
    }

    fn apply_simplification(&mut self, step: Simplification) -> Result<(), TransformError> {
        match step {
            Simplification::Alias {
                declarator,
                references,
                aliased,
            } => {
                for reference in references {
                    self.ast.set_ident_name(reference, &aliased);
                }
                remove_declarator(self.ast, declarator)?;
            }
            Simplification::SingleUse {
                declarator,
                reference,
                init,
            } => {
                let value = match init {
                    Some(init) => init,
                    None => self.ast.void_zero(),
                };
                self.ast.replace(reference, value)?;
                remove_declarator(self.ast, declarator)?;
            }
            Simplification::Unused { declarator } => remove_declarator(self.ast, declarator)?,
        }
        Ok(())
    }

    /// Turns a body block that insertion created back into an expression body once it holds
    /// nothing but `return e;`.
    fn collapse_prepared_body(&mut self, function: NodeId) -> Result<bool, TransformError> {
        if !self.prepared_bodies.contains(&function) {
            return Ok(false);
        }
        let Node::Function { body, .. } = self.ast.node(function) else {
            return Ok(false);
        };
        let body = *body;
        let only_return = match self.ast.node(body) {
            Node::Block { body: statements } => match statements.as_slice() {
                [statement] => match self.ast.node(*statement) {
                    Node::Return { arg } => *arg,
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        };
        let Some(expr) = only_return else {
            return Ok(false);
        };
        self.ast.replace(body, expr)?;
        self.prepared_bodies.remove(&function);
        self.invalidate();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use crate::options::TransformOptions;
    use crate::parser::parse_program;
    use crate::printer::print_program;
    use crate::transform_program;

    fn simplify(source: &str) -> String {
        let (mut ast, diagnostics) = parse_program(source);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let options = TransformOptions {
            inline_functions: false,
            project_objects: false,
            ..TransformOptions::default()
        };
        transform_program(&mut ast, &options).expect("transform");
        print_program(&ast)
    }

    #[test]
    fn aliases_are_renamed_away() {
        assert_eq!(
            simplify("function f(v) {\n  const w = v;\n  return g(w, w);\n}"),
            "function f(v) {\n  return g(v, v);\n}"
        );
    }

    #[test]
    fn alias_shadowed_at_a_use_stays() {
        let source =
            "function f(v) {\n  const w = v;\n  return [w, v => w];\n}";
        assert_eq!(simplify(source), source);
    }

    #[test]
    fn single_use_values_move_to_their_use() {
        assert_eq!(
            simplify("function f(v) {\n  const w = v * 2;\n  return w + 1;\n}"),
            "function f(v) {\n  return v * 2 + 1;\n}"
        );
        assert_eq!(
            simplify("function f() {\n  let w;\n  return w;\n}"),
            "function f() {\n  return void 0;\n}"
        );
    }

    #[test]
    fn effects_and_multiple_reads_stay() {
        for source in [
            "function f() {\n  const w = g();\n  return w;\n}",
            "function f(v) {\n  const w = v * 2;\n  return w + w;\n}",
            "function f(v) {\n  let w = v * 2;\n  w++;\n  return w;\n}",
        ] {
            assert_eq!(simplify(source), source, "{source}");
        }
    }

    #[test]
    fn unused_pure_bindings_go() {
        assert_eq!(
            simplify("function f() {\n  const a = 1, b = g();\n  return b;\n}"),
            "function f() {\n  const b = g();\n  return b;\n}"
        );
    }

    #[test]
    fn top_level_bindings_are_left_alone() {
        let source = "const a = 1;\nf(a);";
        assert_eq!(simplify(source), source);
    }

    #[test]
    fn closures_are_not_moved_into_repeated_code() {
        for source in [
            "function f() {\n  const w = () => 1;\n  return () => w;\n}",
            "function f(c) {\n  const w = () => 1;\n  while (c) g(w);\n}",
        ] {
            assert_eq!(simplify(source), source, "{source}");
        }
        assert_eq!(
            simplify("function f() {\n  const w = () => 1;\n  return g(w);\n}"),
            "function f() {\n  return g(() => 1);\n}"
        );
    }

    #[test]
    fn reads_ahead_of_the_declaration_stay() {
        for source in [
            "function f() {\n  g(w);\n  var w = 1;\n}",
            "function f() {\n  function h() {\n    return w;\n  }\n  const w = 1;\n  return h;\n}",
        ] {
            assert_eq!(simplify(source), source, "{source}");
        }
    }

    #[test]
    fn value_is_not_moved_under_a_shadowing_binding() {
        let source = "function f(k) {\n  const w = k + 1;\n  return k => w;\n}";
        assert_eq!(simplify(source), source);
    }
}
