//! Property reads on object literals, written directly or through a constant binding.

use crate::ast::{Ast, Node, NodeId, UnaryOp};
use crate::ast_utils::{
    enclosing_statement, evaluated_once_per_declaration, property_name, property_value,
    read_after_declaration, remove_declarator, Resolution,
};
use crate::error::TransformError;
use crate::purity::is_pure;
use crate::scope::ScopeTree;
use crate::transform::{Outcome, Transformer};

/// Whether `member` is read as a plain value: not assigned, updated or deleted.
fn is_plain_read(ast: &Ast, member: NodeId) -> bool {
    match ast.parent(member).map(|parent| ast.node(parent)) {
        Some(Node::Assign { target, .. }) => *target != member,
        Some(Node::Update { .. }) => false,
        Some(Node::Unary {
            op: UnaryOp::Delete,
            ..
        }) => false,
        _ => true,
    }
}

fn is_callee(ast: &Ast, member: NodeId) -> bool {
    matches!(
        ast.parent(member).map(|parent| ast.node(parent)),
        Some(Node::Call { callee, .. } | Node::New { callee, .. }) if *callee == member
    )
}

/// The value `member` reads out of `object`, if it can be lifted out of the member without
/// changing what the program observes.
fn projected_value(ast: &Ast, member: NodeId, object: NodeId) -> Option<NodeId> {
    let Node::Member {
        property, computed, ..
    } = ast.node(member)
    else {
        return None;
    };
    if !is_plain_read(ast, member) {
        return None;
    }
    let name = property_name(ast, *property, *computed)?;
    let Resolution::Value(value) = property_value(ast, object, &name) else {
        return None;
    };
    // A call through the member passes the object as `this`; only arrows ignore it.
    if is_callee(ast, member) && !ast.node(value).is_arrow() {
        return None;
    }
    Some(value)
}

/// Whether evaluating `object` has no effect besides computing `keep`.
fn contents_pure(ast: &Ast, scopes: &ScopeTree, object: NodeId, keep: Option<NodeId>) -> bool {
    let Node::Object { properties } = ast.node(object) else {
        return false;
    };
    properties.iter().all(|entry| match ast.node(*entry) {
        Node::Property {
            key,
            value,
            computed,
            method,
            ..
        } => {
            (!*computed || is_pure(ast, scopes, *key))
                && (*method || Some(*value) == keep || is_pure(ast, scopes, *value))
        }
        Node::Spread { arg } => contents_pure(ast, scopes, *arg, keep),
        _ => false,
    })
}

/// Every name `value` reads from outside resolves to the same binding at `site`.
pub(crate) fn resolves_alike(ast: &Ast, scopes: &ScopeTree, value: NodeId, site: NodeId) -> bool {
    let scope = scopes.enclosing_scope(ast, site);
    scopes
        .free_names(ast, value)
        .iter()
        .all(|(name, binding)| scopes.lookup(scope, name) == *binding)
}

impl Transformer<'_> {
    /// `{ a: 1 }.a` → `1`. Runs on member exit, after the literal's entries were visited.
    pub(crate) fn project_member(&mut self, member: NodeId) -> Result<Outcome, TransformError> {
        let Node::Member { object, .. } = self.ast.node(member) else {
            return Ok(Outcome::Unchanged);
        };
        let object = *object;
        if !matches!(self.ast.node(object), Node::Object { .. }) {
            return Ok(Outcome::Unchanged);
        }
        let Some(value) = projected_value(self.ast, member, object) else {
            return Ok(Outcome::Unchanged);
        };
        let scopes = self.scopes();
        if !contents_pure(self.ast, &scopes, object, Some(value)) {
            return Ok(Outcome::Unchanged);
        }

        self.count_rewrite()?;
        self.ast.replace(member, value)?;
        self.invalidate();
        self.stats.projections += 1;
        if let Some(stmt) = enclosing_statement(self.ast, value) {
            self.requeue(stmt);
        }
        Ok(Outcome::Replaced(value))
    }

    /// `const o = { a: 1 }; f(o.a);` → `f(1);` when every use of `o` is such a read.
    pub(crate) fn project_bound_object(
        &mut self,
        declarator: NodeId,
    ) -> Result<Outcome, TransformError> {
        let Node::Declarator {
            target,
            init: Some(object),
        } = self.ast.node(declarator)
        else {
            return Ok(Outcome::Unchanged);
        };
        let (target, object) = (*target, *object);
        if !matches!(self.ast.node(object), Node::Object { .. })
            || !matches!(self.ast.node(target), Node::Ident { .. })
            || !self.in_statement_list(declarator)
        {
            return Ok(Outcome::Unchanged);
        }

        let scopes = self.scopes();
        let Some(binding) = scopes.resolve(target) else {
            return Ok(Outcome::Unchanged);
        };
        let data = scopes.binding(binding);
        if !data.is_constant()
            || self.is_pinned(&scopes, binding)
            || !contents_pure(self.ast, &scopes, object, None)
        {
            return Ok(Outcome::Unchanged);
        }

        let mut replacements = Vec::with_capacity(data.references.len());
        for reference in &data.references {
            if !read_after_declaration(self.ast, declarator, *reference) {
                return Ok(Outcome::Unchanged);
            }
            let Some(member) = self.ast.parent(*reference) else {
                return Ok(Outcome::Unchanged);
            };
            let is_object = matches!(
                self.ast.node(member),
                Node::Member { object, .. } if *object == *reference
            );
            if !is_object {
                return Ok(Outcome::Unchanged);
            }
            let Some(value) = projected_value(self.ast, member, object) else {
                return Ok(Outcome::Unchanged);
            };
            if !resolves_alike(self.ast, &scopes, value, member) {
                return Ok(Outcome::Unchanged);
            }
            replacements.push((member, value));
        }
        // Each copy of a function literal is a new closure.
        let copies_closure = replacements.iter().any(|(member, value)| {
            self.ast.node(*value).is_function()
                && (replacements.iter().filter(|(_, other)| other == value).count() > 1
                    || !evaluated_once_per_declaration(self.ast, declarator, *member))
        });
        if copies_closure {
            return Ok(Outcome::Unchanged);
        }

        self.count_rewrite()?;
        for (member, value) in replacements {
            let copy = self.ast.deep_clone(value);
            self.ast.replace(member, copy)?;
        }
        remove_declarator(self.ast, declarator)?;
        self.invalidate();
        self.stats.projections += 1;
        Ok(Outcome::Removed)
    }

    /// Declarators of declarations sitting in a program or block body; `for` heads are left
    /// alone.
    pub(crate) fn in_statement_list(&self, declarator: NodeId) -> bool {
        self.ast
            .parent(declarator)
            .and_then(|declaration| self.ast.parent(declaration))
            .is_some_and(|owner| self.ast.node(owner).is_statement_list())
    }
}

#[cfg(test)]
mod tests {
    use crate::options::TransformOptions;
    use crate::parser::parse_program;
    use crate::printer::print_program;
    use crate::transform_program;

    fn project(source: &str) -> String {
        let (mut ast, diagnostics) = parse_program(source);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let options = TransformOptions {
            inline_functions: false,
            simplify_bindings: false,
            ..TransformOptions::default()
        };
        transform_program(&mut ast, &options).expect("transform");
        print_program(&ast)
    }

    #[test]
    fn direct_literal_reads() {
        assert_eq!(project("f({ name: 'Steve', age: 35 }.name);"), "f('Steve');");
        assert_eq!(project("f({ a: 1, a: 2 }['a']);"), "f(2);");
        assert_eq!(project("f({ a: 1, ...{ a: 3 } }.a);"), "f(3);");
    }

    #[test]
    fn direct_reads_that_must_stay() {
        for source in [
            "f({ a: g() }.b);",
            "f({ a: 1, b: g() }.a);",
            "f({ a: 1, ...x }.a);",
            "f({ a: 1 }.missing);",
            "f({ a: 1 }.a = 2);",
            "f({ a: 1 }.a++);",
            "f(delete { a: 1 }.a);",
            "f({ a() {} }.a);",
            "f({ a: g }.a());",
        ] {
            assert_eq!(project(source), source, "{source}");
        }
    }

    #[test]
    fn impure_projected_value_is_kept() {
        assert_eq!(project("f({ a: g(), b: 1 }.a);"), "f(g());");
    }

    #[test]
    fn bound_object_is_dissolved() {
        assert_eq!(
            project("const obj = { t: 1, u: 2 };\nf(obj.t, obj.u);"),
            "f(1, 2);"
        );
        assert_eq!(project("const obj = { t: 1 };"), "");
    }

    #[test]
    fn escaping_bound_object_stays() {
        for source in [
            "const obj = { t: 1 };\nf(obj, obj.t);",
            "const obj = { t: 1 };\nobj.t = 2;",
            "let obj = { t: 1 };\nobj = null;\nf(obj.t);",
            "const obj = { t: g() };\nf(obj.t);",
            "const obj = { t: 1 };\nf(obj[k]);",
        ] {
            assert_eq!(project(source), source, "{source}");
        }
    }

    #[test]
    fn closure_values_keep_their_identity() {
        for source in [
            "const o = { h: () => 1 };\nf(o.h === o.h);",
            "const o = { h: () => 1 };\nconst g = () => o.h;",
            "const o = { h: () => 1 };\nwhile (c) f(o.h);",
        ] {
            assert_eq!(project(source), source, "{source}");
        }
        assert_eq!(
            project("const o = { h: () => 1, n: 2 };\nf(o.h, o.n);"),
            "f(() => 1, 2);"
        );
    }

    #[test]
    fn reads_ahead_of_the_declaration_stay() {
        for source in [
            "f(o.a);\nvar o = { a: 1 };",
            "function g() {\n  return o.a;\n}\nconst o = { a: 1 };",
        ] {
            assert_eq!(project(source), source, "{source}");
        }
    }

    #[test]
    fn shadowed_value_names_block_projection() {
        let source = "const k = 1;\nconst obj = { t: k };\nfunction g(k) {\n  return obj.t;\n}";
        assert_eq!(project(source), source);
    }

    #[test]
    fn projection_is_idempotent() {
        let once = project("const obj = { t: 1, u: { v: 2 }.v };\nf(obj.t, obj.u, { w: 3 }.w);");
        assert_eq!(once, "f(1, 2, 3);");
        assert_eq!(project(&once), once);
    }
}
