//! Registry of functions marked for inlining.
//!
//! Entries are looked up through the scope they were declared in rather than by bare name:
//! two unrelated inline functions may share a name as long as their scopes differ, and a site
//! that cannot see the declaring scope never receives a body.

use crate::ast::{Ast, NodeId};

/// A name the template reads that is bound outside of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeName {
    pub name: String,
    /// Declaring identifier of the binding the name resolved to where the function was
    /// declared; `None` for globals.
    pub declaration: Option<NodeId>,
    /// Identifier nodes inside the template spelling this name.
    pub sites: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct InlineEntry {
    pub name: String,
    /// Scope-creating node the declaration sat in.
    pub scope_node: NodeId,
    /// Detached arrow function holding the parameters and body.
    pub template: NodeId,
    pub free: Vec<FreeName>,
}

#[derive(Debug, Clone, Default)]
pub struct InlineTable {
    entries: Vec<InlineEntry>,
}

impl InlineTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: InlineEntry) {
        self.entries.push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[InlineEntry] {
        &self.entries
    }

    /// The innermost entry named `name` whose declaring scope encloses `site`.
    pub fn lookup(&self, ast: &Ast, name: &str, site: NodeId) -> Option<&InlineEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.name == name && ast.is_attached(entry.scope_node))
            .filter(|entry| ast.is_ancestor_or_self(entry.scope_node, site))
            .max_by_key(|entry| ast.ancestors(entry.scope_node).count())
    }

    /// Whether some template reads the binding declared by `declaration`. Such bindings have
    /// readers the scope analysis cannot see and must not be removed.
    pub fn pins(&self, declaration: NodeId) -> bool {
        self.entries
            .iter()
            .flat_map(|entry| &entry.free)
            .any(|free| free.declaration == Some(declaration))
    }

    /// Follows a rename of the binding declared by `declaration` into every template.
    pub fn rename_free(&mut self, ast: &mut Ast, declaration: NodeId, new_name: &str) {
        for free in self.entries.iter_mut().flat_map(|entry| entry.free.iter_mut()) {
            if free.declaration != Some(declaration) {
                continue;
            }
            free.name = new_name.to_string();
            for site in &free.sites {
                ast.set_ident_name(*site, new_name);
            }
        }
    }

    /// A fresh copy of `entry`'s template, ready to be linked into the tree.
    pub fn instantiate(ast: &mut Ast, entry: &InlineEntry) -> NodeId {
        ast.deep_clone(entry.template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Node;
    use crate::parser::parse_program;
    use crate::printer::print_node;

    fn entry(ast: &mut Ast, name: &str, scope_node: NodeId) -> InlineEntry {
        let param = ast.ident("x");
        let body = ast.ident("k");
        let template = ast.alloc(
            Node::Function {
                kind: crate::ast::FunctionKind::Arrow,
                name: None,
                params: vec![param],
                body,
                is_async: false,
            },
            Default::default(),
        );
        InlineEntry {
            name: name.to_string(),
            scope_node,
            template,
            free: vec![FreeName {
                name: "k".to_string(),
                declaration: None,
                sites: vec![body],
            }],
        }
    }

    #[test]
    fn lookup_prefers_innermost_enclosing_scope() {
        let (mut ast, _) = parse_program("function outer() {\n  f();\n}\nf();");
        let outer = ast.children(ast.root())[0];
        let root = ast.root();
        let mut table = InlineTable::new();
        let top = entry(&mut ast, "f", root);
        let inner = entry(&mut ast, "f", outer);
        let (top_template, inner_template) = (top.template, inner.template);
        table.insert(top);
        table.insert(inner);

        let calls: Vec<_> = ast
            .descendants(root)
            .into_iter()
            .filter(|id| ast.ident_name(*id) == Some("f"))
            .collect();
        let inside = table.lookup(&ast, "f", calls[0]).expect("inner entry");
        assert_eq!(inside.template, inner_template);
        let outside = table.lookup(&ast, "f", calls[1]).expect("top entry");
        assert_eq!(outside.template, top_template);
        assert!(table.lookup(&ast, "g", calls[1]).is_none());
    }

    #[test]
    fn clones_are_independent() {
        let mut ast = Ast::new();
        let root = ast.root();
        let e = entry(&mut ast, "f", root);
        let first = InlineTable::instantiate(&mut ast, &e);
        let second = InlineTable::instantiate(&mut ast, &e);
        assert_ne!(first, second);
        let Node::Function { body, .. } = ast.node(first).clone() else {
            panic!("expected function");
        };
        ast.set_ident_name(body, "changed");
        assert_eq!(print_node(&ast, second), "x => k");
    }

    #[test]
    fn renames_follow_into_templates() {
        let mut ast = Ast::new();
        let root = ast.root();
        let declaration = ast.ident("k");
        let mut e = entry(&mut ast, "f", root);
        e.free[0].declaration = Some(declaration);
        let template = e.template;
        let mut table = InlineTable::new();
        table.insert(e);
        assert!(table.pins(declaration));
        table.rename_free(&mut ast, declaration, "_k");
        assert_eq!(print_node(&ast, template), "x => _k");
        assert_eq!(table.entries()[0].free[0].name, "_k");
    }
}
