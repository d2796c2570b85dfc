//! Lexical scopes and bindings.
//!
//! The tree is analysed as a whole; passes re-run [`ScopeTree::analyze`] after editing instead
//! of patching reference lists, so a binding's references are always exactly the identifiers
//! that resolve to it in the current tree.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::{Ast, DeclKind, FunctionKind, Node, NodeId};
use crate::ast_utils::{binding_identifiers, ident_role, IdentRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Program,
    Function,
    Block,
    For,
    Catch,
    Class,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Var,
    Let,
    Const,
    Param,
    Function,
    Class,
    CatchParam,
    /// Name of a function or class expression, visible only inside it.
    SelfName,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    /// The node that creates this scope.
    pub node: NodeId,
    pub parent: Option<ScopeId>,
    names: FxHashMap<String, BindingId>,
    declared: Vec<BindingId>,
}

impl Scope {
    pub fn get(&self, name: &str) -> Option<BindingId> {
        self.names.get(name).copied()
    }

    /// Bindings declared directly in this scope, in declaration order.
    pub fn bindings(&self) -> &[BindingId] {
        &self.declared
    }
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
    pub scope: ScopeId,
    /// The identifier that declares the binding.
    pub declaration: NodeId,
    /// Identifiers reading the binding.
    pub references: Vec<NodeId>,
    /// Assignment and update targets plus redeclarations.
    pub violations: Vec<NodeId>,
}

impl Binding {
    pub fn is_constant(&self) -> bool {
        self.violations.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    bindings: Vec<Binding>,
    by_node: FxHashMap<NodeId, ScopeId>,
    resolved: FxHashMap<NodeId, BindingId>,
    names: FxHashSet<String>,
}

/// Kind of scope `id` opens, if any. Function bodies and catch bodies share the scope of their
/// function or catch clause.
pub fn scope_kind(ast: &Ast, id: NodeId) -> Option<ScopeKind> {
    match ast.node(id) {
        Node::Program { .. } => Some(ScopeKind::Program),
        Node::Function { .. } => Some(ScopeKind::Function),
        Node::For { .. } => Some(ScopeKind::For),
        Node::Catch { .. } => Some(ScopeKind::Catch),
        Node::Class { .. } => Some(ScopeKind::Class),
        Node::Block { .. } => {
            let shares_parent = ast.parent(id).is_some_and(|parent| {
                matches!(
                    ast.node(parent),
                    Node::Function { body, .. } | Node::Catch { body, .. } if *body == id
                )
            });
            (!shares_parent).then_some(ScopeKind::Block)
        }
        _ => None,
    }
}

/// The scope-creating node whose scope contains `id`. Declaration names of functions and
/// classes belong to the scope around them.
pub fn enclosing_scope_node(ast: &Ast, id: NodeId) -> NodeId {
    let mut child = id;
    for ancestor in ast.ancestors(id) {
        let declares_outward = match ast.node(ancestor) {
            Node::Function {
                kind: FunctionKind::Declaration,
                name: Some(name),
                ..
            } => *name == child,
            Node::Class {
                is_declaration: true,
                name: Some(name),
                ..
            } => *name == child,
            _ => false,
        };
        if !declares_outward && scope_kind(ast, ancestor).is_some() {
            return ancestor;
        }
        child = ancestor;
    }
    ast.root()
}

impl ScopeTree {
    pub fn analyze(ast: &Ast) -> Self {
        let mut tree = ScopeTree::default();
        let nodes = ast.descendants(ast.root());

        for &id in &nodes {
            if let Some(kind) = scope_kind(ast, id) {
                let parent = (id != ast.root()).then(|| tree.enclosing_scope(ast, id));
                tree.by_node.insert(id, ScopeId(tree.scopes.len() as u32));
                tree.scopes.push(Scope {
                    kind,
                    node: id,
                    parent,
                    names: FxHashMap::default(),
                    declared: Vec::new(),
                });
            }
        }

        for &id in &nodes {
            tree.declare_from(ast, id);
        }

        for &id in &nodes {
            let Some(name) = ast.ident_name(id) else {
                continue;
            };
            tree.names.insert(name.to_string());
            let role = ident_role(ast, id);
            if !matches!(role, IdentRole::Reference | IdentRole::WriteTarget) {
                continue;
            }
            let scope = tree.enclosing_scope(ast, id);
            if let Some(binding) = tree.lookup(scope, name) {
                tree.resolved.insert(id, binding);
                let binding = &mut tree.bindings[binding.0 as usize];
                if role == IdentRole::WriteTarget {
                    binding.violations.push(id);
                } else {
                    binding.references.push(id);
                }
            }
        }
        tree
    }

    fn declare_from(&mut self, ast: &Ast, id: NodeId) {
        match ast.node(id) {
            Node::VarDecl { kind, declarators } => {
                let scope = self.enclosing_scope(ast, id);
                let (scope, binding_kind) = match kind {
                    DeclKind::Var => (self.function_scope(scope), BindingKind::Var),
                    DeclKind::Let => (scope, BindingKind::Let),
                    DeclKind::Const => (scope, BindingKind::Const),
                };
                for declarator in declarators {
                    if let Node::Declarator { target, .. } = ast.node(*declarator) {
                        for ident in binding_identifiers(ast, *target) {
                            self.declare(ast, scope, ident, binding_kind);
                        }
                    }
                }
            }
            Node::Function {
                kind, name, params, ..
            } => {
                let own = self.own_scope(id).unwrap_or(self.root_scope());
                if let Some(name) = name {
                    if *kind == FunctionKind::Declaration {
                        let outer = self.enclosing_scope(ast, *name);
                        self.declare(ast, outer, *name, BindingKind::Function);
                    } else {
                        self.declare(ast, own, *name, BindingKind::SelfName);
                    }
                }
                for param in params {
                    for ident in binding_identifiers(ast, *param) {
                        self.declare(ast, own, ident, BindingKind::Param);
                    }
                }
            }
            Node::Class {
                name: Some(name),
                is_declaration,
                ..
            } => {
                let (scope, kind) = if *is_declaration {
                    (self.enclosing_scope(ast, *name), BindingKind::Class)
                } else {
                    (
                        self.own_scope(id).unwrap_or(self.root_scope()),
                        BindingKind::SelfName,
                    )
                };
                self.declare(ast, scope, *name, kind);
            }
            Node::Catch {
                param: Some(param), ..
            } => {
                let own = self.own_scope(id).unwrap_or(self.root_scope());
                for ident in binding_identifiers(ast, *param) {
                    self.declare(ast, own, ident, BindingKind::CatchParam);
                }
            }
            _ => {}
        }
    }

    fn declare(&mut self, ast: &Ast, scope: ScopeId, ident: NodeId, kind: BindingKind) {
        let Some(name) = ast.ident_name(ident) else {
            return;
        };
        let existing = self.scopes[scope.0 as usize].get(name);
        if let Some(existing) = existing {
            if self.bindings[existing.0 as usize].kind != BindingKind::SelfName {
                self.bindings[existing.0 as usize].violations.push(ident);
                self.resolved.insert(ident, existing);
                return;
            }
        }
        let binding = BindingId(self.bindings.len() as u32);
        self.bindings.push(Binding {
            name: name.to_string(),
            kind,
            scope,
            declaration: ident,
            references: Vec::new(),
            violations: Vec::new(),
        });
        self.resolved.insert(ident, binding);
        let scope = &mut self.scopes[scope.0 as usize];
        scope.names.insert(name.to_string(), binding);
        scope.declared.push(binding);
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn binding(&self, id: BindingId) -> &Binding {
        &self.bindings[id.0 as usize]
    }

    pub fn root_scope(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Scope opened by `node`, if it opens one.
    pub fn own_scope(&self, node: NodeId) -> Option<ScopeId> {
        self.by_node.get(&node).copied()
    }

    /// Scope that contains `node`. Detached nodes land in the program scope.
    pub fn enclosing_scope(&self, ast: &Ast, node: NodeId) -> ScopeId {
        let scope_node = enclosing_scope_node(ast, node);
        self.own_scope(scope_node).unwrap_or(self.root_scope())
    }

    /// Nearest function or program scope at or above `scope`; where `var` declarations go.
    pub fn function_scope(&self, scope: ScopeId) -> ScopeId {
        let mut current = scope;
        loop {
            let data = self.scope(current);
            if matches!(data.kind, ScopeKind::Function | ScopeKind::Program) {
                return current;
            }
            match data.parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    /// Resolves `name` from `scope` outward.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<BindingId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let data = self.scope(id);
            if let Some(binding) = data.get(name) {
                return Some(binding);
            }
            current = data.parent;
        }
        None
    }

    /// Binding an identifier declares or refers to; `None` for globals and non-lexical names.
    pub fn resolve(&self, ident: NodeId) -> Option<BindingId> {
        self.resolved.get(&ident).copied()
    }

    /// Every identifier name spelled anywhere in the analysed program.
    pub fn names(&self) -> &FxHashSet<String> {
        &self.names
    }

    /// Bindings whose declaring identifier lies inside the subtree at `node`.
    pub fn bindings_declared_in(&self, ast: &Ast, node: NodeId) -> Vec<BindingId> {
        (0..self.bindings.len() as u32)
            .map(BindingId)
            .filter(|b| ast.is_ancestor_or_self(node, self.binding(*b).declaration))
            .collect()
    }

    /// Names read or written inside `node` that resolve to a binding of a scope outside of it,
    /// each with that binding (`None` for globals). Deduplicated, in first-occurrence order.
    ///
    /// A function declaration's own name belongs to the scope around it, so it counts as free
    /// when the function refers to itself.
    pub fn free_names(&self, ast: &Ast, node: NodeId) -> Vec<(String, Option<BindingId>)> {
        let mut out: Vec<(String, Option<BindingId>)> = Vec::new();
        for id in self.free_references(ast, node) {
            let Some(name) = ast.ident_name(id) else {
                continue;
            };
            if !out.iter().any(|(seen, _)| seen == name) {
                out.push((name.to_string(), self.resolve(id)));
            }
        }
        out
    }

    /// Every identifier inside `node` that reads or writes a name bound outside of it.
    pub fn free_references(&self, ast: &Ast, node: NodeId) -> Vec<NodeId> {
        ast.descendants(node)
            .into_iter()
            .filter(|id| {
                matches!(
                    ident_role(ast, *id),
                    IdentRole::Reference | IdentRole::WriteTarget
                ) && ast.ident_name(*id).is_some()
            })
            .filter(|id| {
                self.resolve(*id).is_none_or(|binding| {
                    let scope_node = self.scope(self.binding(binding).scope).node;
                    !ast.is_ancestor_or_self(node, scope_node)
                })
            })
            .collect()
    }

    /// Rewrites the declaring identifier, every reference and every write site of `binding`.
    /// The analysis is stale afterwards.
    pub fn rename_binding(&self, ast: &mut Ast, binding: BindingId, new_name: &str) {
        let data = self.binding(binding);
        let sites = std::iter::once(data.declaration)
            .chain(data.references.iter().copied())
            .chain(data.violations.iter().copied());
        for site in sites {
            ast.set_ident_name(site, new_name);
        }
    }
}

/// Hands out names that collide with nothing in the program and with no earlier result.
#[derive(Debug, Clone, Default)]
pub struct UidGenerator {
    used: FxHashSet<String>,
}

impl UidGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserve<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.used.extend(names.into_iter().map(Into::into));
    }

    /// `_base`, then `_base2`, `_base3`, ... where `base` is `name` without leading underscores
    /// and trailing digits.
    pub fn generate(&mut self, name: &str) -> String {
        let base = name
            .trim_start_matches('_')
            .trim_end_matches(|c: char| c.is_ascii_digit());
        let base = if base.is_empty() { "temp" } else { base };
        let mut counter = 1usize;
        loop {
            let candidate = if counter == 1 {
                format!("_{base}")
            } else {
                format!("_{base}{counter}")
            };
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            counter += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    fn analyzed(source: &str) -> (Ast, ScopeTree) {
        let (ast, diagnostics) = parse_program(source);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let scopes = ScopeTree::analyze(&ast);
        (ast, scopes)
    }

    fn idents(ast: &Ast, name: &str) -> Vec<NodeId> {
        ast.descendants(ast.root())
            .into_iter()
            .filter(|id| ast.ident_name(*id) == Some(name))
            .collect()
    }

    #[test]
    fn references_and_violations() {
        let (ast, scopes) = analyzed("let a = 1;\nf(a);\na = 2;\nconst b = a;");
        let decl = idents(&ast, "a")[0];
        let binding = scopes.binding(scopes.resolve(decl).expect("declared"));
        assert_eq!(binding.kind, BindingKind::Let);
        assert_eq!(binding.references.len(), 2);
        assert_eq!(binding.violations.len(), 1);
        assert!(!binding.is_constant());
    }

    #[test]
    fn block_scoping_and_shadowing() {
        let (ast, scopes) = analyzed("const a = 1;\n{\n  const a = 2;\n  f(a);\n}\nf(a);");
        let a = idents(&ast, "a");
        let outer = scopes.resolve(a[0]).expect("outer");
        let inner = scopes.resolve(a[1]).expect("inner");
        assert_ne!(outer, inner);
        assert_eq!(scopes.resolve(a[2]), Some(inner));
        assert_eq!(scopes.resolve(a[3]), Some(outer));
    }

    #[test]
    fn var_hoists_to_function_scope() {
        let (ast, scopes) = analyzed("function f() {\n  if (x) {\n    var v = 1;\n  }\n  return v;\n}");
        let v = idents(&ast, "v");
        assert_eq!(scopes.resolve(v[1]), scopes.resolve(v[0]));
        let binding = scopes.binding(scopes.resolve(v[0]).expect("declared"));
        assert_eq!(scopes.scope(binding.scope).kind, ScopeKind::Function);
    }

    #[test]
    fn function_names_and_params() {
        let (ast, scopes) = analyzed("function f(a) {\n  return a;\n}\nconst g = function h() {\n  return h;\n};");
        let f = idents(&ast, "f")[0];
        let f_binding = scopes.binding(scopes.resolve(f).expect("f"));
        assert_eq!(f_binding.kind, BindingKind::Function);
        assert_eq!(f_binding.scope, scopes.root_scope());
        let a = idents(&ast, "a");
        assert_eq!(scopes.binding(scopes.resolve(a[0]).expect("a")).kind, BindingKind::Param);
        assert_eq!(scopes.resolve(a[1]), scopes.resolve(a[0]));
        let h = idents(&ast, "h");
        let h_binding = scopes.binding(scopes.resolve(h[0]).expect("h"));
        assert_eq!(h_binding.kind, BindingKind::SelfName);
        assert_eq!(h_binding.references, vec![h[1]]);
        assert_eq!(scopes.lookup(scopes.root_scope(), "h"), None);
    }

    #[test]
    fn catch_parameter_is_scoped_to_clause() {
        let (ast, scopes) = analyzed("try {} catch (e) {\n  f(e);\n}\nf(e);");
        let e = idents(&ast, "e");
        assert_eq!(scopes.resolve(e[1]), scopes.resolve(e[0]));
        assert_eq!(scopes.resolve(e[2]), None);
    }

    #[test]
    fn redeclaration_is_a_violation() {
        let (ast, scopes) = analyzed("var a = 1;\nvar a = 2;");
        let binding = scopes.binding(scopes.resolve(idents(&ast, "a")[0]).expect("a"));
        assert!(!binding.is_constant());
    }

    #[test]
    fn free_names_skip_inner_bindings() {
        let (ast, scopes) = analyzed("const k = 1;\nconst f = x => {\n  const y = x + k;\n  return y + g;\n};");
        let arrow = ast
            .descendants(ast.root())
            .into_iter()
            .find(|id| ast.node(*id).is_arrow())
            .expect("arrow");
        let free: Vec<_> = scopes
            .free_names(&ast, arrow)
            .into_iter()
            .map(|(name, binding)| (name, binding.is_some()))
            .collect();
        assert_eq!(free, [("k".to_string(), true), ("g".to_string(), false)]);
    }

    #[test]
    fn recursive_declaration_reads_its_own_name_freely() {
        let (ast, scopes) = analyzed("function f(n) {\n  return f(n - 1);\n}");
        let function = ast.children(ast.root())[0];
        let free: Vec<_> = scopes
            .free_names(&ast, function)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(free, ["f"]);
    }

    #[test]
    fn rename_rewrites_all_sites() {
        let (mut ast, scopes) = analyzed("let a = 1;\na = a + 1;");
        let binding = scopes.resolve(idents(&ast, "a")[0]).expect("a");
        scopes.rename_binding(&mut ast, binding, "_a");
        assert!(idents(&ast, "a").is_empty());
        assert_eq!(idents(&ast, "_a").len(), 3);
    }

    #[test]
    fn uids_skip_used_names() {
        let mut uids = UidGenerator::new();
        uids.reserve(["_a"]);
        assert_eq!(uids.generate("a"), "_a2");
        assert_eq!(uids.generate("_a2"), "_a3");
        assert_eq!(uids.generate("b"), "_b");
        assert_eq!(uids.generate("42"), "_temp");
    }
}
