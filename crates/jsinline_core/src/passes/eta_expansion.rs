//! Inline-table substitution and eta expansion of calls to literal closures.
//!
//! `((a, b) => a + b)(1, g())` becomes `1 + g()`: every parameter and local of the callee is
//! either substituted into its single use, dropped when nothing reads it and evaluating it has
//! no effect, or hoisted into a `const` in front of the statement containing the call. Hoisted
//! bindings get fresh names, so nothing at the insertion point can capture them.

use crate::ast::{Ast, DeclKind, FunctionKind, Node, NodeId};
use crate::ast_utils::{
    can_inline_identifier, enclosing_function, enclosing_statement, uses_own_this,
};
use crate::error::TransformError;
use crate::passes::insertion::{find_insertion_point, insert_declaration, InsertionPoint};
use crate::inline_table::InlineTable;
use crate::passes::mark_inline::{has_constant_bindings, parameters_inlineable};
use crate::passes::object_projection::resolves_alike;
use crate::purity::{evaluated_before, is_constant_read, is_pure_with};
use crate::scope::{BindingId, ScopeId, ScopeTree};
use crate::transform::{Outcome, Transformer};

/// What a parameter or local is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Node(NodeId),
    /// Parameter without a matching argument.
    Undefined,
    /// Arguments collected by a rest parameter.
    Rest(Vec<NodeId>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fate {
    /// Replaces the binding's only reference.
    Substitute(NodeId),
    Drop,
    Hoist,
}

#[derive(Debug, Clone)]
struct Slot {
    binding: BindingId,
    value: Value,
    fate: Fate,
    /// Evaluating the value has an effect or allocates.
    impure: bool,
}

#[derive(Debug)]
struct Expansion {
    tail: NodeId,
    params: Vec<Slot>,
    locals: Vec<Slot>,
    point: Option<InsertionPoint>,
    /// Bindings nested in the callee that would capture a substituted value's names.
    renames: Vec<BindingId>,
}

impl Expansion {
    fn slots(&self) -> impl Iterator<Item = &Slot> {
        self.params.iter().chain(&self.locals)
    }

    fn hoists(&self) -> bool {
        self.slots().any(|slot| slot.fate == Fate::Hoist)
    }
}

fn value_nodes(value: &Value) -> Vec<NodeId> {
    match value {
        Value::Node(id) => vec![*id],
        Value::Undefined => Vec::new(),
        Value::Rest(items) => items.clone(),
    }
}

/// Where `id` went if it was a reference that has been substituted.
fn follow(substituted: &[(NodeId, NodeId)], id: NodeId) -> NodeId {
    substituted
        .iter()
        .find_map(|(reference, value)| (*reference == id).then_some(*value))
        .unwrap_or(id)
}

/// Constant reads, and names the inline table is going to replace with a closure.
fn pure_read(ast: &Ast, scopes: &ScopeTree, table: &InlineTable, ident: NodeId) -> bool {
    if is_constant_read(ast, scopes, ident) {
        return true;
    }
    scopes.resolve(ident).is_none()
        && ast
            .ident_name(ident)
            .is_some_and(|name| table.lookup(ast, name, ident).is_some())
}

/// A closure literal moved under another closure would be created once per inner call instead
/// of once.
fn changes_identity(ast: &Ast, value: &Value, reference: NodeId, callee: NodeId) -> bool {
    matches!(value, Value::Node(node) if ast.node(*node).is_function())
        && enclosing_function(ast, reference) != Some(callee)
}

/// The expression a callee body evaluates to, after its `const` declarations. `Err` carries
/// the span of a `return;` that has no value to offer.
fn split_body(ast: &Ast, body: NodeId) -> Option<(Vec<NodeId>, Result<NodeId, NodeId>)> {
    let Node::Block { body: statements } = ast.node(body) else {
        return Some((Vec::new(), Ok(body)));
    };
    let (last, leading) = statements.split_last()?;
    let mut declarators = Vec::new();
    for stmt in leading {
        let Node::VarDecl {
            kind: DeclKind::Const,
            declarators: list,
        } = ast.node(*stmt)
        else {
            return None;
        };
        for declarator in list {
            match ast.node(*declarator) {
                Node::Declarator {
                    target,
                    init: Some(_),
                } if matches!(ast.node(*target), Node::Ident { .. }) => {
                    declarators.push(*declarator)
                }
                _ => return None,
            }
        }
    }
    match ast.node(*last) {
        Node::Return { arg: Some(arg) } => Some((declarators, Ok(*arg))),
        Node::Return { arg: None } => Some((declarators, Err(*last))),
        _ => None,
    }
}

/// Decides the fate of everything the callee binds. `None` leaves the call alone.
fn plan_expansion(
    ast: &Ast,
    scopes: &ScopeTree,
    call: NodeId,
    table: &InlineTable,
) -> Result<Option<Expansion>, TransformError> {
    let read = |ident| pure_read(ast, scopes, table, ident);
    let is_pure = |id| is_pure_with(ast, id, &read);
    let Node::Call { callee, args } = ast.node(call) else {
        return Ok(None);
    };
    let callee = *callee;
    let Node::Function {
        kind,
        name,
        params,
        body,
        is_async,
    } = ast.node(callee)
    else {
        return Ok(None);
    };
    if *is_async || !matches!(kind, FunctionKind::Arrow | FunctionKind::Expression) {
        return Ok(None);
    }
    let Some(own_scope) = scopes.own_scope(callee) else {
        return Ok(None);
    };
    if !has_constant_bindings(scopes, callee)
        || !parameters_inlineable(ast, params)
        || (*kind == FunctionKind::Expression && uses_own_this(ast, callee))
    {
        return Ok(None);
    }
    let self_named = name
        .and_then(|name| scopes.resolve(name))
        .is_some_and(|binding| !scopes.binding(binding).references.is_empty());
    let reads_hidden = scopes
        .bindings_declared_in(ast, callee)
        .into_iter()
        .any(|binding| table.pins(scopes.binding(binding).declaration));
    if self_named || reads_hidden {
        return Ok(None);
    }
    let Some((declarators, tail)) = split_body(ast, *body) else {
        return Ok(None);
    };
    if args
        .iter()
        .any(|arg| matches!(ast.node(*arg), Node::Spread { .. }))
    {
        return Ok(None);
    }
    let has_rest = params
        .last()
        .is_some_and(|param| matches!(ast.node(*param), Node::Rest { .. }));
    let surplus = if has_rest {
        &[][..]
    } else {
        args.get(params.len()..).unwrap_or_default()
    };
    if !surplus.iter().all(|arg| is_pure(*arg)) {
        return Ok(None);
    }
    let tail = match tail {
        Ok(tail) => tail,
        Err(ret) => {
            return Err(TransformError::MissingTailExpression {
                span: ast.span(ret),
            })
        }
    };

    // Parameters
    let mut slots = Vec::with_capacity(params.len());
    for (index, param) in params.iter().enumerate() {
        let (ident, value) = match ast.node(*param) {
            Node::Rest { arg } => {
                let rest = args.get(index..).unwrap_or_default().to_vec();
                (*arg, Value::Rest(rest))
            }
            _ => (
                *param,
                args.get(index)
                    .map_or(Value::Undefined, |arg| Value::Node(*arg)),
            ),
        };
        let Some(binding) = scopes.resolve(ident) else {
            return Ok(None);
        };
        let effect_free = value_nodes(&value)
            .into_iter()
            .all(is_pure);
        let impure = !effect_free || matches!(value, Value::Rest(_));
        let fate = match scopes.binding(binding).references.as_slice() {
            [] if effect_free => Fate::Drop,
            [reference] if !impure && !changes_identity(ast, &value, *reference, callee) => {
                Fate::Substitute(*reference)
            }
            _ => Fate::Hoist,
        };
        slots.push(Slot {
            binding,
            value,
            fate,
            impure,
        });
    }

    // Locals
    let mut locals = Vec::with_capacity(declarators.len());
    for declarator in declarators {
        let Node::Declarator {
            target,
            init: Some(init),
        } = ast.node(declarator)
        else {
            return Ok(None);
        };
        let Some(binding) = scopes.resolve(*target) else {
            return Ok(None);
        };
        let impure = !is_pure(*init);
        let value = Value::Node(*init);
        let fate = match scopes.binding(binding).references.as_slice() {
            [] if !impure => Fate::Drop,
            [reference]
                if !impure
                    && !changes_identity(ast, &value, *reference, callee)
                    && resolves_alike(ast, scopes, *init, *reference) =>
            {
                Fate::Substitute(*reference)
            }
            _ => Fate::Hoist,
        };
        locals.push(Slot {
            binding,
            value,
            fate,
            impure,
        });
    }

    // A lone effect may still go straight to its use when nothing observable runs before it.
    let impure_count = slots.iter().chain(&locals).filter(|slot| slot.impure).count();
    if impure_count == 1 && locals.is_empty() {
        for slot in &mut slots {
            let references = &scopes.binding(slot.binding).references;
            if slot.impure
                && references.len() == 1
                && evaluated_before(ast, tail, references[0], &is_pure)
            {
                slot.fate = Fate::Substitute(references[0]);
            }
        }
    }

    let mut expansion = Expansion {
        tail,
        params: slots,
        locals,
        point: None,
        renames: Vec::new(),
    };

    if expansion.hoists() {
        let Some(point) = find_insertion_point(ast, call) else {
            return Ok(None);
        };
        let anchor = point.anchor();
        let moves_effects = expansion
            .slots()
            .any(|slot| slot.fate == Fate::Hoist && slot.impure);
        // A moved effect may change anything read before the call, so only pure code may
        // precede it.
        if moves_effects && !evaluated_before(ast, anchor, call, &is_pure) {
            return Ok(None);
        }
        // Hoisted code must not read a binding the anchor itself declares.
        let hoisted_roots = expansion
            .params
            .iter()
            .flat_map(|slot| value_nodes(&slot.value))
            .chain(
                expansion
                    .locals
                    .iter()
                    .filter(|slot| slot.fate == Fate::Hoist)
                    .flat_map(|slot| value_nodes(&slot.value)),
            );
        for root in hoisted_roots {
            let reads_anchor_binding = scopes.free_references(ast, root).into_iter().any(|id| {
                scopes.resolve(id).is_some_and(|binding| {
                    let declaration = scopes.binding(binding).declaration;
                    !ast.is_ancestor_or_self(callee, declaration)
                        && ast.is_ancestor_or_self(anchor, declaration)
                })
            });
            if reads_anchor_binding {
                return Ok(None);
            }
        }
        expansion.point = Some(point);
    }

    expansion.renames = capturing_bindings(ast, scopes, own_scope, &expansion);
    Ok(Some(expansion))
}

/// Bindings of scopes nested in the callee that would shadow a name a substituted value reads
/// at its new position.
fn capturing_bindings(
    ast: &Ast,
    scopes: &ScopeTree,
    own_scope: ScopeId,
    expansion: &Expansion,
) -> Vec<BindingId> {
    let mut out = Vec::new();
    for slot in expansion.slots() {
        let (Fate::Substitute(reference), Value::Node(value)) = (slot.fate, &slot.value) else {
            continue;
        };
        let scope = scopes.enclosing_scope(ast, reference);
        for (name, expected) in scopes.free_names(ast, *value) {
            let Some(found) = scopes.lookup(scope, &name) else {
                continue;
            };
            if Some(found) != expected
                && scopes.binding(found).scope != own_scope
                && !out.contains(&found)
            {
                out.push(found);
            }
        }
    }
    out
}

impl Transformer<'_> {
    pub(crate) fn substitute_identifier(
        &mut self,
        ident: NodeId,
    ) -> Result<Outcome, TransformError> {
        Ok(match self.instantiate_at(ident)? {
            Some(copy) => Outcome::Replaced(copy),
            None => Outcome::Unchanged,
        })
    }

    /// Swaps an inline function's name in callee position, or passed as a bare argument, for
    /// a copy of its body so the call can be expanded right away.
    pub(crate) fn substitute_call_operands(&mut self, call: NodeId) -> Result<(), TransformError> {
        let Node::Call { callee, args } = self.ast.node(call) else {
            return Ok(());
        };
        let operands: Vec<NodeId> = std::iter::once(*callee)
            .chain(args.iter().copied())
            .collect();
        for operand in operands {
            if matches!(self.ast.node(operand), Node::Ident { .. }) {
                self.instantiate_at(operand)?;
            }
        }
        Ok(())
    }

    /// Replaces `ident` with a fresh copy of the inline function it names, renaming bindings
    /// at the site that would capture the copy's free names.
    fn instantiate_at(&mut self, ident: NodeId) -> Result<Option<NodeId>, TransformError> {
        if self.table.is_empty() || !can_inline_identifier(self.ast, ident) {
            return Ok(None);
        }
        let Some(name) = self.ast.ident_name(ident).map(str::to_string) else {
            return Ok(None);
        };
        loop {
            let scopes = self.scopes();
            let Some(entry) = self.table.lookup(self.ast, &name, ident) else {
                return Ok(None);
            };
            let site = scopes.enclosing_scope(self.ast, ident);
            if scopes.lookup(site, &name).is_some() {
                return Ok(None);
            }
            let ast = &*self.ast;
            let mismatch = entry.free.iter().find_map(|free| {
                let found = scopes.lookup(site, &free.name);
                let declaration = found.map(|binding| scopes.binding(binding).declaration);
                // Another inline function: its declaration is gone and the name must stay free.
                let expected = free.declaration.filter(|id| ast.is_attached(*id));
                (declaration != expected).then_some(found)
            });
            match mismatch {
                None => break,
                Some(Some(shadow)) => {
                    let fresh = self.uids.generate(&scopes.binding(shadow).name);
                    self.rename_binding(&scopes, shadow, &fresh);
                }
                // The binding the body reads is gone from here.
                Some(None) => return Ok(None),
            }
        }

        self.count_rewrite()?;
        let Some(entry) = self.table.lookup(self.ast, &name, ident) else {
            return Ok(None);
        };
        let copy = InlineTable::instantiate(self.ast, entry);
        self.ast.replace(ident, copy)?;
        self.invalidate();
        Ok(Some(copy))
    }

    pub(crate) fn expand_call(&mut self, call: NodeId) -> Result<Outcome, TransformError> {
        let expandable = matches!(
            self.ast.node(call),
            Node::Call { callee, .. } if self.ast.node(*callee).is_function()
        );
        if !expandable {
            return Ok(Outcome::Unchanged);
        }
        let scopes = self.scopes();
        let plan = plan_expansion(self.ast, &scopes, call, &self.table)?;
        let Some(expansion) = plan else {
            return Ok(Outcome::Unchanged);
        };
        self.count_rewrite()?;
        self.commit_expansion(&scopes, call, expansion)
    }

    fn commit_expansion(
        &mut self,
        scopes: &ScopeTree,
        call: NodeId,
        expansion: Expansion,
    ) -> Result<Outcome, TransformError> {
        for binding in &expansion.renames {
            let fresh = self.uids.generate(&scopes.binding(*binding).name);
            self.rename_binding(scopes, *binding, &fresh);
        }

        // References swapped out so far. A local's initializer or the tail may itself be one.
        let mut substituted: Vec<(NodeId, NodeId)> = Vec::new();
        let mut declarators = Vec::new();
        for slot in expansion.slots() {
            let bound = match &slot.value {
                Value::Node(id) => Value::Node(follow(&substituted, *id)),
                other => other.clone(),
            };
            match slot.fate {
                Fate::Substitute(reference) => {
                    let value = self.materialize(&bound);
                    self.ast.replace(reference, value)?;
                    substituted.push((reference, value));
                }
                Fate::Hoist => {
                    let fresh = self.uids.generate(&scopes.binding(slot.binding).name);
                    self.rename_binding(scopes, slot.binding, &fresh);
                    let value = self.materialize(&bound);
                    let target = self.ast.ident(&fresh);
                    declarators.push((target, value));
                }
                Fate::Drop => {}
            }
        }

        let tail = follow(&substituted, expansion.tail);
        self.ast.replace(call, tail)?;
        self.stats.expansions += 1;
        self.stats.hoisted_bindings += declarators.len();

        match expansion.point {
            Some(point) if !declarators.is_empty() => {
                let declaration = self.ast.const_decl(declarators);
                let point = point.retarget(call, tail);
                let span = self.ast.span(call);
                let revisit = insert_declaration(self.ast, point, declaration)
                    .map_err(|_| TransformError::InsertionFailed { span })?;
                match point {
                    InsertionPoint::StatementList { .. } => self.requeue(declaration),
                    InsertionPoint::ArrowBody { arrow, .. } => {
                        self.prepared_bodies.insert(arrow);
                    }
                    InsertionPoint::IfBranch { .. } | InsertionPoint::LoopBody { .. } => {}
                }
                self.requeue(revisit);
            }
            _ => {
                if let Some(stmt) = enclosing_statement(self.ast, tail) {
                    self.requeue(stmt);
                }
            }
        }
        self.invalidate();
        Ok(Outcome::Replaced(tail))
    }

    fn materialize(&mut self, value: &Value) -> NodeId {
        match value {
            Value::Node(id) => *id,
            Value::Undefined => self.ast.void_zero(),
            Value::Rest(items) => self.ast.alloc(
                Node::Array {
                    elements: items.clone(),
                },
                Default::default(),
            ),
        }
    }
}
