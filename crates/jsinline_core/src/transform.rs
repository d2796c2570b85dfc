//! The combined walk.
//!
//! One depth-first traversal runs every rewrite: entry handlers fire before a node's children,
//! exit handlers after them. A handler that replaces its node hands the replacement straight
//! back to the walk. Nodes a rewrite creates or exposes elsewhere are requeued and visited once
//! more after the current statement of the innermost statement list is done.

use std::collections::VecDeque;
use std::rc::Rc;

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::ast::{Ast, Node, NodeId};
use crate::diagnostics::Diagnostic;
use crate::error::TransformError;
use crate::inline_table::InlineTable;
use crate::options::TransformOptions;
use crate::scope::{BindingId, ScopeTree, UidGenerator};

/// Counters describing what a run changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransformStats {
    pub functions_inlined: usize,
    pub expansions: usize,
    pub hoisted_bindings: usize,
    pub projections: usize,
    pub simplified_bindings: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TransformReport {
    /// Non-fatal findings, mostly functions that were marked but could not be inlined.
    pub diagnostics: Vec<Diagnostic>,
    pub stats: TransformStats,
}

/// What a handler did to the node it was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Unchanged,
    /// The node was swapped for another one, which the walk visits next.
    Replaced(NodeId),
    Removed,
}

pub(crate) struct Transformer<'a> {
    pub(crate) ast: &'a mut Ast,
    pub(crate) options: &'a TransformOptions,
    scopes: Option<Rc<ScopeTree>>,
    pub(crate) uids: UidGenerator,
    pub(crate) table: InlineTable,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) stats: TransformStats,
    /// Arrow functions whose expression body was wrapped into a block to receive hoisted
    /// declarations.
    pub(crate) prepared_bodies: FxHashSet<NodeId>,
    queue: VecDeque<NodeId>,
    queued: FxHashSet<NodeId>,
    rewrites: usize,
}

impl<'a> Transformer<'a> {
    pub(crate) fn new(ast: &'a mut Ast, options: &'a TransformOptions) -> Self {
        Self {
            ast,
            options,
            scopes: None,
            uids: UidGenerator::new(),
            table: InlineTable::new(),
            diagnostics: Vec::new(),
            stats: TransformStats::default(),
            prepared_bodies: FxHashSet::default(),
            queue: VecDeque::new(),
            queued: FxHashSet::default(),
            rewrites: 0,
        }
    }

    pub(crate) fn run(mut self) -> Result<TransformReport, TransformError> {
        if self.options.inline_functions {
            self.mark_inline_functions()?;
        }
        let root = self.ast.root();
        self.visit(root)?;
        while let Some(id) = self.queue.pop_front() {
            self.queued.remove(&id);
            if self.ast.is_attached(id) {
                self.visit(id)?;
            }
        }
        Ok(TransformReport {
            diagnostics: self.diagnostics,
            stats: self.stats,
        })
    }

    // -----------------------------------------------------------------------
    // Shared state
    // -----------------------------------------------------------------------

    /// Scope analysis of the current tree, recomputed after edits.
    pub(crate) fn scopes(&mut self) -> Rc<ScopeTree> {
        if let Some(scopes) = &self.scopes {
            return Rc::clone(scopes);
        }
        let scopes = Rc::new(ScopeTree::analyze(self.ast));
        self.uids.reserve(scopes.names().iter().cloned());
        self.scopes = Some(Rc::clone(&scopes));
        scopes
    }

    /// Marks the scope analysis stale. Every tree edit goes through here.
    pub(crate) fn invalidate(&mut self) {
        self.scopes = None;
    }

    /// Renames `binding` everywhere, templates included.
    pub(crate) fn rename_binding(&mut self, scopes: &ScopeTree, binding: BindingId, new_name: &str) {
        scopes.rename_binding(self.ast, binding, new_name);
        let declaration = scopes.binding(binding).declaration;
        self.table.rename_free(self.ast, declaration, new_name);
        self.invalidate();
    }

    /// Whether removing `binding` would strand a read inside an inline template.
    pub(crate) fn is_pinned(&self, scopes: &ScopeTree, binding: BindingId) -> bool {
        self.table.pins(scopes.binding(binding).declaration)
    }

    pub(crate) fn requeue(&mut self, id: NodeId) {
        if self.queued.insert(id) {
            self.queue.push_back(id);
        }
    }

    /// Counts one rewrite against `max_expansions`.
    pub(crate) fn count_rewrite(&mut self) -> Result<(), TransformError> {
        self.rewrites += 1;
        if self.rewrites > self.options.max_expansions {
            return Err(TransformError::ExpansionLimit {
                limit: self.options.max_expansions,
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Walk
    // -----------------------------------------------------------------------

    fn visit(&mut self, id: NodeId) -> Result<(), TransformError> {
        match self.enter(id)? {
            Outcome::Replaced(replacement) => return self.visit(replacement),
            Outcome::Removed => return Ok(()),
            Outcome::Unchanged => {}
        }

        let is_list = self.ast.node(id).is_statement_list();
        for child in self.ast.children(id) {
            // Earlier siblings' rewrites may have moved or dropped this one.
            if self.ast.parent(child) != Some(id) {
                continue;
            }
            self.visit(child)?;
            if is_list {
                self.drain_queue(id)?;
            }
        }

        if self.ast.is_attached(id) {
            self.exit(id)?;
        }
        Ok(())
    }

    /// Visits queued nodes that lie outside of `list`'s ancestry. Ancestors stay queued until
    /// the walk has left them.
    fn drain_queue(&mut self, list: NodeId) -> Result<(), TransformError> {
        loop {
            let next = self
                .queue
                .iter()
                .position(|queued| !self.ast.is_ancestor_or_self(*queued, list));
            let Some(id) = next.and_then(|index| self.queue.remove(index)) else {
                break;
            };
            self.queued.remove(&id);
            if self.ast.is_attached(id) {
                self.visit(id)?;
            }
        }
        Ok(())
    }

    fn enter(&mut self, id: NodeId) -> Result<Outcome, TransformError> {
        match self.ast.node(id) {
            Node::Ident { .. } if self.options.inline_functions => self.substitute_identifier(id),
            Node::Call { .. } if self.options.inline_functions => {
                self.substitute_call_operands(id)?;
                self.expand_call(id)
            }
            Node::Declarator { .. } if self.options.project_objects => {
                self.project_bound_object(id)
            }
            _ => Ok(Outcome::Unchanged),
        }
    }

    fn exit(&mut self, id: NodeId) -> Result<Outcome, TransformError> {
        match self.ast.node(id) {
            Node::Member { .. } if self.options.project_objects => self.project_member(id),
            Node::Function { .. } => self.simplify_function(id),
            _ => Ok(Outcome::Unchanged),
        }
    }
}

/// Rewrites `ast` in place: inlines marked functions, expands calls of literal closures,
/// projects object literals and removes the bindings that became redundant.
pub fn transform_program(
    ast: &mut Ast,
    options: &TransformOptions,
) -> Result<TransformReport, TransformError> {
    Transformer::new(ast, options).run()
}
