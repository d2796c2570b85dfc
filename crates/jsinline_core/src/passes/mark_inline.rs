//! Decides which annotated function declarations are inlined and turns them into templates.
//!
//! Runs once before the main walk over every function declaration in the program, so calls
//! that precede the declaration are covered too.

use regex::Regex;
use rustc_hash::FxHashMap;

use crate::ast::{Ast, FunctionKind, Node, NodeId};
use crate::ast_utils::uses_own_this;
use crate::diagnostics::Diagnostic;
use crate::error::TransformError;
use crate::inline_table::{FreeName, InlineEntry};
use crate::scope::{enclosing_scope_node, ScopeTree};
use crate::transform::Transformer;

/// Why an annotated function stays an ordinary function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ineligible {
    Async,
    MutatedBinding,
    ComplexParameters,
    Recursive,
    UsesThis,
    Reassigned,
}

impl Ineligible {
    pub(crate) fn code(self) -> &'static str {
        match self {
            Ineligible::Async => "I0101",
            Ineligible::MutatedBinding => "I0102",
            Ineligible::ComplexParameters => "I0103",
            Ineligible::Recursive => "I0104",
            Ineligible::UsesThis => "I0105",
            Ineligible::Reassigned => "I0106",
        }
    }

    fn reason(self) -> &'static str {
        match self {
            Ineligible::Async => "it is asynchronous",
            Ineligible::MutatedBinding => "it mutates its arguments or locals",
            Ineligible::ComplexParameters => "it has complex parameters",
            Ineligible::Recursive => "it calls itself",
            Ineligible::UsesThis => "it uses `this` or `arguments`",
            Ineligible::Reassigned => "its name is reassigned",
        }
    }
}

/// Builds the pattern recognising the annotation line inside a `/** ... */` comment.
pub(crate) fn annotation_pattern(tag: &str) -> Result<Regex, TransformError> {
    Ok(Regex::new(&format!(r"(?m)^\s*\*\s*@{}\s*$", regex::escape(tag)))?)
}

pub(crate) fn has_annotation(ast: &Ast, id: NodeId, pattern: &Regex) -> bool {
    ast.comments(id)
        .iter()
        .any(|comment| comment.starts_with('*') && pattern.is_match(comment))
}

/// Plain identifiers, optionally with one trailing rest identifier.
pub(crate) fn parameters_inlineable(ast: &Ast, params: &[NodeId]) -> bool {
    params.iter().all(|param| match ast.node(*param) {
        Node::Ident { .. } => true,
        Node::Rest { arg } => matches!(ast.node(*arg), Node::Ident { .. }),
        _ => false,
    })
}

/// Every binding of the scope `function` opens is constant.
pub(crate) fn has_constant_bindings(scopes: &ScopeTree, function: NodeId) -> bool {
    scopes.own_scope(function).is_some_and(|scope| {
        scopes
            .scope(scope)
            .bindings()
            .iter()
            .all(|binding| scopes.binding(*binding).is_constant())
    })
}

struct Candidate {
    function: NodeId,
    name_ident: NodeId,
    name: String,
    free: Vec<FreeName>,
}

/// The first write to a binding of `function`'s own scope.
fn first_violation(scopes: &ScopeTree, function: NodeId) -> Option<NodeId> {
    let scope = scopes.own_scope(function)?;
    scopes
        .scope(scope)
        .bindings()
        .iter()
        .find_map(|binding| scopes.binding(*binding).violations.first().copied())
}

/// Ok, or the rule `function` breaks with the write that breaks it, when there is one.
fn check(
    ast: &Ast,
    scopes: &ScopeTree,
    function: NodeId,
) -> Result<(), (Ineligible, Option<NodeId>)> {
    let Node::Function {
        name,
        params,
        is_async,
        ..
    } = ast.node(function)
    else {
        return Err((Ineligible::ComplexParameters, None));
    };
    if *is_async {
        return Err((Ineligible::Async, None));
    }
    if !has_constant_bindings(scopes, function) {
        return Err((Ineligible::MutatedBinding, first_violation(scopes, function)));
    }
    if !parameters_inlineable(ast, params) {
        return Err((Ineligible::ComplexParameters, None));
    }
    if uses_own_this(ast, function) {
        return Err((Ineligible::UsesThis, None));
    }
    let reassignment = name
        .and_then(|name| scopes.resolve(name))
        .and_then(|binding| scopes.binding(binding).violations.first().copied());
    if let Some(site) = reassignment {
        return Err((Ineligible::Reassigned, Some(site)));
    }
    Ok(())
}

fn free_names(ast: &Ast, scopes: &ScopeTree, function: NodeId) -> Vec<FreeName> {
    let mut out: Vec<FreeName> = Vec::new();
    for site in scopes.free_references(ast, function) {
        let Some(name) = ast.ident_name(site) else {
            continue;
        };
        let declaration = scopes
            .resolve(site)
            .map(|binding| scopes.binding(binding).declaration);
        match out.iter_mut().find(|free| free.name == name) {
            Some(free) => free.sites.push(site),
            None => out.push(FreeName {
                name: name.to_string(),
                declaration,
                sites: vec![site],
            }),
        }
    }
    out
}

/// Indices of candidates that can reach themselves through the names their bodies read.
fn recursive_candidates(candidates: &[Candidate]) -> Vec<usize> {
    let by_name_ident: FxHashMap<NodeId, usize> = candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| (candidate.name_ident, index))
        .collect();
    let edges: Vec<Vec<usize>> = candidates
        .iter()
        .map(|candidate| {
            candidate
                .free
                .iter()
                .filter_map(|free| free.declaration.and_then(|d| by_name_ident.get(&d).copied()))
                .collect()
        })
        .collect();

    (0..candidates.len())
        .filter(|&start| {
            let mut seen = vec![false; candidates.len()];
            let mut stack = edges[start].clone();
            while let Some(next) = stack.pop() {
                if next == start {
                    return true;
                }
                if !std::mem::replace(&mut seen[next], true) {
                    stack.extend(&edges[next]);
                }
            }
            false
        })
        .collect()
}

impl Transformer<'_> {
    pub(crate) fn mark_inline_functions(&mut self) -> Result<(), TransformError> {
        let pattern = annotation_pattern(&self.options.annotation)?;
        let scopes = self.scopes();
        let ast = &*self.ast;

        let mut candidates = Vec::new();
        for id in ast.descendants(ast.root()) {
            let Node::Function {
                kind: FunctionKind::Declaration,
                name: Some(name_ident),
                ..
            } = ast.node(id)
            else {
                continue;
            };
            if !has_annotation(ast, id, &pattern) {
                continue;
            }
            let name = ast.ident_name(*name_ident).unwrap_or_default().to_string();
            match check(ast, &scopes, id) {
                Ok(()) => candidates.push(Candidate {
                    function: id,
                    name_ident: *name_ident,
                    name,
                    free: free_names(ast, &scopes, id),
                }),
                Err((reason, site)) => {
                    let mut diagnostic = ineligible(ast, *name_ident, &name, reason);
                    if let Some(site) = site {
                        let written = ast.ident_name(site).unwrap_or(&name);
                        diagnostic = diagnostic
                            .with_label(format!("`{written}` is assigned here"), ast.span(site));
                    }
                    self.diagnostics.push(diagnostic);
                }
            }
        }

        let recursive = recursive_candidates(&candidates);
        let functions: Vec<NodeId> = candidates.iter().map(|c| c.function).collect();
        // Declarations nested in another template stay ordinary functions of that template.
        let nested: Vec<bool> = functions
            .iter()
            .map(|function| {
                self.ast
                    .ancestors(*function)
                    .any(|ancestor| functions.contains(&ancestor))
            })
            .collect();
        for (index, candidate) in candidates.into_iter().enumerate() {
            if nested[index] {
                continue;
            }
            if recursive.contains(&index) {
                let diagnostic = ineligible(
                    self.ast,
                    candidate.name_ident,
                    &candidate.name,
                    Ineligible::Recursive,
                );
                self.diagnostics.push(diagnostic);
                continue;
            }
            self.register(candidate)?;
        }
        self.invalidate();
        Ok(())
    }

    /// Moves the declaration's parameters and body into a detached arrow template and drops the
    /// declaration.
    fn register(&mut self, candidate: Candidate) -> Result<(), TransformError> {
        let Node::Function { params, body, .. } = self.ast.node(candidate.function).clone() else {
            return Ok(());
        };
        let scope_node = enclosing_scope_node(self.ast, candidate.function);
        self.ast.remove(candidate.function)?;
        let template = self.ast.alloc(
            Node::Function {
                kind: FunctionKind::Arrow,
                name: None,
                params,
                body,
                is_async: false,
            },
            self.ast.span(candidate.function),
        );
        let names: Vec<String> = self
            .ast
            .descendants(template)
            .into_iter()
            .filter_map(|id| self.ast.ident_name(id).map(str::to_string))
            .collect();
        self.uids.reserve(names);
        self.table.insert(InlineEntry {
            name: candidate.name,
            scope_node,
            template,
            free: candidate.free,
        });
        self.stats.functions_inlined += 1;
        Ok(())
    }
}

fn ineligible(ast: &Ast, name_ident: NodeId, name: &str, reason: Ineligible) -> Diagnostic {
    Diagnostic::warning(
        reason.code(),
        format!("cannot inline function `{name}` because {}", reason.reason()),
        ast.span(name_ident),
    )
}
