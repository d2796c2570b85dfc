use crate::ast::{Ast, Node, NodeId};

/// What an identifier node denotes at its position in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentRole {
    /// A read of whatever binding the name resolves to.
    Reference,
    /// Target of an assignment or update.
    WriteTarget,
    /// Declared by a `var`/`let`/`const` pattern or a parameter list.
    Declaration,
    CatchParam,
    FunctionName,
    ClassName,
    /// `b` in `a.b`.
    MemberProperty,
    /// Non-computed key of an object literal or object pattern entry.
    PropertyKey,
    ClassMemberKey,
    /// `l` in `l: for (...)`.
    Label,
    /// `l` in `break l` or `continue l`.
    JumpLabel,
}

impl IdentRole {
    pub fn is_binding(self) -> bool {
        matches!(
            self,
            IdentRole::Declaration
                | IdentRole::CatchParam
                | IdentRole::FunctionName
                | IdentRole::ClassName
        )
    }

    /// Whether the identifier takes part in lexical resolution at all.
    pub fn is_lexical(self) -> bool {
        self.is_binding() || matches!(self, IdentRole::Reference | IdentRole::WriteTarget)
    }
}

/// Classifies identifier `id` by inspecting its ancestors.
pub fn ident_role(ast: &Ast, id: NodeId) -> IdentRole {
    let Some(parent) = ast.parent(id) else {
        return IdentRole::Reference;
    };
    match ast.node(parent) {
        Node::Member {
            property,
            computed: false,
            ..
        } if *property == id => IdentRole::MemberProperty,
        Node::Property {
            key,
            computed: false,
            ..
        } if *key == id => IdentRole::PropertyKey,
        Node::ClassMethod {
            key,
            computed: false,
            ..
        }
        | Node::ClassProperty {
            key,
            computed: false,
            ..
        } if *key == id => IdentRole::ClassMemberKey,
        Node::Labeled { label, .. } if *label == id => IdentRole::Label,
        Node::Break { .. } | Node::Continue { .. } => IdentRole::JumpLabel,
        Node::Function { name: Some(name), .. } if *name == id => IdentRole::FunctionName,
        Node::Class { name: Some(name), .. } if *name == id => IdentRole::ClassName,
        Node::Update { .. } => IdentRole::WriteTarget,
        _ => pattern_role(ast, id),
    }
}

/// Role of an identifier that may sit inside a binding pattern: climbs through pattern nodes
/// until the construct owning the pattern is found.
fn pattern_role(ast: &Ast, id: NodeId) -> IdentRole {
    let mut child = id;
    while let Some(parent) = ast.parent(child) {
        match ast.node(parent) {
            Node::ObjectPattern { .. } | Node::ArrayPattern { .. } | Node::Rest { .. } => {}
            Node::AssignPattern { target, .. } if *target == child => {}
            Node::Property { value, .. }
                if *value == child
                    && ast
                        .parent(parent)
                        .is_some_and(|p| matches!(ast.node(p), Node::ObjectPattern { .. })) => {}
            Node::Declarator { target, .. } if *target == child => return IdentRole::Declaration,
            Node::Function { params, .. } if params.contains(&child) => {
                return IdentRole::Declaration
            }
            Node::Catch {
                param: Some(param), ..
            } if *param == child => return IdentRole::CatchParam,
            Node::Assign { target, .. } if *target == child => return IdentRole::WriteTarget,
            _ => return IdentRole::Reference,
        }
        child = parent;
    }
    IdentRole::Reference
}

/// Whether a value may be substituted for identifier `id`: only plain reads qualify.
pub fn can_inline_identifier(ast: &Ast, id: NodeId) -> bool {
    matches!(ast.node(id), Node::Ident { .. }) && ident_role(ast, id) == IdentRole::Reference
}
