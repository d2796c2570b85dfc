//! Arena program tree.
//!
//! Nodes live in a single `Vec` and are addressed by [`NodeId`]. Identity is stable across
//! edits: replacing a node relinks the replacement into the parent's slot and detaches the
//! old node, which stays in the arena (unreachable) so stale ids never alias new content.

use crate::diagnostics::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Var,
    Let,
    Const,
}

impl DeclKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DeclKind::Var => "var",
            DeclKind::Let => "let",
            DeclKind::Const => "const",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Declaration,
    Expression,
    Arrow,
    Method,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Minus,
    Plus,
    BitNot,
    Typeof,
    Void,
    Delete,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Minus => "-",
            UnaryOp::Plus => "+",
            UnaryOp::BitNot => "~",
            UnaryOp::Typeof => "typeof",
            UnaryOp::Void => "void",
            UnaryOp::Delete => "delete",
        }
    }

    pub fn is_keyword(self) -> bool {
        matches!(self, UnaryOp::Typeof | UnaryOp::Void | UnaryOp::Delete)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

impl UpdateOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateOp::Increment => "++",
            UpdateOp::Decrement => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Exp,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    InstanceOf,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Exp => "**",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNotEq => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::In => "in",
            BinaryOp::InstanceOf => "instanceof",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
        }
    }

    pub fn from_token(text: &str) -> Option<Self> {
        Some(match text {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Rem,
            "**" => BinaryOp::Exp,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::NotEq,
            "===" => BinaryOp::StrictEq,
            "!==" => BinaryOp::StrictNotEq,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::LtEq,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::GtEq,
            "in" => BinaryOp::In,
            "instanceof" => BinaryOp::InstanceOf,
            "&" => BinaryOp::BitAnd,
            "|" => BinaryOp::BitOr,
            "^" => BinaryOp::BitXor,
            "<<" => BinaryOp::Shl,
            ">>" => BinaryOp::Shr,
            ">>>" => BinaryOp::UShr,
            _ => return None,
        })
    }

    /// Binding power; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::BitOr => 6,
            BinaryOp::BitXor => 7,
            BinaryOp::BitAnd => 8,
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::StrictEq | BinaryOp::StrictNotEq => 9,
            BinaryOp::Lt
            | BinaryOp::LtEq
            | BinaryOp::Gt
            | BinaryOp::GtEq
            | BinaryOp::In
            | BinaryOp::InstanceOf => 10,
            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => 11,
            BinaryOp::Add | BinaryOp::Sub => 12,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 13,
            BinaryOp::Exp => 14,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

impl LogicalOp {
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
            LogicalOp::Nullish => "??",
        }
    }

    pub fn from_token(text: &str) -> Option<Self> {
        match text {
            "&&" => Some(LogicalOp::And),
            "||" => Some(LogicalOp::Or),
            "??" => Some(LogicalOp::Nullish),
            _ => None,
        }
    }

    pub fn precedence(self) -> u8 {
        match self {
            LogicalOp::Or | LogicalOp::Nullish => 4,
            LogicalOp::And => 5,
        }
    }
}

/// Assignment operator; `None` in [`Node::Assign`] is plain `=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

impl AssignOp {
    pub fn from_token(text: &str) -> Option<Option<Self>> {
        if text == "=" {
            return Some(None);
        }
        let base = text.strip_suffix('=')?;
        if let Some(op) = LogicalOp::from_token(base) {
            return Some(Some(AssignOp::Logical(op)));
        }
        match BinaryOp::from_token(base)? {
            BinaryOp::Eq | BinaryOp::Lt | BinaryOp::Gt | BinaryOp::In | BinaryOp::InstanceOf => None,
            op => Some(Some(AssignOp::Binary(op))),
        }
    }

    pub fn as_str(self) -> String {
        match self {
            AssignOp::Binary(op) => format!("{}=", op.as_str()),
            AssignOp::Logical(op) => format!("{}=", op.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Program {
        body: Vec<NodeId>,
    },

    // statements
    ExprStmt {
        expr: NodeId,
    },
    VarDecl {
        kind: DeclKind,
        declarators: Vec<NodeId>,
    },
    Declarator {
        target: NodeId,
        init: Option<NodeId>,
    },
    Return {
        arg: Option<NodeId>,
    },
    If {
        test: NodeId,
        consequent: NodeId,
        alternate: Option<NodeId>,
    },
    Block {
        body: Vec<NodeId>,
    },
    While {
        test: NodeId,
        body: NodeId,
    },
    For {
        init: Option<NodeId>,
        test: Option<NodeId>,
        update: Option<NodeId>,
        body: NodeId,
    },
    Labeled {
        label: NodeId,
        body: NodeId,
    },
    Break {
        label: Option<NodeId>,
    },
    Continue {
        label: Option<NodeId>,
    },
    Throw {
        arg: NodeId,
    },
    Try {
        block: NodeId,
        handler: Option<NodeId>,
        finalizer: Option<NodeId>,
    },
    Catch {
        param: Option<NodeId>,
        body: NodeId,
    },
    Class {
        name: Option<NodeId>,
        super_class: Option<NodeId>,
        members: Vec<NodeId>,
        is_declaration: bool,
    },
    ClassMethod {
        key: NodeId,
        computed: bool,
        is_static: bool,
        function: NodeId,
    },
    ClassProperty {
        key: NodeId,
        computed: bool,
        is_static: bool,
        value: Option<NodeId>,
    },
    Empty,

    // expressions
    Function {
        kind: FunctionKind,
        name: Option<NodeId>,
        params: Vec<NodeId>,
        /// A block, or an expression for arrow functions with expression bodies.
        body: NodeId,
        is_async: bool,
    },
    Ident {
        name: String,
    },
    Number {
        raw: String,
    },
    Str {
        value: String,
        quote: char,
    },
    Bool {
        value: bool,
    },
    Null,
    This,
    Array {
        elements: Vec<NodeId>,
    },
    Object {
        properties: Vec<NodeId>,
    },
    /// Object literal entry or object pattern entry. Methods carry a function value.
    Property {
        key: NodeId,
        value: NodeId,
        computed: bool,
        shorthand: bool,
        method: bool,
    },
    Spread {
        arg: NodeId,
    },
    Call {
        callee: NodeId,
        args: Vec<NodeId>,
    },
    New {
        callee: NodeId,
        args: Vec<NodeId>,
    },
    Member {
        object: NodeId,
        property: NodeId,
        computed: bool,
    },
    Unary {
        op: UnaryOp,
        arg: NodeId,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        arg: NodeId,
    },
    Binary {
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    },
    Logical {
        op: LogicalOp,
        left: NodeId,
        right: NodeId,
    },
    Conditional {
        test: NodeId,
        consequent: NodeId,
        alternate: NodeId,
    },
    Assign {
        op: Option<AssignOp>,
        target: NodeId,
        value: NodeId,
    },
    Sequence {
        exprs: Vec<NodeId>,
    },
    Await {
        arg: NodeId,
    },

    // binding patterns
    ObjectPattern {
        properties: Vec<NodeId>,
    },
    ArrayPattern {
        elements: Vec<NodeId>,
    },
    AssignPattern {
        target: NodeId,
        default: NodeId,
    },
    Rest {
        arg: NodeId,
    },
}

impl Node {
    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            Node::ExprStmt { .. }
                | Node::VarDecl { .. }
                | Node::Return { .. }
                | Node::If { .. }
                | Node::Block { .. }
                | Node::While { .. }
                | Node::For { .. }
                | Node::Labeled { .. }
                | Node::Break { .. }
                | Node::Continue { .. }
                | Node::Throw { .. }
                | Node::Try { .. }
                | Node::Empty
                | Node::Function {
                    kind: FunctionKind::Declaration,
                    ..
                }
                | Node::Class {
                    is_declaration: true,
                    ..
                }
        )
    }

    pub fn is_statement_list(&self) -> bool {
        matches!(self, Node::Program { .. } | Node::Block { .. })
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Node::Function { .. })
    }

    pub fn is_arrow(&self) -> bool {
        matches!(
            self,
            Node::Function {
                kind: FunctionKind::Arrow,
                ..
            }
        )
    }

    pub fn ident_name(&self) -> Option<&str> {
        match self {
            Node::Ident { name } => Some(name),
            _ => None,
        }
    }

    /// Direct children in evaluation order.
    pub fn children(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        match self {
            Node::Program { body } | Node::Block { body } => out.extend(body),
            Node::ExprStmt { expr } => out.push(*expr),
            Node::VarDecl { declarators, .. } => out.extend(declarators),
            Node::Declarator { target, init } => {
                out.push(*target);
                out.extend(init);
            }
            Node::Return { arg } => out.extend(arg),
            Node::If {
                test,
                consequent,
                alternate,
            } => {
                out.push(*test);
                out.push(*consequent);
                out.extend(alternate);
            }
            Node::While { test, body } => {
                out.push(*test);
                out.push(*body);
            }
            Node::For {
                init,
                test,
                update,
                body,
            } => {
                out.extend(init);
                out.extend(test);
                out.push(*body);
                out.extend(update);
            }
            Node::Labeled { label, body } => {
                out.push(*label);
                out.push(*body);
            }
            Node::Break { label } | Node::Continue { label } => out.extend(label),
            Node::Throw { arg }
            | Node::Spread { arg }
            | Node::Await { arg }
            | Node::Unary { arg, .. }
            | Node::Update { arg, .. }
            | Node::Rest { arg } => out.push(*arg),
            Node::Try {
                block,
                handler,
                finalizer,
            } => {
                out.push(*block);
                out.extend(handler);
                out.extend(finalizer);
            }
            Node::Catch { param, body } => {
                out.extend(param);
                out.push(*body);
            }
            Node::Class {
                name,
                super_class,
                members,
                ..
            } => {
                out.extend(name);
                out.extend(super_class);
                out.extend(members);
            }
            Node::ClassMethod { key, function, .. } => {
                out.push(*key);
                out.push(*function);
            }
            Node::ClassProperty { key, value, .. } => {
                out.push(*key);
                out.extend(value);
            }
            Node::Function {
                name, params, body, ..
            } => {
                out.extend(name);
                out.extend(params);
                out.push(*body);
            }
            Node::Array { elements } | Node::ArrayPattern { elements } => out.extend(elements),
            Node::Object { properties } | Node::ObjectPattern { properties } => {
                out.extend(properties)
            }
            Node::Property { key, value, .. } => {
                out.push(*key);
                out.push(*value);
            }
            Node::Call { callee, args } | Node::New { callee, args } => {
                out.push(*callee);
                out.extend(args);
            }
            Node::Member {
                object, property, ..
            } => {
                out.push(*object);
                out.push(*property);
            }
            Node::Binary { left, right, .. } | Node::Logical { left, right, .. } => {
                out.push(*left);
                out.push(*right);
            }
            Node::Conditional {
                test,
                consequent,
                alternate,
            } => {
                out.push(*test);
                out.push(*consequent);
                out.push(*alternate);
            }
            Node::Assign { target, value, .. } => {
                out.push(*target);
                out.push(*value);
            }
            Node::AssignPattern { target, default } => {
                out.push(*target);
                out.push(*default);
            }
            Node::Sequence { exprs } => out.extend(exprs),
            Node::Empty
            | Node::Ident { .. }
            | Node::Number { .. }
            | Node::Str { .. }
            | Node::Bool { .. }
            | Node::Null
            | Node::This => {}
        }
        out
    }

    fn child_slots_mut(&mut self) -> Vec<Slot<'_>> {
        let mut out = Vec::new();
        match self {
            Node::Program { body } | Node::Block { body } => out.push(Slot::List(body)),
            Node::VarDecl { declarators, .. } => out.push(Slot::List(declarators)),
            Node::Array { elements } | Node::ArrayPattern { elements } => {
                out.push(Slot::List(elements))
            }
            Node::Object { properties } | Node::ObjectPattern { properties } => {
                out.push(Slot::List(properties))
            }
            Node::Sequence { exprs } => out.push(Slot::List(exprs)),
            Node::Class {
                name,
                super_class,
                members,
                ..
            } => {
                out.push(Slot::Optional(name));
                out.push(Slot::Optional(super_class));
                out.push(Slot::List(members));
            }
            Node::Function {
                name, params, body, ..
            } => {
                out.push(Slot::Optional(name));
                out.push(Slot::List(params));
                out.push(Slot::Required(body));
            }
            Node::Call { callee, args } | Node::New { callee, args } => {
                out.push(Slot::Required(callee));
                out.push(Slot::List(args));
            }
            Node::ExprStmt { expr } => out.push(Slot::Required(expr)),
            Node::Declarator { target, init } => {
                out.push(Slot::Required(target));
                out.push(Slot::Optional(init));
            }
            Node::Return { arg } => out.push(Slot::Optional(arg)),
            Node::If {
                test,
                consequent,
                alternate,
            } => {
                out.push(Slot::Required(test));
                out.push(Slot::Required(consequent));
                out.push(Slot::Optional(alternate));
            }
            Node::While { test, body } => {
                out.push(Slot::Required(test));
                out.push(Slot::Required(body));
            }
            Node::For {
                init,
                test,
                update,
                body,
            } => {
                out.push(Slot::Optional(init));
                out.push(Slot::Optional(test));
                out.push(Slot::Optional(update));
                out.push(Slot::Required(body));
            }
            Node::Labeled { label, body } => {
                out.push(Slot::Required(label));
                out.push(Slot::Required(body));
            }
            Node::Break { label } | Node::Continue { label } => out.push(Slot::Optional(label)),
            Node::Throw { arg }
            | Node::Spread { arg }
            | Node::Await { arg }
            | Node::Unary { arg, .. }
            | Node::Update { arg, .. }
            | Node::Rest { arg } => out.push(Slot::Required(arg)),
            Node::Try {
                block,
                handler,
                finalizer,
            } => {
                out.push(Slot::Required(block));
                out.push(Slot::Optional(handler));
                out.push(Slot::Optional(finalizer));
            }
            Node::Catch { param, body } => {
                out.push(Slot::Optional(param));
                out.push(Slot::Required(body));
            }
            Node::ClassMethod { key, function, .. } => {
                out.push(Slot::Required(key));
                out.push(Slot::Required(function));
            }
            Node::ClassProperty { key, value, .. } => {
                out.push(Slot::Required(key));
                out.push(Slot::Optional(value));
            }
            Node::Property { key, value, .. } => {
                out.push(Slot::Required(key));
                out.push(Slot::Required(value));
            }
            Node::Member {
                object, property, ..
            } => {
                out.push(Slot::Required(object));
                out.push(Slot::Required(property));
            }
            Node::Binary { left, right, .. } | Node::Logical { left, right, .. } => {
                out.push(Slot::Required(left));
                out.push(Slot::Required(right));
            }
            Node::Conditional {
                test,
                consequent,
                alternate,
            } => {
                out.push(Slot::Required(test));
                out.push(Slot::Required(consequent));
                out.push(Slot::Required(alternate));
            }
            Node::Assign { target, value, .. } => {
                out.push(Slot::Required(target));
                out.push(Slot::Required(value));
            }
            Node::AssignPattern { target, default } => {
                out.push(Slot::Required(target));
                out.push(Slot::Required(default));
            }
            Node::Empty
            | Node::Ident { .. }
            | Node::Number { .. }
            | Node::Str { .. }
            | Node::Bool { .. }
            | Node::Null
            | Node::This => {}
        }
        out
    }
}

enum Slot<'a> {
    Required(&'a mut NodeId),
    Optional(&'a mut Option<NodeId>),
    List(&'a mut Vec<NodeId>),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EditError {
    #[error("node {0:?} is not attached to a parent")]
    Detached(NodeId),
    #[error("node {0:?} does not sit in a list slot of its parent")]
    NotInList(NodeId),
}

#[derive(Debug, Clone)]
struct NodeData {
    node: Node,
    parent: Option<NodeId>,
    span: Span,
    comments: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Ast {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}

impl Ast {
    /// Creates a tree holding an empty program.
    pub fn new() -> Self {
        let mut ast = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        ast.root = ast.alloc(Node::Program { body: Vec::new() }, Span::default());
        ast
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Allocates a node and adopts its children.
    pub fn alloc(&mut self, node: Node, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        for child in node.children() {
            self.detach(child);
            self.nodes[child.index()].parent = Some(id);
        }
        self.nodes.push(NodeData {
            node,
            parent: None,
            span,
            comments: Vec::new(),
        });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()].node
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    pub fn comments(&self, id: NodeId) -> &[String] {
        &self.nodes[id.index()].comments
    }

    pub fn set_comments(&mut self, id: NodeId, comments: Vec<String>) {
        self.nodes[id.index()].comments = comments;
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).children()
    }

    pub fn ident_name(&self, id: NodeId) -> Option<&str> {
        self.node(id).ident_name()
    }

    /// Renames an identifier node in place. Other node kinds are left alone.
    pub fn set_ident_name(&mut self, id: NodeId, new_name: &str) {
        if let Node::Ident { name } = &mut self.nodes[id.index()].node {
            *name = new_name.to_string();
        }
    }

    /// Whether `id` is reachable from the program root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }

    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        ancestor == id || self.ancestors(id).any(|a| a == ancestor)
    }

    /// All nodes of the subtree rooted at `id`, in pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            let children = self.children(current);
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Puts `replacement` into the slot holding `target`. `target` becomes detached.
    pub fn replace(&mut self, target: NodeId, replacement: NodeId) -> Result<(), EditError> {
        let parent = self.parent(target).ok_or(EditError::Detached(target))?;
        self.detach(replacement);
        for slot in self.nodes[parent.index()].node.child_slots_mut() {
            match slot {
                Slot::Required(id) if *id == target => *id = replacement,
                Slot::Optional(Some(id)) if *id == target => *id = replacement,
                Slot::List(list) => {
                    for id in list.iter_mut().filter(|id| **id == target) {
                        *id = replacement;
                    }
                }
                _ => continue,
            }
        }
        self.nodes[target.index()].parent = None;
        self.nodes[replacement.index()].parent = Some(parent);
        Ok(())
    }

    /// Takes `id` out of its parent. List and optional slots shrink; a required slot receives
    /// an empty statement instead.
    pub fn remove(&mut self, id: NodeId) -> Result<(), EditError> {
        let parent = self.parent(id).ok_or(EditError::Detached(id))?;
        let mut needs_filler = false;
        for slot in self.nodes[parent.index()].node.child_slots_mut() {
            match slot {
                Slot::List(list) => list.retain(|child| *child != id),
                Slot::Optional(opt) if *opt == Some(id) => *opt = None,
                Slot::Required(child) if *child == id => needs_filler = true,
                _ => {}
            }
        }
        if needs_filler {
            let filler = self.alloc(Node::Empty, Span::default());
            return self.replace(id, filler);
        }
        self.nodes[id.index()].parent = None;
        Ok(())
    }

    /// Cuts `id` loose from its parent without touching the parent's slots. Used right before
    /// relinking a node somewhere else.
    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        for slot in self.nodes[parent.index()].node.child_slots_mut() {
            match slot {
                Slot::List(list) => list.retain(|child| *child != id),
                Slot::Optional(opt) if *opt == Some(id) => *opt = None,
                _ => {}
            }
        }
        self.nodes[id.index()].parent = None;
    }

    /// Appends a statement to the program body.
    pub fn append_to_program(&mut self, stmt: NodeId) {
        self.detach(stmt);
        let root = self.root;
        if let Node::Program { body } = &mut self.nodes[root.index()].node {
            body.push(stmt);
        }
        self.nodes[stmt.index()].parent = Some(root);
    }

    /// Inserts `nodes` right before `anchor` in its parent's list slot.
    pub fn insert_before(&mut self, anchor: NodeId, nodes: &[NodeId]) -> Result<(), EditError> {
        let parent = self.parent(anchor).ok_or(EditError::Detached(anchor))?;
        for &id in nodes {
            self.detach(id);
        }
        let mut inserted = false;
        for slot in self.nodes[parent.index()].node.child_slots_mut() {
            if let Slot::List(list) = slot {
                if let Some(index) = list.iter().position(|child| *child == anchor) {
                    list.splice(index..index, nodes.iter().copied());
                    inserted = true;
                    break;
                }
            }
        }
        if !inserted {
            return Err(EditError::NotInList(anchor));
        }
        for &id in nodes {
            self.nodes[id.index()].parent = Some(parent);
        }
        Ok(())
    }

    /// Detaches `id` from wherever it sits so it can be moved.
    pub fn take(&mut self, id: NodeId) -> NodeId {
        self.detach(id);
        id
    }

    /// Copies the subtree at `id` with fresh ids. The copy is detached.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let data = self.nodes[id.index()].clone();
        let mut node = data.node;
        for slot in node.child_slots_mut() {
            match slot {
                Slot::Required(child) => *child = self.deep_clone(*child),
                Slot::Optional(Some(child)) => *child = self.deep_clone(*child),
                Slot::Optional(None) => {}
                Slot::List(list) => {
                    for child in list.iter_mut() {
                        *child = self.deep_clone(*child);
                    }
                }
            }
        }
        let copy = self.alloc(node, data.span);
        self.nodes[copy.index()].comments = data.comments;
        copy
    }

    // -- builders for synthesized nodes --------------------------------------------------------

    pub fn ident(&mut self, name: &str) -> NodeId {
        self.alloc(
            Node::Ident {
                name: name.to_string(),
            },
            Span::default(),
        )
    }

    /// `void 0`, the unshadowable spelling of `undefined`.
    pub fn void_zero(&mut self) -> NodeId {
        let zero = self.alloc(
            Node::Number {
                raw: "0".to_string(),
            },
            Span::default(),
        );
        self.alloc(
            Node::Unary {
                op: UnaryOp::Void,
                arg: zero,
            },
            Span::default(),
        )
    }

    pub fn block(&mut self, body: Vec<NodeId>) -> NodeId {
        for &id in &body {
            self.detach(id);
        }
        self.alloc(Node::Block { body }, Span::default())
    }

    pub fn const_decl(&mut self, declarators: Vec<(NodeId, NodeId)>) -> NodeId {
        let declarators = declarators
            .into_iter()
            .map(|(target, init)| {
                self.detach(target);
                self.detach(init);
                self.alloc(
                    Node::Declarator {
                        target,
                        init: Some(init),
                    },
                    Span::default(),
                )
            })
            .collect();
        self.alloc(
            Node::VarDecl {
                kind: DeclKind::Const,
                declarators,
            },
            Span::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(ast: &mut Ast, raw: &str) -> NodeId {
        ast.alloc(
            Node::Number {
                raw: raw.to_string(),
            },
            Span::default(),
        )
    }

    fn binary(ast: &mut Ast, left: NodeId, right: NodeId) -> NodeId {
        ast.alloc(
            Node::Binary {
                op: BinaryOp::Add,
                left,
                right,
            },
            Span::default(),
        )
    }

    #[test]
    fn alloc_sets_parent_links() {
        let mut ast = Ast::new();
        let a = num(&mut ast, "1");
        let b = num(&mut ast, "2");
        let sum = binary(&mut ast, a, b);
        assert_eq!(ast.parent(a), Some(sum));
        assert_eq!(ast.parent(b), Some(sum));
        assert_eq!(ast.children(sum), vec![a, b]);
    }

    #[test]
    fn replace_detaches_target() {
        let mut ast = Ast::new();
        let a = num(&mut ast, "1");
        let b = num(&mut ast, "2");
        let sum = binary(&mut ast, a, b);
        let c = num(&mut ast, "3");
        ast.replace(a, c).expect("replace");
        assert_eq!(ast.children(sum), vec![c, b]);
        assert_eq!(ast.parent(a), None);
        assert_eq!(ast.parent(c), Some(sum));
    }

    #[test]
    fn replace_moves_node_out_of_previous_slot() {
        let mut ast = Ast::new();
        let a = num(&mut ast, "1");
        let b = num(&mut ast, "2");
        let array = ast.alloc(Node::Array { elements: vec![a, b] }, Span::default());
        let stmt = ast.alloc(Node::ExprStmt { expr: array }, Span::default());
        ast.replace(array, b).expect("replace");
        assert_eq!(ast.node(stmt), &Node::ExprStmt { expr: b });
        assert_eq!(ast.node(array), &Node::Array { elements: vec![a] });
        assert_eq!(ast.parent(array), None);
    }

    #[test]
    fn remove_from_list_and_required_slot() {
        let mut ast = Ast::new();
        let a = num(&mut ast, "1");
        let stmt = ast.alloc(Node::ExprStmt { expr: a }, Span::default());
        let block = ast.alloc(Node::Block { body: vec![stmt] }, Span::default());
        let if_stmt = {
            let test = num(&mut ast, "0");
            ast.alloc(
                Node::If {
                    test,
                    consequent: block,
                    alternate: None,
                },
                Span::default(),
            )
        };
        ast.remove(stmt).expect("remove");
        assert_eq!(ast.node(block), &Node::Block { body: vec![] });
        ast.remove(block).expect("remove");
        let Node::If { consequent, .. } = ast.node(if_stmt) else {
            panic!("expected if");
        };
        assert_eq!(ast.node(*consequent), &Node::Empty);
    }

    #[test]
    fn insert_before_requires_list_parent() {
        let mut ast = Ast::new();
        let a = num(&mut ast, "1");
        let first = ast.alloc(Node::ExprStmt { expr: a }, Span::default());
        let block = ast.alloc(Node::Block { body: vec![first] }, Span::default());
        let b = num(&mut ast, "2");
        let second = ast.alloc(Node::ExprStmt { expr: b }, Span::default());
        ast.insert_before(first, &[second]).expect("insert");
        assert_eq!(ast.children(block), vec![second, first]);
        assert_eq!(ast.parent(second), Some(block));
        let c = num(&mut ast, "3");
        assert_eq!(ast.insert_before(a, &[c]), Err(EditError::NotInList(a)));
    }

    #[test]
    fn deep_clone_produces_independent_copy() {
        let mut ast = Ast::new();
        let a = num(&mut ast, "1");
        let b = num(&mut ast, "2");
        let sum = binary(&mut ast, a, b);
        let copy = ast.deep_clone(sum);
        assert_ne!(copy, sum);
        let copied_children = ast.children(copy);
        assert!(copied_children.iter().all(|c| ![a, b].contains(c)));
        assert_eq!(ast.parent(copy), None);
        assert_eq!(ast.node(copied_children[0]), ast.node(a));
    }
}
