//! Serializes the tree back to source text.
//!
//! Parentheses are derived from operator precedence rather than remembered from the input, so
//! rewritten trees print correctly without any bookkeeping in the passes. Comments are not
//! printed.

use std::fmt::Write as _;

use crate::ast::{Ast, BinaryOp, FunctionKind, LogicalOp, Node, NodeId, UnaryOp};

const INDENT: &str = "  ";

const PREC_SEQUENCE: u8 = 1;
const PREC_ASSIGN: u8 = 2;
const PREC_CONDITIONAL: u8 = 3;
const PREC_UNARY: u8 = 15;
const PREC_POSTFIX: u8 = 16;
const PREC_CALL: u8 = 18;
const PREC_PRIMARY: u8 = 20;

/// Prints the whole program, one top-level statement per line, without a trailing newline.
pub fn print_program(ast: &Ast) -> String {
    let mut printer = Printer::new(ast);
    for stmt in ast.children(ast.root()) {
        printer.statement_line(stmt);
    }
    printer.out.trim_end().to_string()
}

/// Prints one statement or expression.
pub fn print_node(ast: &Ast, id: NodeId) -> String {
    let mut printer = Printer::new(ast);
    if ast.node(id).is_statement() {
        printer.statement(id);
    } else {
        printer.expr(id, 0);
    }
    printer.out
}

struct Printer<'a> {
    ast: &'a Ast,
    out: String,
    indent: usize,
}

impl<'a> Printer<'a> {
    fn new(ast: &'a Ast) -> Self {
        Self {
            ast,
            out: String::new(),
            indent: 0,
        }
    }

    fn push(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
    }

    fn statement_line(&mut self, id: NodeId) {
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
        self.statement(id);
        self.out.push('\n');
    }

    fn comma_list(&mut self, items: &[NodeId], mut each: impl FnMut(&mut Self, NodeId)) {
        for (index, item) in items.iter().enumerate() {
            if index > 0 {
                self.push(", ");
            }
            each(self, *item);
        }
    }

    // -- statements ------------------------------------------------------------------------

    fn statement(&mut self, id: NodeId) {
        match self.ast.node(id) {
            Node::ExprStmt { expr } => {
                let expr = *expr;
                if self.starts_with_reserved(expr, 0, true) {
                    self.push("(");
                    self.expr(expr, 0);
                    self.push(")");
                } else {
                    self.expr(expr, 0);
                }
                self.push(";");
            }
            Node::VarDecl { .. } => {
                self.var_decl(id);
                self.push(";");
            }
            Node::Function { .. } => self.function(id),
            Node::Class { .. } => self.class(id),
            Node::Return { arg } => match arg {
                Some(arg) => {
                    self.push("return ");
                    self.expr(*arg, 0);
                    self.push(";");
                }
                None => self.push("return;"),
            },
            Node::If {
                test,
                consequent,
                alternate,
            } => {
                let (test, consequent, alternate) = (*test, *consequent, *alternate);
                self.push("if (");
                self.expr(test, 0);
                self.push(") ");
                self.statement(consequent);
                if let Some(alternate) = alternate {
                    if matches!(self.ast.node(consequent), Node::Block { .. }) {
                        self.push(" ");
                    } else {
                        self.newline();
                    }
                    self.push("else ");
                    self.statement(alternate);
                }
            }
            Node::Block { body } => {
                let body = body.clone();
                self.block_body(&body);
            }
            Node::While { test, body } => {
                let (test, body) = (*test, *body);
                self.push("while (");
                self.expr(test, 0);
                self.push(") ");
                self.statement(body);
            }
            Node::For {
                init,
                test,
                update,
                body,
            } => {
                let (init, test, update, body) = (*init, *test, *update, *body);
                self.push("for (");
                if let Some(init) = init {
                    if matches!(self.ast.node(init), Node::VarDecl { .. }) {
                        self.var_decl(init);
                    } else {
                        self.expr(init, 0);
                    }
                }
                self.push(";");
                if let Some(test) = test {
                    self.push(" ");
                    self.expr(test, 0);
                }
                self.push(";");
                if let Some(update) = update {
                    self.push(" ");
                    self.expr(update, 0);
                }
                self.push(") ");
                self.statement(body);
            }
            Node::Labeled { label, body } => {
                let (label, body) = (*label, *body);
                self.expr(label, 0);
                self.push(": ");
                self.statement(body);
            }
            Node::Break { label } | Node::Continue { label } => {
                let keyword = if matches!(self.ast.node(id), Node::Break { .. }) {
                    "break"
                } else {
                    "continue"
                };
                self.push(keyword);
                if let Some(label) = *label {
                    self.push(" ");
                    self.expr(label, 0);
                }
                self.push(";");
            }
            Node::Throw { arg } => {
                let arg = *arg;
                self.push("throw ");
                self.expr(arg, 0);
                self.push(";");
            }
            Node::Try {
                block,
                handler,
                finalizer,
            } => {
                let (block, handler, finalizer) = (*block, *handler, *finalizer);
                self.push("try ");
                self.statement(block);
                if let Some(handler) = handler {
                    if let Node::Catch { param, body } = self.ast.node(handler) {
                        let (param, body) = (*param, *body);
                        self.push(" catch ");
                        if let Some(param) = param {
                            self.push("(");
                            self.pattern(param);
                            self.push(") ");
                        }
                        self.statement(body);
                    }
                }
                if let Some(finalizer) = finalizer {
                    self.push(" finally ");
                    self.statement(finalizer);
                }
            }
            Node::Empty => self.push(";"),
            _ => {
                self.expr(id, 0);
                self.push(";");
            }
        }
    }

    fn block_body(&mut self, body: &[NodeId]) {
        if body.is_empty() {
            self.push("{}");
            return;
        }
        self.push("{\n");
        self.indent += 1;
        for stmt in body {
            self.statement_line(*stmt);
        }
        self.indent -= 1;
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
        self.push("}");
    }

    fn var_decl(&mut self, id: NodeId) {
        let Node::VarDecl { kind, declarators } = self.ast.node(id) else {
            return;
        };
        self.push(kind.as_str());
        self.push(" ");
        let declarators = declarators.clone();
        self.comma_list(&declarators, |p, decl| {
            if let Node::Declarator { target, init } = p.ast.node(decl) {
                let (target, init) = (*target, *init);
                p.pattern(target);
                if let Some(init) = init {
                    p.push(" = ");
                    p.expr(init, PREC_ASSIGN);
                }
            }
        });
    }

    fn function(&mut self, id: NodeId) {
        let Node::Function {
            kind,
            name,
            params,
            body,
            is_async,
        } = self.ast.node(id)
        else {
            return;
        };
        let (kind, name, body, is_async) = (*kind, *name, *body, *is_async);
        let params = params.clone();
        if is_async {
            self.push("async ");
        }
        if kind == FunctionKind::Arrow {
            let single_ident = params.len() == 1
                && matches!(self.ast.node(params[0]), Node::Ident { .. });
            if single_ident {
                self.pattern(params[0]);
            } else {
                self.params(&params);
            }
            self.push(" => ");
            if matches!(self.ast.node(body), Node::Block { .. }) {
                self.statement(body);
            } else if self.starts_with_reserved(body, PREC_ASSIGN, false) {
                self.push("(");
                self.expr(body, 0);
                self.push(")");
            } else {
                self.expr(body, PREC_ASSIGN);
            }
            return;
        }
        self.push("function ");
        if let Some(name) = name {
            self.expr(name, 0);
        }
        self.params(&params);
        self.push(" ");
        self.statement(body);
    }

    fn params(&mut self, params: &[NodeId]) {
        self.push("(");
        self.comma_list(params, |p, param| p.pattern(param));
        self.push(")");
    }

    /// Method syntax: `key(params) { body }`.
    fn method(&mut self, key: NodeId, computed: bool, function: NodeId) {
        self.property_key(key, computed);
        if let Node::Function { params, body, .. } = self.ast.node(function) {
            let (params, body) = (params.clone(), *body);
            self.params(&params);
            self.push(" ");
            self.statement(body);
        }
    }

    fn class(&mut self, id: NodeId) {
        let Node::Class {
            name,
            super_class,
            members,
            ..
        } = self.ast.node(id)
        else {
            return;
        };
        let (name, super_class, members) = (*name, *super_class, members.clone());
        self.push("class");
        if let Some(name) = name {
            self.push(" ");
            self.expr(name, 0);
        }
        if let Some(super_class) = super_class {
            self.push(" extends ");
            self.expr(super_class, PREC_CALL);
        }
        if members.is_empty() {
            self.push(" {}");
            return;
        }
        self.push(" {");
        self.indent += 1;
        for member in members {
            self.newline();
            match self.ast.node(member) {
                Node::ClassMethod {
                    key,
                    computed,
                    is_static,
                    function,
                } => {
                    let (key, computed, is_static, function) =
                        (*key, *computed, *is_static, *function);
                    if is_static {
                        self.push("static ");
                    }
                    self.method(key, computed, function);
                }
                Node::ClassProperty {
                    key,
                    computed,
                    is_static,
                    value,
                } => {
                    let (key, computed, is_static, value) = (*key, *computed, *is_static, *value);
                    if is_static {
                        self.push("static ");
                    }
                    self.property_key(key, computed);
                    if let Some(value) = value {
                        self.push(" = ");
                        self.expr(value, PREC_ASSIGN);
                    }
                    self.push(";");
                }
                _ => {}
            }
        }
        self.indent -= 1;
        self.newline();
        self.push("}");
    }

    // -- patterns --------------------------------------------------------------------------

    fn pattern(&mut self, id: NodeId) {
        match self.ast.node(id) {
            Node::ObjectPattern { properties } => {
                let properties = properties.clone();
                if properties.is_empty() {
                    self.push("{}");
                    return;
                }
                self.push("{ ");
                self.comma_list(&properties, |p, prop| p.pattern(prop));
                self.push(" }");
            }
            Node::ArrayPattern { elements } => {
                let elements = elements.clone();
                self.push("[");
                self.comma_list(&elements, |p, element| p.pattern(element));
                self.push("]");
            }
            Node::AssignPattern { target, default } => {
                let (target, default) = (*target, *default);
                self.pattern(target);
                self.push(" = ");
                self.expr(default, PREC_ASSIGN);
            }
            Node::Rest { arg } => {
                let arg = *arg;
                self.push("...");
                self.pattern(arg);
            }
            Node::Property {
                key,
                value,
                computed,
                ..
            } => {
                let (key, value, computed) = (*key, *value, *computed);
                if self.is_shorthand(key, value, computed) {
                    self.pattern(value);
                } else {
                    self.property_key(key, computed);
                    self.push(": ");
                    self.pattern(value);
                }
            }
            _ => self.expr(id, PREC_ASSIGN),
        }
    }

    /// Shorthand is only kept when the value still spells the key, possibly with a default.
    fn is_shorthand(&self, key: NodeId, value: NodeId, computed: bool) -> bool {
        if computed {
            return false;
        }
        let Some(key_name) = self.ast.ident_name(key) else {
            return false;
        };
        let value_target = match self.ast.node(value) {
            Node::AssignPattern { target, .. } => *target,
            _ => value,
        };
        self.ast.ident_name(value_target) == Some(key_name)
    }

    // -- expressions -----------------------------------------------------------------------

    fn precedence(&self, id: NodeId) -> u8 {
        match self.ast.node(id) {
            Node::Sequence { .. } => PREC_SEQUENCE,
            Node::Assign { .. } | Node::Spread { .. } => PREC_ASSIGN,
            Node::Function {
                kind: FunctionKind::Arrow,
                ..
            } => PREC_ASSIGN,
            Node::Conditional { .. } => PREC_CONDITIONAL,
            Node::Logical { op, .. } => op.precedence(),
            Node::Binary { op, .. } => op.precedence(),
            Node::Unary { .. } | Node::Await { .. } => PREC_UNARY,
            Node::Update { prefix: true, .. } => PREC_UNARY,
            Node::Update { prefix: false, .. } => PREC_POSTFIX,
            Node::Call { .. } | Node::Member { .. } | Node::New { .. } => PREC_CALL,
            _ => PREC_PRIMARY,
        }
    }

    fn expr(&mut self, id: NodeId, min_prec: u8) {
        let wrap = self.precedence(id) < min_prec;
        self.expr_wrapped(id, wrap);
    }

    fn expr_wrapped(&mut self, id: NodeId, wrap: bool) {
        if wrap {
            self.push("(");
        }
        self.expr_inner(id);
        if wrap {
            self.push(")");
        }
    }

    fn expr_inner(&mut self, id: NodeId) {
        match self.ast.node(id) {
            Node::Ident { name } => {
                let name = name.clone();
                self.push(&name);
            }
            Node::Number { raw } => {
                let raw = raw.clone();
                self.push(&raw);
            }
            Node::Str { value, quote } => {
                let quoted = quote_string(value, *quote);
                self.push(&quoted);
            }
            Node::Bool { value } => self.push(if *value { "true" } else { "false" }),
            Node::Null => self.push("null"),
            Node::This => self.push("this"),
            Node::Array { elements } => {
                let elements = elements.clone();
                self.push("[");
                self.comma_list(&elements, |p, element| p.expr(element, PREC_ASSIGN));
                self.push("]");
            }
            Node::Object { properties } => {
                let properties = properties.clone();
                if properties.is_empty() {
                    self.push("{}");
                    return;
                }
                self.push("{ ");
                self.comma_list(&properties, |p, prop| p.object_member(prop));
                self.push(" }");
            }
            Node::Function { .. } => self.function(id),
            Node::Class { .. } => self.class(id),
            Node::Call { callee, args } => {
                let (callee, args) = (*callee, args.clone());
                self.expr(callee, PREC_CALL);
                self.arguments(&args);
            }
            Node::New { callee, args } => {
                let (callee, args) = (*callee, args.clone());
                self.push("new ");
                let wrap = self.new_callee_needs_parens(callee);
                self.expr_wrapped(callee, wrap);
                self.arguments(&args);
            }
            Node::Member {
                object,
                property,
                computed,
            } => {
                let (object, property, computed) = (*object, *property, *computed);
                let bare_integer = matches!(
                    self.ast.node(object),
                    Node::Number { raw } if raw.chars().all(|c| c.is_ascii_digit())
                );
                let wrap = bare_integer || self.precedence(object) < PREC_CALL;
                self.expr_wrapped(object, wrap);
                if computed {
                    self.push("[");
                    self.expr(property, 0);
                    self.push("]");
                } else {
                    self.push(".");
                    self.expr(property, 0);
                }
            }
            Node::Unary { op, arg } => {
                let (op, arg) = (*op, *arg);
                self.push(op.as_str());
                if op.is_keyword() {
                    self.push(" ");
                }
                let same_sign = matches!(op, UnaryOp::Minus | UnaryOp::Plus)
                    && matches!(
                        self.ast.node(arg),
                        Node::Unary {
                            op: UnaryOp::Minus | UnaryOp::Plus,
                            ..
                        } | Node::Update { prefix: true, .. }
                    );
                let wrap = same_sign || self.precedence(arg) < PREC_UNARY;
                self.expr_wrapped(arg, wrap);
            }
            Node::Update { op, prefix, arg } => {
                let (op, prefix, arg) = (*op, *prefix, *arg);
                if prefix {
                    self.push(op.as_str());
                    self.expr(arg, PREC_POSTFIX);
                } else {
                    self.expr(arg, PREC_POSTFIX + 1);
                    self.push(op.as_str());
                }
            }
            Node::Binary { op, left, right } => {
                let (op, left, right) = (*op, *left, *right);
                let prec = op.precedence();
                let (left_min, right_min) = if op == BinaryOp::Exp {
                    (PREC_POSTFIX, prec)
                } else {
                    (prec, prec + 1)
                };
                self.expr(left, left_min);
                self.push(" ");
                self.push(op.as_str());
                self.push(" ");
                self.expr(right, right_min);
            }
            Node::Logical { op, left, right } => {
                let (op, left, right) = (*op, *left, *right);
                let prec = op.precedence();
                let left_wrap = self.precedence(left) < prec || self.mixes_nullish(op, left);
                self.expr_wrapped(left, left_wrap);
                self.push(" ");
                self.push(op.as_str());
                self.push(" ");
                let right_wrap = self.precedence(right) < prec + 1 || self.mixes_nullish(op, right);
                self.expr_wrapped(right, right_wrap);
            }
            Node::Conditional {
                test,
                consequent,
                alternate,
            } => {
                let (test, consequent, alternate) = (*test, *consequent, *alternate);
                self.expr(test, PREC_CONDITIONAL + 1);
                self.push(" ? ");
                self.expr(consequent, PREC_ASSIGN);
                self.push(" : ");
                self.expr(alternate, PREC_ASSIGN);
            }
            Node::Assign { op, target, value } => {
                let (op, target, value) = (*op, *target, *value);
                self.pattern(target);
                match op {
                    Some(op) => {
                        let _ = write!(self.out, " {} ", op.as_str());
                    }
                    None => self.push(" = "),
                }
                self.expr(value, PREC_ASSIGN);
            }
            Node::Sequence { exprs } => {
                let exprs = exprs.clone();
                self.comma_list(&exprs, |p, e| p.expr(e, PREC_ASSIGN));
            }
            Node::Await { arg } => {
                let arg = *arg;
                self.push("await ");
                self.expr(arg, PREC_UNARY);
            }
            Node::Spread { arg } => {
                let arg = *arg;
                self.push("...");
                self.expr(arg, PREC_ASSIGN);
            }
            Node::ObjectPattern { .. }
            | Node::ArrayPattern { .. }
            | Node::AssignPattern { .. }
            | Node::Rest { .. }
            | Node::Property { .. } => self.pattern(id),
            _ => self.statement(id),
        }
    }

    fn arguments(&mut self, args: &[NodeId]) {
        self.push("(");
        self.comma_list(args, |p, arg| p.expr(arg, PREC_ASSIGN));
        self.push(")");
    }

    fn object_member(&mut self, id: NodeId) {
        match self.ast.node(id) {
            Node::Property {
                key,
                value,
                computed,
                method,
                ..
            } => {
                let (key, value, computed, method) = (*key, *value, *computed, *method);
                if method {
                    self.method(key, computed, value);
                } else if self.is_shorthand(key, value, computed) {
                    self.expr(value, PREC_ASSIGN);
                } else {
                    self.property_key(key, computed);
                    self.push(": ");
                    self.expr(value, PREC_ASSIGN);
                }
            }
            _ => self.expr(id, PREC_ASSIGN),
        }
    }

    fn property_key(&mut self, key: NodeId, computed: bool) {
        if computed {
            self.push("[");
            self.expr(key, PREC_ASSIGN);
            self.push("]");
        } else {
            self.expr(key, 0);
        }
    }

    fn mixes_nullish(&self, op: LogicalOp, child: NodeId) -> bool {
        let Node::Logical { op: child_op, .. } = self.ast.node(child) else {
            return false;
        };
        (op == LogicalOp::Nullish) != (*child_op == LogicalOp::Nullish)
    }

    fn new_callee_needs_parens(&self, callee: NodeId) -> bool {
        match self.ast.node(callee) {
            Node::Call { .. } => true,
            Node::Member { object, .. } => self.new_callee_needs_parens(*object),
            _ => self.precedence(callee) < PREC_CALL,
        }
    }

    /// Whether printing `id` at `min_prec` would begin with `{`, or with `function`/`class`
    /// when it starts a statement. Such expressions need wrapping parentheses.
    fn starts_with_reserved(&self, id: NodeId, min_prec: u8, statement: bool) -> bool {
        if self.precedence(id) < min_prec {
            return false;
        }
        match self.ast.node(id) {
            Node::Object { .. } => true,
            Node::Function {
                kind: FunctionKind::Expression | FunctionKind::Method,
                ..
            }
            | Node::Class { .. } => statement,
            Node::Member { object, .. } => {
                let object = *object;
                !matches!(self.ast.node(object), Node::Number { .. })
                    && self.starts_with_reserved(object, PREC_CALL, statement)
            }
            Node::Call { callee, .. } => self.starts_with_reserved(*callee, PREC_CALL, statement),
            Node::Binary { op, left, .. } => {
                let left_min = if *op == BinaryOp::Exp {
                    PREC_POSTFIX
                } else {
                    op.precedence()
                };
                self.starts_with_reserved(*left, left_min, statement)
            }
            Node::Logical { op, left, .. } => {
                !self.mixes_nullish(*op, *left)
                    && self.starts_with_reserved(*left, op.precedence(), statement)
            }
            Node::Conditional { test, .. } => {
                self.starts_with_reserved(*test, PREC_CONDITIONAL + 1, statement)
            }
            Node::Assign { target, .. } => self.starts_with_reserved(*target, 0, statement),
            Node::Sequence { exprs } => exprs
                .first()
                .is_some_and(|first| self.starts_with_reserved(*first, PREC_ASSIGN, statement)),
            Node::Update {
                prefix: false, arg, ..
            } => self.starts_with_reserved(*arg, PREC_POSTFIX + 1, statement),
            _ => false,
        }
    }
}

fn quote_string(value: &str, quote: char) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    fn reprint(source: &str) -> String {
        let (ast, diagnostics) = parse_program(source);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        print_program(&ast)
    }

    #[test]
    fn statement_leading_object_gets_parens() {
        assert_eq!(reprint("({ a: 1 }).a;"), "({ a: 1 }.a);");
        assert_eq!(reprint("(function () {})();"), "(function () {}());");
    }

    #[test]
    fn arrow_body_object_gets_parens() {
        assert_eq!(reprint("f(() => ({}));"), "f(() => ({}));");
        assert_eq!(reprint("f(x => ({ a: x }).a);"), "f(x => ({ a: x }.a));");
    }

    #[test]
    fn unary_operands_of_exponent_are_wrapped() {
        assert_eq!(reprint("(-a) ** 2;"), "(-a) ** 2;");
        assert_eq!(reprint("- (-a);"), "-(-a);");
    }

    #[test]
    fn nullish_mixing_keeps_parens() {
        assert_eq!(reprint("(a || b) ?? c;"), "(a || b) ?? c;");
        assert_eq!(reprint("a ?? (b && c);"), "a ?? (b && c);");
    }

    #[test]
    fn new_with_call_in_callee() {
        assert_eq!(reprint("new (f())();"), "new (f())();");
        assert_eq!(reprint("new a.B(1);"), "new a.B(1);");
        assert_eq!(reprint("new X;"), "new X();");
    }

    #[test]
    fn strings_keep_their_quotes() {
        assert_eq!(reprint(r#"f('a', "b\n", 'it\'s');"#), r#"f('a', "b\n", 'it\'s');"#);
    }

    #[test]
    fn nested_blocks_indent() {
        assert_eq!(
            reprint("function f(a) { if (a) { return () => { return a; }; } }"),
            "function f(a) {\n  if (a) {\n    return () => {\n      return a;\n    };\n  }\n}"
        );
    }

    #[test]
    fn print_node_renders_expressions() {
        let (ast, _) = parse_program("x = a + (b, c);");
        let stmt = ast.children(ast.root())[0];
        assert_eq!(print_node(&ast, stmt), "x = a + (b, c);");
    }
}
