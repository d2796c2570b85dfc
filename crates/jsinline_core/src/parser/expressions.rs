use super::{is_plain_identifier, Parser};
use crate::ast::{AssignOp, BinaryOp, FunctionKind, LogicalOp, Node, NodeId, UnaryOp, UpdateOp};
use crate::lexer::TokenKind;

/// Binary and logical operators share one precedence ladder; see [`BinaryOp::precedence`].
#[derive(Clone, Copy)]
enum InfixOp {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

impl InfixOp {
    fn precedence(self) -> u8 {
        match self {
            InfixOp::Binary(op) => op.precedence(),
            InfixOp::Logical(op) => op.precedence(),
        }
    }
}

impl Parser {
    /// Comma-separated expression.
    pub(super) fn parse_expression(&mut self) -> Option<NodeId> {
        let start = self.start();
        let first = self.parse_assignment()?;
        if !self.at_punct(",") {
            return Some(first);
        }
        let mut exprs = vec![first];
        while self.eat_punct(",") {
            exprs.push(self.parse_assignment()?);
        }
        Some(self.finish(Node::Sequence { exprs }, start))
    }

    pub(super) fn parse_assignment(&mut self) -> Option<NodeId> {
        if let Some(arrow) = self.try_parse_arrow()? {
            return Some(arrow);
        }
        let start = self.start();
        let target = self.parse_conditional()?;
        let token = self.peek();
        if token.kind != TokenKind::Punct {
            return Some(target);
        }
        let Some(op) = AssignOp::from_token(&token.text) else {
            return Some(target);
        };
        if !matches!(self.ast.node(target), Node::Ident { .. } | Node::Member { .. }) {
            let span = self.ast.span(target);
            self.error_at("P0020", "invalid assignment target".to_string(), span);
            return None;
        }
        self.advance();
        let value = self.parse_assignment()?;
        Some(self.finish(Node::Assign { op, target, value }, start))
    }

    /// Returns `Some(None)` when the upcoming tokens are not an arrow function.
    fn try_parse_arrow(&mut self) -> Option<Option<NodeId>> {
        let start = self.start();
        let mut offset = 0;
        let is_async = self.at_keyword("async")
            && !self.peek_at(1).newline_before
            && (self.peek_at(1).is_punct("(") || self.peek_at(1).kind == TokenKind::Ident);
        if is_async {
            offset = 1;
        }
        let first = self.peek_at(offset).clone();
        let simple_param =
            first.kind == TokenKind::Ident && self.peek_at(offset + 1).is_punct("=>");
        let paren_params = first.is_punct("(") && self.arrow_after_parens(offset);
        if !simple_param && !paren_params {
            return Some(None);
        }
        if is_async {
            self.advance();
        }
        let params = if simple_param {
            let (name, span) = self.expect_binding_name()?;
            vec![self.ident_node(name, span)]
        } else {
            self.parse_params()?
        };
        if self.peek().newline_before {
            self.error_here("P0021", "no line break is allowed before `=>`".to_string());
            return None;
        }
        self.expect_punct("=>")?;
        let body = if self.at_punct("{") {
            self.parse_block()?
        } else {
            self.parse_assignment()?
        };
        Some(Some(self.finish(
            Node::Function {
                kind: FunctionKind::Arrow,
                name: None,
                params,
                body,
                is_async,
            },
            start,
        )))
    }

    /// Scans from the `(` at `offset` to its partner and checks for a following `=>`.
    fn arrow_after_parens(&self, offset: usize) -> bool {
        let mut depth = 0usize;
        let mut index = self.pos + offset;
        while let Some(token) = self.tokens.get(index) {
            match (token.kind, token.text.as_str()) {
                (TokenKind::Eof, _) => return false,
                (TokenKind::Punct, "(" | "[" | "{") => depth += 1,
                (TokenKind::Punct, ")" | "]" | "}") => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return self
                            .tokens
                            .get(index + 1)
                            .is_some_and(|next| next.is_punct("=>"));
                    }
                }
                _ => {}
            }
            index += 1;
        }
        false
    }

    fn parse_conditional(&mut self) -> Option<NodeId> {
        let start = self.start();
        let test = self.parse_infix(4)?;
        if !self.eat_punct("?") {
            return Some(test);
        }
        let consequent = self.parse_assignment()?;
        self.expect_punct(":")?;
        let alternate = self.parse_assignment()?;
        Some(self.finish(
            Node::Conditional {
                test,
                consequent,
                alternate,
            },
            start,
        ))
    }

    fn peek_infix(&self) -> Option<InfixOp> {
        let token = self.peek();
        match token.kind {
            TokenKind::Punct => LogicalOp::from_token(&token.text)
                .map(InfixOp::Logical)
                .or_else(|| BinaryOp::from_token(&token.text).map(InfixOp::Binary)),
            TokenKind::Ident if token.text == "in" || token.text == "instanceof" => {
                BinaryOp::from_token(&token.text).map(InfixOp::Binary)
            }
            _ => None,
        }
    }

    /// Precedence climbing over binary and logical operators binding at least `min_prec`.
    fn parse_infix(&mut self, min_prec: u8) -> Option<NodeId> {
        let start = self.start();
        let mut left = self.parse_unary()?;
        while let Some(op) = self.peek_infix() {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.advance();
            let next_min = match op {
                InfixOp::Binary(BinaryOp::Exp) => prec,
                _ => prec + 1,
            };
            let right = self.parse_infix(next_min)?;
            let node = match op {
                InfixOp::Binary(op) => Node::Binary { op, left, right },
                InfixOp::Logical(op) => Node::Logical { op, left, right },
            };
            left = self.finish(node, start);
        }
        Some(left)
    }

    fn parse_unary(&mut self) -> Option<NodeId> {
        let start = self.start();
        let token = self.peek().clone();
        let unary = match (token.kind, token.text.as_str()) {
            (TokenKind::Punct, "!") => Some(UnaryOp::Not),
            (TokenKind::Punct, "-") => Some(UnaryOp::Minus),
            (TokenKind::Punct, "+") => Some(UnaryOp::Plus),
            (TokenKind::Punct, "~") => Some(UnaryOp::BitNot),
            (TokenKind::Ident, "typeof") => Some(UnaryOp::Typeof),
            (TokenKind::Ident, "void") => Some(UnaryOp::Void),
            (TokenKind::Ident, "delete") => Some(UnaryOp::Delete),
            _ => None,
        };
        if let Some(op) = unary {
            self.advance();
            let arg = self.parse_unary()?;
            return Some(self.finish(Node::Unary { op, arg }, start));
        }
        if token.is_punct("++") || token.is_punct("--") {
            self.advance();
            let arg = self.parse_unary()?;
            let op = if token.text == "++" {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            return Some(self.finish(
                Node::Update {
                    op,
                    prefix: true,
                    arg,
                },
                start,
            ));
        }
        if token.is_keyword("await") {
            self.advance();
            let arg = self.parse_unary()?;
            return Some(self.finish(Node::Await { arg }, start));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Option<NodeId> {
        let start = self.start();
        let arg = self.parse_call_member()?;
        let token = self.peek();
        if (token.is_punct("++") || token.is_punct("--")) && !token.newline_before {
            let op = if token.text == "++" {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            self.advance();
            return Some(self.finish(
                Node::Update {
                    op,
                    prefix: false,
                    arg,
                },
                start,
            ));
        }
        Some(arg)
    }

    /// Primary expression followed by member accesses and calls.
    pub(super) fn parse_call_member(&mut self) -> Option<NodeId> {
        let start = self.start();
        let mut expr = if self.at_keyword("new") {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            if self.eat_punct(".") {
                let (name, span) = self.expect_name()?;
                let property = self.ident_node(name, span);
                expr = self.finish(
                    Node::Member {
                        object: expr,
                        property,
                        computed: false,
                    },
                    start,
                );
            } else if self.eat_punct("[") {
                let property = self.parse_expression()?;
                self.expect_punct("]")?;
                expr = self.finish(
                    Node::Member {
                        object: expr,
                        property,
                        computed: true,
                    },
                    start,
                );
            } else if self.at_punct("(") {
                let args = self.parse_arguments()?;
                expr = self.finish(Node::Call { callee: expr, args }, start);
            } else {
                return Some(expr);
            }
        }
    }

    fn parse_new(&mut self) -> Option<NodeId> {
        let start = self.start();
        self.advance();
        let mut callee = if self.at_keyword("new") {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            if self.eat_punct(".") {
                let (name, span) = self.expect_name()?;
                let property = self.ident_node(name, span);
                callee = self.finish(
                    Node::Member {
                        object: callee,
                        property,
                        computed: false,
                    },
                    start,
                );
            } else if self.eat_punct("[") {
                let property = self.parse_expression()?;
                self.expect_punct("]")?;
                callee = self.finish(
                    Node::Member {
                        object: callee,
                        property,
                        computed: true,
                    },
                    start,
                );
            } else {
                break;
            }
        }
        let args = if self.at_punct("(") {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Some(self.finish(Node::New { callee, args }, start))
    }

    fn parse_arguments(&mut self) -> Option<Vec<NodeId>> {
        self.expect_punct("(")?;
        let mut args = Vec::new();
        while !self.at_punct(")") {
            args.push(self.parse_spread_or_assignment()?);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;
        Some(args)
    }

    fn parse_spread_or_assignment(&mut self) -> Option<NodeId> {
        let start = self.start();
        if self.eat_punct("...") {
            let arg = self.parse_assignment()?;
            return Some(self.finish(Node::Spread { arg }, start));
        }
        self.parse_assignment()
    }

    fn parse_primary(&mut self) -> Option<NodeId> {
        let start = self.start();
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number => {
                self.advance();
                Some(self.finish(Node::Number { raw: token.text }, start))
            }
            TokenKind::String => {
                self.advance();
                let quote = token.text.chars().next().unwrap_or('"');
                Some(self.finish(
                    Node::Str {
                        value: token.value,
                        quote,
                    },
                    start,
                ))
            }
            TokenKind::Ident => self.parse_word(),
            TokenKind::Punct if token.text == "(" => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_punct(")")?;
                Some(expr)
            }
            TokenKind::Punct if token.text == "[" => self.parse_array(),
            TokenKind::Punct if token.text == "{" => self.parse_object(),
            _ => {
                let found = self.describe_current();
                self.error_here("P0022", format!("expected an expression, found {found}"));
                None
            }
        }
    }

    fn parse_word(&mut self) -> Option<NodeId> {
        let start = self.start();
        let token = self.peek().clone();
        let literal = match token.text.as_str() {
            "this" => Some(Node::This),
            "null" => Some(Node::Null),
            "true" => Some(Node::Bool { value: true }),
            "false" => Some(Node::Bool { value: false }),
            _ => None,
        };
        if let Some(node) = literal {
            self.advance();
            return Some(self.finish(node, start));
        }
        match token.text.as_str() {
            "function" => self.parse_function(FunctionKind::Expression, false),
            "async" if self.peek_at(1).is_keyword("function") && !self.peek_at(1).newline_before => {
                self.advance();
                self.parse_function(FunctionKind::Expression, true)
            }
            "class" => self.parse_class(false),
            _ => {
                let (name, span) = self.expect_binding_name()?;
                Some(self.ident_node(name, span))
            }
        }
    }

    fn parse_array(&mut self) -> Option<NodeId> {
        let start = self.start();
        self.expect_punct("[")?;
        let mut elements = Vec::new();
        while !self.at_punct("]") {
            if self.at_punct(",") {
                self.error_here("P0012", "array holes are not supported".to_string());
                return None;
            }
            elements.push(self.parse_spread_or_assignment()?);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct("]")?;
        Some(self.finish(Node::Array { elements }, start))
    }

    fn parse_object(&mut self) -> Option<NodeId> {
        let start = self.start();
        self.expect_punct("{")?;
        let mut properties = Vec::new();
        while !self.at_punct("}") {
            properties.push(self.parse_object_member()?);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct("}")?;
        Some(self.finish(Node::Object { properties }, start))
    }

    fn parse_object_member(&mut self) -> Option<NodeId> {
        let start = self.start();
        if self.eat_punct("...") {
            let arg = self.parse_assignment()?;
            return Some(self.finish(Node::Spread { arg }, start));
        }
        let modifier = ["get", "set", "async"]
            .iter()
            .any(|word| self.at_keyword(word));
        if modifier
            && !matches!(
                self.peek_at(1).text.as_str(),
                ":" | "(" | "," | "}"
            )
        {
            self.error_here(
                "P0013",
                "accessor and async methods are not supported".to_string(),
            );
            return None;
        }
        let (key, computed) = self.parse_property_key()?;
        if self.at_punct("(") {
            let fn_start = self.start();
            let params = self.parse_params()?;
            let body = self.parse_block()?;
            let value = self.finish(
                Node::Function {
                    kind: FunctionKind::Method,
                    name: None,
                    params,
                    body,
                    is_async: false,
                },
                fn_start,
            );
            return Some(self.finish(
                Node::Property {
                    key,
                    value,
                    computed,
                    shorthand: false,
                    method: true,
                },
                start,
            ));
        }
        if self.eat_punct(":") {
            let value = self.parse_assignment()?;
            return Some(self.finish(
                Node::Property {
                    key,
                    value,
                    computed,
                    shorthand: false,
                    method: false,
                },
                start,
            ));
        }
        let name = match self.ast.node(key) {
            Node::Ident { name } if !computed && is_plain_identifier(name) => name.clone(),
            _ => {
                self.error_here("P0001", "expected `:` after property key".to_string());
                return None;
            }
        };
        let span = self.ast.span(key);
        let value = self.ident_node(name, span);
        Some(self.finish(
            Node::Property {
                key,
                value,
                computed,
                shorthand: true,
                method: false,
            },
            start,
        ))
    }

    /// Property key of an object literal, object pattern or class member; `true` when computed.
    pub(super) fn parse_property_key(&mut self) -> Option<(NodeId, bool)> {
        let start = self.start();
        if self.eat_punct("[") {
            let key = self.parse_assignment()?;
            self.expect_punct("]")?;
            return Some((key, true));
        }
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Ident => {
                self.advance();
                Some((self.ident_node(token.text, token.span), false))
            }
            TokenKind::String => {
                self.advance();
                let quote = token.text.chars().next().unwrap_or('"');
                Some((
                    self.finish(
                        Node::Str {
                            value: token.value,
                            quote,
                        },
                        start,
                    ),
                    false,
                ))
            }
            TokenKind::Number => {
                self.advance();
                Some((self.finish(Node::Number { raw: token.text }, start), false))
            }
            _ => {
                let found = self.describe_current();
                self.error_here("P0023", format!("expected a property key, found {found}"));
                None
            }
        }
    }
}
