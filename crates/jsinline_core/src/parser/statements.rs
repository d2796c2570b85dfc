use super::Parser;
use crate::ast::{DeclKind, FunctionKind, Node, NodeId};
use crate::lexer::TokenKind;

impl Parser {
    /// Statements up to `}` (left unconsumed) or, at the top level, end of input.
    pub(super) fn parse_statement_list(&mut self, top_level: bool) -> Vec<NodeId> {
        let mut body = Vec::new();
        loop {
            if self.at_eof() {
                if !top_level {
                    self.error_here("P0001", "expected `}`, found end of input".to_string());
                }
                break;
            }
            if !top_level && self.at_punct("}") {
                break;
            }
            if top_level && self.at_punct("}") {
                self.error_here("P0005", "unexpected `}`".to_string());
                self.advance();
                continue;
            }
            let start_pos = self.pos;
            match self.parse_statement() {
                Some(stmt) => body.push(stmt),
                None => self.recover(start_pos),
            }
        }
        body
    }

    pub(super) fn parse_statement(&mut self) -> Option<NodeId> {
        let comments = self.peek().comments.clone();
        let stmt = self.parse_statement_inner()?;
        if !comments.is_empty() {
            self.ast.set_comments(stmt, comments);
        }
        Some(stmt)
    }

    fn parse_statement_inner(&mut self) -> Option<NodeId> {
        let start = self.start();
        let token = self.peek().clone();
        if token.kind == TokenKind::Punct {
            return match token.text.as_str() {
                "{" => self.parse_block(),
                ";" => {
                    self.advance();
                    Some(self.finish(Node::Empty, start))
                }
                _ => self.parse_expression_statement(),
            };
        }
        if token.kind != TokenKind::Ident {
            return self.parse_expression_statement();
        }
        match token.text.as_str() {
            "var" | "let" | "const" => {
                let decl = self.parse_var_decl()?;
                self.consume_semicolon();
                Some(decl)
            }
            "function" => self.parse_function(FunctionKind::Declaration, false),
            "async"
                if self.peek_at(1).is_keyword("function") && !self.peek_at(1).newline_before =>
            {
                self.advance();
                self.parse_function(FunctionKind::Declaration, true)
            }
            "class" => self.parse_class(true),
            "if" => self.parse_if(),
            "while" => self.parse_while(),
            "for" => self.parse_for(),
            "return" => self.parse_return(),
            "break" | "continue" => self.parse_jump(token.text == "break"),
            "throw" => {
                self.advance();
                if self.peek().newline_before {
                    self.error_here("P0006", "no line break is allowed after `throw`".to_string());
                    return None;
                }
                let arg = self.parse_expression()?;
                self.consume_semicolon();
                Some(self.finish(Node::Throw { arg }, start))
            }
            "try" => self.parse_try(),
            "switch" | "do" | "with" | "debugger" => {
                self.error_here(
                    "P0007",
                    format!("`{}` statements are not supported", token.text),
                );
                None
            }
            _ if self.peek_at(1).is_punct(":") => {
                let (name, span) = self.expect_binding_name()?;
                let label = self.ident_node(name, span);
                self.advance();
                let body = self.parse_statement()?;
                Some(self.finish(Node::Labeled { label, body }, start))
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_expression_statement(&mut self) -> Option<NodeId> {
        let start = self.start();
        let expr = self.parse_expression()?;
        self.consume_semicolon();
        Some(self.finish(Node::ExprStmt { expr }, start))
    }

    pub(super) fn parse_block(&mut self) -> Option<NodeId> {
        let start = self.start();
        self.expect_punct("{")?;
        let body = self.parse_statement_list(false);
        self.expect_punct("}")?;
        Some(self.finish(Node::Block { body }, start))
    }

    /// A declaration without its terminating semicolon (shared with `for` heads).
    fn parse_var_decl(&mut self) -> Option<NodeId> {
        let start = self.start();
        let kind = match self.advance().text.as_str() {
            "var" => DeclKind::Var,
            "let" => DeclKind::Let,
            _ => DeclKind::Const,
        };
        let mut declarators = Vec::new();
        loop {
            let decl_start = self.start();
            let target = self.parse_binding_target()?;
            let init = if self.eat_punct("=") {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            if init.is_none() && kind == DeclKind::Const && !self.at_keyword("of") {
                self.error_here(
                    "P0008",
                    "`const` declarations need an initializer".to_string(),
                );
                return None;
            }
            declarators.push(self.finish(Node::Declarator { target, init }, decl_start));
            if !self.eat_punct(",") {
                break;
            }
        }
        Some(self.finish(Node::VarDecl { kind, declarators }, start))
    }

    fn parse_if(&mut self) -> Option<NodeId> {
        let start = self.start();
        self.advance();
        self.expect_punct("(")?;
        let test = self.parse_expression()?;
        self.expect_punct(")")?;
        let consequent = self.parse_statement()?;
        let alternate = if self.eat_keyword("else") {
            Some(self.parse_statement()?)
        } else {
            None
        };
        Some(self.finish(
            Node::If {
                test,
                consequent,
                alternate,
            },
            start,
        ))
    }

    fn parse_while(&mut self) -> Option<NodeId> {
        let start = self.start();
        self.advance();
        self.expect_punct("(")?;
        let test = self.parse_expression()?;
        self.expect_punct(")")?;
        let body = self.parse_statement()?;
        Some(self.finish(Node::While { test, body }, start))
    }

    fn parse_for(&mut self) -> Option<NodeId> {
        let start = self.start();
        self.advance();
        self.expect_punct("(")?;
        let init = if self.at_punct(";") {
            None
        } else if self.at_keyword("var") || self.at_keyword("let") || self.at_keyword("const") {
            Some(self.parse_var_decl()?)
        } else {
            Some(self.parse_expression()?)
        };
        if self.at_keyword("of") || self.at_keyword("in") {
            self.error_here(
                "P0009",
                "`for...in` and `for...of` loops are not supported".to_string(),
            );
            return None;
        }
        self.expect_punct(";")?;
        let test = if self.at_punct(";") {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punct(";")?;
        let update = if self.at_punct(")") {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punct(")")?;
        let body = self.parse_statement()?;
        Some(self.finish(
            Node::For {
                init,
                test,
                update,
                body,
            },
            start,
        ))
    }

    fn parse_return(&mut self) -> Option<NodeId> {
        let start = self.start();
        self.advance();
        let arg = if self.at_punct(";")
            || self.at_punct("}")
            || self.at_eof()
            || self.peek().newline_before
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_semicolon();
        Some(self.finish(Node::Return { arg }, start))
    }

    fn parse_jump(&mut self, is_break: bool) -> Option<NodeId> {
        let start = self.start();
        self.advance();
        let label = if self.peek().kind == TokenKind::Ident && !self.peek().newline_before {
            let (name, span) = self.expect_binding_name()?;
            Some(self.ident_node(name, span))
        } else {
            None
        };
        self.consume_semicolon();
        let node = if is_break {
            Node::Break { label }
        } else {
            Node::Continue { label }
        };
        Some(self.finish(node, start))
    }

    fn parse_try(&mut self) -> Option<NodeId> {
        let start = self.start();
        self.advance();
        let block = self.parse_block()?;
        let handler = if self.at_keyword("catch") {
            let catch_start = self.start();
            self.advance();
            let param = if self.eat_punct("(") {
                let param = self.parse_binding_target()?;
                self.expect_punct(")")?;
                Some(param)
            } else {
                None
            };
            let body = self.parse_block()?;
            Some(self.finish(Node::Catch { param, body }, catch_start))
        } else {
            None
        };
        let finalizer = if self.eat_keyword("finally") {
            Some(self.parse_block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            self.error_here("P0010", "`try` needs a `catch` or `finally` block".to_string());
            return None;
        }
        Some(self.finish(
            Node::Try {
                block,
                handler,
                finalizer,
            },
            start,
        ))
    }

    /// Parses `function [name](params) { body }` starting at the `function` keyword.
    pub(super) fn parse_function(&mut self, kind: FunctionKind, is_async: bool) -> Option<NodeId> {
        let start = self.start();
        self.advance();
        if self.at_punct("*") {
            self.error_here("P0011", "generator functions are not supported".to_string());
            return None;
        }
        let name = if kind == FunctionKind::Declaration || self.peek().kind == TokenKind::Ident {
            let (name, span) = self.expect_binding_name()?;
            Some(self.ident_node(name, span))
        } else {
            None
        };
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        Some(self.finish(
            Node::Function {
                kind,
                name,
                params,
                body,
                is_async,
            },
            start,
        ))
    }

    /// `(a, b = 1, { c }, ...rest)`
    pub(super) fn parse_params(&mut self) -> Option<Vec<NodeId>> {
        self.expect_punct("(")?;
        let mut params = Vec::new();
        while !self.at_punct(")") {
            let start = self.start();
            if self.eat_punct("...") {
                let arg = self.parse_binding_target()?;
                params.push(self.finish(Node::Rest { arg }, start));
            } else {
                params.push(self.parse_binding_element()?);
            }
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;
        Some(params)
    }

    /// A binding target with an optional default value.
    fn parse_binding_element(&mut self) -> Option<NodeId> {
        let start = self.start();
        let target = self.parse_binding_target()?;
        if self.eat_punct("=") {
            let default = self.parse_assignment()?;
            return Some(self.finish(Node::AssignPattern { target, default }, start));
        }
        Some(target)
    }

    pub(super) fn parse_binding_target(&mut self) -> Option<NodeId> {
        let start = self.start();
        if self.eat_punct("[") {
            let mut elements = Vec::new();
            while !self.at_punct("]") {
                let element_start = self.start();
                if self.at_punct(",") {
                    self.error_here("P0012", "array holes are not supported".to_string());
                    return None;
                }
                if self.eat_punct("...") {
                    let arg = self.parse_binding_target()?;
                    elements.push(self.finish(Node::Rest { arg }, element_start));
                } else {
                    elements.push(self.parse_binding_element()?);
                }
                if !self.eat_punct(",") {
                    break;
                }
            }
            self.expect_punct("]")?;
            return Some(self.finish(Node::ArrayPattern { elements }, start));
        }
        if self.eat_punct("{") {
            let mut properties = Vec::new();
            while !self.at_punct("}") {
                let prop_start = self.start();
                if self.eat_punct("...") {
                    let arg = self.parse_binding_target()?;
                    properties.push(self.finish(Node::Rest { arg }, prop_start));
                } else {
                    properties.push(self.parse_pattern_property()?);
                }
                if !self.eat_punct(",") {
                    break;
                }
            }
            self.expect_punct("}")?;
            return Some(self.finish(Node::ObjectPattern { properties }, start));
        }
        let (name, span) = self.expect_binding_name()?;
        Some(self.ident_node(name, span))
    }

    fn parse_pattern_property(&mut self) -> Option<NodeId> {
        let start = self.start();
        let (key, computed) = self.parse_property_key()?;
        if self.eat_punct(":") {
            let value = self.parse_binding_element()?;
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
            Node::Ident { name } if !computed && super::is_plain_identifier(name) => name.clone(),
            _ => {
                self.error_here("P0001", "expected `:` in object pattern".to_string());
                return None;
            }
        };
        let span = self.ast.span(key);
        let mut value = self.ident_node(name, span);
        if self.eat_punct("=") {
            let default = self.parse_assignment()?;
            value = self.finish(
                Node::AssignPattern {
                    target: value,
                    default,
                },
                start,
            );
        }
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

    pub(super) fn parse_class(&mut self, is_declaration: bool) -> Option<NodeId> {
        let start = self.start();
        self.advance();
        let name = if is_declaration
            || (self.peek().kind == TokenKind::Ident && !self.at_keyword("extends"))
        {
            let (name, span) = self.expect_binding_name()?;
            Some(self.ident_node(name, span))
        } else {
            None
        };
        let super_class = if self.eat_keyword("extends") {
            Some(self.parse_call_member()?)
        } else {
            None
        };
        self.expect_punct("{")?;
        let mut members = Vec::new();
        while !self.at_punct("}") && !self.at_eof() {
            if self.eat_punct(";") {
                continue;
            }
            members.push(self.parse_class_member()?);
        }
        self.expect_punct("}")?;
        Some(self.finish(
            Node::Class {
                name,
                super_class,
                members,
                is_declaration,
            },
            start,
        ))
    }

    fn parse_class_member(&mut self) -> Option<NodeId> {
        let start = self.start();
        let is_static = self.at_keyword("static")
            && !self.peek_at(1).is_punct("(")
            && !self.peek_at(1).is_punct("=");
        if is_static {
            self.advance();
        }
        if ["get", "set", "async"]
            .iter()
            .any(|word| self.at_keyword(word))
            && self.peek_at(1).kind == TokenKind::Ident
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
            let function = self.finish(
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
                Node::ClassMethod {
                    key,
                    computed,
                    is_static,
                    function,
                },
                start,
            ));
        }
        let value = if self.eat_punct("=") {
            Some(self.parse_assignment()?)
        } else {
            None
        };
        self.consume_semicolon();
        Some(self.finish(
            Node::ClassProperty {
                key,
                computed,
                is_static,
                value,
            },
            start,
        ))
    }
}
