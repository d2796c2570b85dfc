//! Recursive-descent parser for the JavaScript subset the inliner understands.
//!
//! Like the lexer it never aborts: problems become diagnostics and parsing resumes at the next
//! statement boundary. Callers must not transform a tree whose diagnostics contain errors.

mod expressions;
mod statements;

use crate::ast::{Ast, Node, NodeId};
use crate::diagnostics::{Diagnostic, Position, Span};
use crate::lexer::{self, Token, TokenKind, CONTEXTUAL_KEYWORDS, KEYWORDS};

/// Parses `source` into a fresh tree. Lexer and parser diagnostics are returned together.
pub fn parse_program(source: &str) -> (Ast, Vec<Diagnostic>) {
    let (tokens, mut diagnostics) = lexer::lex(source);
    let mut parser = Parser::new(tokens);
    let body = parser.parse_statement_list(true);
    for id in body {
        parser.ast.append_to_program(id);
    }
    diagnostics.append(&mut parser.diagnostics);
    (parser.ast, diagnostics)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    ast: Ast,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            ast: Ast::new(),
            diagnostics: Vec::new(),
        }
    }

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let index = (self.pos + offset).min(self.tokens.len().saturating_sub(1));
        &self.tokens[index]
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn at_punct(&self, text: &str) -> bool {
        self.peek().is_punct(text)
    }

    fn at_keyword(&self, word: &str) -> bool {
        self.peek().is_keyword(word)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat_punct(&mut self, text: &str) -> bool {
        if self.at_punct(text) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        if self.at_keyword(word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, text: &str) -> Option<()> {
        if self.eat_punct(text) {
            return Some(());
        }
        let found = self.describe_current();
        self.error_here("P0001", format!("expected `{text}`, found {found}"));
        None
    }

    fn describe_current(&self) -> String {
        let token = self.peek();
        match token.kind {
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("`{}`", token.text),
        }
    }

    /// Any identifier-shaped token, reserved words included (property names, labels).
    fn expect_name(&mut self) -> Option<(String, Span)> {
        if self.peek().kind == TokenKind::Ident {
            let token = self.advance();
            return Some((token.text, token.span));
        }
        let found = self.describe_current();
        self.error_here("P0003", format!("expected a name, found {found}"));
        None
    }

    /// An identifier usable as a binding or reference.
    fn expect_binding_name(&mut self) -> Option<(String, Span)> {
        let token = self.peek();
        if token.kind == TokenKind::Ident && is_plain_identifier(&token.text) {
            let token = self.advance();
            return Some((token.text, token.span));
        }
        let found = self.describe_current();
        self.error_here("P0004", format!("expected an identifier, found {found}"));
        None
    }

    fn consume_semicolon(&mut self) {
        if self.eat_punct(";") {
            return;
        }
        if self.at_punct("}") || self.at_eof() || self.peek().newline_before {
            return;
        }
        let found = self.describe_current();
        self.error_here("P0002", format!("expected `;`, found {found}"));
    }

    fn start(&self) -> Position {
        self.peek().span.start
    }

    fn previous_end(&self) -> Position {
        self.pos
            .checked_sub(1)
            .and_then(|index| self.tokens.get(index))
            .map(|token| token.span.end)
            .unwrap_or_default()
    }

    fn finish(&mut self, node: Node, start: Position) -> NodeId {
        let end = self.previous_end().max(start);
        self.ast.alloc(node, Span::new(start, end))
    }

    fn ident_node(&mut self, name: String, span: Span) -> NodeId {
        self.ast.alloc(Node::Ident { name }, span)
    }

    fn error_here(&mut self, code: &str, message: String) {
        let span = self.peek().span;
        self.diagnostics.push(Diagnostic::error(code, message, span));
    }

    fn error_at(&mut self, code: &str, message: String, span: Span) {
        self.diagnostics.push(Diagnostic::error(code, message, span));
    }

    /// Skips to the end of the broken statement: past a `;`, before a `}`, or before the first
    /// token on a new line.
    fn recover(&mut self, start_pos: usize) {
        if self.pos == start_pos {
            self.advance();
        }
        while !self.at_eof() {
            if self.eat_punct(";") {
                return;
            }
            if self.at_punct("}") || self.peek().newline_before {
                return;
            }
            self.advance();
        }
    }
}

fn is_plain_identifier(text: &str) -> bool {
    !KEYWORDS.contains(&text) || CONTEXTUAL_KEYWORDS.contains(&text)
}
