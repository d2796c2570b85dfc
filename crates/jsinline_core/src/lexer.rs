use crate::diagnostics::{Diagnostic, Position, Span};

pub const KEYWORDS: &[&str] = &[
    "async", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "extends", "false", "finally", "for", "function", "if",
    "in", "instanceof", "let", "new", "null", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Words that may still be used as plain identifiers outside their special position.
pub const CONTEXTUAL_KEYWORDS: &[&str] = &["async", "static", "let", "await", "yield"];

const PUNCT_4: &[&str] = &[">>>="];
const PUNCT_3: &[&str] = &["...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??="];
const PUNCT_2: &[&str] = &[
    "=>", "==", "!=", "<=", ">=", "&&", "||", "??", "++", "--", "+=", "-=", "*=", "/=", "%=",
    "&=", "|=", "^=", "**", "<<", ">>",
];
const PUNCT_1: &[char] = &[
    '{', '}', '(', ')', '[', ']', ';', ',', '<', '>', '+', '-', '*', '/', '%', '&', '|', '^', '!',
    '~', '?', ':', '=', '.',
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    String,
    Punct,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// Identifier name, punctuator, or raw literal text.
    pub text: String,
    /// Decoded value of string literals.
    pub value: String,
    pub span: Span,
    pub newline_before: bool,
    /// Block comments between the previous token and this one, without delimiters.
    pub comments: Vec<String>,
}

impl Token {
    pub fn is_punct(&self, text: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == text
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == word
    }
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
    pending_comments: Vec<String>,
    newline_before: bool,
}

pub fn lex(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut lexer = Lexer {
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
        column: 1,
        tokens: Vec::new(),
        diagnostics: Vec::new(),
        pending_comments: Vec::new(),
        newline_before: false,
    };
    lexer.run();
    (lexer.tokens, lexer.diagnostics)
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn here(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn last_position(&self, start: Position) -> Position {
        if self.column > 1 {
            Position {
                line: self.line,
                column: self.column - 1,
            }
        } else {
            start
        }
    }

    fn push(&mut self, kind: TokenKind, text: String, value: String, start: Position) {
        let end = self.last_position(start);
        self.tokens.push(Token {
            kind,
            text,
            value,
            span: Span::new(start, end),
            newline_before: std::mem::take(&mut self.newline_before),
            comments: std::mem::take(&mut self.pending_comments),
        });
    }

    fn error(&mut self, code: &str, message: &str, start: Position) {
        let end = self.last_position(start);
        self.diagnostics
            .push(Diagnostic::error(code, message, Span::new(start, end)));
    }

    fn run(&mut self) {
        while let Some(ch) = self.peek() {
            let start = self.here();
            if ch == '\n' {
                self.newline_before = true;
                self.bump();
            } else if ch.is_whitespace() {
                self.bump();
            } else if ch == '/' && self.peek_at(1) == Some('/') {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.bump();
                }
            } else if ch == '/' && self.peek_at(1) == Some('*') {
                self.block_comment(start);
            } else if is_ident_start(ch) {
                let mut text = String::new();
                while let Some(c) = self.peek().filter(|c| is_ident_continue(*c)) {
                    text.push(c);
                    self.bump();
                }
                self.push(TokenKind::Ident, text, String::new(), start);
            } else if ch.is_ascii_digit()
                || (ch == '.' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()))
            {
                self.number(start);
            } else if ch == '"' || ch == '\'' {
                self.string(ch, start);
            } else if !self.punct(start) {
                self.bump();
                self.error("L0001", &format!("unexpected character `{ch}`"), start);
            }
        }
        let end = self.here();
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            text: String::new(),
            value: String::new(),
            span: Span::new(end, end),
            newline_before: true,
            comments: std::mem::take(&mut self.pending_comments),
        });
    }

    fn block_comment(&mut self, start: Position) {
        self.bump();
        self.bump();
        let mut text = String::new();
        loop {
            match self.peek() {
                None => {
                    self.error("L0002", "unterminated block comment", start);
                    return;
                }
                Some('*') if self.peek_at(1) == Some('/') => {
                    self.bump();
                    self.bump();
                    break;
                }
                Some(c) => {
                    if c == '\n' {
                        self.newline_before = true;
                    }
                    text.push(c);
                    self.bump();
                }
            }
        }
        self.pending_comments.push(text);
    }

    fn number(&mut self, start: Position) {
        let mut text = String::new();
        let radix_prefix = self.peek() == Some('0')
            && matches!(
                self.peek_at(1),
                Some('x' | 'X' | 'o' | 'O' | 'b' | 'B')
            );
        if radix_prefix {
            for _ in 0..2 {
                if let Some(c) = self.bump() {
                    text.push(c);
                }
            }
            while let Some(c) = self.peek().filter(|c| c.is_ascii_hexdigit() || *c == '_') {
                text.push(c);
                self.bump();
            }
        } else {
            while let Some(c) = self.peek() {
                let exponent_sign = matches!(c, '+' | '-') && text.ends_with(['e', 'E']);
                if c.is_ascii_digit() || c == '.' || c == '_' || matches!(c, 'e' | 'E') || exponent_sign
                {
                    text.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
        }
        if self.peek().is_some_and(is_ident_start) {
            self.error("L0003", "identifier directly after number", start);
        }
        self.push(TokenKind::Number, text, String::new(), start);
    }

    fn string(&mut self, quote: char, start: Position) {
        let mut raw = String::new();
        let mut value = String::new();
        raw.push(quote);
        self.bump();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    self.error("L0004", "unterminated string literal", start);
                    break;
                }
                Some(c) if c == quote => {
                    raw.push(c);
                    self.bump();
                    break;
                }
                Some('\\') => {
                    raw.push('\\');
                    self.bump();
                    let Some(escaped) = self.bump() else {
                        continue;
                    };
                    raw.push(escaped);
                    match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        'b' => value.push('\u{8}'),
                        'f' => value.push('\u{c}'),
                        'v' => value.push('\u{b}'),
                        '0' => value.push('\0'),
                        '\n' => {}
                        'u' => {
                            let mut hex = String::new();
                            while hex.len() < 4 {
                                match self.peek().filter(char::is_ascii_hexdigit) {
                                    Some(h) => {
                                        hex.push(h);
                                        raw.push(h);
                                        self.bump();
                                    }
                                    None => break,
                                }
                            }
                            match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                                Some(decoded) if hex.len() == 4 => value.push(decoded),
                                _ => self.error("L0005", "invalid unicode escape", start),
                            }
                        }
                        other => value.push(other),
                    }
                }
                Some(c) => {
                    raw.push(c);
                    value.push(c);
                    self.bump();
                }
            }
        }
        self.push(TokenKind::String, raw, value, start);
    }

    fn punct(&mut self, start: Position) -> bool {
        let rest: String = self.chars[self.pos..].iter().take(4).collect();
        let matched = PUNCT_4
            .iter()
            .chain(PUNCT_3)
            .chain(PUNCT_2)
            .find(|p| rest.starts_with(**p))
            .map(|p| p.to_string())
            .or_else(|| {
                rest.chars()
                    .next()
                    .filter(|c| PUNCT_1.contains(c))
                    .map(String::from)
            });
        let Some(text) = matched else {
            return false;
        };
        for _ in 0..text.chars().count() {
            self.bump();
        }
        self.push(TokenKind::Punct, text, String::new(), start);
        true
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_text(source: &str) -> Vec<(TokenKind, String)> {
        let (tokens, diagnostics) = lex(source);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        tokens.into_iter().map(|t| (t.kind, t.text)).collect()
    }

    #[test]
    fn longest_punctuator_wins() {
        let tokens = kinds_and_text("a >>>= b ?? c ** d");
        let texts: Vec<_> = tokens.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, vec!["a", ">>>=", "b", "??", "c", "**", "d", ""]);
    }

    #[test]
    fn block_comment_attaches_to_next_token() {
        let (tokens, _) = lex("/** @inline */\nfunction f() {}");
        assert_eq!(tokens[0].text, "function");
        assert_eq!(tokens[0].comments, vec!["* @inline ".to_string()]);
        assert!(tokens[0].newline_before);
    }

    #[test]
    fn line_comments_are_dropped() {
        let tokens = kinds_and_text("a // trailing\nb");
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn string_escapes_decode() {
        let (tokens, _) = lex(r#"'it\'s' "a\nb" "\u0041""#);
        assert_eq!(tokens[0].value, "it's");
        assert_eq!(tokens[0].text, r"'it\'s'");
        assert_eq!(tokens[1].value, "a\nb");
        assert_eq!(tokens[2].value, "A");
    }

    #[test]
    fn numbers_keep_raw_text() {
        let tokens = kinds_and_text("1.5e-3 0xff .5");
        assert_eq!(tokens[0], (TokenKind::Number, "1.5e-3".to_string()));
        assert_eq!(tokens[1], (TokenKind::Number, "0xff".to_string()));
        assert_eq!(tokens[2], (TokenKind::Number, ".5".to_string()));
    }

    #[test]
    fn spans_are_one_based_and_inclusive() {
        let (tokens, _) = lex("let abc");
        assert_eq!(tokens[1].span.start, Position { line: 1, column: 5 });
        assert_eq!(tokens[1].span.end, Position { line: 1, column: 7 });
    }

    #[test]
    fn unterminated_string_reports() {
        let (_, diagnostics) = lex("'abc");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, "L0004");
    }
}
