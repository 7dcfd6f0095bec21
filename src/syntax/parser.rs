//! Recursive-descent parser for the reference curly-brace language.
//!
//! The language is a C#-flavoured subset: using directives, namespaces,
//! classes/structs/interfaces/records with fields, properties, constructors
//! and methods; block statements with `if`/`else`, `while`, `do`,
//! `foreach`, jumps, labels, `yield` and local functions; and expressions
//! with the usual precedence levels, member access, invocation, lambdas and
//! object creation. `for`, `switch`, `try` and casts are not supported and
//! are reported as syntax errors.

use super::kind::NodeKind;
use super::lexer::{tokenize, Token, TokenKind};
use super::span::TextSpan;
use super::tree::{NodeId, SourceParser, TreeBuilder};
use crate::error::{Error, Result};

const RESERVED: &[&str] = &[
    "if", "else", "while", "do", "for", "foreach", "in", "return", "break", "continue", "throw",
    "goto", "new", "this", "true", "false", "null", "class", "struct", "interface", "record",
    "namespace", "using", "default", "typeof", "switch", "case", "try", "catch", "finally",
];

const MODIFIERS: &[&str] = &[
    "public", "private", "protected", "internal", "static", "readonly", "const", "abstract",
    "virtual", "override", "sealed", "async", "partial", "extern", "unsafe", "volatile",
];

const TYPE_KEYWORDS: &[&str] = &["class", "struct", "interface", "record"];

const ASSIGNMENT_OPERATORS: &[&str] = &["=", "+=", "-=", "*=", "/=", "%=", "??="];

const PREFIX_OPERATORS: &[&str] = &["!", "-", "+", "~", "++", "--"];

/// Deepest recursion the parser allows before giving up with a syntax error.
const MAX_NESTING: usize = 128;

/// Parser for the reference curly-brace language.
#[derive(Debug, Default, Clone, Copy)]
pub struct CurlyParser;

impl CurlyParser {
    /// Create a new parser.
    pub fn new() -> Self {
        Self
    }
}

impl SourceParser for CurlyParser {
    fn language(&self) -> &str {
        "curly"
    }

    fn build(&self, text: &str, builder: &mut TreeBuilder) -> Result<NodeId> {
        let tokens = tokenize(text)?;
        let mut parser = Parser {
            text,
            tokens,
            pos: 0,
            depth: 0,
            b: builder,
        };
        parser.compilation_unit()
    }

    fn build_fragment(
        &self,
        kind: NodeKind,
        text: &str,
        builder: &mut TreeBuilder,
    ) -> Option<Result<NodeId>> {
        let member = matches!(
            kind,
            NodeKind::TypeDeclaration
                | NodeKind::FieldDeclaration
                | NodeKind::PropertyDeclaration
                | NodeKind::MethodDeclaration
                | NodeKind::ConstructorDeclaration
        );
        if !member && !kind.is_statement() {
            return None;
        }
        Some(tokenize(text).and_then(|tokens| {
            let mut parser = Parser {
                text,
                tokens,
                pos: 0,
                depth: 0,
                b: builder,
            };
            let node = if member {
                parser.member()?
            } else {
                parser.statement()?
            };
            if !parser.at_eof() {
                return parser.error(format!(
                    "unexpected {} after {}",
                    parser.describe(parser.peek()),
                    kind.name()
                ));
            }
            Ok(node)
        }))
    }
}

/// Binding power of a binary operator.
fn binary_precedence(op: &str) -> Option<u8> {
    Some(match op {
        "??" => 1,
        "||" => 2,
        "&&" => 3,
        "|" => 4,
        "^" => 5,
        "&" => 6,
        "==" | "!=" => 7,
        "<" | ">" | "<=" | ">=" => 8,
        "+" | "-" => 9,
        "*" | "/" | "%" => 10,
        _ => return None,
    })
}

struct Parser<'a, 'b> {
    text: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    b: &'b mut TreeBuilder,
}

impl<'a> Parser<'a, '_> {
    // ----- token helpers -------------------------------------------------

    fn tok(&self, index: usize) -> Token {
        self.tokens[index.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> Token {
        self.tok(self.pos)
    }

    fn text_of(&self, token: Token) -> &'a str {
        &self.text[token.span.start..token.span.end]
    }

    fn at(&self, s: &str) -> bool {
        self.at_n(0, s)
    }

    fn at_n(&self, n: usize, s: &str) -> bool {
        let token = self.tok(self.pos + n);
        token.kind != TokenKind::Eof && self.text_of(token) == s
    }

    fn at_any(&self, options: &[&str]) -> bool {
        let token = self.peek();
        token.kind != TokenKind::Eof && options.contains(&self.text_of(token))
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn is_ident(&self, token: Token) -> bool {
        token.kind == TokenKind::Ident && !RESERVED.contains(&self.text_of(token))
    }

    fn bump(&mut self) -> Token {
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, s: &str) -> bool {
        if self.at(s) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn describe(&self, token: Token) -> String {
        match token.kind {
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", self.text_of(token)),
        }
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T> {
        Err(Error::syntax(self.peek().span.start, message))
    }

    fn expect(&mut self, s: &str) -> Result<Token> {
        if self.at(s) {
            Ok(self.bump())
        } else {
            self.error(format!("expected '{}', found {}", s, self.describe(self.peek())))
        }
    }

    fn start(&self) -> usize {
        self.peek().span.start
    }

    fn prev_end(&self) -> usize {
        match self.pos {
            0 => 0,
            n => self.tokens[n - 1].span.end,
        }
    }

    /// Run `parse` one nesting level deeper.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_NESTING {
            return self.error(format!("nesting exceeds {} levels", MAX_NESTING));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn finish(&mut self, kind: NodeKind, start: usize, children: Vec<NodeId>) -> NodeId {
        let span = TextSpan::new(start, self.prev_end().max(start));
        self.b.node(kind, span, children)
    }

    fn ident(&mut self, kind: NodeKind) -> Result<NodeId> {
        let token = self.peek();
        if !self.is_ident(token) {
            return self.error(format!("expected identifier, found {}", self.describe(token)));
        }
        self.bump();
        Ok(self.b.leaf(kind, token.span))
    }

    fn operator(&mut self) -> NodeId {
        let token = self.bump();
        self.b.leaf(NodeKind::OperatorToken, token.span)
    }

    fn skip_modifiers(&mut self) {
        while self.at_any(MODIFIERS) || (self.at("new") && !self.at_n(1, "(")) {
            self.bump();
        }
    }

    fn skip_attributes(&mut self) -> Result<()> {
        while self.at("[") {
            let mut depth = 0usize;
            loop {
                if self.at_eof() {
                    return self.error("unterminated attribute list");
                }
                let token = self.bump();
                match self.text_of(token) {
                    "[" => depth += 1,
                    "]" => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn skip_constraints(&mut self) {
        if self.at("where") {
            while !self.at_eof() && !self.at_any(&["{", "=>", ";"]) {
                self.bump();
            }
        }
    }

    // ----- declarations --------------------------------------------------

    fn compilation_unit(&mut self) -> Result<NodeId> {
        let mut items = Vec::new();
        while !self.at_eof() {
            items.push(self.item()?);
        }
        let span = TextSpan::new(0, self.text.len());
        Ok(self.b.node(NodeKind::CompilationUnit, span, items))
    }

    fn item(&mut self) -> Result<NodeId> {
        let start = self.start();
        if self.at("using") {
            return self.using_directive();
        }
        if self.at("namespace") {
            return self.namespace();
        }
        self.skip_attributes()?;
        self.skip_modifiers();
        if self.at_any(TYPE_KEYWORDS) {
            return self.type_declaration(start);
        }
        self.error(format!(
            "expected type declaration, found {}",
            self.describe(self.peek())
        ))
    }

    fn using_directive(&mut self) -> Result<NodeId> {
        let start = self.start();
        self.expect("using")?;
        self.eat("static");
        let mut children = vec![self.qualified_name()?];
        if self.eat("=") {
            children.push(self.qualified_name()?);
        }
        self.expect(";")?;
        Ok(self.finish(NodeKind::UsingDirective, start, children))
    }

    fn qualified_name(&mut self) -> Result<NodeId> {
        let start = self.start();
        if !self.is_ident(self.peek()) {
            return self.error(format!("expected name, found {}", self.describe(self.peek())));
        }
        self.bump();
        while self.at(".") && self.is_ident(self.tok(self.pos + 1)) {
            self.bump();
            self.bump();
        }
        Ok(self.finish(NodeKind::QualifiedName, start, Vec::new()))
    }

    fn namespace(&mut self) -> Result<NodeId> {
        let start = self.start();
        self.expect("namespace")?;
        let mut children = vec![self.qualified_name()?];
        if self.eat(";") {
            while !self.at_eof() {
                children.push(self.nested(|p| p.item())?);
            }
        } else {
            self.expect("{")?;
            while !self.at("}") {
                if self.at_eof() {
                    return self.error("expected '}' to close namespace");
                }
                children.push(self.nested(|p| p.item())?);
            }
            self.expect("}")?;
        }
        Ok(self.finish(NodeKind::NamespaceDeclaration, start, children))
    }

    fn type_declaration(&mut self, start: usize) -> Result<NodeId> {
        let keyword = self.bump();
        if self.text_of(keyword) == "record" && self.at_any(&["class", "struct"]) {
            self.bump();
        }

        let mut children = vec![self.ident(NodeKind::IdentifierToken)?];
        if self.at("<") {
            children.push(self.type_parameter_list()?);
        }
        if self.at("(") {
            children.push(self.parameter_list()?);
        }
        if self.at(":") {
            let base_start = self.start();
            self.bump();
            let mut types = vec![self.parse_type()?];
            while self.eat(",") {
                types.push(self.parse_type()?);
            }
            children.push(self.finish(NodeKind::BaseList, base_start, types));
        }
        self.skip_constraints();

        if !self.eat(";") {
            self.expect("{")?;
            while !self.at("}") {
                if self.at_eof() {
                    return self.error("expected '}' to close type declaration");
                }
                children.push(self.nested(|p| p.member())?);
            }
            self.expect("}")?;
            self.eat(";");
        }
        Ok(self.finish(NodeKind::TypeDeclaration, start, children))
    }

    fn type_parameter_list(&mut self) -> Result<NodeId> {
        let start = self.start();
        self.expect("<")?;
        let mut params = Vec::new();
        loop {
            if self.at("in") || self.at("out") {
                self.bump();
            }
            params.push(self.ident(NodeKind::IdentifierToken)?);
            if !self.eat(",") {
                break;
            }
        }
        self.expect(">")?;
        Ok(self.finish(NodeKind::TypeParameterList, start, params))
    }

    fn member(&mut self) -> Result<NodeId> {
        let start = self.start();
        self.skip_attributes()?;
        self.skip_modifiers();

        if self.at_any(TYPE_KEYWORDS) {
            return self.type_declaration(start);
        }

        if self.is_ident(self.peek()) && self.at_n(1, "(") {
            let mut children = vec![self.ident(NodeKind::IdentifierToken)?];
            children.push(self.parameter_list()?);
            if self.eat(":") {
                if !(self.at("base") || self.at("this")) {
                    return self.error("expected 'base' or 'this' constructor initializer");
                }
                self.bump();
                children.push(self.argument_list("(", ")", NodeKind::ArgumentList)?);
            }
            if let Some(body) = self.body_or_arrow()? {
                children.push(body);
            }
            return Ok(self.finish(NodeKind::ConstructorDeclaration, start, children));
        }

        let ty = self.parse_type()?;
        let name = self.ident(NodeKind::IdentifierToken)?;

        if self.at("<") || self.at("(") {
            let mut children = vec![ty, name];
            if self.at("<") {
                children.push(self.type_parameter_list()?);
            }
            children.push(self.parameter_list()?);
            self.skip_constraints();
            if let Some(body) = self.body_or_arrow()? {
                children.push(body);
            }
            return Ok(self.finish(NodeKind::MethodDeclaration, start, children));
        }

        if self.at("{") {
            let mut children = vec![ty, name, self.accessor_list()?];
            if self.eat("=") {
                children.push(self.var_initializer()?);
                self.expect(";")?;
            }
            return Ok(self.finish(NodeKind::PropertyDeclaration, start, children));
        }

        if self.at("=>") {
            let arrow = self.arrow_clause()?;
            self.expect(";")?;
            return Ok(self.finish(NodeKind::PropertyDeclaration, start, vec![ty, name, arrow]));
        }

        let mut children = vec![ty, self.declarator(name)?];
        while self.eat(",") {
            let name = self.ident(NodeKind::IdentifierToken)?;
            children.push(self.declarator(name)?);
        }
        self.expect(";")?;
        Ok(self.finish(NodeKind::FieldDeclaration, start, children))
    }

    fn declarator(&mut self, name: NodeId) -> Result<NodeId> {
        let start = self.b.span(name).start;
        let mut children = vec![name];
        if self.eat("=") {
            children.push(self.var_initializer()?);
        }
        Ok(self.finish(NodeKind::VariableDeclarator, start, children))
    }

    fn var_initializer(&mut self) -> Result<NodeId> {
        if self.at("{") {
            self.nested(|p| p.initializer())
        } else {
            self.expression()
        }
    }

    fn body_or_arrow(&mut self) -> Result<Option<NodeId>> {
        if self.at("{") {
            return self.block().map(Some);
        }
        if self.at("=>") {
            let arrow = self.arrow_clause()?;
            self.expect(";")?;
            return Ok(Some(arrow));
        }
        self.expect(";")?;
        Ok(None)
    }

    fn arrow_clause(&mut self) -> Result<NodeId> {
        let start = self.start();
        self.expect("=>")?;
        let expr = self.expression()?;
        Ok(self.finish(NodeKind::ArrowExpressionClause, start, vec![expr]))
    }

    fn accessor_list(&mut self) -> Result<NodeId> {
        let start = self.start();
        self.expect("{")?;
        let mut accessors = Vec::new();
        while !self.at("}") {
            let accessor_start = self.start();
            self.skip_modifiers();
            if self.peek().kind != TokenKind::Ident {
                return self.error(format!(
                    "expected accessor, found {}",
                    self.describe(self.peek())
                ));
            }
            self.bump();
            let body = self.body_or_arrow()?;
            accessors.push(self.finish(
                NodeKind::AccessorDeclaration,
                accessor_start,
                body.into_iter().collect(),
            ));
        }
        self.expect("}")?;
        Ok(self.finish(NodeKind::AccessorList, start, accessors))
    }

    fn parameter_list(&mut self) -> Result<NodeId> {
        let start = self.start();
        self.expect("(")?;
        let mut params = Vec::new();
        if !self.at(")") {
            loop {
                params.push(self.parameter()?);
                if !self.eat(",") {
                    break;
                }
            }
        }
        self.expect(")")?;
        Ok(self.finish(NodeKind::ParameterList, start, params))
    }

    fn parameter(&mut self) -> Result<NodeId> {
        let start = self.start();
        self.skip_attributes()?;
        while self.at_any(&["this", "ref", "out", "in", "params"]) {
            self.bump();
        }
        let mut children = vec![self.parse_type()?, self.ident(NodeKind::IdentifierToken)?];
        if self.eat("=") {
            children.push(self.expression()?);
        }
        Ok(self.finish(NodeKind::Parameter, start, children))
    }

    /// Parse a type reference into a [`NodeKind::TypeSyntax`] node whose
    /// children are the type arguments.
    fn parse_type(&mut self) -> Result<NodeId> {
        let start = self.start();
        if !self.is_ident(self.peek()) {
            return self.error(format!("expected type, found {}", self.describe(self.peek())));
        }
        self.bump();
        while self.at(".") && self.is_ident(self.tok(self.pos + 1)) {
            self.bump();
            self.bump();
        }
        let mut args = Vec::new();
        if self.eat("<") {
            loop {
                args.push(self.nested(|p| p.parse_type())?);
                if !self.eat(",") {
                    break;
                }
            }
            self.expect(">")?;
        }
        self.eat("?");
        while self.at("[") && self.at_n(1, "]") {
            self.bump();
            self.bump();
        }
        Ok(self.finish(NodeKind::TypeSyntax, start, args))
    }

    /// Token index just past a type starting at `index`, without building
    /// nodes.
    fn scan_type(&self, index: usize) -> Option<usize> {
        self.scan_type_nested(index, 0)
    }

    fn scan_type_nested(&self, mut index: usize, depth: usize) -> Option<usize> {
        if depth >= MAX_NESTING || !self.is_ident(self.tok(index)) {
            return None;
        }
        index += 1;
        while self.text_of(self.tok(index)) == "." && self.is_ident(self.tok(index + 1)) {
            index += 2;
        }
        if self.text_of(self.tok(index)) == "<" {
            index += 1;
            loop {
                index = self.scan_type_nested(index, depth + 1)?;
                if self.text_of(self.tok(index)) == "," {
                    index += 1;
                    continue;
                }
                break;
            }
            if self.text_of(self.tok(index)) != ">" {
                return None;
            }
            index += 1;
        }
        if self.text_of(self.tok(index)) == "?" {
            index += 1;
        }
        while self.text_of(self.tok(index)) == "[" && self.text_of(self.tok(index + 1)) == "]" {
            index += 2;
        }
        Some(index)
    }

    // ----- statements ----------------------------------------------------

    fn block(&mut self) -> Result<NodeId> {
        let start = self.start();
        self.expect("{")?;
        let mut statements = Vec::new();
        while !self.at("}") {
            if self.at_eof() {
                return self.error("expected '}' to close block");
            }
            statements.push(self.statement()?);
        }
        self.expect("}")?;
        Ok(self.finish(NodeKind::Block, start, statements))
    }

    fn statement(&mut self) -> Result<NodeId> {
        self.nested(|p| p.any_statement())
    }

    fn any_statement(&mut self) -> Result<NodeId> {
        let start = self.start();
        let token = self.peek();

        if token.kind == TokenKind::Ident {
            match self.text_of(token) {
                "if" => return self.if_statement(),
                "while" => {
                    self.bump();
                    let condition = self.paren_condition()?;
                    let body = self.statement()?;
                    return Ok(self.finish(NodeKind::WhileStatement, start, vec![condition, body]));
                }
                "do" => {
                    self.bump();
                    let body = self.statement()?;
                    self.expect("while")?;
                    let condition = self.paren_condition()?;
                    self.expect(";")?;
                    return Ok(self.finish(NodeKind::DoStatement, start, vec![body, condition]));
                }
                "foreach" => {
                    self.bump();
                    self.expect("(")?;
                    let ty = self.parse_type()?;
                    let name = self.ident(NodeKind::IdentifierToken)?;
                    self.expect("in")?;
                    let collection = self.expression()?;
                    self.expect(")")?;
                    let body = self.statement()?;
                    return Ok(self.finish(
                        NodeKind::ForEachStatement,
                        start,
                        vec![ty, name, collection, body],
                    ));
                }
                "return" | "throw" => {
                    let kind = if self.text_of(token) == "return" {
                        NodeKind::ReturnStatement
                    } else {
                        NodeKind::ThrowStatement
                    };
                    self.bump();
                    let mut children = Vec::new();
                    if !self.at(";") {
                        children.push(self.expression()?);
                    }
                    self.expect(";")?;
                    return Ok(self.finish(kind, start, children));
                }
                "break" | "continue" => {
                    let kind = if self.text_of(token) == "break" {
                        NodeKind::BreakStatement
                    } else {
                        NodeKind::ContinueStatement
                    };
                    self.bump();
                    self.expect(";")?;
                    return Ok(self.finish(kind, start, Vec::new()));
                }
                "goto" => {
                    self.bump();
                    let label = self.ident(NodeKind::IdentifierName)?;
                    self.expect(";")?;
                    return Ok(self.finish(NodeKind::GotoStatement, start, vec![label]));
                }
                "yield" if self.at_n(1, "return") => {
                    self.bump();
                    self.bump();
                    let value = self.expression()?;
                    self.expect(";")?;
                    return Ok(self.finish(NodeKind::YieldReturnStatement, start, vec![value]));
                }
                "yield" if self.at_n(1, "break") => {
                    self.bump();
                    self.bump();
                    self.expect(";")?;
                    return Ok(self.finish(NodeKind::YieldBreakStatement, start, Vec::new()));
                }
                keyword @ ("for" | "switch" | "try") => {
                    return self.error(format!("'{}' statements are not supported", keyword));
                }
                _ => {}
            }
        }

        if self.at("{") {
            return self.block();
        }
        if self.eat(";") {
            return Ok(self.finish(NodeKind::EmptyStatement, start, Vec::new()));
        }

        if self.is_ident(token) && self.at_n(1, ":") {
            let label = self.ident(NodeKind::IdentifierToken)?;
            self.bump();
            let statement = self.statement()?;
            return Ok(self.finish(NodeKind::LabeledStatement, start, vec![label, statement]));
        }

        while self.at_any(&["const", "static", "async"]) {
            self.bump();
        }
        if self.is_local_declaration() {
            return self.local_declaration(start);
        }

        let expr = self.expression()?;
        self.expect(";")?;
        Ok(self.finish(NodeKind::ExpressionStatement, start, vec![expr]))
    }

    fn is_local_declaration(&self) -> bool {
        match self.scan_type(self.pos) {
            Some(end) => {
                self.is_ident(self.tok(end))
                    && matches!(self.text_of(self.tok(end + 1)), "=" | ";" | "," | "(" | "<")
            }
            None => false,
        }
    }

    fn local_declaration(&mut self, start: usize) -> Result<NodeId> {
        let ty = self.parse_type()?;
        let name = self.ident(NodeKind::IdentifierToken)?;

        if self.at("(") || self.at("<") {
            let mut children = vec![ty, name];
            if self.at("<") {
                children.push(self.type_parameter_list()?);
            }
            children.push(self.parameter_list()?);
            self.skip_constraints();
            if let Some(body) = self.body_or_arrow()? {
                children.push(body);
            }
            return Ok(self.finish(NodeKind::LocalFunctionStatement, start, children));
        }

        let mut children = vec![ty, self.declarator(name)?];
        while self.eat(",") {
            let name = self.ident(NodeKind::IdentifierToken)?;
            children.push(self.declarator(name)?);
        }
        self.expect(";")?;
        Ok(self.finish(NodeKind::LocalDeclarationStatement, start, children))
    }

    fn if_statement(&mut self) -> Result<NodeId> {
        let start = self.start();
        self.expect("if")?;
        let condition = self.paren_condition()?;
        let then_branch = self.statement()?;
        let mut children = vec![condition, then_branch];
        if self.at("else") {
            let else_start = self.start();
            self.bump();
            let statement = self.statement()?;
            children.push(self.finish(NodeKind::ElseClause, else_start, vec![statement]));
        }
        Ok(self.finish(NodeKind::IfStatement, start, children))
    }

    fn paren_condition(&mut self) -> Result<NodeId> {
        self.expect("(")?;
        let condition = self.expression()?;
        self.expect(")")?;
        Ok(condition)
    }

    // ----- expressions ---------------------------------------------------

    fn expression(&mut self) -> Result<NodeId> {
        self.nested(|p| p.assignment())
    }

    fn assignment(&mut self) -> Result<NodeId> {
        if self.at_lambda() {
            return self.lambda();
        }
        let start = self.start();
        let lhs = self.conditional()?;
        if self.peek().kind == TokenKind::Punct && self.at_any(ASSIGNMENT_OPERATORS) {
            let op = self.operator();
            let rhs = self.expression()?;
            return Ok(self.finish(NodeKind::AssignmentExpression, start, vec![lhs, op, rhs]));
        }
        Ok(lhs)
    }

    fn at_lambda(&self) -> bool {
        if self.is_ident(self.peek()) && self.at_n(1, "=>") {
            return true;
        }
        if !self.at("(") {
            return false;
        }
        let mut depth = 0usize;
        let mut index = self.pos;
        loop {
            let token = self.tok(index);
            if token.kind == TokenKind::Eof {
                return false;
            }
            match self.text_of(token) {
                "(" => depth += 1,
                ")" => {
                    depth -= 1;
                    if depth == 0 {
                        return self.text_of(self.tok(index + 1)) == "=>";
                    }
                }
                _ => {}
            }
            index += 1;
        }
    }

    fn lambda(&mut self) -> Result<NodeId> {
        let start = self.start();
        let params = if self.at("(") {
            self.lambda_parameter_list()?
        } else {
            let name = self.ident(NodeKind::IdentifierToken)?;
            let span = self.b.span(name);
            let param = self.b.node(NodeKind::Parameter, span, vec![name]);
            self.b.node(NodeKind::ParameterList, span, vec![param])
        };
        self.expect("=>")?;
        let body = if self.at("{") {
            self.block()?
        } else {
            self.expression()?
        };
        Ok(self.finish(NodeKind::LambdaExpression, start, vec![params, body]))
    }

    fn lambda_parameter_list(&mut self) -> Result<NodeId> {
        let start = self.start();
        self.expect("(")?;
        let mut params = Vec::new();
        if !self.at(")") {
            loop {
                if self.is_ident(self.peek()) && (self.at_n(1, ",") || self.at_n(1, ")")) {
                    let param_start = self.start();
                    let name = self.ident(NodeKind::IdentifierToken)?;
                    params.push(self.finish(NodeKind::Parameter, param_start, vec![name]));
                } else {
                    params.push(self.parameter()?);
                }
                if !self.eat(",") {
                    break;
                }
            }
        }
        self.expect(")")?;
        Ok(self.finish(NodeKind::ParameterList, start, params))
    }

    fn conditional(&mut self) -> Result<NodeId> {
        let start = self.start();
        let condition = self.binary(1)?;
        if self.at("?") {
            self.bump();
            let when_true = self.expression()?;
            self.expect(":")?;
            let when_false = self.expression()?;
            return Ok(self.finish(
                NodeKind::ConditionalExpression,
                start,
                vec![condition, when_true, when_false],
            ));
        }
        Ok(condition)
    }

    fn binary(&mut self, min_precedence: u8) -> Result<NodeId> {
        let start = self.start();
        let mut lhs = self.unary()?;
        loop {
            let token = self.peek();
            if token.kind != TokenKind::Punct {
                break;
            }
            let op_text = self.text_of(token);
            let Some(precedence) = binary_precedence(op_text) else {
                break;
            };
            if precedence < min_precedence {
                break;
            }
            let op = self.operator();
            // `??` is right-associative
            let next = if op_text == "??" {
                precedence
            } else {
                precedence + 1
            };
            let rhs = if op_text == "??" {
                self.nested(|p| p.binary(next))?
            } else {
                self.binary(next)?
            };
            lhs = self.finish(NodeKind::BinaryExpression, start, vec![lhs, op, rhs]);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<NodeId> {
        if self.peek().kind == TokenKind::Punct && self.at_any(PREFIX_OPERATORS) {
            let start = self.start();
            let op = self.operator();
            let operand = self.nested(|p| p.unary())?;
            return Ok(self.finish(NodeKind::PrefixUnaryExpression, start, vec![op, operand]));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<NodeId> {
        let start = self.start();
        let mut expr = self.primary()?;
        loop {
            if self.at(".") || self.at("?.") {
                let kind = if self.at(".") {
                    NodeKind::MemberAccessExpression
                } else {
                    NodeKind::ConditionalAccessExpression
                };
                self.bump();
                let name = self.ident(NodeKind::IdentifierName)?;
                expr = self.finish(kind, start, vec![expr, name]);
            } else if self.at("(") {
                let args = self.argument_list("(", ")", NodeKind::ArgumentList)?;
                expr = self.finish(NodeKind::InvocationExpression, start, vec![expr, args]);
            } else if self.at("[") {
                let args = self.argument_list("[", "]", NodeKind::BracketedArgumentList)?;
                expr = self.finish(NodeKind::ElementAccessExpression, start, vec![expr, args]);
            } else if self.at("++") || self.at("--") {
                let op = self.operator();
                expr = self.finish(NodeKind::PostfixUnaryExpression, start, vec![expr, op]);
            } else {
                return Ok(expr);
            }
        }
    }

    fn argument_list(&mut self, open: &str, close: &str, kind: NodeKind) -> Result<NodeId> {
        let start = self.start();
        self.expect(open)?;
        let mut args = Vec::new();
        if !self.at(close) {
            loop {
                if self.is_ident(self.peek()) && self.at_n(1, ":") {
                    self.bump();
                    self.bump();
                }
                if self.at("ref") || self.at("out") || self.at("in") {
                    self.bump();
                }
                args.push(self.expression()?);
                if !self.eat(",") {
                    break;
                }
            }
        }
        self.expect(close)?;
        Ok(self.finish(kind, start, args))
    }

    fn primary(&mut self) -> Result<NodeId> {
        let start = self.start();
        let token = self.peek();
        let leaf_kind = match token.kind {
            TokenKind::Number => Some(NodeKind::NumericLiteral),
            TokenKind::Str => Some(NodeKind::StringLiteral),
            TokenKind::Char => Some(NodeKind::CharacterLiteral),
            TokenKind::Ident => match self.text_of(token) {
                "true" => Some(NodeKind::TrueLiteral),
                "false" => Some(NodeKind::FalseLiteral),
                "null" => Some(NodeKind::NullLiteral),
                "this" => Some(NodeKind::ThisExpression),
                _ if self.is_ident(token) => Some(NodeKind::IdentifierName),
                _ => None,
            },
            _ => None,
        };
        if let Some(kind) = leaf_kind {
            self.bump();
            return Ok(self.b.leaf(kind, token.span));
        }

        if self.at("(") {
            self.bump();
            let inner = self.expression()?;
            self.expect(")")?;
            return Ok(self.finish(NodeKind::ParenthesizedExpression, start, vec![inner]));
        }
        if self.at("new") {
            return self.creation();
        }
        if self.at("typeof") {
            self.bump();
            self.expect("(")?;
            let ty = self.parse_type()?;
            self.expect(")")?;
            return Ok(self.finish(NodeKind::TypeOfExpression, start, vec![ty]));
        }
        if self.at("default") {
            self.bump();
            let mut children = Vec::new();
            if self.eat("(") {
                children.push(self.parse_type()?);
                self.expect(")")?;
            }
            return Ok(self.finish(NodeKind::DefaultLiteral, start, children));
        }

        self.error(format!(
            "expected expression, found {}",
            self.describe(token)
        ))
    }

    fn creation(&mut self) -> Result<NodeId> {
        let start = self.start();
        self.expect("new")?;

        if self.at("[") {
            self.bump();
            self.expect("]")?;
            let init = self.initializer()?;
            return Ok(self.finish(NodeKind::ArrayCreationExpression, start, vec![init]));
        }
        if self.at("{") {
            let init = self.initializer()?;
            return Ok(self.finish(NodeKind::ObjectCreationExpression, start, vec![init]));
        }

        let ty = self.parse_type()?;
        let is_array = self.b.span(ty).end > 0 && self.text[..self.b.span(ty).end].ends_with(']');
        let mut children = vec![ty];

        if !is_array && self.at("[") {
            children.push(self.argument_list("[", "]", NodeKind::BracketedArgumentList)?);
            if self.at("{") {
                children.push(self.initializer()?);
            }
            return Ok(self.finish(NodeKind::ArrayCreationExpression, start, children));
        }
        if is_array {
            if self.at("{") {
                children.push(self.initializer()?);
            }
            return Ok(self.finish(NodeKind::ArrayCreationExpression, start, children));
        }

        if self.at("(") {
            children.push(self.argument_list("(", ")", NodeKind::ArgumentList)?);
        }
        if self.at("{") {
            children.push(self.initializer()?);
        }
        Ok(self.finish(NodeKind::ObjectCreationExpression, start, children))
    }

    fn initializer(&mut self) -> Result<NodeId> {
        let start = self.start();
        self.expect("{")?;
        let mut items = Vec::new();
        while !self.at("}") {
            items.push(self.var_initializer()?);
            if !self.eat(",") {
                break;
            }
        }
        self.expect("}")?;
        Ok(self.finish(NodeKind::InitializerExpression, start, items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Tree;
    use std::sync::Arc;

    fn parse(text: &str) -> Result<Tree> {
        let parser: Arc<dyn SourceParser> = Arc::new(CurlyParser::new());
        Tree::parse(&parser, text)
    }

    fn kinds(tree: &Tree) -> Vec<NodeKind> {
        tree.descendants(tree.root()).map(|n| tree.kind(n)).collect()
    }

    fn first(tree: &Tree, kind: NodeKind) -> NodeId {
        tree.descendants(tree.root())
            .find(|n| tree.kind(*n) == kind)
            .unwrap()
    }

    #[test]
    fn parses_namespaces_and_usings() {
        let tree = parse("using System.Linq;\nnamespace A.B;\npublic sealed class C { }").unwrap();
        let all = kinds(&tree);
        assert!(all.contains(&NodeKind::UsingDirective));
        assert!(all.contains(&NodeKind::NamespaceDeclaration));
        let name = first(&tree, NodeKind::QualifiedName);
        assert_eq!(tree.text(name), "System.Linq");
    }

    #[test]
    fn binary_precedence_nests_correctly() {
        let tree = parse("class C { bool M() => a || b && c == d + 1; }").unwrap();
        let arrow = first(&tree, NodeKind::ArrowExpressionClause);
        let top = tree.children(arrow)[0];
        assert_eq!(tree.kind(top), NodeKind::BinaryExpression);
        let op = tree.children(top)[1];
        assert_eq!(tree.text(op), "||");
        let rhs = tree.children(top)[2];
        assert_eq!(tree.text(rhs), "b && c == d + 1");
    }

    #[test]
    fn member_access_and_invocation_chain() {
        let tree = parse("class C { void M() { var r = items.Where(x => x == 0).Any(); } }").unwrap();
        let declarator = first(&tree, NodeKind::VariableDeclarator);
        let init = tree.children(declarator)[1];
        assert_eq!(tree.kind(init), NodeKind::InvocationExpression);
        assert_eq!(tree.text(init), "items.Where(x => x == 0).Any()");
        let lambda = first(&tree, NodeKind::LambdaExpression);
        assert_eq!(tree.text(lambda), "x => x == 0");
    }

    #[test]
    fn distinguishes_declarations_from_expressions() {
        let tree = parse(
            "class C { void M() { List<int> xs = null; x = 1; Foo(x); int Add(int a) => a; } }",
        )
        .unwrap();
        let all = kinds(&tree);
        assert!(all.contains(&NodeKind::LocalDeclarationStatement));
        assert!(all.contains(&NodeKind::LocalFunctionStatement));
        assert_eq!(
            all.iter()
                .filter(|k| **k == NodeKind::ExpressionStatement)
                .count(),
            2
        );
    }

    #[test]
    fn if_else_chain_and_jumps() {
        let tree = parse(
            "class C { int M(int v) { if (v == 1) return 1; else if (v == 2) { return 2; } else throw null; } }",
        )
        .unwrap();
        let all = kinds(&tree);
        assert_eq!(all.iter().filter(|k| **k == NodeKind::ElseClause).count(), 2);
        assert!(all.contains(&NodeKind::ThrowStatement));
    }

    #[test]
    fn loops_labels_and_yield() {
        let tree = parse(
            "class C { IEnumerable<int> M() { start: while (true) { foreach (var x in xs) { if (x) break; continue; } goto start; } do { yield return 1; } while (false); yield break; } }",
        )
        .unwrap();
        let all = kinds(&tree);
        for kind in [
            NodeKind::LabeledStatement,
            NodeKind::WhileStatement,
            NodeKind::ForEachStatement,
            NodeKind::BreakStatement,
            NodeKind::ContinueStatement,
            NodeKind::GotoStatement,
            NodeKind::DoStatement,
            NodeKind::YieldReturnStatement,
            NodeKind::YieldBreakStatement,
        ] {
            assert!(all.contains(&kind), "missing {}", kind);
        }
    }

    #[test]
    fn properties_constructors_and_creation() {
        let tree = parse(
            "record Point(int X) { public int Y { get; private set; } = 3; public Point() : this(0) { var a = new int[] { 1, 2 }; var l = new List<int>(); } }",
        )
        .unwrap();
        let all = kinds(&tree);
        assert!(all.contains(&NodeKind::PropertyDeclaration));
        assert!(all.contains(&NodeKind::ConstructorDeclaration));
        assert!(all.contains(&NodeKind::ArrayCreationExpression));
        assert!(all.contains(&NodeKind::ObjectCreationExpression));
    }

    #[test]
    fn children_spans_are_ordered_and_disjoint() {
        let tree = parse("class C { bool M(bool v) { if (v == true) { } return !v; } }").unwrap();
        for node in tree.descendants(tree.root()) {
            for pair in tree.children(node).windows(2) {
                assert!(tree.span(pair[0]).end <= tree.span(pair[1]).start);
            }
        }
    }

    #[test]
    fn reports_missing_closing_brace() {
        let err = parse("class C { void M() { }").unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));
    }

    #[test]
    fn semantically_wrong_code_still_parses() {
        assert!(parse("class C { void M() { undefined.Call(1 + \"x\"); } }").is_ok());
    }

    #[test]
    fn deep_nesting_is_a_syntax_error() {
        let cases = [
            format!("class C {{ int M() => {}1{}; }}", "(".repeat(50_000), ")".repeat(50_000)),
            format!("class C {{ bool M() => {}true; }}", "!".repeat(50_000)),
            format!("class C {{ object M() => a{}; }}", " ?? a".repeat(50_000)),
            format!("class C {{ void M() {}{} }}", "{".repeat(50_000), "}".repeat(50_000)),
            format!("class C {{ {} }}", "class D { ".repeat(50_000)),
            format!("class C {{ object M() => default({}A); }}", "A<".repeat(50_000)),
            format!("class C {{ int M() => 1{}; }}", " + 1".repeat(50_000)),
        ];
        for text in &cases {
            let err = parse(text).unwrap_err();
            assert!(matches!(err, Error::Syntax { .. }));
            assert!(err.to_string().contains("nesting exceeds"), "{}", err);
        }
    }

    #[test]
    fn moderate_nesting_still_parses() {
        let text = format!("class C {{ int M() => {}1{}; }}", "(".repeat(60), ")".repeat(60));
        assert!(parse(&text).is_ok());
    }

    #[test]
    fn fragments_parse_statements_and_members() {
        let parser = CurlyParser::new();
        let mut builder = TreeBuilder::new();
        let root = parser
            .build_fragment(NodeKind::ExpressionStatement, "Log(x + 22);", &mut builder)
            .unwrap()
            .unwrap();
        assert_eq!(builder.kind(root), NodeKind::ExpressionStatement);
        assert_eq!(builder.span(root), TextSpan::new(0, 12));

        let mut builder = TreeBuilder::new();
        let root = parser
            .build_fragment(NodeKind::MethodDeclaration, "public void N() { }", &mut builder)
            .unwrap()
            .unwrap();
        assert_eq!(builder.kind(root), NodeKind::MethodDeclaration);

        let mut builder = TreeBuilder::new();
        assert!(parser
            .build_fragment(NodeKind::ReturnStatement, "return 1; x", &mut builder)
            .unwrap()
            .is_err());
        assert!(parser
            .build_fragment(NodeKind::BinaryExpression, "a + b", &mut TreeBuilder::new())
            .is_none());
    }

    #[test]
    fn unsupported_statements_are_syntax_errors() {
        let err = parse("class C { void M() { for (;;) { } } }").unwrap_err();
        assert!(err.to_string().contains("not supported"));
    }
}
