//! Recovering recursive-descent parser for C# declarations
//!
//! Only the declaration skeleton is structured: usings, namespaces, type
//! declarations, attributes, methods and their parameters. Everything else
//! (properties, fields, statements inside bodies) is kept as flat tokens
//! under an opaque node so the tree still round-trips to the exact input.

use super::lexer::tokenize;
use crate::plugin::ParseError;
use crate::syntax::{Checkpoint, GreenNode, GreenNodeBuilder, SyntaxKind};
use SyntaxKind::{
    Arrow, Attribute, AttributeArgument, AttributeArgumentList, AttributeList, AttributeTarget,
    Block, BlockComment, Colon, Comma, CompilationUnit, DefaultValue, Dot, Eq, Error,
    ExpressionBody, Gt, Ident, LBrace, LBracket, LParen, LineComment, Lt, MemberDecl,
    MethodDecl, ModifierList, Name, NamespaceDecl, Operator, Parameter, ParameterList, Question,
    RBrace, RBracket, RParen, Semicolon, TypeDecl, TypeParameterList, TypeRef, UsingDirective,
};
use log::trace;
use std::sync::Arc;

/// Maximum nesting of namespaces and type declarations
pub const MAX_DEPTH: usize = 128;

const MODIFIERS: &[&str] = &[
    "public",
    "private",
    "protected",
    "internal",
    "static",
    "abstract",
    "sealed",
    "virtual",
    "override",
    "readonly",
    "partial",
    "async",
    "extern",
    "unsafe",
    "new",
    "const",
    "volatile",
    "required",
    "file",
    "fixed",
];

const PARAMETER_MODIFIERS: &[&str] = &["ref", "out", "in", "params", "this", "scoped", "readonly"];

const TYPE_KEYWORDS: &[&str] = &["class", "struct", "interface", "enum"];

/// Attribute names that flag a declaration as generated code
const GENERATED_ATTRIBUTES: &[&str] = &["GeneratedCode", "CompilerGenerated"];

/// Parse a C# compilation unit into a green tree
pub fn parse(text: &str) -> Result<Arc<GreenNode>, ParseError> {
    let tokens = tokenize(text);
    trace!("lexed {} tokens", tokens.len());
    Parser::new(tokens).parse_compilation_unit()
}

struct Parser<'t> {
    tokens: Vec<(SyntaxKind, &'t str)>,
    /// Indices of non-trivia tokens, ascending
    significant: Vec<usize>,
    pos: usize,
    offset: usize,
    depth: usize,
    builder: GreenNodeBuilder,
}

impl<'t> Parser<'t> {
    fn new(tokens: Vec<(SyntaxKind, &'t str)>) -> Self {
        let significant = tokens
            .iter()
            .enumerate()
            .filter(|(_, (kind, _))| !kind.is_trivia())
            .map(|(i, _)| i)
            .collect();
        Self {
            tokens,
            significant,
            pos: 0,
            offset: 0,
            depth: 0,
            builder: GreenNodeBuilder::new(),
        }
    }

    // Token access

    /// The `n`th non-trivia token at or after the cursor
    fn nth(&self, n: usize) -> Option<(SyntaxKind, &'t str)> {
        let first = self.significant.partition_point(|&i| i < self.pos);
        let index = *self.significant.get(first + n)?;
        self.tokens.get(index).copied()
    }

    fn peek(&self) -> Option<SyntaxKind> {
        self.nth(0).map(|(kind, _)| kind)
    }

    fn nth_is(&self, n: usize, kind: SyntaxKind) -> bool {
        self.nth(n).is_some_and(|(k, _)| k == kind)
    }

    fn at(&self, kind: SyntaxKind) -> bool {
        self.nth_is(0, kind)
    }

    fn nth_keyword(&self, n: usize, keyword: &str) -> bool {
        self.nth(n) == Some((Ident, keyword))
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.nth_keyword(0, keyword)
    }

    fn at_any_keyword(&self, keywords: &[&str]) -> bool {
        matches!(self.nth(0), Some((Ident, text)) if keywords.contains(&text))
    }

    fn at_operator(&self, n: usize, op: &str) -> bool {
        self.nth(n) == Some((Operator, op))
    }

    /// Move trivia at the cursor into the innermost open node
    fn eat_trivia(&mut self) {
        while let Some(&(kind, text)) = self.tokens.get(self.pos) {
            if !kind.is_trivia() {
                break;
            }
            self.builder.token(kind, text);
            self.pos += 1;
            self.offset += text.len();
        }
    }

    /// Emit the next non-trivia token, preceded by any trivia
    fn bump(&mut self) {
        self.eat_trivia();
        if let Some(&(kind, text)) = self.tokens.get(self.pos) {
            self.builder.token(kind, text);
            self.pos += 1;
            self.offset += text.len();
        }
    }

    fn bump_n(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    fn expect(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    // Node construction; leading trivia stays with the parent so node spans
    // start at their first real token.

    fn start(&mut self, kind: SyntaxKind) {
        self.eat_trivia();
        self.builder.start_node(kind);
    }

    fn checkpoint(&mut self) -> Checkpoint {
        self.eat_trivia();
        self.builder.checkpoint()
    }

    fn finish(&mut self) {
        self.builder.finish_node();
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::TooDeep {
                offset: self.offset,
                limit: MAX_DEPTH,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // Lookahead scanning over significant tokens

    /// Skip a bracketed group starting at significant index `n`.
    /// Returns the index just past the matching close token.
    fn scan_group(&self, n: usize, open: SyntaxKind, close: SyntaxKind) -> Option<usize> {
        let mut depth = 0usize;
        let mut i = n;
        loop {
            let (kind, _) = self.nth(i)?;
            match kind {
                k if k == open => depth += 1,
                k if k == close => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i + 1);
                    }
                }
                LBrace | RBrace | Semicolon if open == Lt => return None,
                Eq | Arrow if open == Lt => return None,
                _ => {}
            }
            i += 1;
        }
    }

    /// Index just past a type reference starting at significant index `n`
    fn scan_type(&self, n: usize) -> Option<usize> {
        let mut i = n;
        if self.nth_is(i, LParen) {
            i = self.scan_group(i, LParen, RParen)?;
        } else {
            if !self.nth_is(i, Ident) {
                return None;
            }
            i += 1;
            loop {
                if self.nth_is(i, Lt) {
                    i = self.scan_group(i, Lt, Gt)?;
                } else if (self.nth_is(i, Dot) || self.at_operator(i, "::"))
                    && self.nth_is(i + 1, Ident)
                {
                    i += 2;
                } else {
                    break;
                }
            }
        }

        loop {
            if self.nth_is(i, Question) || self.at_operator(i, "*") {
                i += 1;
            } else if self.nth_is(i, LBracket) {
                i = self.scan_group(i, LBracket, RBracket)?;
            } else {
                return Some(i);
            }
        }
    }

    /// Whether the member at the cursor is a method or constructor.
    /// Returns whether it has a return type.
    fn scan_method(&self) -> Option<bool> {
        if self.nth_is(0, Ident) && self.nth_is(1, LParen) {
            return Some(false);
        }

        let mut i = self.scan_type(0)?;
        if !self.nth_is(i, Ident) {
            return None;
        }
        i += 1;
        // Explicit interface implementation: `void IFoo.Bar()`
        while self.nth_is(i, Dot) && self.nth_is(i + 1, Ident) {
            i += 2;
        }
        if self.nth_is(i, Lt) {
            i = self.scan_group(i, Lt, Gt)?;
        }
        self.nth_is(i, LParen).then_some(true)
    }

    /// Consume a balanced group as flat tokens
    fn bump_group(&mut self, open: SyntaxKind, close: SyntaxKind) {
        let mut depth = 0usize;
        while let Some(kind) = self.peek() {
            if kind == open {
                depth += 1;
            } else if kind == close {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    self.bump();
                    return;
                }
            }
            self.bump();
        }
    }

    /// Consume tokens until one of `stops` at nesting depth zero.
    /// Braces, parentheses and brackets are skipped as groups.
    fn bump_until(&mut self, stops: &[SyntaxKind]) {
        while let Some(kind) = self.peek() {
            if stops.contains(&kind) {
                return;
            }
            match kind {
                LBrace => self.bump_group(LBrace, RBrace),
                LParen => self.bump_group(LParen, RParen),
                LBracket => self.bump_group(LBracket, RBracket),
                RBrace | RParen | RBracket => return,
                _ => self.bump(),
            }
        }
    }

    // Grammar

    fn has_generated_header(&self) -> bool {
        self.tokens
            .iter()
            .take_while(|(kind, _)| kind.is_trivia())
            .any(|(kind, text)| {
                matches!(kind, LineComment | BlockComment) && text.contains("<auto-generated")
            })
    }

    fn parse_compilation_unit(mut self) -> Result<Arc<GreenNode>, ParseError> {
        self.builder.start_node(CompilationUnit);
        if self.has_generated_header() {
            self.builder.mark_generated();
        }
        self.parse_members(false)?;
        self.eat_trivia();
        self.builder.finish_node();
        Ok(self.builder.finish())
    }

    /// Members until end of input, or until `}` when `in_braces`
    fn parse_members(&mut self, in_braces: bool) -> Result<(), ParseError> {
        while let Some(kind) = self.peek() {
            match kind {
                RBrace if in_braces => break,
                RBrace | RParen | RBracket => {
                    self.start(Error);
                    self.bump();
                    self.finish();
                }
                _ => {
                    self.eat_trivia();
                    let before = self.pos;
                    self.parse_member()?;
                    if self.pos == before {
                        self.start(Error);
                        self.bump();
                        self.finish();
                    }
                }
            }
        }
        Ok(())
    }

    fn parse_member(&mut self) -> Result<(), ParseError> {
        if (self.at_keyword("using") && !self.nth_is(1, LParen))
            || (self.at_keyword("global") && self.nth_keyword(1, "using"))
        {
            self.parse_using();
            Ok(())
        } else if self.at_keyword("namespace") {
            self.parse_namespace()
        } else {
            self.parse_declaration()
        }
    }

    fn parse_using(&mut self) {
        self.start(UsingDirective);
        while let Some(kind) = self.peek() {
            match kind {
                LBrace | RBrace => break,
                Semicolon => {
                    self.bump();
                    break;
                }
                _ => self.bump(),
            }
        }
        self.finish();
    }

    fn parse_namespace(&mut self) -> Result<(), ParseError> {
        self.enter()?;
        self.start(NamespaceDecl);
        self.bump();
        if self.at(Ident) {
            self.parse_name();
        }
        if self.expect(LBrace) {
            self.parse_members(true)?;
            self.expect(RBrace);
        } else if self.expect(Semicolon) {
            // File-scoped: the rest of the file belongs to the namespace
            self.parse_members(false)?;
        }
        self.finish();
        self.leave();
        Ok(())
    }

    /// Attributes and modifiers, then whichever declaration they belong to
    fn parse_declaration(&mut self) -> Result<(), ParseError> {
        let checkpoint = self.checkpoint();

        let mut generated = false;
        while self.at(LBracket) {
            generated |= self.parse_attribute_list();
        }
        self.parse_modifiers(MODIFIERS);

        let is_type = self.at_any_keyword(TYPE_KEYWORDS)
            || (self.at_keyword("record") && self.nth_is(1, Ident));
        if is_type {
            self.builder.start_node_at(checkpoint, TypeDecl);
            if generated {
                self.builder.mark_generated();
            }
            self.parse_type_rest()?;
        } else if let Some(has_return_type) = self.scan_method() {
            self.builder.start_node_at(checkpoint, MethodDecl);
            if generated {
                self.builder.mark_generated();
            }
            self.parse_method_rest(has_return_type);
        } else {
            self.builder.start_node_at(checkpoint, MemberDecl);
            if generated {
                self.builder.mark_generated();
            }
            self.parse_opaque_member();
        }
        self.finish();
        Ok(())
    }

    fn parse_modifiers(&mut self, modifiers: &[&str]) {
        if !self.at_any_keyword(modifiers) {
            return;
        }
        self.start(ModifierList);
        while self.at_any_keyword(modifiers) {
            self.bump();
        }
        self.finish();
    }

    /// Returns whether any attribute in the list marks generated code
    fn parse_attribute_list(&mut self) -> bool {
        let mut generated = false;
        self.start(AttributeList);
        self.bump();

        if self.nth_is(0, Ident) && self.nth_is(1, Colon) {
            self.start(AttributeTarget);
            self.bump_n(2);
            self.finish();
        }

        while let Some(kind) = self.peek() {
            match kind {
                RBracket => {
                    self.bump();
                    break;
                }
                LBrace | RBrace | Semicolon => break,
                Comma => self.bump(),
                Ident => {
                    let name = self.parse_attribute();
                    let short = name.strip_suffix("Attribute").unwrap_or(&name);
                    generated |= GENERATED_ATTRIBUTES.contains(&short);
                }
                _ => self.bump(),
            }
        }

        self.finish();
        generated
    }

    /// Returns the last segment of the attribute name
    fn parse_attribute(&mut self) -> String {
        self.start(Attribute);
        let name = self.parse_name();
        if self.at(LParen) {
            self.parse_attribute_arguments();
        }
        self.finish();
        name
    }

    fn parse_attribute_arguments(&mut self) {
        self.start(AttributeArgumentList);
        self.bump();
        while let Some(kind) = self.peek() {
            match kind {
                RParen => {
                    self.bump();
                    break;
                }
                Semicolon | LBrace | RBrace | RBracket => break,
                Comma => self.bump(),
                _ => {
                    self.start(AttributeArgument);
                    let before = self.pos;
                    self.bump_until(&[Comma, Semicolon]);
                    if self.pos == before {
                        self.bump();
                    }
                    self.finish();
                }
            }
        }
        self.finish();
    }

    /// Dotted name with optional generic arguments; returns the last segment
    fn parse_name(&mut self) -> String {
        self.start(Name);
        let mut last = String::new();
        if let Some((Ident, text)) = self.nth(0) {
            last = text.to_string();
            self.bump();
        }
        while (self.at(Dot) || self.at_operator(0, "::")) && self.nth_is(1, Ident) {
            if let Some((_, text)) = self.nth(1) {
                last = text.to_string();
            }
            self.bump_n(2);
        }
        if self.at(Lt) && self.scan_group(0, Lt, Gt).is_some() {
            self.bump_group(Lt, Gt);
        }
        self.finish();
        last
    }

    fn parse_type_ref(&mut self) {
        self.start(TypeRef);
        let end = self.scan_type(0).unwrap_or(1).max(1);
        self.bump_n(end);
        self.finish();
    }

    fn parse_type_parameters(&mut self) {
        self.start(TypeParameterList);
        self.bump_group(Lt, Gt);
        self.finish();
    }

    fn parse_type_rest(&mut self) -> Result<(), ParseError> {
        let is_enum = self.at_keyword("enum");
        if self.at_keyword("record") {
            self.bump();
            if self.at_keyword("class") || self.at_keyword("struct") {
                self.bump();
            }
        } else {
            self.bump();
        }

        self.expect(Ident);
        if self.at(Lt) {
            self.parse_type_parameters();
        }
        if self.at(LParen) {
            self.parse_parameter_list();
        }

        // Base list and constraints
        while let Some(kind) = self.peek() {
            match kind {
                LBrace | Semicolon | RBrace => break,
                LParen => self.bump_group(LParen, RParen),
                _ => self.bump(),
            }
        }

        if self.at(LBrace) {
            if is_enum {
                self.bump_group(LBrace, RBrace);
            } else {
                self.enter()?;
                self.bump();
                self.parse_members(true)?;
                self.expect(RBrace);
                self.leave();
            }
        }
        self.expect(Semicolon);
        Ok(())
    }

    fn parse_method_rest(&mut self, has_return_type: bool) {
        if has_return_type {
            self.parse_type_ref();
        }

        self.expect(Ident);
        while self.at(Dot) && self.nth_is(1, Ident) {
            self.bump_n(2);
        }
        if self.at(Lt) {
            self.parse_type_parameters();
        }
        self.parse_parameter_list();

        // Constructor initializer and constraints
        while let Some(kind) = self.peek() {
            match kind {
                LBrace | Arrow | Semicolon | RBrace => break,
                LParen => self.bump_group(LParen, RParen),
                _ => self.bump(),
            }
        }

        match self.peek() {
            Some(LBrace) => {
                self.start(Block);
                self.bump_group(LBrace, RBrace);
                self.finish();
            }
            Some(Arrow) => {
                self.start(ExpressionBody);
                self.bump();
                self.bump_until(&[Semicolon]);
                self.expect(Semicolon);
                self.finish();
            }
            Some(Semicolon) => self.bump(),
            _ => {}
        }
    }

    fn parse_parameter_list(&mut self) {
        self.start(ParameterList);
        self.expect(LParen);
        while let Some(kind) = self.peek() {
            match kind {
                RParen => {
                    self.bump();
                    break;
                }
                LBrace | RBrace | Semicolon => break,
                Comma => self.bump(),
                _ => self.parse_parameter(),
            }
        }
        self.finish();
    }

    fn parse_parameter(&mut self) {
        self.start(Parameter);
        let before = self.pos;

        while self.at(LBracket) {
            self.parse_attribute_list();
        }
        self.parse_modifiers(PARAMETER_MODIFIERS);

        let typed = self
            .scan_type(0)
            .is_some_and(|end| self.nth_is(end, Ident));
        if typed {
            self.parse_type_ref();
            self.bump();
            if self.at(Eq) {
                self.start(DefaultValue);
                self.bump();
                self.bump_until(&[Comma]);
                self.finish();
            }
        } else {
            self.bump_until(&[Comma]);
        }

        if self.pos == before {
            self.bump();
        }
        self.finish();
    }

    /// Property, field, event, operator or statement kept as flat tokens
    fn parse_opaque_member(&mut self) {
        while let Some(kind) = self.peek() {
            match kind {
                Semicolon => {
                    self.bump();
                    break;
                }
                RBrace | RParen | RBracket => break,
                LBrace => {
                    self.bump_group(LBrace, RBrace);
                    // Property initializers and expression bodies continue
                    if !matches!(
                        self.peek(),
                        Some(Semicolon | Eq | Arrow | Comma | Dot | Operator | RParen)
                    ) {
                        break;
                    }
                }
                LParen => self.bump_group(LParen, RParen),
                LBracket => self.bump_group(LBracket, RBracket),
                _ => self.bump(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::SyntaxNode;
    use pretty_assertions::assert_eq;

    fn root(text: &str) -> SyntaxNode {
        SyntaxNode::new_root(parse(text).unwrap())
    }

    fn find(root: &SyntaxNode, kind: SyntaxKind) -> Vec<SyntaxNode> {
        root.descendants().filter(|n| n.kind() == kind).collect()
    }

    #[test]
    fn test_round_trip() {
        let sources = [
            "",
            "[Obsolete()]",
            "using System;\nnamespace A.B { class C { int x = 1; } }\n",
            "namespace A;\npublic partial class C<T> : Base where T : new() {\n  partial void M(int x);\n}\n",
            "class C { public int P { get; set; } = 4; void M() => Foo(); }",
            "}} unmatched ) ] [ { ",
            "var x = new Foo { A = 1 };\nConsole.WriteLine(x);",
        ];
        for source in sources {
            assert_eq!(root(source).text(), source);
        }
    }

    #[test]
    fn test_attribute_structure() {
        let tree = root("[Obsolete()]");
        let attribute = &find(&tree, Attribute)[0];
        assert_eq!(attribute.text(), "Obsolete()");

        let arguments = attribute.first_child_of_kind(AttributeArgumentList).unwrap();
        assert_eq!(arguments.text(), "()");
        assert_eq!(arguments.span().start, 9);
        assert!(!arguments.has_child_of_kind(AttributeArgument));
    }

    #[test]
    fn test_attribute_arguments_and_target() {
        let tree = root("[assembly: Foo(1, Name = \"x\"), Bar]");
        assert_eq!(find(&tree, AttributeTarget)[0].text(), "assembly:");
        let attributes = find(&tree, Attribute);
        assert_eq!(attributes.len(), 2);
        assert_eq!(find(&tree, AttributeArgument).len(), 2);
        assert_eq!(attributes[1].text(), "Bar");
    }

    #[test]
    fn test_method_declarations() {
        let tree = root(
            "partial class C {\n  partial void M(int x, ref List<string> items = null);\n  partial void M(int y, ref List<string> items) { }\n}",
        );
        let methods = find(&tree, MethodDecl);
        assert_eq!(methods.len(), 2);
        assert!(!methods[0].has_child_of_kind(Block));
        assert!(methods[1].has_child_of_kind(Block));

        let parameters = find(&methods[0], Parameter);
        assert_eq!(parameters.len(), 2);
        assert_eq!(parameters[0].text(), "int x");
        assert_eq!(parameters[1].text(), "ref List<string> items = null");
        assert!(parameters[1].has_child_of_kind(DefaultValue));
        assert_eq!(
            parameters[1].first_child_of_kind(TypeRef).unwrap().text(),
            "List<string>"
        );
    }

    #[test]
    fn test_opaque_members() {
        let tree = root("class C { public int P { get; set; } int f; C() { } }");
        assert_eq!(find(&tree, MemberDecl).len(), 2);
        assert_eq!(find(&tree, MethodDecl).len(), 1);
    }

    #[test]
    fn test_generated_header() {
        let tree = root("// <auto-generated>\nclass C { }");
        assert!(tree.green().is_generated());

        let tree = root("class C { }");
        assert!(!tree.green().is_generated());
    }

    #[test]
    fn test_generated_attribute_marks_declaration() {
        let tree = root(
            "class C {\n  [System.CodeDom.Compiler.GeneratedCode(\"tool\", \"1.0\")]\n  void A() { }\n  [CompilerGeneratedAttribute]\n  int b;\n  void C() { }\n}",
        );
        let generated: Vec<_> = tree
            .descendants()
            .filter(|n| n.green().is_generated())
            .map(|n| n.kind())
            .collect();
        assert_eq!(generated, vec![MethodDecl, MemberDecl]);
    }

    #[test]
    fn test_node_spans_exclude_leading_trivia() {
        let tree = root("class C {\n  // note\n  void M() { }\n}");
        let method = &find(&tree, MethodDecl)[0];
        assert_eq!(method.text(), "void M() { }");
    }

    #[test]
    fn test_too_deep() {
        let depth = MAX_DEPTH + 1;
        let source = format!("{}{}", "class C {".repeat(depth), "}".repeat(depth));
        assert!(matches!(parse(&source), Err(ParseError::TooDeep { .. })));
    }
}
