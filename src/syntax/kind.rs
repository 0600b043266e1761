//! Closed enumeration of syntax kinds

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind tag carried by every node and token in a syntax tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u16)]
pub enum SyntaxKind {
    // Trivia
    Whitespace,
    LineComment,
    BlockComment,

    // Tokens
    Ident,
    Number,
    String,
    Char,
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Dot,
    Colon,
    Eq,
    Arrow,
    Lt,
    Gt,
    Question,
    Operator,
    /// Input the lexer does not recognize
    Unknown,

    // Nodes
    CompilationUnit,
    UsingDirective,
    NamespaceDecl,
    TypeDecl,
    MethodDecl,
    MemberDecl,
    ModifierList,
    AttributeList,
    AttributeTarget,
    Attribute,
    AttributeArgumentList,
    AttributeArgument,
    Name,
    TypeRef,
    TypeParameterList,
    ParameterList,
    Parameter,
    DefaultValue,
    Block,
    ExpressionBody,
    Error,
}

impl SyntaxKind {
    /// Every kind, in discriminant order
    pub const ALL: &'static [SyntaxKind] = &[
        SyntaxKind::Whitespace,
        SyntaxKind::LineComment,
        SyntaxKind::BlockComment,
        SyntaxKind::Ident,
        SyntaxKind::Number,
        SyntaxKind::String,
        SyntaxKind::Char,
        SyntaxKind::LBrace,
        SyntaxKind::RBrace,
        SyntaxKind::LParen,
        SyntaxKind::RParen,
        SyntaxKind::LBracket,
        SyntaxKind::RBracket,
        SyntaxKind::Semicolon,
        SyntaxKind::Comma,
        SyntaxKind::Dot,
        SyntaxKind::Colon,
        SyntaxKind::Eq,
        SyntaxKind::Arrow,
        SyntaxKind::Lt,
        SyntaxKind::Gt,
        SyntaxKind::Question,
        SyntaxKind::Operator,
        SyntaxKind::Unknown,
        SyntaxKind::CompilationUnit,
        SyntaxKind::UsingDirective,
        SyntaxKind::NamespaceDecl,
        SyntaxKind::TypeDecl,
        SyntaxKind::MethodDecl,
        SyntaxKind::MemberDecl,
        SyntaxKind::ModifierList,
        SyntaxKind::AttributeList,
        SyntaxKind::AttributeTarget,
        SyntaxKind::Attribute,
        SyntaxKind::AttributeArgumentList,
        SyntaxKind::AttributeArgument,
        SyntaxKind::Name,
        SyntaxKind::TypeRef,
        SyntaxKind::TypeParameterList,
        SyntaxKind::ParameterList,
        SyntaxKind::Parameter,
        SyntaxKind::DefaultValue,
        SyntaxKind::Block,
        SyntaxKind::ExpressionBody,
        SyntaxKind::Error,
    ];

    /// Number of kinds; sizes per-kind dispatch tables
    pub const COUNT: usize = SyntaxKind::ALL.len();

    /// Dense index usable for per-kind tables
    pub fn index(self) -> usize {
        self as usize
    }

    /// Whitespace and comments
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            SyntaxKind::Whitespace | SyntaxKind::LineComment | SyntaxKind::BlockComment
        )
    }

    /// Leaf kinds that carry source text
    pub fn is_token(self) -> bool {
        self < SyntaxKind::CompilationUnit
    }
}

impl fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_in_discriminant_order() {
        for (i, kind) in SyntaxKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i, "{:?} out of order", kind);
        }
        assert_eq!(SyntaxKind::COUNT, SyntaxKind::Error.index() + 1);
    }

    #[test]
    fn test_token_and_trivia() {
        assert!(SyntaxKind::Whitespace.is_trivia());
        assert!(SyntaxKind::Whitespace.is_token());
        assert!(SyntaxKind::Operator.is_token());
        assert!(SyntaxKind::Unknown.is_token());
        assert!(!SyntaxKind::Unknown.is_trivia());
        assert!(!SyntaxKind::Ident.is_trivia());
        assert!(!SyntaxKind::Attribute.is_token());
        assert!(!SyntaxKind::CompilationUnit.is_token());
    }
}
