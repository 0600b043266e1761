//! Lossless C# tokenizer
//!
//! Every byte of the input ends up in exactly one token: whitespace,
//! comments and preprocessor lines are emitted as trivia instead of
//! being skipped. Keywords are plain identifiers; the parser tells them
//! apart by text. Unrecognized input becomes `Unknown` tokens so the
//! parser can recover around it.

use crate::syntax::SyntaxKind;
use log::debug;
use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    #[regex(r"[ \t\r\n\x0C]+")]
    Whitespace,

    #[regex(r"//[^\n]*")]
    LineComment,

    /// Preprocessor directives are carried along as line trivia
    #[regex(r"#[^\n]*")]
    Directive,

    #[token("/*", block_comment)]
    BlockComment,

    #[regex(r"@?[\p{L}\p{Nl}_][\p{L}\p{Nl}\p{Nd}\p{Mn}\p{Mc}\p{Pc}\p{Cf}]*")]
    Ident,

    #[regex(r"[0-9][0-9A-Za-z_]*(\.[0-9][0-9A-Za-z_]*)?")]
    Number,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    #[regex(r#"\$"([^"\\\n]|\\.)*""#)]
    #[regex(r#"(@|\$@|@\$)"([^"]|"")*""#)]
    #[regex(r#"\$*""""#, raw_string)]
    String,

    #[regex(r"'([^'\\\n]|\\[^\n][^'\n]*)'")]
    Char,

    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,
    #[token("=")]
    Eq,
    #[token("=>")]
    Arrow,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("?")]
    Question,

    // `>>` is left out so nested generic argument lists close one `>` at a time
    #[regex(r"[-+*/%&|^!~]=?")]
    #[token("==")]
    #[token("<=")]
    #[token(">=")]
    #[token("&&")]
    #[token("||")]
    #[token("++")]
    #[token("--")]
    #[token("<<")]
    #[token("<<=")]
    #[token("->")]
    #[token("::")]
    #[token("??")]
    #[token("??=")]
    #[token("?.")]
    #[token("..")]
    Operator,
}

/// Consume a block comment body up to and including the closing `*/`.
/// An unterminated comment runs to the end of input as an `Unknown` token.
fn block_comment(lex: &mut logos::Lexer<Token>) -> bool {
    let remainder = lex.remainder();
    match remainder.find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            true
        }
        None => {
            lex.bump(remainder.len());
            false
        }
    }
}

/// Consume a raw string literal. The opening fence may be longer than
/// three quotes; the literal ends at the first run of the same length.
fn raw_string(lex: &mut logos::Lexer<Token>) -> bool {
    let extra = lex.remainder().bytes().take_while(|&b| b == b'"').count();
    lex.bump(extra);
    let fence = "\"".repeat(3 + extra);
    let remainder = lex.remainder();
    match remainder.find(&fence) {
        Some(end) => {
            lex.bump(end + fence.len());
            true
        }
        None => {
            lex.bump(remainder.len());
            false
        }
    }
}

impl Token {
    fn kind(self) -> SyntaxKind {
        match self {
            Token::Whitespace => SyntaxKind::Whitespace,
            Token::LineComment | Token::Directive => SyntaxKind::LineComment,
            Token::BlockComment => SyntaxKind::BlockComment,
            Token::Ident => SyntaxKind::Ident,
            Token::Number => SyntaxKind::Number,
            Token::String => SyntaxKind::String,
            Token::Char => SyntaxKind::Char,
            Token::LBrace => SyntaxKind::LBrace,
            Token::RBrace => SyntaxKind::RBrace,
            Token::LParen => SyntaxKind::LParen,
            Token::RParen => SyntaxKind::RParen,
            Token::LBracket => SyntaxKind::LBracket,
            Token::RBracket => SyntaxKind::RBracket,
            Token::Semicolon => SyntaxKind::Semicolon,
            Token::Comma => SyntaxKind::Comma,
            Token::Dot => SyntaxKind::Dot,
            Token::Colon => SyntaxKind::Colon,
            Token::Eq => SyntaxKind::Eq,
            Token::Arrow => SyntaxKind::Arrow,
            Token::Lt => SyntaxKind::Lt,
            Token::Gt => SyntaxKind::Gt,
            Token::Question => SyntaxKind::Question,
            Token::Operator => SyntaxKind::Operator,
        }
    }
}

/// Split `text` into `(kind, text)` pairs whose concatenation is `text`
pub fn tokenize(text: &str) -> Vec<(SyntaxKind, &str)> {
    let mut lexer = Token::lexer(text);
    let mut tokens: Vec<(SyntaxKind, &str)> = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token.kind(), lexer.slice())),
            Err(()) => {
                let span = lexer.span();
                debug!("unrecognized input at offset {}", span.start);
                // Tokens are contiguous, so a preceding `Unknown` ends at `span.start`
                match tokens.last_mut() {
                    Some((SyntaxKind::Unknown, prev)) => {
                        *prev = &text[span.start - prev.len()..span.end];
                    }
                    _ => tokens.push((SyntaxKind::Unknown, lexer.slice())),
                }
            }
        }
    }

    tokens
}
