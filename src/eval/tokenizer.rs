//! logos-based expression tokenizer.
//!
//! Token priority in logos is determined by:
//! 1. Longest match wins (e.g. `f"x"` as [`Token::FString`] beats `f` as Name)
//! 2. Literal `#[token]`s beat `#[regex]` matches of the same length
//!
//! Our ordering ensures:
//! - `and`, `not`, `None` match their keyword tokens, not [`Token::Name`]
//! - `android` matches [`Token::Name`] (longer than the `and` keyword)
//! - `1.5` matches [`Token::Float`], not `Int` + `Dot` + `Int`
//! - `//` and `**` match their own operators, not two single-char tokens

use std::ops::Range;

use logos::Logos;

use super::EvalError;

/// Expression token produced by the lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    // ── Keywords ─────────────────────────────────────────────────────
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    Not,
    #[token("in")]
    In,
    #[token("is")]
    Is,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("lambda")]
    Lambda,
    #[token("None")]
    NoneKw,
    #[token("True")]
    True,
    #[token("False")]
    False,

    // ── Literals ─────────────────────────────────────────────────────

    /// Formatted string literal: `f"Hello {name}"`.
    #[regex(r#"[fF]"([^"\\\n]|\\.)*""#)]
    #[regex(r#"[fF]'([^'\\\n]|\\.)*'"#)]
    FString,

    /// Quoted string literal, single or double quotes.
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    #[regex(r#"'([^'\\\n]|\\.)*'"#)]
    Str,

    /// Float literal: `1.5`, `1.`, `.5`, `1e3`, `2.5E-3`.
    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?")]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?")]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+")]
    Float,

    /// Integer literal.
    #[regex(r"[0-9]+")]
    Int,

    /// Identifier.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Name,

    // ── Multi-character operators ────────────────────────────────────
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LtE,
    #[token(">=")]
    GtE,
    #[token("//")]
    DoubleSlash,
    #[token("**")]
    DoubleStar,
    #[token("<<")]
    LShift,
    #[token(">>")]
    RShift,
    #[token(":=")]
    Walrus,

    // ── Single-character punctuation ─────────────────────────────────
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("=")]
    Assign,
}

/// A token with its source text and byte span.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub text: String,
    pub span: Range<usize>,
}

/// Tokenize an expression.
///
/// Unlike the lenient CSS tokenizer this one fails on the first character it
/// cannot lex, since a half-understood expression must never be evaluated.
pub fn tokenize(input: &str) -> Result<Vec<Spanned>, EvalError> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(input).spanned() {
        match result {
            Ok(token) => tokens.push(Spanned {
                token,
                text: input[span.clone()].to_string(),
                span,
            }),
            Err(()) => {
                return Err(EvalError::Syntax {
                    position: span.start,
                    message: format!("unexpected character {:?}", &input[span]),
                })
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: tokenize and return just the token variants.
    fn tokens(input: &str) -> Vec<Token> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    fn texts(input: &str) -> Vec<String> {
        tokenize(input).unwrap().into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn keywords_beat_names() {
        assert_eq!(
            tokens("and or not in is if else None True False"),
            vec![
                Token::And,
                Token::Or,
                Token::Not,
                Token::In,
                Token::Is,
                Token::If,
                Token::Else,
                Token::NoneKw,
                Token::True,
                Token::False,
            ]
        );
    }

    #[test]
    fn longer_names_are_not_keywords() {
        assert_eq!(tokens("android iffy Nonesuch"), vec![Token::Name; 3]);
    }

    #[test]
    fn numbers() {
        assert_eq!(
            tokens("1 1.5 1. .5 1e3 2.5E-3"),
            vec![
                Token::Int,
                Token::Float,
                Token::Float,
                Token::Float,
                Token::Float,
                Token::Float,
            ]
        );
    }

    #[test]
    fn strings_with_escapes() {
        let result = texts(r#""a\"b" 'c\'d'"#);
        assert_eq!(result, vec![r#""a\"b""#, r#"'c\'d'"#]);
        assert_eq!(tokens(r#""x" 'y'"#), vec![Token::Str, Token::Str]);
    }

    #[test]
    fn fstring_beats_name() {
        assert_eq!(tokens(r#"f"hi {x}""#), vec![Token::FString]);
        assert_eq!(tokens("f"), vec![Token::Name]);
    }

    #[test]
    fn compound_operators() {
        assert_eq!(
            tokens("== != <= >= // ** << >>"),
            vec![
                Token::EqEq,
                Token::NotEq,
                Token::LtE,
                Token::GtE,
                Token::DoubleSlash,
                Token::DoubleStar,
                Token::LShift,
                Token::RShift,
            ]
        );
    }

    #[test]
    fn subscript_and_attribute() {
        assert_eq!(
            tokens(r#"a["b"].c"#),
            vec![
                Token::Name,
                Token::LBracket,
                Token::Str,
                Token::RBracket,
                Token::Dot,
                Token::Name,
            ]
        );
    }

    #[test]
    fn spans_point_into_source() {
        let toks = tokenize("  foo + 1").unwrap();
        assert_eq!(toks[0].span, 2..5);
        assert_eq!(toks[2].span, 8..9);
    }

    #[test]
    fn unknown_character_is_syntax_error() {
        let err = tokenize("a $ b").unwrap_err();
        assert!(matches!(err, EvalError::Syntax { position: 2, .. }));
    }

    #[test]
    fn whitespace_only() {
        assert!(tokens(" \t\n ").is_empty());
    }
}
