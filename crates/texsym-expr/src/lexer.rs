//! Tokens of the expression language.

use logos::Logos;

use crate::error::ParseError;

#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // Identifiers and literals
    #[regex(r"[\p{L}_][\p{L}\p{N}_]*")]
    Ident,
    #[regex(r"\d+\.\d*([eE][+-]?\d+)?")]
    #[regex(r"\.\d+([eE][+-]?\d+)?")]
    #[regex(r"\d+[eE][+-]?\d+")]
    Float,
    #[regex(r"\d+")]
    Integer,
    #[regex(r#"'([^'\\\n]|\\.)*'"#)]
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    Str,
    #[token("...")]
    #[token("…")]
    Ellipsis,

    // Operators
    #[token("**")]
    StarStar,
    #[token("^")]
    Caret,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("=")]
    Assign,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannedToken {
    pub token: Token,
    pub lexeme: String,
    pub start: usize,
    pub end: usize,
}

/// Splits `input` into tokens with their source spans.
///
/// # Errors
///
/// [`ParseError::UnexpectedChar`] on input no token matches, and
/// [`ParseError::Truncated`] on an ellipsis.
pub fn tokenize(input: &str) -> Result<Vec<SpannedToken>, ParseError> {
    let mut lex = Token::lexer(input);
    let mut out = Vec::new();
    while let Some(res) = lex.next() {
        let span = lex.span();
        match res {
            Ok(Token::Ellipsis) => return Err(ParseError::Truncated { pos: span.start }),
            Ok(token) => out.push(SpannedToken {
                token,
                lexeme: lex.slice().to_string(),
                start: span.start,
                end: span.end,
            }),
            Err(()) => {
                let ch = lex.slice().chars().next().unwrap_or('\u{fffd}');
                return Err(ParseError::UnexpectedChar {
                    ch,
                    pos: span.start,
                });
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn test_power_operators() {
        assert_eq!(
            kinds("x**2 ^ y"),
            vec![Token::Ident, Token::StarStar, Token::Integer, Token::Caret, Token::Ident]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1 2.5 .5 1e3 3."),
            vec![Token::Integer, Token::Float, Token::Float, Token::Float, Token::Float]
        );
    }

    #[test]
    fn test_relational_tokens() {
        assert_eq!(
            kinds("a = b == c != d <= e >= f < g > h"),
            vec![
                Token::Ident,
                Token::Assign,
                Token::Ident,
                Token::EqEq,
                Token::Ident,
                Token::NotEq,
                Token::Ident,
                Token::Le,
                Token::Ident,
                Token::Ge,
                Token::Ident,
                Token::Lt,
                Token::Ident,
                Token::Gt,
                Token::Ident,
            ]
        );
    }

    #[test]
    fn test_strings_both_quotes() {
        let toks = tokenize(r#"Symbol('x') Symbol("y")"#).unwrap();
        assert_eq!(toks[2].token, Token::Str);
        assert_eq!(toks[2].lexeme, "'x'");
        assert_eq!(toks[6].lexeme, "\"y\"");
    }

    #[test]
    fn test_spans() {
        let toks = tokenize("ab + c").unwrap();
        assert_eq!((toks[0].start, toks[0].end), (0, 2));
        assert_eq!((toks[2].start, toks[2].end), (5, 6));
    }

    #[test]
    fn test_unicode_identifier() {
        let toks = tokenize("θ_1").unwrap();
        assert_eq!(toks.len(), 1);
        assert_eq!(toks[0].token, Token::Ident);
    }

    #[test]
    fn test_ellipsis_is_truncation() {
        assert_eq!(tokenize("x + ... + y"), Err(ParseError::Truncated { pos: 4 }));
        assert!(matches!(tokenize("x + …"), Err(ParseError::Truncated { .. })));
    }

    #[test]
    fn test_unexpected_char() {
        assert_eq!(
            tokenize("x $ y"),
            Err(ParseError::UnexpectedChar { ch: '$', pos: 2 })
        );
    }
}
