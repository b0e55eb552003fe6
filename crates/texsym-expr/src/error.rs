//! Error types for lexing, parsing and tree construction.

use thiserror::Error;

/// A constructor rejected its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Wrong number of positional arguments.
    #[error("{name}() takes {expected} argument(s), got {got}")]
    Arity {
        /// Callee name.
        name: String,
        /// Human-readable expectation, e.g. `"1"` or `"2 to 4"`.
        expected: String,
        /// Number received.
        got: usize,
    },

    /// An argument has the wrong shape.
    #[error("{name}(): {message}")]
    InvalidArgument {
        /// Callee name.
        name: String,
        /// What was wrong.
        message: String,
    },

    /// A keyword argument the callee does not accept.
    #[error("{name}() got an unexpected keyword argument '{keyword}'")]
    UnknownKeyword {
        /// Callee name.
        name: String,
        /// The keyword.
        keyword: String,
    },
}

impl BuildError {
    /// Shorthand for [`BuildError::InvalidArgument`].
    pub fn invalid(name: &str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.to_owned(),
            message: message.into(),
        }
    }
}

/// Failure to turn a source string into an [`Expr`](crate::Expr).
///
/// Positions are byte offsets into the source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The lexer found a character it cannot start a token with.
    #[error("unexpected character {ch:?} at {pos}")]
    UnexpectedChar {
        /// The offending character.
        ch: char,
        /// Byte offset.
        pos: usize,
    },

    /// A token that does not fit the grammar here.
    #[error("unexpected {found} at {pos}, expected {expected}")]
    UnexpectedToken {
        /// Lexeme found.
        found: String,
        /// What would have fit.
        expected: String,
        /// Byte offset.
        pos: usize,
    },

    /// Input ended mid-expression.
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof {
        /// What would have fit.
        expected: String,
    },

    /// An ellipsis (`...` or `…`) marks elided content.
    #[error("expression is truncated: ellipsis at {pos}")]
    Truncated {
        /// Byte offset.
        pos: usize,
    },

    /// A bare name not bound in the namespace.
    #[error("name '{0}' is not defined")]
    UnknownName(String),

    /// A called name not bound in the namespace.
    #[error("function '{0}' is not defined")]
    UnknownFunction(String),

    /// A call on something that is not a function.
    #[error("'{0}' is not callable")]
    NotCallable(String),

    /// A subscript on something that is not an indexed base.
    #[error("'{0}' is not subscriptable")]
    NotSubscriptable(String),

    /// An integer literal outside `i64`.
    #[error("integer literal {0} is out of range")]
    IntegerOverflow(String),

    /// Parentheses, calls, signs or powers nest past the parser's bound.
    #[error("expression nests deeper than {limit} levels")]
    TooDeep {
        /// The bound.
        limit: usize,
    },

    /// A constructor rejected its arguments.
    #[error(transparent)]
    Build(#[from] BuildError),
}
