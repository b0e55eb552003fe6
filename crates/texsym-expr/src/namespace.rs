//! Name resolution for the parser.
//!
//! The parser never decides what a name means. Every identifier is looked
//! up through a [`Namespace`], which answers with a [`Definition`]: either
//! a ready value (a symbol, a constant) or a [`Constructor`] to call with
//! the parsed arguments.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::BuildError;
use crate::expr::Expr;

/// A callable that builds an expression from call arguments.
pub type Constructor = Arc<dyn Fn(CallArgs) -> Result<Expr, BuildError> + Send + Sync>;

/// What a name is bound to.
#[derive(Clone)]
pub enum Definition {
    /// A value used as is. Calling it is only allowed for symbols and
    /// unapplied functions, which become [`Expr::Apply`].
    Value(Expr),
    /// A constructor invoked on call. A bare reference yields
    /// [`Expr::Function`].
    Callable(Constructor),
}

impl Definition {
    /// Wraps a plain function pointer or closure.
    pub fn callable<F>(f: F) -> Self
    where
        F: Fn(CallArgs) -> Result<Expr, BuildError> + Send + Sync + 'static,
    {
        Self::Callable(Arc::new(f))
    }

    /// A constructor applying `name` to its arguments after checking arity.
    pub fn applied(name: &str, arity: Arity) -> Self {
        let name = name.to_owned();
        Self::callable(move |args: CallArgs| {
            args.no_keywords(&name)?;
            arity.check(&name, args.positional.len())?;
            Ok(Expr::apply(name.as_str(), args.positional))
        })
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(expr) => f.debug_tuple("Value").field(expr).finish(),
            Self::Callable(_) => f.write_str("Callable(..)"),
        }
    }
}

/// How a name behaves, independent of its implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// A value: symbol or constant.
    Symbol,
    /// A mathematical function applied to arguments.
    Function(Arity),
    /// A structural constructor such as `Eq` or `Sum`.
    Operator,
}

/// Accepted positional argument counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    /// Exactly `n`.
    Exact(usize),
    /// Between `min` and `max`, inclusive.
    Range(usize, usize),
    /// `n` or more.
    AtLeast(usize),
}

impl Arity {
    /// Whether `n` arguments are accepted.
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Self::Exact(k) => n == k,
            Self::Range(lo, hi) => (lo..=hi).contains(&n),
            Self::AtLeast(k) => n >= k,
        }
    }

    /// Checks `got` against this arity for the callee `name`.
    pub fn check(self, name: &str, got: usize) -> Result<(), BuildError> {
        if self.accepts(got) {
            Ok(())
        } else {
            Err(BuildError::Arity {
                name: name.to_owned(),
                expected: self.to_string(),
                got,
            })
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(k) => write!(f, "{k}"),
            Self::Range(lo, hi) => write!(f, "{lo} to {hi}"),
            Self::AtLeast(k) => write!(f, "at least {k}"),
        }
    }
}

/// Arguments of a call expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    /// Positional arguments, in order.
    pub positional: Vec<Expr>,
    /// `name=value` arguments, in order.
    pub keywords: Vec<(String, Expr)>,
}

impl CallArgs {
    /// Positional-only arguments.
    pub fn positional(args: Vec<Expr>) -> Self {
        Self {
            positional: args,
            keywords: Vec::new(),
        }
    }

    /// Removes and returns the keyword `key`, if present.
    pub fn take_keyword(&mut self, key: &str) -> Option<Expr> {
        let idx = self.keywords.iter().position(|(k, _)| k == key)?;
        Some(self.keywords.remove(idx).1)
    }

    /// Fails on any keyword still present.
    pub fn no_keywords(&self, name: &str) -> Result<(), BuildError> {
        match self.keywords.first() {
            None => Ok(()),
            Some((keyword, _)) => Err(BuildError::UnknownKeyword {
                name: name.to_owned(),
                keyword: keyword.clone(),
            }),
        }
    }
}

/// Resolves identifiers for the parser.
pub trait Namespace {
    /// Looks up `name`.
    fn lookup(&self, name: &str) -> Option<&Definition>;
}

impl Namespace for HashMap<String, Definition> {
    fn lookup(&self, name: &str) -> Option<&Definition> {
        self.get(name)
    }
}

impl<N: Namespace + ?Sized> Namespace for &N {
    fn lookup(&self, name: &str) -> Option<&Definition> {
        (**self).lookup(name)
    }
}

/// Two namespaces searched front to back.
#[derive(Debug, Clone, Copy)]
pub struct Overlay<A, B> {
    /// Searched first.
    pub front: A,
    /// Searched when `front` has no binding.
    pub back: B,
}

impl<A, B> Overlay<A, B> {
    /// Layers `front` over `back`.
    pub fn new(front: A, back: B) -> Self {
        Self { front, back }
    }
}

impl<A: Namespace, B: Namespace> Namespace for Overlay<A, B> {
    fn lookup(&self, name: &str) -> Option<&Definition> {
        self.front.lookup(name).or_else(|| self.back.lookup(name))
    }
}
