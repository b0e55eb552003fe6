//! # texsym-expr
//!
//! Symbolic expression trees written and read in SymPy source syntax.
//!
//! ```text
//!   "Eq(y, Sum(x[i]**2, (i, 1, N)))"
//!        │
//!        ▼  lexer (logos)          tokens with spans
//!        ▼  parser                 recursive descent
//!        │     └─ Namespace ──────▶ Definition::Value  ─▶ the value
//!        │                          Definition::Callable ─▶ constructor(args)
//!        ▼
//!      Expr  ──Display──▶ "Eq(y, Sum(x[i]**2, (i, 1, N)))"
//! ```
//!
//! The parser knows no names of its own. Everything an identifier can
//! mean comes from the [`Namespace`] passed to [`parse_expr`];
//! [`standard_namespace`] provides SymPy's usual vocabulary.
//!
//! ```rust
//! use texsym_expr::{Definition, Expr, parse_expr, standard_namespace};
//!
//! let mut ns = standard_namespace();
//! for name in ["x", "y", "i"] {
//!     ns.insert(name.to_owned(), Definition::Value(Expr::symbol(name)));
//! }
//! let expr = parse_expr("Eq(E, Sum((y - sin(x))**2, (i, 1, N))/N)", &ns).unwrap();
//! assert_eq!(expr.to_string(), "Eq(E, Sum((y - sin(x))**2, (i, 1, N))/N)");
//! ```

#![warn(missing_docs)]

pub mod build;
mod builtins;
mod display;
mod error;
mod expr;
mod lexer;
mod namespace;
mod parser;

pub use builtins::{Builtin, builtins, standard_namespace};
pub use error::{BuildError, ParseError};
pub use expr::{Bounds, Expr, LimitDir, RelOp};
pub use namespace::{Arity, CallArgs, Constructor, Definition, Kind, Namespace, Overlay};
pub use parser::{MAX_DEPTH, parse_expr};
