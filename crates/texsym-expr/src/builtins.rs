//! The standard vocabulary: constants, elementary functions and the
//! structural constructors, keyed by their SymPy names.

use std::collections::HashMap;

use crate::build;
use crate::expr::Expr;
use crate::namespace::{Arity, Definition, Kind};

/// A standard name with its behaviour.
#[derive(Debug, Clone)]
pub struct Builtin {
    /// SymPy name.
    pub name: &'static str,
    /// How the name behaves.
    pub kind: Kind,
    /// What it resolves to.
    pub definition: Definition,
}

const UNARY_FUNCTIONS: &[&str] = &[
    "sin", "cos", "tan", "cot", "sec", "csc", "asin", "acos", "atan", "acot", "sinh", "cosh",
    "tanh", "coth", "asinh", "acosh", "atanh", "exp", "ln", "Abs", "sign", "floor", "ceiling",
    "factorial", "gamma", "erf", "re", "im", "conjugate", "arg",
];

const FUNCTIONS: &[(&str, Arity)] = &[
    ("log", Arity::Range(1, 2)),
    ("atan2", Arity::Exact(2)),
    ("binomial", Arity::Exact(2)),
    ("KroneckerDelta", Arity::Exact(2)),
    ("Heaviside", Arity::Range(1, 2)),
    ("DiracDelta", Arity::Range(1, 2)),
    ("Max", Arity::AtLeast(1)),
    ("Min", Arity::AtLeast(1)),
    ("Piecewise", Arity::AtLeast(1)),
];

type Build = fn(crate::CallArgs) -> Result<Expr, crate::BuildError>;

const OPERATORS: &[(&str, Build)] = &[
    ("Eq", build::eq),
    ("Ne", build::ne),
    ("Lt", build::lt),
    ("Le", build::le),
    ("Gt", build::gt),
    ("Ge", build::ge),
    ("Sum", build::sum),
    ("Product", build::product),
    ("Integral", build::integral),
    ("Derivative", build::derivative),
    ("Limit", build::limit),
    ("Matrix", build::matrix),
    ("Tuple", build::tuple),
    ("Symbol", build::symbol),
    ("symbols", build::symbols),
    ("Idx", build::idx),
    ("IndexedBase", build::indexed_base),
    ("Function", build::function),
    ("Rational", build::rational),
    ("sqrt", build::sqrt),
];

/// All standard names, constants first.
///
/// `E`, `I`, `N` and `pi` are plain symbols: in LaTeX input they are at
/// least as often variables as constants, and they print identically.
pub fn builtins() -> Vec<Builtin> {
    let constants = [
        ("pi", Expr::symbol("pi")),
        ("E", Expr::symbol("E")),
        ("I", Expr::symbol("I")),
        ("N", Expr::symbol("N")),
        ("oo", Expr::Infinity),
        ("True", Expr::Boolean(true)),
        ("False", Expr::Boolean(false)),
    ];

    let mut out = Vec::new();
    out.extend(constants.into_iter().map(|(name, value)| Builtin {
        name,
        kind: Kind::Symbol,
        definition: Definition::Value(value),
    }));
    out.extend(UNARY_FUNCTIONS.iter().map(|&name| Builtin {
        name,
        kind: Kind::Function(Arity::Exact(1)),
        definition: Definition::applied(name, Arity::Exact(1)),
    }));
    out.extend(FUNCTIONS.iter().map(|&(name, arity)| Builtin {
        name,
        kind: Kind::Function(arity),
        definition: Definition::applied(name, arity),
    }));
    out.extend(OPERATORS.iter().map(|&(name, f)| Builtin {
        name,
        kind: Kind::Operator,
        definition: Definition::callable(f),
    }));
    out
}

/// [`builtins`] as a ready namespace.
pub fn standard_namespace() -> HashMap<String, Definition> {
    builtins()
        .into_iter()
        .map(|b| (b.name.to_owned(), b.definition))
        .collect()
}
