//! The expression tree.
//!
//! [`Expr`] follows SymPy's object model closely enough that printing a
//! tree gives back the source a model would write: `x - y` is stored as
//! `Add([x, Mul([-1, y])])`, `x/y` as `Mul([x, Pow(y, -1)])`. Sums and
//! products are flattened on construction; nothing else is simplified.

use std::collections::BTreeSet;
use std::ops::{Add, Div, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// A symbolic expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Machine-sized integer.
    Integer(i64),
    /// Reduced fraction `p/q` with `q > 1`.
    Rational(i64, i64),
    /// Floating-point literal.
    Float(f64),
    /// `True` / `False`.
    Boolean(bool),
    /// Positive infinity, `oo`.
    Infinity,
    /// A free symbol.
    Symbol(String),
    /// A string literal; only meaningful as a builder argument.
    Str(String),
    /// Sum of terms, flattened.
    Add(Vec<Expr>),
    /// Product of factors, flattened.
    Mul(Vec<Expr>),
    /// `base ** exp`.
    Pow(Box<Expr>, Box<Expr>),
    /// Equation or inequality.
    Relational {
        /// Which relation.
        op: RelOp,
        /// Left-hand side.
        lhs: Box<Expr>,
        /// Right-hand side.
        rhs: Box<Expr>,
    },
    /// A named function applied to arguments, `f(x, y)`.
    Apply {
        /// Function name.
        func: String,
        /// Positional arguments.
        args: Vec<Expr>,
    },
    /// An undefined function that has not been applied yet.
    Function(String),
    /// An indexable base, `IndexedBase('x')`.
    IndexedBase(String),
    /// `x[i, j]`.
    Indexed {
        /// Base name.
        base: String,
        /// Subscripts.
        indices: Vec<Expr>,
    },
    /// `Sum(term, (i, a, b), ...)`.
    Sum {
        /// Summand.
        term: Box<Expr>,
        /// Summation variables, innermost first.
        bounds: Vec<Bounds>,
    },
    /// `Product(term, (i, a, b), ...)`.
    Product {
        /// Multiplicand.
        term: Box<Expr>,
        /// Product variables, innermost first.
        bounds: Vec<Bounds>,
    },
    /// `Integral(integrand, (x, a, b), ...)` or `Integral(integrand, x)`.
    Integral {
        /// Integrand.
        integrand: Box<Expr>,
        /// Integration variables, innermost first.
        bounds: Vec<Bounds>,
    },
    /// `Derivative(expr, x, y, ...)`.
    Derivative {
        /// Differentiated expression.
        expr: Box<Expr>,
        /// Differentiation variables, one entry per order.
        variables: Vec<Expr>,
    },
    /// `Limit(expr, x, point, dir)`.
    Limit {
        /// The expression.
        expr: Box<Expr>,
        /// Limit variable.
        var: Box<Expr>,
        /// Point approached.
        point: Box<Expr>,
        /// Side of approach.
        dir: LimitDir,
    },
    /// Dense matrix, row-major.
    Matrix(Vec<Vec<Expr>>),
    /// Tuple, `(a, b)`.
    Tuple(Vec<Expr>),
    /// List, `[a, b]`.
    List(Vec<Expr>),
}

/// Relation of a [`Expr::Relational`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelOp {
    /// `Eq(a, b)`
    Eq,
    /// `Ne(a, b)`
    Ne,
    /// `a < b`
    Lt,
    /// `a <= b`
    Le,
    /// `a > b`
    Gt,
    /// `a >= b`
    Ge,
}

impl RelOp {
    /// The infix spelling.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// Direction of a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LimitDir {
    /// From above, `'+'`.
    #[default]
    Plus,
    /// From below, `'-'`.
    Minus,
    /// Two-sided, `'+-'`.
    Both,
}

impl LimitDir {
    /// SymPy's spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Both => "+-",
        }
    }
}

/// A bound variable with optional limits, as in `(i, 1, N)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// The bound variable.
    pub var: Expr,
    /// Lower limit.
    pub lower: Option<Expr>,
    /// Upper limit.
    pub upper: Option<Expr>,
}

impl Bounds {
    /// A variable without limits (indefinite).
    pub fn free(var: Expr) -> Self {
        Self {
            var,
            lower: None,
            upper: None,
        }
    }

    /// A variable running from `lower` to `upper`.
    pub fn range(var: Expr, lower: impl Into<Expr>, upper: impl Into<Expr>) -> Self {
        Self {
            var,
            lower: Some(lower.into()),
            upper: Some(upper.into()),
        }
    }
}

impl Expr {
    /// A free symbol.
    pub fn symbol(name: impl Into<String>) -> Self {
        Self::Symbol(name.into())
    }

    /// `func(args...)`.
    pub fn apply(func: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::Apply {
            func: func.into(),
            args,
        }
    }

    /// `Eq(lhs, rhs)`.
    pub fn eq(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Self::relational(RelOp::Eq, lhs, rhs)
    }

    /// Any relation.
    pub fn relational(op: RelOp, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Self::Relational {
            op,
            lhs: Box::new(lhs.into()),
            rhs: Box::new(rhs.into()),
        }
    }

    /// `self ** exp`.
    #[must_use]
    pub fn pow(self, exp: impl Into<Expr>) -> Self {
        Self::Pow(Box::new(self), Box::new(exp.into()))
    }

    /// Flattened sum. An empty sum is `0`, a single term is itself.
    pub fn add_all(terms: impl IntoIterator<Item = Expr>) -> Self {
        let mut flat = Vec::new();
        for term in terms {
            match term {
                Self::Add(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Self::Integer(0),
            1 => flat.swap_remove(0),
            _ => Self::Add(flat),
        }
    }

    /// Flattened product. An empty product is `1`, a single factor is itself.
    pub fn mul_all(factors: impl IntoIterator<Item = Expr>) -> Self {
        let mut flat = Vec::new();
        for factor in factors {
            match factor {
                Self::Mul(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Self::Integer(1),
            1 => flat.swap_remove(0),
            _ => Self::Mul(flat),
        }
    }

    /// Reduced `p/q`. Returns `None` when `q == 0`.
    pub fn rational(p: i64, q: i64) -> Option<Self> {
        if q == 0 {
            return None;
        }
        // Only p == q == i64::MIN has a gcd outside i64.
        let Ok(g) = i64::try_from(gcd(p.unsigned_abs(), q.unsigned_abs())) else {
            return Some(Self::Integer(1));
        };
        let (mut p, mut q) = (p / g, q / g);
        if q < 0 {
            p = p.checked_neg()?;
            q = q.checked_neg()?;
        }
        Some(if q == 1 {
            Self::Integer(p)
        } else {
            Self::Rational(p, q)
        })
    }

    /// Whether this is a numeric literal.
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Rational(..) | Self::Float(_))
    }

    /// Whether this is a negative numeric literal, or a product whose
    /// leading coefficient is one.
    pub fn is_negative(&self) -> bool {
        match self {
            Self::Integer(n) => *n < 0,
            Self::Rational(p, _) => *p < 0,
            Self::Float(f) => *f < 0.0,
            Self::Mul(factors) => factors.first().is_some_and(Self::is_negative),
            _ => false,
        }
    }

    /// Names of all free symbols. Variables bound by a definite sum,
    /// product or integral are excluded inside their scope.
    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut BTreeSet<String>) {
        match self {
            Self::Symbol(name) => {
                out.insert(name.clone());
            }
            Self::Integer(_)
            | Self::Rational(..)
            | Self::Float(_)
            | Self::Boolean(_)
            | Self::Infinity
            | Self::Str(_)
            | Self::Function(_)
            | Self::IndexedBase(_) => {}
            Self::Add(items)
            | Self::Mul(items)
            | Self::Tuple(items)
            | Self::List(items)
            | Self::Apply { args: items, .. } => {
                for item in items {
                    item.collect_symbols(out);
                }
            }
            Self::Indexed { indices, .. } => {
                for index in indices {
                    index.collect_symbols(out);
                }
            }
            Self::Pow(base, exp) => {
                base.collect_symbols(out);
                exp.collect_symbols(out);
            }
            Self::Relational { lhs, rhs, .. } => {
                lhs.collect_symbols(out);
                rhs.collect_symbols(out);
            }
            Self::Sum { term: body, bounds }
            | Self::Product { term: body, bounds }
            | Self::Integral {
                integrand: body,
                bounds,
            } => {
                let mut inner = BTreeSet::new();
                body.collect_symbols(&mut inner);
                for b in bounds {
                    if b.lower.is_some() || b.upper.is_some() {
                        for name in b.var.free_symbols() {
                            inner.remove(&name);
                        }
                    }
                    for limit in b.lower.iter().chain(&b.upper) {
                        limit.collect_symbols(&mut inner);
                    }
                }
                out.extend(inner);
            }
            Self::Derivative { expr, variables } => {
                expr.collect_symbols(out);
                for v in variables {
                    v.collect_symbols(out);
                }
            }
            Self::Limit {
                expr, var, point, ..
            } => {
                let mut inner = expr.free_symbols();
                for name in var.free_symbols() {
                    inner.remove(&name);
                }
                point.collect_symbols(&mut inner);
                out.extend(inner);
            }
            Self::Matrix(rows) => {
                for entry in rows.iter().flatten() {
                    entry.collect_symbols(out);
                }
            }
        }
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.max(1)
}

// ── Arithmetic ─────────────────────────────────────────────────────

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        match self {
            Self::Integer(n) => n.checked_neg().map_or_else(
                || Self::Mul(vec![Self::Integer(-1), Self::Integer(n)]),
                Self::Integer,
            ),
            Self::Rational(p, q) => p.checked_neg().map_or_else(
                || Self::Mul(vec![Self::Integer(-1), Self::Rational(p, q)]),
                |p| Self::Rational(p, q),
            ),
            Self::Float(f) => Self::Float(-f),
            Self::Mul(mut factors) if factors.first().is_some_and(Self::is_number) => {
                let coeff = -factors.remove(0);
                if coeff != Self::Integer(1) {
                    factors.insert(0, coeff);
                }
                Self::mul_all(factors)
            }
            other => Self::mul_all([Self::Integer(-1), other]),
        }
    }
}

impl Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        Expr::add_all([self, rhs])
    }
}

impl Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        Expr::add_all([self, -rhs])
    }
}

impl Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        Expr::mul_all([self, rhs])
    }
}

impl Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Expr) -> Expr {
        match (self, rhs) {
            (Expr::Integer(p), Expr::Integer(q)) if q != 0 => {
                Expr::rational(p, q).unwrap_or(Expr::Integer(0))
            }
            (lhs, Expr::Integer(q)) if q != 0 && q != i64::MIN => {
                let coeff = Expr::rational(1, q).unwrap_or(Expr::Integer(1));
                Expr::mul_all([coeff, lhs])
            }
            (Expr::Integer(1), rhs) => rhs.pow(-1),
            (lhs, rhs) => Expr::mul_all([lhs, rhs.pow(-1)]),
        }
    }
}

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for Expr {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for Expr {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}
