//! Printing in SymPy's `str()` form.
//!
//! The output is itself valid input to [`crate::parse_expr`], so a tree
//! printed here and parsed back against the same namespace compares equal
//! up to flattening.

use std::fmt::{self, Display, Formatter};

use crate::expr::{Bounds, Expr, RelOp};

const PREC_REL: u8 = 20;
const PREC_ADD: u8 = 40;
const PREC_MUL: u8 = 50;
const PREC_POW: u8 = 60;
const PREC_ATOM: u8 = 100;

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Integer(_) | Expr::Float(_) | Expr::Mul(_) if expr.is_negative() => PREC_ADD,
        Expr::Rational(p, _) if *p < 0 => PREC_ADD,
        Expr::Rational(..) | Expr::Mul(_) => PREC_MUL,
        Expr::Add(_) => PREC_ADD,
        Expr::Pow(_, exp) => match **exp {
            Expr::Integer(-1) => PREC_MUL,
            Expr::Rational(1, 2) => PREC_ATOM,
            _ => PREC_POW,
        },
        Expr::Relational {
            op: RelOp::Lt | RelOp::Le | RelOp::Gt | RelOp::Ge,
            ..
        } => PREC_REL,
        _ => PREC_ATOM,
    }
}

fn child(f: &mut Formatter<'_>, expr: &Expr, parent: u8) -> fmt::Result {
    if precedence(expr) < parent {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}

fn join(f: &mut Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_float(f: &mut Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_finite() && value.fract() == 0.0 {
        write!(f, "{value:.1}")
    } else {
        write!(f, "{value}")
    }
}

fn write_add(f: &mut Formatter<'_>, terms: &[Expr]) -> fmt::Result {
    for (i, term) in terms.iter().enumerate() {
        if i == 0 {
            child(f, term, PREC_ADD)?;
        } else if term.is_negative() {
            f.write_str(" - ")?;
            child(f, &-term.clone(), PREC_ADD + 1)?;
        } else {
            f.write_str(" + ")?;
            child(f, term, PREC_ADD)?;
        }
    }
    Ok(())
}

fn write_mul(f: &mut Formatter<'_>, factors: &[Expr]) -> fmt::Result {
    let mut negative = false;
    let mut numer = Vec::new();
    let mut denom = Vec::new();

    for factor in factors {
        match factor {
            Expr::Integer(n) if *n < 0 && *n != i64::MIN => {
                negative = !negative;
                if *n != -1 {
                    numer.push(Expr::Integer(-n));
                }
            }
            Expr::Float(x) if *x < 0.0 => {
                negative = !negative;
                numer.push(Expr::Float(-x));
            }
            Expr::Rational(p, q) if *p != i64::MIN => {
                if *p < 0 {
                    negative = !negative;
                }
                if p.abs() != 1 {
                    numer.push(Expr::Integer(p.abs()));
                }
                denom.push(Expr::Integer(*q));
            }
            Expr::Pow(base, exp) => match **exp {
                Expr::Integer(-1) => denom.push((**base).clone()),
                Expr::Integer(k) if k < 0 && k != i64::MIN => {
                    denom.push((**base).clone().pow(-k));
                }
                _ => numer.push(factor.clone()),
            },
            _ => numer.push(factor.clone()),
        }
    }

    if negative {
        f.write_str("-")?;
    }
    if numer.is_empty() {
        f.write_str("1")?;
    }
    for (i, factor) in numer.iter().enumerate() {
        if i > 0 {
            f.write_str("*")?;
        }
        child(f, factor, PREC_MUL)?;
    }
    match denom.as_slice() {
        [] => Ok(()),
        [single] => {
            f.write_str("/")?;
            child(f, single, PREC_MUL + 1)
        }
        many => {
            f.write_str("/(")?;
            for (i, factor) in many.iter().enumerate() {
                if i > 0 {
                    f.write_str("*")?;
                }
                child(f, factor, PREC_MUL)?;
            }
            f.write_str(")")
        }
    }
}

fn write_pow(f: &mut Formatter<'_>, base: &Expr, exp: &Expr) -> fmt::Result {
    match exp {
        Expr::Rational(1, 2) => write!(f, "sqrt({base})"),
        Expr::Integer(-1) => {
            f.write_str("1/")?;
            child(f, base, PREC_MUL + 1)
        }
        _ => {
            child(f, base, PREC_POW + 1)?;
            f.write_str("**")?;
            child(f, exp, PREC_POW)
        }
    }
}

impl Display for Bounds {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match (&self.lower, &self.upper) {
            (None, None) => write!(f, "{}", self.var),
            (Some(lo), None) => write!(f, "({}, {lo})", self.var),
            (lo, Some(hi)) => {
                let lo = lo.clone().unwrap_or(Expr::Integer(0));
                write!(f, "({}, {lo}, {hi})", self.var)
            }
        }
    }
}

fn write_scoped(f: &mut Formatter<'_>, head: &str, body: &Expr, bounds: &[Bounds]) -> fmt::Result {
    write!(f, "{head}({body}")?;
    for b in bounds {
        write!(f, ", {b}")?;
    }
    f.write_str(")")
}

fn write_derivative(f: &mut Formatter<'_>, expr: &Expr, variables: &[Expr]) -> fmt::Result {
    write!(f, "Derivative({expr}")?;
    let mut i = 0;
    while i < variables.len() {
        let var = &variables[i];
        let run = variables[i..].iter().take_while(|v| *v == var).count();
        if run == 1 {
            write!(f, ", {var}")?;
        } else {
            write!(f, ", ({var}, {run})")?;
        }
        i += run;
    }
    f.write_str(")")
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Rational(p, q) => write!(f, "{p}/{q}"),
            Self::Float(x) => write_float(f, *x),
            Self::Boolean(true) => f.write_str("True"),
            Self::Boolean(false) => f.write_str("False"),
            Self::Infinity => f.write_str("oo"),
            Self::Symbol(name)
            | Self::Function(name)
            | Self::IndexedBase(name) => f.write_str(name),
            Self::Str(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            Self::Add(terms) => write_add(f, terms),
            Self::Mul(factors) => write_mul(f, factors),
            Self::Pow(base, exp) => write_pow(f, base, exp),
            Self::Relational { op, lhs, rhs } => match op {
                RelOp::Eq => write!(f, "Eq({lhs}, {rhs})"),
                RelOp::Ne => write!(f, "Ne({lhs}, {rhs})"),
                _ => {
                    child(f, lhs, PREC_REL + 1)?;
                    write!(f, " {} ", op.symbol())?;
                    child(f, rhs, PREC_REL + 1)
                }
            },
            Self::Apply { func, args } => {
                write!(f, "{func}(")?;
                join(f, args)?;
                f.write_str(")")
            }
            Self::Indexed { base, indices } => {
                write!(f, "{base}[")?;
                join(f, indices)?;
                f.write_str("]")
            }
            Self::Sum { term, bounds } => write_scoped(f, "Sum", term, bounds),
            Self::Product { term, bounds } => write_scoped(f, "Product", term, bounds),
            Self::Integral { integrand, bounds } => write_scoped(f, "Integral", integrand, bounds),
            Self::Derivative { expr, variables } => write_derivative(f, expr, variables),
            Self::Limit {
                expr,
                var,
                point,
                dir,
            } => write!(f, "Limit({expr}, {var}, {point}, dir='{}')", dir.as_str()),
            Self::Matrix(rows) => {
                f.write_str("Matrix([")?;
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str("[")?;
                    join(f, row)?;
                    f.write_str("]")?;
                }
                f.write_str("])")
            }
            Self::Tuple(items) => {
                f.write_str("(")?;
                join(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Self::List(items) => {
                f.write_str("[")?;
                join(f, items)?;
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::expr::{Bounds, Expr, LimitDir, RelOp};

    fn s(name: &str) -> Expr {
        Expr::symbol(name)
    }

    #[test]
    fn test_difference_prints_minus() {
        assert_eq!((s("x") - s("y")).to_string(), "x - y");
        assert_eq!((s("x") - Expr::Integer(2) * s("y")).to_string(), "x - 2*y");
    }

    #[test]
    fn test_leading_negative_term() {
        assert_eq!((-s("x") + s("y")).to_string(), "-x + y");
    }

    #[test]
    fn test_quotient_prints_slash() {
        assert_eq!((s("x") / s("y")).to_string(), "x/y");
        assert_eq!((s("x") / Expr::Integer(2)).to_string(), "x/2");
        assert_eq!((Expr::Integer(1) / s("y")).to_string(), "1/y");
        assert_eq!(((s("a") + s("b")) / (s("c") * s("d"))).to_string(), "(a + b)/(c*d)");
    }

    #[test]
    fn test_power_parenthesizes_compound_base() {
        assert_eq!((s("x") + s("y")).pow(2).to_string(), "(x + y)**2");
        assert_eq!(s("x").pow(s("y").pow(s("z"))).to_string(), "x**y**z");
        assert_eq!(s("x").pow(2).pow(3).to_string(), "(x**2)**3");
        assert_eq!(s("x").pow(-2).to_string(), "x**(-2)");
    }

    #[test]
    fn test_half_power_prints_sqrt() {
        assert_eq!(s("x").pow(Expr::Rational(1, 2)).to_string(), "sqrt(x)");
    }

    #[test]
    fn test_relations() {
        assert_eq!(Expr::eq(s("y"), s("x") + 1.into()).to_string(), "Eq(y, x + 1)");
        assert_eq!(
            Expr::relational(RelOp::Le, s("a"), s("b") + s("c")).to_string(),
            "a <= b + c"
        );
    }

    #[test]
    fn test_sum_with_bounds() {
        let sum = Expr::Sum {
            term: Box::new(s("i").pow(2)),
            bounds: vec![Bounds::range(s("i"), 1, s("N"))],
        };
        assert_eq!(sum.to_string(), "Sum(i**2, (i, 1, N))");
    }

    #[test]
    fn test_indefinite_integral() {
        let integral = Expr::Integral {
            integrand: Box::new(Expr::apply("sin", vec![s("x")])),
            bounds: vec![Bounds::free(s("x"))],
        };
        assert_eq!(integral.to_string(), "Integral(sin(x), x)");
    }

    #[test]
    fn test_derivative_groups_repeated_variables() {
        let d = Expr::Derivative {
            expr: Box::new(Expr::apply("f", vec![s("x")])),
            variables: vec![s("x"), s("x"), s("y")],
        };
        assert_eq!(d.to_string(), "Derivative(f(x), (x, 2), y)");
    }

    #[test]
    fn test_limit_prints_direction() {
        let lim = Expr::Limit {
            expr: Box::new(Expr::apply("sin", vec![s("x")]) / s("x")),
            var: Box::new(s("x")),
            point: Box::new(Expr::Integer(0)),
            dir: LimitDir::Plus,
        };
        assert_eq!(lim.to_string(), "Limit(sin(x)/x, x, 0, dir='+')");
    }

    #[test]
    fn test_containers() {
        let m = Expr::Matrix(vec![vec![1.into(), 2.into()], vec![3.into(), 4.into()]]);
        assert_eq!(m.to_string(), "Matrix([[1, 2], [3, 4]])");
        assert_eq!(Expr::Tuple(vec![s("a")]).to_string(), "(a,)");
        assert_eq!(Expr::List(vec![s("a"), s("b")]).to_string(), "[a, b]");
    }

    #[test]
    fn test_indexed_and_floats() {
        let xi = Expr::Indexed {
            base: "x".into(),
            indices: vec![s("i")],
        };
        assert_eq!(xi.to_string(), "x[i]");
        assert_eq!(Expr::Float(2.0).to_string(), "2.0");
        assert_eq!(Expr::Float(0.25).to_string(), "0.25");
    }
}
