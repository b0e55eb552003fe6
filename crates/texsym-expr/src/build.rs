//! Constructors behind the structural names: relations, sums, integrals,
//! derivatives, limits, matrices and the symbol factories.
//!
//! Each takes the raw [`CallArgs`] of a call and validates them the way
//! the corresponding SymPy class does. The `evaluate` keyword is accepted
//! and ignored everywhere; trees are never evaluated.

use crate::error::BuildError;
use crate::expr::{Bounds, Expr, LimitDir, RelOp};
use crate::namespace::{Arity, CallArgs};

type BuildResult = Result<Expr, BuildError>;

fn prepare(name: &str, args: &mut CallArgs) -> Result<(), BuildError> {
    args.take_keyword("evaluate");
    args.no_keywords(name)
}

fn exact<const N: usize>(name: &str, positional: Vec<Expr>) -> Result<[Expr; N], BuildError> {
    let got = positional.len();
    positional.try_into().map_err(|_| BuildError::Arity {
        name: name.to_owned(),
        expected: N.to_string(),
        got,
    })
}

fn name_arg(name: &str, arg: Expr) -> Result<String, BuildError> {
    match arg {
        Expr::Str(s) | Expr::Symbol(s) if !s.trim().is_empty() => Ok(s.trim().to_owned()),
        other => Err(BuildError::invalid(name, format!("expected a name, got {other}"))),
    }
}

fn variable(name: &str, arg: Expr) -> BuildResult {
    match arg {
        Expr::Symbol(_) | Expr::Indexed { .. } => Ok(arg),
        other => Err(BuildError::invalid(name, format!("{other} is not a variable"))),
    }
}

fn bounds(name: &str, arg: Expr, limits_required: bool) -> Result<Bounds, BuildError> {
    match arg {
        Expr::Tuple(items) | Expr::List(items) => match <[Expr; 3]>::try_from(items) {
            Ok([var, lower, upper]) => Ok(Bounds::range(variable(name, var)?, lower, upper)),
            Err(items) if items.len() == 1 && !limits_required => {
                let var = items.into_iter().next().unwrap_or(Expr::Integer(0));
                Ok(Bounds::free(variable(name, var)?))
            }
            Err(_) => Err(BuildError::invalid(name, "expected (variable, lower, upper)")),
        },
        var if !limits_required => Ok(Bounds::free(variable(name, var)?)),
        other => Err(BuildError::invalid(
            name,
            format!("expected (variable, lower, upper), got {other}"),
        )),
    }
}

/// The one free symbol of `expr`, for constructors that may omit it.
fn sole_variable(name: &str, expr: &Expr) -> BuildResult {
    let mut free = expr.free_symbols().into_iter();
    match (free.next(), free.next()) {
        (Some(var), None) => Ok(Expr::Symbol(var)),
        _ => Err(BuildError::invalid(
            name,
            "the variable must be given explicitly",
        )),
    }
}

// ── Relations ──────────────────────────────────────────────────────

fn relational(op: RelOp, name: &str, mut args: CallArgs) -> BuildResult {
    prepare(name, &mut args)?;
    let [lhs, rhs] = exact(name, args.positional)?;
    Ok(Expr::relational(op, lhs, rhs))
}

/// `Eq(lhs, rhs)`
pub fn eq(args: CallArgs) -> BuildResult {
    relational(RelOp::Eq, "Eq", args)
}

/// `Ne(lhs, rhs)`
pub fn ne(args: CallArgs) -> BuildResult {
    relational(RelOp::Ne, "Ne", args)
}

/// `Lt(lhs, rhs)`
pub fn lt(args: CallArgs) -> BuildResult {
    relational(RelOp::Lt, "Lt", args)
}

/// `Le(lhs, rhs)`
pub fn le(args: CallArgs) -> BuildResult {
    relational(RelOp::Le, "Le", args)
}

/// `Gt(lhs, rhs)`
pub fn gt(args: CallArgs) -> BuildResult {
    relational(RelOp::Gt, "Gt", args)
}

/// `Ge(lhs, rhs)`
pub fn ge(args: CallArgs) -> BuildResult {
    relational(RelOp::Ge, "Ge", args)
}

// ── Calculus ───────────────────────────────────────────────────────

fn definite(name: &str, mut args: CallArgs) -> Result<(Expr, Vec<Bounds>), BuildError> {
    prepare(name, &mut args)?;
    Arity::AtLeast(2).check(name, args.positional.len())?;
    let mut it = args.positional.into_iter();
    let term = it.next().unwrap_or(Expr::Integer(0));
    let bounds = it
        .map(|b| bounds(name, b, true))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((term, bounds))
}

/// `Sum(term, (i, a, b), ...)`
pub fn sum(args: CallArgs) -> BuildResult {
    let (term, bounds) = definite("Sum", args)?;
    Ok(Expr::Sum {
        term: Box::new(term),
        bounds,
    })
}

/// `Product(term, (i, a, b), ...)`
pub fn product(args: CallArgs) -> BuildResult {
    let (term, bounds) = definite("Product", args)?;
    Ok(Expr::Product {
        term: Box::new(term),
        bounds,
    })
}

/// `Integral(f, x)`, `Integral(f, (x, a, b), ...)` or `Integral(f)` when
/// `f` has a single free symbol.
pub fn integral(mut args: CallArgs) -> BuildResult {
    const NAME: &str = "Integral";
    prepare(NAME, &mut args)?;
    Arity::AtLeast(1).check(NAME, args.positional.len())?;
    let mut it = args.positional.into_iter();
    let integrand = it.next().unwrap_or(Expr::Integer(0));
    let mut limits = it
        .map(|b| bounds(NAME, b, false))
        .collect::<Result<Vec<_>, _>>()?;
    if limits.is_empty() {
        limits.push(Bounds::free(sole_variable(NAME, &integrand)?));
    }
    Ok(Expr::Integral {
        integrand: Box::new(integrand),
        bounds: limits,
    })
}

fn order(name: &str, n: i64) -> Result<usize, BuildError> {
    usize::try_from(n)
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| BuildError::invalid(name, format!("invalid derivative order {n}")))
}

fn differentiation_variable(name: &str, arg: Expr) -> BuildResult {
    match arg {
        Expr::Apply { .. } => Ok(arg),
        other => variable(name, other),
    }
}

/// `Derivative(expr, x, y, ...)`; orders may be given as `(x, 2)` or as
/// `x, 2`.
pub fn derivative(mut args: CallArgs) -> BuildResult {
    const NAME: &str = "Derivative";
    prepare(NAME, &mut args)?;
    Arity::AtLeast(1).check(NAME, args.positional.len())?;
    let mut it = args.positional.into_iter();
    let expr = it.next().unwrap_or(Expr::Integer(0));

    let mut variables: Vec<Expr> = Vec::new();
    for arg in it {
        match arg {
            Expr::Integer(n) => {
                let Some(last) = variables.last().cloned() else {
                    return Err(BuildError::invalid(NAME, "order given before any variable"));
                };
                let n = order(NAME, n)?;
                variables.extend(std::iter::repeat_n(last, n - 1));
            }
            Expr::Tuple(items) => {
                let [var, count] = <[Expr; 2]>::try_from(items)
                    .map_err(|_| BuildError::invalid(NAME, "expected (variable, order)"))?;
                let Expr::Integer(n) = count else {
                    return Err(BuildError::invalid(
                        NAME,
                        format!("invalid derivative order {count}"),
                    ));
                };
                let var = differentiation_variable(NAME, var)?;
                variables.extend(std::iter::repeat_n(var, order(NAME, n)?));
            }
            other => variables.push(differentiation_variable(NAME, other)?),
        }
    }
    if variables.is_empty() {
        variables.push(sole_variable(NAME, &expr)?);
    }
    Ok(Expr::Derivative {
        expr: Box::new(expr),
        variables,
    })
}

fn limit_dir(arg: &Expr) -> Result<LimitDir, BuildError> {
    match arg {
        Expr::Str(s) if s == "+" => Ok(LimitDir::Plus),
        Expr::Str(s) if s == "-" => Ok(LimitDir::Minus),
        Expr::Str(s) if s == "+-" => Ok(LimitDir::Both),
        other => Err(BuildError::invalid(
            "Limit",
            format!("dir must be '+', '-' or '+-', got {other}"),
        )),
    }
}

/// `Limit(expr, x, point, dir='+')`
pub fn limit(mut args: CallArgs) -> BuildResult {
    const NAME: &str = "Limit";
    args.take_keyword("evaluate");
    let dir_keyword = args.take_keyword("dir");
    args.no_keywords(NAME)?;
    Arity::Range(3, 4).check(NAME, args.positional.len())?;

    let mut it = args.positional.into_iter();
    let (Some(expr), Some(var), Some(point)) = (it.next(), it.next(), it.next()) else {
        return Err(BuildError::invalid(NAME, "expected expr, variable, point"));
    };
    let dir = match it.next().or(dir_keyword) {
        Some(d) => limit_dir(&d)?,
        None => LimitDir::Plus,
    };
    Ok(Expr::Limit {
        expr: Box::new(expr),
        var: Box::new(variable(NAME, var)?),
        point: Box::new(point),
        dir,
    })
}

// ── Containers ─────────────────────────────────────────────────────

/// `Matrix([[a, b], [c, d]])`; a flat list is a column vector.
pub fn matrix(mut args: CallArgs) -> BuildResult {
    const NAME: &str = "Matrix";
    prepare(NAME, &mut args)?;
    let [rows] = exact(NAME, args.positional)?;
    let Expr::List(rows) = rows else {
        return Err(BuildError::invalid(NAME, "expected a list of rows"));
    };

    let nested = rows.iter().filter(|r| matches!(r, Expr::List(_))).count();
    let rows: Vec<Vec<Expr>> = if nested == 0 {
        rows.into_iter().map(|entry| vec![entry]).collect()
    } else if nested == rows.len() {
        rows.into_iter()
            .map(|r| match r {
                Expr::List(items) => items,
                other => vec![other],
            })
            .collect()
    } else {
        return Err(BuildError::invalid(NAME, "mixed rows and scalars"));
    };

    if let Some(first) = rows.first() {
        if rows.iter().any(|r| r.len() != first.len()) {
            return Err(BuildError::invalid(NAME, "rows have different lengths"));
        }
    }
    Ok(Expr::Matrix(rows))
}

/// `Tuple(a, b, ...)`
pub fn tuple(mut args: CallArgs) -> BuildResult {
    prepare("Tuple", &mut args)?;
    Ok(Expr::Tuple(args.positional))
}

// ── Factories ──────────────────────────────────────────────────────

/// `Symbol('x', **assumptions)`; assumptions are dropped.
pub fn symbol(args: CallArgs) -> BuildResult {
    let [name] = exact("Symbol", args.positional)?;
    Ok(Expr::Symbol(name_arg("Symbol", name)?))
}

/// `Idx('i')` behaves as a plain symbol.
pub fn idx(args: CallArgs) -> BuildResult {
    let mut positional = args.positional;
    Arity::Range(1, 2).check("Idx", positional.len())?;
    positional.truncate(1);
    let [name] = exact("Idx", positional)?;
    Ok(Expr::Symbol(name_arg("Idx", name)?))
}

/// `IndexedBase('x', **options)`
pub fn indexed_base(args: CallArgs) -> BuildResult {
    let [name] = exact("IndexedBase", args.positional)?;
    Ok(Expr::IndexedBase(name_arg("IndexedBase", name)?))
}

/// `Function('f')`: an undefined function, applied later.
pub fn function(args: CallArgs) -> BuildResult {
    let [name] = exact("Function", args.positional)?;
    Ok(Expr::Function(name_arg("Function", name)?))
}

/// Most names one `symbols` call may create.
pub const MAX_SYMBOLS: usize = 10_000;

/// Expands `x:3` to `x0 x1 x2` and `a1:3` to `a1 a2`.
fn expand_range(spec: &str) -> Result<Vec<String>, BuildError> {
    let Some((head, end)) = spec.split_once(':') else {
        return Ok(vec![spec.to_owned()]);
    };
    let bad_range = || BuildError::invalid("symbols", format!("bad range '{spec}'"));
    let digits = head.len() - head.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let (prefix, start) = head.split_at(head.len() - digits);
    let start: usize = if start.is_empty() {
        0
    } else {
        start.parse().map_err(|_| bad_range())?
    };
    let end: usize = end.parse().map_err(|_| bad_range())?;
    if prefix.is_empty() {
        return Err(bad_range());
    }
    if end.saturating_sub(start) > MAX_SYMBOLS {
        return Err(BuildError::invalid(
            "symbols",
            format!("range '{spec}' expands to more than {MAX_SYMBOLS} names"),
        ));
    }
    Ok((start..end).map(|i| format!("{prefix}{i}")).collect())
}

/// `symbols('x y z')`, `symbols('a, b')`, `symbols('x:3')`; with
/// `cls=Function` the names are undefined functions.
pub fn symbols(mut args: CallArgs) -> BuildResult {
    const NAME: &str = "symbols";
    let as_functions = matches!(
        args.take_keyword("cls"),
        Some(Expr::Function(ref cls)) if cls == "Function"
    );
    let [spec] = exact(NAME, args.positional)?;
    let Expr::Str(spec) = spec else {
        return Err(BuildError::invalid(NAME, "expected a string of names"));
    };

    let mut names = Vec::new();
    for part in spec.split(|c: char| c == ',' || c.is_whitespace()) {
        if !part.is_empty() {
            names.extend(expand_range(part)?);
        }
        if names.len() > MAX_SYMBOLS {
            return Err(BuildError::invalid(
                NAME,
                format!("more than {MAX_SYMBOLS} names requested"),
            ));
        }
    }
    if names.is_empty() {
        return Err(BuildError::invalid(NAME, "no names given"));
    }

    let make = |n: String| {
        if as_functions {
            Expr::Function(n)
        } else {
            Expr::Symbol(n)
        }
    };
    let single = names.len() == 1 && !spec.contains(',') && !spec.contains(':');
    if single {
        Ok(names.into_iter().next().map_or(Expr::Tuple(Vec::new()), make))
    } else {
        Ok(Expr::Tuple(names.into_iter().map(make).collect()))
    }
}

// ── Numbers ────────────────────────────────────────────────────────

/// `Rational(p, q)` or `Rational(p)` over integers.
pub fn rational(mut args: CallArgs) -> BuildResult {
    const NAME: &str = "Rational";
    prepare(NAME, &mut args)?;
    Arity::Range(1, 2).check(NAME, args.positional.len())?;
    match args.positional.as_slice() {
        [Expr::Integer(p)] => Ok(Expr::Integer(*p)),
        [Expr::Integer(p), Expr::Integer(q)] => Expr::rational(*p, *q)
            .ok_or_else(|| BuildError::invalid(NAME, "zero denominator")),
        _ => Err(BuildError::invalid(NAME, "expected integer arguments")),
    }
}

/// `sqrt(x)` is `x**(1/2)`.
pub fn sqrt(mut args: CallArgs) -> BuildResult {
    prepare("sqrt", &mut args)?;
    let [x] = exact("sqrt", args.positional)?;
    Ok(x.pow(Expr::Rational(1, 2)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(name: &str) -> Expr {
        Expr::symbol(name)
    }

    fn args(positional: Vec<Expr>) -> CallArgs {
        CallArgs::positional(positional)
    }

    #[test]
    fn test_eq_ignores_evaluate() {
        let call = CallArgs {
            positional: vec![s("a"), s("b")],
            keywords: vec![("evaluate".into(), Expr::Boolean(false))],
        };
        assert_eq!(eq(call).unwrap(), Expr::eq(s("a"), s("b")));
    }

    #[test]
    fn test_eq_rejects_other_keywords() {
        let call = CallArgs {
            positional: vec![s("a"), s("b")],
            keywords: vec![("strict".into(), Expr::Boolean(true))],
        };
        assert!(matches!(eq(call), Err(BuildError::UnknownKeyword { .. })));
    }

    #[test]
    fn test_eq_arity() {
        assert!(matches!(eq(args(vec![s("a")])), Err(BuildError::Arity { got: 1, .. })));
    }

    #[test]
    fn test_sum_requires_limits() {
        let ok = sum(args(vec![
            s("i"),
            Expr::Tuple(vec![s("i"), 1.into(), s("N")]),
        ]));
        assert!(ok.is_ok());
        assert!(sum(args(vec![s("i"), s("i")])).is_err());
    }

    #[test]
    fn test_integral_infers_variable() {
        let e = integral(args(vec![s("x").pow(2)])).unwrap();
        assert_eq!(e.to_string(), "Integral(x**2, x)");
        assert!(integral(args(vec![s("x") * s("y")])).is_err());
    }

    #[test]
    fn test_derivative_orders() {
        let f = Expr::apply("f", vec![s("x")]);
        let a = derivative(args(vec![f.clone(), s("x"), 2.into()])).unwrap();
        let b = derivative(args(vec![f, Expr::Tuple(vec![s("x"), 2.into()])])).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "Derivative(f(x), (x, 2))");
    }

    #[test]
    fn test_limit_dir_keyword() {
        let call = CallArgs {
            positional: vec![Expr::Integer(1) / s("x"), s("x"), 0.into()],
            keywords: vec![("dir".into(), Expr::Str("-".into()))],
        };
        let Expr::Limit { dir, .. } = limit(call).unwrap() else {
            panic!("expected limit");
        };
        assert_eq!(dir, LimitDir::Minus);
    }

    #[test]
    fn test_matrix_shapes() {
        let square = matrix(args(vec![Expr::List(vec![
            Expr::List(vec![1.into(), 2.into()]),
            Expr::List(vec![3.into(), 4.into()]),
        ])]))
        .unwrap();
        assert_eq!(square.to_string(), "Matrix([[1, 2], [3, 4]])");

        let column = matrix(args(vec![Expr::List(vec![s("a"), s("b")])])).unwrap();
        assert_eq!(column, Expr::Matrix(vec![vec![s("a")], vec![s("b")]]));

        let ragged = matrix(args(vec![Expr::List(vec![
            Expr::List(vec![1.into()]),
            Expr::List(vec![3.into(), 4.into()]),
        ])]));
        assert!(ragged.is_err());
    }

    #[test]
    fn test_symbols_forms() {
        assert_eq!(symbols(args(vec![Expr::Str("x".into())])).unwrap(), s("x"));
        assert_eq!(
            symbols(args(vec![Expr::Str("x y, z".into())])).unwrap(),
            Expr::Tuple(vec![s("x"), s("y"), s("z")])
        );
        assert_eq!(
            symbols(args(vec![Expr::Str("a1:3".into())])).unwrap(),
            Expr::Tuple(vec![s("a1"), s("a2")])
        );
    }

    #[test]
    fn test_symbols_range_limits() {
        let huge = symbols(args(vec![Expr::Str("x:4294967295".into())]));
        assert!(matches!(
            huge,
            Err(BuildError::InvalidArgument { ref name, ref message })
                if name == "symbols" && message.contains("more than")
        ));
        let many = "a:6000 b:6000";
        assert!(symbols(args(vec![Expr::Str(many.into())])).is_err());
        assert!(symbols(args(vec![Expr::Str("x:10000".into())])).is_ok());
    }

    #[test]
    fn test_symbols_bad_range_start() {
        let result = symbols(args(vec![Expr::Str("x99999999999999999999999:3".into())]));
        assert_eq!(
            result,
            Err(BuildError::invalid(
                "symbols",
                "bad range 'x99999999999999999999999:3'"
            ))
        );
        assert!(symbols(args(vec![Expr::Str("x:y".into())])).is_err());
        assert!(symbols(args(vec![Expr::Str("5:7".into())])).is_err());
    }

    #[test]
    fn test_symbols_cls_function() {
        let call = CallArgs {
            positional: vec![Expr::Str("f g".into())],
            keywords: vec![("cls".into(), Expr::Function("Function".into()))],
        };
        assert_eq!(
            symbols(call).unwrap(),
            Expr::Tuple(vec![Expr::Function("f".into()), Expr::Function("g".into())])
        );
    }

    #[test]
    fn test_symbol_drops_assumptions() {
        let call = CallArgs {
            positional: vec![Expr::Str("x".into())],
            keywords: vec![("real".into(), Expr::Boolean(true))],
        };
        assert_eq!(symbol(call).unwrap(), s("x"));
    }

    #[test]
    fn test_rational() {
        assert_eq!(rational(args(vec![2.into(), 4.into()])).unwrap(), Expr::Rational(1, 2));
        assert!(rational(args(vec![1.into(), 0.into()])).is_err());
        assert!(rational(args(vec![s("x"), 2.into()])).is_err());
    }

    #[test]
    fn test_sqrt_is_half_power() {
        assert_eq!(sqrt(args(vec![s("x")])).unwrap().to_string(), "sqrt(x)");
    }
}
