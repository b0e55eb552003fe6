use std::collections::HashMap;

use texsym_expr::{
    Bounds, Definition, Expr, MAX_DEPTH, Overlay, ParseError, RelOp, parse_expr,
    standard_namespace,
};

fn parse(src: &str) -> Result<Expr, ParseError> {
    parse_expr(src, &with_symbols(&["x", "y", "z", "a", "b", "i", "j", "t", "w"]))
}

fn with_symbols(names: &[&str]) -> HashMap<String, Definition> {
    let mut ns = standard_namespace();
    for name in names {
        ns.insert((*name).to_string(), Definition::Value(Expr::symbol(*name)));
    }
    ns
}

fn roundtrip(src: &str) -> String {
    parse(src).unwrap().to_string()
}

fn s(name: &str) -> Expr {
    Expr::symbol(name)
}

// ── Arithmetic ─────────────────────────────────────────────────────

#[test]
fn precedence_and_associativity() {
    assert_eq!(parse("x + y*z").unwrap(), s("x") + s("y") * s("z"));
    assert_eq!(parse("x**y**z").unwrap(), s("x").pow(s("y").pow(s("z"))));
    assert_eq!(parse("-x**2").unwrap(), -(s("x").pow(2)));
    assert_eq!(parse("2**-1").unwrap(), Expr::Integer(2).pow(-1));
}

#[test]
fn caret_is_power() {
    assert_eq!(parse("x^2").unwrap(), parse("x**2").unwrap());
}

#[test]
fn integer_division_is_rational() {
    assert_eq!(parse("1/2").unwrap(), Expr::Rational(1, 2));
    assert_eq!(roundtrip("x/2"), "x/2");
}

#[test]
fn implicit_multiplication_after_numbers_and_parens() {
    assert_eq!(parse("2x").unwrap(), Expr::Integer(2) * s("x"));
    assert_eq!(parse("2(x + 1)").unwrap(), parse("2*(x + 1)").unwrap());
    assert_eq!(parse("(a + b)(x)").unwrap(), parse("(a + b)*x").unwrap());
}

#[test]
fn juxtaposed_names_are_rejected() {
    assert!(matches!(parse("x y"), Err(ParseError::UnexpectedToken { .. })));
}

#[test]
fn printing_is_stable() {
    for src in [
        "x - y",
        "-x + y",
        "x*y/z",
        "(x + y)**2",
        "sqrt(x)",
        "Eq(y, x**2 + 1)",
        "x <= y + 1",
        "Sum(w[i]**2, (i, 1, N))",
        "Integral(sin(t), (t, 0, pi))",
        "Derivative(f(x), (x, 2))",
        "Matrix([[a, b], [1, 2]])",
    ] {
        let once = parse_expr(src, &with_f()).unwrap().to_string();
        let twice = parse_expr(&once, &with_f()).unwrap().to_string();
        assert_eq!(once, twice, "unstable printing for {src}");
    }
}

fn with_f() -> HashMap<String, Definition> {
    let mut ns = with_symbols(&["x", "y", "z", "a", "b", "i", "t"]);
    ns.insert("w".into(), Definition::Value(Expr::IndexedBase("w".into())));
    ns.insert("f".into(), Definition::Value(Expr::Function("f".into())));
    ns
}

// ── Relations ──────────────────────────────────────────────────────

#[test]
fn eq_call_and_equals_sign_agree() {
    assert_eq!(parse("Eq(y, x + 1)").unwrap(), parse("y = x + 1").unwrap());
    assert_eq!(parse("y == x + 1").unwrap(), parse("y = x + 1").unwrap());
}

#[test]
fn inequalities() {
    let Expr::Relational { op, .. } = parse("x >= 0").unwrap() else {
        panic!("expected relation");
    };
    assert_eq!(op, RelOp::Ge);
}

// ── Names ──────────────────────────────────────────────────────────

#[test]
fn unknown_bare_name() {
    assert_eq!(parse("q + 1"), Err(ParseError::UnknownName("q".into())));
}

#[test]
fn unknown_function() {
    assert_eq!(parse("foo(x)"), Err(ParseError::UnknownFunction("foo".into())));
}

#[test]
fn symbol_is_not_callable() {
    assert!(matches!(parse("x(y)"), Err(ParseError::NotCallable(_))));
}

#[test]
fn applied_result_is_not_callable() {
    assert!(matches!(parse("sin(x)(y)"), Err(ParseError::NotCallable(_))));
}

#[test]
fn function_factory_then_call() {
    assert_eq!(
        parse("Function('f')(x, t)").unwrap(),
        Expr::apply("f", vec![s("x"), s("t")])
    );
}

#[test]
fn indexed_base_subscript() {
    let expected = Expr::Indexed {
        base: "w".into(),
        indices: vec![s("i"), s("j")],
    };
    assert_eq!(parse("IndexedBase('w')[i, j]").unwrap(), expected);
    assert!(matches!(parse("y[i]"), Err(ParseError::NotSubscriptable(_))));
}

#[test]
fn bare_callable_is_unapplied_function() {
    assert_eq!(parse("sin").unwrap(), Expr::Function("sin".into()));
}

#[test]
fn overlay_scopes_shadow_in_order() {
    let base = standard_namespace();
    let mut locals = HashMap::new();
    locals.insert("sin".to_string(), Definition::Value(Expr::symbol("sin")));
    let scope = Overlay::new(&locals, &base);
    assert_eq!(parse_expr("sin", &scope).unwrap(), Expr::symbol("sin"));
}

// ── Structural constructors ────────────────────────────────────────

#[test]
fn sum_with_bounds() {
    let expected = Expr::Sum {
        term: Box::new(s("i").pow(2)),
        bounds: vec![Bounds::range(s("i"), 1, s("N"))],
    };
    assert_eq!(parse("Sum(i**2, (i, 1, N))").unwrap(), expected);
}

#[test]
fn evaluate_keyword_is_accepted() {
    assert_eq!(
        parse("Eq(x, y, evaluate=False)").unwrap(),
        Expr::eq(s("x"), s("y"))
    );
}

#[test]
fn arity_errors_surface_as_build_errors() {
    assert!(matches!(parse("sin(x, y)"), Err(ParseError::Build(_))));
}

#[test]
fn symbols_tuple() {
    assert_eq!(
        parse("symbols('p q')").unwrap(),
        Expr::Tuple(vec![s("p"), s("q")])
    );
}

// ── Lexical failures ───────────────────────────────────────────────

#[test]
fn ellipsis_is_truncation() {
    assert!(matches!(parse("x + ... + y"), Err(ParseError::Truncated { .. })));
}

#[test]
fn unbalanced_parens() {
    assert!(matches!(parse("sin(x"), Err(ParseError::UnexpectedEof { .. })));
    assert!(matches!(parse("x)"), Err(ParseError::UnexpectedToken { .. })));
}

#[test]
fn empty_input() {
    assert!(matches!(parse(""), Err(ParseError::UnexpectedEof { .. })));
}

#[test]
fn integer_overflow() {
    assert!(matches!(
        parse("99999999999999999999"),
        Err(ParseError::IntegerOverflow(_))
    ));
}

#[test]
fn moderate_nesting_parses() {
    let src = format!("{}x{}", "(".repeat(20), ")".repeat(20));
    assert_eq!(parse(&src).unwrap(), s("x"));
    let src = format!("{}x{}", "sin(".repeat(20), ")".repeat(20));
    assert!(parse(&src).is_ok());
}

#[test]
fn deep_nesting_is_rejected() {
    let too_deep = Err(ParseError::TooDeep { limit: MAX_DEPTH });
    let parens = format!("{}x{}", "(".repeat(5000), ")".repeat(5000));
    assert_eq!(parse(&parens), too_deep);
    let calls = format!("{}x{}", "sin(".repeat(5000), ")".repeat(5000));
    assert_eq!(parse(&calls), too_deep);
    let lists = format!("{}x{}", "[".repeat(5000), "]".repeat(5000));
    assert_eq!(parse(&lists), too_deep);
    assert_eq!(parse(&format!("{}x", "-".repeat(5000))), too_deep);
    assert_eq!(parse(&format!("{}x", "x**".repeat(5000))), too_deep);
}
