//! Building expression trees from the envelope's strings.
//!
//! Every string is parsed on its own, against a scope layered as
//!
//! ```text
//!  discovered names  ─▶  call locals  ─▶  registry
//! ```
//!
//! The discovered layer is rebuilt for each string. It holds bare
//! identifiers nothing else defines (registered on the fly as symbols),
//! symbols that appear in call position (promoted to undefined functions),
//! and, when enabled, unknown calls. One bad string never stops the others.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use texsym_expr::{Arity, Definition, Expr, Namespace, Overlay, ParseError, parse_expr};
use tracing::debug;

use crate::registry::SymbolRegistry;
use crate::structured::ExprEnvelope;

static STRING_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"'[^']*'|"[^"]*""#).expect("valid regex"));

static NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+\.?\d*(?:[eE][+-]?\d+)?)|([\p{L}_][\p{L}\p{N}_]*)(\s*(?:\(|\[|==?))?")
        .expect("valid regex")
});

static NESTED_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Za-z_]\w*)\s*\(\s*([A-Za-z_]\w*)\s*\)\s*\(\s*([^\)]+?)\s*\)")
        .expect("valid regex")
});

/// Parser switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Treat calls to unknown names as undefined functions instead of
    /// failing. Off by default.
    pub undefined_functions: bool,
    /// On failure, retry once with `f(a)(b)` rewritten to `f_a(b)`.
    pub flatten_nested_calls: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            undefined_functions: false,
            flatten_nested_calls: true,
        }
    }
}

/// A string that could not be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    /// Position in the envelope's `exprs`.
    pub index: usize,
    /// The string as returned by the model.
    pub raw: String,
    /// Why it failed.
    pub error: ParseError,
}

/// Successes and failures of one envelope, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionResult {
    /// Trees that built.
    pub parsed: Vec<Expr>,
    /// Strings that did not.
    pub failures: Vec<ParseFailure>,
    /// Names registered on the fly as symbols, first-seen order.
    pub auto_symbols: Vec<String>,
}

impl ConversionResult {
    /// Whether every string built.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Parses envelopes against a registry and a set of locals.
#[derive(Debug)]
pub struct ExpressionParser<'a> {
    registry: &'a SymbolRegistry,
    locals: HashMap<String, Definition>,
    options: ParserOptions,
}

impl<'a> ExpressionParser<'a> {
    /// `locals` shadow the registry for this parser's lifetime.
    pub fn new(
        registry: &'a SymbolRegistry,
        locals: &BTreeMap<String, Expr>,
        options: ParserOptions,
    ) -> Self {
        let locals = locals
            .iter()
            .map(|(name, value)| (name.clone(), Definition::Value(value.clone())))
            .collect();
        Self {
            registry,
            locals,
            options,
        }
    }

    /// Parses every string of `envelope` independently.
    pub fn parse_all(&self, envelope: &ExprEnvelope) -> ConversionResult {
        let mut result = ConversionResult::default();
        let mut seen = HashSet::new();

        for (index, raw) in envelope.exprs.iter().enumerate() {
            match self.parse_one(raw) {
                Ok((expr, autos)) => {
                    result.parsed.push(expr);
                    for name in autos {
                        if seen.insert(name.clone()) {
                            result.auto_symbols.push(name);
                        }
                    }
                }
                Err(error) => {
                    debug!(index, raw = %raw, error = %error, "expression failed to parse");
                    result.failures.push(ParseFailure {
                        index,
                        raw: raw.clone(),
                        error,
                    });
                }
            }
        }
        result
    }

    /// Parses one string, returning the tree and the names it
    /// auto-registered.
    pub fn parse_one(&self, raw: &str) -> Result<(Expr, Vec<String>), ParseError> {
        let err = match self.parse_with(raw, &[]) {
            Ok(ok) => return Ok(ok),
            Err(err) => err,
        };
        if self.options.flatten_nested_calls {
            if let Some((fixed, heads)) = flatten_nested_call(raw) {
                if let Ok(ok) = self.parse_with(&fixed, &heads) {
                    debug!(raw, fixed = %fixed, "parsed after flattening nested call");
                    return Ok(ok);
                }
            }
        }
        Err(err)
    }

    fn parse_with(
        &self,
        code: &str,
        forced: &[String],
    ) -> Result<(Expr, Vec<String>), ParseError> {
        let (discovered, autos) = self.discover(code, forced);
        let scope = Overlay::new(&discovered, Overlay::new(&self.locals, self.registry));
        let expr = parse_expr(code, &scope)?;
        Ok((expr, autos))
    }

    fn lookup(&self, name: &str) -> Option<&Definition> {
        self.locals
            .get(name)
            .or_else(|| self.registry.lookup(name))
    }

    /// Scans `code` for identifiers and decides which ones need a binding
    /// of their own. `forced` names are always bound as functions.
    fn discover(
        &self,
        code: &str,
        forced: &[String],
    ) -> (HashMap<String, Definition>, Vec<String>) {
        let masked =
            STRING_LITERAL.replace_all(code, |caps: &Captures| " ".repeat(caps[0].len()));

        let mut called: Vec<&str> = forced.iter().map(String::as_str).collect();
        let mut subscripted = Vec::new();
        let mut bare = Vec::new();

        for caps in NAME.captures_iter(&masked) {
            let Some(name) = caps.get(2) else {
                continue;
            };
            let tail = caps.get(3).map_or("", |m| m.as_str().trim());
            let is_keyword = tail == "="
                && masked[..name.start()].trim_end().ends_with(['(', ',']);
            if is_keyword {
                continue;
            }
            match tail {
                "(" => called.push(name.as_str()),
                "[" => subscripted.push(name.as_str()),
                _ => bare.push(name.as_str()),
            }
        }

        let mut discovered = HashMap::new();
        let mut autos = Vec::new();

        for &name in &called {
            let promote = match self.lookup(name) {
                Some(Definition::Value(Expr::Symbol(_))) => true,
                Some(_) => false,
                None => self.options.undefined_functions || forced.iter().any(|f| f == name),
            };
            if promote && !discovered.contains_key(name) {
                discovered.insert(
                    name.to_owned(),
                    Definition::applied(name, Arity::AtLeast(1)),
                );
            }
        }

        for &name in &subscripted {
            if self.lookup(name).is_none() && !discovered.contains_key(name) {
                discovered.insert(
                    name.to_owned(),
                    Definition::Value(Expr::IndexedBase(name.to_owned())),
                );
                autos.push(name.to_owned());
            }
        }

        for &name in &bare {
            if called.contains(&name)
                || discovered.contains_key(name)
                || self.lookup(name).is_some()
            {
                continue;
            }
            discovered.insert(name.to_owned(), Definition::Value(Expr::symbol(name)));
            autos.push(name.to_owned());
        }

        (discovered, autos)
    }
}

/// Rewrites `f(a)(b)` into `f_a(b)`, returning the new text and the heads
/// it introduced, or `None` when nothing matched.
pub fn flatten_nested_call(code: &str) -> Option<(String, Vec<String>)> {
    let heads: Vec<String> = NESTED_CALL
        .captures_iter(code)
        .map(|caps| format!("{}_{}", &caps[1], &caps[2]))
        .collect();
    if heads.is_empty() {
        return None;
    }
    let fixed = NESTED_CALL.replace_all(code, "${1}_${2}(${3})").into_owned();
    Some((fixed, heads))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(exprs: &[&str]) -> ExprEnvelope {
        ExprEnvelope {
            exprs: exprs.iter().map(|s| (*s).to_owned()).collect(),
            notes: None,
            multiple: None,
        }
    }

    fn parse(exprs: &[&str]) -> ConversionResult {
        let registry = SymbolRegistry::with_defaults();
        ExpressionParser::new(&registry, &BTreeMap::new(), ParserOptions::default())
            .parse_all(&envelope(exprs))
    }

    #[test]
    fn test_unknown_bare_names_become_symbols() {
        let result = parse(&["Eq(E, Sum((y_i - sin(x_i))**2, (i, 1, N))/N)"]);
        assert!(result.is_complete());
        assert_eq!(result.parsed.len(), 1);
        assert_eq!(
            result.parsed[0].to_string(),
            "Eq(E, Sum((y_i - sin(x_i))**2, (i, 1, N))/N)"
        );
        assert_eq!(result.auto_symbols, vec!["y_i", "x_i", "i"]);
    }

    #[test]
    fn test_partial_success_keeps_order() {
        let result = parse(&["x + 1", "foo(x)", "Eq(y, 2)"]);
        assert_eq!(result.parsed.len(), 2);
        assert_eq!(result.parsed[0].to_string(), "x + 1");
        assert_eq!(result.parsed[1].to_string(), "Eq(y, 2)");
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].index, 1);
        assert_eq!(result.failures[0].raw, "foo(x)");
        assert_eq!(
            result.failures[0].error,
            ParseError::UnknownFunction("foo".into())
        );
        assert!(!result.is_complete());
    }

    #[test]
    fn test_deep_nesting_fails_alone() {
        let deep = format!("{}x{}", "(".repeat(3000), ")".repeat(3000));
        let result = parse(&[deep.as_str(), "Eq(x, 1)"]);
        assert_eq!(result.parsed.len(), 1);
        assert_eq!(result.parsed[0].to_string(), "Eq(x, 1)");
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].index, 0);
        assert!(matches!(
            result.failures[0].error,
            ParseError::TooDeep { .. }
        ));

        let signs = format!("{}x", "-".repeat(3000));
        let result = parse(&["y", signs.as_str()]);
        assert_eq!(result.parsed.len(), 1);
        assert_eq!(result.failures[0].index, 1);
        assert!(matches!(
            result.failures[0].error,
            ParseError::TooDeep { .. }
        ));
    }

    #[test]
    fn test_undefined_functions_option() {
        let registry = SymbolRegistry::with_defaults();
        let options = ParserOptions {
            undefined_functions: true,
            ..ParserOptions::default()
        };
        let result = ExpressionParser::new(&registry, &BTreeMap::new(), options)
            .parse_all(&envelope(&["foo(x) + 1"]));
        assert!(result.is_complete());
        assert_eq!(result.parsed[0].to_string(), "foo(x) + 1");
        assert_eq!(result.auto_symbols, vec!["x"]);
    }

    #[test]
    fn test_called_symbols_are_promoted() {
        let result = parse(&["N(x) + E"]);
        assert!(result.is_complete());
        assert_eq!(
            result.parsed[0],
            Expr::apply("N", vec![Expr::symbol("x")]) + Expr::symbol("E")
        );
        assert!(result.auto_symbols.iter().all(|s| s != "N"));
    }

    #[test]
    fn test_locals_shadow_registry() {
        let registry = SymbolRegistry::with_defaults();
        let mut locals = BTreeMap::new();
        locals.insert("pi".to_owned(), Expr::from(3));
        let result = ExpressionParser::new(&registry, &locals, ParserOptions::default())
            .parse_all(&envelope(&["2*pi"]));
        assert_eq!(result.parsed[0], Expr::from(2) * Expr::from(3));
        assert!(result.auto_symbols.is_empty());
    }

    #[test]
    fn test_keyword_names_are_not_symbols() {
        let result = parse(&["Limit(1/x, x, 0, dir='+')", "Eq(x, 1, evaluate=False)"]);
        assert!(result.is_complete(), "{:?}", result.failures);
        assert_eq!(result.auto_symbols, vec!["x"]);
    }

    #[test]
    fn test_string_contents_are_ignored() {
        let result = parse(&["Symbol('alpha') + beta"]);
        assert!(result.is_complete());
        assert_eq!(result.auto_symbols, vec!["beta"]);
    }

    #[test]
    fn test_unknown_subscripted_name_becomes_indexed_base() {
        let result = parse(&["Sum(w[i], (i, 1, n))"]);
        assert!(result.is_complete(), "{:?}", result.failures);
        assert_eq!(result.parsed[0].to_string(), "Sum(w[i], (i, 1, n))");
        assert_eq!(result.auto_symbols, vec!["w", "i", "n"]);
    }

    #[test]
    fn test_nested_call_is_flattened() {
        let result = parse(&["f(a)(b) + 1"]);
        assert!(result.is_complete(), "{:?}", result.failures);
        assert_eq!(result.parsed[0].to_string(), "f_a(b) + 1");
    }

    #[test]
    fn test_flattening_can_be_disabled() {
        let registry = SymbolRegistry::with_defaults();
        let options = ParserOptions {
            flatten_nested_calls: false,
            ..ParserOptions::default()
        };
        let result = ExpressionParser::new(&registry, &BTreeMap::new(), options)
            .parse_all(&envelope(&["f(a)(b)"]));
        assert_eq!(result.failures.len(), 1);
        assert_eq!(
            result.failures[0].error,
            ParseError::UnknownFunction("f".into())
        );
    }

    #[test]
    fn test_flatten_nested_call_rewrite() {
        let (fixed, heads) = flatten_nested_call("g(t)(x, y) * h(s)(z)").unwrap();
        assert_eq!(fixed, "g_t(x, y) * h_s(z)");
        assert_eq!(heads, vec!["g_t", "h_s"]);
        assert!(flatten_nested_call("sin(x)").is_none());
    }

    #[test]
    fn test_autos_are_per_string() {
        let registry = SymbolRegistry::with_defaults();
        let parser = ExpressionParser::new(&registry, &BTreeMap::new(), ParserOptions::default());
        parser.parse_all(&envelope(&["q + 1"]));
        assert!(registry.resolve("q").is_none());
    }
}
