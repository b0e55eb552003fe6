//! Prompt construction.
//!
//! [`PromptBuilder::build`] is a pure function of its [`PromptContext`]:
//! the same context always yields byte-identical text.

use std::fmt::Write as _;

/// The rejected reply of the previous attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorFailure {
    /// What the model returned (may be empty when nothing came back).
    pub output: String,
    /// Why it was rejected.
    pub error: String,
}

/// Inputs for one attempt's prompt. Built fresh per attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PromptContext {
    /// The LaTeX to convert.
    pub latex: String,
    /// Caller-supplied context or instructions.
    pub extra_instructions: Option<String>,
    /// Names the parser will accept, in registry order.
    pub known_names: Vec<String>,
    /// Set from the second attempt on.
    pub prior_failure: Option<PriorFailure>,
}

/// A worked LaTeX to JSON example shown to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Example {
    /// The LaTeX input.
    pub latex: String,
    /// The expected JSON reply.
    pub json: String,
}

/// Template for conversion prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBuilder {
    /// Opening instruction.
    pub preamble: String,
    /// In-context example.
    pub example: Example,
    /// Numbered output rules.
    pub rules: Vec<String>,
}

const DEFAULT_RULES: &[&str] = &[
    r#"Each string in "exprs" must be one expression in SymPy source syntax, parseable by sympy.parse_expr."#,
    "Write equations as Eq(lhs, rhs); never use a bare '='. Use Ne, Lt, Le, Gt, Ge for other relations.",
    "Write sums, products, integrals and derivatives as Sum(term, (i, lower, upper)), Product(...), Integral(f, (x, a, b)) and Derivative(f, x); no comprehensions.",
    "Use ** for powers, never ^.",
    "Integer literals must fit in 64 bits; write larger constants in scientific notation, e.g. 6.02214076e23.",
    r#"Never abbreviate with "..." or "…"; write every term out."#,
    "N, E, I and pi are plain symbols unless called; write bare names without quoting them.",
    r"Write a parameterised operator such as \mathcal{N}_\theta(u) as N_theta(u), never N(theta)(u).",
    "Call only functions from KNOWN NAMES; write subscripted variables as x_i, or IndexedBase('x')[i] when the index is summed over.",
    r#"Put each separate equation in its own string; "multiple" is true exactly when there is more than one."#,
    "Reply with one JSON object and nothing else: no markdown fences, no commentary.",
];

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            preamble: "Convert the LaTeX below into SymPy expression strings. \
                       Reply with a JSON object with keys \"exprs\" (list of strings), \
                       \"notes\" (short string) and \"multiple\" (boolean)."
                .into(),
            example: Example {
                latex: r"E = \frac{1}{N}\sum_{i=1}^{N}(y_i - \sin(x_i))^2".into(),
                json: r#"{"exprs": ["Eq(E, Sum((y_i - sin(x_i))**2, (i, 1, N))/N)"], "notes": "mean squared error over N samples", "multiple": false}"#.into(),
            },
            rules: DEFAULT_RULES.iter().map(|r| (*r).to_owned()).collect(),
        }
    }
}

impl PromptBuilder {
    /// Renders the prompt for `ctx`.
    pub fn build(&self, ctx: &PromptContext) -> String {
        let mut out = String::new();
        out.push_str(&self.preamble);
        out.push_str("\n\nEXAMPLE\n");
        let _ = write!(
            out,
            "LaTeX: {}\nJSON: {}\n",
            self.example.latex, self.example.json
        );

        out.push_str("\nRULES\n");
        for (i, rule) in self.rules.iter().enumerate() {
            let _ = writeln!(out, "{}. {rule}", i + 1);
        }

        if !ctx.known_names.is_empty() {
            out.push_str("\nKNOWN NAMES\n");
            out.push_str(&ctx.known_names.join(", "));
            out.push('\n');
        }

        if let Some(extra) = ctx.extra_instructions.as_deref().filter(|s| !s.trim().is_empty()) {
            let _ = write!(out, "\nCONTEXT\n{}\n", extra.trim());
        }

        if let Some(prior) = &ctx.prior_failure {
            out.push_str("\nPREVIOUS ATTEMPT\nYour previous reply was rejected.\n");
            if prior.output.trim().is_empty() {
                out.push_str("Reply: (empty)\n");
            } else {
                let _ = writeln!(out, "Reply: {}", prior.output.trim());
            }
            let _ = writeln!(out, "Error: {}", prior.error);
            out.push_str("Reread the rules and reply again with one corrected JSON object.\n");
        }

        let _ = write!(out, "\nLATEX INPUT: {}", ctx.latex);
        out
    }
}
