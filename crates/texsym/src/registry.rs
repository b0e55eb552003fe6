//! The symbol and function registry.
//!
//! Maps the names a model may use to what they build. A registry starts
//! from the standard vocabulary ([`SymbolRegistry::with_defaults`]) and
//! grows through [`SymbolRegistry::register`]; it is handed straight to
//! the expression parser as a [`Namespace`].

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use texsym_expr::{Arity, CallArgs, Definition, Expr, Kind, Namespace};

use crate::error::ConvertError;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// What happens when a registered name is registered again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// The new entry replaces the old one in place.
    #[default]
    Replace,
    /// Re-registration fails with [`ConvertError::NameConflict`].
    Reject,
}

/// One registered name.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The name as the model writes it.
    pub name: String,
    /// How the name behaves.
    pub kind: Kind,
    /// What the name resolves to.
    pub definition: Definition,
}

/// Ordered, uniquely-keyed table of names.
#[derive(Debug, Clone, Default)]
pub struct SymbolRegistry {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    policy: ConflictPolicy,
}

impl SymbolRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry seeded with the standard vocabulary: relations, big
    /// operators, structural builders, elementary functions and
    /// constants.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for builtin in texsym_expr::builtins() {
            registry.insert(Entry {
                name: builtin.name.to_owned(),
                kind: builtin.kind,
                definition: builtin.definition,
            });
        }
        registry
    }

    /// Sets the re-registration policy.
    pub fn set_conflict_policy(&mut self, policy: ConflictPolicy) {
        self.policy = policy;
    }

    /// The re-registration policy.
    pub fn conflict_policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Registers `name`.
    ///
    /// A [`Kind::Symbol`] takes a [`Definition::Value`]; functions and
    /// operators take a [`Definition::Callable`]. Function constructors
    /// are wrapped with an arity check.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        kind: Kind,
        definition: Definition,
    ) -> Result<(), ConvertError> {
        let name = name.into();
        if !IDENTIFIER.is_match(&name) {
            return Err(ConvertError::InvalidRegistration {
                name,
                reason: "not an identifier".into(),
            });
        }

        let definition = match (kind, definition) {
            (Kind::Symbol, def @ Definition::Value(_))
            | (Kind::Operator, def @ Definition::Callable(_)) => def,
            (Kind::Function(arity), Definition::Callable(build)) => {
                let callee = name.clone();
                Definition::callable(move |args: CallArgs| {
                    arity.check(&callee, args.positional.len())?;
                    build(args)
                })
            }
            (Kind::Symbol, Definition::Callable(_)) => {
                return Err(ConvertError::InvalidRegistration {
                    name,
                    reason: "a symbol needs a value, not a constructor".into(),
                });
            }
            (_, Definition::Value(_)) => {
                return Err(ConvertError::InvalidRegistration {
                    name,
                    reason: "a function or operator needs a constructor, not a value".into(),
                });
            }
        };

        if self.policy == ConflictPolicy::Reject && self.index.contains_key(&name) {
            return Err(ConvertError::NameConflict(name));
        }
        tracing::debug!(name = %name, ?kind, "registering name");
        self.insert(Entry {
            name,
            kind,
            definition,
        });
        Ok(())
    }

    /// Registers `name` as a free symbol.
    pub fn register_symbol(&mut self, name: impl Into<String>) -> Result<(), ConvertError> {
        let name = name.into();
        let value = Definition::Value(Expr::symbol(name.as_str()));
        self.register(name, Kind::Symbol, value)
    }

    /// Registers `name` as an undefined function applied to `arity`
    /// arguments.
    pub fn register_function(
        &mut self,
        name: impl Into<String>,
        arity: Arity,
    ) -> Result<(), ConvertError> {
        let name = name.into();
        let definition = Definition::applied(&name, arity);
        self.register(name, Kind::Function(arity), definition)
    }

    /// Looks up `name`. `None` means it is not registered.
    pub fn resolve(&self, name: &str) -> Option<&Entry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// All names in registration order. A replaced entry keeps its
    /// original position.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Number of names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no name is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, entry: Entry) {
        if let Some(&i) = self.index.get(&entry.name) {
            self.entries[i] = entry;
        } else {
            self.index.insert(entry.name.clone(), self.entries.len());
            self.entries.push(entry);
        }
    }
}

impl Namespace for SymbolRegistry {
    fn lookup(&self, name: &str) -> Option<&Definition> {
        self.resolve(name).map(|e| &e.definition)
    }
}
