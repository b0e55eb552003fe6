//! The conversion façade.
//!
//! A [`Converter`] owns everything one conversion needs: configuration,
//! the credential, the provider built from it, the registry and a
//! persistent locals overlay. Each call runs the retry orchestrator, then
//! parses the accepted envelope.

use std::collections::BTreeMap;
use std::fmt;

use texsym_core::usage::Usage;
use texsym_core::{DynProvider, ProviderFactory};
use texsym_expr::{Arity, Definition, Expr, Kind};
use tracing::{debug, instrument};

use crate::config::{ConvertOptions, ConverterConfig, Credentials};
use crate::diagnostics::{FailureLog, FailureRecord};
use crate::error::ConvertError;
use crate::parse::{ConversionResult, ExpressionParser};
use crate::registry::SymbolRegistry;
use crate::retry::{Accepted, AttemptRequest, convert_with_retry};
use crate::structured::StructuredClient;

/// The full report of one conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    /// Parsed trees, failures, and auto-registered names.
    pub result: ConversionResult,
    /// The model's notes.
    pub notes: Option<String>,
    /// Whether the input held several equations. Always `false` for a
    /// single expression.
    pub multiple: bool,
    /// Provider calls made.
    pub attempts: u32,
    /// The accepted model output.
    pub raw_json: String,
    /// Tokens over all attempts.
    pub usage: Usage,
}

impl Conversion {
    /// The parsed trees.
    pub fn exprs(&self) -> &[Expr] {
        &self.result.parsed
    }
}

/// Converts LaTeX into expression trees.
///
/// ```rust,no_run
/// use texsym::{ConvertOptions, Converter, ConverterConfig};
///
/// # async fn run() -> Result<(), texsym::ConvertError> {
/// let mut converter = Converter::openai(ConverterConfig::default())?;
/// converter.register_key(std::env::var("OPENAI_API_KEY").unwrap_or_default())?;
///
/// let exprs = converter
///     .to_sympy(r"x^2 + y^2 = 1", &ConvertOptions::default())
///     .await?;
/// assert_eq!(exprs[0].to_string(), "Eq(x**2 + y**2, 1)");
/// # Ok(())
/// # }
/// ```
pub struct Converter {
    config: ConverterConfig,
    credentials: Credentials,
    factory: Box<dyn ProviderFactory>,
    provider: Option<Box<dyn DynProvider>>,
    registry: SymbolRegistry,
    locals: BTreeMap<String, Expr>,
    last_result: Option<ConversionResult>,
    last_failure_logs: Vec<FailureRecord>,
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("config", &self.config)
            .field("credentials", &self.credentials)
            .field("factory", &self.factory.name())
            .field("has_provider", &self.provider.is_some())
            .field("registry_len", &self.registry.len())
            .field("locals", &self.locals)
            .finish_non_exhaustive()
    }
}

impl Converter {
    /// Creates a converter backed by `factory`.
    ///
    /// Fails when the configured provider is not the factory's, when the
    /// factory cannot serve the model, or when a value is out of range.
    /// A provider is built straight away if the config carries a key.
    pub fn new(
        config: ConverterConfig,
        factory: impl ProviderFactory + 'static,
    ) -> Result<Self, ConvertError> {
        if factory.name() != config.provider {
            return Err(ConvertError::UnsupportedProvider(config.provider));
        }
        if !factory.supports_model(&config.model) {
            return Err(ConvertError::UnsupportedModel {
                provider: config.provider,
                model: config.model,
            });
        }
        config.validate()?;

        let credentials = config
            .api_key
            .clone()
            .map(Credentials::new)
            .unwrap_or_default();
        let mut registry = SymbolRegistry::with_defaults();
        registry.set_conflict_policy(config.conflict_policy);

        let mut converter = Self {
            config,
            credentials: Credentials::default(),
            factory: Box::new(factory),
            provider: None,
            registry,
            locals: BTreeMap::new(),
            last_result: None,
            last_failure_logs: Vec::new(),
        };
        converter.set_credentials(credentials)?;
        Ok(converter)
    }

    /// A converter using the `OpenAI` backend.
    #[cfg(feature = "openai")]
    pub fn openai(config: ConverterConfig) -> Result<Self, ConvertError> {
        Self::new(config, texsym_openai::OpenAiFactory)
    }

    /// Sets the API key, replacing any previous one, and rebuilds the
    /// provider.
    pub fn register_key(&mut self, api_key: impl Into<String>) -> Result<(), ConvertError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ConvertError::InvalidConfig("api_key must not be empty".into()));
        }
        self.set_credentials(Credentials::new(api_key))
    }

    fn set_credentials(&mut self, credentials: Credentials) -> Result<(), ConvertError> {
        let provider = if credentials.is_set() {
            let provider_config = self.config.provider_config(&credentials);
            let provider = self
                .factory
                .build(&provider_config)
                .map_err(|e| ConvertError::InvalidConfig(format!("cannot build provider: {e}")))?;
            Some(provider)
        } else {
            None
        };
        self.credentials = credentials;
        self.provider = provider;
        Ok(())
    }

    /// Adds `name` to the registry. See [`SymbolRegistry::register`].
    pub fn register_name(
        &mut self,
        name: impl Into<String>,
        kind: Kind,
        definition: Definition,
    ) -> Result<(), ConvertError> {
        self.registry.register(name, kind, definition)
    }

    /// Registers a free symbol.
    pub fn register_symbol(&mut self, name: impl Into<String>) -> Result<(), ConvertError> {
        self.registry.register_symbol(name)
    }

    /// Registers an undefined function.
    pub fn register_function(
        &mut self,
        name: impl Into<String>,
        arity: Arity,
    ) -> Result<(), ConvertError> {
        self.registry.register_function(name, arity)
    }

    /// Replaces the locals overlay applied to every call.
    pub fn register_locals<I, K>(&mut self, mapping: I)
    where
        I: IntoIterator<Item = (K, Expr)>,
        K: Into<String>,
    {
        self.locals = mapping.into_iter().map(|(k, v)| (k.into(), v)).collect();
    }

    /// Drops the locals overlay.
    pub fn clear_locals(&mut self) {
        self.locals.clear();
    }

    /// The registry.
    pub fn registry(&self) -> &SymbolRegistry {
        &self.registry
    }

    /// The configuration.
    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// The parse result of the most recent call that got that far.
    pub fn last_result(&self) -> Option<&ConversionResult> {
        self.last_result.as_ref()
    }

    /// Failures captured by the most recent call. Empty unless that call
    /// enabled `failure_logs`.
    pub fn last_failure_logs(&self) -> &[FailureRecord] {
        &self.last_failure_logs
    }

    /// Converts `latex` and returns the parsed trees.
    ///
    /// Strings that fail to parse are dropped from the return value and
    /// listed in [`last_result`](Self::last_result). If none parse the
    /// call fails with [`ConvertError::SympyConversion`].
    pub async fn to_sympy(
        &mut self,
        latex: &str,
        options: &ConvertOptions,
    ) -> Result<Vec<Expr>, ConvertError> {
        let conversion = self.convert(latex, options).await?;
        Ok(conversion.result.parsed)
    }

    /// Converts `latex` and returns the full report.
    #[instrument(skip_all, fields(model = %self.config.model))]
    pub async fn convert(
        &mut self,
        latex: &str,
        options: &ConvertOptions,
    ) -> Result<Conversion, ConvertError> {
        self.last_result = None;
        self.last_failure_logs.clear();

        let mut diagnostics = FailureLog::new(options.failure_logs);
        let outcome = self.run(latex, options, &mut diagnostics).await;
        self.last_failure_logs = diagnostics.into_records();
        let (accepted, result) = outcome?;

        debug!(
            attempts = accepted.attempts,
            parsed = result.parsed.len(),
            failed = result.failures.len(),
            "conversion finished"
        );
        self.last_result = Some(result.clone());
        if result.parsed.is_empty() {
            return Err(ConvertError::SympyConversion {
                failures: result.failures,
            });
        }

        let envelope = accepted.envelope;
        let multiple = envelope.exprs.len() > 1 && envelope.multiple.unwrap_or(true);
        Ok(Conversion {
            result,
            notes: envelope.notes,
            multiple,
            attempts: accepted.attempts,
            raw_json: accepted.raw,
            usage: accepted.usage,
        })
    }

    async fn run(
        &self,
        latex: &str,
        options: &ConvertOptions,
        diagnostics: &mut FailureLog,
    ) -> Result<(Accepted, ConversionResult), ConvertError> {
        let client =
            StructuredClient::try_new(self.provider.as_deref(), self.config.request.clone())?;

        let mut locals = self.locals.clone();
        locals.extend(options.locals.iter().map(|(k, v)| (k.clone(), v.clone())));

        let request = AttemptRequest {
            latex: latex.to_owned(),
            extra_instructions: options.extra_instructions.clone(),
            known_names: self.known_names(&locals),
            max_attempts: options.max_attempts.unwrap_or(self.config.max_attempts),
        };
        let accepted =
            convert_with_retry(&client, &self.config.prompt, &request, diagnostics).await?;

        let result = ExpressionParser::new(&self.registry, &locals, self.config.parser)
            .parse_all(&accepted.envelope);
        for failure in &result.failures {
            diagnostics.log_failure(
                &accepted.prompt,
                &accepted.raw,
                &format_args!("expression {} '{}': {}", failure.index, failure.raw, failure.error),
            );
        }
        Ok((accepted, result))
    }

    fn known_names(&self, locals: &BTreeMap<String, Expr>) -> Vec<String> {
        let mut names: Vec<String> = self.registry.names().into_iter().map(str::to_owned).collect();
        for name in locals.keys() {
            if self.registry.resolve(name).is_none() {
                names.push(name.clone());
            }
        }
        names
    }
}
