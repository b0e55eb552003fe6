//! A synchronous wrapper around [`Converter`].
//!
//! Owns a current-thread Tokio runtime and blocks on each call. Do not use
//! it from inside another runtime; call the async API there instead.

use texsym_core::ProviderFactory;
use texsym_expr::{Arity, Definition, Expr, Kind};
use tokio::runtime::{Builder, Runtime};

use crate::config::{ConvertOptions, ConverterConfig};
use crate::converter::{Conversion, Converter};
use crate::diagnostics::FailureRecord;
use crate::error::ConvertError;
use crate::parse::ConversionResult;

/// Blocking counterpart of [`Converter`].
#[derive(Debug)]
pub struct BlockingConverter {
    inner: Converter,
    runtime: Runtime,
}

impl BlockingConverter {
    /// See [`Converter::new`].
    pub fn new(
        config: ConverterConfig,
        factory: impl ProviderFactory + 'static,
    ) -> Result<Self, ConvertError> {
        Self::from_converter(Converter::new(config, factory)?)
    }

    /// See [`Converter::openai`].
    #[cfg(feature = "openai")]
    pub fn openai(config: ConverterConfig) -> Result<Self, ConvertError> {
        Self::from_converter(Converter::openai(config)?)
    }

    /// Wraps an existing converter.
    pub fn from_converter(inner: Converter) -> Result<Self, ConvertError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ConvertError::Runtime)?;
        Ok(Self { inner, runtime })
    }

    /// See [`Converter::to_sympy`].
    pub fn to_sympy(
        &mut self,
        latex: &str,
        options: &ConvertOptions,
    ) -> Result<Vec<Expr>, ConvertError> {
        self.runtime.block_on(self.inner.to_sympy(latex, options))
    }

    /// See [`Converter::convert`].
    pub fn convert(
        &mut self,
        latex: &str,
        options: &ConvertOptions,
    ) -> Result<Conversion, ConvertError> {
        self.runtime.block_on(self.inner.convert(latex, options))
    }

    /// See [`Converter::register_key`].
    pub fn register_key(&mut self, api_key: impl Into<String>) -> Result<(), ConvertError> {
        self.inner.register_key(api_key)
    }

    /// See [`Converter::register_name`].
    pub fn register_name(
        &mut self,
        name: impl Into<String>,
        kind: Kind,
        definition: Definition,
    ) -> Result<(), ConvertError> {
        self.inner.register_name(name, kind, definition)
    }

    /// See [`Converter::register_symbol`].
    pub fn register_symbol(&mut self, name: impl Into<String>) -> Result<(), ConvertError> {
        self.inner.register_symbol(name)
    }

    /// See [`Converter::register_function`].
    pub fn register_function(
        &mut self,
        name: impl Into<String>,
        arity: Arity,
    ) -> Result<(), ConvertError> {
        self.inner.register_function(name, arity)
    }

    /// See [`Converter::register_locals`].
    pub fn register_locals<I, K>(&mut self, mapping: I)
    where
        I: IntoIterator<Item = (K, Expr)>,
        K: Into<String>,
    {
        self.inner.register_locals(mapping);
    }

    /// See [`Converter::clear_locals`].
    pub fn clear_locals(&mut self) {
        self.inner.clear_locals();
    }

    /// See [`Converter::last_result`].
    pub fn last_result(&self) -> Option<&ConversionResult> {
        self.inner.last_result()
    }

    /// See [`Converter::last_failure_logs`].
    pub fn last_failure_logs(&self) -> &[FailureRecord] {
        self.inner.last_failure_logs()
    }

    /// The wrapped converter.
    pub fn inner(&self) -> &Converter {
        &self.inner
    }

    /// The wrapped converter, mutably.
    pub fn inner_mut(&mut self) -> &mut Converter {
        &mut self.inner
    }

    /// Unwraps the converter, dropping the runtime.
    pub fn into_inner(self) -> Converter {
        self.inner
    }
}
