//! Conversions against the real `OpenAI` API.
//!
//! Skipped (not failed) when `OPENAI_API_KEY` is not set. Run with:
//! ```sh
//! OPENAI_API_KEY=sk-... cargo test -p texsym --test live
//! ```

#![cfg(feature = "openai")]

use texsym::{ConvertOptions, Converter, ConverterConfig};

fn live_converter() -> Option<Converter> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    if api_key.is_empty() {
        return None;
    }
    let config = ConverterConfig {
        api_key: Some(api_key),
        ..Default::default()
    };
    Some(Converter::openai(config).unwrap())
}

macro_rules! skip_without_key {
    () => {
        match live_converter() {
            Some(c) => c,
            None => {
                eprintln!("OPENAI_API_KEY not set, skipping live test");
                return;
            }
        }
    };
}

#[tokio::test]
async fn test_unit_circle() {
    let mut converter = skip_without_key!();
    let exprs = converter
        .to_sympy(r"x^2 + y^2 = 1", &ConvertOptions::default())
        .await
        .unwrap();
    assert_eq!(exprs.len(), 1);
    assert_eq!(exprs[0].to_string(), "Eq(x**2 + y**2, 1)");
}

#[tokio::test]
async fn test_mean_squared_error() {
    let mut converter = skip_without_key!();
    let conversion = converter
        .convert(
            r"L = \frac{1}{n}\sum_{i=1}^{n} (y_i - \hat{y}_i)^2",
            &ConvertOptions::default().with_failure_logs(true),
        )
        .await
        .unwrap();
    assert!(!conversion.exprs().is_empty());
    assert!(conversion.exprs()[0].to_string().starts_with("Eq(L, "));
    assert!(conversion.usage.input_tokens > 0);
}

#[tokio::test]
async fn test_two_equations() {
    let mut converter = skip_without_key!();
    let conversion = converter
        .convert(
            r"\begin{cases} a + b = 3 \\ a - b = 1 \end{cases}",
            &ConvertOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(conversion.exprs().len(), 2);
    assert!(conversion.multiple);
}
