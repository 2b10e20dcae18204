//! Access to the externally provided binding-expression grammar.
//!
//! The grammar lives in another runtime and takes a while to boot, so the
//! handle is created once through an [`ExpressionParserFactory`] and shared
//! afterwards. Failing to obtain it only disables binding-aware analysis.

use async_trait::async_trait;
use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::error::CollaboratorUnavailable;

/// A ready-to-use binding-expression parser.
pub trait ExpressionParser: Send + Sync {
    /// Module names the expression refers to, e.g. formatter modules.
    fn referenced_modules(&self, expression: &str) -> Result<Vec<String>, String>;
}

#[async_trait]
pub trait ExpressionParserFactory: Send + Sync {
    async fn create(&self) -> anyhow::Result<Arc<dyn ExpressionParser>>;
}

/// Memoizes the first successfully created parser. Failures are not cached.
#[derive(Default)]
pub struct ExpressionParserCell {
    cell: OnceCell<Arc<dyn ExpressionParser>>,
}

impl ExpressionParserCell {
    pub const fn new() -> Self {
        Self { cell: OnceCell::const_new() }
    }

    pub async fn get(
        &self,
        factory: &dyn ExpressionParserFactory,
    ) -> Result<Arc<dyn ExpressionParser>, CollaboratorUnavailable> {
        let parser = self
            .cell
            .get_or_try_init(|| async {
                debug!("Initializing expression parser");
                factory.create().await.map_err(|e| {
                    warn!("Expression parser unavailable: {:#}", e);
                    CollaboratorUnavailable { message: format!("{:#}", e) }
                })
            })
            .await?;
        Ok(Arc::clone(parser))
    }
}

static EXPRESSION_PARSER: ExpressionParserCell = ExpressionParserCell::new();

/// Returns the process-wide expression parser, creating it on first success.
pub async fn get_expression_parser(
    factory: &dyn ExpressionParserFactory,
) -> Result<Arc<dyn ExpressionParser>, CollaboratorUnavailable> {
    EXPRESSION_PARSER.get(factory).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FormatterParser;

    impl ExpressionParser for FormatterParser {
        fn referenced_modules(&self, expression: &str) -> Result<Vec<String>, String> {
            Ok(expression.split_whitespace().map(str::to_string).collect())
        }
    }

    #[derive(Default)]
    struct CountingFactory {
        calls: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl ExpressionParserFactory for CountingFactory {
        async fn create(&self) -> anyhow::Result<Arc<dyn ExpressionParser>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && call == 0 {
                return Err(anyhow!("runtime not started"));
            }
            Ok(Arc::new(FormatterParser))
        }
    }

    #[tokio::test]
    async fn test_parser_is_created_once() {
        let cell = ExpressionParserCell::new();
        let factory = CountingFactory::default();

        let first = cell.get(&factory).await.unwrap();
        let second = cell.get(&factory).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.referenced_modules("a/B c/D").unwrap(), vec!["a/B", "c/D"]);
    }

    #[tokio::test]
    async fn test_failure_is_retried() {
        let cell = ExpressionParserCell::new();
        let factory = CountingFactory { fail_first: true, ..Default::default() };

        let err = cell.get(&factory).await.err().unwrap();
        assert!(err.message.contains("runtime not started"));
        assert!(cell.get(&factory).await.is_ok());
        assert_eq!(factory.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_process_wide_parser() {
        let factory = CountingFactory::default();
        let first = get_expression_parser(&factory).await.unwrap();
        let second = get_expression_parser(&factory).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
