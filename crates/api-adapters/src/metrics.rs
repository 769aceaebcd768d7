//! Prometheus metrics for the HTTP surface.

use domains::errors::AppError;
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

pub const CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OperationLabels {
    pub operation: String,
    pub outcome: String,
}

/// Exposed as `thoughtboard_operations_total{operation, outcome}`.
pub struct Metrics {
    registry: Registry,
    operations: Family<OperationLabels, Counter>,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let operations = Family::<OperationLabels, Counter>::default();
        registry.register(
            "thoughtboard_operations",
            "Service operations by outcome",
            operations.clone(),
        );
        Self { registry, operations }
    }

    /// Counts one finished operation.
    pub fn observe<T>(&self, operation: &str, result: &Result<T, AppError>) {
        let outcome = match result {
            Ok(_) => "success",
            Err(AppError::NotFound(..)) => "not_found",
            Err(AppError::ValidationError(_)) => "invalid",
            Err(AppError::Forbidden(_)) => "forbidden",
            Err(AppError::Storage { .. }) => "error",
        };
        self.operations
            .get_or_create(&labels(operation, outcome))
            .inc();
    }

    pub fn count(&self, operation: &str, outcome: &str) -> u64 {
        self.operations
            .get_or_create(&labels(operation, outcome))
            .get()
    }

    /// OpenMetrics text exposition of every registered metric.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut body = String::new();
        encode(&mut body, &self.registry)?;
        Ok(body)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn labels(operation: &str, outcome: &str) -> OperationLabels {
    OperationLabels {
        operation: operation.to_owned(),
        outcome: outcome.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_are_counted_per_operation() {
        let metrics = Metrics::new();
        metrics.observe("create_thought", &Ok::<(), AppError>(()));
        metrics.observe("create_thought", &Ok::<(), AppError>(()));
        metrics.observe::<()>("fetch_thought", &Err(AppError::not_found("Thought", "x")));

        assert_eq!(metrics.count("create_thought", "success"), 2);
        assert_eq!(metrics.count("fetch_thought", "not_found"), 1);

        let text = metrics.encode().unwrap();
        assert!(text.contains("thoughtboard_operations_total"));
        assert!(text.contains(r#"operation="create_thought""#));
    }
}
