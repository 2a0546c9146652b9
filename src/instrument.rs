//! Uniform execution envelope for write operations.
//!
//! Every write path (create event, create/rename/delete topic,
//! create/update DC) runs through [`perform_operation`]: one latency
//! observation and exactly one outcome counter increment per call, with
//! failures wrapped in the operation name. Read and streaming handlers
//! apply the same timing/counting inline because their success path
//! returns data rather than a bare id.

use std::future::Future;
use std::time::Instant;

use crate::error::GatewayError;
use crate::metrics;
use crate::proto::WriteResponse;

/// Run one write operation: time it, count its outcome under `operation`,
/// and turn the store-assigned id into the uniform acknowledgment shape.
/// The underlying cause is never swallowed; it rides inside the returned
/// status behind the operation name.
pub async fn perform_operation<F, Fut>(
    operation: &str,
    op: F,
) -> Result<tonic::Response<WriteResponse>, tonic::Status>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<String, GatewayError>>,
{
    let start = Instant::now();
    let result = op().await;
    metrics::record_duration(operation, start.elapsed());

    match result {
        Ok(id) => {
            metrics::record_outcome(operation, true);
            Ok(tonic::Response::new(WriteResponse { id }))
        }
        Err(err) => {
            metrics::record_outcome(operation, false);
            tracing::error!(operation = %operation, error = %err, "operation failed");
            Err(err.in_operation(operation))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_success_returns_write_response() {
        let calls = AtomicU32::new(0);
        let response = perform_operation("AddEvent", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok("id-123".to_string()) }
        })
        .await
        .unwrap();

        assert_eq!(response.into_inner().id, "id-123");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_wraps_operation_name() {
        let status = perform_operation("AddTopic", || async {
            Err(GatewayError::Store("backend down".to_string()))
        })
        .await
        .unwrap_err();

        assert_eq!(status.code(), tonic::Code::Internal);
        assert!(status.message().contains("operation AddTopic"));
        assert!(status.message().contains("backend down"));
    }

    /// Find the counter line carrying both labels and return its value.
    fn counter_value(rendered: &str, operation: &str, outcome: &str) -> Option<String> {
        rendered
            .lines()
            .find(|l| {
                l.starts_with("gateway_requests_total")
                    && l.contains(&format!("operation=\"{}\"", operation))
                    && l.contains(&format!("outcome=\"{}\"", outcome))
            })
            .and_then(|l| l.rsplit(' ').next().map(str::to_string))
    }

    #[test]
    fn test_counters_recorded_once_per_call() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        ::metrics::with_local_recorder(&recorder, || {
            futures::executor::block_on(async {
                let _ = perform_operation("AddDC", || async { Ok("x".to_string()) }).await;
                let _ = perform_operation("AddDC", || async {
                    Err(GatewayError::Store("boom".to_string()))
                })
                .await;
            });
        });

        let rendered = handle.render();
        assert_eq!(counter_value(&rendered, "AddDC", "success").as_deref(), Some("1"));
        assert_eq!(counter_value(&rendered, "AddDC", "failure").as_deref(), Some("1"));
    }
}
