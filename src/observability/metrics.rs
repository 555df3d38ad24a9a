//! Storage operation metrics.

use std::time::Instant;

/// Records operation metrics for storage operations.
///
/// Emits `storage_operations_total` (counter) and
/// `storage_operation_duration_ms` (histogram), labelled by backend,
/// operation and status. Without an installed recorder these are no-ops.
///
/// ```ignore
/// let start = Instant::now();
/// let result = do_work();
/// record_operation_metrics("sqlite", "get_todos", start, status_label(&result));
/// ```
pub fn record_operation_metrics(
    backend: &'static str,
    operation: &'static str,
    start: Instant,
    status: &'static str,
) {
    metrics::counter!(
        "storage_operations_total",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "storage_operation_duration_ms",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}

/// Maps a result to the `status` label.
pub const fn status_label<T, E>(result: &Result<T, E>) -> &'static str {
    if result.is_ok() { "success" } else { "error" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_operation_metrics_without_recorder() {
        let start = Instant::now();
        record_operation_metrics("sqlite", "test_operation", start, "success");
        record_operation_metrics("key_value", "test_operation", start, "error");
    }

    #[test]
    fn test_status_label() {
        let ok: Result<(), ()> = Ok(());
        let err: Result<(), ()> = Err(());
        assert_eq!(status_label(&ok), "success");
        assert_eq!(status_label(&err), "error");
    }
}
