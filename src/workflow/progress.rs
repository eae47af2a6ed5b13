//! Progress notifications for workflow runs.
//!
//! The executor reports through this trait instead of logging directly so
//! tests can assert on the triggered/completed pairing.

/// Trait for workflow progress notifications
pub trait ProgressReporter: Send + Sync {
    /// An operation has started for the named subject
    fn triggered(&self, operation: &str, subject: &str);

    /// An operation finished normally
    fn completed(&self, operation: &str, subject: &str);

    /// An operation failed; `error` carries the full cause chain
    fn failed(&self, operation: &str, subject: &str, error: &(dyn std::error::Error + 'static));
}

/// Default reporter backed by `tracing`.
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn triggered(&self, operation: &str, subject: &str) {
        tracing::info!("{} for {} has been triggered", operation, subject);
    }

    fn completed(&self, operation: &str, subject: &str) {
        tracing::info!("{} for {} has been completed", operation, subject);
    }

    fn failed(&self, operation: &str, subject: &str, error: &(dyn std::error::Error + 'static)) {
        tracing::error!("{} for {} failed: {}", operation, subject, error);
        let mut source = error.source();
        while let Some(cause) = source {
            tracing::error!("  caused by: {}", cause);
            source = cause.source();
        }
    }
}
