//! Progress reporting for install invocations.

use hatch_types::{InstallProgress, InstallStatus};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Receives [`InstallProgress`] updates at each state transition.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, progress: InstallProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(InstallProgress) + Send + Sync,
{
    fn emit(&self, progress: InstallProgress) {
        self(progress)
    }
}

impl ProgressSink for UnboundedSender<InstallProgress> {
    fn emit(&self, progress: InstallProgress) {
        // A dropped receiver means nobody is listening anymore.
        let _ = self.send(progress);
    }
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _progress: InstallProgress) {}
}

/// Indicative percentage for entering `status`.
fn percent(status: InstallStatus) -> u8 {
    match status {
        InstallStatus::Resolving => 10,
        InstallStatus::Validating => 40,
        InstallStatus::Loading => 70,
        InstallStatus::Complete => 100,
        InstallStatus::Failed => 0,
    }
}

/// Per-invocation reporter. Percentages never decrease.
pub(crate) struct ProgressReporter<'a> {
    id: String,
    sink: &'a dyn ProgressSink,
    last: u8,
}

impl<'a> ProgressReporter<'a> {
    pub(crate) fn new(id: impl Into<String>, sink: &'a dyn ProgressSink) -> Self {
        Self {
            id: id.into(),
            sink,
            last: 0,
        }
    }

    /// Report later updates under `id`.
    pub(crate) fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub(crate) fn update(&mut self, status: InstallStatus, message: impl Into<String>) {
        self.send(status, Some(message.into()), None);
    }

    pub(crate) fn fail(&mut self, error: impl ToString) {
        self.send(InstallStatus::Failed, None, Some(error.to_string()));
    }

    fn send(&mut self, status: InstallStatus, message: Option<String>, error: Option<String>) {
        self.last = self.last.max(percent(status));
        debug!(id = %self.id, %status, progress = self.last, "Install progress");

        self.sink.emit(InstallProgress {
            id: self.id.clone(),
            status,
            progress: self.last,
            message,
            error,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn test_failed_keeps_last_percentage() {
        let seen = Mutex::new(Vec::new());
        let sink = |p: InstallProgress| seen.lock().unwrap().push(p);

        let mut reporter = ProgressReporter::new("a", &sink);
        reporter.update(InstallStatus::Resolving, "resolving");
        reporter.update(InstallStatus::Loading, "loading");
        reporter.fail("no activation function");

        let seen = seen.into_inner().unwrap();
        let percents: Vec<u8> = seen.iter().map(|p| p.progress).collect();
        assert_eq!(percents, vec![10, 70, 70]);
        assert_eq!(seen[2].status, InstallStatus::Failed);
        assert_eq!(seen[2].error.as_deref(), Some("no activation function"));
    }

    #[test]
    fn test_set_id_applies_to_later_updates() {
        let seen = Mutex::new(Vec::new());
        let sink = |p: InstallProgress| seen.lock().unwrap().push(p);

        let mut reporter = ProgressReporter::new("https://example.com/a", &sink);
        reporter.update(InstallStatus::Resolving, "resolving");
        reporter.set_id("com.example.a");
        reporter.update(InstallStatus::Validating, "validating");

        let ids: Vec<String> = seen.into_inner().unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["https://example.com/a", "com.example.a"]);
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let mut reporter = ProgressReporter::new("a", &tx);
        reporter.update(InstallStatus::Complete, "done");

        let progress = rx.recv().await.unwrap();
        assert_eq!(progress.status, InstallStatus::Complete);
        assert_eq!(progress.progress, 100);
    }

    #[test]
    fn test_closed_channel_is_ignored() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);

        ProgressReporter::new("a", &tx).update(InstallStatus::Resolving, "resolving");
    }
}
