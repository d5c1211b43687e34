//! Status and progress reporting for long-running operations.

use crate::error::Result;
use std::fmt;

type StatusFn = Box<dyn FnMut(&str) + Send>;
type ProgressFn = Box<dyn FnMut(u8) + Send>;

/// Callbacks and resource limits handed to loaders and transforms.
///
/// Both callbacks are optional; reporting without one is a no-op.
pub struct ProcessInfo {
    status: Option<StatusFn>,
    progress: Option<ProgressFn>,
    max_threads: usize,
}

impl Default for ProcessInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProcessInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessInfo")
            .field("status", &self.status.is_some())
            .field("progress", &self.progress.is_some())
            .field("max_threads", &self.max_threads)
            .finish()
    }
}

impl ProcessInfo {
    /// No callbacks, thread count chosen by rayon.
    pub fn new() -> Self {
        Self {
            status: None,
            progress: None,
            max_threads: 0,
        }
    }

    /// Set the status callback.
    pub fn with_status(mut self, f: impl FnMut(&str) + Send + 'static) -> Self {
        self.status = Some(Box::new(f));
        self
    }

    /// Set the progress callback. It receives a percentage in `0..=100`.
    pub fn with_progress(mut self, f: impl FnMut(u8) + Send + 'static) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    /// Limit worker threads. Zero lets rayon decide.
    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Worker thread limit. Zero lets rayon decide.
    pub fn max_threads(&self) -> usize {
        self.max_threads
    }

    /// Report a status message.
    pub fn status(&mut self, text: &str) {
        log::debug!("{}", text);
        if let Some(f) = self.status.as_mut() {
            f(text);
        }
    }

    /// Report progress, clamped to 100.
    pub fn progress(&mut self, percent: usize) {
        if let Some(f) = self.progress.as_mut() {
            f(percent.min(100) as u8);
        }
    }

    /// Run `op` inside a thread pool sized by `max_threads`.
    pub fn install<R, F>(&self, op: F) -> Result<R>
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_threads)
            .build()?;
        Ok(pool.install(op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_callbacks_receive_reports() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let (p, s) = (seen.clone(), statuses.clone());
        let mut info = ProcessInfo::new()
            .with_progress(move |v| p.lock().unwrap().push(v))
            .with_status(move |t| s.lock().unwrap().push(t.to_string()));

        info.status("Reading");
        info.progress(40);
        info.progress(250);

        assert_eq!(*seen.lock().unwrap(), vec![40, 100]);
        assert_eq!(*statuses.lock().unwrap(), vec!["Reading".to_string()]);
    }

    #[test]
    fn test_no_callbacks_is_noop() {
        let mut info = ProcessInfo::default();
        info.status("ignored");
        info.progress(10);
    }

    #[test]
    fn test_install_limits_threads() {
        let info = ProcessInfo::new().with_max_threads(2);
        let n = info.install(rayon::current_num_threads).unwrap();
        assert_eq!(n, 2);
    }
}
