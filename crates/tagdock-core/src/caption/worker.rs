//! Background captioning.
//!
//! Model inference is CPU-bound and blocking, so each image runs on tokio's
//! blocking pool, bounded by a semaphore. Outcomes are reported as they
//! complete, either through a callback or over a channel the UI thread
//! drains between events.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

use super::Captioner;

/// Worker settings.
#[derive(Debug, Clone)]
pub struct CaptionOptions {
    /// Images captioned at once
    pub parallel: usize,
}

impl Default for CaptionOptions {
    fn default() -> Self {
        Self { parallel: 1 }
    }
}

/// Result of captioning one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptionOutcome {
    Success { path: PathBuf, caption: String },
    Failure { path: PathBuf, message: String },
}

impl CaptionOutcome {
    pub fn path(&self) -> &PathBuf {
        match self {
            CaptionOutcome::Success { path, .. } | CaptionOutcome::Failure { path, .. } => path,
        }
    }
}

pub struct CaptionWorker {
    captioner: Arc<dyn Captioner>,
    options: CaptionOptions,
}

impl CaptionWorker {
    pub fn new(captioner: Arc<dyn Captioner>, options: CaptionOptions) -> Self {
        Self { captioner, options }
    }

    /// Caption every path, calling `on_result` with the path's index and
    /// outcome as each one finishes.
    ///
    /// Returns `(succeeded, failed)` counts.
    pub async fn caption_batch<F>(&self, paths: &[PathBuf], on_result: F) -> (usize, usize)
    where
        F: Fn(usize, CaptionOutcome) + Send + Sync + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.options.parallel.max(1)));
        let on_result = Arc::new(on_result);
        let mut handles = Vec::with_capacity(paths.len());

        for (index, path) in paths.iter().enumerate() {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                tracing::warn!("Captioning semaphore closed, stopping batch");
                break;
            };
            let captioner = self.captioner.clone();
            let on_result = on_result.clone();
            let path = path.clone();

            handles.push(tokio::task::spawn_blocking(move || {
                let outcome = match captioner.caption_file(&path) {
                    Ok(caption) => CaptionOutcome::Success { path, caption },
                    Err(e) => {
                        tracing::debug!("Captioning {:?} failed: {e}", path);
                        CaptionOutcome::Failure {
                            path,
                            message: e.to_string(),
                        }
                    }
                };
                let success = matches!(outcome, CaptionOutcome::Success { .. });
                drop(permit);
                on_result(index, outcome);
                success
            }));
        }

        let mut succeeded = 0usize;
        let mut failed = 0usize;
        for handle in handles {
            match handle.await {
                Ok(true) => succeeded += 1,
                Ok(false) => failed += 1,
                Err(e) => {
                    tracing::error!("Captioning task panicked: {e}");
                    failed += 1;
                }
            }
        }
        (succeeded, failed)
    }

    /// Run the batch in the background, streaming outcomes over a channel.
    pub fn spawn(
        self,
        paths: Vec<PathBuf>,
    ) -> (
        mpsc::UnboundedReceiver<(usize, CaptionOutcome)>,
        JoinHandle<(usize, usize)>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            self.caption_batch(&paths, move |index, outcome| {
                // the receiver may be gone if the UI quit early
                let _ = tx.send((index, outcome));
            })
            .await
        });
        (rx, handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CaptionError, CaptionResult};
    use std::path::Path;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Captions every path with its file stem; paths containing "bad" fail.
    struct MockCaptioner {
        calls: Arc<AtomicU32>,
        delay: Option<Duration>,
        in_flight: Arc<AtomicU32>,
        max_in_flight: Arc<AtomicU32>,
    }

    impl MockCaptioner {
        fn new() -> Self {
            Self {
                calls: Arc::new(AtomicU32::new(0)),
                delay: None,
                in_flight: Arc::new(AtomicU32::new(0)),
                max_in_flight: Arc::new(AtomicU32::new(0)),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    impl Captioner for MockCaptioner {
        fn caption_file(&self, path: &Path) -> CaptionResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let name = path.to_string_lossy();
            if name.contains("bad") {
                return Err(CaptionError::Image {
                    path: path.to_path_buf(),
                    message: "Failed to decode".to_string(),
                });
            }
            let stem = path.file_stem().unwrap_or_default().to_string_lossy();
            Ok(format!("a photo of {stem}"))
        }
    }

    async fn run(
        captioner: MockCaptioner,
        paths: &[PathBuf],
        options: CaptionOptions,
    ) -> (Vec<(usize, CaptionOutcome)>, (usize, usize)) {
        let results = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = results.clone();
        let worker = CaptionWorker::new(Arc::new(captioner), options);
        let counts = worker
            .caption_batch(paths, move |index, outcome| {
                sink.lock().unwrap().push((index, outcome));
            })
            .await;
        let mut results = Arc::try_unwrap(results).unwrap().into_inner().unwrap();
        results.sort_by_key(|(index, _)| *index);
        (results, counts)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_batch_success() {
        let paths = vec![PathBuf::from("/img/beach.jpg"), PathBuf::from("/img/car.png")];
        let (results, counts) = run(MockCaptioner::new(), &paths, CaptionOptions::default()).await;

        assert_eq!(counts, (2, 0));
        assert_eq!(
            results[1],
            (
                1,
                CaptionOutcome::Success {
                    path: PathBuf::from("/img/car.png"),
                    caption: "a photo of car".to_string(),
                }
            )
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_partial_failure() {
        let paths = vec![
            PathBuf::from("/img/one.jpg"),
            PathBuf::from("/img/bad.jpg"),
            PathBuf::from("/img/two.jpg"),
        ];
        let (results, counts) = run(MockCaptioner::new(), &paths, CaptionOptions::default()).await;

        assert_eq!(counts, (2, 1));
        match &results[1].1 {
            CaptionOutcome::Failure { path, message } => {
                assert_eq!(path, &PathBuf::from("/img/bad.jpg"));
                assert!(message.contains("Failed to decode"), "Got: {message}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_empty_batch() {
        let captioner = MockCaptioner::new();
        let calls = captioner.calls.clone();
        let (results, counts) = run(captioner, &[], CaptionOptions::default()).await;
        assert_eq!(counts, (0, 0));
        assert!(results.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_semaphore_bounds_concurrency() {
        let captioner = MockCaptioner::new().with_delay(Duration::from_millis(100));
        let max_in_flight = captioner.max_in_flight.clone();
        let paths: Vec<_> = (0..6).map(|i| PathBuf::from(format!("/img/{i}.jpg"))).collect();

        let (_, counts) = run(captioner, &paths, CaptionOptions { parallel: 2 }).await;

        assert_eq!(counts, (6, 0));
        assert!(
            max_in_flight.load(Ordering::SeqCst) <= 2,
            "semaphore violated: max in flight was {}",
            max_in_flight.load(Ordering::SeqCst)
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_spawn_streams_over_channel() {
        let worker = CaptionWorker::new(Arc::new(MockCaptioner::new()), CaptionOptions::default());
        let paths = vec![PathBuf::from("/img/a.jpg"), PathBuf::from("/img/bad.jpg")];
        let (mut rx, handle) = worker.spawn(paths);

        let mut received = Vec::new();
        while let Some(item) = rx.recv().await {
            received.push(item);
        }
        assert_eq!(handle.await.unwrap(), (1, 1));
        received.sort_by_key(|(index, _)| *index);
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].1.path(), &PathBuf::from("/img/a.jpg"));
        assert!(matches!(received[1].1, CaptionOutcome::Failure { .. }));
    }
}
