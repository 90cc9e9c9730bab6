//! Background decoding.
//!
//! At most one worker thread runs at a time. It owns a [`DecodeJob`] snapshot
//! and reports through [`Shared`], never touching the processor itself.
//! Cancellation is cooperative: the worker checks the flag around every
//! develop, and result events are published under a gate that the canceller
//! also takes, so nothing is emitted once a cancel has been requested.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use lumio_core::{encode_data_uri, DecodeJob, DecodedImage};
use parking_lot::Mutex;

use crate::events::{EventHub, ProcessorEvent};
use crate::{PreviewSize, ProcessorError};

const UNKNOWN_DECODE_ERROR: &str = "Unknown decode error";
const WORKER_PANICKED: &str = "Decode worker panicked";

/// State shared between the processor and its worker.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub(crate) events: EventHub,
    decoding: AtomicBool,
    last_error: Mutex<String>,
    gate: Mutex<()>,
}

impl Shared {
    pub(crate) fn is_decoding(&self) -> bool {
        self.decoding.load(Ordering::SeqCst)
    }

    /// Update the decoding flag, emitting only when it changes.
    pub(crate) fn set_decoding(&self, decoding: bool) {
        if self.decoding.swap(decoding, Ordering::SeqCst) != decoding {
            self.events.emit(ProcessorEvent::DecodingChanged(decoding));
        }
    }

    pub(crate) fn last_error(&self) -> String {
        self.last_error.lock().clone()
    }

    pub(crate) fn set_last_error(&self, message: impl Into<String>) {
        *self.last_error.lock() = message.into();
    }

    pub(crate) fn clear_last_error(&self) {
        self.last_error.lock().clear();
    }

    /// Record a failed decode and notify subscribers.
    pub(crate) fn fail(&self, message: String) {
        let message = if message.is_empty() {
            UNKNOWN_DECODE_ERROR.to_string()
        } else {
            message
        };
        tracing::warn!("Decode failed: {}", message);
        self.set_last_error(message.clone());
        self.set_decoding(false);
        self.events.emit(ProcessorEvent::DecodeFailed(message));
    }

    /// Run `publish` unless the task was cancelled. Returns whether it ran.
    fn publish(&self, cancel: &AtomicBool, publish: impl FnOnce()) -> bool {
        let _gate = self.gate.lock();
        if cancel.load(Ordering::Acquire) {
            return false;
        }
        publish();
        true
    }
}

/// What a worker should produce.
#[derive(Debug, Clone)]
pub(crate) enum DecodePlan {
    Single(PreviewSize),
    Progressive(Vec<PreviewSize>),
}

/// Handle to the (at most one) background decode.
#[derive(Debug, Default)]
pub(crate) struct DecodeWorker {
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DecodeWorker {
    /// Spawn a worker that develops `job`. Any previous worker must have been
    /// cancelled first.
    pub(crate) fn start(
        &mut self,
        job: DecodeJob,
        plan: DecodePlan,
        jpeg_quality: u8,
        shared: &Arc<Shared>,
    ) {
        tracing::debug!("Starting {:?} decode of {}", plan, job.path().display());
        self.spawn(plan, jpeg_quality, shared, move |size| {
            Ok(job.develop(size.width, size.height)?)
        });
    }

    fn spawn<F>(&mut self, plan: DecodePlan, jpeg_quality: u8, shared: &Arc<Shared>, develop: F)
    where
        F: Fn(PreviewSize) -> Result<DecodedImage, ProcessorError> + Send + 'static,
    {
        debug_assert!(self.handle.is_none());
        let cancel = Arc::clone(&self.cancel);
        let shared = Arc::clone(shared);

        self.handle = Some(thread::spawn(move || {
            let start = Instant::now();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| match &plan {
                DecodePlan::Single(size) => {
                    run_single(&develop, *size, jpeg_quality, &cancel, &shared)
                }
                DecodePlan::Progressive(stages) => {
                    run_progressive(&develop, stages, jpeg_quality, &cancel, &shared)
                }
            }));
            if outcome.is_err() {
                shared.publish(&cancel, || shared.fail(WORKER_PANICKED.to_string()));
            }
            tracing::debug!(
                "Decode worker exited after {:.1}ms",
                start.elapsed().as_secs_f64() * 1000.0
            );
        }));
    }

    /// Request cancellation and wait for the worker to exit.
    ///
    /// Returns false when no worker was running.
    pub(crate) fn cancel(&mut self, shared: &Shared) -> bool {
        let Some(handle) = self.handle.take() else {
            return false;
        };

        {
            let _gate = shared.gate.lock();
            self.cancel.store(true, Ordering::Release);
        }
        if handle.join().is_err() {
            tracing::warn!("Decode worker panicked");
        }
        self.cancel.store(false, Ordering::Release);
        tracing::debug!("Decode worker cancelled");
        true
    }
}

/// Develop one size and encode it. `None` means the task was cancelled.
fn develop_uri(
    develop: &impl Fn(PreviewSize) -> Result<DecodedImage, ProcessorError>,
    size: PreviewSize,
    jpeg_quality: u8,
    cancel: &AtomicBool,
) -> Option<Result<String, ProcessorError>> {
    if cancel.load(Ordering::Acquire) {
        return None;
    }
    let developed = develop(size);
    if cancel.load(Ordering::Acquire) {
        return None;
    }

    Some(developed.and_then(|image| Ok(encode_data_uri(&image, jpeg_quality)?)))
}

fn run_single(
    develop: &impl Fn(PreviewSize) -> Result<DecodedImage, ProcessorError>,
    size: PreviewSize,
    jpeg_quality: u8,
    cancel: &AtomicBool,
    shared: &Shared,
) {
    match develop_uri(develop, size, jpeg_quality, cancel) {
        None => {}
        Some(Ok(uri)) => {
            shared.publish(cancel, || {
                shared.events.emit(ProcessorEvent::DecodeFinished(uri));
                shared.set_decoding(false);
            });
        }
        Some(Err(e)) => {
            shared.publish(cancel, || shared.fail(e.to_string()));
        }
    }
}

fn run_progressive(
    develop: &impl Fn(PreviewSize) -> Result<DecodedImage, ProcessorError>,
    stages: &[PreviewSize],
    jpeg_quality: u8,
    cancel: &AtomicBool,
    shared: &Shared,
) {
    let total_stages = stages.len();
    let mut best: Option<String> = None;

    for (index, &size) in stages.iter().enumerate() {
        let stage = index + 1;
        match develop_uri(develop, size, jpeg_quality, cancel) {
            None => return,
            Some(Ok(uri)) => {
                let published = shared.publish(cancel, || {
                    shared.events.emit(ProcessorEvent::ProgressiveStageFinished {
                        image: uri.clone(),
                        stage,
                        total_stages,
                    });
                });
                if !published {
                    return;
                }
                best = Some(uri);
            }
            Some(Err(e)) if best.is_none() => {
                shared.publish(cancel, || shared.fail(e.to_string()));
                return;
            }
            Some(Err(e)) => {
                tracing::warn!(
                    "Progressive stage {}/{} ({}) failed, keeping previous stage: {}",
                    stage,
                    total_stages,
                    size,
                    e
                );
                break;
            }
        }
    }

    if let Some(best) = best {
        shared.publish(cancel, || {
            shared.events.emit(ProcessorEvent::ProgressiveFinished(best));
            shared.set_decoding(false);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use lumio_core::DecodeError;

    fn image(size: PreviewSize) -> DecodedImage {
        let len = size.width as usize * size.height as usize * 3;
        DecodedImage::new(size.width, size.height, vec![128; len])
    }

    fn uri(width: u32, height: u32) -> String {
        encode_data_uri(&image(PreviewSize::new(width, height)), 85).unwrap()
    }

    fn sensor_error() -> ProcessorError {
        DecodeError::Develop("sensor read".to_string()).into()
    }

    /// Run a plan to completion and return the shared state and every event.
    fn run_to_end<F>(plan: DecodePlan, develop: F) -> (Arc<Shared>, Vec<ProcessorEvent>)
    where
        F: Fn(PreviewSize) -> Result<DecodedImage, ProcessorError> + Send + 'static,
    {
        let shared = Arc::new(Shared::default());
        let rx = shared.events.subscribe();
        let mut worker = DecodeWorker::default();
        shared.set_decoding(true);
        worker.spawn(plan, 85, &shared, develop);
        worker.handle.take().unwrap().join().unwrap();
        let events = rx.try_iter().collect();
        (shared, events)
    }

    #[test]
    fn test_single_success() {
        let (shared, events) =
            run_to_end(DecodePlan::Single(PreviewSize::new(8, 6)), |size| Ok(image(size)));
        assert_eq!(
            events,
            vec![
                ProcessorEvent::DecodingChanged(true),
                ProcessorEvent::DecodeFinished(uri(8, 6)),
                ProcessorEvent::DecodingChanged(false),
            ]
        );
        assert!(!shared.is_decoding());
    }

    #[test]
    fn test_single_failure_reports_decoder_message() {
        let (shared, events) =
            run_to_end(DecodePlan::Single(PreviewSize::new(8, 6)), |_| Err(sensor_error()));
        assert_eq!(
            events,
            vec![
                ProcessorEvent::DecodingChanged(true),
                ProcessorEvent::DecodingChanged(false),
                ProcessorEvent::DecodeFailed("Failed to develop RAW image: sensor read".into()),
            ]
        );
        assert_eq!(shared.last_error(), "Failed to develop RAW image: sensor read");
    }

    #[test]
    fn test_progressive_first_stage_failure() {
        let stages = vec![PreviewSize::new(10, 10), PreviewSize::new(20, 20)];
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let (shared, events) = run_to_end(DecodePlan::Progressive(stages), move |size| {
            counter.fetch_add(1, Ordering::SeqCst);
            if size.width == 10 {
                Err(sensor_error())
            } else {
                Ok(image(size))
            }
        });
        assert_eq!(
            events,
            vec![
                ProcessorEvent::DecodingChanged(true),
                ProcessorEvent::DecodingChanged(false),
                ProcessorEvent::DecodeFailed("Failed to develop RAW image: sensor read".into()),
            ]
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!shared.is_decoding());
    }

    #[test]
    fn test_progressive_later_failure_keeps_best_stage() {
        let stages = vec![
            PreviewSize::new(10, 10),
            PreviewSize::new(20, 20),
            PreviewSize::new(30, 30),
        ];
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let (shared, events) = run_to_end(DecodePlan::Progressive(stages), move |size| {
            counter.fetch_add(1, Ordering::SeqCst);
            if size.width == 20 {
                Err(sensor_error())
            } else {
                Ok(image(size))
            }
        });
        assert_eq!(
            events,
            vec![
                ProcessorEvent::DecodingChanged(true),
                ProcessorEvent::ProgressiveStageFinished {
                    image: uri(10, 10),
                    stage: 1,
                    total_stages: 3,
                },
                ProcessorEvent::ProgressiveFinished(uri(10, 10)),
                ProcessorEvent::DecodingChanged(false),
            ]
        );
        // The third stage is never attempted.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(shared.last_error(), "");
    }

    #[test]
    fn test_panicking_develop_is_reported() {
        let (shared, events) = run_to_end(DecodePlan::Single(PreviewSize::new(8, 6)), |_| {
            panic!("demosaic blew up")
        });
        assert_eq!(
            events,
            vec![
                ProcessorEvent::DecodingChanged(true),
                ProcessorEvent::DecodingChanged(false),
                ProcessorEvent::DecodeFailed("Decode worker panicked".into()),
            ]
        );
        assert!(!shared.is_decoding());
        assert_eq!(shared.last_error(), "Decode worker panicked");
    }

    #[test]
    fn test_panicking_progressive_stage_is_reported() {
        let stages = vec![PreviewSize::new(10, 10), PreviewSize::new(20, 20)];
        let (shared, events) = run_to_end(DecodePlan::Progressive(stages), |size| {
            if size.width == 20 {
                panic!("demosaic blew up");
            }
            Ok(image(size))
        });
        assert_eq!(
            events.last(),
            Some(&ProcessorEvent::DecodeFailed("Decode worker panicked".into()))
        );
        assert!(!shared.is_decoding());
    }

    #[test]
    fn test_set_decoding_emits_on_change_only() {
        let shared = Shared::default();
        let rx = shared.events.subscribe();
        shared.set_decoding(true);
        shared.set_decoding(true);
        shared.set_decoding(false);
        shared.set_decoding(false);
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                ProcessorEvent::DecodingChanged(true),
                ProcessorEvent::DecodingChanged(false),
            ]
        );
    }

    #[test]
    fn test_fail_with_empty_message() {
        let shared = Shared::default();
        let rx = shared.events.subscribe();
        shared.set_decoding(true);
        shared.fail(String::new());
        assert_eq!(shared.last_error(), "Unknown decode error");
        assert!(!shared.is_decoding());
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events.last(),
            Some(&ProcessorEvent::DecodeFailed("Unknown decode error".into()))
        );
    }

    #[test]
    fn test_publish_skipped_after_cancel() {
        let shared = Shared::default();
        let cancel = AtomicBool::new(true);
        let mut ran = false;
        assert!(!shared.publish(&cancel, || ran = true));
        assert!(!ran);

        cancel.store(false, Ordering::Release);
        assert!(shared.publish(&cancel, || ran = true));
        assert!(ran);
    }

    #[test]
    fn test_cancel_without_worker() {
        let shared = Shared::default();
        let mut worker = DecodeWorker::default();
        assert!(!worker.cancel(&shared));
    }
}
