//! Change notifications delivered to subscribers.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

/// A state change or decode result reported by [`crate::RawProcessor`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessorEvent {
    /// The open file changed (opened, replaced or closed).
    FileChanged,

    /// The background decoding flag flipped.
    DecodingChanged(bool),

    /// A single background decode finished with a JPEG data URI.
    DecodeFinished(String),

    /// One stage of a progressive decode is ready.
    ProgressiveStageFinished {
        image: String,
        stage: usize,
        total_stages: usize,
    },

    /// A progressive decode ended with its best stage.
    ProgressiveFinished(String),

    /// A background decode failed.
    DecodeFailed(String),
}

/// Fan-out of events to every live subscriber.
#[derive(Debug, Default)]
pub(crate) struct EventHub {
    subscribers: Mutex<Vec<Sender<ProcessorEvent>>>,
}

impl EventHub {
    pub(crate) fn subscribe(&self) -> Receiver<ProcessorEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Send to all subscribers, dropping those whose receiver is gone.
    pub(crate) fn emit(&self, event: ProcessorEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
