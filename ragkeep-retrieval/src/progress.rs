use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::mpsc;

pub const COMPLETE: u8 = 100;

/// Stream of percentages for one upload. Ends after yielding [`COMPLETE`]
/// or when the producer goes away.
pub type ProgressStream = BoxStream<'static, u8>;

struct Slot {
    sender: mpsc::UnboundedSender<u8>,
    receiver: Option<mpsc::UnboundedReceiver<u8>>,
}

impl Slot {
    fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Some(receiver),
        }
    }
}

/// Single-producer/single-consumer progress queues keyed by upload id.
#[derive(Clone, Default)]
pub struct ProgressRegistry {
    queues: Arc<Mutex<HashMap<String, Slot>>>,
}

impl ProgressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn queues(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates (or reuses) the queue for `upload_id` and hands out its
    /// producer side. The queue is removed when the guard drops.
    pub fn open(&self, upload_id: impl Into<String>) -> ProgressGuard {
        let upload_id = upload_id.into();
        let sender = {
            let mut queues = self.queues();
            let slot = queues.entry(upload_id.clone()).or_insert_with(|| {
                tracing::info!(upload_id = %upload_id, "created progress queue");
                Slot::new()
            });
            slot.sender.clone()
        };
        ProgressGuard {
            registry: self.clone(),
            upload_id,
            sender,
        }
    }

    /// Takes the consumer side of an open queue. Returns `None` for unknown
    /// uploads or when the consumer was already taken.
    pub fn subscribe(&self, upload_id: &str) -> Option<ProgressStream> {
        let receiver = self.queues().get_mut(upload_id)?.receiver.take()?;
        Some(progress_stream(receiver))
    }

    pub fn cleanup(&self, upload_id: &str) {
        if self.queues().remove(upload_id).is_some() {
            tracing::info!(upload_id = %upload_id, "cleaned up progress queue");
        }
    }

    pub fn contains(&self, upload_id: &str) -> bool {
        self.queues().contains_key(upload_id)
    }

    pub fn len(&self) -> usize {
        self.queues().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues().is_empty()
    }
}

fn progress_stream(receiver: mpsc::UnboundedReceiver<u8>) -> ProgressStream {
    stream::unfold(Some(receiver), |state| async move {
        let mut receiver = state?;
        let percent = receiver.recv().await?;
        let next = if percent >= COMPLETE { None } else { Some(receiver) };
        Some((percent, next))
    })
    .boxed()
}

/// Producer side of an upload's progress queue.
pub struct ProgressGuard {
    registry: ProgressRegistry,
    upload_id: String,
    sender: mpsc::UnboundedSender<u8>,
}

impl ProgressGuard {
    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    /// Publishes a percentage, clamped to `0..=100`. Reports after the
    /// consumer has gone are dropped.
    pub fn report(&self, percent: u8) {
        let percent = percent.min(COMPLETE);
        tracing::debug!(upload_id = %self.upload_id, percent, "upload progress");
        let _ = self.sender.send(percent);
    }
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.registry.cleanup(&self.upload_id);
    }
}
