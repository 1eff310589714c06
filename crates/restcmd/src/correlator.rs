//! FIFO hand-off of replies from the reply listener to the dispatcher.

use crate::reply::ReplyMessage;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Unbounded reply queue shared by the reply listener (producer) and the
/// dispatcher (consumer). Cloning yields another handle to the same queue.
#[derive(Clone, Default)]
pub struct Correlator {
    inner: Arc<CorrelatorInner>,
}

#[derive(Default)]
struct CorrelatorInner {
    queue: Mutex<VecDeque<ReplyMessage>>,
    available: Notify,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a reply to the tail. Never blocks; wakes at most one waiting taker.
    pub fn deposit(&self, reply: ReplyMessage) {
        self.inner.queue.lock().push_back(reply);
        self.inner.available.notify_one();
    }

    /// Remove and return the head, waiting until a reply is deposited.
    ///
    /// Cancel-safe: dropping the future never loses a queued reply.
    pub async fn take(&self) -> ReplyMessage {
        loop {
            let notified = self.inner.available.notified();
            if let Some(reply) = self.try_take() {
                return reply;
            }
            notified.await;
        }
    }

    /// Like [`Correlator::take`], giving up after `timeout`.
    pub async fn take_timeout(&self, timeout: Duration) -> Option<ReplyMessage> {
        tokio::time::timeout(timeout, self.take()).await.ok()
    }

    pub fn try_take(&self) -> Option<ReplyMessage> {
        self.inner.queue.lock().pop_front()
    }

    /// Remove every queued reply, oldest first.
    pub fn drain(&self) -> Vec<ReplyMessage> {
        self.inner.queue.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.queue.lock().is_empty()
    }
}
