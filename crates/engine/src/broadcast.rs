// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process fan-out of status messages.
//!
//! Each subscriber owns a bounded channel; a slow consumer loses
//! messages rather than backpressuring publishers. Per-subscriber FIFO
//! holds, there is no cross-subscriber ordering, and late subscribers
//! get no replay.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;

/// Per-subscriber buffer depth.
pub const SUBSCRIBER_CAPACITY: usize = 16;

/// Typed push message. Serializes as `{"type":"status",...}` for the
/// WebSocket layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusMessage {
    Status {
        #[serde(skip_serializing_if = "Option::is_none")]
        stack: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        instance: Option<String>,
    },
}

impl StatusMessage {
    pub fn changed(stack: impl Into<String>, instance: Option<String>) -> Self {
        StatusMessage::Status { stack: Some(stack.into()), instance }
    }

    pub fn global() -> Self {
        StatusMessage::Status { stack: None, instance: None }
    }
}

/// A live subscription. Dropping the receiver makes the broadcaster
/// clean the entry up on its next publish.
pub struct Subscription {
    pub id: u64,
    pub rx: mpsc::Receiver<StatusMessage>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    subscribers: HashMap<u64, mpsc::Sender<StatusMessage>>,
}

/// Cheap-to-clone fan-out handle.
#[derive(Clone, Default)]
pub struct Broadcaster {
    inner: Arc<Mutex<Inner>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.subscribers.insert(id, tx);
        Subscription { id, rx }
    }

    pub fn unsubscribe(&self, id: u64) {
        self.inner.lock().subscribers.remove(&id);
    }

    /// Deliver to every subscriber. Full channels drop the message for
    /// that subscriber; closed ones are removed.
    pub fn publish(&self, message: &StatusMessage) {
        let mut inner = self.inner.lock();
        inner.subscribers.retain(|id, tx| match tx.try_send(message.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!(subscriber = *id, "dropping status message for slow consumer");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    /// Close every subscriber channel.
    pub fn shutdown(&self) {
        self.inner.lock().subscribers.clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}

#[cfg(test)]
#[path = "broadcast_tests.rs"]
mod tests;
