//! Bounded update queue between the ingestion adapters and the dispatch loop.
//!
//! Many producers (the poller, concurrent webhook requests), one consumer. Closing is a flag,
//! not a dropped channel: blocked producers are released with [`QueueClosed`], and the consumer
//! drains what is already buffered before [`UpdateQueue::recv`] returns `None`.

use dbot_core::Update;
use thiserror::Error;
use tokio::sync::{mpsc, watch, Mutex};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("update queue is closed")]
pub struct QueueClosed;

pub struct UpdateQueue {
    tx: mpsc::Sender<Update>,
    rx: Mutex<mpsc::Receiver<Update>>,
    closed: watch::Sender<bool>,
}

/// Resolves once `closed` flips to true, or its sender is gone.
async fn wait_closed(mut closed: watch::Receiver<bool>) {
    while !*closed.borrow_and_update() {
        if closed.changed().await.is_err() {
            return;
        }
    }
}

impl UpdateQueue {
    /// Capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (closed, _) = watch::channel(false);
        Self {
            tx,
            rx: Mutex::new(rx),
            closed,
        }
    }

    /// Producer handle; cheap to clone.
    pub fn sender(&self) -> UpdateSender {
        UpdateSender {
            tx: self.tx.clone(),
            closed: self.closed.subscribe(),
        }
    }

    /// Next update in arrival order; waits while empty. `None` once closed and drained.
    pub async fn recv(&self) -> Option<Update> {
        let mut rx = self.rx.lock().await;
        if self.is_closed() {
            return rx.try_recv().ok();
        }
        tokio::select! {
            biased;
            update = rx.recv() => update,
            _ = wait_closed(self.closed.subscribe()) => rx.try_recv().ok(),
        }
    }

    /// Idempotent.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Updates currently buffered.
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

impl std::fmt::Debug for UpdateQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[derive(Clone)]
pub struct UpdateSender {
    tx: mpsc::Sender<Update>,
    closed: watch::Receiver<bool>,
}

impl UpdateSender {
    /// Enqueues, waiting while the queue is full. Fails once the queue is closed, including
    /// while waiting.
    pub async fn send(&self, update: Update) -> Result<(), QueueClosed> {
        if self.is_closed() {
            return Err(QueueClosed);
        }
        tokio::select! {
            sent = self.tx.send(update) => sent.map_err(|_| QueueClosed),
            _ = wait_closed(self.closed.clone()) => Err(QueueClosed),
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

impl std::fmt::Debug for UpdateSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateSender")
            .field("closed", &self.is_closed())
            .finish()
    }
}
