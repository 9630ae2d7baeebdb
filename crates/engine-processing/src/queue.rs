//! Bounded batch channel between one producer and a pool of consumers.
//!
//! The producer owns the only [`mpsc::Sender`]; dropping it closes the
//! channel. Consumers share the receiver and each one sees the closure
//! (`None`) exactly once before exiting, after the channel is drained.

use model::records::batch::Batch;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// Cloneable handle to the shared receiving end of a batch queue.
#[derive(Debug, Clone)]
pub struct BatchReceiver {
    inner: Arc<Mutex<mpsc::Receiver<Batch>>>,
}

impl BatchReceiver {
    /// Waits for the next batch. Returns `None` once the producer has hung up
    /// and every queued batch has been taken.
    pub async fn recv(&self) -> Option<Batch> {
        self.inner.lock().await.recv().await
    }

    /// Batches currently waiting in the queue.
    pub async fn pending(&self) -> usize {
        self.inner.lock().await.len()
    }
}

/// Creates a queue holding at most `capacity` batches. Sends block while it
/// is full.
pub fn batch_queue(capacity: usize) -> (mpsc::Sender<Batch>, BatchReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        tx,
        BatchReceiver {
            inner: Arc::new(Mutex::new(rx)),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn batch(seq: u64) -> Batch {
        Batch::new(seq, "orders", "orders", Vec::new())
    }

    #[tokio::test]
    async fn test_send_blocks_when_full() {
        let (tx, rx) = batch_queue(2);
        tx.send(batch(0)).await.unwrap();
        tx.send(batch(1)).await.unwrap();

        let blocked = tokio::time::timeout(Duration::from_millis(50), tx.send(batch(2))).await;
        assert!(blocked.is_err());
        assert_eq!(rx.pending().await, 2);

        assert_eq!(rx.recv().await.unwrap().seq, 0);
        tx.send(batch(2)).await.unwrap();
    }

    #[tokio::test]
    async fn test_every_receiver_observes_closure_after_drain() {
        let (tx, rx) = batch_queue(4);
        tx.send(batch(0)).await.unwrap();
        drop(tx);

        let other = rx.clone();
        assert_eq!(rx.recv().await.unwrap().seq, 0);
        assert!(rx.recv().await.is_none());
        assert!(other.recv().await.is_none());
    }
}
