//! Asynchronous in-process delivery used by the in-memory port implementations.
//!
//! A [`Mailbox`] pairs a channel with a spawned task that drains it into a
//! [`ListenerSet`]. Posting never blocks and never runs a listener on the
//! caller's stack, which matches how native message passing behaves.

use crate::ListenerSet;
use std::sync::Arc;
use tracing::trace;

/// Sending half of a delivery pump.
#[derive(Debug)]
pub struct Mailbox<T> {
    sender: flume::Sender<T>,
}

impl<T> Clone for Mailbox<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> Mailbox<T>
where
    T: Clone + Send + 'static,
{
    /// Spawn a delivery task feeding `listeners`.
    ///
    /// The task ends once every clone of the returned mailbox is dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    #[must_use]
    pub fn spawn(listeners: Arc<ListenerSet<T>>) -> Self {
        let (sender, receiver) = flume::unbounded::<T>();

        tokio::spawn(async move {
            while let Ok(message) = receiver.recv_async().await {
                listeners.dispatch(&message);
            }
            trace!("mailbox closed, delivery task exiting");
        });

        Self { sender }
    }

    /// Queue a message for delivery.
    ///
    /// Returns `false` when the delivery task is gone; the message is dropped.
    pub fn post(&self, message: T) -> bool {
        self.sender.send(message).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_post_is_delivered_asynchronously() {
        let _ = tracing_subscriber::fmt::try_init();

        let listeners = Arc::new(ListenerSet::<u32>::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        listeners.add(move |value| {
            let _ = tx.send(value);
        });

        let mailbox = Mailbox::spawn(Arc::clone(&listeners));
        assert!(mailbox.post(1));
        assert!(mailbox.post(2));

        // Nothing runs until the delivery task gets scheduled.
        assert!(rx.try_recv().is_err());

        let first = timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        let second = timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert_eq!(first, Some(1));
        assert_eq!(second, Some(2));
    }
}
