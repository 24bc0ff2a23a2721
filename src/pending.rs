use crate::{
    error::{Result, TreadmillError},
    protocol::Message,
    types::MessageType,
};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
};
use tokio::sync::oneshot;

/// One-shot subscriptions to the next inbound message of a given type
///
/// Each waiter is a oneshot channel: the registry keeps the sender half,
/// the caller holds the receiver inside a [`ResponseWaiter`] guard. A
/// matching inbound message satisfies every waiter registered before it
/// arrived and empties that bucket; a decode error fails every waiter
/// across all buckets. Dropping the guard deregisters the waiter, which is
/// how cancellation and retry-loop exits clean up after themselves.
pub(crate) struct PendingResponses {
    waiters: Mutex<HashMap<MessageType, Vec<Waiter>>>,
    next_id: AtomicU64,
}

struct Waiter {
    id: u64,
    tx: oneshot::Sender<Result<Message>>,
}

impl PendingResponses {
    pub(crate) fn new() -> Self {
        Self {
            waiters: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a waiter for the next message of `message_type`
    pub(crate) fn register(self: &Arc<Self>, message_type: MessageType) -> ResponseWaiter {
        let (tx, rx) = oneshot::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        self.lock()
            .entry(message_type)
            .or_default()
            .push(Waiter { id, tx });

        ResponseWaiter {
            registry: Arc::clone(self),
            message_type,
            id,
            rx,
        }
    }

    /// Satisfy every waiter registered for this message's type
    ///
    /// The bucket is drained under the lock and signalled outside it, so a
    /// waiter waking up can never contend with the delivering thread.
    pub(crate) fn deliver(&self, msg: &Message) {
        let drained = self.lock().remove(&msg.message_type()).unwrap_or_default();

        for waiter in drained {
            // A send failure just means the waiter was dropped mid-delivery.
            let _ = waiter.tx.send(Ok(msg.clone()));
        }
    }

    /// Fail every outstanding waiter, across all message types
    pub(crate) fn fail_all(&self, err: &TreadmillError) {
        let drained: Vec<Waiter> = self
            .lock()
            .drain()
            .flat_map(|(_, bucket)| bucket)
            .collect();

        for waiter in drained {
            let _ = waiter.tx.send(Err(err.duplicate()));
        }
    }

    fn remove(&self, message_type: MessageType, id: u64) {
        let mut waiters = self.lock();
        if let Some(bucket) = waiters.get_mut(&message_type) {
            bucket.retain(|waiter| waiter.id != id);
            if bucket.is_empty() {
                waiters.remove(&message_type);
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<MessageType, Vec<Waiter>>> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn outstanding(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }
}

/// Caller-owned handle to a registered waiter
///
/// Dropping the handle removes the waiter from the registry, so callers can
/// bail out of a `select!` (cancellation, timeout) without leaking an entry.
pub(crate) struct ResponseWaiter {
    registry: Arc<PendingResponses>,
    message_type: MessageType,
    id: u64,
    rx: oneshot::Receiver<Result<Message>>,
}

impl ResponseWaiter {
    /// Wait until a matching message arrives or the registry fails the waiter
    pub(crate) async fn recv(&mut self) -> Result<Message> {
        match (&mut self.rx).await {
            Ok(result) => result,
            // The sender half vanished without a signal, which only happens
            // when the session is torn down.
            Err(_) => Err(TreadmillError::Disconnected),
        }
    }
}

impl Drop for ResponseWaiter {
    fn drop(&mut self) {
        self.registry.remove(self.message_type, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WorkoutMode;

    fn ack(acknowledged: MessageType) -> Message {
        Message::Ack { acknowledged }
    }

    #[tokio::test]
    async fn test_deliver_satisfies_all_prior_waiters() {
        let registry = Arc::new(PendingResponses::new());

        let mut first = registry.register(MessageType::Ack);
        let mut second = registry.register(MessageType::Ack);
        assert_eq!(registry.outstanding(), 2);

        registry.deliver(&ack(MessageType::WorkoutData));

        assert_eq!(first.recv().await.unwrap(), ack(MessageType::WorkoutData));
        assert_eq!(second.recv().await.unwrap(), ack(MessageType::WorkoutData));
        assert_eq!(registry.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_waiter_registered_after_delivery_sees_nothing() {
        let registry = Arc::new(PendingResponses::new());

        registry.deliver(&ack(MessageType::Speed));

        let mut late = registry.register(MessageType::Ack);
        registry.deliver(&ack(MessageType::Incline));
        assert_eq!(late.recv().await.unwrap(), ack(MessageType::Incline));
    }

    #[tokio::test]
    async fn test_delivery_is_type_keyed() {
        let registry = Arc::new(PendingResponses::new());

        let mut mode_waiter = registry.register(MessageType::WorkoutMode);
        let _ack_waiter = registry.register(MessageType::Ack);

        registry.deliver(&Message::WorkoutMode {
            mode: WorkoutMode::Running,
        });

        assert_eq!(
            mode_waiter.recv().await.unwrap(),
            Message::WorkoutMode {
                mode: WorkoutMode::Running
            }
        );
        // The ACK waiter is untouched.
        assert_eq!(registry.outstanding(), 1);
    }

    #[tokio::test]
    async fn test_fail_all_reaches_every_type() {
        let registry = Arc::new(PendingResponses::new());

        let mut ack_waiter = registry.register(MessageType::Ack);
        let mut info_waiter = registry.register(MessageType::DeviceInfo);

        registry.fail_all(&TreadmillError::Framing("desync".to_string()));

        assert!(matches!(
            ack_waiter.recv().await,
            Err(TreadmillError::Framing(_))
        ));
        assert!(matches!(
            info_waiter.recv().await,
            Err(TreadmillError::Framing(_))
        ));
        assert_eq!(registry.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_drop_deregisters_waiter() {
        let registry = Arc::new(PendingResponses::new());

        let waiter = registry.register(MessageType::Ack);
        assert_eq!(registry.outstanding(), 1);

        drop(waiter);
        assert_eq!(registry.outstanding(), 0);

        // Delivery into the now-empty bucket is a no-op.
        registry.deliver(&ack(MessageType::Speed));
    }
}
