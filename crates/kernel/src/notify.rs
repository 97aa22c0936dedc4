//! Entity-lifecycle notification stream.
//!
//! Producers publish through a [`NotificationHub`] from any thread. Each
//! subscriber owns an unbounded channel receiver that the simulation drains
//! on its own thread between ticks.

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use parking_lot::Mutex;

use crate::entity::EntityHandle;

/// A message on the notification stream.
#[derive(Debug, Clone)]
pub enum Notification {
    /// An entity was materialized elsewhere and should be attached.
    Add(EntityHandle),
    /// An entity was despawned elsewhere and should be detached.
    Remove(EntityHandle),
    /// Terminal: the producer failed.
    Error(String),
    /// Terminal: the producer will send nothing more.
    Completed,
}

/// Receiving end of a notification stream.
///
/// Disposing drops the receiver; disposing again does nothing.
#[derive(Debug)]
pub struct Subscription {
    receiver: Option<Receiver<Notification>>,
}

impl Subscription {
    pub fn new(receiver: Receiver<Notification>) -> Self {
        Self {
            receiver: Some(receiver),
        }
    }

    /// A subscription that never yields anything.
    pub fn closed() -> Self {
        Self { receiver: None }
    }

    /// Next pending notification without blocking.
    ///
    /// A disconnected channel reads as [`Notification::Completed`].
    pub fn try_next(&self) -> Option<Notification> {
        let receiver = self.receiver.as_ref()?;
        match receiver.try_recv() {
            Ok(notification) => Some(notification),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Notification::Completed),
        }
    }

    pub fn dispose(&mut self) {
        self.receiver = None;
    }

    pub fn is_disposed(&self) -> bool {
        self.receiver.is_none()
    }
}

/// Fan-out publisher for notification subscribers.
#[derive(Debug, Default)]
pub struct NotificationHub {
    subscribers: Mutex<Vec<Sender<Notification>>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.subscribers.lock().push(sender);
        Subscription::new(receiver)
    }

    /// Deliver `notification` to every live subscriber, dropping the ones
    /// whose receivers are gone. Returns the number reached.
    pub fn publish(&self, notification: Notification) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|s| s.send(notification.clone()).is_ok());
        subscribers.len()
    }

    /// Send [`Notification::Completed`] and forget every subscriber.
    pub fn complete(&self) {
        let mut subscribers = self.subscribers.lock();
        for s in subscribers.drain(..) {
            let _ = s.send(Notification::Completed);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;

    #[test]
    fn publish_reaches_every_subscriber() {
        let hub = NotificationHub::new();
        let a = hub.subscribe();
        let b = hub.subscribe();
        let reached = hub.publish(Notification::Add(Entity::new("stone").into_handle()));
        assert_eq!(reached, 2);
        assert!(matches!(a.try_next(), Some(Notification::Add(_))));
        assert!(matches!(b.try_next(), Some(Notification::Add(_))));
        assert!(a.try_next().is_none());
    }

    #[test]
    fn disposed_subscribers_are_pruned() {
        let hub = NotificationHub::new();
        let mut a = hub.subscribe();
        let _b = hub.subscribe();
        a.dispose();
        assert_eq!(hub.publish(Notification::Completed), 1);
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[test]
    fn dispose_twice_is_harmless() {
        let hub = NotificationHub::new();
        let mut s = hub.subscribe();
        s.dispose();
        s.dispose();
        assert!(s.is_disposed());
        assert!(s.try_next().is_none());
    }

    #[test]
    fn dropped_hub_reads_as_completed() {
        let hub = NotificationHub::new();
        let s = hub.subscribe();
        drop(hub);
        assert!(matches!(s.try_next(), Some(Notification::Completed)));
    }

    #[test]
    fn complete_notifies_and_clears() {
        let hub = NotificationHub::new();
        let s = hub.subscribe();
        hub.complete();
        assert_eq!(hub.subscriber_count(), 0);
        assert!(matches!(s.try_next(), Some(Notification::Completed)));
    }
}
