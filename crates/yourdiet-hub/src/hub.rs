//! The subscriber registry and its publish/subscribe operations.

use std::{collections::HashMap, fmt, sync::Arc};

use futures::Stream;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::{
  DeliveryPolicy, Notification,
  inbox::{Inbox, Outlet},
};

pub type SubscriberId = Uuid;

struct Subscriber {
  user_id: String,
  inbox:   Inbox,
}

struct Inner {
  policy:      DeliveryPolicy,
  subscribers: Mutex<HashMap<SubscriberId, Subscriber>>,
}

impl Inner {
  /// Removes and closes under one guard, so no `notify` can observe a
  /// closed inbox or a registered-but-ended subscriber.
  fn remove(&self, id: SubscriberId) -> bool {
    let mut subscribers = self.subscribers.lock();
    match subscribers.remove(&id) {
      Some(subscriber) => {
        subscriber.inbox.close();
        true
      }
      None => false,
    }
  }
}

/// Registry of live subscribers.
///
/// Cloning is cheap; all clones share one registry. Every registry operation
/// runs to completion under a single lock, which is never held across an
/// `.await` and never waits on a subscriber.
#[derive(Clone)]
pub struct NotificationHub {
  inner: Arc<Inner>,
}

impl Default for NotificationHub {
  fn default() -> Self { Self::new(DeliveryPolicy::default()) }
}

impl fmt::Debug for NotificationHub {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("NotificationHub")
      .field("policy", &self.inner.policy)
      .field("subscribers", &self.subscriber_count())
      .finish()
  }
}

impl NotificationHub {
  pub fn new(policy: DeliveryPolicy) -> Self {
    Self {
      inner: Arc::new(Inner {
        policy,
        subscribers: Mutex::new(HashMap::new()),
      }),
    }
  }

  pub fn policy(&self) -> DeliveryPolicy { self.inner.policy }

  /// Register a new subscriber for `user_id`.
  pub fn subscribe(&self, user_id: impl Into<String>) -> Subscription {
    let user_id = user_id.into();
    let id = Uuid::new_v4();
    let (inbox, outlet) = self.inner.policy.channel();

    self
      .inner
      .subscribers
      .lock()
      .insert(id, Subscriber { user_id: user_id.clone(), inbox });

    tracing::debug!(subscriber = %id, user = %user_id, "subscribed");

    Subscription { id, user_id, outlet, hub: self.inner.clone() }
  }

  /// Remove a subscriber and end its stream. Returns `false` if it was
  /// already gone; calling this more than once is harmless.
  pub fn unsubscribe(&self, id: SubscriberId) -> bool {
    let removed = self.inner.remove(id);
    if removed {
      tracing::debug!(subscriber = %id, "unsubscribed");
    }
    removed
  }

  /// Offer `notification` to every matching subscriber without blocking.
  ///
  /// Subscribers that cannot take it right now simply miss it. Returns the
  /// number of subscribers that accepted it.
  pub fn notify(&self, notification: &Notification) -> usize {
    let subscribers = self.inner.subscribers.lock();
    let mut matched = 0;
    let mut delivered = 0;

    for subscriber in subscribers.values() {
      if !notification.is_for(&subscriber.user_id) {
        continue;
      }
      matched += 1;
      if subscriber.inbox.offer(notification) {
        delivered += 1;
      }
    }
    drop(subscribers);

    tracing::debug!(
      kind = %notification.kind,
      target = notification.target().unwrap_or("*"),
      matched,
      delivered,
      "notified"
    );
    delivered
  }

  pub fn subscriber_count(&self) -> usize { self.inner.subscribers.lock().len() }
}

/// The receiving end of one live subscription.
///
/// Dropping it unsubscribes, so a stream that is torn down (for example
/// because its client disconnected) never leaves an undrained entry behind.
pub struct Subscription {
  id:      SubscriberId,
  user_id: String,
  outlet:  Outlet,
  hub:     Arc<Inner>,
}

impl fmt::Debug for Subscription {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Subscription")
      .field("id", &self.id)
      .field("user_id", &self.user_id)
      .finish()
  }
}

impl Subscription {
  pub fn id(&self) -> SubscriberId { self.id }

  pub fn user_id(&self) -> &str { &self.user_id }

  /// Wait for the next notification. `None` once the subscriber has been
  /// removed from the hub.
  pub async fn recv(&mut self) -> Option<Notification> { self.outlet.recv().await }

  /// Turn the subscription into a stream that ends when it is unsubscribed.
  pub fn into_stream(self) -> impl Stream<Item = Notification> + Send {
    futures::stream::unfold(self, |mut sub| async move {
      let next = sub.recv().await?;
      Some((next, sub))
    })
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    if self.hub.remove(self.id) {
      tracing::debug!(subscriber = %self.id, "subscription dropped");
    }
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use futures::StreamExt as _;
  use serde_json::{Value, json};

  use super::*;

  fn ping(user: &str) -> Notification { Notification::to_user(user, "ping", Value::Null) }

  #[tokio::test]
  async fn delivers_to_waiting_receiver() {
    let hub = NotificationHub::default();
    let mut sub = hub.subscribe("u1");

    let mut recv = Box::pin(sub.recv());
    assert!(futures::poll!(recv.as_mut()).is_pending());

    assert_eq!(hub.notify(&ping("u1")), 1);
    assert_eq!(recv.await, Some(ping("u1")));
  }

  #[tokio::test]
  async fn no_ready_receiver_drops_without_queueing() {
    let hub = NotificationHub::default();
    let mut sub = hub.subscribe("u1");

    assert_eq!(hub.notify(&ping("u1")), 0);

    let waited = tokio::time::timeout(Duration::from_millis(20), sub.recv()).await;
    assert!(waited.is_err(), "dropped notification must not be queued");
  }

  #[tokio::test]
  async fn targeted_and_broadcast() {
    let hub = NotificationHub::default();
    let mut a = hub.subscribe("u1");
    let mut b = hub.subscribe("u2");

    {
      let mut ra = Box::pin(a.recv());
      let mut rb = Box::pin(b.recv());
      assert!(futures::poll!(ra.as_mut()).is_pending());
      assert!(futures::poll!(rb.as_mut()).is_pending());

      assert_eq!(hub.notify(&ping("u1")), 1);
      assert_eq!(ra.await, Some(ping("u1")));
      assert!(futures::poll!(rb.as_mut()).is_pending());
    }

    let mut ra = Box::pin(a.recv());
    let mut rb = Box::pin(b.recv());
    assert!(futures::poll!(ra.as_mut()).is_pending());
    assert!(futures::poll!(rb.as_mut()).is_pending());

    let all = Notification::broadcast("news", json!("hi"));
    assert_eq!(hub.notify(&all), 2);
    assert_eq!(ra.await, Some(all.clone()));
    assert_eq!(rb.await, Some(all));
  }

  #[tokio::test]
  async fn unsubscribe_is_idempotent_and_ends_stream() {
    let hub = NotificationHub::default();
    let mut sub = hub.subscribe("u1");
    let id = sub.id();

    let mut recv = Box::pin(sub.recv());
    assert!(futures::poll!(recv.as_mut()).is_pending());

    assert!(hub.unsubscribe(id));
    assert!(!hub.unsubscribe(id));
    assert_eq!(recv.await, None);
    assert_eq!(hub.subscriber_count(), 0);
    assert_eq!(hub.notify(&ping("u1")), 0);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn unsubscribe_racing_notify_stays_consistent() {
    for _ in 0..200 {
      let hub = NotificationHub::default();
      let mut sub = hub.subscribe("u1");
      let id = sub.id();

      let receiver = tokio::spawn(async move { sub.recv().await });
      tokio::task::yield_now().await;

      let publisher = {
        let hub = hub.clone();
        tokio::spawn(async move { hub.notify(&ping("u1")) })
      };
      let removed = hub.unsubscribe(id);
      let delivered = publisher.await.unwrap();
      let received = tokio::time::timeout(Duration::from_secs(1), receiver)
        .await
        .unwrap()
        .unwrap();

      assert!(removed);
      assert_eq!(hub.subscriber_count(), 0);
      // A notification counted as delivered is never lost to the close.
      if delivered == 1 {
        assert_eq!(received, Some(ping("u1")));
      } else {
        assert_eq!(received, None);
      }
    }
  }

  #[tokio::test]
  async fn dropping_subscription_unsubscribes() {
    let hub = NotificationHub::default();
    let sub = hub.subscribe("u1");
    let other = hub.subscribe("u1");
    assert_eq!(hub.subscriber_count(), 2);
    assert_ne!(sub.id(), other.id());

    drop(sub);
    assert_eq!(hub.subscriber_count(), 1);

    let stream = other.into_stream();
    drop(stream);
    assert_eq!(hub.subscriber_count(), 0);
  }

  #[tokio::test]
  async fn buffered_policy_queues_up_to_capacity() {
    let hub = NotificationHub::new(DeliveryPolicy::Buffered { capacity: 2 });
    let sub = hub.subscribe("u1");

    assert_eq!(hub.notify(&ping("u1")), 1);
    assert_eq!(hub.notify(&ping("u1")), 1);
    assert_eq!(hub.notify(&ping("u1")), 0);

    let id = sub.id();
    let mut stream = Box::pin(sub.into_stream());
    assert_eq!(stream.next().await, Some(ping("u1")));
    assert_eq!(stream.next().await, Some(ping("u1")));

    hub.unsubscribe(id);
    assert_eq!(stream.next().await, None);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn stalled_consumers_never_block_publishers() {
    let hub = NotificationHub::default();
    let _stalled: Vec<_> = (0..16).map(|i| hub.subscribe(format!("u{i}"))).collect();

    let publishers: Vec<_> = (0..8)
      .map(|_| {
        let hub = hub.clone();
        tokio::spawn(async move {
          for i in 0..100 {
            hub.notify(&ping(&format!("u{}", i % 16)));
            hub.notify(&Notification::broadcast("tick", Value::Null));
          }
        })
      })
      .collect();

    let churn = {
      let hub = hub.clone();
      tokio::spawn(async move {
        for _ in 0..100 {
          let sub = hub.subscribe("churn");
          hub.unsubscribe(sub.id());
        }
      })
    };

    tokio::time::timeout(Duration::from_secs(5), async {
      for p in publishers {
        p.await.unwrap();
      }
      churn.await.unwrap();
    })
    .await
    .expect("publishers finished");

    assert_eq!(hub.subscriber_count(), 16);
  }

  #[test]
  fn policy_from_buffer() {
    assert_eq!(DeliveryPolicy::from_buffer(0), DeliveryPolicy::Rendezvous);
    assert_eq!(
      DeliveryPolicy::from_buffer(8),
      DeliveryPolicy::Buffered { capacity: 8 }
    );
  }
}
