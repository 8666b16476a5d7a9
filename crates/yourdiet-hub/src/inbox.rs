//! Per-subscriber delivery channels.
//!
//! The publishing side ([`Inbox`]) lives in the hub's registry; the receiving
//! side ([`Outlet`]) is owned by the [`Subscription`](crate::Subscription).
//! Offers never block.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use crate::Notification;

/// How notifications are handed to a subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeliveryPolicy {
  /// Hand over only to a receiver that is waiting at that instant; drop
  /// otherwise. Nothing is ever queued.
  #[default]
  Rendezvous,
  /// Queue up to `capacity` undelivered notifications; drop beyond that.
  Buffered { capacity: usize },
}

impl DeliveryPolicy {
  /// `0` selects [`DeliveryPolicy::Rendezvous`], anything else a buffer of
  /// that size.
  pub fn from_buffer(capacity: usize) -> Self {
    match capacity {
      0 => Self::Rendezvous,
      capacity => Self::Buffered { capacity },
    }
  }

  pub(crate) fn channel(self) -> (Inbox, Outlet) {
    match self {
      Self::Rendezvous => {
        let slot = Arc::new(Mutex::new(Slot::default()));
        (Inbox::Rendezvous(slot.clone()), Outlet::Rendezvous(slot))
      }
      Self::Buffered { capacity } => {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Inbox::Buffered(tx), Outlet::Buffered(rx))
      }
    }
  }
}

/// Rendezvous state shared by both ends.
#[derive(Default)]
pub(crate) struct Slot {
  /// Present while a receiver is parked in `recv`.
  waiter: Option<oneshot::Sender<Notification>>,
  closed: bool,
}

pub(crate) enum Inbox {
  Rendezvous(Arc<Mutex<Slot>>),
  Buffered(mpsc::Sender<Notification>),
}

impl Inbox {
  /// Non-blocking offer. Returns whether the notification was accepted.
  pub(crate) fn offer(&self, notification: &Notification) -> bool {
    match self {
      Inbox::Rendezvous(slot) => match slot.lock().waiter.take() {
        Some(waiter) => waiter.send(notification.clone()).is_ok(),
        None => false,
      },
      Inbox::Buffered(tx) => tx.try_send(notification.clone()).is_ok(),
    }
  }

  /// Signal end-of-stream to the receiving side.
  pub(crate) fn close(self) {
    match self {
      Inbox::Rendezvous(slot) => {
        let mut slot = slot.lock();
        slot.closed = true;
        slot.waiter = None;
      }
      Inbox::Buffered(tx) => drop(tx),
    }
  }
}

pub(crate) enum Outlet {
  Rendezvous(Arc<Mutex<Slot>>),
  Buffered(mpsc::Receiver<Notification>),
}

impl Outlet {
  pub(crate) async fn recv(&mut self) -> Option<Notification> {
    match self {
      Outlet::Rendezvous(slot) => {
        let rx = {
          let mut slot = slot.lock();
          if slot.closed {
            return None;
          }
          let (tx, rx) = oneshot::channel();
          slot.waiter = Some(tx);
          rx
        };
        rx.await.ok()
      }
      Outlet::Buffered(rx) => rx.recv().await,
    }
  }
}
