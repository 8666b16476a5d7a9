//! In-memory publish/subscribe hub for real-time user notifications.
//!
//! The hub keeps a registry of live subscribers, one per open event stream.
//! Publishing walks the registry under a single lock and makes a
//! non-blocking offer to every matching subscriber. Delivery is best-effort
//! and at-most-once: there is no retry, no backlog beyond the configured
//! [`DeliveryPolicy`], and nothing survives the process.

mod hub;
mod inbox;
mod notification;

pub use hub::{NotificationHub, SubscriberId, Subscription};
pub use inbox::DeliveryPolicy;
pub use notification::Notification;
