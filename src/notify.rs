use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, broadcast};
use utoipa::ToSchema;

const CHANNEL_CAPACITY: usize = 16;

/// Payload pushed to a user's channel when payment confirmation mints a
/// coupon. Losing it is harmless; the coupon stays queryable via the store.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CouponIssuedEvent {
    pub coupon_code: String,
    pub expiry_date: String,
    pub discount: i32,
}

/// In-process, per-user broadcast channels. Delivery is at-most-once and
/// best-effort: emitting to a user nobody has joined drops the event, and a
/// lagging subscriber loses the overwritten entries.
#[derive(Clone, Default)]
pub struct Notifier {
    channels: Arc<Mutex<HashMap<i32, broadcast::Sender<CouponIssuedEvent>>>>,
}

impl Notifier {
    /// Fire-and-forget; never blocks and never fails. A channel whose last
    /// receiver has dropped is removed rather than sent to, so the map does
    /// not grow with every user id ever subscribed.
    pub async fn emit(&self, user_id: i32, event: CouponIssuedEvent) {
        let mut channels = self.channels.lock().await;
        if let Some(tx) = channels.get(&user_id) {
            if tx.receiver_count() == 0 {
                channels.remove(&user_id);
            } else {
                let _ = tx.send(event);
            }
        }
    }

    /// Joins the user's channel, creating it on first use.
    pub async fn subscribe(&self, user_id: i32) -> broadcast::Receiver<CouponIssuedEvent> {
        let mut channels = self.channels.lock().await;
        channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    #[cfg(test)]
    async fn channel_count(&self) -> usize {
        self.channels.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(code: &str) -> CouponIssuedEvent {
        CouponIssuedEvent {
            coupon_code: code.into(),
            expiry_date: "2026-09-27".into(),
            discount: 7,
        }
    }

    #[tokio::test]
    async fn subscriber_receives_emitted_event() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe(7).await;
        notifier.emit(7, event("AB12CD34")).await;
        let got = rx.recv().await.unwrap();
        assert_eq!(got.coupon_code, "AB12CD34");
        assert_eq!(got.discount, 7);
    }

    #[tokio::test]
    async fn emit_without_subscriber_is_a_silent_drop() {
        let notifier = Notifier::default();
        notifier.emit(99, event("LOST")).await;
        // joining afterwards must not replay the event
        let mut rx = notifier.subscribe(99).await;
        notifier.emit(99, event("SEEN")).await;
        assert_eq!(rx.recv().await.unwrap().coupon_code, "SEEN");
    }

    #[tokio::test]
    async fn channels_are_scoped_per_user() {
        let notifier = Notifier::default();
        let mut rx_a = notifier.subscribe(1).await;
        let _rx_b = notifier.subscribe(2).await;
        notifier.emit(1, event("FORUSER1")).await;
        assert_eq!(rx_a.recv().await.unwrap().coupon_code, "FORUSER1");
        notifier.emit(2, event("FORUSER2")).await;
        // user 1's channel stays quiet
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn emit_prunes_a_channel_once_its_last_receiver_drops() {
        let notifier = Notifier::default();
        let rx = notifier.subscribe(5).await;
        drop(rx);
        notifier.emit(5, event("GONE")).await;
        assert_eq!(notifier.channel_count().await, 0);

        // a later subscribe starts fresh and still receives
        let mut rx = notifier.subscribe(5).await;
        notifier.emit(5, event("FRESH")).await;
        assert_eq!(rx.recv().await.unwrap().coupon_code, "FRESH");
        assert_eq!(notifier.channel_count().await, 1);
    }
}
