use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Events emitted by the services layer. Consumed by an in-process worker;
/// delivery is best-effort and never blocks the request path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Catalog events
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeleted(Uuid),

    // Build events
    BuildCreated { build_id: Uuid, customer_id: Uuid },
    BuildUpdated(Uuid),
    BuildDeleted(Uuid),

    // Cart events
    CartItemAdded { cart_id: Uuid, item_id: Uuid },
    CartItemUpdated { cart_id: Uuid, item_id: Uuid },
    CartItemRemoved { cart_id: Uuid, item_id: Uuid },
    CartCleared(Uuid),

    // Order events
    OrderPlaced {
        order_id: Uuid,
        customer_id: Uuid,
        total_price: Decimal,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },

    // Loyalty events
    PointsEarned {
        customer_id: Uuid,
        points: i64,
        order_id: Uuid,
    },
    PointsRedeemed {
        customer_id: Uuid,
        points: i64,
    },
    VoucherIssued {
        customer_id: Uuid,
        voucher_id: Uuid,
    },

    // Promotion events
    PromotionCreated(Uuid),
    PromotionDeactivated(Uuid),

    // Generic event for custom messages
    Generic {
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    pub fn generic(message: impl Into<String>) -> Self {
        Event::Generic {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is closed.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(err) = self.send(event).await {
            warn!("event delivery failed: {}", err);
        }
    }
}

/// Background consumer for the application event channel.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        info!(?event, "event processed");
    }
    info!("event channel closed; consumer exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_event() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        sender
            .send(Event::ProductCreated(Uuid::new_v4()))
            .await
            .expect("send should succeed");

        assert!(matches!(rx.recv().await, Some(Event::ProductCreated(_))));
    }

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        // Must not panic or error out.
        sender.send_or_log(Event::generic("after close")).await;
    }
}
