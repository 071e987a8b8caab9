//! Order summary projection.
//!
//! Folds order events into one [`OrderSummary`] row per order. Every update
//! is a deterministic function of event content (timestamps come from the
//! events, not the clock), so redelivering an event rewrites the row to the
//! same state.

use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use domain::{Money, OrderEvent, OrderStatus};
use event_store::EventEnvelope;
use tokio::sync::RwLock;

use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::{OrderItemSummary, OrderSummary, ReadModelStore};
use crate::{ProjectionError, Result};

/// Maintains the order summary read model.
pub struct OrderSummaryProjection<R: ReadModelStore> {
    store: R,
    position: Arc<RwLock<ProjectionPosition>>,
}

impl<R: ReadModelStore> OrderSummaryProjection<R> {
    /// Creates a projection writing through the given store.
    pub fn new(store: R) -> Self {
        Self {
            store,
            position: Arc::new(RwLock::new(ProjectionPosition::zero())),
        }
    }

    /// Loads the row a non-creation event must land on. A missing row means
    /// per-order ordering was violated upstream, which is not recoverable.
    async fn load(&self, order_id: &OrderId, event_type: &str) -> Result<OrderSummary> {
        self.store
            .summary(order_id)
            .await?
            .ok_or_else(|| ProjectionError::SummaryMissing {
                order_id: order_id.clone(),
                event_type: event_type.to_string(),
            })
    }
}

#[async_trait]
impl<R: ReadModelStore> Projection for OrderSummaryProjection<R> {
    fn name(&self) -> &'static str {
        "OrderSummaryProjection"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        let order_event: OrderEvent = serde_json::from_value(event.payload.clone())?;
        let order_id = &event.order_id;

        match order_event {
            OrderEvent::OrderCreated(data) => {
                self.store
                    .save(OrderSummary {
                        order_id: data.order_id,
                        customer_id: data.customer_id,
                        customer_name: data.customer_name,
                        customer_email: data.customer_email,
                        shipping_address: data.shipping_address,
                        status: OrderStatus::Created,
                        items: Vec::new(),
                        total_amount: Money::zero(),
                        tracking_number: None,
                        cancellation_reason: None,
                        created_at: data.created_at,
                        updated_at: data.created_at,
                    })
                    .await?;
            }
            OrderEvent::ItemAdded(data) => {
                let mut row = self.load(order_id, &event.event_type).await?;
                row.upsert_item(OrderItemSummary {
                    product_id: data.product_id,
                    product_name: data.product_name,
                    quantity: data.quantity,
                    price: data.price,
                });
                row.updated_at = data.added_at;
                self.store.save(row).await?;
            }
            OrderEvent::ItemRemoved(data) => {
                let mut row = self.load(order_id, &event.event_type).await?;
                row.remove_item(&data.product_id);
                row.updated_at = data.removed_at;
                self.store.save(row).await?;
            }
            OrderEvent::OrderConfirmed(data) => {
                let mut row = self.load(order_id, &event.event_type).await?;
                row.status = OrderStatus::Confirmed;
                row.updated_at = data.confirmed_at;
                self.store.save(row).await?;
            }
            OrderEvent::OrderProcessed(data) => {
                let mut row = self.load(order_id, &event.event_type).await?;
                row.status = OrderStatus::Processed;
                row.updated_at = data.processed_at;
                self.store.save(row).await?;
            }
            OrderEvent::OrderShipped(data) => {
                let mut row = self.load(order_id, &event.event_type).await?;
                row.status = OrderStatus::Shipped;
                row.tracking_number = Some(data.tracking_number);
                row.updated_at = data.shipped_at;
                self.store.save(row).await?;
            }
            OrderEvent::OrderCancelled(data) => {
                let mut row = self.load(order_id, &event.event_type).await?;
                row.status = OrderStatus::Cancelled;
                row.cancellation_reason = Some(data.reason);
                row.updated_at = data.cancelled_at;
                self.store.save(row).await?;
            }
            OrderEvent::ShippingAddressUpdated(data) => {
                let mut row = self.load(order_id, &event.event_type).await?;
                row.shipping_address = Some(data.shipping_address);
                row.updated_at = data.updated_at;
                self.store.save(row).await?;
            }
        }

        self.position.write().await.advance();

        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        *self.position.read().await
    }

    async fn reset(&self) -> Result<()> {
        self.store.clear().await?;
        *self.position.write().await = ProjectionPosition::zero();
        Ok(())
    }
}
