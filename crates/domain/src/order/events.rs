//! Facts recorded against an order.
//!
//! Events are the only persisted record of an order; every state field is
//! derived by replaying them. Each variant carries its own timestamp so
//! downstream consumers stay deterministic under re-delivery.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::{Money, OrderItem, ProductId};

/// Everything that can happen to an order.
///
/// Serialized with a `type` tag and a `data` payload; the JSON tag is the
/// variant name, which is also what [`DomainEvent::event_type`] reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    OrderCreated(OrderCreatedData),
    /// Also covers replacement: adding a product the order already has
    /// is recorded as a fresh `ItemAdded` for the new line.
    ItemAdded(ItemAddedData),
    ItemRemoved(ItemRemovedData),
    OrderConfirmed(OrderConfirmedData),
    OrderProcessed(OrderProcessedData),
    OrderShipped(OrderShippedData),
    OrderCancelled(OrderCancelledData),
    ShippingAddressUpdated(ShippingAddressUpdatedData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated(_) => "OrderCreated",
            OrderEvent::ItemAdded(_) => "ItemAdded",
            OrderEvent::ItemRemoved(_) => "ItemRemoved",
            OrderEvent::OrderConfirmed(_) => "OrderConfirmed",
            OrderEvent::OrderProcessed(_) => "OrderProcessed",
            OrderEvent::OrderShipped(_) => "OrderShipped",
            OrderEvent::OrderCancelled(_) => "OrderCancelled",
            OrderEvent::ShippingAddressUpdated(_) => "ShippingAddressUpdated",
        }
    }
}

/// Payload of [`OrderEvent::OrderCreated`].
///
/// Customer fields are optional on purpose: creation only requires an
/// identity, everything else may be filled in later or never.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedData {
    pub order_id: OrderId,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub shipping_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payload of [`OrderEvent::ItemAdded`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemAddedData {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    /// Unit price captured at the moment of adding; later catalog changes
    /// never touch recorded lines.
    pub price: Money,
    pub added_at: DateTime<Utc>,
}

/// Payload of [`OrderEvent::ItemRemoved`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRemovedData {
    pub product_id: ProductId,
    pub removed_at: DateTime<Utc>,
}

/// Payload of [`OrderEvent::OrderConfirmed`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderConfirmedData {
    pub confirmed_at: DateTime<Utc>,
}

/// Payload of [`OrderEvent::OrderProcessed`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderProcessedData {
    pub processed_at: DateTime<Utc>,
}

/// Payload of [`OrderEvent::OrderShipped`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderShippedData {
    pub tracking_number: String,
    pub shipped_at: DateTime<Utc>,
}

/// Payload of [`OrderEvent::OrderCancelled`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCancelledData {
    pub reason: String,
    pub cancelled_at: DateTime<Utc>,
}

/// Payload of [`OrderEvent::ShippingAddressUpdated`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingAddressUpdatedData {
    pub shipping_address: String,
    pub updated_at: DateTime<Utc>,
}

/// Constructors. Each stamps the event with the current wall clock; replay
/// reads the stored timestamp back instead of re-stamping.
impl OrderEvent {
    pub fn order_created(
        order_id: OrderId,
        customer_id: Option<String>,
        customer_name: Option<String>,
        customer_email: Option<String>,
        shipping_address: Option<String>,
    ) -> Self {
        OrderEvent::OrderCreated(OrderCreatedData {
            order_id,
            customer_id,
            customer_name,
            customer_email,
            shipping_address,
            created_at: Utc::now(),
        })
    }

    /// Snapshots an order line into an event payload.
    pub fn item_added(item: &OrderItem) -> Self {
        OrderEvent::ItemAdded(ItemAddedData {
            product_id: item.product_id.clone(),
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            price: item.unit_price,
            added_at: Utc::now(),
        })
    }

    pub fn item_removed(product_id: ProductId) -> Self {
        OrderEvent::ItemRemoved(ItemRemovedData {
            product_id,
            removed_at: Utc::now(),
        })
    }

    pub fn order_confirmed() -> Self {
        OrderEvent::OrderConfirmed(OrderConfirmedData {
            confirmed_at: Utc::now(),
        })
    }

    pub fn order_processed() -> Self {
        OrderEvent::OrderProcessed(OrderProcessedData {
            processed_at: Utc::now(),
        })
    }

    pub fn order_shipped(tracking_number: impl Into<String>) -> Self {
        OrderEvent::OrderShipped(OrderShippedData {
            tracking_number: tracking_number.into(),
            shipped_at: Utc::now(),
        })
    }

    pub fn order_cancelled(reason: impl Into<String>) -> Self {
        OrderEvent::OrderCancelled(OrderCancelledData {
            reason: reason.into(),
            cancelled_at: Utc::now(),
        })
    }

    pub fn shipping_address_updated(shipping_address: impl Into<String>) -> Self {
        OrderEvent::ShippingAddressUpdated(ShippingAddressUpdatedData {
            shipping_address: shipping_address.into(),
            updated_at: Utc::now(),
        })
    }

    /// The timestamp carried by whichever variant this is.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderCreated(d) => d.created_at,
            OrderEvent::ItemAdded(d) => d.added_at,
            OrderEvent::ItemRemoved(d) => d.removed_at,
            OrderEvent::OrderConfirmed(d) => d.confirmed_at,
            OrderEvent::OrderProcessed(d) => d.processed_at,
            OrderEvent::OrderShipped(d) => d.shipped_at,
            OrderEvent::OrderCancelled(d) => d.cancelled_at,
            OrderEvent::ShippingAddressUpdated(d) => d.updated_at,
        }
    }
}
