//! Commands accepted by the order service.
//!
//! Commands carry raw caller input. They perform no validation of their
//! own; the aggregate's command methods decide what is allowed.

use common::OrderId;

use crate::dispatch::Command;

use super::{Money, Order, ProductId};

/// Opens a new order.
///
/// Only the order identity is required. Customer fields are recorded
/// verbatim on the creation event when present.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub order_id: OrderId,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub shipping_address: Option<String>,
}

impl CreateOrder {
    pub fn new(order_id: OrderId) -> Self {
        Self {
            order_id,
            customer_id: None,
            customer_name: None,
            customer_email: None,
            shipping_address: None,
        }
    }

    /// Same as [`CreateOrder::new`] with a freshly minted order id.
    pub fn with_generated_id() -> Self {
        Self::new(OrderId::generate())
    }
}

/// Adds one line item.
///
/// Re-adding a product the order already carries replaces its line.
#[derive(Debug, Clone)]
pub struct AddItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    /// Must be positive; the aggregate rejects anything else.
    pub quantity: i32,
    pub price: Money,
}

impl AddItem {
    pub fn new(
        order_id: OrderId,
        product_id: impl Into<ProductId>,
        product_name: impl Into<String>,
        quantity: i32,
        price: Money,
    ) -> Self {
        Self {
            order_id,
            product_id: product_id.into(),
            product_name: product_name.into(),
            quantity,
            price,
        }
    }
}

/// Drops the line for one product.
#[derive(Debug, Clone)]
pub struct RemoveItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
}

impl RemoveItem {
    pub fn new(order_id: OrderId, product_id: impl Into<ProductId>) -> Self {
        Self {
            order_id,
            product_id: product_id.into(),
        }
    }
}

/// Freezes the item list and moves the order to `Confirmed`.
#[derive(Debug, Clone)]
pub struct ConfirmOrder {
    pub order_id: OrderId,
}

impl ConfirmOrder {
    pub fn new(order_id: OrderId) -> Self {
        Self { order_id }
    }
}

/// Marks a confirmed order as processed.
#[derive(Debug, Clone)]
pub struct ProcessOrder {
    pub order_id: OrderId,
}

impl ProcessOrder {
    pub fn new(order_id: OrderId) -> Self {
        Self { order_id }
    }
}

/// Ships a processed order under a carrier tracking number.
#[derive(Debug, Clone)]
pub struct ShipOrder {
    pub order_id: OrderId,
    pub tracking_number: String,
}

impl ShipOrder {
    pub fn new(order_id: OrderId, tracking_number: impl Into<String>) -> Self {
        Self {
            order_id,
            tracking_number: tracking_number.into(),
        }
    }
}

/// Cancels the order, allowed any time before shipment.
#[derive(Debug, Clone)]
pub struct CancelOrder {
    pub order_id: OrderId,
    pub reason: String,
}

impl CancelOrder {
    pub fn new(order_id: OrderId, reason: impl Into<String>) -> Self {
        Self {
            order_id,
            reason: reason.into(),
        }
    }
}

/// Replaces the shipping address. Submitting the current address again
/// is a no-op.
#[derive(Debug, Clone)]
pub struct UpdateShippingAddress {
    pub order_id: OrderId,
    pub shipping_address: String,
}

impl UpdateShippingAddress {
    pub fn new(order_id: OrderId, shipping_address: impl Into<String>) -> Self {
        Self {
            order_id,
            shipping_address: shipping_address.into(),
        }
    }
}

/// Ties a command struct to the [`Order`] aggregate through its
/// `order_id` field.
macro_rules! impl_order_command {
    ($($command:ty),+ $(,)?) => {
        $(impl Command for $command {
            type Aggregate = Order;

            fn order_id(&self) -> &OrderId {
                &self.order_id
            }
        })+
    };
}

impl_order_command!(
    CreateOrder,
    AddItem,
    RemoveItem,
    ConfirmOrder,
    ProcessOrder,
    ShipOrder,
    CancelOrder,
    UpdateShippingAddress,
);
