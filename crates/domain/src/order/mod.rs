//! The order aggregate: commands, events, status machine and service.

mod aggregate;
mod commands;
mod events;
mod service;
mod status;
mod value_objects;

pub use aggregate::Order;
pub use commands::{
    AddItem, CancelOrder, ConfirmOrder, CreateOrder, ProcessOrder, RemoveItem, ShipOrder,
    UpdateShippingAddress,
};
pub use events::{
    ItemAddedData, ItemRemovedData, OrderCancelledData, OrderConfirmedData, OrderCreatedData,
    OrderEvent, OrderProcessedData, OrderShippedData, ShippingAddressUpdatedData,
};
pub use service::OrderService;
pub use status::{OrderStatus, UnknownStatus};
pub use value_objects::{Money, OrderItem, ProductId};

use thiserror::Error;

/// Rejection reasons for order commands.
#[derive(Debug, Error)]
pub enum OrderError {
    /// A create command reached an order that already exists.
    #[error("Order has already been created")]
    AlreadyCreated,

    /// Quantities start at 1.
    #[error("Item quantity must be positive, got {quantity}")]
    InvalidQuantity { quantity: i32 },

    /// Unit prices start at one cent.
    #[error("Item price must be positive, got {price} cents")]
    InvalidPrice { price: i64 },

    /// No line item carries this product id.
    #[error("No item with product ID {product_id}")]
    ItemNotFound { product_id: String },

    /// Confirmation requires at least one line item.
    #[error("Cannot confirm an order with no items")]
    NoItems,

    /// The order's current status forbids the action.
    #[error("Cannot {action}: order is {current_status}")]
    InvalidStateTransition {
        current_status: OrderStatus,
        action: &'static str,
    },

    /// Tracking number is missing or blank.
    #[error("Tracking number must not be blank")]
    BlankTrackingNumber,

    /// Cancellation reason is missing or blank.
    #[error("Cancellation reason must not be blank")]
    BlankCancellationReason,

    /// Shipping address is missing or blank.
    #[error("Shipping address must not be blank")]
    BlankShippingAddress,
}
