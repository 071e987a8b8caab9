//! Command side of the order management core.
//!
//! Orders are event-sourced: every change is captured as an [`OrderEvent`]
//! and aggregate state is rebuilt by replaying those events in version order.
//! The [`Aggregate`] and [`DomainEvent`] traits define that contract, the
//! [`order`] module implements it for the order lifecycle, and
//! [`CommandDispatcher`] serializes commands per order with optimistic
//! concurrency and conflict retry.

pub mod aggregate;
pub mod dispatch;
pub mod error;
pub mod order;

pub use aggregate::{Aggregate, DomainEvent};
pub use dispatch::{Command, CommandDispatcher, CommandResult, DispatcherConfig, RetryConfig};
pub use error::DomainError;
pub use order::{
    AddItem, CancelOrder, ConfirmOrder, CreateOrder, Money, Order, OrderError, OrderEvent,
    OrderItem, OrderService, OrderStatus, ProcessOrder, ProductId, RemoveItem, ShipOrder,
    UnknownStatus, UpdateShippingAddress,
};
