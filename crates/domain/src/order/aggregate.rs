//! The order aggregate root.

use chrono::{DateTime, Utc};
use common::OrderId;
use event_store::Version;

use crate::aggregate::Aggregate;

use super::{
    Money, OrderError, OrderEvent, OrderItem, OrderStatus, ProductId,
    events::{ItemAddedData, OrderCreatedData},
};

/// An order, reconstructed from its event history.
///
/// The struct is ephemeral: it is folded into existence for one command,
/// consulted, and dropped. Nothing here is persisted directly; the events
/// are.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Order {
    /// Set by the creation event, `None` before it.
    id: Option<OrderId>,

    /// Tracks the stream head for optimistic locking.
    version: Version,

    customer_id: Option<String>,
    customer_name: Option<String>,
    customer_email: Option<String>,

    /// Mutable until the order ships or is cancelled.
    shipping_address: Option<String>,

    created_at: Option<DateTime<Utc>>,
    status: OrderStatus,

    /// Line items in insertion order. Product ids are unique: adding a
    /// duplicate replaces the existing line.
    items: Vec<OrderItem>,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
    }

    fn id(&self) -> Option<&OrderId> {
        self.id.as_ref()
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            OrderEvent::OrderCreated(data) => self.on_created(data),
            OrderEvent::ItemAdded(data) => self.on_item_added(data),
            OrderEvent::ItemRemoved(data) => self.on_item_removed(&data.product_id),
            OrderEvent::OrderConfirmed(_) => self.status = OrderStatus::Confirmed,
            OrderEvent::OrderProcessed(_) => self.status = OrderStatus::Processed,
            OrderEvent::OrderShipped(_) => self.status = OrderStatus::Shipped,
            OrderEvent::OrderCancelled(_) => self.status = OrderStatus::Cancelled,
            OrderEvent::ShippingAddressUpdated(data) => {
                self.shipping_address = Some(data.shipping_address)
            }
        }
    }
}

// Read accessors
impl Order {
    /// Customer who placed the order, if recorded.
    pub fn customer_id(&self) -> Option<&str> {
        self.customer_id.as_deref()
    }

    /// Customer display name, if recorded.
    pub fn customer_name(&self) -> Option<&str> {
        self.customer_name.as_deref()
    }

    /// Customer contact email, if recorded.
    pub fn customer_email(&self) -> Option<&str> {
        self.customer_email.as_deref()
    }

    /// Shipping address as last updated.
    pub fn shipping_address(&self) -> Option<&str> {
        self.shipping_address.as_deref()
    }

    /// Creation timestamp from the first event.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Where the order is in its lifecycle.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Item lines, oldest first.
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// The line for `product_id`, if present.
    pub fn get_item(&self, product_id: &ProductId) -> Option<&OrderItem> {
        self.items.iter().find(|item| &item.product_id == product_id)
    }

    /// Number of item lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Units across all lines.
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Order total, always derived from the current item lines.
    pub fn total_amount(&self) -> Money {
        self.items.iter().map(|item| item.line_total()).sum()
    }

    /// True once at least one line exists.
    pub fn has_items(&self) -> bool {
        !self.items.is_empty()
    }

    /// True in statuses that admit no further commands.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// Command methods: inspect state, emit events, mutate nothing.
impl Order {
    /// Starts a new order.
    ///
    /// Customer fields are deliberately not validated: creation only needs
    /// the order identity, everything else is accepted as given.
    pub fn create(
        &self,
        order_id: OrderId,
        customer_id: Option<String>,
        customer_name: Option<String>,
        customer_email: Option<String>,
        shipping_address: Option<String>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.id.is_some() {
            return Err(OrderError::AlreadyCreated);
        }

        Ok(vec![OrderEvent::order_created(
            order_id,
            customer_id,
            customer_name,
            customer_email,
            shipping_address,
        )])
    }

    /// Adds a line item.
    ///
    /// If a line with the same product ID already exists, the new line
    /// replaces it entirely; quantities are never merged.
    pub fn add_item(
        &self,
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: i32,
        price: Money,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if !self.status.can_modify_items() {
            return Err(OrderError::InvalidStateTransition {
                current_status: self.status,
                action: "add item",
            });
        }

        if quantity <= 0 {
            return Err(OrderError::InvalidQuantity { quantity });
        }

        if !price.is_positive() {
            return Err(OrderError::InvalidPrice {
                price: price.cents(),
            });
        }

        let item = OrderItem::new(product_id, product_name, quantity as u32, price);
        Ok(vec![OrderEvent::item_added(&item)])
    }

    /// Drops the line for `product_id`.
    pub fn remove_item(&self, product_id: ProductId) -> Result<Vec<OrderEvent>, OrderError> {
        if !self.status.can_modify_items() {
            return Err(OrderError::InvalidStateTransition {
                current_status: self.status,
                action: "remove item",
            });
        }

        if self.get_item(&product_id).is_none() {
            return Err(OrderError::ItemNotFound {
                product_id: product_id.to_string(),
            });
        }

        Ok(vec![OrderEvent::item_removed(product_id)])
    }

    /// Confirms the order, freezing its contents.
    pub fn confirm(&self) -> Result<Vec<OrderEvent>, OrderError> {
        if !self.status.can_confirm() {
            return Err(OrderError::InvalidStateTransition {
                current_status: self.status,
                action: "confirm",
            });
        }

        if !self.has_items() {
            return Err(OrderError::NoItems);
        }

        Ok(vec![OrderEvent::order_confirmed()])
    }

    /// Marks payment/fulfillment processing as finished.
    pub fn process(&self) -> Result<Vec<OrderEvent>, OrderError> {
        if !self.status.can_process() {
            return Err(OrderError::InvalidStateTransition {
                current_status: self.status,
                action: "process",
            });
        }

        Ok(vec![OrderEvent::order_processed()])
    }

    /// Ships the order with a tracking number.
    pub fn ship(&self, tracking_number: &str) -> Result<Vec<OrderEvent>, OrderError> {
        if !self.status.can_ship() {
            return Err(OrderError::InvalidStateTransition {
                current_status: self.status,
                action: "ship",
            });
        }

        if tracking_number.trim().is_empty() {
            return Err(OrderError::BlankTrackingNumber);
        }

        Ok(vec![OrderEvent::order_shipped(tracking_number)])
    }

    /// Cancels the order, recording why. Open until shipment.
    pub fn cancel(&self, reason: &str) -> Result<Vec<OrderEvent>, OrderError> {
        if !self.status.can_cancel() {
            return Err(OrderError::InvalidStateTransition {
                current_status: self.status,
                action: "cancel",
            });
        }

        if reason.trim().is_empty() {
            return Err(OrderError::BlankCancellationReason);
        }

        Ok(vec![OrderEvent::order_cancelled(reason)])
    }

    /// Updates the shipping address.
    ///
    /// Setting the address to its current value is a no-op: no event is
    /// emitted and the version does not advance.
    pub fn update_shipping_address(
        &self,
        shipping_address: &str,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if !self.status.can_update_shipping_address() {
            return Err(OrderError::InvalidStateTransition {
                current_status: self.status,
                action: "update shipping address",
            });
        }

        if shipping_address.trim().is_empty() {
            return Err(OrderError::BlankShippingAddress);
        }

        if self.shipping_address.as_deref() == Some(shipping_address) {
            return Ok(vec![]);
        }

        Ok(vec![OrderEvent::shipping_address_updated(shipping_address)])
    }
}

// Event application
impl Order {
    fn on_created(&mut self, data: OrderCreatedData) {
        self.id = Some(data.order_id);
        self.customer_id = data.customer_id;
        self.customer_name = data.customer_name;
        self.customer_email = data.customer_email;
        self.shipping_address = data.shipping_address;
        self.created_at = Some(data.created_at);
        self.status = OrderStatus::Created;
    }

    fn on_item_added(&mut self, data: ItemAddedData) {
        // Replace-on-duplicate: drop any existing line for this product,
        // then append the new one.
        self.items.retain(|item| item.product_id != data.product_id);
        self.items.push(OrderItem::new(
            data.product_id,
            data.product_name,
            data.quantity,
            data.price,
        ));
    }

    fn on_item_removed(&mut self, product_id: &ProductId) {
        self.items.retain(|item| &item.product_id != product_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Aggregate, DomainEvent};

    fn created_order() -> Order {
        let mut order = Order::default();
        let events = order
            .create(
                OrderId::new("O1"),
                Some("C1".to_string()),
                Some("Jane".to_string()),
                Some("j@x.com".to_string()),
                Some("12 Main St".to_string()),
            )
            .unwrap();
        order.apply_events(events);
        order
    }

    #[test]
    fn creation_captures_customer_fields() {
        let order = created_order();
        assert_eq!(order.id().map(|id| id.as_str()), Some("O1"));
        assert_eq!(order.customer_id(), Some("C1"));
        assert_eq!(order.customer_name(), Some("Jane"));
        assert_eq!(order.customer_email(), Some("j@x.com"));
        assert_eq!(order.shipping_address(), Some("12 Main St"));
        assert!(order.created_at().is_some());
        assert_eq!(order.status(), OrderStatus::Created);
        assert!(!order.has_items());
    }

    #[test]
    fn creation_accepts_absent_customer_fields() {
        let mut order = Order::default();
        let events = order
            .create(OrderId::new("O1"), None, None, None, None)
            .unwrap();
        order.apply_events(events);

        assert_eq!(order.id().map(|id| id.as_str()), Some("O1"));
        assert!(order.customer_id().is_none());
        assert!(order.shipping_address().is_none());
        assert_eq!(order.status(), OrderStatus::Created);
    }

    #[test]
    fn creating_twice_is_rejected() {
        let order = created_order();
        let result = order.create(OrderId::new("O2"), None, None, None, None);
        assert!(matches!(result, Err(OrderError::AlreadyCreated)));
    }

    #[test]
    fn added_item_contributes_to_total() {
        let mut order = created_order();

        let events = order
            .add_item(ProductId::new("P1"), "Widget", 2, Money::from_cents(1000))
            .unwrap();
        order.apply_events(events);

        assert_eq!(order.item_count(), 1);
        assert_eq!(order.total_amount().cents(), 2000);
    }

    #[test]
    fn duplicate_product_replaces_the_line() {
        let mut order = created_order();

        order.apply_events(
            order
                .add_item(ProductId::new("P1"), "Widget", 1, Money::from_cents(1000))
                .unwrap(),
        );
        order.apply_events(
            order
                .add_item(ProductId::new("P1"), "Widget", 3, Money::from_cents(1200))
                .unwrap(),
        );

        assert_eq!(order.item_count(), 1);
        let item = order.get_item(&ProductId::new("P1")).unwrap();
        assert_eq!(item.quantity, 3);
        assert_eq!(item.unit_price.cents(), 1200);
        assert_eq!(order.total_amount().cents(), 3600);
    }

    #[test]
    fn replaced_line_moves_to_the_end() {
        let mut order = created_order();

        order.apply_events(
            order
                .add_item(ProductId::new("P1"), "Widget", 1, Money::from_cents(1000))
                .unwrap(),
        );
        order.apply_events(
            order
                .add_item(ProductId::new("P2"), "Gadget", 1, Money::from_cents(500))
                .unwrap(),
        );
        order.apply_events(
            order
                .add_item(ProductId::new("P1"), "Widget", 2, Money::from_cents(1000))
                .unwrap(),
        );

        let ids: Vec<&str> = order
            .items()
            .iter()
            .map(|item| item.product_id.as_str())
            .collect();
        assert_eq!(ids, vec!["P2", "P1"]);
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let order = created_order();

        let result = order.add_item(ProductId::new("P1"), "Widget", 0, Money::from_cents(1000));
        assert!(matches!(
            result,
            Err(OrderError::InvalidQuantity { quantity: 0 })
        ));

        let result = order.add_item(ProductId::new("P1"), "Widget", -3, Money::from_cents(1000));
        assert!(matches!(
            result,
            Err(OrderError::InvalidQuantity { quantity: -3 })
        ));
    }

    #[test]
    fn non_positive_price_is_rejected() {
        let order = created_order();
        let result = order.add_item(ProductId::new("P1"), "Widget", 1, Money::zero());
        assert!(matches!(result, Err(OrderError::InvalidPrice { .. })));
    }

    #[test]
    fn items_freeze_after_confirmation() {
        let mut order = created_order();
        order.apply_events(
            order
                .add_item(ProductId::new("P1"), "Widget", 1, Money::from_cents(1000))
                .unwrap(),
        );
        order.apply_events(order.confirm().unwrap());

        let result = order.add_item(ProductId::new("P2"), "Gadget", 1, Money::from_cents(500));
        assert!(matches!(
            result,
            Err(OrderError::InvalidStateTransition {
                current_status: OrderStatus::Confirmed,
                ..
            })
        ));
    }

    #[test]
    fn removing_an_item_updates_the_total() {
        let mut order = created_order();
        order.apply_events(
            order
                .add_item(ProductId::new("P1"), "Widget", 2, Money::from_cents(1000))
                .unwrap(),
        );

        let events = order.remove_item(ProductId::new("P1")).unwrap();
        order.apply_events(events);

        assert_eq!(order.item_count(), 0);
        assert_eq!(order.total_amount().cents(), 0);
    }

    #[test]
    fn removing_an_unknown_item_is_rejected() {
        let order = created_order();
        let result = order.remove_item(ProductId::new("P9"));
        assert!(matches!(result, Err(OrderError::ItemNotFound { .. })));
    }

    #[test]
    fn removal_freezes_after_confirmation() {
        let mut order = created_order();
        order.apply_events(
            order
                .add_item(ProductId::new("P1"), "Widget", 1, Money::from_cents(1000))
                .unwrap(),
        );
        order.apply_events(order.confirm().unwrap());

        let result = order.remove_item(ProductId::new("P1"));
        assert!(matches!(
            result,
            Err(OrderError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn confirmation_advances_the_status() {
        let mut order = created_order();
        order.apply_events(
            order
                .add_item(ProductId::new("P1"), "Widget", 1, Money::from_cents(1000))
                .unwrap(),
        );

        let events = order.confirm().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "OrderConfirmed");

        order.apply_events(events);
        assert_eq!(order.status(), OrderStatus::Confirmed);
    }

    #[test]
    fn confirming_an_empty_order_is_rejected() {
        let order = created_order();
        let result = order.confirm();
        assert!(matches!(result, Err(OrderError::NoItems)));
        assert_eq!(order.status(), OrderStatus::Created);
    }

    #[test]
    fn confirming_twice_is_rejected() {
        let mut order = created_order();
        order.apply_events(
            order
                .add_item(ProductId::new("P1"), "Widget", 1, Money::from_cents(1000))
                .unwrap(),
        );
        order.apply_events(order.confirm().unwrap());

        let result = order.confirm();
        assert!(matches!(
            result,
            Err(OrderError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn processing_requires_a_confirmed_order() {
        let mut order = created_order();
        order.apply_events(
            order
                .add_item(ProductId::new("P1"), "Widget", 1, Money::from_cents(1000))
                .unwrap(),
        );

        let result = order.process();
        assert!(matches!(
            result,
            Err(OrderError::InvalidStateTransition { .. })
        ));

        order.apply_events(order.confirm().unwrap());
        order.apply_events(order.process().unwrap());
        assert_eq!(order.status(), OrderStatus::Processed);
    }

    #[test]
    fn shipping_requires_a_processed_order() {
        let mut order = created_order();
        order.apply_events(
            order
                .add_item(ProductId::new("P1"), "Widget", 1, Money::from_cents(1000))
                .unwrap(),
        );
        order.apply_events(order.confirm().unwrap());

        let result = order.ship("TRK1");
        assert!(matches!(
            result,
            Err(OrderError::InvalidStateTransition { .. })
        ));

        order.apply_events(order.process().unwrap());
        order.apply_events(order.ship("TRK1").unwrap());
        assert_eq!(order.status(), OrderStatus::Shipped);
    }

    #[test]
    fn blank_tracking_number_is_rejected() {
        let mut order = created_order();
        order.apply_events(
            order
                .add_item(ProductId::new("P1"), "Widget", 1, Money::from_cents(1000))
                .unwrap(),
        );
        order.apply_events(order.confirm().unwrap());
        order.apply_events(order.process().unwrap());

        let result = order.ship("   ");
        assert!(matches!(result, Err(OrderError::BlankTrackingNumber)));
    }

    #[test]
    fn lifecycle_walks_created_to_shipped() {
        let mut order = created_order();

        order.apply_events(
            order
                .add_item(ProductId::new("P1"), "Widget", 2, Money::from_cents(1000))
                .unwrap(),
        );

        order.apply_events(order.confirm().unwrap());
        assert_eq!(order.status(), OrderStatus::Confirmed);

        order.apply_events(order.process().unwrap());
        assert_eq!(order.status(), OrderStatus::Processed);

        order.apply_events(order.ship("TRK1").unwrap());
        assert_eq!(order.status(), OrderStatus::Shipped);
    }

    #[test]
    fn cancel_allowed_until_shipment() {
        for steps in 0..3 {
            let mut order = created_order();
            order.apply_events(
                order
                    .add_item(ProductId::new("P1"), "Widget", 1, Money::from_cents(1000))
                    .unwrap(),
            );
            if steps >= 1 {
                order.apply_events(order.confirm().unwrap());
            }
            if steps >= 2 {
                order.apply_events(order.process().unwrap());
            }

            order.apply_events(order.cancel("Customer request").unwrap());
            assert_eq!(order.status(), OrderStatus::Cancelled);
            assert!(order.is_terminal());
        }
    }

    #[test]
    fn shipped_orders_cannot_be_cancelled() {
        let mut order = created_order();
        order.apply_events(
            order
                .add_item(ProductId::new("P1"), "Widget", 1, Money::from_cents(1000))
                .unwrap(),
        );
        order.apply_events(order.confirm().unwrap());
        order.apply_events(order.process().unwrap());
        order.apply_events(order.ship("TRK1").unwrap());

        let result = order.cancel("Too late");
        assert!(matches!(
            result,
            Err(OrderError::InvalidStateTransition {
                current_status: OrderStatus::Shipped,
                ..
            })
        ));
    }

    #[test]
    fn cancelling_twice_is_rejected() {
        let mut order = created_order();
        order.apply_events(order.cancel("First").unwrap());

        let result = order.cancel("Second");
        assert!(matches!(
            result,
            Err(OrderError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn blank_cancellation_reason_is_rejected() {
        let order = created_order();
        let result = order.cancel("  ");
        assert!(matches!(result, Err(OrderError::BlankCancellationReason)));
    }

    #[test]
    fn address_update_emits_one_event() {
        let mut order = created_order();

        let events = order.update_shipping_address("42 Other Ave").unwrap();
        assert_eq!(events.len(), 1);
        order.apply_events(events);

        assert_eq!(order.shipping_address(), Some("42 Other Ave"));
    }

    #[test]
    fn unchanged_address_is_a_noop() {
        let order = created_order();

        let events = order.update_shipping_address("12 Main St").unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn blank_address_is_rejected() {
        let order = created_order();
        let result = order.update_shipping_address(" ");
        assert!(matches!(result, Err(OrderError::BlankShippingAddress)));
    }

    #[test]
    fn address_freezes_after_shipment() {
        let mut order = created_order();
        order.apply_events(
            order
                .add_item(ProductId::new("P1"), "Widget", 1, Money::from_cents(1000))
                .unwrap(),
        );
        order.apply_events(order.confirm().unwrap());
        order.apply_events(order.process().unwrap());
        order.apply_events(order.ship("TRK1").unwrap());

        let result = order.update_shipping_address("42 Other Ave");
        assert!(matches!(
            result,
            Err(OrderError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn address_freezes_after_cancellation() {
        let mut order = created_order();
        order.apply_events(order.cancel("Changed mind").unwrap());

        let result = order.update_shipping_address("42 Other Ave");
        assert!(matches!(
            result,
            Err(OrderError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn address_stays_mutable_after_confirmation() {
        let mut order = created_order();
        order.apply_events(
            order
                .add_item(ProductId::new("P1"), "Widget", 1, Money::from_cents(1000))
                .unwrap(),
        );
        order.apply_events(order.confirm().unwrap());

        let events = order.update_shipping_address("42 Other Ave").unwrap();
        order.apply_events(events);
        assert_eq!(order.shipping_address(), Some("42 Other Ave"));
    }

    #[test]
    fn totals_derive_from_line_items() {
        let mut order = created_order();
        order.apply_events(
            order
                .add_item(ProductId::new("P1"), "Widget", 2, Money::from_cents(1000))
                .unwrap(),
        );
        order.apply_events(
            order
                .add_item(ProductId::new("P2"), "Gadget", 3, Money::from_cents(500))
                .unwrap(),
        );

        let expected: i64 = order
            .items()
            .iter()
            .map(|item| item.line_total().cents())
            .sum();
        assert_eq!(order.total_amount().cents(), expected);
        assert_eq!(order.total_amount().cents(), 3500);
        assert_eq!(order.total_quantity(), 5);
    }

    #[test]
    fn replay_is_deterministic() {
        let mut source = Order::default();
        let mut history = Vec::new();
        let mut record = |order: &mut Order, events: Vec<OrderEvent>| {
            history.extend(events.clone());
            order.apply_events(events);
        };

        let events = source
            .create(
                OrderId::new("O1"),
                Some("C1".to_string()),
                None,
                None,
                Some("12 Main St".to_string()),
            )
            .unwrap();
        record(&mut source, events);
        let events = source
            .add_item(ProductId::new("P1"), "Widget", 2, Money::from_cents(1000))
            .unwrap();
        record(&mut source, events);
        let events = source
            .add_item(ProductId::new("P1"), "Widget", 5, Money::from_cents(900))
            .unwrap();
        record(&mut source, events);
        let events = source.confirm().unwrap();
        record(&mut source, events);

        let mut first = Order::default();
        first.apply_events(history.clone());
        let mut second = Order::default();
        second.apply_events(history);

        assert_eq!(first, second);
        assert_eq!(first, source);
        assert_eq!(first.total_amount().cents(), 4500);
    }
}
