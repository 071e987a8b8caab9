//! Typed facade over the command dispatcher.

use common::OrderId;
use event_store::{EventEnvelope, EventPublisher, EventStore};

use crate::aggregate::Aggregate;
use crate::dispatch::{CommandDispatcher, CommandResult, DispatcherConfig};
use crate::error::DomainError;

use super::{
    AddItem, CancelOrder, ConfirmOrder, CreateOrder, Order, ProcessOrder, RemoveItem, ShipOrder,
    UpdateShippingAddress,
};

impl From<super::OrderError> for DomainError {
    fn from(e: super::OrderError) -> Self {
        DomainError::Order(e)
    }
}

fn record_command(command: &'static str) {
    metrics::counter!("order_commands_total", "command" => command).increment(1);
}

/// Entry point for everything that touches a single order.
///
/// One method per command. Each delegates to the [`CommandDispatcher`],
/// which replays the aggregate, runs the command against it, and appends
/// the emitted events under optimistic locking. Successful commands bump
/// the `order_commands_total` counter.
pub struct OrderService<S: EventStore, P: EventPublisher> {
    dispatcher: CommandDispatcher<S, P, Order>,
}

impl<S: EventStore, P: EventPublisher> OrderService<S, P> {
    /// Service with default dispatch settings.
    pub fn new(store: S, publisher: P) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store, publisher),
        }
    }

    /// Service with explicit dispatch settings.
    pub fn with_config(store: S, publisher: P, config: DispatcherConfig) -> Self {
        Self {
            dispatcher: CommandDispatcher::with_config(store, publisher, config),
        }
    }

    /// Opens a new order. Fails with [`DomainError::AlreadyExists`] when
    /// the id is already taken.
    #[tracing::instrument(skip(self))]
    pub async fn create_order(
        &self,
        cmd: CreateOrder,
    ) -> Result<CommandResult<Order>, DomainError> {
        let result = self
            .dispatcher
            .execute_create(&cmd.order_id, |order| {
                order.create(
                    cmd.order_id.clone(),
                    cmd.customer_id.clone(),
                    cmd.customer_name.clone(),
                    cmd.customer_email.clone(),
                    cmd.shipping_address.clone(),
                )
            })
            .await?;

        record_command("create_order");
        Ok(result)
    }

    /// Adds a line item, replacing any existing line for the product.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(&self, cmd: AddItem) -> Result<CommandResult<Order>, DomainError> {
        let result = self
            .dispatcher
            .execute(&cmd.order_id, |order| {
                order.add_item(
                    cmd.product_id.clone(),
                    cmd.product_name.clone(),
                    cmd.quantity,
                    cmd.price,
                )
            })
            .await?;

        record_command("add_item");
        Ok(result)
    }

    /// Drops a line item.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, cmd: RemoveItem) -> Result<CommandResult<Order>, DomainError> {
        let result = self
            .dispatcher
            .execute(&cmd.order_id, |order| {
                order.remove_item(cmd.product_id.clone())
            })
            .await?;

        record_command("remove_item");
        Ok(result)
    }

    /// Confirms the order, freezing its item list.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_order(
        &self,
        cmd: ConfirmOrder,
    ) -> Result<CommandResult<Order>, DomainError> {
        let result = self
            .dispatcher
            .execute(&cmd.order_id, |order| order.confirm())
            .await?;

        record_command("confirm_order");
        Ok(result)
    }

    /// Moves a confirmed order to `Processed`.
    #[tracing::instrument(skip(self))]
    pub async fn process_order(
        &self,
        cmd: ProcessOrder,
    ) -> Result<CommandResult<Order>, DomainError> {
        let result = self
            .dispatcher
            .execute(&cmd.order_id, |order| order.process())
            .await?;

        record_command("process_order");
        Ok(result)
    }

    /// Ships under a tracking number. The order is immutable afterwards.
    #[tracing::instrument(skip(self))]
    pub async fn ship_order(&self, cmd: ShipOrder) -> Result<CommandResult<Order>, DomainError> {
        let result = self
            .dispatcher
            .execute(&cmd.order_id, |order| order.ship(&cmd.tracking_number))
            .await?;

        record_command("ship_order");
        Ok(result)
    }

    /// Cancels with a reason, any time before shipment.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        cmd: CancelOrder,
    ) -> Result<CommandResult<Order>, DomainError> {
        let result = self
            .dispatcher
            .execute(&cmd.order_id, |order| order.cancel(&cmd.reason))
            .await?;

        record_command("cancel_order");
        Ok(result)
    }

    /// Replaces the shipping address.
    ///
    /// Setting the current address again succeeds without emitting an event.
    #[tracing::instrument(skip(self))]
    pub async fn update_shipping_address(
        &self,
        cmd: UpdateShippingAddress,
    ) -> Result<CommandResult<Order>, DomainError> {
        let result = self
            .dispatcher
            .execute(&cmd.order_id, |order| {
                order.update_shipping_address(&cmd.shipping_address)
            })
            .await?;

        record_command("update_shipping_address");
        Ok(result)
    }

    /// Current state of `order_id`, or `None` for an order that was never
    /// created.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>, DomainError> {
        self.dispatcher.load_existing(order_id).await
    }

    /// Raw event envelopes for an order, in append order.
    ///
    /// Fails with [`DomainError::NotFound`] if the order has no events.
    #[tracing::instrument(skip(self))]
    pub async fn order_events(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<EventEnvelope>, DomainError> {
        let events = self.dispatcher.store().events_for_order(order_id).await?;
        if events.is_empty() {
            return Err(DomainError::NotFound {
                aggregate_type: Order::aggregate_type(),
                order_id: order_id.to_string(),
            });
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{Money, OrderError, OrderStatus};
    use event_store::{InMemoryEventStore, NullPublisher};

    fn service() -> OrderService<InMemoryEventStore, NullPublisher> {
        OrderService::new(InMemoryEventStore::new(), NullPublisher)
    }

    fn create_cmd(order_id: &str) -> CreateOrder {
        CreateOrder {
            customer_id: Some("C1".to_string()),
            customer_name: Some("Jane".to_string()),
            customer_email: Some("j@x.com".to_string()),
            shipping_address: Some("12 Main St".to_string()),
            ..CreateOrder::new(OrderId::new(order_id))
        }
    }

    fn lamp(order_id: &OrderId, quantity: i32) -> AddItem {
        AddItem::new(
            order_id.clone(),
            "P2",
            "Lamp",
            quantity,
            Money::from_cents(1450),
        )
    }

    #[tokio::test]
    async fn creating_lands_at_version_one() {
        let service = service();

        let result = service.create_order(create_cmd("O1")).await.unwrap();

        assert_eq!(result.aggregate.id().map(|id| id.as_str()), Some("O1"));
        assert_eq!(result.aggregate.customer_id(), Some("C1"));
        assert_eq!(result.events.len(), 1);
        assert_eq!(result.new_version, event_store::Version::first());
    }

    #[tokio::test]
    async fn duplicate_create_reports_already_exists() {
        let service = service();
        service.create_order(create_cmd("O1")).await.unwrap();

        let result = service.create_order(create_cmd("O1")).await;
        assert!(matches!(result, Err(DomainError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn adding_updates_count_and_total() {
        let service = service();
        service.create_order(create_cmd("O1")).await.unwrap();

        let result = service.add_item(lamp(&OrderId::new("O1"), 2)).await.unwrap();

        assert_eq!(result.aggregate.item_count(), 1);
        assert_eq!(result.aggregate.total_amount().cents(), 2900);
    }

    #[tokio::test]
    async fn commands_on_unknown_orders_are_not_found() {
        let service = service();

        let result = service.add_item(lamp(&OrderId::new("missing"), 2)).await;

        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected() {
        let service = service();
        service.create_order(create_cmd("O1")).await.unwrap();

        let result = service.add_item(lamp(&OrderId::new("O1"), 0)).await;

        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::InvalidQuantity { .. }))
        ));
    }

    #[tokio::test]
    async fn lifecycle_reaches_shipped_at_version_five() {
        let service = service();
        let order_id = OrderId::new("O1");

        service.create_order(create_cmd("O1")).await.unwrap();
        service.add_item(lamp(&order_id, 2)).await.unwrap();

        service
            .confirm_order(ConfirmOrder::new(order_id.clone()))
            .await
            .unwrap();
        service
            .process_order(ProcessOrder::new(order_id.clone()))
            .await
            .unwrap();
        let result = service
            .ship_order(ShipOrder::new(order_id.clone(), "TRK-5"))
            .await
            .unwrap();

        assert_eq!(result.aggregate.status(), OrderStatus::Shipped);
        assert_eq!(result.new_version, event_store::Version::new(5));
    }

    #[tokio::test]
    async fn cancelling_is_recorded() {
        let service = service();
        let order_id = OrderId::new("O1");

        service.create_order(create_cmd("O1")).await.unwrap();
        service.add_item(lamp(&order_id, 1)).await.unwrap();

        let result = service
            .cancel_order(CancelOrder::new(order_id.clone(), "ordered twice"))
            .await
            .unwrap();

        assert_eq!(result.aggregate.status(), OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn removal_zeroes_out_a_single_line_order() {
        let service = service();
        let order_id = OrderId::new("O1");

        service.create_order(create_cmd("O1")).await.unwrap();
        service.add_item(lamp(&order_id, 2)).await.unwrap();

        let result = service
            .remove_item(RemoveItem::new(order_id.clone(), "P2"))
            .await
            .unwrap();

        assert_eq!(result.aggregate.item_count(), 0);
        assert_eq!(result.aggregate.total_amount().cents(), 0);

        let missing = service
            .remove_item(RemoveItem::new(order_id.clone(), "P2"))
            .await;
        assert!(matches!(
            missing,
            Err(DomainError::Order(OrderError::ItemNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn unchanged_address_keeps_the_version() {
        let service = service();
        let order_id = OrderId::new("O1");

        service.create_order(create_cmd("O1")).await.unwrap();

        let result = service
            .update_shipping_address(UpdateShippingAddress::new(order_id.clone(), "12 Main St"))
            .await
            .unwrap();

        assert!(result.events.is_empty());
        assert_eq!(result.new_version, event_store::Version::first());
    }

    #[tokio::test]
    async fn get_order_distinguishes_missing_from_found() {
        let service = service();

        let missing = service.get_order(&OrderId::new("missing")).await.unwrap();
        assert!(missing.is_none());

        service.create_order(create_cmd("O1")).await.unwrap();
        let found = service.get_order(&OrderId::new("O1")).await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn order_events_come_back_in_append_order() {
        let service = service();
        let order_id = OrderId::new("O1");

        let missing = service.order_events(&order_id).await;
        assert!(matches!(missing, Err(DomainError::NotFound { .. })));

        service.create_order(create_cmd("O1")).await.unwrap();
        service.add_item(lamp(&order_id, 1)).await.unwrap();

        let events = service.order_events(&order_id).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "OrderCreated");
        assert_eq!(events[1].event_type, "ItemAdded");
    }
}
