//! Order summary rows and their storage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{Money, OrderStatus, ProductId};
use tokio::sync::RwLock;

use crate::Result;

/// One line of an order summary.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItemSummary {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub price: Money,
}

impl OrderItemSummary {
    /// Line total (quantity × unit price).
    pub fn line_total(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// Denormalized summary of one order.
///
/// Maintained by the order summary projection, one row per order. Rows are
/// never deleted; terminal orders stay queryable with their final status,
/// tracking number or cancellation reason.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSummary {
    pub order_id: OrderId,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub shipping_address: Option<String>,
    pub status: OrderStatus,
    pub items: Vec<OrderItemSummary>,
    pub total_amount: Money,
    pub tracking_number: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderSummary {
    /// Replaces any existing line for the same product, then appends the
    /// new line. Mirrors the aggregate's replace-on-duplicate rule,
    /// including the replaced line moving to the end.
    pub fn upsert_item(&mut self, item: OrderItemSummary) {
        self.items.retain(|i| i.product_id != item.product_id);
        self.items.push(item);
        self.recalculate_total();
    }

    /// Removes the line for a product, if present.
    pub fn remove_item(&mut self, product_id: &ProductId) {
        self.items.retain(|i| i.product_id != *product_id);
        self.recalculate_total();
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    fn recalculate_total(&mut self) {
        self.total_amount = self.items.iter().map(OrderItemSummary::line_total).sum();
    }
}

/// Storage for order summary rows.
///
/// The query-side counterpart of the event store trait: the order summary
/// projection writes through it, the HTTP query handlers read through it.
#[async_trait]
pub trait ReadModelStore: Send + Sync {
    /// Inserts or fully replaces the summary row for an order.
    async fn save(&self, summary: OrderSummary) -> Result<()>;

    /// Fetches the summary row for one order.
    async fn summary(&self, order_id: &OrderId) -> Result<Option<OrderSummary>>;

    /// All summary rows, oldest order first.
    async fn all_summaries(&self) -> Result<Vec<OrderSummary>>;

    /// Summary rows for one customer, oldest first.
    async fn summaries_for_customer(&self, customer_id: &str) -> Result<Vec<OrderSummary>>;

    /// Summary rows currently in the given status, oldest first.
    async fn summaries_with_status(&self, status: OrderStatus) -> Result<Vec<OrderSummary>>;

    /// Number of summary rows.
    async fn count(&self) -> Result<usize>;

    /// Removes every row. Used when rebuilding projections from scratch.
    async fn clear(&self) -> Result<()>;
}

/// In-memory read model store.
///
/// Backs the default server wiring and the test suites. Listing methods
/// return rows sorted by creation time (ties broken by order id) so query
/// results are stable regardless of map iteration order.
#[derive(Clone, Default)]
pub struct InMemoryReadModelStore {
    summaries: Arc<RwLock<HashMap<OrderId, OrderSummary>>>,
}

impl InMemoryReadModelStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    async fn sorted(&self, filter: impl Fn(&OrderSummary) -> bool) -> Vec<OrderSummary> {
        let mut rows: Vec<OrderSummary> = self
            .summaries
            .read()
            .await
            .values()
            .filter(|s| filter(s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.order_id.cmp(&b.order_id))
        });
        rows
    }
}

#[async_trait]
impl ReadModelStore for InMemoryReadModelStore {
    async fn save(&self, summary: OrderSummary) -> Result<()> {
        self.summaries
            .write()
            .await
            .insert(summary.order_id.clone(), summary);
        Ok(())
    }

    async fn summary(&self, order_id: &OrderId) -> Result<Option<OrderSummary>> {
        Ok(self.summaries.read().await.get(order_id).cloned())
    }

    async fn all_summaries(&self) -> Result<Vec<OrderSummary>> {
        Ok(self.sorted(|_| true).await)
    }

    async fn summaries_for_customer(&self, customer_id: &str) -> Result<Vec<OrderSummary>> {
        Ok(self
            .sorted(|s| s.customer_id.as_deref() == Some(customer_id))
            .await)
    }

    async fn summaries_with_status(&self, status: OrderStatus) -> Result<Vec<OrderSummary>> {
        Ok(self.sorted(|s| s.status == status).await)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.summaries.read().await.len())
    }

    async fn clear(&self) -> Result<()> {
        self.summaries.write().await.clear();
        Ok(())
    }
}
