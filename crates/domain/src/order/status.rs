//! Order status machine.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// Created ──► Confirmed ──► Processed ──► Shipped ──► Delivered
///    │            │             │
///    └────────────┴─────────────┴──► Cancelled
/// ```
///
/// No command here moves an order to `Delivered`; it is a terminal status
/// recorded by an external fulfillment process. The persisted/queryable
/// string forms are the uppercase names (`"CREATED"`, `"CONFIRMED"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Order exists, items can be added/removed.
    #[default]
    Created,

    /// Customer confirmed the order; contents are frozen.
    Confirmed,

    /// Payment/fulfillment processing finished.
    Processed,

    /// Order handed to the carrier (terminal for mutation).
    Shipped,

    /// Order arrived (terminal state, set outside this command set).
    Delivered,

    /// Order called off before shipment (terminal).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if items can be added or removed in this status.
    pub fn can_modify_items(&self) -> bool {
        matches!(self, OrderStatus::Created)
    }

    /// Returns true if the order can be confirmed in this status.
    pub fn can_confirm(&self) -> bool {
        matches!(self, OrderStatus::Created)
    }

    /// Returns true if the order can be processed in this status.
    pub fn can_process(&self) -> bool {
        matches!(self, OrderStatus::Confirmed)
    }

    /// Returns true if the order can be shipped in this status.
    pub fn can_ship(&self) -> bool {
        matches!(self, OrderStatus::Processed)
    }

    /// Returns true if the order can be cancelled in this status.
    ///
    /// Cancel is allowed from any non-terminal status; Shipped blocks it
    /// as well since the goods have already left.
    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            OrderStatus::Created | OrderStatus::Confirmed | OrderStatus::Processed
        )
    }

    /// Returns true if the shipping address can still change.
    pub fn can_update_shipping_address(&self) -> bool {
        !matches!(self, OrderStatus::Shipped | OrderStatus::Cancelled)
    }

    /// Returns true if this is a terminal status (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Returns the persisted/queryable string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Processed => "PROCESSED",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = UnknownStatus;

    /// Parses the exact uppercase string form (case-sensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(OrderStatus::Created),
            "CONFIRMED" => Ok(OrderStatus::Confirmed),
            "PROCESSED" => Ok(OrderStatus::Processed),
            "SHIPPED" => Ok(OrderStatus::Shipped),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// Error returned when parsing an unrecognized status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl std::fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unknown order status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}
