use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::OrderError;

/// Lifecycle of an order.
///
/// `PaymentReview` is the window between the buyer submitting payment proof
/// and a seller or admin deciding on it. It is distinct from `Processing`,
/// which means the payment was accepted and fulfilment has started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    PaymentReview,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    InReview,
    Completed,
    Rejected,
    Refunded,
    Cancelled,
}

/// Catalog lifecycle of a spare part listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartStatus {
    Active,
    Inactive,
    OutOfStock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Zelle,
    Pagomovil,
    Transferencia,
    Efectivo,
    Otro,
}

macro_rules! string_enum {
    ($ty:ident, $what:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = OrderError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($ty::$variant),)+
                    other => Err(OrderError::Validation(format!("Unknown {}: {}", $what, other))),
                }
            }
        }
    };
}

string_enum!(OrderStatus, "order status", {
    Pending => "pending",
    PaymentReview => "payment_review",
    Paid => "paid",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

string_enum!(PaymentStatus, "payment status", {
    Pending => "pending",
    InReview => "in_review",
    Completed => "completed",
    Rejected => "rejected",
    Refunded => "refunded",
    Cancelled => "cancelled",
});

string_enum!(PartStatus, "spare part status", {
    Active => "active",
    Inactive => "inactive",
    OutOfStock => "out_of_stock",
});

string_enum!(PaymentType, "payment type", {
    Zelle => "zelle",
    Pagomovil => "pagomovil",
    Transferencia => "transferencia",
    Efectivo => "efectivo",
    Otro => "otro",
});
