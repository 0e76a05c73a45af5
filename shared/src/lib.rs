//! Domain core of the spare-part marketplace order workflow: statuses,
//! cart pricing, the transition table and order-scoped authorization.
//! Nothing in here touches the database.

pub mod access;
pub mod cart;
pub mod error;
pub mod money;
pub mod status;
pub mod transitions;

pub use access::{Caller, Role};
pub use cart::{CartItem, PartSnapshot, PricedCart, PricedLine};
pub use error::OrderError;
pub use money::{LineAmounts, OrderTotals};
pub use status::{OrderStatus, PartStatus, PaymentStatus, PaymentType};
pub use transitions::Transition;
