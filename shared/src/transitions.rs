use serde::{Deserialize, Serialize};

use crate::error::OrderError;
use crate::status::{OrderStatus, PaymentStatus};

/// Effects of one accepted transition, applied together in a single
/// datastore transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub payment: Option<PaymentStatus>,
    pub order: Option<OrderStatus>,
    /// Give every line item's quantity back to the stock ledger.
    pub release_stock: bool,
}

/// Buyer uploads payment proof.
pub fn submit_proof(order: OrderStatus, payment: PaymentStatus) -> Result<Transition, OrderError> {
    let order_ok = matches!(order, OrderStatus::Pending | OrderStatus::PaymentReview);
    let payment_ok = matches!(payment, PaymentStatus::Pending | PaymentStatus::InReview);
    if !order_ok || !payment_ok {
        return Err(OrderError::invalid_state(format!(
            "Payment proof cannot be submitted for an order in status {} with payment {}",
            order, payment
        )));
    }

    Ok(Transition {
        payment: Some(PaymentStatus::InReview),
        order: Some(OrderStatus::PaymentReview),
        release_stock: false,
    })
}

/// Seller or admin decides on a payment.
pub fn set_payment_status(
    order: OrderStatus,
    payment: PaymentStatus,
    target: PaymentStatus,
) -> Result<Transition, OrderError> {
    let awaiting_decision = matches!(payment, PaymentStatus::Pending | PaymentStatus::InReview)
        && order != OrderStatus::Cancelled;

    match target {
        PaymentStatus::Completed if awaiting_decision => Ok(Transition {
            payment: Some(PaymentStatus::Completed),
            order: Some(OrderStatus::Processing),
            release_stock: false,
        }),
        PaymentStatus::Rejected if awaiting_decision => Ok(Transition {
            payment: Some(PaymentStatus::Rejected),
            order: Some(OrderStatus::Cancelled),
            release_stock: true,
        }),
        PaymentStatus::Refunded if payment == PaymentStatus::Completed => Ok(Transition {
            payment: Some(PaymentStatus::Refunded),
            order: None,
            release_stock: false,
        }),
        PaymentStatus::Completed | PaymentStatus::Rejected | PaymentStatus::Refunded => {
            Err(OrderError::invalid_state(format!(
                "Payment in status {} cannot become {}",
                payment, target
            )))
        }
        PaymentStatus::Pending | PaymentStatus::InReview | PaymentStatus::Cancelled => Err(
            OrderError::validation("Payment status must be one of: completed, rejected, refunded"),
        ),
    }
}

/// Buyer or admin withdraws an order that nobody has acted on yet.
pub fn cancel(order: OrderStatus) -> Result<Transition, OrderError> {
    if order != OrderStatus::Pending {
        return Err(OrderError::invalid_state("Only pending orders can be cancelled"));
    }

    Ok(Transition {
        payment: Some(PaymentStatus::Cancelled),
        order: Some(OrderStatus::Cancelled),
        release_stock: true,
    })
}

/// Seller or admin moves fulfilment along. Cancellation goes through
/// [`cancel`] or a payment rejection so that stock is given back.
pub fn set_order_status(current: OrderStatus, target: OrderStatus) -> Result<Transition, OrderError> {
    if current == OrderStatus::Cancelled {
        return Err(OrderError::invalid_state("Cancelled orders cannot change status"));
    }
    if target == OrderStatus::Cancelled {
        return Err(OrderError::validation(
            "Use order cancellation or payment rejection to cancel an order",
        ));
    }

    Ok(Transition {
        payment: None,
        order: Some(target),
        release_stock: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ORDER: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::PaymentReview,
        OrderStatus::Paid,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    const ALL_PAYMENT: [PaymentStatus; 6] = [
        PaymentStatus::Pending,
        PaymentStatus::InReview,
        PaymentStatus::Completed,
        PaymentStatus::Rejected,
        PaymentStatus::Refunded,
        PaymentStatus::Cancelled,
    ];

    #[test]
    fn test_cancel_only_from_pending() {
        for status in ALL_ORDER {
            let result = cancel(status);
            if status == OrderStatus::Pending {
                let t = result.unwrap();
                assert_eq!(t.order, Some(OrderStatus::Cancelled));
                assert_eq!(t.payment, Some(PaymentStatus::Cancelled));
                assert!(t.release_stock);
            } else {
                assert!(matches!(result.unwrap_err(), OrderError::InvalidState(_)));
            }
        }
    }

    #[test]
    fn test_rejection_cancels_and_releases() {
        let t = set_payment_status(OrderStatus::PaymentReview, PaymentStatus::InReview, PaymentStatus::Rejected)
            .unwrap();
        assert_eq!(t.order, Some(OrderStatus::Cancelled));
        assert_eq!(t.payment, Some(PaymentStatus::Rejected));
        assert!(t.release_stock);
    }

    #[test]
    fn test_rejection_releases_at_most_once() {
        // Whatever state the first release left behind, a second rejection is refused.
        let after_reject = PaymentStatus::Rejected;
        assert!(set_payment_status(OrderStatus::Cancelled, after_reject, PaymentStatus::Rejected).is_err());

        let after_cancel = PaymentStatus::Cancelled;
        assert!(set_payment_status(OrderStatus::Cancelled, after_cancel, PaymentStatus::Rejected).is_err());
    }

    #[test]
    fn test_only_rejection_releases_stock() {
        for order in ALL_ORDER {
            for payment in ALL_PAYMENT {
                for target in ALL_PAYMENT {
                    if let Ok(t) = set_payment_status(order, payment, target) {
                        assert_eq!(t.release_stock, target == PaymentStatus::Rejected);
                        if t.release_stock {
                            assert_ne!(order, OrderStatus::Cancelled);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_completion_moves_order_to_processing() {
        let t = set_payment_status(OrderStatus::Pending, PaymentStatus::Pending, PaymentStatus::Completed).unwrap();
        assert_eq!(t.order, Some(OrderStatus::Processing));
        assert!(!t.release_stock);
    }

    #[test]
    fn test_completion_after_cancel_refused() {
        let err = set_payment_status(OrderStatus::Cancelled, PaymentStatus::Cancelled, PaymentStatus::Completed)
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidState(_)));
    }

    #[test]
    fn test_refund_only_after_completion() {
        let t = set_payment_status(OrderStatus::Shipped, PaymentStatus::Completed, PaymentStatus::Refunded).unwrap();
        assert_eq!(t.payment, Some(PaymentStatus::Refunded));
        assert_eq!(t.order, None);

        assert!(set_payment_status(OrderStatus::Pending, PaymentStatus::Pending, PaymentStatus::Refunded).is_err());
    }

    #[test]
    fn test_non_decision_targets_are_validation_errors() {
        for target in [PaymentStatus::Pending, PaymentStatus::InReview, PaymentStatus::Cancelled] {
            let err = set_payment_status(OrderStatus::Pending, PaymentStatus::Pending, target).unwrap_err();
            assert!(matches!(err, OrderError::Validation(_)));
        }
    }

    #[test]
    fn test_proof_moves_to_review() {
        let t = submit_proof(OrderStatus::Pending, PaymentStatus::Pending).unwrap();
        assert_eq!(t.order, Some(OrderStatus::PaymentReview));
        assert_eq!(t.payment, Some(PaymentStatus::InReview));

        // re-upload while still under review
        assert!(submit_proof(OrderStatus::PaymentReview, PaymentStatus::InReview).is_ok());
    }

    #[test]
    fn test_proof_refused_after_decision() {
        assert!(submit_proof(OrderStatus::Processing, PaymentStatus::Completed).is_err());
        assert!(submit_proof(OrderStatus::Cancelled, PaymentStatus::Rejected).is_err());
    }

    #[test]
    fn test_cancel_refused_once_proof_submitted() {
        let t = submit_proof(OrderStatus::Pending, PaymentStatus::Pending).unwrap();
        assert!(cancel(t.order.unwrap()).is_err());
    }

    #[test]
    fn test_direct_update() {
        let t = set_order_status(OrderStatus::Processing, OrderStatus::Shipped).unwrap();
        assert_eq!(t.order, Some(OrderStatus::Shipped));
        assert!(!t.release_stock);

        assert!(matches!(
            set_order_status(OrderStatus::Pending, OrderStatus::Cancelled).unwrap_err(),
            OrderError::Validation(_)
        ));
        assert!(matches!(
            set_order_status(OrderStatus::Cancelled, OrderStatus::Pending).unwrap_err(),
            OrderError::InvalidState(_)
        ));
    }
}
