//! JSON shapes returned by the HTTP surface.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::orders::{LineItem, OrderAggregate};
use crate::models::Payment;

#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub status: String,
    pub shipping_address: String,
    pub shipping_phone: Option<String>,
    pub shipping_notes: Option<String>,
    pub subtotal: BigDecimal,
    pub shipping_cost: BigDecimal,
    pub discount: BigDecimal,
    pub total: BigDecimal,
    /// Businesses selling at least one line item, derived on read.
    pub business_ids: Vec<Uuid>,
    pub items: Vec<LineItemView>,
    pub payment: PaymentView,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineItemView {
    pub id: Uuid,
    pub line_number: i32,
    pub spare_part_id: Uuid,
    pub spare_part_name: String,
    pub business_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub discount: BigDecimal,
    pub total: BigDecimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentView {
    pub id: Uuid,
    pub amount: BigDecimal,
    pub payment_method_id: Uuid,
    pub business_id: Uuid,
    pub status: String,
    pub reference_number: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub proof_image: Option<String>,
    pub notes: Option<String>,
}

impl From<&LineItem> for LineItemView {
    fn from(line: &LineItem) -> Self {
        Self {
            id: line.detail.id,
            line_number: line.detail.line_number,
            spare_part_id: line.detail.spare_part_id,
            spare_part_name: line.spare_part_name.clone(),
            business_id: line.business_id,
            quantity: line.detail.quantity,
            unit_price: line.detail.unit_price.clone(),
            discount: line.detail.discount.clone(),
            total: line.detail.total.clone(),
        }
    }
}

impl From<&Payment> for PaymentView {
    fn from(payment: &Payment) -> Self {
        Self {
            id: payment.id,
            amount: payment.amount.clone(),
            payment_method_id: payment.payment_method_id,
            business_id: payment.business_id,
            status: payment.payment_status.clone(),
            reference_number: payment.reference_number.clone(),
            payment_date: payment.payment_date,
            proof_image: payment.proof_image.clone(),
            notes: payment.notes.clone(),
        }
    }
}

impl From<OrderAggregate> for OrderView {
    fn from(aggregate: OrderAggregate) -> Self {
        let business_ids = aggregate.business_ids().into_iter().collect();
        let items = aggregate.lines.iter().map(LineItemView::from).collect();
        let payment = PaymentView::from(&aggregate.payment);
        let order = aggregate.order;

        Self {
            id: order.id,
            order_number: order.order_number,
            user_id: order.user_id,
            status: order.status,
            shipping_address: order.shipping_address,
            shipping_phone: order.shipping_phone,
            shipping_notes: order.shipping_notes,
            subtotal: order.subtotal,
            shipping_cost: order.shipping_cost,
            discount: order.discount,
            total: order.total,
            business_ids,
            items,
            payment,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}
