use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use shared::*;
use uuid::Uuid;

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::businesses)]
pub struct NewBusiness {
    pub id: Uuid,
    pub user_id: Uuid,
    pub business_name: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::business_payment_methods)]
pub struct BusinessPaymentMethod {
    pub id: Uuid,
    pub business_id: Uuid,
    pub payment_type: String,
    pub account_details: serde_json::Value,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::business_payment_methods)]
pub struct NewBusinessPaymentMethod {
    pub id: Uuid,
    pub business_id: Uuid,
    pub payment_type: String,
    pub account_details: serde_json::Value,
    pub is_active: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::spare_parts)]
pub struct SparePart {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub discount_percentage: BigDecimal,
    pub stock: i32,
    pub sales_count: i32,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::spare_parts)]
pub struct NewSparePart {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub discount_percentage: BigDecimal,
    pub stock: i32,
    pub status: String,
}

impl SparePart {
    pub fn snapshot(&self) -> Result<PartSnapshot, OrderError> {
        Ok(PartSnapshot {
            id: self.id,
            business_id: self.business_id,
            name: self.name.clone(),
            price: self.price.clone(),
            discount_percentage: self.discount_percentage.clone(),
            stock: self.stock,
            status: stored_status(&self.status)?,
        })
    }
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::orders)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_number: String,
    pub status: String,
    pub shipping_address: String,
    pub shipping_phone: Option<String>,
    pub shipping_notes: Option<String>,
    pub payment_id: Option<Uuid>,
    pub subtotal: BigDecimal,
    pub shipping_cost: BigDecimal,
    pub discount: BigDecimal,
    pub total: BigDecimal,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::orders)]
pub struct NewOrder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_number: String,
    pub status: String,
    pub shipping_address: String,
    pub shipping_phone: Option<String>,
    pub shipping_notes: Option<String>,
    pub payment_id: Option<Uuid>,
    pub subtotal: BigDecimal,
    pub shipping_cost: BigDecimal,
    pub discount: BigDecimal,
    pub total: BigDecimal,
}

impl Order {
    pub fn order_status(&self) -> Result<OrderStatus, OrderError> {
        stored_status(&self.status)
    }
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::order_details)]
pub struct OrderDetail {
    pub id: Uuid,
    pub order_id: Uuid,
    pub spare_part_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub discount: BigDecimal,
    pub total: BigDecimal,
    /// 1-based position of the line in the cart it came from.
    pub line_number: i32,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::order_details)]
pub struct NewOrderDetail {
    pub id: Uuid,
    pub order_id: Uuid,
    pub spare_part_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub discount: BigDecimal,
    pub total: BigDecimal,
    pub line_number: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::payments)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub business_id: Uuid,
    pub payment_method_id: Uuid,
    pub amount: BigDecimal,
    pub reference_number: Option<String>,
    pub payment_status: String,
    pub payment_date: Option<DateTime<Utc>>,
    pub proof_image: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::payments)]
pub struct NewPayment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub business_id: Uuid,
    pub payment_method_id: Uuid,
    pub amount: BigDecimal,
    pub payment_status: String,
}

impl Payment {
    pub fn status(&self) -> Result<PaymentStatus, OrderError> {
        stored_status(&self.payment_status)
    }
}

/// Status columns are CHECK-constrained, so an unknown value means the row
/// was written by something else.
fn stored_status<T>(raw: &str) -> Result<T, OrderError>
where
    T: std::str::FromStr<Err = OrderError>,
{
    raw.parse()
        .map_err(|_| OrderError::Persistence(format!("Unexpected status value in database: {}", raw)))
}
