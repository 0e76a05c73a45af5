//! Order, line item and payment persistence.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use rand::distributions::Alphanumeric;
use rand::Rng;
use shared::*;
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

use crate::models::*;
use crate::schema::*;

/// One line item joined with the bits of its spare part the workflow needs.
#[derive(Debug, Clone)]
pub struct LineItem {
    pub detail: OrderDetail,
    pub spare_part_name: String,
    pub business_id: Uuid,
}

/// An order with its line items and payment, as read in one go.
#[derive(Debug, Clone)]
pub struct OrderAggregate {
    pub order: Order,
    pub lines: Vec<LineItem>,
    pub payment: Payment,
}

impl OrderAggregate {
    pub fn business_ids(&self) -> BTreeSet<Uuid> {
        shared::access::owning_businesses(self.lines.iter().map(|line| line.business_id))
    }
}

/// `ORD-YYYYMMDD-XXXXXXXX`
pub fn generate_order_number<R: Rng>(now: DateTime<Utc>, rng: &mut R) -> String {
    let suffix: String = rng
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|c| char::from(c).to_ascii_uppercase())
        .collect();
    format!("ORD-{}-{}", now.format("%Y%m%d"), suffix)
}

pub async fn insert_order(
    conn: &mut AsyncPgConnection,
    order: &NewOrder,
    details: &[NewOrderDetail],
    payment: &NewPayment,
) -> Result<(), OrderError> {
    diesel::insert_into(orders::table)
        .values(order)
        .execute(conn)
        .await?;

    diesel::insert_into(order_details::table)
        .values(details)
        .execute(conn)
        .await?;

    diesel::insert_into(payments::table)
        .values(payment)
        .execute(conn)
        .await?;

    Ok(())
}

pub async fn find_order(conn: &mut AsyncPgConnection, id: Uuid) -> Result<Order, OrderError> {
    orders::table
        .filter(orders::id.eq(id))
        .first::<Order>(conn)
        .await
        .optional()?
        .ok_or_else(|| OrderError::not_found("Order"))
}

/// Row-locks the order until the surrounding transaction ends, so
/// conflicting transitions on the same order run one after the other.
pub async fn lock_order(conn: &mut AsyncPgConnection, id: Uuid) -> Result<Order, OrderError> {
    orders::table
        .filter(orders::id.eq(id))
        .for_update()
        .first::<Order>(conn)
        .await
        .optional()?
        .ok_or_else(|| OrderError::not_found("Order"))
}

pub async fn load_lines(conn: &mut AsyncPgConnection, order_ids: &[Uuid]) -> Result<Vec<LineItem>, OrderError> {
    let rows = order_details::table
        .inner_join(spare_parts::table)
        .filter(order_details::order_id.eq_any(order_ids))
        .order((order_details::order_id, order_details::line_number))
        .select((
            order_details::all_columns,
            spare_parts::name,
            spare_parts::business_id,
        ))
        .load::<(OrderDetail, String, Uuid)>(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(detail, spare_part_name, business_id)| LineItem {
            detail,
            spare_part_name,
            business_id,
        })
        .collect())
}

pub async fn load_payments(conn: &mut AsyncPgConnection, order_ids: &[Uuid]) -> Result<Vec<Payment>, OrderError> {
    let rows = payments::table
        .filter(payments::order_id.eq_any(order_ids))
        .load::<Payment>(conn)
        .await?;
    Ok(rows)
}

/// Attaches line items and payments to already-loaded orders, keeping
/// the order of `orders`.
pub async fn assemble(conn: &mut AsyncPgConnection, orders: Vec<Order>) -> Result<Vec<OrderAggregate>, OrderError> {
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();

    let mut lines_by_order: HashMap<Uuid, Vec<LineItem>> = HashMap::new();
    for line in load_lines(conn, &ids).await? {
        lines_by_order.entry(line.detail.order_id).or_default().push(line);
    }

    let mut payment_by_order: HashMap<Uuid, Payment> = load_payments(conn, &ids)
        .await?
        .into_iter()
        .map(|p| (p.order_id, p))
        .collect();

    orders
        .into_iter()
        .map(|order| {
            let payment = payment_by_order.remove(&order.id).ok_or_else(|| {
                OrderError::Persistence(format!("Order {} has no payment record", order.id))
            })?;
            let lines = lines_by_order.remove(&order.id).unwrap_or_default();
            Ok(OrderAggregate { order, lines, payment })
        })
        .collect()
}

pub async fn load_aggregate(conn: &mut AsyncPgConnection, order: Order) -> Result<OrderAggregate, OrderError> {
    assemble(conn, vec![order])
        .await?
        .pop()
        .ok_or_else(|| OrderError::not_found("Order"))
}

pub async fn all_orders(conn: &mut AsyncPgConnection) -> Result<Vec<Order>, OrderError> {
    let rows = orders::table
        .order(orders::created_at.desc())
        .load::<Order>(conn)
        .await?;
    Ok(rows)
}

pub async fn orders_for_user(conn: &mut AsyncPgConnection, user_id: Uuid) -> Result<Vec<Order>, OrderError> {
    let rows = orders::table
        .filter(orders::user_id.eq(user_id))
        .order(orders::created_at.desc())
        .load::<Order>(conn)
        .await?;
    Ok(rows)
}

/// Orders with at least one line item sold by `business_id`.
pub async fn orders_for_business(conn: &mut AsyncPgConnection, business_id: Uuid) -> Result<Vec<Order>, OrderError> {
    let order_ids = order_details::table
        .inner_join(spare_parts::table)
        .filter(spare_parts::business_id.eq(business_id))
        .select(order_details::order_id)
        .distinct()
        .load::<Uuid>(conn)
        .await?;

    let rows = orders::table
        .filter(orders::id.eq_any(&order_ids))
        .order(orders::created_at.desc())
        .load::<Order>(conn)
        .await?;
    Ok(rows)
}

pub async fn set_order_status(conn: &mut AsyncPgConnection, id: Uuid, status: OrderStatus) -> Result<(), OrderError> {
    diesel::update(orders::table.filter(orders::id.eq(id)))
        .set((
            orders::status.eq(status.as_str()),
            orders::updated_at.eq(Some(Utc::now())),
        ))
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn set_payment_status(
    conn: &mut AsyncPgConnection,
    payment_id: Uuid,
    status: PaymentStatus,
) -> Result<(), OrderError> {
    diesel::update(payments::table.filter(payments::id.eq(payment_id)))
        .set((
            payments::payment_status.eq(status.as_str()),
            payments::updated_at.eq(Some(Utc::now())),
        ))
        .execute(conn)
        .await?;
    Ok(())
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = crate::schema::payments)]
pub struct ProofChangeset {
    pub proof_image: Option<String>,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
}

/// `None` fields are left untouched.
pub async fn attach_proof(
    conn: &mut AsyncPgConnection,
    payment_id: Uuid,
    proof: &ProofChangeset,
) -> Result<(), OrderError> {
    diesel::update(payments::table.filter(payments::id.eq(payment_id)))
        .set(proof)
        .execute(conn)
        .await?;
    Ok(())
}
