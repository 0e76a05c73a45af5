use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel_async::pooled_connection::bb8::Pool;
use diesel_async::pooled_connection::PoolError;
use diesel_async::{AsyncConnection, AsyncPgConnection};
use shared::*;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog;
use crate::ledger;
use crate::models::*;
use crate::orders::{self, LineItem, OrderAggregate, ProofChangeset};

pub type DbPool = Pool<AsyncPgConnection>;

#[derive(Debug, Clone)]
pub struct NewOrderRequest {
    pub items: Vec<CartItem>,
    pub shipping_address: String,
    pub shipping_phone: Option<String>,
    pub shipping_notes: Option<String>,
    pub payment_method_id: Uuid,
}

/// Reference to an uploaded proof plus the optional text sent with it.
#[derive(Debug, Clone)]
pub struct ProofSubmission {
    pub proof_image: String,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
}

pub(crate) fn pool_error(e: bb8::RunError<PoolError>) -> OrderError {
    OrderError::Persistence(format!("Connection pool error: {}", e))
}

/// Drives orders through creation, payment review, fulfilment and
/// cancellation. Every operation is one local transaction.
#[derive(Clone)]
pub struct OrderWorkflow {
    pool: DbPool,
    shipping_cost: BigDecimal,
}

impl OrderWorkflow {
    pub fn new(pool: DbPool, shipping_cost: BigDecimal) -> Self {
        Self { pool, shipping_cost }
    }

    pub async fn create_order(&self, caller: Caller, request: NewOrderRequest) -> Result<OrderAggregate, OrderError> {
        let items = shared::cart::normalize_cart(&request.items)?;
        if request.shipping_address.trim().is_empty() {
            return Err(OrderError::validation("Shipping address is required"));
        }

        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let shipping_cost = self.shipping_cost.clone();

        let aggregate = conn
            .transaction::<_, OrderError, _>(|conn| {
                Box::pin(async move {
                    let ids: Vec<Uuid> = items.iter().map(|i| i.spare_part_id).collect();
                    let parts = catalog::get_spare_parts(conn, &ids).await?;
                    let priced = shared::cart::price_cart(&items, &parts, &shipping_cost)?;

                    let method = catalog::get_payment_method(conn, request.payment_method_id)
                        .await?
                        .ok_or_else(|| OrderError::not_found("Payment method"))?;
                    if !method.is_active {
                        return Err(OrderError::validation("Payment method is not active"));
                    }
                    if !priced.business_ids().contains(&method.business_id) {
                        return Err(OrderError::validation(
                            "Payment method does not belong to a seller in this order",
                        ));
                    }

                    // Any failure from here on rolls back the reservations made so far.
                    let moves = lock_order_of(priced.lines.iter().map(|l| (l.spare_part_id, l.amounts.quantity)));
                    for (spare_part_id, quantity) in moves {
                        ledger::reserve(conn, spare_part_id, quantity).await?;
                    }

                    let order_id = Uuid::new_v4();
                    let payment_id = Uuid::new_v4();
                    let order_number = orders::generate_order_number(Utc::now(), &mut rand::thread_rng());

                    let new_order = NewOrder {
                        id: order_id,
                        user_id: caller.id,
                        order_number,
                        status: OrderStatus::Pending.as_str().to_string(),
                        shipping_address: request.shipping_address.trim().to_string(),
                        shipping_phone: request.shipping_phone,
                        shipping_notes: request.shipping_notes,
                        payment_id: Some(payment_id),
                        subtotal: priced.totals.subtotal.clone(),
                        shipping_cost: priced.totals.shipping_cost.clone(),
                        discount: priced.totals.discount.clone(),
                        total: priced.totals.total.clone(),
                    };

                    let details: Vec<NewOrderDetail> = priced
                        .lines
                        .iter()
                        .zip(1..)
                        .map(|(line, line_number)| NewOrderDetail {
                            id: Uuid::new_v4(),
                            order_id,
                            spare_part_id: line.spare_part_id,
                            quantity: line.amounts.quantity,
                            unit_price: line.amounts.unit_price.clone(),
                            discount: line.amounts.discount.clone(),
                            total: line.amounts.total.clone(),
                            line_number,
                        })
                        .collect();

                    let payment = NewPayment {
                        id: payment_id,
                        order_id,
                        user_id: caller.id,
                        business_id: method.business_id,
                        payment_method_id: method.id,
                        amount: priced.totals.total.clone(),
                        payment_status: PaymentStatus::Pending.as_str().to_string(),
                    };

                    orders::insert_order(conn, &new_order, &details, &payment).await?;

                    let order = orders::find_order(conn, order_id).await?;
                    orders::load_aggregate(conn, order).await
                })
            })
            .await
            .map_err(|e| log_rejection("create order", e))?;

        info!(
            "Order {} ({}) created by user {} with {} line items, total {}",
            aggregate.order.order_number,
            aggregate.order.id,
            caller.id,
            aggregate.lines.len(),
            aggregate.order.total
        );
        Ok(aggregate)
    }

    pub async fn submit_payment_proof(
        &self,
        caller: Caller,
        order_id: Uuid,
        proof: ProofSubmission,
    ) -> Result<OrderAggregate, OrderError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let aggregate = conn
            .transaction::<_, OrderError, _>(|conn| {
                Box::pin(async move {
                    let order = orders::lock_order(conn, order_id).await?;
                    shared::access::authorize_owner(&caller, order.user_id)?;

                    let current = orders::load_aggregate(conn, order).await?;
                    let transition = shared::transitions::submit_proof(
                        current.order.order_status()?,
                        current.payment.status()?,
                    )?;

                    let changes = ProofChangeset {
                        proof_image: Some(proof.proof_image),
                        reference_number: proof.reference_number,
                        notes: proof.notes,
                        payment_date: Some(Utc::now()),
                    };
                    orders::attach_proof(conn, current.payment.id, &changes).await?;

                    apply_transition(conn, &current, &transition).await
                })
            })
            .await
            .map_err(|e| log_rejection("submit payment proof", e))?;

        info!("Payment proof submitted for order {}", aggregate.order.order_number);
        Ok(aggregate)
    }

    pub async fn set_payment_status(
        &self,
        caller: Caller,
        order_id: Uuid,
        target: PaymentStatus,
    ) -> Result<OrderAggregate, OrderError> {
        caller.require_role(&[Role::Admin, Role::Business])?;
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let aggregate = conn
            .transaction::<_, OrderError, _>(|conn| {
                Box::pin(async move {
                    let current = locked_for_seller(conn, &caller, order_id).await?;
                    let transition = shared::transitions::set_payment_status(
                        current.order.order_status()?,
                        current.payment.status()?,
                        target,
                    )?;
                    apply_transition(conn, &current, &transition).await
                })
            })
            .await
            .map_err(|e| log_rejection("set payment status", e))?;

        info!(
            "Payment for order {} set to {} by {} {}; order now {}",
            aggregate.order.order_number, target, caller.role, caller.id, aggregate.order.status
        );
        Ok(aggregate)
    }

    pub async fn update_order_status(
        &self,
        caller: Caller,
        order_id: Uuid,
        target: OrderStatus,
    ) -> Result<OrderAggregate, OrderError> {
        caller.require_role(&[Role::Admin, Role::Business])?;
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let aggregate = conn
            .transaction::<_, OrderError, _>(|conn| {
                Box::pin(async move {
                    let current = locked_for_seller(conn, &caller, order_id).await?;
                    let transition =
                        shared::transitions::set_order_status(current.order.order_status()?, target)?;
                    apply_transition(conn, &current, &transition).await
                })
            })
            .await
            .map_err(|e| log_rejection("update order status", e))?;

        info!("Order {} moved to {} by {} {}", aggregate.order.order_number, target, caller.role, caller.id);
        Ok(aggregate)
    }

    pub async fn cancel_order(&self, caller: Caller, order_id: Uuid) -> Result<OrderAggregate, OrderError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let aggregate = conn
            .transaction::<_, OrderError, _>(|conn| {
                Box::pin(async move {
                    let order = orders::lock_order(conn, order_id).await?;
                    shared::access::authorize_owner_or_admin(&caller, order.user_id)?;

                    let current = orders::load_aggregate(conn, order).await?;
                    let transition = shared::transitions::cancel(current.order.order_status()?)?;
                    apply_transition(conn, &current, &transition).await
                })
            })
            .await
            .map_err(|e| log_rejection("cancel order", e))?;

        info!("Order {} cancelled by {} {}", aggregate.order.order_number, caller.role, caller.id);
        Ok(aggregate)
    }

    pub async fn get_order(&self, caller: Caller, order_id: Uuid) -> Result<OrderAggregate, OrderError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let order = orders::find_order(&mut conn, order_id).await?;
        let aggregate = orders::load_aggregate(&mut conn, order).await?;
        let caller_business = catalog::caller_business(&mut conn, &caller).await?;

        shared::access::authorize_view(&caller, caller_business, aggregate.order.user_id, &aggregate.business_ids())?;
        Ok(aggregate)
    }

    pub async fn my_orders(&self, caller: Caller) -> Result<Vec<OrderAggregate>, OrderError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let rows = orders::orders_for_user(&mut conn, caller.id).await?;
        orders::assemble(&mut conn, rows).await
    }

    pub async fn business_orders(&self, caller: Caller) -> Result<Vec<OrderAggregate>, OrderError> {
        caller.require_role(&[Role::Business])?;
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let business_id = catalog::business_for_user(&mut conn, caller.id)
            .await?
            .ok_or_else(|| OrderError::not_found("Business for this user"))?;
        let rows = orders::orders_for_business(&mut conn, business_id).await?;
        orders::assemble(&mut conn, rows).await
    }

    pub async fn all_orders(&self, caller: Caller) -> Result<Vec<OrderAggregate>, OrderError> {
        caller.require_role(&[Role::Admin])?;
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let rows = orders::all_orders(&mut conn).await?;
        orders::assemble(&mut conn, rows).await
    }
}

/// Locks the order and checks that the caller is admin or sells at least
/// one of its line items.
async fn locked_for_seller(
    conn: &mut AsyncPgConnection,
    caller: &Caller,
    order_id: Uuid,
) -> Result<OrderAggregate, OrderError> {
    let caller_business = catalog::caller_business(conn, caller).await?;
    let order = orders::lock_order(conn, order_id).await?;
    let current = orders::load_aggregate(conn, order).await?;

    shared::access::authorize_seller(caller, caller_business, &current.business_ids())?;
    Ok(current)
}

/// Writes the status changes of `transition` and, for compensating
/// transitions, hands every line item's quantity back to the ledger.
async fn apply_transition(
    conn: &mut AsyncPgConnection,
    current: &OrderAggregate,
    transition: &Transition,
) -> Result<OrderAggregate, OrderError> {
    if let Some(status) = transition.payment {
        orders::set_payment_status(conn, current.payment.id, status).await?;
    }
    if let Some(status) = transition.order {
        orders::set_order_status(conn, current.order.id, status).await?;
    }
    if transition.release_stock {
        release_lines(conn, &current.lines).await?;
    }

    let order = orders::find_order(conn, current.order.id).await?;
    orders::load_aggregate(conn, order).await
}

async fn release_lines(conn: &mut AsyncPgConnection, lines: &[LineItem]) -> Result<(), OrderError> {
    let moves = lock_order_of(lines.iter().map(|l| (l.detail.spare_part_id, l.detail.quantity)));
    for (spare_part_id, quantity) in moves {
        ledger::release(conn, spare_part_id, quantity).await?;
    }
    Ok(())
}

/// Stock rows are always locked in ascending spare part id, whatever the
/// cart order, so two transactions touching the same parts cannot deadlock.
fn lock_order_of<I>(moves: I) -> Vec<(Uuid, i32)>
where
    I: IntoIterator<Item = (Uuid, i32)>,
{
    let mut moves: Vec<(Uuid, i32)> = moves.into_iter().collect();
    moves.sort_by_key(|(spare_part_id, _)| *spare_part_id);
    moves
}

/// Persistence failures are logged where they are turned into a response.
fn log_rejection(operation: &str, e: OrderError) -> OrderError {
    if !matches!(e, OrderError::Persistence(_)) {
        warn!("Rejected {}: {}", operation, e);
    }
    e
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_moves_sorted_by_part_id() {
        let low = Uuid::from_u128(1);
        let mid = Uuid::from_u128(2);
        let high = Uuid::from_u128(3);

        let forward = lock_order_of([(low, 1), (high, 2), (mid, 3)]);
        let backward = lock_order_of([(mid, 3), (high, 2), (low, 1)]);

        assert_eq!(forward, vec![(low, 1), (mid, 3), (high, 2)]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_stock_moves_keep_quantities() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let moves = lock_order_of([(a, 4), (b, 7)]);

        assert_eq!(moves.len(), 2);
        assert!(moves.contains(&(a, 4)));
        assert!(moves.contains(&(b, 7)));
    }
}
