//! Stock ledger.
//!
//! Stock only moves through a single conditional `UPDATE ... RETURNING`
//! per call, so concurrent reservations for the same part serialize on the
//! row lock and can never push stock below zero. Callers run these inside
//! the surrounding order transaction.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use shared::*;
use tracing::debug;
use uuid::Uuid;

use crate::catalog;
use crate::schema::*;

/// Takes `quantity` units of a part and returns the stock left.
pub async fn reserve(conn: &mut AsyncPgConnection, spare_part_id: Uuid, quantity: i32) -> Result<i32, OrderError> {
    if quantity <= 0 {
        return Err(OrderError::validation(format!("Invalid reservation quantity: {}", quantity)));
    }

    let remaining = diesel::update(
        spare_parts::table
            .filter(spare_parts::id.eq(spare_part_id))
            .filter(spare_parts::stock.ge(quantity)),
    )
    .set((
        spare_parts::stock.eq(spare_parts::stock - quantity),
        spare_parts::sales_count.eq(spare_parts::sales_count + quantity),
        spare_parts::updated_at.eq(Some(Utc::now())),
    ))
    .returning(spare_parts::stock)
    .get_result::<i32>(conn)
    .await
    .optional()?;

    let Some(remaining) = remaining else {
        // Nothing matched: either the part is gone or the stock is short.
        let available = catalog::get_spare_part(conn, spare_part_id)
            .await?
            .ok_or_else(|| OrderError::not_found(format!("Spare part {}", spare_part_id)))?
            .stock;

        return Err(OrderError::InsufficientStock {
            spare_part_id,
            requested: quantity,
            available,
        });
    };

    if remaining == 0 {
        diesel::update(
            spare_parts::table
                .filter(spare_parts::id.eq(spare_part_id))
                .filter(spare_parts::status.eq(PartStatus::Active.as_str())),
        )
        .set(spare_parts::status.eq(PartStatus::OutOfStock.as_str()))
        .execute(conn)
        .await?;
    }

    debug!("Reserved {} of spare part {}, {} left", quantity, spare_part_id, remaining);
    Ok(remaining)
}

/// Gives `quantity` units back and returns the new stock.
pub async fn release(conn: &mut AsyncPgConnection, spare_part_id: Uuid, quantity: i32) -> Result<i32, OrderError> {
    if quantity <= 0 {
        return Err(OrderError::validation(format!("Invalid release quantity: {}", quantity)));
    }

    let stock = diesel::update(spare_parts::table.filter(spare_parts::id.eq(spare_part_id)))
        .set((
            spare_parts::stock.eq(spare_parts::stock + quantity),
            spare_parts::sales_count.eq(spare_parts::sales_count - quantity),
            spare_parts::updated_at.eq(Some(Utc::now())),
        ))
        .returning(spare_parts::stock)
        .get_result::<i32>(conn)
        .await
        .optional()?
        .ok_or_else(|| OrderError::not_found(format!("Spare part {}", spare_part_id)))?;

    diesel::update(
        spare_parts::table
            .filter(spare_parts::id.eq(spare_part_id))
            .filter(spare_parts::status.eq(PartStatus::OutOfStock.as_str())),
    )
    .set(spare_parts::status.eq(PartStatus::Active.as_str()))
    .execute(conn)
    .await?;

    debug!("Released {} of spare part {}, stock now {}", quantity, spare_part_id, stock);
    Ok(stock)
}
