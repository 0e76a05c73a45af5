//! Read side of the catalog the order workflow depends on: spare parts,
//! the business behind a user, and business payment methods.

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use shared::*;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::*;
use crate::schema::*;

pub async fn get_spare_part(conn: &mut AsyncPgConnection, id: Uuid) -> Result<Option<SparePart>, OrderError> {
    let part = spare_parts::table
        .filter(spare_parts::id.eq(id))
        .first::<SparePart>(conn)
        .await
        .optional()?;
    Ok(part)
}

/// Snapshots for every id that exists; missing ids are simply absent.
pub async fn get_spare_parts(
    conn: &mut AsyncPgConnection,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, PartSnapshot>, OrderError> {
    let parts = spare_parts::table
        .filter(spare_parts::id.eq_any(ids))
        .load::<SparePart>(conn)
        .await?;

    parts
        .iter()
        .map(|part| part.snapshot().map(|snapshot| (part.id, snapshot)))
        .collect()
}

pub async fn business_for_user(conn: &mut AsyncPgConnection, user_id: Uuid) -> Result<Option<Uuid>, OrderError> {
    let business_id = businesses::table
        .filter(businesses::user_id.eq(user_id))
        .select(businesses::id)
        .first::<Uuid>(conn)
        .await
        .optional()?;
    Ok(business_id)
}

/// Business registered to the caller, looked up only for business callers.
pub async fn caller_business(conn: &mut AsyncPgConnection, caller: &Caller) -> Result<Option<Uuid>, OrderError> {
    match caller.role {
        Role::Business => business_for_user(conn, caller.id).await,
        Role::Admin | Role::Customer => Ok(None),
    }
}

pub async fn get_payment_method(
    conn: &mut AsyncPgConnection,
    id: Uuid,
) -> Result<Option<BusinessPaymentMethod>, OrderError> {
    let method = business_payment_methods::table
        .filter(business_payment_methods::id.eq(id))
        .first::<BusinessPaymentMethod>(conn)
        .await
        .optional()?;
    Ok(method)
}
