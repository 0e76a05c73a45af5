use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::OrderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Business,
    Customer,
}

impl FromStr for Role {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "business" => Ok(Role::Business),
            "customer" => Ok(Role::Customer),
            other => Err(OrderError::unauthorized(format!("Unknown role: {}", other))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Admin => "admin",
            Role::Business => "business",
            Role::Customer => "customer",
        })
    }
}

/// An already-authenticated caller, as handed over by the auth gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub id: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fails unless the caller holds one of `roles`.
    pub fn require_role(&self, roles: &[Role]) -> Result<(), OrderError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(OrderError::Forbidden(format!(
                "Role {} is not allowed to access this route",
                self.role
            )))
        }
    }
}

/// Businesses owning an order, computed from its line items on every read.
pub fn owning_businesses<I>(line_business_ids: I) -> BTreeSet<Uuid>
where
    I: IntoIterator<Item = Uuid>,
{
    line_business_ids.into_iter().collect()
}

/// Admin, or a business selling at least one line item of the order.
///
/// `caller_business` is the business registered to the caller, if any.
pub fn authorize_seller(
    caller: &Caller,
    caller_business: Option<Uuid>,
    owners: &BTreeSet<Uuid>,
) -> Result<(), OrderError> {
    match caller.role {
        Role::Admin => Ok(()),
        Role::Business => {
            let business_id = caller_business
                .ok_or_else(|| OrderError::not_found("Business for this user"))?;
            if owners.contains(&business_id) {
                Ok(())
            } else {
                Err(OrderError::unauthorized("Not authorized to update this order"))
            }
        }
        Role::Customer => Err(OrderError::Forbidden(
            "Role customer is not allowed to access this route".to_string(),
        )),
    }
}

/// Read access: admin, the buyer, or a business selling in the order.
pub fn authorize_view(
    caller: &Caller,
    caller_business: Option<Uuid>,
    order_user_id: Uuid,
    owners: &BTreeSet<Uuid>,
) -> Result<(), OrderError> {
    match caller.role {
        Role::Admin => Ok(()),
        Role::Business => {
            let business_id = caller_business
                .ok_or_else(|| OrderError::not_found("Business for this user"))?;
            if owners.contains(&business_id) || order_user_id == caller.id {
                Ok(())
            } else {
                Err(OrderError::unauthorized("Not authorized to view this order"))
            }
        }
        Role::Customer if order_user_id == caller.id => Ok(()),
        Role::Customer => Err(OrderError::unauthorized("Not authorized to view this order")),
    }
}

pub fn authorize_owner(caller: &Caller, order_user_id: Uuid) -> Result<(), OrderError> {
    if order_user_id == caller.id {
        Ok(())
    } else {
        Err(OrderError::unauthorized("Not authorized to update this order"))
    }
}

pub fn authorize_owner_or_admin(caller: &Caller, order_user_id: Uuid) -> Result<(), OrderError> {
    if caller.is_admin() || order_user_id == caller.id {
        Ok(())
    } else {
        Err(OrderError::unauthorized("Not authorized to cancel this order"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(role: Role) -> Caller {
        Caller { id: Uuid::new_v4(), role }
    }

    #[test]
    fn test_owning_businesses_deduplicates() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let owners = owning_businesses(vec![a, b, a, a]);
        assert_eq!(owners.len(), 2);
        assert!(owners.contains(&a) && owners.contains(&b));
    }

    #[test]
    fn test_each_business_of_a_split_order_may_act() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let owners = owning_businesses(vec![a, b]);
        let seller = caller(Role::Business);

        assert!(authorize_seller(&seller, Some(a), &owners).is_ok());
        assert!(authorize_seller(&seller, Some(b), &owners).is_ok());
    }

    #[test]
    fn test_business_without_line_items_unauthorized() {
        let owners = owning_businesses(vec![Uuid::new_v4()]);
        let err = authorize_seller(&caller(Role::Business), Some(Uuid::new_v4()), &owners).unwrap_err();
        assert!(matches!(err, OrderError::Unauthorized(_)));
    }

    #[test]
    fn test_business_user_without_business_not_found() {
        let owners = owning_businesses(vec![Uuid::new_v4()]);
        let err = authorize_seller(&caller(Role::Business), None, &owners).unwrap_err();
        assert!(matches!(err, OrderError::NotFound(_)));
    }

    #[test]
    fn test_admin_always_authorized() {
        let owners = BTreeSet::new();
        assert!(authorize_seller(&caller(Role::Admin), None, &owners).is_ok());
        assert!(authorize_view(&caller(Role::Admin), None, Uuid::new_v4(), &owners).is_ok());
    }

    #[test]
    fn test_customer_cannot_act_as_seller() {
        let err = authorize_seller(&caller(Role::Customer), None, &BTreeSet::new()).unwrap_err();
        assert!(matches!(err, OrderError::Forbidden(_)));
    }

    #[test]
    fn test_customer_views_only_own_orders() {
        let buyer = caller(Role::Customer);
        assert!(authorize_view(&buyer, None, buyer.id, &BTreeSet::new()).is_ok());

        let err = authorize_view(&buyer, None, Uuid::new_v4(), &BTreeSet::new()).unwrap_err();
        assert!(matches!(err, OrderError::Unauthorized(_)));
    }

    #[test]
    fn test_cancel_requires_owner_or_admin() {
        let owner = caller(Role::Customer);
        assert!(authorize_owner_or_admin(&owner, owner.id).is_ok());
        assert!(authorize_owner_or_admin(&caller(Role::Admin), owner.id).is_ok());
        assert!(authorize_owner_or_admin(&caller(Role::Business), owner.id).is_err());
    }

    #[test]
    fn test_require_role() {
        let admin = caller(Role::Admin);
        assert!(admin.require_role(&[Role::Admin]).is_ok());
        assert!(caller(Role::Customer).require_role(&[Role::Admin, Role::Business]).is_err());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("business".parse::<Role>().unwrap(), Role::Business);
        assert!("root".parse::<Role>().is_err());
    }
}
