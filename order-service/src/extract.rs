//! Request extractors that reject with the JSON error envelope.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::{request::Parts, StatusCode},
    response::Json,
};
use shared::{Caller, OrderError, Role};
use uuid::Uuid;

use crate::api::{error_response, ErrorResponse};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Caller identity forwarded by the auth gateway in `X-User-Id` and
/// `X-User-Role`. Credentials are never checked here.
#[derive(Debug, Clone, Copy)]
pub struct AuthCaller(pub Caller);

#[async_trait]
impl<S> FromRequestParts<S> for AuthCaller
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        caller_from_parts(parts).map(AuthCaller).map_err(error_response)
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn caller_from_parts(parts: &Parts) -> Result<Caller, OrderError> {
    let id = header(parts, USER_ID_HEADER)
        .and_then(|v| Uuid::parse_str(v).ok())
        .ok_or_else(|| OrderError::unauthorized("Not authorized to access this route"))?;
    let role = header(parts, USER_ROLE_HEADER)
        .ok_or_else(|| OrderError::unauthorized("Not authorized to access this route"))?
        .parse::<Role>()?;

    Ok(Caller { id, role })
}

/// `:id` path segment; anything that is not a UUID cannot name an order.
#[derive(Debug, Clone, Copy)]
pub struct OrderId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for OrderId
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<Uuid>::from_request_parts(parts, state)
            .await
            .map(|Path(id)| OrderId(id))
            .map_err(|_| error_response(OrderError::not_found("Order")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/orders");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_caller_from_headers() {
        let id = Uuid::new_v4();
        let id_text = id.to_string();
        let caller = caller_from_parts(&parts(&[
            (USER_ID_HEADER, id_text.as_str()),
            (USER_ROLE_HEADER, "business"),
        ]))
        .unwrap();

        assert_eq!(caller, Caller { id, role: Role::Business });
    }

    #[test]
    fn test_missing_or_bad_headers_unauthorized() {
        assert!(matches!(caller_from_parts(&parts(&[])), Err(OrderError::Unauthorized(_))));
        assert!(matches!(
            caller_from_parts(&parts(&[(USER_ID_HEADER, "nope"), (USER_ROLE_HEADER, "admin")])),
            Err(OrderError::Unauthorized(_))
        ));
        let id = Uuid::new_v4().to_string();
        assert!(matches!(
            caller_from_parts(&parts(&[(USER_ID_HEADER, id.as_str()), (USER_ROLE_HEADER, "root")])),
            Err(OrderError::Unauthorized(_))
        ));
    }
}
