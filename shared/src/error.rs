use uuid::Uuid;

// ============================================================================
// Order Workflow Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("Insufficient stock for spare part {spare_part_id}: requested {requested}, available {available}")]
    InsufficientStock {
        spare_part_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("Spare part {0} is not available for sale")]
    Unavailable(Uuid),

    #[error("{0}")]
    Validation(String),

    #[error("Persistence failure: {0}")]
    Persistence(String),
}

impl OrderError {
    pub fn not_found(what: impl Into<String>) -> Self {
        OrderError::NotFound(what.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        OrderError::Unauthorized(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        OrderError::InvalidState(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        OrderError::Validation(message.into())
    }
}

impl From<diesel::result::Error> for OrderError {
    fn from(e: diesel::result::Error) -> Self {
        OrderError::Persistence(e.to_string())
    }
}
