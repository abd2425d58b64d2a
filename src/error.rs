use thiserror::Error;

use crate::order::registry::RegistryError;
use crate::worker::pool::PoolError;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Dish {kind:?} is not on the menu")]
    UnknownKind { kind: String, menu: Vec<String> },

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Communication failure: {0}")]
    CommunicationFailure(#[from] std::io::Error),

    #[error("Service is shutting down")]
    ShuttingDown,

    #[error("Unexpected response from server: {0}")]
    UnexpectedResponse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Worker pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl DispatchError {
    /// Short, stable error code sent to clients in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::UnknownKind { .. } => "unknown kind",
            DispatchError::InvalidQuantity(_) => "invalid quantity",
            DispatchError::NotFound(_) => "not found",
            DispatchError::BadRequest(_) => "bad request",
            DispatchError::ShuttingDown => "shutting down",
            DispatchError::CommunicationFailure(_)
            | DispatchError::UnexpectedResponse(_)
            | DispatchError::Config(_)
            | DispatchError::Pool(_)
            | DispatchError::Registry(_) => "internal error",
        }
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
