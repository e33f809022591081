use thiserror::Error;

use crate::model::OrderStatus;

/// Failure talking to the shared store. Surfaced to the caller as-is; never retried here.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt order {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

/// The execution sink could not deliver an order. Recorded on the order, not raised.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DeliveryFailure(pub String);

impl DeliveryFailure {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("order {id}: no transition from {from} to {to}")]
    InvalidTransition { id: String, from: OrderStatus, to: OrderStatus },
}
