use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ids::OrderId;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Ready,
    Running,
    Done,
    Error,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [OrderStatus::Ready, OrderStatus::Running, OrderStatus::Done, OrderStatus::Error];

    /// Label as persisted in the store and printed to operators.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Ready => "READY",
            OrderStatus::Running => "RUNNING",
            OrderStatus::Done => "DONE",
            OrderStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "READY" => Ok(OrderStatus::Ready),
            "RUNNING" => Ok(OrderStatus::Running),
            "DONE" => Ok(OrderStatus::Done),
            "ERROR" => Ok(OrderStatus::Error),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// One unit of work. `arguments` is opaque payload handed verbatim to the execution sink.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    pub arguments: Vec<String>,
    /// Claim time, seconds since epoch.
    pub start: Option<f64>,
    /// Outcome write time, seconds since epoch.
    pub end: Option<f64>,
    /// Worker that recorded the outcome (host/pid by default).
    pub waiter: Option<String>,
    pub error: Option<String>,
}

impl Order {
    /// A freshly loaded order: READY, nothing else set.
    pub fn ready(id: OrderId, arguments: Vec<String>) -> Self {
        Self {
            id,
            status: OrderStatus::Ready,
            arguments,
            start: None,
            end: None,
            waiter: None,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_round_trip_through_from_str() {
        for s in OrderStatus::ALL {
            assert_eq!(s.as_str().parse::<OrderStatus>().unwrap(), s);
        }
    }

    #[test]
    fn unknown_label_is_rejected() {
        let err = "PENDING".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err, UnknownStatus("PENDING".into()));
    }
}
