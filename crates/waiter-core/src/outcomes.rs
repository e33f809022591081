use crate::{ids::OrderId, model::OrderStatus};

/// Result of one claim-and-deliver cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cycle {
    /// An order was claimed and its outcome (DONE or ERROR) written back.
    Processed { id: OrderId, status: OrderStatus },
    /// Nothing was READY; the caller should stop looping.
    Idle,
}

impl Cycle {
    pub fn processed(&self) -> bool {
        matches!(self, Cycle::Processed { .. })
    }
}
