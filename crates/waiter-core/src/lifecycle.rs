use crate::{DeliveryFailure, LifecycleError, Order, OrderStatus};

/// Recorded when a sink fails without saying why.
pub const UNDESCRIBED_FAILURE: &str = "delivery failed";

/// Statuses an operator reset moves back to READY.
pub const RESETTABLE: [OrderStatus; 2] = [OrderStatus::Error, OrderStatus::Running];

impl OrderStatus {
    /// Edges of the order state machine. DONE has no way out.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Ready, Running) | (Running, Done) | (Running, Error) | (Running, Ready) | (Error, Ready)
        )
    }
}

impl Order {
    /// Record the delivery result on a claimed order.
    ///
    /// Sets `end` and `waiter`; on failure also `error`, which is never left blank. A successful
    /// redelivery of an order that failed before drops the stale error text so `error` tracks
    /// the ERROR status.
    pub fn complete(&mut self, result: Result<(), DeliveryFailure>, waiter: &str, now: f64) -> Result<(), LifecycleError> {
        let next = if result.is_ok() { OrderStatus::Done } else { OrderStatus::Error };
        self.transition(next)?;
        match result {
            Ok(()) => self.error = None,
            Err(failure) if failure.0.trim().is_empty() => self.error = Some(UNDESCRIBED_FAILURE.to_string()),
            Err(failure) => self.error = Some(failure.0),
        }
        self.end = Some(now);
        self.waiter = Some(waiter.to_string());
        Ok(())
    }

    fn transition(&mut self, next: OrderStatus) -> Result<(), LifecycleError> {
        if !self.status.can_transition_to(next) {
            return Err(LifecycleError::InvalidTransition {
                id: self.id.to_string(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}
