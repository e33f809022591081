use waiter_core::{Order, OrderId, OrderStatus, StatusCount, StoreError};

/// Selects orders by status. An empty filter matches every order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub statuses: Vec<OrderStatus>,
}

impl OrderFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn status(status: OrderStatus) -> Self {
        Self { statuses: vec![status] }
    }

    pub fn statuses(statuses: &[OrderStatus]) -> Self {
        Self { statuses: statuses.to_vec() }
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.statuses.is_empty() || self.statuses.contains(&order.status)
    }
}

/// Field assignments applied to matched orders. Unset fields are left alone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub start: Option<f64>,
}

impl OrderUpdate {
    pub fn set_status(status: OrderStatus) -> Self {
        Self { status: Some(status), start: None }
    }

    pub fn with_start(mut self, start: f64) -> Self {
        self.start = Some(start);
        self
    }

    pub fn apply(&self, order: &mut Order) {
        if let Some(status) = self.status {
            order.status = status;
        }
        if let Some(start) = self.start {
            order.start = Some(start);
        }
    }
}

/// The shared order collection every worker coordinates through.
///
/// `find_and_modify` is the only mutual-exclusion primitive in the system: implementations
/// must pick, update and return a matching order in one indivisible step so that two
/// concurrent callers never get the same order back.
pub trait OrderStore: Send + Sync {
    /// Atomically apply `update` to at most one order matching `filter` and return it post-update.
    fn find_and_modify(&self, filter: &OrderFilter, update: &OrderUpdate) -> Result<Option<Order>, StoreError>;

    /// Insert a new READY order. The store assigns its id.
    fn insert(&self, arguments: Vec<String>) -> Result<OrderId, StoreError>;

    /// Matching orders in store-native order.
    fn find(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError>;

    /// Full-document upsert keyed by id.
    fn save(&self, order: &Order) -> Result<(), StoreError>;

    /// Apply `update` to every matching order. Returns how many were updated.
    fn update_many(&self, filter: &OrderFilter, update: &OrderUpdate) -> Result<u64, StoreError>;

    fn delete_all(&self) -> Result<u64, StoreError>;

    /// Group orders by status and count them. Statuses with no orders are omitted.
    fn count_by_status(&self) -> Result<Vec<StatusCount>, StoreError>;
}
