use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use waiter_core::{Order, OrderId, StatusCount, StoreError};

use crate::traits::{OrderFilter, OrderStore, OrderUpdate};

/// In-memory store for tests and single-process use. Not durable.
///
/// Every operation holds the lock for its whole duration, which is what makes
/// `find_and_modify` atomic for threads sharing one store.
#[derive(Default)]
pub struct InMemoryStore {
    orders: Mutex<Vec<Order>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn orders(&self) -> Result<MutexGuard<'_, Vec<Order>>, StoreError> {
        self.orders
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }
}

impl OrderStore for InMemoryStore {
    fn find_and_modify(&self, filter: &OrderFilter, update: &OrderUpdate) -> Result<Option<Order>, StoreError> {
        let mut orders = self.orders()?;
        Ok(orders.iter_mut().find(|o| filter.matches(o)).map(|o| {
            update.apply(o);
            o.clone()
        }))
    }

    fn insert(&self, arguments: Vec<String>) -> Result<OrderId, StoreError> {
        let id = OrderId::new();
        self.orders()?.push(Order::ready(id.clone(), arguments));
        Ok(id)
    }

    fn find(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError> {
        Ok(self.orders()?.iter().filter(|o| filter.matches(o)).cloned().collect())
    }

    fn save(&self, order: &Order) -> Result<(), StoreError> {
        let mut orders = self.orders()?;
        match orders.iter_mut().find(|o| o.id == order.id) {
            Some(existing) => *existing = order.clone(),
            None => orders.push(order.clone()),
        }
        Ok(())
    }

    fn update_many(&self, filter: &OrderFilter, update: &OrderUpdate) -> Result<u64, StoreError> {
        let mut orders = self.orders()?;
        let mut n = 0;
        for o in orders.iter_mut().filter(|o| filter.matches(o)) {
            update.apply(o);
            n += 1;
        }
        Ok(n)
    }

    fn delete_all(&self) -> Result<u64, StoreError> {
        let mut orders = self.orders()?;
        let n = orders.len() as u64;
        orders.clear();
        Ok(n)
    }

    fn count_by_status(&self) -> Result<Vec<StatusCount>, StoreError> {
        let orders = self.orders()?;
        let mut counts = HashMap::new();
        for o in orders.iter() {
            *counts.entry(o.status).or_insert(0u64) += 1;
        }
        Ok(counts.into_iter().collect())
    }
}
