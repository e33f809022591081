use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::debug;
use waiter_core::{Order, OrderId, OrderStatus, StatusCount, StoreError};
use waiter_storage::{OrderFilter, OrderStore, OrderUpdate};

/// How long a connection waits on another process's write lock before giving up.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const COLUMNS: &str = "id, status, arguments_json, started_at, ended_at, waiter, error";

/// Order collection in an SQLite file shared by every worker process.
///
/// Each worker opens its own connection; SQLite's database write lock is what serializes
/// claims between processes.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        Self::open_with_timeout(db_path, DEFAULT_BUSY_TIMEOUT)
    }

    pub fn open_with_timeout(db_path: &Path, busy_timeout: Duration) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(db_path)
            .map_err(|e| StoreError::Unavailable(format!("open sqlite db {}: {}", db_path.display(), e)))?;
        conn.busy_timeout(busy_timeout).map_err(unavailable)?;
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |r| r.get(0))
            .map_err(unavailable)?;
        debug!(db = %db_path.display(), journal_mode = %mode, "opened order store");
        conn.execute_batch(include_str!("../migrations/0001_init.sql")).map_err(unavailable)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("sqlite connection lock poisoned".to_string()))
    }
}

fn unavailable(e: rusqlite::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

/// `WHERE` clause and its bind values for a status filter.
fn where_clause(filter: &OrderFilter) -> (String, Vec<Value>) {
    if filter.statuses.is_empty() {
        return (String::new(), vec![]);
    }
    let marks = vec!["?"; filter.statuses.len()].join(", ");
    let values = filter.statuses.iter().map(|s| Value::Text(s.as_str().to_string())).collect();
    (format!("WHERE status IN ({})", marks), values)
}

/// `SET` assignments and bind values; None when the update sets nothing.
fn set_clause(update: &OrderUpdate) -> Option<(String, Vec<Value>)> {
    let mut parts = vec![];
    let mut values = vec![];
    if let Some(status) = update.status {
        parts.push("status = ?");
        values.push(Value::Text(status.as_str().to_string()));
    }
    if let Some(start) = update.start {
        parts.push("started_at = ?");
        values.push(Value::Real(start));
    }
    if parts.is_empty() {
        None
    } else {
        Some((parts.join(", "), values))
    }
}

/// Row as stored, before status and arguments are decoded.
struct RawOrder {
    id: String,
    status: String,
    arguments_json: String,
    start: Option<f64>,
    end: Option<f64>,
    waiter: Option<String>,
    error: Option<String>,
}

impl RawOrder {
    fn from_row(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: r.get(0)?,
            status: r.get(1)?,
            arguments_json: r.get(2)?,
            start: r.get(3)?,
            end: r.get(4)?,
            waiter: r.get(5)?,
            error: r.get(6)?,
        })
    }

    fn into_order(self) -> Result<Order, StoreError> {
        let status: OrderStatus = self
            .status
            .parse()
            .map_err(|e: waiter_core::UnknownStatus| StoreError::Corrupt { id: self.id.clone(), reason: e.to_string() })?;
        let arguments: Vec<String> = serde_json::from_str(&self.arguments_json).map_err(|e| StoreError::Corrupt {
            id: self.id.clone(),
            reason: format!("arguments: {}", e),
        })?;
        Ok(Order {
            id: OrderId::from_str(self.id),
            status,
            arguments,
            start: self.start,
            end: self.end,
            waiter: self.waiter,
            error: self.error,
        })
    }
}

fn encode_arguments(arguments: &[String]) -> Result<String, StoreError> {
    serde_json::to_string(arguments).map_err(|e| StoreError::Unavailable(format!("encode arguments: {}", e)))
}

impl OrderStore for SqliteStore {
    fn find_and_modify(&self, filter: &OrderFilter, update: &OrderUpdate) -> Result<Option<Order>, StoreError> {
        let mut conn = self.conn()?;
        // IMMEDIATE takes the write lock up front, so the pick and the update see the same snapshot.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate).map_err(unavailable)?;
        let (where_sql, where_values) = where_clause(filter);

        let raw = match set_clause(update) {
            Some((set_sql, mut values)) => {
                values.extend(where_values);
                let sql = format!(
                    "UPDATE orders SET {} WHERE seq = (SELECT seq FROM orders {} ORDER BY seq LIMIT 1) RETURNING {}",
                    set_sql, where_sql, COLUMNS
                );
                tx.query_row(&sql, params_from_iter(values.iter()), RawOrder::from_row).optional()
            }
            None => {
                let sql = format!("SELECT {} FROM orders {} ORDER BY seq LIMIT 1", COLUMNS, where_sql);
                tx.query_row(&sql, params_from_iter(where_values.iter()), RawOrder::from_row).optional()
            }
        }
        .map_err(unavailable)?;

        // A row that cannot be decoded must not stay claimed; dropping `tx` rolls back.
        let order = raw.map(RawOrder::into_order).transpose()?;
        tx.commit().map_err(unavailable)?;
        Ok(order)
    }

    fn insert(&self, arguments: Vec<String>) -> Result<OrderId, StoreError> {
        let conn = self.conn()?;
        let id = OrderId::new();
        conn.execute(
            "INSERT INTO orders(id, status, arguments_json) VALUES (?1, ?2, ?3)",
            params![id.as_str(), OrderStatus::Ready.as_str(), encode_arguments(&arguments)?],
        )
        .map_err(unavailable)?;
        Ok(id)
    }

    fn find(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError> {
        let conn = self.conn()?;
        let (where_sql, values) = where_clause(filter);
        let sql = format!("SELECT {} FROM orders {} ORDER BY seq", COLUMNS, where_sql);
        let mut stmt = conn.prepare(&sql).map_err(unavailable)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), RawOrder::from_row)
            .map_err(unavailable)?;

        let mut orders = vec![];
        for row in rows {
            orders.push(row.map_err(unavailable)?.into_order()?);
        }
        Ok(orders)
    }

    fn save(&self, order: &Order) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO orders(id, status, arguments_json, started_at, ended_at, waiter, error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                arguments_json = excluded.arguments_json,
                started_at = excluded.started_at,
                ended_at = excluded.ended_at,
                waiter = excluded.waiter,
                error = excluded.error",
            params![
                order.id.as_str(),
                order.status.as_str(),
                encode_arguments(&order.arguments)?,
                order.start,
                order.end,
                order.waiter,
                order.error
            ],
        )
        .map_err(unavailable)?;
        Ok(())
    }

    fn update_many(&self, filter: &OrderFilter, update: &OrderUpdate) -> Result<u64, StoreError> {
        let conn = self.conn()?;
        let (where_sql, where_values) = where_clause(filter);
        let n = match set_clause(update) {
            Some((set_sql, mut values)) => {
                values.extend(where_values);
                let sql = format!("UPDATE orders SET {} {}", set_sql, where_sql);
                conn.execute(&sql, params_from_iter(values.iter())).map_err(unavailable)?
            }
            None => {
                let sql = format!("SELECT COUNT(*) FROM orders {}", where_sql);
                let n: i64 = conn
                    .query_row(&sql, params_from_iter(where_values.iter()), |r| r.get(0))
                    .map_err(unavailable)?;
                n as usize
            }
        };
        Ok(n as u64)
    }

    fn delete_all(&self) -> Result<u64, StoreError> {
        let conn = self.conn()?;
        let n = conn.execute("DELETE FROM orders", []).map_err(unavailable)?;
        Ok(n as u64)
    }

    fn count_by_status(&self) -> Result<Vec<StatusCount>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT status, COUNT(*) FROM orders GROUP BY status ORDER BY COUNT(*) DESC, status DESC")
            .map_err(unavailable)?;
        let rows = stmt
            .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))
            .map_err(unavailable)?;

        let mut counts = vec![];
        for row in rows {
            let (label, n) = row.map_err(unavailable)?;
            let status = label
                .parse::<OrderStatus>()
                .map_err(|e| StoreError::Corrupt { id: "<group>".to_string(), reason: e.to_string() })?;
            counts.push((status, n as u64));
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn claim() -> (OrderFilter, OrderUpdate) {
        (OrderFilter::status(OrderStatus::Ready), OrderUpdate::set_status(OrderStatus::Running).with_start(100.5))
    }

    #[test]
    fn sqlite_open_and_migrate() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("waiter.db");
        let _ = SqliteStore::open(&db_path).unwrap();
        // reopening an existing db must not fail on the schema
        let _ = SqliteStore::open(&db_path).unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn arguments_survive_storage_verbatim() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("w.db")).unwrap();
        let args = vec!["a b".to_string(), "\"quoted\", comma".to_string(), String::new()];
        store.insert(args.clone()).unwrap();
        let all = store.find(&OrderFilter::any()).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].arguments, args);
        assert_eq!(all[0].status, OrderStatus::Ready);
    }

    #[test]
    fn claim_is_exclusive() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("w.db")).unwrap();
        store.insert(vec!["one".into()]).unwrap();

        let (f, u) = claim();
        let a = store.find_and_modify(&f, &u).unwrap();
        let b = store.find_and_modify(&f, &u).unwrap();
        let a = a.unwrap();
        assert_eq!(a.status, OrderStatus::Running);
        assert_eq!(a.start, Some(100.5));
        assert!(b.is_none());
    }

    #[test]
    fn claims_follow_insertion_order() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("w.db")).unwrap();
        let first = store.insert(vec!["1".into()]).unwrap();
        let second = store.insert(vec!["2".into()]).unwrap();
        let (f, u) = claim();
        assert_eq!(store.find_and_modify(&f, &u).unwrap().unwrap().id, first);
        assert_eq!(store.find_and_modify(&f, &u).unwrap().unwrap().id, second);
    }

    #[test]
    fn save_is_an_idempotent_upsert() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("w.db")).unwrap();
        store.insert(vec!["x".into()]).unwrap();
        let (f, u) = claim();
        let mut o = store.find_and_modify(&f, &u).unwrap().unwrap();
        o.status = OrderStatus::Error;
        o.end = Some(101.0);
        o.waiter = Some("host/42".into());
        o.error = Some("exit status 1".into());
        store.save(&o).unwrap();
        store.save(&o).unwrap();

        let all = store.find(&OrderFilter::any()).unwrap();
        assert_eq!(all, vec![o]);
    }

    #[test]
    fn update_many_and_counts() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("w.db")).unwrap();
        for i in 0..4 {
            store.insert(vec![i.to_string()]).unwrap();
        }
        let (f, u) = claim();
        store.find_and_modify(&f, &u).unwrap();
        store.find_and_modify(&f, &u).unwrap();

        assert_eq!(store.count_by_status().unwrap(), vec![(OrderStatus::Running, 2), (OrderStatus::Ready, 2)]);

        let n = store
            .update_many(&OrderFilter::status(OrderStatus::Running), &OrderUpdate::set_status(OrderStatus::Ready))
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(store.count_by_status().unwrap(), vec![(OrderStatus::Ready, 4)]);
        // start survives the status-only update
        assert_eq!(store.find(&OrderFilter::any()).unwrap().iter().filter(|o| o.start.is_some()).count(), 2);
    }

    #[test]
    fn delete_all_empties_the_collection() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("w.db")).unwrap();
        store.insert(vec![]).unwrap();
        store.insert(vec![]).unwrap();
        assert_eq!(store.delete_all().unwrap(), 2);
        assert!(store.find(&OrderFilter::any()).unwrap().is_empty());
        assert!(store.count_by_status().unwrap().is_empty());
    }

    #[test]
    fn unknown_status_is_reported_as_corrupt() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("w.db")).unwrap();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO orders(id, status, arguments_json) VALUES ('bad', 'PENDING', '[]')",
                [],
            )
            .unwrap();
        }
        let err = store.find(&OrderFilter::any()).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { ref id, .. } if id == "bad"));
    }

    #[test]
    fn undecodable_claim_is_rolled_back() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("w.db")).unwrap();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO orders(id, status, arguments_json) VALUES ('garbled', 'READY', 'not json')",
                [],
            )
            .unwrap();
        }

        let (f, u) = claim();
        let err = store.find_and_modify(&f, &u).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { ref id, .. } if id == "garbled"));

        let conn = store.conn.lock().unwrap();
        let (status, started): (String, Option<f64>) = conn
            .query_row("SELECT status, started_at FROM orders WHERE id = 'garbled'", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(status, "READY");
        assert_eq!(started, None);
    }
}
