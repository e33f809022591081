mod storage;

pub use storage::{SqliteStore, DEFAULT_BUSY_TIMEOUT};
