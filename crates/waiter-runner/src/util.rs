use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the epoch with sub-second precision, as stored in `start`/`end`.
pub fn now_epoch() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or(0.0)
}

/// `<hostname>/<pid>`: identifies this worker on the orders it completes.
pub fn default_waiter_name() -> String {
    format!("{}/{}", hostname(), std::process::id())
}

fn hostname() -> String {
    if let Ok(h) = std::env::var("HOSTNAME") {
        if !h.trim().is_empty() {
            return h.trim().to_string();
        }
    }
    Command::new("hostname")
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waiter_name_ends_with_pid() {
        let name = default_waiter_name();
        assert!(name.ends_with(&format!("/{}", std::process::id())));
        assert!(!name.starts_with('/'));
    }

    #[test]
    fn clock_is_past_2020() {
        assert!(now_epoch() > 1_577_836_800.0);
    }
}
