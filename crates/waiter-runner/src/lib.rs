pub mod config;
pub mod sink;
pub mod util;
pub mod waiter;

pub use config::*;
pub use sink::*;
pub use util::*;
pub use waiter::*;
