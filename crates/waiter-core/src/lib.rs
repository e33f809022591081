pub mod error;
pub mod ids;
pub mod lifecycle;
pub mod model;
pub mod outcomes;
pub mod summary;

pub use error::*;
pub use ids::*;
pub use lifecycle::*;
pub use model::*;
pub use outcomes::*;
pub use summary::*;
