pub mod entities;
pub mod errors;
pub mod ports;
pub mod transform;

pub use entities::*;
pub use errors::{Result, SyncError};
