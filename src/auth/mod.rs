pub mod identity;
pub mod session;

pub use identity::{require_identity, Identity};
