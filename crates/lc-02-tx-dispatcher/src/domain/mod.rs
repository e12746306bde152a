//! # Domain Layer

pub mod errors;
pub mod registry;

pub use errors::DispatcherError;
pub use registry::{Waiter, WaiterRegistry};
