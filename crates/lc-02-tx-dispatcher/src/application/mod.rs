//! # Application Layer

pub mod dispatcher;

pub use dispatcher::TxResultDispatcher;
